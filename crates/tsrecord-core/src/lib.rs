//! Core codec for storing time-indexed tables as size-bounded binary records.
//!
//! A [`Table`] (an Arrow timestamp index plus named Arrow columns) is turned
//! into one or more self-describing [`Record`]s that each fit under a hard
//! per-document ceiling, and a set of records is turned back into a table:
//!
//! - [`codec`]: one Arrow array to/from an LZ4-compressed Arrow IPC blob.
//! - [`column`]: a blob plus its dtype tag, size and BLAKE3 checksum.
//! - [`builder`]: one table to one record, rejecting oversized output.
//! - [`splitter`]: one table to many records, shrinking the partition target
//!   until every record fits.
//! - [`reader`]: records back to tables, restoring global time order.
//!
//! Everything here is synchronous and keeps no state between calls.
//! Diagnostics go through an injected [`CodecObserver`] rather than a global
//! logger; [`LogObserver`] forwards to the `log` facade.
//!
//! ```rust,ignore
//! use tsrecord_core::{ChunkSplitter, CodecConfig, Metadata, TableAssembler};
//!
//! let splitter = ChunkSplitter::new(CodecConfig::default());
//! let records = splitter.split("AAPL", &table, &Metadata::new())?;
//! let restored = TableAssembler::default().assemble(&records)?;
//! ```
#![deny(missing_docs)]

pub mod builder;
pub mod codec;
pub mod column;
pub mod config;
pub mod error;
pub mod metadata;
pub mod naming;
pub mod observe;
pub mod reader;
pub mod record;
pub mod splitter;
pub mod summary;
pub mod table;
pub mod time_index;

#[cfg(test)]
pub(crate) mod test_util;

pub use builder::{DocumentBuilder, DocumentStats};
pub use codec::{ColumnCodec, ColumnCodecError};
pub use column::ColumnRecord;
pub use config::CodecConfig;
pub use error::{RecordError, RecordResult};
pub use metadata::{MetaValue, Metadata};
pub use observe::{CodecObserver, LogObserver, SharedObserver};
pub use reader::{DocumentReader, TableAssembler};
pub use record::Record;
pub use splitter::{ChunkSplitter, SplitReport};
pub use summary::{SeriesSummary, summarize_records};
pub use table::{Table, TableShapeError};
pub use time_index::TimeIndexError;
