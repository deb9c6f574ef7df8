//! One table to one record.
//!
//! The builder is the size oracle of the write path: it encodes the whole
//! table, measures the actual output and rejects it with
//! [`RecordError::OversizedDocument`] when it does not fit. Row counts alone
//! cannot predict that because compressibility depends on content.
//!
//! Steps, in order:
//! 1. validate the time index and measure the uncompressed footprint
//! 2. stable-sort rows by the index
//! 3. normalize column names ([`crate::naming`])
//! 4. encode the index, then every column in order
//! 5. compare the summed blob size, then the serialized record size, with
//!    `fill_factor * ceiling`

use std::fmt;

use snafu::prelude::*;

use crate::codec::ColumnCodec;
use crate::column::ColumnRecord;
use crate::config::CodecConfig;
use crate::error::{
    EncodeSnafu, InvalidIndexSnafu, InvalidTableSnafu, OversizedDocumentSnafu, RecordError,
    RecordResult,
};
use crate::metadata::{Metadata, with_derived};
use crate::naming::normalize_column_names;
use crate::observe::{SharedObserver, default_observer};
use crate::record::{ColumnMap, INDEX_COLUMN, Record};
use crate::table::{SortError, Table};
use crate::time_index::TimeIndexView;

/// Figures describing one successfully built record.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentStats {
    /// Series identifier.
    pub uid: String,
    /// Rows in the record.
    pub row_count: usize,
    /// Summed size of all column blobs, index included.
    pub binary_size: u64,
    /// Size of the serialized record.
    pub serialized_size: u64,
    /// Uncompressed in-memory footprint of the source table.
    pub uncompressed_size: u64,
    /// `binary_size / uncompressed_size` (1.0 for an empty table).
    pub compression_ratio: f64,
}

/// Builds records under a size limit.
#[derive(Clone)]
pub struct DocumentBuilder {
    config: CodecConfig,
    codec: ColumnCodec,
    observer: SharedObserver,
}

impl fmt::Debug for DocumentBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for DocumentBuilder {
    fn default() -> Self {
        DocumentBuilder::new(CodecConfig::default())
    }
}

impl DocumentBuilder {
    /// Builder reporting to the `log` facade.
    pub fn new(config: CodecConfig) -> Self {
        DocumentBuilder::with_observer(config, default_observer())
    }

    /// Builder reporting to `observer`.
    pub fn with_observer(config: CodecConfig, observer: SharedObserver) -> Self {
        DocumentBuilder {
            codec: ColumnCodec::new(config.compression_level, observer.clone()),
            config,
            observer,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub(crate) fn observer(&self) -> &SharedObserver {
        &self.observer
    }

    /// Encode `table` as one record of series `uid`.
    ///
    /// Fails with `OversizedDocument` when the result would not fit; that
    /// error carries the measured compression ratio for the splitter.
    pub fn build(&self, uid: &str, table: &Table, metadata: &Metadata) -> RecordResult<Record> {
        self.build_with_stats(uid, table, metadata).map(|(record, _)| record)
    }

    /// Like [`DocumentBuilder::build`], also returning the record's figures.
    pub fn build_with_stats(
        &self,
        uid: &str,
        table: &Table,
        metadata: &Metadata,
    ) -> RecordResult<(Record, DocumentStats)> {
        self.config.validate()?;
        TimeIndexView::try_new(table.index()).context(InvalidIndexSnafu { uid })?;

        let footprint = table.memory_footprint().context(InvalidTableSnafu)? as u64;
        let sorted = sort_rows(uid, table)?;
        let names = normalize_column_names(uid, sorted.column_names())?;
        let span = TimeIndexView::try_new(sorted.index())
            .and_then(|view| view.first_last())
            .context(InvalidIndexSnafu { uid })?;

        let index = ColumnRecord::build(&self.codec, INDEX_COLUMN, sorted.index().as_ref())
            .context(EncodeSnafu {
                uid,
                column: INDEX_COLUMN,
            })?;

        let mut entries = Vec::with_capacity(names.len());
        for (name, (original, values)) in names.into_iter().zip(sorted.columns()) {
            let column = ColumnRecord::build(&self.codec, &name, values.as_ref())
                .context(EncodeSnafu {
                    uid,
                    column: original.as_str(),
                })?;
            entries.push((name, column));
        }

        let binary_size = index.size + entries.iter().map(|(_, c)| c.size).sum::<u64>();
        self.check_size(uid, binary_size, footprint)?;

        let record = Record::new(
            uid.to_string(),
            span,
            with_derived(metadata, sorted.num_rows(), binary_size),
            index,
            ColumnMap::from_entries(entries),
        );

        let serialized_size = record.to_bytes()?.len() as u64;
        self.check_size(uid, serialized_size, footprint)?;

        let stats = DocumentStats {
            uid: uid.to_string(),
            row_count: sorted.num_rows(),
            binary_size,
            serialized_size,
            uncompressed_size: footprint,
            compression_ratio: ratio(binary_size, footprint),
        };
        self.observer.document_built(&stats);
        Ok((record, stats))
    }

    fn check_size(&self, uid: &str, size: u64, footprint: u64) -> RecordResult<()> {
        let limit = self.config.document_limit();
        if size as f64 <= limit {
            return Ok(());
        }

        let compression_ratio = ratio(size, footprint);
        self.observer.document_oversized(uid, size, compression_ratio);
        OversizedDocumentSnafu {
            uid,
            binary_size: size,
            compression_ratio,
            limit,
        }
        .fail()
    }
}

fn ratio(size: u64, footprint: u64) -> f64 {
    if footprint == 0 {
        1.0
    } else {
        size as f64 / footprint as f64
    }
}

/// Stable sort by index, attributing failures to `uid`.
pub(crate) fn sort_rows(uid: &str, table: &Table) -> RecordResult<Table> {
    table.sort_by_index().map_err(|err| match err {
        SortError::SortIndex { source } => RecordError::InvalidIndex {
            uid: uid.to_string(),
            source,
        },
        SortError::SortArrow { source } => RecordError::Arrow {
            uid: uid.to_string(),
            source,
        },
    })
}
