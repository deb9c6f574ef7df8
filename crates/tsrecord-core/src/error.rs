//! Error type and SNAFU context selectors for the record codec.
//!
//! `RecordError` is the single error surfaced by the builder, splitter, reader
//! and assembler. Context selectors are visible crate-wide so sibling modules
//! can attach the offending uid/column without re-exporting them. Keep new
//! variants here so user-facing messages stay consistent.
//!
//! Only [`RecordError::OversizedDocument`] is expected during normal
//! operation: the splitter consumes it to shrink its partition target. Every
//! other variant is fatal for the call that produced it.

use arrow::error::ArrowError;
use snafu::prelude::*;

use crate::{codec::ColumnCodecError, table::TableShapeError, time_index::TimeIndexError};

/// Errors from encoding, splitting, decoding or reassembling records.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RecordError {
    /// The codec configuration cannot produce a converging split.
    #[snafu(display("Invalid codec configuration: {detail}"))]
    InvalidConfig {
        /// What was wrong with the configuration.
        detail: String,
    },

    /// The table's row index is not a usable time index.
    #[snafu(display("Invalid time index for series {uid}: {source}"))]
    InvalidIndex {
        /// Series identifier supplied by the caller.
        uid: String,
        /// Why the index was rejected.
        source: TimeIndexError,
    },

    /// A table could not be constructed from decoded or concatenated columns.
    #[snafu(display("Invalid table shape: {source}"))]
    InvalidTable {
        /// Underlying shape violation.
        source: TableShapeError,
    },

    /// Two column names reduce to the same field name after normalization.
    #[snafu(display(
        "Columns {first:?} and {second:?} of series {uid} both normalize to {normalized:?}"
    ))]
    ColumnNameCollision {
        /// Series identifier supplied by the caller.
        uid: String,
        /// The earlier of the two original names.
        first: String,
        /// The later of the two original names.
        second: String,
        /// The shared normalized name.
        normalized: String,
    },

    /// A column name has no characters left after normalization.
    #[snafu(display("Column {original:?} of series {uid} normalizes to an empty name"))]
    EmptyColumnName {
        /// Series identifier supplied by the caller.
        uid: String,
        /// The original column name.
        original: String,
    },

    /// Arrow compute error while sorting, slicing or concatenating columns.
    #[snafu(display("Arrow error for series {uid}: {source}"))]
    Arrow {
        /// Series identifier.
        uid: String,
        /// Underlying Arrow error.
        source: ArrowError,
    },

    /// A column could not be serialized or compressed.
    #[snafu(display("Failed to encode column {column} of series {uid}: {source}"))]
    Encode {
        /// Series identifier.
        uid: String,
        /// Column being encoded (`<index>` for the time index).
        column: String,
        /// Underlying codec error.
        source: ColumnCodecError,
    },

    /// The encoded record would exceed the document limit.
    ///
    /// Recoverable: [`crate::ChunkSplitter`] catches it and retries with a
    /// smaller partition target derived from `compression_ratio`.
    #[snafu(display(
        "Record for series {uid} is too large ({binary_size} bytes, \
         ratio {compression_ratio:.3}, limit {limit:.0})"
    ))]
    OversizedDocument {
        /// Series identifier.
        uid: String,
        /// Encoded size that exceeded the limit.
        binary_size: u64,
        /// Encoded size divided by the uncompressed in-memory footprint.
        compression_ratio: f64,
        /// The limit that was exceeded, in bytes.
        limit: f64,
    },

    /// The split target shrink estimate left its sane range.
    ///
    /// Indicates the size/ratio model diverged; the split is aborted instead of
    /// retried.
    #[snafu(display(
        "Unstable split estimate for series {uid}: \
         target {previous_target:.0} -> {next_target:.0} (must stay above {floor:.0})"
    ))]
    UnstableSizeEstimate {
        /// Series identifier.
        uid: String,
        /// Target used by the failed attempt.
        previous_target: f64,
        /// Target the estimate produced.
        next_target: f64,
        /// Lower bound the target must exceed.
        floor: f64,
    },

    /// A column blob does not match its recorded checksum.
    #[snafu(display(
        "Checksum mismatch in column {column} of series {uid}: expected {expected}, got {actual}"
    ))]
    ChecksumMismatch {
        /// Series identifier.
        uid: String,
        /// Column whose blob is corrupt (`<index>` for the time index).
        column: String,
        /// Hex digest stored in the record.
        expected: String,
        /// Hex digest of the blob as received.
        actual: String,
    },

    /// A column blob passed its checksum but could not be decoded.
    #[snafu(display("Corrupt encoding in column {column} of series {uid}: {source}"))]
    CorruptEncoding {
        /// Series identifier.
        uid: String,
        /// Column that failed to decode (`<index>` for the time index).
        column: String,
        /// Underlying codec error.
        source: ColumnCodecError,
    },

    /// Record-level fields disagree with the decoded content.
    #[snafu(display("Corrupt record for series {uid}: {detail}"))]
    CorruptRecord {
        /// Series identifier.
        uid: String,
        /// What disagreed.
        detail: String,
    },

    /// Records of one series carry different column sets.
    #[snafu(display("Schema mismatch in series {uid}: expected {expected:?}, found {found:?}"))]
    SchemaMismatch {
        /// Series identifier.
        uid: String,
        /// `name: dtype` pairs of the first record.
        expected: Vec<String>,
        /// `name: dtype` pairs of the disagreeing record.
        found: Vec<String>,
    },

    /// Records passed to the assembler belong to different series.
    #[snafu(display("Cannot assemble records of series {found} together with series {expected}"))]
    MixedSeries {
        /// Uid of the first record.
        expected: String,
        /// Uid of the disagreeing record.
        found: String,
    },

    /// The assembler was given no records.
    #[snafu(display("Cannot assemble a table from zero records"))]
    EmptyRecordSet,

    /// MessagePack serialization of a record failed.
    #[snafu(display("Failed to serialize record for series {uid}: {source}"))]
    Serialize {
        /// Series identifier.
        uid: String,
        /// Underlying encoder error.
        source: rmp_serde::encode::Error,
    },

    /// Bytes could not be parsed as a record.
    #[snafu(display("Failed to deserialize record: {source}"))]
    Deserialize {
        /// Underlying decoder error.
        source: rmp_serde::decode::Error,
    },
}

/// Convenience alias for results returned by this crate.
#[allow(clippy::result_large_err)]
pub type RecordResult<T> = Result<T, RecordError>;
