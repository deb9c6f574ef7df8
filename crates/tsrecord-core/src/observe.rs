//! Injected diagnostics sink.
//!
//! Components never log directly. They report noteworthy events to a
//! [`CodecObserver`] handed to them at construction, which keeps the core free
//! of process-wide state and lets tests assert on what was reported.

use std::sync::Arc;

use arrow::datatypes::DataType;
use log::{info, warn};

use crate::builder::DocumentStats;

/// Receiver for codec events. Every hook defaults to a no-op.
pub trait CodecObserver: Send + Sync {
    /// A column with a variable-width or nested type is being encoded.
    fn opaque_column(&self, _column: &str, _datatype: &DataType) {}

    /// A record was built and fits under the limit.
    fn document_built(&self, _stats: &DocumentStats) {}

    /// A trial record exceeded the limit and was discarded.
    fn document_oversized(&self, _uid: &str, _binary_size: u64, _compression_ratio: f64) {}

    /// The splitter shrank its target and restarts from the whole table.
    fn split_shrunk(&self, _uid: &str, _previous_target: f64, _next_target: f64) {}

    /// A projected read asked for columns the record does not have.
    fn columns_not_found(&self, _uid: &str, _missing: &[String]) {}
}

/// Shared handle to an observer.
pub type SharedObserver = Arc<dyn CodecObserver>;

/// Observer forwarding every event to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl CodecObserver for LogObserver {
    fn opaque_column(&self, column: &str, datatype: &DataType) {
        warn!(
            "Column {column} has opaque type {datatype}; encoding is allowed but \
             does not get a compact fixed-width layout"
        );
    }

    fn document_built(&self, stats: &DocumentStats) {
        info!(
            "Built record for {}: {} rows, {} bytes, ratio {:.3}",
            stats.uid, stats.row_count, stats.binary_size, stats.compression_ratio
        );
    }

    fn document_oversized(&self, uid: &str, binary_size: u64, compression_ratio: f64) {
        warn!(
            "Record for {uid} is too large ({binary_size} bytes, ratio {compression_ratio:.3})"
        );
    }

    fn split_shrunk(&self, uid: &str, previous_target: f64, next_target: f64) {
        warn!("Splitting {uid} again: target {previous_target:.0} -> {next_target:.0} bytes");
    }

    fn columns_not_found(&self, uid: &str, missing: &[String]) {
        warn!("Columns {missing:?} not found in record for {uid}");
    }
}

/// The observer components use unless told otherwise.
pub fn default_observer() -> SharedObserver {
    Arc::new(LogObserver)
}
