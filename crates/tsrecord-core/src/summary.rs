//! Per-series overview of a set of records.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::record::Record;

/// Aggregate figures for one uid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesSummary {
    /// Series identifier.
    pub uid: String,
    /// Number of records of the series.
    pub record_count: usize,
    /// Earliest `start` over all records, `None` if every record is empty.
    pub start: Option<DateTime<Utc>>,
    /// Latest `end` over all records.
    pub end: Option<DateTime<Utc>>,
    /// Rows over all records.
    pub total_rows: u64,
    /// Summed `binary_size` over all records.
    pub binary_size: u64,
}

/// Summaries for every uid in `records`, ordered by uid.
pub fn summarize_records<'a, I>(records: I) -> Vec<SeriesSummary>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut by_uid: BTreeMap<&str, SeriesSummary> = BTreeMap::new();

    for record in records {
        let entry = by_uid
            .entry(record.uid())
            .or_insert_with(|| SeriesSummary {
                uid: record.uid().to_string(),
                record_count: 0,
                start: None,
                end: None,
                total_rows: 0,
                binary_size: 0,
            });

        entry.record_count += 1;
        entry.total_rows += record.row_count();
        entry.binary_size += record.binary_size();
        entry.start = min_some(entry.start, record.start());
        entry.end = entry.end.max(record.end());
    }

    by_uid.into_values().collect()
}

fn min_some(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}
