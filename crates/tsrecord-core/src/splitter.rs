//! One table to as many records as it takes.
//!
//! The splitter stably sorts the table by its index once, guesses a partition
//! target (bytes of uncompressed footprint per record), cuts the sorted table
//! into row-contiguous slices of about that size and builds each slice.
//! Records of one split therefore cover ascending, non-overlapping runs of
//! the index, and rows sharing a timestamp keep their input order across
//! record boundaries. If any slice comes back `OversizedDocument`, every
//! record of the attempt is discarded, the target is shrunk using the measured
//! compression ratio and the whole table is split again. All records of a
//! successful split therefore share one partitioning.
//!
//! Each retry shrinks the target by at least `fill_factor`, and a target at or
//! below `shrink_floor * ceiling` aborts with
//! [`RecordError::UnstableSizeEstimate`], so the loop always terminates.

use std::ops::Range;

use snafu::prelude::*;

use crate::builder::{DocumentBuilder, sort_rows};
use crate::config::CodecConfig;
use crate::error::{
    InvalidConfigSnafu, InvalidTableSnafu, RecordError, RecordResult, UnstableSizeEstimateSnafu,
};
use crate::metadata::Metadata;
use crate::observe::SharedObserver;
use crate::record::Record;
use crate::table::Table;

/// Outcome of one split, with how it was reached.
#[derive(Debug, Clone)]
pub struct SplitReport {
    /// Records in row order.
    pub records: Vec<Record>,
    /// Number of partitionings tried, including the successful one.
    pub attempts: usize,
    /// Target that produced `records`.
    pub target_size: f64,
    /// Number of partitions of the successful attempt.
    pub partitions: usize,
}

/// Splits tables into records that fit under the configured ceiling.
#[derive(Debug, Clone, Default)]
pub struct ChunkSplitter {
    builder: DocumentBuilder,
}

impl ChunkSplitter {
    /// Splitter reporting to the `log` facade.
    pub fn new(config: CodecConfig) -> Self {
        ChunkSplitter {
            builder: DocumentBuilder::new(config),
        }
    }

    /// Splitter reporting to `observer`.
    pub fn with_observer(config: CodecConfig, observer: SharedObserver) -> Self {
        ChunkSplitter {
            builder: DocumentBuilder::with_observer(config, observer),
        }
    }

    /// Split with an existing builder.
    pub fn from_builder(builder: DocumentBuilder) -> Self {
        ChunkSplitter { builder }
    }

    /// The builder used for every partition.
    pub fn builder(&self) -> &DocumentBuilder {
        &self.builder
    }

    /// Split `table` starting from the default target.
    pub fn split(
        &self,
        uid: &str,
        table: &Table,
        metadata: &Metadata,
    ) -> RecordResult<Vec<Record>> {
        self.split_with_report(uid, table, metadata, None)
            .map(|report| report.records)
    }

    /// Split `table` starting from `target_size` bytes of footprint per record.
    pub fn split_with_target(
        &self,
        uid: &str,
        table: &Table,
        metadata: &Metadata,
        target_size: f64,
    ) -> RecordResult<Vec<Record>> {
        self.split_with_report(uid, table, metadata, Some(target_size))
            .map(|report| report.records)
    }

    /// Split `table` and report attempts and the final target.
    ///
    /// `target_size` defaults to `ceiling * initial_compressibility`.
    pub fn split_with_report(
        &self,
        uid: &str,
        table: &Table,
        metadata: &Metadata,
        target_size: Option<f64>,
    ) -> RecordResult<SplitReport> {
        let config = self.builder.config();
        config.validate()?;

        let mut target = target_size.unwrap_or_else(|| config.default_target_size());
        ensure!(
            target.is_finite() && target > 0.0,
            InvalidConfigSnafu {
                detail: format!("target_size {target} must be positive and finite"),
            }
        );

        let sorted = sort_rows(uid, table)?;
        let footprint = sorted.memory_footprint().context(InvalidTableSnafu)?;
        let mut attempts = 0;

        loop {
            attempts += 1;
            let ranges = partition_ranges(sorted.num_rows(), footprint, target);

            match self.build_partitions(uid, &sorted, metadata, &ranges) {
                Ok(records) => {
                    return Ok(SplitReport {
                        records,
                        attempts,
                        target_size: target,
                        partitions: ranges.len(),
                    });
                }
                Err(RecordError::OversizedDocument {
                    compression_ratio, ..
                }) => {
                    let next = shrink_target(config, target, compression_ratio);
                    let floor = config.shrink_floor_size();
                    ensure!(
                        next > floor,
                        UnstableSizeEstimateSnafu {
                            uid,
                            previous_target: target,
                            next_target: next,
                            floor,
                        }
                    );
                    self.builder.observer().split_shrunk(uid, target, next);
                    target = next;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Split several tables in order and concatenate their records.
    ///
    /// Stops at the first table that fails.
    pub fn split_batch<'a, I>(&self, inputs: I) -> RecordResult<Vec<Record>>
    where
        I: IntoIterator<Item = (&'a str, &'a Table, &'a Metadata)>,
    {
        let mut out = Vec::new();
        for (uid, table, metadata) in inputs {
            out.extend(self.split(uid, table, metadata)?);
        }
        Ok(out)
    }

    fn build_partitions(
        &self,
        uid: &str,
        table: &Table,
        metadata: &Metadata,
        ranges: &[Range<usize>],
    ) -> RecordResult<Vec<Record>> {
        ranges
            .iter()
            .map(|range| {
                let part = table.slice(range.start, range.len());
                self.builder.build(uid, &part, metadata)
            })
            .collect()
    }
}

/// Smaller target after an oversized attempt.
///
/// Aims the next partitions at the fill limit under the observed ratio, and
/// never grows or stalls: the result is at most `previous * fill_factor`.
fn shrink_target(config: &CodecConfig, previous: f64, compression_ratio: f64) -> f64 {
    let by_ratio = config.document_limit() / compression_ratio;
    by_ratio.min(previous * config.fill_factor)
}

/// Row ranges for splitting `num_rows` rows of `footprint` bytes at `target`
/// bytes per partition.
///
/// The count is `ceil(footprint / target)`, at least 1 and at most one row
/// per partition. The first `num_rows % count` ranges get one extra row.
/// An empty table yields a single empty range.
pub fn partition_ranges(num_rows: usize, footprint: usize, target: f64) -> Vec<Range<usize>> {
    let wanted = (footprint as f64 / target).ceil();
    let count = if wanted.is_finite() && wanted >= 1.0 {
        (wanted as usize).min(num_rows.max(1))
    } else {
        1
    };

    let base = num_rows / count;
    let extra = num_rows % count;
    let mut ranges = Vec::with_capacity(count);
    let mut start = 0;
    for i in 0..count {
        let len = base + usize::from(i < extra);
        ranges.push(start..start + len);
        start += len;
    }
    ranges
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{ArrayRef, Int64Array, TimestampMillisecondArray};

    use super::*;
    use crate::reader::TableAssembler;
    use crate::test_util::{
        RecordingObserver, TestResult, noise_table, small_config, tick_table, wide_tiny_table,
    };

    #[test]
    fn ranges_follow_array_split() {
        assert_eq!(partition_ranges(10, 100, 30.0), vec![0..3, 3..6, 6..8, 8..10]);
        assert_eq!(partition_ranges(10, 100, 1000.0), vec![0..10]);
        assert_eq!(partition_ranges(3, 1_000_000, 1.0), vec![0..1, 1..2, 2..3]);
        assert_eq!(partition_ranges(0, 0, 10.0), vec![0..0]);
    }

    #[test]
    fn ranges_cover_every_row_once() {
        for rows in [1, 7, 100, 1001] {
            for target in [1.0, 13.0, 250.0, 1e9] {
                let ranges = partition_ranges(rows, rows * 16, target);
                assert_eq!(ranges.first().map(|r| r.start), Some(0));
                assert_eq!(ranges.last().map(|r| r.end), Some(rows));
                for pair in ranges.windows(2) {
                    assert_eq!(pair[0].end, pair[1].start);
                }
            }
        }
    }

    #[test]
    fn small_table_needs_one_attempt() -> TestResult {
        let splitter = ChunkSplitter::new(small_config());
        let report =
            splitter.split_with_report("s1", &tick_table(100, 3), &Metadata::new(), None)?;
        assert_eq!(report.attempts, 1);
        assert_eq!(report.partitions, 1);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].row_count(), 100);
        Ok(())
    }

    #[test]
    fn incompressible_table_shrinks_and_converges() -> TestResult {
        let observer = Arc::new(RecordingObserver::default());
        let config = small_config();
        let splitter = ChunkSplitter::with_observer(config, observer.clone());

        // 6x the ceiling of random floats.
        let rows = 6 * config.ceiling / 24;
        let table = noise_table(rows, 11);
        let report = splitter.split_with_report("noise", &table, &Metadata::new(), None)?;

        assert!(report.attempts >= 2, "attempts: {}", report.attempts);
        assert!(report.target_size < config.default_target_size());

        let shrinks = observer.shrinks();
        assert_eq!(shrinks.len(), report.attempts - 1);
        for (previous, next) in &shrinks {
            assert!(next < previous);
            assert!(*next > config.shrink_floor_size());
        }

        let total: u64 = report.records.iter().map(Record::row_count).sum();
        assert_eq!(total, rows as u64);
        for record in &report.records {
            assert!(record.binary_size() as f64 <= config.document_limit());
            assert!(record.to_bytes()?.len() as f64 <= config.document_limit());
        }
        Ok(())
    }

    #[test]
    fn same_input_same_partitions() -> TestResult {
        let splitter = ChunkSplitter::new(small_config());
        let table = noise_table(30_000, 5);
        let first = splitter.split("s", &table, &Metadata::new())?;
        let second = splitter.split("s", &table, &Metadata::new())?;
        assert_eq!(first, second);
        Ok(())
    }

    #[test]
    fn diverging_estimate_aborts() {
        // One row of many columns: framing dwarfs the data, so the ratio is
        // far above 1 and the shrunk target falls under the floor.
        let config = CodecConfig::default().with_ceiling(1024);
        let splitter = ChunkSplitter::new(config);
        let err = splitter
            .split("tiny", &wide_tiny_table(16), &Metadata::new())
            .unwrap_err();
        match err {
            RecordError::UnstableSizeEstimate {
                next_target, floor, ..
            } => assert!(next_target <= floor),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejects_non_positive_target() {
        let err = ChunkSplitter::new(small_config())
            .split_with_target("s", &tick_table(3, 1), &Metadata::new(), 0.0)
            .unwrap_err();
        assert!(matches!(err, RecordError::InvalidConfig { .. }));
    }

    #[test]
    fn tied_timestamps_keep_input_order_across_records() -> TestResult {
        let table = Table::try_new(
            Arc::new(TimestampMillisecondArray::from(vec![2, 2, 1, 2])),
            vec![(
                "pos".to_string(),
                Arc::new(Int64Array::from(vec![0, 1, 2, 3])) as ArrayRef,
            )],
        )?;
        let target = table.memory_footprint()? as f64 / 2.0;
        let records = ChunkSplitter::new(small_config()).split_with_target(
            "ties",
            &table,
            &Metadata::new(),
            target,
        )?;
        assert_eq!(records.len(), 2);
        assert!(records[0].end() <= records[1].start());

        let back = TableAssembler::default().assemble(&records)?;
        let expected = Table::try_new(
            Arc::new(TimestampMillisecondArray::from(vec![1, 2, 2, 2])),
            vec![(
                "pos".to_string(),
                Arc::new(Int64Array::from(vec![2, 0, 1, 3])) as ArrayRef,
            )],
        )?;
        assert_eq!(back, expected);
        assert_eq!(back, table.sort_by_index()?);
        Ok(())
    }

    #[test]
    fn batch_keeps_input_order() -> TestResult {
        let splitter = ChunkSplitter::new(small_config());
        let a = tick_table(10, 1);
        let b = tick_table(20, 2);
        let meta = Metadata::new();
        let records = splitter.split_batch([("a", &a, &meta), ("b", &b, &meta)])?;
        let uids: Vec<_> = records.iter().map(Record::uid).collect();
        assert_eq!(uids, vec!["a", "b"]);
        Ok(())
    }
}
