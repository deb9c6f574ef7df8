//! Records back to tables.
//!
//! [`DocumentReader`] decodes one record, verifying every blob before
//! decoding it. [`TableAssembler`] decodes the records of one series,
//! stacks them and restores global time order, whatever order the records
//! arrive in.

use std::collections::BTreeSet;
use std::fmt;

use arrow::array::{Array, ArrayRef};
use snafu::prelude::*;

use crate::builder::sort_rows;
use crate::codec::ColumnCodec;
use crate::column::ColumnRecord;
use crate::error::{
    ArrowSnafu, CorruptRecordSnafu, EmptyRecordSetSnafu, InvalidTableSnafu, MixedSeriesSnafu,
    RecordResult, SchemaMismatchSnafu,
};
use crate::observe::{SharedObserver, default_observer};
use crate::record::{INDEX_COLUMN, Record};
use crate::table::Table;

/// Decodes single records.
#[derive(Clone)]
pub struct DocumentReader {
    codec: ColumnCodec,
    observer: SharedObserver,
}

impl fmt::Debug for DocumentReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentReader").finish_non_exhaustive()
    }
}

impl Default for DocumentReader {
    fn default() -> Self {
        DocumentReader::with_observer(default_observer())
    }
}

impl DocumentReader {
    /// Reader reporting to `observer`.
    pub fn with_observer(observer: SharedObserver) -> Self {
        DocumentReader {
            // The level only matters when encoding.
            codec: ColumnCodec::new(crate::config::DEFAULT_COMPRESSION_LEVEL, observer.clone()),
            observer,
        }
    }

    /// Decode every column of `record`, in stored order.
    pub fn read(&self, record: &Record) -> RecordResult<Table> {
        let selected: Vec<(&str, &ColumnRecord)> = record.columns().iter().collect();
        self.decode(record, &selected)
    }

    /// Decode only `names`, in the order given. The index is always decoded.
    ///
    /// Names the record does not have are reported through
    /// [`crate::CodecObserver::columns_not_found`] and skipped. Repeated names
    /// are decoded once.
    pub fn read_columns(&self, record: &Record, names: &[&str]) -> RecordResult<Table> {
        let wanted = self.present_columns(record, names);
        let selected: Vec<(&str, &ColumnRecord)> = wanted
            .into_iter()
            .filter_map(|name| record.column(name).map(|column| (name, column)))
            .collect();
        self.decode(record, &selected)
    }

    /// Dedupe `names` and drop (and report) those `record` does not have.
    fn present_columns<'n>(&self, record: &Record, names: &[&'n str]) -> Vec<&'n str> {
        let mut present = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        let mut seen = BTreeSet::new();

        for &name in names {
            if !seen.insert(name) {
                continue;
            }
            if record.column(name).is_some() {
                present.push(name);
            } else {
                missing.push(name.to_string());
            }
        }

        if !missing.is_empty() {
            self.observer.columns_not_found(record.uid(), &missing);
        }
        present
    }

    fn decode(&self, record: &Record, selected: &[(&str, &ColumnRecord)]) -> RecordResult<Table> {
        record.check_consistency()?;
        let uid = record.uid();

        let index = record.index().decode(&self.codec, uid, INDEX_COLUMN)?;
        let rows = index.len();
        ensure!(
            rows as u64 == record.row_count(),
            CorruptRecordSnafu {
                uid,
                detail: format!(
                    "row_count is {} but the index has {rows} rows",
                    record.row_count()
                ),
            }
        );

        let mut columns: Vec<(String, ArrayRef)> = Vec::with_capacity(selected.len());
        for (name, column) in selected {
            let values = column.decode(&self.codec, uid, name)?;
            ensure!(
                values.len() == rows,
                CorruptRecordSnafu {
                    uid,
                    detail: format!("column {name} has {} rows, index has {rows}", values.len()),
                }
            );
            columns.push((name.to_string(), values));
        }

        Table::try_new(index, columns).context(InvalidTableSnafu)
    }
}

/// Rebuilds one series from its records.
#[derive(Debug, Clone, Default)]
pub struct TableAssembler {
    reader: DocumentReader,
}

impl TableAssembler {
    /// Assembler decoding with `reader`.
    pub fn new(reader: DocumentReader) -> Self {
        TableAssembler { reader }
    }

    /// Decode, stack and globally sort the records of one series.
    ///
    /// All records must share a uid and the same set of `(name, dtype)`
    /// columns; the first record's column order is kept.
    pub fn assemble(&self, records: &[Record]) -> RecordResult<Table> {
        self.assemble_projected(records, None)
    }

    /// Like [`TableAssembler::assemble`], decoding only `names` in the order
    /// given. Unknown names are reported once and skipped.
    pub fn assemble_columns(&self, records: &[Record], names: &[&str]) -> RecordResult<Table> {
        self.assemble_projected(records, Some(names))
    }

    fn assemble_projected(
        &self,
        records: &[Record],
        names: Option<&[&str]>,
    ) -> RecordResult<Table> {
        let Some(first) = records.first() else {
            return EmptyRecordSetSnafu.fail();
        };
        let uid = first.uid();
        let expected = signature(first);

        for record in &records[1..] {
            ensure!(
                record.uid() == uid,
                MixedSeriesSnafu {
                    expected: uid,
                    found: record.uid(),
                }
            );
            let found = signature(record);
            ensure!(
                found == expected,
                SchemaMismatchSnafu {
                    uid,
                    expected: describe(&expected),
                    found: describe(&found),
                }
            );
        }

        let wanted = match names {
            Some(names) => self.reader.present_columns(first, names),
            None => first.column_names(),
        };

        let mut ordered: Vec<&Record> = records.iter().collect();
        ordered.sort_by_key(|r| (r.start(), r.end()));

        let mut tables = Vec::with_capacity(ordered.len());
        for record in ordered {
            let selected: Vec<(&str, &ColumnRecord)> = wanted
                .iter()
                .filter_map(|&name| record.column(name).map(|column| (name, column)))
                .collect();
            tables.push(self.reader.decode(record, &selected)?);
        }

        let stacked = Table::concat(&tables).context(ArrowSnafu { uid })?;
        sort_rows(uid, &stacked)
    }
}

fn signature(record: &Record) -> BTreeSet<(String, String)> {
    std::iter::once((INDEX_COLUMN, record.index()))
        .chain(record.columns().iter())
        .map(|(name, column)| (name.to_string(), column.dtype.clone()))
        .collect()
}

fn describe(signature: &BTreeSet<(String, String)>) -> Vec<String> {
    signature
        .iter()
        .map(|(name, dtype)| format!("{name}: {dtype}"))
        .collect()
}
