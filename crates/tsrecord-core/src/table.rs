//! In-memory time-indexed table.
//!
//! A [`Table`] is a row index plus an ordered list of named, equal-length
//! Arrow columns. It is the transient input of the write path and the output
//! of the read path; records never keep a reference to one.
//!
//! The index is stored apart from the columns and its name is not kept: a
//! table converted from a `RecordBatch` drops the time column's name and
//! [`Table::to_record_batch`] asks for one back.

use std::collections::HashSet;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef};
use arrow::compute;
use arrow::datatypes::{Field, Schema};
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use snafu::prelude::*;

use crate::time_index::{TimeIndexError, TimeIndexView};

/// Shape violations when constructing or converting a [`Table`].
#[derive(Debug, Snafu)]
pub enum TableShapeError {
    /// A column's length differs from the index length.
    #[snafu(display("Column {column} has {actual} rows, index has {expected}"))]
    LengthMismatch {
        /// Name of the offending column.
        column: String,
        /// Index length.
        expected: usize,
        /// Column length.
        actual: usize,
    },

    /// The same column name appears twice.
    #[snafu(display("Duplicate column name {name:?}"))]
    DuplicateColumn {
        /// The repeated name.
        name: String,
    },

    /// The requested time column is not part of the batch schema.
    #[snafu(display("Time column {column} not found in record batch"))]
    MissingTimeColumn {
        /// The requested column name.
        column: String,
    },

    /// Arrow rejected a conversion or measurement.
    #[snafu(display("Arrow error: {source}"))]
    TableArrow {
        /// Underlying Arrow error.
        source: ArrowError,
    },
}

/// A time-ordered row index plus named, equal-length columns.
#[derive(Debug, Clone)]
pub struct Table {
    index: ArrayRef,
    columns: Vec<(String, ArrayRef)>,
}

impl PartialEq for Table {
    /// Same index, same column names in the same order, same values and types.
    fn eq(&self, other: &Self) -> bool {
        self.index.as_ref() == other.index.as_ref()
            && self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(&other.columns)
                .all(|((a_name, a), (b_name, b))| a_name == b_name && a.as_ref() == b.as_ref())
    }
}

impl Table {
    /// Build a table, checking equal lengths and unique column names.
    ///
    /// The index type is not checked here; the builder validates it so that a
    /// wrongly typed index surfaces as `InvalidIndex` with the series uid.
    pub fn try_new(
        index: ArrayRef,
        columns: Vec<(String, ArrayRef)>,
    ) -> Result<Self, TableShapeError> {
        let expected = index.len();
        let mut seen = HashSet::with_capacity(columns.len());

        for (name, values) in &columns {
            ensure!(
                values.len() == expected,
                LengthMismatchSnafu {
                    column: name.clone(),
                    expected,
                    actual: values.len(),
                }
            );
            ensure!(
                seen.insert(name.as_str()),
                DuplicateColumnSnafu { name: name.clone() }
            );
        }

        Ok(Table { index, columns })
    }

    /// Split a `RecordBatch` into index (`time_column`) and data columns.
    ///
    /// Remaining columns keep their schema order.
    pub fn from_record_batch(
        batch: &RecordBatch,
        time_column: &str,
    ) -> Result<Self, TableShapeError> {
        let schema = batch.schema();
        let ts_idx = schema
            .index_of(time_column)
            .map_err(|_| TableShapeError::MissingTimeColumn {
                column: time_column.to_string(),
            })?;

        let columns = schema
            .fields()
            .iter()
            .zip(batch.columns())
            .enumerate()
            .filter(|(i, _)| *i != ts_idx)
            .map(|(_, (field, values))| (field.name().clone(), values.clone()))
            .collect();

        Table::try_new(batch.column(ts_idx).clone(), columns)
    }

    /// Convert back to a `RecordBatch`, naming the index `index_name`.
    ///
    /// The index becomes the first field.
    pub fn to_record_batch(&self, index_name: &str) -> Result<RecordBatch, TableShapeError> {
        let mut fields = Vec::with_capacity(self.columns.len() + 1);
        let mut arrays = Vec::with_capacity(self.columns.len() + 1);

        fields.push(Field::new(
            index_name,
            self.index.data_type().clone(),
            self.index.null_count() > 0,
        ));
        arrays.push(self.index.clone());

        for (name, values) in &self.columns {
            fields.push(Field::new(name, values.data_type().clone(), true));
            arrays.push(values.clone());
        }

        RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays).context(TableArrowSnafu)
    }

    /// Number of rows.
    pub fn num_rows(&self) -> usize {
        self.index.len()
    }

    /// True when the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// The row index.
    pub fn index(&self) -> &ArrayRef {
        &self.index
    }

    /// Columns in order, as `(name, values)` pairs.
    pub fn columns(&self) -> &[(String, ArrayRef)] {
        &self.columns
    }

    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&ArrayRef> {
        self.columns
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values)
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Zero-copy view of rows `offset..offset + len`.
    ///
    /// Panics if the range is out of bounds, like `Array::slice`.
    pub fn slice(&self, offset: usize, len: usize) -> Table {
        Table {
            index: self.index.slice(offset, len),
            columns: self
                .columns
                .iter()
                .map(|(name, values)| (name.clone(), values.slice(offset, len)))
                .collect(),
        }
    }

    /// Uncompressed in-memory size of the index and every column, in bytes.
    ///
    /// Only the bytes addressed by this (possibly sliced) table count, so
    /// slices of one large table sum to roughly the parent's footprint.
    pub fn memory_footprint(&self) -> Result<usize, TableShapeError> {
        let mut total = self
            .index
            .to_data()
            .get_slice_memory_size()
            .context(TableArrowSnafu)?;
        for (_, values) in &self.columns {
            total += values
                .to_data()
                .get_slice_memory_size()
                .context(TableArrowSnafu)?;
        }
        Ok(total)
    }

    /// Stable ascending sort of all rows by the time index.
    ///
    /// Returns the table unchanged (no copy) when it is already sorted.
    pub fn sort_by_index(&self) -> Result<Table, SortError> {
        let view = TimeIndexView::try_new(&self.index).context(SortIndexSnafu)?;
        let Some(perm) = view.stable_sort_permutation() else {
            return Ok(self.clone());
        };

        let index = compute::take(self.index.as_ref(), &perm, None).context(SortArrowSnafu)?;
        let columns = self
            .columns
            .iter()
            .map(|(name, values)| {
                compute::take(values.as_ref(), &perm, None).map(|taken| (name.clone(), taken))
            })
            .collect::<Result<Vec<_>, _>>()
            .context(SortArrowSnafu)?;

        Ok(Table { index, columns })
    }

    /// Stack tables row-wise. All tables must share column names, order and
    /// types; the caller is responsible for checking that first.
    pub(crate) fn concat(tables: &[Table]) -> Result<Table, ArrowError> {
        let Some(first) = tables.first() else {
            return Err(ArrowError::InvalidArgumentError(
                "cannot concatenate zero tables".to_string(),
            ));
        };
        if tables.len() == 1 {
            return Ok(first.clone());
        }

        let indexes: Vec<&dyn Array> = tables.iter().map(|t| t.index.as_ref()).collect();
        let index = compute::concat(&indexes)?;

        let mut columns = Vec::with_capacity(first.columns.len());
        for (pos, (name, _)) in first.columns.iter().enumerate() {
            let parts: Vec<&dyn Array> = tables.iter().map(|t| t.columns[pos].1.as_ref()).collect();
            columns.push((name.clone(), compute::concat(&parts)?));
        }

        Ok(Table { index, columns })
    }
}

/// Failure to sort a table by its index.
#[derive(Debug, Snafu)]
pub enum SortError {
    /// The index is not a valid time index.
    #[snafu(display("Cannot sort by index: {source}"))]
    SortIndex {
        /// Why the index was rejected.
        source: TimeIndexError,
    },

    /// Arrow `take` failed.
    #[snafu(display("Failed to reorder rows: {source}"))]
    SortArrow {
        /// Underlying Arrow error.
        source: ArrowError,
    },
}
