//! Parquet and CSV in and out of [`Table`]s.

use std::fs::File;
use std::path::Path;

use arrow::compute::concat_batches;
use arrow::csv::WriterBuilder;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use snafu::ResultExt;
use tsrecord_core::Table;

use crate::error::{
    CliResult, LoadBatchesSnafu, ParquetMissingSnafu, ReadParquetSnafu, ShapeSnafu,
    WriteCsvSnafu, WriteParquetSnafu,
};

/// Load a whole Parquet file as one table indexed by `time_column`.
pub fn read_parquet_table(path: &Path, time_column: &str) -> CliResult<Table> {
    let display = path.display().to_string();
    let file = File::open(path).context(ParquetMissingSnafu { path: &display })?;

    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context(ReadParquetSnafu { path: &display })?;
    let schema = builder.schema().clone();
    let reader = builder.build().context(ReadParquetSnafu { path: &display })?;

    let batches = reader
        .collect::<Result<Vec<_>, _>>()
        .context(LoadBatchesSnafu { path: &display })?;
    let batch = concat_batches(&schema, &batches).context(LoadBatchesSnafu { path: &display })?;

    Table::from_record_batch(&batch, time_column).context(ShapeSnafu { path: display })
}

/// Write `table` as Parquet, index first under `time_column`.
pub fn write_parquet_table(path: &Path, table: &Table, time_column: &str) -> CliResult<()> {
    let display = path.display().to_string();
    let batch = to_batch(table, time_column, &display)?;

    let file = File::create(path)
        .map_err(parquet::errors::ParquetError::from)
        .context(WriteParquetSnafu { path: &display })?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)
        .context(WriteParquetSnafu { path: &display })?;
    writer
        .write(&batch)
        .context(WriteParquetSnafu { path: &display })?;
    writer.close().context(WriteParquetSnafu { path: display })?;
    Ok(())
}

/// Write `table` as CSV with a header row, index first under `time_column`.
pub fn write_csv_table(path: &Path, table: &Table, time_column: &str) -> CliResult<()> {
    let display = path.display().to_string();
    let batch = to_batch(table, time_column, &display)?;

    let file = File::create(path)
        .map_err(arrow::error::ArrowError::from)
        .context(WriteCsvSnafu { path: &display })?;
    let mut writer = WriterBuilder::new().with_header(true).build(file);
    writer.write(&batch).context(WriteCsvSnafu { path: display })?;
    Ok(())
}

fn to_batch(table: &Table, time_column: &str, path: &str) -> CliResult<RecordBatch> {
    table
        .to_record_batch(time_column)
        .context(ShapeSnafu { path })
}
