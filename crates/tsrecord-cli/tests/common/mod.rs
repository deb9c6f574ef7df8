#![allow(dead_code)]

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::array::{Float64Builder, Int64Builder, StringBuilder, TimestampMillisecondBuilder};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Write `rows` trade rows with columns `ts`, `price`, `volume`, `venue`,
/// `bid.px`. Timestamps run backwards so the encoder has to sort.
pub fn write_parquet_rows(path: &Path, rows: usize) -> TestResult {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut ts_builder = TimestampMillisecondBuilder::with_capacity(rows);
    let mut price_builder = Float64Builder::with_capacity(rows);
    let mut volume_builder = Int64Builder::with_capacity(rows);
    let mut venue_builder = StringBuilder::new();
    let mut bid_builder = Float64Builder::with_capacity(rows);

    let mut seed = 0xBAD_5EED_u64;
    let base_ts = 1_700_000_000_000i64;
    for i in 0..rows {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
        let rnd = seed >> 16;
        ts_builder.append_value(base_ts + ((rows - 1 - i) as i64) * 1_000);
        price_builder.append_value(100.0 + (rnd % 10_000) as f64 / 100.0);
        volume_builder.append_value(1_000 + (rnd % 5_000) as i64);
        if i % 5 == 0 {
            venue_builder.append_null();
        } else {
            venue_builder.append_value(format!("X{}", (rnd % 7) + 1));
        }
        bid_builder.append_value(99.0 + (rnd % 100) as f64 / 100.0);
    }

    let schema = Schema::new(vec![
        Field::new(
            "ts",
            DataType::Timestamp(TimeUnit::Millisecond, None),
            false,
        ),
        Field::new("price", DataType::Float64, false),
        Field::new("volume", DataType::Int64, false),
        Field::new("venue", DataType::Utf8, true),
        Field::new("bid.px", DataType::Float64, false),
    ]);

    let batch = RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(ts_builder.finish()),
            Arc::new(price_builder.finish()),
            Arc::new(volume_builder.finish()),
            Arc::new(venue_builder.finish()),
            Arc::new(bid_builder.finish()),
        ],
    )?;

    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

/// Read a Parquet file back as a single batch.
pub fn read_parquet(path: &Path) -> TestResult<RecordBatch> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?;
    let schema = builder.schema().clone();
    let batches = builder.build()?.collect::<Result<Vec<_>, _>>()?;
    Ok(arrow::compute::concat_batches(&schema, &batches)?)
}
