use arrow::error::ArrowError;
use parquet::errors::ParquetError;
use snafu::Snafu;
use tsrecord_core::{RecordError, TableShapeError};

pub type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum CliError {
    #[snafu(display("Parquet file not found or not accessible: {path}"))]
    ParquetMissing {
        path: String,
        source: std::io::Error,
    },

    #[snafu(display("Failed to read parquet file {path}: {source}"))]
    ReadParquet { path: String, source: ParquetError },

    #[snafu(display("Failed to write {path}: {source}"))]
    WriteParquet { path: String, source: ParquetError },

    #[snafu(display("Failed to write CSV {path}: {source}"))]
    WriteCsv { path: String, source: ArrowError },

    #[snafu(display("Failed to load record batches of {path}: {source}"))]
    LoadBatches { path: String, source: ArrowError },

    #[snafu(display("Parquet file {path} does not fit a time-indexed table: {source}"))]
    Shape {
        path: String,
        source: TableShapeError,
    },

    #[snafu(display("Invalid --meta '{spec}': expected key=value"))]
    InvalidMeta { spec: String },

    #[snafu(display("Failed to create directory: {path}"))]
    CreateDirAll {
        path: String,
        source: std::io::Error,
    },

    #[snafu(display("Failed to list record directory: {path}"))]
    ListRecords {
        path: String,
        source: std::io::Error,
    },

    #[snafu(display(
        "Refusing to overwrite existing file: {path}. \
         Remove it or write to another directory."
    ))]
    DestAlreadyExists { path: String },

    #[snafu(display("Failed to write record file {path}"))]
    WriteRecord {
        path: String,
        source: std::io::Error,
    },

    #[snafu(display("Failed to read record file {path}"))]
    ReadRecord {
        path: String,
        source: std::io::Error,
    },

    #[snafu(display("Record file {path} is invalid: {source}"))]
    ParseRecord {
        path: String,
        #[snafu(source(from(RecordError, Box::new)))]
        source: Box<RecordError>,
    },

    #[snafu(display("Failed to encode series {uid}: {source}"))]
    Encode {
        uid: String,
        #[snafu(source(from(RecordError, Box::new)))]
        source: Box<RecordError>,
    },

    #[snafu(display("Failed to decode series {uid}: {source}"))]
    Decode {
        uid: String,
        #[snafu(source(from(RecordError, Box::new)))]
        source: Box<RecordError>,
    },

    #[snafu(display("No records for series {uid} in {path}"))]
    SeriesNotFound { uid: String, path: String },

    #[snafu(display("Failed to render summary: {source}"))]
    RenderJson { source: serde_json::Error },
}
