//! Single-array codec: Arrow array <-> compressed blob.
//!
//! Layout of a blob:
//!
//! ```text
//! [u32 LE uncompressed length][LZ4 block of an Arrow IPC stream]
//! ```
//!
//! The IPC stream holds a one-field schema (field name `values`) and at most
//! one record batch, so element type, length, validity and byte order all
//! travel with the blob and nothing outside it is needed to decode it.

use std::fmt;
use std::io::Cursor;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, new_empty_array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use arrow::ipc::reader::StreamReader;
use arrow::ipc::writer::StreamWriter;
use arrow::record_batch::RecordBatch;
use lz4::block::CompressionMode;
use snafu::prelude::*;

use crate::config::DEFAULT_COMPRESSION_LEVEL;
use crate::observe::{SharedObserver, default_observer};

const FIELD_NAME: &str = "values";
const SIZE_PREFIX_LEN: usize = 4;
/// LZ4 cannot expand input by more than this factor.
const MAX_EXPANSION: usize = 255;

/// Failures turning one array into a blob or back.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ColumnCodecError {
    /// LZ4 compression failed.
    #[snafu(display("LZ4 compression failed: {source}"))]
    Compress {
        /// Underlying I/O error from the LZ4 binding.
        source: std::io::Error,
    },

    /// Writing the Arrow IPC stream failed.
    #[snafu(display("Arrow IPC write failed: {source}"))]
    IpcWrite {
        /// Underlying Arrow error.
        source: ArrowError,
    },

    /// The LZ4 block could not be decompressed.
    #[snafu(display("LZ4 decompression failed: {source}"))]
    Decompress {
        /// Underlying I/O error from the LZ4 binding.
        source: std::io::Error,
    },

    /// The size prefix is missing or claims an impossible length.
    #[snafu(display(
        "Declared uncompressed size {declared} is impossible for a {compressed}-byte blob"
    ))]
    DeclaredSize {
        /// Size from the prefix (0 when the prefix itself is missing).
        declared: u64,
        /// Length of the whole blob.
        compressed: usize,
    },

    /// The decompressed bytes are not a readable Arrow IPC stream.
    #[snafu(display("Arrow IPC read failed: {source}"))]
    IpcRead {
        /// Underlying Arrow error.
        source: ArrowError,
    },

    /// The IPC stream is readable but not the single-array layout.
    #[snafu(display("Unexpected blob layout: {detail}"))]
    Shape {
        /// What did not match.
        detail: String,
    },
}

/// True for types stored as fixed-width buffers.
pub fn is_fixed_width(datatype: &DataType) -> bool {
    datatype.is_primitive()
        || matches!(
            datatype,
            DataType::Boolean | DataType::FixedSizeBinary(_) | DataType::Null
        )
}

/// Encoder/decoder for a single array.
#[derive(Clone)]
pub struct ColumnCodec {
    level: i32,
    observer: SharedObserver,
}

impl fmt::Debug for ColumnCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnCodec")
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

impl Default for ColumnCodec {
    fn default() -> Self {
        ColumnCodec::new(DEFAULT_COMPRESSION_LEVEL, default_observer())
    }
}

impl ColumnCodec {
    /// Codec compressing at LZ4 HC `level`, reporting to `observer`.
    pub fn new(level: i32, observer: SharedObserver) -> Self {
        ColumnCodec { level, observer }
    }

    /// Compression level in use.
    pub fn level(&self) -> i32 {
        self.level
    }

    /// Encode `array`. `column` only labels observer events.
    ///
    /// Variable-width and nested types are accepted but reported through
    /// [`crate::CodecObserver::opaque_column`].
    pub fn encode(&self, column: &str, array: &dyn Array) -> Result<Vec<u8>, ColumnCodecError> {
        let datatype = array.data_type();
        if !is_fixed_width(datatype) {
            self.observer.opaque_column(column, datatype);
        }

        let schema = Arc::new(Schema::new(vec![Field::new(
            FIELD_NAME,
            datatype.clone(),
            true,
        )]));
        let batch = RecordBatch::try_new(schema.clone(), vec![array.slice(0, array.len())])
            .context(IpcWriteSnafu)?;

        let mut ipc = Vec::new();
        {
            let mut writer = StreamWriter::try_new(&mut ipc, &schema).context(IpcWriteSnafu)?;
            writer.write(&batch).context(IpcWriteSnafu)?;
            writer.finish().context(IpcWriteSnafu)?;
        }

        lz4::block::compress(
            &ipc,
            Some(CompressionMode::HIGHCOMPRESSION(self.level)),
            true,
        )
        .context(CompressSnafu)
    }

    /// Decode a blob produced by [`ColumnCodec::encode`].
    pub fn decode(&self, blob: &[u8]) -> Result<ArrayRef, ColumnCodecError> {
        let declared = declared_size(blob)?;
        let limit = MAX_EXPANSION * (blob.len() - SIZE_PREFIX_LEN) + 64;
        ensure!(
            declared <= limit && declared <= i32::MAX as usize,
            DeclaredSizeSnafu {
                declared: declared as u64,
                compressed: blob.len(),
            }
        );

        let ipc = lz4::block::decompress(blob, None).context(DecompressSnafu)?;
        ensure!(
            ipc.len() == declared,
            ShapeSnafu {
                detail: format!(
                    "decompressed {} bytes, prefix declared {declared}",
                    ipc.len()
                ),
            }
        );

        let reader = StreamReader::try_new(Cursor::new(ipc), None).context(IpcReadSnafu)?;
        let schema = reader.schema();
        ensure!(
            schema.fields().len() == 1,
            ShapeSnafu {
                detail: format!("expected 1 field, found {}", schema.fields().len()),
            }
        );
        let datatype = schema.field(0).data_type().clone();

        let mut batches = Vec::with_capacity(1);
        for batch in reader {
            batches.push(batch.context(IpcReadSnafu)?);
        }

        match batches.as_slice() {
            [] => Ok(new_empty_array(&datatype)),
            [batch] => Ok(batch.column(0).clone()),
            more => ShapeSnafu {
                detail: format!("expected at most 1 record batch, found {}", more.len()),
            }
            .fail(),
        }
    }
}

fn declared_size(blob: &[u8]) -> Result<usize, ColumnCodecError> {
    match blob.first_chunk::<SIZE_PREFIX_LEN>() {
        Some(prefix) => Ok(u32::from_le_bytes(*prefix) as usize),
        None => DeclaredSizeSnafu {
            declared: 0_u64,
            compressed: blob.len(),
        }
        .fail(),
    }
}
