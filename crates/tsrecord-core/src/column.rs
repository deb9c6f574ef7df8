//! One column's stored form: blob, dtype tag, length and checksum.

use arrow::array::{Array, ArrayRef};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::codec::{ColumnCodec, ColumnCodecError};
use crate::error::{ChecksumMismatchSnafu, CorruptEncodingSnafu, CorruptRecordSnafu, RecordResult};

/// An encoded array plus what is needed to verify and type-check it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColumnRecord {
    /// Arrow `DataType` display string of the encoded array.
    pub dtype: String,
    /// Compressed blob produced by [`ColumnCodec::encode`].
    pub data: Bytes,
    /// BLAKE3 digest of `data`.
    pub checksum: Bytes,
    /// Length of `data` in bytes.
    pub size: u64,
}

impl ColumnRecord {
    /// Encode `array` and wrap the blob.
    pub fn build(
        codec: &ColumnCodec,
        column: &str,
        array: &dyn Array,
    ) -> Result<Self, ColumnCodecError> {
        let data = codec.encode(column, array)?;
        Ok(ColumnRecord {
            dtype: array.data_type().to_string(),
            checksum: Bytes::copy_from_slice(blake3::hash(&data).as_bytes()),
            size: data.len() as u64,
            data: Bytes::from(data),
        })
    }

    /// The stored checksum as a BLAKE3 hash, `None` unless it is 32 bytes.
    pub fn stored_hash(&self) -> Option<blake3::Hash> {
        <[u8; blake3::OUT_LEN]>::try_from(self.checksum.as_ref())
            .ok()
            .map(blake3::Hash::from)
    }

    /// Hex form of the stored checksum.
    pub fn checksum_hex(&self) -> Option<String> {
        self.stored_hash().map(|hash| hash.to_hex().to_string())
    }

    /// Check `size` and the checksum against `data`.
    pub fn verify(&self, uid: &str, column: &str) -> RecordResult<()> {
        ensure!(
            self.size == self.data.len() as u64,
            CorruptRecordSnafu {
                uid,
                detail: format!(
                    "column {column} declares {} bytes but holds {}",
                    self.size,
                    self.data.len()
                ),
            }
        );

        let Some(expected) = self.stored_hash() else {
            return CorruptRecordSnafu {
                uid,
                detail: format!(
                    "column {column} has a {}-byte checksum, expected {}",
                    self.checksum.len(),
                    blake3::OUT_LEN
                ),
            }
            .fail();
        };

        let actual = blake3::hash(&self.data);
        ensure!(
            actual == expected,
            ChecksumMismatchSnafu {
                uid,
                column,
                expected: expected.to_hex().to_string(),
                actual: actual.to_hex().to_string(),
            }
        );
        Ok(())
    }

    /// Verify, decode and check the decoded type against `dtype`.
    pub fn decode(&self, codec: &ColumnCodec, uid: &str, column: &str) -> RecordResult<ArrayRef> {
        self.verify(uid, column)?;
        let array = codec
            .decode(&self.data)
            .context(CorruptEncodingSnafu { uid, column })?;

        let decoded = array.data_type().to_string();
        ensure!(
            decoded == self.dtype,
            CorruptRecordSnafu {
                uid,
                detail: format!(
                    "column {column} is tagged {} but decodes as {decoded}",
                    self.dtype
                ),
            }
        );
        Ok(array)
    }
}
