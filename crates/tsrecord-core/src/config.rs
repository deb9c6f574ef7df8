//! Tunables for record sizing and compression.
//!
//! Defaults mirror the document store this format was designed for: a hard
//! 16 MiB per-document ceiling, records filled to at most 95% of it, and an
//! opening assumption that tables compress at least 4x.

use snafu::prelude::*;

use crate::error::{InvalidConfigSnafu, RecordResult};

/// Hard per-document ceiling of the target document store (16 MiB).
pub const DEFAULT_CEILING: usize = 16 * 1024 * 1024;

/// Fraction of the ceiling a single record may occupy.
pub const DEFAULT_FILL_FACTOR: f64 = 0.95;

/// Assumed compressibility used for the first split attempt.
pub const DEFAULT_INITIAL_COMPRESSIBILITY: f64 = 4.0;

/// A shrunk split target must stay above `ceiling * DEFAULT_SHRINK_FLOOR`.
pub const DEFAULT_SHRINK_FLOOR: f64 = 0.8;

/// LZ4 high-compression level used for column blobs.
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 9;

/// Highest level accepted by LZ4 HC.
pub const MAX_COMPRESSION_LEVEL: i32 = 12;

/// Sizing and compression settings shared by the builder and the splitter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CodecConfig {
    /// Hard ceiling of one serialized record, in bytes.
    pub ceiling: usize,
    /// Fraction of `ceiling` a record may use. Must be in `(0, 1]`.
    pub fill_factor: f64,
    /// Default split target is `ceiling * initial_compressibility`.
    pub initial_compressibility: f64,
    /// Shrunk split targets must exceed `ceiling * shrink_floor`.
    pub shrink_floor: f64,
    /// LZ4 HC compression level (1..=12).
    pub compression_level: i32,
}

impl Default for CodecConfig {
    fn default() -> Self {
        CodecConfig {
            ceiling: DEFAULT_CEILING,
            fill_factor: DEFAULT_FILL_FACTOR,
            initial_compressibility: DEFAULT_INITIAL_COMPRESSIBILITY,
            shrink_floor: DEFAULT_SHRINK_FLOOR,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl CodecConfig {
    /// Replace the per-record ceiling.
    pub fn with_ceiling(mut self, ceiling: usize) -> Self {
        self.ceiling = ceiling;
        self
    }

    /// Replace the LZ4 HC level.
    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    /// Replace the assumed compressibility of the first split attempt.
    pub fn with_initial_compressibility(mut self, factor: f64) -> Self {
        self.initial_compressibility = factor;
        self
    }

    /// Largest number of bytes a record may occupy.
    pub fn document_limit(&self) -> f64 {
        self.ceiling as f64 * self.fill_factor
    }

    /// Split target used when the caller does not supply one.
    pub fn default_target_size(&self) -> f64 {
        self.ceiling as f64 * self.initial_compressibility
    }

    /// Lower bound that a shrunk split target must stay above.
    pub fn shrink_floor_size(&self) -> f64 {
        self.ceiling as f64 * self.shrink_floor
    }

    /// Check that the settings describe a split that can converge.
    pub fn validate(&self) -> RecordResult<()> {
        ensure!(
            self.ceiling > 0,
            InvalidConfigSnafu {
                detail: "ceiling must be positive".to_string(),
            }
        );
        ensure!(
            self.fill_factor > 0.0 && self.fill_factor <= 1.0,
            InvalidConfigSnafu {
                detail: format!("fill_factor {} is outside (0, 1]", self.fill_factor),
            }
        );
        ensure!(
            self.initial_compressibility >= 1.0,
            InvalidConfigSnafu {
                detail: format!(
                    "initial_compressibility {} is below 1",
                    self.initial_compressibility
                ),
            }
        );
        ensure!(
            self.shrink_floor > 0.0 && self.shrink_floor <= self.fill_factor,
            InvalidConfigSnafu {
                detail: format!(
                    "shrink_floor {} is outside (0, fill_factor={}]",
                    self.shrink_floor, self.fill_factor
                ),
            }
        );
        ensure!(
            (1..=MAX_COMPRESSION_LEVEL).contains(&self.compression_level),
            InvalidConfigSnafu {
                detail: format!(
                    "compression_level {} is outside 1..={MAX_COMPRESSION_LEVEL}",
                    self.compression_level
                ),
            }
        );
        Ok(())
    }
}
