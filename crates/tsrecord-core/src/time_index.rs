//! Time index validation and ordering.
//!
//! Every table carries a row index that must be an Arrow `Timestamp` array
//! (any unit, with or without timezone) and must not contain nulls. All four
//! timestamp units store `i64` values, so once validated the index is handled
//! as a plain `&[i64]` plus its unit.

use arrow::array::{Array, ArrayRef, AsArray, UInt64Array};
use arrow::datatypes::{
    DataType, TimeUnit, TimestampMicrosecondType, TimestampMillisecondType,
    TimestampNanosecondType, TimestampSecondType,
};
use chrono::{DateTime, TimeZone, Utc};
use snafu::Snafu;

/// Reasons a row index is not a usable time index.
#[derive(Debug, Snafu, Clone, PartialEq, Eq)]
pub enum TimeIndexError {
    /// The index is not an Arrow timestamp array.
    #[snafu(display("index has type {datatype}, expected Timestamp"))]
    UnsupportedType {
        /// Display form of the offending Arrow type.
        datatype: String,
    },

    /// The index contains null entries.
    #[snafu(display("index contains {count} null value(s)"))]
    ContainsNulls {
        /// Number of nulls found.
        count: usize,
    },

    /// A raw timestamp value cannot be represented as a `DateTime<Utc>`.
    #[snafu(display("timestamp value {value} ({unit:?}) is out of range"))]
    OutOfRange {
        /// The raw value.
        value: i64,
        /// Unit the value is expressed in.
        unit: TimeUnit,
    },
}

/// A validated, borrowed view over a timestamp index.
#[derive(Debug, Clone, Copy)]
pub struct TimeIndexView<'a> {
    values: &'a [i64],
    unit: TimeUnit,
}

impl<'a> TimeIndexView<'a> {
    /// Validate `index` and borrow its raw values.
    pub fn try_new(index: &'a ArrayRef) -> Result<Self, TimeIndexError> {
        let unit = match index.data_type() {
            DataType::Timestamp(unit, _) => *unit,
            other => {
                return Err(TimeIndexError::UnsupportedType {
                    datatype: other.to_string(),
                });
            }
        };

        if index.null_count() > 0 {
            return Err(TimeIndexError::ContainsNulls {
                count: index.null_count(),
            });
        }

        let values: &[i64] = match unit {
            TimeUnit::Second => index.as_primitive::<TimestampSecondType>().values(),
            TimeUnit::Millisecond => index.as_primitive::<TimestampMillisecondType>().values(),
            TimeUnit::Microsecond => index.as_primitive::<TimestampMicrosecondType>().values(),
            TimeUnit::Nanosecond => index.as_primitive::<TimestampNanosecondType>().values(),
        };

        Ok(TimeIndexView { values, unit })
    }

    /// Raw values in the index's unit.
    pub fn values(&self) -> &'a [i64] {
        self.values
    }

    /// Unit of the raw values.
    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    /// First and last timestamps, or `None` for an empty index.
    pub fn first_last(&self) -> Result<Option<(DateTime<Utc>, DateTime<Utc>)>, TimeIndexError> {
        match (self.values.first(), self.values.last()) {
            (Some(&first), Some(&last)) => Ok(Some((
                ts_from_i64(self.unit, first)?,
                ts_from_i64(self.unit, last)?,
            ))),
            _ => Ok(None),
        }
    }

    /// Permutation that stably sorts the index ascending.
    ///
    /// Returns `None` when the index is already non-decreasing so callers can
    /// skip the `take`.
    pub fn stable_sort_permutation(&self) -> Option<UInt64Array> {
        if self.values.is_sorted() {
            return None;
        }

        let mut order: Vec<u64> = (0..self.values.len() as u64).collect();
        // `sort_by_key` is stable: equal timestamps keep their input order.
        order.sort_by_key(|&i| self.values[i as usize]);
        Some(UInt64Array::from(order))
    }
}

/// Convert a raw timestamp in `unit` to `DateTime<Utc>`.
pub fn ts_from_i64(unit: TimeUnit, value: i64) -> Result<DateTime<Utc>, TimeIndexError> {
    let dt_opt = match unit {
        TimeUnit::Second => Utc.timestamp_opt(value, 0),
        TimeUnit::Millisecond => Utc.timestamp_millis_opt(value),
        TimeUnit::Microsecond => Utc.timestamp_micros(value),
        TimeUnit::Nanosecond => {
            let secs = value.div_euclid(1_000_000_000);
            let nanos = value.rem_euclid(1_000_000_000) as u32;
            Utc.timestamp_opt(secs, nanos)
        }
    };

    dt_opt.single().ok_or(TimeIndexError::OutOfRange { value, unit })
}
