//! Caller metadata attached to every record.
//!
//! Values form a closed union of the types the document store can represent,
//! so anything that reaches a record is guaranteed to round-trip through it.
//!
//! Two keys are reserved: [`ROW_COUNT_KEY`] and [`BINARY_SIZE_KEY`]. The
//! builder always overwrites them with the derived values of the record.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reserved key holding the number of rows in the record.
pub const ROW_COUNT_KEY: &str = "row_count";

/// Reserved key holding the summed size of all column blobs.
pub const BINARY_SIZE_KEY: &str = "binary_size";

/// Ordered key/value metadata.
pub type Metadata = BTreeMap<String, MetaValue>;

/// One metadata value.
///
/// MessagePack layout example: `{"int": 42}`, `{"map": {"venue": {"str": "XNAS"}}}`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum MetaValue {
    /// UTF-8 string.
    Str(String),
    /// Signed 64-bit integer.
    Int(i64),
    /// 64-bit float.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// Instant in UTC.
    Timestamp(DateTime<Utc>),
    /// Nested map of the same value types.
    Map(BTreeMap<String, MetaValue>),
}

impl MetaValue {
    /// The integer payload, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            MetaValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The string payload, if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        MetaValue::Str(v.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        MetaValue::Str(v)
    }
}

impl From<i64> for MetaValue {
    fn from(v: i64) -> Self {
        MetaValue::Int(v)
    }
}

impl From<f64> for MetaValue {
    fn from(v: f64) -> Self {
        MetaValue::Float(v)
    }
}

impl From<bool> for MetaValue {
    fn from(v: bool) -> Self {
        MetaValue::Bool(v)
    }
}

impl From<DateTime<Utc>> for MetaValue {
    fn from(v: DateTime<Utc>) -> Self {
        MetaValue::Timestamp(v)
    }
}

impl From<BTreeMap<String, MetaValue>> for MetaValue {
    fn from(v: BTreeMap<String, MetaValue>) -> Self {
        MetaValue::Map(v)
    }
}

/// Copy `caller` and set the reserved keys. Derived values win over caller
/// entries of the same name.
pub(crate) fn with_derived(caller: &Metadata, row_count: usize, binary_size: u64) -> Metadata {
    let mut out = caller.clone();
    out.insert(ROW_COUNT_KEY.to_string(), MetaValue::Int(row_count as i64));
    out.insert(
        BINARY_SIZE_KEY.to_string(),
        MetaValue::Int(binary_size as i64),
    );
    out
}
