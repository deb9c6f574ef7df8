//! The durable unit: one self-contained, size-bounded record.
//!
//! Records are immutable once built. They serialize to MessagePack with named
//! fields; [`Record::to_bytes`] and [`Record::from_bytes`] are the boundary to
//! whatever store persists them.

use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use snafu::prelude::*;

use crate::column::ColumnRecord;
use crate::error::{CorruptRecordSnafu, DeserializeSnafu, RecordResult, SerializeSnafu};
use crate::metadata::{BINARY_SIZE_KEY, MetaValue, Metadata, ROW_COUNT_KEY};

/// Column name used for the time index in errors and observer events.
pub const INDEX_COLUMN: &str = "<index>";

/// Ordered mapping from normalized column name to its stored form.
///
/// Serializes as a map in insertion order. Deserializing a map with a
/// repeated key fails.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ColumnMap(Vec<(String, ColumnRecord)>);

impl ColumnMap {
    pub(crate) fn from_entries(entries: Vec<(String, ColumnRecord)>) -> Self {
        ColumnMap(entries)
    }

    /// Entries in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ColumnRecord)> {
        self.0.iter().map(|(name, rec)| (name.as_str(), rec))
    }

    /// Look up one column.
    pub fn get(&self, name: &str) -> Option<&ColumnRecord> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, rec)| rec)
    }

    /// Names in order.
    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there are no data columns.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for ColumnMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, rec) in &self.0 {
            map.serialize_entry(name, rec)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ColumnMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ColumnMapVisitor;

        impl<'de> Visitor<'de> for ColumnMapVisitor {
            type Value = ColumnMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of column name to column record")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<ColumnMap, A::Error> {
                let mut entries: Vec<(String, ColumnRecord)> =
                    Vec::with_capacity(access.size_hint().unwrap_or(0));
                let mut seen = HashSet::new();
                while let Some((name, rec)) = access.next_entry::<String, ColumnRecord>()? {
                    if !seen.insert(name.clone()) {
                        return Err(de::Error::custom(format!("duplicate column {name:?}")));
                    }
                    entries.push((name, rec));
                }
                Ok(ColumnMap(entries))
            }
        }

        deserializer.deserialize_map(ColumnMapVisitor)
    }
}

/// One encoded (sub-)table of a series.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Record {
    uid: String,
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
    metadata: Metadata,
    index: ColumnRecord,
    columns: ColumnMap,
}

impl Record {
    pub(crate) fn new(
        uid: String,
        span: Option<(DateTime<Utc>, DateTime<Utc>)>,
        metadata: Metadata,
        index: ColumnRecord,
        columns: ColumnMap,
    ) -> Self {
        Record {
            uid,
            start: span.map(|(s, _)| s),
            end: span.map(|(_, e)| e),
            metadata,
            index,
            columns,
        }
    }

    /// Series identifier.
    pub fn uid(&self) -> &str {
        &self.uid
    }

    /// First index value, `None` for an empty record.
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    /// Last index value, `None` for an empty record.
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.end
    }

    /// Caller metadata plus the derived `row_count` and `binary_size`.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Number of rows.
    pub fn row_count(&self) -> u64 {
        self.derived(ROW_COUNT_KEY).unwrap_or(0)
    }

    /// Sum of all blob sizes, index included.
    pub fn binary_size(&self) -> u64 {
        self.derived(BINARY_SIZE_KEY).unwrap_or(0)
    }

    /// Stored time index.
    pub fn index(&self) -> &ColumnRecord {
        &self.index
    }

    /// Stored data columns.
    pub fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    /// Look up one data column.
    pub fn column(&self, name: &str) -> Option<&ColumnRecord> {
        self.columns.get(name)
    }

    /// Data column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.names()
    }

    /// Serialize to MessagePack.
    pub fn to_bytes(&self) -> RecordResult<Vec<u8>> {
        rmp_serde::to_vec_named(self).context(SerializeSnafu { uid: &self.uid })
    }

    /// Parse MessagePack bytes and check record-level consistency.
    pub fn from_bytes(bytes: &[u8]) -> RecordResult<Record> {
        let record: Record = rmp_serde::from_slice(bytes).context(DeserializeSnafu)?;
        record.check_consistency()?;
        Ok(record)
    }

    fn derived(&self, key: &str) -> Option<u64> {
        self.metadata
            .get(key)
            .and_then(MetaValue::as_int)
            .and_then(|v| u64::try_from(v).ok())
    }

    /// Derived fields present and matching, span consistent with row count.
    pub(crate) fn check_consistency(&self) -> RecordResult<()> {
        let corrupt = |detail: String| CorruptRecordSnafu {
            uid: self.uid.clone(),
            detail,
        };

        let Some(rows) = self.derived(ROW_COUNT_KEY) else {
            return corrupt(format!("missing or invalid {ROW_COUNT_KEY}")).fail();
        };
        let Some(binary_size) = self.derived(BINARY_SIZE_KEY) else {
            return corrupt(format!("missing or invalid {BINARY_SIZE_KEY}")).fail();
        };

        let summed = self.index.size + self.columns.iter().map(|(_, c)| c.size).sum::<u64>();
        ensure!(
            summed == binary_size,
            corrupt(format!(
                "{BINARY_SIZE_KEY} is {binary_size} but column sizes sum to {summed}"
            ))
        );

        match (self.start, self.end) {
            (Some(start), Some(end)) => ensure!(
                start <= end && rows > 0,
                corrupt(format!("span {start}..{end} invalid for {rows} rows"))
            ),
            (None, None) => ensure!(
                rows == 0,
                corrupt(format!("no time span but {rows} rows"))
            ),
            _ => return corrupt("only one end of the time span is set".to_string()).fail(),
        }
        Ok(())
    }
}
