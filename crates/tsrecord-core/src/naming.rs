//! Column-name normalization for the document store's field-name grammar.
//!
//! The store forbids `.` and NUL anywhere in a field name and a leading `$`.
//! Normalization removes the offending characters rather than replacing them,
//! so `"a.b"` becomes `"ab"`.

use std::collections::HashMap;

use crate::error::{ColumnNameCollisionSnafu, EmptyColumnNameSnafu, RecordResult};

/// Normalize one column name. Applying it twice gives the same result.
pub fn normalize_column_name(name: &str) -> String {
    let cleaned: String = name.chars().filter(|c| *c != '.' && *c != '\0').collect();
    cleaned.trim_start_matches('$').to_string()
}

/// Normalize every name of one table, in order.
///
/// Two names reducing to the same field, or a name reducing to nothing, are
/// rejected instead of silently overwriting a column.
pub fn normalize_column_names<'a, I>(uid: &str, names: I) -> RecordResult<Vec<String>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: HashMap<String, &'a str> = HashMap::new();
    let mut out = Vec::new();

    for original in names {
        let normalized = normalize_column_name(original);
        if normalized.is_empty() {
            return EmptyColumnNameSnafu { uid, original }.fail();
        }
        if let Some(first) = seen.get(&normalized) {
            return ColumnNameCollisionSnafu {
                uid,
                first: *first,
                second: original,
                normalized,
            }
            .fail();
        }
        seen.insert(normalized.clone(), original);
        out.push(normalized);
    }

    Ok(out)
}
