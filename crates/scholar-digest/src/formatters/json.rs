//! JSON export.

use crate::models::QueryResult;

/// Format a query result as pretty-printed JSON.
#[must_use]
pub fn format_json(result: &QueryResult) -> String {
    // QueryResult holds only strings, numbers and dates, which always serialize.
    serde_json::to_string_pretty(result).unwrap_or_default()
}
