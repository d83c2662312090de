//! Record fixtures for unit tests.

use chrono::{TimeZone, Utc};
use trace_types::SpanRecord;

/// Span with millisecond timestamps relative to the Unix epoch.
pub fn span(
    id: &str,
    parent: Option<&str>,
    start_ms: i64,
    end_ms: Option<i64>,
    operation: &str,
) -> SpanRecord {
    let started_at = Utc.timestamp_millis_opt(start_ms).unwrap();
    let ended_at = end_ms.map(|ms| Utc.timestamp_millis_opt(ms).unwrap());
    let record = SpanRecord::new(id, operation).with_times(started_at, ended_at);
    match parent {
        Some(parent) => record.with_parent(parent),
        None => record,
    }
}
