use std::collections::HashSet;

use serde::Serialize;

use crate::tree::TraceIndex;

/// Headline numbers for one trace.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TraceSummary {
    pub span_count: usize,
    pub root_count: usize,
    pub max_depth: usize,
    pub start_ms: f64,
    pub end_ms: f64,
    pub duration_ms: f64,
    pub running_spans: usize,
    pub error_spans: usize,
    pub operation_count: usize,
}

impl TraceSummary {
    pub fn from_index(index: &TraceIndex) -> Self {
        let Some((start_ms, end_ms)) = index.time_bounds() else {
            return Self::default();
        };

        let mut summary = Self {
            span_count: index.len(),
            root_count: index.roots().len(),
            start_ms,
            end_ms,
            duration_ms: end_ms - start_ms,
            ..Self::default()
        };
        let mut operations = HashSet::new();
        for node in index.nodes() {
            summary.max_depth = summary.max_depth.max(node.depth);
            let Some(record) = index.record(node.id.as_str()) else {
                continue;
            };
            if record.is_running() {
                summary.running_spans += 1;
            }
            if record.has_error() {
                summary.error_spans += 1;
            }
            operations.insert(record.operation_name.as_str());
        }
        summary.operation_count = operations.len();
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::span;
    use crate::tree::build_trace;

    #[test]
    fn test_summary_counts() {
        let index = build_trace(vec![
            span("root", None, 0, Some(100), "run"),
            span("a", Some("root"), 10, None, "fetch"),
            span("a1", Some("a"), 12, Some(18), "fetch")
                .with_payload(serde_json::json!({"error": "timeout"})),
            span("orphan", Some("gone"), 150, Some(160), "parse"),
        ]);

        let summary = TraceSummary::from_index(&index);
        assert_eq!(summary.span_count, 4);
        assert_eq!(summary.root_count, 2);
        assert_eq!(summary.max_depth, 2);
        assert_eq!(summary.running_spans, 1);
        assert_eq!(summary.error_spans, 1);
        assert_eq!(summary.operation_count, 3);
        assert_eq!(summary.duration_ms, 160.0);
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(
            TraceSummary::from_index(&build_trace(Vec::new())),
            TraceSummary::default()
        );
    }
}
