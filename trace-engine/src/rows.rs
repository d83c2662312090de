use std::collections::HashSet;

use serde::Serialize;
use trace_types::SpanId;

use crate::tree::TraceIndex;

/// One visible line of the call-tree list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TraceRow {
    pub id: SpanId,
    pub depth: usize,
    pub dfs_order: usize,
    pub child_count: usize,
    pub descendant_count: usize,
    pub collapsed: bool,
}

impl TraceIndex {
    /// Flatten the forest in pre-order, hiding the descendants of `collapsed`.
    pub fn rows(&self, collapsed: &HashSet<SpanId>) -> Vec<TraceRow> {
        let mut rows = Vec::with_capacity(self.len());
        let mut skip_until = 0usize;
        for node in self.nodes() {
            // A subtree occupies dfs_order..=dfs_order + descendant_count.
            if node.dfs_order < skip_until {
                continue;
            }
            let is_collapsed = collapsed.contains(&node.id) && !node.children_ids.is_empty();
            if is_collapsed {
                skip_until = node.dfs_order + node.descendant_count + 1;
            }
            rows.push(TraceRow {
                id: node.id.clone(),
                depth: node.depth,
                dfs_order: node.dfs_order,
                child_count: node.children_ids.len(),
                descendant_count: node.descendant_count,
                collapsed: is_collapsed,
            });
        }
        rows
    }
}
