use std::collections::HashMap;
use std::sync::OnceLock;

use trace_types::{NavigationMode, SpanId};

use crate::cursor::StackState;
use crate::tree::TraceIndex;

/// Chronological, peer and sibling orderings over one [`TraceIndex`].
///
/// Groupings are computed on first use and memoized; the index is read-only,
/// so a `NavigationIndex` can be shared across threads.
#[derive(Debug)]
pub struct NavigationIndex<'a> {
    index: &'a TraceIndex,
    chronological: OnceLock<Vec<SpanId>>,
    peers: OnceLock<HashMap<String, Vec<SpanId>>>,
}

pub fn navigation_index(index: &TraceIndex) -> NavigationIndex<'_> {
    NavigationIndex::new(index)
}

impl<'a> NavigationIndex<'a> {
    pub fn new(index: &'a TraceIndex) -> Self {
        Self {
            index,
            chronological: OnceLock::new(),
            peers: OnceLock::new(),
        }
    }

    pub fn trace(&self) -> &'a TraceIndex {
        self.index
    }

    /// Every span sorted by start time, ties by input order.
    pub fn chronological(&self) -> &[SpanId] {
        self.chronological.get_or_init(|| {
            let mut nodes: Vec<_> = self.index.nodes().collect();
            nodes.sort_by(|a, b| {
                a.start_ms
                    .total_cmp(&b.start_ms)
                    .then_with(|| a.order.cmp(&b.order))
            });
            nodes.into_iter().map(|node| node.id.clone()).collect()
        })
    }

    /// Spans sharing `id`'s operation name, in chronological order.
    pub fn peers_of(&self, id: Option<&str>) -> &[SpanId] {
        let Some(record) = id.and_then(|id| self.index.record(id)) else {
            return &[];
        };
        self.peer_groups()
            .get(&record.operation_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// `id`'s parent's children, or every root when `id` is a root.
    pub fn siblings_of(&self, id: Option<&str>) -> &[SpanId] {
        let Some(node) = id.and_then(|id| self.index.get(id)) else {
            return &[];
        };
        match node.parent_id.as_ref() {
            Some(parent_id) => self.index.children_of(parent_id.as_str()),
            None => self.index.roots(),
        }
    }

    /// Sequence backing the scrubber for `mode`.
    pub fn sequence<'s>(
        &'s self,
        mode: NavigationMode,
        current: Option<&str>,
        stack: &'s StackState,
    ) -> &'s [SpanId] {
        match mode {
            NavigationMode::Timeline => self.chronological(),
            NavigationMode::Peer => self.peers_of(current),
            NavigationMode::Sibling => self.siblings_of(current),
            NavigationMode::Stack => stack.stack(),
        }
    }

    fn peer_groups(&self) -> &HashMap<String, Vec<SpanId>> {
        self.peers.get_or_init(|| {
            let mut groups: HashMap<String, Vec<SpanId>> = HashMap::new();
            for id in self.chronological() {
                if let Some(record) = self.index.record(id.as_str()) {
                    groups
                        .entry(record.operation_name.clone())
                        .or_default()
                        .push(id.clone());
                }
            }
            groups
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::span;
    use crate::tree::build_trace;

    fn labels(ids: &[SpanId]) -> Vec<&str> {
        ids.iter().map(SpanId::as_str).collect()
    }

    fn sample() -> TraceIndex {
        build_trace(vec![
            span("root", None, 0, Some(100), "run"),
            span("b", Some("root"), 30, Some(40), "fetch"),
            span("a", Some("root"), 10, Some(20), "fetch"),
            span("c", Some("root"), 50, Some(60), "parse"),
            span("a1", Some("a"), 30, Some(35), "fetch"),
            span("other", None, 30, Some(90), "run"),
        ])
    }

    #[test]
    fn test_chronological_sorts_by_start_then_input_order() {
        let index = sample();
        let nav = navigation_index(&index);
        assert_eq!(
            labels(nav.chronological()),
            vec!["root", "a", "b", "a1", "other", "c"]
        );
    }

    #[test]
    fn test_peers_cross_parents() {
        let index = sample();
        let nav = navigation_index(&index);
        assert_eq!(labels(nav.peers_of(Some("a1"))), vec!["a", "b", "a1"]);
        assert_eq!(labels(nav.peers_of(Some("root"))), vec!["root", "other"]);
        assert!(nav.peers_of(None).is_empty());
        assert!(nav.peers_of(Some("ghost")).is_empty());
    }

    #[test]
    fn test_siblings_of_child_and_root() {
        let index = sample();
        let nav = navigation_index(&index);
        assert_eq!(labels(nav.siblings_of(Some("c"))), vec!["a", "b", "c"]);
        assert_eq!(labels(nav.siblings_of(Some("a1"))), vec!["a1"]);
        assert_eq!(labels(nav.siblings_of(Some("other"))), vec!["root", "other"]);
        assert!(nav.siblings_of(None).is_empty());
    }

    #[test]
    fn test_queries_are_repeatable() {
        let index = sample();
        let nav = navigation_index(&index);
        let first = nav.peers_of(Some("b")).to_vec();
        let second = nav.peers_of(Some("b")).to_vec();
        assert_eq!(first, second);
        assert_eq!(nav.chronological().to_vec(), nav.chronological().to_vec());
    }

    #[test]
    fn test_sequence_dispatches_on_mode() {
        let index = sample();
        let nav = navigation_index(&index);
        let stack = StackState::for_call(&index, "a");
        assert_eq!(
            nav.sequence(NavigationMode::Timeline, Some("a"), &stack).len(),
            6
        );
        assert_eq!(
            labels(nav.sequence(NavigationMode::Stack, Some("a"), &stack)),
            vec!["root", "a", "a1"]
        );
        assert_eq!(
            labels(nav.sequence(NavigationMode::Sibling, Some("a"), &stack)),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn test_shared_across_threads() {
        let index = sample();
        let nav = navigation_index(&index);
        std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| nav.peers_of(Some("a")).len()))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), 3);
            }
        });
    }
}
