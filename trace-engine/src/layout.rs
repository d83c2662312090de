use std::collections::HashMap;

use trace_types::{LayoutNode, SpanId};

use crate::tree::{TraceIndex, TIMELINE_UNIT_MS};

// ── Types ────────────────────────────────────────────────────────────────────

/// Layout for every span of one trace, keyed by span id.
#[derive(Clone, Debug, Default)]
pub struct LayoutMap {
    nodes: HashMap<SpanId, LayoutNode>,
    dfs: Vec<SpanId>,
    total_tracks: u32,
}

impl LayoutMap {
    pub fn get(&self, id: &str) -> Option<&LayoutNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Tracks needed to draw the whole trace (deepest absolute track + 1).
    pub fn total_tracks(&self) -> u32 {
        self.total_tracks
    }

    pub fn nodes_in_dfs_order(&self) -> impl Iterator<Item = &LayoutNode> + '_ {
        self.dfs.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn into_map(self) -> HashMap<SpanId, LayoutNode> {
        self.nodes
    }

    /// Span whose bar is drawn on `track` and covers `x_frac`.
    pub fn find_at(&self, x_frac: f64, track: u32) -> Option<&SpanId> {
        self.nodes_in_dfs_order()
            .find(|node| {
                node.y_level_absolute == track
                    && node.x_start_frac <= x_frac
                    && x_frac < node.x_end_frac()
            })
            .map(|node| &node.id)
    }
}

// ── Track packing ────────────────────────────────────────────────────────────

/// Greedy backward scan over chronologically sorted siblings.
///
/// Walks from the latest start to the earliest. A sibling that ends no later
/// than the previously placed sibling starts goes back to level 0; otherwise
/// it stacks below that sibling's subtree.
fn pack_tracks(
    siblings: &[usize],
    start: &[f64],
    end: &[f64],
    height: &[u32],
    level: &mut [u32],
) {
    let mut current = 0u32;
    let mut last_start = f64::INFINITY;
    let mut last_height = 0u32;

    for &slot in siblings.iter().rev() {
        if end[slot] > last_start {
            current += last_height;
        } else {
            current = 0;
        }
        level[slot] = current;
        last_start = start[slot];
        last_height = height[slot];
    }
}

// ── Layout ───────────────────────────────────────────────────────────────────

/// Compute horizontal extents and vertical tracks for every span.
///
/// Multiple roots are packed as the children of a virtual umbrella spanning
/// all of them; the umbrella itself is not emitted.
pub fn layout(index: &TraceIndex) -> LayoutMap {
    let Some((trace_start, trace_end)) = index.time_bounds() else {
        return LayoutMap::default();
    };
    let x_unit_offset = -trace_start;
    let x_total_width = (trace_end - trace_start).max(TIMELINE_UNIT_MS);

    // Arrays are indexed by dfs_order, which is a permutation of 0..n.
    let ids = index.dfs_ids();
    let count = ids.len();
    let mut start = vec![0.0; count];
    let mut end = vec![0.0; count];
    let mut parent: Vec<Option<usize>> = vec![None; count];
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
    for (slot, id) in ids.iter().enumerate() {
        let Some(node) = index.get(id.as_str()) else {
            continue;
        };
        start[slot] = node.start_ms;
        end[slot] = node.end_ms;
        parent[slot] = node
            .parent_id
            .as_ref()
            .and_then(|parent_id| index.get(parent_id.as_str()))
            .map(|parent_node| parent_node.dfs_order);
        children[slot] = node
            .children_ids
            .iter()
            .filter_map(|child| index.get(child.as_str()))
            .map(|child| child.dfs_order)
            .collect();
    }

    // Bottom-up: reverse pre-order visits every child before its parent.
    let mut height = vec![1u32; count];
    let mut level = vec![0u32; count];
    for slot in (0..count).rev() {
        if children[slot].is_empty() {
            continue;
        }
        pack_tracks(&children[slot], &start, &end, &height, &mut level);
        let tallest = children[slot].iter().map(|child| height[*child]).max();
        height[slot] = 1 + tallest.unwrap_or(0);
    }

    let roots: Vec<usize> = index
        .roots()
        .iter()
        .filter_map(|id| index.get(id.as_str()))
        .map(|node| node.dfs_order)
        .collect();
    pack_tracks(&roots, &start, &end, &height, &mut level);

    // Top-down: pre-order visits every parent before its children.
    let mut absolute = vec![0u32; count];
    let mut nodes = HashMap::with_capacity(count);
    for slot in 0..count {
        let parent_y_level = parent[slot].map(|parent_slot| absolute[parent_slot]);
        absolute[slot] = match parent_y_level {
            Some(parent_absolute) => parent_absolute + 1 + level[slot],
            None => level[slot],
        };
        nodes.insert(
            ids[slot].clone(),
            LayoutNode {
                id: ids[slot].clone(),
                x_start_frac: (start[slot] + x_unit_offset) / x_total_width,
                x_width_frac: (end[slot] - start[slot]) / x_total_width,
                y_level: level[slot],
                y_level_absolute: absolute[slot],
                y_height: height[slot],
                parent_y_level,
            },
        );
    }

    // A stacked child can sit below its parent's declared height, so the
    // drawing extent comes from the absolute tracks.
    let total_tracks = absolute.iter().map(|track| track + 1).max().unwrap_or(0);

    tracing::debug!(spans = count, total_tracks, "Computed trace layout");

    LayoutMap {
        nodes,
        dfs: ids.to_vec(),
        total_tracks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::span;
    use crate::tree::build_trace;

    fn tracks(map: &LayoutMap, id: &str) -> (u32, u32, u32) {
        let node = map.get(id).unwrap();
        (node.y_level, node.y_level_absolute, node.y_height)
    }

    #[test]
    fn test_empty_trace_has_no_layout() {
        let map = layout(&build_trace(Vec::new()));
        assert!(map.is_empty());
        assert_eq!(map.total_tracks(), 0);
    }

    #[test]
    fn test_single_leaf_fills_timeline() {
        let map = layout(&build_trace(vec![span("only", None, 100, Some(200), "op")]));
        let node = map.get("only").unwrap();
        assert_eq!(node.x_start_frac, 0.0);
        assert_eq!(node.x_width_frac, 1.0);
        assert_eq!(tracks(&map, "only"), (0, 0, 1));
        assert_eq!(node.parent_y_level, None);
        assert_eq!(map.total_tracks(), 1);
    }

    #[test]
    fn test_nested_children_share_level_when_disjoint() {
        let map = layout(&build_trace(vec![
            span("root", None, 0, Some(100), "op"),
            span("p", Some("root"), 0, Some(10), "op"),
            span("a", Some("p"), 2, Some(5), "op"),
            span("b", Some("p"), 6, Some(9), "op"),
        ]));

        assert_eq!(tracks(&map, "p"), (0, 1, 2));
        assert_eq!(tracks(&map, "a"), (0, 2, 1));
        assert_eq!(tracks(&map, "b"), (0, 2, 1));
        assert_eq!(map.get("a").unwrap().parent_y_level, Some(1));
        assert_eq!(tracks(&map, "root"), (0, 0, 3));
    }

    #[test]
    fn test_overlapping_children_stack_by_subtree_height() {
        // b (latest) is placed first at level 0; a overlaps b and stacks
        // below b's two-track subtree.
        let map = layout(&build_trace(vec![
            span("root", None, 0, Some(100), "op"),
            span("a", Some("root"), 0, Some(50), "op"),
            span("b", Some("root"), 20, Some(60), "op"),
            span("b1", Some("b"), 25, Some(30), "op"),
        ]));

        assert_eq!(tracks(&map, "b"), (0, 1, 2));
        assert_eq!(tracks(&map, "b1"), (0, 2, 1));
        assert_eq!(tracks(&map, "a"), (2, 3, 1));
        // Height follows the tallest child, not the stacked band.
        assert_eq!(tracks(&map, "root"), (0, 0, 3));
        assert_eq!(map.total_tracks(), 4);
    }

    #[test]
    fn test_fan_of_equal_starts_stacks_every_child() {
        let map = layout(&build_trace(vec![
            span("root", None, 0, Some(100), "op"),
            span("x", Some("root"), 10, Some(20), "op"),
            span("y", Some("root"), 10, Some(30), "op"),
            span("z", Some("root"), 10, Some(40), "op"),
        ]));

        assert_eq!(tracks(&map, "z").0, 0);
        assert_eq!(tracks(&map, "y").0, 1);
        assert_eq!(tracks(&map, "x").0, 2);
        assert_eq!(map.get("root").unwrap().y_height, 2);
        assert_eq!(map.total_tracks(), 4);
    }

    #[test]
    fn test_multiple_roots_pack_under_virtual_umbrella() {
        let map = layout(&build_trace(vec![
            span("r1", None, 0, Some(50), "op"),
            span("r2", None, 40, Some(100), "op"),
            span("r3", None, 60, Some(70), "op"),
        ]));

        // r3 first, r2 overlaps r3, r1 overlaps r2.
        assert_eq!(tracks(&map, "r3"), (0, 0, 1));
        assert_eq!(tracks(&map, "r2"), (1, 1, 1));
        assert_eq!(tracks(&map, "r1"), (2, 2, 1));
        assert_eq!(map.total_tracks(), 3);
        assert!(map.get("r1").unwrap().parent_y_level.is_none());
        assert_eq!(map.get("r2").unwrap().x_start_frac, 0.4);
    }

    #[test]
    fn test_fractions_normalized_to_envelope() {
        // Child outlives its parent; the envelope still bounds every bar.
        let map = layout(&build_trace(vec![
            span("root", None, 0, Some(50), "op"),
            span("late", Some("root"), 40, Some(100), "op"),
        ]));

        let root = map.get("root").unwrap();
        let late = map.get("late").unwrap();
        assert_eq!(root.x_width_frac, 0.5);
        assert_eq!(late.x_start_frac, 0.4);
        assert!(late.x_end_frac() <= 1.0 + 1e-9);
    }

    #[test]
    fn test_zero_duration_spans_get_one_unit() {
        let map = layout(&build_trace(vec![
            span("root", None, 0, Some(10), "op"),
            span("blip", Some("root"), 5, Some(5), "op"),
        ]));
        assert_eq!(map.get("blip").unwrap().x_width_frac, 0.1);
    }

    #[test]
    fn test_find_at_hits_bar_on_track() {
        let map = layout(&build_trace(vec![
            span("root", None, 0, Some(100), "op"),
            span("a", Some("root"), 10, Some(20), "op"),
            span("b", Some("root"), 50, Some(60), "op"),
        ]));

        assert_eq!(map.find_at(0.55, 1).map(SpanId::as_str), Some("b"));
        assert_eq!(map.find_at(0.15, 1).map(SpanId::as_str), Some("a"));
        assert_eq!(map.find_at(0.3, 1), None);
        assert_eq!(map.find_at(0.3, 0).map(SpanId::as_str), Some("root"));
        assert_eq!(map.find_at(0.3, 7), None);
    }

    #[test]
    fn test_deep_chain_does_not_recurse() {
        let records: Vec<_> = (0..20_000i64)
            .map(|depth| {
                let parent = (depth > 0).then(|| format!("s{}", depth - 1));
                span(&format!("s{depth}"), parent.as_deref(), depth, Some(40_000 - depth), "op")
            })
            .collect();
        let map = layout(&build_trace(records));

        assert_eq!(map.len(), 20_000);
        assert_eq!(map.get("s19999").unwrap().y_level_absolute, 19_999);
        assert_eq!(map.get("s0").unwrap().y_height, 20_000);
    }
}
