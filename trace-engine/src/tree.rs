use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use trace_types::{SpanId, SpanRecord};

// ── Constants ────────────────────────────────────────────────────────────────

/// One timeline unit, in milliseconds. Spans are never narrower than this.
pub const TIMELINE_UNIT_MS: f64 = 1.0;

// ── Types ────────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
pub struct TraceNode {
    pub id: SpanId,
    /// Resolved parent. `None` for roots, including promoted orphans.
    pub parent_id: Option<SpanId>,
    /// Children sorted by start time, ties by input order.
    pub children_ids: Vec<SpanId>,
    pub dfs_order: usize,
    pub depth: usize,
    pub descendant_count: usize,
    /// Position of the winning record in the input batch.
    pub order: usize,
    pub start_ms: f64,
    /// Effective end: at least one timeline unit after `start_ms`.
    pub end_ms: f64,
}

impl TraceNode {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn duration_ms(&self) -> f64 {
        self.end_ms - self.start_ms
    }
}

/// Recoverable input problems found while building. Never fatal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildDiagnostics {
    /// Records whose parent could not be resolved, promoted to roots.
    pub orphans: Vec<SpanId>,
    /// Ids seen more than once; the last record won.
    pub duplicates: Vec<SpanId>,
    /// Records without a start time, kept as zero-duration roots.
    pub missing_start: Vec<SpanId>,
    /// Records detached from a parent cycle and promoted to roots.
    pub cycles_broken: Vec<SpanId>,
}

impl BuildDiagnostics {
    pub fn is_clean(&self) -> bool {
        self.orphans.is_empty()
            && self.duplicates.is_empty()
            && self.missing_start.is_empty()
            && self.cycles_broken.is_empty()
    }
}

/// Immutable id → node index over one batch of span records.
#[derive(Clone, Debug, Default)]
pub struct TraceIndex {
    records: HashMap<SpanId, SpanRecord>,
    nodes: HashMap<SpanId, TraceNode>,
    roots: Vec<SpanId>,
    dfs: Vec<SpanId>,
    diagnostics: BuildDiagnostics,
}

// ── Time helpers ─────────────────────────────────────────────────────────────

pub fn timestamp_ms(timestamp: &DateTime<Utc>) -> f64 {
    timestamp.timestamp_micros() as f64 / 1000.0
}

fn effective_end_ms(start_ms: f64, ended_at: Option<&DateTime<Utc>>) -> f64 {
    let floor = start_ms + TIMELINE_UNIT_MS;
    match ended_at {
        Some(ended_at) => timestamp_ms(ended_at).max(floor),
        None => floor,
    }
}

// ── Building ─────────────────────────────────────────────────────────────────

/// Build a [`TraceIndex`] from an unordered batch of span records.
///
/// Never fails: orphans, duplicate ids, missing start times and parent cycles
/// are all degraded locally and reported through [`TraceIndex::diagnostics`].
pub fn build_trace(records: impl IntoIterator<Item = SpanRecord>) -> TraceIndex {
    let mut diagnostics = BuildDiagnostics::default();

    // Last write wins; the slot keeps its place but takes the later position.
    let mut slots: Vec<SpanRecord> = Vec::new();
    let mut orders: Vec<usize> = Vec::new();
    let mut slot_of: HashMap<SpanId, usize> = HashMap::new();
    for (position, record) in records.into_iter().enumerate() {
        match slot_of.get(&record.id) {
            Some(&slot) => {
                diagnostics.duplicates.push(record.id.clone());
                slots[slot] = record;
                orders[slot] = position;
            }
            None => {
                slot_of.insert(record.id.clone(), slots.len());
                slots.push(record);
                orders.push(position);
            }
        }
    }

    let count = slots.len();
    let origin_ms = slots
        .iter()
        .filter_map(|record| record.started_at.as_ref().map(timestamp_ms))
        .reduce(f64::min)
        .unwrap_or(0.0);

    let mut start = vec![0.0; count];
    let mut end = vec![0.0; count];
    let mut parent: Vec<Option<usize>> = vec![None; count];
    for (slot, record) in slots.iter().enumerate() {
        let Some(started_at) = record.started_at.as_ref() else {
            diagnostics.missing_start.push(record.id.clone());
            start[slot] = origin_ms;
            end[slot] = origin_ms + TIMELINE_UNIT_MS;
            continue;
        };
        start[slot] = timestamp_ms(started_at);
        end[slot] = effective_end_ms(start[slot], record.ended_at.as_ref());

        if let Some(parent_id) = record.parent_id.as_ref() {
            match slot_of.get(parent_id) {
                Some(&parent_slot) if parent_slot != slot => parent[slot] = Some(parent_slot),
                _ => diagnostics.orphans.push(record.id.clone()),
            }
        }
    }

    let chronological = |a: &usize, b: &usize| {
        start[*a]
            .total_cmp(&start[*b])
            .then_with(|| orders[*a].cmp(&orders[*b]))
    };

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
    for slot in 0..count {
        if let Some(parent_slot) = parent[slot] {
            children[parent_slot].push(slot);
        }
    }

    break_parent_cycles(
        &mut parent,
        &mut children,
        &chronological,
        &slots,
        &mut diagnostics,
    );

    for list in children.iter_mut() {
        list.sort_by(chronological);
    }
    let mut roots: Vec<usize> = (0..count).filter(|slot| parent[*slot].is_none()).collect();
    roots.sort_by(chronological);

    // Pre-order with an explicit stack: children pushed in reverse so the
    // earliest child is numbered next.
    let mut dfs_order = vec![0usize; count];
    let mut depth = vec![0usize; count];
    let mut dfs: Vec<usize> = Vec::with_capacity(count);
    let mut stack: Vec<(usize, usize)> = roots.iter().rev().map(|slot| (*slot, 0)).collect();
    while let Some((slot, level)) = stack.pop() {
        dfs_order[slot] = dfs.len();
        depth[slot] = level;
        dfs.push(slot);
        stack.extend(children[slot].iter().rev().map(|child| (*child, level + 1)));
    }

    let mut descendants = vec![0usize; count];
    for &slot in dfs.iter().rev() {
        if let Some(parent_slot) = parent[slot] {
            descendants[parent_slot] += descendants[slot] + 1;
        }
    }

    let ids: Vec<SpanId> = slots.iter().map(|record| record.id.clone()).collect();
    let nodes: HashMap<SpanId, TraceNode> = (0..count)
        .map(|slot| {
            let node = TraceNode {
                id: ids[slot].clone(),
                parent_id: parent[slot].map(|parent_slot| ids[parent_slot].clone()),
                children_ids: children[slot]
                    .iter()
                    .map(|child| ids[*child].clone())
                    .collect(),
                dfs_order: dfs_order[slot],
                depth: depth[slot],
                descendant_count: descendants[slot],
                order: orders[slot],
                start_ms: start[slot],
                end_ms: end[slot],
            };
            (ids[slot].clone(), node)
        })
        .collect();

    let index = TraceIndex {
        roots: roots.iter().map(|slot| ids[*slot].clone()).collect(),
        dfs: dfs.iter().map(|slot| ids[*slot].clone()).collect(),
        records: slots
            .into_iter()
            .map(|record| (record.id.clone(), record))
            .collect(),
        nodes,
        diagnostics,
    };

    tracing::debug!(
        spans = index.len(),
        roots = index.roots.len(),
        orphans = index.diagnostics.orphans.len(),
        duplicates = index.diagnostics.duplicates.len(),
        missing_start = index.diagnostics.missing_start.len(),
        cycles_broken = index.diagnostics.cycles_broken.len(),
        "Built trace index"
    );

    index
}

/// Records that no root can reach sit on a parent cycle or hang below one.
///
/// Unreached records are visited in chronological order. From each one the
/// parent chain is followed until it repeats; the earliest record on that
/// cycle is detached and promoted to root, which makes everything hanging
/// off the cycle reachable again. Each record is walked at most once.
fn break_parent_cycles<F>(
    parent: &mut [Option<usize>],
    children: &mut [Vec<usize>],
    chronological: &F,
    slots: &[SpanRecord],
    diagnostics: &mut BuildDiagnostics,
) where
    F: Fn(&usize, &usize) -> std::cmp::Ordering,
{
    let count = parent.len();
    let mut reached = vec![false; count];
    let roots: Vec<usize> = (0..count).filter(|slot| parent[*slot].is_none()).collect();
    mark_reachable(roots, children, &mut reached);

    let mut pending: Vec<usize> = (0..count).filter(|slot| !reached[*slot]).collect();
    if pending.is_empty() {
        return;
    }
    pending.sort_by(chronological);

    let mut walked_by = vec![usize::MAX; count];
    for (walk, &first) in pending.iter().enumerate() {
        if reached[first] {
            continue;
        }
        let mut path = Vec::new();
        let mut cursor = first;
        let repeated = loop {
            if walked_by[cursor] == walk {
                break Some(cursor);
            }
            walked_by[cursor] = walk;
            path.push(cursor);
            match parent[cursor] {
                Some(next) if !reached[next] => cursor = next,
                _ => break None,
            }
        };
        let Some(repeated) = repeated else {
            continue;
        };

        let cycle_start = path.iter().position(|slot| *slot == repeated).unwrap_or(0);
        let Some(detached) = path[cycle_start..].iter().copied().min_by(chronological) else {
            continue;
        };
        if let Some(parent_slot) = parent[detached].take() {
            children[parent_slot].retain(|child| *child != detached);
        }
        diagnostics.cycles_broken.push(slots[detached].id.clone());
        mark_reachable(vec![detached], children, &mut reached);
    }
}

fn mark_reachable(from: Vec<usize>, children: &[Vec<usize>], reached: &mut [bool]) {
    let mut queue = VecDeque::from(from);
    while let Some(slot) = queue.pop_front() {
        if reached[slot] {
            continue;
        }
        reached[slot] = true;
        queue.extend(children[slot].iter().copied());
    }
}

// ── Queries ──────────────────────────────────────────────────────────────────

impl TraceIndex {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&TraceNode> {
        self.nodes.get(id)
    }

    pub fn record(&self, id: &str) -> Option<&SpanRecord> {
        self.records.get(id)
    }

    /// Roots sorted by start time.
    pub fn roots(&self) -> &[SpanId] {
        &self.roots
    }

    /// Every id, in pre-order (`dfs_order` 0, 1, 2, ...).
    pub fn dfs_ids(&self) -> &[SpanId] {
        &self.dfs
    }

    /// Nodes in pre-order.
    pub fn nodes(&self) -> impl Iterator<Item = &TraceNode> + '_ {
        self.dfs.iter().filter_map(|id| self.nodes.get(id))
    }

    pub fn children_of(&self, id: &str) -> &[SpanId] {
        self.nodes
            .get(id)
            .map(|node| node.children_ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn parent_of(&self, id: &str) -> Option<&SpanId> {
        self.nodes.get(id).and_then(|node| node.parent_id.as_ref())
    }

    pub fn diagnostics(&self) -> &BuildDiagnostics {
        &self.diagnostics
    }

    /// Earliest start and latest effective end across every span.
    pub fn time_bounds(&self) -> Option<(f64, f64)> {
        self.nodes.values().fold(None, |bounds, node| match bounds {
            None => Some((node.start_ms, node.end_ms)),
            Some((lo, hi)) => Some((lo.min(node.start_ms), hi.max(node.end_ms))),
        })
    }
}
