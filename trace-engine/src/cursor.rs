use std::collections::HashSet;

use trace_types::{NavigationMode, ScrubberState, SpanId};

use crate::navigation::NavigationIndex;
use crate::tree::TraceIndex;

// ── Scrubbing ────────────────────────────────────────────────────────────────

fn position_of(sequence: &[SpanId], current: Option<&str>) -> Option<usize> {
    let current = current?;
    sequence.iter().position(|id| id.as_str() == current)
}

/// Resolve a (possibly fractional, possibly out-of-range) slider position.
///
/// The position is clamped to `[0, len - 1]` and rounded down. An empty
/// sequence is a no-op and hands back `current`.
pub fn scrub(sequence: &[SpanId], current: Option<&SpanId>, requested: f64) -> Option<SpanId> {
    let Some(last) = sequence.len().checked_sub(1) else {
        return current.cloned();
    };
    let requested = if requested.is_nan() { 0.0 } else { requested };
    let position = requested.clamp(0.0, last as f64).floor() as usize;
    sequence.get(position.min(last)).cloned()
}

/// Move `delta` steps from `current`, clamped to the sequence bounds.
///
/// When `current` is not in the sequence any step lands on the first entry.
pub fn step(sequence: &[SpanId], current: Option<&str>, delta: isize) -> Option<SpanId> {
    let last = sequence.len().checked_sub(1)?;
    let target = match position_of(sequence, current) {
        Some(from) => from.saturating_add_signed(delta).min(last),
        None => 0,
    };
    sequence.get(target).cloned()
}

pub fn scrubber_state(sequence: &[SpanId], current: Option<&str>) -> ScrubberState {
    ScrubberState {
        len: sequence.len(),
        position: position_of(sequence, current),
        max: sequence.len().saturating_sub(1),
        disabled: sequence.len() <= 1,
    }
}

// ── Call stack ───────────────────────────────────────────────────────────────

/// Root-to-`id` path extended down through earliest children to a leaf.
///
/// Both walks keep a visited set, so corrupted parent links cannot loop.
/// Unknown ids produce an empty stack.
pub fn build_stack_for_call(index: &TraceIndex, id: &str) -> Vec<SpanId> {
    let Some(node) = index.get(id) else {
        return Vec::new();
    };
    let mut visited: HashSet<&str> = HashSet::from([node.id.as_str()]);

    let mut upward = vec![node.id.clone()];
    let mut cursor = node.id.as_str();
    while let Some(parent_id) = index.parent_of(cursor) {
        if !visited.insert(parent_id.as_str()) {
            break;
        }
        upward.push(parent_id.clone());
        cursor = parent_id.as_str();
    }
    upward.reverse();

    let mut cursor = node.id.as_str();
    while let Some(first_child) = index.children_of(cursor).first() {
        if !visited.insert(first_child.as_str()) {
            break;
        }
        upward.push(first_child.clone());
        cursor = first_child.as_str();
    }

    upward
}

/// Cached call stack for the active selection.
///
/// Owned by whichever component represents the current selection; it is
/// rebuilt only when the selection leaves the cached stack.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StackState {
    stack: Vec<SpanId>,
    original_id: Option<SpanId>,
}

impl StackState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_call(index: &TraceIndex, id: &str) -> Self {
        let stack = build_stack_for_call(index, id);
        let original_id = (!stack.is_empty()).then(|| SpanId::from(id));
        Self { stack, original_id }
    }

    pub fn stack(&self) -> &[SpanId] {
        &self.stack
    }

    /// The selection the stack was built for.
    pub fn original_id(&self) -> Option<&SpanId> {
        self.original_id.as_ref()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.stack.iter().any(|entry| entry.as_str() == id)
    }

    /// Rebuild unless `selected` is already on the cached stack.
    ///
    /// Returns `true` when the cache was replaced.
    pub fn sync(&mut self, index: &TraceIndex, selected: Option<&str>) -> bool {
        match selected {
            Some(id) if self.contains(id) => false,
            Some(id) => {
                *self = Self::for_call(index, id);
                true
            }
            None => {
                *self = Self::default();
                true
            }
        }
    }
}

// ── Navigator ────────────────────────────────────────────────────────────────

/// One navigation session: a selection plus its cached call stack.
#[derive(Debug)]
pub struct Navigator<'a> {
    nav: NavigationIndex<'a>,
    stack: StackState,
    selected: Option<SpanId>,
}

impl<'a> Navigator<'a> {
    pub fn new(index: &'a TraceIndex) -> Self {
        Self {
            nav: NavigationIndex::new(index),
            stack: StackState::new(),
            selected: None,
        }
    }

    pub fn index(&self) -> &NavigationIndex<'a> {
        &self.nav
    }

    pub fn selected(&self) -> Option<&SpanId> {
        self.selected.as_ref()
    }

    pub fn stack_state(&self) -> &StackState {
        &self.stack
    }

    /// Select `id` from outside (click, URL). Unknown ids clear the selection.
    pub fn select(&mut self, id: Option<&str>) {
        self.selected = id
            .filter(|id| self.nav.trace().contains(id))
            .map(SpanId::from);
        self.stack.sync(self.nav.trace(), self.selected.as_ref().map(SpanId::as_str));
    }

    pub fn sequence(&self, mode: NavigationMode) -> &[SpanId] {
        self.nav.sequence(
            mode,
            self.selected.as_ref().map(SpanId::as_str),
            &self.stack,
        )
    }

    pub fn scrubber(&self, mode: NavigationMode) -> ScrubberState {
        scrubber_state(
            self.sequence(mode),
            self.selected.as_ref().map(SpanId::as_str),
        )
    }

    /// Jump to slider position `requested` in `mode` and return the new selection.
    pub fn scrub_to(&mut self, mode: NavigationMode, requested: f64) -> Option<SpanId> {
        let next = scrub(self.sequence(mode), self.selected.as_ref(), requested);
        self.select(next.as_ref().map(SpanId::as_str));
        self.selected.clone()
    }

    /// Move `delta` entries in `mode` and return the new selection.
    pub fn step(&mut self, mode: NavigationMode, delta: isize) -> Option<SpanId> {
        let next = step(
            self.sequence(mode),
            self.selected.as_ref().map(SpanId::as_str),
            delta,
        );
        if next.is_some() {
            self.select(next.as_ref().map(SpanId::as_str));
        }
        self.selected.clone()
    }
}
