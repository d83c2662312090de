//! Plain-text renderings of a laid-out trace.

use std::collections::HashSet;

use trace_engine::{LayoutMap, Navigator, TraceIndex, TraceSummary};
use trace_types::{NavigationMode, SpanId};

const BAR: char = '=';
const RUNNING: char = '>';
const ERROR: char = '!';

pub fn render_summary(summary: &TraceSummary) -> String {
    let lines = [
        format!(
            "spans: {} (roots: {}, max depth: {})",
            summary.span_count, summary.root_count, summary.max_depth
        ),
        format!(
            "duration: {:.0} ms ({:.0} .. {:.0})",
            summary.duration_ms, summary.start_ms, summary.end_ms
        ),
        format!(
            "operations: {}, running: {}, errors: {}",
            summary.operation_count, summary.running_spans, summary.error_spans
        ),
    ];
    lines.join("\n")
}

// ── Timeline ────────────────────────────────────────────────────────────────

fn columns(x_start: f64, x_end: f64, width: usize) -> (usize, usize) {
    let scale = width as f64;
    let start = ((x_start * scale).floor() as usize).min(width - 1);
    let end = ((x_end * scale).ceil() as usize).clamp(start + 1, width);
    (start, end)
}

/// One lane per track; each span is drawn as a bar on its own track.
///
/// Running spans end in `>`, spans with an error payload start with `!`.
pub fn render_timeline(index: &TraceIndex, map: &LayoutMap, width: usize) -> String {
    if map.is_empty() || width == 0 {
        return String::from("(empty trace)");
    }
    let mut lanes = vec![vec![' '; width]; map.total_tracks() as usize];

    for node in map.nodes_in_dfs_order() {
        let Some(lane) = lanes.get_mut(node.y_level_absolute as usize) else {
            continue;
        };
        let (start, end) = columns(node.x_start_frac, node.x_end_frac(), width);
        for cell in &mut lane[start..end] {
            *cell = BAR;
        }

        let record = index.record(node.id.as_str());
        let label = record.map(|r| r.label()).unwrap_or(node.id.as_str());
        let room = end - start;
        if room > label.chars().count() + 2 {
            for (offset, ch) in label.chars().enumerate() {
                lane[start + 1 + offset] = ch;
            }
        }
        if let Some(record) = record {
            if record.has_error() {
                lane[start] = ERROR;
            }
            if record.is_running() {
                lane[end - 1] = RUNNING;
            }
        }
    }

    lanes
        .into_iter()
        .enumerate()
        .map(|(track, lane)| {
            let lane: String = lane.into_iter().collect();
            format!("{track:>3} |{lane}|")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Call tree ───────────────────────────────────────────────────────────────

pub fn render_tree(index: &TraceIndex, collapsed: &HashSet<SpanId>) -> String {
    index
        .rows(collapsed)
        .into_iter()
        .map(|row| {
            let marker = if row.collapsed {
                '+'
            } else if row.child_count > 0 {
                '-'
            } else {
                ' '
            };
            let (label, operation) = index
                .record(row.id.as_str())
                .map(|r| (r.label(), r.operation_name.as_str()))
                .unwrap_or((row.id.as_str(), ""));
            let duration = index.get(row.id.as_str()).map_or(0.0, |n| n.duration_ms());
            let hidden = if row.collapsed {
                format!(" [{} hidden]", row.descendant_count)
            } else {
                String::new()
            };
            format!(
                "{indent}{marker} {label} ({operation}, {duration:.0} ms) #{id}{hidden}",
                indent = "  ".repeat(row.depth),
                id = row.id,
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Navigation ──────────────────────────────────────────────────────────────

/// Scrubber state for `mode` followed by the sequence, selection marked `*`.
pub fn render_navigation(navigator: &Navigator<'_>, mode: NavigationMode) -> String {
    let state = navigator.scrubber(mode);
    let position = state
        .position
        .map_or_else(|| "-".to_string(), |p| p.to_string());
    let mut lines = vec![format!(
        "{} scrubber: position {position} of 0..={}{}",
        mode.as_str(),
        state.max,
        if state.disabled { " (disabled)" } else { "" }
    )];

    let selected = navigator.selected();
    for (i, id) in navigator.sequence(mode).iter().enumerate() {
        let mark = if Some(id) == selected { '*' } else { ' ' };
        lines.push(format!("{mark} {i:>4} {id}"));
    }
    lines.join("\n")
}
