//! Shared types between the trace engine and renderers
//!
//! These types are used by both:
//! - the layout/navigation engine (native Rust)
//! - timeline renderers (Rust or a web front-end via the generated bindings)
//!
//! Serializable with serde for JSON ingest and hand-off.

use std::borrow::Borrow;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ============================================================================
// Core Types
// ============================================================================

/// Opaque span identifier
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, TS)]
#[ts(export, export_to = "trace.ts")]
pub struct SpanId(pub String);

impl SpanId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SpanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for SpanId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SpanId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SpanId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ============================================================================
// Span Records
// ============================================================================

/// SpanRecord - one logged execution unit, as supplied by the data-fetch layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "trace.ts")]
pub struct SpanRecord {
    /// Unique span id
    pub id: SpanId,

    /// Parent span; absent means root candidate
    #[serde(default)]
    pub parent_id: Option<SpanId>,

    /// When the span started. Missing only on malformed records.
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,

    /// When the span ended; absent while still running
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,

    /// Operation name (e.g., "openai.chat", "fetch"), used for peer grouping
    pub operation_name: String,

    /// Optional human label
    #[serde(default)]
    pub display_name: Option<String>,

    /// Presentation payload (attributes, error info). Never read by layout.
    #[serde(default)]
    #[ts(type = "unknown")]
    pub payload: serde_json::Value,
}

impl SpanRecord {
    pub fn new(id: impl Into<SpanId>, operation_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent_id: None,
            started_at: None,
            ended_at: None,
            operation_name: operation_name.into(),
            display_name: None,
            payload: serde_json::Value::Null,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<SpanId>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_times(
        mut self,
        started_at: DateTime<Utc>,
        ended_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.started_at = Some(started_at);
        self.ended_at = ended_at;
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }

    /// Display label, falling back to the operation name.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.operation_name)
    }

    pub fn is_running(&self) -> bool {
        self.ended_at.is_none()
    }

    /// Whether the payload carries an error marker (`error` or `exception`).
    pub fn has_error(&self) -> bool {
        ["error", "exception"].iter().any(|key| {
            match self.payload.get(*key) {
                None | Some(serde_json::Value::Null) => false,
                Some(serde_json::Value::Bool(flag)) => *flag,
                Some(serde_json::Value::String(text)) => !text.is_empty(),
                Some(_) => true,
            }
        })
    }
}

// ============================================================================
// Layout Types
// ============================================================================

/// Placement of one span on the timeline drawing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
#[ts(export, export_to = "trace.ts")]
pub struct LayoutNode {
    pub id: SpanId,
    /// Start offset as a fraction of the whole trace duration
    pub x_start_frac: f64,
    /// Width as a fraction of the whole trace duration
    pub x_width_frac: f64,
    /// Track relative to the parent's first child track
    pub y_level: u32,
    /// Track relative to the whole drawing
    pub y_level_absolute: u32,
    /// Own track plus the tallest child's height (>= 1)
    pub y_height: u32,
    /// Absolute track of the parent, for connector lines
    pub parent_y_level: Option<u32>,
}

impl LayoutNode {
    /// Absolute track range `[start, end)` occupied by this subtree.
    pub fn track_range(&self) -> std::ops::Range<u32> {
        self.y_level_absolute..self.y_level_absolute + self.y_height
    }

    pub fn x_end_frac(&self) -> f64 {
        self.x_start_frac + self.x_width_frac
    }
}

// ============================================================================
// Navigation Types
// ============================================================================

/// The four scrubber modes
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "trace.ts")]
pub enum NavigationMode {
    /// Every span by start time
    Timeline,
    /// Spans sharing the selected span's operation name
    Peer,
    /// Spans sharing the selected span's parent
    Sibling,
    /// Root-to-selected path extended to the earliest leaf
    Stack,
}

impl NavigationMode {
    pub const ALL: [NavigationMode; 4] = [
        NavigationMode::Timeline,
        NavigationMode::Peer,
        NavigationMode::Sibling,
        NavigationMode::Stack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NavigationMode::Timeline => "timeline",
            NavigationMode::Peer => "peer",
            NavigationMode::Sibling => "sibling",
            NavigationMode::Stack => "stack",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "timeline" | "chronological" => Some(NavigationMode::Timeline),
            "peer" | "peers" => Some(NavigationMode::Peer),
            "sibling" | "siblings" => Some(NavigationMode::Sibling),
            "stack" => Some(NavigationMode::Stack),
            _ => None,
        }
    }
}

/// Range-slider model for one scrubber
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, TS)]
#[ts(export, export_to = "trace.ts")]
pub struct ScrubberState {
    /// Number of entries in the backing sequence
    pub len: usize,
    /// Position of the current selection, if it is a member
    pub position: Option<usize>,
    /// Largest valid position (0 for empty sequences)
    pub max: usize,
    /// True when there is nothing to scrub (len <= 1)
    pub disabled: bool,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ts_rs::Config;

    #[test]
    fn test_span_record_deserializes_with_defaults() {
        let json = r#"{"id": "a", "operation_name": "fetch"}"#;
        let record: SpanRecord = serde_json::from_str(json).unwrap();

        assert_eq!(record.id.as_str(), "a");
        assert!(record.parent_id.is_none());
        assert!(record.started_at.is_none());
        assert!(record.is_running());
        assert_eq!(record.payload, serde_json::Value::Null);
    }

    #[test]
    fn test_span_record_serialization() {
        let start = Utc.timestamp_millis_opt(1_000).unwrap();
        let record = SpanRecord::new("child", "parse")
            .with_parent("root")
            .with_times(start, Some(start + chrono::Duration::milliseconds(5)))
            .with_payload(serde_json::json!({"attributes": {"k": "v"}}));

        let json = serde_json::to_string(&record).unwrap();
        let deserialized: SpanRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(record, deserialized);
        assert_eq!(deserialized.parent_id, Some(SpanId::from("root")));
    }

    #[test]
    fn test_label_falls_back_to_operation_name() {
        let plain = SpanRecord::new("a", "fetch");
        assert_eq!(plain.label(), "fetch");

        let named = SpanRecord::new("a", "fetch").with_display_name("Fetch users");
        assert_eq!(named.label(), "Fetch users");

        let blank = SpanRecord::new("a", "fetch").with_display_name("");
        assert_eq!(blank.label(), "fetch");
    }

    #[test]
    fn test_has_error_reads_payload_markers() {
        let ok = SpanRecord::new("a", "fetch").with_payload(serde_json::json!({"error": null}));
        assert!(!ok.has_error());

        let flagged = SpanRecord::new("a", "fetch").with_payload(serde_json::json!({"error": true}));
        assert!(flagged.has_error());

        let exception = SpanRecord::new("a", "fetch")
            .with_payload(serde_json::json!({"exception": {"type": "Timeout"}}));
        assert!(exception.has_error());

        let empty = SpanRecord::new("a", "fetch").with_payload(serde_json::json!({"error": ""}));
        assert!(!empty.has_error());
    }

    #[test]
    fn test_navigation_mode_serialization() {
        let json = serde_json::to_string(&NavigationMode::Sibling).unwrap();
        assert_eq!(json, "\"sibling\"");
        assert_eq!(NavigationMode::parse("Peers"), Some(NavigationMode::Peer));
        assert_eq!(NavigationMode::parse("nope"), None);
        for mode in NavigationMode::ALL {
            assert_eq!(NavigationMode::parse(mode.as_str()), Some(mode));
        }
    }

    #[test]
    fn test_layout_node_track_range() {
        let node = LayoutNode {
            id: SpanId::from("a"),
            x_start_frac: 0.25,
            x_width_frac: 0.5,
            y_level: 0,
            y_level_absolute: 3,
            y_height: 2,
            parent_y_level: Some(2),
        };
        assert_eq!(node.track_range(), 3..5);
        assert!((node.x_end_frac() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn export_types() {
        // Export all types to TypeScript
        // The export_to attribute in each type's #[ts] macro specifies the output file
        let config = Config::default();
        SpanId::export(&config).unwrap();
        SpanRecord::export(&config).unwrap();
        LayoutNode::export(&config).unwrap();
        NavigationMode::export(&config).unwrap();
        ScrubberState::export(&config).unwrap();
    }
}
