use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum InspectError {
    #[error("No input file given (pass a path or set TRACE_INSPECT_INPUT)")]
    MissingInput,

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid span record on line {line}: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unknown span id: {0}")]
    UnknownSpan(String),

    #[error("Invalid navigation mode '{0}'. Expected timeline, peer, sibling or stack")]
    InvalidMode(String),
}
