use std::path::Path;

use trace_types::SpanRecord;

use crate::error::InspectError;

/// Parse a span batch.
///
/// Accepts either a single JSON array of records or newline-delimited JSON
/// (one record per line, blank lines ignored).
pub fn parse_records(input: &str) -> Result<Vec<SpanRecord>, InspectError> {
    if input.trim_start().starts_with('[') {
        let records: Vec<SpanRecord> = serde_json::from_str(input)
            .map_err(|source| InspectError::Parse { line: source.line(), source })?;
        return Ok(records);
    }

    let mut records = Vec::new();
    for (idx, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let record = serde_json::from_str(line).map_err(|source| InspectError::Parse {
            line: idx + 1,
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}

pub fn load_records(path: &Path) -> Result<Vec<SpanRecord>, InspectError> {
    let contents = std::fs::read_to_string(path).map_err(|source| InspectError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let records = parse_records(&contents)?;
    tracing::debug!(path = %path.display(), count = records.len(), "Loaded span records");
    Ok(records)
}
