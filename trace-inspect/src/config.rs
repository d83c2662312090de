use std::path::PathBuf;

use trace_types::{NavigationMode, SpanId};

use crate::error::InspectError;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Span batch to load (JSON array or newline-delimited JSON)
    pub input: PathBuf,
    /// Timeline width in columns
    pub width: usize,
    /// Span to report navigation state for
    pub select: Option<SpanId>,
    /// Scrubber mode used for the navigation report
    pub mode: NavigationMode,
}

impl Config {
    /// Read configuration from the process environment (and `.env`).
    ///
    /// A path given on the command line wins over `TRACE_INSPECT_INPUT`.
    pub fn from_env(cli_input: Option<String>) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(cli_input, |key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(cli_input: Option<String>, lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let input = cli_input
            .or_else(|| lookup("TRACE_INSPECT_INPUT"))
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from)
            .ok_or(InspectError::MissingInput)?;

        let mode_raw = env_str(&lookup, "TRACE_INSPECT_MODE", "timeline");
        let mode = NavigationMode::parse(&mode_raw)
            .ok_or_else(|| InspectError::InvalidMode(mode_raw.clone()))?;

        let width: usize = env_parse(&lookup, "TRACE_INSPECT_WIDTH", 100)?;

        Ok(Self {
            input,
            width: width.max(10),
            select: lookup("TRACE_INSPECT_SELECT")
                .filter(|id| !id.trim().is_empty())
                .map(SpanId::from),
            mode,
        })
    }
}

fn env_str<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).unwrap_or_else(|| default.to_string())
}

fn env_parse<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(val) => val
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Failed to parse env var {key}={val}: {e}")),
        None => Ok(default),
    }
}
