use std::collections::HashSet;

use trace_engine::{build_trace, layout, Navigator, TraceSummary};
use trace_inspect::config::Config;
use trace_inspect::error::InspectError;
use trace_inspect::{loader, render};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trace_inspect=info,trace_engine=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env(std::env::args().nth(1))?;
    tracing::info!(
        input = %config.input.display(),
        width = config.width,
        mode = config.mode.as_str(),
        "Inspecting trace"
    );

    let records = loader::load_records(&config.input)?;
    let index = build_trace(records);

    let diagnostics = index.diagnostics();
    if !diagnostics.orphans.is_empty() {
        tracing::warn!(
            count = diagnostics.orphans.len(),
            ids = ?diagnostics.orphans,
            "Orphan spans promoted to roots"
        );
    }
    if !diagnostics.duplicates.is_empty() {
        tracing::warn!(
            count = diagnostics.duplicates.len(),
            ids = ?diagnostics.duplicates,
            "Duplicate span ids, last record kept"
        );
    }
    if !diagnostics.missing_start.is_empty() {
        tracing::warn!(
            count = diagnostics.missing_start.len(),
            ids = ?diagnostics.missing_start,
            "Spans without a start time"
        );
    }
    if !diagnostics.cycles_broken.is_empty() {
        tracing::warn!(ids = ?diagnostics.cycles_broken, "Parent cycles broken");
    }

    let map = layout(&index);

    println!("{}", render::render_summary(&TraceSummary::from_index(&index)));
    println!();
    println!("{}", render::render_timeline(&index, &map, config.width));
    println!();
    println!("{}", render::render_tree(&index, &HashSet::new()));

    if let Some(selected) = config.select.as_ref() {
        if !index.contains(selected.as_str()) {
            return Err(InspectError::UnknownSpan(selected.to_string()).into());
        }
        let mut navigator = Navigator::new(&index);
        navigator.select(Some(selected.as_str()));
        println!();
        println!("{}", render::render_navigation(&navigator, config.mode));
    }

    Ok(())
}
