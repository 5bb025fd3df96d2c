use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;

use match_forest::analytics::{self, DatasetSummary, TeamsAndFormations};
use match_forest::config::{DatasetSource, ServiceConfig};

#[derive(Serialize)]
struct Output {
    summary: DatasetSummary,
    #[serde(flatten)]
    catalog: TeamsAndFormations,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"))
        .format_timestamp(None)
        .init();

    let mut config = ServiceConfig::from_env();
    if let Some(path) = std::env::args().nth(1) {
        config.dataset = DatasetSource::File(PathBuf::from(path));
    }

    let provider = config.dataset.provider();
    let records = provider
        .load()
        .with_context(|| format!("load dataset from {}", provider.describe()))?;

    let out = Output {
        summary: analytics::summarize(&records),
        catalog: analytics::teams_and_formations(&records),
    };
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
