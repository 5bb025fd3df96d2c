use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use match_forest::config::{DatasetSource, ServiceConfig};
use match_forest::{PredictionInput, PredictionService, Venue};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    if has_flag(&args, "--help") || has_flag(&args, "-h") {
        print_usage();
        return Ok(());
    }

    let mut config = ServiceConfig::from_env();
    if let Some(path) = arg_value(&args, "--csv") {
        config.dataset = DatasetSource::File(PathBuf::from(path));
    } else if let Some(url) = arg_value(&args, "--url") {
        config.dataset = DatasetSource::Url {
            url,
            use_cache: !has_flag(&args, "--no-cache"),
        };
    }
    if let Some(seed) = arg_value(&args, "--seed") {
        config.seed = Some(seed.parse().with_context(|| format!("bad --seed {seed}"))?);
    }

    let input = PredictionInput {
        team: required(&args, "--team")?,
        opponent: required(&args, "--opponent")?,
        venue: Venue::parse(&arg_value(&args, "--venue").unwrap_or_else(|| "Home".to_string())),
        formation: arg_value(&args, "--formation").unwrap_or_else(|| "4-3-3".to_string()),
        possession: number(&args, "--poss", 50.0)?,
        shots: number(&args, "--sh", 10.0)?,
        shots_on_target: number(&args, "--sot", 4.0)?,
    };

    let service = PredictionService::from_config(&config);
    let prediction = service.predict(&input);
    println!("{}", serde_json::to_string_pretty(&prediction)?);
    Ok(())
}

fn print_usage() {
    println!(
        "usage: match_forest --team NAME --opponent NAME [--venue Home|Away|Neutral] \
         [--formation 4-3-3] [--poss 50] [--sh 10] [--sot 4] \
         [--csv PATH | --url URL [--no-cache]] [--seed N]"
    );
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}

fn arg_value(args: &[String], name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix) {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

fn required(args: &[String], name: &str) -> Result<String> {
    arg_value(args, name).ok_or_else(|| anyhow!("missing required argument {name}"))
}

fn number(args: &[String], name: &str, default: f64) -> Result<f64> {
    match arg_value(args, name) {
        Some(raw) => raw
            .parse::<f64>()
            .with_context(|| format!("{name} expects a number, got {raw}")),
        None => Ok(default),
    }
}
