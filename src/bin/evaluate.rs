use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use rand::SeedableRng;
use rand::rngs::StdRng;

use match_forest::MatchPredictor;
use match_forest::config::{DatasetSource, ServiceConfig};
use match_forest::evaluation::{evaluate, stratified_split};
use match_forest::match_data::MatchResult;

const DEFAULT_TEST_FRACTION: f64 = 0.2;
const DEFAULT_SPLIT_SEED: u64 = 42;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let mut config = ServiceConfig::from_env();
    if let Some(path) = parse_arg("--csv") {
        config.dataset = DatasetSource::File(PathBuf::from(path));
    }
    let test_fraction = parse_arg("--test-fraction")
        .and_then(|v| v.parse::<f64>().ok())
        .unwrap_or(DEFAULT_TEST_FRACTION)
        .clamp(0.05, 0.5);
    let seed = parse_arg("--seed")
        .and_then(|v| v.parse::<u64>().ok())
        .or(config.seed)
        .unwrap_or(DEFAULT_SPLIT_SEED);

    let provider = config.dataset.provider();
    let records = provider
        .load()
        .with_context(|| format!("load dataset from {}", provider.describe()))?;

    let mut rng = StdRng::seed_from_u64(seed);
    let (train, test) = stratified_split(&records, test_fraction, &mut rng);
    let model = MatchPredictor::train(&train, config.forest, &mut rng)?;
    let clean_test: Vec<_> = test.into_iter().filter(|r| r.is_trainable()).collect();
    let report = evaluate(&model, &clean_test)?;
    let summary = model.summary();

    println!("Holdout evaluation ({})", Utc::now().format("%Y-%m-%d %H:%M UTC"));
    println!("Dataset: {}", provider.describe());
    println!(
        "Train rows: {} clean of {} | test rows: {} (seed {seed}, fraction {test_fraction:.2})",
        summary.clean_rows,
        summary.raw_rows,
        report.metrics.samples
    );
    println!(
        "Forest: {} trees, avg depth {:.2}, {} nodes",
        summary.forest_size, summary.avg_depth, summary.total_nodes
    );
    println!(
        "Accuracy: {:.4} | Brier: {:.4} | LogLoss: {:.4}",
        report.metrics.accuracy, report.metrics.brier, report.metrics.log_loss
    );
    println!();
    println!("{:<6} {:>9} {:>9} {:>8}", "class", "precision", "recall", "support");
    for class in MatchResult::ALL {
        let row = report.per_class[class.encode()];
        println!(
            "{:<6} {:>9.3} {:>9.3} {:>8}",
            class.code(),
            row.precision,
            row.recall,
            row.support
        );
    }

    println!();
    println!("Top features by split usage:");
    for feat in model.feature_importance().iter().take(10) {
        println!("  {:>2}. {:<18} {:.4}", feat.rank, feat.name, feat.importance);
    }

    Ok(())
}

fn parse_arg(name: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{name}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(value) = arg.strip_prefix(&prefix)
            && !value.trim().is_empty()
        {
            return Some(value.trim().to_string());
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
