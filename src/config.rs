use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::dataset::{CsvFileProvider, CsvUrlProvider, DEFAULT_DATASET_URL, DatasetProvider};
use crate::forest::ForestConfig;
use crate::tree::TreeConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DatasetSource {
    Url { url: String, use_cache: bool },
    File(PathBuf),
}

impl Default for DatasetSource {
    fn default() -> Self {
        DatasetSource::Url {
            url: DEFAULT_DATASET_URL.to_string(),
            use_cache: true,
        }
    }
}

impl DatasetSource {
    pub fn provider(&self) -> Box<dyn DatasetProvider> {
        match self {
            DatasetSource::Url { url, use_cache } => Box::new(CsvUrlProvider {
                url: url.clone(),
                use_cache: *use_cache,
            }),
            DatasetSource::File(path) => Box::new(CsvFileProvider::new(path.clone())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub dataset: DatasetSource,
    pub forest: ForestConfig,
    /// Fixed bootstrap seed; `None` draws one from the OS.
    pub seed: Option<u64>,
}

impl ServiceConfig {
    /// Loads `.env.local` / `.env` if present, then reads `MATCH_FOREST_*`
    /// variables. Unset or unparseable values keep their defaults.
    pub fn from_env() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");

        let defaults = ForestConfig::default();
        let tree = TreeConfig {
            max_depth: env_parse("MATCH_FOREST_MAX_DEPTH").unwrap_or(defaults.tree.max_depth),
            min_samples_split: env_parse("MATCH_FOREST_MIN_SAMPLES")
                .unwrap_or(defaults.tree.min_samples_split)
                .max(1),
        };
        let forest = ForestConfig {
            n_trees: env_parse("MATCH_FOREST_TREES")
                .unwrap_or(defaults.n_trees)
                .max(1),
            tree,
            parallel: env_flag("MATCH_FOREST_PARALLEL").unwrap_or(defaults.parallel),
        };

        let dataset = match env_string("MATCH_FOREST_DATASET_PATH") {
            Some(path) => DatasetSource::File(PathBuf::from(path)),
            None => DatasetSource::Url {
                url: env_string("MATCH_FOREST_DATASET_URL")
                    .unwrap_or_else(|| DEFAULT_DATASET_URL.to_string()),
                use_cache: env_flag("MATCH_FOREST_HTTP_CACHE").unwrap_or(true),
            },
        };

        Self {
            dataset,
            forest,
            seed: env_parse("MATCH_FOREST_SEED"),
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|v| v.parse::<T>().ok())
}

fn env_flag(key: &str) -> Option<bool> {
    parse_flag(&env_string(key)?)
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
