use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::http::{fetch_text, fetch_text_cached, http_client};
use crate::match_data::{MatchRecord, MatchResult, Venue};

pub const DEFAULT_DATASET_URL: &str =
    "https://hebbkx1anhila5yf.public.blob.vercel-storage.com/matches-GJ9G0e8J352Sm03vTkuDWtFPkS4gfk.csv";

/// Source of historical matches used to train the model.
pub trait DatasetProvider: Send + Sync {
    fn load(&self) -> Result<Vec<MatchRecord>>;

    fn describe(&self) -> String;
}

#[derive(Debug, Clone)]
pub struct CsvUrlProvider {
    pub url: String,
    pub use_cache: bool,
}

impl CsvUrlProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            use_cache: true,
        }
    }
}

impl DatasetProvider for CsvUrlProvider {
    fn load(&self) -> Result<Vec<MatchRecord>> {
        let client = http_client()?;
        let body = if self.use_cache {
            fetch_text_cached(client, &self.url)?
        } else {
            fetch_text(client, &self.url)?
        };
        parse_matches_csv(&body).with_context(|| format!("parse csv from {}", self.url))
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}

#[derive(Debug, Clone)]
pub struct CsvFileProvider {
    pub path: PathBuf,
}

impl CsvFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DatasetProvider for CsvFileProvider {
    fn load(&self) -> Result<Vec<MatchRecord>> {
        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("read dataset {}", self.path.display()))?;
        parse_matches_csv(&raw).with_context(|| format!("parse csv {}", self.path.display()))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticProvider {
    records: Vec<MatchRecord>,
}

impl StaticProvider {
    pub fn new(records: Vec<MatchRecord>) -> Self {
        Self { records }
    }
}

impl DatasetProvider for StaticProvider {
    fn load(&self) -> Result<Vec<MatchRecord>> {
        Ok(self.records.clone())
    }

    fn describe(&self) -> String {
        format!("{} in-memory matches", self.records.len())
    }
}

// Column names follow the scraped match log export. Unknown columns are
// ignored; numbers that fail to parse become `None`.
#[derive(Debug, Deserialize)]
struct CsvMatchRow {
    #[serde(default)]
    team: Option<String>,
    #[serde(default)]
    opponent: Option<String>,
    #[serde(default)]
    venue: Option<String>,
    #[serde(default)]
    formation: Option<String>,
    #[serde(default)]
    referee: Option<String>,
    #[serde(default)]
    captain: Option<String>,
    #[serde(default, rename = "comp")]
    competition: Option<String>,
    #[serde(default)]
    day: Option<String>,
    #[serde(default)]
    result: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    poss: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    sh: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    sot: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    fk: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pk: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    dist: Option<f64>,
}

impl From<CsvMatchRow> for MatchRecord {
    fn from(row: CsvMatchRow) -> Self {
        MatchRecord {
            team: non_blank(row.team),
            opponent: non_blank(row.opponent),
            venue: non_blank(row.venue).map(|v| Venue::parse(&v)),
            formation: non_blank(row.formation),
            referee: non_blank(row.referee),
            captain: non_blank(row.captain),
            competition: non_blank(row.competition),
            day: non_blank(row.day),
            possession: finite(row.poss),
            shots: finite(row.sh),
            shots_on_target: finite(row.sot),
            free_kicks: finite(row.fk),
            penalties: finite(row.pk),
            shot_distance: finite(row.dist),
            result: row.result.as_deref().and_then(MatchResult::parse),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// `NaN` and `inf` parse as f64; treat them like any other unusable cell.
fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

pub fn parse_matches_csv(raw: &str) -> Result<Vec<MatchRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(raw.as_bytes());
    reader.headers().context("read csv header")?;

    let mut out = Vec::new();
    let mut skipped = 0usize;
    for (line, row) in reader.deserialize::<CsvMatchRow>().enumerate() {
        match row {
            Ok(row) => out.push(MatchRecord::from(row)),
            Err(err) => {
                skipped += 1;
                log::debug!("skipping csv row {}: {err}", line + 2);
            }
        }
    }
    if skipped > 0 {
        log::warn!("skipped {skipped} malformed csv rows");
    }
    Ok(out)
}
