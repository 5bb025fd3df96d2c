use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

pub const NUM_CLASSES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchResult {
    #[serde(rename = "L")]
    Loss,
    #[serde(rename = "D")]
    Draw,
    #[serde(rename = "W")]
    Win,
}

impl MatchResult {
    pub const ALL: [MatchResult; NUM_CLASSES] =
        [MatchResult::Loss, MatchResult::Draw, MatchResult::Win];

    /// Ordinal used for impurity arithmetic: Loss=0, Draw=1, Win=2.
    pub fn encode(self) -> usize {
        match self {
            MatchResult::Loss => 0,
            MatchResult::Draw => 1,
            MatchResult::Win => 2,
        }
    }

    pub fn decode(class: usize) -> Option<Self> {
        match class {
            0 => Some(MatchResult::Loss),
            1 => Some(MatchResult::Draw),
            2 => Some(MatchResult::Win),
            _ => None,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "w" | "win" => Some(MatchResult::Win),
            "d" | "draw" => Some(MatchResult::Draw),
            "l" | "loss" => Some(MatchResult::Loss),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            MatchResult::Win => "W",
            MatchResult::Draw => "D",
            MatchResult::Loss => "L",
        }
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchResult::Win => write!(f, "Win"),
            MatchResult::Draw => write!(f, "Draw"),
            MatchResult::Loss => write!(f, "Loss"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Venue {
    Home,
    Away,
    Neutral,
}

impl Venue {
    // Anything that is not explicitly home or away is played on neutral ground.
    pub fn parse(raw: &str) -> Self {
        let v = raw.trim();
        if v.eq_ignore_ascii_case("home") {
            Venue::Home
        } else if v.eq_ignore_ascii_case("away") {
            Venue::Away
        } else {
            Venue::Neutral
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Venue::Home => write!(f, "Home"),
            Venue::Away => write!(f, "Away"),
            Venue::Neutral => write!(f, "Neutral"),
        }
    }
}

/// One match seen from `team`'s side. Historical rows carry most fields,
/// prediction requests only a handful; absent values are resolved to
/// defaults by the feature encoder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub team: Option<String>,
    pub opponent: Option<String>,
    pub venue: Option<Venue>,
    pub formation: Option<String>,
    pub referee: Option<String>,
    pub captain: Option<String>,
    pub competition: Option<String>,
    pub day: Option<String>,
    pub possession: Option<f64>,
    pub shots: Option<f64>,
    pub shots_on_target: Option<f64>,
    pub free_kicks: Option<f64>,
    pub penalties: Option<f64>,
    pub shot_distance: Option<f64>,
    pub result: Option<MatchResult>,
}

impl MatchRecord {
    /// True when every column needed for training is present.
    pub fn is_trainable(&self) -> bool {
        self.result.is_some()
            && has_text(self.team.as_deref())
            && has_text(self.opponent.as_deref())
            && self.venue.is_some()
            && has_text(self.formation.as_deref())
            && self.possession.is_some()
            && self.shots.is_some()
            && self.shots_on_target.is_some()
            && self.shot_distance.is_some()
            && has_text(self.referee.as_deref())
            && has_text(self.captain.as_deref())
    }
}

pub fn clean_training_rows(records: &[MatchRecord]) -> Vec<&MatchRecord> {
    records.iter().filter(|r| r.is_trainable()).collect()
}

pub(crate) fn has_text(value: Option<&str>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionInput {
    pub team: String,
    pub opponent: String,
    pub venue: Venue,
    pub formation: String,
    #[serde(rename = "poss")]
    pub possession: f64,
    #[serde(rename = "sh")]
    pub shots: f64,
    #[serde(rename = "sot")]
    pub shots_on_target: f64,
}

impl PredictionInput {
    pub fn validate(&self) -> Result<()> {
        if self.team.trim().is_empty() {
            return Err(ModelError::InvalidInput("team is required".to_string()));
        }
        if self.opponent.trim().is_empty() {
            return Err(ModelError::InvalidInput("opponent is required".to_string()));
        }
        if self.formation.trim().is_empty() {
            return Err(ModelError::InvalidInput("formation is required".to_string()));
        }
        if !(0.0..=100.0).contains(&self.possession) {
            return Err(ModelError::InvalidInput(format!(
                "possession must be within 0..=100, got {}",
                self.possession
            )));
        }
        if !(self.shots >= 0.0) || self.shots.is_infinite() {
            return Err(ModelError::InvalidInput(format!(
                "shots must be a finite non-negative number, got {}",
                self.shots
            )));
        }
        if !(self.shots_on_target >= 0.0) || self.shots_on_target.is_infinite() {
            return Err(ModelError::InvalidInput(format!(
                "shots on target must be a finite non-negative number, got {}",
                self.shots_on_target
            )));
        }
        Ok(())
    }

    pub fn to_record(&self) -> MatchRecord {
        MatchRecord {
            team: Some(self.team.trim().to_string()),
            opponent: Some(self.opponent.trim().to_string()),
            venue: Some(self.venue),
            formation: Some(self.formation.trim().to_string()),
            possession: Some(self.possession),
            shots: Some(self.shots),
            shots_on_target: Some(self.shots_on_target),
            ..MatchRecord::default()
        }
    }
}
