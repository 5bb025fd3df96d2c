use std::collections::HashMap;

use serde::Serialize;

use crate::match_data::{MatchRecord, Venue, has_text};

pub const FEATURE_COUNT: usize = 15;

pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "venue_home",
    "venue_away",
    "possession",
    "shots",
    "shots_on_target",
    "free_kicks",
    "penalties",
    "shot_distance",
    "team_freq",
    "opponent_freq",
    "formation_freq",
    "referee_freq",
    "captain_freq",
    "competition_freq",
    "day_ordinal",
];

pub type FeatureVector = [f64; FEATURE_COUNT];

// Unseen categories are treated as very rare rather than rejected. Changing
// this shifts every split threshold learned on the frequency columns.
pub const UNSEEN_FREQUENCY: f64 = 0.001;
pub const UNSEEN_DAY: f64 = 0.5;

pub const DEFAULT_POSSESSION: f64 = 50.0;
pub const DEFAULT_SHOTS: f64 = 10.0;
pub const DEFAULT_SHOTS_ON_TARGET: f64 = 4.0;
pub const DEFAULT_FREE_KICKS: f64 = 0.0;
pub const DEFAULT_PENALTIES: f64 = 0.0;
pub const DEFAULT_SHOT_DISTANCE: f64 = 17.0;

/// Relative frequency of each categorical value among the training rows.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FrequencyTable {
    frequencies: HashMap<String, f64>,
}

impl FrequencyTable {
    /// Blank values are not keyed but still count towards the total.
    pub fn fit<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let mut counts: HashMap<String, usize> = HashMap::new();
        let mut total = 0usize;
        for value in values {
            total += 1;
            if let Some(v) = value.filter(|v| has_text(Some(*v))) {
                *counts.entry(v.to_string()).or_insert(0) += 1;
            }
        }

        let frequencies = if total == 0 {
            HashMap::new()
        } else {
            counts
                .into_iter()
                .map(|(k, c)| (k, c as f64 / total as f64))
                .collect()
        };
        Self { frequencies }
    }

    pub fn get(&self, value: Option<&str>) -> f64 {
        value
            .and_then(|v| self.frequencies.get(v))
            .copied()
            .unwrap_or(UNSEEN_FREQUENCY)
    }

    pub fn contains(&self, value: &str) -> bool {
        self.frequencies.contains_key(value)
    }

    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.frequencies.values().copied()
    }
}

/// Maps each distinct day to `index / distinct_days` in first-seen order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DayOrdinalTable {
    ordinals: HashMap<String, f64>,
}

impl DayOrdinalTable {
    pub fn fit<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let mut order: Vec<&str> = Vec::new();
        for value in values.into_iter().flatten() {
            if value.trim().is_empty() || order.contains(&value) {
                continue;
            }
            order.push(value);
        }
        let n = order.len() as f64;
        let ordinals = order
            .into_iter()
            .enumerate()
            .map(|(idx, day)| (day.to_string(), idx as f64 / n))
            .collect();
        Self { ordinals }
    }

    pub fn get(&self, value: Option<&str>) -> f64 {
        value
            .and_then(|v| self.ordinals.get(v))
            .copied()
            .unwrap_or(UNSEEN_DAY)
    }

    pub fn len(&self) -> usize {
        self.ordinals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordinals.is_empty()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct FeatureEncoder {
    team: FrequencyTable,
    opponent: FrequencyTable,
    formation: FrequencyTable,
    referee: FrequencyTable,
    captain: FrequencyTable,
    competition: FrequencyTable,
    day: DayOrdinalTable,
}

impl FeatureEncoder {
    pub fn fit(rows: &[&MatchRecord]) -> Self {
        Self {
            team: FrequencyTable::fit(rows.iter().map(|r| r.team.as_deref())),
            opponent: FrequencyTable::fit(rows.iter().map(|r| r.opponent.as_deref())),
            formation: FrequencyTable::fit(rows.iter().map(|r| r.formation.as_deref())),
            referee: FrequencyTable::fit(rows.iter().map(|r| r.referee.as_deref())),
            captain: FrequencyTable::fit(rows.iter().map(|r| r.captain.as_deref())),
            competition: FrequencyTable::fit(rows.iter().map(|r| r.competition.as_deref())),
            day: DayOrdinalTable::fit(rows.iter().map(|r| r.day.as_deref())),
        }
    }

    pub fn transform(&self, record: &MatchRecord) -> FeatureVector {
        let (home, away) = match record.venue {
            Some(Venue::Home) => (1.0, 0.0),
            Some(Venue::Away) => (0.0, 1.0),
            Some(Venue::Neutral) | None => (0.0, 0.0),
        };

        [
            home,
            away,
            record.possession.unwrap_or(DEFAULT_POSSESSION),
            record.shots.unwrap_or(DEFAULT_SHOTS),
            record.shots_on_target.unwrap_or(DEFAULT_SHOTS_ON_TARGET),
            record.free_kicks.unwrap_or(DEFAULT_FREE_KICKS),
            record.penalties.unwrap_or(DEFAULT_PENALTIES),
            record.shot_distance.unwrap_or(DEFAULT_SHOT_DISTANCE),
            self.team.get(record.team.as_deref()),
            self.opponent.get(record.opponent.as_deref()),
            self.formation.get(record.formation.as_deref()),
            self.referee.get(record.referee.as_deref()),
            self.captain.get(record.captain.as_deref()),
            self.competition.get(record.competition.as_deref()),
            self.day.get(record.day.as_deref()),
        ]
    }

    pub fn team_table(&self) -> &FrequencyTable {
        &self.team
    }

    pub fn formation_table(&self) -> &FrequencyTable {
        &self.formation
    }

    pub fn day_table(&self) -> &DayOrdinalTable {
        &self.day
    }
}
