use std::collections::HashMap;

use serde::Serialize;

use crate::match_data::{MatchRecord, MatchResult, Venue, has_text};

const MIN_FORMATION_MATCHES: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResultCounts {
    pub wins: usize,
    pub draws: usize,
    pub losses: usize,
}

impl ResultCounts {
    fn add(&mut self, result: MatchResult) {
        match result {
            MatchResult::Win => self.wins += 1,
            MatchResult::Draw => self.draws += 1,
            MatchResult::Loss => self.losses += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.wins + self.draws + self.losses
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TeamRecord {
    pub team: String,
    pub wins: usize,
    pub draws: usize,
    pub losses: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormationSuccess {
    pub formation: String,
    /// Whole percent.
    pub win_rate: u32,
    pub matches: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub matches: usize,
    pub results: ResultCounts,
    pub teams: Vec<TeamRecord>,
    pub home: ResultCounts,
    pub away: ResultCounts,
    pub formations: Vec<FormationSuccess>,
}

/// Aggregates over rows that carry a result, both sides and a venue.
pub fn summarize(records: &[MatchRecord]) -> DatasetSummary {
    let valid = records.iter().filter(|r| {
        r.result.is_some()
            && has_text(r.team.as_deref())
            && has_text(r.opponent.as_deref())
            && r.venue.is_some()
    });

    let mut matches = 0usize;
    let mut results = ResultCounts::default();
    let mut home = ResultCounts::default();
    let mut away = ResultCounts::default();
    let mut by_team: HashMap<String, ResultCounts> = HashMap::new();
    let mut by_formation: HashMap<String, (usize, usize)> = HashMap::new();

    for record in valid {
        let (Some(result), Some(team), Some(venue)) =
            (record.result, record.team.as_deref(), record.venue)
        else {
            continue;
        };
        matches += 1;
        results.add(result);
        by_team.entry(team.to_string()).or_default().add(result);

        match venue {
            Venue::Home => home.add(result),
            Venue::Away => away.add(result),
            Venue::Neutral => {}
        }

        if let Some(formation) = record.formation.as_deref().filter(|f| !f.trim().is_empty()) {
            let slot = by_formation.entry(formation.to_string()).or_insert((0, 0));
            if result == MatchResult::Win {
                slot.0 += 1;
            }
            slot.1 += 1;
        }
    }

    let mut teams: Vec<TeamRecord> = by_team
        .into_iter()
        .map(|(team, c)| TeamRecord {
            team,
            wins: c.wins,
            draws: c.draws,
            losses: c.losses,
            total: c.total(),
        })
        .collect();
    teams.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.team.cmp(&b.team)));

    let mut formations: Vec<FormationSuccess> = by_formation
        .into_iter()
        .filter(|(_, (_, total))| *total >= MIN_FORMATION_MATCHES)
        .map(|(formation, (wins, total))| FormationSuccess {
            formation,
            win_rate: ((wins as f64 / total as f64) * 100.0).round() as u32,
            matches: total,
        })
        .collect();
    formations.sort_by(|a, b| {
        b.win_rate
            .cmp(&a.win_rate)
            .then_with(|| a.formation.cmp(&b.formation))
    });

    DatasetSummary {
        matches,
        results,
        teams,
        home,
        away,
        formations,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TeamsAndFormations {
    pub teams: Vec<String>,
    pub formations: Vec<String>,
}

/// Distinct teams and formations in first-seen order.
pub fn teams_and_formations(records: &[MatchRecord]) -> TeamsAndFormations {
    let mut out = TeamsAndFormations::default();
    for record in records {
        if let Some(team) = record.team.as_deref().filter(|t| !t.trim().is_empty())
            && !out.teams.iter().any(|t| t == team)
        {
            out.teams.push(team.to_string());
        }
        if let Some(formation) = record.formation.as_deref().filter(|f| !f.trim().is_empty())
            && !out.formations.iter().any(|f| f == formation)
        {
            out.formations.push(formation.to_string());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(team: &str, venue: Venue, formation: &str, result: MatchResult) -> MatchRecord {
        MatchRecord {
            team: Some(team.to_string()),
            opponent: Some("Opp".to_string()),
            venue: Some(venue),
            formation: Some(formation.to_string()),
            result: Some(result),
            ..MatchRecord::default()
        }
    }

    #[test]
    fn summary_counts_results_and_venues() {
        let mut records = vec![
            rec("A", Venue::Home, "4-3-3", MatchResult::Win),
            rec("A", Venue::Away, "4-3-3", MatchResult::Loss),
            rec("B", Venue::Home, "4-4-2", MatchResult::Draw),
            rec("B", Venue::Neutral, "4-4-2", MatchResult::Win),
            rec("A", Venue::Home, "4-3-3", MatchResult::Win),
        ];
        records.push(MatchRecord {
            result: None,
            ..rec("C", Venue::Home, "4-3-3", MatchResult::Win)
        });

        let s = summarize(&records);
        assert_eq!(s.matches, 5);
        assert_eq!(
            s.results,
            ResultCounts {
                wins: 3,
                draws: 1,
                losses: 1
            }
        );
        assert_eq!(s.home.wins, 2);
        assert_eq!(s.home.draws, 1);
        assert_eq!(s.away.losses, 1);
        assert_eq!(s.teams[0].team, "A");
        assert_eq!(s.teams[0].total, 3);
        assert_eq!(s.teams[1].team, "B");
    }

    #[test]
    fn formations_need_five_matches() {
        let mut records = Vec::new();
        for i in 0..6 {
            let result = if i < 4 { MatchResult::Win } else { MatchResult::Loss };
            records.push(rec("A", Venue::Home, "4-3-3", result));
        }
        for _ in 0..4 {
            records.push(rec("A", Venue::Home, "5-3-2", MatchResult::Win));
        }
        let s = summarize(&records);
        assert_eq!(s.formations.len(), 1);
        assert_eq!(s.formations[0].formation, "4-3-3");
        assert_eq!(s.formations[0].win_rate, 67);
        assert_eq!(s.formations[0].matches, 6);
    }

    #[test]
    fn distinct_teams_keep_first_seen_order() {
        let records = vec![
            rec("B", Venue::Home, "4-4-2", MatchResult::Win),
            rec("A", Venue::Home, "4-3-3", MatchResult::Win),
            rec("B", Venue::Away, "4-3-3", MatchResult::Win),
            MatchRecord::default(),
        ];
        let tf = teams_and_formations(&records);
        assert_eq!(tf.teams, vec!["B", "A"]);
        assert_eq!(tf.formations, vec!["4-4-2", "4-3-3"]);
    }
}
