use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::encoder::{FEATURE_NAMES, FeatureEncoder};
use crate::error::{ModelError, Result};
use crate::forest::{ForestConfig, ForestEnsemble, RankedFeature, Vote};
use crate::match_data::{MatchRecord, MatchResult, NUM_CLASSES, clean_training_rows};
use crate::tree::Sample;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub result: MatchResult,
    pub confidence: f64,
}

impl Prediction {
    pub const FALLBACK: Prediction = Prediction {
        result: MatchResult::Draw,
        confidence: 0.33,
    };
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TrainingSummary {
    pub raw_rows: usize,
    pub clean_rows: usize,
    pub forest_size: usize,
    pub avg_depth: f64,
    pub total_nodes: usize,
}

/// Feature encoder and forest fitted on the same clean rows.
#[derive(Debug, Clone)]
pub struct MatchPredictor {
    encoder: FeatureEncoder,
    forest: ForestEnsemble,
    summary: TrainingSummary,
}

impl MatchPredictor {
    pub fn train<R: Rng + ?Sized>(
        records: &[MatchRecord],
        config: ForestConfig,
        rng: &mut R,
    ) -> Result<Self> {
        let clean = clean_training_rows(records);
        if clean.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        log::info!(
            "training on {} of {} matches ({} trees)",
            clean.len(),
            records.len(),
            config.n_trees
        );

        let encoder = FeatureEncoder::fit(&clean);
        let samples: Vec<Sample> = clean
            .iter()
            .filter_map(|r| {
                let label = r.result?.encode();
                Some(Sample::new(encoder.transform(r), label))
            })
            .collect();

        let forest = ForestEnsemble::train(&samples, config, rng)?;
        let summary = TrainingSummary {
            raw_rows: records.len(),
            clean_rows: samples.len(),
            forest_size: forest.len(),
            avg_depth: forest.avg_depth(),
            total_nodes: forest.total_nodes(),
        };
        log::debug!(
            "forest ready: avg depth {:.2}, {} nodes",
            summary.avg_depth,
            summary.total_nodes
        );

        Ok(Self {
            encoder,
            forest,
            summary,
        })
    }

    pub fn vote(&self, record: &MatchRecord) -> Result<Vote> {
        let features = self.encoder.transform(record);
        self.forest.predict(&features)
    }

    pub fn predict(&self, record: &MatchRecord) -> Result<Prediction> {
        let vote = self.vote(record)?;
        let result = MatchResult::decode(vote.class).unwrap_or(MatchResult::Draw);
        Ok(Prediction {
            result,
            confidence: vote.confidence,
        })
    }

    /// Vote share per class ordinal (Loss, Draw, Win).
    pub fn vote_fractions(&self, record: &MatchRecord) -> Result<[f64; NUM_CLASSES]> {
        let features = self.encoder.transform(record);
        self.forest.vote_fractions(&features)
    }

    pub fn feature_importance(&self) -> Vec<RankedFeature> {
        self.forest.feature_importance(&FEATURE_NAMES)
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    pub fn forest(&self) -> &ForestEnsemble {
        &self.forest
    }

    pub fn summary(&self) -> TrainingSummary {
        self.summary
    }
}
