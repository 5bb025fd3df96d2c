use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::match_data::NUM_CLASSES;
use crate::tree::{DecisionTree, Sample, TreeConfig};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub tree: TreeConfig,
    /// Train trees on the rayon pool. Every tree draws its bootstrap from a
    /// seed taken up front, so the result matches the sequential path.
    pub parallel: bool,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 10,
            tree: TreeConfig::default(),
            parallel: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Vote {
    pub class: usize,
    pub confidence: f64,
    /// Votes per class ordinal.
    pub votes: [usize; NUM_CLASSES],
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedFeature {
    pub name: String,
    pub importance: f64,
    pub rank: usize,
}

#[derive(Debug, Clone)]
pub struct ForestEnsemble {
    trees: Vec<DecisionTree>,
    config: ForestConfig,
}

impl ForestEnsemble {
    pub fn train<R: Rng + ?Sized>(
        samples: &[Sample],
        config: ForestConfig,
        rng: &mut R,
    ) -> Result<Self> {
        let trees = grow_trees(samples, config, rng)?;
        Ok(Self { trees, config })
    }

    /// Throws away every tree and grows a fresh ensemble of the same size.
    pub fn retrain<R: Rng + ?Sized>(&mut self, samples: &[Sample], rng: &mut R) -> Result<()> {
        self.trees = grow_trees(samples, self.config, rng)?;
        Ok(())
    }

    /// Majority vote across trees. Ties between classes go to the lowest
    /// ordinal.
    pub fn predict(&self, features: &[f64]) -> Result<Vote> {
        let mut votes = [0usize; NUM_CLASSES];
        for tree in &self.trees {
            let class = tree.predict(features)?;
            votes[class] += 1;
        }

        let mut class = 0;
        for c in 1..NUM_CLASSES {
            if votes[c] > votes[class] {
                class = c;
            }
        }
        let confidence = if self.trees.is_empty() {
            0.0
        } else {
            votes[class] as f64 / self.trees.len() as f64
        };
        Ok(Vote {
            class,
            confidence,
            votes,
        })
    }

    pub fn vote_fractions(&self, features: &[f64]) -> Result<[f64; NUM_CLASSES]> {
        let vote = self.predict(features)?;
        let n = self.trees.len().max(1) as f64;
        Ok(vote.votes.map(|v| v as f64 / n))
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    pub fn config(&self) -> ForestConfig {
        self.config
    }

    pub fn avg_depth(&self) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let total: usize = self.trees.iter().map(DecisionTree::depth).sum();
        total as f64 / self.trees.len() as f64
    }

    pub fn total_nodes(&self) -> usize {
        self.trees.iter().map(DecisionTree::n_nodes).sum()
    }

    /// Split usage per feature summed over all trees, normalised to 1 and
    /// ranked (1 = most used).
    pub fn feature_importance(&self, names: &[&str]) -> Vec<RankedFeature> {
        if self.trees.is_empty() || names.is_empty() {
            return Vec::new();
        }
        let mut totals = vec![0.0f64; names.len()];
        for tree in &self.trees {
            for (i, count) in tree.split_counts().into_iter().enumerate() {
                if i < totals.len() {
                    totals[i] += count as f64;
                }
            }
        }
        let sum: f64 = totals.iter().sum();
        if sum > 0.0 {
            totals.iter_mut().for_each(|v| *v /= sum);
        }

        let mut ranked: Vec<RankedFeature> = names
            .iter()
            .zip(totals)
            .map(|(name, importance)| RankedFeature {
                name: (*name).to_string(),
                importance,
                rank: 0,
            })
            .collect();
        // Stable sort keeps declaration order among equal scores.
        ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
        for (i, feat) in ranked.iter_mut().enumerate() {
            feat.rank = i + 1;
        }
        ranked
    }
}

pub fn bootstrap_indices<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<usize> {
    (0..n).map(|_| rng.gen_range(0..n)).collect()
}

fn grow_trees<R: Rng + ?Sized>(
    samples: &[Sample],
    config: ForestConfig,
    rng: &mut R,
) -> Result<Vec<DecisionTree>> {
    if samples.is_empty() {
        return Err(ModelError::EmptyTrainingSet);
    }
    if config.n_trees == 0 {
        return Err(ModelError::NoTrees);
    }
    let seeds: Vec<u64> = (0..config.n_trees).map(|_| rng.r#gen::<u64>()).collect();

    let grow_one = |seed: u64| -> Result<DecisionTree> {
        let mut tree_rng = StdRng::seed_from_u64(seed);
        let indices = bootstrap_indices(samples.len(), &mut tree_rng);
        DecisionTree::train_on(samples, &indices, config.tree)
    };

    if config.parallel {
        seeds.into_par_iter().map(grow_one).collect()
    } else {
        seeds.into_iter().map(grow_one).collect()
    }
}
