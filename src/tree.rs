//! Binary classification tree grown by greedy Gini minimisation.
//!
//! Nodes live in a flat arena owned by the tree; the root is index 0 and
//! split nodes refer to their children by index.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::match_data::NUM_CLASSES;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Nodes deeper than this become leaves, so the deepest leaf sits at
    /// `max_depth + 1`.
    pub max_depth: usize,
    /// Nodes holding fewer rows than this become leaves.
    pub min_samples_split: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            min_samples_split: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub features: Vec<f64>,
    pub label: usize,
}

impl Sample {
    pub fn new(features: impl Into<Vec<f64>>, label: usize) -> Self {
        Self {
            features: features.into(),
            label,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TreeNode {
    Leaf {
        class: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
    n_features: usize,
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl DecisionTree {
    pub fn train(samples: &[Sample], config: TreeConfig) -> Result<Self> {
        let indices: Vec<usize> = (0..samples.len()).collect();
        Self::train_on(samples, &indices, config)
    }

    /// Grow a tree on `samples[i]` for every `i` in `indices`. Indices may
    /// repeat, which is how bootstrap resamples are expressed.
    pub fn train_on(samples: &[Sample], indices: &[usize], config: TreeConfig) -> Result<Self> {
        if indices.is_empty() {
            return Err(ModelError::EmptyNode);
        }
        let n_features = samples[indices[0]].features.len();
        if let Some(bad) = indices
            .iter()
            .map(|&i| samples[i].features.len())
            .find(|&w| w != n_features)
        {
            return Err(ModelError::FeatureWidth {
                expected: n_features,
                actual: bad,
            });
        }
        if let Some(bad) = indices
            .iter()
            .map(|&i| samples[i].label)
            .find(|&label| label >= NUM_CLASSES)
        {
            return Err(ModelError::InvalidLabel(bad));
        }

        let mut tree = Self {
            nodes: Vec::new(),
            n_features,
        };
        tree.grow(samples, indices, 0, config)?;
        Ok(tree)
    }

    fn grow(
        &mut self,
        samples: &[Sample],
        indices: &[usize],
        depth: usize,
        config: TreeConfig,
    ) -> Result<usize> {
        if depth > config.max_depth || indices.len() < config.min_samples_split {
            return self.push_leaf(samples, indices);
        }

        let Some(split) = best_split(samples, indices, self.n_features) else {
            return self.push_leaf(samples, indices);
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| samples[i].features[split.feature] <= split.threshold);
        if left.is_empty() || right.is_empty() {
            return self.push_leaf(samples, indices);
        }

        // Reserve the slot so the parent precedes its subtrees in the arena.
        let node = self.nodes.len();
        self.nodes.push(TreeNode::Leaf { class: 0 });
        let left_idx = self.grow(samples, &left, depth + 1, config)?;
        let right_idx = self.grow(samples, &right, depth + 1, config)?;
        self.nodes[node] = TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: left_idx,
            right: right_idx,
        };
        Ok(node)
    }

    fn push_leaf(&mut self, samples: &[Sample], indices: &[usize]) -> Result<usize> {
        let class = majority_label(indices.iter().map(|&i| samples[i].label))
            .ok_or(ModelError::EmptyNode)?;
        let idx = self.nodes.len();
        self.nodes.push(TreeNode::Leaf { class });
        Ok(idx)
    }

    pub fn predict(&self, features: &[f64]) -> Result<usize> {
        if features.len() != self.n_features {
            return Err(ModelError::FeatureWidth {
                expected: self.n_features,
                actual: features.len(),
            });
        }
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                TreeNode::Leaf { class } => return Ok(class),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if features[feature] <= threshold { left } else { right };
                }
            }
        }
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, TreeNode::Leaf { .. }))
            .count()
    }

    /// Edges on the longest root-to-leaf path; a lone leaf has depth 0.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            match self.nodes[idx] {
                TreeNode::Leaf { .. } => deepest = deepest.max(depth),
                TreeNode::Split { left, right, .. } => {
                    stack.push((left, depth + 1));
                    stack.push((right, depth + 1));
                }
            }
        }
        deepest
    }

    /// Number of split nodes testing each feature.
    pub fn split_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.n_features];
        for node in &self.nodes {
            if let TreeNode::Split { feature, .. } = node {
                counts[*feature] += 1;
            }
        }
        counts
    }
}

pub fn gini_impurity(counts: &[usize; NUM_CLASSES]) -> f64 {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return 0.0;
    }
    let n = total as f64;
    let mut gini = 1.0;
    for &c in counts {
        let p = c as f64 / n;
        gini -= p * p;
    }
    gini
}

/// Most frequent label; ties go to the lowest ordinal (Loss before Draw
/// before Win). Labels outside the class range are ignored.
pub fn majority_label(labels: impl IntoIterator<Item = usize>) -> Option<usize> {
    let mut counts = [0usize; NUM_CLASSES];
    let mut seen = false;
    for label in labels {
        if let Some(slot) = counts.get_mut(label) {
            *slot += 1;
            seen = true;
        }
    }
    if !seen {
        return None;
    }
    let mut best = 0;
    for class in 1..NUM_CLASSES {
        if counts[class] > counts[best] {
            best = class;
        }
    }
    Some(best)
}

fn label_counts(samples: &[Sample], indices: &[usize]) -> [usize; NUM_CLASSES] {
    let mut counts = [0usize; NUM_CLASSES];
    for &i in indices {
        counts[samples[i].label] += 1;
    }
    counts
}

// Sweeps each feature in sorted order, evaluating the midpoint between every
// pair of consecutive distinct values. Non-finite midpoints are skipped. Only a strictly lower impurity
// replaces the incumbent, so ties keep the earliest feature and threshold.
fn best_split(samples: &[Sample], indices: &[usize], n_features: usize) -> Option<SplitCandidate> {
    let n = indices.len();
    let total = label_counts(samples, indices);
    let mut best: Option<SplitCandidate> = None;
    let mut order = indices.to_vec();

    for feature in 0..n_features {
        order.sort_by(|&a, &b| {
            samples[a].features[feature].total_cmp(&samples[b].features[feature])
        });

        let mut left = [0usize; NUM_CLASSES];
        for pos in 0..n - 1 {
            let row = &samples[order[pos]];
            left[row.label] += 1;

            let here = row.features[feature];
            let next = samples[order[pos + 1]].features[feature];
            let threshold = (here + next) / 2.0;
            if here == next || !threshold.is_finite() {
                continue;
            }

            let mut right = total;
            for class in 0..NUM_CLASSES {
                right[class] -= left[class];
            }
            let left_n = pos + 1;
            let right_n = n - left_n;
            let impurity = (left_n as f64 / n as f64) * gini_impurity(&left)
                + (right_n as f64 / n as f64) * gini_impurity(&right);

            if best.is_none_or(|b| impurity < b.impurity) {
                best = Some(SplitCandidate {
                    feature,
                    threshold,
                    impurity,
                });
            }
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_structure(tree: &DecisionTree) {
        for node in tree.nodes() {
            match *node {
                TreeNode::Leaf { class } => assert!(class < NUM_CLASSES),
                TreeNode::Split { left, right, .. } => {
                    assert!(left < tree.n_nodes());
                    assert!(right < tree.n_nodes());
                    assert_ne!(left, right);
                }
            }
        }
    }

    #[test]
    fn gini_bounds() {
        assert_eq!(gini_impurity(&[7, 0, 0]), 0.0);
        assert_eq!(gini_impurity(&[0, 0, 3]), 0.0);
        let max = gini_impurity(&[4, 4, 4]);
        assert!((max - (1.0 - 1.0 / 3.0)).abs() < 1e-12);
        for counts in [[1, 2, 3], [10, 0, 1], [5, 5, 0], [1, 1, 1]] {
            let g = gini_impurity(&counts);
            assert!((0.0..=1.0 - 1.0 / 3.0 + 1e-12).contains(&g));
        }
    }

    #[test]
    fn majority_ties_prefer_lowest_ordinal() {
        assert_eq!(majority_label([2, 1, 2, 1]), Some(1));
        assert_eq!(majority_label([2, 0, 2, 0, 1]), Some(0));
        assert_eq!(majority_label([2, 2, 1]), Some(2));
        assert_eq!(majority_label(std::iter::empty()), None);
    }

    #[test]
    fn separable_data_splits_on_the_informative_feature() {
        let mut samples = Vec::new();
        for i in 0..10 {
            samples.push(Sample::new(vec![5.0, i as f64], 0));
            samples.push(Sample::new(vec![5.0, 20.0 + i as f64], 2));
        }
        let tree = DecisionTree::train(&samples, TreeConfig::default()).unwrap();
        match tree.nodes()[0] {
            TreeNode::Split {
                feature, threshold, ..
            } => {
                assert_eq!(feature, 1);
                assert!((threshold - 14.5).abs() < 1e-12);
            }
            TreeNode::Leaf { .. } => panic!("expected a split at the root"),
        }
        assert_eq!(tree.predict(&[5.0, 3.0]).unwrap(), 0);
        assert_eq!(tree.predict(&[5.0, 25.0]).unwrap(), 2);
        check_structure(&tree);
    }

    #[test]
    fn ties_keep_first_feature() {
        // Features 0 and 1 separate the classes equally well.
        let mut samples = Vec::new();
        for _ in 0..4 {
            samples.push(Sample::new(vec![0.0, 0.0], 0));
            samples.push(Sample::new(vec![1.0, 1.0], 2));
        }
        let tree = DecisionTree::train(&samples, TreeConfig::default()).unwrap();
        assert!(matches!(tree.nodes()[0], TreeNode::Split { feature: 0, .. }));
    }

    #[test]
    fn too_few_rows_make_a_single_leaf() {
        let samples = vec![
            Sample::new(vec![1.0], 2),
            Sample::new(vec![2.0], 0),
            Sample::new(vec![3.0], 2),
            Sample::new(vec![4.0], 1),
        ];
        let tree = DecisionTree::train(&samples, TreeConfig::default()).unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.predict(&[0.0]).unwrap(), 2);
    }

    #[test]
    fn constant_features_make_a_leaf() {
        let samples: Vec<Sample> = (0..8)
            .map(|i| Sample::new(vec![1.0, 1.0], if i % 3 == 0 { 1 } else { 0 }))
            .collect();
        let tree = DecisionTree::train(&samples, TreeConfig::default()).unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.predict(&[9.0, -9.0]).unwrap(), 0);
    }

    #[test]
    fn depth_is_capped() {
        // Alternating labels along one axis force the deepest possible tree.
        let samples: Vec<Sample> = (0..4096)
            .map(|i| Sample::new(vec![i as f64], (i % 2) * 2))
            .collect();
        let config = TreeConfig::default();
        let tree = DecisionTree::train(&samples, config).unwrap();
        assert!(tree.depth() <= config.max_depth + 1);
        assert_eq!(tree.depth(), config.max_depth + 1);
        check_structure(&tree);
    }

    #[test]
    fn empty_input_is_an_error() {
        let err = DecisionTree::train(&[], TreeConfig::default()).unwrap_err();
        assert!(matches!(err, ModelError::EmptyNode));
    }

    #[test]
    fn predict_checks_width() {
        let samples: Vec<Sample> = (0..6).map(|i| Sample::new(vec![i as f64, 0.0], 1)).collect();
        let tree = DecisionTree::train(&samples, TreeConfig::default()).unwrap();
        assert!(matches!(
            tree.predict(&[1.0]),
            Err(ModelError::FeatureWidth {
                expected: 2,
                actual: 1
            })
        ));
    }

    #[test]
    fn nan_column_does_not_hide_a_clean_split() {
        let mut samples = Vec::new();
        for _ in 0..10 {
            samples.push(Sample::new(vec![1.0, 0.0], 0));
            samples.push(Sample::new(vec![f64::NAN, 1.0], 2));
        }
        let tree = DecisionTree::train(&samples, TreeConfig::default()).unwrap();
        match tree.nodes()[0] {
            TreeNode::Split {
                feature, threshold, ..
            } => {
                assert_eq!(feature, 1);
                assert!((threshold - 0.5).abs() < 1e-12);
            }
            TreeNode::Leaf { .. } => panic!("expected a split at the root"),
        }
        assert_eq!(tree.predict(&[f64::NAN, 1.0]).unwrap(), 2);
        assert_eq!(tree.predict(&[1.0, 0.0]).unwrap(), 0);
    }

    #[test]
    fn out_of_range_labels_are_rejected() {
        let samples: Vec<Sample> = (0..6).map(|i| Sample::new(vec![i as f64], i % 4)).collect();
        let err = DecisionTree::train(&samples, TreeConfig::default()).unwrap_err();
        assert!(matches!(err, ModelError::InvalidLabel(3)));
        assert_eq!(majority_label([7, 1]), Some(1));
        assert_eq!(majority_label([7]), None);
    }

    #[test]
    fn repeated_indices_act_as_bootstrap_weights() {
        let samples = vec![
            Sample::new(vec![0.0], 0),
            Sample::new(vec![1.0], 2),
        ];
        let tree =
            DecisionTree::train_on(&samples, &[1, 1, 1, 0], TreeConfig::default()).unwrap();
        assert_eq!(tree.n_nodes(), 1);
        assert_eq!(tree.predict(&[0.0]).unwrap(), 2);
    }
}
