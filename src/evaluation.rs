use rand::Rng;
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::error::Result;
use crate::match_data::{MatchRecord, MatchResult, NUM_CLASSES};
use crate::predictor::MatchPredictor;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Prob3 {
    pub win: f64,
    pub draw: f64,
    pub loss: f64,
}

impl Prob3 {
    pub fn uniform() -> Self {
        Self {
            win: 1.0 / 3.0,
            draw: 1.0 / 3.0,
            loss: 1.0 / 3.0,
        }
    }

    /// From vote shares indexed by class ordinal.
    pub fn from_fractions(fractions: [f64; NUM_CLASSES]) -> Self {
        Self {
            loss: fractions[MatchResult::Loss.encode()],
            draw: fractions[MatchResult::Draw.encode()],
            win: fractions[MatchResult::Win.encode()],
        }
    }

    pub fn of(&self, result: MatchResult) -> f64 {
        match result {
            MatchResult::Win => self.win,
            MatchResult::Draw => self.draw,
            MatchResult::Loss => self.loss,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Metrics {
    pub samples: usize,
    pub brier: f64,
    pub log_loss: f64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ClassReport {
    pub precision: f64,
    pub recall: f64,
    pub support: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub metrics: Metrics,
    /// `confusion[actual][predicted]`, indexed by class ordinal.
    pub confusion: [[usize; NUM_CLASSES]; NUM_CLASSES],
    pub per_class: [ClassReport; NUM_CLASSES],
    pub skipped: usize,
}

pub fn evaluate_probs(predictions: &[Prob3], outcomes: &[MatchResult]) -> Metrics {
    if predictions.is_empty() || predictions.len() != outcomes.len() {
        return Metrics::default();
    }

    let mut brier_sum = 0.0_f64;
    let mut log_loss_sum = 0.0_f64;
    let mut correct = 0usize;

    for (p, outcome) in predictions.iter().zip(outcomes) {
        for class in MatchResult::ALL {
            let y = if class == *outcome { 1.0 } else { 0.0 };
            brier_sum += (p.of(class) - y).powi(2);
        }
        log_loss_sum += -p.of(*outcome).clamp(1e-12, 1.0).ln();
        if argmax(*p) == *outcome {
            correct += 1;
        }
    }

    let n = predictions.len() as f64;
    Metrics {
        samples: predictions.len(),
        brier: brier_sum / n,
        log_loss: log_loss_sum / n,
        accuracy: correct as f64 / n,
    }
}

// Same tie order as the forest vote: Loss, then Draw, then Win.
fn argmax(p: Prob3) -> MatchResult {
    let mut best = MatchResult::Loss;
    for class in [MatchResult::Draw, MatchResult::Win] {
        if p.of(class) > p.of(best) {
            best = class;
        }
    }
    best
}

/// Scores a trained model on held-out rows. Rows without a result are
/// counted in `skipped`.
pub fn evaluate(model: &MatchPredictor, test: &[MatchRecord]) -> Result<EvaluationReport> {
    let mut probs = Vec::with_capacity(test.len());
    let mut outcomes = Vec::with_capacity(test.len());
    let mut confusion = [[0usize; NUM_CLASSES]; NUM_CLASSES];
    let mut skipped = 0usize;

    for record in test {
        let Some(actual) = record.result else {
            skipped += 1;
            continue;
        };
        let vote = model.vote(record)?;
        confusion[actual.encode()][vote.class] += 1;
        let n = model.forest().len().max(1) as f64;
        probs.push(Prob3::from_fractions(vote.votes.map(|v| v as f64 / n)));
        outcomes.push(actual);
    }

    let mut metrics = evaluate_probs(&probs, &outcomes);
    // Hard-vote accuracy, which is what the service answers with.
    let total: usize = confusion.iter().flatten().sum();
    if total > 0 {
        let correct: usize = (0..NUM_CLASSES).map(|c| confusion[c][c]).sum();
        metrics.accuracy = correct as f64 / total as f64;
    }

    let mut per_class = [ClassReport::default(); NUM_CLASSES];
    for class in 0..NUM_CLASSES {
        let tp = confusion[class][class];
        let predicted: usize = (0..NUM_CLASSES).map(|a| confusion[a][class]).sum();
        let support: usize = confusion[class].iter().sum();
        per_class[class] = ClassReport {
            precision: ratio(tp, predicted),
            recall: ratio(tp, support),
            support,
        };
    }

    Ok(EvaluationReport {
        metrics,
        confusion,
        per_class,
        skipped,
    })
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Shuffles each outcome class separately and holds out `test_fraction` of
/// it, so both sides keep the original label mix. Rows without a result go
/// to the training side.
pub fn stratified_split<R: Rng + ?Sized>(
    records: &[MatchRecord],
    test_fraction: f64,
    rng: &mut R,
) -> (Vec<MatchRecord>, Vec<MatchRecord>) {
    let fraction = test_fraction.clamp(0.0, 1.0);
    let mut train = Vec::new();
    let mut test = Vec::new();

    let mut buckets: [Vec<&MatchRecord>; NUM_CLASSES] = Default::default();
    for record in records {
        match record.result {
            Some(result) => buckets[result.encode()].push(record),
            None => train.push(record.clone()),
        }
    }

    for bucket in buckets.iter_mut() {
        bucket.shuffle(rng);
        let n_test = (bucket.len() as f64 * fraction).round() as usize;
        for (i, record) in bucket.iter().enumerate() {
            if i < n_test {
                test.push((*record).clone());
            } else {
                train.push((*record).clone());
            }
        }
    }
    (train, test)
}
