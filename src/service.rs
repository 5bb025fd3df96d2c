use once_cell::sync::OnceCell;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::ServiceConfig;
use crate::dataset::DatasetProvider;
use crate::error::Result;
use crate::forest::ForestConfig;
use crate::match_data::PredictionInput;
use crate::predictor::{MatchPredictor, Prediction};

/// Owns the trained model for the lifetime of the process.
///
/// The dataset is fetched and the forest trained on the first request;
/// concurrent first callers wait on the same initialization instead of
/// training twice. A failed initialization is not cached, so the next
/// request tries again.
pub struct PredictionService {
    provider: Box<dyn DatasetProvider>,
    forest: ForestConfig,
    seed: Option<u64>,
    model: OnceCell<MatchPredictor>,
}

impl PredictionService {
    pub fn new(provider: Box<dyn DatasetProvider>, forest: ForestConfig, seed: Option<u64>) -> Self {
        Self {
            provider,
            forest,
            seed,
            model: OnceCell::new(),
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(config.dataset.provider(), config.forest, config.seed)
    }

    pub fn is_ready(&self) -> bool {
        self.model.get().is_some()
    }

    pub fn predictor(&self) -> Result<&MatchPredictor> {
        self.model.get_or_try_init(|| self.initialize())
    }

    fn initialize(&self) -> Result<MatchPredictor> {
        log::info!("initializing model from {}", self.provider.describe());
        let records = self.provider.load()?;
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let model = MatchPredictor::train(&records, self.forest, &mut rng)?;
        log::info!("model training completed");
        Ok(model)
    }

    pub fn try_predict(&self, input: &PredictionInput) -> Result<Prediction> {
        input.validate()?;
        let prediction = self.predictor()?.predict(&input.to_record())?;
        log::info!(
            "prediction for {} vs {}: {} ({:.1}%)",
            input.team,
            input.opponent,
            prediction.result,
            prediction.confidence * 100.0
        );
        Ok(prediction)
    }

    /// Never fails: any error is logged and answered with a low-confidence
    /// draw.
    pub fn predict(&self, input: &PredictionInput) -> Prediction {
        match self.try_predict(input) {
            Ok(prediction) => prediction,
            Err(err) => {
                log::warn!("prediction failed, serving fallback: {err}");
                Prediction::FALLBACK
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::anyhow;

    use super::*;
    use crate::match_data::{MatchRecord, MatchResult, Venue};

    struct CountingProvider {
        records: Vec<MatchRecord>,
        loads: Arc<AtomicUsize>,
        fail: bool,
    }

    impl DatasetProvider for CountingProvider {
        fn load(&self) -> anyhow::Result<Vec<MatchRecord>> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(anyhow!("network down"));
            }
            Ok(self.records.clone())
        }

        fn describe(&self) -> String {
            "counting".to_string()
        }
    }

    fn record(i: usize) -> MatchRecord {
        let home = i % 2 == 0;
        MatchRecord {
            team: Some("X".to_string()),
            opponent: Some(format!("O{}", i % 3)),
            venue: Some(if home { Venue::Home } else { Venue::Away }),
            formation: Some("4-3-3".to_string()),
            referee: Some("Ref".to_string()),
            captain: Some("Cap".to_string()),
            possession: Some(if home { 60.0 } else { 40.0 }),
            shots: Some(12.0),
            shots_on_target: Some(5.0),
            shot_distance: Some(17.0),
            result: Some(if home { MatchResult::Win } else { MatchResult::Loss }),
            ..MatchRecord::default()
        }
    }

    fn input() -> PredictionInput {
        PredictionInput {
            team: "X".to_string(),
            opponent: "O1".to_string(),
            venue: Venue::Home,
            formation: "4-3-3".to_string(),
            possession: 60.0,
            shots: 12.0,
            shots_on_target: 5.0,
        }
    }

    fn service(records: Vec<MatchRecord>, fail: bool) -> (PredictionService, Arc<AtomicUsize>) {
        let loads = Arc::new(AtomicUsize::new(0));
        let provider = CountingProvider {
            records,
            loads: Arc::clone(&loads),
            fail,
        };
        (
            PredictionService::new(Box::new(provider), ForestConfig::default(), Some(17)),
            loads,
        )
    }

    #[test]
    fn trains_once_across_calls_and_threads() {
        let (svc, loads) = service((0..20).map(record).collect(), false);
        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| svc.predict(&input()));
            }
        });
        svc.predict(&input());
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(svc.is_ready());
    }

    #[test]
    fn empty_dataset_serves_fallback() {
        let (svc, _) = service(Vec::new(), false);
        assert_eq!(svc.predict(&input()), Prediction::FALLBACK);
        assert!(!svc.is_ready());
    }

    #[test]
    fn provider_failure_is_retried_on_next_call() {
        let (svc, loads) = service(Vec::new(), true);
        assert_eq!(svc.predict(&input()), Prediction::FALLBACK);
        assert_eq!(svc.predict(&input()), Prediction::FALLBACK);
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn invalid_input_serves_fallback() {
        let (svc, _) = service((0..20).map(record).collect(), false);
        let bad = PredictionInput {
            shots: -1.0,
            ..input()
        };
        assert_eq!(svc.predict(&bad), Prediction::FALLBACK);
        assert!(svc.try_predict(&bad).is_err());
    }

    #[test]
    fn home_win_pattern_is_learned() {
        let (svc, _) = service((0..20).map(record).collect(), false);
        let p = svc.try_predict(&input()).unwrap();
        assert_eq!(p.result, MatchResult::Win);
        assert!(p.confidence > 0.5);
    }
}
