use rand::SeedableRng;
use rand::rngs::StdRng;

use match_forest::dataset::StaticProvider;
use match_forest::encoder::{FEATURE_COUNT, UNSEEN_FREQUENCY};
use match_forest::forest::ForestConfig;
use match_forest::tree::TreeNode;
use match_forest::{
    MatchPredictor, MatchRecord, MatchResult, Prediction, PredictionInput, PredictionService,
    Venue,
};

fn synthetic_match(i: usize) -> MatchRecord {
    let home = i % 2 == 0;
    MatchRecord {
        team: Some("X".to_string()),
        opponent: Some(if i % 4 < 2 { "Y" } else { "Z" }.to_string()),
        venue: Some(if home { Venue::Home } else { Venue::Away }),
        formation: Some("4-3-3".to_string()),
        referee: Some(format!("Ref {}", i % 3)),
        captain: Some("Skipper".to_string()),
        competition: Some("League".to_string()),
        day: Some(if i % 3 == 0 { "Sat" } else { "Sun" }.to_string()),
        possession: Some(if home { 60.0 } else { 40.0 }),
        shots: Some(if home { 12.0 } else { 8.0 }),
        shots_on_target: Some(if home { 6.0 } else { 2.0 }),
        free_kicks: Some(1.0),
        penalties: Some(0.0),
        shot_distance: Some(17.0),
        result: Some(if home { MatchResult::Win } else { MatchResult::Loss }),
    }
}

fn home_input(formation: &str) -> PredictionInput {
    PredictionInput {
        team: "X".to_string(),
        opponent: "Y".to_string(),
        venue: Venue::Home,
        formation: formation.to_string(),
        possession: 60.0,
        shots: 12.0,
        shots_on_target: 6.0,
    }
}

fn service_for(records: Vec<MatchRecord>, seed: u64) -> PredictionService {
    PredictionService::new(
        Box::new(StaticProvider::new(records)),
        ForestConfig::default(),
        Some(seed),
    )
}

#[test]
fn home_winner_is_predicted_to_win_at_home() {
    let svc = service_for((0..20).map(synthetic_match).collect(), 2024);
    let p = svc.predict(&home_input("4-3-3"));
    assert_eq!(p.result, MatchResult::Win);
    assert!(p.confidence > 0.5);
    assert!(p.confidence <= 1.0);
}

#[test]
fn tiny_dataset_yields_leaf_only_trees() {
    let records: Vec<MatchRecord> = (0..4).map(synthetic_match).collect();
    let mut rng = StdRng::seed_from_u64(5);
    let model = MatchPredictor::train(&records, ForestConfig::default(), &mut rng).unwrap();
    assert_eq!(model.forest().len(), 10);
    for tree in model.forest().trees() {
        assert_eq!(tree.depth(), 0);
        assert_eq!(tree.n_nodes(), 1);
        assert!(matches!(tree.nodes()[0], TreeNode::Leaf { .. }));
    }

    let svc = service_for(records, 5);
    let p = svc.predict(&home_input("4-3-3"));
    assert!((0.0..=1.0).contains(&p.confidence));
    assert!(svc.is_ready());
}

#[test]
fn unseen_formation_still_predicts() {
    let records: Vec<MatchRecord> = (0..20).map(synthetic_match).collect();
    let mut rng = StdRng::seed_from_u64(11);
    let model = MatchPredictor::train(&records, ForestConfig::default(), &mut rng).unwrap();

    let record = home_input("3-5-2").to_record();
    let features = model.encoder().transform(&record);
    assert_eq!(features.len(), FEATURE_COUNT);
    assert_eq!(features[10], UNSEEN_FREQUENCY);

    let p = model.predict(&record).unwrap();
    assert!(MatchResult::ALL.contains(&p.result));
    assert!((0.0..=1.0).contains(&p.confidence));
}

#[test]
fn seeded_training_is_reproducible() {
    let records: Vec<MatchRecord> = (0..40)
        .map(|i| {
            let mut m = synthetic_match(i);
            // Blur the pattern so trees disagree.
            if i % 7 == 0 {
                m.result = Some(MatchResult::Draw);
            }
            m.possession = Some(35.0 + (i * 13 % 30) as f64);
            m
        })
        .collect();

    let train = |seed| {
        let mut rng = StdRng::seed_from_u64(seed);
        MatchPredictor::train(&records, ForestConfig::default(), &mut rng).unwrap()
    };
    let a = train(99);
    let b = train(99);
    for record in &records {
        assert_eq!(a.vote(record).unwrap(), b.vote(record).unwrap());
    }
}

#[test]
fn every_tree_respects_depth_and_shape() {
    let records: Vec<MatchRecord> = (0..200)
        .map(|i| {
            let mut m = synthetic_match(i);
            m.possession = Some((i * 37 % 100) as f64);
            m.shots = Some((i * 7 % 23) as f64);
            m.result = MatchResult::decode(i * 5 % 3);
            m
        })
        .collect();
    let mut rng = StdRng::seed_from_u64(3);
    let model = MatchPredictor::train(&records, ForestConfig::default(), &mut rng).unwrap();
    for tree in model.forest().trees() {
        assert!(tree.depth() <= 11);
        for node in tree.nodes() {
            match *node {
                TreeNode::Leaf { class } => assert!(MatchResult::decode(class).is_some()),
                TreeNode::Split { left, right, .. } => {
                    assert!(left < tree.n_nodes() && right < tree.n_nodes());
                }
            }
        }
    }
}

#[test]
fn service_without_data_falls_back() {
    let svc = service_for(Vec::new(), 1);
    assert_eq!(svc.predict(&home_input("4-3-3")), Prediction::FALLBACK);
}
