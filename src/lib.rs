pub mod analytics;
pub mod config;
pub mod dataset;
pub mod encoder;
pub mod error;
pub mod evaluation;
pub mod forest;
pub mod http;
pub mod match_data;
pub mod predictor;
pub mod service;
pub mod tree;

pub use error::{ModelError, Result};
pub use match_data::{MatchRecord, MatchResult, PredictionInput, Venue};
pub use predictor::{MatchPredictor, Prediction};
pub use service::PredictionService;
