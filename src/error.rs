use thiserror::Error;

pub type Result<T> = std::result::Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("no usable training rows after cleaning the dataset")]
    EmptyTrainingSet,

    #[error("decision tree received zero rows")]
    EmptyNode,

    #[error("forest must contain at least one tree")]
    NoTrees,

    #[error("label {0} is not a class ordinal")]
    InvalidLabel(usize),

    #[error("feature vector has {actual} values, model expects {expected}")]
    FeatureWidth { expected: usize, actual: usize },

    #[error("invalid prediction input: {0}")]
    InvalidInput(String),

    #[error("dataset unavailable: {0:#}")]
    Dataset(#[from] anyhow::Error),
}
