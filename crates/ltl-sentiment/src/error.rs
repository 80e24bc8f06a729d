use ltl_core::{ConfigError, DatasetError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SentimentError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Inference failed or the model answered with something unusable.
    #[error("classifier error: {0}")]
    Classifier(String),

    #[error(transparent)]
    Dataset(#[from] DatasetError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
