use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read credentials file {path}: {source}")]
    CredentialsIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid credentials file {path}: {reason}")]
    InvalidCredentials { path: String, reason: String },

    #[error("malformed query \"{query}\": {reason}")]
    InvalidQuery { query: String, reason: String },

    #[error("invalid dataset name \"{name}\": {reason}")]
    InvalidDatasetName { name: String, reason: String },

    #[error("n_posts_requested must be a positive integer")]
    InvalidPostCount,
}

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("refusing to overwrite input dataset {0}")]
    WouldOverwriteInput(PathBuf),
}
