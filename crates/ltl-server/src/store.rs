//! The labeled dataset the dashboard serves.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use ltl_core::dataset::read_labeled;
use ltl_core::{DatasetError, LabeledPost};

/// Rows currently served, replaced wholesale by a custom query.
#[derive(Debug, Clone, Default)]
pub struct DatasetStore {
    pub source: Option<PathBuf>,
    pub rows: Vec<LabeledPost>,
    pub loaded_at: Option<DateTime<Utc>>,
}

impl DatasetStore {
    /// Load a classifier output file.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if the file is missing or malformed.
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        let rows = read_labeled(path)?;
        tracing::info!(path = %path.display(), rows = rows.len(), "dataset loaded");
        Ok(Self::from_rows(Some(path.to_path_buf()), rows))
    }

    #[must_use]
    pub fn from_rows(source: Option<PathBuf>, rows: Vec<LabeledPost>) -> Self {
        Self {
            source,
            rows,
            loaded_at: Some(Utc::now()),
        }
    }
}
