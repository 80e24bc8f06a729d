//! CSV persistence for pipeline stages.
//!
//! Each stage writes its own file under the data root and never rewrites the
//! file it read from:
//!
//! ```text
//! <data_root>/raw/<name>.csv                       scraper output
//! <data_root>/processed/labeled_posts_<name>.csv   classifier output
//! ```
//!
//! Headers are written explicitly so an empty stage output still carries the
//! full schema.

use std::fs::File;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::posts::{LabeledPost, Post};
use crate::{ConfigError, DatasetError};

/// Raw dataset columns, in file order.
pub const POST_COLUMNS: [&str; 14] = [
    "id",
    "text",
    "author",
    "author_display_name",
    "timestamp",
    "query",
    "uri",
    "reply_count",
    "repost_count",
    "quote_count",
    "like_count",
    "embed_type",
    "language",
    "platform",
];

/// Classifier dataset columns: the raw columns plus the three label columns.
pub const LABELED_COLUMNS: [&str; 17] = [
    "id",
    "text",
    "author",
    "author_display_name",
    "timestamp",
    "query",
    "uri",
    "reply_count",
    "repost_count",
    "quote_count",
    "like_count",
    "embed_type",
    "language",
    "platform",
    "sentiment_label",
    "sentiment_confidence",
    "funnel_stage",
];

/// What a pipeline stage hands to the next one.
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutput<T> {
    /// Batch mode: rows are only on disk.
    Persisted { path: PathBuf, count: usize },
    /// Streaming mode: rows are on disk and kept in memory for live use.
    PersistedAndBuffered { path: PathBuf, rows: Vec<T> },
}

impl<T> StageOutput<T> {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            StageOutput::Persisted { path, .. } | StageOutput::PersistedAndBuffered { path, .. } => {
                path
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            StageOutput::Persisted { count, .. } => *count,
            StageOutput::PersistedAndBuffered { rows, .. } => rows.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn rows(&self) -> Option<&[T]> {
        match self {
            StageOutput::Persisted { .. } => None,
            StageOutput::PersistedAndBuffered { rows, .. } => Some(rows),
        }
    }

    #[must_use]
    pub fn into_rows(self) -> Option<Vec<T>> {
        match self {
            StageOutput::Persisted { .. } => None,
            StageOutput::PersistedAndBuffered { rows, .. } => Some(rows),
        }
    }
}

/// Check that `name` is a single plain file stem.
///
/// Only ASCII letters, digits, `_` and `-` are accepted, so a name can never
/// carry a separator, `..`, or an absolute path out of the data root.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidDatasetName`] otherwise.
pub fn validate_name(name: &str) -> Result<(), ConfigError> {
    let reason = if name.is_empty() {
        "name is empty"
    } else if name.len() > 128 {
        "name is longer than 128 characters"
    } else if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        "only ASCII letters, digits, '_' and '-' are allowed"
    } else {
        return Ok(());
    };
    Err(ConfigError::InvalidDatasetName {
        name: name.to_string(),
        reason: reason.to_string(),
    })
}

/// Path of the scraper's output for `name`.
#[must_use]
pub fn raw_path(data_root: &Path, name: &str) -> PathBuf {
    data_root.join("raw").join(format!("{name}.csv"))
}

/// Path of the classifier's output for `name`.
#[must_use]
pub fn processed_path(data_root: &Path, name: &str) -> PathBuf {
    data_root
        .join("processed")
        .join(format!("labeled_posts_{name}.csv"))
}

/// Incremental CSV writer; rows are flushed after every [`append`](Self::append).
pub struct DatasetWriter<T> {
    path: PathBuf,
    writer: csv::Writer<File>,
    written: usize,
    _rows: PhantomData<T>,
}

pub type PostWriter = DatasetWriter<Post>;
pub type LabeledPostWriter = DatasetWriter<LabeledPost>;

impl<T: Serialize> DatasetWriter<T> {
    fn create_with_columns(path: &Path, columns: &[&str]) -> Result<Self, DatasetError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DatasetError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)
            .map_err(|e| csv_error(path, e))?;
        writer
            .write_record(columns)
            .map_err(|e| csv_error(path, e))?;
        writer.flush().map_err(|e| DatasetError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            writer,
            written: 0,
            _rows: PhantomData,
        })
    }

    /// Serialize `rows` and flush them to disk.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] on serialization or I/O failure.
    pub fn append(&mut self, rows: &[T]) -> Result<(), DatasetError> {
        for row in rows {
            self.writer
                .serialize(row)
                .map_err(|e| csv_error(&self.path, e))?;
        }
        self.writer.flush().map_err(|e| DatasetError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        self.written += rows.len();
        Ok(())
    }

    #[must_use]
    pub fn written(&self) -> usize {
        self.written
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and close, returning the path and the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError::Io`] if the final flush fails.
    pub fn finish(mut self) -> Result<(PathBuf, usize), DatasetError> {
        self.writer.flush().map_err(|e| DatasetError::Io {
            path: self.path.clone(),
            source: e,
        })?;
        Ok((self.path, self.written))
    }
}

impl PostWriter {
    /// Create (or truncate) a raw dataset file and write its header.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if the directory or file cannot be created.
    pub fn create(path: &Path) -> Result<Self, DatasetError> {
        Self::create_with_columns(path, &POST_COLUMNS)
    }
}

impl LabeledPostWriter {
    /// Create a classifier dataset file and write its header.
    ///
    /// # Errors
    ///
    /// Returns [`DatasetError`] if the directory or file cannot be created.
    pub fn create(path: &Path) -> Result<Self, DatasetError> {
        Self::create_with_columns(path, &LABELED_COLUMNS)
    }
}

/// Write a whole raw dataset.
///
/// # Errors
///
/// Returns [`DatasetError`] on I/O or serialization failure.
pub fn write_posts(path: &Path, posts: &[Post]) -> Result<usize, DatasetError> {
    let mut writer = PostWriter::create(path)?;
    writer.append(posts)?;
    writer.finish().map(|(_, n)| n)
}

/// Write a whole classifier dataset.
///
/// # Errors
///
/// Returns [`DatasetError`] on I/O or serialization failure.
pub fn write_labeled(path: &Path, rows: &[LabeledPost]) -> Result<usize, DatasetError> {
    let mut writer = LabeledPostWriter::create(path)?;
    writer.append(rows)?;
    writer.finish().map(|(_, n)| n)
}

/// Read a raw dataset.
///
/// # Errors
///
/// Returns [`DatasetError`] if the file is missing or a row does not parse.
pub fn read_posts(path: &Path) -> Result<Vec<Post>, DatasetError> {
    read_rows(path)
}

/// Read a classifier dataset.
///
/// # Errors
///
/// Returns [`DatasetError`] if the file is missing or a row does not parse.
pub fn read_labeled(path: &Path) -> Result<Vec<LabeledPost>, DatasetError> {
    read_rows(path)
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, DatasetError> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| csv_error(path, e))?;
    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| csv_error(path, e))
}

/// Fail if `output` would overwrite `input`.
///
/// # Errors
///
/// Returns [`DatasetError::WouldOverwriteInput`] when both resolve to the
/// same file.
pub fn ensure_distinct(input: &Path, output: &Path) -> Result<(), DatasetError> {
    let same = input == output
        || matches!(
            (input.canonicalize(), output.canonicalize()),
            (Ok(a), Ok(b)) if a == b
        );
    if same {
        return Err(DatasetError::WouldOverwriteInput(output.to_path_buf()));
    }
    Ok(())
}

fn csv_error(path: &Path, source: csv::Error) -> DatasetError {
    DatasetError::Csv {
        path: path.to_path_buf(),
        source,
    }
}
