//! Classify stage: label posts, map them to funnel stages, persist.

use std::path::PathBuf;

use ltl_core::dataset::{ensure_distinct, read_posts, validate_name, write_labeled};
use ltl_core::funnel::is_neutral_label;
use ltl_core::{
    funnel_stage_for, processed_path, LabeledPost, LabeledPostWriter, Post, SentimentResult,
    StageOutput,
};

use crate::error::SentimentError;
use crate::model::{model_input, top_label, EmotionModel};

/// Where the classifier reads posts from.
#[derive(Debug, Clone)]
pub enum ClassifierInput {
    /// A raw dataset on disk.
    File(PathBuf),
    /// Rows handed over in memory by a streaming scrape.
    Buffered(Vec<Post>),
}

/// A batch scrape hands over its file; a streaming scrape its rows.
impl From<StageOutput<Post>> for ClassifierInput {
    fn from(output: StageOutput<Post>) -> Self {
        match output {
            StageOutput::Persisted { path, .. } => ClassifierInput::File(path),
            StageOutput::PersistedAndBuffered { rows, .. } => ClassifierInput::Buffered(rows),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassifyOptions {
    /// Context prepended to every model input.
    pub query: String,
    /// Output is written to `processed/labeled_posts_<name>.csv`.
    pub name: String,
    pub data_root: PathBuf,
    pub suppress_neutral: bool,
    pub stream: bool,
    pub batch_size: usize,
    pub max_text_len: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifyStats {
    pub input: usize,
    pub retained: usize,
    pub suppressed: usize,
}

#[derive(Debug)]
pub struct Classification {
    pub output: StageOutput<LabeledPost>,
    pub stats: ClassifyStats,
}

/// Label `posts` in batches of `options.batch_size`.
///
/// Calls `on_batch` with each batch's retained rows as soon as they are
/// labeled. Neutral rows are dropped when `suppress_neutral` is set; every
/// other row is kept, including posts whose text is blank.
///
/// # Errors
///
/// Returns [`SentimentError::Classifier`] if the model fails, answers with
/// the wrong number of predictions, returns an empty score list, or reports
/// a score that is not a finite number. Errors from `on_batch` are
/// propagated.
pub async fn classify_posts<M, F>(
    model: &M,
    posts: Vec<Post>,
    options: &ClassifyOptions,
    mut on_batch: F,
) -> Result<ClassifyStats, SentimentError>
where
    M: EmotionModel,
    F: FnMut(Vec<LabeledPost>) -> Result<(), SentimentError>,
{
    let mut stats = ClassifyStats {
        input: posts.len(),
        ..ClassifyStats::default()
    };

    let batch_size = options.batch_size.max(1);
    let mut remaining = posts.into_iter().peekable();
    while remaining.peek().is_some() {
        let batch: Vec<Post> = remaining.by_ref().take(batch_size).collect();
        let inputs: Vec<String> = batch
            .iter()
            .map(|p| model_input(&options.query, &p.text, options.max_text_len))
            .collect();

        let predictions = model.classify(&inputs).await?;
        if predictions.len() != batch.len() {
            return Err(SentimentError::Classifier(format!(
                "model returned {} predictions for {} posts",
                predictions.len(),
                batch.len()
            )));
        }

        let mut labeled = Vec::with_capacity(batch.len());
        for (post, scores) in batch.into_iter().zip(predictions) {
            if let Some(bad) = scores.iter().find(|s| !s.score.is_finite()) {
                return Err(SentimentError::Classifier(format!(
                    "model returned non-finite score {} for label {} on post {}",
                    bad.score, bad.label, post.id
                )));
            }
            let Some(top) = top_label(&scores) else {
                return Err(SentimentError::Classifier(format!(
                    "model returned no scores for post {}",
                    post.id
                )));
            };
            if options.suppress_neutral && is_neutral_label(&top.label) {
                stats.suppressed += 1;
                continue;
            }
            let stage = funnel_stage_for(&top.label);
            let sentiment = SentimentResult {
                label: top.label.trim().to_lowercase(),
                confidence: top.score.clamp(0.0, 1.0),
            };
            labeled.push(LabeledPost::new(post, sentiment, stage));
        }

        stats.retained += labeled.len();
        on_batch(labeled)?;
    }

    Ok(stats)
}

/// Read the input, classify it, and write the labeled dataset.
///
/// The output path is derived from `options.name` and is never allowed to
/// equal the input file. In streaming mode each batch is appended and flushed
/// as it completes and the rows are kept in memory.
///
/// # Errors
///
/// - [`SentimentError::Config`] if `options.name` is not a plain dataset name.
/// - [`SentimentError::Dataset`] if the input cannot be read, the output would
///   overwrite the input, or writing fails.
/// - [`SentimentError::Classifier`] if inference fails.
pub async fn run_classification<M: EmotionModel>(
    model: &M,
    input: ClassifierInput,
    options: &ClassifyOptions,
) -> Result<Classification, SentimentError> {
    validate_name(&options.name)?;
    let output_path = processed_path(&options.data_root, &options.name);

    let posts = match input {
        ClassifierInput::File(path) => {
            ensure_distinct(&path, &output_path)?;
            read_posts(&path)?
        }
        ClassifierInput::Buffered(rows) => rows,
    };

    let mut rows: Vec<LabeledPost> = Vec::new();
    let (output, stats) = if options.stream {
        let mut writer = LabeledPostWriter::create(&output_path)?;
        let stats = classify_posts(model, posts, options, |batch| {
            writer.append(&batch)?;
            rows.extend(batch);
            Ok(())
        })
        .await?;
        let (path, _) = writer.finish()?;
        (StageOutput::PersistedAndBuffered { path, rows }, stats)
    } else {
        let stats = classify_posts(model, posts, options, |batch| {
            rows.extend(batch);
            Ok(())
        })
        .await?;
        let count = write_labeled(&output_path, &rows)?;
        (
            StageOutput::Persisted {
                path: output_path,
                count,
            },
            stats,
        )
    };

    tracing::info!(
        input = stats.input,
        retained = stats.retained,
        suppressed = stats.suppressed,
        path = %output.path().display(),
        "classification complete"
    );

    Ok(Classification { output, stats })
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
