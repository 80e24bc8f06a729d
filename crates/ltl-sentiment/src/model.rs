use std::future::Future;

use serde::Deserialize;

use crate::error::SentimentError;

/// One label's probability for one input.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f32,
}

/// A multi-class emotion model.
///
/// Implementations return one score list per input, in input order.
pub trait EmotionModel {
    fn classify(
        &self,
        inputs: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<LabelScore>>, SentimentError>> + Send;
}

/// Highest-scoring label. Equal scores resolve to the label that sorts first.
#[must_use]
pub fn top_label(scores: &[LabelScore]) -> Option<&LabelScore> {
    scores.iter().reduce(|best, candidate| {
        match candidate.score.total_cmp(&best.score) {
            std::cmp::Ordering::Greater => candidate,
            std::cmp::Ordering::Equal if candidate.label < best.label => candidate,
            _ => best,
        }
    })
}

/// Text sent to the model: the query as context, then the post, cut to
/// `max_chars` characters.
#[must_use]
pub fn model_input(query: &str, text: &str, max_chars: usize) -> String {
    format!("Query: {query}. Post: {text}")
        .chars()
        .take(max_chars)
        .collect()
}
