//! TEI (Text Embeddings Inference) client for sequence classification.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use crate::error::SentimentError;
use crate::model::{EmotionModel, LabelScore};

/// What the server reports about the loaded model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelInfo {
    pub model_id: String,
    /// Label vocabulary in id order.
    pub labels: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct InfoResponse {
    model_id: String,
    model_type: ModelType,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ModelType {
    Classifier(ClassifierConfig),
    Embedding(serde_json::Value),
    Reranker(ClassifierConfig),
}

#[derive(Debug, Deserialize)]
struct ClassifierConfig {
    id2label: BTreeMap<String, String>,
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    inputs: Vec<[&'a str; 1]>,
    truncate: bool,
}

/// HTTP client for a TEI server hosting an emotion classifier.
///
/// The model handle (`/info`) is resolved on first use and cached for the
/// life of the client, so every batch in a run reuses it.
pub struct TeiClassifier {
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
    info: OnceCell<ModelInfo>,
}

impl TeiClassifier {
    /// Create a client for the TEI server at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::Http`] if the HTTP client cannot be built.
    pub fn new(
        base_url: &str,
        timeout_secs: u64,
        api_token: Option<String>,
    ) -> Result<Self, SentimentError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
            info: OnceCell::new(),
        })
    }

    /// The loaded model's id and labels, fetched once.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::Classifier`] if the server is unreachable or
    /// is not serving a classification model.
    pub async fn info(&self) -> Result<&ModelInfo, SentimentError> {
        self.info.get_or_try_init(|| self.fetch_info()).await
    }

    async fn fetch_info(&self) -> Result<ModelInfo, SentimentError> {
        let response = self
            .authorized(self.client.get(format!("{}/info", self.base_url)))
            .send()
            .await
            .map_err(|e| SentimentError::Classifier(format!("TEI info request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(SentimentError::Classifier(format!(
                "TEI info returned status {}",
                response.status()
            )));
        }

        let info: InfoResponse = response
            .json()
            .await
            .map_err(|e| SentimentError::Classifier(format!("TEI info parse error: {e}")))?;

        let config = match info.model_type {
            ModelType::Classifier(config) => config,
            ModelType::Embedding(_) | ModelType::Reranker(_) => {
                return Err(SentimentError::Classifier(format!(
                    "model {} is not a sequence classifier",
                    info.model_id
                )));
            }
        };

        let mut ids: Vec<(u32, String)> = config
            .id2label
            .into_iter()
            .filter_map(|(id, label)| id.parse::<u32>().ok().map(|id| (id, label)))
            .collect();
        ids.sort_by_key(|(id, _)| *id);
        let labels: Vec<String> = ids.into_iter().map(|(_, label)| label).collect();

        if labels.is_empty() {
            return Err(SentimentError::Classifier(format!(
                "model {} reports no labels",
                info.model_id
            )));
        }

        tracing::info!(model = %info.model_id, labels = labels.len(), "classifier model loaded");
        Ok(ModelInfo {
            model_id: info.model_id,
            labels,
        })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn predict(&self, inputs: &[String]) -> Result<Vec<Vec<LabelScore>>, SentimentError> {
        self.info().await?;
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let body = PredictRequest {
            inputs: inputs.iter().map(|s| [s.as_str()]).collect(),
            truncate: true,
        };
        let response = self
            .authorized(self.client.post(format!("{}/predict", self.base_url)))
            .json(&body)
            .send()
            .await
            .map_err(|e| SentimentError::Classifier(format!("TEI request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(SentimentError::Classifier(format!(
                "TEI returned status {}",
                response.status()
            )));
        }

        let scores: Vec<Vec<LabelScore>> = response
            .json()
            .await
            .map_err(|e| SentimentError::Classifier(format!("TEI response parse error: {e}")))?;

        if scores.len() != inputs.len() {
            return Err(SentimentError::Classifier(format!(
                "TEI returned {} predictions for {} inputs",
                scores.len(),
                inputs.len()
            )));
        }

        Ok(scores)
    }
}

impl EmotionModel for TeiClassifier {
    async fn classify(&self, inputs: &[String]) -> Result<Vec<Vec<LabelScore>>, SentimentError> {
        self.predict(inputs).await
    }
}
