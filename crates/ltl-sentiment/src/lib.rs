//! Emotion classification for scraped posts.
//!
//! Runs each post through a `GoEmotions` sequence classifier, keeps the top
//! label, and attaches the funnel stage it maps to.

pub mod error;
pub mod model;
pub mod pipeline;
pub mod tei;

pub use error::SentimentError;
pub use model::{model_input, top_label, EmotionModel, LabelScore};
pub use pipeline::{
    classify_posts, run_classification, Classification, ClassifierInput, ClassifyOptions,
    ClassifyStats,
};
pub use tei::{ModelInfo, TeiClassifier};
