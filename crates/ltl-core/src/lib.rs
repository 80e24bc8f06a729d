//! Shared domain types for the likes-to-loyalty pipeline.
//!
//! Holds the post and label records that flow between the scraper, the
//! sentiment classifier and the dashboard, the static emotion → funnel
//! stage table, CSV dataset persistence, and application configuration.

pub mod analytics;
pub mod app_config;
pub mod config;
pub mod credentials;
pub mod dataset;
pub mod error;
pub mod funnel;
pub mod posts;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use credentials::Credentials;
pub use dataset::{processed_path, raw_path, LabeledPostWriter, PostWriter, StageOutput};
pub use error::{ConfigError, DatasetError};
pub use funnel::{funnel_stage_for, EmotionLabel, FunnelStage};
pub use posts::{default_save_name, post_id, LabeledPost, Post, SentimentResult, PLATFORM_BLUESKY};
