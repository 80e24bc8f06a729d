use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub data_root: PathBuf,
    pub auth_file: PathBuf,
    pub bsky_base_url: String,
    pub classifier_url: String,
    pub classifier_api_token: Option<String>,
    pub classifier_batch_size: usize,
    pub max_text_len: usize,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Declared post language to keep; `None` keeps every language.
    pub search_language: Option<String>,
    pub bind_addr: SocketAddr,
    /// Bearer tokens accepted by the dashboard API.
    pub api_keys: Vec<String>,
    pub log_level: String,
    pub dashboard_dataset: Option<PathBuf>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("data_root", &self.data_root)
            .field("auth_file", &self.auth_file)
            .field("bsky_base_url", &self.bsky_base_url)
            .field("classifier_url", &self.classifier_url)
            .field(
                "classifier_api_token",
                &self.classifier_api_token.as_ref().map(|_| "[redacted]"),
            )
            .field("classifier_batch_size", &self.classifier_batch_size)
            .field("max_text_len", &self.max_text_len)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("search_language", &self.search_language)
            .field("bind_addr", &self.bind_addr)
            .field("api_keys", &format!("[{} redacted]", self.api_keys.len()))
            .field("log_level", &self.log_level)
            .field("dashboard_dataset", &self.dashboard_dataset)
            .finish()
    }
}
