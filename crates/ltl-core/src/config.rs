use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can feed a `HashMap`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let parse_positive = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        let value = raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })?;
        if value == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(value)
    };

    let to_usize = |var: &str, value: u64| -> Result<usize, ConfigError> {
        usize::try_from(value).map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let env = parse_environment(&or_default("LTL_ENV", "development"))?;

    let data_root = PathBuf::from(or_default("LTL_DATA_ROOT", "data"));
    let auth_file = PathBuf::from(or_default("LTL_AUTH_FILE", "auth.json"));
    let bsky_base_url = or_default("LTL_BSKY_BASE_URL", "https://bsky.social");
    let classifier_url = or_default("LTL_CLASSIFIER_URL", "http://localhost:8080");
    let classifier_api_token = optional("LTL_CLASSIFIER_API_TOKEN");

    let classifier_batch_size = to_usize(
        "LTL_CLASSIFIER_BATCH_SIZE",
        parse_positive("LTL_CLASSIFIER_BATCH_SIZE", "100")?,
    )?;
    let max_text_len = to_usize(
        "LTL_MAX_TEXT_LEN",
        parse_positive("LTL_MAX_TEXT_LEN", "512")?,
    )?;
    let request_timeout_secs = parse_positive("LTL_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("LTL_USER_AGENT", "likes-to-loyalty/0.1 (funnel-analysis)");

    // Set-but-empty disables the language filter; unset keeps the default.
    let search_language = match lookup("LTL_SEARCH_LANGUAGE") {
        Ok(v) if v.trim().is_empty() => None,
        Ok(v) => Some(v.trim().to_lowercase()),
        Err(_) => Some("en".to_string()),
    };

    let raw_bind = or_default("LTL_BIND_ADDR", "0.0.0.0:3000");
    let bind_addr = raw_bind
        .parse::<SocketAddr>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: "LTL_BIND_ADDR".to_string(),
            reason: e.to_string(),
        })?;
    let api_keys: Vec<String> = or_default("LTL_API_KEYS", "")
        .split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(ToOwned::to_owned)
        .collect();
    let log_level = or_default("LTL_LOG_LEVEL", "info");
    let dashboard_dataset = optional("LTL_DASHBOARD_DATASET").map(PathBuf::from);

    Ok(AppConfig {
        env,
        data_root,
        auth_file,
        bsky_base_url,
        classifier_url,
        classifier_api_token,
        classifier_batch_size,
        max_text_len,
        request_timeout_secs,
        user_agent,
        search_language,
        bind_addr,
        api_keys,
        log_level,
        dashboard_dataset,
    })
}

fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "LTL_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
