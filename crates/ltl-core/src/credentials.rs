use std::path::Path;

use serde::Deserialize;

use crate::ConfigError;

/// Bluesky account handle plus app password.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub identifier: String,
    pub app_password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("app_password", &"[redacted]")
            .finish()
    }
}

impl Credentials {
    /// Build credentials from inline values, validating both are non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidCredentials`] if either value is blank.
    pub fn new(identifier: &str, app_password: &str) -> Result<Self, ConfigError> {
        let creds = Self {
            identifier: identifier.trim().to_string(),
            app_password: app_password.trim().to_string(),
        };
        creds.validate("<inline>")?;
        Ok(creds)
    }

    /// Load credentials from a JSON file with `identifier` and `app_password`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing, is not valid JSON, or
    /// either field is absent or blank.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CredentialsIo {
            path: path.display().to_string(),
            source: e,
        })?;

        let creds: Credentials =
            serde_json::from_str(&content).map_err(|e| ConfigError::InvalidCredentials {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        creds.validate(&path.display().to_string())?;
        Ok(creds)
    }

    fn validate(&self, origin: &str) -> Result<(), ConfigError> {
        if self.identifier.trim().is_empty() {
            return Err(ConfigError::InvalidCredentials {
                path: origin.to_string(),
                reason: "identifier is empty".to_string(),
            });
        }
        if self.app_password.trim().is_empty() {
            return Err(ConfigError::InvalidCredentials {
                path: origin.to_string(),
                reason: "app_password is empty".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_valid_file() {
        let file = write_file(r#"{"identifier": "me.bsky.social", "app_password": "abcd-efgh"}"#);
        let creds = Credentials::load(file.path()).unwrap();
        assert_eq!(creds.identifier, "me.bsky.social");
        assert_eq!(creds.app_password, "abcd-efgh");
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = Credentials::load(Path::new("/definitely/not/here/auth.json"));
        assert!(matches!(result, Err(ConfigError::CredentialsIo { .. })));
    }

    #[test]
    fn missing_field_is_invalid() {
        let file = write_file(r#"{"identifier": "me.bsky.social"}"#);
        let result = Credentials::load(file.path());
        assert!(matches!(
            result,
            Err(ConfigError::InvalidCredentials { .. })
        ));
    }

    #[test]
    fn blank_password_is_invalid() {
        let file = write_file(r#"{"identifier": "me", "app_password": "  "}"#);
        let result = Credentials::load(file.path());
        assert!(matches!(
            result,
            Err(ConfigError::InvalidCredentials { ref reason, .. }) if reason.contains("app_password")
        ));
    }

    #[test]
    fn debug_redacts_password() {
        let creds = Credentials::new("me", "secret-value").unwrap();
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("secret-value"));
        assert!(rendered.contains("[redacted]"));
    }
}
