//! Engine settings loader.
//!
//! Reads `flowmill.toml` from a config directory and deserializes it into
//! [`EngineSettings`]. Falls back to defaults when the file is missing or
//! malformed.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Top-level engine settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub engine: EngineSection,
    pub http: HttpSection,
    pub mail: MailSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSection {
    /// Wall-clock budget applied when a workflow does not set its own.
    pub default_timeout_ms: u64,
    /// Cap on concurrently executing nodes per execution.
    pub max_branch_concurrency: usize,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            default_timeout_ms: 300_000,
            max_branch_concurrency: 8,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSection {
    /// Per-request timeout for `api_call` and `webhook` nodes.
    pub request_timeout_secs: u64,
}

impl Default for HttpSection {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailSection {
    /// Base URL of the transactional mail API.
    pub base_url: String,
    /// Sender used when a message names none.
    pub default_from: String,
}

impl Default for MailSection {
    fn default() -> Self {
        Self {
            base_url: "https://api.resend.com".to_string(),
            default_from: "workflows@localhost".to_string(),
        }
    }
}

/// Load settings from `{config_dir}/flowmill.toml`.
///
/// A missing file is normal and returns defaults; an unreadable or
/// malformed file logs a warning and returns defaults.
pub async fn load_settings(config_dir: &Path) -> EngineSettings {
    let path = config_dir.join("flowmill.toml");

    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("no flowmill.toml at {}, using defaults", path.display());
            return EngineSettings::default();
        }
        Err(err) => {
            tracing::warn!("failed to read {}: {err}, using defaults", path.display());
            return EngineSettings::default();
        }
    };

    match toml::from_str::<EngineSettings>(&content) {
        Ok(settings) => settings,
        Err(err) => {
            tracing::warn!("failed to parse {}: {err}, using defaults", path.display());
            EngineSettings::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_returns_defaults() {
        let tmp = TempDir::new().unwrap();
        let settings = load_settings(tmp.path()).await;
        assert_eq!(settings.engine.default_timeout_ms, 300_000);
        assert_eq!(settings.engine.max_branch_concurrency, 8);
        assert_eq!(settings.http.request_timeout_secs, 30);
    }

    #[tokio::test]
    async fn test_partial_file_fills_defaults() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("flowmill.toml"),
            r#"
[engine]
max_branch_concurrency = 16
"#,
        )
        .await
        .unwrap();

        let settings = load_settings(tmp.path()).await;
        assert_eq!(settings.engine.max_branch_concurrency, 16);
        assert_eq!(settings.engine.default_timeout_ms, 300_000);
    }

    #[tokio::test]
    async fn test_malformed_file_returns_defaults() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("flowmill.toml"), "not { valid toml !!!")
            .await
            .unwrap();

        let settings = load_settings(tmp.path()).await;
        assert_eq!(settings.engine.default_timeout_ms, 300_000);
    }

    #[tokio::test]
    async fn test_full_file_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("flowmill.toml"),
            r#"
[engine]
default_timeout_ms = 60000
max_branch_concurrency = 4

[http]
request_timeout_secs = 10

[mail]
base_url = "https://mail.internal"
default_from = "noreply@internal"
"#,
        )
        .await
        .unwrap();

        let settings = load_settings(tmp.path()).await;
        assert_eq!(settings.engine.default_timeout_ms, 60_000);
        assert_eq!(settings.http.request_timeout_secs, 10);
        assert_eq!(settings.mail.default_from, "noreply@internal");
    }
}
