//! Configuration file loading

use super::ProviderConfig;
use super::validation;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Per-provider settings keyed by provider name
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Self-hosted domains mapped to a provider name
    #[serde(default)]
    pub git_host_types: HashMap<String, String>,
}

impl Config {
    /// Load configuration from a file. A missing file yields the defaults.
    pub fn load(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            debug!(path, "no configuration file, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid config file '{}'", path))
    }

    /// Parse and validate a YAML document
    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to a mapping
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(content)?;
        validation::validate_config(&config).map_err(validation::validation_errors_to_anyhow)?;
        Ok(config)
    }

    /// Settings for `provider`, empty when the file has none
    pub fn provider(&self, provider: &str) -> ProviderConfig {
        self.providers.get(provider).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
providers:
  gitlab:
    hostname: gitlab.example.com
    token_env: MY_GITLAB_TOKEN
    token_type: oauth2
    conditional_requests: true
  bitbucket-server:
    hostname: stash.example.com
    username: bot
git_host_types:
  gitlab.example.com: gitlab
"#;

    #[test]
    fn test_load_config() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = Config::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.providers.len(), 2);

        let gitlab = config.provider("gitlab");
        assert_eq!(gitlab.hostname.as_deref(), Some("gitlab.example.com"));
        assert_eq!(gitlab.token_env.as_deref(), Some("MY_GITLAB_TOKEN"));
        assert_eq!(gitlab.token_type.as_deref(), Some("oauth2"));
        assert!(gitlab.conditional_requests);

        assert_eq!(config.provider("bitbucket-server").username.as_deref(), Some("bot"));
        assert_eq!(
            config.git_host_types.get("gitlab.example.com").map(String::as_str),
            Some("gitlab")
        );
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gitpr.yaml");

        let config = Config::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.provider("github"), ProviderConfig::default());
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(Config::from_yaml("").unwrap(), Config::default());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let err = Config::from_yaml("providers:\n  gitea:\n    hostname: git.example.com\n")
            .unwrap_err();
        assert!(err.to_string().contains("gitea"));
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(Config::from_yaml("providers: [").is_err());
    }
}
