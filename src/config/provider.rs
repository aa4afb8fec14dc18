//! Per-provider settings and their translation into option setters

use crate::constants::{defaults, env, providers};
use crate::options::{
    OptionFn, with_conditional_requests, with_domain, with_oauth2_token, with_token, with_username,
};
use serde::{Deserialize, Serialize};

/// Token type used when the configuration does not name one
const DEFAULT_TOKEN_TYPE: &str = "pat";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub hostname: Option<String>,
    /// Environment variable holding the token
    #[serde(default)]
    pub token_env: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub conditional_requests: bool,
}

/// Values given on the command line; they win over the file
#[derive(Debug, Clone, Default)]
pub struct ProviderOverrides {
    pub hostname: Option<String>,
    pub token: Option<String>,
}

/// Conventional token variable of a provider
pub fn default_token_env(provider: &str) -> Option<&'static str> {
    match provider {
        providers::GITHUB => Some(env::GITHUB_TOKEN),
        providers::GITLAB => Some(env::GITLAB_TOKEN),
        providers::BITBUCKET_SERVER => Some(env::BITBUCKET_TOKEN),
        providers::AZURE_DEVOPS => Some(env::AZURE_DEVOPS_TOKEN),
        _ => None,
    }
}

impl ProviderConfig {
    /// The token from the override, the configured variable or the provider's default one
    pub fn resolve_token(&self, provider: &str, overrides: &ProviderOverrides) -> Option<String> {
        if let Some(token) = overrides.token.as_ref().filter(|t| !t.is_empty()) {
            return Some(token.clone());
        }

        let var = self.token_env.as_deref().or_else(|| default_token_env(provider))?;
        std::env::var(var).ok().filter(|t| !t.is_empty())
    }

    /// Option setters for the factory, in application order
    pub fn to_options(&self, provider: &str, overrides: &ProviderOverrides) -> Vec<OptionFn> {
        let mut options = Vec::new();

        if let Some(hostname) = overrides.hostname.as_ref().or(self.hostname.as_ref()) {
            options.push(with_domain(hostname.clone()));
        }

        if let Some(token) = self.resolve_token(provider, overrides) {
            match self.token_type.as_deref() {
                Some(defaults::OAUTH2_TOKEN_TYPE) => options.push(with_oauth2_token(token)),
                Some(token_type) => options.push(with_token(token_type, token)),
                None => options.push(with_token(DEFAULT_TOKEN_TYPE, token)),
            }
        }

        if let Some(username) = &self.username {
            options.push(with_username(username.clone()));
        }
        if self.conditional_requests {
            options.push(with_conditional_requests(true));
        }

        options
    }
}
