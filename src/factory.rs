//! Provider construction by name

use crate::constants::providers;
use crate::error::{ProviderError, Result};
use crate::options::{OptionFn, fold_options};
use crate::providers::{
    AzureDevOpsProvider, BitbucketServerProvider, GitHubProvider, GitLabProvider, Provider,
};
use crate::retry::Backoff;
use tracing::debug;

/// Builds configured providers; every provider shares the factory's backoff
#[derive(Debug, Clone, Default)]
pub struct ProviderFactory {
    backoff: Backoff,
}

impl ProviderFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backoff(backoff: Backoff) -> Self {
        Self { backoff }
    }

    /// Fold `options`, then let the provider validate them
    pub fn create(
        &self,
        provider_name: &str,
        options: Vec<OptionFn>,
    ) -> Result<Box<dyn Provider>> {
        let mut provider: Box<dyn Provider> = match provider_name {
            providers::GITHUB => Box::new(GitHubProvider::new(self.backoff.clone())),
            providers::GITLAB => Box::new(GitLabProvider::new(self.backoff.clone())),
            providers::BITBUCKET_SERVER => {
                Box::new(BitbucketServerProvider::new(self.backoff.clone()))
            }
            providers::AZURE_DEVOPS => Box::new(AzureDevOpsProvider::new(self.backoff.clone())),
            other => return Err(ProviderError::UnsupportedProvider(other.to_string())),
        };

        let option = fold_options(&options)?;
        provider.setup(option)?;
        debug!(provider = provider_name, "provider configured");
        Ok(provider)
    }
}
