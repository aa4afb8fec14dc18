//! Base types and traits for the command pattern

use crate::config::{Config, ProviderOverrides};
use crate::factory::ProviderFactory;
use crate::providers::Provider;
use crate::repo_url::detect_provider;
use anyhow::{Context, Result};

/// Context passed to all commands containing shared configuration and options
#[derive(Clone, Default)]
pub struct CommandContext {
    /// The loaded configuration
    pub config: Config,
    /// Hostname and token given on the command line
    pub overrides: ProviderOverrides,
    /// Builds the provider a command talks to
    pub factory: ProviderFactory,
}

impl CommandContext {
    /// Provider name given explicitly or detected from the repository host
    pub fn provider_name(&self, explicit: Option<&str>, repo_url: &str) -> Result<String> {
        match explicit {
            Some(name) => Ok(name.to_string()),
            None => detect_provider(repo_url, &self.config.git_host_types)
                .context("Use --provider to name the hosting provider"),
        }
    }

    /// Configured provider from file settings and command line overrides
    pub fn provider(&self, name: &str) -> Result<Box<dyn Provider>> {
        let options = self.config.provider(name).to_options(name, &self.overrides);
        self.factory
            .create(name, options)
            .with_context(|| format!("Failed to set up provider '{}'", name))
    }
}

/// Trait that all commands must implement
#[async_trait::async_trait]
pub trait Command {
    /// Execute the command with the given context
    async fn execute(&self, context: &CommandContext) -> Result<()>;
}
