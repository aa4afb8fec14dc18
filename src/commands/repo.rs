//! Repository resolution command

use super::{Command, CommandContext};
use crate::repo_url::{Protocol, RepoUrl};
use crate::types::Repository;
use anyhow::{Context, Result};
use async_trait::async_trait;
use colored::*;
use serde::Serialize;

/// Resolves a repository URL against its provider
pub struct RepoCommand {
    pub provider: Option<String>,
    pub repo: String,
    /// Output in JSON format for machine consumption
    pub json: bool,
}

/// What the provider reports plus what the URL itself says
#[derive(Debug, Serialize)]
pub struct RepoReport {
    #[serde(flatten)]
    pub repository: Repository,
    pub provider: String,
    pub owner: String,
    pub protocol: Protocol,
    pub url: String,
}

impl RepoReport {
    pub fn new(repository: Repository, url: &RepoUrl) -> Self {
        Self {
            repository,
            provider: url.provider().to_string(),
            owner: url.owner().to_string(),
            protocol: url.protocol(),
            url: url.to_string(),
        }
    }
}

#[async_trait]
impl Command for RepoCommand {
    async fn execute(&self, context: &CommandContext) -> Result<()> {
        let name = context.provider_name(self.provider.as_deref(), &self.repo)?;
        let url = RepoUrl::for_provider(&self.repo, &name)
            .with_context(|| format!("Invalid repository URL '{}'", self.repo))?;
        let provider = context.provider(&name)?;

        let repository = provider
            .get_repository(&self.repo)
            .await
            .with_context(|| format!("Failed to resolve '{}'", self.repo))?;
        let report = RepoReport::new(repository, &url);

        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        println!("{:<9} {}", "provider".bold(), report.provider);
        println!("{:<9} {}", "domain".bold(), report.repository.domain);
        println!("{:<9} {}", "org".bold(), report.repository.org);
        println!("{:<9} {}", "owner".bold(), report.owner);
        println!("{:<9} {}", "name".bold(), report.repository.name.cyan());
        println!("{:<9} {}", "protocol".bold(), report.protocol);
        println!("{:<9} {}", "url".bold(), report.url);
        Ok(())
    }
}
