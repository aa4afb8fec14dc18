//! Pull request listing command

use super::{Command, CommandContext};
use crate::types::PullRequest;
use anyhow::{Context, Result};
use async_trait::async_trait;
use colored::*;

/// Lists the pull requests of a repository
pub struct ListPrsCommand {
    pub provider: Option<String>,
    pub repo: String,
    /// Output in JSON format for machine consumption
    pub json: bool,
}

/// One human readable line per pull request
pub fn format_pull_request(pr: &PullRequest) -> String {
    let state = if pr.merged {
        "merged".magenta().to_string()
    } else {
        "open".green().to_string()
    };
    format!("{:<8} {} {}", state, pr.title.bold(), pr.link.cyan())
}

#[async_trait]
impl Command for ListPrsCommand {
    async fn execute(&self, context: &CommandContext) -> Result<()> {
        let name = context.provider_name(self.provider.as_deref(), &self.repo)?;
        let provider = context.provider(&name)?;

        let prs = provider
            .list_pull_requests(&self.repo)
            .await
            .with_context(|| format!("Failed to list pull requests of '{}'", self.repo))?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&prs)?);
            return Ok(());
        }

        if prs.is_empty() {
            println!("{}", "No pull requests found".yellow());
            return Ok(());
        }
        for pr in &prs {
            println!("{}", format_pull_request(pr));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_pull_request() {
        colored::control::set_override(false);
        let pr = PullRequest {
            title: "Add cluster".to_string(),
            description: String::new(),
            link: "https://github.com/org/repo/pull/1".to_string(),
            merged: true,
        };
        assert_eq!(
            format_pull_request(&pr),
            "merged   Add cluster https://github.com/org/repo/pull/1"
        );
    }
}
