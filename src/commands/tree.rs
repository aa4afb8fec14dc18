//! File listing command

use super::{Command, CommandContext};
use anyhow::{Context, Result};
use async_trait::async_trait;
use colored::*;

/// Lists the files of a repository at a ref
pub struct TreeCommand {
    pub provider: Option<String>,
    pub repo: String,
    /// Commit SHA or branch name
    pub reference: String,
    pub path: String,
    /// Output in JSON format for machine consumption
    pub json: bool,
}

#[async_trait]
impl Command for TreeCommand {
    async fn execute(&self, context: &CommandContext) -> Result<()> {
        let name = context.provider_name(self.provider.as_deref(), &self.repo)?;
        let provider = context.provider(&name)?;

        let entries = provider
            .get_tree_list(&self.repo, &self.reference, &self.path)
            .await
            .with_context(|| {
                format!(
                    "Failed to list '{}' at '{}' in '{}'",
                    self.path, self.reference, self.repo
                )
            })?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&entries)?);
            return Ok(());
        }

        for entry in &entries {
            let path = if entry.entry_type == "tree" {
                entry.path.blue().bold()
            } else {
                entry.path.normal()
            };
            println!("{:<5} {}", entry.entry_type, path);
        }
        Ok(())
    }
}
