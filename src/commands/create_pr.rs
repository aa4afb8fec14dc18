//! Pull request creation command

use super::{Command, CommandContext};
use crate::constants::cli::DEFAULT_COMMIT_MSG;
use crate::types::{Commit, CommitFile, PullRequestInput};
use crate::utils::{collect_dir, generate_branch_name, read_file_mapping};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use colored::*;
use std::path::PathBuf;

/// Writes local files to a new branch in one commit and opens a pull request
pub struct CreatePrCommand {
    pub provider: Option<String>,
    pub repo: String,
    pub base: String,
    pub head: Option<String>,
    pub title: String,
    pub body: String,
    pub message: Option<String>,
    pub dir: Option<PathBuf>,
    pub prefix: Option<String>,
    /// `<local>:<remote>` pairs
    pub files: Vec<String>,
    /// Remote paths to remove
    pub deletes: Vec<String>,
}

impl CreatePrCommand {
    /// The single commit this command pushes
    pub fn build_commit(&self) -> Result<Commit> {
        let mut files: Vec<CommitFile> = Vec::new();

        if let Some(dir) = &self.dir {
            files.extend(collect_dir(dir, self.prefix.as_deref())?);
        }
        for mapping in &self.files {
            files.push(read_file_mapping(mapping)?);
        }
        for path in &self.deletes {
            files.push(CommitFile::delete(path.trim_start_matches('/')));
        }

        if files.is_empty() {
            bail!("Nothing to commit, use --dir, --file or --delete");
        }

        Ok(Commit {
            commit_message: self
                .message
                .clone()
                .unwrap_or_else(|| DEFAULT_COMMIT_MSG.to_string()),
            files,
        })
    }
}

#[async_trait]
impl Command for CreatePrCommand {
    async fn execute(&self, context: &CommandContext) -> Result<()> {
        let commit = self.build_commit()?;
        let name = context.provider_name(self.provider.as_deref(), &self.repo)?;
        let provider = context.provider(&name)?;

        let head = self
            .head
            .clone()
            .unwrap_or_else(|| generate_branch_name(None));

        println!(
            "{}",
            format!(
                "Writing {} file(s) to {} on {}...",
                commit.files.len(),
                head,
                self.repo
            )
            .green()
        );

        let pr = provider
            .create_pull_request(PullRequestInput {
                repository_url: self.repo.clone(),
                title: self.title.clone(),
                body: self.body.clone(),
                head: head.clone(),
                base: self.base.clone(),
                commits: vec![commit],
            })
            .await
            .with_context(|| format!("Failed to create pull request from '{}'", head))?;

        println!("{} {}", "Pull request created:".green(), pr.link.cyan().bold());
        Ok(())
    }
}
