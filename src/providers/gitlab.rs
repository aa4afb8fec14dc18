//! GitLab provider
//!
//! GitLab's commit API tells file creation apart from updates, and the
//! client always creates. Files that already exist on the head branch are
//! deleted in a leading commit so the requested commits can recreate them.

use super::Provider;
use super::hosting::{CreatePullRequestRequest, HostingAdapter, WriteFilesToBranchRequest};
use crate::constants::defaults;
use crate::error::{ProviderError, Result};
use crate::options::ProviderOption;
use crate::retry::Backoff;
use crate::types::{Commit, CommitFile, PullRequest, PullRequestInput, Repository, TreeEntry};
use async_trait::async_trait;
use gitpr_hosting::gitlab::DEFAULT_DOMAIN;
use gitpr_hosting::{GitLabClient, HostingClient};
use std::sync::Arc;
use tracing::{info, instrument};

pub struct GitLabProvider {
    adapter: HostingAdapter,
    client: Option<Arc<dyn HostingClient>>,
}

impl GitLabProvider {
    pub fn new(backoff: Backoff) -> Self {
        Self {
            adapter: HostingAdapter::new(backoff),
            client: None,
        }
    }

    pub fn with_client(client: Arc<dyn HostingClient>, backoff: Backoff) -> Self {
        Self {
            adapter: HostingAdapter::new(backoff),
            client: Some(client),
        }
    }

    fn client(&self) -> Result<&dyn HostingClient> {
        self.client.as_deref().ok_or(ProviderError::NotConfigured)
    }
}

/// Prepend a commit deleting `existing` when there is anything to delete
pub(crate) fn with_delete_commit(commits: Vec<Commit>, existing: Vec<CommitFile>) -> Vec<Commit> {
    if existing.is_empty() {
        return commits;
    }

    let mut all = Vec::with_capacity(commits.len() + 1);
    all.push(Commit {
        commit_message: defaults::DELETE_OLD_FILES_MESSAGE.to_string(),
        files: existing,
    });
    all.extend(commits);
    all
}

#[async_trait]
impl Provider for GitLabProvider {
    fn setup(&mut self, option: ProviderOption) -> Result<()> {
        let (token_type, token) = if !option.oauth2_token.is_empty() {
            (defaults::OAUTH2_TOKEN_TYPE, option.oauth2_token.as_str())
        } else if !option.token.is_empty() {
            (option.token_type.as_str(), option.token.as_str())
        } else {
            return Err(ProviderError::Configuration(
                "OAuth2 token or personal access token".into(),
            ));
        };

        let domain = if option.hostname.is_empty() {
            DEFAULT_DOMAIN
        } else {
            option.hostname.as_str()
        };

        self.client = Some(Arc::new(GitLabClient::new(
            domain,
            token_type,
            token,
            option.conditional_requests,
        )));
        Ok(())
    }

    #[instrument(
        skip_all,
        fields(repo = %input.repository_url, head = %input.head, base = %input.base)
    )]
    async fn create_pull_request(&self, input: PullRequestInput) -> Result<PullRequest> {
        let client = self.client()?;
        let repo = self.adapter.get_repository(client, &input.repository_url).await?;

        self.adapter
            .create_branch(repo.as_ref(), &input.base, &input.head)
            .await?;

        let files: Vec<CommitFile> = input
            .commits
            .iter()
            .flat_map(|commit| commit.files.iter().cloned())
            .collect();
        let existing = self
            .adapter
            .get_updated_files(&files, client, &input.repository_url, &input.head)
            .await?;
        if !existing.is_empty() {
            info!(count = existing.len(), "deleting files that already exist on the branch");
        }

        self.adapter
            .write_files_to_branch(
                repo.as_ref(),
                &WriteFilesToBranchRequest {
                    create_branch: false,
                    base_branch: input.base.clone(),
                    head_branch: input.head.clone(),
                    commits: with_delete_commit(input.commits, existing),
                },
            )
            .await?;

        let link = self
            .adapter
            .create_pull_request(
                repo.as_ref(),
                &CreatePullRequestRequest {
                    head_branch: input.head,
                    base_branch: input.base,
                    title: input.title.clone(),
                    description: input.body.clone(),
                },
            )
            .await?;

        Ok(PullRequest {
            title: input.title,
            description: input.body,
            link,
            merged: false,
        })
    }

    async fn get_repository(&self, repo_url: &str) -> Result<Repository> {
        let repo = self.adapter.get_repository(self.client()?, repo_url).await?;
        let info = repo.info();
        Ok(Repository {
            domain: info.domain.clone(),
            org: info.organization.clone(),
            name: info.name.clone(),
        })
    }

    async fn get_tree_list(&self, repo_url: &str, sha: &str, path: &str) -> Result<Vec<TreeEntry>> {
        self.adapter
            .get_tree_list(self.client()?, repo_url, sha, path, true)
            .await
    }

    async fn list_pull_requests(&self, repo_url: &str) -> Result<Vec<PullRequest>> {
        let repo = self.adapter.get_repository(self.client()?, repo_url).await?;
        self.adapter.list_pull_requests(repo.as_ref()).await
    }
}
