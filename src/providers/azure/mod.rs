//! Azure DevOps provider
//!
//! Commits are pushed with hand-built requests (see `scm.rs`), one push per
//! input commit. The branch head is re-read after every push because each
//! push must name the commit it builds on.

pub mod scm;

use super::Provider;
use crate::constants::defaults;
use crate::error::{ApiContext, ProviderError, Result};
use crate::options::ProviderOption;
use crate::retry::{Backoff, retry_on_error};
use crate::types::{PullRequest, PullRequestInput, Repository, TreeEntry};
use async_trait::async_trait;
use gitpr_hosting::{ApiError, AzureClient, AzureError, AzureRepoRef, RawRequest};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use url::Url;

pub struct AzureDevOpsProvider {
    backoff: Backoff,
    client: Option<Arc<AzureClient>>,
}

impl AzureDevOpsProvider {
    pub fn new(backoff: Backoff) -> Self {
        Self {
            backoff,
            client: None,
        }
    }

    pub fn with_client(client: AzureClient, backoff: Backoff) -> Self {
        Self {
            backoff,
            client: Some(Arc::new(client)),
        }
    }

    fn client(&self) -> Result<&AzureClient> {
        self.client.as_deref().ok_or(ProviderError::NotConfigured)
    }

    /// Resolve the repository, waiting for it to become visible
    async fn find_repository(&self, repo_url: &str) -> Result<AzureRepoRef> {
        let reference = scm::parse_url(repo_url)?;
        let client = self.client()?;

        retry_on_error(
            &self.backoff,
            |err: &ApiError| err.is_not_found(),
            || client.find_repository(&reference),
        )
        .await
        .with_context(|| format!("unable to get repository {:?}", repo_url))?;

        Ok(reference)
    }

    async fn current_commit(&self, repo: &AzureRepoRef, branch: &str) -> Result<Option<String>> {
        let commits = self
            .client()?
            .list_commits(repo, branch, 1)
            .await
            .with_context(|| format!("failed to list commits on {:?}", branch))?;
        Ok(commits.into_iter().next().map(|c| c.sha))
    }

    /// Send a push and turn a rejected one into an error
    async fn push(&self, request: RawRequest, branch: &str, message: &str) -> Result<()> {
        let response = self
            .client()?
            .do_request(request)
            .await
            .context("failed to commit files")?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let error = serde_json::from_str::<AzureError>(&body)
            .ok()
            .filter(|e| !e.message.is_empty())
            .unwrap_or_else(|| AzureError {
                message: format!("push rejected with status {}", status.as_u16()),
                ..AzureError::default()
            });
        Err(ProviderError::Push {
            branch: branch.to_string(),
            message: message.to_string(),
            source: error,
        })
    }
}

#[async_trait]
impl Provider for AzureDevOpsProvider {
    fn setup(&mut self, option: ProviderOption) -> Result<()> {
        let token = option
            .any_token()
            .ok_or_else(|| ProviderError::Configuration("Token".into()))?;
        let hostname = if option.hostname.is_empty() {
            defaults::AZURE_HOSTNAME
        } else {
            option.hostname.as_str()
        };

        self.client = Some(Arc::new(AzureClient::new(hostname, token)));
        Ok(())
    }

    #[instrument(
        skip_all,
        fields(repo = %input.repository_url, head = %input.head, base = %input.base)
    )]
    async fn create_pull_request(&self, input: PullRequestInput) -> Result<PullRequest> {
        let client = self.client()?;
        let repo = self.find_repository(&input.repository_url).await?;

        let mut head_commit = match self.current_commit(&repo, &input.head).await {
            Ok(Some(sha)) => sha,
            _ => {
                let base_commit = self
                    .current_commit(&repo, &input.base)
                    .await?
                    .ok_or_else(|| ProviderError::EmptyRepository(input.base.clone()))?;
                client
                    .create_ref(&repo, &input.head, &base_commit)
                    .await
                    .with_context(|| format!("failed to create new branch {:?}", input.head))?;
                debug!(head = %input.head, sha = %base_commit, "created branch");
                base_commit
            }
        };

        for commit in &input.commits {
            let request = scm::commit_files_request(
                &head_commit,
                &input.repository_url,
                &input.head,
                &commit.commit_message,
                &commit.files,
            )?;
            self.push(request, &input.head, &commit.commit_message)
                .await?;

            head_commit = self
                .current_commit(&repo, &input.head)
                .await?
                .ok_or_else(|| ProviderError::EmptyRepository(input.head.clone()))?;
            info!(sha = %head_commit, branch = %input.head, "Files committed");
        }

        let pr = client
            .create_pull_request(&repo, &input.title, &input.head, &input.base, &input.body)
            .await
            .with_context(|| {
                format!("unable to create pull request for branch {:?}", input.head)
            })?;
        info!(url = %pr.web_url, "Created pull request");

        Ok(PullRequest {
            title: input.title,
            description: input.body,
            link: pr.web_url,
            merged: false,
        })
    }

    async fn get_repository(&self, repo_url: &str) -> Result<Repository> {
        let repo = self.find_repository(repo_url).await?;
        let domain = Url::parse(repo_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_default();

        Ok(Repository {
            domain,
            org: format!("{}/{}", repo.organization, repo.project),
            name: repo.name,
        })
    }

    async fn get_tree_list(&self, repo_url: &str, sha: &str, path: &str) -> Result<Vec<TreeEntry>> {
        let scope = format!("/{}", path.trim_matches('/'));
        let request = scm::list_contents(repo_url, &scope, sha)?;
        let items = self
            .client()?
            .list_items(request)
            .await
            .with_context(|| format!("unable to list files in {:?} at {:?}", path, sha))?;

        Ok(items
            .into_iter()
            .filter(|item| item.path != scope)
            .map(|item| {
                let path = item.path.trim_start_matches('/').to_string();
                TreeEntry {
                    name: path.rsplit('/').next().unwrap_or(&path).to_string(),
                    entry_type: if item.is_folder { "tree" } else { "blob" }.to_string(),
                    size: 0,
                    sha: item.object_id,
                    link: item.url,
                    path,
                }
            })
            .collect())
    }

    async fn list_pull_requests(&self, repo_url: &str) -> Result<Vec<PullRequest>> {
        let repo = scm::parse_url(repo_url)?;
        let prs = self
            .client()?
            .list_pull_requests(&repo)
            .await
            .context("unable to list pull requests")?;
        Ok(prs.into_iter().map(PullRequest::from).collect())
    }
}
