//! GitHub provider

use super::Provider;
use super::hosting::{CreatePullRequestRequest, HostingAdapter, WriteFilesToBranchRequest};
use crate::error::{ProviderError, Result};
use crate::options::ProviderOption;
use crate::retry::Backoff;
use crate::types::{PullRequest, PullRequestInput, Repository, TreeEntry};
use async_trait::async_trait;
use gitpr_hosting::github::DEFAULT_DOMAIN;
use gitpr_hosting::{GitHubClient, HostingClient};
use std::sync::Arc;
use tracing::instrument;

pub struct GitHubProvider {
    adapter: HostingAdapter,
    client: Option<Arc<dyn HostingClient>>,
}

impl GitHubProvider {
    pub fn new(backoff: Backoff) -> Self {
        Self {
            adapter: HostingAdapter::new(backoff),
            client: None,
        }
    }

    /// A provider bound to an already configured client
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

#[async_trait]
impl Provider for GitHubProvider {
    fn setup(&mut self, option: ProviderOption) -> Result<()> {
        let token = option
            .any_token()
            .ok_or_else(|| {
                ProviderError::Configuration("OAuth2 token or personal access token".into())
            })?;

        let domain = if option.hostname.is_empty() {
            DEFAULT_DOMAIN
        } else {
            option.hostname.as_str()
        };

        self.client = Some(Arc::new(GitHubClient::new(
            domain,
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
            .write_files_to_branch(
                repo.as_ref(),
                &WriteFilesToBranchRequest {
                    create_branch: true,
                    base_branch: input.base.clone(),
                    head_branch: input.head.clone(),
                    commits: input.commits,
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
