//! Bitbucket Server provider

use super::Provider;
use super::hosting::{
    Addressing, CreatePullRequestRequest, HostingAdapter, WriteFilesToBranchRequest,
};
use crate::constants::defaults;
use crate::error::{ProviderError, Result};
use crate::options::ProviderOption;
use crate::retry::Backoff;
use crate::types::{PullRequest, PullRequestInput, Repository, TreeEntry};
use async_trait::async_trait;
use gitpr_hosting::{BitbucketServerClient, HostingClient};
use std::sync::Arc;
use tracing::instrument;

pub struct BitbucketServerProvider {
    adapter: HostingAdapter,
    client: Option<Arc<dyn HostingClient>>,
}

impl BitbucketServerProvider {
    pub fn new(backoff: Backoff) -> Self {
        Self {
            adapter: HostingAdapter::new(backoff).with_addressing(Addressing::ProjectKey),
            client: None,
        }
    }

    pub fn with_client(client: Arc<dyn HostingClient>, backoff: Backoff) -> Self {
        Self {
            adapter: HostingAdapter::new(backoff).with_addressing(Addressing::ProjectKey),
            client: Some(client),
        }
    }

    fn client(&self) -> Result<&dyn HostingClient> {
        self.client.as_deref().ok_or(ProviderError::NotConfigured)
    }
}

#[async_trait]
impl Provider for BitbucketServerProvider {
    fn setup(&mut self, mut option: ProviderOption) -> Result<()> {
        if option.username.is_empty() {
            option.username = defaults::BITBUCKET_USERNAME.to_string();
        }
        if option.hostname.is_empty() {
            return Err(ProviderError::Configuration("Hostname".into()));
        }
        let token = option
            .any_token()
            .ok_or_else(|| ProviderError::Configuration("Token".into()))?;

        self.client = Some(Arc::new(BitbucketServerClient::new(
            &option.hostname,
            &option.username,
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
        let repo = self
            .adapter
            .get_bitbucket_repository(client, &input.repository_url)
            .await?;

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
        let repo = self
            .adapter
            .get_bitbucket_repository(self.client()?, repo_url)
            .await?;
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
        let repo = self
            .adapter
            .get_bitbucket_repository(self.client()?, repo_url)
            .await?;
        self.adapter.list_pull_requests(repo.as_ref()).await
    }
}
