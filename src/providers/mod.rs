//! Hosting backends behind a single provider contract
//!
//! ## Providers
//!
//! - [`GitHubProvider`], [`GitLabProvider`], [`BitbucketServerProvider`]:
//!   built on the organization/repository clients and the shared
//!   [`HostingAdapter`]
//! - [`AzureDevOpsProvider`]: drives Azure DevOps through raw REST requests

pub mod azure;
pub mod bitbucket;
pub mod github;
pub mod gitlab;
pub mod hosting;

pub use azure::AzureDevOpsProvider;
pub use bitbucket::BitbucketServerProvider;
pub use github::GitHubProvider;
pub use gitlab::GitLabProvider;
pub use hosting::{CreatePullRequestRequest, HostingAdapter, WriteFilesToBranchRequest};

use crate::error::Result;
use crate::options::ProviderOption;
use crate::types::{PullRequest, PullRequestInput, Repository, TreeEntry};
use async_trait::async_trait;

/// Operations every hosting backend supports
#[async_trait]
pub trait Provider: Send + Sync {
    /// Validate options and build the backend client
    fn setup(&mut self, option: ProviderOption) -> Result<()>;

    /// Create `head` from `base` if needed, write the commits to it and open
    /// a pull request. Returns the pull request with its web link.
    async fn create_pull_request(&self, input: PullRequestInput) -> Result<PullRequest>;

    async fn get_repository(&self, repo_url: &str) -> Result<Repository>;

    /// Files under `path` at `sha` (a commit SHA or branch name)
    async fn get_tree_list(&self, repo_url: &str, sha: &str, path: &str) -> Result<Vec<TreeEntry>>;

    async fn list_pull_requests(&self, repo_url: &str) -> Result<Vec<PullRequest>>;
}
