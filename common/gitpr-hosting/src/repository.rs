//! The organization/repository abstraction shared by the GitHub, GitLab and
//! Bitbucket Server clients

use crate::error::Result;
use crate::refs::OrgRepositoryRef;
use crate::types::{CommitFile, CommitInfo, PullRequestInfo, RepositoryInfo, TreeEntry};
use async_trait::async_trait;

/// A configured client for one hosting domain
#[async_trait]
pub trait HostingClient: Send + Sync {
    /// The domain this client talks to, as it was configured
    fn supported_domain(&self) -> &str;

    /// Resolve a repository reference into a handle for repository operations
    async fn get_org_repository(
        &self,
        reference: &OrgRepositoryRef,
    ) -> Result<Box<dyn OrgRepository>>;
}

/// Operations on one resolved repository
#[async_trait]
pub trait OrgRepository: Send + Sync {
    fn info(&self) -> &RepositoryInfo;

    /// List commits reachable from `branch`, newest first
    async fn list_commits_page(
        &self,
        branch: &str,
        per_page: u32,
        page: u32,
    ) -> Result<Vec<CommitInfo>>;

    /// Create `branch` pointing at `sha`
    async fn create_branch(&self, branch: &str, sha: &str) -> Result<()>;

    /// Apply all `files` to `branch` as a single commit
    async fn create_commit(
        &self,
        branch: &str,
        message: &str,
        files: &[CommitFile],
    ) -> Result<CommitInfo>;

    /// List files under `path` at `sha` (a commit SHA or branch name)
    async fn list_tree(&self, sha: &str, path: &str, recursive: bool) -> Result<Vec<TreeEntry>>;

    async fn create_pull_request(
        &self,
        title: &str,
        head: &str,
        base: &str,
        description: &str,
    ) -> Result<PullRequestInfo>;

    async fn list_pull_requests(&self) -> Result<Vec<PullRequestInfo>>;
}
