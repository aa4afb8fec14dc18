//! GitHub REST v3 client
//!
//! [`GitHubClient`] resolves repositories, [`GitHubRepository`] implements the
//! repository operations. Operations are split by API area:
//! - `commits.rs` - commit listing, branches and the git data API
//! - `pull_requests.rs` - pull request creation and listing

mod commits;
mod pull_requests;

use crate::client::{Auth, HttpClient};
use crate::error::Result;
use crate::refs::{OrgRepositoryRef, check_domain, domain_base_url, host_of};
use crate::repository::{HostingClient, OrgRepository};
use crate::types::{CommitFile, CommitInfo, PullRequestInfo, RepositoryInfo, TreeEntry};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;

pub const DEFAULT_DOMAIN: &str = "github.com";

/// GitHub API base URL
pub const API_BASE: &str = "https://api.github.com";

/// API base for a domain: the public API for github.com, `/api/v3` on
/// GitHub Enterprise hosts
pub fn api_base_for(domain: &str) -> String {
    if host_of(domain).eq_ignore_ascii_case(DEFAULT_DOMAIN) {
        API_BASE.to_string()
    } else {
        format!("{}/api/v3", domain_base_url(domain))
    }
}

pub struct GitHubClient {
    http: Arc<HttpClient>,
    domain: String,
}

impl GitHubClient {
    /// Create a client for `domain` authenticated with an OAuth2 or personal token
    pub fn new(domain: &str, token: &str, conditional_requests: bool) -> Self {
        let http = HttpClient::new(api_base_for(domain), Auth::Token(token.to_string()))
            .with_conditional_requests(conditional_requests);
        Self::with_http(domain, http)
    }

    pub fn with_http(domain: &str, http: HttpClient) -> Self {
        Self {
            http: Arc::new(http),
            domain: domain.to_string(),
        }
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }
}

#[derive(Deserialize, Debug)]
struct RepoResponse {
    name: String,
    html_url: String,
    default_branch: Option<String>,
    owner: Owner,
}

#[derive(Deserialize, Debug)]
struct Owner {
    login: String,
}

#[async_trait]
impl HostingClient for GitHubClient {
    fn supported_domain(&self) -> &str {
        &self.domain
    }

    async fn get_org_repository(
        &self,
        reference: &OrgRepositoryRef,
    ) -> Result<Box<dyn OrgRepository>> {
        check_domain(&self.domain, reference)?;

        let path = format!(
            "repos/{}/{}",
            reference.organization.organization, reference.repository_name
        );
        let repo: RepoResponse = self.http.get_json(&path, &[]).await?;

        Ok(Box::new(GitHubRepository {
            http: Arc::clone(&self.http),
            owner: repo.owner.login.clone(),
            name: repo.name.clone(),
            info: RepositoryInfo {
                domain: self.domain.clone(),
                organization: repo.owner.login,
                name: repo.name,
                default_branch: repo.default_branch,
                web_url: repo.html_url,
            },
        }))
    }
}

pub struct GitHubRepository {
    http: Arc<HttpClient>,
    owner: String,
    name: String,
    info: RepositoryInfo,
}

impl GitHubRepository {
    fn path(&self, rest: &str) -> String {
        format!("repos/{}/{}/{}", self.owner, self.name, rest)
    }
}

#[async_trait]
impl OrgRepository for GitHubRepository {
    fn info(&self) -> &RepositoryInfo {
        &self.info
    }

    async fn list_commits_page(
        &self,
        branch: &str,
        per_page: u32,
        page: u32,
    ) -> Result<Vec<CommitInfo>> {
        self.list_commits(branch, per_page, page).await
    }

    async fn create_branch(&self, branch: &str, sha: &str) -> Result<()> {
        self.create_ref(branch, sha).await
    }

    async fn create_commit(
        &self,
        branch: &str,
        message: &str,
        files: &[CommitFile],
    ) -> Result<CommitInfo> {
        self.commit_files(branch, message, files).await
    }

    async fn list_tree(&self, sha: &str, path: &str, recursive: bool) -> Result<Vec<TreeEntry>> {
        self.tree(sha, path, recursive).await
    }

    async fn create_pull_request(
        &self,
        title: &str,
        head: &str,
        base: &str,
        description: &str,
    ) -> Result<PullRequestInfo> {
        self.open_pull_request(title, head, base, description).await
    }

    async fn list_pull_requests(&self) -> Result<Vec<PullRequestInfo>> {
        self.pull_requests().await
    }
}
