//! Bitbucket Server (Stash) REST 1.0 client
//!
//! Repositories are addressed by project key and slug. Everything except
//! commits goes through the REST API; commits are pushed with the system git
//! (see `git.rs`).

mod git;

use crate::client::{Auth, HttpClient};
use crate::error::Result;
use crate::refs::{OrgRepositoryRef, check_domain, domain_base_url};
use crate::repository::{HostingClient, OrgRepository};
use crate::types::{
    CommitFile, CommitInfo, PullRequestInfo, RepositoryInfo, TreeEntry, file_name,
};
use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;

const FILES_PAGE_LIMIT: u32 = 1000;
const PULL_REQUESTS_PAGE_LIMIT: u32 = 100;

pub struct BitbucketServerClient {
    http: Arc<HttpClient>,
    domain: String,
    username: String,
    token: String,
}

impl BitbucketServerClient {
    pub fn new(domain: &str, username: &str, token: &str, conditional_requests: bool) -> Self {
        let http = HttpClient::new(
            format!("{}/rest/api/1.0", domain_base_url(domain)),
            Auth::Basic {
                username: username.to_string(),
                password: token.to_string(),
            },
        )
        .with_conditional_requests(conditional_requests);

        Self {
            http: Arc::new(http),
            domain: domain.to_string(),
            username: username.to_string(),
            token: token.to_string(),
        }
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }
}

#[derive(Deserialize, Debug)]
struct RepoResponse {
    slug: String,
    project: ProjectRef,
    #[serde(default)]
    links: Links,
}

#[derive(Deserialize, Debug)]
struct ProjectRef {
    key: String,
}

#[derive(Deserialize, Debug, Default)]
struct Links {
    #[serde(default)]
    clone: Vec<Link>,
    #[serde(default, rename = "self")]
    self_links: Vec<Link>,
}

#[derive(Deserialize, Debug)]
struct Link {
    href: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Page<T> {
    values: Vec<T>,
    #[serde(default, rename = "isLastPage")]
    is_last_page: bool,
    #[serde(default, rename = "nextPageStart")]
    next_page_start: Option<u64>,
}

#[derive(Deserialize, Debug)]
struct CommitResponse {
    id: String,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize, Debug)]
struct PullRequestResponse {
    id: u64,
    title: String,
    #[serde(default)]
    description: Option<String>,
    state: String,
    #[serde(default)]
    links: Links,
}

impl From<PullRequestResponse> for PullRequestInfo {
    fn from(pr: PullRequestResponse) -> Self {
        PullRequestInfo {
            number: pr.id,
            title: pr.title,
            description: pr.description.unwrap_or_default(),
            web_url: pr
                .links
                .self_links
                .into_iter()
                .next()
                .map(|link| link.href)
                .unwrap_or_default(),
            merged: pr.state == "MERGED",
        }
    }
}

#[async_trait]
impl HostingClient for BitbucketServerClient {
    fn supported_domain(&self) -> &str {
        &self.domain
    }

    async fn get_org_repository(
        &self,
        reference: &OrgRepositoryRef,
    ) -> Result<Box<dyn OrgRepository>> {
        check_domain(&self.domain, reference)?;

        let path = format!(
            "projects/{}/repos/{}",
            reference.key(),
            reference.repository_name
        );
        let repo: RepoResponse = self.http.get_json(&path, &[]).await?;

        let clone_url = repo
            .links
            .clone
            .iter()
            .find(|link| link.name.as_deref() == Some("http"))
            .map(|link| link.href.clone())
            .unwrap_or_else(|| {
                format!(
                    "{}/scm/{}/{}.git",
                    domain_base_url(&self.domain),
                    repo.project.key.to_lowercase(),
                    repo.slug
                )
            });
        // the self link points at the repository's browse page
        let web_url = repo
            .links
            .self_links
            .first()
            .map(|link| link.href.trim_end_matches("/browse").to_string())
            .unwrap_or_else(|| {
                format!(
                    "{}/projects/{}/repos/{}",
                    domain_base_url(&self.domain),
                    repo.project.key,
                    repo.slug
                )
            });

        Ok(Box::new(BitbucketRepository {
            http: Arc::clone(&self.http),
            path,
            clone_url,
            username: self.username.clone(),
            token: self.token.clone(),
            info: RepositoryInfo {
                domain: self.domain.clone(),
                organization: repo.project.key,
                name: repo.slug,
                default_branch: None,
                web_url,
            },
        }))
    }
}

pub struct BitbucketRepository {
    http: Arc<HttpClient>,
    /// `projects/<key>/repos/<slug>`
    path: String,
    clone_url: String,
    username: String,
    token: String,
    info: RepositoryInfo,
}

impl BitbucketRepository {
    fn path(&self, rest: &str) -> String {
        format!("{}/{}", self.path, rest)
    }

    /// Every value of a paged listing, following `nextPageStart` until `isLastPage`
    async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        limit: u32,
    ) -> Result<Vec<T>> {
        let mut values = Vec::new();
        let mut start = 0u64;

        loop {
            let mut params = query.to_vec();
            params.push(("limit", limit.to_string()));
            params.push(("start", start.to_string()));

            let page: Page<T> = self.http.get_json(path, &params).await?;
            values.extend(page.values);

            match page.next_page_start {
                Some(next) if !page.is_last_page && next > start => start = next,
                _ => break,
            }
        }

        Ok(values)
    }
}

#[async_trait]
impl OrgRepository for BitbucketRepository {
    fn info(&self) -> &RepositoryInfo {
        &self.info
    }

    async fn list_commits_page(
        &self,
        branch: &str,
        per_page: u32,
        page: u32,
    ) -> Result<Vec<CommitInfo>> {
        let start = per_page.saturating_mul(page.saturating_sub(1));
        let commits: Page<CommitResponse> = self
            .http
            .get_json(
                &self.path("commits"),
                &[
                    ("until", branch.to_string()),
                    ("limit", per_page.to_string()),
                    ("start", start.to_string()),
                ],
            )
            .await?;

        Ok(commits
            .values
            .into_iter()
            .map(|c| CommitInfo {
                web_url: Some(format!("{}/commits/{}", self.info.web_url, c.id)),
                sha: c.id,
                message: c.message,
            })
            .collect())
    }

    async fn create_branch(&self, branch: &str, sha: &str) -> Result<()> {
        self.http
            .send_no_content(
                Method::POST,
                &self.path("branches"),
                &json!({ "name": branch, "startPoint": sha }),
            )
            .await
    }

    async fn create_commit(
        &self,
        branch: &str,
        message: &str,
        files: &[CommitFile],
    ) -> Result<CommitInfo> {
        let credentials = git::Credentials {
            username: &self.username,
            password: &self.token,
        };
        let sha = git::commit_files(&self.clone_url, &credentials, branch, message, files).await?;

        Ok(CommitInfo {
            web_url: Some(format!("{}/commits/{}", self.info.web_url, sha)),
            sha,
            message: message.to_string(),
        })
    }

    async fn list_tree(&self, sha: &str, path: &str, recursive: bool) -> Result<Vec<TreeEntry>> {
        let prefix = path.trim_matches('/');
        let endpoint = if prefix.is_empty() {
            self.path("files")
        } else {
            self.path(&format!("files/{}", prefix))
        };

        let files: Vec<String> = self
            .get_all(&endpoint, &[("at", sha.to_string())], FILES_PAGE_LIMIT)
            .await?;

        Ok(files
            .into_iter()
            .filter(|relative| recursive || !relative.contains('/'))
            .map(|relative| {
                let full = if prefix.is_empty() {
                    relative
                } else {
                    format!("{}/{}", prefix, relative)
                };
                TreeEntry {
                    name: file_name(&full),
                    link: format!("{}/browse/{}?at={}", self.info.web_url, full, sha),
                    path: full,
                    entry_type: "blob".to_string(),
                    size: 0,
                    sha: String::new(),
                }
            })
            .collect())
    }

    async fn create_pull_request(
        &self,
        title: &str,
        head: &str,
        base: &str,
        description: &str,
    ) -> Result<PullRequestInfo> {
        let payload = json!({
            "title": title,
            "description": description,
            "fromRef": { "id": format!("refs/heads/{}", head) },
            "toRef": { "id": format!("refs/heads/{}", base) },
        });
        let pr: PullRequestResponse = self
            .http
            .send_json(Method::POST, &self.path("pull-requests"), &payload)
            .await?;
        Ok(pr.into())
    }

    async fn list_pull_requests(&self) -> Result<Vec<PullRequestInfo>> {
        let prs: Vec<PullRequestResponse> = self
            .get_all(
                &self.path("pull-requests"),
                &[("state", "ALL".to_string())],
                PULL_REQUESTS_PAGE_LIMIT,
            )
            .await?;
        Ok(prs.into_iter().map(PullRequestInfo::from).collect())
    }
}
