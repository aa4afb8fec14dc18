//! Azure DevOps Repos client
//!
//! Azure DevOps does not fit the organization/repository abstraction (it has
//! projects between the two), so this client exposes its own operations plus
//! [`AzureClient::do_request`] for requests built by the caller.

use crate::client::{Auth, HttpClient, check_status};
use crate::error::{ApiError, Result};
use crate::refs::domain_base_url;
use crate::types::{CommitInfo, PullRequestInfo};
use reqwest::{Method, Response};
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_DOMAIN: &str = "dev.azure.com";
pub const API_VERSION: &str = "6.0";

/// Object id used as `oldObjectId` when creating a ref
pub const ZERO_OBJECT_ID: &str = "0000000000000000000000000000000000000000";

/// `organization/project/_git/name`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureRepoRef {
    pub organization: String,
    pub project: String,
    pub name: String,
}

impl AzureRepoRef {
    /// Path prefix of the git REST area for this repository
    pub fn api_path(&self, rest: &str) -> String {
        format!(
            "{}/{}/_apis/git/repositories/{}/{}",
            self.organization, self.project, self.name, rest
        )
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AzureRepository {
    pub id: String,
    pub name: String,
    pub project: AzureProject,
    pub web_url: String,
    #[serde(default)]
    pub remote_url: Option<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AzureProject {
    pub name: String,
}

/// Structured error body returned by Azure DevOps
#[derive(Deserialize, Debug, Clone, Default, Error, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
#[error("{message} ({type_key})")]
pub struct AzureError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub type_key: String,
    #[serde(default)]
    pub error_code: i64,
}

/// A request assembled outside the client, sent through [`AzureClient::do_request`]
#[derive(Debug, Clone, PartialEq)]
pub struct RawRequest {
    pub method: Method,
    /// Path and query relative to the organization host
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

/// One entry of an `items` listing
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct AzureItem {
    pub object_id: String,
    #[serde(default)]
    pub git_object_type: String,
    pub path: String,
    #[serde(default)]
    pub is_folder: bool,
    #[serde(default)]
    pub url: String,
}

#[derive(Deserialize, Debug)]
struct ListResponse<T> {
    value: Vec<T>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct CommitResponse {
    commit_id: String,
    #[serde(default)]
    comment: String,
    #[serde(default)]
    remote_url: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PullRequestResponse {
    pull_request_id: u64,
    title: String,
    #[serde(default)]
    description: Option<String>,
    status: String,
    repository: PullRequestRepository,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PullRequestRepository {
    #[serde(default)]
    web_url: String,
}

/// `<repository webUrl>/pullrequest/<id>`
pub fn pull_request_link(web_url: &str, id: u64) -> String {
    format!("{}/pullrequest/{}", web_url.trim_end_matches('/'), id)
}

impl From<PullRequestResponse> for PullRequestInfo {
    fn from(pr: PullRequestResponse) -> Self {
        PullRequestInfo {
            web_url: pull_request_link(&pr.repository.web_url, pr.pull_request_id),
            number: pr.pull_request_id,
            title: pr.title,
            description: pr.description.unwrap_or_default(),
            merged: pr.status == "completed",
        }
    }
}

pub struct AzureClient {
    http: HttpClient,
}

impl AzureClient {
    /// Personal access tokens are sent as basic auth with an empty user name
    pub fn new(domain: &str, token: &str) -> Self {
        Self::with_http(HttpClient::new(
            domain_base_url(domain),
            Auth::Basic {
                username: String::new(),
                password: token.to_string(),
            },
        ))
    }

    pub fn with_http(http: HttpClient) -> Self {
        Self { http }
    }

    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    fn version() -> (&'static str, String) {
        ("api-version", API_VERSION.to_string())
    }

    pub async fn find_repository(&self, repo: &AzureRepoRef) -> Result<AzureRepository> {
        let path = format!(
            "{}/{}/_apis/git/repositories/{}",
            repo.organization, repo.project, repo.name
        );
        self.http.get_json(&path, &[Self::version()]).await
    }

    /// Most recent commits on `branch`, newest first
    pub async fn list_commits(
        &self,
        repo: &AzureRepoRef,
        branch: &str,
        top: u32,
    ) -> Result<Vec<CommitInfo>> {
        let commits: ListResponse<CommitResponse> = self
            .http
            .get_json(
                &repo.api_path("commits"),
                &[
                    ("searchCriteria.itemVersion.version", branch.to_string()),
                    ("searchCriteria.$top", top.to_string()),
                    Self::version(),
                ],
            )
            .await?;

        Ok(commits
            .value
            .into_iter()
            .map(|c| CommitInfo {
                sha: c.commit_id,
                message: c.comment,
                web_url: c.remote_url,
            })
            .collect())
    }

    /// Create `refs/heads/<branch>` at `sha`
    pub async fn create_ref(&self, repo: &AzureRepoRef, branch: &str, sha: &str) -> Result<()> {
        let path = format!("{}?api-version={}", repo.api_path("refs"), API_VERSION);
        let body = json!([{
            "name": format!("refs/heads/{}", branch),
            "oldObjectId": ZERO_OBJECT_ID,
            "newObjectId": sha,
        }]);
        let results: ListResponse<Value> = self.http.send_json(Method::POST, &path, &body).await?;

        match results.value.first() {
            Some(result) if result.get("success") == Some(&Value::Bool(false)) => {
                Err(ApiError::Status {
                    status: 409,
                    message: format!(
                        "failed to create ref {}: {}",
                        branch,
                        result
                            .get("customMessage")
                            .and_then(Value::as_str)
                            .unwrap_or("update rejected")
                    ),
                })
            }
            _ => Ok(()),
        }
    }

    pub async fn create_pull_request(
        &self,
        repo: &AzureRepoRef,
        title: &str,
        head: &str,
        base: &str,
        description: &str,
    ) -> Result<PullRequestInfo> {
        let path = format!("{}?api-version={}", repo.api_path("pullrequests"), API_VERSION);
        let body = json!({
            "sourceRefName": format!("refs/heads/{}", head),
            "targetRefName": format!("refs/heads/{}", base),
            "title": title,
            "description": description,
        });
        let pr: PullRequestResponse = self.http.send_json(Method::POST, &path, &body).await?;
        Ok(pr.into())
    }

    pub async fn list_pull_requests(&self, repo: &AzureRepoRef) -> Result<Vec<PullRequestInfo>> {
        let prs: ListResponse<PullRequestResponse> = self
            .http
            .get_json(
                &repo.api_path("pullrequests"),
                &[("searchCriteria.status", "all".to_string()), Self::version()],
            )
            .await?;
        Ok(prs.value.into_iter().map(PullRequestInfo::from).collect())
    }

    /// Send a caller-built request and return the response without checking its status
    pub async fn do_request(&self, request: RawRequest) -> Result<Response> {
        debug!(method = %request.method, path = %request.path, "sending raw request");
        let mut builder = self.http.request(request.method, &request.path);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        Ok(builder.send().await?)
    }

    /// Send a caller-built request and decode a JSON list of items
    pub async fn list_items(&self, request: RawRequest) -> Result<Vec<AzureItem>> {
        let response = check_status(self.do_request(request).await?).await?;
        let text = response.text().await?;
        let items: ListResponse<AzureItem> = serde_json::from_str(&text)
            .map_err(|e| ApiError::Decode(format!("items: {}", e)))?;
        Ok(items.value)
    }
}
