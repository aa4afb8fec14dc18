//! GitLab REST v4 client

use crate::client::{Auth, HttpClient};
use crate::error::Result;
use crate::refs::{OrgRepositoryRef, check_domain, domain_base_url};
use crate::repository::{HostingClient, OrgRepository};
use crate::types::{
    CommitFile, CommitInfo, PullRequestInfo, RepositoryInfo, TreeEntry, file_name,
};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_DOMAIN: &str = "gitlab.com";

const PAGE_SIZE: u32 = 100;

/// Empty on the last page of a listing
const NEXT_PAGE_HEADER: &str = "x-next-page";

pub struct GitLabClient {
    http: Arc<HttpClient>,
    domain: String,
}

impl GitLabClient {
    /// `oauth2` tokens are sent as bearer tokens, anything else as a private token
    pub fn new(domain: &str, token_type: &str, token: &str, conditional_requests: bool) -> Self {
        let auth = if token_type == "oauth2" {
            Auth::Bearer(token.to_string())
        } else {
            Auth::PrivateToken(token.to_string())
        };
        let http = HttpClient::new(format!("{}/api/v4", domain_base_url(domain)), auth)
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
struct ProjectResponse {
    id: u64,
    path: String,
    path_with_namespace: String,
    web_url: String,
    #[serde(default)]
    default_branch: Option<String>,
    namespace: Namespace,
}

#[derive(Deserialize, Debug)]
struct Namespace {
    full_path: String,
}

#[async_trait]
impl HostingClient for GitLabClient {
    fn supported_domain(&self) -> &str {
        &self.domain
    }

    async fn get_org_repository(
        &self,
        reference: &OrgRepositoryRef,
    ) -> Result<Box<dyn OrgRepository>> {
        check_domain(&self.domain, reference)?;

        let encoded = urlencoding::encode(&reference.full_path()).into_owned();
        let project: ProjectResponse = self
            .http
            .get_json(&format!("projects/{}", encoded), &[])
            .await?;
        debug!(id = project.id, path = %project.path_with_namespace, "resolved project");

        Ok(Box::new(GitLabProject {
            http: Arc::clone(&self.http),
            id: project.id,
            info: RepositoryInfo {
                domain: self.domain.clone(),
                organization: project.namespace.full_path,
                name: project.path,
                default_branch: project.default_branch,
                web_url: project.web_url,
            },
        }))
    }
}

pub struct GitLabProject {
    http: Arc<HttpClient>,
    id: u64,
    info: RepositoryInfo,
}

#[derive(Deserialize, Debug)]
struct CommitResponse {
    id: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    web_url: Option<String>,
}

#[derive(Serialize, Debug, PartialEq)]
pub(crate) struct CommitAction<'a> {
    action: &'static str,
    file_path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
}

#[derive(Serialize)]
struct CreateCommitPayload<'a> {
    branch: &'a str,
    commit_message: &'a str,
    actions: Vec<CommitAction<'a>>,
}

#[derive(Deserialize, Debug)]
struct TreeItem {
    id: String,
    name: String,
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize, Debug)]
struct MergeRequestResponse {
    iid: u64,
    title: String,
    #[serde(default)]
    description: Option<String>,
    web_url: String,
    state: String,
}

impl From<MergeRequestResponse> for PullRequestInfo {
    fn from(mr: MergeRequestResponse) -> Self {
        PullRequestInfo {
            number: mr.iid,
            title: mr.title,
            description: mr.description.unwrap_or_default(),
            web_url: mr.web_url,
            merged: mr.state == "merged",
        }
    }
}

/// GitLab distinguishes creating a file from updating one; content is always
/// sent as a `create`, which fails when the path already exists.
pub(crate) fn commit_actions(files: &[CommitFile]) -> Vec<CommitAction<'_>> {
    files
        .iter()
        .map(|file| match &file.content {
            Some(content) => CommitAction {
                action: "create",
                file_path: &file.path,
                content: Some(content),
            },
            None => CommitAction {
                action: "delete",
                file_path: &file.path,
                content: None,
            },
        })
        .collect()
}

impl GitLabProject {
    fn path(&self, rest: &str) -> String {
        format!("projects/{}/{}", self.id, rest)
    }

    /// Every item of a paginated listing. Pages are followed through
    /// `X-Next-Page`; without the header a short page ends the listing.
    async fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut page = 1u32;

        loop {
            let mut params = query.to_vec();
            params.push(("per_page", PAGE_SIZE.to_string()));
            params.push(("page", page.to_string()));

            let (batch, headers): (Vec<T>, _) =
                self.http.get_json_with_headers(path, &params).await?;
            let count = batch.len();
            items.extend(batch);

            let next = headers
                .get(NEXT_PAGE_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::trim);
            match next {
                Some("") => break,
                Some(value) => match value.parse::<u32>() {
                    Ok(next) if next > page => page = next,
                    _ => break,
                },
                None if count == PAGE_SIZE as usize => page += 1,
                None => break,
            }
        }

        Ok(items)
    }
}

#[async_trait]
impl OrgRepository for GitLabProject {
    fn info(&self) -> &RepositoryInfo {
        &self.info
    }

    async fn list_commits_page(
        &self,
        branch: &str,
        per_page: u32,
        page: u32,
    ) -> Result<Vec<CommitInfo>> {
        let commits: Vec<CommitResponse> = self
            .http
            .get_json(
                &self.path("repository/commits"),
                &[
                    ("ref_name", branch.to_string()),
                    ("per_page", per_page.to_string()),
                    ("page", page.to_string()),
                ],
            )
            .await?;

        Ok(commits
            .into_iter()
            .map(|c| CommitInfo {
                sha: c.id,
                message: c.message,
                web_url: c.web_url,
            })
            .collect())
    }

    async fn create_branch(&self, branch: &str, sha: &str) -> Result<()> {
        self.http
            .send_no_content(
                Method::POST,
                &self.path("repository/branches"),
                &serde_json::json!({ "branch": branch, "ref": sha }),
            )
            .await
    }

    async fn create_commit(
        &self,
        branch: &str,
        message: &str,
        files: &[CommitFile],
    ) -> Result<CommitInfo> {
        let payload = CreateCommitPayload {
            branch,
            commit_message: message,
            actions: commit_actions(files),
        };
        let commit: CommitResponse = self
            .http
            .send_json(Method::POST, &self.path("repository/commits"), &payload)
            .await?;

        Ok(CommitInfo {
            sha: commit.id,
            message: message.to_string(),
            web_url: commit.web_url,
        })
    }

    async fn list_tree(&self, sha: &str, path: &str, recursive: bool) -> Result<Vec<TreeEntry>> {
        let items: Vec<TreeItem> = self
            .get_all(
                &self.path("repository/tree"),
                &[
                    ("path", path.trim_matches('/').to_string()),
                    ("ref", sha.to_string()),
                    ("recursive", recursive.to_string()),
                ],
            )
            .await?;

        Ok(items
            .into_iter()
            .map(|item| TreeEntry {
                link: format!("{}/-/blob/{}/{}", self.info.web_url, sha, item.path),
                name: if item.name.is_empty() {
                    file_name(&item.path)
                } else {
                    item.name
                },
                path: item.path,
                entry_type: item.kind,
                size: 0,
                sha: item.id,
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
        let mr: MergeRequestResponse = self
            .http
            .send_json(
                Method::POST,
                &self.path("merge_requests"),
                &serde_json::json!({
                    "source_branch": head,
                    "target_branch": base,
                    "title": title,
                    "description": description,
                }),
            )
            .await?;
        Ok(mr.into())
    }

    async fn list_pull_requests(&self) -> Result<Vec<PullRequestInfo>> {
        let mrs: Vec<MergeRequestResponse> = self
            .get_all(&self.path("merge_requests"), &[("state", "all".to_string())])
            .await?;
        Ok(mrs.into_iter().map(PullRequestInfo::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_type_selects_auth_header() {
        let oauth = GitLabClient::new("gitlab.com", "oauth2", "abc", false);
        assert_eq!(oauth.http().auth(), &Auth::Bearer("abc".to_string()));
        assert_eq!(oauth.http().base_url(), "https://gitlab.com/api/v4");

        let private = GitLabClient::new("gitlab.example.com", "personal", "abc", true);
        assert_eq!(private.http().auth(), &Auth::PrivateToken("abc".to_string()));
        assert!(private.http().conditional_requests());
    }

    #[test]
    fn test_commit_actions() {
        let files = vec![
            CommitFile {
                path: "a.yaml".to_string(),
                content: Some("a".to_string()),
            },
            CommitFile {
                path: "b.yaml".to_string(),
                content: None,
            },
        ];

        let actions = commit_actions(&files);
        let json = serde_json::to_value(&actions).unwrap();
        assert_eq!(json[0]["action"], "create");
        assert_eq!(json[0]["content"], "a");
        assert_eq!(json[1]["action"], "delete");
        assert!(json[1].get("content").is_none());
    }

    #[test]
    fn test_merge_request_state() {
        let mr: MergeRequestResponse = serde_json::from_value(serde_json::json!({
            "iid": 7,
            "title": "t",
            "description": null,
            "web_url": "https://gitlab.com/g/p/-/merge_requests/7",
            "state": "merged"
        }))
        .unwrap();
        let info = PullRequestInfo::from(mr);
        assert_eq!(info.number, 7);
        assert!(info.merged);
    }
}
