//! Commit, branch and tree operations
//!
//! Multi-file commits go through the git data API: read the branch ref and
//! its commit, create a tree on top of the commit's tree, create a commit
//! with that tree, then fast-forward the ref.

use super::GitHubRepository;
use crate::error::{ApiError, Result};
use crate::types::{CommitFile, CommitInfo, TreeEntry, file_name, filter_tree};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

const FILE_MODE: &str = "100644";

#[derive(Deserialize, Debug)]
struct CommitListItem {
    sha: String,
    html_url: Option<String>,
    commit: CommitDetail,
}

#[derive(Deserialize, Debug)]
struct CommitDetail {
    message: String,
}

#[derive(Deserialize, Debug)]
struct RefResponse {
    object: ShaRef,
}

#[derive(Deserialize, Debug)]
struct ShaRef {
    sha: String,
}

#[derive(Deserialize, Debug)]
struct GitCommitResponse {
    sha: String,
    tree: ShaRef,
    #[serde(default)]
    message: String,
    html_url: Option<String>,
}

#[derive(Deserialize, Debug)]
struct TreeResponse {
    tree: Vec<TreeItem>,
}

#[derive(Deserialize, Debug)]
struct TreeItem {
    path: String,
    #[serde(rename = "type")]
    kind: String,
    sha: String,
    #[serde(default)]
    size: Option<i64>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Serialize)]
struct CreateRefPayload<'a> {
    #[serde(rename = "ref")]
    reference: String,
    sha: &'a str,
}

#[derive(Serialize)]
struct CreateCommitPayload<'a> {
    message: &'a str,
    tree: &'a str,
    parents: Vec<&'a str>,
}

#[derive(Serialize)]
struct UpdateRefPayload<'a> {
    sha: &'a str,
    force: bool,
}

/// Tree entries for the git data API. A `null` sha removes the path.
pub(super) fn tree_entries(files: &[CommitFile]) -> Vec<Value> {
    files
        .iter()
        .map(|file| match &file.content {
            Some(content) => json!({
                "path": file.path,
                "mode": FILE_MODE,
                "type": "blob",
                "content": content,
            }),
            None => json!({
                "path": file.path,
                "mode": FILE_MODE,
                "type": "blob",
                "sha": Value::Null,
            }),
        })
        .collect()
}

impl GitHubRepository {
    pub(super) async fn list_commits(
        &self,
        branch: &str,
        per_page: u32,
        page: u32,
    ) -> Result<Vec<CommitInfo>> {
        let commits: Vec<CommitListItem> = self
            .http
            .get_json(
                &self.path("commits"),
                &[
                    ("sha", branch.to_string()),
                    ("per_page", per_page.to_string()),
                    ("page", page.to_string()),
                ],
            )
            .await?;

        Ok(commits
            .into_iter()
            .map(|c| CommitInfo {
                sha: c.sha,
                message: c.commit.message,
                web_url: c.html_url,
            })
            .collect())
    }

    pub(super) async fn create_ref(&self, branch: &str, sha: &str) -> Result<()> {
        let payload = CreateRefPayload {
            reference: format!("refs/heads/{}", branch),
            sha,
        };
        self.http
            .send_no_content(Method::POST, &self.path("git/refs"), &payload)
            .await
    }

    pub(super) async fn commit_files(
        &self,
        branch: &str,
        message: &str,
        files: &[CommitFile],
    ) -> Result<CommitInfo> {
        let head: RefResponse = self
            .http
            .get_json(&self.path(&format!("git/ref/heads/{}", branch)), &[])
            .await?;
        let parent: GitCommitResponse = self
            .http
            .get_json(&self.path(&format!("git/commits/{}", head.object.sha)), &[])
            .await?;
        debug!(branch, parent = %parent.sha, files = files.len(), "creating tree");

        let tree: ShaRef = self
            .http
            .send_json(
                Method::POST,
                &self.path("git/trees"),
                &json!({
                    "base_tree": parent.tree.sha,
                    "tree": tree_entries(files),
                }),
            )
            .await?;

        let commit: GitCommitResponse = self
            .http
            .send_json(
                Method::POST,
                &self.path("git/commits"),
                &CreateCommitPayload {
                    message,
                    tree: &tree.sha,
                    parents: vec![parent.sha.as_str()],
                },
            )
            .await?;

        self.http
            .send_no_content(
                Method::PATCH,
                &self.path(&format!("git/refs/heads/{}", branch)),
                &UpdateRefPayload {
                    sha: &commit.sha,
                    force: false,
                },
            )
            .await?;

        Ok(CommitInfo {
            sha: commit.sha,
            message: if commit.message.is_empty() {
                message.to_string()
            } else {
                commit.message
            },
            web_url: commit.html_url,
        })
    }

    pub(super) async fn tree(
        &self,
        sha: &str,
        path: &str,
        recursive: bool,
    ) -> Result<Vec<TreeEntry>> {
        if sha.is_empty() {
            return Err(ApiError::InvalidRequest("tree listing needs a ref".into()));
        }

        let tree: TreeResponse = self
            .http
            .get_json(
                &self.path(&format!("git/trees/{}", sha)),
                &[("recursive", "1".to_string())],
            )
            .await?;

        let entries = tree
            .tree
            .into_iter()
            .map(|item| TreeEntry {
                name: file_name(&item.path),
                path: item.path,
                entry_type: item.kind,
                size: item.size.unwrap_or_default(),
                sha: item.sha,
                link: item.url.unwrap_or_default(),
            })
            .collect();

        Ok(filter_tree(entries, path, recursive))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_entries_add_and_delete() {
        let files = vec![
            CommitFile {
                path: "management/cluster-01.yaml".to_string(),
                content: Some("---\n".to_string()),
            },
            CommitFile {
                path: "management/old.yaml".to_string(),
                content: None,
            },
        ];

        let entries = tree_entries(&files);
        assert_eq!(entries[0]["content"], "---\n");
        assert_eq!(entries[0]["mode"], "100644");
        assert!(entries[0].get("sha").is_none());

        assert!(entries[1]["sha"].is_null());
        assert!(entries[1].get("content").is_none());
    }
}
