//! Data model exchanged with providers

use serde::{Deserialize, Serialize};

/// Resolved identity of a remote repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub domain: String,
    pub org: String,
    pub name: String,
}

/// One entry of a file listing at a ref
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub entry_type: String,
    pub size: i64,
    pub sha: String,
    pub link: String,
}

impl From<gitpr_hosting::TreeEntry> for TreeEntry {
    fn from(entry: gitpr_hosting::TreeEntry) -> Self {
        TreeEntry {
            name: entry.name,
            path: entry.path,
            entry_type: entry.entry_type,
            size: entry.size,
            sha: entry.sha,
            link: entry.link,
        }
    }
}

/// A file change. `content: None` deletes `path`, `Some` sets its content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitFile {
    pub path: String,
    pub content: Option<String>,
}

impl CommitFile {
    pub fn write(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: Some(content.into()),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: None,
        }
    }
}

impl From<&CommitFile> for gitpr_hosting::CommitFile {
    fn from(file: &CommitFile) -> Self {
        gitpr_hosting::CommitFile {
            path: file.path.clone(),
            content: file.content.clone(),
        }
    }
}

/// One logical commit; files are applied together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub commit_message: String,
    pub files: Vec<CommitFile>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequestInput {
    pub repository_url: String,
    pub title: String,
    pub body: String,
    /// Branch the changes are written to
    pub head: String,
    /// Branch the pull request targets
    pub base: String,
    /// Applied in order, one remote commit each
    pub commits: Vec<Commit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PullRequest {
    pub title: String,
    pub description: String,
    pub link: String,
    pub merged: bool,
}

impl From<gitpr_hosting::PullRequestInfo> for PullRequest {
    fn from(pr: gitpr_hosting::PullRequestInfo) -> Self {
        PullRequest {
            title: pr.title,
            description: pr.description,
            link: pr.web_url,
            merged: pr.merged,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commit_file_constructors() {
        assert_eq!(
            CommitFile::write("a.yaml", "x"),
            CommitFile {
                path: "a.yaml".to_string(),
                content: Some("x".to_string())
            }
        );
        assert!(CommitFile::delete("a.yaml").content.is_none());
    }

    #[test]
    fn test_conversion_keeps_delete_convention() {
        let hosted: gitpr_hosting::CommitFile = (&CommitFile::delete("old.yaml")).into();
        assert!(hosted.is_delete());

        let hosted: gitpr_hosting::CommitFile = (&CommitFile::write("new.yaml", "")).into();
        assert!(!hosted.is_delete());
        assert_eq!(hosted.content.as_deref(), Some(""));
    }
}
