//! Backend-neutral types exchanged with the hosting clients

/// A file change inside a commit. `content: None` deletes the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitFile {
    pub path: String,
    pub content: Option<String>,
}

impl CommitFile {
    pub fn is_delete(&self) -> bool {
        self.content.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitInfo {
    pub sha: String,
    pub message: String,
    pub web_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestInfo {
    pub number: u64,
    pub title: String,
    pub description: String,
    pub web_url: String,
    pub merged: bool,
}

/// One entry of a repository file listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub name: String,
    pub path: String,
    /// `blob` or `tree`
    pub entry_type: String,
    pub size: i64,
    pub sha: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryInfo {
    pub domain: String,
    pub organization: String,
    pub name: String,
    pub default_branch: Option<String>,
    pub web_url: String,
}

/// Last path segment, used as a tree entry name
pub(crate) fn file_name(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

/// Keep entries under `path`; without `recursive` only its direct children
pub fn filter_tree(entries: Vec<TreeEntry>, path: &str, recursive: bool) -> Vec<TreeEntry> {
    let prefix = path.trim_matches('/');
    entries
        .into_iter()
        .filter(|entry| {
            let relative = if prefix.is_empty() {
                Some(entry.path.as_str())
            } else {
                entry
                    .path
                    .strip_prefix(prefix)
                    .and_then(|rest| rest.strip_prefix('/'))
            };
            match relative {
                Some(rest) if !rest.is_empty() => recursive || !rest.contains('/'),
                _ => false,
            }
        })
        .collect()
}
