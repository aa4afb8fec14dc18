//! In-memory hosting backend for tests
//!
//! [`FakeHostingClient`] implements the organization/repository abstraction
//! over a shared in-memory store. Every commit keeps a full snapshot of the
//! files, so tests can inspect any branch after the fact.

use async_trait::async_trait;
use gitpr_hosting::{
    ApiError, CommitFile, CommitInfo, HostingClient, OrgRepository, OrgRepositoryRef,
    PullRequestInfo, RepositoryInfo, Result, TreeEntry, filter_tree,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
struct FakeCommit {
    message: String,
    parent: Option<String>,
    files: BTreeMap<String, String>,
}

#[derive(Debug, Default)]
struct FakeRepo {
    default_branch: String,
    branches: HashMap<String, String>,
    commits: HashMap<String, FakeCommit>,
    pull_requests: Vec<PullRequestInfo>,
}

#[derive(Debug, Default)]
struct FakeState {
    repos: HashMap<String, FakeRepo>,
    failing_lookups: u32,
    lookups: u32,
    reject_existing_creates: bool,
    unauthorized_tree_listing: bool,
    next_sha: u64,
}

impl FakeState {
    fn new_sha(&mut self) -> String {
        self.next_sha += 1;
        format!("{:040x}", self.next_sha)
    }
}

fn repo_key(organization: &str, name: &str) -> String {
    format!("{}/{}", organization, name)
}

/// A hosting client backed by memory
#[derive(Clone)]
pub struct FakeHostingClient {
    domain: String,
    state: Arc<Mutex<FakeState>>,
}

impl FakeHostingClient {
    pub fn new(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            state: Arc::new(Mutex::new(FakeState::default())),
        }
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a repository whose `branch` has one commit containing `files`
    pub fn with_repository(
        self,
        organization: &str,
        name: &str,
        branch: &str,
        files: &[(&str, &str)],
    ) -> Self {
        {
            let mut state = self.state();
            let sha = state.new_sha();
            let commit = FakeCommit {
                message: "initial commit".to_string(),
                parent: None,
                files: files
                    .iter()
                    .map(|(path, content)| (path.to_string(), content.to_string()))
                    .collect(),
            };
            let mut repo = FakeRepo {
                default_branch: branch.to_string(),
                ..FakeRepo::default()
            };
            repo.commits.insert(sha.clone(), commit);
            repo.branches.insert(branch.to_string(), sha);
            state.repos.insert(repo_key(organization, name), repo);
        }
        self
    }

    /// Add a repository without any commits
    pub fn with_empty_repository(self, organization: &str, name: &str, branch: &str) -> Self {
        self.state().repos.insert(
            repo_key(organization, name),
            FakeRepo {
                default_branch: branch.to_string(),
                ..FakeRepo::default()
            },
        );
        self
    }

    /// Make the next `count` repository lookups report not-found
    pub fn fail_lookups(self, count: u32) -> Self {
        self.state().failing_lookups = count;
        self
    }

    /// Reject writes of content to paths that already exist, as GitLab's
    /// `create` action does
    pub fn reject_existing_creates(self) -> Self {
        self.state().reject_existing_creates = true;
        self
    }

    /// Answer every tree listing with 401
    pub fn unauthorized_tree_listing(self) -> Self {
        self.state().unauthorized_tree_listing = true;
        self
    }

    pub fn lookups(&self) -> u32 {
        self.state().lookups
    }

    pub fn head_of(&self, organization: &str, name: &str, branch: &str) -> Option<String> {
        self.state()
            .repos
            .get(&repo_key(organization, name))
            .and_then(|repo| repo.branches.get(branch).cloned())
    }

    /// Commit messages reachable from `branch`, newest first
    pub fn commit_messages(&self, organization: &str, name: &str, branch: &str) -> Vec<String> {
        let state = self.state();
        let Some(repo) = state.repos.get(&repo_key(organization, name)) else {
            return Vec::new();
        };
        history(repo, branch)
            .into_iter()
            .map(|(_, commit)| commit.message)
            .collect()
    }

    pub fn file_at(
        &self,
        organization: &str,
        name: &str,
        branch: &str,
        path: &str,
    ) -> Option<String> {
        let state = self.state();
        let repo = state.repos.get(&repo_key(organization, name))?;
        let sha = repo.branches.get(branch)?;
        repo.commits.get(sha)?.files.get(path).cloned()
    }
}

fn history(repo: &FakeRepo, branch: &str) -> Vec<(String, FakeCommit)> {
    let mut commits = Vec::new();
    let mut next = repo.branches.get(branch).cloned();
    while let Some(sha) = next {
        let Some(commit) = repo.commits.get(&sha) else {
            break;
        };
        next = commit.parent.clone();
        commits.push((sha, commit.clone()));
    }
    commits
}

#[async_trait]
impl HostingClient for FakeHostingClient {
    fn supported_domain(&self) -> &str {
        &self.domain
    }

    async fn get_org_repository(
        &self,
        reference: &OrgRepositoryRef,
    ) -> Result<Box<dyn OrgRepository>> {
        let key = repo_key(reference.key(), &reference.repository_name);
        let mut state = self.state();
        state.lookups += 1;

        if state.failing_lookups > 0 {
            state.failing_lookups -= 1;
            return Err(ApiError::NotFound(key));
        }

        let repo = state
            .repos
            .get(&key)
            .ok_or_else(|| ApiError::NotFound(key.clone()))?;

        Ok(Box::new(FakeOrgRepository {
            state: Arc::clone(&self.state),
            info: RepositoryInfo {
                domain: self.domain.clone(),
                organization: reference.key().to_string(),
                name: reference.repository_name.clone(),
                default_branch: Some(repo.default_branch.clone()),
                web_url: format!("https://{}/{}", self.domain, key),
            },
            key,
        }))
    }
}

struct FakeOrgRepository {
    state: Arc<Mutex<FakeState>>,
    key: String,
    info: RepositoryInfo,
}

impl FakeOrgRepository {
    fn with_repo<T>(&self, f: impl FnOnce(&mut FakeState, &str) -> Result<T>) -> Result<T> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if !state.repos.contains_key(&self.key) {
            return Err(ApiError::NotFound(self.key.clone()));
        }
        f(&mut state, &self.key)
    }
}

fn repo_mut<'a>(state: &'a mut FakeState, key: &str) -> Result<&'a mut FakeRepo> {
    state
        .repos
        .get_mut(key)
        .ok_or_else(|| ApiError::NotFound(key.to_string()))
}

#[async_trait]
impl OrgRepository for FakeOrgRepository {
    fn info(&self) -> &RepositoryInfo {
        &self.info
    }

    async fn list_commits_page(
        &self,
        branch: &str,
        per_page: u32,
        page: u32,
    ) -> Result<Vec<CommitInfo>> {
        self.with_repo(|state, key| {
            let repo = repo_mut(state, key)?;
            if !repo.branches.contains_key(branch) && !repo.branches.is_empty() {
                return Err(ApiError::NotFound(format!("branch {}", branch)));
            }
            let skip = (per_page * page.saturating_sub(1)) as usize;
            Ok(history(repo, branch)
                .into_iter()
                .skip(skip)
                .take(per_page as usize)
                .map(|(sha, commit)| CommitInfo {
                    sha,
                    message: commit.message,
                    web_url: None,
                })
                .collect())
        })
    }

    async fn create_branch(&self, branch: &str, sha: &str) -> Result<()> {
        self.with_repo(|state, key| {
            let repo = repo_mut(state, key)?;
            if repo.branches.contains_key(branch) {
                return Err(ApiError::Status {
                    status: 422,
                    message: "Reference already exists".to_string(),
                });
            }
            if !repo.commits.contains_key(sha) {
                return Err(ApiError::NotFound(format!("commit {}", sha)));
            }
            repo.branches.insert(branch.to_string(), sha.to_string());
            Ok(())
        })
    }

    async fn create_commit(
        &self,
        branch: &str,
        message: &str,
        files: &[CommitFile],
    ) -> Result<CommitInfo> {
        self.with_repo(|state, key| {
            let reject_existing = state.reject_existing_creates;
            let sha = state.new_sha();
            let repo = repo_mut(state, key)?;

            let parent = repo
                .branches
                .get(branch)
                .cloned()
                .ok_or_else(|| ApiError::NotFound(format!("branch {}", branch)))?;
            let mut snapshot = repo
                .commits
                .get(&parent)
                .map(|commit| commit.files.clone())
                .unwrap_or_default();

            for file in files {
                match &file.content {
                    Some(content) => {
                        if reject_existing && snapshot.contains_key(&file.path) {
                            return Err(ApiError::Status {
                                status: 400,
                                message: "A file with this name already exists".to_string(),
                            });
                        }
                        snapshot.insert(file.path.clone(), content.clone());
                    }
                    None => {
                        snapshot.remove(&file.path);
                    }
                }
            }

            repo.commits.insert(
                sha.clone(),
                FakeCommit {
                    message: message.to_string(),
                    parent: Some(parent),
                    files: snapshot,
                },
            );
            repo.branches.insert(branch.to_string(), sha.clone());

            Ok(CommitInfo {
                sha,
                message: message.to_string(),
                web_url: None,
            })
        })
    }

    async fn list_tree(&self, sha: &str, path: &str, recursive: bool) -> Result<Vec<TreeEntry>> {
        self.with_repo(|state, key| {
            if state.unauthorized_tree_listing {
                return Err(ApiError::Unauthorized {
                    status: 401,
                    message: "Bad credentials".to_string(),
                });
            }
            let repo = repo_mut(state, key)?;
            let commit_sha = repo.branches.get(sha).cloned().unwrap_or_else(|| sha.to_string());
            let commit = repo
                .commits
                .get(&commit_sha)
                .ok_or_else(|| ApiError::NotFound(format!("ref {}", sha)))?;

            let entries: Vec<TreeEntry> = commit
                .files
                .iter()
                .map(|(file_path, content)| TreeEntry {
                    name: file_path.rsplit('/').next().unwrap_or(file_path).to_string(),
                    path: file_path.clone(),
                    entry_type: "blob".to_string(),
                    size: content.len() as i64,
                    sha: commit_sha.clone(),
                    link: String::new(),
                })
                .collect();

            let filtered = filter_tree(entries, path, recursive);
            if filtered.is_empty() && !path.trim_matches('/').is_empty() {
                return Err(ApiError::NotFound(format!("tree {}", path)));
            }
            Ok(filtered)
        })
    }

    async fn create_pull_request(
        &self,
        title: &str,
        head: &str,
        base: &str,
        description: &str,
    ) -> Result<PullRequestInfo> {
        let web_url = self.info.web_url.clone();
        self.with_repo(|state, key| {
            let repo = repo_mut(state, key)?;
            for branch in [head, base] {
                if !repo.branches.contains_key(branch) {
                    return Err(ApiError::Status {
                        status: 422,
                        message: format!("branch {} does not exist", branch),
                    });
                }
            }

            let pr = PullRequestInfo {
                number: repo.pull_requests.len() as u64 + 1,
                title: title.to_string(),
                description: description.to_string(),
                web_url: format!("{}/pull/{}", web_url, repo.pull_requests.len() + 1),
                merged: false,
            };
            repo.pull_requests.push(pr.clone());
            Ok(pr)
        })
    }

    async fn list_pull_requests(&self) -> Result<Vec<PullRequestInfo>> {
        self.with_repo(|state, key| Ok(repo_mut(state, key)?.pull_requests.clone()))
    }
}
