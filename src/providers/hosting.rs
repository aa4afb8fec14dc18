//! Branch, commit and pull request steps shared by the GitHub, GitLab and
//! Bitbucket Server providers
//!
//! Reads that may race with repository creation go through the retry policy:
//! repository lookups retry on not-found, the latest-commit lookup retries on
//! any error. Writes are never retried.

use crate::error::{ApiContext, ProviderError, Result};
use crate::repo_url::{add_scheme_to_domain, get_git_provider_url, with_combined_sub_orgs};
use crate::retry::{Backoff, retry_on_error};
use crate::types::{Commit, CommitFile, PullRequest, TreeEntry};
use gitpr_hosting::{HostingClient, OrgRepository, OrgRepositoryRef, parse_org_repository_url};
use regex::Regex;
use std::collections::HashSet;
use tracing::{debug, info};

const BITBUCKET_URL_PATTERN: &str =
    r"://(?P<host>[^/]+)/(.+/)?(?P<key>[^/]+)/(?P<repo>[^/]+)\.git";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteFilesToBranchRequest {
    pub create_branch: bool,
    pub base_branch: String,
    pub head_branch: String,
    pub commits: Vec<Commit>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatePullRequestRequest {
    pub head_branch: String,
    pub base_branch: String,
    pub title: String,
    pub description: String,
}

/// How repository URLs are turned into references
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Addressing {
    /// `host/org/[sub/...]repo`
    Organization,
    /// Bitbucket Server: `host/[scm/]KEY/repo.git`
    ProjectKey,
}

pub struct HostingAdapter {
    backoff: Backoff,
    addressing: Addressing,
}

impl HostingAdapter {
    pub fn new(backoff: Backoff) -> Self {
        Self {
            backoff,
            addressing: Addressing::Organization,
        }
    }

    pub fn with_addressing(mut self, addressing: Addressing) -> Self {
        self.addressing = addressing;
        self
    }

    /// Create `head` at the most recent commit of `base`
    pub async fn create_branch(
        &self,
        repo: &dyn OrgRepository,
        base: &str,
        head: &str,
    ) -> Result<()> {
        let latest_commit = || repo.list_commits_page(base, 1, 1);
        let commits = retry_on_error(&self.backoff, |_| true, latest_commit)
            .await
            .with_context(|| format!("unable to get most recent commit for branch {:?}", base))?;

        let Some(latest) = commits.first() else {
            return Err(ProviderError::EmptyRepository(base.to_string()));
        };

        repo.create_branch(head, &latest.sha).await.with_context(|| {
            format!(
                "unable to create new branch {:?} from commit {:?} in branch {:?}",
                head, latest.sha, base
            )
        })?;
        debug!(head, base, sha = %latest.sha, "created branch");
        Ok(())
    }

    /// Apply each commit in order as one remote commit on the head branch
    pub async fn write_files_to_branch(
        &self,
        repo: &dyn OrgRepository,
        request: &WriteFilesToBranchRequest,
    ) -> Result<()> {
        if request.create_branch {
            self.create_branch(repo, &request.base_branch, &request.head_branch)
                .await?;
        }

        for commit in &request.commits {
            let files: Vec<gitpr_hosting::CommitFile> =
                commit.files.iter().map(Into::into).collect();
            let created = repo
                .create_commit(&request.head_branch, &commit.commit_message, &files)
                .await
                .with_context(|| format!("unable to commit changes to {:?}", request.head_branch))?;
            info!(sha = %created.sha, branch = %request.head_branch, "Files committed");
        }

        Ok(())
    }

    /// Open the pull request and return its web URL
    pub async fn create_pull_request(
        &self,
        repo: &dyn OrgRepository,
        request: &CreatePullRequestRequest,
    ) -> Result<String> {
        let pr = repo
            .create_pull_request(
                &request.title,
                &request.head_branch,
                &request.base_branch,
                &request.description,
            )
            .await
            .with_context(|| {
                format!(
                    "unable to create new pull request for branch {:?}",
                    request.head_branch
                )
            })?;
        info!(url = %pr.web_url, "Created pull request");
        Ok(pr.web_url)
    }

    /// Resolve a repository by URL, waiting for it to become visible
    pub async fn get_repository(
        &self,
        client: &dyn HostingClient,
        url: &str,
    ) -> Result<Box<dyn OrgRepository>> {
        let https_url = get_git_provider_url(url)?;
        let mut reference = parse_org_repository_url(&https_url)
            .map_err(|e| ProviderError::Parse(format!("unable to parse url {:?}: {}", url, e)))?;
        reference.organization.domain = add_scheme_to_domain(&reference.organization.domain);
        let reference = with_combined_sub_orgs(reference);

        self.lookup(client, url, &reference).await
    }

    /// Resolve a Bitbucket Server repository from `scheme://host/[scm/]KEY/repo.git`
    pub async fn get_bitbucket_repository(
        &self,
        client: &dyn HostingClient,
        url: &str,
    ) -> Result<Box<dyn OrgRepository>> {
        let reference = parse_bitbucket_url(&get_git_provider_url(url)?)?;
        self.lookup(client, url, &reference).await
    }

    async fn lookup(
        &self,
        client: &dyn HostingClient,
        url: &str,
        reference: &OrgRepositoryRef,
    ) -> Result<Box<dyn OrgRepository>> {
        retry_on_error(
            &self.backoff,
            |err: &gitpr_hosting::ApiError| err.is_not_found(),
            || client.get_org_repository(reference),
        )
        .await
        .with_context(|| {
            format!(
                "unable to get repository {:?} (client domain: {})",
                url,
                client.supported_domain()
            )
        })
    }

    /// Resolve the repository the way this adapter addresses URLs
    pub async fn resolve(
        &self,
        client: &dyn HostingClient,
        url: &str,
    ) -> Result<Box<dyn OrgRepository>> {
        match self.addressing {
            Addressing::Organization => self.get_repository(client, url).await,
            Addressing::ProjectKey => self.get_bitbucket_repository(client, url).await,
        }
    }

    /// Files under `path` at `sha`
    pub async fn get_tree_list(
        &self,
        client: &dyn HostingClient,
        url: &str,
        sha: &str,
        path: &str,
        recursive: bool,
    ) -> Result<Vec<TreeEntry>> {
        let repo = self.resolve(client, url).await?;
        let entries = repo
            .list_tree(sha, path, recursive)
            .await
            .with_context(|| format!("unable to list files in {:?} at {:?}", path, sha))?;
        Ok(entries.into_iter().map(TreeEntry::from).collect())
    }

    /// Files that `files` would create but already exist on `branch`,
    /// returned as deletions. Deletions in `files` are ignored.
    pub async fn get_updated_files(
        &self,
        files: &[CommitFile],
        client: &dyn HostingClient,
        url: &str,
        branch: &str,
    ) -> Result<Vec<CommitFile>> {
        if files.iter().all(|file| file.content.is_none()) {
            return Ok(Vec::new());
        }

        let repo = self.resolve(client, url).await?;
        let mut seen = HashSet::new();
        let mut updated = Vec::new();

        for file in files {
            if file.content.is_none() || seen.contains(&file.path) {
                continue;
            }

            let dir = match file.path.rsplit_once('/') {
                Some((dir, _)) => dir,
                None => "",
            };

            let entries = match repo.list_tree(branch, dir, true).await {
                Ok(entries) => entries,
                Err(err) if err.is_not_found() => Vec::new(),
                Err(err) => {
                    return Err(err).with_context(|| {
                        format!("error getting list of trees in repo: {}@{}", url, branch)
                    });
                }
            };

            if entries.iter().any(|entry| entry.path == file.path) {
                seen.insert(file.path.clone());
                updated.push(CommitFile::delete(file.path.clone()));
            }
        }

        Ok(updated)
    }

    pub async fn list_pull_requests(&self, repo: &dyn OrgRepository) -> Result<Vec<PullRequest>> {
        let prs = repo
            .list_pull_requests()
            .await
            .context("unable to list pull requests")?;
        Ok(prs.into_iter().map(PullRequest::from).collect())
    }
}

/// Parse `scheme://host/[prefix/]KEY/repo.git` into a reference keyed by project
pub fn parse_bitbucket_url(url: &str) -> Result<OrgRepositoryRef> {
    let re = Regex::new(BITBUCKET_URL_PATTERN)
        .map_err(|e| ProviderError::Parse(format!("invalid repository pattern: {}", e)))?;
    let captures = re.captures(url).ok_or_else(|| {
        ProviderError::Parse(format!(
            "unable to parse repository URL {:?} using regex {:?}",
            url, BITBUCKET_URL_PATTERN
        ))
    })?;

    let host = &captures["host"];
    let key = &captures["key"];
    let mut reference = OrgRepositoryRef::new(add_scheme_to_domain(host), key, &captures["repo"]);
    reference.set_key(key);
    Ok(reference)
}
