//! Commits through the system git
//!
//! Bitbucket Server has no multi-file commit endpoint. The branch is cloned
//! shallowly into a temporary directory, the files are applied, and the result
//! is pushed back as a single commit.
//!
//! The remote URL never carries credentials. They reach git as an
//! `http.extraHeader` set through `GIT_CONFIG_*` environment variables, so
//! they stay out of the process arguments and the clone's `.git/config`.

use crate::error::{ApiError, Result};
use crate::types::CommitFile;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::{Component, Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

const COMMITTER_NAME: &str = "gitpr";
const COMMITTER_EMAIL: &str = "gitpr@users.noreply.local";

/// HTTP credentials for the remote
pub(crate) struct Credentials<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

impl Credentials<'_> {
    fn encoded(&self) -> String {
        STANDARD.encode(format!("{}:{}", self.username, self.password))
    }

    /// Environment that makes git send basic auth with every HTTP request
    pub(crate) fn git_env(&self) -> [(&'static str, String); 3] {
        [
            ("GIT_CONFIG_COUNT", "1".to_string()),
            ("GIT_CONFIG_KEY_0", "http.extraHeader".to_string()),
            (
                "GIT_CONFIG_VALUE_0",
                format!("Authorization: Basic {}", self.encoded()),
            ),
        ]
    }

    fn redact(&self, message: &str) -> String {
        if self.password.is_empty() {
            return message.to_string();
        }
        message
            .replace(self.password, "***")
            .replace(&self.encoded(), "***")
    }
}

/// Resolve a repository relative path inside `root`, rejecting escapes
pub(crate) fn checkout_path(root: &Path, path: &str) -> Result<PathBuf> {
    let relative = Path::new(path.trim_start_matches('/'));
    let valid = relative
        .components()
        .all(|component| matches!(component, Component::Normal(_)));

    if !valid || relative.as_os_str().is_empty() {
        return Err(ApiError::InvalidRequest(format!(
            "invalid repository path {:?}",
            path
        )));
    }
    Ok(root.join(relative))
}

/// Apply `files` on top of `branch` and push them as one commit. Returns the new SHA.
pub(crate) async fn commit_files(
    clone_url: &str,
    credentials: &Credentials<'_>,
    branch: &str,
    message: &str,
    files: &[CommitFile],
) -> Result<String> {
    let workdir = tempfile::tempdir()
        .map_err(|e| ApiError::Git(format!("failed to create temporary directory: {}", e)))?;
    let checkout = workdir.path().join("repo");
    let checkout_str = checkout.to_string_lossy().to_string();

    run_git(
        workdir.path(),
        &[
            "clone",
            "--depth",
            "1",
            "--branch",
            branch,
            "--single-branch",
            clone_url,
            &checkout_str,
        ],
        credentials,
    )
    .await?;

    for file in files {
        let target = checkout_path(&checkout, &file.path)?;
        match &file.content {
            Some(content) => {
                if let Some(parent) = target.parent() {
                    tokio::fs::create_dir_all(parent).await.map_err(|e| {
                        ApiError::Git(format!("failed to create {}: {}", parent.display(), e))
                    })?;
                }
                tokio::fs::write(&target, content).await.map_err(|e| {
                    ApiError::Git(format!("failed to write {}: {}", file.path, e))
                })?;
            }
            None => {
                if target.exists() {
                    tokio::fs::remove_file(&target).await.map_err(|e| {
                        ApiError::Git(format!("failed to remove {}: {}", file.path, e))
                    })?;
                }
            }
        }
    }

    run_git(&checkout, &["add", "--all"], credentials).await?;
    run_git(
        &checkout,
        &[
            "-c",
            &format!("user.name={}", COMMITTER_NAME),
            "-c",
            &format!("user.email={}", COMMITTER_EMAIL),
            "commit",
            "--allow-empty",
            "-m",
            message,
        ],
        credentials,
    )
    .await?;
    run_git(
        &checkout,
        &["push", "origin", &format!("HEAD:refs/heads/{}", branch)],
        credentials,
    )
    .await?;

    let sha = run_git(&checkout, &["rev-parse", "HEAD"], credentials).await?;
    debug!(branch, sha = %sha, "pushed commit");
    Ok(sha)
}

async fn run_git(dir: &Path, args: &[&str], credentials: &Credentials<'_>) -> Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .envs(credentials.git_env())
        .output()
        .await
        .map_err(|e| ApiError::Git(format!("failed to execute git: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ApiError::Git(credentials.redact(&format!(
            "git {} failed: {}",
            args.first().unwrap_or(&""),
            stderr.trim()
        ))));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const CREDENTIALS: Credentials<'static> = Credentials {
        username: "git",
        password: "s3cret",
    };

    #[test]
    fn test_credentials_go_through_the_environment() {
        let env = CREDENTIALS.git_env();
        assert_eq!(env[0], ("GIT_CONFIG_COUNT", "1".to_string()));
        assert_eq!(env[1].1, "http.extraHeader");
        // base64("git:s3cret")
        assert_eq!(env[2].1, "Authorization: Basic Z2l0OnMzY3JldA==");
    }

    #[test]
    fn test_checkout_path_rejects_escapes() {
        let root = Path::new("/tmp/checkout");
        assert_eq!(
            checkout_path(root, "management/a.yaml").unwrap(),
            root.join("management/a.yaml")
        );
        assert_eq!(checkout_path(root, "/a.yaml").unwrap(), root.join("a.yaml"));
        assert!(checkout_path(root, "../a.yaml").is_err());
        assert!(checkout_path(root, "a/../../b").is_err());
        assert!(checkout_path(root, "").is_err());
    }

    #[test]
    fn test_redact() {
        assert_eq!(
            CREDENTIALS.redact("fatal: https://git:s3cret@h"),
            "fatal: https://git:***@h"
        );
        assert_eq!(
            CREDENTIALS.redact("header Basic Z2l0OnMzY3JldA=="),
            "header Basic ***"
        );
        assert_eq!(CREDENTIALS.redact("unchanged"), "unchanged");
    }
}
