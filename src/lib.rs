//! gitpr - turn generated file changes into pull requests on GitHub, GitLab,
//! Bitbucket Server and Azure DevOps

pub mod commands;
pub mod config;
pub mod constants;
pub mod error;
pub mod factory;
pub mod options;
pub mod providers;
pub mod repo_url;
pub mod retry;
pub mod types;
pub mod utils;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

// Re-export commonly used types
pub use commands::{Command, CommandContext};
pub use config::Config;
pub use error::{ProviderError, Result};
pub use factory::ProviderFactory;
pub use options::{OptionFn, ProviderOption};
pub use providers::Provider;
pub use retry::Backoff;
pub use types::{Commit, CommitFile, PullRequest, PullRequestInput, Repository, TreeEntry};
