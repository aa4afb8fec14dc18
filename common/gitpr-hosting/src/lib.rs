//! Git hosting API clients
//!
//! Low-level REST clients for the hosting backends gitpr talks to, plus the
//! shared transport they are built on.
//!
//! ## Modules
//!
//! - [`repository`]: the [`HostingClient`]/[`OrgRepository`] abstraction
//! - [`github`], [`gitlab`], [`bitbucket`]: clients implementing it
//! - [`azure`]: Azure DevOps client with raw request support
//! - [`refs`]: organization and repository references
//! - [`client`]: HTTP transport with conditional-request caching

pub mod azure;
pub mod bitbucket;
pub mod client;
pub mod error;
pub mod github;
pub mod gitlab;
pub mod refs;
pub mod repository;
pub mod types;

// Re-export public API
pub use azure::{AzureClient, AzureError, AzureRepoRef, RawRequest};
pub use bitbucket::BitbucketServerClient;
pub use client::{Auth, HttpClient};
pub use error::{ApiError, Result};
pub use github::GitHubClient;
pub use gitlab::GitLabClient;
pub use refs::{OrgRepositoryRef, OrganizationRef, parse_org_repository_url};
pub use repository::{HostingClient, OrgRepository};
pub use types::{CommitFile, CommitInfo, PullRequestInfo, RepositoryInfo, TreeEntry, filter_tree};
