//! Repository URL parsing and normalization
//!
//! Accepted forms:
//! - SCP style: `git@github.com:org/repo.git`
//! - scheme qualified: `ssh://git@host/org/repo.git`, `https://host/org/repo.git`
//! - Azure DevOps: `https://dev.azure.com/org/project/_git/repo`

use crate::constants::providers;
use crate::error::{ProviderError, Result};
use gitpr_hosting::OrgRepositoryRef;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use url::Url;

pub const GITHUB_DOMAIN: &str = "github.com";
pub const GITLAB_DOMAIN: &str = "gitlab.com";
pub const AZURE_HTTP_DOMAIN: &str = "dev.azure.com";
pub const AZURE_SSH_DOMAIN: &str = "ssh.dev.azure.com";

/// Prefix `https://` unless the domain already has a scheme or is one of the
/// public hosts the clients recognise by bare name
pub fn add_scheme_to_domain(domain: &str) -> String {
    if domain == GITHUB_DOMAIN
        || domain == GITLAB_DOMAIN
        || domain.starts_with("http://")
        || domain.starts_with("https://")
    {
        domain.to_string()
    } else {
        format!("https://{}", domain)
    }
}

/// Join the organization and its sub-organizations into one organization path
pub fn with_combined_sub_orgs(mut reference: OrgRepositoryRef) -> OrgRepositoryRef {
    let org = &mut reference.organization;
    if !org.sub_organizations.is_empty() {
        let mut segments = vec![org.organization.clone()];
        segments.append(&mut org.sub_organizations);
        org.organization = segments.join("/");
    }
    reference
}

fn is_scp_like(raw: &str) -> bool {
    if raw.contains("://") {
        return false;
    }
    match (raw.find('@'), raw.find(':')) {
        (Some(at), Some(colon)) => at < colon && !raw[..colon].contains('/'),
        _ => false,
    }
}

/// Parse a git URL, rewriting SCP style remotes (`user@host:path`) to `ssh://user@host/path`
pub fn parse_git_url(raw: &str) -> Result<Url> {
    let candidate = if is_scp_like(raw) {
        format!("ssh://{}", raw.replacen(':', "/", 1))
    } else {
        raw.to_string()
    };

    Url::parse(&candidate)
        .map_err(|e| ProviderError::Parse(format!("could not parse git repo url {:?}: {}", raw, e)))
}

fn host_with_port(url: &Url) -> Result<String> {
    let host = url
        .host_str()
        .ok_or_else(|| ProviderError::Parse(format!("missing host in {:?}", url.as_str())))?;
    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}

/// HTTP(S) URLs are returned unchanged; SSH remotes become `https://host/path`
pub fn get_git_provider_url(repo_url: &str) -> Result<String> {
    if repo_url.starts_with("http://") || repo_url.starts_with("https://") {
        return Ok(repo_url.to_string());
    }

    let url = parse_git_url(repo_url)?;
    let host = url
        .host_str()
        .ok_or_else(|| ProviderError::Parse(format!("missing host in {:?}", repo_url)))?;
    Ok(format!("https://{}{}", host, url.path()))
}

/// Normalize any accepted form to `ssh://git@host/path.git`
pub fn normalize_repo_url(repo_url: &str) -> Result<String> {
    let mut trimmed = repo_url.trim_end_matches('/').to_string();
    if !trimmed.ends_with(".git") {
        trimmed.push_str(".git");
    }

    let url = parse_git_url(&trimmed)?;
    Ok(format!("ssh://git@{}{}", host_with_port(&url)?, url.path()))
}

/// Last path segment without `.git`
pub fn repository_name(repo_url: &str) -> String {
    let trimmed = repo_url.trim_end_matches('/');
    let last = trimmed.rsplit(['/', ':']).next().unwrap_or(trimmed);
    last.strip_suffix(".git").unwrap_or(last).to_string()
}

/// Host to provider mapping: public hosts plus user configured entries
pub fn git_host_types(configured: &HashMap<String, String>) -> HashMap<String, String> {
    let mut types = HashMap::from([
        (GITHUB_DOMAIN.to_string(), providers::GITHUB.to_string()),
        (GITLAB_DOMAIN.to_string(), providers::GITLAB.to_string()),
        (AZURE_HTTP_DOMAIN.to_string(), providers::AZURE_DEVOPS.to_string()),
        (AZURE_SSH_DOMAIN.to_string(), providers::AZURE_DEVOPS.to_string()),
    ]);
    types.extend(configured.iter().map(|(k, v)| (k.clone(), v.clone())));
    types
}

/// Provider name for the host of `repo_url`
pub fn detect_provider(repo_url: &str, configured: &HashMap<String, String>) -> Result<String> {
    let url = parse_git_url(repo_url)?;
    let host = host_with_port(&url)?;
    git_host_types(configured)
        .remove(&host)
        .ok_or_else(|| ProviderError::Parse(format!("no git providers found for {:?}", repo_url)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Https,
    Ssh,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Https => write!(f, "https"),
            Protocol::Ssh => write!(f, "ssh"),
        }
    }
}

/// A parsed repository URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoUrl {
    repo_name: String,
    owner: String,
    normalized: String,
    provider: String,
    protocol: Protocol,
}

impl RepoUrl {
    /// Parse `uri`, detecting the provider from its host
    pub fn new(uri: &str, configured_hosts: &HashMap<String, String>) -> Result<Self> {
        let provider = detect_provider(uri, configured_hosts)?;
        Self::for_provider(uri, &provider)
    }

    /// Parse `uri` hosted by a known `provider`
    pub fn for_provider(uri: &str, provider: &str) -> Result<Self> {
        let normalized = normalize_repo_url(uri)?;
        let url = parse_git_url(&normalized)?;
        let owner = owner_from_url(&url, provider)?;

        let protocol = if uri.starts_with("https://") || uri.starts_with("http://") {
            Protocol::Https
        } else {
            Protocol::Ssh
        };

        Ok(Self {
            repo_name: repository_name(uri),
            owner,
            normalized,
            provider: provider.to_string(),
            protocol,
        })
    }

    /// Organization or user owning the repository; `org/project` on Azure DevOps
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repository_name(&self) -> &str {
        &self.repo_name
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }
}

impl fmt::Display for RepoUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized)
    }
}

fn owner_from_url(url: &Url, provider: &str) -> Result<String> {
    let parts: Vec<&str> = url.path().trim_start_matches('/').split('/').collect();
    if parts.len() < 2 {
        return Err(ProviderError::Parse(format!("could not get owner from url {}", url)));
    }

    // https://dev.azure.com/org/project/_git/repo
    // git@ssh.dev.azure.com:v3/org/project/repo
    if provider == providers::AZURE_DEVOPS {
        if parts.len() < 3 {
            return Err(ProviderError::Parse(format!("could not get owner from url {}", url)));
        }
        return Ok(if parts[parts.len() - 2] == "_git" {
            parts[..2].join("/")
        } else {
            parts[1..3].join("/")
        });
    }

    Ok(parts[..parts.len() - 1].join("/"))
}
