//! Organization and repository references

use crate::error::{ApiError, Result};
use url::Url;

/// An organization (or GitLab group, or Bitbucket project) on a domain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrganizationRef {
    /// Host, optionally with a scheme (`https://git.example.com`)
    pub domain: String,
    pub organization: String,
    /// Nested GitLab sub-groups, outermost first
    pub sub_organizations: Vec<String>,
}

/// A repository inside an organization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrgRepositoryRef {
    pub organization: OrganizationRef,
    pub repository_name: String,
    key: Option<String>,
}

impl OrgRepositoryRef {
    pub fn new(
        domain: impl Into<String>,
        organization: impl Into<String>,
        repository_name: impl Into<String>,
    ) -> Self {
        Self {
            organization: OrganizationRef {
                domain: domain.into(),
                organization: organization.into(),
                sub_organizations: Vec::new(),
            },
            repository_name: repository_name.into(),
            key: None,
        }
    }

    pub fn domain(&self) -> &str {
        &self.organization.domain
    }

    /// Bitbucket Server addresses repositories by project key
    pub fn set_key(&mut self, key: impl Into<String>) {
        self.key = Some(key.into());
    }

    /// The project key, or the organization when no key was set
    pub fn key(&self) -> &str {
        self.key
            .as_deref()
            .unwrap_or(self.organization.organization.as_str())
    }

    /// `org/sub1/sub2/name`
    pub fn full_path(&self) -> String {
        let mut segments = vec![self.organization.organization.as_str()];
        segments.extend(self.organization.sub_organizations.iter().map(String::as_str));
        segments.push(self.repository_name.as_str());
        segments.join("/")
    }
}

/// Parse `https://host/org/[sub/...]repo[.git]` into a repository reference
///
/// # Errors
/// Returns [`ApiError::InvalidRequest`] when the URL is not an http(s) URL
/// or has fewer than two path segments.
pub fn parse_org_repository_url(raw: &str) -> Result<OrgRepositoryRef> {
    let url = Url::parse(raw)
        .map_err(|e| ApiError::InvalidRequest(format!("invalid URL {:?}: {}", raw, e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ApiError::InvalidRequest(format!(
            "unsupported scheme {:?} in {:?}, expected http or https",
            url.scheme(),
            raw
        )));
    }

    let host = url
        .host_str()
        .ok_or_else(|| ApiError::InvalidRequest(format!("missing host in {:?}", raw)))?;
    let domain = match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };

    let mut segments: Vec<&str> = url
        .path()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();

    if segments.len() < 2 {
        return Err(ApiError::InvalidRequest(format!(
            "expected at least an organization and a repository in {:?}",
            raw
        )));
    }

    let name = segments.pop().unwrap_or_default();
    let name = name.strip_suffix(".git").unwrap_or(name);
    let organization = segments.remove(0);

    Ok(OrgRepositoryRef {
        organization: OrganizationRef {
            domain,
            organization: organization.to_string(),
            sub_organizations: segments.into_iter().map(str::to_string).collect(),
        },
        repository_name: name.to_string(),
        key: None,
    })
}

/// Strip an `http://` or `https://` prefix from a domain
pub fn host_of(domain: &str) -> &str {
    domain
        .strip_prefix("https://")
        .or_else(|| domain.strip_prefix("http://"))
        .unwrap_or(domain)
        .trim_end_matches('/')
}

/// Base web URL for a domain, defaulting to `https://` when no scheme is given
pub fn domain_base_url(domain: &str) -> String {
    let domain = domain.trim_end_matches('/');
    if domain.starts_with("https://") || domain.starts_with("http://") {
        domain.to_string()
    } else {
        format!("https://{}", domain)
    }
}

/// Check that a reference points at the domain a client was built for
pub(crate) fn check_domain(supported: &str, reference: &OrgRepositoryRef) -> Result<()> {
    if host_of(supported).eq_ignore_ascii_case(host_of(reference.domain())) {
        Ok(())
    } else {
        Err(ApiError::DomainUnsupported {
            domain: reference.domain().to_string(),
            supported: supported.to_string(),
        })
    }
}
