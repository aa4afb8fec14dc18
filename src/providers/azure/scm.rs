//! Request builders for the Azure DevOps git REST API
//!
//! Pushes carry every file of a commit in one request, which the generic
//! content endpoints cannot do.

use crate::error::{ProviderError, Result};
use crate::types::CommitFile;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use gitpr_hosting::azure::API_VERSION;
use gitpr_hosting::{AzureRepoRef, RawRequest};
use reqwest::Method;
use serde::Serialize;
use url::{Url, form_urlencoded};

/// Split `https://host/org/project/_git/repo` into its parts
pub fn parse_url(repo_url: &str) -> Result<AzureRepoRef> {
    let url = Url::parse(repo_url)
        .map_err(|e| ProviderError::Parse(format!("unable to parse url {:?}: {}", repo_url, e)))?;

    let parts: Vec<&str> = url.path().trim_matches('/').split('/').collect();
    if parts.len() != 4 {
        return Err(ProviderError::Parse(format!(
            "unable to parse url {:?}: expected org/project/_git/repo",
            repo_url
        )));
    }

    Ok(AzureRepoRef {
        organization: parts[0].to_string(),
        project: parts[1].to_string(),
        name: parts[3].trim_end_matches(".git").to_string(),
    })
}

/// `org/project/_apis/git/repositories/repo/<path>?<params>&api-version=6.0`
pub fn endpoint(repo_url: &str, path: &str, params: &[(&str, &str)]) -> Result<String> {
    let repo = parse_url(repo_url)?;

    let mut query = form_urlencoded::Serializer::new(String::new());
    for (key, value) in params {
        query.append_pair(key, value);
    }
    query.append_pair("api-version", API_VERSION);

    Ok(format!("{}?{}", repo.api_path(path), query.finish()))
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PushRequest<'a> {
    ref_updates: Vec<RefUpdate>,
    commits: Vec<CommitRef<'a>>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct RefUpdate {
    name: String,
    old_object_id: String,
}

#[derive(Serialize, Debug)]
struct CommitRef<'a> {
    comment: &'a str,
    changes: Vec<Change<'a>>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Change<'a> {
    change_type: &'static str,
    item: Item<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    new_content: Option<NewContent>,
}

#[derive(Serialize, Debug)]
struct Item<'a> {
    path: &'a str,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct NewContent {
    content: String,
    content_type: &'static str,
}

fn change(file: &CommitFile) -> Change<'_> {
    match &file.content {
        Some(content) => Change {
            change_type: "add",
            item: Item { path: &file.path },
            new_content: Some(NewContent {
                content: STANDARD.encode(content.as_bytes()),
                content_type: "base64encoded",
            }),
        },
        // TODO: send removals as Azure's "delete" change type
        None => Change {
            change_type: "edit",
            item: Item { path: &file.path },
            new_content: None,
        },
    }
}

/// A push of one commit with `files` on top of `sha` on branch `head`
pub fn commit_files_request(
    sha: &str,
    repo_url: &str,
    head: &str,
    message: &str,
    files: &[CommitFile],
) -> Result<RawRequest> {
    let path = endpoint(repo_url, "pushes", &[])?;

    let push = PushRequest {
        ref_updates: vec![RefUpdate {
            name: format!("refs/heads/{}", head),
            old_object_id: sha.to_string(),
        }],
        commits: vec![CommitRef {
            comment: message,
            changes: files.iter().map(change).collect(),
        }],
    };
    let body = serde_json::to_value(&push)?;

    Ok(RawRequest {
        method: Method::POST,
        path,
        headers: vec![("Content-Type".to_string(), "application/json".to_string())],
        body: Some(body),
    })
}

/// An `items` listing of everything under `path` at `reference`
///
/// Full SHAs are addressed as commits, anything else as a branch.
pub fn list_contents(repo_url: &str, path: &str, reference: &str) -> Result<RawRequest> {
    let mut params = vec![
        ("scopePath", path),
        ("recursionLevel", "full"),
        ("format", "json"),
    ];
    if !reference.is_empty() {
        let version_type = if reference.len() == 40 { "commit" } else { "branch" };
        params.push(("versionDescriptor.versionType", version_type));
        params.push(("versionDescriptor.version", reference));
    }

    Ok(RawRequest {
        method: Method::GET,
        path: endpoint(repo_url, "items", &params)?,
        headers: vec![("Content-Type".to_string(), "application/json".to_string())],
        body: None,
    })
}
