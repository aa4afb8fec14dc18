//! GitLab provider against a fake REST v4 API

mod support;

use axum::http::StatusCode;
use gitpr::constants::defaults::DELETE_OLD_FILES_MESSAGE;
use gitpr::options::{with_domain, with_oauth2_token, with_token};
use gitpr::{Commit, CommitFile, OptionFn, ProviderFactory, PullRequestInput};
use serde_json::{Value, json};
use support::{FakeServer, Recorded, Reply};

const PROJECT_ID: &str = "42";

/// The single fake project `group/sub/repo`
struct GitLab {
    heads: Vec<(String, String)>,
    files: Vec<String>,
    commits: u32,
    merge_requests: usize,
    unauthorized_tree: bool,
}

impl Default for GitLab {
    fn default() -> Self {
        Self {
            heads: vec![("main".to_string(), "sha0".to_string())],
            files: vec![
                "clusters/a.yaml".to_string(),
                "clusters/keep.yaml".to_string(),
                "README.md".to_string(),
            ],
            commits: 0,
            merge_requests: 0,
            unauthorized_tree: false,
        }
    }
}

impl GitLab {
    fn head(&self, branch: &str) -> Option<String> {
        self.heads
            .iter()
            .find(|(name, _)| name == branch)
            .map(|(_, sha)| sha.clone())
    }

    fn set_head(&mut self, branch: &str, sha: &str) {
        self.heads.retain(|(name, _)| name != branch);
        self.heads.push((branch.to_string(), sha.to_string()));
    }

    /// Apply commit actions the way GitLab validates them
    fn apply(&mut self, actions: &[Value]) -> Result<(), String> {
        for action in actions {
            let path = action["file_path"].as_str().unwrap_or_default().to_string();
            match action["action"].as_str() {
                Some("create") if self.files.contains(&path) => {
                    return Err("A file with this name already exists".to_string());
                }
                Some("create") => self.files.push(path),
                Some("delete") if !self.files.contains(&path) => {
                    return Err("A file with this name doesn't exist".to_string());
                }
                Some("delete") => self.files.retain(|file| *file != path),
                other => return Err(format!("unknown action {:?}", other)),
            }
        }
        Ok(())
    }
}

fn message(status: StatusCode, message: &str) -> Reply {
    Reply::json(status, json!({"message": message}))
}

fn merge_request(iid: usize, title: &Value, description: &Value) -> Value {
    json!({
        "iid": iid,
        "title": title,
        "description": description,
        "web_url": format!("https://gitlab.example.com/group/sub/repo/-/merge_requests/{}", iid),
        "state": if iid % 2 == 0 { "merged" } else { "opened" }
    })
}

fn handle(state: &mut GitLab, request: &Recorded) -> Reply {
    let Some(rest) = request.path.strip_prefix("/api/v4/projects/") else {
        return message(StatusCode::NOT_FOUND, "404 Not Found");
    };

    if rest == "group%2Fsub%2Frepo" && request.method.as_str() == "GET" {
        return Reply::ok(json!({
            "id": 42,
            "path": "repo",
            "path_with_namespace": "group/sub/repo",
            "web_url": "https://gitlab.example.com/group/sub/repo",
            "default_branch": "main",
            "namespace": {"full_path": "group/sub"}
        }));
    }

    let Some(rest) = rest.strip_prefix(&format!("{}/", PROJECT_ID)) else {
        return message(StatusCode::NOT_FOUND, "404 Project Not Found");
    };

    match (request.method.as_str(), rest) {
        ("GET", "repository/commits") => {
            let branch = request.param("ref_name").unwrap_or("main");
            match state.head(branch) {
                Some(sha) => Reply::ok(json!([{"id": sha, "message": "initial commit"}])),
                None => Reply::ok(json!([])),
            }
        }
        ("POST", "repository/branches") => {
            let branch = request.body["branch"].as_str().unwrap_or_default();
            let sha = request.body["ref"].as_str().unwrap_or_default();
            if state.head(branch).is_some() {
                return message(StatusCode::BAD_REQUEST, "Branch already exists");
            }
            state.set_head(branch, sha);
            Reply::json(StatusCode::CREATED, json!({"name": branch}))
        }
        ("GET", "repository/tree") => {
            if state.unauthorized_tree {
                return message(StatusCode::UNAUTHORIZED, "401 Unauthorized");
            }
            let dir = request.param("path").unwrap_or_default();
            let entries: Vec<Value> = state
                .files
                .iter()
                .filter(|file| dir.is_empty() || file.starts_with(&format!("{}/", dir)))
                .map(|file| {
                    json!({
                        "id": format!("blob-{}", file),
                        "name": file.rsplit('/').next(),
                        "path": file,
                        "type": "blob",
                        "mode": "100644"
                    })
                })
                .collect();
            if entries.is_empty() {
                return message(StatusCode::NOT_FOUND, "404 Tree Not Found");
            }
            Reply::ok(Value::Array(entries))
        }
        ("POST", "repository/commits") => {
            let actions = request.body["actions"].as_array().cloned().unwrap_or_default();
            if let Err(error) = state.apply(&actions) {
                return message(StatusCode::BAD_REQUEST, &error);
            }
            state.commits += 1;
            let sha = format!("sha{}", state.commits);
            let branch = request.body["branch"].as_str().unwrap_or_default().to_string();
            state.set_head(&branch, &sha);
            Reply::json(
                StatusCode::CREATED,
                json!({
                    "id": sha,
                    "message": request.body["commit_message"],
                    "web_url": format!("https://gitlab.example.com/group/sub/repo/-/commit/{sha}")
                }),
            )
        }
        ("POST", "merge_requests") => {
            state.merge_requests += 1;
            Reply::json(
                StatusCode::CREATED,
                merge_request(
                    state.merge_requests,
                    &request.body["title"],
                    &request.body["description"],
                ),
            )
        }
        ("GET", "merge_requests") => {
            let per_page: usize = request.param("per_page").unwrap_or("20").parse().unwrap();
            let page: usize = request.param("page").unwrap_or("1").parse().unwrap();
            let start = (page - 1) * per_page;
            let end = (start + per_page).min(state.merge_requests);
            let items: Vec<Value> = (start..end)
                .map(|i| merge_request(i + 1, &json!(format!("mr {}", i + 1)), &Value::Null))
                .collect();
            let next = if end < state.merge_requests {
                (page + 1).to_string()
            } else {
                String::new()
            };
            Reply::ok(Value::Array(items)).header("x-next-page", next)
        }
        _ => message(StatusCode::NOT_FOUND, "404 Not Found"),
    }
}

async fn server() -> FakeServer<GitLab> {
    FakeServer::start(GitLab::default(), handle).await
}

fn provider_with(server: &FakeServer<GitLab>, token: OptionFn) -> Box<dyn gitpr::Provider> {
    ProviderFactory::new()
        .create("gitlab", vec![with_domain(server.base_url()), token])
        .unwrap()
}

fn provider(server: &FakeServer<GitLab>) -> Box<dyn gitpr::Provider> {
    provider_with(server, with_token("pat", "secret"))
}

fn repo_url(server: &FakeServer<GitLab>) -> String {
    format!("{}/group/sub/repo.git", server.base_url())
}

fn input(server: &FakeServer<GitLab>, files: Vec<CommitFile>) -> PullRequestInput {
    PullRequestInput {
        repository_url: repo_url(server),
        title: "Update clusters".to_string(),
        body: "generated".to_string(),
        head: "feature-1".to_string(),
        base: "main".to_string(),
        commits: vec![Commit {
            commit_message: "Update clusters".to_string(),
            files,
        }],
    }
}

#[tokio::test]
async fn test_project_path_is_url_encoded() {
    let server = server().await;
    let provider = provider(&server);

    let repository = provider.get_repository(&repo_url(&server)).await.unwrap();
    assert_eq!(repository.org, "group/sub");
    assert_eq!(repository.name, "repo");

    let lookups = server.requests_to("GET", "/projects/group%2Fsub%2Frepo");
    assert_eq!(lookups.len(), 1);
    assert_eq!(lookups[0].headers.get("private-token").unwrap(), "secret");
    assert!(lookups[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_oauth2_token_is_sent_as_bearer() {
    let server = server().await;
    let provider = provider_with(&server, with_oauth2_token("oauth-token"));

    provider.get_repository(&repo_url(&server)).await.unwrap();

    let lookups = server.requests_to("GET", "/projects/group%2Fsub%2Frepo");
    assert_eq!(
        lookups[0].headers.get("authorization").unwrap(),
        "Bearer oauth-token"
    );
    assert!(lookups[0].headers.get("private-token").is_none());
}

#[tokio::test]
async fn test_create_pull_request_recreates_existing_files() {
    let server = server().await;
    let provider = provider(&server);

    let pr = provider
        .create_pull_request(input(
            &server,
            vec![
                CommitFile::write("clusters/a.yaml", "kind: Cluster\n"),
                CommitFile::write("new/b.yaml", "b"),
                CommitFile::delete("clusters/keep.yaml"),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(
        pr.link,
        "https://gitlab.example.com/group/sub/repo/-/merge_requests/1"
    );

    let branches = server.requests_to("POST", "/projects/42/repository/branches");
    assert_eq!(branches[0].body, json!({"branch": "feature-1", "ref": "sha0"}));

    let trees = server.requests_to("GET", "/projects/42/repository/tree");
    let dirs: Vec<&str> = trees.iter().filter_map(|r| r.param("path")).collect();
    assert_eq!(dirs, vec!["clusters", "new"]);
    assert!(trees.iter().all(|r| r.param("ref") == Some("feature-1")));
    assert!(trees.iter().all(|r| r.param("recursive") == Some("true")));

    let commits = server.requests_to("POST", "/projects/42/repository/commits");
    assert_eq!(commits.len(), 2);
    assert_eq!(commits[0].body["commit_message"], DELETE_OLD_FILES_MESSAGE);
    assert_eq!(
        commits[0].body["actions"],
        json!([{"action": "delete", "file_path": "clusters/a.yaml"}])
    );
    assert_eq!(commits[1].body["branch"], "feature-1");
    assert_eq!(
        commits[1].body["actions"],
        json!([
            {"action": "create", "file_path": "clusters/a.yaml", "content": "kind: Cluster\n"},
            {"action": "create", "file_path": "new/b.yaml", "content": "b"},
            {"action": "delete", "file_path": "clusters/keep.yaml"}
        ])
    );

    let merge_requests = server.requests_to("POST", "/projects/42/merge_requests");
    assert_eq!(
        merge_requests[0].body,
        json!({
            "source_branch": "feature-1",
            "target_branch": "main",
            "title": "Update clusters",
            "description": "generated"
        })
    );

    server.with_state(|state| {
        assert_eq!(state.head("feature-1").as_deref(), Some("sha2"));
        assert!(state.files.contains(&"new/b.yaml".to_string()));
        assert!(!state.files.contains(&"clusters/keep.yaml".to_string()));
    });
}

#[tokio::test]
async fn test_tree_listing_of_missing_directory() {
    let server = server().await;
    let provider = provider(&server);
    let url = repo_url(&server);

    let tree = provider.get_tree_list(&url, "main", "clusters").await.unwrap();
    let paths: Vec<&str> = tree.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["clusters/a.yaml", "clusters/keep.yaml"]);
    assert_eq!(tree[0].name, "a.yaml");

    let err = provider.get_tree_list(&url, "main", "missing").await.unwrap_err();
    assert!(err.api_error().is_some_and(|e| e.is_not_found()));
}

#[tokio::test]
async fn test_unauthorized_tree_listing_stops_the_pull_request() {
    let server = server().await;
    server.with_state(|state| state.unauthorized_tree = true);
    let provider = provider(&server);

    let err = provider
        .create_pull_request(input(&server, vec![CommitFile::write("clusters/a.yaml", "a")]))
        .await
        .unwrap_err();

    assert!(err.to_string().starts_with("error getting list of trees in repo"));
    assert_eq!(err.api_error().and_then(|e| e.status()), Some(401));
    assert!(server.requests_to("POST", "/repository/commits").is_empty());
    assert!(server.requests_to("POST", "/merge_requests").is_empty());
}

#[tokio::test]
async fn test_merge_requests_follow_next_page() {
    let server = server().await;
    server.with_state(|state| state.merge_requests = 150);
    let provider = provider(&server);

    let prs = provider.list_pull_requests(&repo_url(&server)).await.unwrap();
    assert_eq!(prs.len(), 150);
    assert_eq!(prs[149].title, "mr 150");
    assert!(prs[1].merged);
    assert!(!prs[0].merged);

    let requests = server.requests_to("GET", "/projects/42/merge_requests");
    let pages: Vec<Option<&str>> = requests.iter().map(|r| r.param("page")).collect();
    assert_eq!(pages, vec![Some("1"), Some("2")]);
    assert!(requests.iter().all(|r| r.param("state") == Some("all")));
    assert!(requests.iter().all(|r| r.param("per_page") == Some("100")));
}
