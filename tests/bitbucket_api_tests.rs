//! Bitbucket Server provider against a fake REST API backed by a local bare
//! repository, so commits really go through clone, commit and push

mod support;

use axum::http::StatusCode;
use gitpr::options::{with_domain, with_token, with_username};
use gitpr::{Commit, CommitFile, ProviderFactory, PullRequestInput};
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use std::process::Command;
use support::{FakeServer, Recorded, Reply};
use tempfile::TempDir;

const REPO_PATH: &str = "/rest/api/1.0/projects/PROJ/repos/repo";

/// Run git and return its trimmed stdout, or `None` when it fails
fn try_git(dir: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .unwrap();
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn git(dir: &Path, args: &[&str]) -> String {
    try_git(dir, args).unwrap_or_else(|| panic!("git {:?} failed in {}", args, dir.display()))
}

/// A bare `remote.git` whose `main` holds one commit with `files`
fn seed_remote(root: &Path, files: &[(&str, &str)]) -> PathBuf {
    let remote = root.join("remote.git");
    git(root, &["init", "--bare", "remote.git"]);
    git(&remote, &["symbolic-ref", "HEAD", "refs/heads/main"]);

    let work = root.join("seed");
    git(root, &["init", "seed"]);
    git(&work, &["checkout", "-b", "main"]);
    for (path, content) in files {
        let target = work.join(path);
        std::fs::create_dir_all(target.parent().unwrap()).unwrap();
        std::fs::write(target, content).unwrap();
    }
    git(&work, &["add", "--all"]);
    git(
        &work,
        &["-c", "user.name=seed", "-c", "user.email=seed@example.com", "commit", "-m", "initial"],
    );
    git(&work, &["push", remote.to_str().unwrap(), "main"]);
    remote
}

struct Bitbucket {
    remote: PathBuf,
    pull_requests: usize,
}

impl Bitbucket {
    fn git(&self, args: &[&str]) -> Option<String> {
        let mut full = vec!["--git-dir", self.remote.to_str().unwrap()];
        full.extend_from_slice(args);
        try_git(&self.remote, &full)
    }
}

fn errors(status: StatusCode, message: &str) -> Reply {
    Reply::json(status, json!({"errors": [{"context": null, "message": message}]}))
}

fn page(values: Vec<Value>, start: usize, total: usize) -> Reply {
    let end = start + values.len();
    let mut body = json!({
        "values": values,
        "size": end - start,
        "start": start,
        "isLastPage": end >= total
    });
    if end < total {
        body["nextPageStart"] = json!(end);
    }
    Reply::ok(body)
}

fn pull_request(id: usize, title: &Value, description: &Value) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": description,
        "state": if id % 2 == 0 { "MERGED" } else { "OPEN" },
        "links": {"self": [{
            "href": format!("https://stash.example.com/projects/PROJ/repos/repo/pull-requests/{id}")
        }]}
    })
}

fn handle(state: &mut Bitbucket, request: &Recorded) -> Reply {
    let Some(rest) = request.path.strip_prefix(REPO_PATH) else {
        return errors(StatusCode::NOT_FOUND, "Project PROJ does not exist.");
    };
    let start: usize = request.param("start").unwrap_or("0").parse().unwrap();
    let limit: usize = request.param("limit").unwrap_or("25").parse().unwrap();

    match (request.method.as_str(), rest) {
        ("GET", "") => Reply::ok(json!({
            "slug": "repo",
            "project": {"key": "PROJ"},
            "links": {
                "clone": [
                    {"href": "ssh://git@stash.example.com:7999/proj/repo.git", "name": "ssh"},
                    {"href": format!("file://{}", state.remote.display()), "name": "http"}
                ],
                "self": [{"href": "https://stash.example.com/projects/PROJ/repos/repo/browse"}]
            }
        })),
        ("GET", "/commits") => {
            let until = request.param("until").unwrap_or("main");
            let values = match state.git(&["rev-parse", "--verify", "--quiet", until]) {
                Some(sha) => vec![json!({"id": sha, "message": "initial"})],
                None => Vec::new(),
            };
            let total = values.len();
            page(values, 0, total)
        }
        ("POST", "/branches") => {
            let name = request.body["name"].as_str().unwrap_or_default();
            let start_point = request.body["startPoint"].as_str().unwrap_or_default();
            match state.git(&["branch", name, start_point]) {
                Some(_) => Reply::ok(json!({"id": format!("refs/heads/{}", name)})),
                None => errors(StatusCode::CONFLICT, "Branch already exists"),
            }
        }
        ("GET", files) if files.starts_with("/files") => {
            let dir = files.trim_start_matches("/files").trim_start_matches('/');
            let at = request.param("at").unwrap_or("main");
            let listing = state
                .git(&["ls-tree", "-r", "--name-only", at, "--", dir])
                .unwrap_or_default();
            let relative: Vec<Value> = listing
                .lines()
                .map(|path| match dir {
                    "" => json!(path),
                    dir => json!(path.trim_start_matches(dir).trim_start_matches('/')),
                })
                .collect();
            if relative.is_empty() {
                return errors(
                    StatusCode::NOT_FOUND,
                    &format!("The path \"{}\" does not exist at revision \"{}\"", dir, at),
                );
            }
            let total = relative.len();
            let values = relative.into_iter().skip(start).take(limit).collect();
            page(values, start, total)
        }
        ("POST", "/pull-requests") => {
            state.pull_requests += 1;
            Reply::json(
                StatusCode::CREATED,
                pull_request(
                    state.pull_requests,
                    &request.body["title"],
                    &request.body["description"],
                ),
            )
        }
        ("GET", "/pull-requests") => {
            let total = state.pull_requests;
            let values = (start..total.min(start + limit))
                .map(|i| pull_request(i + 1, &json!(format!("pr {}", i + 1)), &Value::Null))
                .collect();
            page(values, start, total)
        }
        _ => errors(StatusCode::NOT_FOUND, "not found"),
    }
}

struct Fixture {
    _dir: TempDir,
    remote: PathBuf,
    server: FakeServer<Bitbucket>,
}

impl Fixture {
    async fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let remote = seed_remote(
            dir.path(),
            &[
                ("clusters/a.yaml", "old"),
                ("clusters/dev/b.yaml", "b"),
                ("clusters/old.yaml", "gone soon"),
                ("README.md", "readme"),
            ],
        );
        let server = FakeServer::start(
            Bitbucket {
                remote: remote.clone(),
                pull_requests: 0,
            },
            handle,
        )
        .await;
        Self {
            _dir: dir,
            remote,
            server,
        }
    }

    fn provider(&self) -> Box<dyn gitpr::Provider> {
        ProviderFactory::new()
            .create(
                "bitbucket-server",
                vec![
                    with_domain(self.server.base_url()),
                    with_username("bot"),
                    with_token("pat", "secret"),
                ],
            )
            .unwrap()
    }

    fn repo_url(&self) -> String {
        format!("{}/scm/PROJ/repo.git", self.server.base_url())
    }

    fn remote_git(&self, args: &[&str]) -> Option<String> {
        let mut full = vec!["--git-dir", self.remote.to_str().unwrap()];
        full.extend_from_slice(args);
        try_git(&self.remote, &full)
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_create_pull_request_pushes_commits() {
    let fixture = Fixture::new().await;
    let provider = fixture.provider();
    let main = fixture.remote_git(&["rev-parse", "main"]).unwrap();

    let pr = provider
        .create_pull_request(PullRequestInput {
            repository_url: fixture.repo_url(),
            title: "Update clusters".to_string(),
            body: "generated".to_string(),
            head: "feature-1".to_string(),
            base: "main".to_string(),
            commits: vec![
                Commit {
                    commit_message: "Update cluster a".to_string(),
                    files: vec![
                        CommitFile::write("clusters/a.yaml", "kind: Cluster\n"),
                        CommitFile::delete("clusters/old.yaml"),
                    ],
                },
                Commit {
                    commit_message: "Add cluster c".to_string(),
                    files: vec![CommitFile::write("clusters/c.yaml", "c")],
                },
            ],
        })
        .await
        .unwrap();

    assert_eq!(
        pr.link,
        "https://stash.example.com/projects/PROJ/repos/repo/pull-requests/1"
    );

    let branches = fixture.server.requests_to("POST", "/branches");
    assert_eq!(
        branches[0].body,
        json!({"name": "feature-1", "startPoint": main})
    );
    assert_eq!(
        branches[0].headers.get("authorization").unwrap(),
        "Basic Ym90OnNlY3JldA=="
    );

    let pulls = fixture.server.requests_to("POST", "/pull-requests");
    assert_eq!(pulls[0].body["fromRef"]["id"], "refs/heads/feature-1");
    assert_eq!(pulls[0].body["toRef"]["id"], "refs/heads/main");
    assert_eq!(pulls[0].body["description"], "generated");

    let log = fixture
        .remote_git(&["log", "--format=%s", "feature-1"])
        .unwrap();
    assert_eq!(
        log.lines().collect::<Vec<_>>(),
        vec!["Add cluster c", "Update cluster a", "initial"]
    );
    assert_eq!(
        fixture.remote_git(&["show", "feature-1:clusters/a.yaml"]).as_deref(),
        Some("kind: Cluster")
    );
    assert_eq!(
        fixture.remote_git(&["show", "feature-1:clusters/c.yaml"]).as_deref(),
        Some("c")
    );
    assert!(fixture.remote_git(&["cat-file", "-e", "feature-1:clusters/old.yaml"]).is_none());
    assert_eq!(
        fixture.remote_git(&["rev-parse", "main"]).unwrap(),
        main,
        "base branch must not move"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_existing_head_branch_fails_before_pushing() {
    let fixture = Fixture::new().await;
    fixture.remote_git(&["branch", "feature-1", "main"]).unwrap();
    let head = fixture.remote_git(&["rev-parse", "feature-1"]).unwrap();

    let err = fixture
        .provider()
        .create_pull_request(PullRequestInput {
            repository_url: fixture.repo_url(),
            title: "t".to_string(),
            body: String::new(),
            head: "feature-1".to_string(),
            base: "main".to_string(),
            commits: vec![Commit {
                commit_message: "m".to_string(),
                files: vec![CommitFile::write("x.yaml", "x")],
            }],
        })
        .await
        .unwrap_err();

    assert!(err.to_string().contains("unable to create new branch"));
    assert_eq!(err.api_error().and_then(|e| e.status()), Some(409));
    assert_eq!(fixture.remote_git(&["rev-parse", "feature-1"]).unwrap(), head);
    assert!(fixture.server.requests_to("POST", "/pull-requests").is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_repository_and_tree_listing() {
    let fixture = Fixture::new().await;
    let provider = fixture.provider();
    let url = fixture.repo_url();

    let repository = provider.get_repository(&url).await.unwrap();
    assert_eq!(repository.org, "PROJ");
    assert_eq!(repository.name, "repo");
    assert_eq!(fixture.server.requests_to("GET", REPO_PATH).len(), 1);

    let tree = provider.get_tree_list(&url, "main", "clusters").await.unwrap();
    let paths: Vec<&str> = tree.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(
        paths,
        vec!["clusters/a.yaml", "clusters/dev/b.yaml", "clusters/old.yaml"]
    );
    assert_eq!(tree[1].name, "b.yaml");
    assert_eq!(
        tree[0].link,
        "https://stash.example.com/projects/PROJ/repos/repo/browse/clusters/a.yaml?at=main"
    );

    let listing = fixture.server.requests_to("GET", "/files/clusters");
    assert_eq!(listing[0].param("at"), Some("main"));
    assert_eq!(listing[0].param("limit"), Some("1000"));

    let err = provider.get_tree_list(&url, "main", "missing").await.unwrap_err();
    assert!(err.api_error().is_some_and(|e| e.is_not_found()));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pull_requests_follow_next_page_start() {
    let fixture = Fixture::new().await;
    fixture.server.with_state(|state| state.pull_requests = 105);

    let prs = fixture
        .provider()
        .list_pull_requests(&fixture.repo_url())
        .await
        .unwrap();
    assert_eq!(prs.len(), 105);
    assert_eq!(prs[104].title, "pr 105");
    assert!(prs[1].merged);
    assert!(!prs[0].merged);

    let requests = fixture.server.requests_to("GET", "/pull-requests");
    let starts: Vec<Option<&str>> = requests.iter().map(|r| r.param("start")).collect();
    assert_eq!(starts, vec![Some("0"), Some("100")]);
    assert!(requests.iter().all(|r| r.param("state") == Some("ALL")));
}
