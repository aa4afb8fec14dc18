//! Pull request operations

use super::GitHubRepository;
use crate::client::{merge_query, next_link_query, query_refs};
use crate::error::Result;
use crate::types::PullRequestInfo;
use reqwest::Method;
use serde::{Deserialize, Serialize};

const PAGE_SIZE: u32 = 100;

#[derive(Serialize)]
pub(crate) struct CreatePullRequestPayload<'a> {
    title: &'a str,
    head: &'a str,
    base: &'a str,
    body: &'a str,
}

#[derive(Deserialize, Debug)]
pub(crate) struct PullRequestResponse {
    html_url: String,
    number: u64,
    title: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    merged_at: Option<String>,
}

impl From<PullRequestResponse> for PullRequestInfo {
    fn from(pr: PullRequestResponse) -> Self {
        PullRequestInfo {
            number: pr.number,
            title: pr.title,
            description: pr.body.unwrap_or_default(),
            web_url: pr.html_url,
            merged: pr.merged_at.is_some(),
        }
    }
}

impl GitHubRepository {
    /// Create a pull request from `head` into `base`
    ///
    /// # Errors
    /// Returns an error if the API request fails (for example when a pull
    /// request for `head` already exists) or the response cannot be parsed.
    pub(super) async fn open_pull_request(
        &self,
        title: &str,
        head: &str,
        base: &str,
        body: &str,
    ) -> Result<PullRequestInfo> {
        let payload = CreatePullRequestPayload {
            title,
            head,
            base,
            body,
        };

        let pr: PullRequestResponse = self
            .http
            .send_json(Method::POST, &self.path("pulls"), &payload)
            .await?;
        Ok(pr.into())
    }

    /// Every pull request in any state, following `Link: rel="next"` pages
    pub(super) async fn pull_requests(&self) -> Result<Vec<PullRequestInfo>> {
        let path = self.path("pulls");
        let mut query = vec![
            ("state".to_string(), "all".to_string()),
            ("per_page".to_string(), PAGE_SIZE.to_string()),
        ];
        let mut prs = Vec::new();

        loop {
            let (page, headers): (Vec<PullRequestResponse>, _) = self
                .http
                .get_json_with_headers(&path, &query_refs(&query))
                .await?;
            prs.extend(page.into_iter().map(PullRequestInfo::from));

            let next = match next_link_query(&headers) {
                Some(next) => merge_query(&query, next),
                None => break,
            };
            if next == query {
                break;
            }
            query = next;
        }

        Ok(prs)
    }
}
