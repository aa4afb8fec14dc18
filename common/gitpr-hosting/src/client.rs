//! Shared HTTP transport for the hosting clients
//!
//! Every backend client wraps an [`HttpClient`], which owns the reqwest client,
//! the API base URL, the authentication scheme and, when conditional requests
//! are enabled, an ETag cache for GET requests.

use crate::error::{ApiError, Result};
use reqwest::header::{ETAG, HeaderMap, IF_NONE_MATCH, LINK};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::debug;
use url::Url;

/// Default User-Agent header for API requests
pub const DEFAULT_USER_AGENT: &str = concat!("gitpr/", env!("CARGO_PKG_VERSION"));

/// How requests are authenticated against the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    None,
    /// `Authorization: token <token>`, as GitHub documents it
    Token(String),
    /// `Authorization: Bearer <token>`
    Bearer(String),
    /// GitLab personal/project access tokens
    PrivateToken(String),
    Basic { username: String, password: String },
}

impl Auth {
    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Auth::None => request,
            Auth::Token(token) => request.header("Authorization", format!("token {}", token)),
            Auth::Bearer(token) => request.bearer_auth(token),
            Auth::PrivateToken(token) => request.header("PRIVATE-TOKEN", token),
            Auth::Basic { username, password } => request.basic_auth(username, Some(password)),
        }
    }
}

struct CachedResponse {
    etag: String,
    body: String,
    headers: HeaderMap,
}

/// HTTP client bound to one API base URL
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    auth: Auth,
    conditional_requests: bool,
    cache: Mutex<HashMap<String, CachedResponse>>,
}

impl HttpClient {
    pub fn new(base_url: impl Into<String>, auth: Auth) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
            auth,
            conditional_requests: false,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Enable ETag based caching of GET responses
    pub fn with_conditional_requests(mut self, enabled: bool) -> Self {
        self.conditional_requests = enabled;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn auth(&self) -> &Auth {
        &self.auth
    }

    pub fn conditional_requests(&self) -> bool {
        self.conditional_requests
    }

    /// Absolute URL for a path relative to the API base
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Start an authenticated request against the API base
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        debug!(%method, %url, "sending request");
        let request = self
            .client
            .request(method, url)
            .header("User-Agent", DEFAULT_USER_AGENT);
        self.auth.apply(request)
    }

    /// GET a path and decode its JSON body
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let (value, _) = self.get_json_with_headers(path, query).await?;
        Ok(value)
    }

    /// GET a path and decode its JSON body, keeping the response headers for
    /// pagination
    pub async fn get_json_with_headers<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<(T, HeaderMap)> {
        let (body, headers) = self.get_text(path, query).await?;
        let value = serde_json::from_str(&body)
            .map_err(|e| ApiError::Decode(format!("GET {}: {}", path, e)))?;
        Ok((value, headers))
    }

    async fn get_text(&self, path: &str, query: &[(&str, String)]) -> Result<(String, HeaderMap)> {
        let cache_key = format!("{}?{:?}", path, query);
        let mut request = self.request(Method::GET, path).query(query);

        if self.conditional_requests
            && let Some(etag) = self.cached_etag(&cache_key)
        {
            request = request.header(IF_NONE_MATCH, etag);
        }

        let response = request.send().await?;
        if response.status() == StatusCode::NOT_MODIFIED
            && let Some(cached) = self.cached_response(&cache_key)
        {
            debug!(path, "served from conditional request cache");
            return Ok(cached);
        }

        let response = check_status(response).await?;
        let headers = response.headers().clone();
        let etag = headers
            .get(ETAG)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        if self.conditional_requests
            && let Some(etag) = etag
        {
            self.store(cache_key, etag, body.clone(), headers.clone());
        }

        Ok((body, headers))
    }

    /// Send a JSON body and decode the JSON response
    pub async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.request(method.clone(), path).json(body).send().await?;
        let response = check_status(response).await?;
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::Decode(format!("{} {}: {}", method, path, e)))
    }

    /// Send a JSON body and ignore the response body
    pub async fn send_no_content<B>(&self, method: Method, path: &str, body: &B) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        let response = self.request(method, path).json(body).send().await?;
        check_status(response).await?;
        Ok(())
    }

    fn cached_etag(&self, key: &str) -> Option<String> {
        let cache = self.cache.lock().ok()?;
        cache.get(key).map(|cached| cached.etag.clone())
    }

    fn cached_response(&self, key: &str) -> Option<(String, HeaderMap)> {
        let cache = self.cache.lock().ok()?;
        cache
            .get(key)
            .map(|cached| (cached.body.clone(), cached.headers.clone()))
    }

    fn store(&self, key: String, etag: String, body: String, headers: HeaderMap) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(
                key,
                CachedResponse {
                    etag,
                    body,
                    headers,
                },
            );
        }
    }
}

/// Query of the `rel="next"` target of a `Link` header, if there is one
pub fn next_link_query(headers: &HeaderMap) -> Option<Vec<(String, String)>> {
    let link = headers.get(LINK)?.to_str().ok()?;

    link.split(',').find_map(|part| {
        let (target, params) = part.split_once(';')?;
        let is_next = params.split(';').any(|param| {
            let param = param.trim().replace('"', "");
            param == "rel=next"
        });
        if !is_next {
            return None;
        }

        let target = target.trim().trim_start_matches('<').trim_end_matches('>');
        let url = Url::parse(target)
            .or_else(|_| Url::parse("http://localhost/").and_then(|base| base.join(target)))
            .ok()?;
        Some(url.query_pairs().into_owned().collect())
    })
}

/// `base` with every parameter of `next` set, replacing earlier values of the same key
pub fn merge_query(
    base: &[(String, String)],
    next: Vec<(String, String)>,
) -> Vec<(String, String)> {
    let mut merged: Vec<(String, String)> = base
        .iter()
        .filter(|(key, _)| !next.iter().any(|(next_key, _)| next_key == key))
        .cloned()
        .collect();
    merged.extend(next);
    merged
}

/// Borrowed form of an owned query, as the request helpers take it
pub fn query_refs(query: &[(String, String)]) -> Vec<(&str, String)> {
    query
        .iter()
        .map(|(key, value)| (key.as_str(), value.clone()))
        .collect()
}

/// Turn a non-2xx response into an [`ApiError`]
pub async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());
    Err(ApiError::from_response(status, &body))
}
