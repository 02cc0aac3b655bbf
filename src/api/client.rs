use futures::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::util::{validate_base_url, UrlValidationError};

/// Upper bound on a response body. Category and task lists are small; anything
/// larger than this is a misbehaving server.
const MAX_RESPONSE_SIZE: usize = 5 * 1024 * 1024; // 5MB

/// Per-request timeout used when the configuration does not override it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Failures talking to the remote API.
///
/// Transport errors, non-2xx responses, and malformed bodies all surface
/// here. None of them are retried.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("Insecure base URL: HTTPS required (except localhost)")]
    InsecureBaseUrl,
    #[error("Not signed in")]
    Unauthenticated,
}

impl ApiError {
    /// True when the server (or the client, lacking a token) refused the
    /// credentials. The caller should sign in again.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            ApiError::Unauthenticated | ApiError::HttpStatus(401) | ApiError::HttpStatus(403)
        )
    }
}

impl From<UrlValidationError> for ApiError {
    fn from(err: UrlValidationError) -> Self {
        match err {
            UrlValidationError::Insecure => ApiError::InsecureBaseUrl,
            other => ApiError::InvalidBaseUrl(other.to_string()),
        }
    }
}

/// Whether an endpoint needs the bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Auth {
    None,
    Bearer,
}

/// HTTP client for the todo-list API.
///
/// Holds the validated base URL and, once signed in, the bearer token. The
/// token lives only in memory and never appears in `Debug` output or logs.
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
    token: Option<SecretString>,
    timeout: Duration,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base", &self.base)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let url = validate_base_url(base_url)?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("taskflow/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base: url.as_str().trim_end_matches('/').to_owned(),
            token: None,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    pub fn set_token(&mut self, token: SecretString) {
        self.token = Some(token);
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    pub fn token(&self) -> Option<&SecretString> {
        self.token.as_ref()
    }

    /// Build the full URL for `path` with `query` appended.
    pub(crate) fn endpoint(&self, path: &str, query: &[(&str, String)]) -> Result<Url, ApiError> {
        let mut url = Url::parse(&format!("{}{}", self.base, path))
            .map_err(|e| ApiError::InvalidBaseUrl(e.to_string()))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter());
        }
        Ok(url)
    }

    /// Send one request and return the raw body of a 2xx response.
    ///
    /// Bearer endpoints fail locally with [`ApiError::Unauthenticated`] when no
    /// token is held; nothing is sent in that case.
    pub(crate) async fn send(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Vec<u8>>,
        auth: Auth,
    ) -> Result<Vec<u8>, ApiError> {
        let url = self.endpoint(path, query)?;
        let mut request = self.http.request(method.clone(), url);

        if auth == Auth::Bearer {
            let token = self.token.as_ref().ok_or(ApiError::Unauthenticated)?;
            request = request.bearer_auth(token.expose_secret());
        }

        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        tracing::debug!(%method, path, "Sending API request");

        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| ApiError::Timeout(self.timeout))??;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%method, path, status = status.as_u16(), "API request rejected");
            return Err(ApiError::HttpStatus(status.as_u16()));
        }

        read_limited_bytes(response, MAX_RESPONSE_SIZE).await
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let bytes = self.send(Method::GET, path, query, None, Auth::Bearer).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub(crate) async fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: &B,
        auth: Auth,
    ) -> Result<T, ApiError> {
        let body = serde_json::to_vec(body)?;
        let bytes = self.send(method, path, query, Some(body), auth).await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Send a request whose response body carries nothing the client uses.
    pub(crate) async fn send_unit<B: Serialize>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
        auth: Auth,
    ) -> Result<(), ApiError> {
        let body = body.map(serde_json::to_vec).transpose()?;
        self.send(method, path, query, body, auth).await?;
        Ok(())
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, ApiError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len as usize > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(ApiError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn signed_in(server: &MockServer) -> ApiClient {
        let mut api = ApiClient::new(&server.uri()).unwrap();
        api.set_token(SecretString::from("test-token"));
        api
    }

    #[test]
    fn test_insecure_base_url_rejected() {
        let result = ApiClient::new("http://api.example.com");
        assert!(matches!(result, Err(ApiError::InsecureBaseUrl)));
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        let result = ApiClient::new("::not a url::");
        assert!(matches!(result, Err(ApiError::InvalidBaseUrl(_))));
    }

    #[test]
    fn test_endpoint_keeps_base_path_and_encodes_query() {
        let api = ApiClient::new("https://api.example.com/v1/").unwrap();
        let url = api
            .endpoint(
                "/categories/item",
                &[("id", "7".to_string()), ("catId", "2".to_string())],
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/v1/categories/item?id=7&catId=2"
        );
    }

    #[test]
    fn test_debug_masks_token() {
        let mut api = ApiClient::new("https://api.example.com").unwrap();
        api.set_token(SecretString::from("super-secret-jwt"));
        let debug_output = format!("{:?}", api);
        assert!(!debug_output.contains("super-secret-jwt"));
        assert!(debug_output.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_bearer_header_attached() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/categories/"))
            .and(header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(1)
            .mount(&server)
            .await;

        let api = signed_in(&server);
        let cats: Vec<serde_json::Value> = api.get_json("/categories/", &[]).await.unwrap();
        assert!(cats.is_empty());
    }

    #[tokio::test]
    async fn test_missing_token_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
            .expect(0)
            .mount(&server)
            .await;

        let api = ApiClient::new(&server.uri()).unwrap();
        let result: Result<Vec<serde_json::Value>, _> = api.get_json("/categories/", &[]).await;
        let err = result.unwrap_err();
        assert!(matches!(err, ApiError::Unauthenticated));
        assert!(err.is_auth_failure());
    }

    #[tokio::test]
    async fn test_non_2xx_is_http_status() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let api = signed_in(&server);
        let result = api
            .send_unit::<()>(Method::DELETE, "/categories/3", &[], None, Auth::Bearer)
            .await;
        let err = result.unwrap_err();
        assert!(matches!(err, ApiError::HttpStatus(403)));
        assert!(err.is_auth_failure());
    }

    #[tokio::test]
    async fn test_json_body_sent_with_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/categories/"))
            .and(header_exists("content-type"))
            .and(query_param("dry", "1"))
            .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"ok":true}"#))
            .expect(1)
            .mount(&server)
            .await;

        let api = signed_in(&server);
        let reply: serde_json::Value = api
            .send_json(
                Method::POST,
                "/categories/",
                &[("dry", "1".to_string())],
                &serde_json::json!({"category": "Work"}),
                Auth::Bearer,
            )
            .await
            .unwrap();
        assert_eq!(reply["ok"], true);
    }

    #[tokio::test]
    async fn test_malformed_json_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let api = signed_in(&server);
        let result: Result<Vec<serde_json::Value>, _> = api.get_json("/categories/", &[]).await;
        assert!(matches!(result, Err(ApiError::Json(_))));
    }

    #[tokio::test]
    async fn test_slow_server_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("[]")
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let mut api = ApiClient::with_timeout(&server.uri(), Duration::from_millis(50)).unwrap();
        api.set_token(SecretString::from("test-token"));
        let result: Result<Vec<serde_json::Value>, _> = api.get_json("/categories/", &[]).await;
        assert!(matches!(result, Err(ApiError::Timeout(_))));
    }
}
