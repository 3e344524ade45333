use super::{RefreshResponse, TokenPair};
use crate::storage::{StorageError, TokenStore};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Method, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

pub const LOGIN_ENDPOINT: &str = "/auth/login/";
pub const REGISTER_ENDPOINT: &str = "/auth/register/";
pub const REFRESH_ENDPOINT: &str = "/auth/token/refresh/";

/// Reachable without an access token. Matched by substring.
const PUBLIC_ENDPOINTS: [&str; 3] = [LOGIN_ENDPOINT, REGISTER_ENDPOINT, REFRESH_ENDPOINT];

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Request failed: {0}")]
    RequestError(String),
    #[error("{}", describe_failure(.status, .body))]
    ApiError { status: u16, body: Option<Value> },
    #[error("Authentication failed. Please log in again.")]
    AuthenticationFailed,
    #[error("No refresh token available")]
    NoRefreshToken,
    #[error("Token refresh failed: HTTP {0}")]
    RefreshRejected(u16),
    #[error("Invalid response body: {0}")]
    DecodeError(String),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::ApiError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// The parsed error body of a non-2xx response, when it was JSON.
    pub fn body(&self) -> Option<&Value> {
        match self {
            ApiError::ApiError { body, .. } => body.as_ref(),
            _ => None,
        }
    }
}

fn describe_failure(status: &u16, body: &Option<Value>) -> String {
    match body {
        Some(body) => body.to_string(),
        None => format!("HTTP {}", status),
    }
}

pub fn is_public_endpoint(endpoint: &str) -> bool {
    PUBLIC_ENDPOINTS
        .iter()
        .any(|public_endpoint| endpoint.contains(public_endpoint))
}

/// HTTP client for the CareerForge backend.
///
/// Protected calls carry `Authorization: Bearer <access>` read from the
/// [`TokenStore`] at send time. A 401 on a protected call triggers one
/// refresh and one retry; nothing beyond that.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    store: TokenStore,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, store: TokenStore) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            store,
        }
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        store: TokenStore,
        timeout: Option<Duration>,
    ) -> Result<Self, ApiError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ApiError::RequestError(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            store,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Access token to attach for `endpoint`, if any. Store read failures
    /// degrade to an unauthenticated request.
    fn bearer_for(&self, endpoint: &str) -> Option<String> {
        if is_public_endpoint(endpoint) {
            log::debug!("Public endpoint, not adding auth header: {}", endpoint);
            return None;
        }

        match self.store.load_tokens() {
            Ok(Some(tokens)) if !tokens.access.is_empty() => Some(tokens.access),
            Ok(_) => {
                log::debug!("No stored tokens, sending {} without auth header", endpoint);
                None
            }
            Err(e) => {
                log::error!("Error reading stored tokens: {}", e);
                None
            }
        }
    }

    async fn send(
        &self,
        method: &Method,
        endpoint: &str,
        body: Option<&[u8]>,
    ) -> Result<Response, ApiError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(CONTENT_TYPE, "application/json");

        if let Some(access) = self.bearer_for(endpoint) {
            request = request.bearer_auth(access);
        }
        if let Some(body) = body {
            request = request.body(body.to_vec());
        }

        log::debug!(
            "{} {} ({})",
            method,
            url,
            if body.is_some() { "body present" } else { "no body" }
        );

        request
            .send()
            .await
            .map_err(|e| ApiError::RequestError(e.to_string()))
    }

    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<Value, ApiError> {
        let payload = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|e| ApiError::RequestError(e.to_string()))?;

        let mut response = self.send(&method, endpoint, payload.as_deref()).await?;
        log::debug!("Response status for {}: {}", endpoint, response.status());

        if response.status() == StatusCode::UNAUTHORIZED && !is_public_endpoint(endpoint) {
            log::info!("Access token rejected for {}, attempting refresh", endpoint);
            if let Err(e) = self.refresh_token().await {
                log::warn!("Token refresh failed: {}", e);
                return Err(ApiError::AuthenticationFailed);
            }

            response = match self.send(&method, endpoint, payload.as_deref()).await {
                Ok(retried) if retried.status() != StatusCode::UNAUTHORIZED => retried,
                Ok(_) => return Err(self.authentication_failed(endpoint, "token rejected again")),
                Err(e) => return Err(self.authentication_failed(endpoint, &e.to_string())),
            };
            log::debug!("Retry response status for {}: {}", endpoint, response.status());
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.json::<Value>().await.ok();
            log::error!("API error response from {}: HTTP {}", endpoint, status);
            return Err(ApiError::ApiError { status, body });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::RequestError(e.to_string()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| ApiError::DecodeError(e.to_string()))
    }

    /// The retry after a refresh failed too. The stored session is wiped so
    /// every holder of the store sees the user as signed out.
    fn authentication_failed(&self, endpoint: &str, reason: &str) -> ApiError {
        log::warn!("Retry of {} failed after refresh: {}", endpoint, reason);
        if let Err(e) = self.store.clear() {
            log::error!("Failed to clear stored session: {}", e);
        }
        ApiError::AuthenticationFailed
    }

    pub async fn get(&self, endpoint: &str) -> Result<Value, ApiError> {
        self.request(Method::GET, endpoint, None).await
    }

    pub async fn post<T: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        data: &T,
    ) -> Result<Value, ApiError> {
        let body = to_value(data)?;
        self.request(Method::POST, endpoint, Some(&body)).await
    }

    pub async fn put<T: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        data: &T,
    ) -> Result<Value, ApiError> {
        let body = to_value(data)?;
        self.request(Method::PUT, endpoint, Some(&body)).await
    }

    pub async fn patch<T: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        data: &T,
    ) -> Result<Value, ApiError> {
        let body = to_value(data)?;
        self.request(Method::PATCH, endpoint, Some(&body)).await
    }

    pub async fn delete(&self, endpoint: &str) -> Result<Value, ApiError> {
        self.request(Method::DELETE, endpoint, None).await
    }

    /// Exchanges the stored refresh token for a new access token. The refresh
    /// token itself is kept as-is. Any failure wipes the stored session.
    pub async fn refresh_token(&self) -> Result<TokenPair, ApiError> {
        match self.exchange_refresh_token().await {
            Ok(tokens) => Ok(tokens),
            Err(e) => {
                log::error!("Token refresh error: {}", e);
                if let Err(clear_err) = self.store.clear() {
                    log::error!("Failed to clear stored session: {}", clear_err);
                }
                Err(e)
            }
        }
    }

    async fn exchange_refresh_token(&self) -> Result<TokenPair, ApiError> {
        let current = self.store.load_tokens()?.ok_or(ApiError::NoRefreshToken)?;

        let response = self
            .http
            .post(format!("{}{}", self.base_url, REFRESH_ENDPOINT))
            .json(&serde_json::json!({ "refresh": current.refresh }))
            .send()
            .await
            .map_err(|e| ApiError::RequestError(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ApiError::RefreshRejected(response.status().as_u16()));
        }

        let refreshed: RefreshResponse = response
            .json()
            .await
            .map_err(|e| ApiError::DecodeError(e.to_string()))?;

        let tokens = TokenPair {
            access: refreshed.access,
            refresh: current.refresh,
        };
        self.store.save_tokens(&tokens)?;
        log::info!("Access token refreshed");
        Ok(tokens)
    }
}

fn to_value<T: Serialize + ?Sized>(data: &T) -> Result<Value, ApiError> {
    serde_json::to_value(data).map_err(|e| ApiError::RequestError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::UserRecord;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn pair(access: &str, refresh: &str) -> TokenPair {
        TokenPair {
            access: access.to_string(),
            refresh: refresh.to_string(),
        }
    }

    fn client_for(server: &MockServer) -> ApiClient {
        ApiClient::new(format!("{}/api", server.uri()), TokenStore::in_memory())
    }

    fn slow_client_for(server: &MockServer) -> ApiClient {
        ApiClient::with_timeout(
            format!("{}/api", server.uri()),
            TokenStore::in_memory(),
            Some(Duration::from_millis(300)),
        )
        .unwrap()
    }

    #[test]
    fn test_public_endpoint_classification() {
        assert!(is_public_endpoint("/auth/login/"));
        assert!(is_public_endpoint("/auth/register/"));
        assert!(is_public_endpoint("/auth/token/refresh/"));
        assert!(is_public_endpoint("/auth/login/?next=/dashboard"));
        assert!(!is_public_endpoint("/auth/profile/detail/"));
        assert!(!is_public_endpoint("/auth/logout/"));
        assert!(!is_public_endpoint("/ai/chat/conversations/"));
    }

    #[test]
    fn test_api_error_display_uses_body_or_status() {
        let with_body = ApiError::ApiError {
            status: 400,
            body: Some(json!({ "email": ["already registered"] })),
        };
        assert_eq!(with_body.to_string(), r#"{"email":["already registered"]}"#);

        let without_body = ApiError::ApiError { status: 502, body: None };
        assert_eq!(without_body.to_string(), "HTTP 502");
    }

    #[tokio::test]
    async fn test_protected_request_without_tokens_has_no_auth_header() {
        let server = MockServer::start().await;
        Mock::given(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/career/roadmaps/"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let data = client.get("/career/roadmaps/").await.unwrap();
        assert_eq!(data, json!([]));
        server.verify().await;
    }

    #[tokio::test]
    async fn test_public_request_never_sends_auth_header() {
        let server = MockServer::start().await;
        Mock::given(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.store().save_tokens(&pair("stale", "r1")).unwrap();
        client
            .post("/auth/login/", &json!({ "email": "a@b.c", "password": "pw" }))
            .await
            .unwrap();
        server.verify().await;
    }

    #[tokio::test]
    async fn test_protected_request_attaches_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/profile/detail/"))
            .and(header("authorization", "Bearer a1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 1 })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.store().save_tokens(&pair("a1", "r1")).unwrap();
        let data = client.get("/auth/profile/detail/").await.unwrap();
        assert_eq!(data, json!({ "id": 1 }));
    }

    #[tokio::test]
    async fn test_401_refreshes_once_and_retries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/career/dashboard/"))
            .and(header("authorization", "Bearer old"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/token/refresh/"))
            .and(body_json(json!({ "refresh": "r1" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "new" })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/career/dashboard/"))
            .and(header("authorization", "Bearer new"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "streak": 3 })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.store().save_tokens(&pair("old", "r1")).unwrap();

        let data = client.get("/career/dashboard/").await.unwrap();
        assert_eq!(data, json!({ "streak": 3 }));
        // Only the access token changes.
        assert_eq!(client.store().load_tokens().unwrap(), Some(pair("new", "r1")));
        server.verify().await;
    }

    #[tokio::test]
    async fn test_second_401_does_not_refresh_again() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/career/progress/"))
            .respond_with(ResponseTemplate::new(401))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/token/refresh/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "new" })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.store().save_tokens(&pair("old", "r1")).unwrap();

        let err = client.get("/career/progress/").await.unwrap_err();
        assert!(matches!(err, ApiError::AuthenticationFailed));
        assert!(client.store().load_tokens().unwrap().is_none());
        server.verify().await;
    }

    #[tokio::test]
    async fn test_retry_transport_failure_is_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/career/progress/"))
            .and(header("authorization", "Bearer old"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/token/refresh/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "access": "new" })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/career/progress/"))
            .and(header("authorization", "Bearer new"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "streak": 1 }))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client = slow_client_for(&server);
        client
            .store()
            .save_session(&pair("old", "r1"), &UserRecord(json!({ "id": 1 })))
            .unwrap();

        let err = client.get("/career/progress/").await.unwrap_err();
        assert!(matches!(err, ApiError::AuthenticationFailed));
        assert!(client.store().load_tokens().unwrap().is_none());
        assert!(client.store().load_user().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unreachable_refresh_clears_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/career/roadmaps/"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/token/refresh/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "access": "new" }))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let client = slow_client_for(&server);
        client
            .store()
            .save_session(&pair("old", "r1"), &UserRecord(json!({ "id": 1 })))
            .unwrap();

        let err = client.get("/career/roadmaps/").await.unwrap_err();
        assert!(matches!(err, ApiError::AuthenticationFailed));
        assert!(client.store().load_tokens().unwrap().is_none());
        assert!(client.store().load_user().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refresh_network_error_clears_session() {
        let client = ApiClient::new("http://127.0.0.1:9/api", TokenStore::in_memory());
        client
            .store()
            .save_session(&pair("old", "r1"), &UserRecord(json!({ "id": 1 })))
            .unwrap();

        let err = client.refresh_token().await.unwrap_err();
        assert!(matches!(err, ApiError::RequestError(_)));
        assert!(client.store().load_tokens().unwrap().is_none());
        assert!(client.store().load_user().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_refresh_clears_session() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/career/roadmaps/"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/token/refresh/"))
            .respond_with(
                ResponseTemplate::new(401)
                    .set_body_json(json!({ "detail": "Token is invalid or expired" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client
            .store()
            .save_session(&pair("old", "r1"), &UserRecord(json!({ "id": 1 })))
            .unwrap();

        let err = client.get("/career/roadmaps/").await.unwrap_err();
        assert!(matches!(err, ApiError::AuthenticationFailed));
        assert!(client.store().load_tokens().unwrap().is_none());
        assert!(client.store().load_user().unwrap().is_none());
        // Clearing again afterwards is harmless.
        client.store().clear().unwrap();
        server.verify().await;
    }

    #[tokio::test]
    async fn test_refresh_without_stored_tokens_fails() {
        let server = MockServer::start().await;
        let client = client_for(&server);
        let err = client.refresh_token().await.unwrap_err();
        assert!(matches!(err, ApiError::NoRefreshToken));
    }

    #[tokio::test]
    async fn test_401_on_public_endpoint_is_plain_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login/"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "detail": "No active account" })),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(path("/api/auth/token/refresh/"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .post("/auth/login/", &json!({ "email": "a@b.c", "password": "x" }))
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.body(), Some(&json!({ "detail": "No active account" })));
        server.verify().await;
    }

    #[tokio::test]
    async fn test_non_json_error_body_falls_back_to_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/jobs/"))
            .respond_with(ResponseTemplate::new(500).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.get("/jobs/").await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP 500");
    }

    #[tokio::test]
    async fn test_empty_success_body_is_null() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/auth/delete-account/"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.store().save_tokens(&pair("a1", "r1")).unwrap();
        assert_eq!(client.delete("/auth/delete-account/").await.unwrap(), Value::Null);
    }

    #[tokio::test]
    async fn test_body_methods_serialize_payload() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/api/auth/profile/update/"))
            .and(body_json(json!({ "career_interests": ["Data Analyst"] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "updated": true })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/api/auth/profile/update/"))
            .and(body_json(json!({ "first_name": "Ada" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "updated": true })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        client
            .patch("/auth/profile/update/", &json!({ "career_interests": ["Data Analyst"] }))
            .await
            .unwrap();
        client
            .put("/auth/profile/update/", &json!({ "first_name": "Ada" }))
            .await
            .unwrap();
        server.verify().await;
    }

    #[tokio::test]
    async fn test_transport_failure_is_request_error() {
        let client = ApiClient::new("http://127.0.0.1:9/api", TokenStore::in_memory());
        let err = client.get("/jobs/").await.unwrap_err();
        assert!(matches!(err, ApiError::RequestError(_)));
    }
}
