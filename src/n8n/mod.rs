//! n8n public API client (credential endpoints only).
//!
//! Every call authenticates with the `X-N8N-API-KEY` header and returns the
//! upstream status and body untouched, so callers can relay them verbatim.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use thiserror::Error;

use crate::credentials::CredentialPayload;

/// Header carrying the n8n API key.
pub const API_KEY_HEADER: &str = "X-N8N-API-KEY";

const CREDENTIALS_PATH: &str = "/api/v1/credentials";

#[derive(Debug, Error)]
pub enum N8nError {
    #[error("Invalid n8n URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("API key contains characters not allowed in an HTTP header")]
    InvalidApiKey,

    #[error("n8n request timed out: {0}")]
    Timeout(reqwest::Error),

    #[error(transparent)]
    Transport(reqwest::Error),
}

impl From<reqwest::Error> for N8nError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            N8nError::Timeout(e)
        } else {
            N8nError::Transport(e)
        }
    }
}

/// Status, content type and raw body of an n8n response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Build the shared HTTP client used for every n8n call.
pub fn build_http_client(timeout: Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("n8n-cred-proxy/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Strip trailing slashes and check the URL is an absolute http(s) URL that
/// API paths can be appended to (no query or fragment).
pub fn normalize_base_url(raw: &str) -> Result<String, N8nError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let invalid = |reason: String| N8nError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };

    let parsed = url::Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
    }
    if parsed.host_str().is_none() {
        return Err(invalid("missing host".to_string()));
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(invalid("query strings and fragments are not allowed".to_string()));
    }
    Ok(trimmed.to_string())
}

/// Client for one n8n instance and API key.
#[derive(Clone)]
pub struct N8nClient {
    base_url: String,
    api_key: HeaderValue,
    http: reqwest::Client,
}

impl N8nClient {
    pub fn new(http: reqwest::Client, base_url: &str, api_key: &str) -> Result<Self, N8nError> {
        let base_url = normalize_base_url(base_url)?;
        let mut api_key = HeaderValue::from_str(api_key).map_err(|_| N8nError::InvalidApiKey)?;
        api_key.set_sensitive(true);
        Ok(Self {
            base_url,
            api_key,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `POST /api/v1/credentials`
    pub async fn create_credential(
        &self,
        payload: &CredentialPayload,
    ) -> Result<UpstreamResponse, N8nError> {
        let url = format!("{}{}", self.base_url, CREDENTIALS_PATH);
        self.send(self.http.post(&url).json(payload)).await
    }

    /// `DELETE /api/v1/credentials/{id}`
    pub async fn delete_credential(&self, id: &str) -> Result<UpstreamResponse, N8nError> {
        let url = format!(
            "{}{}/{}",
            self.base_url,
            CREDENTIALS_PATH,
            urlencoding::encode(id)
        );
        self.send(self.http.delete(&url)).await
    }

    /// `GET /api/v1/credentials/schema/{type}`
    pub async fn credential_schema(
        &self,
        credential_type: &str,
    ) -> Result<UpstreamResponse, N8nError> {
        let url = format!(
            "{}{}/schema/{}",
            self.base_url,
            CREDENTIALS_PATH,
            urlencoding::encode(credential_type)
        );
        self.send(self.http.get(&url)).await
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<UpstreamResponse, N8nError> {
        let resp = request
            .header(API_KEY_HEADER, self.api_key.clone())
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        let status = resp.status();
        let content_type = resp.headers().get(CONTENT_TYPE).cloned();
        let body = resp.bytes().await?;

        tracing::debug!("n8n {} responded {}", self.base_url, status);

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }
}
