//! Credential proxy endpoints.
//!
//! Each handler validates its body, talks to n8n once, and relays whatever
//! n8n answered: status, content type and body bytes.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};

use super::error::ApiError;
use super::routes::AppState;
use super::types::{CreateCredentialRequest, CredentialSchemaRequest, DeleteCredentialRequest};
use crate::n8n::{N8nClient, UpstreamResponse};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/create", post(create_credential))
        .route("/delete", post(delete_credential))
        .route("/schema", post(credential_schema))
}

impl IntoResponse for UpstreamResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        if let Some(content_type) = self.content_type {
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, content_type);
        }
        response
    }
}

fn relay(operation: &str, upstream: UpstreamResponse) -> Response {
    if upstream.is_success() {
        tracing::info!("n8n {} succeeded ({})", operation, upstream.status);
    } else {
        tracing::warn!("n8n {} failed ({}); relaying response", operation, upstream.status);
    }
    upstream.into_response()
}

/// POST /proxy/credentials/create
async fn create_credential(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateCredentialRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload?;
    let req = req.validate().map_err(ApiError::MissingFields)?;

    // Reject a bad URL or key before touching the token store.
    let client = N8nClient::new(state.http.clone(), &req.n8n_url, &req.api_key)?;

    tracing::info!(
        "Creating {} credential via {} method for {}",
        req.credential.credential_type,
        req.method,
        client.base_url()
    );

    let payload = state
        .builder
        .build(req.credential, req.method, Some(req.user_id.as_str()))
        .await?;

    let upstream = client.create_credential(&payload).await?;
    Ok(relay("create credential", upstream))
}

/// POST /proxy/credentials/delete
async fn delete_credential(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DeleteCredentialRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload?;
    let (n8n_url, api_key, credential_id) = req.validate().map_err(ApiError::MissingFields)?;

    let client = N8nClient::new(state.http.clone(), &n8n_url, &api_key)?;
    tracing::info!("Deleting credential {} on {}", credential_id, client.base_url());

    let upstream = client.delete_credential(&credential_id).await?;
    Ok(relay("delete credential", upstream))
}

/// POST /proxy/credentials/schema
async fn credential_schema(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CredentialSchemaRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(req) = payload?;
    let (n8n_url, api_key, credential_type) = req.validate().map_err(ApiError::MissingFields)?;

    let client = N8nClient::new(state.http.clone(), &n8n_url, &api_key)?;
    let upstream = client.credential_schema(&credential_type).await?;
    Ok(relay("credential schema", upstream))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::routes::router;
    use crate::api::types::ErrorResponse;
    use crate::config::{Config, TokenStoreConfig};
    use crate::credentials::{ProviderDefaults, ProviderSecrets};
    use crate::token_store::{InMemoryTokenStore, TokenRecord};
    use serde_json::{json, Value};
    use std::time::Duration;
    use wiremock::matchers::{any, body_json, header as header_matcher, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn spawn_app(tokens: Arc<InMemoryTokenStore>) -> String {
        spawn_app_with_timeout(tokens, Duration::from_secs(30)).await
    }

    async fn spawn_app_with_timeout(tokens: Arc<InMemoryTokenStore>, upstream_timeout: Duration) -> String {
        let secrets = ProviderSecrets::default().with_provider(
            ProviderDefaults::new("google").fill("clientSecret", "xyz"),
        );
        let mut config = Config::new(TokenStoreConfig::default(), secrets);
        config.upstream_timeout = upstream_timeout;
        let state = AppState::new(config, tokens).unwrap();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(Arc::new(state))).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn post(url: String, body: Value) -> reqwest::Response {
        reqwest::Client::new().post(url).json(&body).send().await.unwrap()
    }

    #[tokio::test]
    async fn manual_create_relays_upstream_success() {
        let n8n = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/credentials"))
            .and(header_matcher("X-N8N-API-KEY", "n8n-key"))
            .and(body_json(json!({
                "name": "Sheets",
                "type": "googleSheetsOAuth2Api",
                "data": {"clientId": "abc", "clientSecret": "xyz"}
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"id": "7", "name": "Sheets"})),
            )
            .expect(1)
            .mount(&n8n)
            .await;

        let app = spawn_app(Arc::new(InMemoryTokenStore::new())).await;
        let resp = post(
            format!("{}/proxy/credentials/create", app),
            json!({
                "n8nUrl": format!("{}/", n8n.uri()),
                "apiKey": "n8n-key",
                "credential": {"name": "Sheets", "type": "googleSheetsOAuth2Api", "data": {"clientId": "abc"}},
                "method": "manual",
                "userId": "u-1"
            }),
        )
        .await;

        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert_eq!(
            resp.json::<Value>().await.unwrap(),
            json!({"id": "7", "name": "Sheets"})
        );
    }

    #[tokio::test]
    async fn oauth_create_injects_token() {
        let n8n = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/credentials"))
            .and(body_json(json!({
                "name": "slackOAuth2Api",
                "type": "slackOAuth2Api",
                "data": {"accessToken": "T1"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "8"})))
            .expect(1)
            .mount(&n8n)
            .await;

        let tokens = Arc::new(InMemoryTokenStore::new());
        let mut fields = serde_json::Map::new();
        fields.insert("access_token".to_string(), json!("T1"));
        tokens
            .insert(TokenRecord::oauth("u-1", "slackOAuth2Api", fields))
            .await;

        let app = spawn_app(tokens).await;
        let resp = post(
            format!("{}/proxy/credentials/create", app),
            json!({
                "n8nUrl": n8n.uri(),
                "apiKey": "k",
                "credential": {"type": "slackOAuth2Api", "data": {}, "oauthFieldMap": {"accessToken": "access_token"}},
                "method": "oauth",
                "userId": "u-1"
            }),
        )
        .await;

        assert_eq!(resp.status(), reqwest::StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_token_is_404_without_upstream_call() {
        let n8n = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&n8n)
            .await;

        let app = spawn_app(Arc::new(InMemoryTokenStore::new())).await;
        let resp = post(
            format!("{}/proxy/credentials/create", app),
            json!({
                "n8nUrl": n8n.uri(),
                "apiKey": "k",
                "credential": {"type": "googleOAuth2Api", "data": {}},
                "method": "oauth",
                "userId": "ghost"
            }),
        )
        .await;

        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
        let body: ErrorResponse = resp.json().await.unwrap();
        assert!(body.error.contains("ghost"));
        assert!(body.missing.is_none());
    }

    #[tokio::test]
    async fn missing_fields_are_listed() {
        let app = spawn_app(Arc::new(InMemoryTokenStore::new())).await;
        let resp = post(
            format!("{}/proxy/credentials/create", app),
            json!({"n8nUrl": "https://n8n.example.com", "method": "manual"}),
        )
        .await;

        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: ErrorResponse = resp.json().await.unwrap();
        assert_eq!(
            body.missing.unwrap(),
            vec!["apiKey", "credential", "userId"]
        );
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let app = spawn_app(Arc::new(InMemoryTokenStore::new())).await;
        let resp = reqwest::Client::new()
            .post(format!("{}/proxy/credentials/create", app))
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
        let body: ErrorResponse = resp.json().await.unwrap();
        assert!(body.error.starts_with("Invalid request body"));
    }

    #[tokio::test]
    async fn invalid_n8n_url_is_bad_request() {
        let app = spawn_app(Arc::new(InMemoryTokenStore::new())).await;
        let resp = post(
            format!("{}/proxy/credentials/create", app),
            json!({
                "n8nUrl": "not a url",
                "apiKey": "k",
                "credential": {"type": "githubApi", "data": {}},
                "method": "manual",
                "userId": "u"
            }),
        )
        .await;
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn upstream_error_is_relayed_verbatim() {
        let n8n = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/credentials"))
            .respond_with(
                ResponseTemplate::new(422).set_body_json(json!({"error": "duplicate name"})),
            )
            .mount(&n8n)
            .await;

        let app = spawn_app(Arc::new(InMemoryTokenStore::new())).await;
        let resp = post(
            format!("{}/proxy/credentials/create", app),
            json!({
                "n8nUrl": n8n.uri(),
                "apiKey": "k",
                "credential": {"type": "githubApi", "data": {"accessToken": "t"}},
                "method": "manual",
                "userId": "u"
            }),
        )
        .await;

        assert_eq!(resp.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            resp.json::<Value>().await.unwrap(),
            json!({"error": "duplicate name"})
        );
    }

    #[tokio::test]
    async fn delete_and_schema_are_proxied() {
        let n8n = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/v1/credentials/12"))
            .and(header_matcher("X-N8N-API-KEY", "k"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "12"})))
            .expect(1)
            .mount(&n8n)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/v1/credentials/schema/githubApi"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"required": ["accessToken"]})),
            )
            .expect(1)
            .mount(&n8n)
            .await;

        let app = spawn_app(Arc::new(InMemoryTokenStore::new())).await;

        let deleted = post(
            format!("{}/proxy/credentials/delete", app),
            json!({"n8nUrl": n8n.uri(), "apiKey": "k", "credentialId": "12"}),
        )
        .await;
        assert_eq!(deleted.status(), reqwest::StatusCode::OK);
        assert_eq!(deleted.json::<Value>().await.unwrap(), json!({"id": "12"}));

        let schema = post(
            format!("{}/proxy/credentials/schema", app),
            json!({"n8nUrl": n8n.uri(), "apiKey": "k", "credentialType": "githubApi"}),
        )
        .await;
        assert_eq!(schema.status(), reqwest::StatusCode::OK);
        assert_eq!(
            schema.json::<Value>().await.unwrap(),
            json!({"required": ["accessToken"]})
        );
    }

    #[tokio::test]
    async fn unreachable_n8n_is_server_error_with_message() {
        // Bind then drop a listener to get a port with nothing behind it.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let dead = listener.local_addr().unwrap();
        drop(listener);

        let app = spawn_app(Arc::new(InMemoryTokenStore::new())).await;
        let resp = post(
            format!("{}/proxy/credentials/create", app),
            json!({
                "n8nUrl": format!("http://{}", dead),
                "apiKey": "k",
                "credential": {"type": "githubApi", "data": {"accessToken": "t"}},
                "method": "manual",
                "userId": "u"
            }),
        )
        .await;

        assert_eq!(resp.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        let body: ErrorResponse = resp.json().await.unwrap();
        assert!(body.error.contains(&dead.port().to_string()));
        assert!(body.missing.is_none());
    }

    #[tokio::test]
    async fn slow_n8n_is_gateway_timeout() {
        let n8n = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&n8n)
            .await;

        let app = spawn_app_with_timeout(Arc::new(InMemoryTokenStore::new()), Duration::from_millis(100)).await;
        let resp = post(
            format!("{}/proxy/credentials/schema", app),
            json!({"n8nUrl": n8n.uri(), "apiKey": "k", "credentialType": "githubApi"}),
        )
        .await;

        assert_eq!(resp.status(), reqwest::StatusCode::GATEWAY_TIMEOUT);
        let body: ErrorResponse = resp.json().await.unwrap();
        assert!(body.error.contains("timed out"));
    }

    #[tokio::test]
    async fn n8n_url_with_query_is_rejected_before_upstream() {
        let n8n = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&n8n)
            .await;

        let app = spawn_app(Arc::new(InMemoryTokenStore::new())).await;
        let resp = post(
            format!("{}/proxy/credentials/delete", app),
            json!({"n8nUrl": format!("{}/?x=1", n8n.uri()), "apiKey": "k", "credentialId": "1"}),
        )
        .await;
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    }
}
