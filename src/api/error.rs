//! Error responses produced by the proxy itself.
//!
//! Upstream non-2xx answers are not errors here; they are relayed as-is by
//! the handlers.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use super::types::ErrorResponse;
use crate::credentials::BuildError;
use crate::n8n::N8nError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Upstream(#[from] N8nError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::InvalidBody(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFields(_) | ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Build(e) => match e {
                BuildError::Validation { .. } => StatusCode::BAD_REQUEST,
                BuildError::TokenNotFound { .. } => StatusCode::NOT_FOUND,
                BuildError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                BuildError::TokenStore(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Upstream(e) => match e {
                N8nError::InvalidBaseUrl { .. } | N8nError::InvalidApiKey => StatusCode::BAD_REQUEST,
                N8nError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
                N8nError::Transport(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }

    fn missing_fields(&self) -> Option<Vec<String>> {
        match self {
            ApiError::MissingFields(missing)
            | ApiError::Build(BuildError::Validation { missing }) => Some(missing.clone()),
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed ({}): {}", status, self);
        } else {
            tracing::warn!("Request rejected ({}): {}", status, self);
        }

        let body = ErrorResponse {
            error: self.to_string(),
            missing: self.missing_fields(),
        };
        (status, Json(body)).into_response()
    }
}
