//! OAuth token storage with pluggable backends.
//!
//! Supports:
//! - `memory`: In-memory storage (non-persistent, for testing)
//! - `sqlite`: SQLite database shared with whatever completes the OAuth handshake
//!
//! The proxy only ever reads the most recent token row for a
//! `(user, credential type)` pair.

mod memory;
mod sqlite;

pub use memory::InMemoryTokenStore;
pub use sqlite::SqliteTokenStore;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Acquisition method recorded on rows written by the OAuth flow.
pub const OAUTH_METHOD: &str = "oauth";

/// A stored OAuth token row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub user_id: String,
    pub credential_type: String,
    pub method: String,
    /// Named token fields (`access_token`, `refresh_token`, `expires_in`, ...)
    pub fields: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}

impl TokenRecord {
    /// A fresh `oauth` row stamped with the current time.
    pub fn oauth(
        user_id: impl Into<String>,
        credential_type: impl Into<String>,
        fields: Map<String, Value>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            credential_type: credential_type.into(),
            method: OAUTH_METHOD.to_string(),
            fields,
            created_at: Utc::now(),
        }
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    fn is_oauth_for(&self, user_id: &str, credential_type: &str) -> bool {
        self.method == OAUTH_METHOD
            && self.user_id == user_id
            && self.credential_type == credential_type
    }
}

#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("Failed to open token store: {0}")]
    Open(String),

    #[error("Token store query failed: {0}")]
    Query(#[from] rusqlite::Error),

    #[error("Corrupt token row {id}: {reason}")]
    Corrupt { id: i64, reason: String },

    #[error("Token store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Token store trait - implemented by all storage backends.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Whether this store persists data across restarts.
    fn is_persistent(&self) -> bool;

    /// Short backend name for health output and logs.
    fn backend_name(&self) -> &'static str;

    /// Most recent `oauth` token for the user and credential type, if any.
    async fn latest_oauth_token(
        &self,
        user_id: &str,
        credential_type: &str,
    ) -> Result<Option<TokenRecord>, TokenStoreError>;
}

/// Token store type selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenStoreType {
    Memory,
    #[default]
    Sqlite,
}

impl TokenStoreType {
    /// Parse from environment variable value.
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "memory" => Self::Memory,
            "sqlite" | "db" => Self::Sqlite,
            other => {
                tracing::warn!("Unknown TOKEN_STORE '{}', using sqlite", other);
                Self::default()
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Sqlite => "sqlite",
        }
    }
}

/// Create a token store based on type and configuration.
pub async fn create_token_store(
    store_type: TokenStoreType,
    db_path: &Path,
) -> Result<Arc<dyn TokenStore>, TokenStoreError> {
    match store_type {
        TokenStoreType::Memory => Ok(Arc::new(InMemoryTokenStore::new())),
        TokenStoreType::Sqlite => {
            let store = SqliteTokenStore::open(db_path.to_path_buf()).await?;
            Ok(Arc::new(store))
        }
    }
}
