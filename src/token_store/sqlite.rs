//! SQLite-backed token store.

use super::{TokenRecord, TokenStore, TokenStoreError, OAUTH_METHOD};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

const SCHEMA: &str = r#"
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS oauth_tokens (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    credential_type TEXT NOT NULL,
    method TEXT NOT NULL DEFAULT 'oauth',
    token_data TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_oauth_tokens_lookup
    ON oauth_tokens(user_id, credential_type, method);
"#;

// Rows may be written by other processes with any RFC3339 offset or
// precision, so recency is compared as an instant via julianday() rather
// than as text. julianday() resolves to milliseconds; the row id breaks ties.

/// Raw row as read from SQLite, decoded outside the rusqlite closure.
struct TokenRow {
    id: i64,
    user_id: String,
    credential_type: String,
    method: String,
    token_data: String,
    created_at: String,
}

pub struct SqliteTokenStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTokenStore {
    pub async fn open(db_path: PathBuf) -> Result<Self, TokenStoreError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                TokenStoreError::Open(format!("Failed to create token store dir: {}", e))
            })?;
        }

        let conn = tokio::task::spawn_blocking(move || {
            let conn = Connection::open(&db_path)?;
            conn.execute_batch(SCHEMA)?;
            tracing::info!("Token store opened at {}", db_path.display());
            Ok::<_, rusqlite::Error>(conn)
        })
        .await??;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Insert a token row. Returns its row id.
    pub async fn insert(&self, record: &TokenRecord) -> Result<i64, TokenStoreError> {
        let conn = self.conn.clone();
        let token_data = Value::Object(record.fields.clone()).to_string();
        let created_at = record.created_at.to_rfc3339_opts(SecondsFormat::Micros, true);
        let user_id = record.user_id.clone();
        let credential_type = record.credential_type.clone();
        let method = record.method.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.execute(
                "INSERT INTO oauth_tokens (user_id, credential_type, method, token_data, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![user_id, credential_type, method, token_data, created_at],
            )?;
            Ok::<_, TokenStoreError>(conn.last_insert_rowid())
        })
        .await?
    }
}

fn decode_row(row: TokenRow) -> Result<TokenRecord, TokenStoreError> {
    let fields = match serde_json::from_str::<Value>(&row.token_data) {
        Ok(Value::Object(map)) => map,
        Ok(_) => {
            return Err(TokenStoreError::Corrupt {
                id: row.id,
                reason: "token_data is not a JSON object".to_string(),
            })
        }
        Err(e) => {
            return Err(TokenStoreError::Corrupt {
                id: row.id,
                reason: format!("token_data is not valid JSON: {}", e),
            })
        }
    };

    let created_at = DateTime::parse_from_rfc3339(&row.created_at)
        .map_err(|e| TokenStoreError::Corrupt {
            id: row.id,
            reason: format!("created_at '{}' is not RFC3339: {}", row.created_at, e),
        })?
        .with_timezone(&Utc);

    Ok(TokenRecord {
        user_id: row.user_id,
        credential_type: row.credential_type,
        method: row.method,
        fields,
        created_at,
    })
}

#[async_trait]
impl TokenStore for SqliteTokenStore {
    fn is_persistent(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn latest_oauth_token(
        &self,
        user_id: &str,
        credential_type: &str,
    ) -> Result<Option<TokenRecord>, TokenStoreError> {
        let conn = self.conn.clone();
        let user_id = user_id.to_string();
        let credential_type = credential_type.to_string();

        let row = tokio::task::spawn_blocking(move || {
            let conn = conn.blocking_lock();
            conn.query_row(
                "SELECT id, user_id, credential_type, method, token_data, created_at
                 FROM oauth_tokens
                 WHERE user_id = ?1 AND credential_type = ?2 AND method = ?3
                 ORDER BY julianday(created_at) DESC, id DESC
                 LIMIT 1",
                params![user_id, credential_type, OAUTH_METHOD],
                |row| {
                    Ok(TokenRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        credential_type: row.get(2)?,
                        method: row.get(3)?,
                        token_data: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                },
            )
            .optional()
        })
        .await??;

        row.map(decode_row).transpose()
    }
}
