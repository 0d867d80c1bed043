//! In-memory token store (non-persistent).

use super::{TokenRecord, TokenStore, TokenStoreError};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone, Default)]
pub struct InMemoryTokenStore {
    records: Arc<RwLock<Vec<TokenRecord>>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, record: TokenRecord) {
        self.records.write().await.push(record);
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    fn is_persistent(&self) -> bool {
        false
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn latest_oauth_token(
        &self,
        user_id: &str,
        credential_type: &str,
    ) -> Result<Option<TokenRecord>, TokenStoreError> {
        // max_by_key keeps the last maximum, so equal timestamps favour the newer insert.
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.is_oauth_for(user_id, credential_type))
            .max_by_key(|r| r.created_at)
            .cloned())
    }
}
