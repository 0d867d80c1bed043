//! Builds the final n8n credential payload.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use thiserror::Error;

use super::{AcquisitionMethod, CredentialDescriptor, CredentialPayload, OAuthFieldMap};
use super::providers::ProviderSecrets;
use crate::token_store::{TokenRecord, TokenStore, TokenStoreError};

/// Reasons a payload could not be built. None of them are retried.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Missing required fields: {}", .missing.join(", "))]
    Validation { missing: Vec<String> },

    #[error("No OAuth token found for user '{user_id}' and credential type '{credential_type}'")]
    TokenNotFound {
        user_id: String,
        credential_type: String,
    },

    #[error("Token lookup timed out after {0:?}")]
    Timeout(Duration),

    #[error("Token store error: {0}")]
    TokenStore(#[from] TokenStoreError),
}

/// Turns caller descriptors into upstream payloads.
///
/// Holds the token store and the provider table; both are shared read-only
/// across requests.
#[derive(Clone)]
pub struct CredentialBuilder {
    tokens: Arc<dyn TokenStore>,
    secrets: ProviderSecrets,
    lookup_timeout: Duration,
}

impl CredentialBuilder {
    pub fn new(tokens: Arc<dyn TokenStore>, secrets: ProviderSecrets, lookup_timeout: Duration) -> Self {
        Self {
            tokens,
            secrets,
            lookup_timeout,
        }
    }

    /// Build the payload for `descriptor`.
    ///
    /// For `oauth`, the latest stored token of `user_id` for the descriptor's
    /// type is read once and mapped through `oauthFieldMap`. Provider defaults
    /// are applied afterwards for every method.
    pub async fn build(
        &self,
        descriptor: CredentialDescriptor,
        method: AcquisitionMethod,
        user_id: Option<&str>,
    ) -> Result<CredentialPayload, BuildError> {
        let user_id = user_id.map(str::trim).filter(|u| !u.is_empty());
        let credential_type = descriptor.credential_type.trim().to_string();

        let mut missing = Vec::new();
        if credential_type.is_empty() {
            missing.push("credential.type".to_string());
        }
        if method == AcquisitionMethod::OAuth && user_id.is_none() {
            missing.push("userId".to_string());
        }
        if !missing.is_empty() {
            return Err(BuildError::Validation { missing });
        }

        let CredentialDescriptor {
            name,
            mut data,
            oauth_field_map,
            ..
        } = descriptor;

        if let (AcquisitionMethod::OAuth, Some(user_id)) = (method, user_id) {
            let record = self.latest_token(user_id, &credential_type).await?;
            apply_token_fields(&mut data, &record, &oauth_field_map);
        }

        self.secrets.apply(&credential_type, &mut data);

        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| credential_type.clone());

        Ok(CredentialPayload {
            name,
            credential_type,
            data,
        })
    }

    async fn latest_token(&self, user_id: &str, credential_type: &str) -> Result<TokenRecord, BuildError> {
        let lookup = self.tokens.latest_oauth_token(user_id, credential_type);
        let record = tokio::time::timeout(self.lookup_timeout, lookup)
            .await
            .map_err(|_| BuildError::Timeout(self.lookup_timeout))??;

        record.ok_or_else(|| {
            tracing::info!(
                "No OAuth token for user {} and credential type {}",
                user_id,
                credential_type
            );
            BuildError::TokenNotFound {
                user_id: user_id.to_string(),
                credential_type: credential_type.to_string(),
            }
        })
    }
}

/// Copy mapped token fields into `data`, in map order.
///
/// A source column the record does not have leaves the target as it was.
fn apply_token_fields(data: &mut Map<String, Value>, record: &TokenRecord, field_map: &OAuthFieldMap) {
    for mapping in field_map.iter() {
        match record.field(&mapping.source) {
            Some(value) => {
                data.insert(mapping.target.clone(), value.clone());
            }
            None => tracing::warn!(
                "Token record for {} has no field '{}' (mapped to '{}')",
                record.credential_type,
                mapping.source,
                mapping.target
            ),
        }
    }
}
