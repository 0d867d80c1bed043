//! API request and response types.

use serde::{Deserialize, Serialize};

use crate::credentials::{AcquisitionMethod, CredentialDescriptor};

/// Request to create a credential in n8n.
///
/// Every field is optional at the JSON level so that missing fields can be
/// reported together instead of failing on the first one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCredentialRequest {
    /// Base URL of the n8n instance
    pub n8n_url: Option<String>,

    /// n8n public API key
    pub api_key: Option<String>,

    /// Credential to create
    pub credential: Option<CredentialDescriptor>,

    /// How secret fields are acquired
    pub method: Option<AcquisitionMethod>,

    /// Owner of the stored OAuth token
    pub user_id: Option<String>,
}

/// A create request with every required field present.
#[derive(Debug, Clone)]
pub struct ValidCreateRequest {
    pub n8n_url: String,
    pub api_key: String,
    pub credential: CredentialDescriptor,
    pub method: AcquisitionMethod,
    pub user_id: String,
}

impl CreateCredentialRequest {
    pub fn validate(self) -> Result<ValidCreateRequest, Vec<String>> {
        let mut missing = Vec::new();
        let n8n_url = present(self.n8n_url, "n8nUrl", &mut missing);
        let api_key = present(self.api_key, "apiKey", &mut missing);
        if self.credential.is_none() {
            missing.push("credential".to_string());
        }
        if self.method.is_none() {
            missing.push("method".to_string());
        }
        let user_id = present(self.user_id, "userId", &mut missing);

        match (n8n_url, api_key, self.credential, self.method, user_id) {
            (Some(n8n_url), Some(api_key), Some(credential), Some(method), Some(user_id)) => {
                Ok(ValidCreateRequest {
                    n8n_url,
                    api_key,
                    credential,
                    method,
                    user_id,
                })
            }
            _ => Err(missing),
        }
    }
}

/// Request to delete a credential in n8n.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteCredentialRequest {
    pub n8n_url: Option<String>,
    pub api_key: Option<String>,
    pub credential_id: Option<String>,
}

impl DeleteCredentialRequest {
    /// Returns `(n8n_url, api_key, credential_id)`.
    pub fn validate(self) -> Result<(String, String, String), Vec<String>> {
        let mut missing = Vec::new();
        let n8n_url = present(self.n8n_url, "n8nUrl", &mut missing);
        let api_key = present(self.api_key, "apiKey", &mut missing);
        let credential_id = present(self.credential_id, "credentialId", &mut missing);
        match (n8n_url, api_key, credential_id) {
            (Some(url), Some(key), Some(id)) => Ok((url, key, id)),
            _ => Err(missing),
        }
    }
}

/// Request for the data schema of a credential type.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSchemaRequest {
    pub n8n_url: Option<String>,
    pub api_key: Option<String>,
    pub credential_type: Option<String>,
}

impl CredentialSchemaRequest {
    /// Returns `(n8n_url, api_key, credential_type)`.
    pub fn validate(self) -> Result<(String, String, String), Vec<String>> {
        let mut missing = Vec::new();
        let n8n_url = present(self.n8n_url, "n8nUrl", &mut missing);
        let api_key = present(self.api_key, "apiKey", &mut missing);
        let credential_type = present(self.credential_type, "credentialType", &mut missing);
        match (n8n_url, api_key, credential_type) {
            (Some(url), Some(key), Some(ty)) => Ok((url, key, ty)),
            _ => Err(missing),
        }
    }
}

/// Blank strings count as missing.
fn present(value: Option<String>, name: &str, missing: &mut Vec<String>) -> Option<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Some(v.trim().to_string()),
        _ => {
            missing.push(name.to_string());
            None
        }
    }
}

/// Error body returned by the proxy itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,

    /// Request fields that were absent or blank
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing: Option<Vec<String>>,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,

    /// Token store backend ("memory" or "sqlite")
    pub token_store: String,

    /// Whether stored tokens survive a restart
    pub persistent: bool,
}
