//! Credential descriptors and the request builder that turns them into the
//! payload n8n expects.
//!
//! A caller describes a credential (`type`, `data`, optional `oauthFieldMap`)
//! and how its secrets are acquired:
//!
//! - `manual`: `data` is used as given.
//! - `oauth`: fields listed in `oauthFieldMap` are copied from the latest
//!   stored OAuth token of the user.
//!
//! In both cases provider defaults (e.g. Google client id/secret) fill in
//! fields the caller left empty.

mod builder;
mod providers;

pub use builder::{BuildError, CredentialBuilder};
pub use providers::{ProviderDefaults, ProviderSecrets};

use std::fmt;

use serde::de::{self, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// How the secret fields of a credential are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcquisitionMethod {
    /// The caller supplies every field in `data`
    Manual,
    /// Fields are sourced from a completed OAuth handshake in the token store
    OAuth,
}

impl AcquisitionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcquisitionMethod::Manual => "manual",
            AcquisitionMethod::OAuth => "oauth",
        }
    }
}

impl fmt::Display for AcquisitionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A credential as submitted by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialDescriptor {
    /// Display name in n8n (falls back to the credential type)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// n8n credential type, e.g. `googleSheetsOAuth2Api`
    #[serde(rename = "type", default)]
    pub credential_type: String,

    /// Fields the credential type expects
    #[serde(default)]
    pub data: Map<String, Value>,

    /// `credential field -> token field` pairs, applied in order
    #[serde(default, skip_serializing_if = "OAuthFieldMap::is_empty")]
    pub oauth_field_map: OAuthFieldMap,
}

/// One `target <- source` copy from a token record into credential data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    /// Field in the credential `data`
    pub target: String,
    /// Column of the stored token record
    pub source: String,
}

/// Ordered list of field mappings.
///
/// On the wire this is a JSON object; key order is preserved so later entries
/// override earlier ones that share a target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OAuthFieldMap(Vec<FieldMapping>);

impl OAuthFieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a mapping, builder style.
    pub fn map(mut self, target: impl Into<String>, source: impl Into<String>) -> Self {
        self.0.push(FieldMapping {
            target: target.into(),
            source: source.into(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldMapping> {
        self.0.iter()
    }
}

impl Serialize for OAuthFieldMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for mapping in &self.0 {
            map.serialize_entry(&mapping.target, &mapping.source)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for OAuthFieldMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldMapVisitor;

        impl<'de> Visitor<'de> for FieldMapVisitor {
            type Value = OAuthFieldMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object mapping credential fields to token fields")
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(OAuthFieldMap::default())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut pairs = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((target, source)) = access.next_entry::<String, String>()? {
                    pairs.push(FieldMapping { target, source });
                }
                Ok(OAuthFieldMap(pairs))
            }
        }

        deserializer.deserialize_any(FieldMapVisitor)
    }
}

/// The body sent to `POST /api/v1/credentials`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CredentialPayload {
    pub name: String,
    #[serde(rename = "type")]
    pub credential_type: String,
    pub data: Map<String, Value>,
}
