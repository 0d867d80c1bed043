//! Default OAuth client secrets per provider family.
//!
//! A provider row is selected when its marker appears, case-insensitively,
//! anywhere in the credential type (`googleSheetsOAuth2Api` contains
//! `google`). Its fills only ever populate fields the caller left empty.

use std::fmt;

use serde_json::{Map, Value};

/// Providers known to the proxy: marker and `(credential field, env var)` fills.
const KNOWN_PROVIDERS: &[(&str, &[(&str, &str)])] = &[(
    "google",
    &[
        ("clientId", "GOOGLE_CLIENT_ID"),
        ("clientSecret", "GOOGLE_CLIENT_SECRET"),
    ],
)];

/// Default field values for one provider family.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderDefaults {
    marker: String,
    fills: Vec<(String, String)>,
}

impl ProviderDefaults {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into().to_lowercase(),
            fills: Vec::new(),
        }
    }

    /// Add a default value for `field`.
    pub fn fill(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.fills.push((field.into(), value.into()));
        self
    }

    pub fn matches(&self, credential_type: &str) -> bool {
        !self.marker.is_empty() && credential_type.to_lowercase().contains(&self.marker)
    }

    /// Fill absent fields of `data`. Returns the names of the fields filled.
    fn apply(&self, data: &mut Map<String, Value>) -> Vec<&str> {
        let mut filled = Vec::new();
        for (field, value) in &self.fills {
            if is_absent(data.get(field)) {
                data.insert(field.clone(), Value::String(value.clone()));
                filled.push(field.as_str());
            }
        }
        filled
    }
}

impl fmt::Debug for ProviderDefaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.fills.iter().map(|(field, _)| field.as_str()).collect();
        f.debug_struct("ProviderDefaults")
            .field("marker", &self.marker)
            .field("fields", &fields)
            .finish()
    }
}

/// Immutable provider table, loaded once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderSecrets {
    providers: Vec<ProviderDefaults>,
}

impl ProviderSecrets {
    /// Build the table of known providers, resolving each fill through
    /// `lookup` (normally the process environment). Unset or blank values are
    /// skipped, and providers left without fills are dropped.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut secrets = Self::default();
        for (marker, fills) in KNOWN_PROVIDERS {
            let mut provider = ProviderDefaults::new(*marker);
            for (field, var) in fills.iter() {
                match lookup(*var) {
                    Some(value) if !value.trim().is_empty() => {
                        provider = provider.fill(*field, value.trim());
                    }
                    _ => tracing::debug!("{} not set; no default for {} {}", var, marker, field),
                }
            }
            if !provider.fills.is_empty() {
                secrets = secrets.with_provider(provider);
            }
        }
        secrets
    }

    pub fn with_provider(mut self, provider: ProviderDefaults) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn providers(&self) -> &[ProviderDefaults] {
        &self.providers
    }

    /// Fill absent fields of `data` from every provider matching
    /// `credential_type`. Returns how many fields were filled.
    pub fn apply(&self, credential_type: &str, data: &mut Map<String, Value>) -> usize {
        let mut count = 0;
        for provider in self.providers.iter().filter(|p| p.matches(credential_type)) {
            let filled = provider.apply(data);
            if !filled.is_empty() {
                tracing::debug!(
                    "Filled {:?} for {} from {} defaults",
                    filled,
                    credential_type,
                    provider.marker
                );
            }
            count += filled.len();
        }
        count
    }
}

/// Missing, `null` and `""` all count as "not supplied".
fn is_absent(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}
