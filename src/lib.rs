//! # n8n Credential Proxy
//!
//! Forwards credential-management requests to an n8n instance's public API.
//!
//! This library provides:
//! - HTTP endpoints that create, delete and describe n8n credentials
//! - OAuth token injection from a token store for `oauth` credentials
//! - Default provider client secrets (e.g. Google) for fields left empty
//!
//! ## Architecture
//!
//! ```text
//!   caller ──► api ──► credentials::CredentialBuilder ──► n8n::N8nClient ──► n8n
//!                             │                                  │
//!                             ▼                                  ▼
//!                   token_store::TokenStore           status + body relayed
//! ```
//!
//! ## Request Flow
//! 1. Validate the request body (all missing fields are reported together)
//! 2. For `oauth`, read the latest stored token and map its fields into `data`
//! 3. Fill absent provider secrets from configuration
//! 4. Call n8n once and relay its answer verbatim
//!
//! ## Modules
//! - `credentials`: descriptors, provider defaults and the payload builder
//! - `token_store`: OAuth token storage (memory / SQLite)
//! - `n8n`: n8n public API client

pub mod api;
pub mod config;
pub mod credentials;
pub mod n8n;
pub mod token_store;

pub use config::Config;
pub use credentials::{AcquisitionMethod, CredentialBuilder, CredentialDescriptor, CredentialPayload};
pub use token_store::{TokenRecord, TokenStore};
