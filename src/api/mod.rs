//! HTTP API for the credential proxy.
//!
//! ## Endpoints
//!
//! - `GET /` - Liveness banner
//! - `GET /api/health` - Health check
//! - `POST /proxy/credentials/create` - Build a credential payload and create it in n8n
//! - `POST /proxy/credentials/delete` - Delete a credential in n8n
//! - `POST /proxy/credentials/schema` - Fetch the data schema of a credential type

mod credentials;
pub mod error;
mod routes;
pub mod types;

pub use error::ApiError;
pub use routes::{router, serve, AppState};
pub use types::*;
