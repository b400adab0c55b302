//! HTTP API.
//!
//! Routes are nested under `/api/` and share one [`ApiContext`]. Every
//! request passes through the access logger and a permissive CORS layer.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;
pub mod validation;

pub use router::api_router;
pub use server::{start_api_server, ApiServer, ApiSession};
pub use types::ApiContext;
