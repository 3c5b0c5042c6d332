//! MDT HTTP API.
//!
//! Exposes diagnosis, identity and administration endpoints under
//! `/api/`. Everything except `/api/health` goes through the bearer-token
//! middleware, which resolves the caller's effective identity.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::mdt_api_router;
pub use server::{start_api_server, ApiServer};
pub use types::ApiContext;
