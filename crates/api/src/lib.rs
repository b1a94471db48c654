//! HTTP API layer for mentorconnect.
//!
//! - **Endpoints**: account, profiles and group chat under `/api`
//! - **Extractors**: authenticated user, multipart fields
//! - **Middleware**: bearer-token authentication
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;

pub use endpoints::router;
pub use middleware::{AppState, auth_middleware};
