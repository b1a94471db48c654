//! API endpoints.

mod account;
mod chat;
mod profiles;

use axum::Router;

use crate::middleware::AppState;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/account", account::router())
        .nest("/profiles", profiles::router())
        .nest("/chat", chat::router())
}
