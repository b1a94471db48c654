//! API middleware.

#![allow(missing_docs)]

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use mentorconnect_core::{AccountService, ChatService, ProfileService, RegistrationService};

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub registration_service: RegistrationService,
    pub profile_service: ProfileService,
    pub account_service: AccountService,
    pub chat_service: ChatService,
}

/// Authentication middleware.
///
/// Resolves `Authorization: Bearer <token>` to an account and stores it in
/// the request extensions. Requests without a valid token pass through
/// anonymously.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get(header::AUTHORIZATION)
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        match state.registration_service.authenticate(token.trim()).await {
            Ok(Some(user)) => {
                req.extensions_mut().insert(user);
            }
            Ok(None) => tracing::debug!("Unknown bearer token"),
            Err(e) => tracing::warn!(error = %e, "Token lookup failed"),
        }
    }

    next.run(req).await
}
