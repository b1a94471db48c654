//! API response types.

use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

/// Standard API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a success response.
    pub const fn ok(data: T) -> Self {
        Self { data }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Pages a form flow can send the client to next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamedRoute {
    Home,
    Profile,
    ProfileSettings,
    ProfileOnboarding,
}

impl NamedRoute {
    /// Path of the page.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Profile => "/profile",
            Self::ProfileSettings => "/profile/settings",
            Self::ProfileOnboarding => "/profile/onboarding",
        }
    }
}

/// Result of a successful form post: where to go next, a flash message and
/// optionally the changed resource.
#[derive(Debug, Serialize)]
pub struct FormSuccess<T: Serialize> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub redirect: NamedRoute,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> FormSuccess<T> {
    pub fn new(redirect: NamedRoute, data: Option<T>, message: Option<&str>) -> Self {
        Self {
            data,
            redirect,
            message: message.map(ToString::to_string),
        }
    }
}

impl<T: Serialize> IntoResponse for FormSuccess<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// `303 See Other` to a named page, with a JSON body for API clients.
#[derive(Debug)]
pub struct SeeOther<T: Serialize> {
    pub route: NamedRoute,
    pub body: T,
}

impl<T: Serialize> IntoResponse for SeeOther<T> {
    fn into_response(self) -> Response {
        (
            StatusCode::SEE_OTHER,
            [(header::LOCATION, self.route.path())],
            Json(ApiResponse::ok(self.body)),
        )
            .into_response()
    }
}

/// Empty success response.
#[must_use]
pub fn ok() -> impl IntoResponse {
    StatusCode::NO_CONTENT
}
