//! Request extractors.

use axum::{
    extract::{FromRequestParts, multipart::Field},
    http::request::Parts,
};
use mentorconnect_common::{AppError, AppResult, FileUpload};
use mentorconnect_db::entities::user;

/// Authenticated user extractor.
#[derive(Debug, Clone)]
pub struct AuthUser(pub user::Model);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Set by the auth middleware
        parts
            .extensions
            .get::<user::Model>()
            .cloned()
            .map(AuthUser)
            .ok_or(AppError::Unauthorized)
    }
}

/// Read a multipart file field. Empty parts (no file chosen) yield `None`.
pub async fn file_field(field: Field<'_>) -> AppResult<Option<FileUpload>> {
    let file_name = field.file_name().map(ToString::to_string);
    let content_type = field
        .content_type()
        .unwrap_or("application/octet-stream")
        .to_string();
    let data = field
        .bytes()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    match file_name {
        Some(file_name) if !file_name.is_empty() && !data.is_empty() => Ok(Some(FileUpload {
            file_name,
            content_type,
            data: data.to_vec(),
        })),
        _ => Ok(None),
    }
}

/// Read a multipart text field.
pub async fn text_field(field: Field<'_>) -> AppResult<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))
}
