//! Profile endpoints.

use axum::{
    Router,
    extract::{Multipart, Path, Query, State},
    routing::get,
};
use mentorconnect_common::{AppError, AppResult, FileUpload};
use mentorconnect_core::{EditProfileInput, ProfileView};
use mentorconnect_db::entities::profile::WorkingStatus;
use serde::Deserialize;

use crate::{
    extractors::{AuthUser, file_field, text_field},
    middleware::AppState,
    response::{ApiResponse, FormSuccess, NamedRoute},
};

const DEFAULT_PAGE_SIZE: u64 = 20;
const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Deserialize)]
struct PageQuery {
    limit: Option<u64>,
    offset: Option<u64>,
}

async fn list_mentors(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> AppResult<ApiResponse<Vec<ProfileView>>> {
    let limit = query.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let mentors = state
        .profile_service
        .list_mentors(limit, query.offset.unwrap_or(0))
        .await?;
    Ok(ApiResponse::ok(mentors))
}

async fn my_profile(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<ProfileView>> {
    let profile = state.profile_service.get_or_create(&user).await?;
    Ok(ApiResponse::ok(profile))
}

async fn show_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<ApiResponse<ProfileView>> {
    let profile = state.profile_service.by_username(&username).await?;
    Ok(ApiResponse::ok(profile))
}

fn parse_working_status(text: &str) -> AppResult<Option<WorkingStatus>> {
    if text.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_value(serde_json::Value::String(text.trim().to_ascii_uppercase()))
        .map(Some)
        .map_err(|_| {
            AppError::field(
                "working_status",
                "invalid_choice",
                format!("Select a valid choice. {text} is not one of the available choices."),
            )
        })
}

fn parse_checkbox(text: &str) -> bool {
    matches!(
        text.trim().to_ascii_lowercase().as_str(),
        "on" | "true" | "1" | "yes"
    )
}

/// Edit the caller's profile from a multipart form.
async fn edit_profile(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> AppResult<FormSuccess<ProfileView>> {
    let mut input = EditProfileInput::default();
    let mut avatar: Option<FileUpload> = None;
    let mut resume: Option<FileUpload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "image" => avatar = file_field(field).await?,
            "resume" => resume = file_field(field).await?,
            "display_name" => input.display_name = Some(text_field(field).await?),
            "info" => input.info = Some(text_field(field).await?),
            "phone_number" => input.phone_number = Some(text_field(field).await?),
            "working_status" => {
                input.working_status = parse_working_status(&text_field(field).await?)?;
            }
            "organization" => input.organization = Some(text_field(field).await?),
            "designation" => input.designation = Some(text_field(field).await?),
            "linkedin_url" => input.linkedin_url = Some(text_field(field).await?),
            "github_url" => input.github_url = Some(text_field(field).await?),
            "terms_accepted" => input.terms_accepted = parse_checkbox(&text_field(field).await?),
            _ => {}
        }
    }

    let profile = state
        .profile_service
        .edit_profile(&user, input, avatar, resume)
        .await?;

    Ok(FormSuccess::new(
        NamedRoute::Profile,
        Some(profile),
        Some("Profile updated successfully!"),
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/mentors", get(list_mentors))
        .route("/me", get(my_profile).post(edit_profile))
        .route("/{username}", get(show_profile))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_working_status() {
        assert_eq!(
            parse_working_status("SELF_EMPLOYED").ok().flatten(),
            Some(WorkingStatus::SelfEmployed)
        );
        assert_eq!(
            parse_working_status("employed").ok().flatten(),
            Some(WorkingStatus::Employed)
        );
        assert!(matches!(parse_working_status(""), Ok(None)));
        assert!(matches!(
            parse_working_status("retired"),
            Err(AppError::InvalidForm(_))
        ));
    }

    #[test]
    fn test_parse_checkbox() {
        assert!(parse_checkbox("on"));
        assert!(parse_checkbox("true"));
        assert!(!parse_checkbox(""));
        assert!(!parse_checkbox("off"));
    }
}
