//! Group chat endpoints.

use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
    response::IntoResponse,
    routing::{delete, get, post},
};
use mentorconnect_common::{AppError, AppResult};
use mentorconnect_core::{CreateGroupInput, GroupResponse, MessageResponse, SendMessageInput};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::{AuthUser, file_field, text_field},
    middleware::AppState,
    response::{self, ApiResponse},
};

// ==================== Request/Response Types ====================

/// Whether a membership call changed anything.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipResponse {
    pub changed: bool,
}

/// Presence change plus the resulting online count.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceResponse {
    pub changed: bool,
    pub online_count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingResponse {
    pub meeting_id: String,
}

#[derive(Debug, Deserialize)]
struct AddMemberRequest {
    username: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessagesQuery {
    limit: Option<u64>,
    until_id: Option<String>,
}

// ==================== Groups ====================

async fn create_group(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Json(input): Json<CreateGroupInput>,
) -> AppResult<ApiResponse<GroupResponse>> {
    let group = state.chat_service.create_group(&user, input).await?;
    let detail = state
        .chat_service
        .group_detail(&user, &group.group_name)
        .await?;
    Ok(ApiResponse::ok(detail))
}

async fn show_group(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(group_name): Path<String>,
) -> AppResult<ApiResponse<GroupResponse>> {
    let detail = state.chat_service.group_detail(&user, &group_name).await?;
    Ok(ApiResponse::ok(detail))
}

async fn delete_group(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(group_name): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.chat_service.delete_group(&user, &group_name).await?;
    Ok(response::ok())
}

async fn join(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(group_name): Path<String>,
) -> AppResult<ApiResponse<MembershipResponse>> {
    let changed = state.chat_service.join(&user, &group_name).await?;
    Ok(ApiResponse::ok(MembershipResponse { changed }))
}

async fn leave(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(group_name): Path<String>,
) -> AppResult<ApiResponse<MembershipResponse>> {
    let changed = state.chat_service.leave(&user, &group_name).await?;
    Ok(ApiResponse::ok(MembershipResponse { changed }))
}

/// Admin adds another user to the group.
async fn add_member(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(group_name): Path<String>,
    Json(req): Json<AddMemberRequest>,
) -> AppResult<ApiResponse<MembershipResponse>> {
    let changed = state
        .chat_service
        .add_member(&user, &group_name, &req.username)
        .await?;
    Ok(ApiResponse::ok(MembershipResponse { changed }))
}

async fn presence(state: &AppState, group_name: &str, changed: bool) -> AppResult<PresenceResponse> {
    let group = state.chat_service.get_by_name(group_name).await?;
    let online_count = state.chat_service.online_count(&group).await?;
    Ok(PresenceResponse {
        changed,
        online_count,
    })
}

async fn mark_online(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(group_name): Path<String>,
) -> AppResult<ApiResponse<PresenceResponse>> {
    let changed = state.chat_service.mark_online(&user, &group_name).await?;
    Ok(ApiResponse::ok(presence(&state, &group_name, changed).await?))
}

async fn mark_offline(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(group_name): Path<String>,
) -> AppResult<ApiResponse<PresenceResponse>> {
    let changed = state.chat_service.mark_offline(&user, &group_name).await?;
    Ok(ApiResponse::ok(presence(&state, &group_name, changed).await?))
}

async fn meeting(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(group_name): Path<String>,
) -> AppResult<ApiResponse<MeetingResponse>> {
    let meeting_id = state.chat_service.meeting_id(&user, &group_name).await?;
    Ok(ApiResponse::ok(MeetingResponse { meeting_id }))
}

// ==================== Messages ====================

async fn list_messages(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(group_name): Path<String>,
    Query(query): Query<MessagesQuery>,
) -> AppResult<ApiResponse<Vec<MessageResponse>>> {
    let messages = state
        .chat_service
        .list_messages(&user, &group_name, query.limit, query.until_id.as_deref())
        .await?;
    Ok(ApiResponse::ok(messages))
}

/// Post a message from a multipart form with `body` and/or `file`.
async fn send_message(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(group_name): Path<String>,
    mut multipart: Multipart,
) -> AppResult<ApiResponse<MessageResponse>> {
    let mut input = SendMessageInput::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        match field.name().unwrap_or("") {
            "body" => input.body = Some(text_field(field).await?),
            "file" => input.file = file_field(field).await?,
            _ => {}
        }
    }

    let message = state
        .chat_service
        .send_message(&user, &group_name, input)
        .await?;
    Ok(ApiResponse::ok(message))
}

async fn delete_message(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Path(message_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.chat_service.delete_message(&user, &message_id).await?;
    Ok(response::ok())
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/groups", post(create_group))
        .route("/groups/{group_name}", get(show_group).delete(delete_group))
        .route("/groups/{group_name}/join", post(join))
        .route("/groups/{group_name}/leave", post(leave))
        .route("/groups/{group_name}/members", post(add_member))
        .route("/groups/{group_name}/online", post(mark_online))
        .route("/groups/{group_name}/offline", post(mark_offline))
        .route("/groups/{group_name}/meeting", get(meeting))
        .route(
            "/groups/{group_name}/messages",
            get(list_messages).post(send_message),
        )
        .route("/messages/{id}", delete(delete_message))
}
