//! Account endpoints: registration, login, email and deletion.

use axum::{
    Form, Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use mentorconnect_common::AppResult;
use mentorconnect_core::{ChangeEmailInput, LoginInput, RegisterInput};
use mentorconnect_db::entities::{profile::UserRole, user};
use serde::{Deserialize, Serialize};

use crate::{
    extractors::AuthUser,
    middleware::AppState,
    response::{ApiResponse, FormSuccess, NamedRoute, SeeOther},
};

/// Credentials handed back after sign-up or login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user_id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
}

/// Email address state of an account.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailResponse {
    pub email: Option<String>,
    pub email_verified: bool,
}

impl From<user::Model> for EmailResponse {
    fn from(user: user::Model) -> Self {
        Self {
            email: user.email,
            email_verified: user.email_verified,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfirmQuery {
    token: String,
}

async fn register(
    state: &AppState,
    role: UserRole,
    input: RegisterInput,
) -> AppResult<SeeOther<AuthResponse>> {
    let account = state
        .registration_service
        .register(Some(role), input)
        .await?;

    Ok(SeeOther {
        route: NamedRoute::ProfileOnboarding,
        body: AuthResponse {
            token: account.user.token,
            user_id: account.user.id,
            username: account.user.username,
            role: Some(account.profile.role),
        },
    })
}

/// Sign up as a mentor.
async fn register_mentor(
    State(state): State<AppState>,
    Form(input): Form<RegisterInput>,
) -> AppResult<SeeOther<AuthResponse>> {
    register(&state, UserRole::Mentor, input).await
}

/// Sign up as a mentee.
async fn register_mentee(
    State(state): State<AppState>,
    Form(input): Form<RegisterInput>,
) -> AppResult<SeeOther<AuthResponse>> {
    register(&state, UserRole::Mentee, input).await
}

async fn login(
    State(state): State<AppState>,
    Json(input): Json<LoginInput>,
) -> AppResult<ApiResponse<AuthResponse>> {
    let user = state.registration_service.login(input).await?;

    Ok(ApiResponse::ok(AuthResponse {
        token: user.token,
        user_id: user.id,
        username: user.username,
        role: None,
    }))
}

async fn change_email(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
    Form(input): Form<ChangeEmailInput>,
) -> AppResult<FormSuccess<EmailResponse>> {
    let updated = state.account_service.change_email(&user, input).await?;
    let message = format!(
        "Confirmation e-mail sent to {}.",
        updated.email.as_deref().unwrap_or_default()
    );

    Ok(FormSuccess::new(
        NamedRoute::ProfileSettings,
        Some(updated.into()),
        Some(&message),
    ))
}

async fn send_verification(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<FormSuccess<EmailResponse>> {
    state.account_service.send_verification(&user).await?;
    let message = format!(
        "Confirmation e-mail sent to {}.",
        user.email.as_deref().unwrap_or_default()
    );

    Ok(FormSuccess::new(
        NamedRoute::ProfileSettings,
        None,
        Some(&message),
    ))
}

async fn confirm_email(
    State(state): State<AppState>,
    Query(query): Query<ConfirmQuery>,
) -> AppResult<SeeOther<EmailResponse>> {
    let user = state.account_service.confirm_email(&query.token).await?;

    Ok(SeeOther {
        route: NamedRoute::ProfileSettings,
        body: user.into(),
    })
}

async fn delete_account(
    AuthUser(user): AuthUser,
    State(state): State<AppState>,
) -> AppResult<FormSuccess<()>> {
    state.account_service.delete_account(&user).await?;

    Ok(FormSuccess::new(
        NamedRoute::Home,
        None,
        Some("Account deleted, what a pity"),
    ))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register/mentor", post(register_mentor))
        .route("/register/mentee", post(register_mentee))
        .route("/login", post(login))
        .route("/email", post(change_email))
        .route("/email/verify", post(send_verification))
        .route("/email/confirm", get(confirm_email))
        .route("/delete", post(delete_account))
}
