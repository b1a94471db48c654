//! Account registration and login.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use mentorconnect_common::{AppError, AppResult, IdGenerator};
use mentorconnect_db::{
    entities::{profile, profile::UserRole, user},
    repositories::{EMAIL_TAKEN, USERNAME_TAKEN, UserRepository, normalize_email},
};
use sea_orm::Set;
use serde::Deserialize;
use validator::{Validate, ValidationError, ValidationErrors};

use super::profile::ProfileService;

/// Registration form.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(
        length(
            min = 1,
            max = 150,
            message = "Required. 150 characters or fewer."
        ),
        custom(function = "validate_username")
    )]
    pub username: String,

    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,

    #[validate(length(
        min = 8,
        message = "This password is too short. It must contain at least 8 characters."
    ))]
    pub password1: String,

    pub password2: String,
}

/// Login request.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// A freshly registered account and its profile.
#[derive(Debug, Clone)]
pub struct RegisteredAccount {
    pub user: user::Model,
    pub profile: profile::Model,
}

/// Letters, digits and `@ . + - _` only.
fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
    {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_username").with_message(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .into(),
        ))
    }
}

fn check_form(input: &RegisterInput) -> Result<(), ValidationErrors> {
    let mut errors = input.validate().err().unwrap_or_default();

    if input.password1 != input.password2 {
        errors.add(
            "password2",
            ValidationError::new("password_mismatch")
                .with_message("The two password fields didn't match.".into()),
        );
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Registration service.
#[derive(Clone)]
pub struct RegistrationService {
    user_repo: UserRepository,
    profile_service: ProfileService,
    id_gen: IdGenerator,
}

impl RegistrationService {
    /// Create a new registration service.
    #[must_use]
    pub const fn new(user_repo: UserRepository, profile_service: ProfileService) -> Self {
        Self {
            user_repo,
            profile_service,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register an account and give it a profile with `role` (MENTEE if unset).
    pub async fn register(
        &self,
        role: Option<UserRole>,
        input: RegisterInput,
    ) -> AppResult<RegisteredAccount> {
        check_form(&input)?;

        let username = input.username.to_lowercase();
        let email = normalize_email(&input.email);

        if self.user_repo.find_by_username(&username).await?.is_some() {
            return Err(AppError::Conflict(USERNAME_TAKEN.to_string()));
        }
        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Err(AppError::Conflict(EMAIL_TAKEN.to_string()));
        }

        let password_hash = hash_password(&input.password1)?;

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            username: Set(username),
            email: Set(Some(email)),
            email_verified: Set(false),
            email_verification_token: Set(None),
            password: Set(password_hash),
            token: Set(self.id_gen.generate_token()),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let user = self.user_repo.create(model).await?;
        let role = role.unwrap_or_default();
        let profile = self.profile_service.ensure_profile(&user.id, role).await?;

        tracing::info!(user_id = %user.id, role = ?role, "Registered account");

        Ok(RegisteredAccount { user, profile })
    }

    /// Check credentials and return the account.
    pub async fn login(&self, input: LoginInput) -> AppResult<user::Model> {
        input.validate()?;

        let Some(user) = self.user_repo.find_by_username(&input.username).await? else {
            return Err(AppError::Unauthorized);
        };

        if !verify_password(&input.password, &user.password)? {
            tracing::debug!(user_id = %user.id, "Login with wrong password");
            return Err(AppError::Unauthorized);
        }

        Ok(user)
    }

    /// Resolve a bearer token to its account.
    pub async fn authenticate(&self, token: &str) -> AppResult<Option<user::Model>> {
        self.user_repo.find_by_token(token).await
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}
