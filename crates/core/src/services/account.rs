//! Account service: email address management and account deletion.

use chrono::Utc;
use mentorconnect_common::{AppError, AppResult, IdGenerator, StorageService};
use mentorconnect_db::{
    entities::user,
    repositories::{MessageRepository, ProfileRepository, UserRepository, normalize_email},
};
use sea_orm::{IntoActiveModel, Set};
use serde::Deserialize;
use validator::Validate;

use super::email::EmailService;

/// Email change form.
#[derive(Debug, Deserialize, Validate)]
pub struct ChangeEmailInput {
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
}

/// Account service.
#[derive(Clone)]
pub struct AccountService {
    user_repo: UserRepository,
    profile_repo: ProfileRepository,
    message_repo: MessageRepository,
    storage: StorageService,
    email: EmailService,
    id_gen: IdGenerator,
}

impl AccountService {
    /// Create a new account service.
    #[must_use]
    pub const fn new(
        user_repo: UserRepository,
        profile_repo: ProfileRepository,
        message_repo: MessageRepository,
        storage: StorageService,
        email: EmailService,
    ) -> Self {
        Self {
            user_repo,
            profile_repo,
            message_repo,
            storage,
            email,
            id_gen: IdGenerator::new(),
        }
    }

    /// Change the account's email address.
    ///
    /// The new address starts unverified and a confirmation link is sent to
    /// it. Delivery failures are logged and do not undo the change.
    pub async fn change_email(
        &self,
        user: &user::Model,
        input: ChangeEmailInput,
    ) -> AppResult<user::Model> {
        input.validate()?;
        let email = normalize_email(&input.email);

        if self.user_repo.email_taken_by_other(&email, &user.id).await? {
            return Err(AppError::Conflict(format!("{email} is already in use.")));
        }

        let token = self.id_gen.generate_token();
        let mut model = user.clone().into_active_model();
        model.email = Set(Some(email.clone()));
        model.email_verified = Set(false);
        model.email_verification_token = Set(Some(token.clone()));
        model.updated_at = Set(Some(Utc::now().into()));

        let updated = self.user_repo.update(model).await?;
        tracing::info!(user_id = %updated.id, "Changed email address");

        if let Err(e) = self
            .email
            .send_verification(&email, &updated.username, &token)
            .await
        {
            tracing::warn!(user_id = %updated.id, error = %e, "Failed to send verification email");
        }

        Ok(updated)
    }

    /// Send the verification link again, issuing a fresh token.
    pub async fn send_verification(&self, user: &user::Model) -> AppResult<()> {
        let Some(email) = user.email.clone() else {
            return Err(AppError::BadRequest(
                "No email address on this account".to_string(),
            ));
        };
        if user.email_verified {
            return Err(AppError::BadRequest(
                "Email address is already verified".to_string(),
            ));
        }

        let token = self.id_gen.generate_token();
        let mut model = user.clone().into_active_model();
        model.email_verification_token = Set(Some(token.clone()));
        let updated = self.user_repo.update(model).await?;

        self.email
            .send_verification(&email, &updated.username, &token)
            .await
    }

    /// Confirm the address that `token` was sent to.
    pub async fn confirm_email(&self, token: &str) -> AppResult<user::Model> {
        let user = self
            .user_repo
            .find_by_verification_token(token)
            .await?
            .ok_or_else(|| AppError::NotFound("Invalid or expired verification link".to_string()))?;

        let mut model = user.into_active_model();
        model.email_verified = Set(true);
        model.email_verification_token = Set(None);
        model.updated_at = Set(Some(Utc::now().into()));

        let updated = self.user_repo.update(model).await?;
        tracing::info!(user_id = %updated.id, "Verified email address");
        Ok(updated)
    }

    /// Delete the account together with everything it owns.
    ///
    /// Profile, memberships, presence and messages go with the user row;
    /// administered groups lose their admin. Stored files are removed once
    /// the rows are gone.
    pub async fn delete_account(&self, user: &user::Model) -> AppResult<()> {
        let mut keys = self.message_repo.find_file_keys_by_author(&user.id).await?;
        if let Some(profile) = self.profile_repo.find_by_user_id(&user.id).await? {
            keys.extend(profile.image_key);
            keys.extend(profile.resume_key);
        }

        self.user_repo.delete(&user.id).await?;

        for key in &keys {
            if let Err(e) = self.storage.delete(key).await {
                tracing::warn!(key = %key, error = %e, "Failed to delete stored file");
            }
        }

        tracing::info!(user_id = %user.id, files = keys.len(), "Deleted account");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::profile::tests::{create_test_profile, create_test_user, temp_storage};
    use mentorconnect_db::entities::profile::UserRole;
    use mentorconnect_db::test_utils::transaction_log;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};
    use std::sync::Arc;

    fn create_test_service(db: Arc<DatabaseConnection>, storage: StorageService) -> AccountService {
        AccountService::new(
            UserRepository::new(db.clone()),
            ProfileRepository::new(db.clone()),
            MessageRepository::new(db),
            storage,
            EmailService::log_only("http://localhost:8000"),
        )
    }

    #[tokio::test]
    async fn test_change_email_taken_by_other() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(1))
                }]])
                .into_connection(),
        );

        let service = create_test_service(db, temp_storage());
        let user = create_test_user("user1", "alice");
        let err = service
            .change_email(
                &user,
                ChangeEmailInput {
                    email: "bob@example.com".to_string(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_change_email_taken_in_other_case() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(1))
                }]])
                .into_connection(),
        );

        let service = create_test_service(db.clone(), temp_storage());
        let user = create_test_user("user1", "alice");
        let err = service
            .change_email(
                &user,
                ChangeEmailInput {
                    email: "Bob@Example.com".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        drop(service);
        let log = format!("{:?}", transaction_log(db));
        assert!(log.contains("\"bob@example.com\""));
        assert!(!log.contains("Bob@Example.com"));
    }

    #[tokio::test]
    async fn test_change_email_marks_unverified() {
        let user = create_test_user("user1", "alice");
        let mut updated = user.clone();
        updated.email = Some("new@example.com".to_string());
        updated.email_verified = false;
        updated.email_verification_token = Some("tok".to_string());

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(0))
                }]])
                .append_query_results([[updated]])
                .into_connection(),
        );

        let service = create_test_service(db, temp_storage());
        let result = service
            .change_email(
                &user,
                ChangeEmailInput {
                    email: "new@example.com".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(result.email.as_deref(), Some("new@example.com"));
        assert!(!result.email_verified);
        assert!(result.email_verification_token.is_some());
    }

    #[tokio::test]
    async fn test_change_email_invalid_address() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = create_test_service(db, temp_storage());
        let user = create_test_user("user1", "alice");

        let err = service
            .change_email(
                &user,
                ChangeEmailInput {
                    email: "nope".to_string(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidForm(_)));
    }

    #[tokio::test]
    async fn test_send_verification_without_email() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = create_test_service(db, temp_storage());

        let mut user = create_test_user("user1", "alice");
        user.email = None;

        let err = service.send_verification(&user).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_confirm_email() {
        let mut user = create_test_user("user1", "alice");
        user.email_verification_token = Some("tok".to_string());
        let mut verified = user.clone();
        verified.email_verified = true;
        verified.email_verification_token = None;

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .append_query_results([[verified]])
                .into_connection(),
        );

        let service = create_test_service(db, temp_storage());
        let result = service.confirm_email("tok").await.unwrap();
        assert!(result.email_verified);
        assert!(result.email_verification_token.is_none());
    }

    #[tokio::test]
    async fn test_confirm_email_bad_token() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let service = create_test_service(db, temp_storage());
        let err = service.confirm_email("bogus").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_delete_account_removes_files() {
        let storage = temp_storage();
        storage
            .upload("files/user1/a.png", b"a", "image/png")
            .await
            .unwrap();
        storage
            .upload("avatars/user1/me.png", b"b", "image/png")
            .await
            .unwrap();

        let mut profile = create_test_profile("user1", UserRole::Mentor);
        profile.image_key = Some("avatars/user1/me.png".to_string());

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "file_key" => sea_orm::Value::from(Some("files/user1/a.png".to_string()))
                }]])
                .append_query_results([[profile]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let service = create_test_service(db.clone(), storage.clone());
        let user = create_test_user("user1", "alice");
        service.delete_account(&user).await.unwrap();

        assert!(!storage.exists("files/user1/a.png").await.unwrap());
        assert!(!storage.exists("avatars/user1/me.png").await.unwrap());

        drop(service);
        let log = format!("{:?}", transaction_log(db));
        assert!(log.contains("DELETE FROM"));
    }
}
