//! User repository.

use std::sync::Arc;

use crate::entities::{User, user};
use mentorconnect_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, SqlErr,
};

/// Reported when the username index rejects a write.
pub const USERNAME_TAKEN: &str = "A user with that username already exists.";
/// Reported when the email index rejects a write.
pub const EMAIL_TAKEN: &str = "A user is already registered with this email address.";

/// Canonical form emails are stored and compared in.
#[must_use]
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// User repository for database operations.
#[derive(Clone)]
pub struct UserRepository {
    db: Arc<DatabaseConnection>,
}

impl UserRepository {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a user by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<user::Model>> {
        User::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by ID, returning an error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<user::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User not found: {id}")))
    }

    /// Find users by IDs.
    pub async fn find_by_ids(&self, ids: &[String]) -> AppResult<Vec<user::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        User::find()
            .filter(user::Column::Id.is_in(ids.to_vec()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by username (case-insensitive).
    pub async fn find_by_username(&self, username: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Username.eq(username.to_lowercase()))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by email address (case-insensitive).
    pub async fn find_by_email(&self, email: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Email.eq(normalize_email(email)))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Whether an email address is used by an account other than `user_id`.
    pub async fn email_taken_by_other(&self, email: &str, user_id: &str) -> AppResult<bool> {
        let count = User::find()
            .filter(user::Column::Email.eq(normalize_email(email)))
            .filter(user::Column::Id.ne(user_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(count > 0)
    }

    /// Find a user by bearer token.
    pub async fn find_by_token(&self, token: &str) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::Token.eq(token))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a user by pending email verification token.
    pub async fn find_by_verification_token(
        &self,
        token: &str,
    ) -> AppResult<Option<user::Model>> {
        User::find()
            .filter(user::Column::EmailVerificationToken.eq(token))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new user. A taken username or email is reported as a conflict.
    pub async fn create(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model.insert(self.db.as_ref()).await.map_err(write_error)
    }

    /// Update a user. A taken email is reported as a conflict.
    pub async fn update(&self, model: user::ActiveModel) -> AppResult<user::Model> {
        model.update(self.db.as_ref()).await.map_err(write_error)
    }

    /// Delete a user. Dependent rows are removed by foreign key cascades.
    pub async fn delete(&self, id: &str) -> AppResult<u64> {
        let result = User::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(result.rows_affected)
    }
}

fn write_error(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => match conflict_message(&detail) {
            Some(message) => AppError::Conflict(message.to_string()),
            None => AppError::Database(err.to_string()),
        },
        _ => AppError::Database(err.to_string()),
    }
}

/// Maps a violated unique index to the message shown to the client.
fn conflict_message(detail: &str) -> Option<&'static str> {
    if detail.contains("\"idx_user_username\"") {
        Some(USERNAME_TAKEN)
    } else if detail.contains("\"idx_user_email\"") {
        Some(EMAIL_TAKEN)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::transaction_log;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_user(id: &str, username: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            email: Some(format!("{username}@example.com")),
            email_verified: false,
            email_verification_token: None,
            password: "hash".to_string(),
            token: format!("token-{id}"),
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_by_username_lowercases() {
        let user = create_test_user("user1", "alice");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user.clone()]])
                .into_connection(),
        );

        let repo = UserRepository::new(db.clone());
        let result = repo.find_by_username("ALICE").await.unwrap();
        assert_eq!(result.unwrap().id, "user1");

        drop(repo);
        let log = format!("{:?}", transaction_log(db));
        assert!(log.contains("\"alice\""));
    }

    #[tokio::test]
    async fn test_email_lookups_ignore_case() {
        let user = create_test_user("user1", "bob");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(1))
                }]])
                .into_connection(),
        );

        let repo = UserRepository::new(db.clone());
        let found = repo.find_by_email(" Bob@Example.COM ").await.unwrap();
        assert_eq!(found.unwrap().id, "user1");
        assert!(
            repo.email_taken_by_other("BOB@example.com", "user2")
                .await
                .unwrap()
        );

        drop(repo);
        let log = format!("{:?}", transaction_log(db));
        assert!(log.contains("\"bob@example.com\""));
        assert!(!log.contains("Bob@Example.COM"));
        assert!(!log.contains("BOB@example.com"));
    }

    #[test]
    fn test_conflict_message_by_index() {
        assert_eq!(
            conflict_message(
                "duplicate key value violates unique constraint \"idx_user_username\""
            ),
            Some(USERNAME_TAKEN)
        );
        assert_eq!(
            conflict_message("duplicate key value violates unique constraint \"idx_user_email\""),
            Some(EMAIL_TAKEN)
        );
        assert_eq!(
            conflict_message(
                "duplicate key value violates unique constraint \"idx_user_email_verification_token\""
            ),
            None
        );
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        let result = repo.get_by_id("missing").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_find_by_ids_empty_skips_query() {
        let db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());

        let repo = UserRepository::new(db);
        assert!(repo.find_by_ids(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        assert_eq!(repo.delete("user1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_email_taken_by_other() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(1))
                }]])
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(0))
                }]])
                .into_connection(),
        );

        let repo = UserRepository::new(db);
        assert!(repo.email_taken_by_other("a@example.com", "user1").await.unwrap());
        assert!(!repo.email_taken_by_other("a@example.com", "user1").await.unwrap());
    }
}
