//! Group message repository.

use std::sync::Arc;

use crate::entities::group_message::{self, ActiveModel, Column, Entity as GroupMessage};
use mentorconnect_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

/// Repository for group message operations.
#[derive(Clone)]
pub struct MessageRepository {
    db: Arc<DatabaseConnection>,
}

impl MessageRepository {
    /// Create a new message repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Create a new message.
    pub async fn create(&self, model: ActiveModel) -> AppResult<group_message::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a message by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<group_message::Model>> {
        GroupMessage::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a message by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<group_message::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Message not found: {id}")))
    }

    /// List messages of a group, newest first.
    ///
    /// With `until_id`, only messages strictly older than that message are
    /// returned. Messages sharing a timestamp are ordered by id.
    pub async fn find_by_group(
        &self,
        group_id: &str,
        limit: u64,
        until_id: Option<&str>,
    ) -> AppResult<Vec<group_message::Model>> {
        let mut query = GroupMessage::find()
            .filter(Column::GroupId.eq(group_id))
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id);

        if let Some(until) = until_id {
            if let Some(until_msg) = self.find_by_id(until).await? {
                query = query.filter(
                    Condition::any()
                        .add(Column::CreatedAt.lt(until_msg.created_at))
                        .add(
                            Condition::all()
                                .add(Column::CreatedAt.eq(until_msg.created_at))
                                .add(Column::Id.lt(until_msg.id)),
                        ),
                );
            }
        }

        query
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Storage keys of every file attached by a user.
    pub async fn find_file_keys_by_author(&self, author_id: &str) -> AppResult<Vec<String>> {
        let keys: Vec<Option<String>> = GroupMessage::find()
            .select_only()
            .column(Column::FileKey)
            .filter(Column::AuthorId.eq(author_id))
            .filter(Column::FileKey.is_not_null())
            .into_tuple()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(keys.into_iter().flatten().collect())
    }

    /// Delete a message by ID.
    pub async fn delete(&self, id: &str) -> AppResult<()> {
        GroupMessage::delete_by_id(id)
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::transaction_log;
    use chrono::{Duration, Utc};
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_message(id: &str, group_id: &str, minutes_ago: i64) -> group_message::Model {
        group_message::Model {
            id: id.to_string(),
            group_id: group_id.to_string(),
            author_id: "user1".to_string(),
            body: Some(format!("message {id}")),
            file_key: None,
            file_name: None,
            file_size: None,
            is_image: None,
            created_at: (Utc::now() - Duration::minutes(minutes_ago)).into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_group_orders_newest_first() {
        let newer = create_test_message("msg2", "grp1", 1);
        let older = create_test_message("msg1", "grp1", 5);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[newer, older]])
                .into_connection(),
        );

        let repo = MessageRepository::new(db.clone());
        let result = repo.find_by_group("grp1", 20, None).await.unwrap();

        assert_eq!(result.len(), 2);
        assert!(result[0].created_at > result[1].created_at);

        drop(repo);
        let log = format!("{:?}", transaction_log(db));
        assert!(log.contains("ORDER BY \\\"group_message\\\".\\\"created_at\\\" DESC"));
    }

    #[tokio::test]
    async fn test_find_by_group_until_id() {
        let pivot = create_test_message("msg3", "grp1", 1);
        let older = create_test_message("msg1", "grp1", 10);

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[pivot]])
                .append_query_results([[older]])
                .into_connection(),
        );

        let repo = MessageRepository::new(db);
        let result = repo.find_by_group("grp1", 20, Some("msg3")).await.unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "msg1");
    }

    #[tokio::test]
    async fn test_has_file() {
        let mut message = create_test_message("msg1", "grp1", 0);
        assert!(!message.has_file());
        message.file_key = Some("files/user1/a.png".to_string());
        assert!(message.has_file());
    }
}
