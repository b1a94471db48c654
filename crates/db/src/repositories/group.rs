//! Chat group repository: groups, membership and presence.

use std::sync::Arc;

use chrono::Utc;
use mentorconnect_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
    sea_query::{Expr, OnConflict},
};

use crate::entities::{
    ChatGroup, ChatGroupMember, ChatGroupOnline, GroupMessage, chat_group, chat_group_member,
    chat_group_online, group_message,
};

/// Repository for chat group operations.
#[derive(Clone)]
pub struct GroupRepository {
    db: Arc<DatabaseConnection>,
}

impl GroupRepository {
    /// Create a new group repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    // ==================== Group Operations ====================

    /// Find group by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<chat_group::Model>> {
        ChatGroup::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get group by ID, returning error if not found.
    pub async fn get_by_id(&self, id: &str) -> AppResult<chat_group::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Group not found: {id}")))
    }

    /// Find group by its unique name.
    pub async fn find_by_name(&self, group_name: &str) -> AppResult<Option<chat_group::Model>> {
        ChatGroup::find()
            .filter(chat_group::Column::GroupName.eq(group_name))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get group by its unique name, returning error if not found.
    pub async fn get_by_name(&self, group_name: &str) -> AppResult<chat_group::Model> {
        self.find_by_name(group_name)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Group not found: {group_name}")))
    }

    /// Create a group. A taken `group_name` is reported as a conflict.
    pub async fn create(&self, model: chat_group::ActiveModel) -> AppResult<chat_group::Model> {
        model.insert(self.db.as_ref()).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("Group name is already taken".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Set the meeting id unless one is already assigned.
    ///
    /// Returns `true` if this call wrote the value.
    pub async fn assign_meeting_id(&self, group_id: &str, meeting_id: &str) -> AppResult<bool> {
        let result = ChatGroup::update_many()
            .col_expr(chat_group::Column::MeetingId, Expr::value(meeting_id))
            .filter(chat_group::Column::Id.eq(group_id))
            .filter(chat_group::Column::MeetingId.is_null())
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    /// Delete a group and its messages, returning the storage keys of the
    /// files those messages carried.
    ///
    /// The group row is locked first, so no message can be added between
    /// collecting the keys and the cascading delete.
    pub async fn delete(&self, id: &str) -> AppResult<Vec<String>> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        ChatGroup::find_by_id(id)
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?
            .ok_or_else(|| AppError::NotFound(format!("Group not found: {id}")))?;

        let keys: Vec<Option<String>> = GroupMessage::find()
            .select_only()
            .column(group_message::Column::FileKey)
            .filter(group_message::Column::GroupId.eq(id))
            .filter(group_message::Column::FileKey.is_not_null())
            .into_tuple()
            .all(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        ChatGroup::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(keys.into_iter().flatten().collect())
    }

    // ==================== Member Operations ====================

    /// Add a member. Returns `false` if the user already was one.
    pub async fn add_member(&self, group_id: &str, user_id: &str) -> AppResult<bool> {
        let model = chat_group_member::ActiveModel {
            group_id: Set(group_id.to_string()),
            user_id: Set(user_id.to_string()),
            joined_at: Set(Utc::now().into()),
        };

        let inserted = ChatGroupMember::insert(model)
            .on_conflict(
                OnConflict::columns([
                    chat_group_member::Column::GroupId,
                    chat_group_member::Column::UserId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(inserted > 0)
    }

    /// Remove a member. Returns `false` if the user was not one.
    pub async fn remove_member(&self, group_id: &str, user_id: &str) -> AppResult<bool> {
        let result = ChatGroupMember::delete_many()
            .filter(chat_group_member::Column::GroupId.eq(group_id))
            .filter(chat_group_member::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    /// Check whether a user is a member of a group.
    pub async fn is_member(&self, group_id: &str, user_id: &str) -> AppResult<bool> {
        let member = ChatGroupMember::find_by_id((group_id.to_string(), user_id.to_string()))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(member.is_some())
    }

    /// List members of a group in join order.
    pub async fn find_members(&self, group_id: &str) -> AppResult<Vec<chat_group_member::Model>> {
        ChatGroupMember::find()
            .filter(chat_group_member::Column::GroupId.eq(group_id))
            .order_by_asc(chat_group_member::Column::JoinedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    // ==================== Presence Operations ====================

    /// Add a user to the online set. Returns `false` if already online.
    pub async fn add_online(&self, group_id: &str, user_id: &str) -> AppResult<bool> {
        let model = chat_group_online::ActiveModel {
            group_id: Set(group_id.to_string()),
            user_id: Set(user_id.to_string()),
            since: Set(Utc::now().into()),
        };

        let inserted = ChatGroupOnline::insert(model)
            .on_conflict(
                OnConflict::columns([
                    chat_group_online::Column::GroupId,
                    chat_group_online::Column::UserId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(inserted > 0)
    }

    /// Remove a user from the online set. Returns `false` if not online.
    pub async fn remove_online(&self, group_id: &str, user_id: &str) -> AppResult<bool> {
        let result = ChatGroupOnline::delete_many()
            .filter(chat_group_online::Column::GroupId.eq(group_id))
            .filter(chat_group_online::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(result.rows_affected > 0)
    }

    /// List online members, longest online first.
    pub async fn find_online(&self, group_id: &str) -> AppResult<Vec<chat_group_online::Model>> {
        ChatGroupOnline::find()
            .filter(chat_group_online::Column::GroupId.eq(group_id))
            .order_by_asc(chat_group_online::Column::Since)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Count online members.
    pub async fn count_online(&self, group_id: &str) -> AppResult<u64> {
        ChatGroupOnline::find()
            .filter(chat_group_online::Column::GroupId.eq(group_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::transaction_log;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_group(id: &str, group_name: &str) -> chat_group::Model {
        chat_group::Model {
            id: id.to_string(),
            group_name: group_name.to_string(),
            groupchat_name: None,
            admin_id: Some("admin1".to_string()),
            is_private: false,
            meeting_id: None,
            created_at: Utc::now().into(),
        }
    }

    fn exec_result(rows_affected: u64) -> MockExecResult {
        MockExecResult {
            last_insert_id: 0,
            rows_affected,
        }
    }

    #[tokio::test]
    async fn test_find_by_name() {
        let group = create_test_group("grp1", "abc");

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[group.clone()]])
                .into_connection(),
        );

        let repo = GroupRepository::new(db);
        let result = repo.find_by_name("abc").await.unwrap();
        assert_eq!(result.unwrap().id, "grp1");
    }

    #[tokio::test]
    async fn test_get_by_name_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<chat_group::Model>::new()])
                .into_connection(),
        );

        let repo = GroupRepository::new(db);
        let result = repo.get_by_name("nope").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_assign_meeting_id_is_conditional() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec_result(1), exec_result(0)])
                .into_connection(),
        );

        let repo = GroupRepository::new(db.clone());
        assert!(repo.assign_meeting_id("grp1", "mentorconnect-abc").await.unwrap());
        assert!(!repo.assign_meeting_id("grp1", "mentorconnect-abc").await.unwrap());

        drop(repo);
        let log = format!("{:?}", transaction_log(db));
        assert!(log.contains("meeting_id\\\" IS NULL"));
    }

    #[tokio::test]
    async fn test_add_member_idempotent() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec_result(1), exec_result(0)])
                .into_connection(),
        );

        let repo = GroupRepository::new(db);
        assert!(repo.add_member("grp1", "user1").await.unwrap());
        assert!(!repo.add_member("grp1", "user1").await.unwrap());
    }

    #[tokio::test]
    async fn test_is_member() {
        let member = chat_group_member::Model {
            group_id: "grp1".to_string(),
            user_id: "user1".to_string(),
            joined_at: Utc::now().into(),
        };

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![member], vec![]])
                .into_connection(),
        );

        let repo = GroupRepository::new(db);
        assert!(repo.is_member("grp1", "user1").await.unwrap());
        assert!(!repo.is_member("grp1", "user2").await.unwrap());
    }

    #[tokio::test]
    async fn test_remove_online() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([exec_result(1), exec_result(0)])
                .into_connection(),
        );

        let repo = GroupRepository::new(db);
        assert!(repo.remove_online("grp1", "user1").await.unwrap());
        assert!(!repo.remove_online("grp1", "user1").await.unwrap());
    }

    #[tokio::test]
    async fn test_count_online() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(3))
                }]])
                .into_connection(),
        );

        let repo = GroupRepository::new(db);
        assert_eq!(repo.count_online("grp1").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_delete_collects_file_keys_under_lock() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_group("grp1", "abc")]])
                .append_query_results([[maplit::btreemap! {
                    "file_key" => sea_orm::Value::from(Some("files/user1/a.png".to_string()))
                }]])
                .append_exec_results([exec_result(1)])
                .into_connection(),
        );

        let repo = GroupRepository::new(db.clone());
        let keys = repo.delete("grp1").await.unwrap();
        assert_eq!(keys, ["files/user1/a.png"]);

        drop(repo);
        let log = format!("{:?}", transaction_log(db));
        let lock = log.find("FOR UPDATE").unwrap();
        let select_keys = log.find("\\\"file_key\\\" IS NOT NULL").unwrap();
        let delete = log.find("DELETE FROM \\\"chat_group\\\"").unwrap();
        assert!(lock < select_keys && select_keys < delete);
    }

    #[tokio::test]
    async fn test_delete_missing_group() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<chat_group::Model>::new()])
                .into_connection(),
        );

        let repo = GroupRepository::new(db);
        assert!(matches!(
            repo.delete("nope").await,
            Err(AppError::NotFound(_))
        ));
    }
}
