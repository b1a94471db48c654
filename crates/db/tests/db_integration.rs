//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `mentorconnect_test`)
//!   `TEST_DB_PASSWORD` (default: `mentorconnect_test`)
//!   `TEST_DB_NAME` (default: `mentorconnect_test`)

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use mentorconnect_db::entities::profile::UserRole;
use mentorconnect_db::entities::{chat_group, group_message, user};
use mentorconnect_db::repositories::{
    GroupRepository, MessageRepository, ProfileRepository, UserRepository,
};
use mentorconnect_db::test_utils::{TestDatabase, TestDbConfig};
use sea_orm::{ActiveModelTrait, Set};

async fn insert_user(db: &TestDatabase, id: &str) -> user::Model {
    user::ActiveModel {
        id: Set(id.to_string()),
        username: Set(id.to_string()),
        email: Set(None),
        email_verified: Set(false),
        email_verification_token: Set(None),
        password: Set("hash".to_string()),
        token: Set(format!("token-{id}")),
        created_at: Set(Utc::now().into()),
        updated_at: Set(None),
    }
    .insert(db.connection())
    .await
    .unwrap()
}

async fn insert_group(db: &TestDatabase, id: &str, admin: &str) -> chat_group::Model {
    chat_group::ActiveModel {
        id: Set(id.to_string()),
        group_name: Set(format!("name-{id}")),
        groupchat_name: Set(None),
        admin_id: Set(Some(admin.to_string())),
        is_private: Set(false),
        meeting_id: Set(None),
        created_at: Set(Utc::now().into()),
    }
    .insert(db.connection())
    .await
    .unwrap()
}

#[test]
fn test_config_from_env() {
    let config = TestDbConfig::default();
    assert!(!config.host.is_empty());
    assert!(config.port > 0);
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_profile_created_once() {
    let db = TestDatabase::new().await.unwrap();
    db.cleanup().await.unwrap();
    insert_user(&db, "u1").await;

    let repo = ProfileRepository::new(Arc::new(db.conn.clone()));
    let (a, b) = tokio::join!(
        repo.create_if_absent("u1", UserRole::Mentor),
        repo.create_if_absent("u1", UserRole::Mentor)
    );

    // Exactly one of the concurrent inserts wins
    assert!(a.unwrap() ^ b.unwrap());
    let profile = repo.find_by_user_id("u1").await.unwrap().unwrap();
    assert_eq!(profile.role, UserRole::Mentor);
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_meeting_id_assigned_once() {
    let db = TestDatabase::new().await.unwrap();
    db.cleanup().await.unwrap();
    insert_user(&db, "admin").await;
    insert_group(&db, "g1", "admin").await;

    let repo = GroupRepository::new(Arc::new(db.conn.clone()));
    assert!(repo.assign_meeting_id("g1", "first").await.unwrap());
    assert!(!repo.assign_meeting_id("g1", "second").await.unwrap());

    let group = repo.get_by_id("g1").await.unwrap();
    assert_eq!(group.meeting_id.as_deref(), Some("first"));
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_duplicate_group_name_conflicts() {
    let db = TestDatabase::new().await.unwrap();
    db.cleanup().await.unwrap();
    insert_user(&db, "admin").await;
    let existing = insert_group(&db, "g1", "admin").await;

    let repo = GroupRepository::new(Arc::new(db.conn.clone()));
    let result = repo
        .create(chat_group::ActiveModel {
            id: Set("g2".to_string()),
            group_name: Set(existing.group_name),
            groupchat_name: Set(None),
            admin_id: Set(None),
            is_private: Set(false),
            meeting_id: Set(None),
            created_at: Set(Utc::now().into()),
        })
        .await;

    assert!(matches!(
        result,
        Err(mentorconnect_common::AppError::Conflict(_))
    ));
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_messages_newest_first_and_admin_nullified() {
    let db = TestDatabase::new().await.unwrap();
    db.cleanup().await.unwrap();
    insert_user(&db, "admin").await;
    insert_group(&db, "g1", "admin").await;

    let messages = MessageRepository::new(Arc::new(db.conn.clone()));
    let now = Utc::now();
    for (i, id) in ["m1", "m2", "m3"].iter().enumerate() {
        messages
            .create(group_message::ActiveModel {
                id: Set((*id).to_string()),
                group_id: Set("g1".to_string()),
                author_id: Set("admin".to_string()),
                body: Set(Some(format!("hello {i}"))),
                file_key: Set(None),
                file_name: Set(None),
                file_size: Set(None),
                is_image: Set(None),
                created_at: Set((now + Duration::seconds(i as i64)).into()),
            })
            .await
            .unwrap();
    }

    let listed = messages.find_by_group("g1", 10, None).await.unwrap();
    let ids: Vec<_> = listed.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, ["m3", "m2", "m1"]);

    let older = messages.find_by_group("g1", 10, Some("m2")).await.unwrap();
    assert_eq!(older.len(), 1);
    assert_eq!(older[0].id, "m1");

    // Deleting the admin keeps the group but clears its admin
    let users = UserRepository::new(Arc::new(db.conn.clone()));
    users.delete("admin").await.unwrap();
    let groups = GroupRepository::new(Arc::new(db.conn.clone()));
    let group = groups.get_by_id("g1").await.unwrap();
    assert!(group.admin_id.is_none());
    assert!(messages.find_by_group("g1", 10, None).await.unwrap().is_empty());
}
