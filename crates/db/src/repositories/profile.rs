//! Profile repository.

use std::sync::Arc;

use chrono::Utc;
use mentorconnect_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, QueryFilter,
    QueryOrder, QuerySelect, Set, sea_query::OnConflict,
};

use crate::entities::profile::UserRole;
use crate::entities::{Profile, profile};

/// Repository for profile operations.
#[derive(Clone)]
pub struct ProfileRepository {
    db: Arc<DatabaseConnection>,
}

impl ProfileRepository {
    /// Create a new profile repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the profile of a user.
    pub async fn find_by_user_id(&self, user_id: &str) -> AppResult<Option<profile::Model>> {
        Profile::find_by_id(user_id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert an empty profile for `user_id` unless one already exists.
    ///
    /// Returns `true` when a row was inserted. Runs as
    /// `INSERT .. ON CONFLICT (user_id) DO NOTHING`, so concurrent callers
    /// never produce a duplicate or an error.
    pub async fn create_if_absent(&self, user_id: &str, role: UserRole) -> AppResult<bool> {
        let model = profile::ActiveModel {
            user_id: Set(user_id.to_string()),
            role: Set(role),
            image_key: Set(None),
            display_name: Set(None),
            info: Set(None),
            phone_number: Set(None),
            working_status: Set(None),
            organization: Set(None),
            designation: Set(None),
            linkedin_url: Set(None),
            github_url: Set(None),
            resume_key: Set(None),
            terms_accepted: Set(false),
            created_at: Set(Utc::now().into()),
            updated_at: NotSet,
        };

        let inserted = Profile::insert(model)
            .on_conflict(
                OnConflict::column(profile::Column::UserId)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(inserted > 0)
    }

    /// Update a profile.
    pub async fn update(&self, model: profile::ActiveModel) -> AppResult<profile::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find profiles with a given role, newest first.
    pub async fn find_by_role(
        &self,
        role: UserRole,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<profile::Model>> {
        Profile::find()
            .filter(profile::Column::Role.eq(role))
            .order_by_desc(profile::Column::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
