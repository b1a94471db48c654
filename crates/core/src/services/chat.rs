//! Chat service: groups, membership, presence and messages.

use chrono::Utc;
use mentorconnect_common::{
    AppError, AppResult, FileUpload, IdGenerator, StorageNamespace, StorageService,
    generate_storage_key,
};
use mentorconnect_db::{
    entities::{chat_group, group_message, user},
    repositories::{GroupRepository, MessageRepository, UserRepository},
};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::message::{classify_attachment, decode_image, validate_message};

/// Prefix of generated meeting ids.
pub const MEETING_ID_PREFIX: &str = "mentorconnect-";

/// Default number of messages per page.
pub const DEFAULT_MESSAGE_LIMIT: u64 = 30;

/// Largest page of messages a client can ask for.
pub const MAX_MESSAGE_LIMIT: u64 = 100;

/// Input for creating a group.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupInput {
    /// Unique name. Generated when absent.
    #[validate(length(min = 1, max = 128), custom(function = "validate_group_name"))]
    pub group_name: Option<String>,
    #[validate(length(max = 128))]
    pub groupchat_name: Option<String>,
    #[serde(default)]
    pub is_private: bool,
}

/// Group names end up in URLs and meeting ids.
fn validate_group_name(name: &str) -> Result<(), ValidationError> {
    if name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
    {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_group_name")
            .with_message("Use only letters, digits, '-' and '_'".into()))
    }
}

/// A message as received from a client.
#[derive(Debug, Default)]
pub struct SendMessageInput {
    pub body: Option<String>,
    pub file: Option<FileUpload>,
}

/// A member as shown in group listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberInfo {
    pub user_id: String,
    pub username: String,
}

/// Group with members and presence.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupResponse {
    pub id: String,
    pub group_name: String,
    pub groupchat_name: Option<String>,
    pub admin_id: Option<String>,
    pub is_private: bool,
    pub meeting_id: Option<String>,
    pub created_at: chrono::DateTime<Utc>,
    pub members: Vec<MemberInfo>,
    pub online: Vec<MemberInfo>,
    pub online_count: usize,
    pub is_member: bool,
}

/// Attached file of a message.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentResponse {
    pub url: String,
    pub name: Option<String>,
    pub size: Option<i64>,
    pub is_image: bool,
}

/// Message as shown to clients.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: String,
    pub group_id: String,
    pub author: Option<MemberInfo>,
    pub body: Option<String>,
    pub file: Option<AttachmentResponse>,
    pub created_at: chrono::DateTime<Utc>,
}

/// Service for group chat.
#[derive(Clone)]
pub struct ChatService {
    group_repo: GroupRepository,
    message_repo: MessageRepository,
    user_repo: UserRepository,
    storage: StorageService,
    id_gen: IdGenerator,
}

impl ChatService {
    /// Create a new chat service.
    #[must_use]
    pub const fn new(
        group_repo: GroupRepository,
        message_repo: MessageRepository,
        user_repo: UserRepository,
        storage: StorageService,
    ) -> Self {
        Self {
            group_repo,
            message_repo,
            user_repo,
            storage,
            id_gen: IdGenerator::new(),
        }
    }

    // ==================== Groups ====================

    /// Create a group administered by `admin`, who also becomes its first member.
    pub async fn create_group(
        &self,
        admin: &user::Model,
        input: CreateGroupInput,
    ) -> AppResult<chat_group::Model> {
        input.validate()?;

        let group_name = input
            .group_name
            .unwrap_or_else(|| self.id_gen.generate_short());

        if self.group_repo.find_by_name(&group_name).await?.is_some() {
            return Err(AppError::Conflict("Group name is already taken".to_string()));
        }

        let model = chat_group::ActiveModel {
            id: Set(self.id_gen.generate()),
            group_name: Set(group_name),
            groupchat_name: Set(input.groupchat_name.filter(|n| !n.trim().is_empty())),
            admin_id: Set(Some(admin.id.clone())),
            is_private: Set(input.is_private),
            meeting_id: Set(None),
            created_at: Set(Utc::now().into()),
        };

        let group = self.group_repo.create(model).await?;
        self.group_repo.add_member(&group.id, &admin.id).await?;

        tracing::info!(group_id = %group.id, user_id = %admin.id, "Created chat group");
        Ok(group)
    }

    /// Get a group by id.
    pub async fn get_group(&self, id: &str) -> AppResult<chat_group::Model> {
        self.group_repo.get_by_id(id).await
    }

    /// Get a group by its unique name.
    pub async fn get_by_name(&self, group_name: &str) -> AppResult<chat_group::Model> {
        self.group_repo.get_by_name(group_name).await
    }

    /// Group with its members and online set, as seen by `viewer`.
    pub async fn group_detail(
        &self,
        viewer: &user::Model,
        group_name: &str,
    ) -> AppResult<GroupResponse> {
        let group = self.get_by_name(group_name).await?;
        let is_member = self.ensure_can_view(viewer, &group).await?;

        let members = self.members(&group).await?;
        let online = self.online_members(&group).await?;

        Ok(GroupResponse {
            id: group.id,
            group_name: group.group_name,
            groupchat_name: group.groupchat_name,
            admin_id: group.admin_id,
            is_private: group.is_private,
            meeting_id: group.meeting_id,
            created_at: group.created_at.into(),
            online_count: online.len(),
            members,
            online,
            is_member,
        })
    }

    /// Delete a group. Only its admin may do this.
    pub async fn delete_group(&self, user: &user::Model, group_name: &str) -> AppResult<()> {
        let group = self.get_by_name(group_name).await?;
        if !is_admin(&group, user) {
            return Err(AppError::Forbidden(
                "Only the group admin can delete the group".to_string(),
            ));
        }

        let keys = self.group_repo.delete(&group.id).await?;
        self.remove_files(&keys).await;

        tracing::info!(group_id = %group.id, user_id = %user.id, "Deleted chat group");
        Ok(())
    }

    /// Meeting id of the group, assigned on first call.
    ///
    /// The id is `mentorconnect-{group_name}`. Once stored it is returned as is
    /// and no further write happens; concurrent first calls never overwrite
    /// each other.
    pub async fn get_or_create_meeting_id(
        &self,
        group: &mut chat_group::Model,
    ) -> AppResult<String> {
        if let Some(meeting_id) = &group.meeting_id {
            return Ok(meeting_id.clone());
        }

        let candidate = format!("{MEETING_ID_PREFIX}{}", group.group_name);
        let meeting_id = if self
            .group_repo
            .assign_meeting_id(&group.id, &candidate)
            .await?
        {
            tracing::debug!(group_id = %group.id, meeting_id = %candidate, "Assigned meeting id");
            candidate
        } else {
            self.group_repo
                .get_by_id(&group.id)
                .await?
                .meeting_id
                .unwrap_or(candidate)
        };

        group.meeting_id = Some(meeting_id.clone());
        Ok(meeting_id)
    }

    /// Meeting id of a group the viewer can see.
    pub async fn meeting_id(&self, viewer: &user::Model, group_name: &str) -> AppResult<String> {
        let mut group = self.get_by_name(group_name).await?;
        self.ensure_can_view(viewer, &group).await?;
        self.get_or_create_meeting_id(&mut group).await
    }

    // ==================== Membership & presence ====================

    /// Join a group. Returns `false` if already a member.
    ///
    /// Private groups only take their admin and existing members.
    pub async fn join(&self, user: &user::Model, group_name: &str) -> AppResult<bool> {
        let group = self.get_by_name(group_name).await?;

        if group.is_private
            && !is_admin(&group, user)
            && !self.group_repo.is_member(&group.id, &user.id).await?
        {
            return Err(AppError::Forbidden("This group is private".to_string()));
        }

        let joined = self.group_repo.add_member(&group.id, &user.id).await?;
        if joined {
            tracing::info!(group_id = %group.id, user_id = %user.id, "Joined chat group");
        }
        Ok(joined)
    }

    /// Add `username` to a group. Only the group admin may do this; it is how
    /// private groups gain members. Returns `false` if already a member.
    pub async fn add_member(
        &self,
        admin: &user::Model,
        group_name: &str,
        username: &str,
    ) -> AppResult<bool> {
        let group = self.get_by_name(group_name).await?;
        if !is_admin(&group, admin) {
            return Err(AppError::Forbidden(
                "Only the group admin can add members".to_string(),
            ));
        }

        let member = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User not found: {username}")))?;

        let added = self.group_repo.add_member(&group.id, &member.id).await?;
        if added {
            tracing::info!(
                group_id = %group.id,
                user_id = %member.id,
                admin_id = %admin.id,
                "Added member to chat group"
            );
        }
        Ok(added)
    }

    /// Leave a group. The user also drops out of the online set.
    pub async fn leave(&self, user: &user::Model, group_name: &str) -> AppResult<bool> {
        let group = self.get_by_name(group_name).await?;

        self.group_repo.remove_online(&group.id, &user.id).await?;
        let left = self.group_repo.remove_member(&group.id, &user.id).await?;
        if left {
            tracing::info!(group_id = %group.id, user_id = %user.id, "Left chat group");
        }
        Ok(left)
    }

    /// Put the user in the group's online set.
    ///
    /// Public groups are joined on the way; private groups require membership.
    pub async fn mark_online(&self, user: &user::Model, group_name: &str) -> AppResult<bool> {
        let group = self.get_by_name(group_name).await?;

        if group.is_private {
            if !self.group_repo.is_member(&group.id, &user.id).await? {
                return Err(AppError::Forbidden("This group is private".to_string()));
            }
        } else {
            self.group_repo.add_member(&group.id, &user.id).await?;
        }

        let added = self.group_repo.add_online(&group.id, &user.id).await?;
        if added {
            tracing::debug!(group_id = %group.id, user_id = %user.id, "Marked online");
        }
        Ok(added)
    }

    /// Remove the user from the group's online set.
    pub async fn mark_offline(&self, user: &user::Model, group_name: &str) -> AppResult<bool> {
        let group = self.get_by_name(group_name).await?;
        let removed = self.group_repo.remove_online(&group.id, &user.id).await?;
        if removed {
            tracing::debug!(group_id = %group.id, user_id = %user.id, "Marked offline");
        }
        Ok(removed)
    }

    /// Members of the group, in join order.
    pub async fn members(&self, group: &chat_group::Model) -> AppResult<Vec<MemberInfo>> {
        let ids: Vec<String> = self
            .group_repo
            .find_members(&group.id)
            .await?
            .into_iter()
            .map(|m| m.user_id)
            .collect();
        self.member_infos(&ids).await
    }

    /// Members currently online.
    pub async fn online_members(&self, group: &chat_group::Model) -> AppResult<Vec<MemberInfo>> {
        let ids: Vec<String> = self
            .group_repo
            .find_online(&group.id)
            .await?
            .into_iter()
            .map(|m| m.user_id)
            .collect();
        self.member_infos(&ids).await
    }

    /// Number of members currently online.
    pub async fn online_count(&self, group: &chat_group::Model) -> AppResult<u64> {
        self.group_repo.count_online(&group.id).await
    }

    // ==================== Messages ====================

    /// Post a message to a group the author belongs to.
    ///
    /// The attached file is checked before it is stored, and removed again if
    /// the message row cannot be written.
    pub async fn send_message(
        &self,
        author: &user::Model,
        group_name: &str,
        input: SendMessageInput,
    ) -> AppResult<MessageResponse> {
        let group = self.get_by_name(group_name).await?;
        if !self.group_repo.is_member(&group.id, &author.id).await? {
            return Err(AppError::Forbidden(
                "You must be a member to post in this group".to_string(),
            ));
        }

        let body = input.body.filter(|b| !b.trim().is_empty());
        validate_message(body.as_deref(), input.file.as_ref().map(FileUpload::size))?;

        let stored = match &input.file {
            Some(file) => {
                let key = generate_storage_key(StorageNamespace::Files, &author.id, &file.file_name);
                let uploaded = self
                    .storage
                    .upload(&key, &file.data, &file.content_type)
                    .await?;
                Some((uploaded, file.file_name.clone()))
            }
            None => None,
        };
        let is_image = match input.file {
            Some(file) => Some(decode_image(file.data).await),
            None => None,
        };

        let model = group_message::ActiveModel {
            id: Set(self.id_gen.generate()),
            group_id: Set(group.id.clone()),
            author_id: Set(author.id.clone()),
            body: Set(body),
            file_key: Set(stored.as_ref().map(|(f, _)| f.key.clone())),
            file_name: Set(stored.as_ref().map(|(_, name)| name.clone())),
            file_size: Set(stored
                .as_ref()
                .map(|(f, _)| i64::try_from(f.size).unwrap_or(i64::MAX))),
            is_image: Set(is_image),
            created_at: Set(Utc::now().into()),
        };

        let message = match self.message_repo.create(model).await {
            Ok(message) => message,
            Err(e) => {
                if let Some((uploaded, _)) = &stored {
                    self.remove_files(std::slice::from_ref(&uploaded.key)).await;
                }
                return Err(e);
            }
        };

        tracing::info!(
            message_id = %message.id,
            group_id = %group.id,
            user_id = %author.id,
            "Sent message"
        );

        let authors = [author.clone()];
        Ok(self.message_response(message, &authors).await)
    }

    /// Messages of a group, newest first.
    pub async fn list_messages(
        &self,
        viewer: &user::Model,
        group_name: &str,
        limit: Option<u64>,
        until_id: Option<&str>,
    ) -> AppResult<Vec<MessageResponse>> {
        let group = self.get_by_name(group_name).await?;
        self.ensure_can_view(viewer, &group).await?;

        let limit = limit
            .unwrap_or(DEFAULT_MESSAGE_LIMIT)
            .clamp(1, MAX_MESSAGE_LIMIT);
        let messages = self
            .message_repo
            .find_by_group(&group.id, limit, until_id)
            .await?;

        let mut author_ids: Vec<String> = messages.iter().map(|m| m.author_id.clone()).collect();
        author_ids.sort();
        author_ids.dedup();
        let authors = self.user_repo.find_by_ids(&author_ids).await?;

        let mut responses = Vec::with_capacity(messages.len());
        for message in messages {
            responses.push(self.message_response(message, &authors).await);
        }
        Ok(responses)
    }

    /// Delete a message. Only its author may do this.
    pub async fn delete_message(&self, user: &user::Model, message_id: &str) -> AppResult<()> {
        let message = self.message_repo.get_by_id(message_id).await?;
        if message.author_id != user.id {
            return Err(AppError::Forbidden(
                "You can only delete your own messages".to_string(),
            ));
        }

        self.message_repo.delete(&message.id).await?;
        if let Some(key) = message.file_key {
            self.remove_files(&[key]).await;
        }

        tracing::info!(message_id = %message.id, user_id = %user.id, "Deleted message");
        Ok(())
    }

    // ==================== Helpers ====================

    /// Private groups are visible to their members only. Returns membership.
    async fn ensure_can_view(
        &self,
        viewer: &user::Model,
        group: &chat_group::Model,
    ) -> AppResult<bool> {
        let is_member = self.group_repo.is_member(&group.id, &viewer.id).await?;
        if group.is_private && !is_member && !is_admin(group, viewer) {
            return Err(AppError::Forbidden("This group is private".to_string()));
        }
        Ok(is_member)
    }

    async fn member_infos(&self, ids: &[String]) -> AppResult<Vec<MemberInfo>> {
        let users = self.user_repo.find_by_ids(ids).await?;
        Ok(ids
            .iter()
            .filter_map(|id| users.iter().find(|u| &u.id == id).map(member_info))
            .collect())
    }

    async fn message_response(
        &self,
        message: group_message::Model,
        authors: &[user::Model],
    ) -> MessageResponse {
        let file = match &message.file_key {
            Some(key) => Some(AttachmentResponse {
                url: self.storage.public_url(key),
                name: message.file_name.clone(),
                size: message.file_size,
                is_image: classify_attachment(self.storage.as_ref(), &message).await,
            }),
            None => None,
        };

        MessageResponse {
            author: authors
                .iter()
                .find(|u| u.id == message.author_id)
                .map(member_info),
            id: message.id,
            group_id: message.group_id,
            body: message.body,
            file,
            created_at: message.created_at.into(),
        }
    }

    async fn remove_files(&self, keys: &[String]) {
        for key in keys {
            if let Err(e) = self.storage.delete(key).await {
                tracing::warn!(key = %key, error = %e, "Failed to delete stored file");
            }
        }
    }
}

fn is_admin(group: &chat_group::Model, user: &user::Model) -> bool {
    group.admin_id.as_deref() == Some(user.id.as_str())
}

fn member_info(user: &user::Model) -> MemberInfo {
    MemberInfo {
        user_id: user.id.clone(),
        username: user.username.clone(),
    }
}
