//! Profile service.

use chrono::Utc;
use mentorconnect_common::{
    AppError, AppResult, FileUpload, StorageNamespace, StorageService, generate_storage_key,
};
use mentorconnect_db::{
    entities::{
        profile::{self, UserRole, WorkingStatus},
        user,
    },
    repositories::{ProfileRepository, UserRepository},
};
use sea_orm::{IntoActiveModel, Set};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use super::message::{MAX_FILE_SIZE, is_image};

/// Avatar shown when a profile has no picture.
pub const DEFAULT_AVATAR: &str = "/static/images/avatar.png";

/// Accepted avatar extensions.
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["jpg", "jpeg", "png", "gif"];

/// Accepted resume extensions.
pub const ALLOWED_DOCUMENT_TYPES: &[&str] = &["pdf", "doc", "docx"];

/// Profile as shown to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    pub user_id: String,
    pub username: String,
    pub role: UserRole,
    /// Display name, or the username when unset.
    pub name: String,
    pub display_name: Option<String>,
    pub avatar_url: String,
    pub info: Option<String>,
    pub phone_number: Option<String>,
    pub working_status: Option<WorkingStatus>,
    pub organization: Option<String>,
    pub designation: Option<String>,
    pub linkedin_url: Option<String>,
    pub github_url: Option<String>,
    pub resume_url: Option<String>,
    pub terms_accepted: bool,
}

/// Profile edit form.
///
/// Every text field replaces the stored value; blank strings clear it.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct EditProfileInput {
    #[validate(length(max = 20, message = "Ensure this value has at most 20 characters."))]
    pub display_name: Option<String>,

    pub info: Option<String>,

    #[validate(length(max = 15, message = "Ensure this value has at most 15 characters."))]
    pub phone_number: Option<String>,

    pub working_status: Option<WorkingStatus>,

    #[validate(length(max = 100, message = "Ensure this value has at most 100 characters."))]
    pub organization: Option<String>,

    #[validate(length(max = 100, message = "Ensure this value has at most 100 characters."))]
    pub designation: Option<String>,

    #[validate(
        url(message = "Enter a valid URL."),
        length(max = 200, message = "Ensure this value has at most 200 characters.")
    )]
    pub linkedin_url: Option<String>,

    #[validate(
        url(message = "Enter a valid URL."),
        length(max = 200, message = "Ensure this value has at most 200 characters.")
    )]
    pub github_url: Option<String>,

    #[serde(default)]
    pub terms_accepted: bool,
}

impl EditProfileInput {
    fn normalized(self) -> Self {
        Self {
            display_name: non_blank(self.display_name),
            info: non_blank(self.info),
            phone_number: non_blank(self.phone_number),
            working_status: self.working_status,
            organization: non_blank(self.organization),
            designation: non_blank(self.designation),
            linkedin_url: non_blank(self.linkedin_url),
            github_url: non_blank(self.github_url),
            terms_accepted: self.terms_accepted,
        }
    }

    fn check(&self) -> Result<(), ValidationErrors> {
        let mut errors = self.validate().err().unwrap_or_default();

        if self.working_status.is_some_and(WorkingStatus::requires_employer) {
            if self.organization.is_none() {
                errors.add(
                    "organization",
                    ValidationError::new("required")
                        .with_message("Organization is required for employed status".into()),
                );
            }
            if self.designation.is_none() {
                errors.add(
                    "designation",
                    ValidationError::new("required")
                        .with_message("Designation is required for employed status".into()),
                );
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn check_extension(
    errors: &mut ValidationErrors,
    field: &'static str,
    file: &FileUpload,
    allowed: &[&str],
) -> bool {
    let ok = file
        .extension()
        .is_some_and(|ext| allowed.contains(&ext.as_str()));
    if !ok {
        errors.add(
            field,
            ValidationError::new("invalid_extension").with_message(
                format!("Unsupported file type. Allowed: {}", allowed.join(", ")).into(),
            ),
        );
    }
    ok
}

fn check_size(errors: &mut ValidationErrors, field: &'static str, file: &FileUpload) {
    if file.size() > MAX_FILE_SIZE {
        errors.add(
            field,
            ValidationError::new("file_size")
                .with_message("Please keep filesize under 10 MB".into()),
        );
    }
}

/// Profile service.
#[derive(Clone)]
pub struct ProfileService {
    profile_repo: ProfileRepository,
    user_repo: UserRepository,
    storage: StorageService,
}

impl ProfileService {
    /// Create a new profile service.
    #[must_use]
    pub const fn new(
        profile_repo: ProfileRepository,
        user_repo: UserRepository,
        storage: StorageService,
    ) -> Self {
        Self {
            profile_repo,
            user_repo,
            storage,
        }
    }

    /// Create the profile of `user_id` if it has none, then return it.
    ///
    /// An existing profile is returned unchanged, whatever its role.
    pub async fn ensure_profile(&self, user_id: &str, role: UserRole) -> AppResult<profile::Model> {
        if self.profile_repo.create_if_absent(user_id, role).await? {
            tracing::info!(user_id = %user_id, role = ?role, "Created profile");
        }

        self.profile_repo
            .find_by_user_id(user_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Profile for user {user_id}")))
    }

    /// Profile of `user`, created as a MENTEE profile when missing.
    pub async fn get_or_create(&self, user: &user::Model) -> AppResult<ProfileView> {
        let profile = match self.profile_repo.find_by_user_id(&user.id).await? {
            Some(profile) => profile,
            None => self.ensure_profile(&user.id, UserRole::default()).await?,
        };
        Ok(self.view(user, &profile))
    }

    /// Public profile lookup.
    pub async fn by_username(&self, username: &str) -> AppResult<ProfileView> {
        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User not found: {username}")))?;

        self.get_or_create(&user).await
    }

    /// Mentor profiles, newest first.
    pub async fn list_mentors(&self, limit: u64, offset: u64) -> AppResult<Vec<ProfileView>> {
        let profiles = self
            .profile_repo
            .find_by_role(UserRole::Mentor, limit, offset)
            .await?;

        let user_ids: Vec<String> = profiles.iter().map(|p| p.user_id.clone()).collect();
        let users = self.user_repo.find_by_ids(&user_ids).await?;

        Ok(profiles
            .iter()
            .filter_map(|profile| {
                users
                    .iter()
                    .find(|u| u.id == profile.user_id)
                    .map(|user| self.view(user, profile))
            })
            .collect())
    }

    /// Validate and save a profile edit, with optional new avatar and resume.
    ///
    /// Files are only written once every field has passed validation. Files
    /// they replace are removed after the row is saved.
    pub async fn edit_profile(
        &self,
        user: &user::Model,
        input: EditProfileInput,
        avatar: Option<FileUpload>,
        resume: Option<FileUpload>,
    ) -> AppResult<ProfileView> {
        let input = input.normalized();
        let mut errors = input.check().err().unwrap_or_default();

        if let Some(file) = &avatar {
            check_size(&mut errors, "image", file);
            if check_extension(&mut errors, "image", file, ALLOWED_IMAGE_TYPES) {
                let data = file.data.clone();
                let decodes = tokio::task::spawn_blocking(move || is_image(&data))
                    .await
                    .unwrap_or(false);
                if !decodes {
                    errors.add(
                        "image",
                        ValidationError::new("invalid_image").with_message(
                            "Upload a valid image. The file you uploaded was either not an image or a corrupted image."
                                .into(),
                        ),
                    );
                }
            }
        }
        if let Some(file) = &resume {
            check_size(&mut errors, "resume", file);
            check_extension(&mut errors, "resume", file, ALLOWED_DOCUMENT_TYPES);
        }

        if !errors.is_empty() {
            return Err(AppError::InvalidForm(errors));
        }

        let current = match self.profile_repo.find_by_user_id(&user.id).await? {
            Some(profile) => profile,
            None => self.ensure_profile(&user.id, UserRole::default()).await?,
        };

        let mut stored = Vec::new();
        let new_image_key = match &avatar {
            Some(file) => Some(self.store(StorageNamespace::Avatars, user, file, &mut stored).await?),
            None => None,
        };
        let new_resume_key = match &resume {
            Some(file) => Some(self.store(StorageNamespace::Resumes, user, file, &mut stored).await?),
            None => None,
        };

        let replaced: Vec<String> = [
            new_image_key.as_ref().and(current.image_key.clone()),
            new_resume_key.as_ref().and(current.resume_key.clone()),
        ]
        .into_iter()
        .flatten()
        .collect();

        let mut model = current.into_active_model();
        model.display_name = Set(input.display_name);
        model.info = Set(input.info);
        model.phone_number = Set(input.phone_number);
        model.working_status = Set(input.working_status);
        model.organization = Set(input.organization);
        model.designation = Set(input.designation);
        model.linkedin_url = Set(input.linkedin_url);
        model.github_url = Set(input.github_url);
        model.terms_accepted = Set(input.terms_accepted);
        if let Some(key) = new_image_key {
            model.image_key = Set(Some(key));
        }
        if let Some(key) = new_resume_key {
            model.resume_key = Set(Some(key));
        }
        model.updated_at = Set(Some(Utc::now().into()));

        let updated = match self.profile_repo.update(model).await {
            Ok(updated) => updated,
            Err(e) => {
                self.remove_files(&stored).await;
                return Err(e);
            }
        };

        self.remove_files(&replaced).await;
        tracing::info!(user_id = %user.id, "Updated profile");

        Ok(self.view(user, &updated))
    }

    async fn store(
        &self,
        namespace: StorageNamespace,
        user: &user::Model,
        file: &FileUpload,
        stored: &mut Vec<String>,
    ) -> AppResult<String> {
        let key = generate_storage_key(namespace, &user.id, &file.file_name);
        let uploaded = match self.storage.upload(&key, &file.data, &file.content_type).await {
            Ok(uploaded) => uploaded,
            Err(e) => {
                self.remove_files(stored).await;
                return Err(e);
            }
        };
        stored.push(uploaded.key.clone());
        Ok(uploaded.key)
    }

    async fn remove_files(&self, keys: &[String]) {
        for key in keys {
            if let Err(e) = self.storage.delete(key).await {
                tracing::warn!(key = %key, error = %e, "Failed to delete stored file");
            }
        }
    }

    /// Build the client view of a profile.
    #[must_use]
    pub fn view(&self, user: &user::Model, profile: &profile::Model) -> ProfileView {
        ProfileView {
            user_id: user.id.clone(),
            username: user.username.clone(),
            role: profile.role,
            name: profile
                .display_name
                .clone()
                .unwrap_or_else(|| user.username.clone()),
            display_name: profile.display_name.clone(),
            avatar_url: profile
                .image_key
                .as_deref()
                .map_or_else(|| DEFAULT_AVATAR.to_string(), |key| self.storage.public_url(key)),
            info: profile.info.clone(),
            phone_number: profile.phone_number.clone(),
            working_status: profile.working_status,
            organization: profile.organization.clone(),
            designation: profile.designation.clone(),
            linkedin_url: profile.linkedin_url.clone(),
            github_url: profile.github_url.clone(),
            resume_url: profile
                .resume_key
                .as_deref()
                .map(|key| self.storage.public_url(key)),
            terms_accepted: profile.terms_accepted,
        }
    }

}
