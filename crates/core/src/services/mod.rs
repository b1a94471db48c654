//! Business logic services.

#![allow(missing_docs)]

pub mod account;
pub mod chat;
pub mod email;
pub mod message;
pub mod profile;
pub mod registration;

pub use account::{AccountService, ChangeEmailInput};
pub use chat::{
    AttachmentResponse, ChatService, CreateGroupInput, GroupResponse, MemberInfo,
    MessageResponse, SendMessageInput,
};
pub use email::{EmailMessage, EmailService};
pub use message::{
    MAX_BODY_CHARS, MAX_FILE_SIZE, classify_attachment, decode_image, is_image, validate_message,
};
pub use profile::{DEFAULT_AVATAR, EditProfileInput, ProfileService, ProfileView};
pub use registration::{LoginInput, RegisterInput, RegisteredAccount, RegistrationService};
