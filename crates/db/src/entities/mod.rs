//! Database entities.

pub mod chat_group;
pub mod chat_group_member;
pub mod chat_group_online;
pub mod group_message;
pub mod profile;
pub mod user;

pub use chat_group::Entity as ChatGroup;
pub use chat_group_member::Entity as ChatGroupMember;
pub use chat_group_online::Entity as ChatGroupOnline;
pub use group_message::Entity as GroupMessage;
pub use profile::Entity as Profile;
pub use user::Entity as User;
