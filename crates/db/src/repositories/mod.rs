//! Repositories, one per aggregate.

mod group;
mod message;
mod profile;
mod user;

pub use group::GroupRepository;
pub use message::MessageRepository;
pub use profile::ProfileRepository;
pub use user::{EMAIL_TAKEN, USERNAME_TAKEN, UserRepository, normalize_email};
