//! Core business logic for mentorconnect.
//!
//! Services sit between the HTTP layer and the repositories:
//!
//! - [`ChatService`]: groups, membership, presence and messages
//! - [`RegistrationService`]: sign-up with a role, login, token lookup
//! - [`ProfileService`]: profile views and edits with avatar/resume uploads
//! - [`AccountService`]: email changes, verification and account deletion

pub mod services;

pub use services::*;
