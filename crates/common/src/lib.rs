//! Common utilities and shared types for mentorconnect.
//!
//! This crate provides foundational components used across all mentorconnect crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID ids, short group names and tokens via [`IdGenerator`]
//! - **Storage**: Namespaced file storage (avatars, resumes, chat files)
//!
//! # Example
//!
//! ```no_run
//! use mentorconnect_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate();
//!     println!("{} -> {}", config.server.url, id);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use storage::{
    FileUpload, LocalStorage, StorageBackend, StorageNamespace, StorageService, UploadedFile,
    generate_storage_key,
};
