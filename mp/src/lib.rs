//! MediaProgress - playback progress records on a wide-column store
//!
//! Stores one row per `(user_id, data_type, title_id, media_id)` and reads
//! them back singly, by key list, or by title prefix.
//!
//! # Layout
//!
//! ```text
//! table media_progress
//! └── {user_id}#{data_type}#{title_id}#{media_id}
//!     └── data
//!         ├── milliseconds   decimal text
//!         └── event_at       decimal text, Unix seconds
//! ```
//!
//! # Example
//!
//! ```ignore
//! use mediaprogress::{MediaProgress, ProgressRepository, TitleKey};
//! use widecolumn::MemoryStore;
//!
//! let repo = ProgressRepository::new(Arc::new(MemoryStore::new()));
//! repo.insert(&MediaProgress::new("user_1", "VIDEO", "title_1", "media_1", 1000, 1700000000)).await?;
//! let title = TitleKey::new("user_1", "VIDEO", "title_1")?;
//! let all = repo.read_by_partial_key(&title).await?;
//! ```

pub mod backend;
pub mod cli;
pub mod codec;
pub mod config;
pub mod domain;
mod error;
pub mod logging;
mod repository;
pub mod retry;
pub mod scenarios;

pub use config::Config;
pub use domain::{KEY_DELIMITER, MediaProgress, ProgressKey, TitleKey};
pub use error::{DecodeError, ProgressError};
pub use repository::{
    BatchReport, BatchRowResult, DEFAULT_TABLE, DEFAULT_TIMEOUT, ProgressRepository, ProgressStream,
};
