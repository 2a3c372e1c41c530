//! Domain types for media progress
//!
//! A progress record is identified by `(user_id, data_type, title_id, media_id)`
//! and carries the playback offset and the time of the playback event.

mod key;
mod progress;

pub use key::{KEY_DELIMITER, ProgressKey, TitleKey};
pub use progress::{MediaProgress, data_type};
