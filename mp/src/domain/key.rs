//! Row keys for progress records
//!
//! All keys use the format: `{user_id}#{data_type}#{title_id}#{media_id}`
//! Example: `user_1#VIDEO#title_1#media_1`
//!
//! Fields are validated on construction; a field containing the delimiter
//! would make the key ambiguous, so it is rejected instead of escaped.

use std::fmt;

use crate::error::{DecodeError, ProgressError};

/// Separator between key fields
pub const KEY_DELIMITER: char = '#';

fn check_field(field: &'static str, value: String) -> Result<String, ProgressError> {
    if value.contains(KEY_DELIMITER) {
        return Err(ProgressError::InvalidKeyField { field, value });
    }
    Ok(value)
}

/// Identity of a progress record
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProgressKey {
    user_id: String,
    data_type: String,
    title_id: String,
    media_id: String,
}

impl ProgressKey {
    /// Create a key, rejecting fields that contain the delimiter
    pub fn new(
        user_id: impl Into<String>,
        data_type: impl Into<String>,
        title_id: impl Into<String>,
        media_id: impl Into<String>,
    ) -> Result<Self, ProgressError> {
        Ok(Self {
            user_id: check_field("user_id", user_id.into())?,
            data_type: check_field("data_type", data_type.into())?,
            title_id: check_field("title_id", title_id.into())?,
            media_id: check_field("media_id", media_id.into())?,
        })
    }

    /// Split a stored row key into its four fields
    pub fn parse(row_key: &str) -> Result<Self, DecodeError> {
        let parts: Vec<&str> = row_key.split(KEY_DELIMITER).collect();
        match parts.as_slice() {
            [user_id, data_type, title_id, media_id] => Ok(Self {
                user_id: user_id.to_string(),
                data_type: data_type.to_string(),
                title_id: title_id.to_string(),
                media_id: media_id.to_string(),
            }),
            _ => Err(DecodeError::MalformedRowKey(row_key.to_string())),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn data_type(&self) -> &str {
        &self.data_type
    }

    pub fn title_id(&self) -> &str {
        &self.title_id
    }

    pub fn media_id(&self) -> &str {
        &self.media_id
    }

    /// The encoded row key
    pub fn row_key(&self) -> String {
        self.to_string()
    }

    pub(crate) fn into_parts(self) -> (String, String, String, String) {
        (self.user_id, self.data_type, self.title_id, self.media_id)
    }
}

impl fmt::Display for ProgressKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{d}{}{d}{}{d}{}",
            self.user_id,
            self.data_type,
            self.title_id,
            self.media_id,
            d = KEY_DELIMITER
        )
    }
}

/// The `(user_id, data_type, title_id)` part of a key, used for prefix scans
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TitleKey {
    user_id: String,
    data_type: String,
    title_id: String,
}

impl TitleKey {
    pub fn new(
        user_id: impl Into<String>,
        data_type: impl Into<String>,
        title_id: impl Into<String>,
    ) -> Result<Self, ProgressError> {
        Ok(Self {
            user_id: check_field("user_id", user_id.into())?,
            data_type: check_field("data_type", data_type.into())?,
            title_id: check_field("title_id", title_id.into())?,
        })
    }

    /// Full key for one media item of this title
    pub fn media(&self, media_id: impl Into<String>) -> Result<ProgressKey, ProgressError> {
        ProgressKey::new(&self.user_id, &self.data_type, &self.title_id, media_id)
    }

    /// Row key prefix matching every media item of this title
    ///
    /// Ends with the delimiter so that `title_1` does not also match `title_10`.
    pub fn row_prefix(&self) -> String {
        format!(
            "{}{d}{}{d}{}{d}",
            self.user_id,
            self.data_type,
            self.title_id,
            d = KEY_DELIMITER
        )
    }
}

impl From<&ProgressKey> for TitleKey {
    fn from(key: &ProgressKey) -> Self {
        Self {
            user_id: key.user_id.clone(),
            data_type: key.data_type.clone(),
            title_id: key.title_id.clone(),
        }
    }
}
