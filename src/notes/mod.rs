//! Timestamped notes attached to a video.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

mod store;

pub use store::NoteStore;

/// A note kept alongside a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// UUID v4
    pub id: String,
    pub video_id: Option<String>,
    pub content: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial note update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteUpdate {
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl NoteUpdate {
    /// Names of the fields this update touches (for the audit log).
    pub fn changed_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.content.is_some() {
            fields.push("content");
        }
        if self.tags.is_some() {
            fields.push("tags");
        }
        fields.push("updatedAt");
        fields
    }
}

/// Tags as sent by clients: either a JSON array or a comma-separated string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TagsInput {
    List(Vec<String>),
    Csv(String),
    Other(serde_json::Value),
}

impl TagsInput {
    /// Normalizes to a list; anything that is not a list or string yields no tags.
    pub fn into_tags(self) -> Vec<String> {
        match self {
            TagsInput::List(tags) => tags,
            TagsInput::Csv(csv) => csv
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            TagsInput::Other(_) => Vec::new(),
        }
    }
}
