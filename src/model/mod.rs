use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use time::OffsetDateTime;
use uuid::Uuid;

mod attachment;

pub use attachment::{Attachment, DEFAULT_MIME, AttachmentKind, DataUri, DataUriError};

/// Identifier assigned once when a note is created and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(Uuid);

impl NoteId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First eight hex digits, enough to tell notes apart on screen.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for NoteId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum NoteKind {
    #[default]
    Text,
    Handwriting,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Template {
    #[default]
    Basic,
    Lined,
    Grid,
    Chalkboard,
}

impl Template {
    pub fn next(self) -> Self {
        match self {
            Template::Basic => Template::Lined,
            Template::Lined => Template::Grid,
            Template::Grid => Template::Chalkboard,
            Template::Chalkboard => Template::Basic,
        }
    }
}

/// A single memo as it is persisted under the `memos` key.
///
/// `content` holds rich-text markup for [`NoteKind::Text`] notes and a bitmap
/// data URI for [`NoteKind::Handwriting`] notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(default)]
    pub id: NoteId,
    pub title: String,
    #[serde(rename = "type", default)]
    pub kind: NoteKind,
    #[serde(default)]
    pub template: Template,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub is_locked: bool,
    #[serde(with = "time::serde::rfc3339", default = "unix_epoch")]
    pub created_at: OffsetDateTime,
    #[serde(default)]
    pub view_count: u64,
}

impl Note {
    pub fn has_attachments(&self) -> bool {
        !self.attachments.is_empty()
    }

    pub fn is_handwriting(&self) -> bool {
        matches!(self.kind, NoteKind::Handwriting)
    }
}

fn unix_epoch() -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_legacy_record_without_id() -> anyhow::Result<()> {
        let raw = r#"{
            "title": "Groceries",
            "template": "lined",
            "type": "text",
            "isFavorite": true,
            "isLocked": false,
            "content": "<b>milk</b>",
            "attachments": [],
            "createdAt": "2024-03-05T10:15:30.123Z",
            "viewCount": 3
        }"#;
        let note: Note = serde_json::from_str(raw)?;
        assert_eq!(note.title, "Groceries");
        assert_eq!(note.template, Template::Lined);
        assert_eq!(note.kind, NoteKind::Text);
        assert!(note.is_favorite);
        assert_eq!(note.view_count, 3);
        assert_eq!(note.created_at.year(), 2024);
        Ok(())
    }

    #[test]
    fn missing_optional_fields_default() -> anyhow::Result<()> {
        let raw = r#"{"title": "Sketch", "type": "handwriting", "createdAt": "2024-01-01T00:00:00Z"}"#;
        let note: Note = serde_json::from_str(raw)?;
        assert!(note.is_handwriting());
        assert_eq!(note.view_count, 0);
        assert!(note.attachments.is_empty());
        assert_eq!(note.template, Template::Basic);
        Ok(())
    }

    #[test]
    fn serializes_with_camel_case_field_names() -> anyhow::Result<()> {
        let note = Note {
            id: NoteId::new(),
            title: "t".into(),
            kind: NoteKind::Handwriting,
            template: Template::Chalkboard,
            content: String::new(),
            attachments: Vec::new(),
            is_favorite: false,
            is_locked: true,
            created_at: OffsetDateTime::UNIX_EPOCH,
            view_count: 0,
        };
        let value = serde_json::to_value(&note)?;
        assert_eq!(value["type"], "handwriting");
        assert_eq!(value["template"], "chalkboard");
        assert_eq!(value["isLocked"], true);
        assert_eq!(value["createdAt"], "1970-01-01T00:00:00Z");
        assert!(value.get("viewCount").is_some());
        Ok(())
    }

    #[test]
    fn template_parsing_is_case_insensitive() {
        assert_eq!("Grid".parse::<Template>().ok(), Some(Template::Grid));
        assert_eq!(Template::Chalkboard.next(), Template::Basic);
    }
}
