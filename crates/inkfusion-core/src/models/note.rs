//! Server note model

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

use super::attachment::SavedMedia;

/// Server-assigned note identity (`_id`).
///
/// Always non-empty; an empty `_id` in a server payload fails to decode.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NoteId(String);

impl NoteId {
    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for NoteId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s.to_string())
    }
}

impl TryFrom<String> for NoteId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("Note id cannot be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

impl From<NoteId> for String {
    fn from(value: NoteId) -> Self {
        value.0
    }
}

/// A note as returned by the notes API.
///
/// Text fields are optional on the wire; [`crate::models::NoteDraft::from_server`]
/// applies the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerNote {
    #[serde(rename = "_id")]
    pub id: NoteId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default, deserialize_with = "deserialize_media_list")]
    pub multimedia: Vec<SavedMedia>,
}

impl ServerNote {
    /// Locators of every attachment the server holds for this note.
    #[must_use]
    pub fn media_urls(&self) -> Vec<String> {
        self.multimedia.iter().map(|media| media.url.clone()).collect()
    }
}

/// Multimedia entries arrive either as `{url, ...}` objects or as bare URLs.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawMedia {
    Locator(String),
    Object {
        url: Option<String>,
        #[serde(alias = "originalname")]
        filename: Option<String>,
        #[serde(alias = "mimetype", alias = "mimeType")]
        mime_type: Option<String>,
    },
}

impl RawMedia {
    fn into_saved(self) -> Option<SavedMedia> {
        let (url, filename, mime_type) = match self {
            Self::Locator(url) => (url, None, None),
            Self::Object {
                url,
                filename,
                mime_type,
            } => (url?, filename, mime_type),
        };
        let url = url.trim();
        if url.is_empty() {
            return None;
        }
        Some(SavedMedia {
            url: url.to_string(),
            filename,
            mime_type,
        })
    }
}

fn deserialize_media_list<'de, D>(deserializer: D) -> Result<Vec<SavedMedia>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Vec<RawMedia>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(RawMedia::into_saved)
        .collect())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn note_id_rejects_blank_values() {
        assert!("".parse::<NoteId>().is_err());
        assert!("   ".parse::<NoteId>().is_err());
        assert_eq!("abc123".parse::<NoteId>().unwrap().as_str(), "abc123");
    }

    #[test]
    fn server_note_accepts_object_and_string_media() {
        let note: ServerNote = serde_json::from_str(
            r#"{
                "_id": "65f0c0ffee",
                "title": "Groceries",
                "description": "milk",
                "tag": "Home",
                "multimedia": [
                    {"url": "https://cdn.test/a.png", "filename": "a.png", "mimetype": "image/png"},
                    "https://cdn.test/b.mp3",
                    {"url": ""},
                    {"filename": "no-url.bin"}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(note.id.as_str(), "65f0c0ffee");
        assert_eq!(
            note.media_urls(),
            vec![
                "https://cdn.test/a.png".to_string(),
                "https://cdn.test/b.mp3".to_string()
            ]
        );
        assert_eq!(note.multimedia[0].filename.as_deref(), Some("a.png"));
        assert_eq!(note.multimedia[0].mime_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn server_note_tolerates_missing_and_null_fields() {
        let note: ServerNote =
            serde_json::from_str(r#"{"_id": "n1", "title": null, "multimedia": null}"#).unwrap();
        assert_eq!(note.title, None);
        assert_eq!(note.description, None);
        assert!(note.multimedia.is_empty());
    }

    #[test]
    fn server_note_rejects_empty_identity() {
        let result = serde_json::from_str::<ServerNote>(r#"{"_id": "", "title": "x"}"#);
        assert!(result.is_err());

        let missing = serde_json::from_str::<ServerNote>(r#"{"title": "x"}"#);
        assert!(missing.is_err());
    }
}
