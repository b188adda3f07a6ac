/// Timestamp-anchored comment markers
use serde::{Deserialize, Serialize};

/// Author of a comment marker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerAuthor {
    /// Author identifier in the comment store
    pub id: String,

    /// Name shown in the hover preview
    pub display_name: String,

    /// Avatar image URL (optional)
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// A comment pinned to a position in the track
///
/// Supplied by the comment-storage collaborator; the playback engine only
/// reads markers to draw them and to seek when one is clicked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Marker {
    /// Comment identifier
    pub id: String,

    /// Position in the track, in seconds
    pub timestamp: f64,

    /// Comment text
    pub content: String,

    /// Who wrote it
    pub author: MarkerAuthor,
}

impl Marker {
    /// Create a new marker
    pub fn new(
        id: impl Into<String>,
        timestamp: f64,
        content: impl Into<String>,
        author: MarkerAuthor,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            content: content.into(),
            author,
        }
    }
}

impl MarkerAuthor {
    /// Create a new author without an avatar
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            avatar_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_collaborator_json() {
        let json = r#"{
            "id": "c1",
            "timestamp": 30.5,
            "content": "the drop!",
            "author": { "id": "u9", "displayName": "Mia", "avatarUrl": "https://cdn/a.png" }
        }"#;

        let marker: Marker = serde_json::from_str(json).unwrap();
        assert_eq!(marker.id, "c1");
        assert_eq!(marker.timestamp, 30.5);
        assert_eq!(marker.author.display_name, "Mia");
        assert_eq!(marker.author.avatar_url.as_deref(), Some("https://cdn/a.png"));
    }

    #[test]
    fn avatar_is_optional() {
        let json = r#"{ "id": "u1", "displayName": "Sam" }"#;
        let author: MarkerAuthor = serde_json::from_str(json).unwrap();
        assert_eq!(author, MarkerAuthor::new("u1", "Sam"));
    }
}
