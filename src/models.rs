use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A file picked in the browser's file input, held in memory for the session.
#[derive(Debug, Clone)]
pub struct SelectedImage {
    pub file_name: String,
    pub media_type: String,
    pub bytes: Bytes,
}

/// What the browser reported for a file-input change.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub media_type: Option<String>,
    pub bytes: Bytes,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, media_type: Option<&str>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            media_type: media_type.map(str::to_string),
            bytes: bytes.into(),
        }
    }

    pub fn is_image(&self) -> bool {
        self.media_type.as_deref().is_some_and(|t| t.starts_with("image/"))
    }
}

/// Payload of one generation attempt, captured when the attempt starts.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub image: SelectedImage,
    pub prompt: String,
    pub started_at: DateTime<Utc>,
}

/// Success body returned by the generation service.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct GenerateResponse {
    #[serde(rename = "imageUrl", default)]
    pub image_url: Option<String>,
}

impl GenerateResponse {
    /// Reads `imageUrl` from any JSON document; anything but a string counts as absent.
    pub fn from_json(value: &serde_json::Value) -> Self {
        Self {
            image_url: value.get("imageUrl").and_then(serde_json::Value::as_str).map(str::to_string),
        }
    }
}

/// JSON view of the designer state served at `/api/state`.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub preview_url: Option<String>,
    pub prompt: String,
    pub output_image: Option<String>,
    pub is_loading: bool,
    pub error: Option<String>,
}
