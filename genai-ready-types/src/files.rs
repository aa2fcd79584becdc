use serde::{Deserialize, Serialize};

use crate::enums::{FileSource, FileState};

/// Status of a file that failed to process.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FileStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<serde_json::Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<i32>,
}

/// A file uploaded to the API.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct File {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<FileState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<FileSource>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_metadata: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<FileStatus>,
}

impl File {
    /// Reference to this file for use in a generation request.
    ///
    /// Returns `None` until the file is `ACTIVE` and both its URI and MIME
    /// type are known.
    #[must_use]
    pub fn file_data(&self) -> Option<FileData> {
        if self.state != Some(FileState::Active) {
            return None;
        }
        Some(FileData {
            file_uri: self.uri.clone()?,
            mime_type: self.mime_type.clone()?,
            display_name: self.display_name.clone(),
        })
    }
}

/// URI-based file reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    pub file_uri: String,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// List files request configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_token: Option<String>,
}

/// Response for listing files.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<File>>,
}

/// Upload file configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UploadFileConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn file_deserializes_failed_status() {
        let file: File = serde_json::from_value(json!({
            "name": "files/abc",
            "state": "FAILED",
            "error": {"code": 3, "message": "unsupported codec"}
        }))
        .unwrap();
        assert_eq!(file.state, Some(FileState::Failed));
        assert_eq!(
            file.error.and_then(|e| e.message).as_deref(),
            Some("unsupported codec")
        );
    }

    #[test]
    fn file_data_requires_active_state() {
        let mut file = File {
            uri: Some("https://example.com/files/abc".into()),
            mime_type: Some("video/mp4".into()),
            state: Some(FileState::Processing),
            ..Default::default()
        };
        assert!(file.file_data().is_none());

        file.state = Some(FileState::Active);
        let data = file.file_data().unwrap();
        assert_eq!(data.file_uri, "https://example.com/files/abc");
        assert_eq!(data.mime_type, "video/mp4");
    }

    #[test]
    fn file_data_serializes_camel_case() {
        let data = FileData {
            file_uri: "u".into(),
            mime_type: "text/plain".into(),
            display_name: None,
        };
        let value = serde_json::to_value(&data).unwrap();
        assert_eq!(value, json!({"fileUri": "u", "mimeType": "text/plain"}));
    }
}
