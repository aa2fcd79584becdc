use serde::{Deserialize, Serialize};

/// Processing state of an uploaded file.
///
/// Values the service adds later decode as [`FileState::StateUnspecified`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileState {
    #[serde(alias = "STATE_PROCESSING")]
    Processing,
    #[serde(alias = "STATE_ACTIVE")]
    Active,
    #[serde(alias = "STATE_FAILED")]
    Failed,
    #[serde(other)]
    StateUnspecified,
}

/// File source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileSource {
    SourceUnspecified,
    Uploaded,
    Generated,
}
