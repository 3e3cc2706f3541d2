use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::service::recordings::Recording;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingInfo {
    pub id: i64,
    pub filename: String,
    pub filepath: String,
    pub filesize: i64,
    pub created_at: DateTime<Utc>,
}

impl From<Recording> for RecordingInfo {
    fn from(r: Recording) -> Self {
        Self {
            id: r.id,
            filename: r.filename,
            filepath: r.filepath,
            filesize: r.filesize,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedRecording {
    pub id: i64,
    pub filename: String,
    pub filepath: String,
    pub size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub recording: UploadedRecording,
}

impl From<Recording> for UploadResponse {
    fn from(r: Recording) -> Self {
        Self {
            message: "Recording uploaded".to_string(),
            recording: UploadedRecording {
                id: r.id,
                filename: r.filename,
                filepath: r.filepath,
                size: r.filesize,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
