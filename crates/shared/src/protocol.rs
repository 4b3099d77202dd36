use serde::{Deserialize, Serialize};

use crate::domain::ConnectionIdentity;

pub const ANALYZE_PATH: &str = "/api/analyze";
pub const EVENTS_PATH: &str = "/ws";

/// Multipart field names of a submission request.
pub mod form {
    pub const VIDEO: &str = "video";
    pub const ANALYSIS_TYPE: &str = "analysisType";
    pub const OUTPUT_LANGUAGE: &str = "outputLanguage";
    pub const SOCKET_ID: &str = "socketId";
    pub const TOTAL_BATCHES: &str = "totalBatches";
    pub const SECONDS_PER_BATCH: &str = "secondsPerBatch";
    pub const FRAME_INTERVAL: &str = "frameInterval";
}

/// Acknowledgment body returned when the service accepts a job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    pub message: String,
}

/// Out-of-band progress report for the job tied to this connection.
///
/// Shaped as `{type, message?, percent?, data?}` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    Status {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Progress {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        percent: Option<f64>,
    },
    Result {
        #[serde(default)]
        data: String,
    },
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl StreamEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::Progress { .. } => "progress",
            Self::Result { .. } => "result",
            Self::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum ServerFrame {
    Connect {
        #[serde(rename = "socketId")]
        socket_id: ConnectionIdentity,
    },
    ProgressUpdate(StreamEvent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "camelCase")]
pub enum ClientFrame {
    Ping,
}
