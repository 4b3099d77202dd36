use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client,
};
use shared::{
    domain::ConnectionIdentity,
    error::ErrorBody,
    protocol::{form, AnalyzeResponse, ANALYZE_PATH},
};
use tracing::{info, warn};

use crate::{config_store::JobConfiguration, error::SubmissionError, file::SelectedFile};

/// Everything the service needs to start one attempt.
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    pub attempt: u64,
    pub config: JobConfiguration,
    pub file: SelectedFile,
    pub identity: ConnectionIdentity,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionAck {
    pub message: String,
}

#[async_trait]
pub trait AnalysisApi: Send + Sync {
    async fn submit(&self, request: SubmissionRequest) -> Result<SubmissionAck, SubmissionError>;
}

pub struct HttpAnalysisApi {
    http: Client,
    server_url: String,
}

impl HttpAnalysisApi {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_client(http: Client, server_url: impl Into<String>) -> Self {
        Self {
            http,
            server_url: server_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn build_form(request: &SubmissionRequest) -> Result<Form, SubmissionError> {
        let bytes = request.file.read_bytes().await?;
        let video = Part::bytes(bytes)
            .file_name(request.file.name().to_string())
            .mime_str(request.file.mime_type())?;
        let config = &request.config;
        Ok(Form::new()
            .part(form::VIDEO, video)
            .text(form::ANALYSIS_TYPE, config.analysis_type.as_wire())
            .text(form::OUTPUT_LANGUAGE, config.output_language.as_wire())
            .text(form::SOCKET_ID, request.identity.as_str().to_string())
            .text(form::TOTAL_BATCHES, config.total_batches.to_string())
            .text(form::SECONDS_PER_BATCH, config.seconds_per_batch.to_string())
            .text(form::FRAME_INTERVAL, config.frame_interval_seconds.to_string()))
    }
}

#[async_trait]
impl AnalysisApi for HttpAnalysisApi {
    async fn submit(&self, request: SubmissionRequest) -> Result<SubmissionAck, SubmissionError> {
        let url = format!("{}{ANALYZE_PATH}", self.server_url);
        let form = Self::build_form(&request).await?;
        info!(
            attempt = request.attempt,
            %url,
            file = request.file.name(),
            size_bytes = request.file.size_bytes(),
            "submitting video for analysis"
        );

        let response = self.http.post(&url).multipart(form).send().await?;
        let status = response.status();
        if status.is_success() {
            let body: AnalyzeResponse = response.json().await?;
            return Ok(SubmissionAck {
                message: body.message,
            });
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .map(|body| body.error);
        warn!(
            attempt = request.attempt,
            status = status.as_u16(),
            "analysis service rejected submission"
        );
        Err(SubmissionError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
