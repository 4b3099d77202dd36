//! Displayable session status and the reducer that folds stream events into it.

use serde::Serialize;
use shared::protocol::StreamEvent;

pub const INITIAL_MESSAGE: &str = "Please select a video and configure settings to begin.";
pub const UPLOADING_MESSAGE: &str = "Uploading video...";
pub const COMPLETE_MESSAGE: &str = "Analysis complete!";
pub const REMOTE_ERROR_FALLBACK: &str = "The analysis service reported an error.";
pub const CONNECTION_LOST_MESSAGE: &str = "Lost connection to the analysis service.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Uploading,
    Running,
    Succeeded,
    Failed,
}

impl Phase {
    pub fn is_in_flight(self) -> bool {
        matches!(self, Self::Uploading | Self::Running)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

/// `result` is present iff the phase is `Succeeded`, `error` iff `Failed`.
/// Fields are private so only the transitions below can produce a status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    phase: Phase,
    message: String,
    percent: u8,
    result: Option<String>,
    error: Option<String>,
    notice: Option<String>,
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self::idle(INITIAL_MESSAGE)
    }
}

impl SessionStatus {
    pub fn idle(message: impl Into<String>) -> Self {
        Self {
            phase: Phase::Idle,
            message: message.into(),
            percent: 0,
            result: None,
            error: None,
            notice: None,
        }
    }

    pub fn file_selected(name: &str) -> Self {
        Self::idle(format!("File selected: {name}. Ready to start."))
    }

    pub fn uploading() -> Self {
        Self {
            phase: Phase::Uploading,
            message: UPLOADING_MESSAGE.to_string(),
            percent: 0,
            result: None,
            error: None,
            notice: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            phase: Phase::Failed,
            message: String::new(),
            percent: 0,
            result: None,
            error: Some(if error.trim().is_empty() {
                REMOTE_ERROR_FALLBACK.to_string()
            } else {
                error
            }),
            notice: None,
        }
    }

    pub fn succeeded(report: impl Into<String>) -> Self {
        Self {
            phase: Phase::Succeeded,
            message: COMPLETE_MESSAGE.to_string(),
            percent: 100,
            result: Some(report.into()),
            error: None,
            notice: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn result(&self) -> Option<&str> {
        self.result.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Inline validation feedback; leaves phase and percent alone.
    pub fn with_notice(&self, notice: impl Into<String>) -> Self {
        Self {
            notice: Some(notice.into()),
            ..self.clone()
        }
    }

    /// Applies the submission acknowledgment. Only the message moves.
    pub fn acknowledged(&self, message: &str) -> Self {
        if !self.phase.is_in_flight() {
            return self.clone();
        }
        Self {
            message: message.to_string(),
            notice: None,
            ..self.clone()
        }
    }

    /// Folds one stream event into the status.
    ///
    /// Idle and terminal statuses are returned unchanged: an idle session has
    /// no attempt the event could belong to, and a terminal one keeps its
    /// outcome until reset.
    pub fn fold(&self, event: &StreamEvent) -> Self {
        if !self.phase.is_in_flight() {
            return self.clone();
        }

        match event {
            StreamEvent::Status { message } => Self {
                message: message.clone().unwrap_or_else(|| self.message.clone()),
                error: None,
                notice: None,
                ..self.clone()
            },
            // Percent never regresses within an attempt; a lower value is held.
            StreamEvent::Progress { message, percent } => Self {
                phase: Phase::Running,
                message: message.clone().unwrap_or_else(|| self.message.clone()),
                percent: percent
                    .map(|value| self.percent.max(normalize_percent(value)))
                    .unwrap_or(self.percent),
                error: None,
                notice: None,
                ..self.clone()
            },
            StreamEvent::Result { data } => Self::succeeded(data.clone()),
            StreamEvent::Error { message } => Self::failed(message.clone().unwrap_or_default()),
        }
    }
}

fn normalize_percent(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
#[path = "tests/status_tests.rs"]
mod tests;
