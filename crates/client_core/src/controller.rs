//! The session state machine.
//!
//! `SessionController` is synchronous and owns no I/O: actions return the
//! work the caller must perform (a [`SubmissionRequest`] to dispatch), and
//! asynchronous outcomes are fed back in through `apply_*`.

use serde::Serialize;
use shared::{domain::ConnectionIdentity, protocol::StreamEvent};
use tracing::{debug, info, warn};

use crate::{
    api::{SubmissionAck, SubmissionRequest},
    config_store::{ConfigField, ConfigStore, JobConfiguration},
    connection::ConnectionEvent,
    error::{SessionError, SubmissionError},
    file::SelectedFile,
    status::{Phase, SessionStatus, CONNECTION_LOST_MESSAGE},
};

/// Read-only view of everything the presentation layer renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub config: JobConfiguration,
    pub file_name: Option<String>,
    pub file_size_bytes: Option<u64>,
    pub connected: bool,
    pub status: SessionStatus,
}

#[derive(Debug, Default)]
pub struct SessionController {
    store: ConfigStore,
    file: Option<SelectedFile>,
    status: SessionStatus,
    identity: Option<ConnectionIdentity>,
    attempt: u64,
}

impl SessionController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(identity: Option<ConnectionIdentity>) -> Self {
        Self {
            identity,
            ..Self::default()
        }
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn phase(&self) -> Phase {
        self.status.phase()
    }

    pub fn config(&self) -> &JobConfiguration {
        self.store.config()
    }

    pub fn selected_file(&self) -> Option<&SelectedFile> {
        self.file.as_ref()
    }

    pub fn identity(&self) -> Option<&ConnectionIdentity> {
        self.identity.as_ref()
    }

    /// Number of the most recent attempt; 0 before the first start.
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            config: self.store.config().clone(),
            file_name: self.file.as_ref().map(|f| f.name().to_string()),
            file_size_bytes: self.file.as_ref().map(SelectedFile::size_bytes),
            connected: self.identity.is_some(),
            status: self.status.clone(),
        }
    }

    fn ensure_not_in_flight(&self) -> Result<(), SessionError> {
        if self.phase().is_in_flight() {
            return Err(SessionError::Busy);
        }
        Ok(())
    }

    pub fn select_file(&mut self, file: SelectedFile) -> Result<(), SessionError> {
        self.ensure_not_in_flight()?;
        info!(file = file.name(), size_bytes = file.size_bytes(), "video selected");
        self.status = SessionStatus::file_selected(file.name());
        self.file = Some(file);
        Ok(())
    }

    pub fn update_config(
        &mut self,
        field: ConfigField,
        raw: &str,
    ) -> Result<&JobConfiguration, SessionError> {
        self.ensure_not_in_flight()?;
        Ok(self.store.set_field(field, raw)?)
    }

    /// Feeds one activation of the hidden unlock signal to the store.
    pub fn activate_tier_signal(&mut self) -> Result<bool, SessionError> {
        self.ensure_not_in_flight()?;
        Ok(self.store.activate_tier_signal())
    }

    pub fn lock_tier(&mut self) -> Result<(), SessionError> {
        self.ensure_not_in_flight()?;
        self.store.lock_tier();
        Ok(())
    }

    /// Validates preconditions and moves to `Uploading`.
    ///
    /// A missing file or identity leaves phase and percent untouched and only
    /// records an inline notice, so the user can fix it and retry. A finished
    /// attempt keeps its outcome until reset or a new file selection.
    pub fn start_analysis(&mut self) -> Result<SubmissionRequest, SessionError> {
        self.ensure_not_in_flight()?;
        if self.phase().is_terminal() {
            return Err(SessionError::NeedsReset);
        }
        let (Some(file), Some(identity)) = (self.file.clone(), self.identity.clone()) else {
            let err = SessionError::MissingFileOrConnection;
            debug!(
                has_file = self.file.is_some(),
                connected = self.identity.is_some(),
                "start rejected"
            );
            self.status = self.status.with_notice(err.to_string());
            return Err(err);
        };

        self.attempt += 1;
        self.status = SessionStatus::uploading();
        info!(
            attempt = self.attempt,
            socket_id = %identity,
            file = file.name(),
            "analysis started"
        );
        Ok(SubmissionRequest {
            attempt: self.attempt,
            config: self.store.config().clone(),
            file,
            identity,
        })
    }

    fn is_current(&self, attempt: u64) -> bool {
        attempt == self.attempt && self.phase().is_in_flight()
    }

    pub fn apply_submission(
        &mut self,
        attempt: u64,
        outcome: Result<SubmissionAck, SubmissionError>,
    ) {
        if !self.is_current(attempt) {
            debug!(
                attempt,
                current = self.attempt,
                phase = ?self.phase(),
                "dropping stale submission outcome"
            );
            return;
        }
        match outcome {
            Ok(ack) => {
                debug!(attempt, message = %ack.message, "submission acknowledged");
                self.status = self.status.acknowledged(&ack.message);
            }
            Err(err) => {
                warn!(attempt, error = %err, "submission failed");
                self.status = SessionStatus::failed(err.display_message());
            }
        }
    }

    pub fn apply_stream_event(&mut self, event: &StreamEvent) {
        let before = self.phase();
        self.status = self.status.fold(event);
        let after = self.phase();
        if before != after {
            info!(
                attempt = self.attempt,
                kind = event.kind(),
                from = ?before,
                to = ?after,
                "phase changed"
            );
        }
    }

    pub fn apply_connection_event(&mut self, event: &ConnectionEvent) {
        match event {
            ConnectionEvent::Connected(identity) => {
                self.identity = Some(identity.clone());
            }
            ConnectionEvent::Disconnected => {
                self.identity = None;
                if self.phase().is_in_flight() {
                    warn!(attempt = self.attempt, "connection lost mid-analysis; attempt orphaned");
                    self.status = SessionStatus::failed(CONNECTION_LOST_MESSAGE);
                }
            }
            ConnectionEvent::Stream(event) => self.apply_stream_event(event),
        }
    }

    /// Returns to the initial idle state from any phase. An attempt still in
    /// flight is abandoned: its late acknowledgment and events are ignored.
    pub fn reset(&mut self) {
        if self.phase().is_in_flight() {
            info!(attempt = self.attempt, "in-flight attempt abandoned by reset");
        }
        self.file = None;
        self.status = SessionStatus::default();
        debug!(attempt = self.attempt, "session reset");
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
