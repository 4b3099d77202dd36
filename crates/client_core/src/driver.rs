//! Runs a [`SessionController`] against live collaborators.
//!
//! User actions, connection events and submission responses are multiplexed on
//! a single task, so controller state needs no locking. Submissions are polled
//! in a `FuturesUnordered` on that same task rather than spawned.

use std::sync::Arc;

use futures::{future::BoxFuture, stream::FuturesUnordered, FutureExt, StreamExt};
use tokio::sync::{broadcast::error::RecvError, mpsc, watch};
use tracing::{debug, info, warn};

use crate::{
    api::{AnalysisApi, SubmissionAck, SubmissionRequest},
    config_store::ConfigField,
    connection::{ConnectionEvent, ConnectionHandle},
    controller::{SessionController, SessionSnapshot},
    error::{SessionError, SubmissionError},
    file::SelectedFile,
};

#[derive(Debug)]
pub enum UserAction {
    SelectFile(SelectedFile),
    UpdateConfig { field: ConfigField, raw: String },
    ActivateTierSignal,
    LockTier,
    Start,
    Reset,
}

type SubmissionOutcome = (u64, Result<SubmissionAck, SubmissionError>);

pub struct SessionDriver {
    controller: SessionController,
    api: Arc<dyn AnalysisApi>,
    connection: Arc<dyn ConnectionHandle>,
    snapshots: watch::Sender<SessionSnapshot>,
}

impl SessionDriver {
    pub fn new(api: Arc<dyn AnalysisApi>, connection: Arc<dyn ConnectionHandle>) -> Self {
        let controller = SessionController::with_identity(connection.identity());
        let (snapshots, _) = watch::channel(controller.snapshot());
        Self {
            controller,
            api,
            connection,
            snapshots,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.subscribe()
    }

    /// Drives the session until the action channel closes, then hands back
    /// the controller in its final state.
    pub async fn run(mut self, mut actions: mpsc::Receiver<UserAction>) -> SessionController {
        let mut events = self.connection.subscribe();
        if let Some(identity) = self.connection.identity() {
            self.controller
                .apply_connection_event(&ConnectionEvent::Connected(identity));
        }
        self.publish();

        let mut events_open = true;
        let mut submissions: FuturesUnordered<BoxFuture<'static, SubmissionOutcome>> =
            FuturesUnordered::new();

        loop {
            tokio::select! {
                action = actions.recv() => match action {
                    Some(action) => {
                        if let Some(request) = self.handle_action(action) {
                            submissions.push(dispatch(Arc::clone(&self.api), request));
                        }
                    }
                    None => break,
                },
                event = events.recv(), if events_open => match event {
                    Ok(event) => self.controller.apply_connection_event(&event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "session driver fell behind the event stream");
                    }
                    Err(RecvError::Closed) => {
                        events_open = false;
                        self.controller.apply_connection_event(&ConnectionEvent::Disconnected);
                    }
                },
                Some((attempt, outcome)) = submissions.next(), if !submissions.is_empty() => {
                    self.controller.apply_submission(attempt, outcome);
                }
            }
            self.publish();
        }

        debug!(pending_submissions = submissions.len(), "session driver stopped");
        self.controller
    }

    fn handle_action(&mut self, action: UserAction) -> Option<SubmissionRequest> {
        let result = match action {
            UserAction::SelectFile(file) => self.controller.select_file(file),
            UserAction::UpdateConfig { field, raw } => {
                self.controller.update_config(field, &raw).map(|_| ())
            }
            UserAction::ActivateTierSignal => {
                self.controller.activate_tier_signal().map(|unlocked| {
                    if unlocked {
                        info!("extended limits unlocked by user signal");
                    }
                })
            }
            UserAction::LockTier => self.controller.lock_tier(),
            UserAction::Start => match self.controller.start_analysis() {
                Ok(request) => return Some(request),
                Err(err) => Err(err),
            },
            UserAction::Reset => {
                self.controller.reset();
                Ok(())
            }
        };
        match result {
            Ok(()) => {}
            Err(SessionError::MissingFileOrConnection) => {
                debug!("start rejected; notice shown inline");
            }
            Err(err) => warn!(error = %err, "user action rejected"),
        }
        None
    }

    fn publish(&self) {
        let next = self.controller.snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

fn dispatch(
    api: Arc<dyn AnalysisApi>,
    request: SubmissionRequest,
) -> BoxFuture<'static, SubmissionOutcome> {
    async move {
        let attempt = request.attempt;
        (attempt, api.submit(request).await)
    }
    .boxed()
}

#[cfg(test)]
#[path = "tests/driver_tests.rs"]
mod tests;
