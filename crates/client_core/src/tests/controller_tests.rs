use super::*;
use crate::{
    config_store::TIER_UNLOCK_THRESHOLD,
    status::{COMPLETE_MESSAGE, INITIAL_MESSAGE, UPLOADING_MESSAGE},
};

fn connected_controller() -> SessionController {
    SessionController::with_identity(Some(ConnectionIdentity::new("sock-1")))
}

fn demo_file() -> SelectedFile {
    SelectedFile::from_bytes("demo.mp4", b"video".to_vec())
}

fn started_controller() -> (SessionController, SubmissionRequest) {
    let mut controller = connected_controller();
    controller.select_file(demo_file()).expect("select");
    let request = controller.start_analysis().expect("start");
    (controller, request)
}

fn stream(controller: &mut SessionController, event: StreamEvent) {
    controller.apply_connection_event(&ConnectionEvent::Stream(event));
}

#[test]
fn select_file_resets_status_with_file_message() {
    let mut controller = connected_controller();
    controller.select_file(demo_file()).expect("select");

    let status = controller.status();
    assert_eq!(status.phase(), Phase::Idle);
    assert_eq!(status.message(), "File selected: demo.mp4. Ready to start.");
    assert_eq!(status.percent(), 0);
    assert_eq!(controller.selected_file().map(SelectedFile::name), Some("demo.mp4"));
}

#[test]
fn start_without_file_only_records_notice() {
    let mut controller = connected_controller();
    let before = controller.status().clone();

    let err = controller.start_analysis().expect_err("no file");
    assert_eq!(err, SessionError::MissingFileOrConnection);
    assert_eq!(controller.phase(), Phase::Idle);
    assert_eq!(controller.status().percent(), before.percent());
    assert_eq!(controller.status().message(), INITIAL_MESSAGE);
    assert_eq!(
        controller.status().notice(),
        Some("Please select a file and wait for server connection.")
    );
    assert_eq!(controller.attempt(), 0, "no request may be dispatched");
}

#[test]
fn start_without_identity_is_retryable_once_connected() {
    let mut controller = SessionController::new();
    controller.select_file(demo_file()).expect("select");

    assert_eq!(
        controller.start_analysis().expect_err("not connected"),
        SessionError::MissingFileOrConnection
    );
    assert_eq!(controller.phase(), Phase::Idle);

    controller.apply_connection_event(&ConnectionEvent::Connected(ConnectionIdentity::new(
        "sock-9",
    )));
    let request = controller.start_analysis().expect("retry succeeds");
    assert_eq!(request.identity, ConnectionIdentity::new("sock-9"));
    assert_eq!(controller.status().notice(), None);
}

#[test]
fn start_moves_to_uploading_and_builds_request() {
    let mut controller = connected_controller();
    controller
        .update_config(ConfigField::TotalBatches, "2")
        .expect("config");
    controller.select_file(demo_file()).expect("select");

    let request = controller.start_analysis().expect("start");
    assert_eq!(controller.phase(), Phase::Uploading);
    assert_eq!(controller.status().message(), UPLOADING_MESSAGE);
    assert_eq!(controller.status().percent(), 0);
    assert_eq!(request.attempt, 1);
    assert_eq!(request.config.total_batches, 2);
    assert_eq!(request.file.name(), "demo.mp4");
}

#[test]
fn happy_path_scenario_ends_succeeded() {
    let (mut controller, request) = started_controller();
    stream(
        &mut controller,
        StreamEvent::Status {
            message: Some("Extracting frames".into()),
        },
    );
    stream(
        &mut controller,
        StreamEvent::Progress {
            message: Some("Batch 1/3".into()),
            percent: Some(33.0),
        },
    );
    assert_eq!(controller.phase(), Phase::Running);
    controller.apply_submission(
        request.attempt,
        Ok(SubmissionAck {
            message: "Upload successful, analysis started.".into(),
        }),
    );
    assert_eq!(controller.status().percent(), 33);
    stream(
        &mut controller,
        StreamEvent::Result {
            data: "Report text".into(),
        },
    );

    let status = controller.status();
    assert_eq!(status.phase(), Phase::Succeeded);
    assert_eq!(status.percent(), 100);
    assert_eq!(status.message(), COMPLETE_MESSAGE);
    assert_eq!(status.result(), Some("Report text"));
    assert_eq!(status.error(), None);
}

#[test]
fn error_event_scenario_ends_failed() {
    let (mut controller, _request) = started_controller();
    stream(
        &mut controller,
        StreamEvent::Error {
            message: Some("Decoder crashed".into()),
        },
    );

    let status = controller.status();
    assert_eq!(status.phase(), Phase::Failed);
    assert_eq!(status.percent(), 0);
    assert_eq!(status.error(), Some("Decoder crashed"));
    assert_eq!(status.message(), "");
}

#[test]
fn result_before_acknowledgment_is_not_overwritten_by_it() {
    let (mut controller, request) = started_controller();
    stream(
        &mut controller,
        StreamEvent::Result {
            data: "Report text".into(),
        },
    );
    controller.apply_submission(
        request.attempt,
        Ok(SubmissionAck {
            message: "Upload successful".into(),
        }),
    );
    assert_eq!(controller.status().message(), COMPLETE_MESSAGE);
    assert_eq!(controller.status().result(), Some("Report text"));
}

#[test]
fn acknowledgment_never_moves_phase_or_percent() {
    let (mut controller, request) = started_controller();
    controller.apply_submission(
        request.attempt,
        Ok(SubmissionAck {
            message: "Upload successful".into(),
        }),
    );
    assert_eq!(controller.phase(), Phase::Uploading);
    assert_eq!(controller.status().percent(), 0);
    assert_eq!(controller.status().message(), "Upload successful");
}

#[test]
fn failed_submission_is_terminal_with_service_message() {
    let (mut controller, request) = started_controller();
    stream(
        &mut controller,
        StreamEvent::Progress {
            message: None,
            percent: Some(10.0),
        },
    );
    controller.apply_submission(
        request.attempt,
        Err(SubmissionError::Rejected {
            status: 400,
            message: Some("No video file uploaded.".into()),
        }),
    );

    assert_eq!(controller.phase(), Phase::Failed);
    assert_eq!(controller.status().error(), Some("No video file uploaded."));
    assert_eq!(controller.status().percent(), 0);
}

#[test]
fn stale_submission_outcome_after_reset_is_ignored() {
    let (mut controller, first) = started_controller();
    stream(
        &mut controller,
        StreamEvent::Error {
            message: Some("Decoder crashed".into()),
        },
    );
    controller.reset();
    controller.select_file(demo_file()).expect("select");
    let second = controller.start_analysis().expect("start again");
    assert_eq!(second.attempt, first.attempt + 1);

    controller.apply_submission(
        first.attempt,
        Err(SubmissionError::Rejected {
            status: 500,
            message: None,
        }),
    );
    assert_eq!(controller.phase(), Phase::Uploading);
}

#[test]
fn terminal_result_and_error_are_immutable_until_reset() {
    let (mut succeeded, _) = started_controller();
    stream(
        &mut succeeded,
        StreamEvent::Result {
            data: "Report text".into(),
        },
    );
    let (mut failed, _) = started_controller();
    stream(
        &mut failed,
        StreamEvent::Error {
            message: Some("Decoder crashed".into()),
        },
    );

    let late = [
        StreamEvent::Result {
            data: "Other report".into(),
        },
        StreamEvent::Error {
            message: Some("Other failure".into()),
        },
        StreamEvent::Progress {
            message: Some("Batch 2/3".into()),
            percent: Some(66.0),
        },
    ];
    for event in late {
        stream(&mut succeeded, event.clone());
        stream(&mut failed, event);
    }
    assert_eq!(succeeded.status().result(), Some("Report text"));
    assert_eq!(succeeded.status().error(), None);
    assert_eq!(failed.status().error(), Some("Decoder crashed"));
    assert_eq!(failed.status().result(), None);
}

#[test]
fn reset_restores_initial_state() {
    let (mut controller, _) = started_controller();
    stream(
        &mut controller,
        StreamEvent::Result {
            data: "Report text".into(),
        },
    );
    controller.reset();

    assert_eq!(controller.phase(), Phase::Idle);
    assert_eq!(controller.status(), &SessionStatus::default());
    assert_eq!(controller.status().percent(), 0);
    assert_eq!(controller.status().result(), None);
    assert_eq!(controller.status().error(), None);
    assert!(controller.selected_file().is_none());
}

#[test]
fn in_flight_session_rejects_mutating_actions() {
    let (mut controller, _) = started_controller();
    assert_eq!(controller.select_file(demo_file()), Err(SessionError::Busy));
    assert_eq!(
        controller.update_config(ConfigField::TotalBatches, "1").map(|_| ()),
        Err(SessionError::Busy)
    );
    assert_eq!(controller.activate_tier_signal(), Err(SessionError::Busy));
    assert_eq!(controller.start_analysis().map(|_| ()), Err(SessionError::Busy));
    assert_eq!(controller.phase(), Phase::Uploading);
}

#[test]
fn reset_mid_flight_abandons_the_attempt() {
    let (mut controller, request) = started_controller();
    stream(
        &mut controller,
        StreamEvent::Progress {
            message: Some("Batch 1/3".into()),
            percent: Some(33.0),
        },
    );
    controller.reset();
    assert_eq!(controller.phase(), Phase::Idle);
    assert_eq!(controller.status(), &SessionStatus::default());
    assert!(controller.selected_file().is_none());

    controller.apply_submission(
        request.attempt,
        Ok(SubmissionAck {
            message: "Upload successful".into(),
        }),
    );
    stream(
        &mut controller,
        StreamEvent::Progress {
            message: Some("Batch 2/3".into()),
            percent: Some(66.0),
        },
    );
    stream(
        &mut controller,
        StreamEvent::Result {
            data: "Report text".into(),
        },
    );
    assert_eq!(controller.status(), &SessionStatus::default());
}

#[test]
fn start_from_terminal_phase_requires_reset() {
    let (mut succeeded, _) = started_controller();
    stream(
        &mut succeeded,
        StreamEvent::Result {
            data: "Report text".into(),
        },
    );
    let (mut failed, _) = started_controller();
    stream(
        &mut failed,
        StreamEvent::Error {
            message: Some("Decoder crashed".into()),
        },
    );

    for controller in [&mut succeeded, &mut failed] {
        let attempt = controller.attempt();
        let before = controller.status().clone();
        assert_eq!(
            controller.start_analysis().map(|_| ()),
            Err(SessionError::NeedsReset)
        );
        assert_eq!(controller.status(), &before);
        assert_eq!(controller.attempt(), attempt);
    }
    assert_eq!(succeeded.status().result(), Some("Report text"));
    assert_eq!(failed.status().error(), Some("Decoder crashed"));

    failed.reset();
    failed.select_file(demo_file()).expect("select");
    assert!(failed.start_analysis().is_ok());
}

#[test]
fn selecting_a_file_after_failure_allows_a_new_start() {
    let (mut controller, first) = started_controller();
    controller.apply_submission(
        first.attempt,
        Err(SubmissionError::Rejected {
            status: 400,
            message: None,
        }),
    );
    assert_eq!(controller.phase(), Phase::Failed);

    controller.select_file(demo_file()).expect("select after failure");
    assert_eq!(controller.status().error(), None);
    let second = controller.start_analysis().expect("start again");
    assert_eq!(second.attempt, first.attempt + 1);
}

#[test]
fn disconnect_mid_analysis_orphans_the_attempt() {
    let (mut controller, _) = started_controller();
    controller.apply_connection_event(&ConnectionEvent::Disconnected);

    assert_eq!(controller.identity(), None);
    assert_eq!(controller.phase(), Phase::Failed);
    assert_eq!(controller.status().error(), Some(CONNECTION_LOST_MESSAGE));

    controller.apply_connection_event(&ConnectionEvent::Connected(ConnectionIdentity::new(
        "sock-2",
    )));
    assert_eq!(controller.phase(), Phase::Failed, "reconnect does not resume");
    assert!(controller.snapshot().connected);
}

#[test]
fn disconnect_while_idle_only_drops_identity() {
    let mut controller = connected_controller();
    controller.select_file(demo_file()).expect("select");
    controller.apply_connection_event(&ConnectionEvent::Disconnected);
    assert_eq!(controller.phase(), Phase::Idle);
    assert!(!controller.snapshot().connected);
}

#[test]
fn tier_signal_unlocks_through_controller() {
    let mut controller = SessionController::new();
    let unlocked: Vec<bool> = (0..TIER_UNLOCK_THRESHOLD + 1)
        .map(|_| controller.activate_tier_signal().expect("idle"))
        .collect();
    assert_eq!(unlocked.iter().filter(|u| **u).count(), 1);
    assert!(controller.config().tier_unlocked);

    controller
        .update_config(ConfigField::TotalBatches, "9")
        .expect("config");
    controller.lock_tier().expect("lock");
    assert_eq!(controller.config().total_batches, 3);
}
