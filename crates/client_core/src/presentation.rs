//! Pure projection from a session snapshot to what a front end displays.

use serde::Serialize;

use crate::{config_store::EXTENDED_LIMITS, controller::SessionSnapshot, status::Phase};

pub const APP_TITLE: &str = "VIDEOII";
pub const APP_SUBTITLE: &str = "Smart Video Analysis Platform";
pub const FILE_PLACEHOLDER: &str = "Choose a video file...";
pub const START_LABEL: &str = "Start Analysis";
pub const BUSY_LABEL: &str = "Analyzing...";
pub const RESET_LABEL: &str = "Start New Analysis";
pub const UNLOCK_ANNOUNCEMENT: &str = "Super Mode Activated! You can now select extended limits.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewModel {
    pub title: String,
    pub show_configuration: bool,
    pub inputs_enabled: bool,
    pub batches_label: String,
    pub seconds_label: String,
    pub file_label: String,
    pub start_label: &'static str,
    pub start_enabled: bool,
    pub show_progress: bool,
    pub percent: u8,
    pub message: String,
    pub notice: Option<String>,
    pub error: Option<String>,
    pub result: Option<String>,
    pub show_reset: bool,
}

impl ViewModel {
    pub fn project(snapshot: &SessionSnapshot) -> Self {
        let status = &snapshot.status;
        let phase = status.phase();
        let in_flight = phase.is_in_flight();
        let unlocked = snapshot.config.tier_unlocked;
        let show_progress = in_flight || matches!(phase, Phase::Succeeded | Phase::Failed);

        Self {
            title: if unlocked {
                format!("{APP_TITLE} (Super Mode)")
            } else {
                APP_TITLE.to_string()
            },
            show_configuration: status.result().is_none() && status.error().is_none(),
            inputs_enabled: !in_flight,
            batches_label: ceiling_label(
                "Total Batches",
                unlocked,
                EXTENDED_LIMITS.batch_ceiling,
            ),
            seconds_label: ceiling_label(
                "Seconds per Batch",
                unlocked,
                EXTENDED_LIMITS.seconds_ceiling,
            ),
            file_label: snapshot
                .file_name
                .clone()
                .unwrap_or_else(|| FILE_PLACEHOLDER.to_string()),
            start_label: if in_flight { BUSY_LABEL } else { START_LABEL },
            start_enabled: !in_flight && !phase.is_terminal() && snapshot.file_name.is_some(),
            show_progress,
            percent: status.percent(),
            message: status.message().to_string(),
            notice: status.notice().map(str::to_string),
            error: status.error().map(str::to_string),
            result: status.result().map(str::to_string),
            show_reset: show_progress && !in_flight,
        }
    }
}

fn ceiling_label(base: &str, unlocked: bool, ceiling: u32) -> String {
    if unlocked {
        format!("{base} (Max {ceiling})")
    } else {
        base.to_string()
    }
}

/// Text progress bar, e.g. `[#####-----]  50%`.
pub fn progress_bar(percent: u8, width: usize) -> String {
    let filled = (usize::from(percent.min(100)) * width) / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        "-".repeat(width - filled),
        percent.min(100)
    )
}

#[cfg(test)]
mod tests {
    use shared::protocol::StreamEvent;

    use super::*;
    use crate::{config_store::JobConfiguration, status::SessionStatus};

    fn snapshot(status: SessionStatus, file_name: Option<&str>) -> SessionSnapshot {
        SessionSnapshot {
            config: JobConfiguration::default(),
            file_name: file_name.map(str::to_string),
            file_size_bytes: None,
            connected: true,
            status,
        }
    }

    #[test]
    fn idle_without_file_disables_start() {
        let view = ViewModel::project(&snapshot(SessionStatus::default(), None));
        assert_eq!(view.title, APP_TITLE);
        assert!(view.show_configuration);
        assert!(view.inputs_enabled);
        assert!(!view.start_enabled);
        assert_eq!(view.file_label, FILE_PLACEHOLDER);
        assert!(!view.show_progress);
        assert!(!view.show_reset);
    }

    #[test]
    fn in_flight_locks_inputs_and_hides_reset() {
        let view = ViewModel::project(&snapshot(SessionStatus::uploading(), Some("demo.mp4")));
        assert!(view.show_configuration);
        assert!(!view.inputs_enabled);
        assert!(!view.start_enabled);
        assert_eq!(view.start_label, BUSY_LABEL);
        assert!(view.show_progress);
        assert!(!view.show_reset);
    }

    #[test]
    fn terminal_result_shows_report_and_reset() {
        let done = SessionStatus::uploading().fold(&StreamEvent::Result {
            data: "Report text".into(),
        });
        let view = ViewModel::project(&snapshot(done, Some("demo.mp4")));
        assert!(!view.show_configuration);
        assert!(!view.start_enabled);
        assert!(view.show_progress);
        assert!(view.show_reset);
        assert_eq!(view.percent, 100);
        assert_eq!(view.result.as_deref(), Some("Report text"));
    }

    #[test]
    fn notice_keeps_configuration_usable() {
        let status = SessionStatus::default().with_notice("Please select a file.");
        let view = ViewModel::project(&snapshot(status, None));
        assert!(view.show_configuration);
        assert!(view.inputs_enabled);
        assert!(!view.show_reset);
        assert_eq!(view.notice.as_deref(), Some("Please select a file."));
    }

    #[test]
    fn unlocked_tier_changes_title_and_labels() {
        let mut snap = snapshot(SessionStatus::default(), None);
        snap.config.tier_unlocked = true;
        let view = ViewModel::project(&snap);
        assert_eq!(view.title, "VIDEOII (Super Mode)");
        assert_eq!(view.batches_label, "Total Batches (Max 10)");
        assert_eq!(view.seconds_label, "Seconds per Batch (Max 600)");
    }

    #[test]
    fn progress_bar_scales_to_width() {
        assert_eq!(progress_bar(0, 10), "[----------]   0%");
        assert_eq!(progress_bar(50, 10), "[#####-----]  50%");
        assert_eq!(progress_bar(100, 4), "[####] 100%");
    }
}
