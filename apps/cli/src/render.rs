use client_core::{
    presentation::{progress_bar, ViewModel, APP_SUBTITLE},
    JobConfiguration,
};

const BAR_WIDTH: usize = 30;

/// Turns successive view models into terminal lines, emitting only what changed.
#[derive(Debug, Default)]
pub struct Renderer {
    header_done: bool,
    last_progress: Option<(u8, String)>,
    last_notice: Option<String>,
}

impl Renderer {
    pub fn update(&mut self, view: &ViewModel, config: &JobConfiguration) -> Vec<String> {
        let mut lines = Vec::new();

        if !self.header_done && view.show_progress {
            self.header_done = true;
            lines.push(format!("{} | {APP_SUBTITLE}", view.title));
            lines.push(format!("Video: {}", view.file_label));
            lines.extend(configuration_lines(view, config));
        }

        if view.notice != self.last_notice {
            if let Some(notice) = &view.notice {
                lines.push(format!("! {notice}"));
            }
            self.last_notice = view.notice.clone();
        }

        if view.show_progress {
            let progress = (view.percent, view.message.clone());
            if self.last_progress.as_ref() != Some(&progress) {
                let bar = progress_bar(view.percent, BAR_WIDTH);
                if view.message.is_empty() {
                    lines.push(bar);
                } else {
                    lines.push(format!("{bar} {}", view.message));
                }
                self.last_progress = Some(progress);
            }
        }

        lines
    }
}

pub fn configuration_lines(view: &ViewModel, config: &JobConfiguration) -> Vec<String> {
    vec![
        format!(
            "Analysis: {} | Language: {}",
            config.analysis_type.label(),
            config.output_language
        ),
        format!("{}: {}", view.batches_label, config.total_batches),
        format!("{}: {}", view.seconds_label, config.seconds_per_batch),
        format!("Frame interval (s): {}", config.frame_interval_seconds),
    ]
}

/// Final block printed once the attempt is terminal.
pub fn summary(view: &ViewModel) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(report) = &view.result {
        lines.push("Analysis Report".to_string());
        lines.push(report.clone());
    }
    if let Some(error) = &view.error {
        lines.push(format!("Error: {error}"));
    }
    lines
}
