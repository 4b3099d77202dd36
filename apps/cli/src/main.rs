mod render;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{bail, Context, Result};
use clap::Parser;
use client_core::{
    load_settings, ConfigField, HttpAnalysisApi, SelectedFile, SessionDriver, UserAction,
    ViewModel, WsConnection, TIER_UNLOCK_THRESHOLD,
};
use shared::domain::{AnalysisType, OutputLanguage};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::render::Renderer;

#[derive(Parser, Debug)]
#[command(name = "videoii", about = "Submit a video for analysis and follow its progress")]
struct Args {
    /// Video file to analyse.
    file: PathBuf,
    #[arg(long)]
    server_url: Option<String>,
    /// `meeting` or `general`.
    #[arg(long)]
    analysis_type: Option<AnalysisType>,
    /// `Turkish` or `English`.
    #[arg(long)]
    language: Option<OutputLanguage>,
    #[arg(long)]
    batches: Option<i64>,
    #[arg(long)]
    seconds: Option<i64>,
    #[arg(long)]
    frame_interval: Option<i64>,
    /// Unlock the extended batch and duration limits.
    #[arg(long)]
    extended: bool,
    #[arg(long, default_value_t = 15)]
    connect_timeout_secs: u64,
    /// Print the final view as JSON instead of progress lines.
    #[arg(long)]
    json: bool,
}

impl Args {
    fn actions(&self, file: SelectedFile) -> Vec<UserAction> {
        let mut actions = Vec::new();
        if self.extended {
            actions.extend((0..TIER_UNLOCK_THRESHOLD).map(|_| UserAction::ActivateTierSignal));
        }
        let updates = [
            (ConfigField::AnalysisType, self.analysis_type.map(|v| v.to_string())),
            (ConfigField::OutputLanguage, self.language.map(|v| v.to_string())),
            (ConfigField::TotalBatches, self.batches.map(|v| v.to_string())),
            (ConfigField::SecondsPerBatch, self.seconds.map(|v| v.to_string())),
            (ConfigField::FrameInterval, self.frame_interval.map(|v| v.to_string())),
        ];
        actions.extend(
            updates
                .into_iter()
                .filter_map(|(field, raw)| raw.map(|raw| UserAction::UpdateConfig { field, raw })),
        );
        actions.push(UserAction::SelectFile(file));
        actions.push(UserAction::Start);
        actions
    }
}

enum Outcome {
    Finished(ViewModel),
    Rejected(String),
    Stopped,
    Interrupted,
}

enum Wake {
    Changed,
    Closed,
    Interrupted,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(server_url) = &args.server_url {
        settings.server_url = server_url.clone();
    }

    let file = SelectedFile::from_path(&args.file).await?;
    let connection = WsConnection::spawn(&settings)
        .with_context(|| format!("invalid server url {}", settings.server_url))?;
    let identity = tokio::time::timeout(
        Duration::from_secs(args.connect_timeout_secs),
        connection.wait_for_identity(),
    )
    .await
    .context("timed out waiting for the analysis service connection")??;
    info!(socket_id = %identity, url = %settings.server_url, "connected to analysis service");

    let api = Arc::new(HttpAnalysisApi::new(settings.server_url.clone()));
    let driver = SessionDriver::new(api, connection.clone());
    let mut snapshots = driver.subscribe();
    let (actions, actions_rx) = mpsc::channel(32);
    let driver_task = tokio::spawn(driver.run(actions_rx));

    for action in args.actions(file) {
        actions
            .send(action)
            .await
            .context("session driver stopped before the analysis started")?;
    }

    let mut renderer = Renderer::default();
    let outcome = loop {
        let snapshot = snapshots.borrow_and_update().clone();
        let view = ViewModel::project(&snapshot);
        if !args.json {
            for line in renderer.update(&view, &snapshot.config) {
                println!("{line}");
            }
        }
        if snapshot.status.phase().is_terminal() {
            break Outcome::Finished(view);
        }
        if let Some(notice) = view.notice {
            break Outcome::Rejected(notice);
        }

        let wake = tokio::select! {
            changed = snapshots.changed() => match changed {
                Ok(()) => Wake::Changed,
                Err(_) => Wake::Closed,
            },
            _ = tokio::signal::ctrl_c() => Wake::Interrupted,
        };
        match wake {
            Wake::Changed => {}
            Wake::Closed => break Outcome::Stopped,
            Wake::Interrupted => break Outcome::Interrupted,
        }
    };

    if let Outcome::Interrupted = outcome {
        let _ = actions.send(UserAction::Reset).await;
    }
    drop(actions);
    driver_task.await.context("session driver panicked")?;
    connection.shutdown();

    match outcome {
        Outcome::Finished(view) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&view)?);
            } else {
                for line in render::summary(&view) {
                    println!("{line}");
                }
            }
            if let Some(error) = view.error {
                bail!("analysis failed: {error}");
            }
            Ok(())
        }
        Outcome::Rejected(notice) => bail!(notice),
        Outcome::Stopped => bail!("session driver stopped unexpectedly"),
        Outcome::Interrupted => {
            warn!("interrupted; session reset locally, the analysis service is not notified");
            bail!("analysis interrupted")
        }
    }
}
