//! Client side of the video analysis service: job configuration, the session
//! state machine, and the HTTP/WebSocket collaborators it is driven by.

pub mod api;
pub mod config_store;
pub mod connection;
pub mod controller;
pub mod driver;
pub mod error;
pub mod file;
pub mod presentation;
pub mod settings;
pub mod status;

pub use api::{AnalysisApi, HttpAnalysisApi, SubmissionAck, SubmissionRequest};
pub use config_store::{ConfigField, ConfigStore, JobConfiguration, TIER_UNLOCK_THRESHOLD};
pub use connection::{ConnectionEvent, ConnectionHandle, WsConnection};
pub use controller::{SessionController, SessionSnapshot};
pub use driver::{SessionDriver, UserAction};
pub use error::{ConfigError, ConnectionError, SessionError, SubmissionError};
pub use file::SelectedFile;
pub use presentation::ViewModel;
pub use settings::{load_settings, ClientSettings};
pub use status::{Phase, SessionStatus};
