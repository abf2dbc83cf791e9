//! Client core for the SciTrek lesson pages.
//! Owns answer storage, autosave and backend access for every lesson day.

pub mod auth;
pub mod autosave;
pub mod client;
pub mod config;
pub mod logging;
pub mod model;

pub use auth::credentials::{
    CredentialError, CredentialProvider, FileCredentialStore, MemoryCredentialStore, TokenPair,
};
pub use auth::logout::{logout, LogoutReport, Navigator, PendingWork, Route};
pub use autosave::coordinator::{
    LogNotifier, SaveCoordinator, SaveHandle, SaveNotice, SaveNotifier, SaveOutcome,
};
pub use autosave::session::{Hydration, ModuleSession};
pub use autosave::state::{DirtyState, SaveState, SaveStatus};
pub use autosave::trigger::{SaveOptions, SaveTrigger};
pub use autosave::visibility::Visibility;
pub use client::{
    AuthClient, ClientError, ClientResult, HttpApiClient, PersistenceClient, Profile,
};
pub use config::{AppConfig, AutosaveConfig, ClientConfig, ConfigError};
pub use logging::{default_log_level, init_logging, logging_status, LogSettings, LoggingError};
pub use model::answers::{progress_percent, AnswerError, AnswerShape, AnswerStore};
pub use model::modules::{
    Day1Answers, Day2Answers, Day3Answers, Day4Answers, Day5Answers, ModuleId,
};
pub use model::path::{FieldPath, PathError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
