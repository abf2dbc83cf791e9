//! Backend client contracts and the REST implementation.
//!
//! # Responsibility
//! - Define the read/write seam the autosave subsystem persists through.
//! - Define the authentication seam used by pages and the command line.
//! - Keep HTTP details inside `http`.
//!
//! # Invariants
//! - A missing saved response is `Ok(None)`, never an error.
//! - Writes are whole-blob upserts; repeating one is harmless.

use crate::auth::credentials::{CredentialError, TokenPair};
use crate::model::modules::ModuleId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod http;

pub use http::HttpApiClient;

pub type ClientResult<T> = Result<T, ClientError>;

/// Backend call failures.
#[derive(Debug)]
pub enum ClientError {
    /// Credentials missing, expired and not refreshable, or rejected.
    Unauthorized,
    /// Server answered with a non-success status.
    Status { status: u16, body: String },
    /// Connection, timeout or protocol failure.
    Transport(String),
    /// Response body did not have the expected shape.
    Decode(String),
    Credentials(CredentialError),
}

impl ClientError {
    /// Whether a later retry of the same call may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl Display for ClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "not authorized"),
            Self::Status { status, body } => write!(f, "server returned {status}: {body}"),
            Self::Transport(message) => write!(f, "request failed: {message}"),
            Self::Decode(message) => write!(f, "unexpected response: {message}"),
            Self::Credentials(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ClientError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Credentials(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CredentialError> for ClientError {
    fn from(value: CredentialError) -> Self {
        Self::Credentials(value)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Decode(value.to_string())
        } else {
            Self::Transport(value.to_string())
        }
    }
}

/// Signed-in student profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub classroom_id: Option<i64>,
    #[serde(default)]
    pub classroom_name: Option<String>,
}

impl Profile {
    /// Name shown in the page banner.
    pub fn display_name(&self) -> String {
        let full = format!("{} {}", self.first_name.trim(), self.last_name.trim());
        let full = full.trim();
        if full.is_empty() {
            self.username.clone()
        } else {
            full.to_string()
        }
    }
}

/// Read/write target for one student's module answers.
#[async_trait]
pub trait PersistenceClient: Send + Sync {
    /// Loads the saved answers blob; `Ok(None)` on first visit.
    async fn read(&self, module: ModuleId) -> ClientResult<Option<Value>>;

    /// Upserts the whole answers blob.
    async fn write(&self, module: ModuleId, answers: &Value) -> ClientResult<()>;
}

/// Authentication endpoints.
#[async_trait]
pub trait AuthClient: Send + Sync {
    /// Exchanges credentials for a token pair and stores it.
    async fn login(&self, username: &str, password: &str) -> ClientResult<TokenPair>;

    /// Resolves the acting student.
    async fn current_user(&self) -> ClientResult<Profile>;
}
