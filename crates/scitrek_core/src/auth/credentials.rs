//! Injectable credential storage.
//!
//! # Responsibility
//! - Hold the access/refresh token pair for the signed-in student.
//! - Replace ambient token storage with an explicit provider seam.
//!
//! # Invariants
//! - `clear()` removes both tokens.
//! - Token values are never logged.

use log::{info, warn};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

/// JWT pair issued by the token endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

/// Credential storage failures.
#[derive(Debug)]
pub enum CredentialError {
    Io { path: PathBuf, source: std::io::Error },
    Corrupt { path: PathBuf, message: String },
}

impl Display for CredentialError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "credential file `{}` failed: {source}", path.display())
            }
            Self::Corrupt { path, message } => {
                write!(f, "credential file `{}` is corrupt: {message}", path.display())
            }
        }
    }
}

impl Error for CredentialError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Corrupt { .. } => None,
        }
    }
}

/// Token storage used by the API client and the logout flow.
pub trait CredentialProvider: Send + Sync {
    fn access_token(&self) -> Option<String>;
    fn refresh_token(&self) -> Option<String>;
    fn set_tokens(&self, tokens: TokenPair) -> Result<(), CredentialError>;
    /// Replaces only the access token after a refresh.
    fn set_access_token(&self, access: String) -> Result<(), CredentialError>;
    fn clear(&self) -> Result<(), CredentialError>;
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct StoredTokens {
    access: Option<String>,
    refresh: Option<String>,
}

/// Process-local credential store.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    tokens: Mutex<StoredTokens>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tokens(tokens: TokenPair) -> Self {
        Self {
            tokens: Mutex::new(StoredTokens {
                access: Some(tokens.access),
                refresh: Some(tokens.refresh),
            }),
        }
    }
}

impl CredentialProvider for MemoryCredentialStore {
    fn access_token(&self) -> Option<String> {
        self.tokens.lock().access.clone()
    }

    fn refresh_token(&self) -> Option<String> {
        self.tokens.lock().refresh.clone()
    }

    fn set_tokens(&self, tokens: TokenPair) -> Result<(), CredentialError> {
        let mut stored = self.tokens.lock();
        stored.access = Some(tokens.access);
        stored.refresh = Some(tokens.refresh);
        Ok(())
    }

    fn set_access_token(&self, access: String) -> Result<(), CredentialError> {
        self.tokens.lock().access = Some(access);
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        *self.tokens.lock() = StoredTokens::default();
        Ok(())
    }
}

/// JSON-file credential store for command-line sessions.
///
/// The file is rewritten on every change and removed by `clear()`.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    tokens: Mutex<StoredTokens>,
}

impl FileCredentialStore {
    /// Opens the store, loading existing tokens when the file exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CredentialError> {
        let path = path.as_ref().to_path_buf();
        let tokens = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str::<StoredTokens>(&raw).map_err(|err| {
                CredentialError::Corrupt {
                    path: path.clone(),
                    message: err.to_string(),
                }
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => StoredTokens::default(),
            Err(source) => return Err(CredentialError::Io { path, source }),
        };

        Ok(Self {
            path,
            tokens: Mutex::new(tokens),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, tokens: &StoredTokens) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| CredentialError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let raw = serde_json::to_string(tokens).map_err(|err| CredentialError::Corrupt {
            path: self.path.clone(),
            message: err.to_string(),
        })?;
        std::fs::write(&self.path, raw).map_err(|source| CredentialError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl CredentialProvider for FileCredentialStore {
    fn access_token(&self) -> Option<String> {
        self.tokens.lock().access.clone()
    }

    fn refresh_token(&self) -> Option<String> {
        self.tokens.lock().refresh.clone()
    }

    fn set_tokens(&self, tokens: TokenPair) -> Result<(), CredentialError> {
        let mut stored = self.tokens.lock();
        let next = StoredTokens {
            access: Some(tokens.access),
            refresh: Some(tokens.refresh),
        };
        self.persist(&next)?;
        *stored = next;
        info!("event=credentials_store module=auth status=ok mode=file");
        Ok(())
    }

    fn set_access_token(&self, access: String) -> Result<(), CredentialError> {
        let mut stored = self.tokens.lock();
        let next = StoredTokens {
            access: Some(access),
            refresh: stored.refresh.clone(),
        };
        self.persist(&next)?;
        *stored = next;
        Ok(())
    }

    fn clear(&self) -> Result<(), CredentialError> {
        let mut stored = self.tokens.lock();
        *stored = StoredTokens::default();
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(source) => {
                warn!(
                    "event=credentials_clear module=auth status=error mode=file error_code=remove_failed"
                );
                return Err(CredentialError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        }
        info!("event=credentials_clear module=auth status=ok mode=file");
        Ok(())
    }
}
