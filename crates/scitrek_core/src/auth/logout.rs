//! Logout flow.
//!
//! # Invariants
//! - A dirty page gets one save attempt before credentials are cleared.
//! - Save failure never blocks logout.
//! - Credentials are cleared before navigation.

use crate::auth::credentials::CredentialProvider;
use crate::autosave::coordinator::{SaveCoordinator, SaveOutcome};
use crate::autosave::session::ModuleSession;
use crate::autosave::trigger::{SaveOptions, SaveTrigger};
use crate::model::answers::AnswerShape;
use async_trait::async_trait;
use log::{info, warn};

/// Destinations the logout flow can send the host to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Unauthenticated entry point.
    Login,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Self::Login => "/login",
        }
    }
}

/// Host navigation hook.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Anything holding answers that should be flushed before logout.
#[async_trait]
pub trait PendingWork: Send + Sync {
    /// Saves once if dirty and idle; returns without saving otherwise.
    async fn flush_before_logout(&self) -> SaveOutcome;
}

#[async_trait]
impl<A: AnswerShape> PendingWork for SaveCoordinator<A> {
    async fn flush_before_logout(&self) -> SaveOutcome {
        self.request_save_if_dirty(SaveTrigger::Logout, SaveOptions::silent())
            .await
    }
}

#[async_trait]
impl<A: AnswerShape> PendingWork for ModuleSession<A> {
    async fn flush_before_logout(&self) -> SaveOutcome {
        self.coordinator().flush_before_logout().await
    }
}

/// What happened during logout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoutReport {
    /// `None` when no page with answers was mounted.
    pub save: Option<SaveOutcome>,
    pub credentials_cleared: bool,
}

/// Flushes pending answers, clears credentials and navigates to login.
pub async fn logout(
    pending: Option<&dyn PendingWork>,
    credentials: &dyn CredentialProvider,
    navigator: &dyn Navigator,
) -> LogoutReport {
    let save = match pending {
        Some(work) => Some(work.flush_before_logout().await),
        None => None,
    };
    if let Some(SaveOutcome::Failed(error)) = &save {
        warn!("event=logout module=auth status=save_failed error={error}");
    }

    let credentials_cleared = match credentials.clear() {
        Ok(()) => true,
        Err(err) => {
            warn!("event=logout module=auth status=error error_code=clear_failed error={err}");
            false
        }
    };

    navigator.navigate(Route::Login);
    info!(
        "event=logout module=auth status=ok save={} credentials_cleared={credentials_cleared}",
        save.as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| "none".to_string())
    );

    LogoutReport {
        save,
        credentials_cleared,
    }
}
