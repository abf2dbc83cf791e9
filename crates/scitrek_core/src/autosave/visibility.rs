//! Page visibility hook.
//!
//! Best effort only: a write started while the page is being torn down may
//! never reach the server.

use crate::autosave::coordinator::{SaveCoordinator, SaveHandle, SaveOutcome};
use crate::autosave::trigger::{SaveOptions, SaveTrigger};
use crate::model::answers::AnswerShape;

/// Host page visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    /// Hidden, backgrounded or about to unload.
    Hidden,
}

/// Flushes dirty answers as soon as the page is hidden.
pub struct VisibilityGuard<A: AnswerShape> {
    coordinator: SaveCoordinator<A>,
}

impl<A: AnswerShape> VisibilityGuard<A> {
    pub fn new(coordinator: SaveCoordinator<A>) -> Self {
        Self { coordinator }
    }

    /// Starts a save right away on `Hidden` when there are unsaved edits.
    ///
    /// The write is started before this returns; awaiting the handle is
    /// optional.
    pub fn on_visibility_change(&self, visibility: Visibility) -> SaveHandle {
        match visibility {
            Visibility::Visible => SaveHandle::Done(SaveOutcome::Skipped),
            Visibility::Hidden => {
                self.coordinator
                    .start_save(SaveTrigger::Visibility, SaveOptions::silent(), true)
            }
        }
    }

    /// Whether the host should ask before letting the page close.
    pub fn should_prompt_before_unload(&self) -> bool {
        self.coordinator.is_dirty()
    }
}
