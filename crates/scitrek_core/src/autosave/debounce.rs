//! Debounced save trigger.
//!
//! # Invariants
//! - At most one pending timer per page instance; arming cancels the previous
//!   one, so a burst of edits yields a single save.
//! - Cancelling affects only the wait. A write that already started keeps
//!   running on its own task.

use crate::autosave::coordinator::SaveCoordinator;
use crate::autosave::trigger::{SaveOptions, SaveTrigger};
use crate::model::answers::AnswerShape;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Single-shot, re-armable save timer for one page.
pub struct Debouncer<A: AnswerShape> {
    coordinator: SaveCoordinator<A>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl<A: AnswerShape> Debouncer<A> {
    pub fn new(coordinator: SaveCoordinator<A>) -> Self {
        Self {
            coordinator,
            pending: Mutex::new(None),
        }
    }

    /// Replaces any pending timer with one firing after `delay`.
    pub fn arm(&self, delay: Duration) {
        let coordinator = self.coordinator.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Detach: the write must outlive a later `arm` or `cancel`.
            let _detached =
                coordinator.start_save(SaveTrigger::Debounce, SaveOptions::silent(), true);
        });

        if let Some(previous) = self.pending.lock().replace(timer) {
            previous.abort();
        }
    }

    /// Drops the pending timer, if any.
    pub fn cancel(&self) {
        if let Some(previous) = self.pending.lock().take() {
            previous.abort();
        }
    }

    /// Whether a timer is waiting to fire.
    pub fn is_armed(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|timer| !timer.is_finished())
    }
}

impl<A: AnswerShape> Drop for Debouncer<A> {
    fn drop(&mut self) {
        self.cancel();
    }
}
