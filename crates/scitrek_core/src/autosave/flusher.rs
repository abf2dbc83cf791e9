//! Periodic safety flush.
//!
//! Bounds how long edits can stay client-side when the debouncer keeps being
//! re-armed by continuous typing.

use crate::autosave::coordinator::SaveCoordinator;
use crate::autosave::trigger::{SaveOptions, SaveTrigger};
use crate::model::answers::AnswerShape;
use log::debug;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Recurring timer that saves only while the store is dirty.
pub struct PeriodicFlusher {
    task: JoinHandle<()>,
}

impl PeriodicFlusher {
    /// Starts ticking one `period` from now.
    pub fn start<A: AnswerShape>(coordinator: SaveCoordinator<A>, period: Duration) -> Self {
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !coordinator.is_live() {
                    debug!(
                        "event=flusher_stop module=autosave day={} reason=discarded",
                        coordinator.module()
                    );
                    break;
                }
                if coordinator.is_dirty() {
                    let _detached =
                        coordinator.start_save(SaveTrigger::Interval, SaveOptions::silent(), true);
                }
            }
        });
        Self { task }
    }

    pub fn stop(&self) {
        self.task.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for PeriodicFlusher {
    fn drop(&mut self) {
        self.task.abort();
    }
}
