//! Page-level autosave session.
//!
//! # Responsibility
//! - Hydrate one module's answers at mount.
//! - Wire edits to the debouncer and run the periodic flusher.
//! - Expose explicit save, visibility and unmount hooks to the host page.
//!
//! # Invariants
//! - Hydration happens once; read failures and missing data both start from
//!   the page defaults without surfacing an error.
//! - Mounting never triggers a save by itself.
//! - Once unmounted (or dropped), no further state transitions occur.

use crate::autosave::coordinator::{SaveCoordinator, SaveHandle, SaveNotifier, SaveOutcome};
use crate::autosave::debounce::Debouncer;
use crate::autosave::flusher::PeriodicFlusher;
use crate::autosave::state::{DirtyState, SaveState, SaveStatus};
use crate::autosave::trigger::{SaveOptions, SaveTrigger};
use crate::autosave::visibility::{Visibility, VisibilityGuard};
use crate::client::PersistenceClient;
use crate::config::AutosaveConfig;
use crate::model::answers::{AnswerError, AnswerShape};
use crate::model::modules::ModuleId;
use log::{info, warn};
use serde_json::Value;
use std::sync::Arc;

/// How the initial load resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hydration {
    /// Saved answers were merged over the defaults.
    Restored,
    /// No saved answers exist yet.
    Fresh,
    /// The read failed or returned unusable data; defaults are in use.
    Fallback,
}

/// Autosave wiring for one mounted lesson page.
pub struct ModuleSession<A: AnswerShape> {
    coordinator: SaveCoordinator<A>,
    debouncer: Debouncer<A>,
    flusher: PeriodicFlusher,
    visibility: VisibilityGuard<A>,
    config: AutosaveConfig,
    hydration: Hydration,
}

impl<A: AnswerShape> ModuleSession<A> {
    /// Loads saved answers for `module` and starts the periodic flusher.
    pub async fn mount(
        module: ModuleId,
        client: Arc<dyn PersistenceClient>,
        notifier: Arc<dyn SaveNotifier>,
        config: AutosaveConfig,
    ) -> Self {
        let coordinator = SaveCoordinator::<A>::new(module, Arc::clone(&client), notifier);
        let hydration = hydrate(&coordinator, client.read(module).await);
        info!(
            "event=session_mount module=autosave status=ok day={module} session={} hydration={hydration:?}",
            coordinator.session_id()
        );

        Self {
            debouncer: Debouncer::new(coordinator.clone()),
            flusher: PeriodicFlusher::start(coordinator.clone(), config.flush_interval),
            visibility: VisibilityGuard::new(coordinator.clone()),
            coordinator,
            config,
            hydration,
        }
    }

    pub fn module(&self) -> ModuleId {
        self.coordinator.module()
    }

    pub fn hydration(&self) -> Hydration {
        self.hydration
    }

    pub fn coordinator(&self) -> &SaveCoordinator<A> {
        &self.coordinator
    }

    /// Applies a typed edit, marks dirty and re-arms the debouncer.
    pub fn edit<R>(&self, edit: impl FnOnce(&mut A) -> R) -> R {
        let result = self.coordinator.edit(edit);
        self.debouncer.arm(self.config.debounce_delay);
        result
    }

    /// Writes one field by path; only a successful write arms the debouncer.
    pub fn set(&self, path: &str, value: Value) -> Result<(), AnswerError> {
        self.coordinator.set(path, value)?;
        self.debouncer.arm(self.config.debounce_delay);
        Ok(())
    }

    pub fn get(&self, path: &str) -> Result<Option<Value>, AnswerError> {
        self.coordinator.get(path)
    }

    pub fn answers(&self) -> Arc<A> {
        self.coordinator.snapshot()
    }

    /// User-initiated save; the result is acknowledged through the notifier.
    pub async fn save(&self) -> SaveOutcome {
        self.coordinator
            .request_save(SaveTrigger::Explicit, SaveOptions::explicit())
            .await
    }

    pub fn on_visibility_change(&self, visibility: Visibility) -> SaveHandle {
        self.visibility.on_visibility_change(visibility)
    }

    pub fn should_prompt_before_unload(&self) -> bool {
        self.visibility.should_prompt_before_unload()
    }

    pub fn state(&self) -> SaveState {
        self.coordinator.state()
    }

    pub fn dirty_state(&self) -> DirtyState {
        self.coordinator.dirty_state()
    }

    pub fn status(&self) -> SaveStatus {
        self.coordinator.status()
    }

    /// Share of filled-in text answers, in whole percent.
    pub fn progress_percent(&self) -> u8 {
        self.coordinator.progress_percent().unwrap_or_else(|err| {
            warn!(
                "event=progress module=autosave status=error day={} error={err}",
                self.module()
            );
            0
        })
    }

    /// Stops the timers, starts a final flush if dirty and discards the store.
    ///
    /// The flush result is not applied to the discarded store.
    pub fn unmount(self) -> SaveHandle {
        self.debouncer.cancel();
        self.flusher.stop();
        let handle =
            self.coordinator
                .start_save(SaveTrigger::Unmount, SaveOptions::silent(), true);
        let state = self.coordinator.state();
        if matches!(handle, SaveHandle::Done(SaveOutcome::Dropped))
            && state == SaveState::SavingWhileDirty
        {
            // The edits made during the running write are never sent.
            warn!(
                "event=session_unmount module=autosave status=warn day={} session={} state={} error_code=final_flush_dropped",
                self.module(),
                self.coordinator.session_id(),
                state.as_str()
            );
        }
        self.coordinator.discard();
        info!(
            "event=session_unmount module=autosave status=ok day={} session={} final_flush={}",
            self.module(),
            self.coordinator.session_id(),
            handle.is_in_flight()
        );
        handle
    }
}

impl<A: AnswerShape> Drop for ModuleSession<A> {
    fn drop(&mut self) {
        self.coordinator.discard();
    }
}

fn hydrate<A: AnswerShape>(
    coordinator: &SaveCoordinator<A>,
    read: Result<Option<Value>, crate::client::ClientError>,
) -> Hydration {
    let module = coordinator.module();
    match read {
        Ok(Some(saved)) => match coordinator.hydrate(saved) {
            Ok(()) => Hydration::Restored,
            Err(err) => {
                warn!(
                    "event=hydrate module=autosave status=error day={module} error_code=shape_mismatch error={err}"
                );
                Hydration::Fallback
            }
        },
        Ok(None) => Hydration::Fresh,
        Err(err) => {
            warn!(
                "event=hydrate module=autosave status=error day={module} error_code=read_failed error={err}"
            );
            Hydration::Fallback
        }
    }
}
