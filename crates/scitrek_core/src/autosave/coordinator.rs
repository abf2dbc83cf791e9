//! Save coordination for one mounted answer store.
//!
//! # Responsibility
//! - Serialize every save trigger into at most one in-flight write.
//! - Drive the dirty tracker from write results.
//! - Surface results of explicit saves; keep background failures quiet.
//!
//! # Invariants
//! - The check-then-set that starts a save runs inside one critical section.
//! - The lock is never held across the network write.
//! - Writes run on their own task; dropping a caller never cancels one.
//! - After `discard()`, write results cause no state transition.

use crate::autosave::state::{DirtyState, SaveState, SaveStatus};
use crate::autosave::trigger::{SaveOptions, SaveTrigger};
use crate::client::PersistenceClient;
use crate::model::answers::{progress_percent, AnswerError, AnswerShape, AnswerStore};
use crate::model::modules::ModuleId;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use serde_json::Value;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use uuid::Uuid;

const SAVED_MESSAGE: &str = "Your work has been saved!";
const FAILED_MESSAGE: &str = "Error saving. Please try again.";

/// Result of one save request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The write succeeded.
    Saved,
    /// Nothing to save; the store was clean.
    Skipped,
    /// Another write was already in flight.
    Dropped,
    /// The write failed; the store stays dirty.
    Failed(String),
    /// The store was unmounted; the result was ignored.
    Discarded,
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved)
    }
}

impl Display for SaveOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Saved => write!(f, "saved"),
            Self::Skipped => write!(f, "skipped"),
            Self::Dropped => write!(f, "dropped"),
            Self::Failed(message) => write!(f, "failed: {message}"),
            Self::Discarded => write!(f, "discarded"),
        }
    }
}

/// User-visible acknowledgment of an explicit save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveNotice {
    Saved { trigger: SaveTrigger },
    Failed { trigger: SaveTrigger, error: String },
}

impl SaveNotice {
    /// Text shown in the blocking acknowledgment.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Saved { .. } => SAVED_MESSAGE,
            Self::Failed { .. } => FAILED_MESSAGE,
        }
    }
}

/// Receives acknowledgments for non-silent saves only.
pub trait SaveNotifier: Send + Sync {
    fn notify(&self, notice: SaveNotice);
}

/// Notifier for hosts without a blocking dialog.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl SaveNotifier for LogNotifier {
    fn notify(&self, notice: SaveNotice) {
        match &notice {
            SaveNotice::Saved { trigger } => {
                info!("event=save_notice module=autosave status=ok trigger={trigger}")
            }
            SaveNotice::Failed { trigger, error } => warn!(
                "event=save_notice module=autosave status=error trigger={trigger} error={error}"
            ),
        }
    }
}

/// A save that has either finished synchronously or is running on a task.
#[derive(Debug)]
pub enum SaveHandle {
    Done(SaveOutcome),
    InFlight(JoinHandle<SaveOutcome>),
}

impl SaveHandle {
    /// Waits for the outcome. Dropping the handle instead detaches the write.
    pub async fn outcome(self) -> SaveOutcome {
        match self {
            Self::Done(outcome) => outcome,
            Self::InFlight(handle) => match handle.await {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!(
                        "event=save module=autosave status=error error_code=save_task_failed error={err}"
                    );
                    SaveOutcome::Failed(err.to_string())
                }
            },
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::InFlight(_))
    }
}

struct Inner<A: AnswerShape> {
    store: AnswerStore<A>,
    state: SaveState,
    last_saved_at: Option<DateTime<Utc>>,
    live: bool,
}

/// Shared handle to one page's answers and save lifecycle.
///
/// Cloning is cheap; all clones observe the same store.
pub struct SaveCoordinator<A: AnswerShape> {
    module: ModuleId,
    session_id: Uuid,
    inner: Arc<Mutex<Inner<A>>>,
    client: Arc<dyn PersistenceClient>,
    notifier: Arc<dyn SaveNotifier>,
}

impl<A: AnswerShape> Clone for SaveCoordinator<A> {
    fn clone(&self) -> Self {
        Self {
            module: self.module,
            session_id: self.session_id,
            inner: Arc::clone(&self.inner),
            client: Arc::clone(&self.client),
            notifier: Arc::clone(&self.notifier),
        }
    }
}

impl<A: AnswerShape> SaveCoordinator<A> {
    /// Creates a clean coordinator holding the page defaults.
    pub fn new(
        module: ModuleId,
        client: Arc<dyn PersistenceClient>,
        notifier: Arc<dyn SaveNotifier>,
    ) -> Self {
        Self {
            module,
            session_id: Uuid::new_v4(),
            inner: Arc::new(Mutex::new(Inner {
                store: AnswerStore::new(),
                state: SaveState::Clean,
                last_saved_at: None,
                live: true,
            })),
            client,
            notifier,
        }
    }

    pub fn module(&self) -> ModuleId {
        self.module
    }

    /// Per-mount identifier used to correlate log lines.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Replaces the store content with `saved` merged over defaults.
    ///
    /// Leaves the tracker clean; hydration is not an edit.
    pub fn hydrate(&self, saved: Value) -> Result<(), AnswerError> {
        self.inner.lock().store.hydrate(saved)
    }

    /// Applies a typed edit and marks the store dirty.
    pub fn edit<R>(&self, edit: impl FnOnce(&mut A) -> R) -> R {
        let mut inner = self.inner.lock();
        let result = inner.store.update(edit);
        inner.state = inner.state.on_edit();
        result
    }

    /// Writes one field by path and marks the store dirty.
    ///
    /// A rejected write leaves both the store and the tracker untouched.
    pub fn set(&self, path: &str, value: Value) -> Result<(), AnswerError> {
        let mut inner = self.inner.lock();
        inner.store.set(path, value)?;
        inner.state = inner.state.on_edit();
        Ok(())
    }

    pub fn get(&self, path: &str) -> Result<Option<Value>, AnswerError> {
        self.inner.lock().store.get(path)
    }

    /// Current answers; later edits do not affect the returned value.
    pub fn snapshot(&self) -> Arc<A> {
        self.inner.lock().store.snapshot()
    }

    pub fn progress_percent(&self) -> Result<u8, AnswerError> {
        let snapshot = self.snapshot();
        let blob = serde_json::to_value(snapshot.as_ref()).map_err(AnswerError::Serialize)?;
        Ok(progress_percent(&blob))
    }

    pub fn state(&self) -> SaveState {
        self.inner.lock().state
    }

    pub fn is_dirty(&self) -> bool {
        self.state().is_dirty()
    }

    pub fn is_live(&self) -> bool {
        self.inner.lock().live
    }

    pub fn dirty_state(&self) -> DirtyState {
        let inner = self.inner.lock();
        DirtyState::new(inner.state, inner.last_saved_at)
    }

    pub fn status(&self) -> SaveStatus {
        self.dirty_state().status()
    }

    /// Marks the store unmounted. Outstanding writes finish but are ignored.
    pub fn discard(&self) {
        let mut inner = self.inner.lock();
        if inner.live {
            inner.live = false;
            debug!(
                "event=store_discard module=autosave day={} session={} state={}",
                self.module,
                self.session_id,
                inner.state.as_str()
            );
        }
    }

    /// Requests one save and waits for its outcome.
    pub async fn request_save(&self, trigger: SaveTrigger, options: SaveOptions) -> SaveOutcome {
        self.start_save(trigger, options, false).outcome().await
    }

    /// Requests one save only if the store has unsaved edits.
    pub async fn request_save_if_dirty(
        &self,
        trigger: SaveTrigger,
        options: SaveOptions,
    ) -> SaveOutcome {
        self.start_save(trigger, options, true).outcome().await
    }

    /// Starts a save without waiting for it.
    ///
    /// The snapshot is taken now, so edits made after this call are not part
    /// of the write. Requests made while a write is in flight are dropped.
    pub fn start_save(
        &self,
        trigger: SaveTrigger,
        options: SaveOptions,
        only_if_dirty: bool,
    ) -> SaveHandle {
        let snapshot = {
            let mut inner = self.inner.lock();
            if !inner.live {
                return SaveHandle::Done(SaveOutcome::Discarded);
            }
            if only_if_dirty && !inner.state.is_dirty() {
                return SaveHandle::Done(SaveOutcome::Skipped);
            }
            match inner.state.on_save_started() {
                Some(next) => inner.state = next,
                None => {
                    debug!(
                        "event=save module=autosave status=dropped trigger={trigger} day={} session={}",
                        self.module, self.session_id
                    );
                    return SaveHandle::Done(SaveOutcome::Dropped);
                }
            }
            inner.store.snapshot()
        };

        let coordinator = self.clone();
        SaveHandle::InFlight(tokio::spawn(async move {
            coordinator.complete_save(snapshot, trigger, options).await
        }))
    }

    async fn complete_save(
        self,
        snapshot: Arc<A>,
        trigger: SaveTrigger,
        options: SaveOptions,
    ) -> SaveOutcome {
        let started_at = Instant::now();
        let result = match serde_json::to_value(snapshot.as_ref()) {
            Ok(blob) => self
                .client
                .write(self.module, &blob)
                .await
                .map_err(|err| err.to_string()),
            Err(err) => {
                error!(
                    "event=save module=autosave status=error trigger={trigger} day={} session={} error_code=serialize_failed error={err}",
                    self.module, self.session_id
                );
                Err(format!("answers are not serializable: {err}"))
            }
        };
        let duration_ms = started_at.elapsed().as_millis();

        let outcome = {
            let mut inner = self.inner.lock();
            if !inner.live {
                info!(
                    "event=save module=autosave status=discarded trigger={trigger} day={} session={} duration_ms={duration_ms}",
                    self.module, self.session_id
                );
                return SaveOutcome::Discarded;
            }
            match &result {
                Ok(()) => {
                    inner.state = inner.state.on_save_succeeded();
                    inner.last_saved_at = Some(Utc::now());
                    info!(
                        "event=save module=autosave status=ok trigger={trigger} day={} session={} state={} duration_ms={duration_ms}",
                        self.module,
                        self.session_id,
                        inner.state.as_str()
                    );
                    SaveOutcome::Saved
                }
                Err(message) => {
                    inner.state = inner.state.on_save_failed();
                    warn!(
                        "event=save module=autosave status=error trigger={trigger} day={} session={} silent={} duration_ms={duration_ms} error={message}",
                        self.module, self.session_id, options.silent
                    );
                    SaveOutcome::Failed(message.clone())
                }
            }
        };

        if !options.silent {
            let notice = match &outcome {
                SaveOutcome::Saved => SaveNotice::Saved { trigger },
                SaveOutcome::Failed(error) => SaveNotice::Failed {
                    trigger,
                    error: error.clone(),
                },
                _ => return outcome,
            };
            self.notifier.notify(notice);
        }

        outcome
    }
}
