#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use scitrek_core::{
    AnswerShape, AutosaveConfig, ClientError, ClientResult, CredentialError, CredentialProvider,
    MemoryCredentialStore, ModuleId, Navigator, PersistenceClient, Route, SaveNotice,
    SaveNotifier, TokenPair,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, Semaphore};

pub const DEBOUNCE: Duration = Duration::from_millis(1500);
pub const FLUSH_INTERVAL: Duration = Duration::from_secs(15);

pub fn config() -> AutosaveConfig {
    AutosaveConfig::default()
        .with_debounce_delay(DEBOUNCE)
        .with_flush_interval(FLUSH_INTERVAL)
}

/// Lets spawned tasks run without advancing the paused clock.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Worksheet {
    pub worksheet: Vec<String>,
}

impl AnswerShape for Worksheet {
    fn defaults() -> Self {
        Self {
            worksheet: vec![String::new(); 4],
        }
    }
}

/// Ordered record of side effects across collaborators.
#[derive(Default)]
pub struct Journal {
    entries: Mutex<Vec<&'static str>>,
}

impl Journal {
    pub fn push(&self, entry: &'static str) {
        self.entries.lock().push(entry);
    }

    pub fn entries(&self) -> Vec<&'static str> {
        self.entries.lock().clone()
    }
}

pub enum ReadScript {
    NotFound,
    Found(Value),
    Fail,
}

/// In-memory backend with gated writes and failure injection.
pub struct ScriptedClient {
    read: Mutex<ReadScript>,
    server_blob: Mutex<Option<Value>>,
    attempts: Mutex<Vec<Value>>,
    fail_remaining: AtomicUsize,
    holding: AtomicBool,
    gate: Semaphore,
    write_started: Notify,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    journal: Option<Arc<Journal>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::with_read(ReadScript::NotFound)
    }

    pub fn with_read(read: ReadScript) -> Self {
        Self {
            read: Mutex::new(read),
            server_blob: Mutex::new(None),
            attempts: Mutex::new(Vec::new()),
            fail_remaining: AtomicUsize::new(0),
            holding: AtomicBool::new(false),
            gate: Semaphore::new(0),
            write_started: Notify::new(),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            journal: None,
        }
    }

    pub fn with_journal(mut self, journal: Arc<Journal>) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Makes the next `count` writes fail.
    pub fn fail_next(&self, count: usize) {
        self.fail_remaining.store(count, Ordering::SeqCst);
    }

    /// Blocks writes until released.
    pub fn hold_writes(&self) {
        self.holding.store(true, Ordering::SeqCst);
    }

    pub fn release_one(&self) {
        self.gate.add_permits(1);
    }

    pub fn resume_writes(&self) {
        self.holding.store(false, Ordering::SeqCst);
        self.gate.add_permits(64);
    }

    pub async fn wait_for_write_start(&self) {
        self.write_started.notified().await;
    }

    /// Payloads of every write attempt, in order.
    pub fn attempts(&self) -> Vec<Value> {
        self.attempts.lock().clone()
    }

    /// Blob the server currently holds.
    pub fn server_blob(&self) -> Option<Value> {
        self.server_blob.lock().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PersistenceClient for ScriptedClient {
    async fn read(&self, _module: ModuleId) -> ClientResult<Option<Value>> {
        match &*self.read.lock() {
            ReadScript::NotFound => Ok(None),
            ReadScript::Found(value) => Ok(Some(value.clone())),
            ReadScript::Fail => Err(ClientError::Transport("connection refused".to_string())),
        }
    }

    async fn write(&self, _module: ModuleId, answers: &Value) -> ClientResult<()> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        self.attempts.lock().push(answers.clone());
        if let Some(journal) = &self.journal {
            journal.push("write");
        }
        self.write_started.notify_one();

        if self.holding.load(Ordering::SeqCst) {
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
        }

        let failed = self
            .fail_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if failed {
            return Err(ClientError::Status {
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        *self.server_blob.lock() = Some(answers.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<SaveNotice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<SaveNotice> {
        self.notices.lock().clone()
    }
}

impl SaveNotifier for RecordingNotifier {
    fn notify(&self, notice: SaveNotice) {
        self.notices.lock().push(notice);
    }
}

/// Credential store that journals `clear()`.
pub struct JournaledCredentials {
    inner: MemoryCredentialStore,
    journal: Arc<Journal>,
}

impl JournaledCredentials {
    pub fn signed_in(journal: Arc<Journal>) -> Self {
        Self {
            inner: MemoryCredentialStore::with_tokens(TokenPair {
                access: "access".to_string(),
                refresh: "refresh".to_string(),
            }),
            journal,
        }
    }
}

impl CredentialProvider for JournaledCredentials {
    fn access_token(&self) -> Option<String> {
        self.inner.access_token()
    }

    fn refresh_token(&self) -> Option<String> {
        self.inner.refresh_token()
    }

    fn set_tokens(&self, tokens: TokenPair) -> Result<(), CredentialError> {
        self.inner.set_tokens(tokens)
    }

    fn set_access_token(&self, access: String) -> Result<(), CredentialError> {
        self.inner.set_access_token(access)
    }

    fn clear(&self) -> Result<(), CredentialError> {
        self.journal.push("clear");
        self.inner.clear()
    }
}

pub struct JournaledNavigator {
    journal: Arc<Journal>,
    routes: Mutex<Vec<Route>>,
}

impl JournaledNavigator {
    pub fn new(journal: Arc<Journal>) -> Self {
        Self {
            journal,
            routes: Mutex::new(Vec::new()),
        }
    }

    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().clone()
    }
}

impl Navigator for JournaledNavigator {
    fn navigate(&self, route: Route) {
        self.journal.push("navigate");
        self.routes.lock().push(route);
    }
}
