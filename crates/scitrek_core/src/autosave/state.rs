//! Dirty tracking state machine and the status indicator it drives.
//!
//! # Invariants
//! - `Saving` and `SavingWhileDirty` are the only in-flight states; a new save
//!   may start only from `Clean` or `Dirty`.
//! - Dirty is cleared only by a successful save that started with no edit
//!   arriving while it was in flight.

use chrono::{DateTime, Local, Utc};
use std::fmt::{Display, Formatter};

/// Save lifecycle of one answer store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveState {
    /// No unsaved edits.
    #[default]
    Clean,
    /// Unsaved edits, nothing in flight.
    Dirty,
    /// A write is in flight and no edit arrived since it started.
    Saving,
    /// A write is in flight and an edit arrived after it started.
    SavingWhileDirty,
}

impl SaveState {
    pub fn on_edit(self) -> Self {
        match self {
            Self::Clean | Self::Dirty => Self::Dirty,
            Self::Saving | Self::SavingWhileDirty => Self::SavingWhileDirty,
        }
    }

    /// Returns `None` when a write is already in flight.
    pub fn on_save_started(self) -> Option<Self> {
        match self {
            Self::Clean | Self::Dirty => Some(Self::Saving),
            Self::Saving | Self::SavingWhileDirty => None,
        }
    }

    pub fn on_save_succeeded(self) -> Self {
        match self {
            Self::Saving => Self::Clean,
            Self::SavingWhileDirty => Self::Dirty,
            // Not in flight: a stray completion must not clear pending edits.
            other => other,
        }
    }

    pub fn on_save_failed(self) -> Self {
        match self {
            Self::Saving | Self::SavingWhileDirty => Self::Dirty,
            other => other,
        }
    }

    pub fn is_dirty(self) -> bool {
        matches!(self, Self::Dirty | Self::SavingWhileDirty)
    }

    pub fn is_saving(self) -> bool {
        matches!(self, Self::Saving | Self::SavingWhileDirty)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Dirty => "dirty",
            Self::Saving => "saving",
            Self::SavingWhileDirty => "saving_while_dirty",
        }
    }
}

/// Flattened view of the tracker for UI bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyState {
    pub is_dirty: bool,
    pub last_saved_at: Option<DateTime<Utc>>,
    pub is_saving: bool,
}

impl DirtyState {
    pub fn new(state: SaveState, last_saved_at: Option<DateTime<Utc>>) -> Self {
        Self {
            is_dirty: state.is_dirty(),
            last_saved_at,
            is_saving: state.is_saving(),
        }
    }

    pub fn status(&self) -> SaveStatus {
        let unsaved = self.is_dirty && !self.is_saving;
        if self.is_saving {
            return SaveStatus::Saving;
        }
        match self.last_saved_at {
            Some(at) => SaveStatus::Saved { at, unsaved },
            None => SaveStatus::Ready { unsaved },
        }
    }
}

/// Persistent save indicator shown on every lesson page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveStatus {
    Ready { unsaved: bool },
    Saving,
    Saved { at: DateTime<Utc>, unsaved: bool },
}

impl Display for SaveStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready { unsaved } => {
                write!(f, "Ready")?;
                write_unsaved(f, *unsaved)
            }
            Self::Saving => write!(f, "Saving…"),
            Self::Saved { at, unsaved } => {
                write!(f, "Saved • {}", at.with_timezone(&Local).format("%H:%M:%S"))?;
                write_unsaved(f, *unsaved)
            }
        }
    }
}

fn write_unsaved(f: &mut Formatter<'_>, unsaved: bool) -> std::fmt::Result {
    if unsaved {
        write!(f, " (unsaved)")?;
    }
    Ok(())
}
