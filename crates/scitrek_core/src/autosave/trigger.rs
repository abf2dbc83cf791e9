//! Save triggers and per-request options.

use std::fmt::{Display, Formatter};

/// What asked for a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaveTrigger {
    Debounce,
    Interval,
    Visibility,
    Explicit,
    Logout,
    Unmount,
}

impl SaveTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debounce => "debounce",
            Self::Interval => "interval",
            Self::Visibility => "visibility",
            Self::Explicit => "explicit",
            Self::Logout => "logout",
            Self::Unmount => "unmount",
        }
    }
}

impl Display for SaveTrigger {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options for one save request.
///
/// Silent saves never surface results to the user; failures are logged only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    pub silent: bool,
}

impl SaveOptions {
    pub const fn silent() -> Self {
        Self { silent: true }
    }

    /// User-initiated save whose result is acknowledged on screen.
    pub const fn explicit() -> Self {
        Self { silent: false }
    }
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self::silent()
    }
}
