//! Client-side autosave for lesson pages.
//!
//! # Responsibility
//! - Track unsaved edits per mounted page.
//! - Coalesce edits into debounced writes with a periodic safety flush.
//! - Flush on page hide, unmount and logout.
//!
//! # Invariants
//! - At most one write is in flight per answer store.
//! - Edits made during a write keep the store dirty after that write.
//! - Background saves never interrupt the user; explicit saves are always
//!   acknowledged.

pub mod coordinator;
pub mod debounce;
pub mod flusher;
pub mod session;
pub mod state;
pub mod trigger;
pub mod visibility;
