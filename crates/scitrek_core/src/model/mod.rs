//! Answer data model for lesson pages.
//!
//! # Responsibility
//! - Define the per-page answer shapes and the store that owns them.
//! - Provide path addressing into free-form answer blobs.
//!
//! # Invariants
//! - Every answer blob is plain JSON (no cycles, no opaque values).
//! - Each page declares its own shape; there is no cross-page schema.

pub mod answers;
pub mod modules;
pub mod path;
