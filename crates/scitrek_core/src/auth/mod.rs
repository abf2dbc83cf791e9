//! Credential storage and the logout flow.
//!
//! # Responsibility
//! - Keep token access behind an injectable provider.
//! - Flush pending answers before credentials are cleared on logout.

pub mod credentials;
pub mod logout;
