//! # Connect Common
//!
//! Common types shared across the Autify Connect client supervisor crates.
//!
//! This crate provides the foundational pieces that every other crate builds
//! upon: the error taxonomy used by the supervisor and its collaborators, and
//! the small domain types that travel between them.

pub mod errors;
pub mod types;

// Re-export commonly used items
pub use errors::{ConnectError, ConnectResult, VersionMismatchWarning};
pub use types::ProcessExit;
