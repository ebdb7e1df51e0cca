//! # Connect Process
//!
//! Low-level process operations for the Autify Connect client supervisor.
//!
//! This crate provides cross-platform primitives for:
//! - Building the client command line (argument and environment contract)
//! - Forced termination
//! - Executable and port validation

pub mod execute;
pub mod terminate;
pub mod validation;

// Re-export main types
pub use execute::*;
pub use terminate::*;
pub use validation::*;
