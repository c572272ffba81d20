//! Atelier Common - shared foundation for the Atelier bot core.
//!
//! This crate provides:
//! - Configuration types and loading
//! - Error types and handling utilities
//! - Logging setup

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;

pub use config::{Config, LogConfig, PrefixConfig};
pub use error::{Error, Result};

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::config::{Config, PrefixConfig};
    pub use crate::error::{Error, Result};
    pub use crate::logging::init_logging;
}
