//! Core infrastructure for vbar.
//!
//! This module provides foundational types and utilities used throughout the application:
//!
//! - [`error`] - Unified error types
//! - [`constants`] - Application constants
//! - [`prelude`] - Common re-exports for convenience

pub mod constants;
pub mod error;
pub mod prelude;

pub use error::{Error, Result};
