//! vbar library.
//!
//! A status bar made of named blocks. Each block shows static text or the
//! output of a shell command, and the bar is configured at runtime through a
//! local control socket.

pub mod app;
pub mod bar;
pub mod cli;
pub mod config;
pub mod core;
pub mod logging;
pub mod platform;
pub mod utils;

pub use crate::core::{Error, Result};
