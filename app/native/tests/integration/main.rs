//! Integration tests for vbar.
//!
//! Each test starts a real bar (control socket, presentation thread, block
//! tasks) on a socket inside a temporary directory, with an in-memory sink in
//! place of the terminal. Commands run through `/bin/sh`.
//!
//! ## Running Integration Tests
//!
//! ```bash
//! cargo test -p vbar --test integration
//!
//! # Run a single module
//! cargo test -p vbar --test integration ipc__
//! ```
//!
//! ## Test Organization
//!
//! Tests follow the naming convention `<module>__<test_name>` to allow filtering by module:
//! - `app__*` - Startup, shutdown and the configuration script
//! - `bar__*` - Block execution and layout
//! - `ipc__*` - Control protocol

// Allow double-underscore naming for test modules (e.g., bar__executor)
#![allow(non_snake_case)]
// Relax clippy lints for integration tests - these are test utilities, not production code
#![allow(
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::uninlined_format_args,
    clippy::wildcard_imports
)]

mod common;

mod bar__executor;
mod bar__layout;
mod ipc__control;
