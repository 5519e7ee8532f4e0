//! Platform integration.

pub mod ipc;
