//! Application constants for vbar.
//!
//! This module contains global constants used throughout the application,
//! including the binary name, default paths and the environment variables
//! that override them.

/// The application name, also used for the binary and directory names.
pub const APP_NAME: &str = "vbar";

/// Application version from Cargo.toml.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Text shown in a block whose command failed.
pub const ERROR_TEXT: &str = "ERROR";

/// Shell used to run every block, click and menu command.
pub const DEFAULT_SHELL: &str = "/bin/bash";

/// Longest accepted poll interval (one week).
pub const MAX_INTERVAL: std::time::Duration = std::time::Duration::from_secs(7 * 24 * 60 * 60);

/// Environment variables understood by vbar.
pub mod env {
    /// Overrides the control socket path.
    pub const SOCKET: &str = "VBAR_SOCKET";

    /// Overrides the startup configuration script path.
    pub const CONFIG: &str = "VBAR_CONFIG";

    /// Overrides the shell used to run commands.
    pub const SHELL: &str = "VBAR_SHELL";
}

/// Control endpoint defaults.
pub mod ipc {
    use std::time::Duration;

    /// Socket file name inside the runtime directory.
    pub const SOCKET_FILE: &str = "vbar.sock";

    /// How long the startup liveness probe waits for an existing instance.
    pub const PROBE_TIMEOUT: Duration = Duration::from_millis(500);

    /// Upper bound for a single request line.
    pub const MAX_REQUEST_BYTES: usize = 64 * 1024;
}

/// Configuration script defaults.
pub mod config {
    /// Script file name inside `$XDG_CONFIG_HOME/vbar/`.
    pub const SCRIPT_FILE: &str = "vbarrc";
}
