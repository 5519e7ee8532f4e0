//! Runtime settings for vbar.
//!
//! vbar has no configuration file of its own. The user configuration is a
//! shell script (`vbarrc`) that calls `vbar add-block ...` against the freshly
//! started bar. This module resolves where that script lives, which control
//! socket to use, and which shell runs commands.

use std::path::{Path, PathBuf};

use crate::core::constants::{self, env};

/// Resolved settings for one vbar process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Control socket path.
    pub socket_path: PathBuf,
    /// Startup script, if one was found.
    pub config_script: Option<PathBuf>,
    /// Shell used to run every command.
    pub shell: PathBuf,
}

impl Settings {
    /// Resolves settings from the process environment.
    ///
    /// `socket_override` is the `--socket` flag (which clap already fills from
    /// `VBAR_SOCKET`).
    #[must_use]
    pub fn from_env(socket_override: Option<&Path>) -> Self {
        Self::resolve_with(socket_override, |key| std::env::var(key).ok())
    }

    /// Resolves settings using `lookup` for environment variables.
    pub fn resolve_with<F>(socket_override: Option<&Path>, lookup: F) -> Self
    where F: Fn(&str) -> Option<String> {
        let socket_path = socket_override.map_or_else(
            || {
                lookup(env::SOCKET)
                    .filter(|value| !value.is_empty())
                    .map_or_else(|| default_socket_path(&lookup), |value| expand_path(&value))
            },
            |path| expand_path(&path.to_string_lossy()),
        );

        let config_script = match lookup(env::CONFIG).filter(|value| !value.is_empty()) {
            Some(value) => Some(expand_path(&value)),
            None => config_script_paths(&lookup).into_iter().find(|path| path.is_file()),
        };

        let shell = lookup(env::SHELL)
            .filter(|value| !value.is_empty())
            .map_or_else(|| PathBuf::from(constants::DEFAULT_SHELL), |value| expand_path(&value));

        Self { socket_path, config_script, shell }
    }
}

/// Expands a leading `~` in a user-supplied path.
#[must_use]
pub fn expand_path(raw: &str) -> PathBuf { PathBuf::from(shellexpand::tilde(raw).as_ref()) }

/// Returns the default control socket path.
///
/// `$XDG_RUNTIME_DIR/vbar.sock` when a runtime directory exists, otherwise a
/// per-user file in the system temp directory.
fn default_socket_path<F>(lookup: &F) -> PathBuf
where F: Fn(&str) -> Option<String> {
    if let Some(runtime_dir) = lookup("XDG_RUNTIME_DIR").filter(|value| !value.is_empty()) {
        return PathBuf::from(runtime_dir).join(constants::ipc::SOCKET_FILE);
    }

    let user = lookup("USER").filter(|value| !value.is_empty()).unwrap_or_else(|| "default".into());
    std::env::temp_dir().join(format!("{}-{user}.sock", constants::APP_NAME))
}

/// Returns the candidate configuration script paths in priority order.
///
/// 1. `$XDG_CONFIG_HOME/vbar/vbarrc` when the variable is set
/// 2. `~/.config/vbar/vbarrc`
/// 3. the platform config directory (differs from `~/.config` on macOS)
/// 4. `~/.vbarrc`
fn config_script_paths<F>(lookup: &F) -> Vec<PathBuf>
where F: Fn(&str) -> Option<String> {
    let mut paths = Vec::new();
    let mut push = |path: PathBuf| {
        if !paths.contains(&path) {
            paths.push(path);
        }
    };

    if let Some(xdg_config) = lookup("XDG_CONFIG_HOME").filter(|value| !value.is_empty()) {
        push(PathBuf::from(xdg_config).join(constants::APP_NAME).join(constants::config::SCRIPT_FILE));
    }

    if let Some(home) = dirs::home_dir() {
        push(home.join(".config").join(constants::APP_NAME).join(constants::config::SCRIPT_FILE));
    }

    if let Some(config_dir) = dirs::config_dir() {
        push(config_dir.join(constants::APP_NAME).join(constants::config::SCRIPT_FILE));
    }

    if let Some(home) = dirs::home_dir() {
        push(home.join(format!(".{}", constants::config::SCRIPT_FILE)));
    }

    paths
}
