#![allow(clippy::multiple_crate_versions)]

//! vbar - a status bar driven by shell commands.
//!
//! The same binary runs the bar (`vbar start`) and talks to it (every other
//! subcommand).

fn main() {
    if let Err(err) = vbar_lib::cli::run() {
        eprintln!("vbar: {err}");
        std::process::exit(1);
    }
}
