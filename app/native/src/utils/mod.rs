//! Small helpers shared across modules.

pub mod thread;

pub use thread::spawn_named_thread;
