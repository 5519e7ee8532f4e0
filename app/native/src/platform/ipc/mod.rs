//! Control channel between `vbar` CLI invocations and the running bar.
//!
//! - [`protocol`] - newline-delimited JSON requests and responses
//! - [`server`] - the endpoint owned by `vbar start`
//! - [`client`] - one-shot requests from every other subcommand

pub mod client;
pub mod protocol;
pub mod server;

pub use client::{Liveness, is_app_running, probe, send_request};
pub use protocol::{AddBlock, AddCss, AddMenu, ControlRequest, ControlResponse, ResponseData};
pub use server::{ControlServer, Dispatcher, ServerHandle};
