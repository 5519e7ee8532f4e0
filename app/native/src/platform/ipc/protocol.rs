//! Control protocol messages.
//!
//! One JSON object per line in each direction. Requests are tagged by `type`
//! and responses by `status`:
//!
//! ```text
//! → {"type":"add-block","name":"clock","right":true,"command":"date +%H:%M","interval":60}
//! ← {"status":"success"}
//! → {"type":"remove","name":"nope"}
//! ← {"status":"failure","reason":"block 'nope' not found"}
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::bar::{BlockSpec, BlockSummary, Position};
use crate::core::{Error, Result};

/// A request sent by `vbar` CLI invocations to the running bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ControlRequest {
    AddBlock(AddBlock),
    AddCss(AddCss),
    AddMenu(AddMenu),
    Update { name: String },
    Remove { name: String },
    Ping,
    List,
    Quit,
}

/// Arguments of `add-block`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddBlock {
    pub name: String,
    pub text: String,
    pub left: bool,
    pub center: bool,
    pub right: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tail_command: Option<String>,
    /// Poll interval in whole seconds. Zero runs the command once.
    pub interval: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click_command: Option<String>,
}

/// Arguments of `add-css`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddCss {
    pub class: String,
    pub css: String,
}

/// Arguments of `add-menu`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddMenu {
    pub name: String,
    pub text: String,
    pub command: String,
}

fn non_empty(value: Option<String>) -> Option<String> { value.filter(|v| !v.is_empty()) }

impl TryFrom<AddBlock> for BlockSpec {
    type Error = Error;

    fn try_from(request: AddBlock) -> Result<Self> {
        let spec = Self {
            position: Position::from_flags(request.left, request.center, request.right)?,
            name: request.name,
            text: request.text,
            command: non_empty(request.command),
            tail_command: non_empty(request.tail_command),
            interval: Duration::from_secs(request.interval),
            click_command: non_empty(request.click_command),
        };
        spec.validate()?;
        Ok(spec)
    }
}

impl ControlRequest {
    /// Parses a request line.
    ///
    /// # Errors
    ///
    /// Returns an error if the line is not a valid request.
    pub fn decode(line: &str) -> Result<Self> { Ok(serde_json::from_str(line.trim())?) }

    /// Serializes the request as a single line, without the trailing newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode(&self) -> Result<String> { Ok(serde_json::to_string(self)?) }
}

/// Payload of a successful response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ResponseData {
    Pong { pid: u32, version: String },
    Blocks { blocks: Vec<BlockSummary> },
}

/// Outcome of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum ControlResponse {
    Success {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<ResponseData>,
    },
    Failure {
        reason: String,
    },
}

impl ControlResponse {
    /// Success with no payload.
    #[must_use]
    pub const fn ok() -> Self { Self::Success { data: None } }

    /// Success carrying `data`.
    #[must_use]
    pub const fn with_data(data: ResponseData) -> Self { Self::Success { data: Some(data) } }

    pub fn failure(reason: impl Into<String>) -> Self { Self::Failure { reason: reason.into() } }

    #[must_use]
    pub const fn is_success(&self) -> bool { matches!(self, Self::Success { .. }) }

    /// Parses a response line.
    ///
    /// # Errors
    ///
    /// Returns an error if the line is not a valid response.
    pub fn decode(line: &str) -> Result<Self> { Ok(serde_json::from_str(line.trim())?) }

    /// Serializes the response as a single line, without the trailing newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn encode(&self) -> Result<String> { Ok(serde_json::to_string(self)?) }
}

impl From<Result<()>> for ControlResponse {
    fn from(result: Result<()>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(err) => Self::failure(err.to_string()),
        }
    }
}
