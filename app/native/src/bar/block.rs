//! Block data model.
//!
//! A block is a named label on the bar. Its text is either static or driven by
//! a command that is polled (optionally on an interval) or tailed line by
//! line.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::constants::MAX_INTERVAL;
use crate::core::{Error, Result};

/// Horizontal group a block belongs to. Fixed at creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    /// Left-aligned group.
    #[default]
    Left,
    /// Centered, expanding group.
    Center,
    /// Right-aligned group.
    Right,
}

impl Position {
    /// Builds a position from the mutually exclusive `--left/--center/--right` flags.
    ///
    /// No flag selects [`Position::Left`].
    ///
    /// # Errors
    ///
    /// Returns an error if more than one flag is set.
    pub fn from_flags(left: bool, center: bool, right: bool) -> Result<Self> {
        match (left, center, right) {
            (_, false, false) => Ok(Self::Left),
            (false, true, false) => Ok(Self::Center),
            (false, false, true) => Ok(Self::Right),
            _ => Err(Error::invalid_args("only one of left, center or right may be set")),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Center => write!(f, "center"),
            Self::Right => write!(f, "right"),
        }
    }
}

/// Internal identity of a block, shared between the registry and the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u64);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "#{}", self.0) }
}

/// How a block keeps its text current.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockMode {
    /// Text only changes through publications from outside (none today).
    Static,
    /// Command run once, then every `interval` unless it is zero.
    Poll { command: String, interval: Duration },
    /// Long-lived command whose stdout lines replace the text.
    Tail { command: String },
}

impl BlockMode {
    /// Short label used in listings.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Poll { .. } => "poll",
            Self::Tail { .. } => "tail",
        }
    }
}

/// Everything needed to create a block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockSpec {
    pub name: String,
    pub position: Position,
    pub text: String,
    pub command: Option<String>,
    pub tail_command: Option<String>,
    pub interval: Duration,
    pub click_command: Option<String>,
}

impl BlockSpec {
    /// Creates a static block spec.
    pub fn new(name: impl Into<String>, position: Position) -> Self {
        Self {
            name: name.into(),
            position,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    #[must_use]
    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }

    #[must_use]
    pub fn with_tail_command(mut self, command: impl Into<String>) -> Self {
        self.tail_command = Some(command.into());
        self
    }

    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub fn with_click_command(mut self, command: impl Into<String>) -> Self {
        self.click_command = Some(command.into());
        self
    }

    /// Checks the spec before anything is registered.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty name, an interval above
    /// [`MAX_INTERVAL`], or when both a command and a tail command are set.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::invalid_args("block name must not be empty"));
        }

        if self.command.is_some() && self.tail_command.is_some() {
            return Err(Error::invalid_args(format!(
                "block '{}' cannot have both a command and a tail command",
                self.name
            )));
        }

        if self.interval > MAX_INTERVAL {
            return Err(Error::invalid_args(format!(
                "block '{}' interval exceeds {} seconds",
                self.name,
                MAX_INTERVAL.as_secs()
            )));
        }

        Ok(())
    }

    /// Returns how the block's text is driven.
    #[must_use]
    pub fn mode(&self) -> BlockMode {
        if let Some(command) = &self.command {
            BlockMode::Poll {
                command: command.clone(),
                interval: self.interval,
            }
        } else if let Some(command) = &self.tail_command {
            BlockMode::Tail { command: command.clone() }
        } else {
            BlockMode::Static
        }
    }
}

/// One entry of a block's menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub label: String,
    pub command: String,
}

/// Read-only view of a block, as reported by `vbar list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSummary {
    pub name: String,
    pub position: Position,
    pub text: String,
    pub mode: String,
    /// Poll interval in whole seconds, zero for none.
    pub interval: u64,
    pub menu_items: usize,
    pub clickable: bool,
}
