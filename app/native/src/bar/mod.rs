//! The bar engine.
//!
//! Blocks are registered in the [`BlockRegistry`], driven by the
//! [`BlockExecutor`] and drawn by a [`PresentationSink`] running on its own
//! thread.

pub mod block;
pub mod command;
pub mod executor;
pub mod layout;
pub mod registry;
pub mod sink;
pub mod terminal;

pub use block::{BlockId, BlockMode, BlockSpec, BlockSummary, MenuItem, Position};
pub use command::CommandRunner;
pub use executor::{BlockExecutor, BlockTask, TextPublisher};
pub use layout::{BarLayout, GroupSpans, Span, Placement};
pub use registry::{BlockHandle, BlockRegistry};
pub use sink::{
    MemorySink, PresentationLoop, PresentationSink, SinkCommand, SinkHandle, UiEvent,
    UiEventReceiver, UiEventSender,
};
pub use terminal::TerminalSink;
