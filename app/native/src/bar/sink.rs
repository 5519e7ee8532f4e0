//! Presentation sink and the loop that owns it.
//!
//! All mutations of the visible bar are funnelled into a single dedicated
//! thread through an unbounded channel. Producers (block tasks, the control
//! server) never touch the sink directly; they enqueue [`SinkCommand`]s
//! through a cloneable [`SinkHandle`]. Commands are applied strictly in
//! enqueue order.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread::JoinHandle;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::block::{BlockId, Position};
use super::layout::{BarLayout, Placement};
use crate::core::{Error, Result};
use crate::utils::spawn_named_thread;

// ============================================================================
// Commands and events
// ============================================================================

/// A single mutation of the visible bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCommand {
    CreateBlock {
        id: BlockId,
        name: String,
        text: String,
        position: Position,
        placement: Placement,
    },
    SetText {
        id: BlockId,
        text: String,
    },
    CreateMenu {
        id: BlockId,
    },
    AddMenuItem {
        id: BlockId,
        label: String,
    },
    PopupMenu {
        id: BlockId,
    },
    RemoveBlock {
        id: BlockId,
    },
    AddCss {
        class: String,
        css: String,
    },
}

/// User interaction reported by a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// The block named `name` was clicked.
    Clicked { name: String },
    /// Item `index` of the menu attached to `name` was activated.
    MenuItemActivated { name: String, index: usize },
}

/// Sender half for [`UiEvent`]s.
pub type UiEventSender = mpsc::UnboundedSender<UiEvent>;

/// Receiver half for [`UiEvent`]s.
pub type UiEventReceiver = mpsc::UnboundedReceiver<UiEvent>;

// ============================================================================
// Sink trait
// ============================================================================

/// The visible bar.
///
/// Implementations are only ever called from the presentation thread.
pub trait PresentationSink: Send {
    fn create_block(
        &mut self,
        id: BlockId,
        name: &str,
        text: &str,
        position: Position,
        placement: Placement,
    );

    fn set_text(&mut self, id: BlockId, text: &str);

    fn create_menu(&mut self, id: BlockId);

    fn add_menu_item(&mut self, id: BlockId, label: &str);

    fn popup_menu(&mut self, id: BlockId);

    fn remove_block(&mut self, id: BlockId);

    fn add_css(&mut self, class: &str, css: &str);

    /// Called after a batch of commands has been applied.
    fn flush(&mut self) {}

    /// Applies one command.
    fn apply(&mut self, command: SinkCommand) {
        match command {
            SinkCommand::CreateBlock { id, name, text, position, placement } => {
                self.create_block(id, &name, &text, position, placement);
            }
            SinkCommand::SetText { id, text } => self.set_text(id, &text),
            SinkCommand::CreateMenu { id } => self.create_menu(id),
            SinkCommand::AddMenuItem { id, label } => self.add_menu_item(id, &label),
            SinkCommand::PopupMenu { id } => self.popup_menu(id),
            SinkCommand::RemoveBlock { id } => self.remove_block(id),
            SinkCommand::AddCss { class, css } => self.add_css(&class, &css),
        }
    }
}

// ============================================================================
// Presentation loop
// ============================================================================

#[derive(Debug)]
enum Message {
    Command(SinkCommand),
    Shutdown,
}

/// Cloneable handle for enqueueing [`SinkCommand`]s.
#[derive(Debug, Clone)]
pub struct SinkHandle {
    tx: mpsc::UnboundedSender<Message>,
}

impl SinkHandle {
    /// Enqueues `command`. Commands sent after shutdown are dropped.
    pub fn send(&self, command: SinkCommand) {
        if self.tx.send(Message::Command(command)).is_err() {
            tracing::trace!("presentation loop closed, dropping command");
        }
    }

    /// Returns `true` once the presentation loop has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool { self.tx.is_closed() }
}

/// The dedicated presentation thread.
#[derive(Debug)]
pub struct PresentationLoop {
    handle: SinkHandle,
    thread: Option<JoinHandle<()>>,
}

impl PresentationLoop {
    /// Moves `sink` onto a new `vbar-presentation` thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn(mut sink: Box<dyn PresentationSink>) -> Result<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

        let thread = spawn_named_thread("presentation", move || {
            tracing::debug!("presentation loop started");

            'outer: while let Some(message) = rx.blocking_recv() {
                let mut next = Some(message);

                // Drain whatever is already queued before flushing once.
                while let Some(message) = next {
                    match message {
                        Message::Command(command) => sink.apply(command),
                        Message::Shutdown => {
                            sink.flush();
                            break 'outer;
                        }
                    }
                    next = rx.try_recv().ok();
                }

                sink.flush();
            }

            tracing::debug!("presentation loop stopped");
        })
        .ok_or_else(|| Error::other("failed to spawn presentation thread"))?;

        Ok(Self {
            handle: SinkHandle { tx },
            thread: Some(thread),
        })
    }

    /// Returns a handle for enqueueing commands.
    #[must_use]
    pub fn handle(&self) -> SinkHandle { self.handle.clone() }

    /// Applies everything already queued, then stops the thread and waits
    /// for it.
    pub fn shutdown(mut self) {
        let _ = self.handle.tx.send(Message::Shutdown);

        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            tracing::error!("presentation thread panicked");
        }
    }
}

// ============================================================================
// In-memory sink
// ============================================================================

/// State of one widget held by [`MemorySink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetState {
    pub name: String,
    pub text: String,
    pub position: Position,
    pub menu: Option<Vec<String>>,
    /// Every text the widget has shown, oldest first.
    pub history: Vec<String>,
}

/// Snapshot of everything [`MemorySink`] has been told.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryState {
    pub layout: BarLayout,
    pub widgets: HashMap<BlockId, WidgetState>,
    pub css: Vec<(String, String)>,
    pub popups: Vec<BlockId>,
}

/// A sink that records commands instead of drawing.
///
/// Used by `vbar start --headless` and by tests. Clones share state, so one
/// clone can be moved into the presentation loop while another is inspected.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> MemoryState { self.state.lock().clone() }

    /// Returns the current text of the widget named `name`.
    #[must_use]
    pub fn text_of(&self, name: &str) -> Option<String> {
        self.state.lock().widgets.values().find(|w| w.name == name).map(|w| w.text.clone())
    }

    /// Returns every text the widget named `name` has shown.
    #[must_use]
    pub fn history_of(&self, name: &str) -> Vec<String> {
        self.state
            .lock()
            .widgets
            .values()
            .find(|w| w.name == name)
            .map(|w| w.history.clone())
            .unwrap_or_default()
    }

    /// Returns widget names from left to right.
    #[must_use]
    pub fn names_in_order(&self) -> Vec<String> {
        let state = self.state.lock();
        state
            .layout
            .order()
            .iter()
            .filter_map(|id| state.widgets.get(id).map(|w| w.name.clone()))
            .collect()
    }
}

impl PresentationSink for MemorySink {
    fn create_block(
        &mut self,
        id: BlockId,
        name: &str,
        text: &str,
        position: Position,
        placement: Placement,
    ) {
        let mut state = self.state.lock();
        state.layout.attach(id, placement);
        state.widgets.insert(id, WidgetState {
            name: name.to_string(),
            text: text.to_string(),
            position,
            menu: None,
            history: vec![text.to_string()],
        });
    }

    fn set_text(&mut self, id: BlockId, text: &str) {
        if let Some(widget) = self.state.lock().widgets.get_mut(&id) {
            widget.text = text.to_string();
            widget.history.push(text.to_string());
        }
    }

    fn create_menu(&mut self, id: BlockId) {
        if let Some(widget) = self.state.lock().widgets.get_mut(&id) {
            widget.menu.get_or_insert_with(Vec::new);
        }
    }

    fn add_menu_item(&mut self, id: BlockId, label: &str) {
        if let Some(widget) = self.state.lock().widgets.get_mut(&id) {
            widget.menu.get_or_insert_with(Vec::new).push(label.to_string());
        }
    }

    fn popup_menu(&mut self, id: BlockId) { self.state.lock().popups.push(id); }

    fn remove_block(&mut self, id: BlockId) {
        let mut state = self.state.lock();
        state.layout.detach(id);
        state.widgets.remove(&id);
    }

    fn add_css(&mut self, class: &str, css: &str) {
        self.state.lock().css.push((class.to_string(), css.to_string()));
    }
}
