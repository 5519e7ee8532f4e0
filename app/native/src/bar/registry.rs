//! Block registry.
//!
//! The single authority over which blocks exist. Names are unique among live
//! blocks; lookups, additions and removals are serialized by one mutex that
//! is never held across an `.await`.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use futures::future::join_all;
use parking_lot::Mutex;

use super::block::{BlockId, BlockSpec, BlockSummary, MenuItem, Position};
use super::executor::{BlockExecutor, BlockTask, TextPublisher};
use super::layout::GroupSpans;
use super::sink::{SinkCommand, SinkHandle, UiEvent};
use crate::core::{Error, Result};

/// Returned by [`BlockRegistry::add_block`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHandle {
    pub id: BlockId,
    pub name: String,
    pub position: Position,
}

#[derive(Debug)]
struct Block {
    id: BlockId,
    spec: BlockSpec,
    publisher: TextPublisher,
    menu: Option<Vec<MenuItem>>,
    task: Option<BlockTask>,
}

impl Block {
    fn handle(&self) -> BlockHandle {
        BlockHandle {
            id: self.id,
            name: self.spec.name.clone(),
            position: self.spec.position,
        }
    }

    fn summary(&self) -> BlockSummary {
        BlockSummary {
            name: self.spec.name.clone(),
            position: self.spec.position,
            text: self.publisher.current(),
            mode: self.spec.mode().label().to_string(),
            interval: self.spec.interval.as_secs(),
            menu_items: self.menu.as_ref().map_or(0, Vec::len),
            clickable: self.spec.click_command.is_some(),
        }
    }
}

/// Live blocks in insertion order.
#[derive(Debug)]
pub struct BlockRegistry {
    blocks: Mutex<Vec<Block>>,
    sink: SinkHandle,
    executor: BlockExecutor,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl BlockRegistry {
    pub fn new(sink: SinkHandle, executor: BlockExecutor) -> Self {
        Self {
            blocks: Mutex::new(Vec::new()),
            sink,
            executor,
            next_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
        }
    }

    /// Handle for enqueueing presentation commands.
    #[must_use]
    pub const fn sink(&self) -> &SinkHandle { &self.sink }

    /// Registers a block and creates its widget.
    ///
    /// The block's command is not started; see [`Self::start_block`].
    ///
    /// # Errors
    ///
    /// Returns an error if the spec is invalid, the name is taken, or the
    /// registry is shutting down.
    pub fn add_block(&self, spec: BlockSpec) -> Result<BlockHandle> { self.register(spec, false) }

    /// Registers a block and starts its command under the same lock.
    ///
    /// A concurrent shutdown or removal can therefore never leave a started
    /// task behind or observe a half-added block.
    ///
    /// # Errors
    ///
    /// Same as [`Self::add_block`].
    pub fn add_and_start_block(&self, spec: BlockSpec) -> Result<BlockHandle> {
        self.register(spec, true)
    }

    fn register(&self, spec: BlockSpec, start: bool) -> Result<BlockHandle> {
        spec.validate()?;

        let mut blocks = self.blocks.lock();
        self.ensure_open()?;

        if blocks.iter().any(|block| block.spec.name == spec.name) {
            return Err(Error::DuplicateBlock(spec.name));
        }

        let spans = GroupSpans::from_blocks(blocks.iter().map(|b| (b.id, b.spec.position)));
        let placement = spans.placement_for(spec.position);
        let id = BlockId(self.next_id.fetch_add(1, Ordering::Relaxed));

        self.sink.send(SinkCommand::CreateBlock {
            id,
            name: spec.name.clone(),
            text: spec.text.clone(),
            position: spec.position,
            placement,
        });

        let publisher = TextPublisher::new(id, &spec.name, &spec.text, self.sink.clone());
        let task = if start { self.executor.start(&spec.mode(), publisher.clone()) } else { None };
        let block = Block {
            id,
            publisher,
            spec,
            menu: None,
            task,
        };
        let handle = block.handle();
        blocks.push(block);

        tracing::info!(block = %handle.name, id = %id, position = %handle.position, "block added");
        Ok(handle)
    }

    /// Starts the command of a block previously returned by [`Self::add_block`].
    ///
    /// Starting an already started block is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the block has since been removed or the registry
    /// is shutting down.
    pub fn start_block(&self, handle: &BlockHandle) -> Result<()> {
        let mut blocks = self.blocks.lock();
        self.ensure_open()?;

        let block = blocks
            .iter_mut()
            .find(|block| block.id == handle.id)
            .ok_or_else(|| Error::not_found(&handle.name))?;

        if block.task.is_none() && !block.publisher.is_closed() {
            block.task = self.executor.start(&block.spec.mode(), block.publisher.clone());
        }

        Ok(())
    }

    /// Looks up a live block by name.
    #[must_use]
    pub fn find_block(&self, name: &str) -> Option<BlockHandle> {
        self.blocks.lock().iter().find(|block| block.spec.name == name).map(Block::handle)
    }

    /// Cancels a block's task and removes it from the registry and the bar.
    ///
    /// Returns once the task has stopped; no text for the block is published
    /// afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BlockNotFound`] for an unknown name.
    pub async fn remove_block(&self, name: &str) -> Result<()> {
        let block = {
            let mut blocks = self.blocks.lock();
            let index = blocks
                .iter()
                .position(|block| block.spec.name == name)
                .ok_or_else(|| Error::not_found(name))?;
            let block = blocks.remove(index);
            block.publisher.close();
            self.sink.send(SinkCommand::RemoveBlock { id: block.id });
            block
        };

        if let Some(task) = block.task {
            task.cancel().await;
        }

        tracing::info!(block = %name, id = %block.id, "block removed");
        Ok(())
    }

    /// Runs the block's command once, outside its schedule.
    ///
    /// Blocks without a polling command are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BlockNotFound`] for an unknown name.
    pub async fn update_block(&self, name: &str) -> Result<()> {
        let (command, publisher) = {
            let blocks = self.blocks.lock();
            let block = blocks
                .iter()
                .find(|block| block.spec.name == name)
                .ok_or_else(|| Error::not_found(name))?;
            (block.spec.command.clone(), block.publisher.clone())
        };

        match command {
            Some(command) => self.executor.run_once(&command, &publisher).await,
            None => tracing::debug!(block = %name, "update ignored, block has no command"),
        }

        Ok(())
    }

    /// Appends an entry to the block's menu, creating the menu on first use.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BlockNotFound`] for an unknown name.
    pub fn add_menu_item(&self, name: &str, label: &str, command: &str) -> Result<()> {
        let mut blocks = self.blocks.lock();
        let block = blocks
            .iter_mut()
            .find(|block| block.spec.name == name)
            .ok_or_else(|| Error::not_found(name))?;

        let id = block.id;
        let menu = block.menu.get_or_insert_with(|| {
            self.sink.send(SinkCommand::CreateMenu { id });
            Vec::new()
        });
        menu.push(MenuItem {
            label: label.to_string(),
            command: command.to_string(),
        });
        self.sink.send(SinkCommand::AddMenuItem { id, label: label.to_string() });

        Ok(())
    }

    /// Forwards a style rule to the bar.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty class name.
    pub fn add_css(&self, class: &str, css: &str) -> Result<()> {
        if class.trim().is_empty() {
            return Err(Error::invalid_args("css class must not be empty"));
        }

        self.sink.send(SinkCommand::AddCss {
            class: class.to_string(),
            css: css.to_string(),
        });
        Ok(())
    }

    /// Reacts to a click or menu activation reported by the sink.
    pub fn handle_ui_event(&self, event: &UiEvent) {
        let blocks = self.blocks.lock();

        match event {
            UiEvent::Clicked { name } => {
                let Some(block) = blocks.iter().find(|block| &block.spec.name == name) else {
                    tracing::debug!(block = %name, "click on unknown block");
                    return;
                };

                if block.menu.is_some() {
                    self.sink.send(SinkCommand::PopupMenu { id: block.id });
                }
                if let Some(command) = &block.spec.click_command {
                    self.executor.fire(command, name);
                }
            }
            UiEvent::MenuItemActivated { name, index } => {
                let item = blocks
                    .iter()
                    .find(|block| &block.spec.name == name)
                    .and_then(|block| block.menu.as_ref())
                    .and_then(|menu| menu.get(*index));

                match item {
                    Some(item) => self.executor.fire(&item.command, &item.label),
                    None => tracing::debug!(block = %name, index, "unknown menu item"),
                }
            }
        }
    }

    /// Summaries of every live block in insertion order.
    #[must_use]
    pub fn list(&self) -> Vec<BlockSummary> { self.blocks.lock().iter().map(Block::summary).collect() }

    #[must_use]
    pub fn len(&self) -> usize { self.blocks.lock().len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.blocks.lock().is_empty() }

    /// Rejects further additions and stops every block task.
    pub async fn shutdown(&self) {
        let tasks: Vec<BlockTask> = {
            let mut blocks = self.blocks.lock();
            self.closed.store(true, Ordering::SeqCst);
            blocks
                .iter_mut()
                .filter_map(|block| {
                    block.publisher.close();
                    block.task.take()
                })
                .collect()
        };

        tracing::debug!(count = tasks.len(), "stopping block tasks");
        join_all(tasks.into_iter().map(BlockTask::cancel)).await;
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(Error::other("vbar is shutting down"))
        } else {
            Ok(())
        }
    }
}
