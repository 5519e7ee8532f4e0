//! Block executor.
//!
//! Turns a block's command configuration into a cancellable background task
//! that publishes text updates:
//!
//! - **Poll**: run the command once, then again on every interval tick.
//!   Overlapping runs are allowed; each publishes when it finishes.
//! - **Tail**: start the command once and publish every stdout line.
//!
//! Failures are logged and the block shows [`ERROR_TEXT`].

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, Instant, MissedTickBehavior};

use super::block::{BlockId, BlockMode};
use super::command::CommandRunner;
use super::sink::{SinkCommand, SinkHandle};
use crate::core::constants::ERROR_TEXT;

// ============================================================================
// Text publication
// ============================================================================

#[derive(Debug)]
struct TextCell {
    text: String,
    closed: bool,
}

/// Publishes text for one block into the presentation sink.
///
/// Clones share the same cell. Once [`TextPublisher::close`] returns, no
/// further `SetText` for the block is enqueued.
#[derive(Debug, Clone)]
pub struct TextPublisher {
    id: BlockId,
    name: Arc<str>,
    cell: Arc<Mutex<TextCell>>,
    sink: SinkHandle,
}

impl TextPublisher {
    /// Creates a publisher whose current text is `initial`.
    pub fn new(id: BlockId, name: &str, initial: &str, sink: SinkHandle) -> Self {
        Self {
            id,
            name: Arc::from(name),
            cell: Arc::new(Mutex::new(TextCell {
                text: initial.to_string(),
                closed: false,
            })),
            sink,
        }
    }

    /// Block this publisher writes to.
    #[must_use]
    pub const fn id(&self) -> BlockId { self.id }

    #[must_use]
    pub fn name(&self) -> &str { &self.name }

    /// Replaces the block text. Ignored after [`Self::close`].
    pub fn publish(&self, text: impl Into<String>) {
        let text = text.into();
        let mut cell = self.cell.lock();
        if cell.closed {
            return;
        }

        cell.text.clone_from(&text);
        self.sink.send(SinkCommand::SetText { id: self.id, text });
    }

    /// Shows the error sentinel.
    pub fn publish_failure(&self) { self.publish(ERROR_TEXT); }

    /// Last published text.
    #[must_use]
    pub fn current(&self) -> String { self.cell.lock().text.clone() }

    /// Stops all further publications.
    pub fn close(&self) { self.cell.lock().closed = true; }

    #[must_use]
    pub fn is_closed(&self) -> bool { self.cell.lock().closed }
}

// ============================================================================
// Block tasks
// ============================================================================

/// A running poll or tail loop.
///
/// Dropping the task without cancelling also stops it, but does not wait.
#[derive(Debug)]
pub struct BlockTask {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl BlockTask {
    fn spawn<F, Fut>(body: F) -> Self
    where
        F: FnOnce(watch::Receiver<bool>) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (stop, stop_rx) = watch::channel(false);
        let handle = tokio::spawn(body(stop_rx));
        Self { stop, handle }
    }

    /// Signals the task to stop and waits until it has.
    ///
    /// In-flight commands are killed.
    pub async fn cancel(self) {
        let _ = self.stop.send(true);

        if let Err(err) = self.handle.await
            && err.is_panic()
        {
            tracing::error!(error = %err, "block task panicked");
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool { self.handle.is_finished() }
}

/// Starts and drives block commands.
#[derive(Debug, Clone, Default)]
pub struct BlockExecutor {
    runner: CommandRunner,
}

impl BlockExecutor {
    pub const fn new(runner: CommandRunner) -> Self { Self { runner } }

    #[must_use]
    pub const fn runner(&self) -> &CommandRunner { &self.runner }

    /// Starts the background task for `mode`.
    ///
    /// Static blocks have no task. Must be called from within a Tokio runtime.
    pub fn start(&self, mode: &BlockMode, publisher: TextPublisher) -> Option<BlockTask> {
        let runner = self.runner.clone();

        match mode {
            BlockMode::Static => None,
            BlockMode::Poll { command, interval } => {
                let command = command.clone();
                let interval = *interval;
                Some(BlockTask::spawn(move |stop| {
                    poll_loop(runner, command, interval, publisher, stop)
                }))
            }
            BlockMode::Tail { command } => {
                let command = command.clone();
                Some(BlockTask::spawn(move |stop| tail_loop(runner, command, publisher, stop)))
            }
        }
    }

    /// Runs `command` once and publishes the result.
    pub async fn run_once(&self, command: &str, publisher: &TextPublisher) {
        run_and_publish(&self.runner, command, publisher).await;
    }

    /// Runs a click or menu command in the background.
    pub fn fire(&self, command: &str, context: &str) { self.runner.spawn_detached(command, context); }
}

async fn run_and_publish(runner: &CommandRunner, command: &str, publisher: &TextPublisher) {
    match runner.output(command).await {
        Ok(text) => publisher.publish(text),
        Err(err) => {
            tracing::warn!(block = %publisher.name(), error = %err, "block command failed");
            publisher.publish_failure();
        }
    }
}

async fn poll_loop(
    runner: CommandRunner,
    command: String,
    interval: Duration,
    publisher: TextPublisher,
    mut stop: watch::Receiver<bool>,
) {
    tokio::select! {
        biased;
        _ = stop.changed() => return,
        () = run_and_publish(&runner, &command, &publisher) => {}
    }

    if interval.is_zero() {
        return;
    }

    let Some(start) = Instant::now().checked_add(interval) else {
        tracing::warn!(block = %publisher.name(), ?interval, "interval out of range, polling once");
        return;
    };

    let mut ticker = time::interval_at(start, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut runs = JoinSet::new();

    loop {
        tokio::select! {
            biased;
            _ = stop.changed() => break,
            _ = ticker.tick() => {
                let runner = runner.clone();
                let command = command.clone();
                let publisher = publisher.clone();
                runs.spawn(async move { run_and_publish(&runner, &command, &publisher).await });
            }
            Some(_) = runs.join_next(), if !runs.is_empty() => {}
        }
    }

    runs.shutdown().await;
    tracing::debug!(block = %publisher.name(), "poll loop stopped");
}

async fn tail_loop(
    runner: CommandRunner,
    command: String,
    publisher: TextPublisher,
    mut stop: watch::Receiver<bool>,
) {
    let mut child = match runner.spawn_streaming(&command) {
        Ok(child) => child,
        Err(err) => {
            tracing::warn!(block = %publisher.name(), error = %err, "tail command failed to start");
            publisher.publish_failure();
            return;
        }
    };

    let Some(stdout) = child.stdout.take() else {
        tracing::warn!(block = %publisher.name(), "tail command has no stdout");
        publisher.publish_failure();
        return;
    };

    let mut reader = BufReader::new(stdout);
    let mut line = Vec::new();

    loop {
        line.clear();
        tokio::select! {
            biased;
            _ = stop.changed() => {
                let _ = child.kill().await;
                return;
            }
            read = reader.read_until(b'\n', &mut line) => match read {
                Ok(0) => break,
                Ok(_) => publisher.publish(String::from_utf8_lossy(&line).trim()),
                Err(err) => {
                    tracing::warn!(block = %publisher.name(), error = %err, "failed to read tail output");
                    publisher.publish_failure();
                    let _ = child.kill().await;
                    return;
                }
            },
        }
    }

    // Stdout closed; the last line stays unless the command failed.
    let status = tokio::select! {
        biased;
        _ = stop.changed() => {
            let _ = child.kill().await;
            return;
        }
        status = child.wait() => status,
    };

    match status {
        Ok(status) if status.success() => {
            tracing::debug!(block = %publisher.name(), "tail command finished");
        }
        Ok(status) => {
            tracing::warn!(block = %publisher.name(), %status, "tail command exited unsuccessfully");
            publisher.publish_failure();
        }
        Err(err) => {
            tracing::warn!(block = %publisher.name(), error = %err, "failed to wait for tail command");
            publisher.publish_failure();
        }
    }
}
