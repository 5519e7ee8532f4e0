//! Bar process lifecycle.
//!
//! Startup order:
//!
//! 1. acquire the control socket (fails fast if another bar owns it)
//! 2. start the presentation thread
//! 3. create the registry and start serving requests
//! 4. run the configuration script in the background
//!
//! Shutdown runs in reverse: stop accepting requests, cancel every block
//! task, drain the presentation queue, remove the socket.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;

use crate::bar::{
    BlockExecutor, BlockRegistry, CommandRunner, MemorySink, PresentationLoop, PresentationSink,
    TerminalSink, UiEventReceiver, terminal,
};
use crate::config::Settings;
use crate::core::constants::env;
use crate::core::prelude::*;
use crate::logging;
use crate::platform::ipc::{ControlServer, Dispatcher, ServerHandle};

/// Runs the bar until it is interrupted or receives a `quit` request.
///
/// # Errors
///
/// Returns an error if the control socket cannot be acquired or the runtime
/// cannot be created.
pub fn run(settings: Settings, headless: bool) -> Result<()> {
    logging::init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name(format!("{APP_NAME}-worker"))
        .build()?;

    runtime.block_on(async move {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let sink: Box<dyn PresentationSink> = if headless {
            Box::new(MemorySink::new())
        } else {
            terminal::spawn_input_reader(events_tx);
            Box::new(TerminalSink::stdout())
        };

        let app = App::start(settings, sink, events_rx).await?;
        app.run_until_shutdown().await;
        Ok(())
    })
}

/// A running bar.
#[derive(Debug)]
pub struct App {
    registry: Arc<BlockRegistry>,
    presentation: PresentationLoop,
    server: ServerHandle,
    quit: Arc<Notify>,
    events_task: JoinHandle<()>,
    script_task: Option<JoinHandle<()>>,
}

impl App {
    /// Starts every component of the bar.
    ///
    /// Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyRunning`] if another bar owns the socket, or an
    /// error if the socket or presentation thread cannot be created.
    pub async fn start(
        settings: Settings,
        sink: Box<dyn PresentationSink>,
        events: UiEventReceiver,
    ) -> Result<Self> {
        let server = ControlServer::bind(&settings.socket_path).await?;
        let presentation = PresentationLoop::spawn(sink)?;

        let runner = CommandRunner::new(&settings.shell);
        let registry = Arc::new(BlockRegistry::new(
            presentation.handle(),
            BlockExecutor::new(runner.clone()),
        ));

        let quit = Arc::new(Notify::new());
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&registry), Arc::clone(&quit)));
        let server = server.serve(dispatcher);

        let events_task = tokio::spawn(forward_ui_events(Arc::clone(&registry), events));

        let socket_path = server.path().to_path_buf();
        let script_task = settings
            .config_script
            .map(|script| tokio::spawn(run_config_script(runner, script, socket_path)));

        tracing::info!(socket = %server.path().display(), version = APP_VERSION, "vbar started");

        Ok(Self {
            registry,
            presentation,
            server,
            quit,
            events_task,
            script_task,
        })
    }

    #[must_use]
    pub const fn registry(&self) -> &Arc<BlockRegistry> { &self.registry }

    #[must_use]
    pub fn socket_path(&self) -> &Path { self.server.path() }

    /// Handle that stops the bar when notified.
    #[must_use]
    pub fn quit_handle(&self) -> Arc<Notify> { Arc::clone(&self.quit) }

    /// Waits for Ctrl-C, SIGTERM or a `quit` request, then shuts down.
    pub async fn run_until_shutdown(self) {
        wait_for_shutdown(&self.quit).await;
        self.shutdown().await;
    }

    /// Stops the bar.
    pub async fn shutdown(self) {
        tracing::info!("shutting down");

        self.server.stop();
        if let Some(task) = &self.script_task {
            task.abort();
        }
        self.events_task.abort();

        self.registry.shutdown().await;

        let presentation = self.presentation;
        if let Err(err) = tokio::task::spawn_blocking(move || presentation.shutdown()).await {
            tracing::error!(error = %err, "failed to stop presentation loop");
        }

        self.server.release().await;
        tracing::info!("vbar stopped");
    }
}

async fn forward_ui_events(registry: Arc<BlockRegistry>, mut events: UiEventReceiver) {
    while let Some(event) = events.recv().await {
        tracing::debug!(?event, "ui event");
        registry.handle_ui_event(&event);
    }
}

async fn run_config_script(runner: CommandRunner, script: PathBuf, socket: PathBuf) {
    tracing::info!(script = %script.display(), "running configuration script");

    match runner.run_script(&script, [(env::SOCKET, socket.as_os_str())]).await {
        Ok(()) => tracing::info!("configuration script finished"),
        Err(err) => tracing::error!(error = %err, "configuration script failed"),
    }
}

async fn wait_for_shutdown(quit: &Notify) {
    use tokio::signal::unix::{SignalKind, signal};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(terminate) => Some(terminate),
        Err(err) => {
            tracing::warn!(error = %err, "cannot listen for SIGTERM");
            None
        }
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                tracing::warn!(error = %err, "cannot listen for Ctrl-C");
                quit.notified().await;
            }
        }
        Some(()) = async {
            match terminate.as_mut() {
                Some(terminate) => terminate.recv().await,
                None => std::future::pending().await,
            }
        } => tracing::info!("received SIGTERM"),
        () = quit.notified() => {}
    }
}
