//! Common test utilities.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;
use vbar_lib::Result;
use vbar_lib::app::App;
use vbar_lib::bar::{MemorySink, UiEvent, UiEventSender};
use vbar_lib::config::Settings;
use vbar_lib::platform::ipc::{AddBlock, ControlRequest, ResponseData, send_request};

/// Default time allowed for asynchronous effects to become visible.
pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// A bar running inside the test process.
pub struct TestBar {
    app: Option<App>,
    pub sink: MemorySink,
    pub dir: TempDir,
    events: UiEventSender,
}

impl TestBar {
    /// Starts a bar with no configuration script.
    pub async fn start() -> Self { Self::start_with_script(None).await }

    /// Starts a bar that runs `script` as its configuration.
    pub async fn start_with_script(script: Option<PathBuf>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path(), script);
        let sink = MemorySink::new();
        let (events, events_rx) = mpsc::unbounded_channel();

        let app = App::start(settings, Box::new(sink.clone()), events_rx).await.unwrap();

        Self { app: Some(app), sink, dir, events }
    }

    pub fn app(&self) -> &App { self.app.as_ref().unwrap() }

    pub fn socket(&self) -> PathBuf { self.app().socket_path().to_path_buf() }

    /// Takes ownership of the running app, e.g. to drive its shutdown.
    pub fn take_app(&mut self) -> App { self.app.take().unwrap() }

    /// Sends one control request.
    pub async fn send(&self, request: ControlRequest) -> Result<Option<ResponseData>> {
        send_request(&self.socket(), &request).await
    }

    /// Simulates a user interaction with the bar.
    pub fn emit(&self, event: UiEvent) { self.events.send(event).unwrap(); }

    /// Path of a scratch file inside the test directory.
    pub fn scratch(&self, name: &str) -> PathBuf { self.dir.path().join(name) }

    /// Shuts the bar down.
    pub async fn stop(mut self) {
        if let Some(app) = self.app.take() {
            app.shutdown().await;
        }
    }
}

/// Settings using `/bin/sh` and a socket inside `dir`.
pub fn settings_in(dir: &Path, config_script: Option<PathBuf>) -> Settings {
    Settings {
        socket_path: dir.join("vbar.sock"),
        config_script,
        shell: PathBuf::from("/bin/sh"),
    }
}

/// An `add-block` request for a static left block.
pub fn block(name: &str) -> AddBlock {
    AddBlock {
        name: name.to_string(),
        ..AddBlock::default()
    }
}

/// Polls `check` until it holds or `timeout` elapses.
pub async fn eventually<F>(timeout: Duration, mut check: F) -> bool
where F: FnMut() -> bool {
    let deadline = tokio::time::Instant::now() + timeout;

    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Number of lines in `path`, zero if it does not exist.
pub fn line_count(path: &Path) -> usize {
    std::fs::read_to_string(path).map(|text| text.lines().count()).unwrap_or(0)
}
