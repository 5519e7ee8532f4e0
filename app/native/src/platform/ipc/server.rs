//! Control server.
//!
//! Owns the well-known socket for the lifetime of the bar, accepts
//! connections concurrently and applies each request to the registry.

use std::fs;
use std::os::unix::fs::{FileTypeExt, PermissionsExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{Notify, watch};
use tokio::task::{JoinHandle, JoinSet};

use super::client::{Liveness, probe};
use super::protocol::{ControlRequest, ControlResponse, ResponseData};
use crate::bar::{BlockRegistry, BlockSpec};
use crate::core::constants::{APP_VERSION, ipc::MAX_REQUEST_BYTES};
use crate::core::{Error, Result};

/// How long in-flight connections get to finish during shutdown.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

// ============================================================================
// Dispatch
// ============================================================================

/// Applies control requests to the running bar.
#[derive(Debug)]
pub struct Dispatcher {
    registry: Arc<BlockRegistry>,
    quit: Arc<Notify>,
}

impl Dispatcher {
    /// Creates a dispatcher. `quit` is notified when a `quit` request arrives.
    pub const fn new(registry: Arc<BlockRegistry>, quit: Arc<Notify>) -> Self {
        Self { registry, quit }
    }

    /// Handles one request.
    pub async fn dispatch(&self, request: ControlRequest) -> ControlResponse {
        tracing::debug!(?request, "control request");

        match request {
            ControlRequest::AddBlock(add) => self.add_block(add.try_into()).into(),
            ControlRequest::AddCss(css) => self.registry.add_css(&css.class, &css.css).into(),
            ControlRequest::AddMenu(menu) => {
                self.registry.add_menu_item(&menu.name, &menu.text, &menu.command).into()
            }
            ControlRequest::Update { name } => self.registry.update_block(&name).await.into(),
            ControlRequest::Remove { name } => self.registry.remove_block(&name).await.into(),
            ControlRequest::Ping => ControlResponse::with_data(ResponseData::Pong {
                pid: std::process::id(),
                version: APP_VERSION.to_string(),
            }),
            ControlRequest::List => ControlResponse::with_data(ResponseData::Blocks {
                blocks: self.registry.list(),
            }),
            ControlRequest::Quit => {
                tracing::info!("quit requested");
                self.quit.notify_one();
                ControlResponse::ok()
            }
        }
    }

    fn add_block(&self, spec: Result<BlockSpec>) -> Result<()> {
        self.registry.add_and_start_block(spec?)?;
        Ok(())
    }
}

// ============================================================================
// Server
// ============================================================================

/// A bound control endpoint that is not yet serving.
#[derive(Debug)]
pub struct ControlServer {
    listener: UnixListener,
    path: PathBuf,
}

impl ControlServer {
    /// Acquires the control endpoint at `path`.
    ///
    /// A leftover socket file with nobody listening is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyRunning`] if another instance is listening, or
    /// an I/O error if the socket cannot be created.
    pub async fn bind(path: &Path) -> Result<Self> {
        match probe(path).await {
            Liveness::Live => return Err(Error::AlreadyRunning(path.to_path_buf())),
            Liveness::Stale => {
                if !fs::symlink_metadata(path)?.file_type().is_socket() {
                    return Err(Error::ipc(format!(
                        "{} exists and is not a socket",
                        path.display()
                    )));
                }
                tracing::info!(path = %path.display(), "removing stale control socket");
                fs::remove_file(path)?;
            }
            Liveness::Absent => {}
        }

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let listener = UnixListener::bind(path).map_err(|err| {
            Error::ipc(format!("failed to bind control socket {}: {err}", path.display()))
        })?;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;

        tracing::info!(path = %path.display(), "control socket bound");
        Ok(Self { listener, path: path.to_path_buf() })
    }

    #[must_use]
    pub fn path(&self) -> &Path { &self.path }

    /// Starts accepting connections. Must be called within a Tokio runtime.
    pub fn serve(self, dispatcher: Arc<Dispatcher>) -> ServerHandle {
        let (stop, stop_rx) = watch::channel(false);
        let path = self.path.clone();
        let task = tokio::spawn(accept_loop(self.listener, dispatcher, stop_rx));
        ServerHandle { stop, task, path }
    }
}

/// A serving control endpoint.
#[derive(Debug)]
pub struct ServerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
    path: PathBuf,
}

impl ServerHandle {
    #[must_use]
    pub fn path(&self) -> &Path { &self.path }

    /// Stops accepting new connections.
    ///
    /// The socket file stays in place until [`Self::release`].
    pub fn stop(&self) { let _ = self.stop.send(true); }

    /// Waits for the accept loop, then removes the socket file.
    pub async fn release(self) {
        let _ = self.stop.send(true);
        if let Err(err) = self.task.await
            && err.is_panic()
        {
            tracing::error!(error = %err, "control server panicked");
        }

        match fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "control socket removed"),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => tracing::warn!(error = %err, "failed to remove control socket"),
        }
    }
}

async fn accept_loop(
    listener: UnixListener,
    dispatcher: Arc<Dispatcher>,
    mut stop: watch::Receiver<bool>,
) {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            biased;
            _ = stop.changed() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    let dispatcher = Arc::clone(&dispatcher);
                    connections.spawn(async move {
                        if let Err(err) = handle_connection(stream, dispatcher).await {
                            tracing::debug!(error = %err, "control connection ended with error");
                        }
                    });
                }
                Err(err) => tracing::warn!(error = %err, "failed to accept control connection"),
            },
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    drop(listener);
    let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
        while connections.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        tracing::debug!(remaining = connections.len(), "aborting idle control connections");
        connections.shutdown().await;
    }

    tracing::debug!("control server stopped");
}

/// One newline-delimited request as read from a connection.
#[derive(Debug)]
enum Frame {
    Line(String),
    Oversized,
    Eof,
}

/// Reads the next request line, buffering at most [`MAX_REQUEST_BYTES`].
///
/// The remainder of an oversized line is skipped so the next request on the
/// same connection starts cleanly.
async fn read_frame<R>(reader: &mut R, buf: &mut Vec<u8>) -> io::Result<Frame>
where R: AsyncBufRead + Unpin {
    buf.clear();
    let limit = MAX_REQUEST_BYTES as u64 + 1;
    if (&mut *reader).take(limit).read_until(b'\n', buf).await? == 0 {
        return Ok(Frame::Eof);
    }

    if buf.last() != Some(&b'\n') && buf.len() > MAX_REQUEST_BYTES {
        skip_line(reader).await?;
        return Ok(Frame::Oversized);
    }

    Ok(Frame::Line(String::from_utf8_lossy(buf).into_owned()))
}

async fn skip_line<R>(reader: &mut R) -> io::Result<()>
where R: AsyncBufRead + Unpin {
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(());
        }

        if let Some(end) = available.iter().position(|&byte| byte == b'\n') {
            reader.consume(end + 1);
            return Ok(());
        }

        let len = available.len();
        reader.consume(len);
    }
}

async fn handle_connection(stream: UnixStream, dispatcher: Arc<Dispatcher>) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();

    loop {
        let response = match read_frame(&mut reader, &mut buf).await? {
            Frame::Eof => break,
            Frame::Oversized => {
                ControlResponse::failure(format!("request exceeds {MAX_REQUEST_BYTES} bytes"))
            }
            Frame::Line(line) if line.trim().is_empty() => continue,
            Frame::Line(line) => match ControlRequest::decode(&line) {
                Ok(request) => dispatcher.dispatch(request).await,
                Err(err) => ControlResponse::failure(format!("malformed request: {err}")),
            },
        };

        let mut encoded = response.encode()?;
        encoded.push('\n');
        writer.write_all(encoded.as_bytes()).await?;
        writer.flush().await?;
    }

    Ok(())
}
