//! Control client used by every CLI command except `start`.

use std::path::Path;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::time;

use super::protocol::{ControlRequest, ControlResponse, ResponseData};
use crate::core::constants::ipc::PROBE_TIMEOUT;
use crate::core::{Error, Result};

/// State of the control endpoint at a given path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    /// Nothing exists at the path.
    Absent,
    /// A file exists but nobody is accepting connections on it.
    Stale,
    /// A bar instance is listening.
    Live,
}

/// Sends one request and waits for its response.
///
/// # Errors
///
/// Returns [`Error::Ipc`] if the bar cannot be reached or replies with
/// something unreadable, and [`Error::Other`] carrying the bar's reason when
/// the request was rejected.
pub async fn send_request(path: &Path, request: &ControlRequest) -> Result<Option<ResponseData>> {
    let stream = UnixStream::connect(path).await.map_err(|err| {
        Error::ipc(format!("cannot reach vbar at {} ({err}); is it running?", path.display()))
    })?;
    let (reader, mut writer) = stream.into_split();

    let mut line = request.encode()?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    writer.shutdown().await?;

    let response = BufReader::new(reader)
        .lines()
        .next_line()
        .await?
        .ok_or_else(|| Error::ipc("connection closed before a response was received"))?;

    match ControlResponse::decode(&response)
        .map_err(|err| Error::ipc(format!("malformed response: {err}")))?
    {
        ControlResponse::Success { data } => Ok(data),
        ControlResponse::Failure { reason } => Err(Error::other(reason)),
    }
}

/// Checks whether a bar instance owns the endpoint at `path`.
///
/// An instance that accepts the connection but does not answer a ping within
/// the probe timeout is still considered live.
pub async fn probe(path: &Path) -> Liveness {
    if !path.exists() {
        return Liveness::Absent;
    }

    let Ok(Ok(_)) = time::timeout(PROBE_TIMEOUT, UnixStream::connect(path)).await else {
        return Liveness::Stale;
    };

    match time::timeout(PROBE_TIMEOUT, send_request(path, &ControlRequest::Ping)).await {
        Ok(Ok(_)) => tracing::debug!(path = %path.display(), "existing instance answered ping"),
        Ok(Err(err)) => tracing::debug!(error = %err, "existing instance rejected ping"),
        Err(_) => tracing::debug!("existing instance did not answer ping in time"),
    }

    Liveness::Live
}

/// Returns `true` if a bar instance is listening at `path`.
pub async fn is_app_running(path: &Path) -> bool { probe(path).await == Liveness::Live }
