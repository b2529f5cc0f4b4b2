//! NDJSON transports in front of the relay worker.
//!
//! Listens on a UNIX socket (or reads stdin), decodes one request per line,
//! forwards it to the worker and writes the response line back.
//!
//! CHANGELOG:
//! - 10/16/2026 - Async transports over the relay worker; stdio mode

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

use crate::config::RelayConfig;
use crate::relay::protocol::{Request, Response};
use crate::relay::worker::{RelayHandle, RelayWorker};

const MAX_ACCEPT_BACKOFF: Duration = Duration::from_secs(1);

/// Relay server listening on UNIX socket.
pub struct RelayServer {
    worker: RelayWorker,
    socket_path: PathBuf,
}

impl RelayServer {
    /// Create new relay server with its own worker.
    pub fn new(config: &RelayConfig) -> Result<Self> {
        let worker = RelayWorker::spawn(config)?;

        Ok(Self {
            worker,
            socket_path: config.socket_path.clone(),
        })
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Bind the socket (owner-only permissions).
    pub fn bind(&self) -> Result<UnixListener> {
        // Clean up stale socket
        let _ = std::fs::remove_file(&self.socket_path);

        let listener = UnixListener::bind(&self.socket_path)
            .with_context(|| format!("Failed to bind {:?}", self.socket_path))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(listener)
    }

    /// Accept connections until the listener fails.
    pub async fn serve(&self) -> Result<()> {
        let listener = self.bind()?;
        self.serve_on(listener).await
    }

    /// Accept connections on an already bound listener.
    pub async fn serve_on(&self, listener: UnixListener) -> Result<()> {
        tracing::info!(socket = %self.socket_path.display(), "listening");

        let mut failures: u32 = 0;

        loop {
            match listener.accept().await {
                Ok((stream, _)) => {
                    failures = 0;
                    let relay = self.worker.handle();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, relay).await {
                            tracing::warn!(error = %e, "connection error");
                        }
                    });
                }
                Err(e) => {
                    failures = failures.saturating_add(1);
                    let delay = accept_backoff(failures);
                    tracing::error!(
                        error = %e,
                        failures,
                        delay_ms = delay.as_millis() as u64,
                        "accept error"
                    );
                    // e.g. EMFILE persists until connections close
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Pause after the n-th consecutive accept failure: 10ms doubling, capped at 1s.
fn accept_backoff(failures: u32) -> Duration {
    let exp = failures.saturating_sub(1).min(7);
    Duration::from_millis(10u64 << exp).min(MAX_ACCEPT_BACKOFF)
}

/// Handle a single client connection.
async fn handle_connection(stream: UnixStream, relay: RelayHandle) -> Result<()> {
    let (reader, writer) = stream.into_split();
    serve_lines(BufReader::new(reader), writer, &relay).await
}

/// Relay NDJSON from stdin to stdout until EOF.
pub async fn serve_stdio(config: &RelayConfig) -> Result<()> {
    let worker = RelayWorker::spawn(config)?;
    let relay = worker.handle();

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    serve_lines(stdin, stdout, &relay).await?;

    drop(relay);
    tokio::task::spawn_blocking(move || worker.join())
        .await
        .context("relay worker join task failed")?
}

/// Read request lines, answer each in order, until the reader hits EOF.
pub async fn serve_lines<R, W>(mut reader: R, mut writer: W, relay: &RelayHandle) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut line = String::new();

    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(()); // Client disconnected
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let response = match Request::from_ndjson_line(trimmed) {
            Ok(request) => relay.call(request).await?,
            Err(e) => {
                tracing::warn!(error = %e, "invalid request line");
                Response::invalid_request(trimmed, &e)
            }
        };

        // Send NDJSON response
        let response_line = response.to_ndjson_line()?;
        writer.write_all(response_line.as_bytes()).await?;
        writer.flush().await?;
    }
}
