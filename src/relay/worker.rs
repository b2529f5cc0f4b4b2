//! Relay worker thread.
//!
//! The worker owns the `RelayService` (and so the database) on its own OS
//! thread with a single-threaded Tokio runtime. Requests arrive on a bounded
//! channel and are handled one at a time, in arrival order.
//!
//! CHANGELOG:
//! - 10/16/2026 - Initial implementation

use anyhow::{anyhow, Context, Result};
use tokio::sync::{mpsc, oneshot};

use crate::config::RelayConfig;
use crate::relay::protocol::{Request, Response};
use crate::relay::service::RelayService;

/// Request sent to the worker.
pub struct RelayMessage {
    pub request: Request,
    /// Channel to send the response back.
    pub response_tx: oneshot::Sender<Response>,
}

/// A dedicated relay worker thread.
pub struct RelayWorker {
    request_tx: mpsc::Sender<RelayMessage>,
    thread: std::thread::JoinHandle<()>,
}

impl RelayWorker {
    /// Spawn a worker with an uninitialized service.
    pub fn spawn(config: &RelayConfig) -> Result<Self> {
        Self::spawn_with(RelayService::new(), config)
    }

    /// Spawn a worker around an existing service.
    pub fn spawn_with(mut service: RelayService, config: &RelayConfig) -> Result<Self> {
        let (request_tx, mut request_rx) = mpsc::channel::<RelayMessage>(config.max_pending);

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .context("Failed to create Tokio runtime for relay worker")?;

        let thread = std::thread::Builder::new()
            .name("sqlite-relay-worker".to_string())
            .spawn(move || {
                rt.block_on(async move {
                    tracing::debug!("relay worker started");

                    while let Some(msg) = request_rx.recv().await {
                        let response = service.handle(msg.request);

                        // Send result back, ignoring if receiver dropped
                        let _ = msg.response_tx.send(response);
                    }

                    if let Err(e) = service.shutdown() {
                        tracing::warn!(error = %e, "failed to close database on shutdown");
                    }
                    tracing::debug!("relay worker shutting down");
                });
            })
            .context("Failed to spawn relay worker thread")?;

        Ok(Self { request_tx, thread })
    }

    /// Cloneable handle for submitting requests.
    pub fn handle(&self) -> RelayHandle {
        RelayHandle {
            request_tx: self.request_tx.clone(),
        }
    }

    /// Close this worker's sender and wait for the thread to finish.
    ///
    /// The thread exits only once every `RelayHandle` has been dropped too.
    pub fn join(self) -> Result<()> {
        drop(self.request_tx);
        self.thread
            .join()
            .map_err(|_| anyhow!("relay worker thread panicked"))
    }
}

/// Submits requests to a `RelayWorker`.
#[derive(Clone)]
pub struct RelayHandle {
    request_tx: mpsc::Sender<RelayMessage>,
}

impl RelayHandle {
    /// Send a request and wait for its response.
    pub async fn call(&self, request: Request) -> Result<Response> {
        let (response_tx, response_rx) = oneshot::channel();
        self.request_tx
            .send(RelayMessage {
                request,
                response_tx,
            })
            .await
            .map_err(|_| anyhow!("relay worker is not running"))?;

        response_rx
            .await
            .context("relay worker dropped the request")
    }

    /// Raw sender for callers that correlate responses themselves.
    pub fn sender(&self) -> mpsc::Sender<RelayMessage> {
        self.request_tx.clone()
    }
}
