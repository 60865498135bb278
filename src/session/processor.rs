//! Worker task wrapping a [`StreamSession`]

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use log::debug;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;

use crate::params::SharedParams;
use crate::PsdError;

use super::transport::{SpectralSink, StreamEvent};
use super::StreamSession;

/// Handle to one stream's worker: the event channel, the shared parameters
/// and the stop flag. Processing runs on its own task; delivery and
/// reconfiguration are safe from any thread.
pub struct StreamProcessor {
    stream_id: String,
    params: SharedParams,
    tx: mpsc::UnboundedSender<StreamEvent>,
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl StreamProcessor {
    /// Spawn the worker task for one stream. Must be called from within a
    /// Tokio runtime.
    pub fn spawn(
        stream_id: String,
        params: SharedParams,
        spectrum_out: Box<dyn SpectralSink>,
        power_out: Box<dyn SpectralSink>,
        poll_interval: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let running = Arc::new(AtomicBool::new(true));
        let session = StreamSession::new(
            stream_id.clone(),
            params.clone(),
            spectrum_out,
            power_out,
        );
        let handle = tokio::spawn(run_session(session, rx, running.clone(), poll_interval));
        Self {
            stream_id,
            params,
            tx,
            running,
            handle,
        }
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    /// Reconfiguration entry points for this stream.
    pub fn params(&self) -> &SharedParams {
        &self.params
    }

    /// Enqueue an event for the worker. A worker that already terminated
    /// silently discards the event.
    pub fn deliver(&self, event: StreamEvent) {
        if self.tx.send(event).is_err() {
            debug!(
                "worker for stream {} already terminated, event dropped",
                self.stream_id
            );
        }
    }

    /// The worker has terminated (end of stream or stop).
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Ask the worker to wind down without waiting for it.
    pub fn request_stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Stop the worker and wait for it, bounded by `timeout`.
    pub async fn stop(self, timeout: Duration) -> Result<(), PsdError> {
        self.running.store(false, Ordering::SeqCst);
        match time::timeout(timeout, self.handle).await {
            Ok(_) => Ok(()),
            Err(_) => Err(PsdError::StopTimeout {
                stream_id: self.stream_id,
                timeout,
            }),
        }
    }
}

/// Worker loop: one parameter snapshot per cycle, then at most one event,
/// waiting no longer than `poll_interval` so stop requests are observed
/// within a bounded window.
async fn run_session(
    mut session: StreamSession,
    mut rx: mpsc::UnboundedReceiver<StreamEvent>,
    running: Arc<AtomicBool>,
    poll_interval: Duration,
) {
    debug!("worker started for stream {}", session.stream_id());
    while running.load(Ordering::SeqCst) {
        session.begin_cycle();
        match time::timeout(poll_interval, rx.recv()).await {
            // no data yet: not an error, keep waiting
            Err(_) => continue,
            // transport dropped its handle without an explicit end of stream
            Ok(None) => break,
            Ok(Some(event)) => {
                if !session.handle_event(event) {
                    break;
                }
            }
        }
    }
    debug!("worker exiting for stream {}", session.stream_id());
}
