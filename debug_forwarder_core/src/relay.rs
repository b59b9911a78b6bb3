/**
 * The relay — the entry point a host integration talks to.
 *
 * Lifecycle:
 * 1. The host builds a `Forwarder` (configuration, transport, notifier)
 *    and calls `Relay::start(host, forwarder)`. This creates the bounded
 *    channel and spawns the worker thread.
 * 2. Every host callback is passed to `Relay::notify`. The host state the
 *    event depends on is captured right there, on the callback thread;
 *    adapter requests and sends are left to the worker. `notify` never
 *    waits for the network and never reports a delivery error.
 * 3. `Relay::flush` (also run when the relay is dropped) waits, up to a
 *    deadline, until every event enqueued so far has been handled.
 *    `Relay::shutdown` waits for the queue to drain with no deadline.
 *
 * Batch producers that must not lose events (script replay) use
 * `notify_blocking` and `shutdown` instead of `notify` and `flush`.
 *
 * There is no global instance: the host owns the `Relay` value and keeps
 * it alive for as long as it wants events forwarded.
 */
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Sender, TrySendError};

use crate::error::RelayError;
use crate::forwarder::Forwarder;
use crate::host::{DebugHost, HostEvent};
use crate::subscriber::Subscriber;
use crate::transport::{FlushSignal, Worker, WorkerMsg};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default bounded channel capacity. When full, `notify` drops new events.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Maximum time `flush()` blocks waiting for the worker.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Relay
// ---------------------------------------------------------------------------

pub struct Relay {
    subscriber: Subscriber,
    sender: Sender<WorkerMsg>,
    worker: Option<JoinHandle<()>>,
}

impl Relay {
    /// Starts a relay with the default queue capacity.
    pub fn start(host: Arc<dyn DebugHost>, forwarder: Forwarder) -> Result<Self, RelayError> {
        Self::with_capacity(host, forwarder, DEFAULT_QUEUE_CAPACITY)
    }

    /**
     * Starts a relay whose queue holds at most `capacity` pending events.
     *
     * # Returns
     * `Err(RelayError::Spawn)` if the worker thread cannot be created.
     */
    pub fn with_capacity(
        host: Arc<dyn DebugHost>,
        forwarder: Forwarder,
        capacity: usize,
    ) -> Result<Self, RelayError> {
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        let worker = Worker::spawn(receiver, forwarder)?;

        Ok(Self {
            subscriber: Subscriber::new(host),
            sender,
            worker: Some(worker),
        })
    }

    /**
     * Captures one host event and queues it for delivery. Never blocks.
     *
     * If the queue is full, or the worker has died, the event is dropped
     * with a warning in the log.
     */
    pub fn notify(&self, event: HostEvent) {
        let Some(captured) = self.subscriber.capture(event) else {
            return;
        };

        match self.sender.try_send(WorkerMsg::Event(captured)) {
            Ok(()) => {}
            Err(TrySendError::Full(WorkerMsg::Event(captured))) => {
                log::warn!("Relay queue is full — dropping {} record", captured.kind());
            }
            Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Disconnected(_)) => {
                log::warn!("Relay worker has shut down — dropping event");
            }
        }
    }

    /**
     * Like `notify`, but waits for room in the queue instead of dropping
     * the event. Host state is still captured before waiting.
     */
    pub fn notify_blocking(&self, event: HostEvent) {
        let Some(captured) = self.subscriber.capture(event) else {
            return;
        };

        if self.sender.send(WorkerMsg::Event(captured)).is_err() {
            log::warn!("Relay worker has shut down — dropping event");
        }
    }

    /**
     * Blocks until every event queued before this call has been handled,
     * or 2 seconds elapse.
     *
     * # Returns
     * `true` if the flush completed within the timeout.
     */
    pub fn flush(&self) -> bool {
        let signal = Arc::new(FlushSignal::new());

        match self
            .sender
            .send_timeout(WorkerMsg::Flush(signal.clone()), FLUSH_TIMEOUT)
        {
            Ok(()) => signal.wait_timeout(FLUSH_TIMEOUT),
            Err(_) => false,
        }
    }

    /**
     * Closes the queue and waits, without a deadline, until the worker has
     * sent everything in it and exited.
     *
     * # Returns
     * `false` if the worker thread panicked.
     */
    pub fn shutdown(mut self) -> bool {
        let Some(worker) = self.worker.take() else {
            return true;
        };

        // swap in a disconnected sender; the worker drains and sees the close
        let (closed, _) = crossbeam_channel::bounded(0);
        drop(std::mem::replace(&mut self.sender, closed));

        worker.join().is_ok()
    }
}

impl Drop for Relay {
    /*
     * Drain what is queued, then let the sender drop: the worker sees the
     * disconnect and exits on its own.
     */
    fn drop(&mut self) {
        if self.worker.is_some() && !self.flush() {
            log::warn!("Relay flush timed out — some events may not have been sent");
        }
    }
}
