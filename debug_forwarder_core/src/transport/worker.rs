/**
 * The relay worker: a single thread completing captured events in order.
 *
 * ```text
 *  Relay::notify (host thread)                 worker thread
 *  ─────────────────────────                   ─────────────
 *  Subscriber::capture ── WorkerMsg::Event ──► Subscriber::complete
 *   (reads host state)     bounded channel      (adapter requests)
 *                                                   │
 *                                              Forwarder::send ──► collector
 * ```
 *
 * One worker per relay and one message at a time: the records of one
 * event (`sessionStarted`, then `variables`) and of consecutive events
 * reach the collector in the order the host fired them.
 *
 * The loop ends when every sender is gone and the queue is empty.
 */
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Receiver;

use crate::error::RelayError;
use crate::forwarder::Forwarder;
use crate::subscriber::{Captured, Subscriber};

pub enum WorkerMsg {
    Event(Captured),

    /// Answered once the worker has reached it in the queue, i.e. after
    /// every `Event` queued ahead of it has been sent or dropped.
    Flush(Arc<FlushSignal>),
}

// ---------------------------------------------------------------------------
// FlushSignal
// ---------------------------------------------------------------------------

/**
 * One-shot completion flag for a flush: set by the worker, awaited with a
 * deadline by the caller.
 */
pub struct FlushSignal {
    done: Mutex<bool>,
    condvar: Condvar,
}

impl FlushSignal {
    pub fn new() -> Self {
        Self {
            done: Mutex::new(false),
            condvar: Condvar::new(),
        }
    }

    pub fn notify(&self) {
        if let Ok(mut done) = self.done.lock() {
            *done = true;
            self.condvar.notify_all();
        }
    }

    /// `false` if `timeout` elapsed first.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let Ok(done) = self.done.lock() else {
            return false;
        };

        match self.condvar.wait_timeout_while(done, timeout, |done| !*done) {
            Ok((_, result)) => !result.timed_out(),
            Err(_) => false,
        }
    }
}

impl Default for FlushSignal {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

pub struct Worker;

impl Worker {
    /// Spawns `debug-forwarder-worker`, which owns the forwarder from now on.
    pub fn spawn(
        receiver: Receiver<WorkerMsg>,
        forwarder: Forwarder,
    ) -> Result<JoinHandle<()>, RelayError> {
        thread::Builder::new()
            .name("debug-forwarder-worker".into())
            .spawn(move || Self::run_loop(&receiver, &forwarder))
            .map_err(|source| RelayError::Spawn {
                name: "relay worker",
                source,
            })
    }

    fn run_loop(receiver: &Receiver<WorkerMsg>, forwarder: &Forwarder) {
        while let Ok(msg) = receiver.recv() {
            match msg {
                WorkerMsg::Event(captured) => {
                    let kind = captured.kind();
                    // a panicking session or transport costs this event only
                    let result = panic::catch_unwind(AssertUnwindSafe(|| {
                        Subscriber::complete(captured, &mut |record| {
                            forwarder.send(&record);
                        });
                    }));

                    if result.is_err() {
                        log::error!("Sending {kind} panicked; event dropped");
                    }
                }
                WorkerMsg::Flush(signal) => signal.notify(),
            }
        }

        log::debug!("Relay worker exiting: channel closed");
    }
}
