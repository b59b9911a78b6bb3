/**
 * Streaming listener — a diagnostic, one-way reader for SSE endpoints.
 *
 * When `serverUrl` points at a streaming endpoint (`…/sse`), the listener
 * opens an event stream against it and logs every line it receives.
 * Nothing read from the stream is forwarded or acted upon.
 *
 * ```text
 *  start_if_configured ──► gate.acquire() ──► thread "debug-forwarder-stream"
 *                                                 │  (current-thread runtime)
 *                               handshake (GET, no redirects) → mcp-session-id?
 *                                                 │
 *                                   open  (GET, + mcp-session-id)
 *                                                 │
 *                                   chunks → LineBuffer → log lines
 *                                                 │
 *                       server EOF / error / stop → connection dropped
 *                                                 │
 *                                           thread exits → gate released
 * ```
 *
 * At most one stream may be live per `StreamGate`. The gate is a
 * capability: starting a second stream while one holds it is refused with
 * `RelayError::StreamAlreadyRunning`. The gate is only released once the
 * reader thread has exited, so two connections never overlap.
 */
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle};

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::error::RelayError;
use crate::protocol::endpoint::is_stream_endpoint;
use crate::transport::{ChunkStream, EventStreamSource};

/// Receives each complete, de-prefixed stream line.
pub type LineSink = Arc<dyn Fn(&str) + Send + Sync>;

// ---------------------------------------------------------------------------
// LineBuffer — chunk framing
// ---------------------------------------------------------------------------

/**
 * Reassembles lines from arbitrarily split byte chunks.
 *
 * Complete lines are returned with a trailing `\r` removed and an optional
 * leading `data:` marker (plus the whitespace after it) stripped. Blank
 * lines — SSE event separators — are skipped. The trailing incomplete line
 * stays buffered until a later chunk completes it.
 *
 * Splitting happens on bytes, so a multi-byte UTF-8 character cut between
 * two chunks is decoded intact.
 */
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(line) = strip_line(&raw[..pos]) {
                lines.push(line);
            }
        }
        lines
    }

    /// The buffered incomplete line, lossily decoded.
    pub fn pending(&self) -> String {
        String::from_utf8_lossy(&self.pending).into_owned()
    }
}

fn strip_line(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let text = text.strip_suffix('\r').unwrap_or(&text);
    let payload = match text.strip_prefix("data:") {
        Some(rest) => rest.trim_start(),
        None => text,
    };

    if payload.trim().is_empty() {
        None
    } else {
        Some(payload.to_string())
    }
}

// ---------------------------------------------------------------------------
// consume — the read loop
// ---------------------------------------------------------------------------

/// Why a stream read loop returned normally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// The server closed the stream.
    Closed,
    /// `cancel` fired, possibly while waiting for a chunk.
    Cancelled,
}

/**
 * Reads `chunks` to the end, feeding every complete line to `on_line`.
 *
 * Every wait for a chunk races `cancel`; on cancellation `chunks` is
 * dropped, which closes the underlying connection. An incomplete line left
 * over at the end is discarded.
 */
pub async fn consume(
    mut chunks: ChunkStream,
    cancel: &CancellationToken,
    on_line: &mut dyn FnMut(&str),
) -> Result<StreamEnd, RelayError> {
    let mut buffer = LineBuffer::default();

    let end = loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break StreamEnd::Cancelled,
            next = chunks.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                for line in buffer.push(&chunk) {
                    on_line(&line);
                }
            }
            Some(Err(e)) => return Err(e),
            None => break StreamEnd::Closed,
        }
    };

    let rest = buffer.pending();
    if !rest.is_empty() {
        log::debug!("Discarding incomplete stream line: {rest:?}");
    }

    Ok(end)
}

// ---------------------------------------------------------------------------
// StreamGate — at most one live stream
// ---------------------------------------------------------------------------

/**
 * Grants the right to run one event stream at a time.
 *
 * Clones share the same slot. `StreamGate::global()` is the process-wide
 * gate used by the facade; tests and embedders may create their own.
 */
#[derive(Debug, Clone, Default)]
pub struct StreamGate {
    live: Arc<AtomicBool>,
}

impl StreamGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn global() -> StreamGate {
        static GLOBAL_GATE: OnceLock<StreamGate> = OnceLock::new();
        GLOBAL_GATE.get_or_init(StreamGate::new).clone()
    }

    /// `true` while some stream holds the gate.
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    fn acquire(&self) -> Option<StreamPermit> {
        self.live
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| StreamPermit {
                live: self.live.clone(),
            })
    }
}

/// Proof of holding the gate, owned by the reader thread.
struct StreamPermit {
    live: Arc<AtomicBool>,
}

impl Drop for StreamPermit {
    fn drop(&mut self) {
        self.live.store(false, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// StreamHandle — owned by whoever started the stream
// ---------------------------------------------------------------------------

/**
 * Owned handle to a running stream, returned by
 * `StreamListener::start_if_configured`.
 *
 * Dropping the handle stops the stream, like calling `stop`.
 */
pub struct StreamHandle {
    url: String,
    cancel: CancellationToken,
    thread: Option<JoinHandle<()>>,
}

impl StreamHandle {
    pub fn url(&self) -> &str {
        &self.url
    }

    /**
     * Stops the stream and waits for the reader thread.
     *
     * On return the connection is closed and the gate is free.
     */
    pub fn stop(mut self) {
        log::info!("Stopping event stream listener for {}", self.url);
        self.cancel.cancel();
        self.wait();
    }

    /// Blocks until the stream ends on its own.
    pub fn join(mut self) {
        self.wait();
    }

    fn wait(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::error!("Event stream thread panicked");
            }
        }
    }
}

impl Drop for StreamHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.wait();
    }
}

// ---------------------------------------------------------------------------
// StreamListener
// ---------------------------------------------------------------------------

pub struct StreamListener {
    source: Arc<dyn EventStreamSource>,
    gate: StreamGate,
    sink: LineSink,
}

impl StreamListener {
    /// A listener that logs received lines at `info` level.
    pub fn new(source: Arc<dyn EventStreamSource>, gate: StreamGate) -> Self {
        Self {
            source,
            gate,
            sink: Arc::new(|line| log::info!("Stream message: {line}")),
        }
    }

    /// Replaces the line sink (logging by default).
    pub fn with_sink(mut self, sink: LineSink) -> Self {
        self.sink = sink;
        self
    }

    /**
     * Starts a stream if `settings` allow it.
     *
     * # Returns
     * * `Ok(None)` — forwarding is disabled or `serverUrl` is not a
     *   streaming endpoint (the reason is logged).
     * * `Ok(Some(handle))` — a reader thread was started.
     * * `Err(StreamAlreadyRunning)` — the gate is held by another stream.
     * * `Err(Spawn)` — the reader thread could not be created.
     *
     * Handshake and connection failures happen on the reader thread and
     * are only logged.
     */
    pub fn start_if_configured(
        &self,
        settings: &Settings,
    ) -> Result<Option<StreamHandle>, RelayError> {
        if !settings.enabled {
            log::info!("Forwarding disabled; event stream not started");
            return Ok(None);
        }
        if !is_stream_endpoint(&settings.server_url) {
            log::info!(
                "{} is not a streaming endpoint; event stream not started",
                settings.server_url
            );
            return Ok(None);
        }

        let permit = self
            .gate
            .acquire()
            .ok_or(RelayError::StreamAlreadyRunning)?;
        let cancel = CancellationToken::new();
        let url = settings.server_url.clone();

        let thread = {
            let source = self.source.clone();
            let sink = self.sink.clone();
            let cancel = cancel.clone();
            let url = url.clone();

            thread::Builder::new()
                .name("debug-forwarder-stream".into())
                .spawn(move || {
                    // dropped last: the runtime and its connection go first
                    let _permit = permit;

                    let runtime = match tokio::runtime::Builder::new_current_thread()
                        .enable_all()
                        .build()
                    {
                        Ok(runtime) => runtime,
                        Err(e) => {
                            log::error!("{}", RelayError::from(e));
                            return;
                        }
                    };
                    runtime.block_on(run_stream(source.as_ref(), &url, &cancel, &sink));
                })
                .map_err(|source| RelayError::Spawn {
                    name: "event stream",
                    source,
                })?
        };

        Ok(Some(StreamHandle {
            url,
            cancel,
            thread: Some(thread),
        }))
    }
}

async fn run_stream(
    source: &dyn EventStreamSource,
    url: &str,
    cancel: &CancellationToken,
    sink: &LineSink,
) {
    let handshake = tokio::select! {
        _ = cancel.cancelled() => return,
        handshake = source.handshake(url) => handshake,
    };

    /*
     * A failed handshake only costs the session id; the stream is still
     * attempted without it.
     */
    let session_id = match handshake {
        Ok(id) => id,
        Err(e) => {
            log::warn!("Event stream handshake with {url} failed: {e}");
            None
        }
    };
    if let Some(ref id) = session_id {
        log::debug!("Event stream session id: {id}");
    }

    let opened = tokio::select! {
        _ = cancel.cancelled() => return,
        opened = source.open(url, session_id.as_deref()) => opened,
    };
    let chunks = match opened {
        Ok(chunks) => chunks,
        Err(e) => {
            log::error!("Failed to open event stream at {url}: {e}");
            return;
        }
    };
    log::info!("Event stream connected: {url}");

    match consume(chunks, cancel, &mut |line| sink(line)).await {
        Ok(StreamEnd::Closed) => log::info!("Event stream closed by server"),
        Ok(StreamEnd::Cancelled) => log::info!("Event stream stopped"),
        Err(e) => log::error!("Event stream read failed: {e}"),
    }
}
