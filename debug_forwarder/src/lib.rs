/**
 * Debug Forwarder — relays debugger activity to an HTTP collector.
 *
 * This is the crate host integrations should depend on. It re-exports the
 * relay engine and the scripted host, and wires the relay and the
 * streaming listener together through a single `start` call.
 *
 * # Quick start
 *
 * ```ignore
 * use std::sync::Arc;
 *
 * fn attach(host: Arc<dyn debug_forwarder::DebugHost>) -> Result<(), debug_forwarder::RelayError> {
 *     let forwarder = debug_forwarder::start(host, debug_forwarder::Settings::default())?;
 *
 *     // from the host's callbacks:
 *     // forwarder.notify(HostEvent::SessionStarted(session));
 *
 *     // dropping `forwarder` stops the stream and flushes pending records
 *     Ok(())
 * }
 * ```
 *
 * # With options
 *
 * ```ignore
 * let settings = Arc::new(debug_forwarder::LiveSettings::default());
 *
 * let forwarder = debug_forwarder::start(host, debug_forwarder::Options {
 *     listen_stream: true,
 *     notifier: Arc::new(MyStatusBar),
 *     ..debug_forwarder::Options::new(settings.clone())
 * })?;
 *
 * // later, from a configuration-changed callback:
 * settings.set_server_url("http://localhost:8001/sse");
 * ```
 */

use std::sync::Arc;

// ---------------------------------------------------------------------------
// Re-exports — the public surface area
// ---------------------------------------------------------------------------

pub use debug_forwarder_core::{
    is_stream_endpoint, legacy_fallback_url, Breakpoint, BreakpointsChange, ConfigSource,
    DebugHost, DebugSession, Delivery, Deliver, EventStreamSource, Forwarder, HostError,
    HostEvent, HttpTransport, LiveSettings, LogNotifier, Notifier, Overrides, Record, Relay,
    RelayError, SessionRef, Settings, SettingsFile, SourceLocation, SseClient, StackItem,
    StreamGate, StreamHandle, StreamListener, DEFAULT_QUEUE_CAPACITY, DEFAULT_SERVER_URL,
    RELAY_VERSION,
};

pub use debug_forwarder_script as script;

// ---------------------------------------------------------------------------
// Options
// ---------------------------------------------------------------------------

/**
 * Configuration for `start`.
 *
 * Implements `From<Settings>` so a fixed snapshot can be passed directly.
 * Defaults:
 * - `notifier` = `LogNotifier` (warnings go to the log)
 * - `listen_stream` = `false`
 * - `queue_capacity` = `DEFAULT_QUEUE_CAPACITY`
 */
pub struct Options {
    /// Read before every send and once when the stream listener starts.
    pub config: Arc<dyn ConfigSource>,

    /// Receives a warning whenever a record cannot be delivered.
    pub notifier: Arc<dyn Notifier>,

    /// Whether to start the diagnostic stream listener when `serverUrl`
    /// is a streaming endpoint.
    pub listen_stream: bool,

    pub queue_capacity: usize,
}

impl Options {
    pub fn new(config: Arc<dyn ConfigSource>) -> Self {
        Self {
            config,
            notifier: Arc::new(LogNotifier),
            listen_stream: false,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl From<Settings> for Options {
    fn from(settings: Settings) -> Self {
        Self::new(Arc::new(settings))
    }
}

// ---------------------------------------------------------------------------
// DebugForwarder — the running instance
// ---------------------------------------------------------------------------

/**
 * A started forwarder. Keep it alive for as long as events should be
 * relayed; when it drops, the stream is stopped and pending records are
 * flushed.
 */
pub struct DebugForwarder {
    relay: Option<Relay>,
    stream: Option<StreamHandle>,
}

impl DebugForwarder {
    /// Queues a host event. Never blocks the caller.
    pub fn notify(&self, event: HostEvent) {
        if let Some(ref relay) = self.relay {
            relay.notify(event);
        }
    }

    /// Queues a host event, waiting for room in the queue if it is full.
    pub fn notify_blocking(&self, event: HostEvent) {
        if let Some(ref relay) = self.relay {
            relay.notify_blocking(event);
        }
    }

    /// See `Relay::flush`.
    pub fn flush(&self) -> bool {
        self.relay.as_ref().is_some_and(Relay::flush)
    }

    /// The running stream listener, if one was started.
    pub fn stream(&self) -> Option<&StreamHandle> {
        self.stream.as_ref()
    }

    /// Stops the stream listener. The relay keeps running.
    pub fn stop_stream(&mut self) {
        if let Some(handle) = self.stream.take() {
            handle.stop();
        }
    }

    /**
     * Stops the stream, then waits until every queued record has been
     * sent. See `Relay::shutdown`.
     */
    pub fn shutdown(mut self) -> bool {
        self.stop_stream();
        self.relay.take().map_or(true, Relay::shutdown)
    }
}

impl Drop for DebugForwarder {
    fn drop(&mut self) {
        self.stop_stream();
    }
}

// ---------------------------------------------------------------------------
// start
// ---------------------------------------------------------------------------

/**
 * Starts forwarding events from `host`.
 *
 * Records are sent over `HttpTransport`. When `listen_stream` is set, the
 * stream listener is started against the process-wide `StreamGate` with
 * the settings current at this call; it is not restarted when they change
 * later.
 *
 * # Errors
 * * `RelayError::Spawn` — the worker or stream thread could not be created.
 * * `RelayError::Transport` — the stream client could not be built.
 * * `RelayError::StreamAlreadyRunning` — another forwarder in this process
 *   already holds the stream.
 */
pub fn start(
    host: Arc<dyn DebugHost>,
    options: impl Into<Options>,
) -> Result<DebugForwarder, RelayError> {
    let opts = options.into();

    log::info!("Starting {RELAY_VERSION}");

    let forwarder = Forwarder::new(
        opts.config.clone(),
        Arc::new(HttpTransport::new()),
        opts.notifier,
    );
    let relay = Relay::with_capacity(host, forwarder, opts.queue_capacity)?;

    /*
     * The stream is an optional addon: started after the relay so a
     * refused stream never leaves a half-built forwarder behind.
     */
    let stream = if opts.listen_stream {
        StreamListener::new(Arc::new(SseClient::new()?), StreamGate::global())
            .start_if_configured(&opts.config.settings())?
    } else {
        None
    };

    Ok(DebugForwarder {
        relay: Some(relay),
        stream,
    })
}
