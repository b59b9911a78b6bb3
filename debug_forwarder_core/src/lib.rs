/*!
 * Debug Forwarder Core — the relay engine.
 *
 * Observes a debugger host (sessions starting and stopping, adapter
 * events, stack focus and breakpoint changes), turns each notification
 * into a forwarding record and POSTs it as JSON to a collector endpoint.
 * When the collector is configured as a streaming (`/sse`) endpoint, a
 * diagnostic listener can also read that stream and log what arrives.
 *
 * End users should depend on the `debug_forwarder` facade crate instead,
 * which wires the relay and the stream listener together.
 *
 * # Module structure
 *
 * - `protocol/` — what we send: records, constants, endpoint URL rules
 * - `transport/` — how we deliver: record POSTs, the event stream client,
 *   background worker
 * - `config` — settings and where they are read from
 * - `host` — traits the debugger host implements
 * - `subscriber` — host event → captured host state → records
 * - `forwarder` — record → HTTP, with the legacy fallback
 * - `relay` — queue + worker lifecycle
 * - `stream` — SSE listener and its single-instance gate
 */

mod config;
mod error;
mod forwarder;
mod host;
mod protocol;
mod relay;
mod stream;
mod subscriber;
mod transport;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use config::{ConfigSource, LiveSettings, Overrides, Settings, SettingsFile};
pub use error::{HostError, RelayError};
pub use forwarder::{Delivery, Forwarder};
pub use host::{
    Breakpoint, BreakpointsChange, DebugHost, DebugSession, HostEvent, LogNotifier, Notifier,
    SessionRef, SourceLocation, StackItem,
};
pub use protocol::constants::{
    CONFIG_NAMESPACE, DEFAULT_SERVER_URL, EVENT_STREAM_MIME, LEGACY_POST_PATH, RELAY_VERSION,
    SESSION_ID_HEADER,
};
pub use protocol::endpoint::{is_stream_endpoint, legacy_fallback_url};
pub use protocol::record::{
    timestamp_now, BreakpointSnapshot, DebugEvent, Record, SessionStarted, SessionTerminated,
};
pub use relay::{Relay, DEFAULT_QUEUE_CAPACITY};
pub use stream::{
    consume, LineBuffer, LineSink, StreamEnd, StreamGate, StreamHandle, StreamListener,
};
pub use subscriber::{Captured, Subscriber};
pub use transport::{ChunkStream, Deliver, EventStreamSource, HttpTransport, SseClient};
