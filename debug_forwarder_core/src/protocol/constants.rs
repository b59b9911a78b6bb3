/**
 * Wire-level constants shared by the forwarder and the streaming listener.
 */

/// Configuration namespace the host stores forwarder settings under.
pub const CONFIG_NAMESPACE: &str = "debugDataForwarder";

/// Collector URL used when the host has no `serverUrl` setting.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8001/debug-data";

/// Path of the plain POST endpoint a streaming URL falls back to.
pub const LEGACY_POST_PATH: &str = "/debug-data";

/// Media type requested from streaming endpoints.
pub const EVENT_STREAM_MIME: &str = "text/event-stream";

/// Request/response header carrying the streaming session identifier.
pub const SESSION_ID_HEADER: &str = "mcp-session-id";

/// Relay version string, logged once at startup.
pub const RELAY_VERSION: &str = concat!("debug-forwarder/", env!("CARGO_PKG_VERSION"));
