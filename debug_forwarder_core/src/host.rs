/**
 * The debug host — the IDE side of the relay.
 *
 * The relay never owns debug sessions. It observes them through these
 * traits, which a host integration implements:
 *
 * - `DebugSession` — one running session; can answer adapter requests.
 * - `DebugHost` — live host state: the active session and all breakpoints.
 * - `Notifier` — the host's non-blocking warning popup.
 *
 * Host callbacks are delivered to the relay as `HostEvent` values.
 */
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::HostError;
use crate::protocol::record::BreakpointSnapshot;

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

/**
 * A debug session as seen by the relay.
 *
 * `custom_request` sends a debug-adapter request (`"variables"`,
 * `"stackTrace"`) and blocks until the adapter answers. The relay only
 * calls it from its worker thread, never from the host callback.
 */
pub trait DebugSession: Send + Sync {
    fn id(&self) -> &str;
    fn name(&self) -> &str;

    /// Debugger type, e.g. `"python"` or `"lldb"`.
    fn session_type(&self) -> &str;

    fn custom_request(&self, command: &str) -> Result<Value, HostError>;
}

/// Shared handle to a host session.
pub type SessionRef = Arc<dyn DebugSession>;

// ---------------------------------------------------------------------------
// Host state
// ---------------------------------------------------------------------------

/**
 * Live host state consulted while translating events.
 */
pub trait DebugHost: Send + Sync {
    /// The session the user is currently focused on, if any.
    fn active_session(&self) -> Option<SessionRef>;

    /// Every breakpoint the host currently knows, in host order.
    fn breakpoints(&self) -> Vec<Breakpoint>;
}

/**
 * A breakpoint as the host stores it. Location data is carried for host
 * bookkeeping but never forwarded.
 */
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Breakpoint {
    pub id: String,
    pub enabled: bool,
    pub condition: Option<String>,
    pub hit_condition: Option<String>,
    pub log_message: Option<String>,
    pub location: Option<SourceLocation>,
}

/// Source position of a line breakpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub path: String,
    pub line: u32,
}

impl From<&Breakpoint> for BreakpointSnapshot {
    fn from(bp: &Breakpoint) -> Self {
        BreakpointSnapshot {
            id: bp.id.clone(),
            enabled: bp.enabled,
            condition: bp.condition.clone(),
            hit_condition: bp.hit_condition.clone(),
            log_message: bp.log_message.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/**
 * The host's user-facing warning surface. Must not block.
 */
pub trait Notifier: Send + Sync {
    fn show_warning(&self, message: &str);
}

/// Notifier for hosts without a UI: warnings go to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn show_warning(&self, message: &str) {
        log::warn!("{message}");
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// The focused item in the call-stack view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackItem {
    Thread { thread_id: i64 },
    Frame { thread_id: i64, frame_id: i64 },
}

/**
 * What changed in a breakpoints-change notification. The relay ignores the
 * contents and snapshots the full breakpoint set instead.
 */
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BreakpointsChange {
    pub added: Vec<Breakpoint>,
    pub removed: Vec<Breakpoint>,
    pub changed: Vec<Breakpoint>,
}

/**
 * One host callback, in the order the host fired it.
 */
pub enum HostEvent {
    SessionStarted(SessionRef),
    CustomEvent {
        session: SessionRef,
        event: String,
        body: Option<Value>,
    },
    SessionTerminated(SessionRef),
    ActiveStackItemChanged(Option<StackItem>),
    BreakpointsChanged(BreakpointsChange),
}

impl HostEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            HostEvent::SessionStarted(_) => "session-started",
            HostEvent::CustomEvent { .. } => "custom-event",
            HostEvent::SessionTerminated(_) => "session-terminated",
            HostEvent::ActiveStackItemChanged(_) => "active-stack-item-changed",
            HostEvent::BreakpointsChanged(_) => "breakpoints-changed",
        }
    }
}

impl fmt::Debug for HostEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostEvent::SessionStarted(s) | HostEvent::SessionTerminated(s) => f
                .debug_tuple(self.kind())
                .field(&s.id())
                .field(&s.name())
                .finish(),
            HostEvent::CustomEvent { session, event, .. } => f
                .debug_struct(self.kind())
                .field("session", &session.id())
                .field("event", event)
                .finish(),
            HostEvent::ActiveStackItemChanged(item) => {
                f.debug_tuple(self.kind()).field(item).finish()
            }
            HostEvent::BreakpointsChanged(change) => f.debug_tuple(self.kind()).field(change).finish(),
        }
    }
}
