/**
 * Event subscriber — turns host callbacks into forwarding records.
 *
 * Translation runs in two phases:
 *
 * 1. `capture` runs on the host's callback thread, inside `Relay::notify`.
 *    Everything the record depends on in host state is read here, at the
 *    moment the host fired the event: the breakpoint set, the active
 *    session for a stack change, the session identity and timestamp.
 * 2. `complete` runs on the relay worker. It issues the adapter requests
 *    (`variables`, `stackTrace`), which may be slow, and hands records to
 *    `emit` in the order they must be sent.
 *
 * However long the queue gets, a record describes the host as it was when
 * its event fired. For a session start the `sessionStarted` record is
 * emitted *before* the `variables` request is issued.
 *
 * Failed adapter requests are logged and dropped — never forwarded,
 * never retried, never shown to the user.
 */
use std::sync::Arc;

use crate::host::{BreakpointsChange, DebugHost, HostEvent, SessionRef, StackItem};
use crate::protocol::record::{
    timestamp_now, BreakpointSnapshot, DebugEvent, Record, SessionStarted, SessionTerminated,
};

/// Adapter request issued after a session starts.
const VARIABLES_REQUEST: &str = "variables";

/// Adapter request issued when the focused stack item changes.
const STACK_TRACE_REQUEST: &str = "stackTrace";

/**
 * A host event with the host state it depends on already read.
 */
pub enum Captured {
    /// Fully built; nothing left to ask the host.
    Ready(Record),
    /// `sessionStarted` is built; `variables` is still to be requested.
    SessionStarted { record: Record, session: SessionRef },
    /// The stack trace is to be requested from the session that was
    /// active when the stack item changed.
    StackTrace(SessionRef),
}

impl Captured {
    /// The record kind this capture leads with, used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Captured::Ready(record) | Captured::SessionStarted { record, .. } => record.kind(),
            Captured::StackTrace(_) => "stack",
        }
    }
}

pub struct Subscriber {
    host: Arc<dyn DebugHost>,
}

impl Subscriber {
    pub fn new(host: Arc<dyn DebugHost>) -> Self {
        Self { host }
    }

    /**
     * Reads the host state `event` depends on.
     *
     * # Returns
     * `None` when the event produces nothing: a stack change without a
     * stack item or without an active session.
     */
    pub fn capture(&self, event: HostEvent) -> Option<Captured> {
        match event {
            HostEvent::SessionStarted(session) => {
                log::info!("Debug session started: {}", session.name());
                let record = Record::SessionStarted(SessionStarted {
                    name: session.name().to_string(),
                    session_type: session.session_type().to_string(),
                    id: session.id().to_string(),
                    timestamp: timestamp_now(),
                });
                Some(Captured::SessionStarted { record, session })
            }
            HostEvent::CustomEvent {
                session,
                event,
                body,
            } => Some(Captured::Ready(Record::DebugEvent(DebugEvent {
                event,
                body,
                timestamp: timestamp_now(),
                session_id: session.id().to_string(),
                session_name: session.name().to_string(),
            }))),
            HostEvent::SessionTerminated(session) => {
                log::info!("Debug session terminated: {}", session.name());
                Some(Captured::Ready(Record::SessionTerminated(SessionTerminated {
                    name: session.name().to_string(),
                    id: session.id().to_string(),
                    timestamp: timestamp_now(),
                })))
            }
            HostEvent::ActiveStackItemChanged(item) => self.capture_stack_item(item),
            HostEvent::BreakpointsChanged(change) => Some(self.capture_breakpoints(&change)),
        }
    }

    /**
     * Issues the adapter requests `captured` still needs and emits its
     * records in send order.
     */
    pub fn complete(captured: Captured, emit: &mut dyn FnMut(Record)) {
        match captured {
            Captured::Ready(record) => emit(record),
            Captured::SessionStarted { record, session } => {
                emit(record);
                match session.custom_request(VARIABLES_REQUEST) {
                    Ok(variables) => emit(Record::Variables(variables)),
                    Err(e) => log::error!("Failed to get variables: {e}"),
                }
            }
            Captured::StackTrace(session) => match session.custom_request(STACK_TRACE_REQUEST) {
                Ok(stack) => emit(Record::Stack(stack)),
                Err(e) => log::error!("Failed to get stack trace: {e}"),
            },
        }
    }

    /// Both phases back to back, for callers without a queue in between.
    pub fn handle(&self, event: HostEvent, emit: &mut dyn FnMut(Record)) {
        if let Some(captured) = self.capture(event) {
            Self::complete(captured, emit);
        }
    }

    /*
     * The stack trace is requested from the *active* session, not from the
     * session owning the stack item. Without a stack item or an active
     * session there is nothing to ask.
     */
    fn capture_stack_item(&self, item: Option<StackItem>) -> Option<Captured> {
        item?;
        self.host.active_session().map(Captured::StackTrace)
    }

    /*
     * The change event's contents are ignored on purpose: the collector
     * always receives the full current breakpoint set, even when only one
     * breakpoint changed.
     */
    fn capture_breakpoints(&self, change: &BreakpointsChange) -> Captured {
        log::debug!(
            "Breakpoints changed (+{} -{} ~{})",
            change.added.len(),
            change.removed.len(),
            change.changed.len()
        );

        let breakpoints = self
            .host
            .breakpoints()
            .iter()
            .map(BreakpointSnapshot::from)
            .collect();

        Captured::Ready(Record::Breakpoints(breakpoints))
    }
}
