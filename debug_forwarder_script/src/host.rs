/**
 * `ScriptedHost` — a debug host whose state is driven by script steps.
 *
 * It keeps what a real IDE would: the running sessions, the active one,
 * and the breakpoint list. `apply` mutates that state and returns the
 * host event the IDE would have fired for the step.
 */
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use debug_forwarder_core::{
    Breakpoint, BreakpointsChange, DebugHost, DebugSession, HostError, HostEvent, LiveSettings,
    SessionRef, StackItem,
};
use serde_json::Value;

use crate::error::ScriptError;
use crate::step::{SessionSpec, Step};

// ---------------------------------------------------------------------------
// ScriptedSession
// ---------------------------------------------------------------------------

/// A session answering adapter requests from its declared `responses`.
pub struct ScriptedSession {
    spec: SessionSpec,
}

impl ScriptedSession {
    pub fn new(spec: SessionSpec) -> Self {
        Self { spec }
    }
}

impl DebugSession for ScriptedSession {
    fn id(&self) -> &str {
        &self.spec.id
    }

    fn name(&self) -> &str {
        &self.spec.name
    }

    fn session_type(&self) -> &str {
        &self.spec.session_type
    }

    fn custom_request(&self, command: &str) -> Result<Value, HostError> {
        let Some(response) = self.spec.responses.get(command) else {
            return Err(HostError::new(command, "no response scripted"));
        };

        match response.get("error").and_then(Value::as_str) {
            Some(message) => Err(HostError::new(command, message)),
            None => Ok(response.clone()),
        }
    }
}

// ---------------------------------------------------------------------------
// ScriptedHost
// ---------------------------------------------------------------------------

#[derive(Default)]
struct State {
    sessions: HashMap<String, SessionRef>,
    active: Option<SessionRef>,
    breakpoints: Vec<Breakpoint>,
}

pub struct ScriptedHost {
    settings: Arc<LiveSettings>,
    state: RwLock<State>,
}

impl ScriptedHost {
    /// `settings` receives `configure` steps.
    pub fn new(settings: Arc<LiveSettings>) -> Self {
        Self {
            settings,
            state: RwLock::new(State::default()),
        }
    }

    /**
     * Applies one step to the host state.
     *
     * # Returns
     * * `Ok(Some(event))` — the host event to hand to the relay.
     * * `Ok(None)` — the step only changed configuration.
     * * `Err(UnknownSession)` — the step names a session never started.
     */
    pub fn apply(&self, step: Step) -> Result<Option<HostEvent>, ScriptError> {
        let mut state = self.state.write().map_err(|_| ScriptError::Poisoned)?;

        let event = match step {
            Step::Configure {
                server_url,
                enabled,
            } => {
                if let Some(url) = server_url {
                    self.settings.set_server_url(url);
                }
                if let Some(enabled) = enabled {
                    self.settings.set_enabled(enabled);
                }
                return Ok(None);
            }

            Step::SessionStarted { session } => {
                let session: SessionRef = Arc::new(ScriptedSession::new(session));
                state
                    .sessions
                    .insert(session.id().to_string(), session.clone());
                state.active = Some(session.clone());
                HostEvent::SessionStarted(session)
            }

            Step::CustomEvent {
                session_id,
                event,
                body,
            } => HostEvent::CustomEvent {
                session: find_session(&state, &session_id)?,
                event,
                body,
            },

            Step::SessionTerminated { session_id } => {
                let session = state
                    .sessions
                    .remove(&session_id)
                    .ok_or(ScriptError::UnknownSession(session_id))?;
                if state
                    .active
                    .as_ref()
                    .is_some_and(|active| active.id() == session.id())
                {
                    state.active = None;
                }
                HostEvent::SessionTerminated(session)
            }

            Step::ActiveStackItemChanged {
                thread_id,
                frame_id,
            } => HostEvent::ActiveStackItemChanged(match (thread_id, frame_id) {
                (Some(thread_id), Some(frame_id)) => Some(StackItem::Frame {
                    thread_id,
                    frame_id,
                }),
                (Some(thread_id), None) => Some(StackItem::Thread { thread_id }),
                (None, _) => None,
            }),

            Step::BreakpointsChanged {
                added,
                removed,
                changed,
            } => {
                let change = BreakpointsChange {
                    added: added.into_iter().map(Breakpoint::from).collect(),
                    removed: removed.into_iter().map(Breakpoint::from).collect(),
                    changed: changed.into_iter().map(Breakpoint::from).collect(),
                };
                apply_breakpoint_change(&mut state.breakpoints, &change);
                HostEvent::BreakpointsChanged(change)
            }
        };

        Ok(Some(event))
    }
}

impl DebugHost for ScriptedHost {
    fn active_session(&self) -> Option<SessionRef> {
        self.state.read().ok().and_then(|s| s.active.clone())
    }

    fn breakpoints(&self) -> Vec<Breakpoint> {
        self.state
            .read()
            .map(|s| s.breakpoints.clone())
            .unwrap_or_default()
    }
}

fn find_session(state: &State, id: &str) -> Result<SessionRef, ScriptError> {
    state
        .sessions
        .get(id)
        .cloned()
        .ok_or_else(|| ScriptError::UnknownSession(id.to_string()))
}

/// Added and changed breakpoints replace any entry with the same id.
fn apply_breakpoint_change(breakpoints: &mut Vec<Breakpoint>, change: &BreakpointsChange) {
    breakpoints.retain(|bp| !change.removed.iter().any(|r| r.id == bp.id));

    for bp in change.added.iter().chain(&change.changed) {
        match breakpoints.iter_mut().find(|existing| existing.id == bp.id) {
            Some(existing) => *existing = bp.clone(),
            None => breakpoints.push(bp.clone()),
        }
    }
}
