/**
 * Forwarding records — the JSON objects POSTed to the collector.
 *
 * Every record is a JSON object with exactly one top-level key naming the
 * event kind. The collector dispatches on that key:
 *
 * ```json
 * { "sessionStarted": { "name": "main", "type": "python", "id": "1", "timestamp": "..." } }
 * { "variables": { ... } }
 * { "debugEvent": { "event": "output", "body": { ... }, "timestamp": "...", "sessionId": "1", "sessionName": "main" } }
 * { "sessionTerminated": { "name": "main", "id": "1", "timestamp": "..." } }
 * { "stack": { ... } }
 * { "breakpoints": [ { "id": "bp1", "enabled": true } ] }
 * ```
 *
 * No schema is enforced on `variables` and `stack` — they carry whatever
 * the debug adapter answered.
 */
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Record — the externally tagged envelope
// ---------------------------------------------------------------------------

/**
 * One forwarding record. Serde's external tagging produces the
 * `{ "<kind>": <payload> }` shape directly.
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Record {
    SessionStarted(SessionStarted),
    Variables(Value),
    DebugEvent(DebugEvent),
    SessionTerminated(SessionTerminated),
    Stack(Value),
    Breakpoints(Vec<BreakpointSnapshot>),
}

impl Record {
    /**
     * The top-level key this record serializes under, used in log lines.
     */
    pub fn kind(&self) -> &'static str {
        match self {
            Record::SessionStarted(_) => "sessionStarted",
            Record::Variables(_) => "variables",
            Record::DebugEvent(_) => "debugEvent",
            Record::SessionTerminated(_) => "sessionTerminated",
            Record::Stack(_) => "stack",
            Record::Breakpoints(_) => "breakpoints",
        }
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Payload of `sessionStarted`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStarted {
    pub name: String,
    #[serde(rename = "type")]
    pub session_type: String,
    pub id: String,
    pub timestamp: String,
}

/**
 * Payload of `debugEvent` — a custom event raised by the debug adapter
 * (console output, process events, adapter-specific notifications).
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DebugEvent {
    pub event: String,

    /// Adapter-defined body. Omitted when the adapter sent none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,

    pub timestamp: String,
    pub session_id: String,
    pub session_name: String,
}

/// Payload of `sessionTerminated`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTerminated {
    pub name: String,
    pub id: String,
    pub timestamp: String,
}

/**
 * One entry of the `breakpoints` array.
 *
 * Only the fields below are forwarded; source locations are not.
 * Optional fields are omitted from the JSON when unset.
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointSnapshot {
    pub id: String,
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hit_condition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_message: Option<String>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/**
 * Current UTC time as an ISO-8601 string with millisecond precision,
 * e.g. `2026-10-18T09:30:00.123Z`.
 */
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
