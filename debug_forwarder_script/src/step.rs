/**
 * Script steps — one JSON object per line, tagged by `"step"`.
 *
 * ```json
 * {"step":"configure","serverUrl":"http://localhost:8001/sse"}
 * {"step":"sessionStarted","session":{"id":"1","name":"main","type":"python","responses":{"variables":{"x":1}}}}
 * {"step":"customEvent","sessionId":"1","event":"output","body":{"output":"hi\n"}}
 * {"step":"activeStackItemChanged","threadId":1,"frameId":3}
 * {"step":"breakpointsChanged","added":[{"id":"bp1","condition":"x > 1"}]}
 * {"step":"sessionTerminated","sessionId":"1"}
 * ```
 */
use std::collections::HashMap;

use debug_forwarder_core::{Breakpoint, SourceLocation};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "step", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Step {
    /// Updates the live settings; produces no host event.
    Configure {
        server_url: Option<String>,
        enabled: Option<bool>,
    },
    SessionStarted {
        session: SessionSpec,
    },
    CustomEvent {
        session_id: String,
        event: String,
        #[serde(default)]
        body: Option<Value>,
    },
    SessionTerminated {
        session_id: String,
    },
    /// No `threadId` means the stack view lost focus.
    ActiveStackItemChanged {
        thread_id: Option<i64>,
        frame_id: Option<i64>,
    },
    BreakpointsChanged {
        #[serde(default)]
        added: Vec<BreakpointSpec>,
        #[serde(default)]
        removed: Vec<BreakpointSpec>,
        #[serde(default)]
        changed: Vec<BreakpointSpec>,
    },
}

/**
 * A session declaration. `responses` answers adapter requests by name;
 * an `{"error": "..."}` object makes that request fail.
 */
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SessionSpec {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub session_type: String,
    #[serde(default)]
    pub responses: HashMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakpointSpec {
    pub id: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    pub condition: Option<String>,
    pub hit_condition: Option<String>,
    pub log_message: Option<String>,
    pub path: Option<String>,
    pub line: Option<u32>,
}

fn enabled_by_default() -> bool {
    true
}

impl From<BreakpointSpec> for Breakpoint {
    fn from(spec: BreakpointSpec) -> Self {
        let location = match (spec.path, spec.line) {
            (Some(path), Some(line)) => Some(SourceLocation { path, line }),
            _ => None,
        };

        Breakpoint {
            id: spec.id,
            enabled: spec.enabled,
            condition: spec.condition,
            hit_condition: spec.hit_condition,
            log_message: spec.log_message,
            location,
        }
    }
}
