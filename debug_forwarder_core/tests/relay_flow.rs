/*!
 * End-to-end relay behaviour with an in-memory host and collector.
 */
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use debug_forwarder_core::{
    Breakpoint, BreakpointsChange, DebugHost, DebugSession, Deliver, Forwarder, HostError,
    HostEvent, LiveSettings, Notifier, Relay, RelayError, SessionRef, Settings, StackItem,
};
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

struct Session {
    id: String,
    name: String,
    variables: Option<Value>,
}

impl DebugSession for Session {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn session_type(&self) -> &str {
        "node"
    }

    fn custom_request(&self, command: &str) -> Result<Value, HostError> {
        match command {
            "variables" => self
                .variables
                .clone()
                .ok_or_else(|| HostError::new(command, "adapter not paused")),
            "stackTrace" => Ok(json!({ "stackFrames": [{ "id": 1, "name": "main" }] })),
            _ => Err(HostError::new(command, "unsupported")),
        }
    }
}

fn session(name: &str, variables: Option<Value>) -> SessionRef {
    Arc::new(Session {
        id: format!("{name}-id"),
        name: name.to_string(),
        variables,
    })
}

#[derive(Default)]
struct Host {
    active: Mutex<Option<SessionRef>>,
    breakpoints: Mutex<Vec<Breakpoint>>,
}

impl DebugHost for Host {
    fn active_session(&self) -> Option<SessionRef> {
        self.active.lock().unwrap().clone()
    }

    fn breakpoints(&self) -> Vec<Breakpoint> {
        self.breakpoints.lock().unwrap().clone()
    }
}

/// Accepts everything except URLs listed in `failing`, taking `delay` per POST.
#[derive(Default)]
struct Collector {
    failing: Vec<String>,
    delay: Duration,
    posts: Mutex<Vec<(String, Value)>>,
}

impl Collector {
    fn bodies(&self) -> Vec<Value> {
        self.posts.lock().unwrap().iter().map(|(_, b)| b.clone()).collect()
    }

    fn urls(&self) -> Vec<String> {
        self.posts.lock().unwrap().iter().map(|(u, _)| u.clone()).collect()
    }
}

impl Deliver for Collector {
    fn post_json(&self, url: &str, body: &[u8]) -> Result<(), RelayError> {
        thread::sleep(self.delay);
        let body: Value = serde_json::from_slice(body).unwrap();
        self.posts.lock().unwrap().push((url.to_string(), body));
        if self.failing.iter().any(|f| f == url) {
            Err(RelayError::Transport("connection refused".into()))
        } else {
            Ok(())
        }
    }
}

fn slow_collector() -> Collector {
    Collector {
        delay: Duration::from_millis(20),
        ..Default::default()
    }
}

#[derive(Default)]
struct Warnings(Mutex<Vec<String>>);

impl Notifier for Warnings {
    fn show_warning(&self, message: &str) {
        self.0.lock().unwrap().push(message.to_string());
    }
}

struct Fixture {
    host: Arc<Host>,
    settings: Arc<LiveSettings>,
    collector: Arc<Collector>,
    warnings: Arc<Warnings>,
    relay: Relay,
}

fn fixture(collector: Collector) -> Fixture {
    let host = Arc::new(Host::default());
    let settings = Arc::new(LiveSettings::new(Settings::default()));
    let collector = Arc::new(collector);
    let warnings = Arc::new(Warnings::default());

    let forwarder = Forwarder::new(settings.clone(), collector.clone(), warnings.clone());
    let relay = Relay::start(host.clone(), forwarder).expect("relay should start");

    Fixture {
        host,
        settings,
        collector,
        warnings,
        relay,
    }
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn session_start_sends_start_then_variables_in_order() {
    let f = fixture(Collector::default());

    f.relay
        .notify(HostEvent::SessionStarted(session("main", Some(json!({ "x": 1 })))));
    assert!(f.relay.flush());

    let bodies = f.collector.bodies();
    assert_eq!(bodies.len(), 2);
    assert_eq!(bodies[0]["sessionStarted"]["name"], "main");
    assert_eq!(bodies[0]["sessionStarted"]["type"], "node");
    assert_eq!(bodies[0]["sessionStarted"]["id"], "main-id");
    assert!(bodies[0]["sessionStarted"]["timestamp"].is_string());
    assert_eq!(bodies[1], json!({ "variables": { "x": 1 } }));
}

#[test]
fn failed_variables_request_sends_only_start() {
    let f = fixture(Collector::default());

    f.relay.notify(HostEvent::SessionStarted(session("main", None)));
    assert!(f.relay.flush());

    let bodies = f.collector.bodies();
    assert_eq!(bodies.len(), 1);
    assert!(bodies[0].get("sessionStarted").is_some());
    assert!(f.warnings.0.lock().unwrap().is_empty());
}

#[test]
fn full_session_lifecycle_keeps_event_order() {
    let f = fixture(Collector::default());
    let main = session("main", Some(json!({})));
    *f.host.active.lock().unwrap() = Some(main.clone());
    *f.host.breakpoints.lock().unwrap() = vec![Breakpoint {
        id: "bp1".into(),
        enabled: true,
        ..Default::default()
    }];

    f.relay.notify(HostEvent::SessionStarted(main.clone()));
    f.relay.notify(HostEvent::CustomEvent {
        session: main.clone(),
        event: "output".into(),
        body: Some(json!({ "category": "stdout", "output": "hi\n" })),
    });
    f.relay
        .notify(HostEvent::ActiveStackItemChanged(Some(StackItem::Thread { thread_id: 1 })));
    f.relay
        .notify(HostEvent::BreakpointsChanged(BreakpointsChange::default()));
    f.relay.notify(HostEvent::SessionTerminated(main));
    assert!(f.relay.flush());

    let keys: Vec<String> = f
        .collector
        .bodies()
        .iter()
        .map(|b| b.as_object().unwrap().keys().next().unwrap().clone())
        .collect();
    assert_eq!(
        keys,
        [
            "sessionStarted",
            "variables",
            "debugEvent",
            "stack",
            "breakpoints",
            "sessionTerminated"
        ]
    );

    let bodies = f.collector.bodies();
    assert_eq!(bodies[2]["debugEvent"]["body"]["output"], "hi\n");
    assert_eq!(bodies[2]["debugEvent"]["sessionName"], "main");
    assert_eq!(bodies[4], json!({ "breakpoints": [{ "id": "bp1", "enabled": true }] }));
}

#[test]
fn disabled_relay_issues_no_network_calls() {
    let f = fixture(Collector {
        failing: vec!["http://h/sse".into()],
        ..Default::default()
    });
    f.settings.replace(Settings {
        server_url: "http://h/sse".into(),
        enabled: false,
    });

    f.relay.notify(HostEvent::SessionStarted(session("main", Some(json!({})))));
    f.relay
        .notify(HostEvent::BreakpointsChanged(BreakpointsChange::default()));
    assert!(f.relay.flush());

    assert!(f.collector.urls().is_empty());
    assert!(f.warnings.0.lock().unwrap().is_empty());
}

#[test]
fn streaming_url_falls_back_to_legacy_endpoint() {
    let f = fixture(Collector {
        failing: vec!["http://collector:8001/sse".into()],
        ..Default::default()
    });
    f.settings.set_server_url("http://collector:8001/sse");

    f.relay.notify(HostEvent::SessionTerminated(session("main", None)));
    assert!(f.relay.flush());

    assert_eq!(
        f.collector.urls(),
        ["http://collector:8001/sse", "http://collector:8001/debug-data"]
    );
    assert!(f.warnings.0.lock().unwrap().is_empty());
}

#[test]
fn failed_fallback_warns_with_original_error() {
    let f = fixture(Collector {
        failing: vec![
            "http://collector:8001/sse/".into(),
            "http://collector:8001/debug-data".into(),
        ],
        ..Default::default()
    });
    f.settings.set_server_url("http://collector:8001/sse/");

    f.relay.notify(HostEvent::SessionTerminated(session("main", None)));
    assert!(f.relay.flush());

    assert_eq!(f.collector.urls().len(), 2);
    assert_eq!(
        *f.warnings.0.lock().unwrap(),
        ["Failed to send debug data: connection refused"]
    );
}

/**
 * One breakpoint changes; the collector still receives all of them.
 */
#[test]
fn changing_one_breakpoint_forwards_full_set() {
    let f = fixture(Collector::default());
    let all: Vec<Breakpoint> = (1..=3)
        .map(|i| Breakpoint {
            id: format!("bp{i}"),
            enabled: i != 2,
            ..Default::default()
        })
        .collect();
    *f.host.breakpoints.lock().unwrap() = all.clone();

    f.relay.notify(HostEvent::BreakpointsChanged(BreakpointsChange {
        changed: vec![all[1].clone()],
        ..Default::default()
    }));
    assert!(f.relay.flush());

    let bodies = f.collector.bodies();
    assert_eq!(
        bodies,
        [json!({
            "breakpoints": [
                { "id": "bp1", "enabled": true },
                { "id": "bp2", "enabled": false },
                { "id": "bp3", "enabled": true }
            ]
        })]
    );
}

/**
 * The worker lags behind the host here: every event is queued before the
 * first POST completes. Each record must still reflect the host at the
 * moment its event fired.
 */
#[test]
fn host_state_is_read_when_the_event_fires() {
    let f = fixture(slow_collector());
    let main = session("main", Some(json!({})));
    let bp = |id: &str| Breakpoint {
        id: id.into(),
        enabled: true,
        ..Default::default()
    };

    f.host.breakpoints.lock().unwrap().push(bp("bp1"));
    f.relay
        .notify(HostEvent::BreakpointsChanged(BreakpointsChange::default()));
    f.host.breakpoints.lock().unwrap().push(bp("bp2"));
    f.relay
        .notify(HostEvent::BreakpointsChanged(BreakpointsChange::default()));

    *f.host.active.lock().unwrap() = Some(main.clone());
    f.relay.notify(HostEvent::SessionStarted(main.clone()));
    f.relay
        .notify(HostEvent::ActiveStackItemChanged(Some(StackItem::Thread { thread_id: 1 })));
    f.host.active.lock().unwrap().take();
    f.relay.notify(HostEvent::SessionTerminated(main));

    assert!(f.relay.flush());

    let bodies = f.collector.bodies();
    let keys: Vec<&str> = bodies
        .iter()
        .map(|b| b.as_object().unwrap().keys().next().unwrap().as_str())
        .collect();
    assert_eq!(
        keys,
        [
            "breakpoints",
            "breakpoints",
            "sessionStarted",
            "variables",
            "stack",
            "sessionTerminated"
        ]
    );
    assert_eq!(bodies[0], json!({ "breakpoints": [{ "id": "bp1", "enabled": true }] }));
    assert_eq!(
        bodies[1],
        json!({ "breakpoints": [
            { "id": "bp1", "enabled": true },
            { "id": "bp2", "enabled": true }
        ] })
    );
}

#[test]
fn blocking_notify_never_drops_past_queue_capacity() {
    let host = Arc::new(Host::default());
    let collector = Arc::new(Collector {
        delay: Duration::from_millis(2),
        ..Default::default()
    });
    let forwarder = Forwarder::new(
        Arc::new(Settings::default()),
        collector.clone(),
        Arc::new(Warnings::default()),
    );
    let relay = Relay::with_capacity(host, forwarder, 4).unwrap();

    let main = session("main", None);
    for i in 0..40 {
        relay.notify_blocking(HostEvent::CustomEvent {
            session: main.clone(),
            event: "output".into(),
            body: Some(json!({ "seq": i })),
        });
    }
    assert!(relay.shutdown());

    let seqs: Vec<i64> = collector
        .bodies()
        .iter()
        .map(|b| b["debugEvent"]["body"]["seq"].as_i64().unwrap())
        .collect();
    assert_eq!(seqs, (0..40).collect::<Vec<_>>());
}

#[test]
fn shutdown_waits_past_the_flush_deadline() {
    let host = Arc::new(Host::default());
    let collector = Arc::new(Collector {
        delay: Duration::from_millis(300),
        ..Default::default()
    });
    let forwarder = Forwarder::new(
        Arc::new(Settings::default()),
        collector.clone(),
        Arc::new(Warnings::default()),
    );
    let relay = Relay::start(host, forwarder).unwrap();

    // ~3s of sends: longer than a flush is willing to wait
    for _ in 0..10 {
        relay.notify_blocking(HostEvent::SessionTerminated(session("main", None)));
    }
    assert!(relay.shutdown());

    assert_eq!(collector.bodies().len(), 10);
}
