/*!
 * `HttpTransport` and `SseClient` against a loopback collector.
 *
 * The collector is a plain `TcpListener` that answers one request per
 * connection with a canned response and records what it received.
 */
use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use debug_forwarder_core::{
    Deliver, Delivery, Forwarder, HttpTransport, LineSink, Notifier, Record, RelayError,
    Settings, SseClient, StreamGate, StreamListener,
};
use serde_json::json;

// ---------------------------------------------------------------------------
// Loopback collector
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct Request {
    method: String,
    path: String,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

fn read_request(stream: &mut TcpStream) -> Request {
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).unwrap();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    reader.read_exact(&mut body).unwrap();

    Request {
        method,
        path,
        headers,
        body,
    }
}

/**
 * Serves `connections` requests, answering each with `respond(&request)`,
 * then returns everything it received.
 */
fn serve(
    connections: usize,
    respond: impl Fn(&Request) -> String + Send + 'static,
) -> (String, JoinHandle<Vec<Request>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let handle = thread::spawn(move || {
        let mut seen = Vec::new();
        for stream in listener.incoming().take(connections) {
            let mut stream = stream.unwrap();
            let request = read_request(&mut stream);
            let _ = stream.write_all(respond(&request).as_bytes());
            let _ = stream.flush();
            seen.push(request);
        }
        seen
    });

    (base, handle)
}

fn response(status: &str, extra_headers: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {status}\r\n{extra_headers}Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    )
}

fn collecting_sink() -> (LineSink, Arc<Mutex<Vec<String>>>) {
    let lines = Arc::new(Mutex::new(Vec::<String>::new()));
    let sink_lines = lines.clone();
    let sink: LineSink = Arc::new(move |line| sink_lines.lock().unwrap().push(line.to_string()));
    (sink, lines)
}

#[derive(Default)]
struct Warnings(Mutex<Vec<String>>);

impl Notifier for Warnings {
    fn show_warning(&self, message: &str) {
        self.0.lock().unwrap().push(message.to_string());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[test]
fn post_sends_json_body_with_content_type() {
    let (base, server) = serve(1, |_| response("200 OK", "", r#"{"status":"ok"}"#));

    let transport = HttpTransport::new();
    let body = serde_json::to_vec(&Record::Variables(json!({ "x": 1 }))).unwrap();
    transport
        .post_json(&format!("{base}/debug-data"), &body)
        .expect("post should succeed");

    let requests = server.join().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/debug-data");
    assert_eq!(requests[0].headers["content-type"], "application/json");
    let received: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(received, json!({ "variables": { "x": 1 } }));
}

#[test]
fn non_2xx_is_reported_with_reason() {
    let (base, server) = serve(1, |_| response("503 Service Unavailable", "", ""));

    let err = HttpTransport::new()
        .post_json(&format!("{base}/debug-data"), b"{}")
        .unwrap_err();

    assert!(matches!(err, RelayError::Status { status: 503, .. }));
    assert_eq!(err.to_string(), "HTTP 503: Service Unavailable");
    server.join().unwrap();
}

/**
 * The collector refuses POSTs on `/sse`; the forwarder retries on
 * `/debug-data` and the user is not warned.
 */
#[test]
fn forwarder_falls_back_over_http() {
    let (base, server) = serve(2, |req| match req.path.as_str() {
        "/debug-data" => response("200 OK", "", ""),
        _ => response("405 Method Not Allowed", "", ""),
    });

    let warnings = Arc::new(Warnings::default());
    let forwarder = Forwarder::new(
        Arc::new(Settings::with_server_url(format!("{base}/sse"))),
        Arc::new(HttpTransport::new()),
        warnings.clone(),
    );

    let outcome = forwarder.send(&Record::Stack(json!([])));
    assert!(matches!(outcome, Delivery::DeliveredViaFallback));

    let requests = server.join().unwrap();
    let paths: Vec<&str> = requests.iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, ["/sse", "/debug-data"]);
    assert_eq!(requests[0].body, requests[1].body);
    assert!(warnings.0.lock().unwrap().is_empty());
}

#[test]
fn stream_listener_handshakes_and_logs_lines() {
    let (base, server) = serve(2, |req| {
        let sse = "Content-Type: text/event-stream\r\nmcp-session-id: sess-7\r\n";
        if req.headers.contains_key("mcp-session-id") {
            response("200 OK", sse, "data: A\n\ndata: B\npartial")
        } else {
            response("200 OK", sse, "")
        }
    });

    let (sink, lines) = collecting_sink();

    let listener = StreamListener::new(Arc::new(SseClient::new().unwrap()), StreamGate::new())
        .with_sink(sink);
    let handle = listener
        .start_if_configured(&Settings::with_server_url(format!("{base}/sse")))
        .unwrap()
        .expect("stream endpoint should start the listener");
    handle.join();

    let requests = server.join().unwrap();
    assert_eq!(requests.len(), 2);
    for request in &requests {
        assert_eq!(request.method, "GET");
        assert_eq!(request.path, "/sse");
        assert_eq!(request.headers["accept"], "text/event-stream");
    }
    assert!(!requests[0].headers.contains_key("mcp-session-id"));
    assert_eq!(requests[1].headers["mcp-session-id"], "sess-7");

    assert_eq!(*lines.lock().unwrap(), ["A", "B"]);
}

/**
 * The collector sends one line and then goes quiet without closing.
 * `stop` must close that connection itself, and only then free the gate.
 */
#[test]
fn stop_closes_an_idle_stream_connection() {
    let server = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", server.local_addr().unwrap());

    let collector = thread::spawn(move || -> io::Result<usize> {
        let (mut handshake, _) = server.accept()?;
        read_request(&mut handshake);
        handshake.write_all(response("200 OK", "", "").as_bytes())?;
        drop(handshake);

        let (mut stream, _) = server.accept()?;
        read_request(&mut stream);
        stream.write_all(
            b"HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\n\r\ndata: hello\n",
        )?;
        stream.flush()?;

        // returns once the client side goes away
        stream.set_read_timeout(Some(Duration::from_secs(5)))?;
        stream.read(&mut [0u8; 64])
    });

    let (sink, lines) = collecting_sink();
    let gate = StreamGate::new();
    let listener =
        StreamListener::new(Arc::new(SseClient::new().unwrap()), gate.clone()).with_sink(sink);
    let handle = listener
        .start_if_configured(&Settings::with_server_url(format!("{base}/sse")))
        .unwrap()
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    while lines.lock().unwrap().is_empty() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(*lines.lock().unwrap(), ["hello"]);

    handle.stop();
    assert!(!gate.is_live());

    let closed = match collector.join().unwrap() {
        Ok(0) => true,
        Err(e) => e.kind() == io::ErrorKind::ConnectionReset,
        Ok(_) => false,
    };
    assert!(closed, "connection still open after stop");
}
