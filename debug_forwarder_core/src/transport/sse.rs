/*!
 * Event stream client over `reqwest`.
 *
 * The stream listener runs its own current-thread tokio runtime, so the
 * read loop can race every await against a `CancellationToken`. Dropping
 * the chunk stream drops the response, which closes the connection even
 * while the server is idle.
 */

use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;
use futures_util::{FutureExt, StreamExt};
use reqwest::header::ACCEPT;
use reqwest::redirect::Policy;
use reqwest::Client;

use crate::error::RelayError;
use crate::protocol::constants::{EVENT_STREAM_MIME, SESSION_ID_HEADER};
use crate::transport::http::ensure_success;

/// Raw body chunks of an open event stream, in arrival order.
pub type ChunkStream = BoxStream<'static, Result<Vec<u8>, RelayError>>;

/**
 * Opens one-way event streams.
 *
 * Both calls are futures driven by the listener's runtime; dropping either
 * future abandons its request.
 */
pub trait EventStreamSource: Send + Sync {
    /**
     * Handshake: `GET url` with `Accept: text/event-stream`, redirects not
     * followed. Returns the `mcp-session-id` response header, if any.
     */
    fn handshake<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Option<String>, RelayError>>;

    /**
     * Opens the stream with the same accept header, echoing `session_id`
     * when the handshake produced one. Non-2xx is an error.
     */
    fn open<'a>(
        &'a self,
        url: &'a str,
        session_id: Option<&'a str>,
    ) -> BoxFuture<'a, Result<ChunkStream, RelayError>>;
}

/**
 * `EventStreamSource` over two `reqwest` clients: the handshake client
 * never follows redirects, the stream client does.
 *
 * Neither keeps idle connections. Each stream runs on a runtime of its
 * own, and a pooled connection would outlive the runtime that drives it.
 */
pub struct SseClient {
    handshake_client: Client,
    client: Client,
}

impl SseClient {
    pub fn new() -> Result<Self, RelayError> {
        let handshake_client = Client::builder()
            .redirect(Policy::none())
            .pool_max_idle_per_host(0)
            .build()?;
        let client = Client::builder().pool_max_idle_per_host(0).build()?;

        Ok(Self {
            handshake_client,
            client,
        })
    }
}

impl SseClient {
    async fn session_id(&self, url: &str) -> Result<Option<String>, RelayError> {
        let response = self
            .handshake_client
            .get(url)
            .header(ACCEPT, EVENT_STREAM_MIME)
            .send()
            .await?;

        // the body is never read; dropping the response ends the handshake
        let session_id = response
            .headers()
            .get(SESSION_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        Ok(session_id)
    }

    async fn connect(&self, url: &str, session_id: Option<&str>) -> Result<ChunkStream, RelayError> {
        let mut request = self.client.get(url).header(ACCEPT, EVENT_STREAM_MIME);
        if let Some(id) = session_id {
            request = request.header(SESSION_ID_HEADER, id);
        }

        let response = request.send().await?;
        let status = response.status();
        ensure_success(status.as_u16(), status.canonical_reason())?;

        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(RelayError::from));
        Ok(chunks.boxed())
    }
}

impl EventStreamSource for SseClient {
    fn handshake<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Option<String>, RelayError>> {
        self.session_id(url).boxed()
    }

    fn open<'a>(
        &'a self,
        url: &'a str,
        session_id: Option<&'a str>,
    ) -> BoxFuture<'a, Result<ChunkStream, RelayError>> {
        self.connect(url, session_id).boxed()
    }
}
