/**
 * Transport layer — how records and stream chunks move over the network.
 *
 * - `http` — record POSTs over a blocking `ureq` agent
 * - `sse` — the cancellable event stream client over `reqwest`
 * - `worker` — background thread, bounded channel, flush signaling
 */

pub mod http;
pub mod sse;
pub mod worker;

pub use http::{Deliver, HttpTransport};
pub use sse::{ChunkStream, EventStreamSource, SseClient};
pub use worker::{FlushSignal, Worker, WorkerMsg};
