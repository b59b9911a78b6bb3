/*!
 * Scripted debug host for the debug forwarder.
 *
 * Replays a JSON-lines script of debugger activity through the same host
 * traits an IDE integration implements, so the relay can be driven from a
 * file, a pipe, or a test:
 *
 * ```ignore
 * let settings = Arc::new(LiveSettings::default());
 * let host = Arc::new(ScriptedHost::new(settings.clone()));
 * let relay = Relay::start(host.clone(), forwarder)?;
 *
 * replay(BufReader::new(file), &host, &mut |event| relay.notify(event))?;
 * ```
 *
 * See `step` for the line format.
 */

mod error;
mod host;
mod replay;
mod step;

pub use error::ScriptError;
pub use host::{ScriptedHost, ScriptedSession};
pub use replay::{replay, ReplayStats};
pub use step::{BreakpointSpec, SessionSpec, Step};
