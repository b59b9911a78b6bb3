/*!
 * Protocol layer — what we send and where we send it.
 *
 * - `record` — the forwarding record and its per-kind payloads
 * - `constants` — configuration namespace, default URL, header names
 * - `endpoint` — URL rules for stream activation and the legacy fallback
 */

pub mod constants;
pub mod endpoint;
pub mod record;
