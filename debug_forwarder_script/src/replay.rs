/**
 * Line-by-line script replay.
 *
 * Blank lines and `#` comments are skipped. A line that fails to parse, or
 * names an unknown session, is logged and counted; the replay continues
 * with the next line. Only an I/O error on the reader stops it.
 */
use std::io::BufRead;

use debug_forwarder_core::HostEvent;

use crate::error::ScriptError;
use crate::host::ScriptedHost;
use crate::step::Step;

/// Counters for one replay.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStats {
    /// Non-blank, non-comment lines seen.
    pub steps: usize,
    /// Host events handed to the callback.
    pub events: usize,
    /// Lines skipped because of an error.
    pub errors: usize,
}

pub fn replay<R: BufRead>(
    reader: R,
    host: &ScriptedHost,
    on_event: &mut dyn FnMut(HostEvent),
) -> Result<ReplayStats, ScriptError> {
    let mut stats = ReplayStats::default();

    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let line_no = idx + 1;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        stats.steps += 1;

        let step: Step = match serde_json::from_str(trimmed) {
            Ok(step) => step,
            Err(source) => {
                log::warn!("{}", ScriptError::Parse { line: line_no, source });
                stats.errors += 1;
                continue;
            }
        };

        match host.apply(step) {
            Ok(Some(event)) => {
                log::debug!("line {line_no}: {event:?}");
                stats.events += 1;
                on_event(event);
            }
            Ok(None) => {}
            Err(e) => {
                log::warn!("line {line_no}: {e}");
                stats.errors += 1;
            }
        }
    }

    Ok(stats)
}
