/**
 * Forwarder — delivers one record to the collector.
 *
 * Delivery is best-effort with exactly one degraded-mode retry:
 *
 * ```text
 *   settings.enabled == false ──► Skipped (no network at all)
 *            │
 *   POST serverUrl ──ok──► Delivered
 *            │ err
 *   serverUrl ends in /sse or /sse/ ? ──no──► warn user (original error)
 *            │ yes
 *   POST …/debug-data ──ok──► DeliveredViaFallback (no warning)
 *            │ err (logged only)
 *            └──► warn user (original error)
 * ```
 *
 * Transient and permanent failures are treated alike. Errors never
 * propagate to the caller as `Err` — they come back inside `Delivery` for
 * inspection, after having been logged and shown to the user.
 */
use std::sync::Arc;

use crate::config::ConfigSource;
use crate::error::RelayError;
use crate::host::Notifier;
use crate::protocol::endpoint::legacy_fallback_url;
use crate::protocol::record::Record;
use crate::transport::Deliver;

/// Outcome of a single `Forwarder::send`.
#[derive(Debug)]
pub enum Delivery {
    /// Forwarding is disabled.
    Skipped,
    Delivered,
    /// The primary POST failed and the legacy endpoint accepted the record.
    DeliveredViaFallback,
    /// Nothing accepted the record. Carries the *primary* error.
    Failed(RelayError),
}

impl Delivery {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Delivery::Delivered | Delivery::DeliveredViaFallback)
    }
}

pub struct Forwarder {
    config: Arc<dyn ConfigSource>,
    transport: Arc<dyn Deliver>,
    notifier: Arc<dyn Notifier>,
}

impl Forwarder {
    pub fn new(
        config: Arc<dyn ConfigSource>,
        transport: Arc<dyn Deliver>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            transport,
            notifier,
        }
    }

    /**
     * Sends `record` if forwarding is enabled.
     *
     * Settings are read fresh for every call.
     */
    pub fn send(&self, record: &Record) -> Delivery {
        let settings = self.config.settings();
        if !settings.enabled {
            return Delivery::Skipped;
        }

        let body = match serde_json::to_vec(record) {
            Ok(body) => body,
            Err(e) => return self.fail(&settings.server_url, RelayError::from(e)),
        };

        let error = match self.transport.post_json(&settings.server_url, &body) {
            Ok(()) => {
                log::info!("Debug data sent successfully: {}", record.kind());
                return Delivery::Delivered;
            }
            Err(e) => e,
        };

        if let Some(fallback_url) = legacy_fallback_url(&settings.server_url) {
            log::warn!("Send to {} failed ({error})", settings.server_url);
            if self.try_fallback(&fallback_url, record, &body) {
                return Delivery::DeliveredViaFallback;
            }
        }

        self.fail(&settings.server_url, error)
    }

    fn try_fallback(&self, url: &str, record: &Record, body: &[u8]) -> bool {
        log::info!("Retrying {} via legacy endpoint {url}", record.kind());

        match self.transport.post_json(url, body) {
            Ok(()) => {
                log::info!("Debug data sent via fallback: {}", record.kind());
                true
            }
            Err(e) => {
                log::error!("Fallback send to {url} failed: {e}");
                false
            }
        }
    }

    /// Logs the primary error and shows it to the user.
    fn fail(&self, url: &str, error: RelayError) -> Delivery {
        log::error!("Failed to send debug data to {url}: {error}");
        self.notifier
            .show_warning(&format!("Failed to send debug data: {error}"));
        Delivery::Failed(error)
    }
}
