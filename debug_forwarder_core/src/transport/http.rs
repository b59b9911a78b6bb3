/*!
 * Record delivery over `ureq`.
 *
 * Records are POSTed from the relay worker thread only, one at a time, so
 * a plain blocking agent is enough here. A slow collector holds up the
 * worker's queue and never the host.
 *
 * No timeouts are configured: a request may hang until the OS gives up.
 */

use ureq::Agent;

use crate::error::RelayError;

/**
 * Delivers serialized forwarding records.
 */
pub trait Deliver: Send + Sync {
    /**
     * POSTs `body` to `url` with `Content-Type: application/json`.
     *
     * Any 2xx status is success; the response body is ignored. Any other
     * status becomes `RelayError::Status`.
     */
    fn post_json(&self, url: &str, body: &[u8]) -> Result<(), RelayError>;
}

/**
 * `Deliver` over a `ureq::Agent` that reports every status as a response
 * (`http_status_as_error(false)`), so a non-2xx answer keeps its reason
 * phrase in the error shown to the user.
 */
pub struct HttpTransport {
    agent: Agent,
}

impl HttpTransport {
    pub fn new() -> Self {
        let agent: Agent = Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();

        Self { agent }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Deliver for HttpTransport {
    fn post_json(&self, url: &str, body: &[u8]) -> Result<(), RelayError> {
        let response = self
            .agent
            .post(url)
            .header("Content-Type", "application/json")
            .send(body)?;

        let status = response.status();
        ensure_success(status.as_u16(), status.canonical_reason())
    }
}

/// Maps a status line onto `Ok` for 2xx and `RelayError::Status` otherwise.
pub(crate) fn ensure_success(status: u16, reason: Option<&str>) -> Result<(), RelayError> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(RelayError::Status {
            status,
            reason: reason.unwrap_or("").to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        assert!(ensure_success(200, Some("OK")).is_ok());
        assert!(ensure_success(204, None).is_ok());
    }

    #[test]
    fn test_non_2xx_carries_reason_phrase() {
        let err = ensure_success(500, Some("Internal Server Error")).unwrap_err();
        assert_eq!(err.to_string(), "HTTP 500: Internal Server Error");

        let err = ensure_success(307, None).unwrap_err();
        assert!(matches!(err, RelayError::Status { status: 307, .. }));
        assert_eq!(err.to_string(), "HTTP 307: ");
    }
}
