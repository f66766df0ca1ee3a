//! HTTP retry with exponential backoff.
//!
//! Weather lookups go through [`send_json`] rather than calling
//! `reqwest::RequestBuilder::send()` directly. Connection failures,
//! timeouts, HTTP 429 and HTTP 5xx are retried; any other 4xx is final.

use std::time::Duration;

use serde::de::DeserializeOwned;

use crate::WeatherError;

/// Maximum length of the response body preview included in error logs.
const BODY_PREVIEW_LEN: usize = 300;

/// How many times to retry and how long to wait between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry. Doubles on each later retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (1-based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1 << shift)
    }
}

/// What to do with an HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAction {
    Accept,
    Retry,
    NotFound,
    Reject,
}

/// Classifies a response status.
#[must_use]
pub fn classify(status: reqwest::StatusCode) -> StatusAction {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        StatusAction::Retry
    } else if status == reqwest::StatusCode::NOT_FOUND {
        StatusAction::NotFound
    } else if status.is_client_error() {
        StatusAction::Reject
    } else {
        StatusAction::Accept
    }
}

/// Returns `true` if the error is likely transient and worth retrying.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect() || e.is_body() || e.is_decode() || e.is_request()
}

/// Sends a request and decodes the JSON response body.
///
/// `build_request` is called once per attempt since builders are consumed
/// by `send()`. `query` names the place being looked up and is carried in
/// [`WeatherError::NotFound`].
///
/// # Errors
///
/// * [`WeatherError::NotFound`] on HTTP 404
/// * [`WeatherError::Rejected`] on any other 4xx except 429
/// * [`WeatherError::Upstream`] once retries are exhausted
/// * [`WeatherError::Json`] if the body is not the expected shape
pub async fn send_json<T, F>(
    build_request: F,
    policy: RetryPolicy,
    query: &str,
) -> Result<T, WeatherError>
where
    T: DeserializeOwned,
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    let response = send_inner(&build_request, policy, query).await?;
    let text = response.text().await.map_err(|e| WeatherError::Upstream {
        message: format!("failed to read response body: {e}"),
    })?;

    serde_json::from_str(&text).map_err(|e| {
        let preview: String = text.chars().take(BODY_PREVIEW_LEN).collect();
        log::error!("Weather response for {query} did not parse: {e}\n  body preview: {preview}");
        WeatherError::Json(e)
    })
}

async fn send_inner<F>(
    build_request: &F,
    policy: RetryPolicy,
    query: &str,
) -> Result<reqwest::Response, WeatherError>
where
    F: Fn() -> reqwest::RequestBuilder + Send + Sync,
{
    let max_retries = policy.max_retries;
    let mut last_failure = String::from("no attempt made");

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let delay = policy.delay(attempt);
            log::warn!("  retry {attempt}/{max_retries} for {query} in {delay:?}...");
            tokio::time::sleep(delay).await;
        }

        match build_request().send().await {
            Err(e) => {
                if !is_transient(&e) {
                    return Err(WeatherError::Http(e));
                }
                log::warn!("  transient error for {query}: {e}");
                last_failure = e.to_string();
            }
            Ok(response) => {
                let status = response.status();
                match classify(status) {
                    StatusAction::Accept => return Ok(response),
                    StatusAction::NotFound => {
                        return Err(WeatherError::NotFound {
                            query: query.to_string(),
                        });
                    }
                    StatusAction::Reject => {
                        log::error!("Weather provider rejected {query}: HTTP {status}");
                        return Err(WeatherError::Rejected {
                            status: status.as_u16(),
                        });
                    }
                    StatusAction::Retry => {
                        log::warn!("  HTTP {status} for {query}");
                        last_failure = format!("HTTP {status}");
                    }
                }
            }
        }
    }

    Err(WeatherError::Upstream {
        message: format!("{last_failure} after {max_retries} retries"),
    })
}

#[cfg(test)]
mod tests {
    use reqwest::StatusCode;

    use super::*;

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
        };
        assert_eq!(policy.delay(1), Duration::from_millis(100));
        assert_eq!(policy.delay(2), Duration::from_millis(200));
        assert_eq!(policy.delay(3), Duration::from_millis(400));
    }

    #[test]
    fn large_attempt_does_not_overflow() {
        let policy = RetryPolicy::default();
        assert!(policy.delay(u32::MAX) >= policy.delay(16));
    }

    #[test]
    fn status_classification() {
        assert_eq!(classify(StatusCode::OK), StatusAction::Accept);
        assert_eq!(classify(StatusCode::TOO_MANY_REQUESTS), StatusAction::Retry);
        assert_eq!(classify(StatusCode::BAD_GATEWAY), StatusAction::Retry);
        assert_eq!(classify(StatusCode::NOT_FOUND), StatusAction::NotFound);
        assert_eq!(classify(StatusCode::UNAUTHORIZED), StatusAction::Reject);
        assert_eq!(classify(StatusCode::BAD_REQUEST), StatusAction::Reject);
    }
}
