//! Blocking HTTP client with bounded retry and circuit-breaker integration.
//!
//! Status handling:
//! - 403: trip the breaker, hard stop
//! - 429: count a failure, honour `retry-after` in the error, retry
//! - 401: authentication error, no retry
//! - other 4xx: provider error carrying the body, no retry
//! - 5xx and connect/timeout errors: count a failure, retry with backoff

use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use tracing::warn;

use super::circuit_breaker::CircuitBreaker;
use super::provider::FetchError;

const USER_AGENT: &str = concat!("quantkernel/", env!("CARGO_PKG_VERSION"));

pub struct HttpClient {
    client: Client,
    breaker: Arc<CircuitBreaker>,
    max_retries: u32,
    base_delay: Duration,
}

impl HttpClient {
    pub fn new(breaker: Arc<CircuitBreaker>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::ClientSetup(e.to_string()))?;

        Ok(Self {
            client,
            breaker,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    pub fn with_retry(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Send the request produced by `build`, retrying transient failures.
    /// Returns the body of the first successful response.
    pub fn send(
        &self,
        label: &str,
        build: impl Fn(&Client) -> RequestBuilder,
    ) -> Result<String, FetchError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                warn!(label, attempt, ?delay, "retrying request");
                std::thread::sleep(delay);
            }

            if !self.breaker.is_allowed() {
                return Err(FetchError::CircuitBreakerTripped);
            }

            let resp = match build(&self.client).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    self.breaker.record_failure();
                    last_error = Some(FetchError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(FetchError::NetworkUnreachable(e.to_string())),
            };

            let status = resp.status();
            if status == StatusCode::FORBIDDEN {
                self.breaker.trip();
                return Err(FetchError::CircuitBreakerTripped);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                self.breaker.record_failure();
                let retry_after = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                last_error = Some(FetchError::RateLimited {
                    retry_after_secs: retry_after,
                });
                continue;
            }

            if status == StatusCode::UNAUTHORIZED {
                return Err(FetchError::AuthenticationRequired(format!(
                    "{label}: provider rejected the access token"
                )));
            }

            if status.is_server_error() {
                self.breaker.record_failure();
                last_error = Some(FetchError::ProviderError {
                    code: status.as_u16().to_string(),
                    message: format!("{label}: server error"),
                });
                continue;
            }

            let body = resp
                .text()
                .map_err(|e| FetchError::ResponseFormatChanged(format!("{label}: {e}")))?;

            if !status.is_success() {
                return Err(FetchError::ProviderError {
                    code: status.as_u16().to_string(),
                    message: body,
                });
            }

            self.breaker.record_success();
            return Ok(body);
        }

        Err(last_error.unwrap_or_else(|| FetchError::NetworkUnreachable(format!("{label}: max retries exceeded"))))
    }
}

/// Deserialize a JSON body, mapping failures to `ResponseFormatChanged`.
pub fn parse_json<T: serde::de::DeserializeOwned>(label: &str, body: &str) -> Result<T, FetchError> {
    serde_json::from_str(body)
        .map_err(|e| FetchError::ResponseFormatChanged(format!("{label}: {e}")))
}
