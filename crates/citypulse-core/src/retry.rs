//! Retry client with per-attempt timeout, exponential backoff and a
//! fail-fast path for blocked requests.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::FetchError;
use crate::http_client::{HttpClient, HttpErrorKind, HttpRequest, HttpResponse};
use crate::provider_policy::ProviderPolicy;
use crate::throttling::RateGate;

/// Exponential delay between failed attempts: `base * factor^attempt`, capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub base: Duration,
    pub factor: f64,
    pub max: Duration,
}

impl Default for Backoff {
    /// `2^attempt` seconds after the attempt-th failure.
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            factor: 2.0,
            max: Duration::from_secs(30),
        }
    }
}

impl Backoff {
    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay(self, attempt: u32) -> Duration {
        let scale = self.factor.powi(attempt.min(i32::MAX as u32) as i32);
        let seconds = (self.base.as_secs_f64() * scale).min(self.max.as_secs_f64());
        Duration::from_secs_f64(seconds.max(0.0))
    }
}

/// HTTP client wrapper that applies the retry contract to every request.
///
/// - each attempt is bounded by `timeout`; expiry counts as one failed attempt
/// - 5xx, timeouts and unclassified transport failures are retried with backoff
/// - 4xx and blocked transports fail immediately
/// - exhausting attempts surfaces the last observed error
#[derive(Clone)]
pub struct RetryClient {
    http: Arc<dyn HttpClient>,
    backoff: Backoff,
    gate: Option<RateGate>,
}

impl RetryClient {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self {
            http,
            backoff: Backoff::default(),
            gate: None,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_rate_gate(mut self, gate: RateGate) -> Self {
        self.gate = Some(gate);
        self
    }

    pub async fn request(
        &self,
        request: HttpRequest,
        max_attempts: u32,
        timeout: Duration,
    ) -> Result<HttpResponse, FetchError> {
        let max_attempts = max_attempts.max(1);
        let target = redact(&request.url).to_owned();
        let mut last_error = FetchError::unknown(format!("no attempt made for {target}"));

        for attempt in 1..=max_attempts {
            if let Some(gate) = &self.gate {
                gate.acquire().await;
            }

            let call = self.http.execute(request.clone().with_timeout(timeout));
            let error = match tokio::time::timeout(timeout, call).await {
                Err(_) => FetchError::timeout(format!(
                    "request to {target} timed out after {}ms",
                    timeout.as_millis()
                )),
                Ok(Err(error)) => match error.kind() {
                    HttpErrorKind::Blocked => {
                        return Err(FetchError::blocked(format!(
                            "request to {target} was blocked: {}",
                            error.message()
                        )));
                    }
                    HttpErrorKind::Timeout => FetchError::timeout(format!(
                        "request to {target} timed out: {}",
                        error.message()
                    )),
                    HttpErrorKind::Transport => FetchError::unknown(format!(
                        "request to {target} failed: {}",
                        error.message()
                    )),
                },
                Ok(Ok(response)) if response.is_success() => return Ok(response),
                Ok(Ok(response)) if (400..500).contains(&response.status) => {
                    return Err(FetchError::client_error(
                        response.status,
                        format!("{target} returned client error {}", response.status),
                    ));
                }
                Ok(Ok(response)) if response.status >= 500 => FetchError::server_error(
                    response.status,
                    format!("{target} returned server error {}", response.status),
                ),
                Ok(Ok(response)) => FetchError::unknown(format!(
                    "{target} returned unexpected status {}",
                    response.status
                )),
            };

            debug!(
                target_url = %target,
                attempt,
                max_attempts,
                code = error.code(),
                "attempt failed"
            );

            if attempt < max_attempts {
                tokio::time::sleep(self.backoff.delay(attempt)).await;
            }
            last_error = error;
        }

        Err(last_error)
    }

    /// Runs [`request`](Self::request) under a provider policy and decodes the JSON body.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        request: HttpRequest,
        policy: &ProviderPolicy,
    ) -> Result<T, FetchError> {
        let target = redact(&request.url).to_owned();
        let response = self
            .request(request.accept_json(), policy.max_attempts, policy.timeout)
            .await?;

        serde_json::from_str(&response.body).map_err(|error| {
            FetchError::unknown(format!("invalid payload from {target}: {error}"))
        })
    }
}

/// Strips the query string so API keys never reach the logs.
fn redact(url: &str) -> &str {
    url.split_once('?').map_or(url, |(path, _)| path)
}
