use crate::app::ports::{HttpClientPort, HttpGetResult};
use crate::config::FetchConfig;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// What to do with a decoded JSON body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    /// Transient (throttled, empty); wait and try again.
    Retry,
    /// Definitive "no data"; stop without retrying.
    GiveUp,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl From<&FetchConfig> for RetryPolicy {
    fn from(config: &FetchConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            retry_delay: config.retry_delay(),
        }
    }
}

/// Retrying GET wrapper shared by every provider adapter.
///
/// Never returns an error: callers get usable data or `None` once the
/// attempt budget is spent or the provider says the resource does not exist.
#[derive(Clone)]
pub struct FetchClient {
    http: Arc<dyn HttpClientPort>,
    policy: RetryPolicy,
}

enum Outcome<T> {
    Done(T),
    Retry,
    GiveUp,
}

impl FetchClient {
    pub fn new(http: Arc<dyn HttpClientPort>, policy: RetryPolicy) -> Self {
        Self { http, policy }
    }

    /// GET a JSON document, retrying empty bodies.
    pub async fn get_json(&self, url: &str, query: &[(String, String)]) -> Option<Value> {
        self.get_json_checked(url, |_| query.to_vec(), non_empty).await
    }

    /// GET a JSON document, letting `check` classify provider-specific bodies.
    ///
    /// `query_for_attempt` receives the zero-based attempt number so callers can
    /// vary parameters between retries.
    pub async fn get_json_checked<Q, C>(
        &self,
        url: &str,
        query_for_attempt: Q,
        check: C,
    ) -> Option<Value>
    where
        Q: Fn(u32) -> Vec<(String, String)>,
        C: Fn(&Value) -> Verdict,
    {
        self.with_retries(url, query_for_attempt, |resp| {
            if resp.body.trim().is_empty() {
                return Outcome::Retry;
            }
            match serde_json::from_str::<Value>(&resp.body) {
                Ok(value) => match check(&value) {
                    Verdict::Accept => Outcome::Done(value),
                    Verdict::Retry => {
                        debug!("Retryable body from {}: {}", url, truncate(&resp.body));
                        Outcome::Retry
                    }
                    Verdict::GiveUp => Outcome::GiveUp,
                },
                Err(e) => {
                    warn!("Malformed JSON from {}: {}", url, e);
                    Outcome::Retry
                }
            }
        })
        .await
    }

    /// GET a page as raw text.
    pub async fn get_text(&self, url: &str, query: &[(String, String)]) -> Option<String> {
        self.with_retries(
            url,
            |_| query.to_vec(),
            |resp| {
                if resp.body.trim().is_empty() {
                    Outcome::Retry
                } else {
                    Outcome::Done(resp.body.clone())
                }
            },
        )
        .await
    }

    async fn with_retries<T, Q, F>(&self, url: &str, query_for_attempt: Q, decode: F) -> Option<T>
    where
        Q: Fn(u32) -> Vec<(String, String)>,
        F: Fn(&HttpGetResult) -> Outcome<T>,
    {
        for attempt in 0..self.policy.max_attempts {
            if attempt > 0 {
                tokio::time::sleep(self.policy.retry_delay).await;
            }
            let query = query_for_attempt(attempt);
            let resp = match self.http.get(url, &query).await {
                Ok(resp) => resp,
                Err(e) => {
                    warn!("Fetch error for {} (attempt {}): {}", url, attempt + 1, e);
                    continue;
                }
            };

            match resp.status {
                429 => {
                    warn!("Throttled by {} (attempt {})", url, attempt + 1);
                    continue;
                }
                404 => {
                    debug!("Not found: {}", url);
                    return None;
                }
                500..=599 => {
                    warn!("Server error {} from {} (attempt {})", resp.status, url, attempt + 1);
                    continue;
                }
                _ if !resp.is_success() && !resp.content_type.contains("json") => {
                    warn!("Unexpected status {} from {}", resp.status, url);
                    return None;
                }
                _ => {}
            }

            match decode(&resp) {
                Outcome::Done(value) => return Some(value),
                Outcome::Retry => {
                    debug!("Empty or retryable response from {} (attempt {})", url, attempt + 1);
                }
                Outcome::GiveUp => return None,
            }
        }

        warn!(
            "Giving up on {} after {} attempts",
            url, self.policy.max_attempts
        );
        None
    }
}

/// Default check: anything but `null` or an empty object is usable.
pub fn non_empty(value: &Value) -> Verdict {
    match value {
        Value::Null => Verdict::Retry,
        Value::Object(map) if map.is_empty() => Verdict::Retry,
        _ => Verdict::Accept,
    }
}

fn truncate(body: &str) -> &str {
    let end = body
        .char_indices()
        .nth(200)
        .map(|(i, _)| i)
        .unwrap_or(body.len());
    &body[..end]
}
