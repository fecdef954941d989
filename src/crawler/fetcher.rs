//! HTTP fetcher helpers
//!
//! This module handles the HTTP plumbing shared by every backend:
//! - Building the HTTP client from configuration
//! - Classifying HTTP statuses and transport errors into `FetchError`
//! - Retry policy with exponential backoff

use super::FetchError;
use crate::config::HttpConfig;
use reqwest::{Client, RequestBuilder, StatusCode};
use std::future::Future;
use std::time::Duration;

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use scrape_bench::config::HttpConfig;
/// use scrape_bench::crawler::build_http_client;
///
/// let client = build_http_client(&HttpConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Maps a non-success HTTP status to a failure kind
///
/// Returns `None` for 2xx statuses.
///
/// | Status | Kind |
/// |--------|------|
/// | 401, 403, 429, 451 | Blocked |
/// | other non-2xx | Http |
pub fn classify_status(url: &str, status: StatusCode) -> Option<FetchError> {
    if status.is_success() {
        return None;
    }

    let code = status.as_u16();
    let error = match code {
        401 | 403 | 429 | 451 => FetchError::Blocked {
            url: url.to_string(),
            status: code,
        },
        _ => FetchError::Http {
            url: url.to_string(),
            status: code,
        },
    };
    Some(error)
}

/// Maps a transport error to a failure kind
pub fn classify_request_error(url: &str, error: &reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if let Some(status) = error.status() {
        classify_status(url, status).unwrap_or_else(|| FetchError::InvalidResponse {
            url: url.to_string(),
            message: error.to_string(),
        })
    } else if error.is_connect() || error.is_request() {
        FetchError::Connection {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else {
        FetchError::InvalidResponse {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

/// Sends a request and returns the body of a 2xx response
pub(crate) async fn send_for_text(
    url: &str,
    request: RequestBuilder,
) -> Result<String, FetchError> {
    let response = request
        .send()
        .await
        .map_err(|e| classify_request_error(url, &e))?;

    if let Some(error) = classify_status(url, response.status()) {
        return Err(error);
    }

    response
        .text()
        .await
        .map_err(|e| classify_request_error(url, &e))
}

/// Retry policy for page fetches
///
/// Retryable failures (HTTP 403, 429, 503) wait `base_backoff * 2^attempt`
/// before the next attempt. Other failures end the loop immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first one
    pub max_attempts: u32,
    pub base_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff: Duration::from_secs(1),
        }
    }

    pub fn with_base_backoff(mut self, base_backoff: Duration) -> Self {
        self.base_backoff = base_backoff;
        self
    }

    /// Backoff before retrying after the given zero-based attempt
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_backoff * 2u32.saturating_pow(attempt)
    }

    /// Runs `op` until it succeeds, fails permanently, or attempts run out
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt + 1 < self.max_attempts => {
                    let wait = self.backoff(attempt);
                    tracing::debug!("{} (attempt {}), retrying in {:?}", e, attempt + 1, wait);
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl From<&HttpConfig> for RetryPolicy {
    fn from(config: &HttpConfig) -> Self {
        Self::new(config.max_retries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_build_client() {
        assert!(build_http_client(&HttpConfig::default()).is_ok());
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status("u", StatusCode::OK), None);
        assert!(matches!(
            classify_status("u", StatusCode::TOO_MANY_REQUESTS),
            Some(FetchError::Blocked { status: 429, .. })
        ));
        assert!(matches!(
            classify_status("u", StatusCode::FORBIDDEN),
            Some(FetchError::Blocked { status: 403, .. })
        ));
        assert!(matches!(
            classify_status("u", StatusCode::NOT_FOUND),
            Some(FetchError::Http { status: 404, .. })
        ));
    }

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(3);
        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
    }

    #[test]
    fn test_zero_attempts_clamped() {
        assert_eq!(RetryPolicy::new(0).max_attempts, 1);
    }

    #[tokio::test]
    async fn test_retry_recovers_from_rate_limit() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3).with_base_backoff(Duration::from_millis(1));

        let result = policy
            .run(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(FetchError::Blocked {
                            url: "u".into(),
                            status: 429,
                        })
                    } else {
                        Ok("body")
                    }
                }
            })
            .await;

        assert_eq!(result, Ok("body"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3).with_base_backoff(Duration::from_millis(1));

        let result: Result<(), _> = policy
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(FetchError::Http {
                        url: "u".into(),
                        status: 503,
                    })
                }
            })
            .await;

        assert!(matches!(result, Err(FetchError::Http { status: 503, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_not_retried() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::new(3).with_base_backoff(Duration::from_millis(1));

        let result: Result<(), _> = policy
            .run(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(FetchError::Http {
                        url: "u".into(),
                        status: 404,
                    })
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_send_for_text_classifies_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200).set_body_string("hello"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/limited"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = build_http_client(&HttpConfig::default()).unwrap();

        let ok_url = format!("{}/ok", server.uri());
        let body = send_for_text(&ok_url, client.get(&ok_url)).await.unwrap();
        assert_eq!(body, "hello");

        let limited_url = format!("{}/limited", server.uri());
        let err = send_for_text(&limited_url, client.get(&limited_url))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Blocked { status: 429, .. }));
    }

    #[tokio::test]
    async fn test_connection_refused_is_connection_error() {
        let client = build_http_client(&HttpConfig::default()).unwrap();
        // Port 9 (discard) is essentially never listening locally
        let url = "http://127.0.0.1:9/";
        let err = send_for_text(url, client.get(url)).await.unwrap_err();
        assert!(matches!(err, FetchError::Connection { .. }), "got {err:?}");
    }
}
