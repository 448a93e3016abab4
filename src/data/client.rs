//! Content API client
//!
//! This module fetches the day summary, the daily reading record and the list
//! of published dates from the content functions endpoint. Every request is
//! authenticated with the project API key, bounded by a per-attempt timeout and
//! retried with exponential backoff.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::clock::{Sleeper, TokioSleeper};

/// Default number of attempts per request
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Default bound on a single attempt
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default first backoff delay; doubles after every failed attempt
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// Why a single attempt failed
#[derive(Debug, Error)]
pub enum AttemptError {
    /// The attempt did not complete within the timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// The server answered with a non-2xx status
    #[error("HTTP {0}")]
    HttpStatus(StatusCode),

    /// The request could not be sent or the body could not be read
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The body was not valid JSON
    #[error("Failed to parse JSON response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Errors returned to callers of the client
#[derive(Debug, Error)]
pub enum ClientError {
    /// Every attempt failed; carries the last cause
    #[error("Network error after {attempts} attempt(s): {source}")]
    Network {
        attempts: u32,
        #[source]
        source: AttemptError,
    },
}

impl ClientError {
    /// The failure of the final attempt
    pub fn last_cause(&self) -> &AttemptError {
        match self {
            ClientError::Network { source, .. } => source,
        }
    }

    /// Number of attempts made before giving up
    pub fn attempts(&self) -> u32 {
        match self {
            ClientError::Network { attempts, .. } => *attempts,
        }
    }
}

/// Retry and timeout settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts; values below 1 are treated as 1
    pub max_retries: u32,
    /// Bound on each attempt, including reading the body
    pub timeout: Duration,
    /// Delay after the first failure; attempt `n` (0-based) waits `base_delay * 2^n`
    pub base_delay: Duration,
    /// Retry every 4xx response; when off, only 408 and 429 are retried
    pub retry_client_errors: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            timeout: DEFAULT_TIMEOUT,
            base_delay: DEFAULT_BASE_DELAY,
            retry_client_errors: true,
        }
    }
}

impl RetryPolicy {
    /// Default policy that gives up on the first 4xx other than 408 and 429
    pub fn fail_fast_on_client_errors() -> Self {
        Self {
            retry_client_errors: false,
            ..Self::default()
        }
    }

    /// Delay to wait after the failed attempt with 0-based index `attempt`
    pub fn backoff(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .unwrap_or(Duration::MAX)
    }

    /// Whether another attempt may follow this failure
    pub fn is_retryable(&self, error: &AttemptError) -> bool {
        match error {
            AttemptError::HttpStatus(status) if status.is_client_error() => {
                self.retry_client_errors
                    || *status == StatusCode::REQUEST_TIMEOUT
                    || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => true,
        }
    }
}

/// Client for the read-only content endpoints
#[derive(Clone)]
pub struct ContentClient {
    http_client: Client,
    base_url: String,
    api_key: String,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl std::fmt::Debug for ContentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentClient")
            .field("base_url", &self.base_url)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl ContentClient {
    /// Creates a client for the project at `base_url` with the default retry policy
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            policy: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replaces the retry policy
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces how backoff delays are waited out
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Replaces the underlying HTTP client
    pub fn with_client(mut self, client: Client) -> Self {
        self.http_client = client;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// URL of the day summary for `date`
    pub fn home_info_url(&self, date: NaiveDate) -> String {
        format!(
            "{}/functions/v1/gospel-info?date={}",
            self.base_url,
            date.format("%Y-%m-%d")
        )
    }

    /// URL of the full daily reading record for `date`
    pub fn gospel_way_url(&self, date: NaiveDate) -> String {
        format!(
            "{}/functions/v1/gospel-daily?date={}&version=2",
            self.base_url,
            date.format("%Y-%m-%d")
        )
    }

    /// URL of the published dates list
    pub fn allowed_dates_url(&self) -> String {
        format!("{}/functions/v1/gospel-dates", self.base_url)
    }

    /// Fetches the day summary (saints, season) for `date`
    pub async fn fetch_home_info(&self, date: NaiveDate) -> Result<Value, ClientError> {
        self.fetch_with_retry(&self.home_info_url(date)).await
    }

    /// Fetches the full daily reading record for `date`
    pub async fn fetch_gospel_way(&self, date: NaiveDate) -> Result<Value, ClientError> {
        self.fetch_with_retry(&self.gospel_way_url(date)).await
    }

    /// Fetches the dates for which a daily record exists
    pub async fn fetch_allowed_dates(&self) -> Result<Value, ClientError> {
        self.fetch_with_retry(&self.allowed_dates_url()).await
    }

    /// GETs `url` and parses the body as JSON, retrying per the client's policy
    pub async fn fetch_with_retry(&self, url: &str) -> Result<Value, ClientError> {
        self.fetch_with_retries(url, self.policy.max_retries).await
    }

    /// GETs `url` with at most `max_retries` attempts
    ///
    /// # Returns
    /// * `Ok(Value)` - Parsed body of the first 2xx response
    /// * `Err(ClientError::Network)` - All attempts failed, or a failure was not retryable
    pub async fn fetch_with_retries(&self, url: &str, max_retries: u32) -> Result<Value, ClientError> {
        let max_retries = max_retries.max(1);
        let mut attempt = 0;

        loop {
            let error = match tokio::time::timeout(self.policy.timeout, self.attempt(url)).await {
                Ok(Ok(body)) => {
                    debug!(url, attempt, "request succeeded");
                    return Ok(body);
                }
                Ok(Err(e)) => e,
                Err(_) => AttemptError::Timeout(self.policy.timeout),
            };

            let is_last = attempt + 1 >= max_retries;
            if is_last || !self.policy.is_retryable(&error) {
                warn!(url, attempts = attempt + 1, error = %error, "giving up on request");
                return Err(ClientError::Network {
                    attempts: attempt + 1,
                    source: error,
                });
            }

            let delay = self.policy.backoff(attempt);
            warn!(url, attempt, error = %error, ?delay, "request failed, retrying");
            self.sleeper.sleep(delay).await;
            attempt += 1;
        }
    }

    /// Single authenticated GET
    async fn attempt(&self, url: &str) -> Result<Value, AttemptError> {
        let response = self
            .http_client
            .get(url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::HttpStatus(status));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::RecordingSleeper;
    use mockito::{Matcher, Server};
    use serde_json::json;

    const API_KEY: &str = "anon-test-key";

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn test_client(base_url: &str) -> (ContentClient, RecordingSleeper) {
        let sleeper = RecordingSleeper::new();
        let client = ContentClient::new(base_url, API_KEY).with_sleeper(Arc::new(sleeper.clone()));
        (client, sleeper)
    }

    #[test]
    fn test_backoff_doubles_from_one_second() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
    }

    #[test]
    fn test_backoff_saturates() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(64), Duration::MAX);
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.timeout, Duration::from_secs(10));
        assert!(policy.retry_client_errors);
    }

    #[test]
    fn test_retryable_classification() {
        let policy = RetryPolicy::default();
        assert!(policy.is_retryable(&AttemptError::Timeout(Duration::from_secs(10))));
        assert!(policy.is_retryable(&AttemptError::HttpStatus(StatusCode::BAD_GATEWAY)));
        assert!(policy.is_retryable(&AttemptError::HttpStatus(StatusCode::NOT_FOUND)));

        let strict = RetryPolicy::fail_fast_on_client_errors();
        assert_eq!(strict.max_retries, 3);
        assert!(strict.is_retryable(&AttemptError::HttpStatus(StatusCode::BAD_GATEWAY)));
        assert!(strict.is_retryable(&AttemptError::HttpStatus(StatusCode::TOO_MANY_REQUESTS)));
        assert!(strict.is_retryable(&AttemptError::HttpStatus(StatusCode::REQUEST_TIMEOUT)));
        assert!(!strict.is_retryable(&AttemptError::HttpStatus(StatusCode::NOT_FOUND)));
    }

    #[test]
    fn test_endpoint_urls() {
        let client = ContentClient::new("https://project.example.co/", API_KEY);
        let day = date(2026, 10, 19);

        assert_eq!(
            client.home_info_url(day),
            "https://project.example.co/functions/v1/gospel-info?date=2026-10-19"
        );
        assert_eq!(
            client.gospel_way_url(day),
            "https://project.example.co/functions/v1/gospel-daily?date=2026-10-19&version=2"
        );
        assert_eq!(
            client.allowed_dates_url(),
            "https://project.example.co/functions/v1/gospel-dates"
        );
    }

    #[tokio::test]
    async fn test_success_sends_credentials_and_parses_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/functions/v1/gospel-info")
            .match_query(Matcher::UrlEncoded("date".into(), "2026-10-19".into()))
            .match_header("apikey", API_KEY)
            .match_header("authorization", format!("Bearer {}", API_KEY).as_str())
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"saints":"San Paolo della Croce","season":"Tempo Ordinario"}"#)
            .expect(1)
            .create_async()
            .await;
        let (client, sleeper) = test_client(&server.url());

        let body = client.fetch_home_info(date(2026, 10, 19)).await.expect("Fetch should succeed");

        assert_eq!(body["saints"], json!("San Paolo della Croce"));
        assert!(sleeper.delays().is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_gospel_way_requests_version_two() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/functions/v1/gospel-daily")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("date".into(), "2026-10-19".into()),
                Matcher::UrlEncoded("version".into(), "2".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"gospel":{"evangelist":"Luca"}}"#)
            .create_async()
            .await;
        let (client, _sleeper) = test_client(&server.url());

        let body = client.fetch_gospel_way(date(2026, 10, 19)).await.unwrap();

        assert_eq!(body["gospel"]["evangelist"], json!("Luca"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fails_twice_then_succeeds_with_backoff() {
        let mut server = Server::new_async().await;
        let failing = server
            .mock("GET", "/functions/v1/gospel-dates")
            .with_status(503)
            .expect(2)
            .create_async()
            .await;
        let succeeding = server
            .mock("GET", "/functions/v1/gospel-dates")
            .with_status(200)
            .with_body(r#"["2026-10-19"]"#)
            .expect(1)
            .create_async()
            .await;
        let (client, sleeper) = test_client(&server.url());

        let body = client.fetch_allowed_dates().await.expect("Third attempt should succeed");

        assert_eq!(body, json!(["2026-10-19"]));
        assert_eq!(
            sleeper.delays(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
        failing.assert_async().await;
        succeeding.assert_async().await;
    }

    #[tokio::test]
    async fn test_exhausted_retries_raise_network_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/functions/v1/gospel-dates")
            .with_status(500)
            .expect(3)
            .create_async()
            .await;
        let (client, sleeper) = test_client(&server.url());

        let err = client.fetch_allowed_dates().await.expect_err("All attempts should fail");

        assert_eq!(err.attempts(), 3);
        assert!(matches!(
            err.last_cause(),
            AttemptError::HttpStatus(StatusCode::INTERNAL_SERVER_ERROR)
        ));
        assert_eq!(
            sleeper.delays(),
            vec![Duration::from_secs(1), Duration::from_secs(2)],
            "No sleep after the final attempt"
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_not_found_is_retried_by_default() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/functions/v1/gospel-dates")
            .with_status(404)
            .expect(3)
            .create_async()
            .await;
        let (client, sleeper) = test_client(&server.url());

        let err = client.fetch_allowed_dates().await.unwrap_err();

        assert_eq!(err.attempts(), 3);
        assert!(matches!(
            err.last_cause(),
            AttemptError::HttpStatus(StatusCode::NOT_FOUND)
        ));
        assert_eq!(
            sleeper.delays(),
            vec![Duration::from_secs(1), Duration::from_secs(2)]
        );
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_not_found_fails_fast_when_opted_in() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/functions/v1/gospel-dates")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;
        let (client, sleeper) = test_client(&server.url());
        let client = client.with_policy(RetryPolicy::fail_fast_on_client_errors());

        let err = client.fetch_allowed_dates().await.unwrap_err();

        assert_eq!(err.attempts(), 1);
        assert!(sleeper.delays().is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_custom_retry_ceiling() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/functions/v1/gospel-dates")
            .with_status(502)
            .expect(5)
            .create_async()
            .await;
        let (client, sleeper) = test_client(&server.url());

        let err = client
            .fetch_with_retries(&client.allowed_dates_url(), 5)
            .await
            .unwrap_err();

        assert_eq!(err.attempts(), 5);
        assert_eq!(sleeper.delays().last(), Some(&Duration::from_secs(8)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_failed_attempt() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/functions/v1/gospel-dates")
            .with_status(200)
            .with_body("<html>maintenance</html>")
            .expect(3)
            .create_async()
            .await;
        let (client, _sleeper) = test_client(&server.url());

        let err = client.fetch_allowed_dates().await.unwrap_err();

        assert!(matches!(err.last_cause(), AttemptError::Decode(_)));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_unresponsive_server_times_out() {
        // Accept connections but never answer
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        let (client, sleeper) = test_client(&format!("http://{}", addr));
        let client = client.with_policy(RetryPolicy {
            max_retries: 2,
            timeout: Duration::from_millis(100),
            ..Default::default()
        });

        let err = client.fetch_allowed_dates().await.unwrap_err();

        assert_eq!(err.attempts(), 2);
        assert!(matches!(err.last_cause(), AttemptError::Timeout(_)));
        assert_eq!(sleeper.delays(), vec![Duration::from_secs(1)]);
    }
}
