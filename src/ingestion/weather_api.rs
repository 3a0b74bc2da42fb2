//! WeatherAPI history client with bounded retry.
//!
//! Each attempt is classified into an [`AttemptOutcome`]:
//!
//! - `Success`: HTTP 200 with a JSON body.
//! - `Transient`: HTTP 429, any 5xx, a transport failure, or a 200 whose
//!   body is not JSON. The client sleeps `base_delay * 2^(attempt-1)` and
//!   tries again while attempts remain.
//! - `Permanent`: any other status. Returned immediately, no sleep.
//!
//! Transport and sleep are injected so the sequencing can be exercised
//! without a network or a real clock.

use crate::error::{ProcessingError, Result};
use crate::models::Coordinates;
use crate::utils::constants::{
    DEFAULT_API_BASE_URL, DEFAULT_BASE_DELAY_SECS, DEFAULT_MAX_ATTEMPTS, DEFAULT_TIMEOUT_SECS,
    HISTORY_ENDPOINT,
};
use crate::utils::PartitionDate;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use validator::Validate;

const BODY_PREVIEW_LEN: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Blocking HTTP GET capability
pub trait HttpTransport: Send + Sync {
    fn get(
        &self,
        url: &str,
        query: &[(&str, String)],
        timeout: Duration,
    ) -> std::result::Result<HttpResponse, TransportError>;
}

pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// `reqwest` blocking transport
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::blocking::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProcessingError::Config(format!("unable to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    fn get(
        &self,
        url: &str,
        query: &[(&str, String)],
        timeout: Duration,
    ) -> std::result::Result<HttpResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .timeout(timeout)
            .send()
            .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response.text().map_err(|e| TransportError(e.to_string()))?;
        Ok(HttpResponse { status, body })
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(default)]
pub struct ProviderSettings {
    #[validate(url)]
    pub base_url: String,
    pub api_key: Option<String>,
    #[validate(range(min = 1))]
    pub timeout_secs: u64,
    #[validate(range(min = 1, max = 20))]
    pub max_attempts: u32,
    pub base_delay_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE_URL.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay_secs: DEFAULT_BASE_DELAY_SECS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Sleep after failed attempt `attempt` (1-based): `base * 2^(attempt-1)`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_ATTEMPTS,
            Duration::from_secs(DEFAULT_BASE_DELAY_SECS),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Success(Value),
    Transient(String),
    Permanent(String),
}

impl AttemptOutcome {
    pub fn classify(result: std::result::Result<HttpResponse, TransportError>) -> Self {
        match result {
            Err(e) => Self::Transient(format!("transport error: {}", e)),
            Ok(response) if response.status == 200 => {
                match serde_json::from_str::<Value>(&response.body) {
                    Ok(value) => Self::Success(value),
                    Err(e) => Self::Transient(format!("invalid JSON body: {}", e)),
                }
            }
            Ok(response) if response.status == 429 || (500..600).contains(&response.status) => {
                Self::Transient(format!("HTTP {}", response.status))
            }
            Ok(response) => Self::Permanent(format!(
                "WeatherAPI error {}: {}",
                response.status,
                preview(&response.body)
            )),
        }
    }
}

pub struct WeatherApiClient {
    transport: Arc<dyn HttpTransport>,
    sleeper: Arc<dyn Sleeper>,
    base_url: String,
    api_key: String,
    timeout: Duration,
    policy: RetryPolicy,
}

impl WeatherApiClient {
    pub fn new(settings: &ProviderSettings, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProcessingError::Config("WeatherAPI key is not set".to_string()))?;

        Ok(Self {
            transport,
            sleeper: Arc::new(ThreadSleeper),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key,
            timeout: Duration::from_secs(settings.timeout_secs),
            policy: RetryPolicy::new(
                settings.max_attempts,
                Duration::from_secs(settings.base_delay_secs),
            ),
        })
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn history_url(&self) -> String {
        format!("{}/{}", self.base_url, HISTORY_ENDPOINT)
    }

    fn query(&self, coordinates: Coordinates, date: &PartitionDate) -> Vec<(&'static str, String)> {
        vec![
            ("key", self.api_key.clone()),
            ("q", coordinates.query()),
            ("dt", date.to_string()),
            ("aqi", "no".to_string()),
            ("alerts", "no".to_string()),
        ]
    }

    /// Fetch one location-day of history as raw JSON
    pub fn fetch(&self, coordinates: Coordinates, date: &PartitionDate) -> Result<Value> {
        let url = self.history_url();
        let query = self.query(coordinates, date);
        let mut last_error = String::from("no attempt made");

        for attempt in 1..=self.policy.max_attempts {
            let result = self.transport.get(&url, &query, self.timeout);

            match AttemptOutcome::classify(result) {
                AttemptOutcome::Success(value) => {
                    tracing::debug!(message = "history fetched", q = %coordinates.query(), dt = %date, attempt);
                    return Ok(value);
                }
                AttemptOutcome::Permanent(message) => {
                    return Err(ProcessingError::Provider {
                        attempts: attempt,
                        message,
                    });
                }
                AttemptOutcome::Transient(message) => {
                    last_error = message;
                    if attempt < self.policy.max_attempts {
                        let delay = self.policy.backoff(attempt);
                        tracing::warn!(
                            message = "transient provider failure, retrying",
                            error = %last_error,
                            attempt,
                            max_attempts = self.policy.max_attempts,
                            delay_secs = delay.as_secs_f64()
                        );
                        self.sleeper.sleep(delay);
                    }
                }
            }
        }

        Err(ProcessingError::Provider {
            attempts: self.policy.max_attempts,
            message: format!("failed after retries. Last error: {}", last_error),
        })
    }
}

fn preview(body: &str) -> String {
    body.chars().take(BODY_PREVIEW_LEN).collect()
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed sequence of responses and records every request
    #[derive(Default)]
    pub struct ScriptedTransport {
        responses: Mutex<VecDeque<std::result::Result<HttpResponse, TransportError>>>,
        pub requests: Mutex<Vec<(String, Vec<(String, String)>)>>,
    }

    impl ScriptedTransport {
        pub fn new(responses: Vec<std::result::Result<HttpResponse, TransportError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn statuses(statuses: &[u16], body: &str) -> Self {
            Self::new(
                statuses
                    .iter()
                    .map(|&status| {
                        Ok(HttpResponse {
                            status,
                            body: body.to_string(),
                        })
                    })
                    .collect(),
            )
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    impl HttpTransport for ScriptedTransport {
        fn get(
            &self,
            url: &str,
            query: &[(&str, String)],
            _timeout: Duration,
        ) -> std::result::Result<HttpResponse, TransportError> {
            self.requests.lock().unwrap().push((
                url.to_string(),
                query.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
            ));
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError("script exhausted".to_string())))
        }
    }

    #[derive(Default)]
    pub struct RecordingSleeper {
        pub sleeps: Mutex<Vec<Duration>>,
    }

    impl RecordingSleeper {
        pub fn total(&self) -> Duration {
            self.sleeps.lock().unwrap().iter().sum()
        }
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{RecordingSleeper, ScriptedTransport};
    use super::*;

    fn settings() -> ProviderSettings {
        ProviderSettings {
            base_url: "https://api.example.test/v1/".to_string(),
            api_key: Some("secret".to_string()),
            ..ProviderSettings::default()
        }
    }

    fn client(transport: Arc<ScriptedTransport>, sleeper: Arc<RecordingSleeper>) -> WeatherApiClient {
        WeatherApiClient::new(&settings(), transport)
            .unwrap()
            .with_sleeper(sleeper)
    }

    fn london() -> Coordinates {
        Coordinates {
            lat: 51.5,
            lon: -0.12,
        }
    }

    fn dt() -> PartitionDate {
        PartitionDate::parse("2025-01-01").unwrap()
    }

    #[test]
    fn test_retries_transient_statuses_then_succeeds() {
        let transport = Arc::new(ScriptedTransport::statuses(&[500, 429, 200], r#"{"ok": true}"#));
        let sleeper = Arc::new(RecordingSleeper::default());

        let value = client(transport.clone(), sleeper.clone()).fetch(london(), &dt()).unwrap();

        assert_eq!(value["ok"], true);
        assert_eq!(transport.request_count(), 3);
        assert_eq!(
            *sleeper.sleeps.lock().unwrap(),
            vec![Duration::from_secs(2), Duration::from_secs(4)]
        );
        assert_eq!(sleeper.total(), Duration::from_secs(6));
    }

    #[test]
    fn test_client_error_fails_without_sleep() {
        let transport = Arc::new(ScriptedTransport::statuses(&[404, 200], "not found"));
        let sleeper = Arc::new(RecordingSleeper::default());

        let err = client(transport.clone(), sleeper.clone())
            .fetch(london(), &dt())
            .unwrap_err();

        match err {
            ProcessingError::Provider { attempts, message } => {
                assert_eq!(attempts, 1);
                assert!(message.contains("404"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(transport.request_count(), 1);
        assert!(sleeper.sleeps.lock().unwrap().is_empty());
    }

    #[test]
    fn test_exhaustion_reports_last_error() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Err(TransportError("connection reset".to_string())),
            Ok(HttpResponse { status: 502, body: String::new() }),
            Ok(HttpResponse { status: 200, body: "{truncated".to_string() }),
            Ok(HttpResponse { status: 503, body: String::new() }),
            Ok(HttpResponse { status: 429, body: String::new() }),
        ]));
        let sleeper = Arc::new(RecordingSleeper::default());

        let err = client(transport.clone(), sleeper.clone())
            .fetch(london(), &dt())
            .unwrap_err();

        match err {
            ProcessingError::Provider { attempts, message } => {
                assert_eq!(attempts, 5);
                assert!(message.contains("HTTP 429"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(transport.request_count(), 5);
        assert_eq!(
            *sleeper.sleeps.lock().unwrap(),
            vec![2, 4, 8, 16]
                .into_iter()
                .map(Duration::from_secs)
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_request_shape() {
        let transport = Arc::new(ScriptedTransport::statuses(&[200], "{}"));
        let sleeper = Arc::new(RecordingSleeper::default());

        client(transport.clone(), sleeper).fetch(london(), &dt()).unwrap();

        let requests = transport.requests.lock().unwrap();
        let (url, query) = &requests[0];
        assert_eq!(url, "https://api.example.test/v1/history.json");
        let expected: Vec<(String, String)> = [
            ("key", "secret"),
            ("q", "51.5,-0.12"),
            ("dt", "2025-01-01"),
            ("aqi", "no"),
            ("alerts", "no"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        assert_eq!(query, &expected);
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let transport = Arc::new(ScriptedTransport::default());
        let result = WeatherApiClient::new(&ProviderSettings::default(), transport);
        assert!(matches!(result, Err(ProcessingError::Config(_))));
    }

    #[test]
    fn test_backoff_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(3), Duration::from_secs(8));
        assert_eq!(policy.backoff(5), Duration::from_secs(32));
    }
}
