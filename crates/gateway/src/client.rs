//! Shared HTTP client: retry, backoff, error classification, circuit breaker.
//!
//! Adapters own their base URL and auth. They pass a request-building
//! closure to [`ApiClient::request_with_retry`], which is called once per
//! attempt:
//!
//! - 401 / 403 → [`GatewayError::Auth`], immediately
//! - other 4xx (not 429) → [`GatewayError::Rejected`], immediately
//! - 429 / 5xx / transport errors → retried with exponential backoff
//!   (429 honours `Retry-After`), then [`GatewayError::Upstream`] or
//!   [`GatewayError::Network`]
//!
//! Every exhausted call counts as one failure for the breaker; any answer
//! from the server (even a 4xx) counts as a success.

use std::thread;
use std::time::Duration;

use crate::breaker::CircuitBreaker;
use crate::error::GatewayError;

pub const USER_AGENT: &str = concat!("nasiya/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn with_retries(max_retries: u32) -> Self {
        Self { max_retries, ..Self::default() }
    }

    /// No sleeping between attempts.
    pub fn immediate(max_retries: u32) -> Self {
        Self { max_retries, base_backoff: Duration::ZERO, max_backoff: Duration::ZERO }
    }
}

pub struct ApiClient {
    http: reqwest::blocking::Client,
    service: &'static str,
    policy: RetryPolicy,
    breaker: CircuitBreaker,
    error_extractor: fn(&serde_json::Value, u16) -> String,
}

impl ApiClient {
    pub fn new(
        service: &'static str,
        timeout: Duration,
        policy: RetryPolicy,
        error_extractor: fn(&serde_json::Value, u16) -> String,
    ) -> Result<Self, GatewayError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| GatewayError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, service, policy, breaker: CircuitBreaker::default(), error_extractor })
    }

    pub fn with_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.breaker = breaker;
        self
    }

    /// Send with retry and parse the body as JSON.
    pub fn request_with_retry(
        &self,
        build_request: impl Fn(&reqwest::blocking::Client) -> reqwest::blocking::RequestBuilder,
    ) -> Result<serde_json::Value, GatewayError> {
        if let Err(remaining) = self.breaker.check() {
            log::debug!("{} circuit open for another {:?}", self.service, remaining);
            return Err(GatewayError::CircuitOpen(self.service));
        }

        let result = self.attempt_all(build_request);
        match &result {
            Ok(_) | Err(GatewayError::Auth(..)) | Err(GatewayError::Rejected(..)) => {
                self.breaker.record_success()
            }
            Err(GatewayError::Network(_)) | Err(GatewayError::Upstream(..)) => {
                if self.breaker.record_failure() {
                    log::warn!("{} circuit opened after repeated failures", self.service);
                }
            }
            Err(_) => {}
        }
        result
    }

    fn attempt_all(
        &self,
        build_request: impl Fn(&reqwest::blocking::Client) -> reqwest::blocking::RequestBuilder,
    ) -> Result<serde_json::Value, GatewayError> {
        let max = self.policy.max_retries;
        let mut backoff = self.policy.base_backoff;
        let mut attempt = 0;

        loop {
            let wait = match build_request(&self.http).send() {
                Ok(resp) => {
                    let status = resp.status().as_u16();

                    if status == 401 || status == 403 {
                        let body: serde_json::Value = resp.json().unwrap_or(serde_json::Value::Null);
                        return Err(GatewayError::Auth(status, (self.error_extractor)(&body, status)));
                    }

                    if (400..500).contains(&status) && status != 429 {
                        let body: serde_json::Value = resp.json().unwrap_or(serde_json::Value::Null);
                        return Err(GatewayError::Rejected(
                            status,
                            (self.error_extractor)(&body, status),
                        ));
                    }

                    if status == 429 || status >= 500 {
                        if attempt == max {
                            let body: serde_json::Value =
                                resp.json().unwrap_or(serde_json::Value::Null);
                            return Err(GatewayError::Upstream(
                                status,
                                format!(
                                    "{} after {} attempts: {}",
                                    self.service,
                                    max + 1,
                                    (self.error_extractor)(&body, status),
                                ),
                            ));
                        }
                        let retry_after = if status == 429 {
                            resp.headers()
                                .get("retry-after")
                                .and_then(|v| v.to_str().ok())
                                .and_then(|v| v.trim().parse::<u64>().ok())
                                .map(Duration::from_secs)
                        } else {
                            None
                        };
                        let wait = retry_after.unwrap_or(backoff).min(self.policy.max_backoff);
                        log::warn!(
                            "{} retry {}/{} in {:?} (HTTP {})",
                            self.service,
                            attempt + 1,
                            max,
                            wait,
                            status,
                        );
                        wait
                    } else {
                        let text = resp.text().map_err(|e| {
                            GatewayError::Network(format!(
                                "failed to read {} response body: {}",
                                self.service,
                                e.without_url(),
                            ))
                        })?;
                        let trimmed = text.trim_start_matches('\u{feff}');
                        if trimmed.trim().is_empty() {
                            return Ok(serde_json::Value::Null);
                        }
                        return serde_json::from_str(trimmed).map_err(|e| {
                            GatewayError::Parse(format!(
                                "{} returned invalid JSON: {} (body: {})",
                                self.service,
                                e,
                                truncate(trimmed, 200),
                            ))
                        });
                    }
                }
                Err(e) => {
                    // URLs can carry secrets (bot token), never surface them
                    let e = e.without_url();
                    if attempt == max {
                        return Err(GatewayError::Network(format!(
                            "{} unreachable after {} attempts: {}",
                            self.service,
                            max + 1,
                            e,
                        )));
                    }
                    log::warn!(
                        "{} retry {}/{} in {:?} ({})",
                        self.service,
                        attempt + 1,
                        max,
                        backoff,
                        e,
                    );
                    backoff
                }
            };

            if !wait.is_zero() {
                thread::sleep(wait);
            }
            backoff = (backoff * 2).min(self.policy.max_backoff);
            attempt += 1;
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn extract(body: &serde_json::Value, status: u16) -> String {
        body["message"].as_str().map(String::from).unwrap_or_else(|| format!("HTTP {}", status))
    }

    fn client(retries: u32) -> ApiClient {
        ApiClient::new("Test", Duration::from_secs(5), RetryPolicy::immediate(retries), extract)
            .unwrap()
    }

    #[test]
    fn test_success_parses_json() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/ok");
            then.status(200).json_body(serde_json::json!({"value": 7}));
        });
        let url = server.url("/ok");
        let body = client(0).request_with_retry(|http| http.get(&url)).unwrap();
        assert_eq!(body["value"], 7);
    }

    #[test]
    fn test_auth_failure_is_not_retried() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/secret");
            then.status(401).json_body(serde_json::json!({"message": "bad token"}));
        });
        let url = server.url("/secret");
        let err = client(3).request_with_retry(|http| http.get(&url)).unwrap_err();
        assert_eq!(err, GatewayError::Auth(401, "bad token".into()));
        mock.assert_hits(1);
    }

    #[test]
    fn test_server_errors_are_retried_then_reported() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/flaky");
            then.status(503).json_body(serde_json::json!({"message": "maintenance"}));
        });
        let url = server.url("/flaky");
        let err = client(2).request_with_retry(|http| http.get(&url)).unwrap_err();
        assert!(matches!(err, GatewayError::Upstream(503, ref m) if m.contains("after 3 attempts")));
        mock.assert_hits(3);
    }

    #[test]
    fn test_rate_limit_honours_zero_retry_after() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/busy");
            then.status(429).header("retry-after", "0");
        });
        let url = server.url("/busy");
        let err = client(1).request_with_retry(|http| http.get(&url)).unwrap_err();
        assert!(matches!(err, GatewayError::Upstream(429, _)));
        mock.assert_hits(2);
    }

    #[test]
    fn test_bad_request_is_rejected() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(PUT).path("/write");
            then.status(400).json_body(serde_json::json!({"message": "bad range"}));
        });
        let url = server.url("/write");
        let err = client(3).request_with_retry(|http| http.put(&url)).unwrap_err();
        assert_eq!(err, GatewayError::Rejected(400, "bad range".into()));
    }

    #[test]
    fn test_breaker_fails_fast_after_repeated_failures() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/down");
            then.status(500);
        });
        let url = server.url("/down");
        let api = client(0).with_breaker(CircuitBreaker::new(2, Duration::from_secs(60)));

        for _ in 0..2 {
            assert!(matches!(
                api.request_with_retry(|http| http.get(&url)),
                Err(GatewayError::Upstream(500, _))
            ));
        }
        assert_eq!(
            api.request_with_retry(|http| http.get(&url)),
            Err(GatewayError::CircuitOpen("Test"))
        );
        mock.assert_hits(2);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("Лист1", 3), "Лис");
        assert_eq!(truncate("ab", 10), "ab");
    }
}
