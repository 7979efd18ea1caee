//! HTTP transport abstraction used by the fetch client

use crate::{
    constants::{REQUEST_TIMEOUT_SECS, USER_AGENT},
    error::TransportError,
};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Status line and body of a completed HTTP exchange
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Canonical reason phrase for the status
    pub status_text: String,
    /// Raw response body
    pub body: String,
}

impl HttpResponse {
    /// Builds a response, deriving the reason phrase from the status code
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        let status_text = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("")
            .to_string();

        Self {
            status,
            status_text,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status == 429
    }
}

/// Trait for issuing idempotent GET requests
///
/// A transport reports every response that carries a status code as
/// `Ok`, leaving status classification to the caller. Only failures that
/// never produced a status are returned as errors.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Performs a GET request for `url`
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError>;

    /// Returns the name of this transport
    fn transport_name(&self) -> &'static str;
}

/// Production transport backed by `reqwest`
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Creates a new reqwest transport
    pub fn new() -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self { client })
    }

    /// Wraps an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new().expect("Failed to create HTTP client")
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
        let response = self
            .client
            .get(url)
            .header("accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            body,
        })
    }

    fn transport_name(&self) -> &'static str {
        "reqwest"
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    type Outcome = Result<HttpResponse, TransportError>;

    /// Mock transport replaying a scripted sequence of outcomes
    ///
    /// Routes (URL fragment -> fixed outcome) are matched first, then the
    /// script is consumed in order. When the script runs out the fallback
    /// outcome is returned, if set.
    #[derive(Clone, Default)]
    pub struct MockTransport {
        routes: Arc<Mutex<Vec<(String, Outcome)>>>,
        script: Arc<Mutex<VecDeque<Outcome>>>,
        fallback: Arc<Mutex<Option<Outcome>>>,
        requests: Arc<Mutex<Vec<String>>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_json(&self, body: serde_json::Value) -> &Self {
            self.push(Ok(HttpResponse::new(200, body.to_string())))
        }

        pub fn push_status(&self, status: u16) -> &Self {
            self.push(Ok(HttpResponse::new(status, "")))
        }

        pub fn push_unreachable(&self) -> &Self {
            self.push(Err(TransportError::Unreachable(
                "connection refused".to_string(),
            )))
        }

        pub fn push(&self, outcome: Outcome) -> &Self {
            self.script.lock().unwrap().push_back(outcome);
            self
        }

        /// Answers every URL containing `fragment` with `body`
        pub fn route(&self, fragment: &str, body: serde_json::Value) -> &Self {
            self.route_outcome(fragment, Ok(HttpResponse::new(200, body.to_string())))
        }

        pub fn route_status(&self, fragment: &str, status: u16) -> &Self {
            self.route_outcome(fragment, Ok(HttpResponse::new(status, "")))
        }

        pub fn route_outcome(&self, fragment: &str, outcome: Outcome) -> &Self {
            self.routes
                .lock()
                .unwrap()
                .push((fragment.to_string(), outcome));
            self
        }

        /// Outcome returned once the script is exhausted
        pub fn set_fallback_json(&self, body: serde_json::Value) {
            *self.fallback.lock().unwrap() = Some(Ok(HttpResponse::new(200, body.to_string())));
        }

        pub fn call_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpTransport for MockTransport {
        async fn get(&self, url: &str) -> Result<HttpResponse, TransportError> {
            self.requests.lock().unwrap().push(url.to_string());
            let routed = self
                .routes
                .lock()
                .unwrap()
                .iter()
                .find(|(fragment, _)| url.contains(fragment.as_str()))
                .map(|(_, outcome)| outcome.clone());
            if let Some(outcome) = routed {
                return outcome;
            }

            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(outcome) => outcome,
                None => self.fallback.lock().unwrap().clone().unwrap_or_else(|| {
                    Err(TransportError::Unreachable(format!(
                        "no scripted response for {}",
                        url
                    )))
                }),
            }
        }

        fn transport_name(&self) -> &'static str {
            "mock"
        }
    }
}
