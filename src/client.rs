//! Resilient fetch client: cache check, retry with linear backoff and
//! error classification around a single upstream request.

use crate::{
    cache::ResponseCache,
    constants::{MAX_RETRY_ATTEMPTS, RETRY_BASE_DELAY_MS},
    error::{FetchError, TransportError},
    metrics::{FetchMetrics, MetricsCollector},
    transport::{HttpResponse, HttpTransport, ReqwestTransport},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// Attempt budget and backoff schedule for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Network attempts before giving up
    pub max_attempts: u32,
    /// Delay unit of the linear backoff
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Delay before the attempt following `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }

    /// Every delay a fully exhausted request waits through, in order
    pub fn schedule(&self) -> Vec<Duration> {
        (1..self.max_attempts).map(|a| self.delay_for(a)).collect()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(
            MAX_RETRY_ATTEMPTS,
            Duration::from_millis(RETRY_BASE_DELAY_MS),
        )
    }
}

/// Fetches and decodes upstream JSON, consulting the session cache first
///
/// The cache is injected so a session (or a test) owns its own store.
pub struct FetchClient {
    transport: Arc<dyn HttpTransport>,
    cache: Arc<ResponseCache>,
    policy: RetryPolicy,
    metrics: Arc<MetricsCollector>,
}

impl FetchClient {
    /// Creates a client over reqwest with a fresh session cache
    pub fn new() -> Result<Self, TransportError> {
        let transport = Arc::new(ReqwestTransport::new()?);
        Ok(Self::with_transport(transport, Arc::new(ResponseCache::new())))
    }

    /// Creates a client over a custom transport and cache
    pub fn with_transport(transport: Arc<dyn HttpTransport>, cache: Arc<ResponseCache>) -> Self {
        let metrics = Arc::new(MetricsCollector::new(transport.transport_name()));
        Self {
            transport,
            cache,
            policy: RetryPolicy::default(),
            metrics,
        }
    }

    /// Replaces the default retry policy
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Current request metrics
    pub async fn metrics(&self) -> FetchMetrics {
        self.metrics.get_metrics().await
    }

    /// Fetches `key` with the client's retry policy
    ///
    /// `key` is the fully-formed request URL; it doubles as the cache key.
    pub async fn fetch_with_retry<T: DeserializeOwned>(&self, key: &str) -> Result<T, FetchError> {
        self.fetch_with_policy(key, &self.policy).await
    }

    /// Fetches `key` with an explicit retry policy
    ///
    /// A fresh cache entry is returned without touching the network.
    /// Otherwise the request is attempted up to `policy.max_attempts`
    /// times: 429 responses and transport failures back off linearly and
    /// retry, any other error status fails at once. A decoded payload is
    /// stored in the cache before it is returned.
    pub async fn fetch_with_policy<T: DeserializeOwned>(
        &self,
        key: &str,
        policy: &RetryPolicy,
    ) -> Result<T, FetchError> {
        if let Some(cached) = self.cache.get(key).await {
            match serde_json::from_value::<T>(cached) {
                Ok(payload) => {
                    tracing::debug!(url = key, "Serving response from cache");
                    self.metrics.record_cache_hit().await;
                    return Ok(payload);
                }
                Err(e) => {
                    tracing::warn!(url = key, error = %e, "Cached payload did not decode, refetching");
                }
            }
        }

        for attempt in 1..=policy.max_attempts {
            let is_final = attempt == policy.max_attempts;
            let start = Instant::now();

            match self.transport.get(key).await {
                Ok(response) if response.is_rate_limited() => {
                    self.metrics.record_request(start.elapsed(), false).await;
                    if is_final {
                        tracing::warn!(url = key, attempt, "Rate limited on final attempt");
                        return Err(FetchError::rate_limited());
                    }

                    let delay = policy.delay_for(attempt);
                    tracing::warn!(
                        url = key,
                        attempt,
                        max_attempts = policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Rate limited, backing off"
                    );
                    sleep(delay).await;
                }
                Ok(response) if !response.is_success() => {
                    self.metrics.record_request(start.elapsed(), false).await;
                    tracing::warn!(url = key, status = response.status, "Upstream returned error status");
                    return Err(FetchError::server(response.status, response.status_text));
                }
                Ok(response) => {
                    let decoded = decode::<T>(&response);
                    self.metrics
                        .record_request(start.elapsed(), decoded.is_ok())
                        .await;
                    let (document, payload) = decoded?;

                    tracing::debug!(
                        url = key,
                        attempt,
                        latency_ms = start.elapsed().as_millis() as u64,
                        "Fetched upstream response"
                    );
                    self.cache.put(key, document).await;
                    return Ok(payload);
                }
                Err(e) => {
                    self.metrics.record_request(start.elapsed(), false).await;
                    if is_final {
                        tracing::warn!(url = key, attempt, error = %e, "Transport failed on final attempt");
                        return Err(FetchError::network());
                    }

                    let delay = policy.delay_for(attempt);
                    tracing::warn!(
                        url = key,
                        attempt,
                        max_attempts = policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transport failed, retrying"
                    );
                    sleep(delay).await;
                }
            }
        }

        Err(FetchError::max_retries())
    }

    /// Fetches `url` once, bypassing the cache in both directions
    ///
    /// Used for live lookups that must not be answered from a snapshot.
    pub async fn fetch_uncached<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let start = Instant::now();
        let response = match self.transport.get(url).await {
            Ok(response) => response,
            Err(e) => {
                self.metrics.record_request(start.elapsed(), false).await;
                tracing::warn!(url, error = %e, "Live request failed");
                return Err(FetchError::network());
            }
        };

        if response.is_rate_limited() {
            self.metrics.record_request(start.elapsed(), false).await;
            return Err(FetchError::rate_limited());
        }
        if !response.is_success() {
            self.metrics.record_request(start.elapsed(), false).await;
            return Err(FetchError::server(response.status, response.status_text));
        }

        let decoded = decode::<T>(&response);
        self.metrics
            .record_request(start.elapsed(), decoded.is_ok())
            .await;
        decoded.map(|(_, payload)| payload)
    }
}

/// Parses a response body into its JSON document and the expected shape
fn decode<T: DeserializeOwned>(response: &HttpResponse) -> Result<(Value, T), FetchError> {
    let document: Value = serde_json::from_str(&response.body)
        .map_err(|e| FetchError::invalid_response(format!("body is not JSON: {}", e)))?;
    let payload = serde_json::from_value::<T>(document.clone())
        .map_err(|e| FetchError::invalid_response(format!("unexpected shape: {}", e)))?;
    Ok((document, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;
    use serde_json::json;

    const URL: &str = "https://api.test/coins/markets?per_page=50";

    fn client(transport: &MockTransport) -> FetchClient {
        FetchClient::with_transport(Arc::new(transport.clone()), Arc::new(ResponseCache::new()))
    }

    #[test]
    fn test_linear_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(4000));
        assert_eq!(
            policy.schedule(),
            vec![Duration::from_millis(2000), Duration::from_millis(4000)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_then_success() {
        let transport = MockTransport::new();
        transport.push_status(429).push_status(429).push_json(json!([1, 2, 3]));
        let client = client(&transport);

        let start = tokio::time::Instant::now();
        let payload: Vec<u32> = client.fetch_with_retry(URL).await.unwrap();

        assert_eq!(payload, vec![1, 2, 3]);
        assert_eq!(transport.call_count(), 3);
        // 2s after the first 429, 4s after the second
        assert!(start.elapsed() >= Duration::from_secs(6));
        assert!(client.cache().contains(URL).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_exhausts_attempts() {
        let transport = MockTransport::new();
        transport.push_status(429).push_status(429).push_status(429);
        let client = client(&transport);

        let err = client.fetch_with_retry::<Value>(URL).await.unwrap_err();

        assert!(err.is_rate_limited());
        assert_eq!(transport.call_count(), 3);
        assert!(!client.cache().contains(URL).await);

        let metrics = client.metrics().await;
        assert_eq!(metrics.total_requests, 3);
        assert_eq!(metrics.failed_requests, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_error_is_not_retried() {
        let transport = MockTransport::new();
        transport.push_status(503).push_json(json!([]));
        let client = client(&transport);

        let err = client.fetch_with_retry::<Value>(URL).await.unwrap_err();

        assert_eq!(err, FetchError::server(503, "Service Unavailable"));
        assert_eq!(transport.call_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_retries_then_succeeds() {
        let transport = MockTransport::new();
        transport
            .push_unreachable()
            .push_unreachable()
            .push_json(json!({ "ok": true }));
        let client = client(&transport);

        let payload: Value = client.fetch_with_retry(URL).await.unwrap();
        assert_eq!(payload, json!({ "ok": true }));
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_becomes_network_error() {
        let transport = MockTransport::new();
        transport
            .push_unreachable()
            .push_unreachable()
            .push_unreachable();
        let client = client(&transport);

        let err = client.fetch_with_retry::<Value>(URL).await.unwrap_err();
        assert!(matches!(err, FetchError::NetworkError { .. }));
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_undecodable_body_fails_without_caching() {
        let transport = MockTransport::new();
        transport.push_json(json!({ "unexpected": "object" }));
        let client = client(&transport);

        let err = client.fetch_with_retry::<Vec<u32>>(URL).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidResponse(_)));
        assert_eq!(transport.call_count(), 1);
        assert!(!client.cache().contains(URL).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_cache_skips_network() {
        let transport = MockTransport::new();
        transport.push_json(json!(["first"])).push_json(json!(["second"]));
        let client = client(&transport);

        let first: Vec<String> = client.fetch_with_retry(URL).await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;
        let second: Vec<String> = client.fetch_with_retry(URL).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(transport.call_count(), 1);
        assert_eq!(client.metrics().await.cache_hits, 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        let third: Vec<String> = client.fetch_with_retry(URL).await.unwrap();
        assert_eq!(third, vec!["second".to_string()]);
        assert_eq!(transport.call_count(), 2);
    }

    #[tokio::test]
    async fn test_zero_attempts_reports_unknown() {
        let transport = MockTransport::new();
        let client = client(&transport).with_policy(RetryPolicy::new(0, Duration::ZERO));

        let err = client.fetch_with_retry::<Value>(URL).await.unwrap_err();
        assert_eq!(err, FetchError::max_retries());
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn test_uncached_fetch_leaves_cache_alone() {
        let transport = MockTransport::new();
        transport.push_json(json!({ "bitcoin": { "usd": 1.0 } }));
        transport.push_json(json!({ "bitcoin": { "usd": 2.0 } }));
        let client = client(&transport);

        let _: Value = client.fetch_uncached(URL).await.unwrap();
        let second: Value = client.fetch_uncached(URL).await.unwrap();

        assert_eq!(second["bitcoin"]["usd"], json!(2.0));
        assert_eq!(transport.call_count(), 2);
        assert!(client.cache().is_empty().await);
    }

    #[tokio::test]
    async fn test_uncached_fetch_does_not_retry() {
        let transport = MockTransport::new();
        transport.push_status(429);
        let client = client(&transport);

        let err = client.fetch_uncached::<Value>(URL).await.unwrap_err();
        assert!(err.is_rate_limited());
        assert_eq!(transport.call_count(), 1);
    }
}
