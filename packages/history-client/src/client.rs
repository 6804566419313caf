//! History provider API client implementation

use std::fmt;
use std::future::Future;
use std::time::Duration;

use cadence_shared_config::{ProviderConfig, MAX_PAGE_LIMIT};
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument, warn};

use crate::error::{HistoryError, HistoryResult};
use crate::models::{Listen, ListensResponse};
use crate::retry::RetryPolicy;

/// Default connection timeout in seconds
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;

/// Maximum subject identifier length accepted by the provider
const MAX_SUBJECT_ID_LENGTH: usize = 256;

/// Listening-history provider API client
#[derive(Clone)]
pub struct HistoryClient {
    http_client: Client,
    config: ProviderConfig,
    policy: RetryPolicy,
}

impl fmt::Debug for HistoryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryClient")
            .field("base_url", &self.config.base_url)
            .field("api_token", &"[REDACTED]")
            .field("policy", &self.policy)
            .finish()
    }
}

impl HistoryClient {
    /// Create a new client from provider configuration
    ///
    /// # Errors
    /// Returns `HistoryError::InvalidInput` if the base URL is empty, or
    /// `HistoryError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ProviderConfig) -> HistoryResult<Self> {
        if config.base_url.trim().is_empty() {
            return Err(HistoryError::InvalidInput(
                "provider base URL cannot be empty".to_string(),
            ));
        }

        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
            .pool_max_idle_per_host(5)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent("Cadence/1.0")
            .build()?;

        Ok(Self {
            http_client,
            config: config.clone(),
            policy: RetryPolicy::default(),
        })
    }

    /// Replace the retry policy (useful for tests)
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Get the retry policy in effect
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Validate a subject identifier before building a URL from it
    fn validate_subject_id(subject_external_id: &str) -> HistoryResult<&str> {
        let trimmed = subject_external_id.trim();
        if trimmed.is_empty() {
            return Err(HistoryError::InvalidInput(
                "subject id cannot be empty".to_string(),
            ));
        }
        if trimmed.len() > MAX_SUBJECT_ID_LENGTH {
            return Err(HistoryError::InvalidInput(format!(
                "subject id too long (max {} characters)",
                MAX_SUBJECT_ID_LENGTH
            )));
        }
        Ok(trimmed)
    }

    /// Execute an operation with retry for classified-transient failures
    ///
    /// Runs at most `policy.max_attempts` total attempts; non-retryable
    /// errors propagate immediately.
    async fn with_retry<T, F, Fut>(&self, operation: F) -> HistoryResult<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = HistoryResult<T>>,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.delay_for(attempt);
                    warn!(
                        attempt = attempt,
                        max_attempts = self.policy.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "History provider request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Make a single listens request and classify non-success statuses
    async fn request_listens(
        &self,
        url: &str,
        query: &[(&str, String)],
        auth_token: Option<&str>,
    ) -> HistoryResult<ListensResponse> {
        let mut request = self.http_client.get(url).query(query);

        if let Some(token) = auth_token {
            request = request.header("Authorization", format!("Token {}", token));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                HistoryError::Timeout
            } else {
                HistoryError::Http(e)
            }
        })?;

        let status = response.status();
        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                warn!("history provider rate limited");
                return Err(HistoryError::RateLimited);
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(HistoryError::AuthRejected(status.as_u16()));
            }
            s if !s.is_success() => {
                let message = response.text().await.unwrap_or_default();
                return Err(HistoryError::Api {
                    status: s.as_u16(),
                    message,
                });
            }
            _ => {}
        }

        let text = response.text().await.map_err(HistoryError::Http)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Fetch listens for a subject, newest first
    ///
    /// # Arguments
    /// * `subject_external_id` - provider-side user identifier
    /// * `since_cursor` - unix-epoch seconds; when present only listens
    ///   after this point are returned (server-side filter)
    /// * `auth_token` - optional bearer-style token for the subject
    /// * `limit` - page size, clamped to the provider's hard maximum
    ///
    /// The client performs no deduplication; that is the persistence
    /// layer's responsibility.
    ///
    /// # Errors
    /// - `HistoryError::InvalidInput` - empty or oversized subject id
    /// - `HistoryError::AuthRejected` - token rejected, never retried
    /// - `HistoryError::RateLimited` / `Timeout` / 5xx - retried up to the
    ///   policy bound, then propagated
    #[instrument(skip(self, auth_token))]
    pub async fn fetch_listens(
        &self,
        subject_external_id: &str,
        since_cursor: Option<i64>,
        auth_token: Option<&str>,
        limit: u32,
    ) -> HistoryResult<Vec<Listen>> {
        let subject_external_id = Self::validate_subject_id(subject_external_id)?;
        let limit = limit.min(MAX_PAGE_LIMIT);

        let url = self.config.listens_url(subject_external_id);
        let mut query: Vec<(&str, String)> = vec![("count", limit.to_string())];
        if let Some(min_ts) = since_cursor {
            query.push(("min_ts", min_ts.to_string()));
        }

        debug!(
            subject = %subject_external_id,
            limit,
            since = ?since_cursor,
            "Fetching listens from history provider"
        );

        let response = self
            .with_retry(|| async { self.request_listens(&url, &query, auth_token).await })
            .await?;

        let listens = response
            .listens
            .into_iter()
            .map(Listen::try_from)
            .collect::<HistoryResult<Vec<_>>>()?;

        debug!(
            subject = %subject_external_id,
            listen_count = listens.len(),
            "Fetched listens"
        );

        Ok(listens)
    }
}
