//! Listening-history provider configuration types

use url::Url;

use crate::{get_env_or_default, get_required_env, parse_env, ConfigError, ConfigResult};

/// Hard upper bound on listens per page accepted by the provider API
pub const MAX_PAGE_LIMIT: u32 = 1000;

/// External listening-history provider configuration
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Provider API base URL
    pub base_url: String,

    /// Optional API token sent as `Authorization: Token <value>`
    pub api_token: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Listens requested per page (clamped to [`MAX_PAGE_LIMIT`])
    pub page_limit: u32,
}

impl ProviderConfig {
    /// Load provider configuration from environment variables
    ///
    /// `HISTORY_PROVIDER_URL` is required; the token is optional because
    /// some deployments proxy an unauthenticated mirror.
    pub fn from_env() -> ConfigResult<Self> {
        let base_url = get_required_env("HISTORY_PROVIDER_URL")?;

        Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidUrl("HISTORY_PROVIDER_URL".to_string(), e.to_string()))?;

        let api_token = match get_env_or_default("HISTORY_PROVIDER_TOKEN", "") {
            token if token.trim().is_empty() => None,
            token => Some(token),
        };

        Ok(Self {
            base_url,
            api_token,
            timeout_secs: parse_env("HISTORY_PROVIDER_TIMEOUT", 10)?,
            page_limit: parse_env::<u32>("HISTORY_PROVIDER_PAGE_LIMIT", 500)?.min(MAX_PAGE_LIMIT),
        })
    }

    /// Create a configuration with a custom base URL (useful for testing)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: None,
            timeout_secs: 10,
            page_limit: 500,
        }
    }

    /// Get the full URL for a subject's listens endpoint
    pub fn listens_url(&self, subject_external_id: &str) -> String {
        format!(
            "{}/1/user/{}/listens",
            self.base_url.trim_end_matches('/'),
            subject_external_id
        )
    }
}
