//! Injected adapter configuration.
//!
//! Built once from [`AppConfig`]; the presence or absence of each credential
//! decides which adapters the registry constructs.

use std::time::Duration;

use shoerev_core::AppConfig;

use crate::error::AdapterError;

pub const YOUTUBE_BASE_URL: &str = "https://www.googleapis.com";
pub const SERPER_BASE_URL: &str = "https://google.serper.dev";
pub const REDDIT_AUTH_URL: &str = "https://www.reddit.com";
pub const REDDIT_API_URL: &str = "https://oauth.reddit.com";
pub const TWITTER_BASE_URL: &str = "https://api.twitter.com";

/// Transport settings shared by every adapter's `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub inter_request_delay_ms: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: "shoerev/0.1 (review-collector)".to_string(),
            inter_request_delay_ms: 250,
        }
    }
}

impl HttpSettings {
    /// Build a client with the configured timeout and user agent.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Network`] if the TLS backend cannot be initialised.
    pub fn build_client(&self) -> Result<reqwest::Client, AdapterError> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&self.user_agent)
            .build()
            .map_err(|e| AdapterError::Network(format!("failed to build HTTP client: {e}")))
    }
}

#[derive(Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

impl std::fmt::Debug for RedditCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedditCredentials")
            .field("client_id", &"[redacted]")
            .field("client_secret", &"[redacted]")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Everything the registry needs to decide which adapters exist.
///
/// Base URLs default to the production endpoints and are overridden in tests.
#[derive(Clone)]
pub struct SourcesConfig {
    pub http: HttpSettings,
    pub youtube_api_key: Option<String>,
    pub serper_api_key: Option<String>,
    pub reddit: Option<RedditCredentials>,
    pub twitter_bearer_token: Option<String>,
    pub youtube_base_url: String,
    pub serper_base_url: String,
    pub reddit_auth_url: String,
    pub reddit_api_url: String,
    pub twitter_base_url: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            http: HttpSettings::default(),
            youtube_api_key: None,
            serper_api_key: None,
            reddit: None,
            twitter_bearer_token: None,
            youtube_base_url: YOUTUBE_BASE_URL.to_string(),
            serper_base_url: SERPER_BASE_URL.to_string(),
            reddit_auth_url: REDDIT_AUTH_URL.to_string(),
            reddit_api_url: REDDIT_API_URL.to_string(),
            twitter_base_url: TWITTER_BASE_URL.to_string(),
        }
    }
}

impl std::fmt::Debug for SourcesConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourcesConfig")
            .field("http", &self.http)
            .field("youtube", &self.youtube_api_key.is_some())
            .field("serper", &self.serper_api_key.is_some())
            .field("reddit", &self.reddit.is_some())
            .field("twitter", &self.twitter_bearer_token.is_some())
            .finish_non_exhaustive()
    }
}

impl SourcesConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        let reddit = match (&config.reddit_client_id, &config.reddit_client_secret) {
            (Some(id), Some(secret)) => Some(RedditCredentials {
                client_id: id.clone(),
                client_secret: secret.clone(),
                user_agent: config.reddit_user_agent.clone(),
            }),
            _ => None,
        };

        Self {
            http: HttpSettings {
                timeout_secs: config.http_timeout_secs,
                user_agent: config.user_agent.clone(),
                inter_request_delay_ms: config.inter_request_delay_ms,
            },
            youtube_api_key: config.youtube_api_key.clone(),
            serper_api_key: config.serper_api_key.clone(),
            reddit,
            twitter_bearer_token: config.twitter_bearer_token.clone(),
            ..Self::default()
        }
    }
}
