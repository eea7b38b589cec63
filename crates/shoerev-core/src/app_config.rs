use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub shoes_path: PathBuf,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    pub max_concurrent_shoes: usize,
    pub max_concurrent_sources: usize,
    pub inter_request_delay_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub call_timeout_secs: u64,
    pub run_deadline_secs: u64,
    pub results_per_query: usize,
    pub youtube_api_key: Option<String>,
    pub serper_api_key: Option<String>,
    pub reddit_client_id: Option<String>,
    pub reddit_client_secret: Option<String>,
    pub reddit_user_agent: String,
    pub twitter_bearer_token: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[redacted]");
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("shoes_path", &self.shoes_path)
            .field("database_url", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("max_concurrent_shoes", &self.max_concurrent_shoes)
            .field("max_concurrent_sources", &self.max_concurrent_sources)
            .field("inter_request_delay_ms", &self.inter_request_delay_ms)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("call_timeout_secs", &self.call_timeout_secs)
            .field("run_deadline_secs", &self.run_deadline_secs)
            .field("results_per_query", &self.results_per_query)
            .field("youtube_api_key", &redact(&self.youtube_api_key))
            .field("serper_api_key", &redact(&self.serper_api_key))
            .field("reddit_client_id", &redact(&self.reddit_client_id))
            .field("reddit_client_secret", &redact(&self.reddit_client_secret))
            .field("reddit_user_agent", &self.reddit_user_agent)
            .field("twitter_bearer_token", &redact(&self.twitter_bearer_token))
            .finish()
    }
}

impl AppConfig {
    /// Which credential groups are present, keyed by a display label.
    ///
    /// Used by the `config` command; never exposes the values themselves.
    #[must_use]
    pub fn credential_status(&self) -> Vec<(&'static str, bool)> {
        vec![
            ("YOUTUBE_API_KEY", self.youtube_api_key.is_some()),
            ("SERPER_API_KEY", self.serper_api_key.is_some()),
            (
                "REDDIT_CLIENT_ID/SECRET",
                self.reddit_client_id.is_some() && self.reddit_client_secret.is_some(),
            ),
            ("TWITTER_BEARER_TOKEN", self.twitter_bearer_token.is_some()),
        ]
    }
}
