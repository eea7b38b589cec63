//! Native Reddit adapter (client-credentials OAuth).
//!
//! Used for the Reddit platform only when client credentials are configured;
//! otherwise Reddit is covered by the web-search adapter.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use shoerev_core::{MentionSource, RawItem};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::{paginate, unescape_html, Page, RawItemStream};
use crate::config::{HttpSettings, RedditCredentials, REDDIT_API_URL, REDDIT_AUTH_URL};
use crate::error::AdapterError;
use crate::pacing::Pacer;

const SEARCH_SUBREDDITS: &str = "running+RunningShoeGeeks+AdvancedRunning";
const PAGE_LIMIT: usize = 25;
/// Application tokens last an hour unless the exchange says otherwise.
const DEFAULT_TOKEN_TTL_SECS: u64 = 3600;
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Reddit OAuth token response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<u64>,
}

/// Access token plus the instant after which it must not be reused.
struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Reddit search listing wrapper.
#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Post>,
    after: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Post {
    data: PostData,
}

#[derive(Debug, Deserialize)]
struct PostData {
    id: Option<String>,
    title: Option<String>,
    author: Option<String>,
    permalink: Option<String>,
    created_utc: Option<f64>,
}

/// Reddit API client. The access token is fetched on first use, reused until
/// shortly before it expires, and exchanged again once if search rejects it.
pub struct RedditClient {
    client: Client,
    credentials: RedditCredentials,
    auth_url: String,
    api_url: String,
    token: Mutex<Option<CachedToken>>,
    pacer: Pacer,
}

impl std::fmt::Debug for RedditClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedditClient")
            .field("credentials", &self.credentials)
            .field("auth_url", &self.auth_url)
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}

impl RedditClient {
    /// # Errors
    ///
    /// Returns [`AdapterError::Network`] if the HTTP client cannot be built.
    pub fn new(credentials: RedditCredentials, http: &HttpSettings) -> Result<Self, AdapterError> {
        Self::with_base_urls(credentials, http, REDDIT_AUTH_URL, REDDIT_API_URL)
    }

    /// # Errors
    ///
    /// Returns [`AdapterError::Network`] if the HTTP client cannot be built.
    pub fn with_base_urls(
        credentials: RedditCredentials,
        http: &HttpSettings,
        auth_url: &str,
        api_url: &str,
    ) -> Result<Self, AdapterError> {
        Ok(Self {
            client: http.build_client()?,
            credentials,
            auth_url: auth_url.trim_end_matches('/').to_owned(),
            api_url: api_url.trim_end_matches('/').to_owned(),
            token: Mutex::new(None),
            pacer: Pacer::from_millis(http.inter_request_delay_ms),
        })
    }

    /// Search running subreddits for `query`, following `after` cursors.
    pub fn search<'a>(
        &'a self,
        query: &'a str,
        limit: usize,
        cancel: CancellationToken,
    ) -> RawItemStream<'a> {
        paginate(limit, cancel, move |after, remaining| {
            self.fetch_page(query, after, remaining)
        })
    }

    /// A usable token. `rejected` names a token the API just refused; it is
    /// replaced unless another task already did so.
    async fn access_token(&self, rejected: Option<&str>) -> Result<String, AdapterError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            let refused = rejected == Some(token.value.as_str());
            if !refused && Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let fresh = self.fetch_token().await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    async fn fetch_token(&self) -> Result<CachedToken, AdapterError> {
        self.pacer.wait().await;
        let response = self
            .client
            .post(format!("{}/api/v1/access_token", self.auth_url))
            .header("User-Agent", &self.credentials.user_agent)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(match AdapterError::from_status(status, "reddit token exchange") {
                // Any rejected credential exchange disables the adapter.
                AdapterError::Rejected(message) => AdapterError::Auth(message),
                other => other,
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Malformed(format!("reddit token response: {e}")))?;

        let ttl = Duration::from_secs(token.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS));
        tracing::debug!(
            adapter = "reddit",
            ttl_secs = ttl.as_secs(),
            "reddit access token issued"
        );
        Ok(CachedToken {
            value: token.access_token,
            expires_at: Instant::now() + ttl.saturating_sub(TOKEN_EXPIRY_MARGIN),
        })
    }

    async fn send_search(
        &self,
        token: &str,
        query: &str,
        after: Option<&str>,
        remaining: usize,
    ) -> Result<Response, AdapterError> {
        let limit = remaining.clamp(1, PAGE_LIMIT).to_string();
        let mut params: Vec<(&str, &str)> = vec![
            ("q", query),
            ("restrict_sr", "true"),
            ("sort", "relevance"),
            ("type", "link"),
            ("limit", limit.as_str()),
        ];
        if let Some(cursor) = after {
            params.push(("after", cursor));
        }

        self.pacer.wait().await;
        let response = self
            .client
            .get(format!("{}/r/{SEARCH_SUBREDDITS}/search", self.api_url))
            .bearer_auth(token)
            .header("User-Agent", &self.credentials.user_agent)
            .query(&params)
            .send()
            .await?;
        Ok(response)
    }

    async fn fetch_page(
        &self,
        query: &str,
        after: Option<String>,
        remaining: usize,
    ) -> Result<Page, AdapterError> {
        let token = self.access_token(None).await?;
        let mut response = self
            .send_search(&token, query, after.as_deref(), remaining)
            .await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::debug!(adapter = "reddit", "access token refused, exchanging a new one");
            let token = self.access_token(Some(token.as_str())).await?;
            response = self
                .send_search(&token, query, after.as_deref(), remaining)
                .await?;
        }

        let status = response.status();
        if !status.is_success() {
            return Err(match AdapterError::from_status(status, "reddit search") {
                // The token exchange accepted the credentials; a refusal here
                // concerns this request only.
                AdapterError::Auth(message) => AdapterError::Rejected(message),
                other => other,
            });
        }

        let listing: Listing = response
            .json()
            .await
            .map_err(|e| AdapterError::Malformed(format!("reddit search listing: {e}")))?;

        let fetched_at = Utc::now();
        let items = listing
            .data
            .children
            .into_iter()
            .map(|post| to_raw_item(post.data, fetched_at))
            .collect();

        Ok(Page {
            items,
            next: listing.data.after.filter(|a| !a.is_empty()),
        })
    }
}

fn to_raw_item(post: PostData, fetched_at: DateTime<Utc>) -> Result<RawItem, AdapterError> {
    let (Some(id), Some(permalink)) = (post.id, post.permalink) else {
        return Err(AdapterError::Malformed(
            "reddit post without id or permalink".to_string(),
        ));
    };

    #[allow(clippy::cast_possible_truncation)]
    let published_at = post
        .created_utc
        .and_then(|secs| DateTime::from_timestamp(secs as i64, 0));

    Ok(RawItem {
        source: MentionSource::SocialReddit,
        external_id: Some(id),
        title: unescape_html(post.title.as_deref().unwrap_or_default()),
        author: post
            .author
            .map(|name| format!("u/{name}"))
            .unwrap_or_default(),
        url: format!("https://www.reddit.com{permalink}"),
        published_at,
        fetched_at,
    })
}
