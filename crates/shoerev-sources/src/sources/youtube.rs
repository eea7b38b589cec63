//! Video-platform adapter over the YouTube Data API v3 `search` endpoint.
//!
//! Every call costs quota, so quota and key failures are classified precisely:
//! exhausted quota is [`AdapterError::RateLimited`], a bad key is
//! [`AdapterError::Auth`].

use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use shoerev_core::{MentionSource, RawItem};
use tokio_util::sync::CancellationToken;

use super::{paginate, unescape_html, Page, RawItemStream};
use crate::config::{HttpSettings, YOUTUBE_BASE_URL};
use crate::error::AdapterError;
use crate::pacing::Pacer;

const MAX_RESULTS_PER_PAGE: usize = 50;
const RATE_LIMIT_REASONS: &[&str] = &[
    "quotaExceeded",
    "dailyLimitExceeded",
    "rateLimitExceeded",
    "userRateLimitExceeded",
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: Option<ItemId>,
    snippet: Option<Snippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: Option<String>,
    channel_title: Option<String>,
    published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    reason: Option<String>,
}

/// Client for the YouTube search endpoint.
///
/// Use [`YoutubeClient::new`] for production or [`YoutubeClient::with_base_url`]
/// to point at a mock server in tests.
#[derive(Debug)]
pub struct YoutubeClient {
    client: Client,
    api_key: String,
    base_url: String,
    pacer: Pacer,
}

impl YoutubeClient {
    /// # Errors
    ///
    /// Returns [`AdapterError::Network`] if the HTTP client cannot be built.
    pub fn new(api_key: &str, http: &HttpSettings) -> Result<Self, AdapterError> {
        Self::with_base_url(api_key, http, YOUTUBE_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`AdapterError::Network`] if the HTTP client cannot be built.
    pub fn with_base_url(
        api_key: &str,
        http: &HttpSettings,
        base_url: &str,
    ) -> Result<Self, AdapterError> {
        Ok(Self {
            client: http.build_client()?,
            api_key: api_key.to_owned(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            pacer: Pacer::from_millis(http.inter_request_delay_ms),
        })
    }

    /// Search videos for `query`, following `nextPageToken` until `limit`
    /// items have been produced.
    pub fn search<'a>(
        &'a self,
        query: &'a str,
        limit: usize,
        cancel: CancellationToken,
    ) -> RawItemStream<'a> {
        paginate(limit, cancel, move |cursor, remaining| {
            self.fetch_page(query, cursor, remaining)
        })
    }

    async fn fetch_page(
        &self,
        query: &str,
        page_token: Option<String>,
        remaining: usize,
    ) -> Result<Page, AdapterError> {
        let max_results = remaining.clamp(1, MAX_RESULTS_PER_PAGE).to_string();
        let mut params: Vec<(&str, &str)> = vec![
            ("part", "snippet"),
            ("type", "video"),
            ("q", query),
            ("maxResults", max_results.as_str()),
            ("order", "relevance"),
            ("regionCode", "JP"),
            ("relevanceLanguage", "ja"),
            ("key", self.api_key.as_str()),
        ];
        if let Some(token) = page_token.as_deref() {
            params.push(("pageToken", token));
        }

        self.pacer.wait().await;
        let response = self
            .client
            .get(format!("{}/youtube/v3/search", self.base_url))
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(classify_error(status, &body));
        }

        let parsed: SearchResponse = serde_json::from_str(&body)
            .map_err(|e| AdapterError::Malformed(format!("youtube search page: {e}")))?;

        let fetched_at = Utc::now();
        let items = parsed
            .items
            .into_iter()
            .map(|item| to_raw_item(item, fetched_at))
            .collect();

        tracing::debug!(
            adapter = "youtube",
            query,
            has_next = parsed.next_page_token.is_some(),
            "fetched youtube search page"
        );

        Ok(Page {
            items,
            next: parsed.next_page_token.filter(|t| !t.is_empty()),
        })
    }
}

fn to_raw_item(item: SearchItem, fetched_at: DateTime<Utc>) -> Result<RawItem, AdapterError> {
    let video_id = item
        .id
        .and_then(|id| id.video_id)
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AdapterError::Malformed("search entry without a video id".to_string()))?;
    let snippet = item.snippet.unwrap_or(Snippet {
        title: None,
        channel_title: None,
        published_at: None,
    });

    Ok(RawItem {
        source: MentionSource::Video,
        url: format!("https://www.youtube.com/watch?v={video_id}"),
        external_id: Some(video_id),
        title: unescape_html(snippet.title.as_deref().unwrap_or_default()),
        author: snippet.channel_title.unwrap_or_default(),
        published_at: snippet.published_at,
        fetched_at,
    })
}

/// Map a failed search response, using the `error.errors[].reason` field
/// when the body carries one.
fn classify_error(status: StatusCode, body: &str) -> AdapterError {
    let reason = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error.errors.into_iter().find_map(|d| d.reason))
        .unwrap_or_default();
    let message = if reason.is_empty() {
        format!("youtube search returned HTTP {status}")
    } else {
        format!("youtube search returned HTTP {status} ({reason})")
    };

    match status {
        StatusCode::TOO_MANY_REQUESTS => AdapterError::RateLimited(message),
        StatusCode::FORBIDDEN if RATE_LIMIT_REASONS.contains(&reason.as_str()) => {
            AdapterError::RateLimited(message)
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AdapterError::Auth(message),
        StatusCode::BAD_REQUEST if reason == "keyInvalid" => AdapterError::Auth(message),
        s if s.is_server_error() => AdapterError::Network(message),
        _ => AdapterError::Rejected(message),
    }
}
