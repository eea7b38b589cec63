//! Native X adapter over the API v2 recent-search endpoint (bearer token).
//!
//! Only a short text preview is kept as the title; full post content is
//! never stored.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use shoerev_core::{MentionSource, RawItem};
use tokio_util::sync::CancellationToken;

use super::{paginate, Page, RawItemStream};
use crate::config::{HttpSettings, TWITTER_BASE_URL};
use crate::error::AdapterError;
use crate::pacing::Pacer;

const MIN_RESULTS: usize = 10;
const MAX_RESULTS: usize = 100;
const TITLE_PREVIEW_CHARS: usize = 100;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<Tweet>,
    includes: Option<Includes>,
    meta: Option<Meta>,
}

#[derive(Debug, Deserialize)]
struct Tweet {
    id: Option<String>,
    text: Option<String>,
    author_id: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct Includes {
    #[serde(default)]
    users: Vec<User>,
}

#[derive(Debug, Deserialize)]
struct User {
    id: String,
    username: String,
}

#[derive(Debug, Deserialize)]
struct Meta {
    next_token: Option<String>,
}

pub struct TwitterClient {
    client: Client,
    bearer_token: String,
    base_url: String,
    pacer: Pacer,
}

impl std::fmt::Debug for TwitterClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwitterClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl TwitterClient {
    /// # Errors
    ///
    /// Returns [`AdapterError::Network`] if the HTTP client cannot be built.
    pub fn new(bearer_token: &str, http: &HttpSettings) -> Result<Self, AdapterError> {
        Self::with_base_url(bearer_token, http, TWITTER_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`AdapterError::Network`] if the HTTP client cannot be built.
    pub fn with_base_url(
        bearer_token: &str,
        http: &HttpSettings,
        base_url: &str,
    ) -> Result<Self, AdapterError> {
        Ok(Self {
            client: http.build_client()?,
            bearer_token: bearer_token.to_owned(),
            base_url: base_url.trim_end_matches('/').to_owned(),
            pacer: Pacer::from_millis(http.inter_request_delay_ms),
        })
    }

    /// Search recent posts for `query`, following `meta.next_token`.
    pub fn search<'a>(
        &'a self,
        query: &'a str,
        limit: usize,
        cancel: CancellationToken,
    ) -> RawItemStream<'a> {
        paginate(limit, cancel, move |next_token, remaining| {
            self.fetch_page(query, next_token, remaining)
        })
    }

    async fn fetch_page(
        &self,
        query: &str,
        next_token: Option<String>,
        remaining: usize,
    ) -> Result<Page, AdapterError> {
        let max_results = remaining.clamp(MIN_RESULTS, MAX_RESULTS).to_string();
        let mut params: Vec<(&str, &str)> = vec![
            ("query", query),
            ("max_results", max_results.as_str()),
            ("expansions", "author_id"),
            ("user.fields", "username"),
            ("tweet.fields", "created_at"),
        ];
        if let Some(token) = next_token.as_deref() {
            params.push(("next_token", token));
        }

        self.pacer.wait().await;
        let response = self
            .client
            .get(format!("{}/2/tweets/search/recent", self.base_url))
            .bearer_auth(&self.bearer_token)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::from_status(status, "x recent search"));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Malformed(format!("x recent search page: {e}")))?;

        let usernames: HashMap<String, String> = parsed
            .includes
            .map(|inc| inc.users.into_iter().map(|u| (u.id, u.username)).collect())
            .unwrap_or_default();

        let fetched_at = Utc::now();
        let items = parsed
            .data
            .into_iter()
            .map(|tweet| to_raw_item(tweet, &usernames, fetched_at))
            .collect();

        Ok(Page {
            items,
            next: parsed
                .meta
                .and_then(|m| m.next_token)
                .filter(|t| !t.is_empty()),
        })
    }
}

fn to_raw_item(
    tweet: Tweet,
    usernames: &HashMap<String, String>,
    fetched_at: DateTime<Utc>,
) -> Result<RawItem, AdapterError> {
    let id = tweet
        .id
        .filter(|id| !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()))
        .ok_or_else(|| AdapterError::Malformed("post without a numeric id".to_string()))?;
    let username = tweet
        .author_id
        .as_ref()
        .and_then(|author_id| usernames.get(author_id));

    let url = match username {
        Some(name) => format!("https://x.com/{name}/status/{id}"),
        None => format!("https://x.com/i/web/status/{id}"),
    };
    let title = tweet
        .text
        .as_deref()
        .unwrap_or_default()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .chars()
        .take(TITLE_PREVIEW_CHARS)
        .collect();

    Ok(RawItem {
        source: MentionSource::SocialX,
        external_id: Some(id),
        title,
        author: username.map(|name| format!("@{name}")).unwrap_or_default(),
        url,
        published_at: tweet.created_at,
        fetched_at,
    })
}
