//! Web-search social adapter over the Serper Google-search proxy.
//!
//! One generic search backend stands in for both social platforms. Each
//! platform in scope gets its own `site:`-scoped query with its own result
//! limit, run one after the other through the shared pacer; each organic
//! result is classified by URL. Results that do not look like a post on the
//! queried platform are dropped with a debug log. Only title, author and URL
//! are kept.

use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shoerev_core::{MentionSource, RawItem};
use tokio_util::sync::CancellationToken;

use super::{paginate, sequential, unescape_html, Page, RawItemStream};
use crate::config::{HttpSettings, SERPER_BASE_URL};
use crate::error::AdapterError;
use crate::pacing::Pacer;
use crate::social_url::classify_social_url;

const RESULTS_PER_PAGE: usize = 10;
const MAX_PAGES: u32 = 3;

const X_SITES: &[&str] = &["twitter.com", "x.com"];
const REDDIT_SITES: &[&str] = &[
    "reddit.com/r/running",
    "reddit.com/r/RunningShoeGeeks",
    "reddit.com/r/AdvancedRunning",
];

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    q: &'a str,
    num: usize,
    page: u32,
    gl: &'static str,
    hl: &'static str,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic: Vec<OrganicResult>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    title: Option<String>,
    link: Option<String>,
}

/// Client for the Serper `/search` endpoint.
#[derive(Debug)]
pub struct SerperClient {
    client: Client,
    api_key: String,
    base_url: String,
    pacer: Pacer,
}

impl SerperClient {
    /// # Errors
    ///
    /// Returns [`AdapterError::Network`] if the HTTP client cannot be built.
    pub fn new(api_key: &str, http: &HttpSettings) -> Result<Self, AdapterError> {
        Self::with_base_url(api_key, http, SERPER_BASE_URL)
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

    /// Search each social platform in `scope` for `query`, up to `limit`
    /// results per platform.
    ///
    /// An empty social scope yields an empty stream without any request. A
    /// request-level failure on one platform ends the stream.
    pub fn search<'a>(
        &'a self,
        query: &'a str,
        limit: usize,
        scope: &'a [MentionSource],
        cancel: CancellationToken,
    ) -> RawItemStream<'a> {
        let per_platform = scope
            .iter()
            .filter_map(|&platform| {
                let scoped_query = scoped_query(query, platform)?;
                Some(self.search_platform(scoped_query, platform, limit, cancel.clone()))
            })
            .collect();
        sequential(per_platform)
    }

    fn search_platform(
        &self,
        scoped_query: String,
        platform: MentionSource,
        limit: usize,
        cancel: CancellationToken,
    ) -> RawItemStream<'_> {
        paginate(limit, cancel, move |cursor, _remaining| {
            let page = cursor.and_then(|c| c.parse::<u32>().ok()).unwrap_or(1);
            let scoped_query = scoped_query.clone();
            async move { self.fetch_page(&scoped_query, page, platform).await }
        })
    }

    async fn fetch_page(
        &self,
        scoped_query: &str,
        page: u32,
        platform: MentionSource,
    ) -> Result<Page, AdapterError> {
        let body = SearchRequest {
            q: scoped_query,
            num: RESULTS_PER_PAGE,
            page,
            gl: "jp",
            hl: "ja",
        };

        self.pacer.wait().await;
        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .header("X-API-KEY", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdapterError::from_status(status, "serper search"));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::Malformed(format!("serper search page: {e}")))?;

        let result_count = parsed.organic.len();
        let fetched_at = Utc::now();
        let mut items = Vec::with_capacity(result_count);
        for result in parsed.organic {
            let Some(link) = result.link else {
                continue;
            };
            match classify_social_url(&link) {
                Some(social) if social.source == platform => items.push(Ok(RawItem {
                    source: social.source,
                    external_id: Some(social.external_id),
                    title: unescape_html(result.title.as_deref().unwrap_or_default()),
                    author: social.author,
                    url: link,
                    published_at: None,
                    fetched_at,
                })),
                _ => {
                    tracing::debug!(
                        adapter = "web_search",
                        url = %link,
                        "dropping non-post search result"
                    );
                }
            }
        }

        let next = (result_count >= RESULTS_PER_PAGE && page < MAX_PAGES)
            .then(|| (page + 1).to_string());

        Ok(Page { items, next })
    }
}

/// Append the `site:` filters for one social platform.
fn scoped_query(query: &str, platform: MentionSource) -> Option<String> {
    let sites = match platform {
        MentionSource::SocialX => X_SITES,
        MentionSource::SocialReddit => REDDIT_SITES,
        MentionSource::Video => return None,
    };
    let filters: Vec<String> = sites.iter().map(|site| format!("site:{site}")).collect();
    Some(format!("{query} ({})", filters.join(" OR ")))
}
