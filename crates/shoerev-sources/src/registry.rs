//! Capability registration: which adapter serves which platform.
//!
//! Availability is decided once, from [`SourcesConfig`], when the registry is
//! built. A platform with native credentials gets its native adapter; every
//! other social platform falls back to the web-search adapter, and all
//! fallback platforms share one scoped web-search lane.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use shoerev_core::{MentionSource, SourceKind};
use tokio_util::sync::CancellationToken;

use crate::config::SourcesConfig;
use crate::error::AdapterError;
use crate::sources::reddit::RedditClient;
use crate::sources::twitter::TwitterClient;
use crate::sources::web_search::SerperClient;
use crate::sources::youtube::YoutubeClient;
use crate::sources::RawItemStream;

/// The adapter variants, dispatched by `match`.
#[derive(Debug)]
pub enum SourceAdapter {
    Youtube(YoutubeClient),
    WebSearch(SerperClient),
    Reddit(RedditClient),
    Twitter(TwitterClient),
}

impl SourceAdapter {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            SourceAdapter::Youtube(_) => "youtube",
            SourceAdapter::WebSearch(_) => "web_search",
            SourceAdapter::Reddit(_) => "reddit",
            SourceAdapter::Twitter(_) => "x",
        }
    }

    /// `scope` only narrows the web-search adapter; native adapters serve
    /// exactly one platform and ignore it.
    pub fn search<'a>(
        &'a self,
        query: &'a str,
        limit: usize,
        scope: &'a [MentionSource],
        cancel: CancellationToken,
    ) -> RawItemStream<'a> {
        match self {
            SourceAdapter::Youtube(client) => client.search(query, limit, cancel),
            SourceAdapter::WebSearch(client) => client.search(query, limit, scope, cancel),
            SourceAdapter::Reddit(client) => client.search(query, limit, cancel),
            SourceAdapter::Twitter(client) => client.search(query, limit, cancel),
        }
    }
}

/// An adapter plus its process-wide authentication state.
#[derive(Debug)]
pub struct AdapterHandle {
    adapter: SourceAdapter,
    auth_failed: AtomicBool,
}

impl AdapterHandle {
    #[must_use]
    pub fn new(adapter: SourceAdapter) -> Self {
        Self {
            adapter,
            auth_failed: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.adapter.name()
    }

    /// `true` once the adapter has been rejected for bad credentials.
    #[must_use]
    pub fn is_disabled(&self) -> bool {
        self.auth_failed.load(Ordering::Acquire)
    }

    /// Disable the adapter for the rest of the process.
    pub fn disable(&self) {
        if !self.auth_failed.swap(true, Ordering::AcqRel) {
            tracing::warn!(
                adapter = self.name(),
                "adapter disabled after authentication failure"
            );
        }
    }

    pub fn search<'a>(
        &'a self,
        query: &'a str,
        limit: usize,
        scope: &'a [MentionSource],
        cancel: CancellationToken,
    ) -> RawItemStream<'a> {
        self.adapter.search(query, limit, scope, cancel)
    }
}

/// One adapter serving a subset of a kind's platforms.
#[derive(Debug, Clone)]
pub struct Lane {
    pub handle: Arc<AdapterHandle>,
    pub platforms: Vec<MentionSource>,
}

/// The adapters available to this process.
#[derive(Debug, Default, Clone)]
pub struct AdapterRegistry {
    youtube: Option<Arc<AdapterHandle>>,
    web_search: Option<Arc<AdapterHandle>>,
    reddit: Option<Arc<AdapterHandle>>,
    twitter: Option<Arc<AdapterHandle>>,
}

impl AdapterRegistry {
    /// Construct every adapter whose credentials are present.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Network`] if an HTTP client cannot be built.
    pub fn from_config(config: &SourcesConfig) -> Result<Self, AdapterError> {
        let handle = |adapter| Some(Arc::new(AdapterHandle::new(adapter)));
        let http = &config.http;

        let youtube = match &config.youtube_api_key {
            Some(key) => handle(SourceAdapter::Youtube(YoutubeClient::with_base_url(
                key,
                http,
                &config.youtube_base_url,
            )?)),
            None => None,
        };
        let web_search = match &config.serper_api_key {
            Some(key) => handle(SourceAdapter::WebSearch(SerperClient::with_base_url(
                key,
                http,
                &config.serper_base_url,
            )?)),
            None => None,
        };
        let reddit = match &config.reddit {
            Some(credentials) => handle(SourceAdapter::Reddit(RedditClient::with_base_urls(
                credentials.clone(),
                http,
                &config.reddit_auth_url,
                &config.reddit_api_url,
            )?)),
            None => None,
        };
        let twitter = match &config.twitter_bearer_token {
            Some(token) => handle(SourceAdapter::Twitter(TwitterClient::with_base_url(
                token,
                http,
                &config.twitter_base_url,
            )?)),
            None => None,
        };

        let registry = Self {
            youtube,
            web_search,
            reddit,
            twitter,
        };
        tracing::debug!(adapters = ?registry.adapter_names(), "adapter registry built");
        Ok(registry)
    }

    fn native_for(&self, platform: MentionSource) -> Option<&Arc<AdapterHandle>> {
        match platform {
            MentionSource::Video => self.youtube.as_ref(),
            MentionSource::SocialX => self.twitter.as_ref(),
            MentionSource::SocialReddit => self.reddit.as_ref(),
        }
    }

    /// Lanes serving `kind`. Empty when nothing is configured for it.
    #[must_use]
    pub fn lanes(&self, kind: SourceKind) -> Vec<Lane> {
        let mut lanes = Vec::new();
        let mut fallback = Vec::new();

        for &platform in kind.platforms() {
            if let Some(native) = self.native_for(platform) {
                lanes.push(Lane {
                    handle: Arc::clone(native),
                    platforms: vec![platform],
                });
            } else if platform != MentionSource::Video {
                fallback.push(platform);
            }
        }

        match &self.web_search {
            Some(web) if !fallback.is_empty() => lanes.push(Lane {
                handle: Arc::clone(web),
                platforms: fallback,
            }),
            _ => {}
        }

        lanes
    }

    /// Platforms of `kind` that no lane serves.
    #[must_use]
    pub fn uncovered(&self, kind: SourceKind) -> Vec<MentionSource> {
        kind.platforms()
            .iter()
            .copied()
            .filter(|&platform| {
                self.native_for(platform).is_none()
                    && (platform == MentionSource::Video || self.web_search.is_none())
            })
            .collect()
    }

    /// Names of the constructed adapters, for logs and the `config` command.
    #[must_use]
    pub fn adapter_names(&self) -> Vec<&'static str> {
        [&self.youtube, &self.web_search, &self.reddit, &self.twitter]
            .into_iter()
            .flatten()
            .map(|h| h.name())
            .collect()
    }
}
