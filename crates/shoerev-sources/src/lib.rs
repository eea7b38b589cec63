//! Source adapters for shoe review mentions.
//!
//! Every adapter implements the same contract: `search(query, limit)` yields a
//! finite, non-restartable stream of [`shoerev_core::RawItem`]s or fails with
//! an [`AdapterError`]. Which adapters exist is decided once, from injected
//! configuration, when the [`AdapterRegistry`] is built.

pub mod config;
pub mod error;
pub mod pacing;
pub mod registry;
pub mod social_url;
pub mod sources;

pub use config::{HttpSettings, RedditCredentials, SourcesConfig};
pub use error::AdapterError;
pub use pacing::Pacer;
pub use registry::{AdapterHandle, AdapterRegistry, Lane, SourceAdapter};
pub use social_url::{classify_social_url, SocialLink};
pub use sources::reddit::RedditClient;
pub use sources::twitter::TwitterClient;
pub use sources::web_search::SerperClient;
pub use sources::youtube::YoutubeClient;
pub use sources::RawItemStream;
