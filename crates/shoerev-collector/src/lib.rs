//! Collection engine: resolve queries for a shoe, fan out to the configured
//! source adapters, normalize and deduplicate the results, and persist them
//! through a [`shoerev_core::MentionStore`].

pub mod normalize;
pub mod orchestrator;
pub mod query;
pub mod retry;

pub use normalize::{identity_key, normalize_items, normalize_url};
pub use orchestrator::{CollectOptions, CollectPolicy, Collector};
pub use query::{resolve_queries, ResolutionError, SourceQuery};
