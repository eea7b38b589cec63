//! Shared fixtures: an in-memory store and wiremock-backed adapter config.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use shoerev_collector::{CollectPolicy, Collector};
use shoerev_core::{
    MentionCandidate, MentionSource, MentionStore, PersistenceError, Shoe, ShoeCatalog,
    UpsertOutcome,
};
use shoerev_sources::{AdapterRegistry, HttpSettings, SourcesConfig};

/// Row as the in-memory store keeps it.
#[derive(Debug, Clone)]
pub struct StoredMention {
    pub url: String,
    pub title: String,
    pub author: String,
}

/// Store enforcing the same `(shoe_id, source, identity_key)` uniqueness as
/// the `mentions` table.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    shoes: Vec<Shoe>,
    rows: Mutex<BTreeMap<(i64, MentionSource, String), StoredMention>>,
    fail_writes: AtomicBool,
}

impl InMemoryStore {
    pub fn with_shoes(shoes: Vec<Shoe>) -> Self {
        Self {
            shoes,
            ..Self::default()
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn row_count(&self, shoe_id: i64) -> usize {
        self.rows
            .lock()
            .unwrap()
            .keys()
            .filter(|(id, _, _)| *id == shoe_id)
            .count()
    }

    pub fn rows_for(&self, shoe_id: i64, source: MentionSource) -> Vec<StoredMention> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter(|((id, s, _), _)| *id == shoe_id && *s == source)
            .map(|(_, row)| row.clone())
            .collect()
    }
}

impl MentionStore for InMemoryStore {
    async fn upsert(&self, mention: &MentionCandidate) -> Result<UpsertOutcome, PersistenceError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PersistenceError::ConnectionLost(
                "connection refused".to_string(),
            ));
        }
        if !self.shoes.iter().any(|s| s.id == mention.shoe_id) {
            return Err(PersistenceError::ConstraintViolation {
                constraint: "mentions_shoe_id_fkey".to_string(),
                message: format!("shoe {} does not exist", mention.shoe_id),
            });
        }

        let key = (
            mention.shoe_id,
            mention.source(),
            mention.identity.key.clone(),
        );
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&key) {
            None => {
                rows.insert(
                    key,
                    StoredMention {
                        url: mention.url.clone(),
                        title: mention.title.clone(),
                        author: mention.author.clone(),
                    },
                );
                Ok(UpsertOutcome::Inserted)
            }
            Some(row) if row.title == mention.title && row.author == mention.author => {
                Ok(UpsertOutcome::Unchanged)
            }
            Some(row) => {
                row.title.clone_from(&mention.title);
                row.author.clone_from(&mention.author);
                Ok(UpsertOutcome::Updated)
            }
        }
    }

    async fn collected_sources(
        &self,
        shoe_id: i64,
    ) -> Result<BTreeSet<MentionSource>, PersistenceError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .keys()
            .filter(|(id, _, _)| *id == shoe_id)
            .map(|(_, source, _)| *source)
            .collect())
    }
}

impl ShoeCatalog for InMemoryStore {
    async fn get_shoe(&self, shoe_id: i64) -> Result<Option<Shoe>, PersistenceError> {
        Ok(self.shoes.iter().find(|s| s.id == shoe_id).cloned())
    }

    async fn list_shoes(&self, limit: usize) -> Result<Vec<Shoe>, PersistenceError> {
        // Newest first: higher ids were created later.
        let mut shoes = self.shoes.clone();
        shoes.sort_by(|a, b| b.id.cmp(&a.id));
        shoes.truncate(limit);
        Ok(shoes)
    }
}

pub fn shoe(id: i64, brand: &str, model: &str) -> Shoe {
    Shoe {
        id,
        brand: brand.to_string(),
        model_name: model.to_string(),
        category: None,
        aliases: Vec::new(),
    }
}

pub fn pegasus() -> Shoe {
    shoe(1, "Nike", "Pegasus 41")
}

pub fn fast_policy() -> CollectPolicy {
    CollectPolicy {
        max_concurrent_shoes: 2,
        max_concurrent_sources: 2,
        max_retries: 1,
        retry_backoff_base_ms: 0,
        call_timeout: Duration::from_secs(5),
        run_deadline: Duration::from_secs(30),
        results_per_query: 10,
    }
}

/// Adapter config pointing YouTube and/or Serper at `base_url`.
pub fn sources_config(base_url: &str, youtube: bool, serper: bool) -> SourcesConfig {
    SourcesConfig {
        http: HttpSettings {
            timeout_secs: 5,
            user_agent: "shoerev-test".to_string(),
            inter_request_delay_ms: 0,
        },
        youtube_api_key: youtube.then(|| "yt-key".to_string()),
        serper_api_key: serper.then(|| "serper-key".to_string()),
        youtube_base_url: base_url.to_string(),
        serper_base_url: base_url.to_string(),
        ..SourcesConfig::default()
    }
}

pub fn collector(
    store: &Arc<InMemoryStore>,
    config: &SourcesConfig,
    policy: CollectPolicy,
) -> Collector<InMemoryStore> {
    let registry = AdapterRegistry::from_config(config).expect("registry should build");
    Collector::new(Arc::clone(store), registry, policy)
}

pub fn youtube_page(ids: &[&str]) -> serde_json::Value {
    let items: Vec<_> = ids
        .iter()
        .map(|id| {
            serde_json::json!({
                "id": { "kind": "youtube#video", "videoId": id },
                "snippet": {
                    "title": format!("Pegasus 41 review {id}"),
                    "channelTitle": "RunLab JP",
                    "publishedAt": "2024-06-01T09:00:00Z"
                }
            })
        })
        .collect();
    serde_json::json!({ "items": items })
}

pub fn serper_page(links: &[&str]) -> serde_json::Value {
    let organic: Vec<_> = links
        .iter()
        .enumerate()
        .map(|(i, link)| serde_json::json!({ "title": format!("Pegasus 41 post {i}"), "link": link }))
        .collect();
    serde_json::json!({ "organic": organic })
}
