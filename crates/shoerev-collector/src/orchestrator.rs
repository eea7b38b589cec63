//! Collection Orchestrator.
//!
//! For one shoe and a set of requested source kinds: resolve queries, run
//! every lane serving each kind under the call timeout and retry policy,
//! normalize what came back, persist it, and report exactly one
//! [`RunReportEntry`] per requested kind. Nothing that goes wrong for one
//! kind or one shoe stops the others.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use shoerev_core::{
    AppConfig, MentionCandidate, MentionSource, MentionStore, PersistenceError, RawItem,
    RunReportEntry, RunStatus, Shoe, ShoeCatalog, SourceKind, UpsertOutcome,
};
use shoerev_sources::{AdapterError, AdapterHandle, AdapterRegistry, Lane};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::normalize::normalize_items;
use crate::query::{resolve_queries, SourceQuery};
use crate::retry::{backoff_delay, sleep_or_cancel};

const DEADLINE_EXCEEDED: &str = "deadline exceeded";
const NOT_CONFIGURED: &str = "not configured";
const ALREADY_COLLECTED: &str = "already collected";
const DISABLED_AFTER_AUTH: &str = "disabled after authentication failure";

/// Concurrency, timeout and retry limits for collection runs.
#[derive(Debug, Clone)]
pub struct CollectPolicy {
    pub max_concurrent_shoes: usize,
    pub max_concurrent_sources: usize,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    /// Bound on one adapter `search` call, pagination included.
    pub call_timeout: Duration,
    /// Bound on one shoe's whole run; on expiry in-flight fetches are cancelled.
    pub run_deadline: Duration,
    pub results_per_query: usize,
}

impl Default for CollectPolicy {
    fn default() -> Self {
        Self {
            max_concurrent_shoes: 2,
            max_concurrent_sources: 2,
            max_retries: 3,
            retry_backoff_base_ms: 500,
            call_timeout: Duration::from_secs(30),
            run_deadline: Duration::from_secs(120),
            results_per_query: 10,
        }
    }
}

impl CollectPolicy {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_concurrent_shoes: config.max_concurrent_shoes,
            max_concurrent_sources: config.max_concurrent_sources,
            max_retries: config.max_retries,
            retry_backoff_base_ms: config.retry_backoff_base_ms,
            call_timeout: Duration::from_secs(config.call_timeout_secs),
            run_deadline: Duration::from_secs(config.run_deadline_secs),
            results_per_query: config.results_per_query,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CollectOptions {
    /// Report kinds that already have stored mentions as skipped instead of
    /// fetching them again.
    pub skip_collected: bool,
}

// ---------------------------------------------------------------------------
// Per-lane bookkeeping
// ---------------------------------------------------------------------------

/// Why a lane stopped before running all its queries.
#[derive(Debug)]
enum LaneStop {
    RateLimited(String),
    Disabled(String),
    Cancelled,
}

#[derive(Debug)]
enum QueryError {
    Adapter(AdapterError),
    Cancelled,
}

#[derive(Debug, Default)]
struct QueryOutcome {
    items: Vec<RawItem>,
    dropped: usize,
    error: Option<QueryError>,
}

#[derive(Debug)]
struct LaneOutcome {
    adapter: &'static str,
    items: Vec<RawItem>,
    dropped: usize,
    stop: Option<LaneStop>,
    /// Queries that failed after retries; later queries still ran.
    failures: Vec<String>,
}

impl LaneOutcome {
    fn new(adapter: &'static str) -> Self {
        Self {
            adapter,
            items: Vec::new(),
            dropped: 0,
            stop: None,
            failures: Vec::new(),
        }
    }

    fn is_clean(&self) -> bool {
        self.stop.is_none() && self.failures.is_empty()
    }

    fn is_unavailable(&self) -> bool {
        matches!(
            self.stop,
            Some(LaneStop::RateLimited(_) | LaneStop::Disabled(_))
        )
    }

    fn problem(&self) -> Option<String> {
        let mut parts = Vec::new();
        match &self.stop {
            Some(LaneStop::RateLimited(message)) => parts.push(format!("rate limited: {message}")),
            Some(LaneStop::Disabled(message)) => parts.push(message.clone()),
            Some(LaneStop::Cancelled) => parts.push(DEADLINE_EXCEEDED.to_string()),
            None => {}
        }
        parts.extend(self.failures.iter().cloned());
        (!parts.is_empty()).then(|| format!("{}: {}", self.adapter, parts.join(", ")))
    }
}

/// Status and cause for one kind from its lanes' outcomes.
fn kind_status(lanes: &[LaneOutcome]) -> (RunStatus, Option<String>) {
    if lanes
        .iter()
        .any(|l| matches!(l.stop, Some(LaneStop::Cancelled)))
    {
        return (RunStatus::Skipped, Some(DEADLINE_EXCEEDED.to_string()));
    }

    let problems: Vec<String> = lanes.iter().filter_map(LaneOutcome::problem).collect();
    if problems.is_empty() {
        return (RunStatus::Ok, None);
    }
    let cause = Some(problems.join("; "));

    if lanes.iter().any(|l| l.is_clean() || !l.items.is_empty()) {
        (RunStatus::Partial, cause)
    } else if lanes.iter().all(LaneOutcome::is_unavailable) {
        (RunStatus::Skipped, cause)
    } else {
        (RunStatus::Failed, cause)
    }
}

#[derive(Debug, Default)]
struct PersistTally {
    inserted: usize,
    updated: usize,
    unchanged: usize,
    failed: usize,
    first_error: Option<String>,
}

impl PersistTally {
    fn persisted(&self) -> usize {
        self.inserted + self.updated + self.unchanged
    }
}

// ---------------------------------------------------------------------------
// Collector
// ---------------------------------------------------------------------------

/// The collection engine. Cheap to share by reference across tasks.
pub struct Collector<S> {
    store: Arc<S>,
    registry: AdapterRegistry,
    policy: CollectPolicy,
}

impl<S> Collector<S>
where
    S: MentionStore + ShoeCatalog,
{
    #[must_use]
    pub fn new(store: Arc<S>, registry: AdapterRegistry, policy: CollectPolicy) -> Self {
        Self {
            store,
            registry,
            policy,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    #[must_use]
    pub fn policy(&self) -> &CollectPolicy {
        &self.policy
    }

    /// Collect `kinds` for one catalog shoe.
    ///
    /// Always returns one entry per distinct requested kind; an unknown shoe
    /// or an unreachable catalog yields `failed` entries rather than an error.
    pub async fn collect(&self, shoe_id: i64, kinds: &[SourceKind]) -> Vec<RunReportEntry> {
        self.collect_with(shoe_id, kinds, CollectOptions::default())
            .await
    }

    pub async fn collect_with(
        &self,
        shoe_id: i64,
        kinds: &[SourceKind],
        options: CollectOptions,
    ) -> Vec<RunReportEntry> {
        match self.store.get_shoe(shoe_id).await {
            Ok(Some(shoe)) => self.collect_shoe(&shoe, kinds, options).await,
            Ok(None) => {
                tracing::warn!(shoe_id, "shoe not found in catalog");
                failed_entries(shoe_id, kinds, &format!("shoe {shoe_id} not found"))
            }
            Err(e) => {
                tracing::warn!(shoe_id, error = %e, "catalog lookup failed");
                failed_entries(shoe_id, kinds, &format!("catalog: {e}"))
            }
        }
    }

    /// Collect the newest `limit` catalog shoes through a bounded worker pool.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] only if the catalog cannot be listed; per-shoe
    /// failures are recorded in that shoe's report.
    pub async fn collect_all(
        &self,
        limit: usize,
        kinds: &[SourceKind],
        options: CollectOptions,
    ) -> Result<BTreeMap<i64, Vec<RunReportEntry>>, PersistenceError> {
        let shoes = self.store.list_shoes(limit).await?;
        tracing::info!(
            shoes = shoes.len(),
            max_concurrent = self.policy.max_concurrent_shoes,
            "starting batch collection"
        );

        let reports = stream::iter(&shoes)
            .map(|shoe| {
                let fut = self.collect_shoe(shoe, kinds, options);
                async move { (shoe.id, fut.await) }
            })
            .buffer_unordered(self.policy.max_concurrent_shoes.max(1))
            .collect::<BTreeMap<_, _>>()
            .await;

        Ok(reports)
    }

    /// Platforms that already have at least one stored mention for the shoe.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] if the store cannot be queried.
    pub async fn collected_sources(
        &self,
        shoe_id: i64,
    ) -> Result<BTreeSet<MentionSource>, PersistenceError> {
        self.store.collected_sources(shoe_id).await
    }

    /// Run one shoe under the run deadline.
    pub async fn collect_shoe(
        &self,
        shoe: &Shoe,
        kinds: &[SourceKind],
        options: CollectOptions,
    ) -> Vec<RunReportEntry> {
        let kinds = distinct(kinds);

        let queries = match resolve_queries(shoe) {
            Ok(queries) => queries,
            Err(e) => {
                tracing::warn!(
                    shoe_id = shoe.id,
                    error = %e,
                    "cannot resolve queries, skipping shoe"
                );
                return failed_entries(shoe.id, &kinds, &format!("resolution: {e}"));
            }
        };

        let collected = if options.skip_collected {
            match self.store.collected_sources(shoe.id).await {
                Ok(sources) => Some(sources),
                Err(e) => {
                    tracing::warn!(
                        shoe_id = shoe.id,
                        error = %e,
                        "could not read collected sources, collecting everything"
                    );
                    None
                }
            }
        } else {
            None
        };

        let cancel = CancellationToken::new();
        let work = stream::iter(kinds.iter().copied())
            .map(|kind| self.collect_kind(shoe, &queries, kind, collected.as_ref(), &cancel))
            .buffered(self.policy.max_concurrent_sources.max(1))
            .collect::<Vec<_>>();
        tokio::pin!(work);

        let deadline = tokio::time::sleep(self.policy.run_deadline);
        tokio::pin!(deadline);

        tokio::select! {
            reports = &mut work => reports,
            () = &mut deadline => {
                tracing::warn!(
                    shoe_id = shoe.id,
                    deadline_secs = self.policy.run_deadline.as_secs(),
                    "run deadline reached, cancelling in-flight fetches"
                );
                cancel.cancel();
                work.await
            }
        }
    }

    async fn collect_kind(
        &self,
        shoe: &Shoe,
        queries: &SourceQuery,
        kind: SourceKind,
        collected: Option<&BTreeSet<MentionSource>>,
        cancel: &CancellationToken,
    ) -> RunReportEntry {
        let started = Instant::now();

        if collected.is_some_and(|c| kind.platforms().iter().any(|p| c.contains(p))) {
            tracing::info!(shoe_id = shoe.id, kind = %kind, "already collected, skipping");
            return RunReportEntry::skipped(shoe.id, kind, ALREADY_COLLECTED);
        }

        let lanes = self.registry.lanes(kind);
        if lanes.is_empty() {
            tracing::info!(shoe_id = shoe.id, kind = %kind, "no adapter configured");
            return RunReportEntry::skipped(shoe.id, kind, NOT_CONFIGURED);
        }

        let kind_queries = queries.for_kind(kind);
        let outcomes = join_all(
            lanes
                .iter()
                .map(|lane| self.run_lane(shoe.id, lane, kind_queries, cancel)),
        )
        .await;

        let (mut status, mut error) = kind_status(&outcomes);
        let uncovered = self.registry.uncovered(kind);
        if !uncovered.is_empty() {
            if status == RunStatus::Ok {
                status = RunStatus::Partial;
            }
            let cause = uncovered
                .iter()
                .map(|platform| format!("{platform}: {NOT_CONFIGURED}"))
                .collect::<Vec<_>>()
                .join("; ");
            error = Some(match error {
                Some(existing) => format!("{existing}; {cause}"),
                None => cause,
            });
        }
        let dropped: usize = outcomes.iter().map(|o| o.dropped).sum();
        let items: Vec<_> = outcomes.into_iter().flat_map(|o| o.items).collect();
        let candidates = normalize_items(shoe.id, items, Utc::now());
        let tally = self.persist(&candidates).await;

        if tally.failed > 0 {
            if matches!(status, RunStatus::Ok | RunStatus::Partial) {
                status = if tally.persisted() > 0 {
                    RunStatus::Partial
                } else {
                    RunStatus::Failed
                };
            }
            let cause = format!(
                "{} of {} mentions not persisted: {}",
                tally.failed,
                candidates.len(),
                tally.first_error.as_deref().unwrap_or("unknown error")
            );
            error = Some(match error {
                Some(existing) => format!("{existing}; {cause}"),
                None => cause,
            });
        }

        let entry = RunReportEntry {
            shoe_id: shoe.id,
            kind,
            status,
            item_count: candidates.len(),
            inserted: tally.inserted,
            updated: tally.updated,
            unchanged: tally.unchanged,
            dropped,
            error,
            duration: started.elapsed(),
        };

        if entry.status == RunStatus::Ok {
            tracing::info!(
                shoe_id = shoe.id,
                kind = %kind,
                items = entry.item_count,
                inserted = entry.inserted,
                updated = entry.updated,
                dropped = entry.dropped,
                "source kind collected"
            );
        } else {
            tracing::warn!(
                shoe_id = shoe.id,
                kind = %kind,
                status = %entry.status,
                items = entry.item_count,
                error = entry.error.as_deref().unwrap_or_default(),
                "source kind did not complete cleanly"
            );
        }

        entry
    }

    /// Run every query for one lane, in order, stopping early on
    /// authentication failure, rate limiting or cancellation.
    async fn run_lane(
        &self,
        shoe_id: i64,
        lane: &Lane,
        queries: &[String],
        cancel: &CancellationToken,
    ) -> LaneOutcome {
        let handle = &lane.handle;
        let mut outcome = LaneOutcome::new(handle.name());

        for query in queries {
            if handle.is_disabled() {
                outcome.stop = Some(LaneStop::Disabled(DISABLED_AFTER_AUTH.to_string()));
                break;
            }
            if cancel.is_cancelled() {
                outcome.stop = Some(LaneStop::Cancelled);
                break;
            }

            let result = self
                .run_query(handle, query, &lane.platforms, cancel)
                .await;
            outcome.items.extend(result.items);
            outcome.dropped += result.dropped;

            match result.error {
                None => {}
                Some(QueryError::Cancelled) => {
                    outcome.stop = Some(LaneStop::Cancelled);
                    break;
                }
                Some(QueryError::Adapter(AdapterError::Auth(message))) => {
                    handle.disable();
                    outcome.stop = Some(LaneStop::Disabled(format!(
                        "authentication rejected ({message}), {DISABLED_AFTER_AUTH}"
                    )));
                    break;
                }
                Some(QueryError::Adapter(AdapterError::RateLimited(message))) => {
                    tracing::warn!(
                        shoe_id,
                        adapter = handle.name(),
                        query = query.as_str(),
                        "rate limited, skipping adapter for this run"
                    );
                    outcome.stop = Some(LaneStop::RateLimited(message));
                    break;
                }
                Some(QueryError::Adapter(err)) => {
                    tracing::warn!(
                        shoe_id,
                        adapter = handle.name(),
                        query = query.as_str(),
                        error = %err,
                        "query failed"
                    );
                    outcome.failures.push(err.to_string());
                }
            }
        }

        tracing::debug!(
            shoe_id,
            adapter = outcome.adapter,
            items = outcome.items.len(),
            dropped = outcome.dropped,
            "lane finished"
        );
        outcome
    }

    /// One query with bounded retries on network errors only.
    async fn run_query(
        &self,
        handle: &AdapterHandle,
        query: &str,
        platforms: &[MentionSource],
        cancel: &CancellationToken,
    ) -> QueryOutcome {
        let mut outcome = QueryOutcome::default();
        let mut attempt = 0u32;

        loop {
            let result = self
                .fetch_once(handle, query, platforms, cancel, &mut outcome)
                .await;

            match result {
                Ok(()) => return outcome,
                Err(err) if err == AdapterError::Cancelled || cancel.is_cancelled() => {
                    tracing::debug!(
                        adapter = handle.name(),
                        query,
                        error = %err,
                        "query cut short by cancellation"
                    );
                    outcome.error = Some(QueryError::Cancelled);
                    return outcome;
                }
                Err(err) if err.is_retriable() && attempt < self.policy.max_retries => {
                    attempt += 1;
                    let delay = backoff_delay(self.policy.retry_backoff_base_ms, attempt);
                    tracing::warn!(
                        adapter = handle.name(),
                        query,
                        attempt,
                        max_retries = self.policy.max_retries,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "transient adapter error, retrying after back-off"
                    );
                    if !sleep_or_cancel(delay, cancel).await {
                        outcome.error = Some(QueryError::Cancelled);
                        return outcome;
                    }
                }
                Err(err) => {
                    outcome.error = Some(QueryError::Adapter(err));
                    return outcome;
                }
            }
        }
    }

    /// Drain one `search` stream under the call timeout. Items received
    /// before a timeout or error are kept in `outcome`.
    async fn fetch_once(
        &self,
        handle: &AdapterHandle,
        query: &str,
        platforms: &[MentionSource],
        cancel: &CancellationToken,
        outcome: &mut QueryOutcome,
    ) -> Result<(), AdapterError> {
        let mut stream = handle.search(
            query,
            self.policy.results_per_query,
            platforms,
            cancel.clone(),
        );

        let drain = async {
            while let Some(next) = stream.next().await {
                match next {
                    Ok(item) => outcome.items.push(item),
                    Err(AdapterError::Malformed(reason)) => {
                        outcome.dropped += 1;
                        tracing::debug!(
                            adapter = handle.name(),
                            query,
                            reason = %reason,
                            "dropping malformed item"
                        );
                    }
                    Err(err) => return Err(err),
                }
            }
            Ok(())
        };

        match tokio::time::timeout(self.policy.call_timeout, drain).await {
            Ok(result) => result,
            Err(_) => Err(AdapterError::Network(format!(
                "call timed out after {}s",
                self.policy.call_timeout.as_secs()
            ))),
        }
    }

    async fn persist(&self, candidates: &[MentionCandidate]) -> PersistTally {
        let mut tally = PersistTally::default();

        for candidate in candidates {
            match self.store.upsert(candidate).await {
                Ok(UpsertOutcome::Inserted) => tally.inserted += 1,
                Ok(UpsertOutcome::Updated) => tally.updated += 1,
                Ok(UpsertOutcome::Unchanged) => tally.unchanged += 1,
                Err(e) => {
                    if let PersistenceError::ConstraintViolation { constraint, .. } = &e {
                        tracing::error!(
                            shoe_id = candidate.shoe_id,
                            source = %candidate.source(),
                            identity_key = %candidate.identity.key,
                            constraint = %constraint,
                            error = %e,
                            "unexpected constraint violation while persisting mention"
                        );
                    } else {
                        tracing::warn!(
                            shoe_id = candidate.shoe_id,
                            source = %candidate.source(),
                            error = %e,
                            "failed to persist mention"
                        );
                    }
                    tally.failed += 1;
                    tally.first_error.get_or_insert_with(|| e.to_string());
                }
            }
        }

        tally
    }
}

fn distinct(kinds: &[SourceKind]) -> Vec<SourceKind> {
    let mut out = Vec::with_capacity(kinds.len());
    for &kind in kinds {
        if !out.contains(&kind) {
            out.push(kind);
        }
    }
    out
}

fn failed_entries(shoe_id: i64, kinds: &[SourceKind], reason: &str) -> Vec<RunReportEntry> {
    distinct(kinds)
        .into_iter()
        .map(|kind| RunReportEntry::failed(shoe_id, kind, reason))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lane(adapter: &'static str, items: usize, stop: Option<LaneStop>) -> LaneOutcome {
        let mut outcome = LaneOutcome::new(adapter);
        outcome.items = (0..items)
            .map(|n| RawItem {
                source: MentionSource::SocialX,
                external_id: Some(n.to_string()),
                title: String::new(),
                author: String::new(),
                url: format!("https://x.com/a/status/{n}"),
                published_at: None,
                fetched_at: Utc::now(),
            })
            .collect();
        outcome.stop = stop;
        outcome
    }

    #[test]
    fn clean_lanes_are_ok() {
        let (status, error) = kind_status(&[lane("youtube", 3, None)]);
        assert_eq!(status, RunStatus::Ok);
        assert!(error.is_none());
    }

    #[test]
    fn one_rate_limited_lane_beside_a_clean_one_is_partial() {
        let (status, error) = kind_status(&[
            lane("x", 2, None),
            lane("web_search", 0, Some(LaneStop::RateLimited("429".into()))),
        ]);
        assert_eq!(status, RunStatus::Partial);
        assert!(error.unwrap().starts_with("web_search: rate limited"));
    }

    #[test]
    fn all_lanes_unavailable_is_skipped() {
        let (status, _) = kind_status(&[
            lane("x", 0, Some(LaneStop::Disabled(DISABLED_AFTER_AUTH.into()))),
            lane("web_search", 0, Some(LaneStop::RateLimited("quota".into()))),
        ]);
        assert_eq!(status, RunStatus::Skipped);
    }

    #[test]
    fn network_failure_without_items_is_failed() {
        let mut failed = lane("youtube", 0, None);
        failed.failures.push("network error: reset".into());
        let (status, error) = kind_status(&[failed]);
        assert_eq!(status, RunStatus::Failed);
        assert_eq!(error.as_deref(), Some("youtube: network error: reset"));
    }

    #[test]
    fn rate_limit_after_some_items_is_partial() {
        let (status, _) = kind_status(&[lane(
            "youtube",
            2,
            Some(LaneStop::RateLimited("quota".into())),
        )]);
        assert_eq!(status, RunStatus::Partial);
    }

    #[test]
    fn cancelled_lane_marks_kind_skipped_for_deadline() {
        let (status, error) = kind_status(&[
            lane("youtube", 1, None),
            lane("web_search", 1, Some(LaneStop::Cancelled)),
        ]);
        assert_eq!(status, RunStatus::Skipped);
        assert_eq!(error.as_deref(), Some(DEADLINE_EXCEEDED));
    }

    #[test]
    fn distinct_keeps_first_occurrence_order() {
        assert_eq!(
            distinct(&[SourceKind::Social, SourceKind::Video, SourceKind::Social]),
            vec![SourceKind::Social, SourceKind::Video]
        );
    }

    #[test]
    fn policy_from_app_config_converts_units() {
        let config = AppConfig {
            database_url: "postgres://example".into(),
            env: shoerev_core::Environment::Test,
            log_level: "info".into(),
            shoes_path: "./config/shoes.yaml".into(),
            db_max_connections: 10,
            db_min_connections: 1,
            db_acquire_timeout_secs: 10,
            http_timeout_secs: 30,
            user_agent: "ua".into(),
            max_concurrent_shoes: 4,
            max_concurrent_sources: 3,
            inter_request_delay_ms: 250,
            max_retries: 2,
            retry_backoff_base_ms: 100,
            call_timeout_secs: 15,
            run_deadline_secs: 90,
            results_per_query: 20,
            youtube_api_key: None,
            serper_api_key: None,
            reddit_client_id: None,
            reddit_client_secret: None,
            reddit_user_agent: "ua".into(),
            twitter_bearer_token: None,
        };
        let policy = CollectPolicy::from_app_config(&config);
        assert_eq!(policy.max_concurrent_shoes, 4);
        assert_eq!(policy.call_timeout, Duration::from_secs(15));
        assert_eq!(policy.run_deadline, Duration::from_secs(90));
        assert_eq!(policy.results_per_query, 20);
    }
}
