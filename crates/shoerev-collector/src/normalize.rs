//! Normalizer/Deduplicator: raw adapter output to mention candidates.
//!
//! Identity is `(source, external id)` when the platform supplies an id,
//! otherwise `(source, normalized url)`. Within one run, candidates sharing
//! an identity collapse to one; across runs the store's unique key does the
//! same job.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use shoerev_core::{IdentityKey, MentionCandidate, RawItem};
use url::Url;

/// Query parameters that only carry share or campaign tracking.
const TRACKING_PARAMS: &[&str] = &[
    "s",
    "t",
    "si",
    "ref",
    "ref_src",
    "ref_url",
    "fbclid",
    "gclid",
    "igshid",
    "feature",
    "share_id",
];

fn is_tracking_param(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.starts_with("utm_") || TRACKING_PARAMS.contains(&lower.as_str())
}

/// Canonical form of a mention URL: lower-cased host, no fragment, no
/// tracking parameters, no trailing slash. Unparseable input is only trimmed.
#[must_use]
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    let Ok(mut url) = Url::parse(trimmed) else {
        return trimmed.to_string();
    };

    // Hosts of http(s) URLs are already lower-cased by the parser.
    url.set_fragment(None);

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(name, _)| !is_tracking_param(name))
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect();
    if kept.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(kept);
    }

    let path = url.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        url.set_path(path.trim_end_matches('/'));
    }

    url.to_string()
}

/// Identity key for a raw item whose URL has already been normalized.
#[must_use]
pub fn identity_key(item: &RawItem, normalized_url: &str) -> IdentityKey {
    let key = match item
        .external_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
    {
        Some(id) => format!("ext:{id}"),
        None => {
            let digest = Sha256::digest(normalized_url.as_bytes());
            let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
            format!("url:{hex}")
        }
    };

    IdentityKey {
        source: item.source,
        key,
    }
}

/// Convert and deduplicate one run's raw items for `shoe_id`.
///
/// Output keeps first-seen order; for duplicates the most recently seen
/// title and author win, and a missing publish time is filled in when a
/// later duplicate carries one.
#[must_use]
pub fn normalize_items(
    shoe_id: i64,
    items: Vec<RawItem>,
    collected_at: DateTime<Utc>,
) -> Vec<MentionCandidate> {
    let mut order: Vec<MentionCandidate> = Vec::with_capacity(items.len());
    let mut index: HashMap<IdentityKey, usize> = HashMap::with_capacity(items.len());

    for item in items {
        let url = normalize_url(&item.url);
        let identity = identity_key(&item, &url);

        if let Some(&pos) = index.get(&identity) {
            let existing = &mut order[pos];
            existing.title = item.title;
            existing.author = item.author;
            if existing.published_at.is_none() {
                existing.published_at = item.published_at;
            }
            continue;
        }

        index.insert(identity.clone(), order.len());
        order.push(MentionCandidate {
            shoe_id,
            identity,
            external_id: item
                .external_id
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
            url,
            title: item.title.trim().to_string(),
            author: item.author.trim().to_string(),
            published_at: item.published_at,
            collected_at,
        });
    }

    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoerev_core::MentionSource;

    fn raw(source: MentionSource, id: Option<&str>, url: &str, title: &str) -> RawItem {
        RawItem {
            source,
            external_id: id.map(str::to_string),
            title: title.to_string(),
            author: "author".to_string(),
            url: url.to_string(),
            published_at: None,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn share_parameter_does_not_change_identity() {
        let a = raw(MentionSource::SocialX, None, "https://x.com/user/status/123?s=20", "t");
        let b = raw(MentionSource::SocialX, None, "https://x.com/user/status/123", "t");
        let ka = identity_key(&a, &normalize_url(&a.url));
        let kb = identity_key(&b, &normalize_url(&b.url));
        assert_eq!(ka, kb);
        assert!(ka.key.starts_with("url:"));
        assert_eq!(ka.key.len(), 4 + 64);
    }

    #[test]
    fn normalize_lowercases_host_and_strips_tracking() {
        assert_eq!(
            normalize_url("https://WWW.Reddit.com/r/running/comments/abc/title/?utm_source=share&utm_medium=web#c1"),
            "https://www.reddit.com/r/running/comments/abc/title"
        );
        assert_eq!(
            normalize_url("https://www.youtube.com/watch?v=abc&feature=share&si=xyz"),
            "https://www.youtube.com/watch?v=abc"
        );
        assert_eq!(normalize_url("https://x.com/"), "https://x.com/");
        assert_eq!(normalize_url("  not a url "), "not a url");
    }

    #[test]
    fn normalize_keeps_meaningful_parameters_and_path_case() {
        assert_eq!(
            normalize_url("https://example.com/Review?id=42&ref=home"),
            "https://example.com/Review?id=42"
        );
    }

    #[test]
    fn external_id_takes_precedence_over_url() {
        let a = raw(MentionSource::Video, Some("vid1"), "https://www.youtube.com/watch?v=vid1", "a");
        let b = raw(MentionSource::Video, Some("vid1"), "https://youtu.be/vid1", "b");
        assert_eq!(
            identity_key(&a, &normalize_url(&a.url)),
            identity_key(&b, &normalize_url(&b.url))
        );
        assert_eq!(identity_key(&a, "").key, "ext:vid1");
    }

    #[test]
    fn same_id_on_different_platforms_stays_distinct() {
        let x = raw(MentionSource::SocialX, Some("1"), "https://x.com/a/status/1", "x");
        let r = raw(MentionSource::SocialReddit, Some("1"), "https://reddit.com/r/running/comments/1", "r");
        assert_ne!(identity_key(&x, ""), identity_key(&r, ""));
    }

    #[test]
    fn duplicates_collapse_with_last_title_winning() {
        let items = vec![
            raw(MentionSource::SocialX, Some("1"), "https://x.com/a/status/1?s=20", "first"),
            raw(MentionSource::SocialX, Some("2"), "https://x.com/a/status/2", "other"),
            raw(MentionSource::SocialX, Some("1"), "https://x.com/a/status/1", "second"),
        ];
        let candidates = normalize_items(7, items, Utc::now());

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].identity.key, "ext:1");
        assert_eq!(candidates[0].title, "second");
        assert_eq!(candidates[0].url, "https://x.com/a/status/1");
        assert_eq!(candidates[0].shoe_id, 7);
        assert_eq!(candidates[1].identity.key, "ext:2");
    }

    #[test]
    fn blank_external_id_falls_back_to_url_identity() {
        let item = raw(MentionSource::SocialReddit, Some("  "), "https://reddit.com/r/a/comments/b", "t");
        let candidates = normalize_items(1, vec![item], Utc::now());
        assert!(candidates[0].identity.key.starts_with("url:"));
        assert!(candidates[0].external_id.is_none());
    }
}
