//! Source kinds, raw adapter output, and the canonical mention candidate.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// The origin platform of one persisted mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentionSource {
    Video,
    SocialX,
    SocialReddit,
}

impl MentionSource {
    pub const ALL: [MentionSource; 3] = [
        MentionSource::Video,
        MentionSource::SocialX,
        MentionSource::SocialReddit,
    ];

    /// Storage representation, matching the `mentions.source` check constraint.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            MentionSource::Video => "video",
            MentionSource::SocialX => "social_x",
            MentionSource::SocialReddit => "social_reddit",
        }
    }

    /// Inverse of [`MentionSource::as_str`].
    #[must_use]
    pub fn from_storage(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == value)
    }

    /// The requestable kind this platform belongs to.
    #[must_use]
    pub fn kind(self) -> SourceKind {
        match self {
            MentionSource::Video => SourceKind::Video,
            MentionSource::SocialX | MentionSource::SocialReddit => SourceKind::Social,
        }
    }
}

impl std::fmt::Display for MentionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A kind of source a caller can ask the collector for.
///
/// `Social` covers both social platforms; each platform is served by its
/// native adapter when credentials exist, otherwise by web search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Video,
    Social,
}

impl SourceKind {
    pub const ALL: [SourceKind; 2] = [SourceKind::Video, SourceKind::Social];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Video => "video",
            SourceKind::Social => "social",
        }
    }

    /// Platforms whose mentions count towards this kind.
    #[must_use]
    pub fn platforms(self) -> &'static [MentionSource] {
        match self {
            SourceKind::Video => &[MentionSource::Video],
            SourceKind::Social => &[MentionSource::SocialX, MentionSource::SocialReddit],
        }
    }

    /// Parse a comma-separated list such as `"youtube,social"`, dropping duplicates.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UnknownSourceKind`] for any unrecognised entry.
    pub fn parse_list(input: &str) -> Result<Vec<SourceKind>, CoreError> {
        let mut kinds = Vec::new();
        for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let kind = part.parse::<SourceKind>()?;
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        Ok(kinds)
    }
}

impl FromStr for SourceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" | "youtube" => Ok(SourceKind::Video),
            "social" | "sns" => Ok(SourceKind::Social),
            other => Err(CoreError::UnknownSourceKind(other.to_string())),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One search hit as returned by a source adapter, before normalization.
///
/// Carries no body text: only title, author and URL are ever kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawItem {
    pub source: MentionSource,
    pub external_id: Option<String>,
    pub title: String,
    pub author: String,
    pub url: String,
    pub published_at: Option<DateTime<Utc>>,
    pub fetched_at: DateTime<Utc>,
}

/// Deduplication key for a mention: `(source, external id)` when the platform
/// exposes one, otherwise `(source, normalized url)`.
///
/// `key` is already in storage form (`ext:<id>` or `url:<digest>`), so it can
/// be bound directly against the `mentions.identity_key` column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey {
    pub source: MentionSource,
    pub key: String,
}

/// A normalized, deduplicated mention ready for the persistence gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionCandidate {
    pub shoe_id: i64,
    pub identity: IdentityKey,
    pub external_id: Option<String>,
    pub url: String,
    pub title: String,
    pub author: String,
    pub published_at: Option<DateTime<Utc>>,
    pub collected_at: DateTime<Utc>,
}

impl MentionCandidate {
    #[must_use]
    pub fn source(&self) -> MentionSource {
        self.identity.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_kind_accepts_legacy_aliases() {
        assert_eq!("youtube".parse::<SourceKind>().unwrap(), SourceKind::Video);
        assert_eq!("SNS".parse::<SourceKind>().unwrap(), SourceKind::Social);
        assert!("tiktok".parse::<SourceKind>().is_err());
    }

    #[test]
    fn parse_list_dedups_and_keeps_order() {
        let kinds = SourceKind::parse_list("social, youtube,video,,social").unwrap();
        assert_eq!(kinds, vec![SourceKind::Social, SourceKind::Video]);
    }

    #[test]
    fn mention_source_round_trips_storage_form() {
        for source in MentionSource::ALL {
            assert_eq!(MentionSource::from_storage(source.as_str()), Some(source));
        }
        assert_eq!(MentionSource::from_storage("twitter"), None);
    }

    #[test]
    fn social_platforms_belong_to_social_kind() {
        assert_eq!(MentionSource::SocialX.kind(), SourceKind::Social);
        assert_eq!(MentionSource::SocialReddit.kind(), SourceKind::Social);
        assert_eq!(MentionSource::Video.kind(), SourceKind::Video);
        assert_eq!(SourceKind::Social.platforms().len(), 2);
    }
}
