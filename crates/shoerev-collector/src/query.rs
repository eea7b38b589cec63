//! Query Resolver: shoe identity to a small set of search strings.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use shoerev_core::{Shoe, SourceKind};
use thiserror::Error;

static TRAILING_PARENS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*[\(\[（【][^\)\]）】]*[\)\]）】]\s*$").expect("valid regex"));

/// Marketing tails removed from model names, longest first.
const MARKETING_SUFFIXES: &[&str] = &[
    "running shoes",
    "running shoe",
    "shoes",
    "shoe",
    "men's",
    "mens",
    "women's",
    "womens",
    "unisex",
    "new",
];

/// Japanese brand spellings used in local reviews.
const BRAND_ALIASES: &[(&str, &str)] = &[
    ("nike", "ナイキ"),
    ("asics", "アシックス"),
    ("adidas", "アディダス"),
    ("new balance", "ニューバランス"),
    ("hoka", "ホカ"),
    ("mizuno", "ミズノ"),
    ("brooks", "ブルックス"),
    ("saucony", "サッカニー"),
    ("on", "オン"),
    ("puma", "プーマ"),
    ("altra", "アルトラ"),
];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("shoe {shoe_id} has no usable model name")]
    MissingModel { shoe_id: i64 },
}

/// Search strings for one shoe, per source kind. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceQuery {
    pub shoe_id: i64,
    pub video: Vec<String>,
    pub social: Vec<String>,
}

impl SourceQuery {
    #[must_use]
    pub fn for_kind(&self, kind: SourceKind) -> &[String] {
        match kind {
            SourceKind::Video => &self.video,
            SourceKind::Social => &self.social,
        }
    }
}

/// Build deduplicated queries for `shoe`.
///
/// # Errors
///
/// Returns [`ResolutionError::MissingModel`] when nothing is left of the model
/// name after cleaning, since no meaningful query can be formed.
pub fn resolve_queries(shoe: &Shoe) -> Result<SourceQuery, ResolutionError> {
    let brand = collapse_whitespace(&shoe.brand);
    let mut model = strip_marketing_suffixes(&collapse_whitespace(&shoe.model_name));

    // "Nike Nike Pegasus 41" helps no one.
    if !brand.is_empty() {
        let prefix = format!("{} ", brand.to_lowercase());
        if model.to_lowercase().starts_with(&prefix) {
            if let Some(rest) = model.get(prefix.len()..) {
                model = rest.trim().to_string();
            }
        }
    }
    if model.is_empty() {
        return Err(ResolutionError::MissingModel { shoe_id: shoe.id });
    }

    let name = if brand.is_empty() {
        model.clone()
    } else {
        format!("{brand} {model}")
    };

    let mut video = vec![
        format!("{name} review"),
        format!("{name} レビュー"),
        format!("{name} 履いてみた"),
    ];
    if let Some(jp_brand) = brand_alias(&brand) {
        video.push(format!("{jp_brand} {model} レビュー"));
    }
    for alias in &shoe.aliases {
        let alias = collapse_whitespace(alias);
        if !alias.is_empty() {
            video.push(format!("{alias} レビュー"));
        }
    }

    let social = vec![format!("{name} review"), format!("{name} レビュー")];

    Ok(SourceQuery {
        shoe_id: shoe.id,
        video: dedup_case_insensitive(video),
        social: dedup_case_insensitive(social),
    })
}

fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn strip_marketing_suffixes(model: &str) -> String {
    let mut current = model.to_string();
    loop {
        let before = current.len();

        current = TRAILING_PARENS_RE.replace(&current, "").into_owned();
        current = current
            .trim_end_matches(|c: char| c.is_whitespace() || matches!(c, '-' | '|' | '/' | ','))
            .to_string();

        let lower = current.to_lowercase();
        for suffix in MARKETING_SUFFIXES {
            let Some(head) = lower.strip_suffix(suffix) else {
                continue;
            };
            if head.is_empty() || head.ends_with(' ') {
                if let Some(keep) = current
                    .len()
                    .checked_sub(suffix.len())
                    .filter(|&k| current.is_char_boundary(k))
                {
                    current.truncate(keep);
                }
                break;
            }
        }

        current = current.trim_end().to_string();
        if current.len() == before {
            return current;
        }
    }
}

fn brand_alias(brand: &str) -> Option<&'static str> {
    let lower = brand.to_lowercase();
    BRAND_ALIASES
        .iter()
        .find(|(en, _)| *en == lower)
        .map(|(_, jp)| *jp)
}

fn dedup_case_insensitive(queries: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    queries
        .into_iter()
        .filter(|q| seen.insert(q.to_lowercase()))
        .collect()
}
