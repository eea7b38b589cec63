//! Classification of web-search result URLs into social platforms.
//!
//! A result counts as a mention only when its path matches the platform's
//! post pattern; profile pages, search pages and subreddit listings do not.

use std::sync::LazyLock;

use regex::Regex;
use shoerev_core::MentionSource;
use url::Url;

static X_STATUS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/([A-Za-z0-9_]{1,15})/status(?:es)?/(\d+)(?:/|$)").expect("valid regex")
});
static REDDIT_POST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/r/([A-Za-z0-9_]{2,21})/comments/([a-z0-9]+)(?:/|$)").expect("valid regex")
});

/// Path segments on X that look like a user name but are site routes.
const X_RESERVED_USERS: &[&str] = &["search", "hashtag", "i", "intent", "home"];

/// A web-search result recognised as a post on one social platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocialLink {
    pub source: MentionSource,
    /// Tweet id or Reddit base36 post id.
    pub external_id: String,
    /// `@user` on X, `r/subreddit` on Reddit.
    pub author: String,
}

/// Classify a result URL by hostname and path.
///
/// Returns `None` for anything that is not a recognisable post URL.
#[must_use]
pub fn classify_social_url(link: &str) -> Option<SocialLink> {
    let url = Url::parse(link).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    let host = host.strip_prefix("mobile.").unwrap_or(host);

    match host {
        "x.com" | "twitter.com" => {
            let caps = X_STATUS_RE.captures(url.path())?;
            let user = &caps[1];
            if X_RESERVED_USERS
                .iter()
                .any(|reserved| reserved.eq_ignore_ascii_case(user))
            {
                return None;
            }
            Some(SocialLink {
                source: MentionSource::SocialX,
                external_id: caps[2].to_string(),
                author: format!("@{user}"),
            })
        }
        "reddit.com" | "old.reddit.com" | "new.reddit.com" | "np.reddit.com" => {
            let caps = REDDIT_POST_RE.captures(url.path())?;
            Some(SocialLink {
                source: MentionSource::SocialReddit,
                external_id: caps[2].to_string(),
                author: format!("r/{}", &caps[1]),
            })
        }
        _ => None,
    }
}
