//! URL utilities: normalization for dedup identity, host extraction and
//! blocked-domain matching.

use std::collections::BTreeSet;
use url::Url;

/// Query parameters stripped during normalization
const TRACKING_PARAMS: &[&str] = &[
    "fbclid",
    "gclid",
    "msclkid",
    "yclid",
    "dclid",
    "igshid",
    "mc_cid",
    "mc_eid",
    "_hsenc",
    "_hsmi",
    "ref",
    "ref_src",
    "si",
];

fn is_tracking_param(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    key.starts_with("utm_") || TRACKING_PARAMS.contains(&key.as_str())
}

/// Normalize a URL into its dedup identity
///
/// Keeps scheme, lowercase host, non-default port and path; drops the
/// fragment and tracking parameters; sorts what remains of the query; removes
/// a trailing slash unless the path is the root.
///
/// Unparseable input is returned trimmed and lowercased so that it still
/// dedups against itself.
#[must_use]
pub fn normalize_url(raw: &str) -> String {
    let Ok(mut parsed) = Url::parse(raw.trim()) else {
        return raw.trim().to_lowercase();
    };

    parsed.set_fragment(None);

    let mut params: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    params.sort();

    if params.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(params);
    }

    let path = parsed.path().to_string();
    if path.len() > 1 && path.ends_with('/') {
        parsed.set_path(path.trim_end_matches('/'));
    }

    // Url already lowercases the host and drops default ports
    let mut normalized = parsed.to_string();
    if parsed.query().is_none() && normalized.ends_with('/') && parsed.path() == "/" {
        normalized.pop();
    }
    normalized
}

/// Extract the lowercase host of a URL without a leading `www.`
#[must_use]
pub fn extract_host(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    Some(host.strip_prefix("www.").map(str::to_string).unwrap_or(host))
}

/// Check if a URL is a scrapeable http(s) URL
#[must_use]
pub fn is_valid_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }

    if url.starts_with("data:") || url.starts_with("javascript:") || url.starts_with("mailto:") {
        return false;
    }

    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some(),
        Err(_) => false,
    }
}

/// The static blocked-domain set
///
/// Shared by the search orchestrator (pre-scrape) and the quality filter
/// (post-scrape).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockedDomains {
    hosts: BTreeSet<String>,
    path_prefixes: Vec<String>,
    tld_suffixes: Vec<String>,
}

impl BlockedDomains {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut blocked = Self::default();
        for entry in entries {
            blocked.insert(entry.as_ref());
        }
        blocked
    }

    /// Add one entry; blank entries are ignored
    pub fn insert(&mut self, entry: &str) {
        let entry = entry.trim().to_ascii_lowercase();
        if entry.is_empty() {
            return;
        }
        if entry.starts_with('.') {
            self.tld_suffixes.push(entry);
        } else if entry.contains('/') {
            self.path_prefixes.push(entry);
        } else {
            let host = entry.strip_prefix("www.").unwrap_or(&entry).to_string();
            self.hosts.insert(host);
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.hosts.len() + self.path_prefixes.len() + self.tld_suffixes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a host (not URL) is blocked
    #[must_use]
    pub fn is_blocked_host(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);

        if self.tld_suffixes.iter().any(|tld| host.ends_with(tld.as_str())) {
            return true;
        }

        // Walk up the labels so subdomains of a blocked host match too
        let mut candidate = host;
        loop {
            if self.hosts.contains(candidate) {
                return true;
            }
            match candidate.split_once('.') {
                Some((_, rest)) if rest.contains('.') || self.hosts.contains(rest) => {
                    candidate = rest;
                }
                _ => return false,
            }
        }
    }

    /// Whether a full URL is blocked by host or host+path prefix
    #[must_use]
    pub fn is_blocked_url(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url.trim()) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };

        if self.is_blocked_host(host) {
            return true;
        }

        if self.path_prefixes.is_empty() {
            return false;
        }
        let host = host.to_ascii_lowercase();
        let host = host.strip_prefix("www.").unwrap_or(&host);
        let host_path = format!("{host}{}", parsed.path().to_ascii_lowercase());
        self.path_prefixes
            .iter()
            .any(|prefix| host_path.starts_with(prefix.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_fragment_and_trailing_slash() {
        assert_eq!(
            normalize_url("https://Example.com/docs/#intro"),
            "https://example.com/docs"
        );
        assert_eq!(normalize_url("https://example.com/"), "https://example.com");
    }

    #[test]
    fn test_normalize_strips_tracking_and_sorts_query() {
        let a = normalize_url("https://example.com/a?b=2&utm_source=x&a=1&fbclid=zz");
        let b = normalize_url("https://example.com/a?a=1&b=2");
        assert_eq!(a, b);
        assert_eq!(a, "https://example.com/a?a=1&b=2");
    }

    #[test]
    fn test_normalize_keeps_meaningful_query() {
        assert_ne!(
            normalize_url("https://example.com/item?id=1"),
            normalize_url("https://example.com/item?id=2")
        );
    }

    #[test]
    fn test_normalize_drops_default_port() {
        assert_eq!(
            normalize_url("https://example.com:443/path"),
            "https://example.com/path"
        );
    }

    #[test]
    fn test_extract_host() {
        assert_eq!(extract_host("https://www.Example.com/x"), Some("example.com".into()));
        assert_eq!(extract_host("https://sub.example.com"), Some("sub.example.com".into()));
        assert_eq!(extract_host("not a url"), None);
    }

    #[test]
    fn test_is_valid_url() {
        assert!(is_valid_url("https://example.com"));
        assert!(!is_valid_url("javascript:void(0)"));
        assert!(!is_valid_url("ftp://example.com"));
        assert!(!is_valid_url(""));
    }

    #[test]
    fn test_blocked_matches_subdomains() {
        let blocked = BlockedDomains::new(["reddit.com", "x.com"]);
        assert!(blocked.is_blocked_url("https://www.reddit.com/r/rust"));
        assert!(blocked.is_blocked_url("https://old.reddit.com/r/rust"));
        assert!(blocked.is_blocked_url("https://x.com/someone"));
        assert!(!blocked.is_blocked_url("https://notreddit.com/"));
        assert!(!blocked.is_blocked_url("https://box.com/"));
    }

    #[test]
    fn test_blocked_path_prefix_and_tld() {
        let blocked = BlockedDomains::new(["mastodon.social/@", ".cn"]);
        assert!(blocked.is_blocked_url("https://mastodon.social/@alice"));
        assert!(!blocked.is_blocked_url("https://mastodon.social/about"));
        assert!(blocked.is_blocked_url("https://news.example.cn/a"));
        assert!(!blocked.is_blocked_url("https://example.com/cn"));
    }
}
