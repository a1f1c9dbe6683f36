//! Per-engine result extraction
//!
//! An engine is reduced to two things: where to send the query and how to pull
//! `{url, title}` pairs out of the result page. The orchestrator only ever
//! sees [`ResultExtractor`], so engines can be added or removed without
//! touching fallback logic.

use std::collections::HashSet;

use scraper::{Html, Selector};
use url::Url;

use crate::types::Candidate;
use crate::utils::{extract_host, is_valid_url};

/// Phrases engines show instead of results when they suspect automation
const BLOCK_MARKERS: &[&str] = &[
    "captcha",
    "unusual traffic",
    "are you a robot",
    "not a robot",
    "verify you are human",
];

/// Parses one engine's result page
pub trait ResultExtractor: Send + Sync {
    /// Lowercase engine name used in config and the composite engine string
    fn name(&self) -> &'static str;

    /// Result page URL for a query
    fn search_url(&self, query: &str) -> String;

    /// Ordered candidates from the result page HTML
    fn extract_candidates(&self, html: &str) -> Vec<Candidate>;

    /// Reason the page is a block/CAPTCHA interstitial, if it is one
    fn blocked_reason(&self, html: &str) -> Option<String> {
        detect_block_page(html)
    }
}

/// Detect a CAPTCHA or bot-wall page by its visible text
#[must_use]
pub fn detect_block_page(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let text = document
        .root_element()
        .text()
        .collect::<String>()
        .to_lowercase();
    // A real result page may mention these words in a snippet; interstitials are short
    if text.split_whitespace().count() > 400 {
        return None;
    }
    BLOCK_MARKERS
        .iter()
        .find(|marker| text.contains(*marker))
        .map(|marker| format!("page contains '{marker}'"))
}

/// How an engine wraps outbound links
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkStyle {
    /// `href` is the target
    Direct,
    /// Target is URL-encoded in an `/RU=` path segment (Yahoo)
    RuSegment,
}

/// Engine described by data: query URL plus CSS selectors tried in order
///
/// Links pointing back to the engine's own hosts are dropped, and only the
/// first link per host is kept so one site cannot crowd out the rest.
#[derive(Debug, Clone)]
pub struct SelectorEngine {
    pub name: &'static str,
    pub base_url: &'static str,
    pub query_param: &'static str,
    pub extra_params: &'static [(&'static str, &'static str)],
    pub selectors: &'static [&'static str],
    /// Host fragments identifying the engine's own links
    pub self_hosts: &'static [&'static str],
    pub link_style: LinkStyle,
}

impl SelectorEngine {
    fn resolve(&self, base: Option<&Url>, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') {
            return None;
        }
        let absolute = match Url::parse(href) {
            Ok(url) => url,
            Err(_) => base?.join(href).ok()?,
        };

        let target = match self.link_style {
            LinkStyle::Direct => absolute.to_string(),
            LinkStyle::RuSegment => unwrap_ru_segment(&absolute).unwrap_or_else(|| absolute.to_string()),
        };

        is_valid_url(&target).then_some(target)
    }

    fn is_self_link(&self, host: &str) -> bool {
        self.self_hosts.iter().any(|own| host.contains(own))
    }
}

/// Decode `https://r.search.yahoo.com/.../RU=<encoded>/RK=...`
fn unwrap_ru_segment(url: &Url) -> Option<String> {
    let path = url.path();
    let start = path.find("/RU=")? + "/RU=".len();
    let rest = &path[start..];
    let end = rest.find('/').unwrap_or(rest.len());
    urlencoding::decode(&rest[..end])
        .ok()
        .map(|decoded| decoded.into_owned())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl ResultExtractor for SelectorEngine {
    fn name(&self) -> &'static str {
        self.name
    }

    fn search_url(&self, query: &str) -> String {
        match Url::parse(self.base_url) {
            Ok(mut url) => {
                {
                    let mut pairs = url.query_pairs_mut();
                    pairs.append_pair(self.query_param, query);
                    for (key, value) in self.extra_params {
                        pairs.append_pair(key, value);
                    }
                }
                url.to_string()
            }
            Err(_) => format!(
                "{}?{}={}",
                self.base_url,
                self.query_param,
                urlencoding::encode(query)
            ),
        }
    }

    fn extract_candidates(&self, html: &str) -> Vec<Candidate> {
        let document = Html::parse_document(html);
        let base = Url::parse(self.base_url).ok();

        let mut candidates = Vec::new();
        let mut seen_urls: HashSet<String> = HashSet::new();
        let mut seen_hosts: HashSet<String> = HashSet::new();

        for raw in self.selectors {
            let selector = match Selector::parse(raw) {
                Ok(selector) => selector,
                Err(e) => {
                    log::warn!("{}: invalid selector '{}': {:?}", self.name, raw, e);
                    continue;
                }
            };

            for element in document.select(&selector) {
                let Some(href) = element.value().attr("href") else {
                    continue;
                };
                let Some(url) = self.resolve(base.as_ref(), href) else {
                    continue;
                };
                let Some(host) = extract_host(&url) else {
                    continue;
                };
                if self.is_self_link(&host) || seen_hosts.contains(&host) || seen_urls.contains(&url) {
                    continue;
                }

                let mut title = collapse_whitespace(&element.text().collect::<String>());
                if title.is_empty() {
                    title = element.value().attr("title").map(collapse_whitespace).unwrap_or_default();
                }

                seen_hosts.insert(host);
                seen_urls.insert(url.clone());
                candidates.push(Candidate::new(url, title));
            }
        }

        log::debug!("{}: extracted {} candidates", self.name, candidates.len());
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_ENGINE: SelectorEngine = SelectorEngine {
        name: "test",
        base_url: "https://search.test/find",
        query_param: "q",
        extra_params: &[("lang", "en")],
        selectors: &["div.result a.title", "a.fallback"],
        self_hosts: &["search.test"],
        link_style: LinkStyle::Direct,
    };

    #[test]
    fn test_search_url_encodes_query() {
        let url = TEST_ENGINE.search_url("rust & tokio");
        assert_eq!(url, "https://search.test/find?q=rust+%26+tokio&lang=en");
    }

    #[test]
    fn test_extracts_in_selector_order_with_host_diversity() {
        let html = r#"
            <div class="result"><a class="title" href="https://a.com/1">  First
               result </a></div>
            <div class="result"><a class="title" href="https://a.com/2">Same host</a></div>
            <div class="result"><a class="title" href="/internal">Relative self link</a></div>
            <div class="result"><a class="title" href="https://b.org/x">Second</a></div>
            <a class="fallback" href="https://c.net/">Third</a>
            <a class="fallback" href="javascript:void(0)">Bad</a>
        "#;
        let candidates = TEST_ENGINE.extract_candidates(html);
        let urls: Vec<_> = candidates.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, ["https://a.com/1", "https://b.org/x", "https://c.net/"]);
        assert_eq!(candidates[0].title, "First result");
    }

    #[test]
    fn test_unwraps_ru_segment() {
        let engine = SelectorEngine {
            link_style: LinkStyle::RuSegment,
            self_hosts: &["yahoo."],
            ..TEST_ENGINE
        };
        let html = r#"<div class="result"><a class="title"
            href="https://r.search.yahoo.com/_ylt=abc/RV=2/RE=1/RO=10/RU=https%3a%2f%2fexample.com%2fpage/RK=2/RS=x-">Ex</a></div>"#;
        let candidates = engine.extract_candidates(html);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].url, "https://example.com/page");
    }

    #[test]
    fn test_detects_captcha_interstitial() {
        let html = "<html><body><h1>Please solve this CAPTCHA to continue</h1></body></html>";
        assert!(detect_block_page(html).is_some());
        assert!(detect_block_page("<html><body>Results for rust</body></html>").is_none());
    }
}
