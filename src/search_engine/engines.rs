//! Built-in search engines
//!
//! Selectors are ordered from most to least specific; the trailing generic
//! `a[href^="http"]` catches layout changes at the cost of some noise, which
//! the self-host filter and the blocked-domain filter absorb.

use std::sync::Arc;

use super::extractor::{LinkStyle, ResultExtractor, SelectorEngine};

pub const BRAVE: SelectorEngine = SelectorEngine {
    name: "brave",
    base_url: "https://search.brave.com/search",
    query_param: "q",
    extra_params: &[("lang", "en")],
    selectors: &[
        r#"div.snippet a[href^="http"]"#,
        "div#results a.result-header",
        "a.snippet-url",
        r#"div#results a[href^="http"]"#,
    ],
    self_hosts: &["brave.com"],
    link_style: LinkStyle::Direct,
};

pub const STARTPAGE: SelectorEngine = SelectorEngine {
    name: "startpage",
    base_url: "https://www.startpage.com/do/search",
    query_param: "q",
    extra_params: &[],
    selectors: &["a.w-gl__result-url", "a.w-gl__result-title", r#"a[href^="http"]"#],
    self_hosts: &["startpage.com", "startmail.com"],
    link_style: LinkStyle::Direct,
};

pub const YAHOO: SelectorEngine = SelectorEngine {
    name: "yahoo",
    base_url: "https://search.yahoo.com/search",
    query_param: "p",
    extra_params: &[],
    selectors: &["div.dd.algo a", "h3.title a", "div.compTitle a", r#"a[href^="http"]"#],
    self_hosts: &["yahoo.com", "yimg.com", "bing.com"],
    link_style: LinkStyle::RuSegment,
};

pub const YANDEX: SelectorEngine = SelectorEngine {
    name: "yandex",
    base_url: "https://yandex.com/search/",
    query_param: "text",
    extra_params: &[("lang", "en")],
    selectors: &["li.serp-item a.Link", "div.OrganicTitle a", r#"a[href^="http"]"#],
    self_hosts: &["yandex.", "ya.ru", "yastatic.net"],
    link_style: LinkStyle::Direct,
};

const ALL: &[&SelectorEngine] = &[&BRAVE, &STARTPAGE, &YAHOO, &YANDEX];

/// Whether a configured engine name is built in
#[must_use]
pub fn is_known_engine(name: &str) -> bool {
    ALL.iter().any(|engine| engine.name.eq_ignore_ascii_case(name.trim()))
}

/// Look up a built-in engine by name
#[must_use]
pub fn engine_by_name(name: &str) -> Option<Arc<dyn ResultExtractor>> {
    ALL.iter()
        .find(|engine| engine.name.eq_ignore_ascii_case(name.trim()))
        .map(|engine| Arc::new((*engine).clone()) as Arc<dyn ResultExtractor>)
}

/// Engines in the given order, skipping unknown names
pub fn engines_in_order<I, S>(names: I) -> Vec<Arc<dyn ResultExtractor>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .filter_map(|name| {
            let engine = engine_by_name(name.as_ref());
            if engine.is_none() {
                log::warn!("Skipping unknown search engine '{}'", name.as_ref());
            }
            engine
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_engines() {
        for name in ["brave", "Startpage", " yahoo ", "yandex"] {
            assert!(is_known_engine(name), "{name}");
        }
        assert!(!is_known_engine("altavista"));
    }

    #[test]
    fn test_engines_in_order_keeps_order_and_skips_unknown() {
        let engines = engines_in_order(["yandex", "nope", "brave"]);
        let names: Vec<_> = engines.iter().map(|e| e.name()).collect();
        assert_eq!(names, ["yandex", "brave"]);
    }

    #[test]
    fn test_search_urls() {
        assert_eq!(
            BRAVE.search_url("rust async"),
            "https://search.brave.com/search?q=rust+async&lang=en"
        );
        assert_eq!(
            YAHOO.search_url("rust"),
            "https://search.yahoo.com/search?p=rust"
        );
        assert_eq!(
            YANDEX.search_url("rust"),
            "https://yandex.com/search/?text=rust&lang=en"
        );
    }

    #[test]
    fn test_brave_fixture() {
        let html = r#"
            <html><body><div id="results">
              <div class="snippet"><a href="https://doc.rust-lang.org/book/">The Rust Book</a></div>
              <div class="snippet"><a href="https://tokio.rs/">Tokio</a></div>
              <div class="snippet"><a href="https://search.brave.com/settings">Settings</a></div>
            </div></body></html>
        "#;
        let candidates = BRAVE.extract_candidates(html);
        let urls: Vec<_> = candidates.iter().map(|c| c.url.as_str()).collect();
        assert_eq!(urls, ["https://doc.rust-lang.org/book/", "https://tokio.rs/"]);
        assert_eq!(candidates[1].title, "Tokio");
    }

    #[test]
    fn test_yandex_drops_own_links() {
        let html = r#"
            <ul>
              <li class="serp-item"><a class="Link" href="https://yandex.com/images">Images</a></li>
              <li class="serp-item"><a class="Link" href="https://www.rust-lang.org/">Rust</a></li>
              <li class="serp-item"><a class="Link" href="https://ya.ru/">Ya</a></li>
            </ul>
        "#;
        let candidates = YANDEX.extract_candidates(html);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].url, "https://www.rust-lang.org/");
    }

    #[test]
    fn test_yahoo_unwraps_redirects() {
        let html = r#"
            <div class="dd algo"><h3 class="title">
              <a href="https://r.search.yahoo.com/_ylt=A/RV=2/RE=1/RO=10/RU=https%3a%2f%2fcrates.io%2f/RK=2/RS=abc-">crates.io</a>
            </h3></div>
        "#;
        let candidates = YAHOO.extract_candidates(html);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].url, "https://crates.io/");
    }
}
