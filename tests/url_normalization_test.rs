//! Dedup identity properties of URL normalization

use kodegen_tools_searchscrape::normalize_url;
use proptest::prelude::*;

fn host() -> impl Strategy<Value = String> {
    "[a-z]{1,10}\\.(com|org|test|io)"
}

fn path() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z0-9-]{1,8}", 0..4).prop_map(|segments| {
        if segments.is_empty() {
            String::new()
        } else {
            format!("/{}", segments.join("/"))
        }
    })
}

fn params() -> impl Strategy<Value = Vec<(String, String)>> {
    // The `k` prefix keeps generated keys clear of tracking names
    prop::collection::vec(("k[a-z]{0,5}", "[a-z0-9]{0,6}"), 0..4)
}

fn build(host: &str, path: &str, params: &[(String, String)]) -> String {
    let mut url = format!("https://{host}{path}");
    if !params.is_empty() {
        let query: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
        url.push('?');
        url.push_str(&query.join("&"));
    }
    url
}

proptest! {
    #[test]
    fn normalization_is_idempotent(host in host(), path in path(), params in params()) {
        let once = normalize_url(&build(&host, &path, &params));
        prop_assert_eq!(normalize_url(&once), once.clone());
    }

    #[test]
    fn tracking_fragment_and_slash_do_not_change_identity(
        host in host(),
        path in path(),
        params in params(),
        campaign in "[a-z]{1,8}",
        fragment in "[a-z]{1,8}",
    ) {
        let plain = build(&host, &path, &params);

        let mut noisy_params = params.clone();
        noisy_params.push(("utm_source".to_string(), campaign.clone()));
        noisy_params.push(("fbclid".to_string(), campaign));
        let mut noisy = build(&host, &format!("{path}/"), &noisy_params);
        noisy.push('#');
        noisy.push_str(&fragment);

        prop_assert_eq!(normalize_url(&plain), normalize_url(&noisy));
    }

    #[test]
    fn host_case_does_not_change_identity(host in host(), path in path()) {
        let lower = build(&host, &path, &[]);
        let upper = build(&host.to_uppercase(), &path, &[]);
        prop_assert_eq!(normalize_url(&lower), normalize_url(&upper));
    }

    #[test]
    fn parameter_order_does_not_change_identity(host in host(), params in params()) {
        let forward = build(&host, "/p", &params);
        let reversed: Vec<_> = params.iter().rev().cloned().collect();
        let backward = build(&host, "/p", &reversed);
        prop_assert_eq!(normalize_url(&forward), normalize_url(&backward));
    }
}

#[test]
fn distinct_paths_stay_distinct() {
    assert_ne!(
        normalize_url("https://example.com/a"),
        normalize_url("https://example.com/b")
    );
    assert_ne!(
        normalize_url("https://example.com/a?id=1"),
        normalize_url("https://example.com/a?id=2")
    );
}
