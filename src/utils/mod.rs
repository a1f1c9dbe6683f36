pub mod constants;
pub mod url_utils;

pub use constants::*;
pub use url_utils::{BlockedDomains, extract_host, is_valid_url, normalize_url};
