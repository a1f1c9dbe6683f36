//! Text cleanup applied to accepted pages

use once_cell::sync::Lazy;
use regex::Regex;

/// Navigation labels that make up a whole line
static NAV_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:skip to (?:main )?content|accept(?: all)?(?: cookies)?|cookie (?:policy|settings|preferences)|privacy policy|terms of (?:use|service)|sign in|log in|sign up|subscribe(?: now)?|share(?: on \w+| this)?|follow us|back to top|advertisement|menu|search|home)[\s.:|>»-]*$",
    )
    .expect("Invalid navigation line regex")
});

/// Legal and consent notices, matched by how a short line starts
static NOTICE_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:©|copyright \d{4}\b|all rights reserved\b|we use cookies\b)")
        .expect("Invalid notice prefix regex")
});

/// Lines longer than this are kept even if they start like a notice
const NOTICE_MAX_WORDS: usize = 12;

/// Minimum length for [`is_readable`]
pub const MIN_READABLE_CHARS: usize = 10;

/// Share of alphanumeric or whitespace characters for [`is_readable`]
pub const READABLE_RATIO: f64 = 0.7;

/// Normalize whitespace, drop boilerplate lines and repeated lines
#[must_use]
pub fn clean_text(raw: &str) -> String {
    let mut lines: Vec<String> = Vec::new();

    for line in raw.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            continue;
        }
        if NAV_LINE.is_match(&line) {
            continue;
        }
        if line.split(' ').count() <= NOTICE_MAX_WORDS && NOTICE_PREFIX.is_match(&line) {
            continue;
        }
        if lines.last().is_some_and(|last| *last == line) {
            continue;
        }
        lines.push(line);
    }

    lines.join("\n")
}

#[must_use]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Whether text is mostly letters, digits and spaces in any script
#[must_use]
pub fn is_readable(text: &str) -> bool {
    let total = text.chars().count();
    if total < MIN_READABLE_CHARS {
        return false;
    }
    let readable = text
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .count();
    readable as f64 / total as f64 >= READABLE_RATIO
}
