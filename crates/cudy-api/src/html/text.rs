//! Text normalization for scraped LuCI pages.
//!
//! Cudy firmware renders most values twice (a desktop and a mobile copy of
//! the same node) and pads everything with layout whitespace. These helpers
//! turn that into stable single-line strings.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;

static DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+").expect("digit regex is valid"));
static READING_WITH_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-+]?\d+(?:\.\d+)?\s*[A-Za-z%/]+$").expect("reading regex is valid")
});

/// Collapse every whitespace run (newlines included) to one space and trim.
pub fn normalize_spaces(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop exact duplicate lines, keeping the first occurrence of each.
pub fn dedupe_lines<I, S>(lines: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    lines
        .into_iter()
        .map(Into::into)
        .filter(|line| seen.insert(line.clone()))
        .collect()
}

/// Return the first half of `s` when `s` is that half written twice.
pub fn collapse_self_repeat(s: &str) -> &str {
    let mid = s.len() / 2;
    if s.len() % 2 == 0 && s.is_char_boundary(mid) && s[..mid] == s[mid..] {
        &s[..mid]
    } else {
        s
    }
}

/// [`collapse_self_repeat`] restricted to a number followed by a unit, such
/// as `-53dBm-53dBm`. Bare numbers (`11`, `22`) and free text pass through.
pub fn collapse_unit_echo(s: &str) -> &str {
    let half = collapse_self_repeat(s);
    if half.len() < s.len() && READING_WITH_UNIT.is_match(half) {
        half
    } else {
        s
    }
}

/// Lenient integer conversion: `"12 Mins"` is 12, `"N/A"` and `""` are `None`.
///
/// A plain signed integer parses as-is so signal readings such as `-97`
/// keep their sign. Otherwise the first run of digits wins.
pub fn to_int_or_none(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("n/a") {
        return None;
    }
    if let Ok(n) = s.parse::<i64>() {
        return Some(n);
    }
    DIGITS.find(s).and_then(|m| m.as_str().parse().ok())
}

/// All visible text lines of a document, normalized, non-empty and deduplicated.
pub fn page_lines(html: &str) -> Vec<String> {
    if html.trim().is_empty() {
        return Vec::new();
    }
    let doc = Html::parse_document(html);
    let joined = doc.root_element().text().collect::<Vec<_>>().join("\n");
    dedupe_lines(
        joined
            .lines()
            .map(normalize_spaces)
            .filter(|line| !line.is_empty()),
    )
}

/// The line following the first line that reads exactly `label`
/// (case-insensitive).
pub fn line_after<'a>(lines: &'a [String], label: &str) -> Option<&'a str> {
    let pos = lines.iter().position(|l| l.eq_ignore_ascii_case(label))?;
    lines.get(pos + 1).map(String::as_str)
}
