//! Utility functions shared by site adapters.

use regex::Regex;
use std::sync::LazyLock;

/// First decimal number inside a string.
static NUMBER_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").unwrap());

/// Extracts the first decimal number found in `text`, or 0.
///
/// `"Chapter 12.5 - The End"` yields `12.5`.
pub fn match_num(text: Option<&str>) -> f64 {
    text.and_then(|t| NUMBER_REGEX.find(t))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Lowercases and splits into alphanumeric words, so punctuation and
/// irregular whitespace never affect matching.
fn normalized_words(text: &str) -> Vec<String> {
    text.chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Checks whether a scraped title matches a search query.
///
/// Matches when the normalized query is a substring of the normalized
/// title, or when every query word appears among the title's words.
pub fn title_contains_query(query: &str, title: &str) -> bool {
    let query_words = normalized_words(query);
    if query_words.is_empty() {
        return true;
    }

    let title_words = normalized_words(title);
    if title_words.join(" ").contains(&query_words.join(" ")) {
        return true;
    }

    query_words.iter().all(|word| title_words.contains(word))
}

/// Resolves a relative URL against a base URL.
pub fn resolve_url(base: &str, relative: &str) -> String {
    if relative.starts_with("http://") || relative.starts_with("https://") {
        return relative.to_string();
    }

    if let Ok(base_url) = url::Url::parse(base)
        && let Ok(resolved) = base_url.join(relative)
    {
        return resolved.to_string();
    }

    let base = base.trim_end_matches('/');
    format!("{}/{}", base, relative.trim_start_matches('/'))
}

/// Returns the host of a URL, without a leading `www.`.
pub fn host_of(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.trim_start_matches("www.").to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_num() {
        assert_eq!(match_num(Some("Chapter 12.5")), 12.5);
        assert_eq!(match_num(Some("Chapter 45 - Finale 2")), 45.0);
        assert_eq!(match_num(Some("Prologue")), 0.0);
        assert_eq!(match_num(Some("")), 0.0);
        assert_eq!(match_num(None), 0.0);
    }

    #[test]
    fn test_title_contains_query_substring() {
        assert!(title_contains_query("martial god", "Chronicles of the Martial God’s Return"));
        assert!(title_contains_query("  RETURN   survival ", "Return Survival"));
    }

    #[test]
    fn test_title_contains_query_punctuation() {
        assert!(title_contains_query(
            "chronicles of the martial god's return",
            "Chronicles of the Martial God’s Return"
        ));
    }

    #[test]
    fn test_title_contains_query_word_overlap() {
        assert!(title_contains_query("return chronicles", "Chronicles of the Martial God’s Return"));
        assert!(!title_contains_query("solo leveling", "Chronicles of the Martial God’s Return"));
    }

    #[test]
    fn test_resolve_url() {
        assert_eq!(
            resolve_url("https://skscans.com/manga/x/", "/manga/x/chapter-2/"),
            "https://skscans.com/manga/x/chapter-2/"
        );
        assert_eq!(
            resolve_url("https://skscans.com/manga/x/", "chapter-2/"),
            "https://skscans.com/manga/x/chapter-2/"
        );
        assert_eq!(
            resolve_url("https://skscans.com/manga/x/", "https://other.com/page"),
            "https://other.com/page"
        );
    }

    #[test]
    fn test_host_of() {
        assert_eq!(host_of("https://www.mangatx.com/manga/a/").as_deref(), Some("mangatx.com"));
        assert_eq!(host_of("not a url"), None);
    }
}
