use regex::Regex;
use std::sync::OnceLock;
use url::Url;

static URL_RE: OnceLock<Regex> = OnceLock::new();

fn url_regex() -> &'static Regex {
    URL_RE.get_or_init(|| Regex::new(r"(?i)https?://\S+").expect("failed to compile url regex"))
}

/// Find the first http(s) link in free text.
///
/// Trailing punctuation that usually belongs to the sentence, not the link,
/// is stripped. Links without a host are rejected.
#[must_use]
pub fn extract_url(text: &str) -> Option<Url> {
    url_regex().find_iter(text).find_map(|m| {
        let candidate = m
            .as_str()
            .trim_end_matches(['.', ',', ';', ':', '!', '?', ')', ']', '>', '"', '\'']);
        Url::parse(candidate)
            .ok()
            .filter(|url| matches!(url.scheme(), "http" | "https"))
            .filter(|url| url.host_str().is_some_and(|h| !h.is_empty()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_link() {
        let url = extract_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap();
        assert_eq!(url.host_str(), Some("www.youtube.com"));
    }

    #[test]
    fn first_link_in_text() {
        let url = extract_url("look at this (https://youtu.be/abc) and http://other.example/x").unwrap();
        assert_eq!(url.as_str(), "https://youtu.be/abc");
    }

    #[test]
    fn trailing_punctuation_is_stripped() {
        let url = extract_url("watch https://vimeo.com/123456.").unwrap();
        assert_eq!(url.as_str(), "https://vimeo.com/123456");
    }

    #[test]
    fn no_link() {
        assert!(extract_url("hello there").is_none());
        assert!(extract_url("ftp://example.com/file").is_none());
        assert!(extract_url("").is_none());
    }

    #[test]
    fn skips_unparsable_candidates() {
        let url = extract_url("http://[broken https://ok.example/v").unwrap();
        assert_eq!(url.host_str(), Some("ok.example"));
    }
}
