use std::sync::OnceLock;

use regex::Regex;

/// Watch (`?v=` / `&v=`), share (`youtu.be/`), `/v/`, `/e/`, `/embed/`,
/// `/shorts/` and channel-style `/user/x/ID` URLs. The id is the 11 characters
/// that follow, stopping at a quote, `&`, `?`, `/` or whitespace.
const YOUTUBE_ID_PATTERN: &str =
    r#"(?:youtube\.com/(?:[^/]+/.+/|(?:v|e(?:mbed)?|shorts)/|.*[?&]v=)|youtu\.be/)([^"&?/\s]{11})"#;

fn youtube_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(YOUTUBE_ID_PATTERN).expect("YouTube pattern is valid"))
}

/// Extract the 11-character video id from a YouTube URL.
/// Returns `None` when the link is not recognised; callers keep the raw URL.
pub fn extract_id(url: &str) -> Option<String> {
    youtube_regex()
        .captures(url.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Embeddable player URL for a recognised link.
pub fn embed_url(base: &str, url: &str) -> Option<String> {
    let id = extract_id(url)?;
    Some(format!("{}/{}", base.trim_end_matches('/'), id))
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "dQw4w9WgXcQ";

    #[test]
    fn test_share_link() {
        assert_eq!(extract_id("https://youtu.be/dQw4w9WgXcQ").as_deref(), Some(ID));
        assert_eq!(extract_id("https://youtu.be/dQw4w9WgXcQ?t=42").as_deref(), Some(ID));
    }

    #[test]
    fn test_watch_link() {
        assert_eq!(extract_id("https://youtube.com/watch?v=dQw4w9WgXcQ").as_deref(), Some(ID));
        assert_eq!(
            extract_id("https://www.youtube.com/watch?feature=share&v=dQw4w9WgXcQ&t=1s").as_deref(),
            Some(ID)
        );
    }

    #[test]
    fn test_embed_and_shorts() {
        assert_eq!(extract_id("https://www.youtube.com/embed/dQw4w9WgXcQ").as_deref(), Some(ID));
        assert_eq!(extract_id("https://youtube.com/shorts/dQw4w9WgXcQ").as_deref(), Some(ID));
        assert_eq!(extract_id("https://www.youtube.com/v/dQw4w9WgXcQ").as_deref(), Some(ID));
    }

    #[test]
    fn test_unrecognised() {
        assert_eq!(extract_id("not a url"), None);
        assert_eq!(extract_id("https://vimeo.com/123456789"), None);
        assert_eq!(extract_id("https://youtu.be/short"), None);
        assert_eq!(extract_id(""), None);
    }

    #[test]
    fn test_embed_url() {
        assert_eq!(
            embed_url("https://www.youtube.com/embed/", "https://youtu.be/dQw4w9WgXcQ").as_deref(),
            Some("https://www.youtube.com/embed/dQw4w9WgXcQ")
        );
        assert_eq!(embed_url("https://www.youtube.com/embed", "nope"), None);
    }
}
