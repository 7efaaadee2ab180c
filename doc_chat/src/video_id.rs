use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

const VIDEO_URL_PATTERN: &str = r"^(https?://)?(www\.)?(youtube|youtu|youtube-nocookie)\.(com|be)/(watch\?v=|embed/|v/|.+\?v=)?([A-Za-z0-9_-]{11})";

fn video_url_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(VIDEO_URL_PATTERN).expect("video URL pattern is valid"))
}

/// The 11-character identifier of a hosted video.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VideoReference(String);

impl VideoReference {
    /// Extracts the identifier from a watch, short, embed or privacy-domain URL.
    ///
    /// The match is anchored at the start of `url`; anything after the
    /// identifier is ignored. Returns `None` for anything unrecognised.
    pub fn parse(url: &str) -> Option<Self> {
        video_url_regex()
            .captures(url)
            .and_then(|caps| caps.get(6))
            .map(|m| Self(m.as_str().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VideoReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(url: &str) -> Option<String> {
        VideoReference::parse(url).map(|r| r.as_str().to_string())
    }

    #[test]
    fn watch_url() {
        assert_eq!(
            id("https://www.youtube.com/watch?v=dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
    }

    #[test]
    fn short_url() {
        assert_eq!(
            id("https://youtu.be/dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
    }

    #[test]
    fn embed_and_v_paths() {
        assert_eq!(
            id("https://www.youtube.com/embed/dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            id("youtube.com/v/dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
    }

    #[test]
    fn nocookie_domain() {
        assert_eq!(
            id("https://www.youtube-nocookie.com/embed/a-b_c1234XY").as_deref(),
            Some("a-b_c1234XY")
        );
    }

    #[test]
    fn v_parameter_after_other_path() {
        assert_eq!(
            id("https://www.youtube.com/attribution_link?a=x&u=/watch?v=dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
    }

    #[test]
    fn trailing_characters_are_ignored() {
        assert_eq!(
            id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42s&list=PL123").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            id("https://youtu.be/dQw4w9WgXcQ?si=abcdef").as_deref(),
            Some("dQw4w9WgXcQ")
        );
    }

    #[test]
    fn scheme_and_www_are_optional() {
        assert_eq!(
            id("youtu.be/dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            id("http://youtube.com/watch?v=dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
    }

    #[test]
    fn non_urls_are_not_found() {
        assert_eq!(id("not a url"), None);
        assert_eq!(id(""), None);
        assert_eq!(id("https://vimeo.com/123456789012"), None);
    }

    #[test]
    fn match_is_anchored_at_start() {
        assert_eq!(id("see https://youtu.be/dQw4w9WgXcQ"), None);
    }

    #[test]
    fn short_identifier_is_not_found() {
        assert_eq!(id("https://www.youtube.com/watch?v=abc"), None);
    }
}
