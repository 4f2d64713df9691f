//! URL shape predicates.
//!
//! These only classify strings; they never fetch anything and never fail.

use std::sync::LazyLock;

use regex_lite::Regex;

static VIDEO_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://(www\.|m\.)?youtu(be)?\.(be|com)/watch\?v=[A-Za-z0-9_-]{11}(&.*)?")
        .expect("invalid video URL pattern")
});

static PLAYLIST_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https?://(www\.|m\.)?youtube\.com/playlist\?list=[A-Za-z0-9_-]{34}")
        .expect("invalid playlist URL pattern")
});

/// Checks whether `url` has the shape of a video URL.
///
/// # Examples
///
/// ```rust
/// use tubeline::matcher::is_video_url;
///
/// assert!(is_video_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
/// assert!(!is_video_url("https://example.org"));
/// ```
#[must_use]
pub fn is_video_url(url: &str) -> bool {
    VIDEO_URL.is_match(url)
}

/// Checks whether `url` has the shape of a playlist URL.
#[must_use]
pub fn is_playlist_url(url: &str) -> bool {
    PLAYLIST_URL.is_match(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_video_urls() {
        assert!(is_video_url("https://www.youtube.com/watch?v=ryT-ltTDCko"));
        assert!(is_video_url("http://m.youtube.com/watch?v=ryT-ltTDCko&t=10"));
        assert!(!is_video_url("https://www.youtube.com/watch?v=short"));
        assert!(!is_video_url("https://example.org"));
        assert!(!is_video_url(""));
    }

    #[test]
    fn recognizes_playlist_urls() {
        assert!(is_playlist_url(
            "https://www.youtube.com/playlist?list=PLT_r_AwlIdMIRGjBygNMJPw5sG522LLTC"
        ));
        assert!(!is_playlist_url("https://www.youtube.com/playlist?list=PL123"));
        assert!(!is_playlist_url("https://example.org"));
    }
}
