use url::Url;

const VIDEO_ID_LEN: usize = 11;

/// Pulls the video id out of a YouTube watch URL.
///
/// Accepts `youtube.com/watch?v=ID` (with or without `www.`) and
/// `youtu.be/ID`; a scheme-less URL is retried with `https://` prepended.
pub fn extract_video_id(video_url: &str) -> Option<String> {
    let trimmed = video_url.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parsed = Url::parse(trimmed)
        .or_else(|_| Url::parse(&format!("https://{trimmed}")))
        .ok()?;

    let host = parsed.host_str()?;

    let candidate = if host == "youtube.com" || host.ends_with(".youtube.com") {
        parsed
            .query_pairs()
            .find(|(key, _)| key == "v")
            .map(|(_, value)| value.into_owned())
    } else if host == "youtu.be" {
        parsed
            .path_segments()
            .and_then(|mut segments| segments.next().map(str::to_string))
    } else {
        None
    }?;

    if is_valid_video_id(&candidate) {
        Some(candidate)
    } else {
        None
    }
}

pub fn is_valid_video_id(candidate: &str) -> bool {
    candidate.len() == VIDEO_ID_LEN
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::{extract_video_id, is_valid_video_id};

    #[test]
    fn extracts_id_from_watch_url() {
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=abc12345678"),
            Some("abc12345678".to_string())
        );
    }

    #[test]
    fn extracts_id_from_short_url() {
        assert_eq!(
            extract_video_id("https://youtu.be/abc12345678?t=42"),
            Some("abc12345678".to_string())
        );
    }

    #[test]
    fn extracts_id_without_scheme() {
        assert_eq!(
            extract_video_id("youtube.com/watch?v=abc12345678"),
            Some("abc12345678".to_string())
        );
    }

    #[test]
    fn rejects_non_youtube_hosts() {
        assert_eq!(extract_video_id("https://vimeo.com/123456789"), None);
    }

    #[test]
    fn rejects_malformed_ids() {
        assert_eq!(extract_video_id("https://youtu.be/short"), None);
        assert_eq!(
            extract_video_id("https://www.youtube.com/watch?v=has space in"),
            None
        );
    }

    #[test]
    fn video_id_shape_is_eleven_url_safe_chars() {
        assert!(is_valid_video_id("abc12345678"));
        assert!(is_valid_video_id("a-b_c456789"));
        assert!(!is_valid_video_id("abc1234567"));
        assert!(!is_valid_video_id("abc123456789"));
    }
}
