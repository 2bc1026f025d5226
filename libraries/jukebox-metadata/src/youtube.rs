//! YouTube link parsing
//!
//! Accepted forms:
//! - `https://youtu.be/<id>`
//! - `https://www.youtube.com/watch?v=<id>` (also with `v` later in the query)
//! - `https://www.youtube.com/embed/<id>`, `/v/<id>`, `/shorts/<id>`
//!
//! A video id is exactly 11 characters of `[A-Za-z0-9_-]`.

use url::Url;

const VIDEO_ID_LEN: usize = 11;

const PATH_PREFIXES: [&str; 3] = ["embed", "v", "shorts"];

fn is_video_id(candidate: &str) -> bool {
    candidate.len() == VIDEO_ID_LEN
        && candidate
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

fn is_youtube_host(host: &str) -> bool {
    let host = host.strip_prefix("www.").unwrap_or(host);
    let host = host.strip_prefix("m.").unwrap_or(host);
    host == "youtube.com" || host == "music.youtube.com" || host == "youtube-nocookie.com"
}

/// Extract the video id from a YouTube link
///
/// Returns `None` for anything that is not a recognizable YouTube video link,
/// including links whose id has the wrong length or alphabet.
pub fn extract_video_id(link: &str) -> Option<String> {
    let link = link.trim();
    // Pasted links often lack a scheme
    let url = Url::parse(link)
        .or_else(|_| Url::parse(&format!("https://{}", link)))
        .ok()?;

    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    let host = url.host_str()?.to_ascii_lowercase();
    let mut segments = url.path_segments()?.filter(|s| !s.is_empty());

    let candidate = if host == "youtu.be" || host == "www.youtu.be" {
        segments.next().map(str::to_string)
    } else if is_youtube_host(&host) {
        match segments.next() {
            Some("watch") => url
                .query_pairs()
                .find(|(key, _)| key == "v")
                .map(|(_, value)| value.into_owned()),
            Some(prefix) if PATH_PREFIXES.contains(&prefix) => segments.next().map(str::to_string),
            _ => None,
        }
    } else {
        None
    }?;

    is_video_id(&candidate).then_some(candidate)
}

/// Thumbnail image for a video id
pub fn thumbnail_url(video_id: &str) -> String {
    format!("https://img.youtube.com/vi/{}/0.jpg", video_id)
}

/// Canonical watch link for a video id
pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}
