//! Content extraction: web pages and video transcripts to plain text

use super::{build_http_client, decode_entities, status_error};
use async_trait::async_trait;
use deepsift_core::{retrieval_error, ContentExtractor, DeepsiftResult};
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

static SCRIPT_STYLE_REGEX: OnceLock<Regex> = OnceLock::new();
static BLOCK_TAG_REGEX: OnceLock<Regex> = OnceLock::new();
static ANY_TAG_REGEX: OnceLock<Regex> = OnceLock::new();
static CAPTION_TRACK_REGEX: OnceLock<Regex> = OnceLock::new();
static TIMEDTEXT_REGEX: OnceLock<Regex> = OnceLock::new();

/// Reduce an HTML document to readable text, one paragraph per line
pub fn html_to_text(html: &str) -> String {
    let script_style = SCRIPT_STYLE_REGEX.get_or_init(|| {
        Regex::new(r"(?is)<(script|style|noscript|svg|head)\b.*?</(script|style|noscript|svg|head)>")
            .unwrap()
    });
    let block_tag = BLOCK_TAG_REGEX.get_or_init(|| {
        Regex::new(r"(?i)</?(p|div|br|li|ul|ol|h[1-6]|tr|table|section|article|header|footer|blockquote|pre)\b[^>]*>")
            .unwrap()
    });
    let any_tag = ANY_TAG_REGEX.get_or_init(|| Regex::new(r"(?s)<[^>]*>").unwrap());

    let without_code = script_style.replace_all(html, " ");
    let with_breaks = block_tag.replace_all(&without_code, "\n");
    let stripped = any_tag.replace_all(&with_breaks, " ");
    let decoded = decode_entities(&stripped);

    decoded
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fetches a web page and converts it to text
pub struct HttpPageExtractor {
    client: reqwest::Client,
}

impl HttpPageExtractor {
    pub fn new(user_agent: &str, timeout: Duration) -> DeepsiftResult<Self> {
        Ok(Self {
            client: build_http_client(user_agent, timeout)?,
        })
    }

    pub(crate) async fn fetch_text(&self, url: &str, source_name: &str) -> DeepsiftResult<String> {
        let response = self.client.get(url).send().await.map_err(|e| {
            retrieval_error!(format!("Request to {} failed: {}", url, e), source_name, e)
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, source_name));
        }

        response.text().await.map_err(|e| {
            retrieval_error!(format!("Failed to read {}: {}", url, e), source_name, e)
        })
    }

    pub(crate) async fn fetch_bytes(&self, url: &str, source_name: &str) -> DeepsiftResult<Vec<u8>> {
        let response = self.client.get(url).send().await.map_err(|e| {
            retrieval_error!(format!("Request to {} failed: {}", url, e), source_name, e)
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, source_name));
        }

        let bytes = response.bytes().await.map_err(|e| {
            retrieval_error!(format!("Failed to read {}: {}", url, e), source_name, e)
        })?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ContentExtractor for HttpPageExtractor {
    fn name(&self) -> &str {
        "web_page"
    }

    async fn extract(&self, target: &str) -> DeepsiftResult<String> {
        let html = self.fetch_text(target, self.name()).await?;
        let text = html_to_text(&html);

        if text.is_empty() {
            return Err(retrieval_error!(
                format!("No readable content at {}", target),
                self.name()
            ));
        }

        debug!("Extracted {} chars from {}", text.len(), target);
        Ok(text)
    }
}

/// Fetches the caption track of a YouTube video
pub struct YoutubeTranscriptExtractor {
    pages: HttpPageExtractor,
}

impl YoutubeTranscriptExtractor {
    pub fn new(user_agent: &str, timeout: Duration) -> DeepsiftResult<Self> {
        Ok(Self {
            pages: HttpPageExtractor::new(user_agent, timeout)?,
        })
    }
}

/// Video id from `watch?v=`, `youtu.be/` or `/shorts/` URLs
pub fn youtube_video_id(video_url: &str) -> Option<String> {
    let parsed = url::Url::parse(video_url).ok()?;
    let host = parsed.host_str()?.trim_start_matches("www.").trim_start_matches("m.");

    let id = match host {
        "youtu.be" => parsed.path_segments()?.next().map(str::to_string),
        "youtube.com" | "music.youtube.com" => {
            let mut segments = parsed.path_segments()?;
            match segments.next() {
                Some("watch") => parsed
                    .query_pairs()
                    .find(|(key, _)| key == "v")
                    .map(|(_, value)| value.into_owned()),
                Some("shorts") | Some("embed") | Some("live") => segments.next().map(str::to_string),
                _ => None,
            }
        }
        _ => None,
    }?;

    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    valid.then_some(id)
}

/// First caption track URL embedded in a watch page
fn caption_track_url(watch_page: &str) -> Option<String> {
    let re = CAPTION_TRACK_REGEX
        .get_or_init(|| Regex::new(r#""captionTracks":\[\{"baseUrl":"([^"]+)""#).unwrap());

    re.captures(watch_page)
        .map(|caps| caps[1].replace("\\u0026", "&").replace("\\/", "/"))
}

/// Flatten a timedtext XML document into `start - end: text` segments
pub fn parse_timedtext(xml: &str) -> String {
    let re = TIMEDTEXT_REGEX.get_or_init(|| {
        Regex::new(r#"(?s)<text start="([\d.]+)"(?: dur="([\d.]+)")?[^>]*>(.*?)</text>"#).unwrap()
    });

    re.captures_iter(xml)
        .filter_map(|caps| {
            let start: f64 = caps[1].parse().ok()?;
            let duration: f64 = caps
                .get(2)
                .and_then(|m| m.as_str().parse().ok())
                .unwrap_or(0.0);
            // Caption text is entity-encoded twice
            let text = decode_entities(&decode_entities(&caps[3]));
            let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
            (!text.is_empty()).then(|| format!("{:.2} - {:.2}: {}", start, start + duration, text))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[async_trait]
impl ContentExtractor for YoutubeTranscriptExtractor {
    fn name(&self) -> &str {
        "transcript"
    }

    async fn extract(&self, target: &str) -> DeepsiftResult<String> {
        let video_id = youtube_video_id(target).ok_or_else(|| {
            retrieval_error!(format!("Not a YouTube video URL: {}", target), self.name())
        })?;

        let watch_url = format!("https://www.youtube.com/watch?v={}", video_id);
        let page = self.pages.fetch_text(&watch_url, self.name()).await?;

        let track_url = caption_track_url(&page).ok_or_else(|| {
            retrieval_error!(
                format!("No captions available for video {}", video_id),
                self.name()
            )
        })?;

        let xml = self.pages.fetch_text(&track_url, self.name()).await?;
        let transcript = parse_timedtext(&xml);
        if transcript.is_empty() {
            return Err(retrieval_error!(
                format!("Empty transcript for video {}", video_id),
                self.name()
            ));
        }

        debug!("Fetched transcript for {} ({} chars)", video_id, transcript.len());
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_text() {
        let html = r#"<html><head><title>x</title><style>.a{}</style></head>
            <body><h1>Deep  Q-Networks</h1><script>var x = 1;</script>
            <p>Combine Q-learning &amp; neural networks.</p><div>Second<br>line</div></body></html>"#;

        let text = html_to_text(html);
        assert_eq!(
            text,
            "Deep Q-Networks\nCombine Q-learning & neural networks.\nSecond\nline"
        );
    }

    #[test]
    fn test_youtube_video_id() {
        assert_eq!(
            youtube_video_id("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            youtube_video_id("https://youtu.be/dQw4w9WgXcQ").as_deref(),
            Some("dQw4w9WgXcQ")
        );
        assert_eq!(
            youtube_video_id("https://youtube.com/shorts/abc_DEF-123").as_deref(),
            Some("abc_DEF-123")
        );
        assert_eq!(youtube_video_id("https://example.com/watch?v=abc"), None);
        assert_eq!(youtube_video_id("not a url"), None);
    }

    #[test]
    fn test_caption_track_url() {
        let page = r#"..."captionTracks":[{"baseUrl":"https://www.youtube.com/api/timedtext?v=abc&lang=en","name":..."#;
        assert_eq!(
            caption_track_url(page).as_deref(),
            Some("https://www.youtube.com/api/timedtext?v=abc&lang=en")
        );
        assert_eq!(caption_track_url("<html></html>"), None);
    }

    #[test]
    fn test_parse_timedtext() {
        let xml = r#"<transcript><text start="0.5" dur="2.0">Hello &amp;amp; welcome</text><text start="2.5" dur="1.5">to RL</text></transcript>"#;
        assert_eq!(
            parse_timedtext(xml),
            "0.50 - 2.50: Hello & welcome 2.50 - 4.00: to RL"
        );
    }
}
