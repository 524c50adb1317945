//! Academic paper search over the arXiv Atom API

use super::{build_http_client, decode_entities, normalize_whitespace, status_error};
use async_trait::async_trait;
use deepsift_core::{retrieval_error, DeepsiftResult, Retriever, SourceKind};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Minimum spacing between requests required by the arXiv API terms
const MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(3);

/// A single paper from an arXiv search
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArxivPaper {
    pub arxiv_id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
    pub published: String,
    pub link: String,
}

impl ArxivPaper {
    pub fn flatten(&self) -> String {
        format!(
            "Title: {}\nAuthors: {}\nPublished: {}\nSummary: {}\nLink: {}",
            self.title,
            self.authors.join(", "),
            self.published,
            self.summary,
            self.link
        )
    }
}

/// Retriever for arXiv papers
pub struct ArxivRetriever {
    client: reqwest::Client,
    base_url: String,
    last_request: Mutex<Option<Instant>>,
}

impl ArxivRetriever {
    pub fn new(base_url: impl Into<String>, user_agent: &str, timeout: Duration) -> DeepsiftResult<Self> {
        Ok(Self {
            client: build_http_client(user_agent, timeout)?,
            base_url: base_url.into(),
            last_request: Mutex::new(None),
        })
    }

    pub fn build_search_url(&self, query: &str, limit: usize) -> String {
        format!(
            "{}?search_query=all:{}&start=0&max_results={}&sortBy=relevance&sortOrder=descending",
            self.base_url,
            urlencoding::encode(query),
            limit
        )
    }

    async fn rate_limit(&self) {
        // The guard is held across the sleep so concurrent callers queue up
        let mut last = self.last_request.lock().await;
        if let Some(instant) = *last {
            let elapsed = instant.elapsed();
            if elapsed < MIN_REQUEST_INTERVAL {
                tokio::time::sleep(MIN_REQUEST_INTERVAL - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[async_trait]
impl Retriever for ArxivRetriever {
    fn name(&self) -> &str {
        "arxiv"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::PaperSearch
    }

    async fn search(&self, query: &str, limit: usize) -> DeepsiftResult<String> {
        self.rate_limit().await;

        let url = self.build_search_url(query, limit);
        debug!("arXiv search URL: {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            retrieval_error!(format!("arXiv API request failed: {}", e), self.name(), e)
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, self.name()));
        }

        let body = response.text().await.map_err(|e| {
            retrieval_error!(format!("Failed to read arXiv response: {}", e), self.name(), e)
        })?;

        let papers = parse_atom_feed(&body);
        if papers.is_empty() {
            return Err(retrieval_error!(
                format!("No arXiv papers found for '{}'", query),
                self.name()
            ));
        }

        Ok(papers
            .iter()
            .take(limit)
            .map(ArxivPaper::flatten)
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

/// Parse the `<entry>` blocks of an Atom feed
pub fn parse_atom_feed(xml: &str) -> Vec<ArxivPaper> {
    extract_blocks(xml, "entry")
        .into_iter()
        .filter_map(parse_entry)
        .collect()
}

fn parse_entry(entry: &str) -> Option<ArxivPaper> {
    let id_url = extract_tag_text(entry, "id")?;
    let title = normalize_whitespace(&decode_entities(&extract_tag_text(entry, "title")?));

    let authors = extract_blocks(entry, "author")
        .into_iter()
        .filter_map(|block| extract_tag_text(block, "name"))
        .map(|name| decode_entities(&name))
        .collect();

    let summary = normalize_whitespace(&decode_entities(
        &extract_tag_text(entry, "summary").unwrap_or_default(),
    ));
    let published = extract_tag_text(entry, "published").unwrap_or_default();

    Some(ArxivPaper {
        arxiv_id: arxiv_id_from_url(&id_url),
        title,
        authors,
        summary,
        published,
        link: id_url,
    })
}

/// All `<tag>...</tag>` blocks, tags included
fn extract_blocks<'a>(xml: &'a str, tag: &str) -> Vec<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let mut blocks = Vec::new();
    let mut search_from = 0;

    while let Some(pos) = xml[search_from..].find(&open) {
        let start = search_from + pos;
        let Some(end_pos) = xml[start..].find(&close) else {
            break;
        };
        let end = start + end_pos + close.len();
        blocks.push(&xml[start..end]);
        search_from = end;
    }

    blocks
}

/// Text content of the first `<tag ...>text</tag>`
fn extract_tag_text(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{}", tag);
    let close = format!("</{}>", tag);

    let mut search_from = 0;
    loop {
        let start_pos = search_from + xml[search_from..].find(&open)?;
        let after_name = xml[start_pos + open.len()..].chars().next()?;
        // Skip longer tag names sharing the prefix, e.g. <id> vs <idx>
        if after_name == '>' || after_name.is_whitespace() {
            let content_start = xml[start_pos..].find('>')? + start_pos + 1;
            let content_end = xml[content_start..].find(&close)? + content_start;
            return Some(xml[content_start..content_end].trim().to_string());
        }
        search_from = start_pos + open.len();
    }
}

/// `http://arxiv.org/abs/1706.03762v7` -> `1706.03762v7`
pub fn arxiv_id_from_url(url: &str) -> String {
    if let Some(pos) = url.rfind("/abs/") {
        url[pos + 5..].to_string()
    } else if let Some(pos) = url.rfind("/pdf/") {
        url[pos + 5..].trim_end_matches(".pdf").to_string()
    } else {
        url.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <opensearch:totalResults>1</opensearch:totalResults>
  <entry>
    <id>http://arxiv.org/abs/1312.5602v1</id>
    <published>2013-12-19T16:00:08Z</published>
    <title>Playing Atari with Deep
      Reinforcement Learning</title>
    <summary>  We present the first deep learning model to successfully learn
      control policies &amp; more.</summary>
    <author><name>Volodymyr Mnih</name></author>
    <author><name>Koray Kavukcuoglu</name></author>
    <link href="http://arxiv.org/abs/1312.5602v1" rel="alternate" type="text/html"/>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_atom_feed() {
        let papers = parse_atom_feed(FEED);
        assert_eq!(papers.len(), 1);

        let paper = &papers[0];
        assert_eq!(paper.arxiv_id, "1312.5602v1");
        assert_eq!(paper.title, "Playing Atari with Deep Reinforcement Learning");
        assert_eq!(paper.authors, vec!["Volodymyr Mnih", "Koray Kavukcuoglu"]);
        assert!(paper.summary.ends_with("control policies & more."));
        assert_eq!(paper.published, "2013-12-19T16:00:08Z");
    }

    #[test]
    fn test_flatten_paper() {
        let paper = &parse_atom_feed(FEED)[0];
        let text = paper.flatten();
        assert!(text.starts_with("Title: Playing Atari"));
        assert!(text.contains("Authors: Volodymyr Mnih, Koray Kavukcuoglu"));
        assert!(text.contains("Link: http://arxiv.org/abs/1312.5602v1"));
    }

    #[test]
    fn test_empty_feed() {
        assert!(parse_atom_feed("<feed></feed>").is_empty());
    }

    #[test]
    fn test_search_url_encoding() {
        let retriever = ArxivRetriever::new(
            "https://export.arxiv.org/api/query",
            "deepsift-test",
            Duration::from_secs(5),
        )
        .unwrap();

        let url = retriever.build_search_url("deep q learning", 3);
        assert!(url.contains("search_query=all:deep%20q%20learning"));
        assert!(url.ends_with("sortOrder=descending"));
        assert!(url.contains("max_results=3"));
    }

    #[test]
    fn test_arxiv_id_from_url() {
        assert_eq!(arxiv_id_from_url("http://arxiv.org/pdf/2301.00001v2.pdf"), "2301.00001v2");
        assert_eq!(arxiv_id_from_url("2301.00001"), "2301.00001");
    }
}
