//! Retrieval sources and content extractors (web pages, transcripts, PDFs)
//!
//! Every source implements [`deepsift_core::Retriever`] and returns flattened,
//! human-readable evidence text. Failures are normalised into
//! `DeepsiftError::Retrieval` carrying the source name.

pub mod arxiv;
pub mod extract;
pub mod pdf;
pub mod semantic;
pub mod web_search;

pub use arxiv::{ArxivPaper, ArxivRetriever};
pub use extract::{html_to_text, HttpPageExtractor, YoutubeTranscriptExtractor};
pub use pdf::PdfExtractor;
pub use semantic::SemanticRetriever;
pub use web_search::{SearchHit, WebSearchProvider, WebSearchRetriever};

use deepsift_core::{config_error, DeepsiftError, DeepsiftResult, ErrorContext};
use std::time::Duration;

/// Shared HTTP client construction for all network sources
pub(crate) fn build_http_client(user_agent: &str, timeout: Duration) -> DeepsiftResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .user_agent(user_agent)
        .build()
        .map_err(|e| config_error!(format!("Failed to create HTTP client: {}", e), "sources"))
}

/// Map an unsuccessful HTTP status to a retrieval error
pub(crate) fn status_error(status: reqwest::StatusCode, source_name: &str) -> DeepsiftError {
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return DeepsiftError::RateLimit {
            message: format!("{} rate limit exceeded", source_name),
            retry_after_ms: None,
            context: ErrorContext::new("retrieval").with_operation("search"),
        }
        .into_retrieval(source_name);
    }

    deepsift_core::retrieval_error!(
        format!("{} returned status {}", source_name, status),
        source_name
    )
}

/// Collapse runs of whitespace into single spaces
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Decode the handful of HTML/XML entities that appear in API payloads
pub fn decode_entities(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_rate_limit() {
        let err = status_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "web_search");
        assert!(err.is_retrieval());
        assert!(err.to_string().contains("rate limit"));

        let err = status_error(reqwest::StatusCode::BAD_GATEWAY, "arxiv");
        assert!(err.to_string().contains("502"));
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &amp;lt; b"), "a &lt; b");
        assert_eq!(decode_entities("&quot;hi&quot; &#39;x&#39;"), "\"hi\" 'x'");
    }
}
