//! General web search through Tavily, Brave or SerpAPI

use super::{build_http_client, normalize_whitespace, status_error};
use async_trait::async_trait;
use deepsift_core::{
    config_error, resolve_api_key, retrieval_error, DeepsiftResult, Reranker, Retriever,
    RetrievalSettings, SourceKind,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const TAVILY_URL: &str = "https://api.tavily.com/search";
const BRAVE_URL: &str = "https://api.search.brave.com/res/v1/web/search";
const SERPAPI_URL: &str = "https://serpapi.com/search.json";

/// Supported search backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebSearchProvider {
    Tavily,
    Brave,
    Serpapi,
}

impl WebSearchProvider {
    pub fn parse(name: &str) -> DeepsiftResult<Self> {
        match name.to_lowercase().as_str() {
            "tavily" => Ok(Self::Tavily),
            "brave" => Ok(Self::Brave),
            "serpapi" => Ok(Self::Serpapi),
            other => Err(config_error!(
                format!("Unsupported web search provider: {}", other),
                "web_search"
            )),
        }
    }

    /// Environment variable holding the provider's API key
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Self::Tavily => "TAVILY_API_KEY",
            Self::Brave => "BRAVE_API_KEY",
            Self::Serpapi => "SERPAPI_API_KEY",
        }
    }

    /// Extract hits from a provider response body
    pub fn parse_hits(&self, body: &Value) -> Vec<SearchHit> {
        let (items, snippet_field, link_field) = match self {
            Self::Tavily => (body.get("results"), "content", "url"),
            Self::Brave => (body.pointer("/web/results"), "description", "url"),
            Self::Serpapi => (body.get("organic_results"), "snippet", "link"),
        };

        let text = |item: &Value, field: &str| {
            item.get(field)
                .and_then(Value::as_str)
                .map(normalize_whitespace)
                .unwrap_or_default()
        };

        items
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .map(|item| SearchHit {
                        title: text(item, "title"),
                        snippet: text(item, snippet_field),
                        link: text(item, link_field),
                    })
                    .filter(|hit| !hit.title.is_empty() || !hit.snippet.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// One web search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub link: String,
}

impl SearchHit {
    pub fn flatten(&self) -> String {
        format!(
            "Title: {}\nSnippet: {}\nLink: {}",
            self.title, self.snippet, self.link
        )
    }
}

/// Retriever for general web search
pub struct WebSearchRetriever {
    client: reqwest::Client,
    provider: WebSearchProvider,
    api_key: String,
    reranker: Option<Arc<dyn Reranker>>,
}

impl WebSearchRetriever {
    pub fn new(
        provider: WebSearchProvider,
        api_key: impl Into<String>,
        user_agent: &str,
        timeout: Duration,
    ) -> DeepsiftResult<Self> {
        Ok(Self {
            client: build_http_client(user_agent, timeout)?,
            provider,
            api_key: api_key.into(),
            reranker: None,
        })
    }

    /// Build from retrieval settings, resolving the API key from the environment if needed
    pub fn from_settings(settings: &RetrievalSettings, timeout: Duration) -> DeepsiftResult<Self> {
        let provider = WebSearchProvider::parse(&settings.web_provider)?;
        let api_key = resolve_api_key(settings.web_api_key.as_deref(), provider.api_key_env())
            .ok_or_else(|| {
                config_error!(
                    format!("{} API key not found", provider.api_key_env()),
                    "web_search"
                )
            })?;

        Self::new(provider, api_key, &settings.user_agent, timeout)
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn provider(&self) -> WebSearchProvider {
        self.provider
    }

    async fn fetch(&self, query: &str, limit: usize) -> DeepsiftResult<Value> {
        let limit_param = limit.to_string();
        let request = match self.provider {
            WebSearchProvider::Tavily => self.client.post(TAVILY_URL).json(&json!({
                "api_key": self.api_key,
                "query": query,
                "max_results": limit,
            })),
            WebSearchProvider::Brave => self
                .client
                .get(BRAVE_URL)
                .header("X-Subscription-Token", &self.api_key)
                .header("Accept", "application/json")
                .query(&[("q", query), ("count", limit_param.as_str())]),
            WebSearchProvider::Serpapi => self.client.get(SERPAPI_URL).query(&[
                ("q", query),
                ("num", limit_param.as_str()),
                ("api_key", self.api_key.as_str()),
            ]),
        };

        let response = request.send().await.map_err(|e| {
            retrieval_error!(format!("Web search request failed: {}", e), self.name(), e)
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, self.name()));
        }

        response.json::<Value>().await.map_err(|e| {
            retrieval_error!(format!("Invalid web search response: {}", e), self.name(), e)
        })
    }
}

#[async_trait]
impl Retriever for WebSearchRetriever {
    fn name(&self) -> &str {
        "web_search"
    }

    fn kind(&self) -> SourceKind {
        SourceKind::WebSearch
    }

    async fn search(&self, query: &str, limit: usize) -> DeepsiftResult<String> {
        let body = self.fetch(query, limit).await?;
        let mut hits = self.provider.parse_hits(&body);
        hits.truncate(limit);

        if hits.is_empty() {
            return Err(retrieval_error!(
                format!("No web results found for '{}'", query),
                self.name()
            ));
        }

        if let Some(reranker) = &self.reranker {
            let snippets: Vec<String> = hits.iter().map(|hit| hit.snippet.clone()).collect();
            let ranked = reranker
                .rerank(query, &snippets, limit)
                .await
                .map_err(|e| e.into_retrieval(self.name()))?;
            hits = ranked
                .into_iter()
                .filter_map(|r| hits.get(r.index).cloned())
                .collect();
        }

        debug!("Web search returned {} hits for '{}'", hits.len(), query);
        Ok(hits
            .iter()
            .map(SearchHit::flatten)
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse() {
        assert_eq!(
            WebSearchProvider::parse("Tavily").unwrap(),
            WebSearchProvider::Tavily
        );
        assert_eq!(
            WebSearchProvider::parse("serpapi").unwrap().api_key_env(),
            "SERPAPI_API_KEY"
        );
        assert!(WebSearchProvider::parse("bing").is_err());
    }

    #[test]
    fn test_parse_tavily_hits() {
        let body = json!({
            "results": [
                {"title": "RL intro", "content": "Agents   learn\nfrom reward", "url": "https://a.example"},
                {"title": "", "content": "", "url": "https://empty.example"}
            ]
        });

        let hits = WebSearchProvider::Tavily.parse_hits(&body);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].snippet, "Agents learn from reward");
        assert!(hits[0].flatten().starts_with("Title: RL intro\nSnippet:"));
    }

    #[test]
    fn test_parse_brave_and_serpapi_hits() {
        let brave = json!({"web": {"results": [{"title": "B", "description": "d", "url": "u"}]}});
        assert_eq!(WebSearchProvider::Brave.parse_hits(&brave)[0].link, "u");

        let serp = json!({"organic_results": [{"title": "S", "snippet": "s", "link": "l"}]});
        assert_eq!(WebSearchProvider::Serpapi.parse_hits(&serp)[0].snippet, "s");

        assert!(WebSearchProvider::Brave.parse_hits(&json!({})).is_empty());
    }
}
