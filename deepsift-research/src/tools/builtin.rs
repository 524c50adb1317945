//! Concrete tools over the research engine, retrieval sources, extractors
//! and the generator

use super::validation::{int_in_range, max_results, optional_str, require_str, require_url};
use super::{Tool, ToolError};
use crate::research::DeepSearchAgent;
use async_trait::async_trait;
use deepsift_core::{ContentExtractor, Generator, Retriever};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Runs a full deep-search and returns the final answer
pub struct DeepResearchTool {
    agent: Arc<DeepSearchAgent>,
}

impl DeepResearchTool {
    pub const NAME: &'static str = "deep_research";

    pub fn new(agent: Arc<DeepSearchAgent>) -> Self {
        Self { agent }
    }
}

#[async_trait]
impl Tool for DeepResearchTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Research a question in depth across every configured source, iterating \
         until the answer is complete or the research budget is spent."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The research question"
                },
                "namespace": {
                    "type": "string",
                    "description": "Memory partition for this run's intermediate findings"
                }
            },
            "required": ["query"]
        })
    }

    async fn invoke(&self, args: Value) -> Result<String, ToolError> {
        let query = require_str(&args, "query", Self::NAME)?;
        let namespace =
            optional_str(&args, "namespace", Self::NAME)?.unwrap_or(self.agent.config().namespace.as_str());

        let report = self
            .agent
            .run_with(query, namespace, &CancellationToken::new())
            .await
            .map_err(|e| ToolError::from_core(Self::NAME, e))?;
        Ok(report.answer)
    }
}

/// Exposes one retrieval source as a query tool
pub struct RetrieverTool {
    name: &'static str,
    description: &'static str,
    default_limit: u64,
    retriever: Arc<dyn Retriever>,
}

impl RetrieverTool {
    pub fn new(
        name: &'static str,
        description: &'static str,
        default_limit: u64,
        retriever: Arc<dyn Retriever>,
    ) -> Self {
        Self {
            name,
            description,
            default_limit,
            retriever,
        }
    }

    /// Semantic search over long-term memory
    pub fn search_documents(retriever: Arc<dyn Retriever>) -> Self {
        Self::new(
            "search_documents",
            "Search previously gathered research findings stored in memory.",
            5,
            retriever,
        )
    }

    pub fn search_web(retriever: Arc<dyn Retriever>) -> Self {
        Self::new(
            "search_web",
            "Search the web and return titles, snippets and links of the top results.",
            5,
            retriever,
        )
    }

    pub fn search_arxiv_papers(retriever: Arc<dyn Retriever>) -> Self {
        Self::new(
            "search_arxiv_papers",
            "Search arXiv and return matching papers with authors, abstract and link.",
            3,
            retriever,
        )
    }
}

#[async_trait]
impl Tool for RetrieverTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query"
                },
                "max_results": {
                    "type": "integer",
                    "minimum": 1,
                    "maximum": 100,
                    "default": self.default_limit,
                    "description": "Maximum number of results to return"
                }
            },
            "required": ["query"]
        })
    }

    async fn invoke(&self, args: Value) -> Result<String, ToolError> {
        let query = require_str(&args, "query", self.name)?;
        let limit = max_results(&args, self.default_limit, self.name)?;

        debug!(tool = self.name, source = self.retriever.name(), limit, "Invoking retriever");
        self.retriever
            .search(query, limit)
            .await
            .map_err(|e| ToolError::from_core(self.name, e))
    }
}

/// Exposes a content extractor taking a single URL
pub struct ExtractorTool {
    name: &'static str,
    description: &'static str,
    url_field: &'static str,
    extractor: Arc<dyn ContentExtractor>,
}

impl ExtractorTool {
    pub fn new(
        name: &'static str,
        description: &'static str,
        url_field: &'static str,
        extractor: Arc<dyn ContentExtractor>,
    ) -> Self {
        Self {
            name,
            description,
            url_field,
            extractor,
        }
    }

    pub fn scrape_website(extractor: Arc<dyn ContentExtractor>) -> Self {
        Self::new(
            "scrape_website",
            "Fetch a web page and return its readable text.",
            "url",
            extractor,
        )
    }

    pub fn transcript_video(extractor: Arc<dyn ContentExtractor>) -> Self {
        Self::new(
            "transcript_video",
            "Fetch the timestamped transcript of a video.",
            "video_url",
            extractor,
        )
    }
}

#[async_trait]
impl Tool for ExtractorTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    fn parameters_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        properties.insert(
            self.url_field.to_string(),
            json!({
                "type": "string",
                "format": "uri",
                "description": "http(s) URL to fetch"
            }),
        );
        json!({
            "type": "object",
            "properties": properties,
            "required": [self.url_field]
        })
    }

    async fn invoke(&self, args: Value) -> Result<String, ToolError> {
        let url = require_url(&args, self.url_field, self.name)?;
        self.extractor
            .extract(&url)
            .await
            .map_err(|e| ToolError::from_core(self.name, e))
    }
}

/// Turns a passage of text, or a PDF document, into question/answer cards
pub struct FlashcardTool {
    generator: Arc<dyn Generator>,
    documents: Option<Arc<dyn ContentExtractor>>,
}

impl FlashcardTool {
    pub const NAME: &'static str = "generate_flashcards";
    pub const DEFAULT_QUANTITY: u64 = 5;
    pub const MAX_QUANTITY: u64 = 20;

    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self {
            generator,
            documents: None,
        }
    }

    /// Accept a `document` argument read through `extractor`
    pub fn with_documents(mut self, extractor: Arc<dyn ContentExtractor>) -> Self {
        self.documents = Some(extractor);
        self
    }

    /// Source material from exactly one of `text` or `document`
    async fn material(&self, args: &Value) -> Result<String, ToolError> {
        let text = optional_str(args, "text", Self::NAME)?;
        let document = optional_str(args, "document", Self::NAME)?;

        match (text, document) {
            (Some(text), None) => Ok(text.to_string()),
            (None, Some(document)) => {
                let extractor = self.documents.as_ref().ok_or_else(|| {
                    ToolError::validation(Self::NAME, "document sources are not enabled")
                })?;
                debug!(tool = Self::NAME, document, "Extracting flashcard source");
                extractor
                    .extract(document)
                    .await
                    .map_err(|e| ToolError::from_core(Self::NAME, e))
            }
            (Some(_), Some(_)) => Err(ToolError::validation(
                Self::NAME,
                "provide either 'text' or 'document', not both",
            )),
            (None, None) => Err(ToolError::validation(
                Self::NAME,
                "missing required field 'text' or 'document'",
            )),
        }
    }
}

#[async_trait]
impl Tool for FlashcardTool {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn description(&self) -> &str {
        "Generate study flashcards (question and answer pairs) from a topic, a passage \
         or a PDF document."
    }

    fn parameters_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        properties.insert(
            "text".to_string(),
            json!({
                "type": "string",
                "description": "Topic or passage to build flashcards from"
            }),
        );
        if self.documents.is_some() {
            properties.insert(
                "document".to_string(),
                json!({
                    "type": "string",
                    "description": "Path or http(s) URL of a PDF to build flashcards from"
                }),
            );
        }
        properties.insert(
            "quantity".to_string(),
            json!({
                "type": "integer",
                "minimum": 1,
                "maximum": Self::MAX_QUANTITY,
                "default": Self::DEFAULT_QUANTITY
            }),
        );

        let mut schema = json!({
            "type": "object",
            "properties": properties
        });
        // With documents enabled exactly one of text/document is checked at invoke time
        if self.documents.is_none() {
            schema["required"] = json!(["text"]);
        }
        schema
    }

    async fn invoke(&self, args: Value) -> Result<String, ToolError> {
        let quantity = int_in_range(
            &args,
            "quantity",
            Self::DEFAULT_QUANTITY,
            1,
            Self::MAX_QUANTITY,
            Self::NAME,
        )? as usize;
        let material = self.material(&args).await?;

        let cards = self
            .generator
            .flashcards(&material, quantity)
            .await
            .map_err(|e| ToolError::from_core(Self::NAME, e))?;

        serde_json::to_string_pretty(&cards)
            .map_err(|e| ToolError::execution(Self::NAME, format!("failed to encode flashcards: {}", e)))
    }
}
