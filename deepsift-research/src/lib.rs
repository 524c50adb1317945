//! Deepsift Research - Deep-search agent built on the RAG foundation
//!
//! This crate turns the capabilities from `deepsift-rag` into a research
//! application:
//!
//! - An iterative deep-search engine (decompose, retrieve, summarize, reflect)
//! - Retrieval sources for memory, the web and arXiv, plus page, transcript
//!   and PDF extractors
//! - A validated tool layer an outer agent can call by name
//!
//! ## Architecture
//!
//! - **Capabilities** (deepsift-core / deepsift-rag): contracts, LLM, memory
//! - **Applications** (this crate): research loop, sources, tools
//! - **Presentation** (deepsift-cli): command line interface

pub mod research;
pub mod sources;
pub mod tools;

pub use research::{DeepSearchAgent, ResearchReport, RoundRecord, TerminationReason};
pub use sources::{
    ArxivRetriever, HttpPageExtractor, PdfExtractor, SemanticRetriever, WebSearchProvider,
    WebSearchRetriever, YoutubeTranscriptExtractor,
};
pub use tools::{
    DeepResearchTool, ExtractorTool, FlashcardTool, RetrieverTool, Tool, ToolDefinition, ToolError,
    ToolErrorKind, ToolRegistry,
};

use deepsift_core::{
    ContentExtractor, DeepsiftConfig, DeepsiftResult, Generator, MemoryStore, Reranker, Retriever,
};
use deepsift_rag::{create_generator, create_memory_store, LexicalReranker, TokenCounter};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Everything needed to run research and serve tools, wired from configuration
pub struct ResearchStack {
    pub agent: Arc<DeepSearchAgent>,
    pub generator: Arc<dyn Generator>,
    pub memory: Arc<dyn MemoryStore>,
    pub token_counter: Arc<TokenCounter>,
    pub tools: ToolRegistry,
}

/// Build the retrieval sources enabled in configuration
///
/// A web source whose API key cannot be resolved is skipped with a warning
/// rather than failing the whole stack.
pub fn create_retrievers(
    config: &DeepsiftConfig,
    memory: Arc<dyn MemoryStore>,
) -> DeepsiftResult<Vec<Arc<dyn Retriever>>> {
    let settings = &config.retrieval;
    let timeout = Duration::from_secs(config.research.adapter_timeout_secs);
    let reranker: Option<Arc<dyn Reranker>> = settings
        .enable_reranking
        .then(|| Arc::new(LexicalReranker::new()) as Arc<dyn Reranker>);

    let mut retrievers: Vec<Arc<dyn Retriever>> = Vec::new();

    if settings.semantic_enabled {
        let mut semantic = SemanticRetriever::new(memory, config.research.namespace.clone());
        if let Some(reranker) = &reranker {
            semantic = semantic.with_reranker(reranker.clone());
        }
        retrievers.push(Arc::new(semantic));
    }

    if settings.web_search_enabled {
        match WebSearchRetriever::from_settings(settings, timeout) {
            Ok(mut web) => {
                if let Some(reranker) = &reranker {
                    web = web.with_reranker(reranker.clone());
                }
                retrievers.push(Arc::new(web));
            }
            Err(e) => warn!("Web search disabled: {}", e),
        }
    }

    if settings.arxiv_enabled {
        retrievers.push(Arc::new(ArxivRetriever::new(
            settings.arxiv_base_url.clone(),
            &settings.user_agent,
            timeout,
        )?));
    }

    info!(
        "Configured retrieval sources: {:?}",
        retrievers.iter().map(|r| r.name()).collect::<Vec<_>>()
    );
    Ok(retrievers)
}

/// Register one tool per capability over already-built components
pub fn create_tool_registry(
    config: &DeepsiftConfig,
    agent: Arc<DeepSearchAgent>,
    generator: Arc<dyn Generator>,
    retrievers: &[Arc<dyn Retriever>],
) -> DeepsiftResult<ToolRegistry> {
    let timeout = Duration::from_secs(config.research.adapter_timeout_secs);
    let user_agent = &config.retrieval.user_agent;

    let mut registry = ToolRegistry::new();
    registry.register(DeepResearchTool::new(agent));

    for retriever in retrievers {
        let tool = match retriever.name() {
            "semantic" => RetrieverTool::search_documents(retriever.clone()),
            "web_search" => RetrieverTool::search_web(retriever.clone()),
            "arxiv" => RetrieverTool::search_arxiv_papers(retriever.clone()),
            other => {
                warn!("No tool mapping for retrieval source '{}'", other);
                continue;
            }
        };
        registry.register(tool);
    }

    let pages: Arc<dyn ContentExtractor> = Arc::new(HttpPageExtractor::new(user_agent, timeout)?);
    let transcripts: Arc<dyn ContentExtractor> =
        Arc::new(YoutubeTranscriptExtractor::new(user_agent, timeout)?);
    registry.register(ExtractorTool::scrape_website(pages));
    registry.register(ExtractorTool::transcript_video(transcripts));
    let documents: Arc<dyn ContentExtractor> = Arc::new(PdfExtractor::new(user_agent, timeout)?);
    registry.register(FlashcardTool::new(generator).with_documents(documents));

    Ok(registry)
}

/// Wire generator, memory, sources, agent and tools from configuration
pub async fn build_research_stack(config: &DeepsiftConfig) -> DeepsiftResult<ResearchStack> {
    config.research.validate()?;

    let token_counter = Arc::new(TokenCounter::new(&config.research.tokenizer_encoding)?);
    let generator: Arc<dyn Generator> =
        Arc::new(create_generator(config, token_counter.clone()).await?);
    let memory: Arc<dyn MemoryStore> = Arc::new(create_memory_store(config).await?);
    let retrievers = create_retrievers(config, memory.clone())?;

    let agent = Arc::new(DeepSearchAgent::new(
        config.research.clone(),
        generator.clone(),
        retrievers.clone(),
        memory.clone(),
        token_counter.clone(),
    )?);
    let tools = create_tool_registry(config, agent.clone(), generator.clone(), &retrievers)?;

    Ok(ResearchStack {
        agent,
        generator,
        memory,
        token_counter,
        tools,
    })
}
