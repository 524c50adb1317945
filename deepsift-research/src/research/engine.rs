//! Deep-search research engine
//!
//! Drives the decompose → retrieve → summarize → reflect loop. Each run owns
//! its evidence accumulator and writes round syntheses into its own memory
//! namespace, so concurrent runs never share mutable state.

use super::types::*;
use deepsift_core::{
    log_operation_error, log_operation_start, log_operation_success, performance,
    process_concurrently, with_timeout, DeepsiftError, DeepsiftResult, ErrorContext, Generator,
    MemoryStore, ResearchSettings, Retriever,
};
use deepsift_rag::TokenCounter;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Iterative multi-source research agent
pub struct DeepSearchAgent {
    config: ResearchSettings,
    generator: Arc<dyn Generator>,
    retrievers: Vec<Arc<dyn Retriever>>,
    memory: Arc<dyn MemoryStore>,
    token_counter: Arc<TokenCounter>,
}

impl DeepSearchAgent {
    /// Create an agent, rejecting non-positive budgets up front
    pub fn new(
        config: ResearchSettings,
        generator: Arc<dyn Generator>,
        retrievers: Vec<Arc<dyn Retriever>>,
        memory: Arc<dyn MemoryStore>,
        token_counter: Arc<TokenCounter>,
    ) -> DeepsiftResult<Self> {
        config.validate()?;

        if retrievers.is_empty() {
            warn!("Deep search agent created without retrieval sources");
        }

        Ok(Self {
            config,
            generator,
            retrievers,
            memory,
            token_counter,
        })
    }

    pub fn config(&self) -> &ResearchSettings {
        &self.config
    }

    pub fn retriever_names(&self) -> Vec<&str> {
        self.retrievers.iter().map(|r| r.name()).collect()
    }

    /// Research a query in the configured namespace and return the final answer
    pub async fn run(&self, query: &str) -> DeepsiftResult<String> {
        let report = self
            .run_with(query, &self.config.namespace, &CancellationToken::new())
            .await?;
        Ok(report.answer)
    }

    /// Research a query with an explicit memory namespace and cancellation token
    pub async fn run_with(
        &self,
        query: &str,
        namespace: &str,
        cancel: &CancellationToken,
    ) -> DeepsiftResult<ResearchReport> {
        log_operation_start!("deep_search", query = query, namespace = namespace);

        let result = performance::measure_async("deep_search", self.execute(query, namespace, cancel)).await;
        match &result {
            Ok(report) => {
                log_operation_success!(
                    "deep_search",
                    rounds = report.rounds.len(),
                    total_tokens = report.total_tokens,
                    termination = %report.termination
                );
            }
            Err(e) => {
                log_operation_error!("deep_search", e);
            }
        }
        result
    }

    async fn execute(
        &self,
        query: &str,
        namespace: &str,
        cancel: &CancellationToken,
    ) -> DeepsiftResult<ResearchReport> {
        let started_at = chrono::Utc::now();
        let start = Instant::now();
        let mut state = RunState::new(namespace);
        let mut rounds = Vec::new();

        check_cancelled(cancel, "decompose")?;
        let mut sub_queries = self.decompose(query, cancel).await?;
        info!("Decomposed query into {} sub-queries", sub_queries.len());

        let termination = loop {
            if sub_queries.is_empty() {
                break TerminationReason::NoSubQueries;
            }
            if state.depth >= self.config.max_depth {
                break TerminationReason::DepthExhausted;
            }
            let tokens = self.token_counter.count_joined(&state.chunks);
            if tokens >= self.config.max_tokens {
                info!(
                    "Token budget reached ({} >= {})",
                    tokens, self.config.max_tokens
                );
                break TerminationReason::TokenBudgetExhausted;
            }
            check_cancelled(cancel, "research_round")?;

            let (record, reflection) = self
                .run_round(query, &sub_queries, &mut state, cancel)
                .await?;
            rounds.push(record);

            if reflection.should_terminate() {
                break TerminationReason::ReflectionComplete;
            }
            sub_queries = self.next_sub_queries(reflection.sub_queries, &state.asked);
        };

        check_cancelled(cancel, "final_summary")?;
        let answer = race_cancel(
            cancel,
            "final_summary",
            self.generator.summarize(query, &state.chunks),
        )
        .await?;

        Ok(ResearchReport {
            query: query.to_string(),
            answer,
            namespace: state.namespace,
            rounds,
            termination,
            total_tokens: self.token_counter.count_joined(&state.chunks),
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }

    async fn decompose(&self, query: &str, cancel: &CancellationToken) -> DeepsiftResult<Vec<String>> {
        match race_cancel(cancel, "decompose", self.generator.generate_sub_queries(query)).await {
            Ok(sub_queries) => Ok(self.next_sub_queries(sub_queries, &[])),
            Err(e) if self.config.fallback_to_query_on_decompose_error && !e.is_cancelled() => {
                warn!("Decomposition failed, researching the original query: {}", e);
                Ok(vec![query.to_string()])
            }
            Err(e) => Err(e),
        }
    }

    /// Deduplicate, drop already-researched queries and cap to the per-round limit
    fn next_sub_queries(&self, candidates: Vec<String>, asked: &[String]) -> Vec<String> {
        let mut next: Vec<String> = Vec::new();
        for candidate in candidates {
            let candidate = candidate.trim();
            if candidate.is_empty()
                || next.iter().any(|q| q.eq_ignore_ascii_case(candidate))
                || asked.iter().any(|q| q.eq_ignore_ascii_case(candidate))
            {
                continue;
            }
            next.push(candidate.to_string());
            if next.len() >= self.config.max_sub_queries_per_round {
                break;
            }
        }
        next
    }

    async fn run_round(
        &self,
        query: &str,
        sub_queries: &[String],
        state: &mut RunState,
        cancel: &CancellationToken,
    ) -> DeepsiftResult<(RoundRecord, deepsift_core::Reflection)> {
        let depth = state.depth;
        info!(
            "Research round {} with {} sub-queries",
            depth + 1,
            sub_queries.len()
        );

        let namespace = state.namespace.clone();
        let namespace = namespace.as_str();
        let evidence = process_concurrently(
            sub_queries.to_vec(),
            self.config.max_concurrency,
            move |sub_query: String| async move {
                self.research_sub_query(&sub_query, namespace, cancel).await
            },
        )
        .await;

        // Appended in sub-query order by this task only
        let mut added = 0;
        for chunk in evidence {
            if let Some(chunk) = chunk? {
                state.chunks.push(chunk);
                added += 1;
            }
        }
        state.asked.extend(sub_queries.iter().cloned());

        check_cancelled(cancel, "round_synthesis")?;
        let synthesis = race_cancel(
            cancel,
            "round_synthesis",
            self.generator.summarize(query, &state.chunks),
        )
        .await?;

        if !synthesis.trim().is_empty() {
            if let Err(e) = self.memory.upsert(&synthesis, &state.namespace).await {
                warn!(
                    namespace = %state.namespace,
                    error = %e,
                    "Failed to persist round synthesis"
                );
            }
        }

        let latest: Vec<String> = if synthesis.trim().is_empty() {
            Vec::new()
        } else {
            vec![synthesis.clone()]
        };
        let reflection = race_cancel(
            cancel,
            "reflection",
            self.generator.reflection(query, sub_queries, &latest),
        )
        .await?;

        state.depth += 1;
        let tokens_after = self.token_counter.count_joined(&state.chunks);
        info!(
            "Round {} added {} chunks ({} tokens total), reflection complete: {}",
            depth + 1,
            added,
            tokens_after,
            reflection.complete
        );

        Ok((
            RoundRecord {
                depth,
                sub_queries: sub_queries.to_vec(),
                evidence_chunks_added: added,
                synthesis,
                tokens_after,
            },
            reflection,
        ))
    }

    /// Fan a sub-query out to every source and summarize what came back
    async fn research_sub_query(
        &self,
        sub_query: &str,
        namespace: &str,
        cancel: &CancellationToken,
    ) -> DeepsiftResult<Option<String>> {
        let calls = self
            .retrievers
            .iter()
            .map(|retriever| self.search_source(retriever.as_ref(), sub_query, namespace, cancel));
        let results = futures::future::join_all(calls).await;

        let mut contributions = Vec::new();
        for (retriever, result) in self.retrievers.iter().zip(results) {
            match result {
                Ok(text) if !text.trim().is_empty() => contributions.push(text),
                Ok(_) => debug!(source = retriever.name(), "Source returned no text"),
                Err(e) if e.is_cancelled() => return Err(e),
                Err(e) => {
                    warn!(
                        source = retriever.name(),
                        sub_query = sub_query,
                        error = %e,
                        "Retrieval source failed, skipping"
                    );
                }
            }
        }

        if contributions.is_empty() {
            debug!("No evidence for sub-query '{}'", sub_query);
            return Ok(None);
        }

        let evidence = self.bounded_evidence(contributions.join("\n\n"))?;
        let summary = race_cancel(
            cancel,
            "summarize_sub_query",
            self.generator.summarize(sub_query, &[evidence]),
        )
        .await?;

        let summary = summary.trim();
        Ok((!summary.is_empty()).then(|| summary.to_string()))
    }

    async fn search_source(
        &self,
        retriever: &dyn Retriever,
        sub_query: &str,
        namespace: &str,
        cancel: &CancellationToken,
    ) -> DeepsiftResult<String> {
        let operation = format!("{}.search", retriever.name());
        let timeout_ms = self.config.adapter_timeout_secs.saturating_mul(1000);

        race_cancel(cancel, &operation, async {
            with_timeout(
                retriever.search_in(sub_query, namespace, self.config.per_source_limit),
                timeout_ms,
                &operation,
            )
            .await
            .and_then(|result| result)
            .map_err(|e| e.into_retrieval(retriever.name()))
        })
        .await
    }

    /// Truncate raw evidence that alone exceeds the token budget
    fn bounded_evidence(&self, evidence: String) -> DeepsiftResult<String> {
        let tokens = self.token_counter.count_tokens(&evidence);
        if tokens <= self.config.max_tokens {
            return Ok(evidence);
        }

        debug!(
            "Truncating evidence from {} to {} tokens",
            tokens, self.config.max_tokens
        );
        Ok(self
            .token_counter
            .truncate_to_tokens(&evidence, self.config.max_tokens)?)
    }
}

fn cancelled(operation: &str) -> DeepsiftError {
    DeepsiftError::Cancelled {
        operation: operation.to_string(),
        context: ErrorContext::new("research").with_operation(operation),
    }
}

fn check_cancelled(cancel: &CancellationToken, operation: &str) -> DeepsiftResult<()> {
    if cancel.is_cancelled() {
        return Err(cancelled(operation));
    }
    Ok(())
}

/// Resolve `future` unless the token is cancelled first
async fn race_cancel<T, F>(cancel: &CancellationToken, operation: &str, future: F) -> DeepsiftResult<T>
where
    F: Future<Output = DeepsiftResult<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(cancelled(operation)),
        result = future => result,
    }
}
