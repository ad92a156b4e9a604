//! The answer pipeline: route, aggregate, prompt, synthesize, post-process.

use crate::aggregator::ContextAggregator;
use crate::classifier::KeywordClassifier;
use crate::postprocess::{no_context_result, process};
use crate::router::Router;
use crate::synthesizer::{AnswerSynthesizer, LlmSynthesizer, RetryPolicy, SynthesisGateway};
use std::sync::Arc;
use std::time::Instant;
use support_core::config::{RoutingConfig, SynthesisConfig};
use support_core::{AnswerResult, AppConfig, AppResult};
use support_knowledge::{CustomerDirectory, DocumentIndex, SqliteDirectory, SqliteDocumentIndex};
use support_llm::client_from_config;
use support_prompt::{load_answer_prompt, PromptBuilder, PromptDefinition};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Answers customer-support questions from the directory and the policy index.
///
/// Holds only read-only configuration and collaborator handles; concurrent
/// `answer` calls do not interact.
pub struct SupportPipeline {
    directory: Arc<dyn CustomerDirectory>,
    router: Router,
    aggregator: ContextAggregator,
    prompt_builder: PromptBuilder,
    gateway: SynthesisGateway,
    default_results: usize,
}

impl SupportPipeline {
    /// Assemble a pipeline from explicit collaborators.
    pub fn new(
        directory: Arc<dyn CustomerDirectory>,
        index: Arc<dyn DocumentIndex>,
        synthesizer: Arc<dyn AnswerSynthesizer>,
        prompt: &PromptDefinition,
        routing: &RoutingConfig,
        synthesis: &SynthesisConfig,
    ) -> AppResult<Self> {
        Ok(Self {
            router: Router::new(KeywordClassifier::new(&routing.policy_keywords)),
            aggregator: ContextAggregator::new(directory.clone(), index),
            prompt_builder: PromptBuilder::new(prompt, routing.max_tickets_in_prompt)?,
            gateway: SynthesisGateway::new(synthesizer, RetryPolicy::from_config(synthesis)),
            directory,
            default_results: routing.default_results,
        })
    }

    /// Build the production pipeline: SQLite stores, configured LLM provider,
    /// workspace prompt override if any.
    ///
    /// Validates the configuration first; a missing credential fails here,
    /// before any query is accepted.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        config.validate()?;

        let client = client_from_config(config)?;
        let synthesizer = LlmSynthesizer::new(client, config.model.clone())
            .with_temperature(config.synthesis.temperature)
            .with_max_tokens(config.synthesis.max_tokens);

        let directory = SqliteDirectory::new(config.directory_path());
        let index = SqliteDocumentIndex::new(
            config.index_path(),
            config.storage.chunk_size,
            config.storage.chunk_overlap,
        );
        let prompt = load_answer_prompt(&config.workspace)?;

        tracing::info!(
            provider = %config.provider,
            model = %config.model,
            directory = ?directory.path(),
            index = ?index.path(),
            "Support pipeline ready"
        );

        Self::new(
            Arc::new(directory),
            Arc::new(index),
            Arc::new(synthesizer),
            &prompt,
            &config.routing,
            &config.synthesis,
        )
    }

    pub fn default_results(&self) -> usize {
        self.default_results
    }

    /// Answer one query. `n_results` defaults to the configured count.
    pub async fn answer(&self, query: &str, n_results: Option<usize>) -> AppResult<AnswerResult> {
        self.answer_cancellable(query, n_results, &CancellationToken::new())
            .await
    }

    /// Like [`answer`](Self::answer), abandoning synthesis with
    /// `AppError::Cancelled` once `cancel` fires.
    pub async fn answer_cancellable(
        &self,
        query: &str,
        n_results: Option<usize>,
        cancel: &CancellationToken,
    ) -> AppResult<AnswerResult> {
        let span = tracing::info_span!("answer", query_len = query.len());
        self.run(query, n_results.unwrap_or(self.default_results), cancel)
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        query: &str,
        n_results: usize,
        cancel: &CancellationToken,
    ) -> AppResult<AnswerResult> {
        let start = Instant::now();

        let routing = self.router.route(query, self.directory.as_ref()).await;
        tracing::info!(route = %routing.decision, "Routed query");

        let bundle = self.aggregator.aggregate(query, &routing, n_results).await;

        if bundle.is_empty() {
            tracing::info!("No evidence found, skipping synthesis");
            return Ok(no_context_result(query, routing.decision));
        }

        let request = self.prompt_builder.build(query, &bundle)?;
        let raw_answer = self.gateway.synthesize(&request, cancel).await?;
        let result = process(&raw_answer, &bundle, query, routing.decision);

        tracing::info!(
            sources = result.sources.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Answered query"
        );

        Ok(result)
    }
}
