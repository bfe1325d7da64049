//! The RAG Orchestrator (design doc §4.11): wires the ten pipeline steps
//! together and is the only thing in this crate that calls out to the
//! dispatch core. Mirrors `rag/rag_pipeline.py`'s `RAGPipeline.query`
//! end-to-end, but the inference and follow-up calls go through
//! [`dispatch_job`] rather than a direct provider client, so this pipeline
//! gets circuit breaking, retry, and fallback for free.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use airouter_circuitbreaker::CircuitBreakerManager;
use airouter_core::{ErrorKind, EventListeners, Job, JobType, Priority, RouterError, RouterEvent};
use airouter_providers::{InferenceOutcome, InferenceRequest, ProviderAdapter};
use airouter_retry::RetryPolicy;
use airouter_worker::{dispatch_job, DispatchFailure};

use crate::cache::RagCache;
use crate::config::RagConfig;
use crate::context_builder::{build_context, format_conversation_history};
use crate::models::{FollowUpQuestion, Provenance, RagRequest, RagResult, ResponseStyle};
use crate::postprocess::{detect_hallucination, extract_citations, redact_pii};
use crate::ranking::rank_and_filter;
use crate::retriever::Retriever;
use crate::sanitize::sanitize;
use crate::templates::TemplateRegistry;

fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}

/// Maps `response_style` to an inference temperature (design doc §9 open
/// question: the source did not fix a temperature per style, so this crate
/// picks a monotonic scale: terser answers sample less freely).
fn temperature_for(style: ResponseStyle) -> f32 {
    match style {
        ResponseStyle::Terse => 0.2,
        ResponseStyle::Balanced => 0.5,
        ResponseStyle::Detailed => 0.7,
    }
}

fn max_tokens_for(style: ResponseStyle) -> u32 {
    match style {
        ResponseStyle::Terse => 256,
        ResponseStyle::Balanced => 768,
        ResponseStyle::Detailed => 1536,
    }
}

fn provider_cost(providers: &[Arc<dyn ProviderAdapter>], provider_used: &str, tokens_used: u32) -> f64 {
    providers
        .iter()
        .find(|p| p.name() == provider_used)
        .map(|p| p.cost_per_1k_tokens() * (tokens_used as f64 / 1000.0))
        .unwrap_or(0.0)
}

/// Parses the follow-up template's declared JSON-array output, falling back
/// to extracting interrogative sentences when the model didn't return valid
/// JSON (design doc §9: "the follow-up generator's output format is a
/// prompt-level contract, not a guaranteed structural one").
fn parse_follow_ups(raw: &str, limit: usize) -> Vec<FollowUpQuestion> {
    #[derive(serde::Deserialize)]
    struct RawFollowUp {
        question: String,
        #[serde(default)]
        reasoning: String,
        #[serde(default = "default_priority")]
        priority: u8,
    }
    fn default_priority() -> u8 {
        1
    }

    if let Some(start) = raw.find('[') {
        if let Some(end) = raw.rfind(']') {
            if end >= start {
                if let Ok(parsed) = serde_json::from_str::<Vec<RawFollowUp>>(&raw[start..=end]) {
                    return parsed
                        .into_iter()
                        .take(limit)
                        .map(|p| FollowUpQuestion {
                            question: p.question,
                            reasoning: p.reasoning,
                            priority: p.priority,
                        })
                        .collect();
                }
            }
        }
    }

    raw.split('?')
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .map(|sentence| FollowUpQuestion {
            question: format!("{sentence}?"),
            reasoning: String::new(),
            priority: 1,
        })
        .take(limit)
        .collect()
}

/// Orchestrates sanitize → cache lookup → retrieve → rank/filter → build
/// context → template/prompt → inference → post-process → follow-ups →
/// assemble (design doc §4.11). Holds the same dispatch collaborators as
/// [`airouter_worker::WorkerPool`] (a circuit breaker manager, a retry
/// policy, and a provider candidate list) because it calls [`dispatch_job`]
/// directly rather than going through the priority queue and batcher.
pub struct RagPipeline {
    config: RagConfig,
    templates: TemplateRegistry,
    retriever: Arc<dyn Retriever>,
    cache: Arc<dyn RagCache>,
    providers: Vec<Arc<dyn ProviderAdapter>>,
    breaker: Arc<CircuitBreakerManager>,
    retry: Arc<RetryPolicy>,
    event_listeners: EventListeners<RouterEvent>,
    shutdown: Arc<AtomicBool>,
}

impl RagPipeline {
    pub fn new(
        config: RagConfig,
        retriever: Arc<dyn Retriever>,
        cache: Arc<dyn RagCache>,
        providers: Vec<Arc<dyn ProviderAdapter>>,
        breaker: Arc<CircuitBreakerManager>,
        retry: Arc<RetryPolicy>,
    ) -> Self {
        Self {
            config,
            templates: TemplateRegistry::new(),
            retriever,
            cache,
            providers,
            breaker,
            retry,
            event_listeners: EventListeners::new(),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_event_listeners(mut self, event_listeners: EventListeners<RouterEvent>) -> Self {
        self.event_listeners = event_listeners;
        self
    }

    /// Signals in-flight and future dispatch calls to stop rotating through
    /// providers, mirroring `WorkerPool::stop`'s shutdown flag.
    pub fn shutdown(&self) {
        self.shutdown.store(true, std::sync::atomic::Ordering::Release);
    }

    fn empty_info_result(&self, request: &RagRequest, template_name: &str) -> RagResult {
        let mut result = RagResult::empty_for(request.tenant_id.clone());
        result.answer = self.config.no_information_answer.clone();
        result.needs_verification = true;
        result.request_id = request.request_id.clone();
        result.template_used = template_name.to_string();
        result
    }

    /// Dispatches one inference call. `prompt` is the user body (already has
    /// the retrieved context and query substituted into it by
    /// [`crate::templates::PromptTemplate::format`]); `system_prompt` is the
    /// template's preamble, sent separately exactly as
    /// `rag_pipeline.py`'s `_generate_answer` does it
    /// (`inference(query=user_prompt, context=system_prompt)`).
    async fn run_inference(&self, tenant_id: &str, prompt: &str, system_prompt: &str, style: ResponseStyle) -> Result<(String, InferenceOutcome), RouterError> {
        let request = InferenceRequest {
            query: prompt.to_string(),
            context: system_prompt.to_string(),
            tenant_id: tenant_id.to_string(),
            max_tokens: max_tokens_for(style),
            temperature: temperature_for(style),
        };
        let payload = serde_json::to_value(&request)
            .expect("InferenceRequest always serializes")
            .as_object()
            .cloned()
            .expect("InferenceRequest serializes to an object")
            .into_iter()
            .collect();

        let job = Job::new(tenant_id, uuid::Uuid::new_v4().to_string(), JobType::Inference, Priority::Normal, payload);

        let outcome = dispatch_job(&job, &self.providers, &self.breaker, &self.retry, &self.event_listeners, &self.shutdown)
            .await
            .map_err(|failure| match failure {
                DispatchFailure::Exhausted(error) => error,
                DispatchFailure::ShuttingDown => RouterError::new(ErrorKind::AllProvidersFailed, "router is shutting down"),
            })?;

        let inference_outcome: InferenceOutcome = serde_json::from_value(outcome.value)
            .map_err(|error| RouterError::new(ErrorKind::Internal, format!("malformed inference outcome: {error}")))?;

        Ok((outcome.provider_used, inference_outcome))
    }

    async fn generate_follow_ups(&self, request: &RagRequest, answer: &str, context: &str) -> Vec<FollowUpQuestion> {
        if request.follow_up_count == 0 {
            return Vec::new();
        }

        let template = self.templates.get("follow_up");
        let mut vars = HashMap::new();
        vars.insert("query", request.query.clone());
        vars.insert("answer", answer.to_string());
        vars.insert("context", context.to_string());
        let prompt = template.format(&vars);

        match self.run_inference(&request.tenant_id, &prompt, template.system_prompt, ResponseStyle::Terse).await {
            Ok((_, outcome)) => parse_follow_ups(&outcome.answer, request.follow_up_count),
            Err(_) => Vec::new(),
        }
    }

    /// Runs the full pipeline. Dry-run requests short-circuit at step 6 and
    /// skip inference, follow-ups, and cache population entirely (design doc
    /// §4.11: "short-circuits at step 6 and returns the assembled prompt
    /// plus the list of snippets").
    pub async fn query(&self, request: RagRequest) -> Result<RagResult, RouterError> {
        let pipeline_start = Instant::now();

        let template_name = request.template.clone().unwrap_or_else(|| "standard".to_string());
        let template = self.templates.get(&template_name);

        let step_start = Instant::now();
        let sanitized = sanitize(&self.config, &request, template.name)?;
        let sanitization_ms = elapsed_ms(step_start);

        if !request.dry_run {
            if let Some(mut cached) = self.cache.get(&sanitized.idempotency_key).await {
                cached.cache_hit = true;
                cached.provenance = None;
                self.event_listeners.emit(&RouterEvent::RagCacheHit {
                    idempotency_key: sanitized.idempotency_key.clone(),
                    timestamp: Instant::now(),
                });
                return Ok(cached);
            }
        }

        let step_start = Instant::now();
        let candidates = self
            .retriever
            .retrieve(&sanitized.sanitized_query, request.top_k, &request.tenant_id, request.filters.as_ref())
            .await?;
        let retrieval_ms = elapsed_ms(step_start);
        let total_candidates = candidates.len();

        if candidates.is_empty() {
            return Ok(self.empty_info_result(&request, template.name));
        }

        let step_start = Instant::now();
        let filtered = rank_and_filter(&candidates, &request);
        let ranking_ms = elapsed_ms(step_start);
        let filtered_candidates = filtered.len();

        if filtered.is_empty() {
            return Ok(self.empty_info_result(&request, template.name));
        }

        let step_start = Instant::now();
        let context_window = build_context(&self.config, &filtered, request.token_budget.min(self.config.max_context_tokens));
        let context_build_ms = elapsed_ms(step_start);

        let conversation_history = format_conversation_history(&request.conversation_history);
        let mut vars = HashMap::new();
        vars.insert("context", context_window.formatted_context.clone());
        vars.insert("query", sanitized.sanitized_query.clone());
        vars.insert("conversation_history", conversation_history);
        let prompt = template.format(&vars);

        if request.dry_run {
            let mut result = self.empty_info_result(&request, template.name);
            result.answer = String::new();
            result.needs_verification = false;
            result.generated_prompt = Some(prompt);
            result.selected_snippets = Some(context_window.documents.iter().map(|doc| doc.content.clone()).collect());
            return Ok(result);
        }

        // §4.11 step 6: strictness selects among template variants by
        // scaling the chosen template's system preamble rather than the
        // retrieved-document context, which already went into `prompt` above.
        let system_prompt = template.system_prompt_for(request.strictness);

        let step_start = Instant::now();
        let (provider_used, inference_outcome) = self
            .run_inference(&request.tenant_id, &prompt, &system_prompt, request.response_style)
            .await?;
        let inference_ms = elapsed_ms(step_start);

        let step_start = Instant::now();
        let (redacted_answer, redactions_applied) = redact_pii(&self.config, &inference_outcome.answer);
        let citations = extract_citations(&redacted_answer, &context_window, &request);
        let (hallucination_warning, confidence_score) = detect_hallucination(&redacted_answer, &citations, request.strictness, &self.config);
        let post_process_ms = elapsed_ms(step_start);

        let step_start = Instant::now();
        let follow_up_questions = self
            .generate_follow_ups(&request, &redacted_answer, &context_window.formatted_context)
            .await;
        let follow_up_ms = elapsed_ms(step_start);

        let provenance = Provenance {
            sanitization_ms,
            retrieval_ms,
            ranking_ms,
            context_build_ms,
            inference_ms,
            post_process_ms,
            follow_up_ms,
            total_ms: elapsed_ms(pipeline_start),
            model_used: inference_outcome.model.clone(),
            tokens_used: inference_outcome.tokens_used,
            cost_estimate: provider_cost(&self.providers, &provider_used, inference_outcome.tokens_used),
            total_candidates,
            filtered_candidates,
            context_tokens: context_window.token_count,
        };

        let result = RagResult {
            answer: redacted_answer,
            citations,
            follow_up_questions,
            confidence_score,
            hallucination_warning,
            redactions_applied,
            cache_hit: false,
            needs_verification: hallucination_warning,
            provenance: Some(provenance),
            request_id: request.request_id.clone(),
            tenant_id: request.tenant_id.clone(),
            template_used: template.name.to_string(),
            timestamp: chrono::Utc::now(),
            generated_prompt: None,
            selected_snippets: None,
        };

        self.cache.put(&sanitized.idempotency_key, result.clone()).await;

        Ok(result)
    }
}
