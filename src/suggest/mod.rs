//! Natural-language suggestion engine: one LLM attempt, a deterministic
//! fallback, and a policy re-check on whatever comes out.
//!
//! [`SuggestionEngine::suggest_command`] never returns a command that
//! [`CommandBroker::execute`](crate::broker::CommandBroker::execute) would
//! refuse.

pub mod candidate;
pub mod error;
pub mod heuristic;
pub mod intent;
pub mod prompt;
pub mod provider;
pub mod types;

pub use error::{CommandSuggestionError, SuggestionErrorCode};
pub use provider::{LlmProvider, ProviderId, ProviderRegistry, StreamChunk, StreamConfig};
pub use types::{ModelPreferences, SuggestRequest, SuggestResponse, SuggestionSource};

use std::time::Duration;

use tokio::sync::mpsc;

use crate::config::SuggestConfig;
use crate::eval;
use crate::logging;
use heuristic::{HeuristicInput, NamespaceScope};
use intent::QueryIntent;
use prompt::PromptInput;
use provider::SelectedProvider;
use types::CommandPlan;

const NO_PROVIDER_WARNING: &str = "No LLM provider configured; using heuristic suggestion";
const DIAGNOSTIC_MESSAGE: &str = "This looks like a diagnostic question. \
     Use the chat or root-cause analysis flow instead of a single command.";

pub struct SuggestionEngine {
    registry: ProviderRegistry,
    config: SuggestConfig,
}

impl SuggestionEngine {
    pub fn new(registry: ProviderRegistry, config: SuggestConfig) -> Self {
        Self { registry, config }
    }

    /// Providers are registered after construction by whoever owns the clients.
    pub fn registry_mut(&mut self) -> &mut ProviderRegistry {
        &mut self.registry
    }

    /// Turn a free-text query into one policy-approved kubectl command.
    pub async fn suggest_command(
        &self,
        request: SuggestRequest,
    ) -> Result<SuggestResponse, CommandSuggestionError> {
        let query = request.query.trim();
        if query.is_empty() {
            return Err(CommandSuggestionError::invalid("Query is required"));
        }

        let normalized = heuristic::normalize_query(query);
        let intent = QueryIntent::detect(&normalized);
        let mut warnings = Vec::new();

        let plan = match self
            .try_agentic(&request, &normalized, &intent, &mut warnings)
            .await
        {
            Some(plan) => plan,
            None => heuristic::plan(HeuristicInput {
                query: &normalized,
                intent: &intent,
                request_namespace: request.namespace.as_deref(),
                terminal_context: &request.recent_terminal_context,
            })
            .ok_or_else(|| {
                log::info!("no suggestion for diagnostic query {query:?}");
                CommandSuggestionError::unavailable(DIAGNOSTIC_MESSAGE)
            })?,
        };

        let decision = eval::evaluate_command_policy(&plan.command).decision;
        if !decision.allowed {
            log::warn!(
                "suggestion {:?} rejected by policy: {}",
                plan.command,
                decision.label()
            );
            return Err(CommandSuggestionError::blocked(decision));
        }

        log::info!(
            "suggested {:?} ({}, confidence {})",
            plan.command,
            source_label(plan.source),
            plan.confidence
        );

        for w in plan.warnings {
            if !warnings.contains(&w) {
                warnings.push(w);
            }
        }
        Ok(SuggestResponse {
            query: query.to_string(),
            suggested_command: plan.command,
            source: plan.source,
            confidence: plan.confidence.min(100),
            rationale: plan.rationale,
            assumptions: plan.assumptions,
            warnings,
            policy_decision: decision,
            generated_at: logging::timestamp_now(),
        })
    }

    /// One streamed provider call. `None` means "use the heuristic", with the
    /// reason pushed onto `warnings`.
    async fn try_agentic(
        &self,
        request: &SuggestRequest,
        normalized: &str,
        intent: &QueryIntent,
        warnings: &mut Vec<String>,
    ) -> Option<CommandPlan> {
        let Some(selected) = self.registry.select(request.model_preferences.as_ref()) else {
            if self.registry.is_empty() {
                log::debug!("no LLM providers registered");
            } else {
                log::debug!("no registered LLM provider has a credential");
            }
            warnings.push(NO_PROVIDER_WARNING.to_string());
            return None;
        };
        let provider_id = selected.provider.id();

        let text = match self.stream_text(selected, request, normalized).await {
            Ok(text) => text,
            Err(warning) => {
                log::warn!("{provider_id} attempt abandoned: {warning}");
                warnings.push(warning);
                return None;
            }
        };

        let result = candidate::parse_candidate(&text).and_then(|candidate| {
            intent::check_candidate(intent, &candidate.command).map(|_| candidate)
        });
        match result {
            Ok(candidate) => Some(CommandPlan {
                command: candidate.command,
                source: SuggestionSource::Agentic,
                confidence: candidate.confidence,
                rationale: candidate.rationale,
                assumptions: candidate.assumptions,
                warnings: candidate.warnings,
            }),
            Err(warning) => {
                log::debug!("{provider_id} candidate discarded: {warning}");
                warnings.push(warning);
                None
            }
        }
    }

    async fn stream_text(
        &self,
        selected: SelectedProvider,
        request: &SuggestRequest,
        normalized: &str,
    ) -> Result<String, String> {
        let default_namespace = self.prompt_namespace(request, normalized);
        let user_prompt = prompt::build_user_prompt(PromptInput {
            query: request.query.trim(),
            default_namespace: &default_namespace,
            cluster_context: request
                .cluster_context
                .as_deref()
                .filter(|c| !c.trim().is_empty()),
            terminal_context: &request.recent_terminal_context,
        });
        let config = StreamConfig {
            api_key: selected.api_key,
            model: selected.model,
            system_prompt: prompt::SYSTEM_PROMPT.to_string(),
            user_prompt,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let budget = Duration::from_millis(self.config.provider_timeout_ms.max(1));
        let call = async {
            let rx = selected.provider.stream_response(config).await;
            collect_stream(rx).await
        };
        tokio::time::timeout(budget, call).await.map_err(|_| {
            format!(
                "LLM provider did not answer within {}ms",
                self.config.provider_timeout_ms
            )
        })?
    }

    fn prompt_namespace(&self, request: &SuggestRequest, normalized: &str) -> String {
        let resolved = heuristic::infer_namespace(
            normalized,
            request.namespace.as_deref(),
            &request.recent_terminal_context,
        );
        match resolved.scope {
            NamespaceScope::Named(ns) => ns,
            NamespaceScope::All => "all namespaces (-A)".to_string(),
            NamespaceScope::Unspecified if self.config.default_namespace.is_empty() => {
                "default".to_string()
            }
            NamespaceScope::Unspecified => self.config.default_namespace.clone(),
        }
    }
}

/// Concatenate text chunks; the first error chunk ends the attempt.
async fn collect_stream(mut rx: mpsc::Receiver<StreamChunk>) -> Result<String, String> {
    let mut text = String::new();
    while let Some(chunk) = rx.recv().await {
        match chunk {
            StreamChunk::Text(t) => text.push_str(&t),
            StreamChunk::Error { message } => {
                return Err(format!("LLM provider error: {message}"));
            }
        }
    }
    Ok(text)
}

fn source_label(source: SuggestionSource) -> &'static str {
    match source {
        SuggestionSource::Heuristic => "heuristic",
        SuggestionSource::Agentic => "agentic",
    }
}
