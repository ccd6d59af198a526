use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use kubeops_gate::AppContext;
use kubeops_gate::config::{Config, SuggestConfig};
use kubeops_gate::suggest::{
    LlmProvider, ModelPreferences, ProviderId, ProviderRegistry, StreamChunk, StreamConfig,
    SuggestRequest, SuggestionEngine, SuggestionErrorCode, SuggestionSource,
};

const NON_RUNNING: &str = "kubectl get pods -A --field-selector=status.phase!=Running";

/// Replays a fixed list of chunks and records what it was asked.
struct ScriptedProvider {
    id: ProviderId,
    chunks: Vec<StreamChunk>,
    delay: Option<Duration>,
    seen: Arc<Mutex<Vec<StreamConfig>>>,
}

impl ScriptedProvider {
    fn answering(text: &str) -> Self {
        Self::with_chunks(vec![StreamChunk::Text(text.to_string())])
    }

    fn with_chunks(chunks: Vec<StreamChunk>) -> Self {
        Self {
            id: ProviderId::Claude,
            chunks,
            delay: None,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    async fn stream_response(&self, config: StreamConfig) -> mpsc::Receiver<StreamChunk> {
        self.seen.lock().unwrap().push(config);
        let (tx, rx) = mpsc::channel(8);
        let chunks = self.chunks.clone();
        let delay = self.delay;
        tokio::spawn(async move {
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }
            for chunk in chunks {
                if tx.send(chunk).await.is_err() {
                    break;
                }
            }
        });
        rx
    }
}

fn registry_with(provider: Option<ScriptedProvider>) -> ProviderRegistry {
    let mut registry = ProviderRegistry::new(&Config::default_config().providers)
        .with_env_lookup(|key| (key == "ANTHROPIC_API_KEY").then(|| "sk-test".to_string()));
    if let Some(p) = provider {
        registry.register(Arc::new(p));
    }
    registry
}

fn engine_with(provider: Option<ScriptedProvider>) -> SuggestionEngine {
    SuggestionEngine::new(registry_with(provider), SuggestConfig::default())
}

fn json_answer(command: &str) -> String {
    format!(
        r#"{{"command":"{command}","confidence":0.9,"rationale":"from the model","assumptions":["cluster reachable"],"warnings":["model warning"]}}"#
    )
}

// ── Heuristic path ──

#[tokio::test]
async fn non_running_pods_without_provider() {
    let mut req = SuggestRequest::new("show non-running pods across all namespaces");
    req.namespace = Some("default".into());
    let resp = engine_with(None).suggest_command(req).await.unwrap();
    assert_eq!(resp.source, SuggestionSource::Heuristic);
    assert_eq!(resp.suggested_command, NON_RUNNING);
    assert!(resp.policy_decision.allowed);
    assert!(resp.warnings.iter().any(|w| w.contains("No LLM provider")));
}

#[tokio::test]
async fn diagnostic_query_is_unavailable() {
    let err = engine_with(None)
        .suggest_command(SuggestRequest::new("whats wrong with the imagepull-test pods?"))
        .await
        .unwrap_err();
    assert_eq!(err.code, SuggestionErrorCode::SuggestionUnavailable);
    assert_eq!(err.http_status(), 503);
    assert!(!err.retryable);
}

#[tokio::test]
async fn response_echoes_query_and_serializes() {
    let resp = engine_with(None)
        .suggest_command(SuggestRequest::new("  lsit deployemnts in shop  "))
        .await
        .unwrap();
    assert_eq!(resp.query, "lsit deployemnts in shop");
    assert_eq!(resp.suggested_command, "kubectl get deployments -n shop");

    let json = serde_json::to_value(&resp).unwrap();
    assert_eq!(json["source"], "heuristic");
    assert_eq!(json["suggestedCommand"], "kubectl get deployments -n shop");
    assert!(json.get("generatedAt").is_some());
}

// ── Agentic path ──

#[tokio::test]
async fn agentic_candidate_accepted() {
    let provider = ScriptedProvider::answering(&json_answer("kubectl get pods -n shop -o wide"));
    let seen = provider.seen.clone();
    let mut req = SuggestRequest::new("show pods in shop with node placement");
    req.recent_terminal_context = (1..=6).map(|i| format!("line {i}")).collect();

    let resp = engine_with(Some(provider)).suggest_command(req).await.unwrap();
    assert_eq!(resp.source, SuggestionSource::Agentic);
    assert_eq!(resp.suggested_command, "kubectl get pods -n shop -o wide");
    assert_eq!(resp.confidence, 90);
    assert_eq!(resp.rationale, "from the model");
    assert_eq!(resp.assumptions, vec!["cluster reachable"]);
    assert_eq!(resp.warnings, vec!["model warning"]);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].api_key, "sk-test");
    assert!(seen[0].user_prompt.contains("shop"));
    assert!(seen[0].user_prompt.contains("line 6"));
    assert!(seen[0].user_prompt.contains("line 3"));
    assert!(!seen[0].user_prompt.contains("line 2"));
}

#[tokio::test]
async fn streamed_fenced_answer_is_concatenated() {
    let provider = ScriptedProvider::with_chunks(vec![
        StreamChunk::Text("Here:\n```json\n{\"command\": \"kubectl ".into()),
        StreamChunk::Text("top   pods -n web\"}\n```".into()),
    ]);
    let resp = engine_with(Some(provider))
        .suggest_command(SuggestRequest::new("cpu usage of pods in web"))
        .await
        .unwrap();
    assert_eq!(resp.source, SuggestionSource::Agentic);
    assert_eq!(resp.suggested_command, "kubectl top pods -n web");
    assert_eq!(resp.confidence, 70);
}

#[tokio::test]
async fn non_running_gate_falls_back() {
    let provider = ScriptedProvider::answering(&json_answer("kubectl get pods -A"));
    let resp = engine_with(Some(provider))
        .suggest_command(SuggestRequest::new("list pods that are not running"))
        .await
        .unwrap();
    assert_eq!(resp.source, SuggestionSource::Heuristic);
    assert_eq!(resp.suggested_command, NON_RUNNING);
    assert!(resp.warnings.iter().any(|w| w.contains("non-running")));
}

#[tokio::test]
async fn pods_and_deployments_gate_falls_back() {
    let provider = ScriptedProvider::answering(&json_answer("kubectl get pods -n web"));
    let resp = engine_with(Some(provider))
        .suggest_command(SuggestRequest::new("show pods and deployments in web"))
        .await
        .unwrap();
    assert_eq!(resp.source, SuggestionSource::Heuristic);
    assert_eq!(resp.suggested_command, "kubectl get pods,deployments -n web");
}

#[tokio::test]
async fn policy_violating_candidate_falls_back() {
    let provider = ScriptedProvider::answering(&json_answer("kubectl delete pod web"));
    let resp = engine_with(Some(provider))
        .suggest_command(SuggestRequest::new("get rid of the web pod"))
        .await
        .unwrap();
    assert_eq!(resp.source, SuggestionSource::Heuristic);
    assert!(resp.policy_decision.allowed);
    assert!(resp.warnings.iter().any(|w| w.contains("policy")));
}

#[tokio::test]
async fn non_kubectl_candidate_falls_back() {
    let provider = ScriptedProvider::answering(&json_answer("rm -rf /"));
    let resp = engine_with(Some(provider))
        .suggest_command(SuggestRequest::new("show services"))
        .await
        .unwrap();
    assert_eq!(resp.source, SuggestionSource::Heuristic);
    assert_eq!(resp.suggested_command, "kubectl get services");
    assert!(resp.warnings.iter().any(|w| w.contains("not a kubectl command")));
}

#[tokio::test]
async fn error_chunk_falls_back() {
    let provider = ScriptedProvider::with_chunks(vec![
        StreamChunk::Text("{\"command\":".into()),
        StreamChunk::Error {
            message: "overloaded".into(),
        },
    ]);
    let resp = engine_with(Some(provider))
        .suggest_command(SuggestRequest::new("show nodes"))
        .await
        .unwrap();
    assert_eq!(resp.source, SuggestionSource::Heuristic);
    assert_eq!(resp.suggested_command, "kubectl get nodes");
    assert!(resp.warnings.iter().any(|w| w.contains("overloaded")));
}

#[tokio::test]
async fn slow_provider_times_out() {
    let mut provider = ScriptedProvider::answering(&json_answer("kubectl get nodes -o wide"));
    provider.delay = Some(Duration::from_secs(5));
    let config = SuggestConfig {
        provider_timeout_ms: 50,
        ..SuggestConfig::default()
    };
    let engine = SuggestionEngine::new(registry_with(Some(provider)), config);
    let resp = engine
        .suggest_command(SuggestRequest::new("show nodes"))
        .await
        .unwrap();
    assert_eq!(resp.source, SuggestionSource::Heuristic);
    assert!(resp.warnings.iter().any(|w| w.contains("did not answer")));
}

#[tokio::test]
async fn diagnostic_accepts_targeted_candidate() {
    let provider =
        ScriptedProvider::answering(&json_answer("kubectl describe pods -n shop -l app=checkout"));
    let resp = engine_with(Some(provider))
        .suggest_command(SuggestRequest::new("why is checkout crashing in shop"))
        .await
        .unwrap();
    assert_eq!(resp.source, SuggestionSource::Agentic);
}

#[tokio::test]
async fn diagnostic_rejects_bare_listing() {
    let provider = ScriptedProvider::answering(&json_answer("kubectl get pods -n shop"));
    let err = engine_with(Some(provider))
        .suggest_command(SuggestRequest::new("why is checkout crashing in shop"))
        .await
        .unwrap_err();
    assert_eq!(err.code, SuggestionErrorCode::SuggestionUnavailable);
}

#[tokio::test]
async fn explicit_provider_and_key() {
    let mut provider = ScriptedProvider::answering(&json_answer("kubectl get nodes"));
    provider.id = ProviderId::Gemini;
    let seen = provider.seen.clone();

    let mut req = SuggestRequest::new("show nodes");
    req.model_preferences = Some(ModelPreferences {
        provider_id: Some(ProviderId::Gemini),
        api_key: Some("g-key".into()),
        model: Some("gemini-test".into()),
    });
    let resp = engine_with(Some(provider)).suggest_command(req).await.unwrap();
    assert_eq!(resp.source, SuggestionSource::Agentic);

    let seen = seen.lock().unwrap();
    assert_eq!(seen[0].api_key, "g-key");
    assert_eq!(seen[0].model.as_deref(), Some("gemini-test"));
}

#[tokio::test]
async fn provider_registered_on_app_context() {
    let config = Config::default_config();
    let registry = ProviderRegistry::new(&config.providers).with_env_lookup(|_| None);
    let mut ctx = AppContext::with_registry(config, registry);
    assert!(ctx.suggestions.registry_mut().is_empty());

    let provider = ScriptedProvider::answering(&json_answer("kubectl get services -n api"));
    ctx.suggestions.registry_mut().register(Arc::new(provider));
    assert!(!ctx.suggestions.registry_mut().is_empty());

    let mut req = SuggestRequest::new("list services in api");
    req.model_preferences = Some(ModelPreferences {
        provider_id: Some(ProviderId::Claude),
        api_key: Some("sk-explicit".into()),
        model: None,
    });
    let resp = ctx.suggestions.suggest_command(req).await.unwrap();
    assert_eq!(resp.source, SuggestionSource::Agentic);
    assert_eq!(resp.suggested_command, "kubectl get services -n api");
}

#[tokio::test]
async fn empty_query_is_invalid() {
    let err = engine_with(None)
        .suggest_command(SuggestRequest::new(""))
        .await
        .unwrap_err();
    assert_eq!(err.code, SuggestionErrorCode::SuggestionInvalid);
    assert_eq!(err.http_status(), 400);
}

// ── Every returned suggestion passes policy ──

#[tokio::test]
async fn suggestions_always_pass_policy() {
    let queries = [
        "show pods",
        "lsit pods in kube-system",
        "pods in the payments namespace",
        "runnig pods",
        "non running pods",
        "pods and deployments across the cluster",
        "list namespaces",
        "what can i access",
        "warning events in shop",
        "events",
        "deplyoments in web",
        "servcies for api",
        "nodes",
        "logs for web-1 in shop",
        "logs of pod api-0 here",
        "pods here",
        "hello",
        "rm -rf /",
        "kubectl delete everything; rm -rf /",
        "$(whoami) pods in `id`",
        "pods in Bad;Name",
        "show me pods | sh",
        "why is it broken",
        "😀 pods",
    ];
    let candidates = [
        "kubectl get pods",
        "kubectl delete ns prod",
        "kubectl get pods; rm -rf /",
        "kubectl get pods $(id)",
        "not json at all",
        NON_RUNNING,
    ];
    let terminal = vec!["$ kubectl get pods -n shop".to_string()];

    for candidate in candidates {
        for query in queries {
            let provider = ScriptedProvider::answering(&json_answer(candidate));
            let mut req = SuggestRequest::new(query);
            req.namespace = Some("Default; rm".into());
            req.recent_terminal_context = terminal.clone();

            match engine_with(Some(provider)).suggest_command(req).await {
                Ok(resp) => {
                    let decision = kubeops_gate::evaluate(&resp.suggested_command).decision;
                    assert!(decision.allowed, "{query:?} -> {:?}", resp.suggested_command);
                    assert!(resp.suggested_command.starts_with("kubectl "));
                    assert!(resp.confidence <= 100);
                }
                Err(e) => assert!(
                    matches!(
                        e.code,
                        SuggestionErrorCode::SuggestionUnavailable
                            | SuggestionErrorCode::SuggestionInvalid
                    ),
                    "{query:?}: {e}"
                ),
            }
        }
    }
}
