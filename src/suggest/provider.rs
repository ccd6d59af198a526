//! The minimal LLM streaming contract the suggestion engine consumes, and the
//! registry that picks a provider per request.
//!
//! Provider clients themselves live outside this crate; they register an
//! [`LlmProvider`] with the [`ProviderRegistry`] at startup.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::types::ModelPreferences;
use crate::config::{ProviderConfig, ProvidersConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Claude,
    Openai,
    Gemini,
}

impl ProviderId {
    /// Selection order when the request does not name a provider.
    pub const PRIORITY: [ProviderId; 3] = [ProviderId::Claude, ProviderId::Openai, ProviderId::Gemini];

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderId::Claude => "claude",
            ProviderId::Openai => "openai",
            ProviderId::Gemini => "gemini",
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One item of a streamed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamChunk {
    Text(String),
    Error { message: String },
}

/// Everything a provider needs for one streaming call.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub api_key: String,
    /// `None` lets the provider choose its default model.
    pub model: Option<String>,
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Start a streaming completion. The stream ends when the sender is
    /// dropped; an [`StreamChunk::Error`] means the call failed.
    async fn stream_response(&self, config: StreamConfig) -> mpsc::Receiver<StreamChunk>;
}

/// Provider chosen for one request, with the credential to use.
#[derive(Clone)]
pub struct SelectedProvider {
    pub provider: Arc<dyn LlmProvider>,
    pub api_key: String,
    pub model: Option<String>,
}

impl std::fmt::Debug for SelectedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SelectedProvider")
            .field("provider", &self.provider.id())
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Registered providers plus the env vars that hold their credentials.
pub struct ProviderRegistry {
    providers: HashMap<ProviderId, Arc<dyn LlmProvider>>,
    settings: HashMap<ProviderId, ProviderConfig>,
    env: EnvLookup,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new(&ProvidersConfig::default())
    }
}

impl ProviderRegistry {
    pub fn new(config: &ProvidersConfig) -> Self {
        let settings = HashMap::from([
            (ProviderId::Claude, config.claude.clone()),
            (ProviderId::Openai, config.openai.clone()),
            (ProviderId::Gemini, config.gemini.clone()),
        ]);
        Self {
            providers: HashMap::new(),
            settings,
            env: Arc::new(|key| std::env::var(key).ok()),
        }
    }

    /// Replace the process-environment lookup (used by tests and embedders
    /// that keep credentials elsewhere).
    pub fn with_env_lookup(
        mut self,
        lookup: impl Fn(&str) -> Option<String> + Send + Sync + 'static,
    ) -> Self {
        self.env = Arc::new(lookup);
        self
    }

    pub fn register(&mut self, provider: Arc<dyn LlmProvider>) {
        self.providers.insert(provider.id(), provider);
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Pick a provider for a request.
    ///
    /// 1. The provider named in `preferences`, with its explicit key or, failing
    ///    that, its configured env credential
    /// 2. Otherwise the first registered provider with an env credential, in
    ///    [`ProviderId::PRIORITY`] order
    pub fn select(&self, preferences: Option<&ModelPreferences>) -> Option<SelectedProvider> {
        let preferred_model = preferences
            .and_then(|p| p.model.clone())
            .filter(|m| !m.trim().is_empty());

        if let Some(prefs) = preferences
            && let Some(id) = prefs.provider_id
            && let Some(provider) = self.providers.get(&id)
        {
            let explicit = prefs.api_key.clone().filter(|k| !k.trim().is_empty());
            if let Some(api_key) = explicit.or_else(|| self.env_credential(id)) {
                return Some(SelectedProvider {
                    provider: provider.clone(),
                    api_key,
                    model: preferred_model.or_else(|| self.configured_model(id)),
                });
            }
        }

        ProviderId::PRIORITY.iter().find_map(|id| {
            let provider = self.providers.get(id)?;
            let api_key = self.env_credential(*id)?;
            Some(SelectedProvider {
                provider: provider.clone(),
                api_key,
                model: preferred_model.clone().or_else(|| self.configured_model(*id)),
            })
        })
    }

    fn env_credential(&self, id: ProviderId) -> Option<String> {
        self.settings
            .get(&id)?
            .credential_env
            .iter()
            .filter_map(|key| (self.env)(key))
            .find(|value| !value.trim().is_empty())
    }

    fn configured_model(&self, id: ProviderId) -> Option<String> {
        self.settings
            .get(&id)
            .map(|s| s.model.clone())
            .filter(|m| !m.is_empty())
    }
}
