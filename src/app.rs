//! Process-wide wiring: one config, one broker, one suggestion engine.

use crate::broker::CommandBroker;
use crate::config::Config;
use crate::suggest::{ProviderRegistry, SuggestionEngine};

/// Everything a front end needs, built once at startup and passed by
/// reference. Holds no per-call state.
pub struct AppContext {
    pub config: Config,
    pub broker: CommandBroker,
    pub suggestions: SuggestionEngine,
}

impl AppContext {
    /// Context with an empty provider registry; suggestions use the heuristic
    /// path until providers are registered.
    pub fn from_config(config: Config) -> Self {
        let registry = ProviderRegistry::new(&config.providers);
        Self::with_registry(config, registry)
    }

    pub fn with_registry(config: Config, registry: ProviderRegistry) -> Self {
        Self {
            broker: CommandBroker::from_config(&config.broker),
            suggestions: SuggestionEngine::new(registry, config.suggest.clone()),
            config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suggest::{SuggestRequest, SuggestionSource};

    #[tokio::test]
    async fn default_context_suggests_heuristically() {
        let ctx = AppContext::from_config(Config::default_config());
        let resp = ctx
            .suggestions
            .suggest_command(SuggestRequest::new("list services in api"))
            .await
            .unwrap();
        assert_eq!(resp.source, SuggestionSource::Heuristic);
        assert_eq!(resp.suggested_command, "kubectl get services -n api");
    }
}
