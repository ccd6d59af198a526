use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config.default.toml");

/// Env var naming an overlay file, checked before the default location.
pub const CONFIG_PATH_ENV: &str = "KUBEOPS_GATE_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

// ── Final (merged) config types ──

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub broker: BrokerConfig,
    #[serde(default)]
    pub suggest: SuggestConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub log_level: String,
    /// Empty disables file logging. `~` and `$VARS` are expanded.
    #[serde(default)]
    pub log_file: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrokerConfig {
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,
    #[serde(default = "default_max_output_bytes")]
    pub default_max_output_bytes: usize,
    #[serde(default)]
    pub default_cluster_context: String,
}

fn default_timeout_ms() -> u64 {
    crate::broker::types::DEFAULT_TIMEOUT_MS
}

fn default_max_output_bytes() -> usize {
    crate::broker::types::DEFAULT_OUTPUT_BYTES
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: default_timeout_ms(),
            default_max_output_bytes: default_max_output_bytes(),
            default_cluster_context: String::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SuggestConfig {
    /// Namespace assumed when a query names none.
    #[serde(default = "default_namespace")]
    pub default_namespace: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: f32,
    /// Upper bound on one streamed provider call.
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,
}

fn default_namespace() -> String {
    "default".to_string()
}

fn default_max_tokens() -> u32 {
    600
}

fn default_provider_timeout_ms() -> u64 {
    30_000
}

impl Default for SuggestConfig {
    fn default() -> Self {
        Self {
            default_namespace: default_namespace(),
            max_tokens: default_max_tokens(),
            temperature: 0.1,
            provider_timeout_ms: default_provider_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub claude: ProviderConfig,
    #[serde(default)]
    pub openai: ProviderConfig,
    #[serde(default)]
    pub gemini: ProviderConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ProviderConfig {
    /// Env vars checked in order for the provider's API key.
    #[serde(default)]
    pub credential_env: Vec<String>,
    /// Model override. Empty lets the provider pick.
    #[serde(default)]
    pub model: String,
}

// ── Overlay types (user config that merges with defaults) ──

#[derive(Debug, Deserialize, Default)]
struct ConfigOverlay {
    #[serde(default)]
    settings: SettingsOverlay,
    #[serde(default)]
    broker: BrokerOverlay,
    #[serde(default)]
    suggest: SuggestOverlay,
    #[serde(default)]
    providers: ProvidersOverlay,
}

#[derive(Debug, Deserialize, Default)]
struct SettingsOverlay {
    log_level: Option<String>,
    log_file: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct BrokerOverlay {
    default_timeout_ms: Option<u64>,
    default_max_output_bytes: Option<usize>,
    default_cluster_context: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct SuggestOverlay {
    default_namespace: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    provider_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct ProvidersOverlay {
    #[serde(default)]
    claude: ProviderOverlay,
    #[serde(default)]
    openai: ProviderOverlay,
    #[serde(default)]
    gemini: ProviderOverlay,
}

#[derive(Debug, Deserialize, Default)]
struct ProviderOverlay {
    #[serde(default)]
    replace: bool,
    #[serde(default)]
    credential_env: Vec<String>,
    #[serde(default)]
    remove_credential_env: Vec<String>,
    model: Option<String>,
}

// ── Merge logic ──

/// Merge a user list into a default list.
/// In replace mode: user list replaces default entirely.
/// In merge mode: remove items first, then extend with additions (deduped).
fn merge_list(base: &mut Vec<String>, add: Vec<String>, remove: &[String], replace: bool) {
    if replace {
        *base = add;
    } else {
        base.retain(|item| !remove.contains(item));
        for item in add {
            if !base.contains(&item) {
                base.push(item);
            }
        }
    }
}

fn merge_provider(base: &mut ProviderConfig, overlay: ProviderOverlay) {
    merge_list(
        &mut base.credential_env,
        overlay.credential_env,
        &overlay.remove_credential_env,
        overlay.replace,
    );
    if let Some(v) = overlay.model {
        base.model = v;
    }
}

impl Config {
    /// Load the default embedded configuration.
    pub fn default_config() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("embedded default config must parse")
    }

    /// Load configuration with resolution order:
    /// 1. Start with embedded defaults
    /// 2. Merge the overlay from `$KUBEOPS_GATE_CONFIG`, or
    ///    `~/.config/kubeops-gate/config.toml` if that exists
    ///
    /// A broken overlay is reported and ignored; defaults still apply.
    pub fn load() -> Self {
        let mut config = Self::default_config();
        if let Some(path) = Self::overlay_path() {
            match Self::read_overlay(&path) {
                Ok(overlay) => config.apply_overlay(overlay),
                Err(e) => eprintln!("kubeops-gate: config error: {e}"),
            }
        }
        config
    }

    /// Defaults merged with one specific overlay file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default_config();
        config.apply_overlay(Self::read_overlay(path)?);
        Ok(config)
    }

    fn overlay_path() -> Option<PathBuf> {
        if let Some(explicit) = std::env::var_os(CONFIG_PATH_ENV) {
            let expanded = shellexpand::tilde(&explicit.to_string_lossy()).into_owned();
            return Some(PathBuf::from(expanded));
        }
        let home = std::env::var_os("HOME")?;
        let path = Path::new(&home).join(".config/kubeops-gate/config.toml");
        path.exists().then_some(path)
    }

    fn read_overlay(path: &Path) -> Result<ConfigOverlay, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply an overlay on top of this config (merge semantics).
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        let s = overlay.settings;
        if let Some(v) = s.log_level {
            self.settings.log_level = v;
        }
        if let Some(v) = s.log_file {
            self.settings.log_file = v;
        }

        let b = overlay.broker;
        if let Some(v) = b.default_timeout_ms {
            self.broker.default_timeout_ms = v;
        }
        if let Some(v) = b.default_max_output_bytes {
            self.broker.default_max_output_bytes = v;
        }
        if let Some(v) = b.default_cluster_context {
            self.broker.default_cluster_context = v;
        }

        let su = overlay.suggest;
        if let Some(v) = su.default_namespace {
            self.suggest.default_namespace = v;
        }
        if let Some(v) = su.max_tokens {
            self.suggest.max_tokens = v;
        }
        if let Some(v) = su.temperature {
            self.suggest.temperature = v;
        }
        if let Some(v) = su.provider_timeout_ms {
            self.suggest.provider_timeout_ms = v;
        }

        let p = overlay.providers;
        merge_provider(&mut self.providers.claude, p.claude);
        merge_provider(&mut self.providers.openai, p.openai);
        merge_provider(&mut self.providers.gemini, p.gemini);
    }

    /// Apply an overlay from a TOML string. Used for testing.
    #[cfg(test)]
    fn apply_overlay_str(&mut self, toml_str: &str) {
        let overlay: ConfigOverlay = toml::from_str(toml_str).unwrap();
        self.apply_overlay(overlay);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_parses() {
        let config = Config::default_config();
        assert_eq!(config.settings.log_level, "info");
        assert_eq!(config.broker.default_timeout_ms, 15_000);
        assert_eq!(config.broker.default_max_output_bytes, 262_144);
        assert!(config.broker.default_cluster_context.is_empty());
        assert_eq!(config.suggest.default_namespace, "default");
        assert_eq!(config.suggest.provider_timeout_ms, 30_000);
    }

    #[test]
    fn default_providers_have_credentials() {
        let config = Config::default_config();
        assert!(
            config
                .providers
                .claude
                .credential_env
                .contains(&"ANTHROPIC_API_KEY".to_string())
        );
        assert_eq!(config.providers.openai.credential_env, vec!["OPENAI_API_KEY"]);
        assert!(!config.providers.gemini.credential_env.is_empty());
    }

    // ── Merge semantics ──

    #[test]
    fn overlay_overrides_scalars() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [broker]
            default_timeout_ms = 30000
            default_cluster_context = "prod-us-west"

            [suggest]
            default_namespace = "payments"
        "#,
        );
        assert_eq!(config.broker.default_timeout_ms, 30_000);
        assert_eq!(config.broker.default_cluster_context, "prod-us-west");
        assert_eq!(config.suggest.default_namespace, "payments");
        // Untouched scalar keeps its default
        assert_eq!(config.broker.default_max_output_bytes, 262_144);
    }

    #[test]
    fn overlay_extends_credential_env() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [providers.openai]
            credential_env = ["MY_OPENAI_KEY"]
        "#,
        );
        assert_eq!(
            config.providers.openai.credential_env,
            vec!["OPENAI_API_KEY", "MY_OPENAI_KEY"]
        );
    }

    #[test]
    fn overlay_removes_credential_env() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [providers.claude]
            remove_credential_env = ["CLAUDE_API_KEY"]
        "#,
        );
        assert_eq!(config.providers.claude.credential_env, vec!["ANTHROPIC_API_KEY"]);
    }

    #[test]
    fn overlay_replace_credential_env() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [providers.gemini]
            replace = true
            credential_env = ["VERTEX_KEY"]
            model = "gemini-pro"
        "#,
        );
        assert_eq!(config.providers.gemini.credential_env, vec!["VERTEX_KEY"]);
        assert_eq!(config.providers.gemini.model, "gemini-pro");
    }

    #[test]
    fn overlay_no_duplicates() {
        let mut config = Config::default_config();
        config.apply_overlay_str(
            r#"
            [providers.openai]
            credential_env = ["OPENAI_API_KEY"]
        "#,
        );
        assert_eq!(config.providers.openai.credential_env.len(), 1);
    }

    #[test]
    fn empty_overlay_changes_nothing() {
        let original = Config::default_config();
        let mut config = Config::default_config();
        config.apply_overlay_str("");
        assert_eq!(config.settings.log_file, original.settings.log_file);
        assert_eq!(
            config.providers.claude.credential_env,
            original.providers.claude.credential_env
        );
    }

    #[test]
    fn load_from_missing_file_errors() {
        let err = Config::load_from(Path::new("/nonexistent/kubeops-gate.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
