use serde::{Deserialize, Serialize};

/// Coarse command category. Selects the subcommand allowlist and the adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandFamily {
    Kubectl,
    Docker,
    Git,
    Sh,
}

impl CommandFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandFamily::Kubectl => "kubectl",
            CommandFamily::Docker => "docker",
            CommandFamily::Git => "git",
            CommandFamily::Sh => "sh",
        }
    }

    /// Map a binary name to its family. `bash` shares the `sh` family.
    pub fn from_binary(binary: &str) -> Option<Self> {
        match binary {
            "kubectl" => Some(CommandFamily::Kubectl),
            "docker" => Some(CommandFamily::Docker),
            "git" => Some(CommandFamily::Git),
            "sh" | "bash" => Some(CommandFamily::Sh),
            _ => None,
        }
    }
}

impl std::fmt::Display for CommandFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured allow/deny verdict for one raw command string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDecision {
    pub allowed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<CommandFamily>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcommand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_rule: Option<String>,
}

impl PolicyDecision {
    pub fn allow(family: CommandFamily, subcommand: &str) -> Self {
        Self {
            allowed: true,
            family: Some(family),
            subcommand: Some(subcommand.to_string()),
            reason: None,
            matched_rule: Some(format!("{family}:{subcommand}")),
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            family: None,
            subcommand: None,
            reason: Some(reason.into()),
            matched_rule: None,
        }
    }

    pub fn with_family(mut self, family: CommandFamily) -> Self {
        self.family = Some(family);
        self
    }

    pub fn with_subcommand(mut self, subcommand: Option<&str>) -> Self {
        self.subcommand = subcommand.map(String::from);
        self
    }

    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.matched_rule = Some(rule.into());
        self
    }

    /// Human-readable label for logs: `ALLOW kubectl:get` / `DENY <reason>`.
    pub fn label(&self) -> String {
        if self.allowed {
            format!("ALLOW {}", self.matched_rule.as_deref().unwrap_or("?"))
        } else {
            format!("DENY {}", self.reason.as_deref().unwrap_or("?"))
        }
    }
}

/// A policy decision together with the tokens it was computed from.
///
/// Downstream layers consume `tokens` instead of re-splitting the raw string.
#[derive(Debug, Clone)]
pub struct PolicyEvaluation {
    pub decision: PolicyDecision,
    pub tokens: Vec<String>,
}
