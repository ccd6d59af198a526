use serde::{Deserialize, Serialize};

use crate::eval::{CommandFamily, PolicyDecision};

pub const MIN_TIMEOUT_MS: u64 = 1_000;
pub const MAX_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;

pub const MIN_OUTPUT_BYTES: usize = 262_144;
pub const MAX_OUTPUT_BYTES: usize = 5_242_880;
pub const DEFAULT_OUTPUT_BYTES: usize = 262_144;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteRequest {
    pub command: String,
    #[serde(default)]
    pub timeout_ms: Option<i64>,
    #[serde(default)]
    pub max_output_bytes: Option<i64>,
    #[serde(default)]
    pub cluster_context: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
}

impl ExecuteRequest {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteResponse {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process was ended by a signal.
    pub exit_code: Option<i32>,
    pub executed_at: String,
    pub duration_ms: u64,
    pub policy_decision: PolicyDecision,
    pub truncated: bool,
}

/// One record per completed execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub command: String,
    pub family: Option<CommandFamily>,
    pub subcommand: Option<String>,
    pub started_at: String,
    pub duration_ms: u64,
    pub exit_code: Option<i32>,
    pub allowed: bool,
}

/// Effective limits for one execution, after clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionLimits {
    pub timeout_ms: u64,
    pub max_output_bytes: usize,
}

impl ExecutionLimits {
    /// Clamp requested values into the allowed ranges. Missing values use the
    /// given defaults, which are clamped too.
    pub fn resolve(
        timeout_ms: Option<i64>,
        max_output_bytes: Option<i64>,
        default_timeout_ms: u64,
        default_max_output_bytes: usize,
    ) -> Self {
        let timeout_ms = match timeout_ms {
            Some(v) => v.clamp(MIN_TIMEOUT_MS as i64, MAX_TIMEOUT_MS as i64) as u64,
            None => default_timeout_ms.clamp(MIN_TIMEOUT_MS, MAX_TIMEOUT_MS),
        };
        let max_output_bytes = match max_output_bytes {
            Some(v) => v.clamp(MIN_OUTPUT_BYTES as i64, MAX_OUTPUT_BYTES as i64) as usize,
            None => default_max_output_bytes.clamp(MIN_OUTPUT_BYTES, MAX_OUTPUT_BYTES),
        };
        Self {
            timeout_ms,
            max_output_bytes,
        }
    }
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_output_bytes: DEFAULT_OUTPUT_BYTES,
        }
    }
}
