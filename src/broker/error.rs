use serde::Serialize;
use thiserror::Error;

use crate::eval::PolicyDecision;

/// Stable error codes surfaced by [`CommandBroker::execute`](super::CommandBroker::execute).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BrokerErrorCode {
    CommandBlocked,
    CommandInvalid,
    CommandTimeout,
    CommandFailed,
}

impl BrokerErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            BrokerErrorCode::CommandBlocked => "COMMAND_BLOCKED",
            BrokerErrorCode::CommandInvalid => "COMMAND_INVALID",
            BrokerErrorCode::CommandTimeout => "COMMAND_TIMEOUT",
            BrokerErrorCode::CommandFailed => "COMMAND_FAILED",
        }
    }

    pub fn retryable(self) -> bool {
        matches!(
            self,
            BrokerErrorCode::CommandTimeout | BrokerErrorCode::CommandFailed
        )
    }

    /// Status code for the `/api/cli/execute` route.
    pub fn http_status(self) -> u16 {
        match self {
            BrokerErrorCode::CommandBlocked => 403,
            BrokerErrorCode::CommandTimeout => 408,
            BrokerErrorCode::CommandInvalid | BrokerErrorCode::CommandFailed => 500,
        }
    }
}

impl std::fmt::Display for BrokerErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("{code}: {message}")]
pub struct CommandBrokerError {
    pub code: BrokerErrorCode,
    pub message: String,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_decision: Option<PolicyDecision>,
}

impl CommandBrokerError {
    fn new(code: BrokerErrorCode, message: String, decision: Option<PolicyDecision>) -> Self {
        Self {
            code,
            message,
            retryable: code.retryable(),
            policy_decision: decision,
        }
    }

    pub fn blocked(decision: PolicyDecision) -> Self {
        let message = format!(
            "Command blocked by policy: {}",
            decision.reason.as_deref().unwrap_or("denied")
        );
        Self::new(BrokerErrorCode::CommandBlocked, message, Some(decision))
    }

    pub fn invalid(message: impl Into<String>, decision: Option<PolicyDecision>) -> Self {
        Self::new(BrokerErrorCode::CommandInvalid, message.into(), decision)
    }

    pub fn timeout(timeout_ms: u64, decision: PolicyDecision) -> Self {
        Self::new(
            BrokerErrorCode::CommandTimeout,
            format!("Command timed out after {timeout_ms}ms"),
            Some(decision),
        )
    }

    pub fn failed(message: impl Into<String>, decision: PolicyDecision) -> Self {
        Self::new(BrokerErrorCode::CommandFailed, message.into(), Some(decision))
    }

    pub fn http_status(&self) -> u16 {
        self.code.http_status()
    }
}
