use serde::Serialize;
use thiserror::Error;

use crate::eval::PolicyDecision;

/// Stable error codes surfaced by
/// [`SuggestionEngine::suggest_command`](super::SuggestionEngine::suggest_command).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SuggestionErrorCode {
    SuggestionInvalid,
    SuggestionBlocked,
    SuggestionUnavailable,
    SuggestionFailed,
}

impl SuggestionErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            SuggestionErrorCode::SuggestionInvalid => "SUGGESTION_INVALID",
            SuggestionErrorCode::SuggestionBlocked => "SUGGESTION_BLOCKED",
            SuggestionErrorCode::SuggestionUnavailable => "SUGGESTION_UNAVAILABLE",
            SuggestionErrorCode::SuggestionFailed => "SUGGESTION_FAILED",
        }
    }

    pub fn retryable(self) -> bool {
        matches!(self, SuggestionErrorCode::SuggestionFailed)
    }

    /// Status code for the `/api/cli/suggest` route.
    pub fn http_status(self) -> u16 {
        match self {
            SuggestionErrorCode::SuggestionInvalid => 400,
            SuggestionErrorCode::SuggestionBlocked => 403,
            SuggestionErrorCode::SuggestionUnavailable => 503,
            SuggestionErrorCode::SuggestionFailed => 500,
        }
    }
}

impl std::fmt::Display for SuggestionErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, Serialize)]
#[serde(rename_all = "camelCase")]
#[error("{code}: {message}")]
pub struct CommandSuggestionError {
    pub code: SuggestionErrorCode,
    pub message: String,
    pub retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_decision: Option<PolicyDecision>,
}

impl CommandSuggestionError {
    fn new(code: SuggestionErrorCode, message: String, decision: Option<PolicyDecision>) -> Self {
        Self {
            code,
            message,
            retryable: code.retryable(),
            policy_decision: decision,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(SuggestionErrorCode::SuggestionInvalid, message.into(), None)
    }

    pub fn blocked(decision: PolicyDecision) -> Self {
        let message = format!(
            "Suggested command rejected by policy: {}",
            decision.reason.as_deref().unwrap_or("denied")
        );
        Self::new(SuggestionErrorCode::SuggestionBlocked, message, Some(decision))
    }

    /// The query needs the conversational diagnosis flow, not one command.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(SuggestionErrorCode::SuggestionUnavailable, message.into(), None)
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(SuggestionErrorCode::SuggestionFailed, message.into(), None)
    }

    pub fn http_status(&self) -> u16 {
        self.code.http_status()
    }
}
