//! Execution broker: the single entry point that turns a raw command into an
//! OS process.
//!
//! Every caller (terminal, runbook step, incident action) goes through
//! [`CommandBroker::execute`], so they all inherit the same policy gate.

pub mod error;
pub mod output;
pub mod process;
pub mod types;

pub use error::{BrokerErrorCode, CommandBrokerError};
pub use types::{AuditEvent, ExecuteRequest, ExecuteResponse, ExecutionLimits};

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::commands::{self, BuildOptions};
use crate::config::BrokerConfig;
use crate::eval::{self, CommandContext};
use crate::logging;

/// Callback invoked once per completed execution.
pub type AuditHook = Arc<dyn Fn(&AuditEvent) + Send + Sync>;

pub struct CommandBroker {
    default_timeout_ms: u64,
    default_max_output_bytes: usize,
    default_cluster_context: Option<String>,
    on_audit: Option<AuditHook>,
}

impl Default for CommandBroker {
    fn default() -> Self {
        Self {
            default_timeout_ms: types::DEFAULT_TIMEOUT_MS,
            default_max_output_bytes: types::DEFAULT_OUTPUT_BYTES,
            default_cluster_context: None,
            on_audit: None,
        }
    }
}

impl CommandBroker {
    /// Build a broker from the `[broker]` config section.
    pub fn from_config(config: &BrokerConfig) -> Self {
        Self {
            default_timeout_ms: config.default_timeout_ms,
            default_max_output_bytes: config.default_max_output_bytes,
            default_cluster_context: Some(config.default_cluster_context.clone())
                .filter(|c| !c.is_empty()),
            on_audit: None,
        }
    }

    /// Replace the default audit behaviour (a JSON log line) with a callback.
    pub fn with_audit_hook(mut self, hook: AuditHook) -> Self {
        self.on_audit = Some(hook);
        self
    }

    /// Validate and run one command.
    ///
    /// Order: policy → adapter → limits → spawn → redact → truncate → audit.
    pub async fn execute(
        &self,
        request: ExecuteRequest,
    ) -> Result<ExecuteResponse, CommandBrokerError> {
        let evaluation = eval::evaluate_command_policy(&request.command);
        let decision = evaluation.decision;
        if !decision.allowed {
            log::warn!(
                "blocked command {:?}: {}",
                truncate_for_log(&request.command),
                decision.label()
            );
            return Err(CommandBrokerError::blocked(decision));
        }

        let Some(family) = decision.family else {
            return Err(CommandBrokerError::invalid(
                "Policy allowed a command without a family",
                Some(decision),
            ));
        };

        let cluster_context = request
            .cluster_context
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .or(self.default_cluster_context.as_deref());
        let namespace = request.namespace.as_deref().filter(|n| !n.trim().is_empty());
        let ctx = CommandContext::new(&evaluation.tokens, family);
        let spec = match commands::build_spawn_spec(
            &ctx,
            BuildOptions {
                cluster_context,
                namespace,
            },
        ) {
            Ok(spec) => spec,
            Err(e) => return Err(CommandBrokerError::invalid(e.to_string(), Some(decision))),
        };

        let limits = ExecutionLimits::resolve(
            request.timeout_ms,
            request.max_output_bytes,
            self.default_timeout_ms,
            self.default_max_output_bytes,
        );

        log::debug!(
            "spawning {} {:?} (timeout {}ms, max output {} bytes)",
            spec.executable,
            spec.args,
            limits.timeout_ms,
            limits.max_output_bytes
        );

        let executed_at = logging::timestamp_now();
        let started = Instant::now();
        let capture_limit = limits.max_output_bytes + process::CAPTURE_MARGIN;
        let output = process::run(
            &spec,
            Duration::from_millis(limits.timeout_ms),
            capture_limit,
        )
        .await
        .map_err(|e| {
            log::error!("failed to run {}: {e}", spec.executable);
            CommandBrokerError::failed(
                format!("Failed to start {}: {e}", spec.executable),
                decision.clone(),
            )
        })?;
        let duration_ms = started.elapsed().as_millis() as u64;

        if output.timed_out {
            log::warn!(
                "command {:?} timed out after {}ms",
                truncate_for_log(&request.command),
                limits.timeout_ms
            );
            return Err(CommandBrokerError::timeout(limits.timeout_ms, decision));
        }

        let (stdout, stdout_cut) = output::sanitize(
            &output.stdout.text,
            limits.max_output_bytes,
            output.stdout.overflowed,
        );
        let (stderr, stderr_cut) = output::sanitize(
            &output.stderr.text,
            limits.max_output_bytes,
            output.stderr.overflowed,
        );

        let event = AuditEvent {
            command: request.command.clone(),
            family: decision.family,
            subcommand: decision.subcommand.clone(),
            started_at: executed_at.clone(),
            duration_ms,
            exit_code: output.exit_code,
            allowed: decision.allowed,
        };
        self.emit_audit(&event);

        Ok(ExecuteResponse {
            stdout,
            stderr,
            exit_code: output.exit_code,
            executed_at,
            duration_ms,
            policy_decision: decision,
            truncated: stdout_cut || stderr_cut,
        })
    }

    fn emit_audit(&self, event: &AuditEvent) {
        match &self.on_audit {
            Some(hook) => hook(event),
            None => logging::log_audit(event),
        }
    }
}

fn truncate_for_log(command: &str) -> String {
    command.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording_broker() -> (CommandBroker, Arc<Mutex<Vec<AuditEvent>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let broker = CommandBroker::default().with_audit_hook(Arc::new(move |e: &AuditEvent| {
            sink.lock().unwrap().push(e.clone());
        }));
        (broker, events)
    }

    #[tokio::test]
    async fn blocked_command_never_audited() {
        let (broker, events) = recording_broker();
        let err = broker
            .execute(ExecuteRequest::new("kubectl delete pod web"))
            .await
            .unwrap_err();
        assert_eq!(err.code, BrokerErrorCode::CommandBlocked);
        assert!(events.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn runs_allowed_shell_command() {
        let (broker, events) = recording_broker();
        let resp = broker
            .execute(ExecuteRequest::new("sh -c 'echo hello'"))
            .await
            .unwrap();
        assert_eq!(resp.stdout, "hello\n");
        assert_eq!(resp.exit_code, Some(0));
        assert!(!resp.truncated);
        assert_eq!(resp.policy_decision.matched_rule.as_deref(), Some("sh:-c"));

        let events = events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].command, "sh -c 'echo hello'");
        assert!(events[0].allowed);
    }

    #[tokio::test]
    async fn invalid_context_is_rejected_before_spawn() {
        let (broker, events) = recording_broker();
        let mut req = ExecuteRequest::new("kubectl get pods");
        req.cluster_context = Some("-oops".into());
        let err = broker.execute(req).await.unwrap_err();
        assert_eq!(err.code, BrokerErrorCode::CommandInvalid);
        assert!(events.lock().unwrap().is_empty());
    }
}
