//! kubeops-gate: the command policy engine, execution broker and
//! natural-language suggestion engine behind a Kubernetes ops assistant.
//!
//! Every command, whether typed by an operator, produced by a runbook or
//! suggested by an LLM, passes through one policy function,
//! [`eval::evaluate_command_policy`]. The broker only spawns what it allows,
//! and the suggestion engine only returns what it allows.
//!
//! # Architecture
//!
//! - **[`parse`]**: shlex tokenizer and the unsafe-operator scan.
//! - **[`eval`]**: policy evaluation, decision types, per-command context.
//! - **[`commands`]**: per-family allowlists and spawn-spec adapters (kubectl, git, docker, sh).
//! - **[`broker`]**: bounded process execution with redaction, truncation and audit.
//! - **[`suggest`]**: query → one safe kubectl command, LLM first, rule table second.
//! - **[`config`]**: embedded defaults + user overlay merge.
//! - **[`logging`]**: stderr + file logger, audit lines, timestamps.
//! - **[`app`]**: the context object front ends hold.

/// Startup wiring shared by front ends.
pub mod app;
/// Execution broker: policy gate, process lifecycle, output sanitizing.
pub mod broker;
/// Command families: allowlists and spawn-spec builders.
pub mod commands;
/// Configuration types, loading, and overlay merge logic.
pub mod config;
/// Policy evaluation: decisions, families, command context.
pub mod eval;
/// Logger setup and the default audit sink.
pub mod logging;
/// Tokenizing and unsafe-operator detection.
pub mod parse;
/// Natural-language command suggestions.
pub mod suggest;

pub use app::AppContext;
pub use eval::{CommandFamily, PolicyDecision, PolicyEvaluation};

/// Evaluate a command string against the policy.
///
/// This is the main entry point for tests and simple usage.
pub fn evaluate(command: &str) -> PolicyEvaluation {
    eval::evaluate_command_policy(command)
}
