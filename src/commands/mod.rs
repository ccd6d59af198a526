//! Command families: per-family subcommand allowlists and spawn adapters.
//!
//! Dispatch is an exhaustive `match` on [`CommandFamily`], so adding or
//! removing a family is a compile-time-checked change.

/// Docker: read-only subcommands, pass-through adapter.
pub mod docker;
/// Git: read-only subcommands, pass-through adapter.
pub mod git;
/// Kubectl: read-only subcommands, `--context`/`--namespace` injection.
pub mod kubectl;
/// `sh -c` / `bash -c`: nested body allowlist and shell selection.
pub mod shell;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::eval::{CommandContext, CommandFamily};

/// An executable plus its argument vector. Never passed through a shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnSpec {
    pub executable: String,
    pub args: Vec<String>,
}

/// Request-scoped values an adapter may inject into the argument list.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildOptions<'a> {
    pub cluster_context: Option<&'a str>,
    pub namespace: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdapterError {
    #[error("no tokens to build a command from")]
    EmptyCommand,
    #[error("invalid {field}: {value:?}")]
    InvalidValue { field: &'static str, value: String },
}

/// Subcommands the policy accepts for a family.
pub fn subcommand_allowlist(family: CommandFamily) -> &'static [&'static str] {
    match family {
        CommandFamily::Kubectl => kubectl::SUBCOMMANDS,
        CommandFamily::Docker => docker::SUBCOMMANDS,
        CommandFamily::Git => git::SUBCOMMANDS,
        CommandFamily::Sh => shell::SUBCOMMANDS,
    }
}

/// Turn policy-approved tokens into a spawn spec for their family.
pub fn build_spawn_spec(
    ctx: &CommandContext,
    options: BuildOptions<'_>,
) -> Result<SpawnSpec, AdapterError> {
    if ctx.tokens.is_empty() {
        return Err(AdapterError::EmptyCommand);
    }
    match ctx.family {
        CommandFamily::Kubectl => kubectl::build(ctx, options),
        CommandFamily::Docker => Ok(docker::build(ctx)),
        CommandFamily::Git => Ok(git::build(ctx)),
        CommandFamily::Sh => Ok(shell::build(ctx)),
    }
}

/// Values spliced into argv must look like a Kubernetes name or context name.
///
/// Rejects anything that could be read as a flag (`-…`) or carry whitespace.
pub(crate) fn validate_injected(field: &'static str, value: &str) -> Result<(), AdapterError> {
    let valid = !value.is_empty()
        && value.len() <= 253
        && value
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric())
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | ':' | '@' | '/' | '-'));
    if valid {
        Ok(())
    } else {
        Err(AdapterError::InvalidValue {
            field,
            value: value.to_string(),
        })
    }
}
