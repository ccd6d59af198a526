//! Kubectl adapter.
//!
//! Only read-only subcommands are allowlisted. The adapter scopes the call to
//! a cluster context and namespace when the request supplies them and the
//! command does not already choose its own.

use super::{AdapterError, BuildOptions, SpawnSpec, validate_injected};
use crate::eval::CommandContext;

/// Read-only kubectl subcommands.
pub const SUBCOMMANDS: &[&str] = &[
    "get",
    "describe",
    "logs",
    "top",
    "events",
    "api-resources",
    "cluster-info",
    "version",
    "config",
    "explain",
];

/// Subcommands that operate inside a namespace and accept `--namespace`.
const NAMESPACED: &[&str] = &["get", "describe", "logs", "top", "events"];

/// Build `kubectl <args>` with optional `--context` / `--namespace` injection.
///
/// `--context` is prepended once, only when a context is given, the command
/// has no `--context`/`--context=…` of its own, and the subcommand is not
/// `config` (context definitions must not be scoped to a context).
pub fn build(ctx: &CommandContext, options: BuildOptions<'_>) -> Result<SpawnSpec, AdapterError> {
    let subcommand = ctx.subcommand().unwrap_or("");
    let mut args = Vec::with_capacity(ctx.tokens.len() + 3);

    if let Some(context) = options.cluster_context
        && subcommand != "config"
        && !ctx.has_long_flag("--context")
    {
        validate_injected("cluster context", context)?;
        args.push("--context".to_string());
        args.push(context.to_string());
    }

    args.extend(ctx.args().iter().cloned());

    if let Some(namespace) = options.namespace
        && NAMESPACED.contains(&subcommand)
        && !has_namespace_scope(ctx)
    {
        validate_injected("namespace", namespace)?;
        args.push("--namespace".to_string());
        args.push(namespace.to_string());
    }

    Ok(SpawnSpec {
        executable: "kubectl".into(),
        args,
    })
}

/// True when the command already picks a namespace or spans all of them.
fn has_namespace_scope(ctx: &CommandContext) -> bool {
    ctx.has_long_flag("--namespace")
        || ctx.has_any_flag(&["-A", "--all-namespaces"])
        || ctx.tokens.iter().any(|w| w.starts_with("-n"))
}
