//! `sh -c` / `bash -c` handling.
//!
//! The body of a `-c` invocation is re-checked against a stricter nested
//! allowlist so that `sh -c "<anything>"` cannot be used to escape the
//! top-level family allowlists.

use super::SpawnSpec;
use crate::eval::{CommandContext, CommandFamily, PolicyDecision};
use crate::parse;

/// The only accepted shell "subcommand".
pub const SUBCOMMANDS: &[&str] = &["-c"];

/// Commands a shell body may start with.
pub const BODY_ALLOWLIST: &[&str] = &["ls", "pwd", "echo", "cat", "kubectl", "git", "docker"];

/// Body commands that are families in their own right and must also pass
/// their family's subcommand allowlist.
const NESTED_FAMILIES: &[&str] = &["kubectl", "git", "docker"];

/// Check the words following `-c`. Returns a deny decision, or `None` if the
/// body is acceptable.
///
/// The body words are re-joined and split again so that a quoted body
/// (`sh -c "ls -la"`) and an unquoted one (`sh -c ls -la`) are judged alike.
pub fn evaluate_body(body: &[String]) -> Option<PolicyDecision> {
    let joined = body.join(" ");
    let words = parse::split_command(&joined);
    let Some(first) = words.first().filter(|w| !w.is_empty()) else {
        return Some(
            PolicyDecision::deny("Shell command body is required")
                .with_family(CommandFamily::Sh)
                .with_rule("sh:body"),
        );
    };
    if !BODY_ALLOWLIST.contains(&first.as_str()) {
        return Some(
            PolicyDecision::deny(format!("Shell command not in allowlist: {first}"))
                .with_family(CommandFamily::Sh)
                .with_rule("sh:allowlist"),
        );
    }
    if NESTED_FAMILIES.contains(&first.as_str()) {
        let nested = crate::eval::evaluate_command_policy(&joined).decision;
        if !nested.allowed {
            let reason = nested.reason.unwrap_or_default();
            return Some(
                PolicyDecision::deny(format!("Shell command not in allowlist: {reason}"))
                    .with_family(CommandFamily::Sh)
                    .with_rule("sh:nested"),
            );
        }
    }
    None
}

/// Run with `bash` only when the caller typed `bash`; everything else uses `sh`.
pub fn build(ctx: &CommandContext) -> SpawnSpec {
    let executable = if ctx.binary() == "bash" { "bash" } else { "sh" };
    SpawnSpec {
        executable: executable.into(),
        args: ctx.args().to_vec(),
    }
}
