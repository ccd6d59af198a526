pub mod context;
pub mod decision;

pub use context::CommandContext;
pub use decision::{CommandFamily, PolicyDecision, PolicyEvaluation};

use crate::commands;
use crate::parse;

/// Evaluate a raw command string against the static command policy.
///
/// Check order:
/// 1. Empty input → deny
/// 2. Unsafe shell operators anywhere in the raw string → deny (before tokenizing)
/// 3. Binary must map to a [`CommandFamily`]
/// 4. Subcommand must be in the family allowlist
/// 5. `sh -c` bodies are checked against the nested shell allowlist
pub fn evaluate_command_policy(command: &str) -> PolicyEvaluation {
    let raw = command.trim();
    if raw.is_empty() {
        return denied(PolicyDecision::deny("Command is empty"), Vec::new());
    }

    if let Some(op) = parse::find_unsafe_operator(command) {
        let decision = PolicyDecision::deny(format!(
            "Command contains unsafe shell operators ({})",
            op.as_str()
        ))
        .with_rule("unsafe-operators");
        return denied(decision, Vec::new());
    }

    let tokens = parse::split_command(raw);
    let binary = tokens.first().map(|s| s.as_str()).unwrap_or("");
    let Some(family) = CommandFamily::from_binary(binary) else {
        let decision =
            PolicyDecision::deny(format!("Unsupported binary: {binary}")).with_rule("binary");
        return denied(decision, tokens);
    };

    let subcommand = tokens.get(1).map(|s| s.as_str());
    let allowlist = commands::subcommand_allowlist(family);
    let Some(sub) = subcommand.filter(|s| allowlist.contains(s)) else {
        let decision = PolicyDecision::deny(format!(
            "Subcommand not allowed: {}",
            subcommand.unwrap_or("<none>")
        ))
        .with_family(family)
        .with_subcommand(subcommand)
        .with_rule(format!("{family}:subcommand"));
        return denied(decision, tokens);
    };

    if family == CommandFamily::Sh
        && let Some(decision) = commands::shell::evaluate_body(&tokens[2..])
    {
        return denied(decision.with_subcommand(Some(sub)), tokens);
    }

    PolicyEvaluation {
        decision: PolicyDecision::allow(family, sub),
        tokens,
    }
}

fn denied(decision: PolicyDecision, tokens: Vec<String>) -> PolicyEvaluation {
    log::debug!("policy: {}", decision.label());
    PolicyEvaluation { decision, tokens }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(cmd: &str) -> PolicyDecision {
        evaluate_command_policy(cmd).decision
    }

    #[test]
    fn empty_is_denied() {
        let d = decision("   ");
        assert!(!d.allowed);
        assert_eq!(d.reason.as_deref(), Some("Command is empty"));
    }

    #[test]
    fn kubectl_get_allowed() {
        let d = decision("kubectl get pods -n default");
        assert!(d.allowed);
        assert_eq!(d.family, Some(CommandFamily::Kubectl));
        assert_eq!(d.subcommand.as_deref(), Some("get"));
        assert_eq!(d.matched_rule.as_deref(), Some("kubectl:get"));
    }

    #[test]
    fn unsafe_checked_before_tokenizing() {
        let d = decision("kubectl get 'pods;rm'");
        assert!(!d.allowed);
        assert!(d.reason.unwrap().contains("unsafe"));
        assert_eq!(d.matched_rule.as_deref(), Some("unsafe-operators"));
    }

    #[test]
    fn unsupported_binary() {
        let d = decision("rm -rf /");
        assert!(!d.allowed);
        assert_eq!(d.reason.as_deref(), Some("Unsupported binary: rm"));
    }

    #[test]
    fn absolute_path_binary_is_unsupported() {
        assert!(!decision("/usr/bin/kubectl get pods").allowed);
    }

    #[test]
    fn subcommand_not_allowed() {
        let d = decision("kubectl delete pod foo");
        assert!(!d.allowed);
        assert_eq!(d.reason.as_deref(), Some("Subcommand not allowed: delete"));
        assert_eq!(d.family, Some(CommandFamily::Kubectl));
    }

    #[test]
    fn missing_subcommand() {
        let d = decision("git");
        assert!(!d.allowed);
        assert_eq!(d.reason.as_deref(), Some("Subcommand not allowed: <none>"));
    }

    #[test]
    fn flag_before_subcommand_is_not_a_subcommand() {
        assert!(!decision("kubectl --context prod get pods").allowed);
    }

    #[test]
    fn bash_maps_to_sh_family() {
        let d = decision("bash -c 'echo hi'");
        assert!(d.allowed);
        assert_eq!(d.family, Some(CommandFamily::Sh));
        assert_eq!(d.matched_rule.as_deref(), Some("sh:-c"));
    }

    #[test]
    fn sh_body_required() {
        let d = decision("sh -c");
        assert!(!d.allowed);
        assert_eq!(d.reason.as_deref(), Some("Shell command body is required"));
    }

    #[test]
    fn sh_body_allowlist() {
        let d = decision("sh -c \"curl http://example.com\"");
        assert!(!d.allowed);
        assert!(d.reason.unwrap().contains("allowlist"));
    }

    #[test]
    fn tokens_are_returned() {
        let eval = evaluate_command_policy("git log --oneline");
        assert_eq!(eval.tokens, vec!["git", "log", "--oneline"]);
    }
}
