//! Query intent detection and the consistency gates an agentic candidate must
//! pass before it is trusted.

use std::sync::LazyLock;

use regex::Regex;

use crate::eval::{self, CommandFamily, PolicyEvaluation};

/// The one command accepted for "non-running pods" queries.
pub const NON_RUNNING_COMMAND: &str = "kubectl get pods -A --field-selector=status.phase!=Running";

/// Accepted prefixes for combined pods + deployments queries.
pub const PODS_AND_DEPLOYMENTS_PREFIXES: &[&str] =
    &["kubectl get pods,deployments", "kubectl get deployment,pod"];

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("intent pattern must compile")
}

static POD: LazyLock<Regex> = LazyLock::new(|| compile(r"\bpods?\b"));
static DEPLOYMENT: LazyLock<Regex> = LazyLock::new(|| compile(r"\bdeploy(?:ment)?s?\b"));
static SERVICE: LazyLock<Regex> = LazyLock::new(|| compile(r"\b(?:services?|svcs?)\b"));
static NODE: LazyLock<Regex> = LazyLock::new(|| compile(r"\bnodes?\b"));
static EVENT: LazyLock<Regex> = LazyLock::new(|| compile(r"\bevents?\b"));
static WARNING: LazyLock<Regex> = LazyLock::new(|| compile(r"\bwarn(?:ing|ings)?\b"));
static LOGS: LazyLock<Regex> = LazyLock::new(|| compile(r"\blogs?\b"));
static NAMESPACES: LazyLock<Regex> = LazyLock::new(|| compile(r"\bnamespaces\b"));
static ACCESS: LazyLock<Regex> =
    LazyLock::new(|| compile(r"\b(?:access|permissions?|allowed to (?:see|view|use))\b"));
static NON_RUNNING: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"\b(?:non[- ]?running|not[- ]running|not in running|(?:aren'?t|are not|isn'?t|is not) running)\b")
});
static DIAGNOSTIC: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"\b(?:what'?s wrong|what is wrong|what went wrong|why (?:is|are|does|do|did|isn'?t|aren'?t|won'?t|can'?t|would)|root cause|how (?:to|do i|can i|should i|do we|can we) fix|troubleshoot|diagnos(?:e|is)|debug)\b",
    )
});

/// Which resources and qualifiers a (normalized) query talks about.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Mentions {
    pub pods: bool,
    pub deployments: bool,
    pub services: bool,
    pub nodes: bool,
    pub events: bool,
    pub warnings: bool,
    pub logs: bool,
    pub namespaces: bool,
    pub access: bool,
}

impl Mentions {
    pub fn scan(query: &str) -> Self {
        Self {
            pods: POD.is_match(query),
            deployments: DEPLOYMENT.is_match(query),
            services: SERVICE.is_match(query),
            nodes: NODE.is_match(query),
            events: EVENT.is_match(query),
            warnings: WARNING.is_match(query),
            logs: LOGS.is_match(query),
            namespaces: NAMESPACES.is_match(query),
            access: ACCESS.is_match(query),
        }
    }

    /// Any workload or cluster resource other than namespaces.
    pub fn any_resource(&self) -> bool {
        self.pods || self.deployments || self.services || self.nodes || self.events || self.logs
    }
}

/// Coarse intent of a query, shared by the agentic gates and the heuristic
/// rule table so both paths agree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryIntent {
    /// Asks why something is broken; needs the conversational flow.
    pub diagnostic: bool,
    pub non_running_pods: bool,
    pub pods_and_deployments: bool,
    pub mentions: Mentions,
}

impl QueryIntent {
    /// Detect intent on an already normalized (lowercased, typo-fixed) query.
    pub fn detect(query: &str) -> Self {
        let mentions = Mentions::scan(query);
        let pods_and_deployments = mentions.pods && mentions.deployments;
        let other_workload = mentions.deployments || mentions.services || mentions.nodes;
        let non_running_pods = NON_RUNNING.is_match(query)
            && !pods_and_deployments
            && (mentions.pods || !other_workload);
        Self {
            diagnostic: DIAGNOSTIC.is_match(query),
            non_running_pods,
            pods_and_deployments,
            mentions,
        }
    }
}

/// Run the intent-consistency gates and the policy check on an agentic
/// candidate. `Err` carries the warning to surface.
pub fn check_candidate(intent: &QueryIntent, command: &str) -> Result<PolicyEvaluation, String> {
    if intent.non_running_pods && command != NON_RUNNING_COMMAND {
        return Err(format!(
            "LLM suggestion discarded: non-running pod queries must use `{NON_RUNNING_COMMAND}`"
        ));
    }
    if intent.pods_and_deployments
        && !PODS_AND_DEPLOYMENTS_PREFIXES
            .iter()
            .any(|prefix| command.starts_with(prefix))
    {
        return Err(
            "LLM suggestion discarded: query asks for pods and deployments together".to_string(),
        );
    }

    let evaluation = eval::evaluate_command_policy(command);
    if intent.diagnostic && is_bare_inventory(&evaluation.tokens) {
        return Err(
            "LLM suggestion discarded: a bare listing command cannot answer a diagnostic question"
                .to_string(),
        );
    }

    let decision = &evaluation.decision;
    if !decision.allowed || decision.family != Some(CommandFamily::Kubectl) {
        return Err(format!(
            "LLM suggestion discarded by policy: {}",
            decision.reason.as_deref().unwrap_or("not a kubectl command")
        ));
    }
    Ok(evaluation)
}

/// `kubectl get <resource>` with nothing but namespace or output flags.
pub fn is_bare_inventory(tokens: &[String]) -> bool {
    if tokens.first().map(String::as_str) != Some("kubectl")
        || tokens.get(1).map(String::as_str) != Some("get")
    {
        return false;
    }

    let mut positional = 0;
    let mut iter = tokens[2..].iter();
    while let Some(word) = iter.next() {
        match word.as_str() {
            "-n" | "--namespace" | "-o" | "--output" => {
                iter.next();
            }
            "-A" | "--all-namespaces" | "--no-headers" | "--show-labels" | "-w" | "--watch" => {}
            w if w.starts_with("--namespace=") || w.starts_with("--output=") => {}
            w if w.starts_with("-n") || w.starts_with("-o") => {}
            w if w.starts_with('-') => return false,
            w => {
                positional += 1;
                if positional > 1 || w.contains('/') {
                    return false;
                }
            }
        }
    }
    positional == 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<String> {
        crate::parse::split_command(s)
    }

    #[test]
    fn detects_diagnostic() {
        for q in [
            "whats wrong with the imagepull-test pods?",
            "what's wrong with my cluster",
            "why is checkout crashing",
            "find the root cause of the outage",
            "how to fix pending pods",
            "troubleshoot ingress",
        ] {
            assert!(QueryIntent::detect(q).diagnostic, "{q}");
        }
        assert!(!QueryIntent::detect("show pods in web").diagnostic);
    }

    #[test]
    fn detects_non_running() {
        assert!(QueryIntent::detect("show non-running pods across all namespaces").non_running_pods);
        assert!(QueryIntent::detect("pods that are not running").non_running_pods);
        assert!(QueryIntent::detect("list nonrunning pods").non_running_pods);
        assert!(!QueryIntent::detect("list running pods").non_running_pods);
        assert!(!QueryIntent::detect("deployments not running").non_running_pods);
    }

    #[test]
    fn combined_beats_non_running() {
        let intent = QueryIntent::detect("non-running pods and deployments");
        assert!(intent.pods_and_deployments);
        assert!(!intent.non_running_pods);
    }

    #[test]
    fn bare_inventory() {
        assert!(is_bare_inventory(&toks("kubectl get pods")));
        assert!(is_bare_inventory(&toks("kubectl get pods -n web")));
        assert!(is_bare_inventory(&toks("kubectl get pods -A -o wide")));
        assert!(!is_bare_inventory(&toks("kubectl get pods --field-selector=status.phase!=Running")));
        assert!(!is_bare_inventory(&toks("kubectl get pods -l app=web")));
        assert!(!is_bare_inventory(&toks("kubectl get pod web-1")));
        assert!(!is_bare_inventory(&toks("kubectl get pod/web-1")));
        assert!(!is_bare_inventory(&toks("kubectl describe pods")));
    }

    #[test]
    fn gate_non_running_requires_exact_command() {
        let intent = QueryIntent::detect("show non-running pods");
        assert!(check_candidate(&intent, "kubectl get pods -A").is_err());
        assert!(check_candidate(&intent, NON_RUNNING_COMMAND).is_ok());
    }

    #[test]
    fn gate_pods_and_deployments() {
        let intent = QueryIntent::detect("show pods and deployments in web");
        assert!(check_candidate(&intent, "kubectl get pods -n web").is_err());
        assert!(check_candidate(&intent, "kubectl get pods,deployments -n web").is_ok());
        assert!(check_candidate(&intent, "kubectl get deployment,pod -n web").is_ok());
    }

    #[test]
    fn gate_diagnostic_rejects_bare_listing() {
        let intent = QueryIntent::detect("why is the web pod crashing");
        let err = check_candidate(&intent, "kubectl get pods").unwrap_err();
        assert!(err.contains("diagnostic"));
        assert!(check_candidate(&intent, "kubectl describe pod web").is_ok());
    }

    #[test]
    fn gate_policy() {
        let intent = QueryIntent::detect("remove the web pod");
        let err = check_candidate(&intent, "kubectl delete pod web").unwrap_err();
        assert!(err.contains("policy"));
        assert!(check_candidate(&intent, "kubectl get pods | sh").is_err());
    }
}
