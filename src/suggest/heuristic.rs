//! Deterministic fallback: an ordered rule table over a normalized query.
//!
//! Rules are evaluated top to bottom and the first match wins. The last rule
//! always matches, so any non-diagnostic query yields a plan.

use std::sync::LazyLock;

use regex::Regex;

use super::intent::{NON_RUNNING_COMMAND, QueryIntent};
use super::types::{CommandPlan, SuggestionSource};
use crate::parse::split_command;

/// Misspellings seen often enough to fix before matching.
const TYPOS: &[(&str, &str)] = &[
    (r"\blsit\b", "list"),
    (r"\brunnig\b", "running"),
    (r"\b(?:nameapce|namesapce|nmespace)\b", "namespace"),
    (r"\b(?:nameapces|namesapces|nmespaces)\b", "namespaces"),
    (r"\b(?:deplyoment|deployemnt)\b", "deployment"),
    (r"\b(?:deplyoments|deployemnts)\b", "deployments"),
    (r"\bservcies\b", "services"),
];

static TYPO_FIXES: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    TYPOS
        .iter()
        .map(|(pattern, fix)| (Regex::new(pattern).expect("typo pattern must compile"), *fix))
        .collect()
});

static K8S_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").expect("name pattern must compile")
});

static POD_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9.]*[a-z0-9])?$").expect("pod pattern must compile")
});

/// Phrases that mean "every namespace".
const ALL_NAMESPACES_PHRASES: &[&str] = &[
    "all namespaces",
    "all-namespaces",
    "all the namespaces",
    "every namespace",
    "across namespaces",
    "across the cluster",
    "across cluster",
    "in the cluster",
    "cluster-wide",
    "cluster wide",
];

/// Phrases that point at the namespace of the last command the user ran.
/// The bare word "here" is matched separately.
const CURRENT_NAMESPACE_PHRASES: &[&str] = &["current namespace", "this namespace", "same namespace"];

/// Words that follow "in"/"for"/"namespace" without being a namespace.
const NOT_A_NAMESPACE: &[&str] = &[
    "a", "an", "the", "my", "our", "your", "this", "that", "these", "those", "all", "any", "every",
    "each", "it", "them", "there", "here", "current", "same", "cluster", "namespace", "namespaces",
    "pod", "pods", "deployment", "deployments", "deploy", "service", "services", "svc", "node",
    "nodes", "event", "events", "log", "logs", "state", "status", "phase", "pending", "running",
    "failed", "failing", "error", "errors", "crashloopbackoff", "warning", "warnings", "order",
    "last", "recent", "kubernetes", "k8s", "me", "us", "is", "are", "with", "of", "which", "in",
    "for", "from", "on", "at", "to", "by", "and", "or",
];

/// Where a rule takes its namespace flag from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamespaceSource {
    /// `-n <ns>`, `-A` or nothing, following the query.
    Query,
    /// Like `Query`, but `-A` is dropped (the verb takes one namespace).
    SingleOnly,
    /// Cluster-scoped resource, or the template fixes its own scope.
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceScope {
    Named(String),
    All,
    Unspecified,
}

impl NamespaceScope {
    fn flag(&self, source: NamespaceSource) -> String {
        match (self, source) {
            (_, NamespaceSource::None) => String::new(),
            (NamespaceScope::Named(ns), _) => format!(" -n {ns}"),
            (NamespaceScope::All, NamespaceSource::Query) => " -A".to_string(),
            _ => String::new(),
        }
    }
}

/// A namespace together with how it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNamespace {
    pub scope: NamespaceScope,
    pub assumption: Option<String>,
    pub warning: Option<String>,
}

impl ResolvedNamespace {
    fn plain(scope: NamespaceScope) -> Self {
        Self {
            scope,
            assumption: None,
            warning: None,
        }
    }
}

/// Everything the rule predicates look at.
#[derive(Debug, Clone)]
pub struct QueryFacts {
    pub intent: QueryIntent,
    pub namespace: ResolvedNamespace,
    pub pod: Option<String>,
}

pub struct Rule {
    pub name: &'static str,
    pub matches: fn(&QueryFacts) -> bool,
    pub namespace: NamespaceSource,
    /// `{ns}` expands to the namespace flag, `{pod}` to the pod name.
    pub template: &'static str,
    pub confidence: u8,
    pub rationale: &'static str,
    pub warning: Option<&'static str>,
}

pub const RULES: &[Rule] = &[
    Rule {
        name: "pods-and-deployments",
        matches: |f| f.intent.pods_and_deployments,
        namespace: NamespaceSource::Query,
        template: "kubectl get pods,deployments{ns}",
        confidence: 85,
        rationale: "Lists pods and deployments in one call.",
        warning: None,
    },
    Rule {
        name: "non-running-pods",
        matches: |f| f.intent.non_running_pods,
        namespace: NamespaceSource::None,
        template: NON_RUNNING_COMMAND,
        confidence: 90,
        rationale: "Filters pods across all namespaces to those not in the Running phase.",
        warning: None,
    },
    Rule {
        name: "namespaces",
        matches: |f| {
            let m = &f.intent.mentions;
            (m.namespaces || m.access) && !m.any_resource()
        },
        namespace: NamespaceSource::None,
        template: "kubectl get namespaces",
        confidence: 85,
        rationale: "Lists the namespaces visible to the current context.",
        warning: None,
    },
    Rule {
        name: "warning-events",
        matches: |f| f.intent.mentions.events && f.intent.mentions.warnings,
        namespace: NamespaceSource::Query,
        template: "kubectl get events{ns} --field-selector=type=Warning --sort-by=.lastTimestamp",
        confidence: 85,
        rationale: "Shows warning events, oldest first.",
        warning: None,
    },
    Rule {
        name: "events",
        matches: |f| f.intent.mentions.events,
        namespace: NamespaceSource::Query,
        template: "kubectl get events{ns} --sort-by=.lastTimestamp",
        confidence: 80,
        rationale: "Shows recent events, oldest first.",
        warning: None,
    },
    Rule {
        name: "deployments",
        matches: |f| f.intent.mentions.deployments && !f.intent.mentions.pods,
        namespace: NamespaceSource::Query,
        template: "kubectl get deployments{ns}",
        confidence: 85,
        rationale: "Lists deployments.",
        warning: None,
    },
    Rule {
        name: "services",
        matches: |f| f.intent.mentions.services,
        namespace: NamespaceSource::Query,
        template: "kubectl get services{ns}",
        confidence: 85,
        rationale: "Lists services.",
        warning: None,
    },
    Rule {
        name: "nodes",
        matches: |f| f.intent.mentions.nodes,
        namespace: NamespaceSource::None,
        template: "kubectl get nodes",
        confidence: 85,
        rationale: "Lists cluster nodes.",
        warning: None,
    },
    Rule {
        name: "pod-logs",
        matches: |f| f.intent.mentions.logs && f.pod.is_some(),
        namespace: NamespaceSource::SingleOnly,
        template: "kubectl logs {pod}{ns} --tail=200",
        confidence: 80,
        rationale: "Shows the last 200 log lines of the named pod.",
        warning: None,
    },
    Rule {
        name: "pods",
        matches: |f| f.intent.mentions.pods,
        namespace: NamespaceSource::Query,
        template: "kubectl get pods{ns}",
        confidence: 80,
        rationale: "Lists pods.",
        warning: None,
    },
    Rule {
        name: "fallback",
        matches: |_| true,
        namespace: NamespaceSource::Query,
        template: "kubectl get pods{ns}",
        confidence: 60,
        rationale: "No specific resource recognized; listing pods as a starting point.",
        warning: Some("Ambiguous intent: defaulted to listing pods"),
    },
];

/// Inputs to the heuristic path.
#[derive(Debug, Clone, Copy)]
pub struct HeuristicInput<'a> {
    /// Output of [`normalize_query`].
    pub query: &'a str,
    pub intent: &'a QueryIntent,
    pub request_namespace: Option<&'a str>,
    pub terminal_context: &'a [String],
}

/// Lowercase, straighten quotes, collapse whitespace and fix known typos.
pub fn normalize_query(query: &str) -> String {
    let lowered = query.to_lowercase().replace(['\u{2018}', '\u{2019}'], "'");
    let mut normalized = crate::parse::normalize_whitespace(&lowered);
    for (re, fix) in TYPO_FIXES.iter() {
        if re.is_match(&normalized) {
            normalized = re.replace_all(&normalized, *fix).into_owned();
        }
    }
    normalized
}

/// Build a plan, or `None` when the query asks for a diagnosis.
pub fn plan(input: HeuristicInput<'_>) -> Option<CommandPlan> {
    if input.intent.diagnostic {
        return None;
    }

    let words = words(input.query);
    let pod = extract_pod_name(&words);
    let facts = QueryFacts {
        intent: *input.intent,
        namespace: resolve_namespace(
            input.query,
            &words,
            pod.as_deref(),
            input.request_namespace,
            input.terminal_context,
        ),
        pod,
    };

    let rule = RULES.iter().find(|rule| (rule.matches)(&facts))?;
    log::debug!("heuristic rule {} matched", rule.name);
    Some(render(rule, &facts))
}

fn render(rule: &Rule, facts: &QueryFacts) -> CommandPlan {
    let command = rule
        .template
        .replace("{ns}", &facts.namespace.scope.flag(rule.namespace))
        .replace("{pod}", facts.pod.as_deref().unwrap_or_default());

    let mut assumptions = Vec::new();
    let mut warnings = Vec::new();
    if rule.namespace != NamespaceSource::None {
        match &facts.namespace.assumption {
            Some(a) => assumptions.push(a.clone()),
            None if facts.namespace.scope == NamespaceScope::Unspecified => {
                assumptions.push("Using the current kubectl context namespace".to_string());
            }
            None => {}
        }
        if rule.namespace == NamespaceSource::SingleOnly
            && facts.namespace.scope == NamespaceScope::All
        {
            warnings.push("All-namespaces scope ignored for a single-pod command".to_string());
        }
    }
    if let Some(w) = &facts.namespace.warning {
        warnings.push(w.clone());
    }
    if let Some(w) = rule.warning {
        warnings.push(w.to_string());
    }

    CommandPlan {
        command,
        source: SuggestionSource::Heuristic,
        confidence: rule.confidence,
        rationale: rule.rationale.to_string(),
        assumptions,
        warnings,
    }
}

fn words(query: &str) -> Vec<&str> {
    query
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| matches!(c, '?' | ',' | '.' | '!' | ';' | ':' | '"' | '\'' | '(' | ')' | '`')))
        .filter(|w| !w.is_empty())
        .collect()
}

fn is_namespace_word(word: &str) -> bool {
    word.len() <= 63 && K8S_NAME.is_match(word) && !NOT_A_NAMESPACE.contains(&word)
}

/// Pod named after "pod", or after "logs for/of/from [the] [pod]".
fn extract_pod_name(words: &[&str]) -> Option<String> {
    let candidate = |word: &&str| {
        word.len() <= 253 && POD_NAME.is_match(word) && !NOT_A_NAMESPACE.contains(word)
    };

    for (i, word) in words.iter().enumerate() {
        if *word == "pod"
            && let Some(next) = words.get(i + 1).copied().filter(candidate)
        {
            return Some(next.to_string());
        }
    }

    let logs_at = words.iter().position(|w| *w == "logs" || *w == "log")?;
    let mut rest = words[logs_at + 1..].iter().peekable();
    rest.next_if(|w| matches!(**w, "for" | "of" | "from"));
    rest.next_if(|w| **w == "the");
    rest.next_if(|w| **w == "pod");
    rest.next().copied().filter(candidate).map(str::to_string)
}

/// Namespace the query refers to, without building a plan.
pub fn infer_namespace(
    query: &str,
    request_namespace: Option<&str>,
    terminal_context: &[String],
) -> ResolvedNamespace {
    let words = words(query);
    let pod = extract_pod_name(&words);
    resolve_namespace(query, &words, pod.as_deref(), request_namespace, terminal_context)
}

/// Namespace resolution, most specific first: explicit all-namespaces phrase,
/// a namespace named in the query, "here" resolved through terminal context,
/// then the request's namespace.
fn resolve_namespace(
    query: &str,
    words: &[&str],
    pod: Option<&str>,
    request_namespace: Option<&str>,
    terminal_context: &[String],
) -> ResolvedNamespace {
    if ALL_NAMESPACES_PHRASES.iter().any(|p| query.contains(p)) {
        return ResolvedNamespace::plain(NamespaceScope::All);
    }

    if let Some(ns) = namespace_in_words(words, pod) {
        return ResolvedNamespace::plain(NamespaceScope::Named(ns));
    }

    let mut warning = None;
    if words.contains(&"here") || CURRENT_NAMESPACE_PHRASES.iter().any(|p| query.contains(p)) {
        if let Some(ns) = namespace_from_terminal(terminal_context) {
            return ResolvedNamespace {
                assumption: Some(format!("Reused namespace {ns} from the recent terminal command")),
                scope: NamespaceScope::Named(ns),
                warning: None,
            };
        }
        warning = Some(
            "Query refers to the current namespace but no recent kubectl command names one"
                .to_string(),
        );
    }

    let requested = request_namespace.map(str::trim).filter(|ns| !ns.is_empty());
    match requested {
        Some("all") => ResolvedNamespace {
            warning,
            ..ResolvedNamespace::plain(NamespaceScope::All)
        },
        Some(ns) if ns.len() <= 63 && K8S_NAME.is_match(ns) => ResolvedNamespace {
            scope: NamespaceScope::Named(ns.to_string()),
            assumption: Some(format!("Using request namespace {ns}")),
            warning,
        },
        Some(ns) => ResolvedNamespace {
            scope: NamespaceScope::Unspecified,
            assumption: None,
            warning: Some(format!("Ignoring invalid namespace {ns:?}")),
        },
        None => ResolvedNamespace {
            warning,
            ..ResolvedNamespace::plain(NamespaceScope::Unspecified)
        },
    }
}

/// "in X namespace" / "X namespace", then "namespace X", then "in X" / "for X".
fn namespace_in_words(words: &[&str], pod: Option<&str>) -> Option<String> {
    let usable = |w: &&str| is_namespace_word(w) && Some(*w) != pod;

    for (i, word) in words.iter().enumerate() {
        if *word == "namespace"
            && i > 0
            && let Some(prev) = words.get(i - 1).copied().filter(usable)
        {
            return Some(prev.to_string());
        }
    }
    for (i, word) in words.iter().enumerate() {
        if *word == "namespace"
            && let Some(next) = words.get(i + 1).copied().filter(usable)
        {
            return Some(next.to_string());
        }
    }
    for (i, word) in words.iter().enumerate() {
        if matches!(*word, "in" | "for")
            && let Some(next) = words.get(i + 1).copied().filter(usable)
        {
            return Some(next.to_string());
        }
    }
    None
}

/// Namespace of the most recent terminal kubectl command that names one.
pub fn namespace_from_terminal(context: &[String]) -> Option<String> {
    context
        .iter()
        .flat_map(|entry| entry.lines())
        .rev()
        .find_map(|line| {
            let tokens = split_command(line);
            let start = tokens.iter().position(|t| t == "kubectl")?;
            explicit_namespace(&tokens[start + 1..])
        })
}

fn explicit_namespace(args: &[String]) -> Option<String> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let value = if arg == "-n" || arg == "--namespace" {
            iter.next().map(String::as_str)
        } else if let Some(v) = arg.strip_prefix("--namespace=") {
            Some(v)
        } else if let Some(v) = arg.strip_prefix("-n")
            && !v.starts_with('-')
            && !v.is_empty()
        {
            Some(v.strip_prefix('=').unwrap_or(v))
        } else {
            None
        };
        if let Some(ns) = value.filter(|ns| ns.len() <= 63 && K8S_NAME.is_match(ns)) {
            return Some(ns.to_string());
        }
    }
    None
}
