//! Prompt construction for the agentic suggestion attempt.

/// At most this many trailing terminal lines go into the prompt.
pub const MAX_TERMINAL_LINES: usize = 4;
/// Each terminal line is cut to this many characters.
pub const MAX_TERMINAL_LINE_CHARS: usize = 1200;

pub const SYSTEM_PROMPT: &str = "\
You translate a Kubernetes operator's request into exactly one read-only kubectl command.
Respond with a single JSON object and nothing else:
{\"command\": string, \"confidence\": integer 0-100, \"rationale\": string, \"assumptions\": [string], \"warnings\": [string]}
Rules:
- The command must start with \"kubectl \" and use only: get, describe, logs, top, events, api-resources, cluster-info, version, config, explain.
- Never use shell operators, pipes, redirection, command substitution or variable expansion.
- For pods that are not running, use exactly: kubectl get pods -A --field-selector=status.phase!=Running
- For pods and deployments together, use: kubectl get pods,deployments
- Use -n <namespace> for a single namespace and -A for all namespaces.
- If the request asks why something is broken, do not answer with a bare listing command.";

/// Inputs for the user turn of the prompt.
#[derive(Debug, Clone, Copy)]
pub struct PromptInput<'a> {
    pub query: &'a str,
    pub default_namespace: &'a str,
    pub cluster_context: Option<&'a str>,
    pub terminal_context: &'a [String],
}

pub fn build_user_prompt(input: PromptInput<'_>) -> String {
    let mut prompt = format!("Request: {}\n", input.query.trim());
    prompt.push_str(&format!(
        "Default namespace (use unless the request says otherwise): {}\n",
        input.default_namespace
    ));
    if let Some(ctx) = input.cluster_context {
        prompt.push_str(&format!("Cluster context: {ctx}\n"));
    }
    let lines = recent_terminal_lines(input.terminal_context);
    if !lines.is_empty() {
        prompt.push_str("Recent terminal output:\n");
        for line in lines {
            prompt.push_str("  ");
            prompt.push_str(&line);
            prompt.push('\n');
        }
    }
    prompt.push_str("Return the JSON object now.");
    prompt
}

/// The last [`MAX_TERMINAL_LINES`] non-blank lines, each cut to
/// [`MAX_TERMINAL_LINE_CHARS`] characters. Multi-line entries are split.
pub fn recent_terminal_lines(context: &[String]) -> Vec<String> {
    let mut lines: Vec<String> = context
        .iter()
        .flat_map(|entry| entry.lines())
        .filter(|line| !line.trim().is_empty())
        .rev()
        .take(MAX_TERMINAL_LINES)
        .map(|line| line.chars().take(MAX_TERMINAL_LINE_CHARS).collect())
        .collect();
    lines.reverse();
    lines
}
