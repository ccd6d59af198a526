use super::decision::CommandFamily;

/// Tokens of a command that already passed policy, with its family.
///
/// Adapters read flags and the subcommand from here instead of re-parsing
/// the raw string.
#[derive(Debug, Clone, Copy)]
pub struct CommandContext<'a> {
    /// All words in the command, binary first.
    pub tokens: &'a [String],
    /// Family resolved from the binary.
    pub family: CommandFamily,
}

impl<'a> CommandContext<'a> {
    pub fn new(tokens: &'a [String], family: CommandFamily) -> Self {
        Self { tokens, family }
    }

    /// The binary word as typed (`kubectl`, `bash`, ...).
    pub fn binary(&self) -> &'a str {
        self.tokens.first().map(|s| s.as_str()).unwrap_or("")
    }

    /// The second word, which the policy treats as the subcommand.
    pub fn subcommand(&self) -> Option<&'a str> {
        self.tokens.get(1).map(|s| s.as_str())
    }

    /// Words after the binary.
    pub fn args(&self) -> &'a [String] {
        if self.tokens.len() > 1 {
            &self.tokens[1..]
        } else {
            &[]
        }
    }

    /// Check if any word matches any of the given flags.
    pub fn has_any_flag(&self, flags: &[&str]) -> bool {
        self.tokens.iter().any(|w| flags.contains(&w.as_str()))
    }

    /// Check for `--flag` or `--flag=value`.
    pub fn has_long_flag(&self, flag: &str) -> bool {
        self.tokens.iter().any(|w| {
            w == flag
                || w
                    .strip_prefix(flag)
                    .is_some_and(|rest| rest.starts_with('='))
        })
    }
}
