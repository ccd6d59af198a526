//! Types produced by the raw-string guard and consumed by the eval layer.

/// A shell construct that is never allowed anywhere in a raw command string.
///
/// Commands are spawned without a shell, but the same string may be handed to
/// `sh -c` by a family adapter, so every construct that could chain, redirect
/// or substitute is rejected outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsafeOperator {
    /// `;`: run next unconditionally
    Semi,
    /// `&`: background, or half of `&&`
    Amp,
    /// `|`: pipe, or half of `||`
    Pipe,
    /// `` ` ``: legacy command substitution
    Backtick,
    /// `<`: input redirection or process substitution
    RedirectIn,
    /// `>`: output redirection or process substitution
    RedirectOut,
    /// `\n`: implicit command separator
    Newline,
    /// `\r`
    CarriageReturn,
    /// `$(`: command substitution
    CommandSubst,
    /// `${`: parameter expansion
    ParamExpansion,
}

impl UnsafeOperator {
    /// The operator's shell syntax, escaped for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            UnsafeOperator::Semi => ";",
            UnsafeOperator::Amp => "&",
            UnsafeOperator::Pipe => "|",
            UnsafeOperator::Backtick => "`",
            UnsafeOperator::RedirectIn => "<",
            UnsafeOperator::RedirectOut => ">",
            UnsafeOperator::Newline => "\\n",
            UnsafeOperator::CarriageReturn => "\\r",
            UnsafeOperator::CommandSubst => "$(",
            UnsafeOperator::ParamExpansion => "${",
        }
    }
}
