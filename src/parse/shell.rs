use super::types::UnsafeOperator;

/// Scan a raw command for shell metacharacters and substitution syntax.
///
/// This deliberately ignores quoting: `kubectl get "pods;rm"` is rejected just
/// like `kubectl get pods; rm`. A token that is harmless to the tokenizer can
/// still be dangerous once a family adapter forwards it to `sh -c`.
///
/// Returns the first offending construct in string order.
pub fn find_unsafe_operator(command: &str) -> Option<UnsafeOperator> {
    let mut chars = command.chars().peekable();
    while let Some(c) = chars.next() {
        let op = match c {
            ';' => UnsafeOperator::Semi,
            '&' => UnsafeOperator::Amp,
            '|' => UnsafeOperator::Pipe,
            '`' => UnsafeOperator::Backtick,
            '<' => UnsafeOperator::RedirectIn,
            '>' => UnsafeOperator::RedirectOut,
            '\n' => UnsafeOperator::Newline,
            '\r' => UnsafeOperator::CarriageReturn,
            '$' => match chars.peek() {
                Some('(') => UnsafeOperator::CommandSubst,
                Some('{') => UnsafeOperator::ParamExpansion,
                _ => continue,
            },
            _ => continue,
        };
        return Some(op);
    }
    None
}
