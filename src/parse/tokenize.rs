/// Split a raw command into words using shlex (POSIX word splitting).
///
/// Quoted groups (`"a b"`, `'a b'`) become a single word with the quote
/// characters stripped. Pure: the same input always yields the same tokens.
pub fn split_command(command: &str) -> Vec<String> {
    shlex::split(command).unwrap_or_else(|| {
        // Fallback: simple whitespace splitting if shlex can't parse
        command.split_whitespace().map(String::from).collect()
    })
}

/// Inverse of [`split_command`]: quote each word so that splitting the result
/// yields the same words. Fails only on words containing a NUL byte.
pub fn join_words<'a>(
    words: impl IntoIterator<Item = &'a str>,
) -> Result<String, shlex::QuoteError> {
    shlex::try_join(words)
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
