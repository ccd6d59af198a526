pub mod shell;
pub mod tokenize;
pub mod types;

pub use shell::find_unsafe_operator;
pub use tokenize::{join_words, normalize_whitespace, split_command};
pub use types::UnsafeOperator;
