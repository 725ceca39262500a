use std::fmt;

use thiserror::Error;

use crate::span::Span;

/// Classification of a failed parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum ErrorKind {
    /// An allocation failed or a configured capacity limit was exceeded.
    OutOfMemory,
    /// The input does not match the CREATE TABLE grammar at the reported offset.
    Syntax,
    /// Plausible SQL that uses a construct this parser does not model.
    UnsupportedConstruct,
}

impl ErrorKind {
    /// Only resource failures may succeed on a second attempt with the same input.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::OutOfMemory)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::OutOfMemory => write!(f, "out of memory"),
            ErrorKind::Syntax => write!(f, "syntax"),
            ErrorKind::UnsupportedConstruct => write!(f, "unsupported construct"),
        }
    }
}

/// Error returned by [`crate::parse`].
///
/// `offset` is a byte offset into the statement text. `token` holds the raw
/// text of the offending token when the failure is attached to one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} error at offset {offset}: {message}{}", near(.token))]
pub struct ParseError {
    pub kind: ErrorKind,
    pub offset: usize,
    pub token: Option<String>,
    pub message: String,
}

fn near(token: &Option<String>) -> String {
    match token {
        Some(t) => format!(" near \"{t}\""),
        None => String::new(),
    }
}

impl ParseError {
    pub fn new(kind: ErrorKind, offset: usize, message: impl Into<String>) -> Self {
        ParseError {
            kind,
            offset,
            token: None,
            message: message.into(),
        }
    }

    pub fn syntax(offset: usize, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Syntax, offset, message)
    }

    pub fn unsupported(offset: usize, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnsupportedConstruct, offset, message)
    }

    pub fn out_of_memory(offset: usize, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::OutOfMemory, offset, message)
    }

    /// Attach the raw text of the token at `span`.
    pub fn with_token(mut self, input: &str, span: Span) -> Self {
        if !span.is_empty() {
            self.token = Some(span.slice(input).to_owned());
        }
        self
    }
}

/// A numeric discriminant that does not name any variant of the target enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{value} is not a valid {type_name} discriminant")]
pub struct InvalidDiscriminant {
    pub type_name: &'static str,
    pub value: u8,
}

pub type Result<T> = std::result::Result<T, ParseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_token() {
        let err = ParseError::syntax(13, "expected table name").with_token(
            "CREATE TABLE (x INT)",
            Span::new(13, 14),
        );
        assert_eq!(
            err.to_string(),
            "syntax error at offset 13: expected table name near \"(\""
        );
    }

    #[test]
    fn display_without_token() {
        let err = ParseError::syntax(5, "unexpected end of input");
        assert_eq!(err.to_string(), "syntax error at offset 5: unexpected end of input");
    }

    #[test]
    fn empty_span_leaves_token_unset() {
        let err = ParseError::syntax(4, "x").with_token("abcd", Span::new(4, 4));
        assert!(err.token.is_none());
    }

    #[test]
    fn only_out_of_memory_is_retryable() {
        assert!(ErrorKind::OutOfMemory.is_retryable());
        assert!(!ErrorKind::Syntax.is_retryable());
        assert!(!ErrorKind::UnsupportedConstruct.is_retryable());
    }
}
