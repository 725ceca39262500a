// Byte ranges into the statement text and verbatim capture.

use crate::error::{ParseError, Result};

/// Half-open byte range `[start, end)` into the original input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Span { start, end }
    }

    /// Empty span at `offset`, used for end-of-input.
    pub fn empty(offset: usize) -> Self {
        Span::new(offset, offset)
    }

    /// Span covering `self` through the end of `other`.
    pub fn to(self, other: Span) -> Span {
        Span::new(self.start, other.end.max(self.start))
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The exact source text covered by this span.
    ///
    /// Spans are only produced by the tokenizer on character boundaries of
    /// the same input, so slicing cannot split a UTF-8 sequence.
    pub fn slice(self, input: &str) -> &str {
        &input[self.start..self.end]
    }
}

/// Copy the source text covered by `span` into an owned string.
pub fn capture(input: &str, span: Span) -> Result<String> {
    copy(span.slice(input), span.start)
}

/// Copy `text`, reporting an allocation failure at `offset`.
pub fn copy(text: &str, offset: usize) -> Result<String> {
    let mut owned = String::new();
    owned
        .try_reserve_exact(text.len())
        .map_err(|_| ParseError::out_of_memory(offset, "unable to allocate captured text"))?;
    owned.push_str(text);
    Ok(owned)
}
