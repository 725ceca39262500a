// Capacity limits applied while parsing.

/// Default for [`ParseOptions::max_sql_length`].
pub const DEFAULT_MAX_SQL_LENGTH: usize = 1_000_000;

/// Default for [`ParseOptions::max_columns`], SQLite's `SQLITE_MAX_COLUMN`.
pub const DEFAULT_MAX_COLUMNS: usize = 2000;

/// Default for [`ParseOptions::max_expr_depth`], SQLite's `SQLITE_MAX_EXPR_DEPTH`.
pub const DEFAULT_MAX_EXPR_DEPTH: usize = 1000;

/// Limits enforced by [`crate::parse_with_options`].
///
/// Exceeding any of them is reported as [`crate::ErrorKind::OutOfMemory`]:
/// the statement may be well formed, it is just larger than the caller is
/// willing to hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Longest accepted statement, in bytes.
    pub max_sql_length: usize,
    /// Most column definitions accepted in one table.
    pub max_columns: usize,
    /// Deepest parenthesis nesting inside a CHECK or DEFAULT expression.
    pub max_expr_depth: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_sql_length: DEFAULT_MAX_SQL_LENGTH,
            max_columns: DEFAULT_MAX_COLUMNS,
            max_expr_depth: DEFAULT_MAX_EXPR_DEPTH,
        }
    }
}

impl ParseOptions {
    pub fn with_max_sql_length(mut self, max: usize) -> Self {
        self.max_sql_length = max;
        self
    }

    pub fn with_max_columns(mut self, max: usize) -> Self {
        self.max_columns = max;
        self
    }

    pub fn with_max_expr_depth(mut self, max: usize) -> Self {
        self.max_expr_depth = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_sqlite_limits() {
        let opts = ParseOptions::default();
        assert_eq!(opts.max_columns, 2000);
        assert_eq!(opts.max_expr_depth, 1000);
        assert_eq!(opts.max_sql_length, DEFAULT_MAX_SQL_LENGTH);
    }

    #[test]
    fn builder_overrides() {
        let opts = ParseOptions::default()
            .with_max_columns(3)
            .with_max_expr_depth(4)
            .with_max_sql_length(64);
        assert_eq!(
            opts,
            ParseOptions {
                max_sql_length: 64,
                max_columns: 3,
                max_expr_depth: 4,
            }
        );
    }
}
