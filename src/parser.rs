//! CREATE TABLE parser - recursive descent over a lazily tokenized statement.

use tracing::{debug, trace};

use crate::ast::*;
use crate::config::ParseOptions;
use crate::error::{ParseError, Result};
use crate::span::{capture, Span};
use crate::tokenizer::{Keyword, Token, TokenKind, Tokenizer};

/// Single-statement parser.
///
/// Holds the current token plus at most one token of lookahead; the
/// tokenizer is pulled on demand, so no token vector is materialized.
pub struct Parser<'a> {
    tokenizer: Tokenizer<'a>,
    options: &'a ParseOptions,
    current: Token,
    lookahead: Option<Token>,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str, options: &'a ParseOptions) -> Result<Self> {
        if input.len() > options.max_sql_length {
            let mut offset = options.max_sql_length;
            while !input.is_char_boundary(offset) {
                offset -= 1;
            }
            return Err(ParseError::out_of_memory(
                offset,
                format!(
                    "statement is {} bytes, limit is {}",
                    input.len(),
                    options.max_sql_length
                ),
            ));
        }
        let mut tokenizer = Tokenizer::new(input);
        let current = tokenizer.next_token()?;
        Ok(Parser {
            tokenizer,
            options,
            current,
            lookahead: None,
        })
    }

    /// Parse the whole input as exactly one CREATE TABLE statement.
    pub fn parse_create_table(mut self) -> Result<Table> {
        let mut table = Table::default();

        self.expect_keyword(Keyword::Create, "expected CREATE TABLE")?;
        table.temporary = self.eat_keyword(Keyword::Temp)? || self.eat_keyword(Keyword::Temporary)?;

        if let TokenKind::Keyword(
            kw @ (Keyword::Virtual
            | Keyword::Unique
            | Keyword::Index
            | Keyword::View
            | Keyword::Trigger),
        ) = self.current.kind
        {
            return Err(self.unsupported(&format!(
                "only CREATE TABLE is supported, found CREATE {kw}"
            )));
        }
        self.expect_keyword(Keyword::Table, "expected TABLE")?;

        if self.eat_keyword(Keyword::If)? {
            self.expect_keyword(Keyword::Not, "expected NOT after IF")?;
            self.expect_keyword(Keyword::Exists, "expected EXISTS after IF NOT")?;
            table.if_not_exists = true;
        }

        let first = self.parse_name("table name")?;
        if self.eat(&TokenKind::Dot)? {
            table.schema = Some(first);
            table.name = self.parse_name("table name")?;
        } else {
            table.name = first;
        }

        if self.check_keyword(Keyword::As) {
            return Err(self.unsupported("CREATE TABLE ... AS SELECT is not supported"));
        }

        self.expect(&TokenKind::LeftParen, "expected '(' after table name")?;
        self.parse_table_body(&mut table)?;
        self.expect(&TokenKind::RightParen, "expected ',' or ')'")?;
        self.parse_table_options(&mut table)?;
        self.parse_statement_end()?;

        Ok(table)
    }

    // -- table level ------------------------------------------------------

    /// Column definitions followed by table constraints, up to (not
    /// including) the closing parenthesis.
    fn parse_table_body(&mut self, table: &mut Table) -> Result<()> {
        let body_start = self.current.span;

        loop {
            // Trailing comma before ')'.
            if self.current.kind == TokenKind::RightParen
                && !(table.columns.is_empty() && table.table_constraints.is_empty())
            {
                break;
            }

            let offset = self.current.span.start;
            if self.starts_table_constraint() {
                trace!(offset, "table constraint");
                let constraint = self.parse_table_constraint()?;
                push(&mut table.table_constraints, constraint, offset)?;
            } else if !table.table_constraints.is_empty() {
                return Err(self.unexpected(
                    "expected table constraint; column definitions must precede table constraints",
                ));
            } else {
                trace!(offset, "column definition");
                if table.columns.len() >= self.options.max_columns {
                    return Err(ParseError::out_of_memory(
                        offset,
                        format!("too many columns, limit is {}", self.options.max_columns),
                    )
                    .with_token(self.input(), self.current.span));
                }
                let column = self.parse_column_def()?;
                push(&mut table.columns, column, offset)?;
            }

            if self.eat(&TokenKind::Comma)? {
                continue;
            }
            // Table constraints may also be separated by whitespace alone.
            if !table.table_constraints.is_empty() && self.starts_table_constraint() {
                continue;
            }
            break;
        }

        if table.columns.is_empty() {
            return Err(ParseError::syntax(
                body_start.start,
                "a table must have at least one column",
            )
            .with_token(self.input(), body_start));
        }
        Ok(())
    }

    /// `WITHOUT ROWID` and `STRICT`, comma separated, in any order.
    fn parse_table_options(&mut self, table: &mut Table) -> Result<()> {
        if !self.check_keyword(Keyword::Without) && !self.check_word("STRICT") {
            return Ok(());
        }
        loop {
            if self.eat_keyword(Keyword::Without)? {
                if !self.check_name("ROWID") {
                    return Err(self.unexpected("expected ROWID after WITHOUT"));
                }
                self.advance()?;
                table.without_rowid = true;
            } else if self.check_word("STRICT") {
                self.advance()?;
                table.strict = true;
            } else {
                return Err(self.unexpected("expected WITHOUT ROWID or STRICT"));
            }
            if !self.eat(&TokenKind::Comma)? {
                return Ok(());
            }
        }
    }

    fn parse_statement_end(&mut self) -> Result<()> {
        if self.eat(&TokenKind::Semicolon)? {
            while self.eat(&TokenKind::Semicolon)? {}
            if !self.current.is_eof() {
                return Err(self.unsupported("only a single statement can be parsed"));
            }
        } else if !self.current.is_eof() {
            return Err(self.unexpected("expected end of statement"));
        }
        Ok(())
    }

    fn starts_table_constraint(&self) -> bool {
        matches!(
            self.current.kind,
            TokenKind::Keyword(
                Keyword::Constraint
                    | Keyword::Primary
                    | Keyword::Unique
                    | Keyword::Check
                    | Keyword::Foreign
            )
        )
    }

    fn parse_table_constraint(&mut self) -> Result<TableConstraint> {
        let name = if self.eat_keyword(Keyword::Constraint)? {
            Some(self.parse_name("constraint name")?)
        } else {
            None
        };

        let kind = if self.eat_keyword(Keyword::Primary)? {
            self.expect_keyword(Keyword::Key, "expected KEY after PRIMARY")?;
            let columns = self.parse_indexed_columns()?;
            let conflict = self.parse_conflict_clause()?;
            TableConstraintKind::PrimaryKey { columns, conflict }
        } else if self.eat_keyword(Keyword::Unique)? {
            let columns = self.parse_indexed_columns()?;
            let conflict = self.parse_conflict_clause()?;
            TableConstraintKind::Unique { columns, conflict }
        } else if self.eat_keyword(Keyword::Check)? {
            let expr = self.parse_parenthesized_expr()?;
            // SQLite accepts and ignores a conflict clause here.
            self.parse_conflict_clause()?;
            TableConstraintKind::Check(expr)
        } else if self.eat_keyword(Keyword::Foreign)? {
            self.expect_keyword(Keyword::Key, "expected KEY after FOREIGN")?;
            self.expect(&TokenKind::LeftParen, "expected '(' after FOREIGN KEY")?;
            let columns = self.parse_name_list("column name")?;
            self.expect(&TokenKind::RightParen, "expected ')' after foreign key columns")?;
            self.expect_keyword(Keyword::References, "expected REFERENCES")?;
            let foreign_key = self.parse_foreign_key_clause()?;
            TableConstraintKind::ForeignKey {
                columns,
                foreign_key,
            }
        } else {
            return Err(self.unexpected("expected PRIMARY KEY, UNIQUE, CHECK or FOREIGN KEY"));
        };

        Ok(TableConstraint { name, kind })
    }

    fn parse_indexed_columns(&mut self) -> Result<Vec<IndexedColumn>> {
        self.expect(&TokenKind::LeftParen, "expected '(' before indexed columns")?;
        let mut columns = Vec::new();
        loop {
            let offset = self.current.span.start;
            let mut column = IndexedColumn {
                name: self.parse_name("column name")?,
                ..Default::default()
            };
            if self.eat_keyword(Keyword::Collate)? {
                column.collate = Some(self.parse_name("collation name")?);
            }
            column.order = self.parse_order()?;
            push(&mut columns, column, offset)?;
            if !self.eat(&TokenKind::Comma)? {
                break;
            }
        }
        self.expect(&TokenKind::RightParen, "expected ',' or ')' after indexed column")?;
        Ok(columns)
    }

    // -- columns ----------------------------------------------------------

    fn parse_column_def(&mut self) -> Result<Column> {
        let mut column = Column {
            name: self.parse_name("column name")?,
            ..Default::default()
        };
        self.parse_type(&mut column)?;
        while self.parse_column_constraint(&mut column)? {}
        Ok(column)
    }

    /// Type name words up to the first constraint keyword, then an optional
    /// `(size)` or `(precision, scale)`.
    fn parse_type(&mut self, column: &mut Column) -> Result<()> {
        if !self.is_type_word() {
            return Ok(());
        }
        let first = self.advance()?.span;
        let mut last = first;
        while self.is_type_word() {
            last = self.advance()?.span;
        }
        column.type_name = Some(capture(self.input(), first.to(last))?);

        if self.eat(&TokenKind::LeftParen)? {
            let size = self.parse_signed_number("expected type size")?;
            let mut end = size;
            if self.eat(&TokenKind::Comma)? {
                end = self.parse_signed_number("expected type scale")?;
            }
            self.expect(&TokenKind::RightParen, "expected ')' after type size")?;
            column.length = Some(capture(self.input(), size.to(end))?);
        }
        Ok(())
    }

    /// Type names are unreserved words, so anything that can start a column
    /// constraint (or a generated column) ends the type.
    fn is_type_word(&self) -> bool {
        match &self.current.kind {
            TokenKind::Ident | TokenKind::QuotedIdent(_) | TokenKind::StringLiteral(_) => true,
            TokenKind::Keyword(kw) => !kw.is_reserved() && *kw != Keyword::Generated,
            _ => false,
        }
    }

    fn starts_column_constraint(&self) -> bool {
        matches!(
            self.current.kind,
            TokenKind::Keyword(
                Keyword::Primary
                    | Keyword::Not
                    | Keyword::Null
                    | Keyword::Unique
                    | Keyword::Check
                    | Keyword::Default
                    | Keyword::Collate
                    | Keyword::References
                    | Keyword::Generated
                    | Keyword::As
            )
        )
    }

    /// Parse one column constraint into `column`. Returns `false` when the
    /// current token does not start a constraint.
    fn parse_column_constraint(&mut self, column: &mut Column) -> Result<bool> {
        if self.eat_keyword(Keyword::Constraint)? {
            column.constraint_name = Some(self.parse_name("constraint name")?);
            if !self.starts_column_constraint() {
                return Err(self.unexpected("expected column constraint after CONSTRAINT name"));
            }
        }

        let kw = match self.current.kind {
            TokenKind::Keyword(kw) => kw,
            _ => return Ok(false),
        };

        match kw {
            Keyword::Primary => {
                self.advance()?;
                self.expect_keyword(Keyword::Key, "expected KEY after PRIMARY")?;
                column.primary_key = true;
                column.primary_key_order = self.parse_order()?;
                column.primary_key_conflict = self.parse_conflict_clause()?;
                column.autoincrement = self.eat_keyword(Keyword::Autoincrement)?;
            }
            Keyword::Not => {
                self.advance()?;
                self.expect_keyword(Keyword::Null, "expected NULL after NOT")?;
                column.not_null = true;
                column.not_null_conflict = self.parse_conflict_clause()?;
            }
            Keyword::Null => {
                // A bare NULL constraint is accepted and has no effect.
                self.advance()?;
                self.parse_conflict_clause()?;
            }
            Keyword::Unique => {
                self.advance()?;
                column.unique = true;
                column.unique_conflict = self.parse_conflict_clause()?;
            }
            Keyword::Check => {
                self.advance()?;
                column.check = Some(self.parse_parenthesized_expr()?);
            }
            Keyword::Default => {
                self.advance()?;
                column.default = Some(self.parse_default()?);
            }
            Keyword::Collate => {
                self.advance()?;
                column.collate_name = Some(self.parse_name("collation name")?);
            }
            Keyword::References => {
                self.advance()?;
                column.foreign_key = Some(self.parse_foreign_key_clause()?);
            }
            Keyword::Generated | Keyword::As => {
                return Err(self.unsupported("generated columns are not supported"));
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    /// `DEFAULT` value: a literal, a signed number, a bare word such as
    /// `CURRENT_TIMESTAMP`, or a parenthesized expression.
    fn parse_default(&mut self) -> Result<String> {
        match self.current.kind {
            TokenKind::LeftParen => return self.parse_parenthesized_expr(),
            TokenKind::Operator => {
                let span = self.parse_signed_number("expected literal value after DEFAULT")?;
                return capture(self.input(), span);
            }
            _ => {}
        }

        let literal = match &self.current.kind {
            TokenKind::StringLiteral(_)
            | TokenKind::NumericLiteral
            | TokenKind::BlobLiteral
            | TokenKind::Ident
            | TokenKind::QuotedIdent(_) => true,
            TokenKind::Keyword(kw) => *kw == Keyword::Null || !kw.is_reserved(),
            _ => false,
        };
        if !literal {
            return Err(self.unexpected("expected literal value after DEFAULT"));
        }
        let span = self.advance()?.span;
        capture(self.input(), span)
    }

    /// `[+|-] number`, returning the span covering sign and digits.
    fn parse_signed_number(&mut self, expected: &str) -> Result<Span> {
        let start = self.current.span;
        if self.current.kind == TokenKind::Operator && matches!(self.text(start), "+" | "-") {
            self.advance()?;
        }
        if self.current.kind != TokenKind::NumericLiteral {
            return Err(self.unexpected(expected));
        }
        let end = self.advance()?.span;
        Ok(start.to(end))
    }

    /// `'(' expr ')'` captured verbatim (without the outer parentheses).
    ///
    /// Only parentheses are interpreted; every other token, including
    /// keywords and string literals, is passed over untouched.
    fn parse_parenthesized_expr(&mut self) -> Result<String> {
        self.expect(&TokenKind::LeftParen, "expected '('")?;
        let mut depth = 1usize;
        let mut inner: Option<Span> = None;

        loop {
            match self.current.kind {
                TokenKind::Eof => {
                    return Err(ParseError::syntax(
                        self.current.span.start,
                        "unbalanced parentheses, expected ')'",
                    ));
                }
                TokenKind::LeftParen => {
                    depth += 1;
                    if depth > self.options.max_expr_depth {
                        return Err(ParseError::out_of_memory(
                            self.current.span.start,
                            format!(
                                "expression nested deeper than {}",
                                self.options.max_expr_depth
                            ),
                        )
                        .with_token(self.input(), self.current.span));
                    }
                }
                TokenKind::RightParen => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            let span = self.advance()?.span;
            inner = Some(inner.map_or(span, |s| s.to(span)));
        }

        let close = self.advance()?.span;
        match inner {
            Some(span) => capture(self.input(), span),
            None => Err(ParseError::syntax(close.start, "expected expression")
                .with_token(self.input(), close)),
        }
    }

    // -- shared clauses ---------------------------------------------------

    fn parse_order(&mut self) -> Result<OrderClause> {
        if self.eat_keyword(Keyword::Asc)? {
            Ok(OrderClause::Asc)
        } else if self.eat_keyword(Keyword::Desc)? {
            Ok(OrderClause::Desc)
        } else {
            Ok(OrderClause::None)
        }
    }

    /// Optional `ON CONFLICT <resolution>`.
    fn parse_conflict_clause(&mut self) -> Result<ConflictClause> {
        if !self.eat_keyword(Keyword::On)? {
            return Ok(ConflictClause::None);
        }
        self.expect_keyword(Keyword::Conflict, "expected CONFLICT after ON")?;
        let resolution = match self.current.kind {
            TokenKind::Keyword(Keyword::Rollback) => ConflictClause::Rollback,
            TokenKind::Keyword(Keyword::Abort) => ConflictClause::Abort,
            TokenKind::Keyword(Keyword::Fail) => ConflictClause::Fail,
            TokenKind::Keyword(Keyword::Ignore) => ConflictClause::Ignore,
            TokenKind::Keyword(Keyword::Replace) => ConflictClause::Replace,
            _ => {
                return Err(self.unexpected("expected ROLLBACK, ABORT, FAIL, IGNORE or REPLACE"));
            }
        };
        self.advance()?;
        Ok(resolution)
    }

    /// Everything after `REFERENCES`.
    fn parse_foreign_key_clause(&mut self) -> Result<ForeignKey> {
        let mut fk = ForeignKey {
            table: self.parse_name("referenced table name")?,
            ..Default::default()
        };

        if self.eat(&TokenKind::LeftParen)? {
            fk.columns = self.parse_name_list("referenced column name")?;
            self.expect(&TokenKind::RightParen, "expected ')' after referenced columns")?;
        }

        // Repeated ON DELETE / ON UPDATE clauses overwrite earlier ones.
        loop {
            if self.eat_keyword(Keyword::On)? {
                if self.eat_keyword(Keyword::Delete)? {
                    fk.on_delete = self.parse_foreign_key_action()?;
                } else if self.eat_keyword(Keyword::Update)? {
                    fk.on_update = self.parse_foreign_key_action()?;
                } else {
                    return Err(self.unexpected("expected DELETE or UPDATE after ON"));
                }
            } else if self.eat_keyword(Keyword::Match)? {
                fk.match_name = Some(self.parse_name("match type")?);
            } else {
                break;
            }
        }

        // NOT here is ambiguous with a following NOT NULL column constraint.
        let negated =
            self.check_keyword(Keyword::Not) && self.peek_second()?.is_keyword(Keyword::Deferrable);
        if negated {
            self.advance()?;
        }
        if self.eat_keyword(Keyword::Deferrable)? {
            let initially = if self.eat_keyword(Keyword::Initially)? {
                if self.eat_keyword(Keyword::Deferred)? {
                    InitialMode::Deferred
                } else if self.eat_keyword(Keyword::Immediate)? {
                    InitialMode::Immediate
                } else {
                    return Err(self.unexpected("expected DEFERRED or IMMEDIATE after INITIALLY"));
                }
            } else {
                InitialMode::Unspecified
            };
            fk.deferrable = ForeignKeyDeferrable::new(negated, initially);
        }

        Ok(fk)
    }

    fn parse_foreign_key_action(&mut self) -> Result<ForeignKeyAction> {
        if self.eat_keyword(Keyword::Set)? {
            if self.eat_keyword(Keyword::Null)? {
                Ok(ForeignKeyAction::SetNull)
            } else if self.eat_keyword(Keyword::Default)? {
                Ok(ForeignKeyAction::SetDefault)
            } else {
                Err(self.unexpected("expected NULL or DEFAULT after SET"))
            }
        } else if self.eat_keyword(Keyword::Cascade)? {
            Ok(ForeignKeyAction::Cascade)
        } else if self.eat_keyword(Keyword::Restrict)? {
            Ok(ForeignKeyAction::Restrict)
        } else if self.eat_keyword(Keyword::No)? {
            self.expect_keyword(Keyword::Action, "expected ACTION after NO")?;
            Ok(ForeignKeyAction::NoAction)
        } else {
            Err(self.unexpected("expected SET NULL, SET DEFAULT, CASCADE, RESTRICT or NO ACTION"))
        }
    }

    // -- names ------------------------------------------------------------

    /// A bare, quoted or single-quoted name, or an unreserved keyword.
    /// Bare names keep their original case.
    fn parse_name(&mut self, what: &str) -> Result<String> {
        let is_name = match &self.current.kind {
            TokenKind::Ident | TokenKind::QuotedIdent(_) | TokenKind::StringLiteral(_) => true,
            TokenKind::Keyword(kw) => !kw.is_reserved(),
            _ => false,
        };
        if !is_name {
            return Err(self.unexpected(&format!("expected {what}")));
        }
        let token = self.advance()?;
        match token.kind {
            TokenKind::QuotedIdent(value) | TokenKind::StringLiteral(value) => Ok(value),
            _ => capture(self.input(), token.span),
        }
    }

    fn parse_name_list(&mut self, what: &str) -> Result<Vec<String>> {
        let mut names = Vec::new();
        loop {
            let offset = self.current.span.start;
            let name = self.parse_name(what)?;
            push(&mut names, name, offset)?;
            if !self.eat(&TokenKind::Comma)? {
                return Ok(names);
            }
        }
    }

    // -- token helpers ----------------------------------------------------

    fn input(&self) -> &'a str {
        self.tokenizer.input()
    }

    fn text(&self, span: Span) -> &'a str {
        span.slice(self.input())
    }

    /// The token after the current one, read from the tokenizer on first use.
    fn peek_second(&mut self) -> Result<&Token> {
        let token = match self.lookahead.take() {
            Some(token) => token,
            None => self.tokenizer.next_token()?,
        };
        let token: &Token = self.lookahead.insert(token);
        Ok(token)
    }

    /// Consume the current token and return it.
    fn advance(&mut self) -> Result<Token> {
        let next = match self.lookahead.take() {
            Some(token) => token,
            None => self.tokenizer.next_token()?,
        };
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn check_keyword(&self, kw: Keyword) -> bool {
        self.current.is_keyword(kw)
    }

    /// Case-insensitive match of a bare identifier used as a contextual keyword.
    fn check_word(&self, word: &str) -> bool {
        self.current.kind == TokenKind::Ident
            && self.text(self.current.span).eq_ignore_ascii_case(word)
    }

    /// Like [`Self::check_word`], but also matches a quoted name.
    fn check_name(&self, word: &str) -> bool {
        match &self.current.kind {
            TokenKind::QuotedIdent(value) | TokenKind::StringLiteral(value) => {
                value.eq_ignore_ascii_case(word)
            }
            _ => self.check_word(word),
        }
    }

    fn eat_keyword(&mut self, kw: Keyword) -> Result<bool> {
        if self.check_keyword(kw) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect_keyword(&mut self, kw: Keyword, expected: &str) -> Result<Token> {
        if self.check_keyword(kw) {
            self.advance()
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn eat(&mut self, kind: &TokenKind) -> Result<bool> {
        if self.current.kind == *kind {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: &TokenKind, expected: &str) -> Result<Token> {
        if self.current.kind == *kind {
            self.advance()
        } else {
            Err(self.unexpected(expected))
        }
    }

    /// Syntax error at the current token.
    fn unexpected(&self, expected: &str) -> ParseError {
        let token = &self.current;
        let message = if token.is_eof() {
            format!("{expected}, found end of input")
        } else {
            expected.to_owned()
        };
        ParseError::syntax(token.span.start, message).with_token(self.input(), token.span)
    }

    fn unsupported(&self, message: &str) -> ParseError {
        ParseError::unsupported(self.current.span.start, message)
            .with_token(self.input(), self.current.span)
    }
}

/// Append with a fallible reservation so allocation failure surfaces as an error.
fn push<T>(items: &mut Vec<T>, item: T, offset: usize) -> Result<()> {
    items
        .try_reserve(1)
        .map_err(|_| ParseError::out_of_memory(offset, "unable to grow list"))?;
    items.push(item);
    Ok(())
}

/// Parse a single CREATE TABLE statement with the default [`ParseOptions`].
pub fn parse(sql: &str) -> Result<Table> {
    parse_with_options(sql, &ParseOptions::default())
}

/// Parse a single CREATE TABLE statement.
pub fn parse_with_options(sql: &str, options: &ParseOptions) -> Result<Table> {
    let result = Parser::new(sql, options).and_then(Parser::parse_create_table);
    match &result {
        Ok(table) => debug!(
            table = %table.qualified_name(),
            columns = table.columns.len(),
            constraints = table.table_constraints.len(),
            "parsed CREATE TABLE"
        ),
        Err(e) => debug!(kind = %e.kind, offset = e.offset, "failed to parse CREATE TABLE"),
    }
    result
}
