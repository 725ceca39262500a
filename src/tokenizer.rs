// Hand-written SQL tokenizer/lexer for CREATE TABLE statements.

use std::fmt;

use crate::error::{ParseError, Result};
use crate::span::Span;

// ---------------------------------------------------------------------------
// Keywords
// ---------------------------------------------------------------------------

/// Keywords that take part in the CREATE TABLE grammar.
///
/// `ROWID` and `STRICT` are plain identifiers; the parser matches them by
/// text in the table options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Abort,
    Action,
    As,
    Asc,
    Autoincrement,
    Cascade,
    Check,
    Collate,
    Conflict,
    Constraint,
    Create,
    Default,
    Deferrable,
    Deferred,
    Delete,
    Desc,
    Exists,
    Fail,
    Foreign,
    Generated,
    If,
    Ignore,
    Immediate,
    Index,
    Initially,
    Key,
    Match,
    No,
    Not,
    Null,
    On,
    Primary,
    References,
    Replace,
    Restrict,
    Rollback,
    Select,
    Set,
    Table,
    Temp,
    Temporary,
    Trigger,
    Unique,
    Update,
    View,
    Virtual,
    Without,
}

const KEYWORDS: &[(&str, Keyword)] = &[
    ("ABORT", Keyword::Abort),
    ("ACTION", Keyword::Action),
    ("AS", Keyword::As),
    ("ASC", Keyword::Asc),
    ("AUTOINCREMENT", Keyword::Autoincrement),
    ("CASCADE", Keyword::Cascade),
    ("CHECK", Keyword::Check),
    ("COLLATE", Keyword::Collate),
    ("CONFLICT", Keyword::Conflict),
    ("CONSTRAINT", Keyword::Constraint),
    ("CREATE", Keyword::Create),
    ("DEFAULT", Keyword::Default),
    ("DEFERRABLE", Keyword::Deferrable),
    ("DEFERRED", Keyword::Deferred),
    ("DELETE", Keyword::Delete),
    ("DESC", Keyword::Desc),
    ("EXISTS", Keyword::Exists),
    ("FAIL", Keyword::Fail),
    ("FOREIGN", Keyword::Foreign),
    ("GENERATED", Keyword::Generated),
    ("IF", Keyword::If),
    ("IGNORE", Keyword::Ignore),
    ("IMMEDIATE", Keyword::Immediate),
    ("INDEX", Keyword::Index),
    ("INITIALLY", Keyword::Initially),
    ("KEY", Keyword::Key),
    ("MATCH", Keyword::Match),
    ("NO", Keyword::No),
    ("NOT", Keyword::Not),
    ("NULL", Keyword::Null),
    ("ON", Keyword::On),
    ("PRIMARY", Keyword::Primary),
    ("REFERENCES", Keyword::References),
    ("REPLACE", Keyword::Replace),
    ("RESTRICT", Keyword::Restrict),
    ("ROLLBACK", Keyword::Rollback),
    ("SELECT", Keyword::Select),
    ("SET", Keyword::Set),
    ("TABLE", Keyword::Table),
    ("TEMP", Keyword::Temp),
    ("TEMPORARY", Keyword::Temporary),
    ("TRIGGER", Keyword::Trigger),
    ("UNIQUE", Keyword::Unique),
    ("UPDATE", Keyword::Update),
    ("VIEW", Keyword::View),
    ("VIRTUAL", Keyword::Virtual),
    ("WITHOUT", Keyword::Without),
];

/// Longest entry in [`KEYWORDS`]; words longer than this are never keywords.
const MAX_KEYWORD_LEN: usize = 13;

impl Keyword {
    /// Case-insensitive lookup of a bare word.
    pub fn lookup(word: &str) -> Option<Keyword> {
        if word.len() > MAX_KEYWORD_LEN {
            return None;
        }
        KEYWORDS
            .iter()
            .find(|(text, _)| text.eq_ignore_ascii_case(word))
            .map(|&(_, kw)| kw)
    }

    /// Upper-case spelling.
    pub fn as_str(self) -> &'static str {
        KEYWORDS
            .iter()
            .find(|&&(_, kw)| kw == self)
            .map(|&(text, _)| text)
            .unwrap_or("?")
    }

    /// Reserved keywords can never be used as a bare (unquoted) name.
    ///
    /// Everything else falls back to an identifier in name position, the way
    /// SQLite's `%fallback ID` list works (`key`, `action`, `temp`, ...).
    pub fn is_reserved(self) -> bool {
        matches!(
            self,
            Keyword::As
                | Keyword::Autoincrement
                | Keyword::Check
                | Keyword::Collate
                | Keyword::Constraint
                | Keyword::Create
                | Keyword::Default
                | Keyword::Deferrable
                | Keyword::Delete
                | Keyword::Exists
                | Keyword::Foreign
                | Keyword::Index
                | Keyword::Not
                | Keyword::Null
                | Keyword::On
                | Keyword::Primary
                | Keyword::References
                | Keyword::Select
                | Keyword::Set
                | Keyword::Table
                | Keyword::Unique
                | Keyword::Update
        )
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

/// What a token is. Raw text is always recovered through the token's span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Keyword(Keyword),
    /// Bare identifier; its value is the raw text.
    Ident,
    /// `"x"`, `` `x` `` or `[x]` with delimiters stripped and doubled quotes
    /// collapsed.
    QuotedIdent(String),
    /// `'x'` with `''` collapsed. Also accepted as a name where SQLite does.
    StringLiteral(String),
    NumericLiteral,
    BlobLiteral,

    // ---- Punctuation ----
    LeftParen,
    RightParen,
    Comma,
    Semicolon,
    Dot,

    /// Any operator (`+`, `-`, `||`, `<=`, ...). Only meaningful inside
    /// verbatim expressions, plus the sign of a signed number.
    Operator,

    Eof,
}

/// A single token together with its byte range in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn is_keyword(&self, kw: Keyword) -> bool {
        self.kind == TokenKind::Keyword(kw)
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }
}

// ---------------------------------------------------------------------------
// Tokenizer
// ---------------------------------------------------------------------------

/// Forward-only scanner over a statement.
///
/// Call [`Tokenizer::next_token`] until a token of kind [`TokenKind::Eof`]
/// comes back; further calls keep returning `Eof`.
pub struct Tokenizer<'a> {
    input: &'a str,
    /// Byte offset of the next unconsumed character.
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Tokenizer { input, pos: 0 }
    }

    pub fn input(&self) -> &'a str {
        self.input
    }

    // -- helpers ----------------------------------------------------------

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.as_bytes().get(self.pos + offset).copied()
    }

    fn advance_by(&mut self, n: usize) {
        self.pos = (self.pos + n).min(self.input.len());
    }

    fn advance_while(&mut self, pred: impl Fn(u8) -> bool) {
        while let Some(b) = self.peek() {
            if !pred(b) {
                break;
            }
            self.pos += 1;
        }
    }

    fn token(&self, kind: TokenKind, start: usize) -> Token {
        Token {
            kind,
            span: Span::new(start, self.pos),
        }
    }

    fn error_at<T>(&self, offset: usize, msg: impl Into<String>) -> Result<T> {
        let end = self.pos.max(offset);
        Err(ParseError::syntax(offset, msg).with_token(self.input, Span::new(offset, end)))
    }

    // -- whitespace & comments -------------------------------------------

    /// Skip whitespace, `-- line` comments and `/* block */` comments.
    ///
    /// An unterminated block comment runs to the end of input, as in SQLite.
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            self.advance_while(|b| b.is_ascii_whitespace());

            if self.peek() == Some(b'-') && self.peek_at(1) == Some(b'-') {
                self.advance_by(2);
                self.advance_while(|b| b != b'\n');
                continue;
            }

            if self.peek() == Some(b'/') && self.peek_at(1) == Some(b'*') {
                self.advance_by(2);
                match self.input[self.pos..].find("*/") {
                    Some(idx) => self.advance_by(idx + 2),
                    None => self.pos = self.input.len(),
                }
                continue;
            }

            return;
        }
    }

    // -- number literals --------------------------------------------------

    /// Integer, real (with optional exponent) or hex literal.
    fn read_number(&mut self) -> Result<Token> {
        let start = self.pos;

        if self.peek() == Some(b'0') && matches!(self.peek_at(1), Some(b'x' | b'X')) {
            self.advance_by(2);
            let hex_start = self.pos;
            self.advance_while(|b| b.is_ascii_hexdigit());
            if self.pos == hex_start {
                return self.error_at(start, "expected hex digits after 0x");
            }
        } else {
            self.advance_while(|b| b.is_ascii_digit());
            if self.peek() == Some(b'.') {
                self.advance_by(1);
                self.advance_while(|b| b.is_ascii_digit());
            }
            if matches!(self.peek(), Some(b'e' | b'E')) {
                self.advance_by(1);
                if matches!(self.peek(), Some(b'+' | b'-')) {
                    self.advance_by(1);
                }
                let exp_start = self.pos;
                self.advance_while(|b| b.is_ascii_digit());
                if self.pos == exp_start {
                    return self.error_at(start, "expected digits in exponent");
                }
            }
        }

        // `12abc` is one malformed token, not a number followed by a name.
        if self.peek().is_some_and(is_ident_byte) {
            self.advance_while(is_ident_byte);
            return self.error_at(start, "unrecognized token");
        }

        Ok(self.token(TokenKind::NumericLiteral, start))
    }

    // -- quoted forms -----------------------------------------------------

    /// Scan from an opening delimiter to its matching `close`, returning the
    /// inner span. When `doubled_escape` is set, two consecutive `close`
    /// bytes stand for one literal delimiter.
    fn scan_delimited(&mut self, close: u8, doubled_escape: bool, what: &str) -> Result<Span> {
        let start = self.pos;
        self.advance_by(1);
        let inner_start = self.pos;
        loop {
            match self.peek() {
                None => return self.error_at(start, format!("unterminated {what}")),
                Some(b) if b == close => {
                    if doubled_escape && self.peek_at(1) == Some(close) {
                        self.advance_by(2);
                        continue;
                    }
                    let inner = Span::new(inner_start, self.pos);
                    self.advance_by(1);
                    return Ok(inner);
                }
                Some(_) => self.advance_by(1),
            }
        }
    }

    fn read_quoted(&mut self) -> Result<Token> {
        let start = self.pos;
        let (close, doubled, what) = match self.peek() {
            Some(b'\'') => (b'\'', true, "string literal"),
            Some(b'"') => (b'"', true, "quoted identifier"),
            Some(b'`') => (b'`', true, "quoted identifier"),
            _ => (b']', false, "bracketed identifier"),
        };
        let inner = self.scan_delimited(close, doubled, what)?;
        let value = unquote(inner.slice(self.input), close, doubled, start)?;
        let kind = if close == b'\'' {
            TokenKind::StringLiteral(value)
        } else {
            TokenKind::QuotedIdent(value)
        };
        Ok(self.token(kind, start))
    }

    /// `X'<hex pairs>'`; the leading `X` has been peeked but not consumed.
    fn read_blob_literal(&mut self) -> Result<Token> {
        let start = self.pos;
        self.advance_by(1);
        let inner = self.scan_delimited(b'\'', false, "blob literal")?;
        let hex = inner.slice(self.input);
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) || hex.len() % 2 != 0 {
            return self.error_at(start, "malformed blob literal");
        }
        Ok(self.token(TokenKind::BlobLiteral, start))
    }

    // -- identifiers / keywords ------------------------------------------

    fn read_word(&mut self) -> Token {
        let start = self.pos;
        self.advance_while(is_ident_byte);
        let word = &self.input[start..self.pos];
        let kind = Keyword::lookup(word).map_or(TokenKind::Ident, TokenKind::Keyword);
        self.token(kind, start)
    }

    fn read_operator(&mut self) -> Result<Token> {
        let start = self.pos;
        let rest = &self.input.as_bytes()[self.pos..];
        let len = match rest {
            [b'-', b'>', b'>', ..] => 3,
            [b'|', b'|', ..]
            | [b'<', b'=' | b'>' | b'<', ..]
            | [b'>', b'=' | b'>', ..]
            | [b'=', b'=', ..]
            | [b'!', b'=', ..]
            | [b'-', b'>', ..] => 2,
            [b'!', ..] => {
                self.advance_by(1);
                return self.error_at(start, "expected '=' after '!'");
            }
            [b'+' | b'-' | b'*' | b'/' | b'%' | b'&' | b'|' | b'~' | b'<' | b'>' | b'='
            | b'?' | b':' | b'@' | b'$' | b'#' | b'^', ..] => 1,
            _ => {
                let ch_len = self.input[start..].chars().next().map_or(1, char::len_utf8);
                self.advance_by(ch_len);
                return self.error_at(start, "unrecognized token");
            }
        };
        self.advance_by(len);
        Ok(self.token(TokenKind::Operator, start))
    }

    // -- main entry point -------------------------------------------------

    /// Return the next token, or a token of kind [`TokenKind::Eof`] whose
    /// span is empty and sits at the end of the input.
    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace_and_comments();
        let start = self.pos;

        let b = match self.peek() {
            None => return Ok(self.token(TokenKind::Eof, start)),
            Some(b) => b,
        };

        let single = |kind: TokenKind, this: &mut Self| -> Result<Token> {
            this.advance_by(1);
            Ok(this.token(kind, start))
        };

        match b {
            b'\'' | b'"' | b'`' | b'[' => self.read_quoted(),
            b'x' | b'X' if self.peek_at(1) == Some(b'\'') => self.read_blob_literal(),
            b'0'..=b'9' => self.read_number(),
            b'.' if matches!(self.peek_at(1), Some(b'0'..=b'9')) => self.read_number(),
            b if is_ident_start(b) => Ok(self.read_word()),
            b'(' => single(TokenKind::LeftParen, self),
            b')' => single(TokenKind::RightParen, self),
            b',' => single(TokenKind::Comma, self),
            b';' => single(TokenKind::Semicolon, self),
            b'.' => single(TokenKind::Dot, self),
            _ => self.read_operator(),
        }
    }
}

// ---------------------------------------------------------------------------
// Character classes & unquoting
// ---------------------------------------------------------------------------

/// Bytes >= 0x80 belong to identifiers, so any non-ASCII UTF-8 sequence is
/// consumed whole.
fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

fn is_ident_byte(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit() || b == b'$'
}

/// Copy `inner` into an owned string, collapsing doubled delimiters.
fn unquote(inner: &str, close: u8, doubled: bool, offset: usize) -> Result<String> {
    let mut value = String::new();
    value.try_reserve_exact(inner.len()).map_err(|_| {
        ParseError::out_of_memory(offset, "unable to allocate identifier text")
    })?;
    if doubled {
        let quote = close as char;
        let mut chars = inner.chars().peekable();
        while let Some(c) = chars.next() {
            value.push(c);
            if c == quote && chars.peek() == Some(&quote) {
                chars.next();
            }
        }
    } else {
        value.push_str(inner);
    }
    Ok(value)
}

/// Tokenize the full input (not including the final `Eof`).
pub fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokenizer = Tokenizer::new(input);
    let mut tokens = Vec::new();
    loop {
        let tok = tokenizer.next_token()?;
        if tok.is_eof() {
            break;
        }
        tokens.push(tok);
    }
    Ok(tokens)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .expect("tokenize failed")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn tok1(input: &str) -> Token {
        let tokens = tokenize(input).expect("tokenize failed");
        assert_eq!(tokens.len(), 1, "expected 1 token, got {:?}", tokens);
        tokens.into_iter().next().unwrap()
    }

    // ----------------------------------------------------------------
    // Keywords & identifiers
    // ----------------------------------------------------------------

    #[test]
    fn keywords_case_insensitive() {
        assert!(tok1("CREATE").is_keyword(Keyword::Create));
        assert!(tok1("create").is_keyword(Keyword::Create));
        assert!(tok1("CrEaTe").is_keyword(Keyword::Create));
    }

    #[test]
    fn keyword_table_round_trips() {
        for &(text, kw) in KEYWORDS {
            assert_eq!(Keyword::lookup(text), Some(kw));
            assert_eq!(kw.as_str(), text);
            assert!(text.len() <= MAX_KEYWORD_LEN);
        }
    }

    #[test]
    fn rowid_and_strict_are_identifiers() {
        assert_eq!(tok1("rowid").kind, TokenKind::Ident);
        assert_eq!(tok1("STRICT").kind, TokenKind::Ident);
    }

    #[test]
    fn always_is_an_identifier() {
        assert_eq!(tok1("always").kind, TokenKind::Ident);
        assert_eq!(Keyword::lookup("ALWAYS"), None);
    }

    #[test]
    fn bare_identifier_keeps_span() {
        let input = "  users_2 ";
        let t = tok1(input);
        assert_eq!(t.kind, TokenKind::Ident);
        assert_eq!(t.span, Span::new(2, 9));
        assert_eq!(t.span.slice(input), "users_2");
    }

    #[test]
    fn non_ascii_identifier() {
        let t = tok1("größe");
        assert_eq!(t.kind, TokenKind::Ident);
        assert_eq!(t.span.len(), "größe".len());
    }

    #[test]
    fn quoted_identifier_styles() {
        assert_eq!(tok1("\"t\"").kind, TokenKind::QuotedIdent("t".into()));
        assert_eq!(tok1("`t`").kind, TokenKind::QuotedIdent("t".into()));
        assert_eq!(tok1("[t]").kind, TokenKind::QuotedIdent("t".into()));
        assert_eq!(tok1("'t'").kind, TokenKind::StringLiteral("t".into()));
    }

    #[test]
    fn quoted_keyword_is_not_a_keyword() {
        assert_eq!(tok1("\"primary\"").kind, TokenKind::QuotedIdent("primary".into()));
    }

    #[test]
    fn doubled_quotes_collapse() {
        assert_eq!(tok1("\"a\"\"b\"").kind, TokenKind::QuotedIdent("a\"b".into()));
        assert_eq!(tok1("`a``b`").kind, TokenKind::QuotedIdent("a`b".into()));
        assert_eq!(tok1("'it''s'").kind, TokenKind::StringLiteral("it's".into()));
        assert_eq!(tok1("[a\"b]").kind, TokenKind::QuotedIdent("a\"b".into()));
    }

    #[test]
    fn unterminated_quotes_report_opening_offset() {
        for input in ["ab 'oops", "ab \"oops", "ab `oops", "ab [oops"] {
            let err = tokenize(input).unwrap_err();
            assert_eq!(err.kind, ErrorKind::Syntax, "{input}");
            assert_eq!(err.offset, 3, "{input}");
        }
    }

    // ----------------------------------------------------------------
    // Literals
    // ----------------------------------------------------------------

    #[test]
    fn numeric_literal_forms() {
        for input in ["42", "3.14", ".5", "1e10", "2.5E-3", "0x1F", "7."] {
            let t = tok1(input);
            assert_eq!(t.kind, TokenKind::NumericLiteral, "{input}");
            assert_eq!(t.span.slice(input), input);
        }
    }

    #[test]
    fn malformed_numbers() {
        assert!(tokenize("0x").is_err());
        assert!(tokenize("1e").is_err());
        assert!(tokenize("12abc").is_err());
    }

    #[test]
    fn blob_literal() {
        assert_eq!(tok1("X'CAFE'").kind, TokenKind::BlobLiteral);
        assert_eq!(tok1("x''").kind, TokenKind::BlobLiteral);
        assert!(tokenize("X'ABC'").is_err());
        assert!(tokenize("X'ZZ'").is_err());
        assert!(tokenize("X'AB").is_err());
    }

    // ----------------------------------------------------------------
    // Punctuation, operators, comments
    // ----------------------------------------------------------------

    #[test]
    fn punctuation() {
        assert_eq!(
            kinds("( ) , ; ."),
            vec![
                TokenKind::LeftParen,
                TokenKind::RightParen,
                TokenKind::Comma,
                TokenKind::Semicolon,
                TokenKind::Dot,
            ]
        );
    }

    #[test]
    fn multi_char_operators_are_single_tokens() {
        let input = "a<=b||c<>d->>e";
        let tokens = tokenize(input).unwrap();
        let ops: Vec<&str> = tokens
            .iter()
            .filter(|t| t.kind == TokenKind::Operator)
            .map(|t| t.span.slice(input))
            .collect();
        assert_eq!(ops, vec!["<=", "||", "<>", "->>"]);
    }

    #[test]
    fn lone_bang_is_an_error() {
        assert!(tokenize("a ! b").is_err());
    }

    #[test]
    fn unknown_character_is_an_error() {
        let err = tokenize("a { b").unwrap_err();
        assert_eq!(err.offset, 2);
        assert_eq!(err.token.as_deref(), Some("{"));
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("-- leading\nCREATE /* inline */ TABLE -- trailing"),
            vec![
                TokenKind::Keyword(Keyword::Create),
                TokenKind::Keyword(Keyword::Table),
            ]
        );
    }

    #[test]
    fn unterminated_block_comment_runs_to_end() {
        assert_eq!(kinds("CREATE /* never closed"), vec![TokenKind::Keyword(Keyword::Create)]);
    }

    #[test]
    fn eof_is_sticky_and_positioned_at_end() {
        let mut tz = Tokenizer::new("a ");
        assert_eq!(tz.next_token().unwrap().kind, TokenKind::Ident);
        for _ in 0..2 {
            let eof = tz.next_token().unwrap();
            assert!(eof.is_eof());
            assert_eq!(eof.span, Span::empty(2));
        }
    }

    #[test]
    fn reserved_keywords() {
        assert!(Keyword::Primary.is_reserved());
        assert!(Keyword::Constraint.is_reserved());
        assert!(!Keyword::Key.is_reserved());
        assert!(!Keyword::Action.is_reserved());
        assert!(!Keyword::Temp.is_reserved());
    }
}
