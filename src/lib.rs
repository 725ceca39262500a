//! Parser for SQLite `CREATE TABLE` statements.
//!
//! [`parse`] turns the text of one statement into a [`Table`]: columns with
//! their constraints, table-level constraints and foreign keys, all in
//! declaration order. CHECK and DEFAULT bodies are kept as verbatim source
//! text rather than parsed into expressions.
//!
//! The returned model owns all of its strings; it does not borrow from the
//! input. Parsing holds no global state, so independent statements can be
//! parsed concurrently from any number of threads.
//!
//! ```
//! let table = sql3parse::parse("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT NOT NULL)")?;
//! assert_eq!(table.name, "t");
//! assert!(table.columns[0].primary_key);
//! assert!(table.columns[1].not_null);
//! # Ok::<(), sql3parse::ParseError>(())
//! ```

pub mod ast;
pub mod config;
pub mod error;
pub mod parser;
pub mod span;
pub mod tokenizer;

pub use ast::{
    Column, ConflictClause, ForeignKey, ForeignKeyAction, ForeignKeyDeferrable, IndexedColumn,
    OrderClause, Table, TableConstraint, TableConstraintKind, TableConstraintType,
};
pub use config::ParseOptions;
pub use error::{ErrorKind, InvalidDiscriminant, ParseError, Result};
pub use parser::{parse, parse_with_options, Parser};
