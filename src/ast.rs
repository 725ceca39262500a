//! Schema model produced by parsing a CREATE TABLE statement.
//!
//! Every value here owns its text: identifiers are stored unquoted, while
//! types, CHECK and DEFAULT bodies are copied verbatim from the input.

use std::fmt;

use serde::Serialize;

use crate::error::InvalidDiscriminant;
use crate::tokenizer::Keyword;

/// Implements `TryFrom<u8>` in declaration order, starting at zero.
///
/// The numbering matches the C `sql3parse_table` enums so values coming from
/// that encoding can be validated at the boundary.
macro_rules! impl_try_from_u8 {
    ($ty:ident { $($variant:ident),+ $(,)? }) => {
        impl TryFrom<u8> for $ty {
            type Error = InvalidDiscriminant;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                const VARIANTS: &[$ty] = &[$($ty::$variant),+];
                VARIANTS.get(usize::from(value)).copied().ok_or(InvalidDiscriminant {
                    type_name: stringify!($ty),
                    value,
                })
            }
        }

        impl From<$ty> for u8 {
            fn from(value: $ty) -> u8 {
                value as u8
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// `ON CONFLICT` resolution attached to a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[repr(u8)]
pub enum ConflictClause {
    #[default]
    None,
    Rollback,
    Abort,
    Fail,
    Ignore,
    Replace,
}

impl_try_from_u8!(ConflictClause { None, Rollback, Abort, Fail, Ignore, Replace });

impl ConflictClause {
    pub fn is_none(self) -> bool {
        self == ConflictClause::None
    }
}

impl fmt::Display for ConflictClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictClause::None => Ok(()),
            ConflictClause::Rollback => write!(f, "ON CONFLICT ROLLBACK"),
            ConflictClause::Abort => write!(f, "ON CONFLICT ABORT"),
            ConflictClause::Fail => write!(f, "ON CONFLICT FAIL"),
            ConflictClause::Ignore => write!(f, "ON CONFLICT IGNORE"),
            ConflictClause::Replace => write!(f, "ON CONFLICT REPLACE"),
        }
    }
}

/// Sort direction on a primary key or indexed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[repr(u8)]
pub enum OrderClause {
    #[default]
    None,
    Asc,
    Desc,
}

impl_try_from_u8!(OrderClause { None, Asc, Desc });

impl fmt::Display for OrderClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderClause::None => Ok(()),
            OrderClause::Asc => write!(f, "ASC"),
            OrderClause::Desc => write!(f, "DESC"),
        }
    }
}

/// Action taken by a foreign key `ON DELETE` / `ON UPDATE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[repr(u8)]
pub enum ForeignKeyAction {
    #[default]
    None,
    SetNull,
    SetDefault,
    Cascade,
    Restrict,
    NoAction,
}

impl_try_from_u8!(ForeignKeyAction { None, SetNull, SetDefault, Cascade, Restrict, NoAction });

impl fmt::Display for ForeignKeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForeignKeyAction::None => Ok(()),
            ForeignKeyAction::SetNull => write!(f, "SET NULL"),
            ForeignKeyAction::SetDefault => write!(f, "SET DEFAULT"),
            ForeignKeyAction::Cascade => write!(f, "CASCADE"),
            ForeignKeyAction::Restrict => write!(f, "RESTRICT"),
            ForeignKeyAction::NoAction => write!(f, "NO ACTION"),
        }
    }
}

/// `[NOT] DEFERRABLE [INITIALLY DEFERRED|IMMEDIATE]` on a foreign key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[repr(u8)]
pub enum ForeignKeyDeferrable {
    #[default]
    None,
    Deferrable,
    DeferrableInitiallyDeferred,
    DeferrableInitiallyImmediate,
    NotDeferrable,
    NotDeferrableInitiallyDeferred,
    NotDeferrableInitiallyImmediate,
}

impl_try_from_u8!(ForeignKeyDeferrable {
    None,
    Deferrable,
    DeferrableInitiallyDeferred,
    DeferrableInitiallyImmediate,
    NotDeferrable,
    NotDeferrableInitiallyDeferred,
    NotDeferrableInitiallyImmediate,
});

/// Initial enforcement mode named by `INITIALLY ...`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialMode {
    Unspecified,
    Deferred,
    Immediate,
}

impl ForeignKeyDeferrable {
    /// Combine the `NOT` prefix and the `INITIALLY` mode of a deferrable clause.
    pub fn new(negated: bool, initially: InitialMode) -> Self {
        match (negated, initially) {
            (false, InitialMode::Unspecified) => ForeignKeyDeferrable::Deferrable,
            (false, InitialMode::Deferred) => ForeignKeyDeferrable::DeferrableInitiallyDeferred,
            (false, InitialMode::Immediate) => ForeignKeyDeferrable::DeferrableInitiallyImmediate,
            (true, InitialMode::Unspecified) => ForeignKeyDeferrable::NotDeferrable,
            (true, InitialMode::Deferred) => ForeignKeyDeferrable::NotDeferrableInitiallyDeferred,
            (true, InitialMode::Immediate) => ForeignKeyDeferrable::NotDeferrableInitiallyImmediate,
        }
    }
}

impl fmt::Display for ForeignKeyDeferrable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ForeignKeyDeferrable::None => "",
            ForeignKeyDeferrable::Deferrable => "DEFERRABLE",
            ForeignKeyDeferrable::DeferrableInitiallyDeferred => "DEFERRABLE INITIALLY DEFERRED",
            ForeignKeyDeferrable::DeferrableInitiallyImmediate => "DEFERRABLE INITIALLY IMMEDIATE",
            ForeignKeyDeferrable::NotDeferrable => "NOT DEFERRABLE",
            ForeignKeyDeferrable::NotDeferrableInitiallyDeferred => {
                "NOT DEFERRABLE INITIALLY DEFERRED"
            }
            ForeignKeyDeferrable::NotDeferrableInitiallyImmediate => {
                "NOT DEFERRABLE INITIALLY IMMEDIATE"
            }
        };
        f.write_str(text)
    }
}

/// Discriminant of a [`TableConstraintKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum TableConstraintType {
    PrimaryKey,
    Unique,
    Check,
    ForeignKey,
}

impl_try_from_u8!(TableConstraintType { PrimaryKey, Unique, Check, ForeignKey });

// ---------------------------------------------------------------------------
// Structures
// ---------------------------------------------------------------------------

/// A parsed `CREATE TABLE` statement.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Table {
    pub schema: Option<String>,
    pub name: String,
    pub temporary: bool,
    pub if_not_exists: bool,
    pub without_rowid: bool,
    pub strict: bool,
    /// Columns in declaration order.
    pub columns: Vec<Column>,
    /// Table constraints in declaration order.
    pub table_constraints: Vec<TableConstraint>,
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Qualified name, `schema.name` when a schema was given.
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(schema) => format!("{schema}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

/// One column definition with its column-level constraints folded in.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Column {
    pub name: String,
    /// Declared type text, e.g. `INTEGER` or `DOUBLE PRECISION`.
    #[serde(rename = "type")]
    pub type_name: Option<String>,
    /// Text between the parentheses of a type such as `DECIMAL(10,2)`.
    pub length: Option<String>,
    pub constraint_name: Option<String>,
    pub primary_key: bool,
    pub autoincrement: bool,
    pub not_null: bool,
    pub unique: bool,
    pub primary_key_order: OrderClause,
    pub primary_key_conflict: ConflictClause,
    pub not_null_conflict: ConflictClause,
    pub unique_conflict: ConflictClause,
    pub check: Option<String>,
    pub default: Option<String>,
    pub collate_name: Option<String>,
    pub foreign_key: Option<ForeignKey>,
}

impl Column {
    /// Whether any column constraint with a visible effect is set.
    pub fn has_constraint(&self) -> bool {
        self.primary_key
            || self.not_null
            || self.unique
            || self.check.is_some()
            || self.default.is_some()
            || self.collate_name.is_some()
            || self.foreign_key.is_some()
    }
}

/// Column reference inside a table-level PRIMARY KEY or UNIQUE.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct IndexedColumn {
    pub name: String,
    pub collate: Option<String>,
    pub order: OrderClause,
}

/// Target and options of a `REFERENCES` clause.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ForeignKey {
    pub table: String,
    /// Referenced columns; empty means the referenced table's primary key.
    pub columns: Vec<String>,
    pub on_delete: ForeignKeyAction,
    pub on_update: ForeignKeyAction,
    #[serde(rename = "match")]
    pub match_name: Option<String>,
    pub deferrable: ForeignKeyDeferrable,
}

/// A table-level constraint, optionally named with `CONSTRAINT name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableConstraint {
    pub name: Option<String>,
    pub kind: TableConstraintKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TableConstraintKind {
    PrimaryKey {
        columns: Vec<IndexedColumn>,
        conflict: ConflictClause,
    },
    Unique {
        columns: Vec<IndexedColumn>,
        conflict: ConflictClause,
    },
    Check(String),
    ForeignKey {
        /// Local columns.
        columns: Vec<String>,
        /// Referenced table and columns.
        foreign_key: ForeignKey,
    },
}

impl TableConstraint {
    pub fn constraint_type(&self) -> TableConstraintType {
        match self.kind {
            TableConstraintKind::PrimaryKey { .. } => TableConstraintType::PrimaryKey,
            TableConstraintKind::Unique { .. } => TableConstraintType::Unique,
            TableConstraintKind::Check(_) => TableConstraintType::Check,
            TableConstraintKind::ForeignKey { .. } => TableConstraintType::ForeignKey,
        }
    }

    /// Indexed columns of a PRIMARY KEY or UNIQUE constraint, empty otherwise.
    pub fn indexed_columns(&self) -> &[IndexedColumn] {
        match &self.kind {
            TableConstraintKind::PrimaryKey { columns, .. }
            | TableConstraintKind::Unique { columns, .. } => columns,
            _ => &[],
        }
    }

    pub fn conflict_clause(&self) -> ConflictClause {
        match self.kind {
            TableConstraintKind::PrimaryKey { conflict, .. }
            | TableConstraintKind::Unique { conflict, .. } => conflict,
            _ => ConflictClause::None,
        }
    }

    pub fn check(&self) -> Option<&str> {
        match &self.kind {
            TableConstraintKind::Check(expr) => Some(expr),
            _ => None,
        }
    }

    /// Local columns of a FOREIGN KEY constraint, empty otherwise.
    pub fn foreign_key_columns(&self) -> &[String] {
        match &self.kind {
            TableConstraintKind::ForeignKey { columns, .. } => columns,
            _ => &[],
        }
    }

    pub fn foreign_key(&self) -> Option<&ForeignKey> {
        match &self.kind {
            TableConstraintKind::ForeignKey { foreign_key, .. } => Some(foreign_key),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Identifier as it must be written to parse back to `name`.
struct Ident<'a>(&'a str);

impl fmt::Display for Ident<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.0;
        let bare = name
            .bytes()
            .next()
            .is_some_and(|b| b.is_ascii_alphabetic() || b == b'_')
            && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
            && Keyword::lookup(name).is_none();
        if bare {
            f.write_str(name)
        } else {
            write!(f, "\"{}\"", name.replace('"', "\"\""))
        }
    }
}

fn write_list<T>(
    f: &mut fmt::Formatter<'_>,
    items: &[T],
    mut item: impl FnMut(&mut fmt::Formatter<'_>, &T) -> fmt::Result,
) -> fmt::Result {
    for (i, it) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        item(f, it)?;
    }
    Ok(())
}

impl fmt::Display for IndexedColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Ident(&self.name))?;
        if let Some(collate) = &self.collate {
            write!(f, " COLLATE {}", Ident(collate))?;
        }
        if self.order != OrderClause::None {
            write!(f, " {}", self.order)?;
        }
        Ok(())
    }
}

impl fmt::Display for ForeignKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "REFERENCES {}", Ident(&self.table))?;
        if !self.columns.is_empty() {
            f.write_str("(")?;
            write_list(f, &self.columns, |f, c| write!(f, "{}", Ident(c)))?;
            f.write_str(")")?;
        }
        if self.on_delete != ForeignKeyAction::None {
            write!(f, " ON DELETE {}", self.on_delete)?;
        }
        if self.on_update != ForeignKeyAction::None {
            write!(f, " ON UPDATE {}", self.on_update)?;
        }
        if let Some(name) = &self.match_name {
            write!(f, " MATCH {}", Ident(name))?;
        }
        if self.deferrable != ForeignKeyDeferrable::None {
            write!(f, " {}", self.deferrable)?;
        }
        Ok(())
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Ident(&self.name))?;
        if let Some(ty) = &self.type_name {
            write!(f, " {ty}")?;
            if let Some(len) = &self.length {
                write!(f, "({len})")?;
            }
        }
        if let Some(name) = &self.constraint_name {
            write!(f, " CONSTRAINT {}", Ident(name))?;
        }
        if self.primary_key {
            f.write_str(" PRIMARY KEY")?;
            if self.primary_key_order != OrderClause::None {
                write!(f, " {}", self.primary_key_order)?;
            }
            if !self.primary_key_conflict.is_none() {
                write!(f, " {}", self.primary_key_conflict)?;
            }
            if self.autoincrement {
                f.write_str(" AUTOINCREMENT")?;
            }
        }
        if self.not_null {
            f.write_str(" NOT NULL")?;
            if !self.not_null_conflict.is_none() {
                write!(f, " {}", self.not_null_conflict)?;
            }
        }
        if self.unique {
            f.write_str(" UNIQUE")?;
            if !self.unique_conflict.is_none() {
                write!(f, " {}", self.unique_conflict)?;
            }
        }
        if let Some(check) = &self.check {
            write!(f, " CHECK ({check})")?;
        }
        if let Some(default) = &self.default {
            write!(f, " DEFAULT ({default})")?;
        }
        if let Some(collate) = &self.collate_name {
            write!(f, " COLLATE {}", Ident(collate))?;
        }
        if let Some(fk) = &self.foreign_key {
            write!(f, " {fk}")?;
        }
        // A name must be followed by a constraint; bare NULL is the neutral one.
        if self.constraint_name.is_some() && !self.has_constraint() {
            f.write_str(" NULL")?;
        }
        Ok(())
    }
}

impl fmt::Display for TableConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            write!(f, "CONSTRAINT {} ", Ident(name))?;
        }
        match &self.kind {
            TableConstraintKind::PrimaryKey { columns, conflict }
            | TableConstraintKind::Unique { columns, conflict } => {
                let head = if self.constraint_type() == TableConstraintType::PrimaryKey {
                    "PRIMARY KEY"
                } else {
                    "UNIQUE"
                };
                write!(f, "{head} (")?;
                write_list(f, columns, |f, c| write!(f, "{c}"))?;
                f.write_str(")")?;
                if !conflict.is_none() {
                    write!(f, " {conflict}")?;
                }
                Ok(())
            }
            TableConstraintKind::Check(expr) => write!(f, "CHECK ({expr})"),
            TableConstraintKind::ForeignKey {
                columns,
                foreign_key,
            } => {
                f.write_str("FOREIGN KEY (")?;
                write_list(f, columns, |f, c| write!(f, "{}", Ident(c)))?;
                write!(f, ") {foreign_key}")
            }
        }
    }
}

/// Normalized single-line `CREATE TABLE` text that parses back to `self`.
impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CREATE ")?;
        if self.temporary {
            f.write_str("TEMP ")?;
        }
        f.write_str("TABLE ")?;
        if self.if_not_exists {
            f.write_str("IF NOT EXISTS ")?;
        }
        if let Some(schema) = &self.schema {
            write!(f, "{}.", Ident(schema))?;
        }
        write!(f, "{} (", Ident(&self.name))?;
        write_list(f, &self.columns, |f, c| write!(f, "{c}"))?;
        for constraint in &self.table_constraints {
            write!(f, ", {constraint}")?;
        }
        f.write_str(")")?;

        let mut options = Vec::new();
        if self.without_rowid {
            options.push("WITHOUT ROWID");
        }
        if self.strict {
            options.push("STRICT");
        }
        if !options.is_empty() {
            write!(f, " {}", options.join(", "))?;
        }
        Ok(())
    }
}
