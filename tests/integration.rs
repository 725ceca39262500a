/// Integration tests for the public parsing API.
/// These exercise whole statements end-to-end: the documented properties of
/// the model, error classification, rendering and concurrent use.
use pretty_assertions::assert_eq;
use sql3parse::{
    parse, parse_with_options, Column, ConflictClause, ErrorKind, ForeignKey, ForeignKeyAction,
    ForeignKeyDeferrable, IndexedColumn, OrderClause, ParseOptions, Table, TableConstraint,
    TableConstraintKind,
};

const SCHEMA: &str = r#"
-- Orders placed by customers.
CREATE TABLE IF NOT EXISTS main."order items" (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    order_id    INTEGER NOT NULL
                CONSTRAINT fk_order REFERENCES orders (id)
                    ON DELETE CASCADE
                    DEFERRABLE INITIALLY DEFERRED,
    sku         VARCHAR(32) NOT NULL COLLATE NOCASE,
    price       DECIMAL(10,2) DEFAULT 0.00 CHECK (price >= 0),
    created_at  TEXT DEFAULT (datetime('now')),
    [note]      TEXT,
    CONSTRAINT uq_line UNIQUE (order_id, sku COLLATE NOCASE DESC) ON CONFLICT REPLACE,
    CHECK (length(sku) > 0),
    FOREIGN KEY (sku) REFERENCES products (sku) ON UPDATE SET NULL MATCH FULL
) WITHOUT ROWID, STRICT;
"#;

#[test]
fn test_minimal_table() {
    let table = parse("CREATE TABLE t (a INTEGER)").unwrap();
    assert_eq!(
        table,
        Table {
            name: "t".into(),
            columns: vec![Column {
                name: "a".into(),
                type_name: Some("INTEGER".into()),
                ..Default::default()
            }],
            ..Default::default()
        }
    );
}

#[test]
fn test_full_schema() {
    let table = parse(SCHEMA).unwrap();

    assert_eq!(table.schema.as_deref(), Some("main"));
    assert_eq!(table.name, "order items");
    assert!(table.if_not_exists);
    assert!(!table.temporary);
    assert!(table.without_rowid);
    assert!(table.strict);

    let names: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "order_id", "sku", "price", "created_at", "note"]);

    let id = table.column("id").unwrap();
    assert!(id.primary_key && id.autoincrement);

    let order_id = table.column("order_id").unwrap();
    assert!(order_id.not_null);
    assert_eq!(order_id.constraint_name.as_deref(), Some("fk_order"));
    assert_eq!(
        order_id.foreign_key,
        Some(ForeignKey {
            table: "orders".into(),
            columns: vec!["id".into()],
            on_delete: ForeignKeyAction::Cascade,
            deferrable: ForeignKeyDeferrable::DeferrableInitiallyDeferred,
            ..Default::default()
        })
    );

    let sku = table.column("sku").unwrap();
    assert_eq!(sku.type_name.as_deref(), Some("VARCHAR"));
    assert_eq!(sku.length.as_deref(), Some("32"));
    assert_eq!(sku.collate_name.as_deref(), Some("NOCASE"));

    let price = table.column("price").unwrap();
    assert_eq!(price.length.as_deref(), Some("10,2"));
    assert_eq!(price.default.as_deref(), Some("0.00"));
    assert_eq!(price.check.as_deref(), Some("price >= 0"));

    let created = table.column("created_at").unwrap();
    assert_eq!(created.default.as_deref(), Some("datetime('now')"));

    assert_eq!(
        table.table_constraints,
        vec![
            TableConstraint {
                name: Some("uq_line".into()),
                kind: TableConstraintKind::Unique {
                    columns: vec![
                        IndexedColumn {
                            name: "order_id".into(),
                            ..Default::default()
                        },
                        IndexedColumn {
                            name: "sku".into(),
                            collate: Some("NOCASE".into()),
                            order: OrderClause::Desc,
                        },
                    ],
                    conflict: ConflictClause::Replace,
                },
            },
            TableConstraint {
                name: None,
                kind: TableConstraintKind::Check("length(sku) > 0".into()),
            },
            TableConstraint {
                name: None,
                kind: TableConstraintKind::ForeignKey {
                    columns: vec!["sku".into()],
                    foreign_key: ForeignKey {
                        table: "products".into(),
                        columns: vec!["sku".into()],
                        on_update: ForeignKeyAction::SetNull,
                        match_name: Some("FULL".into()),
                        ..Default::default()
                    },
                },
            },
        ]
    );
}

#[test]
fn test_identifier_quoting_styles() {
    for sql in [
        "CREATE TABLE \"t\" (a)",
        "CREATE TABLE `t` (a)",
        "CREATE TABLE [t] (a)",
    ] {
        assert_eq!(parse(sql).unwrap().name, "t", "{sql}");
    }
}

#[test]
fn test_parsing_is_idempotent() {
    assert_eq!(parse(SCHEMA).unwrap(), parse(SCHEMA).unwrap());
}

#[test]
fn test_display_parses_back_to_same_model() {
    for sql in [
        SCHEMA,
        "CREATE TABLE t (a TEXT CONSTRAINT c NULL)",
        "CREATE TABLE t (a CONSTRAINT c NULL ON CONFLICT IGNORE, b)",
        "CREATE TABLE t (a INT PRIMARY KEY) WITHOUT \"rowid\"",
    ] {
        let original = parse(sql).unwrap();
        let rendered = original.to_string();
        let reparsed = parse(&rendered).unwrap_or_else(|e| panic!("{rendered}\n{e}"));
        assert_eq!(original, reparsed, "{sql}");
    }
}

#[test]
fn test_display_of_simple_table() {
    let table = parse("create temp table t (a int not null, b text, primary key (a))").unwrap();
    assert_eq!(
        table.to_string(),
        "CREATE TEMP TABLE t (a int NOT NULL, b text, PRIMARY KEY (a))"
    );
}

#[test]
fn test_json_export() {
    let table = parse("CREATE TABLE t (a INT REFERENCES p ON DELETE SET NULL)").unwrap();
    let json = serde_json::to_value(&table).unwrap();
    assert_eq!(json["name"], "t");
    assert_eq!(json["schema"], serde_json::Value::Null);
    assert_eq!(json["columns"][0]["type"], "INT");
    assert_eq!(json["columns"][0]["foreign_key"]["on_delete"], "SetNull");
    assert_eq!(json["columns"][0]["foreign_key"]["match"], serde_json::Value::Null);
}

#[test]
fn test_error_kinds_and_offsets() {
    let err = parse("CREATE TABLE (x INT)").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Syntax);
    assert_eq!(err.offset, 13);

    let sql = "CREATE TABLE t (a CHECK (a > 1";
    let err = parse(sql).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Syntax);
    assert_eq!(err.offset, sql.len());

    let err = parse("CREATE TABLE t (a TEXT 'unterminated)").unwrap_err();
    assert_eq!(err.kind, ErrorKind::Syntax);
    assert_eq!(err.offset, 23);

    let err = parse("CREATE TABLE t (a); DROP TABLE t").unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnsupportedConstruct);

    let err = parse_with_options(
        "CREATE TABLE t (a, b)",
        &ParseOptions::default().with_max_columns(1),
    )
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::OutOfMemory);
    assert!(err.kind.is_retryable());
}

#[test]
fn test_error_display() {
    let err = parse("CREATE TABLE t (a INT PRIMARY)").unwrap_err();
    assert_eq!(
        err.to_string(),
        "syntax error at offset 29: expected KEY after PRIMARY near \")\""
    );
}

#[test]
fn test_concurrent_parses() {
    let handles: Vec<_> = (0..8)
        .map(|i| {
            std::thread::spawn(move || {
                let sql = format!("CREATE TABLE t{i} (c{i} INTEGER PRIMARY KEY)");
                parse(&sql).map(|t| (t.name, t.columns[0].name.clone()))
            })
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        let (table, column) = handle.join().unwrap().unwrap();
        assert_eq!(table, format!("t{i}"));
        assert_eq!(column, format!("c{i}"));
    }
}
