//! Tests for statement templates

use colwrite_config::{WriteOptions, WriteValue};

use super::*;
use crate::schema::{ColumnDef, ColumnSelector, CqlType, TableSchema, TableTarget};

// =============================================================================
// Helpers
// =============================================================================

fn people() -> TableTarget {
    let schema = TableSchema::new(
        "ks",
        "t",
        vec![
            ColumnDef::partition_key("id", CqlType::Int),
            ColumnDef::regular("name", CqlType::Text),
            ColumnDef::regular("age", CqlType::Int),
        ],
    );
    TableTarget::select(&schema, &ColumnSelector::All).unwrap()
}

fn counters() -> TableTarget {
    let schema = TableSchema::new(
        "ks",
        "t",
        vec![
            ColumnDef::partition_key("id", CqlType::Int),
            ColumnDef::regular("count", CqlType::Counter),
        ],
    );
    TableTarget::select(&schema, &ColumnSelector::All).unwrap()
}

fn variable_names(template: &StatementTemplate) -> Vec<&str> {
    template.variables().iter().map(|v| v.name.as_str()).collect()
}

// =============================================================================
// Insert form
// =============================================================================

#[test]
fn test_insert_template() {
    let template = StatementTemplate::build(&people(), &WriteOptions::default()).unwrap();
    assert_eq!(
        template.cql(),
        r#"INSERT INTO "ks"."t" ("id", "name", "age") VALUES (:id, :name, :age)"#
    );
    assert_eq!(template.kind(), StatementKind::Insert);
    assert_eq!(template.batch_type(), BatchType::Unlogged);
    assert_eq!(variable_names(&template), ["id", "name", "age"]);
}

#[test]
fn test_static_ttl() {
    let options = WriteOptions::default().with_ttl(WriteValue::Static(100));
    let template = StatementTemplate::build(&people(), &options).unwrap();
    assert!(template.cql().ends_with("VALUES (:id, :name, :age) USING TTL 100"));
    assert_eq!(template.variables().len(), 3);
}

#[test]
fn test_per_row_ttl() {
    let options = WriteOptions::default().with_ttl(WriteValue::PerRow("ttl".into()));
    let template = StatementTemplate::build(&people(), &options).unwrap();
    assert!(template.cql().ends_with(" USING TTL :ttl"));
    let ttl = template.variables().last().unwrap();
    assert_eq!(ttl.name, "ttl");
    assert_eq!(ttl.kind, VariableKind::Ttl);
    assert_eq!(ttl.cql_type, CqlType::Int);
}

#[test]
fn test_ttl_and_timestamp() {
    let options = WriteOptions::default()
        .with_ttl(WriteValue::Static(60))
        .with_timestamp(WriteValue::PerRow("written_at".into()));
    let template = StatementTemplate::build(&people(), &options).unwrap();
    assert!(template.cql().ends_with(" USING TTL 60 AND TIMESTAMP :written_at"));
    assert_eq!(variable_names(&template), ["id", "name", "age", "written_at"]);
    assert_eq!(template.variables()[3].kind, VariableKind::Timestamp);
}

#[test]
fn test_if_not_exists_precedes_using() {
    let options = WriteOptions::default()
        .with_if_not_exists(true)
        .with_timestamp(WriteValue::Static(5));
    let template = StatementTemplate::build(&people(), &options).unwrap();
    assert!(
        template
            .cql()
            .ends_with("VALUES (:id, :name, :age) IF NOT EXISTS USING TIMESTAMP 5")
    );
}

#[test]
fn test_case_sensitive_identifiers() {
    let schema = TableSchema::new(
        "Analytics",
        "PageViews",
        vec![
            ColumnDef::partition_key("userId", CqlType::Uuid),
            ColumnDef::regular("say \"hi\"", CqlType::Text),
        ],
    );
    let target = TableTarget::select(&schema, &ColumnSelector::All).unwrap();
    let template = StatementTemplate::build(&target, &WriteOptions::default()).unwrap();
    assert_eq!(
        template.cql(),
        r#"INSERT INTO "Analytics"."PageViews" ("userId", "say ""hi""") VALUES (:"userId", :"say ""hi""")"#
    );
}

#[test]
fn test_option_column_cannot_shadow_table_column() {
    let options = WriteOptions::default().with_ttl(WriteValue::PerRow("age".into()));
    let err = StatementTemplate::build(&people(), &options).unwrap_err();
    assert!(matches!(err, SchemaError::OptionColumnCollision { .. }));
}

// =============================================================================
// Counter form
// =============================================================================

#[test]
fn test_counter_template() {
    let template = StatementTemplate::build(&counters(), &WriteOptions::default()).unwrap();
    assert_eq!(
        template.cql(),
        r#"UPDATE "ks"."t" SET "count" = "count" + :count WHERE "id" = :id"#
    );
    assert_eq!(template.kind(), StatementKind::CounterUpdate);
    assert_eq!(template.batch_type(), BatchType::Counter);
    assert_eq!(variable_names(&template), ["count", "id"]);
}

#[test]
fn test_counter_template_with_plain_and_clustering_columns() {
    let schema = TableSchema::new(
        "ks",
        "stats",
        vec![
            ColumnDef::partition_key("site", CqlType::Text),
            ColumnDef::clustering("day", CqlType::Int),
            ColumnDef::regular("views", CqlType::Counter),
            ColumnDef::regular("clicks", CqlType::Counter),
        ],
    );
    let target = TableTarget::select(&schema, &ColumnSelector::All).unwrap();
    let template = StatementTemplate::build(&target, &WriteOptions::default()).unwrap();
    assert_eq!(
        template.cql(),
        r#"UPDATE "ks"."stats" SET "views" = "views" + :views, "clicks" = "clicks" + :clicks WHERE "site" = :site AND "day" = :day"#
    );
    assert_eq!(variable_names(&template), ["views", "clicks", "site", "day"]);
    assert_eq!(template.column_index("site"), Some(2));
}

#[test]
fn test_counter_form_selected_iff_counter_present() {
    let plain = StatementTemplate::build(&people(), &WriteOptions::default()).unwrap();
    let counted = StatementTemplate::build(&counters(), &WriteOptions::default()).unwrap();
    assert!(plain.cql().starts_with("INSERT"));
    assert!(!plain.cql().contains("UPDATE"));
    assert!(counted.cql().starts_with("UPDATE"));
    assert!(!counted.cql().contains("INSERT"));
}

#[test]
fn test_counter_rejects_write_options() {
    for options in [
        WriteOptions::default().with_ttl(WriteValue::Static(10)),
        WriteOptions::default().with_timestamp(WriteValue::PerRow("ts".into())),
        WriteOptions::default().with_if_not_exists(true),
    ] {
        let err = StatementTemplate::build(&counters(), &options).unwrap_err();
        assert!(matches!(err, SchemaError::CounterOption { .. }), "{options:?}");
    }
}

#[test]
fn test_quote() {
    assert_eq!(quote("plain"), "\"plain\"");
    assert_eq!(quote("Mixed"), "\"Mixed\"");
    assert_eq!(quote("a\"b"), "\"a\"\"b\"");
}
