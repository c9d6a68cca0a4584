//! Schema-definition statements: keyspaces, types, tables, indexes.
//!
//! All identifiers arriving here are already wire-level (validated and
//! converted by the schema builder), so the renderers concatenate without
//! further checks.

use siren_commons::{
    to_identifier, ClientConfig, ReplicationStrategy, Statement, TableSchema, WithValue,
};

/// `CREATE KEYSPACE IF NOT EXISTS` with the configured replication
/// strategy and durable-writes flag.
pub fn create_keyspace(config: &ClientConfig) -> Statement {
    let replication = match &config.replication {
        ReplicationStrategy::Simple { replication_factor } => format!(
            "{{ 'class' : 'SimpleStrategy', 'replication_factor' : {replication_factor} }}"
        ),
        ReplicationStrategy::NetworkTopology { datacenters } => {
            let entries: Vec<String> = datacenters
                .iter()
                .map(|(dc, factor)| format!("'{dc}' : {factor}"))
                .collect();
            format!(
                "{{ 'class' : 'NetworkTopologyStrategy', {} }}",
                entries.join(", ")
            )
        }
    };
    Statement::simple(format!(
        "CREATE KEYSPACE IF NOT EXISTS {} WITH REPLICATION = {} AND DURABLE_WRITES = {};",
        config.keyspace, replication, config.durable_writes
    ))
}

pub fn use_keyspace(keyspace: &str) -> Statement {
    Statement::simple(format!("USE {keyspace};"))
}

/// One `CREATE TYPE` statement per nested type, in declaration order.
/// Types must exist before the table that embeds them.
pub fn create_types(schema: &TableSchema) -> Vec<Statement> {
    // Types referenced by the table must live in the table's keyspace.
    let prefix = schema
        .keyspace()
        .map(|ks| format!("{ks}."))
        .unwrap_or_default();
    schema
        .nested_types()
        .iter()
        .map(|nested| {
            let fields: Vec<String> = nested
                .fields
                .iter()
                .map(|f| format!("\t{} {}", to_identifier(&f.name), f.data_type.wire_name()))
                .collect();
            Statement::simple(format!(
                "CREATE TYPE IF NOT EXISTS {}{} (\n{}\n);",
                prefix,
                to_identifier(&nested.name),
                fields.join(",\n")
            ))
        })
        .collect()
}

/// The full `CREATE TABLE` statement, version marker column included.
pub fn create_table(schema: &TableSchema) -> Statement {
    let mut lines: Vec<String> = schema
        .wire_columns()
        .iter()
        .map(|c| format!("\t{} {}", c.wire_name, c.data_type.wire_name()))
        .collect();

    if let Some(version) = schema.version() {
        lines.push(format!("\t{} int", to_identifier(&version.column)));
    }

    let (partition, clustering) = schema.primary_key().wire();
    let partition_part = if partition.len() == 1 {
        partition[0].clone()
    } else {
        format!("({})", partition.join(", "))
    };
    let mut key_parts = vec![partition_part];
    key_parts.extend(clustering);
    lines.push(format!("\tPRIMARY KEY ({})", key_parts.join(", ")));

    let with_clause = if schema.with_options().is_empty() {
        String::new()
    } else {
        let rendered: Vec<String> = schema
            .with_options()
            .iter()
            .map(|(key, value)| render_with_option(key, value))
            .collect();
        format!(" WITH {}", rendered.join(" AND "))
    };

    Statement::simple(format!(
        "CREATE TABLE{} {} (\n{}\n){};",
        if schema.if_not_exists() {
            " IF NOT EXISTS"
        } else {
            ""
        },
        schema.wire_target(),
        lines.join(",\n"),
        with_clause
    ))
}

/// A single `CREATE INDEX` on an already wire-level target column.
pub fn create_index(table: &str, name: &str, target: &str) -> Statement {
    Statement::simple(format!(
        "CREATE INDEX IF NOT EXISTS {name} ON {table} ({target});"
    ))
}

/// Every declared index plus the forced index on the version column.
/// Index names never carry the keyspace; only the `ON` target does.
pub fn create_indexes(schema: &TableSchema) -> Vec<Statement> {
    let table = schema.wire_table();
    let target_table = schema.wire_target();
    let mut statements: Vec<Statement> = schema
        .indexes()
        .iter()
        .map(|index| {
            create_index(
                target_table,
                &index.wire_name(table),
                &to_identifier(&index.column),
            )
        })
        .collect();

    if let Some(version) = schema.version() {
        let column = to_identifier(&version.column);
        statements.push(create_index(
            target_table,
            &format!("{table}_inx_{column}"),
            &column,
        ));
    }

    statements
}

/// `ALTER TABLE ... ADD` for a version column missing on the live table.
pub fn add_version_column(schema: &TableSchema, column: &str) -> Statement {
    Statement::simple(format!(
        "ALTER TABLE {} ADD {} int;",
        schema.wire_target(),
        to_identifier(column)
    ))
}

pub fn drop_index(name: &str) -> Statement {
    Statement::simple(format!("DROP INDEX {name};"))
}

/// Render one `WITH` option. `clustering_order` is the odd one out: its
/// value is spliced after the `CLUSTERING` keyword rather than assigned.
pub fn render_with_option(key: &str, value: &WithValue) -> String {
    if key == "clustering_order" {
        if let WithValue::Text(text) = value {
            return format!("CLUSTERING {text}");
        }
    }
    let rendered = match value {
        WithValue::Int(n) => n.to_string(),
        WithValue::Float(f) => f.to_string(),
        WithValue::Bool(b) => b.to_string(),
        WithValue::Text(s) => format!("'{s}'"),
        WithValue::Map(entries) => {
            let parts: Vec<String> = entries
                .iter()
                .map(|(k, v)| format!("'{k}': '{v}'"))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
        WithValue::List(items) => format!("[{}]", items.join(", ")),
    };
    format!("{key} = {rendered}")
}
