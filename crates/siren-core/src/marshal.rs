//! Conversion between application-level rows and wire-level rows.
//!
//! Outbound, application field names are lowered to wire identifiers,
//! recursively through nested values. Inbound, wire rows are mapped back
//! through the schema's precomputed conversion table; physical columns with
//! no declared counterpart are dropped, and null list columns come back as
//! empty lists because the store does not distinguish the two.

use siren_commons::{from_identifier, to_identifier, CaseMode, Row, TableSchema, Value};

/// Lower one value to wire form. Only nested-type keys need conversion;
/// scalars and list elements pass through.
pub fn to_wire_value(value: &Value) -> Value {
    match value {
        Value::List(items) => Value::List(items.iter().map(to_wire_value).collect()),
        Value::Udt(fields) => Value::Udt(
            fields
                .iter()
                .map(|(key, value)| (to_identifier(key), to_wire_value(value)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Lower an application row to ordered wire (column, value) pairs.
pub fn to_wire_pairs(row: &Row) -> Vec<(String, Value)> {
    row.iter()
        .map(|(key, value)| (to_identifier(key), to_wire_value(value)))
        .collect()
}

fn from_wire_value(value: &Value, mode: CaseMode) -> Value {
    match value {
        Value::List(items) => {
            Value::List(items.iter().map(|v| from_wire_value(v, mode)).collect())
        }
        Value::Udt(fields) => Value::Udt(
            fields
                .iter()
                .map(|(key, value)| (from_identifier(key, mode), from_wire_value(value, mode)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Raise a wire row to application form using the schema's conversion
/// table. Undeclared physical columns (the version marker included) are
/// skipped rather than surfaced.
pub fn from_wire_row(schema: &TableSchema, wire: &Row) -> Row {
    let mode = schema.mode();
    let mut out = Row::new();
    for (key, value) in wire {
        let Some(column) = schema.wire_column(key) else {
            continue;
        };
        if column.data_type.is_list() && value.is_null() {
            out.insert(column.app_name.clone(), Value::List(Vec::new()));
            continue;
        }
        out.insert(column.app_name.clone(), from_wire_value(value, mode));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use siren_commons::{row, ColumnType};

    fn users() -> TableSchema {
        TableSchema::builder("Users")
            .column("userId", ColumnType::text())
            .column("flags", ColumnType::int())
            .column("roles", ColumnType::list(ColumnType::text()))
            .column(
                "settings",
                ColumnType::frozen(ColumnType::named("userSettings")),
            )
            .partition_key(["userId"])
            .nested_type(
                "userSettings",
                [
                    ("themeColor", ColumnType::int()),
                    ("quietMode", ColumnType::boolean()),
                ],
            )
            .mode(CaseMode::Camel)
            .build()
            .unwrap()
    }

    #[test]
    fn test_round_trip_row() {
        let schema = users();
        let app = row([
            ("userId", Value::from("123")),
            ("flags", Value::from(4)),
            (
                "settings",
                Value::Udt(
                    [
                        ("themeColor".to_string(), Value::from(7)),
                        ("quietMode".to_string(), Value::from(true)),
                    ]
                    .into(),
                ),
            ),
        ]);

        let wire_pairs = to_wire_pairs(&app);
        let keys: Vec<&str> = wire_pairs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["flags", "settings", "user_id"]);
        match &wire_pairs[1].1 {
            Value::Udt(fields) => {
                assert!(fields.contains_key("theme_color"));
                assert!(fields.contains_key("quiet_mode"));
            }
            other => panic!("unexpected value: {other:?}"),
        }

        let wire: Row = wire_pairs.into_iter().collect();
        let back = from_wire_row(&schema, &wire);
        assert_eq!(back, app);
    }

    #[test]
    fn test_null_list_becomes_empty() {
        let schema = users();
        let wire = row([("user_id", Value::from("123")), ("roles", Value::Null)]);
        let back = from_wire_row(&schema, &wire);
        assert_eq!(back.get("roles"), Some(&Value::List(Vec::new())));
    }

    #[test]
    fn test_undeclared_columns_skipped() {
        let schema = users();
        let wire = row([
            ("user_id", Value::from("123")),
            ("int_tbl_ver", Value::from(2)),
            ("legacy_blob", Value::from("x")),
        ]);
        let back = from_wire_row(&schema, &wire);
        assert_eq!(back.len(), 1);
        assert!(back.contains_key("userId"));
    }
}
