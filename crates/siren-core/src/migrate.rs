//! The lazy migration engine.
//!
//! Rows are migrated on the read path, one version at a time, until they
//! reach the schema's current version. Each step fetches whatever the
//! script's declared field set and the table's primary key require, runs
//! the script on a copy, and persists the result. A version with no
//! registered script strands the row at that version; the caller gets the
//! row as-is and no version write happens.

use crate::marshal;
use siren_commons::{
    to_identifier, FieldSet, MigrationHandle, Result, Row, SirenError, StoreSession, TableSchema,
    Value,
};
use siren_cql::dml;

/// Drive `row` from `version` to the schema's current version.
///
/// `filter` is the application-level filter of the read that surfaced the
/// row; it seeds the key set used for the per-step UPDATE. The returned row
/// reflects every script that ran, whether or not the chain completed.
pub(crate) async fn migrate_row(
    session: &dyn StoreSession,
    schema: &TableSchema,
    mut row: Row,
    mut version: i32,
    filter: &Row,
) -> Result<Row> {
    let Some(spec) = schema.version() else {
        return Ok(row);
    };
    let current = spec.current;
    let version_column = to_identifier(&spec.column);
    let table = schema.name();
    let wire_target = schema.wire_target();
    let mut keys = filter.clone();

    while version < current {
        let Some(script) = schema.migration(version) else {
            log::debug!(
                "[{table}] No migration script registered for version {version}; leaving the row at that version"
            );
            return Ok(row);
        };

        match script.changes() {
            Some(changes) => log::debug!(
                "[{table}] Migrating data from version {version} to {} due to {changes}",
                version + 1
            ),
            None => log::debug!(
                "[{table}] Migrating data from version {version} to {}",
                version + 1
            ),
        }

        // Patch missing key columns from the row before deciding whether a
        // supplemental fetch is needed.
        for key in schema.primary_key().columns() {
            if !keys.contains_key(key) {
                if let Some(value) = row.get(key) {
                    keys.insert(key.clone(), value.clone());
                }
            }
        }
        let mut has_all_keys = schema
            .primary_key()
            .columns()
            .all(|key| keys.contains_key(key));

        let fields = script.fields();
        let has_all_fields = match &fields {
            FieldSet::All => row.len() >= schema.columns().len(),
            FieldSet::Named(names) => names.iter().all(|f| row.contains_key(f)),
        };

        if !has_all_fields || !has_all_keys {
            let projection: Option<Vec<String>> = match &fields {
                FieldSet::All => None,
                FieldSet::Named(names) => {
                    let mut wanted: Vec<String> = names
                        .iter()
                        .filter(|f| !row.contains_key(*f))
                        .map(|f| to_identifier(f))
                        .collect();
                    for key in schema.primary_key().columns() {
                        let wire = to_identifier(key);
                        if !keys.contains_key(key) && !wanted.contains(&wire) {
                            wanted.push(wire);
                        }
                    }
                    Some(wanted)
                }
            };
            let statement = dml::select(
                wire_target,
                projection.as_deref(),
                &marshal::to_wire_pairs(&keys),
                false,
                None,
            );
            let fetched = session
                .execute(&statement)
                .await
                .map_err(|e| SirenError::query(table, e))?;
            let Some(first) = fetched.into_iter().next() else {
                // The row vanished between the read and the fetch.
                return Ok(row);
            };
            for (key, value) in marshal::from_wire_row(schema, &first) {
                row.entry(key).or_insert(value);
            }
            if !has_all_keys {
                for key in schema.primary_key().columns() {
                    if !keys.contains_key(key) {
                        if let Some(value) = row.get(key) {
                            keys.insert(key.clone(), value.clone());
                        }
                    }
                }
                has_all_keys = schema
                    .primary_key()
                    .columns()
                    .all(|key| keys.contains_key(key));
            }
            if !has_all_keys {
                return Err(SirenError::migration(
                    table,
                    format!("Cannot resolve the full primary key for a version {version} row"),
                ));
            }
        }

        let handle = MigrationHandle::new(session);
        let migrated = script.migrate(&handle, row.clone(), version).await?;

        let Some(migrated) = migrated else {
            // The script rewrote the row itself; re-fetch and hand back
            // whatever is stored now, without touching the version marker.
            let statement =
                dml::select(wire_target, None, &marshal::to_wire_pairs(&keys), false, None);
            let fetched = session
                .execute(&statement)
                .await
                .map_err(|e| SirenError::query(table, e))?;
            return Ok(match fetched.into_iter().next() {
                Some(first) => marshal::from_wire_row(schema, &first),
                None => row,
            });
        };

        let where_pairs = marshal::to_wire_pairs(&keys);
        if migrated == row {
            let statement = dml::update(
                wire_target,
                &[],
                Some((&version_column, version + 1)),
                &where_pairs,
            );
            session
                .execute(&statement)
                .await
                .map_err(|e| SirenError::query(table, e))?;
            log::debug!(
                "[{table}] No changes were made to the data, but the version was updated to {}",
                version + 1
            );
        } else {
            let assignments: Vec<(String, Value)> = match &fields {
                FieldSet::All => migrated
                    .iter()
                    .filter(|(key, _)| !keys.contains_key(*key))
                    .map(|(key, value)| {
                        (to_identifier(key), marshal::to_wire_value(value))
                    })
                    .collect(),
                FieldSet::Named(names) => names
                    .iter()
                    .filter(|f| !keys.contains_key(*f))
                    .map(|f| {
                        let value = migrated.get(f).cloned().unwrap_or(Value::Null);
                        (to_identifier(f), marshal::to_wire_value(&value))
                    })
                    .collect(),
            };
            let statement = dml::update(
                wire_target,
                &assignments,
                Some((&version_column, version + 1)),
                &where_pairs,
            );
            session
                .execute(&statement)
                .await
                .map_err(|e| SirenError::query(table, e))?;
            log::debug!("[{table}] The data has been updated to version {}", version + 1);
            row = migrated;
        }

        version += 1;
    }

    Ok(row)
}
