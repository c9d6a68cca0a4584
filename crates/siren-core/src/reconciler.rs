//! Reconciliation of a declared schema against the live cluster.
//!
//! Runs once per table at connect time and again when a table registers on
//! an already-connected client. Creation is automatic; anything that alters
//! or drops live state goes through the confirmation sink first. Primary
//! key drift is fatal: keys cannot be changed in place, so the pass stops
//! before issuing any DDL.

use crate::confirm::ConfirmationSink;
use siren_commons::{to_identifier, Result, SirenError, StoreSession, TableSchema};
use siren_cql::ddl;

pub(crate) async fn reconcile(
    session: &dyn StoreSession,
    confirm: &dyn ConfirmationSink,
    keyspace: &str,
    schema: &TableSchema,
) -> Result<()> {
    let table = schema.name();
    let wire_table = schema.wire_table();
    let keyspace = schema.keyspace().unwrap_or(keyspace);

    let snapshot = session
        .schema_snapshot(keyspace, wire_table)
        .await
        .map_err(|e| SirenError::reconcile(table, format!("Failed to get table metadata: {e}")))?;

    if !snapshot.exists {
        for statement in ddl::create_types(schema) {
            session
                .execute(&statement)
                .await
                .map_err(|e| SirenError::reconcile(table, format!("Failed to create type: {e}")))?;
            log::info!("[{table}] Created type: {}", statement.query);
        }

        let statement = ddl::create_table(schema);
        session
            .execute(&statement)
            .await
            .map_err(|e| SirenError::reconcile(table, format!("Failed to create table: {e}")))?;
        log::info!("[{table}] Created table {wire_table}");

        let indexes = ddl::create_indexes(schema);
        let count = indexes.len();
        for statement in indexes {
            session
                .execute(&statement)
                .await
                .map_err(|e| SirenError::reconcile(table, format!("Failed to create index: {e}")))?;
        }
        log::info!("[{table}] Created {count} indexes");

        return Ok(());
    }

    // Key drift first; nothing below may run against a mismatched key.
    let declared = schema.primary_key().wire();
    let live = snapshot.primary_key();
    if declared != live {
        return Err(SirenError::primary_key_drift(
            table,
            format!(
                "declared ({:?}, {:?}) but the live table has ({:?}, {:?}); back up the data and recreate the table",
                declared.0, declared.1, live.0, live.1
            ),
        ));
    }

    let version_index = schema.version_index_name();
    let declared_names: Vec<String> = schema
        .indexes()
        .iter()
        .map(|index| index.wire_name(wire_table))
        .collect();

    for (index, name) in schema.indexes().iter().zip(&declared_names) {
        if !snapshot.indexes.iter().any(|live| &live.name == name) {
            let statement =
                ddl::create_index(schema.wire_target(), name, &to_identifier(&index.column));
            session.execute(&statement).await.map_err(|e| {
                SirenError::reconcile(table, format!("Failed to create index {name}: {e}"))
            })?;
            log::info!("[{table}] Created index {name}");
        }
    }

    for live_index in &snapshot.indexes {
        if version_index.as_deref() == Some(live_index.name.as_str()) {
            continue;
        }
        if declared_names.iter().any(|name| name == &live_index.name) {
            continue;
        }
        let approved = confirm
            .confirm(&format!(
                "The index {} (target: {} | table: {wire_table}) is not declared locally, would you like to remove it?",
                live_index.name, live_index.target
            ))
            .await?;
        if approved {
            // The index lives wherever the table does; a plain name would
            // resolve against the connection's current keyspace.
            let drop_name = match schema.keyspace() {
                Some(keyspace) => format!("{keyspace}.{}", live_index.name),
                None => live_index.name.clone(),
            };
            session
                .execute(&ddl::drop_index(&drop_name))
                .await
                .map_err(|e| {
                    SirenError::reconcile(
                        table,
                        format!("Failed to drop index {}: {e}", live_index.name),
                    )
                })?;
            log::info!("[{table}] Dropped index {}", live_index.name);
        }
    }

    if let Some(spec) = schema.version() {
        let column = to_identifier(&spec.column);

        if !snapshot.has_column(&column) {
            let approved = confirm
                .confirm(&format!(
                    "[{table}] The version column {column} is not in the live table, would you like to add it?"
                ))
                .await?;
            if approved {
                session
                    .execute(&ddl::add_version_column(schema, &spec.column))
                    .await
                    .map_err(|e| {
                        SirenError::reconcile(
                            table,
                            format!("Failed to add version column {column}: {e}"),
                        )
                    })?;
                log::info!("[{table}] Added version column {column}");
            }
        }

        if !snapshot.has_index_on(&column) {
            let name = format!("{wire_table}_inx_{column}");
            let approved = confirm
                .confirm(&format!(
                    "[{table}] The version index {name} is not in the live table, would you like to add it?"
                ))
                .await?;
            if approved {
                session
                    .execute(&ddl::create_index(schema.wire_target(), &name, &column))
                    .await
                    .map_err(|e| {
                        SirenError::reconcile(
                            table,
                            format!("Failed to create version index {name}: {e}"),
                        )
                    })?;
                log::info!("[{table}] Created version index {name}");
            }
        }
    }

    Ok(())
}
