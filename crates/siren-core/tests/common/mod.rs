use siren_core::testing::RecordingSession;
use siren_core::{
    CaseMode, Client, ClientConfig, ColumnType, StoreSession, TableRegistry, TableSchema,
};
use std::sync::Arc;

/// A versioned camel-mode table used across the integration tests.
pub fn users_schema(version: i32) -> siren_core::TableSchemaBuilder {
    TableSchema::builder("Users")
        .column("userId", ColumnType::text())
        .column("guildId", ColumnType::text())
        .column("flags", ColumnType::int())
        .column("roles", ColumnType::list(ColumnType::text()))
        .partition_key(["userId"])
        .clustering_keys(["guildId"])
        .version(version)
        .mode(CaseMode::Camel)
        .if_not_exists(true)
}

/// Build a client over a recording session and connect it. Snapshots must
/// be queued on `session` beforehand; the default is "table absent", which
/// makes connect create every registered table.
pub async fn connect(
    session: Arc<RecordingSession>,
    schemas: Vec<Arc<TableSchema>>,
) -> Arc<Client> {
    let registry = Arc::new(TableRegistry::new());
    for schema in schemas {
        registry.register(schema);
    }
    let client = Arc::new(Client::new(
        session as Arc<dyn StoreSession>,
        registry,
        Arc::new(siren_core::AlwaysYes),
        ClientConfig::new("app"),
    ));
    client.connect().await.expect("connect");
    client
}
