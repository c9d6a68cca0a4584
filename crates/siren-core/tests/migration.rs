mod common;

use async_trait::async_trait;
use common::{connect, users_schema};
use siren_core::testing::RecordingSession;
use siren_core::{
    migration_fn, migration_fn_with_changes, row, FieldSet, GetOptions, MigrationHandle, Result,
    Row, RowMigration, SirenError, Value,
};
use std::sync::Arc;

fn bump_flags(by: i32) -> Arc<dyn RowMigration> {
    migration_fn(FieldSet::All, move |mut row: Row, _| {
        let flags = row.get("flags").and_then(Value::as_i32).unwrap_or(0);
        row.insert("flags".into(), Value::from(flags + by));
        row
    })
}

fn stored(user: &str, guild: &str, flags: i32, version: Value) -> Row {
    row([
        ("user_id", Value::from(user)),
        ("guild_id", Value::from(guild)),
        ("flags", Value::from(flags)),
        ("roles", Value::List(Vec::new())),
        ("int_tbl_ver", version),
    ])
}

#[tokio::test]
async fn test_unversioned_row_walks_the_whole_chain() {
    let session = Arc::new(RecordingSession::new());
    let schema = users_schema(3)
        .migration(0, bump_flags(1))
        .migration(1, bump_flags(10))
        .migration(2, bump_flags(100))
        .build()
        .unwrap();
    let client = connect(session.clone(), vec![Arc::new(schema)]).await;
    let users = client.table("Users").unwrap();

    // A null version marker reads as version 0.
    session.queue_row(stored("123", "9", 0, Value::Null));
    let found = users
        .get(&row([("userId", Value::from("123"))]), GetOptions::default())
        .await
        .unwrap()
        .expect("row");

    assert_eq!(found.get("flags"), Some(&Value::from(111)));

    let updates: Vec<String> = session
        .queries()
        .into_iter()
        .filter(|q| q.starts_with("UPDATE"))
        .collect();
    assert_eq!(
        updates,
        vec![
            "UPDATE users SET flags = ?, roles = ?, int_tbl_ver = 1 WHERE guild_id = ? AND user_id = ?;",
            "UPDATE users SET flags = ?, roles = ?, int_tbl_ver = 2 WHERE guild_id = ? AND user_id = ?;",
            "UPDATE users SET flags = ?, roles = ?, int_tbl_ver = 3 WHERE guild_id = ? AND user_id = ?;",
        ]
    );
}

#[tokio::test]
async fn test_version_gap_strands_the_row() {
    let session = Arc::new(RecordingSession::new());
    // Scripts for 0 only; versions 1 and 2 have no path to 3.
    let schema = users_schema(3).migration(0, bump_flags(1)).build().unwrap();
    let client = connect(session.clone(), vec![Arc::new(schema)]).await;
    let users = client.table("Users").unwrap();

    session.queue_row(stored("123", "9", 0, Value::from(0)));
    let found = users
        .get(&row([("userId", Value::from("123"))]), GetOptions::default())
        .await
        .unwrap()
        .expect("row");

    // The one registered script ran; the row is now stranded at version 1
    // and stays there on every future read.
    assert_eq!(found.get("flags"), Some(&Value::from(1)));
    let updates: Vec<String> = session
        .queries()
        .into_iter()
        .filter(|q| q.starts_with("UPDATE"))
        .collect();
    assert_eq!(updates.len(), 1);
    assert!(updates[0].contains("int_tbl_ver = 1"));
}

#[tokio::test]
async fn test_no_change_still_advances_the_version() {
    let session = Arc::new(RecordingSession::new());
    let schema = users_schema(2)
        .migration(1, migration_fn_with_changes(FieldSet::All, "no-op step", |row, _| row))
        .build()
        .unwrap();
    let client = connect(session.clone(), vec![Arc::new(schema)]).await;
    let users = client.table("Users").unwrap();

    session.queue_row(stored("123", "9", 4, Value::from(1)));
    users
        .get(&row([("userId", Value::from("123"))]), GetOptions::default())
        .await
        .unwrap();

    let updates: Vec<String> = session
        .queries()
        .into_iter()
        .filter(|q| q.starts_with("UPDATE"))
        .collect();
    assert_eq!(
        updates,
        vec!["UPDATE users SET int_tbl_ver = 2 WHERE guild_id = ? AND user_id = ?;"]
    );
}

#[tokio::test]
async fn test_named_fields_trigger_supplemental_fetch() {
    let session = Arc::new(RecordingSession::new());
    let schema = users_schema(2)
        .migration(
            1,
            migration_fn(FieldSet::named(["flags"]), |mut row: Row, _| {
                let flags = row.get("flags").and_then(Value::as_i32).unwrap_or(0);
                row.insert("flags".into(), Value::from(flags * 2));
                row
            }),
        )
        .build()
        .unwrap();
    let client = connect(session.clone(), vec![Arc::new(schema)]).await;
    let users = client.table("Users").unwrap();

    // The projection leaves out flags and the clustering key, so the engine
    // has to fetch both before the script can run.
    session.queue_row(row([
        ("user_id", Value::from("123")),
        ("int_tbl_ver", Value::from(1)),
    ]));
    session.queue_row(row([
        ("flags", Value::from(4)),
        ("guild_id", Value::from("9")),
    ]));

    let found = users
        .get(
            &row([("userId", Value::from("123"))]),
            GetOptions {
                fields: Some(vec!["userId".into()]),
                allow_filtering: false,
            },
        )
        .await
        .unwrap()
        .expect("row");

    let queries = session.queries();
    assert!(queries.contains(&"SELECT flags, guild_id FROM users WHERE user_id = ?;".to_string()));
    assert!(queries.contains(
        &"UPDATE users SET flags = ?, int_tbl_ver = 2 WHERE guild_id = ? AND user_id = ?;"
            .to_string()
    ));
    // The caller asked for userId only; the migrated flags stay internal.
    assert_eq!(found.len(), 1);
    assert!(found.contains_key("userId"));
}

#[tokio::test]
async fn test_unresolvable_primary_key_is_an_error() {
    let session = Arc::new(RecordingSession::new());
    let schema = users_schema(2)
        .migration(1, migration_fn(FieldSet::named(["flags"]), |row, _| row))
        .build()
        .unwrap();
    let client = connect(session.clone(), vec![Arc::new(schema)]).await;
    let users = client.table("Users").unwrap();

    session.queue_row(row([
        ("user_id", Value::from("123")),
        ("int_tbl_ver", Value::from(1)),
    ]));
    // The supplemental fetch comes back without the clustering key.
    session.queue_row(row([("flags", Value::from(4))]));

    let err = users
        .get(
            &row([("userId", Value::from("123"))]),
            GetOptions {
                fields: Some(vec!["userId".into()]),
                allow_filtering: false,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, SirenError::Migration { .. }), "{err}");
}

#[tokio::test]
async fn test_vanished_row_returns_unmigrated() {
    let session = Arc::new(RecordingSession::new());
    let schema = users_schema(2)
        .migration(1, migration_fn(FieldSet::named(["flags"]), |row, _| row))
        .build()
        .unwrap();
    let client = connect(session.clone(), vec![Arc::new(schema)]).await;
    let users = client.table("Users").unwrap();

    session.queue_row(row([
        ("user_id", Value::from("123")),
        ("guild_id", Value::from("9")),
        ("int_tbl_ver", Value::from(1)),
    ]));
    // The supplemental fetch finds nothing; the row was deleted meanwhile.
    session.queue_rows(Vec::new());

    let found = users
        .get(
            &row([("userId", Value::from("123"))]),
            GetOptions {
                fields: Some(vec!["userId".into()]),
                allow_filtering: false,
            },
        )
        .await
        .unwrap()
        .expect("row");

    assert!(found.contains_key("userId"));
    assert!(!session.queries().iter().any(|q| q.starts_with("UPDATE")));
}

struct Reinserter;

#[async_trait]
impl RowMigration for Reinserter {
    fn fields(&self) -> FieldSet {
        FieldSet::All
    }

    fn changes(&self) -> Option<&str> {
        Some("moves the row to a new key shape")
    }

    async fn migrate(
        &self,
        _handle: &MigrationHandle<'_>,
        _row: Row,
        _source_version: i32,
    ) -> Result<Option<Row>> {
        // The script claims to have rewritten the row itself.
        Ok(None)
    }
}

#[tokio::test]
async fn test_self_persisting_script_causes_refetch_without_version_write() {
    let session = Arc::new(RecordingSession::new());
    let schema = users_schema(2)
        .migration(1, Arc::new(Reinserter))
        .build()
        .unwrap();
    let client = connect(session.clone(), vec![Arc::new(schema)]).await;
    let users = client.table("Users").unwrap();

    session.queue_row(stored("123", "9", 4, Value::from(1)));
    // The wildcard re-fetch sees what the script wrote.
    session.queue_row(stored("123", "9", 99, Value::from(2)));

    let found = users
        .get(&row([("userId", Value::from("123"))]), GetOptions::default())
        .await
        .unwrap()
        .expect("row");

    assert_eq!(found.get("flags"), Some(&Value::from(99)));
    assert!(!session.queries().iter().any(|q| q.starts_with("UPDATE")));
    assert!(session
        .queries()
        .iter()
        .any(|q| q == "SELECT * FROM users WHERE guild_id = ? AND user_id = ?;"));
}

#[tokio::test]
async fn test_row_ahead_of_schema_is_left_alone() {
    let session = Arc::new(RecordingSession::new());
    let schema = users_schema(1).migration(0, bump_flags(1)).build().unwrap();
    let client = connect(session.clone(), vec![Arc::new(schema)]).await;
    let users = client.table("Users").unwrap();

    session.queue_row(stored("123", "9", 4, Value::from(5)));
    let found = users
        .get(&row([("userId", Value::from("123"))]), GetOptions::default())
        .await
        .unwrap()
        .expect("row");

    assert_eq!(found.get("flags"), Some(&Value::from(4)));
    assert!(!session.queries().iter().any(|q| q.starts_with("UPDATE")));
}

#[tokio::test]
async fn test_find_migrates_each_row_independently() {
    let session = Arc::new(RecordingSession::new());
    let schema = users_schema(2).migration(1, bump_flags(10)).build().unwrap();
    let client = connect(session.clone(), vec![Arc::new(schema)]).await;
    let users = client.table("Users").unwrap();

    session.queue_rows(vec![
        stored("123", "9", 1, Value::from(1)),
        stored("456", "9", 2, Value::from(2)),
    ]);
    let found = users
        .find(
            &row([("guildId", Value::from("9"))]),
            siren_core::FindOptions {
                allow_filtering: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let rows = found.into_vec();
    // Only the trailing row was migrated.
    assert_eq!(rows[0].get("flags"), Some(&Value::from(11)));
    assert_eq!(rows[1].get("flags"), Some(&Value::from(2)));
    let updates: Vec<String> = session
        .queries()
        .into_iter()
        .filter(|q| q.starts_with("UPDATE"))
        .collect();
    assert_eq!(updates.len(), 1);
}

#[tokio::test]
async fn test_second_read_of_migrated_row_is_quiet() {
    let session = Arc::new(RecordingSession::new());
    let schema = users_schema(2).migration(1, bump_flags(10)).build().unwrap();
    let client = connect(session.clone(), vec![Arc::new(schema)]).await;
    let users = client.table("Users").unwrap();

    session.queue_row(stored("123", "9", 1, Value::from(1)));
    users
        .get(&row([("userId", Value::from("123"))]), GetOptions::default())
        .await
        .unwrap();
    let updates_after_first = session
        .queries()
        .iter()
        .filter(|q| q.starts_with("UPDATE"))
        .count();
    assert_eq!(updates_after_first, 1);

    // The row is stored at the current version now; reading it again only
    // issues the SELECT.
    session.queue_row(stored("123", "9", 11, Value::from(2)));
    let found = users
        .get(&row([("userId", Value::from("123"))]), GetOptions::default())
        .await
        .unwrap()
        .expect("row");
    assert_eq!(found.get("flags"), Some(&Value::from(11)));
    let updates_after_second = session
        .queries()
        .iter()
        .filter(|q| q.starts_with("UPDATE"))
        .count();
    assert_eq!(updates_after_second, 1);
}

#[tokio::test]
async fn test_wildcard_script_fetches_the_full_row_first() {
    let session = Arc::new(RecordingSession::new());
    let schema = users_schema(1).migration(0, bump_flags(5)).build().unwrap();
    let client = connect(session.clone(), vec![Arc::new(schema)]).await;
    let users = client.table("Users").unwrap();

    // A narrow projection on an unversioned row: the wildcard script needs
    // the whole row, so the engine fetches it before running the script.
    session.queue_row(row([
        ("user_id", Value::from("123")),
        ("int_tbl_ver", Value::Null),
    ]));
    // The fetch resolves the clustering key but carries no flags either.
    session.queue_row(row([
        ("user_id", Value::from("123")),
        ("guild_id", Value::from("9")),
    ]));

    users
        .get(
            &row([("userId", Value::from("123"))]),
            GetOptions {
                fields: Some(vec!["userId".into()]),
                allow_filtering: false,
            },
        )
        .await
        .unwrap()
        .expect("row");

    let queries = session.queries();
    assert!(queries.contains(&"SELECT * FROM users WHERE user_id = ?;".to_string()));
    let update = session
        .executed()
        .into_iter()
        .find(|s| s.query.starts_with("UPDATE"))
        .expect("update");
    assert_eq!(
        update.query,
        "UPDATE users SET flags = ?, int_tbl_ver = 1 WHERE guild_id = ? AND user_id = ?;"
    );
    // The script saw no flags field and wrote from its default.
    assert_eq!(update.params.first(), Some(&Value::from(5)));
}
