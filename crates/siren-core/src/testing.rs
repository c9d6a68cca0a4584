//! Test doubles for the store session.
//!
//! [`RecordingSession`] records every executed statement and replays queued
//! responses, so tests can assert on the exact statements an operation
//! produced without a live cluster.

use async_trait::async_trait;
use parking_lot::Mutex;
use siren_commons::{
    LiveSchemaSnapshot, Row, RowSet, SessionError, Statement, StoreSession,
};
use std::collections::VecDeque;

/// A [`StoreSession`] that answers from queues and keeps a transcript.
///
/// Queued row sets are consumed by `SELECT` statements in order; every
/// other statement returns an empty set. Schema snapshots come from their
/// own queue, falling back to "table absent".
#[derive(Default)]
pub struct RecordingSession {
    responses: Mutex<VecDeque<RowSet>>,
    snapshots: Mutex<VecDeque<LiveSchemaSnapshot>>,
    snapshot_requests: Mutex<Vec<(String, String)>>,
    executed: Mutex<Vec<Statement>>,
    fail_on: Mutex<Option<String>>,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a single-row response for the next `SELECT`.
    pub fn queue_row(&self, row: Row) {
        self.responses.lock().push_back(vec![row]);
    }

    /// Queue a multi-row (possibly empty) response for the next `SELECT`.
    pub fn queue_rows(&self, rows: RowSet) {
        self.responses.lock().push_back(rows);
    }

    pub fn queue_snapshot(&self, snapshot: LiveSchemaSnapshot) {
        self.snapshots.lock().push_back(snapshot);
    }

    /// Fail any statement whose text contains `fragment`.
    pub fn fail_when(&self, fragment: impl Into<String>) {
        *self.fail_on.lock() = Some(fragment.into());
    }

    /// Every `(keyspace, table)` pair looked up in the schema metadata.
    pub fn snapshot_requests(&self) -> Vec<(String, String)> {
        self.snapshot_requests.lock().clone()
    }

    /// Everything executed so far, in order.
    pub fn executed(&self) -> Vec<Statement> {
        self.executed.lock().clone()
    }

    /// Just the statement texts, for quick assertions.
    pub fn queries(&self) -> Vec<String> {
        self.executed
            .lock()
            .iter()
            .map(|s| s.query.clone())
            .collect()
    }
}

#[async_trait]
impl StoreSession for RecordingSession {
    async fn execute(&self, statement: &Statement) -> Result<RowSet, SessionError> {
        if let Some(fragment) = self.fail_on.lock().as_deref() {
            if statement.query.contains(fragment) {
                return Err(SessionError::backend(format!(
                    "injected failure for: {}",
                    statement.query
                )));
            }
        }
        self.executed.lock().push(statement.clone());
        if statement.query.starts_with("SELECT") {
            return Ok(self.responses.lock().pop_front().unwrap_or_default());
        }
        Ok(Vec::new())
    }

    async fn schema_snapshot(
        &self,
        keyspace: &str,
        table: &str,
    ) -> Result<LiveSchemaSnapshot, SessionError> {
        self.snapshot_requests
            .lock()
            .push((keyspace.to_string(), table.to_string()));
        Ok(self
            .snapshots
            .lock()
            .pop_front()
            .unwrap_or_else(LiveSchemaSnapshot::absent))
    }
}
