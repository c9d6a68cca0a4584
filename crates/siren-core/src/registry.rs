//! The table registry.
//!
//! Tables register themselves before or after the client connects; the
//! registry keeps them in registration order and notifies subscribers so a
//! connected client can reconcile late registrations.

use parking_lot::RwLock;
use siren_commons::TableSchema;
use std::sync::Arc;
use tokio::sync::broadcast;

const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Ordered collection of registered table schemas.
pub struct TableRegistry {
    tables: RwLock<Vec<Arc<TableSchema>>>,
    changes: broadcast::Sender<String>,
}

impl Default for TableRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TableRegistry {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            tables: RwLock::new(Vec::new()),
            changes,
        }
    }

    /// Register a schema. Re-registering a name replaces the previous
    /// schema in place, keeping its original position.
    pub fn register(&self, schema: Arc<TableSchema>) {
        let name = schema.name().to_string();
        {
            let mut tables = self.tables.write();
            match tables.iter_mut().find(|t| t.name() == name) {
                Some(slot) => *slot = schema,
                None => tables.push(schema),
            }
        }
        // Nobody listening is fine; the client drains on connect anyway.
        let _ = self.changes.send(name);
    }

    pub fn get(&self, name: &str) -> Option<Arc<TableSchema>> {
        self.tables.read().iter().find(|t| t.name() == name).cloned()
    }

    /// All schemas in registration order.
    pub fn all(&self) -> Vec<Arc<TableSchema>> {
        self.tables.read().clone()
    }

    pub fn len(&self) -> usize {
        self.tables.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.read().is_empty()
    }

    /// Subscribe to registration events. Each event carries the table name.
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.changes.subscribe()
    }
}
