//! Client configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Keyspace replication strategy, rendered into `CREATE KEYSPACE`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "class", rename_all = "snake_case")]
pub enum ReplicationStrategy {
    Simple {
        #[serde(default = "default_replication_factor")]
        replication_factor: u32,
    },
    NetworkTopology {
        datacenters: BTreeMap<String, u32>,
    },
}

impl Default for ReplicationStrategy {
    fn default() -> Self {
        Self::Simple {
            replication_factor: default_replication_factor(),
        }
    }
}

fn default_replication_factor() -> u32 {
    1
}

/// Settings applied when the client connects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Keyspace every registered table lives in unless it overrides one.
    pub keyspace: String,
    #[serde(default)]
    pub replication: ReplicationStrategy,
    /// Off unless asked for; most deployments leave the commit log to the
    /// store's own defaults per keyspace.
    #[serde(default)]
    pub durable_writes: bool,
}

impl ClientConfig {
    pub fn new(keyspace: impl Into<String>) -> Self {
        Self {
            keyspace: keyspace.into(),
            replication: ReplicationStrategy::default(),
            durable_writes: false,
        }
    }
}
