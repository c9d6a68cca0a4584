//! The client: session ownership, keyspace setup, and table handles.

use crate::confirm::ConfirmationSink;
use crate::registry::TableRegistry;
use crate::table::TableHandle;
use parking_lot::Mutex;
use siren_commons::{ClientConfig, Result, SirenError, StoreSession};
use siren_cql::ddl;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

/// Entry point for all table access.
///
/// Construct one per process, register table schemas, then [`connect`]
/// (Client::connect). Until `connect` completes every table operation
/// fails with [`SirenError::NotConnected`].
pub struct Client {
    session: Arc<dyn StoreSession>,
    registry: Arc<TableRegistry>,
    confirm: Arc<dyn ConfirmationSink>,
    config: ClientConfig,
    connected: AtomicBool,
    pending: Mutex<broadcast::Receiver<String>>,
}

impl Client {
    pub fn new(
        session: Arc<dyn StoreSession>,
        registry: Arc<TableRegistry>,
        confirm: Arc<dyn ConfirmationSink>,
        config: ClientConfig,
    ) -> Self {
        let pending = Mutex::new(registry.subscribe());
        Self {
            session,
            registry,
            confirm,
            config,
            connected: AtomicBool::new(false),
            pending,
        }
    }

    pub fn registry(&self) -> &Arc<TableRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub(crate) fn session(&self) -> &dyn StoreSession {
        self.session.as_ref()
    }

    pub(crate) fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(SirenError::NotConnected)
        }
    }

    /// Create and enter the keyspace, then reconcile every registered table
    /// in registration order. Any failure aborts the connect; the client
    /// stays disconnected.
    pub async fn connect(&self) -> Result<()> {
        self.session
            .execute(&ddl::create_keyspace(&self.config))
            .await
            .map_err(|e| SirenError::connection(format!("Failed to create keyspace: {e}")))?;
        self.session
            .execute(&ddl::use_keyspace(&self.config.keyspace))
            .await
            .map_err(|e| SirenError::connection(format!("Failed to use keyspace: {e}")))?;

        for schema in self.registry.all() {
            crate::reconciler::reconcile(
                self.session.as_ref(),
                self.confirm.as_ref(),
                &self.config.keyspace,
                &schema,
            )
            .await?;
        }

        self.connected.store(true, Ordering::Release);
        log::info!(
            "Connected to keyspace {} with {} tables",
            self.config.keyspace,
            self.registry.len()
        );
        Ok(())
    }

    /// Reconcile tables registered since connect (or since the last call).
    /// A no-op before connect; those tables are handled by `connect`.
    pub async fn sync_registered(&self) -> Result<()> {
        if !self.is_connected() {
            return Ok(());
        }
        // Drain the channel first; the receiver guard must not be held
        // across the reconcile awaits.
        let (names, resync_all) = {
            let mut pending = self.pending.lock();
            let mut names = Vec::new();
            let mut resync_all = false;
            loop {
                match pending.try_recv() {
                    Ok(name) => names.push(name),
                    Err(TryRecvError::Empty | TryRecvError::Closed) => break,
                    Err(TryRecvError::Lagged(skipped)) => {
                        log::warn!("Missed {skipped} registration events; reconciling all tables");
                        resync_all = true;
                        break;
                    }
                }
            }
            (names, resync_all)
        };

        let schemas = if resync_all {
            self.registry.all()
        } else {
            names
                .iter()
                .filter_map(|name| self.registry.get(name))
                .collect()
        };
        for schema in schemas {
            crate::reconciler::reconcile(
                self.session.as_ref(),
                self.confirm.as_ref(),
                &self.config.keyspace,
                &schema,
            )
            .await?;
        }
        Ok(())
    }

    /// Handle for a registered table.
    pub fn table(self: &Arc<Self>, name: &str) -> Result<TableHandle> {
        let schema = self
            .registry
            .get(name)
            .ok_or_else(|| SirenError::UnknownTable(name.to_string()))?;
        Ok(TableHandle::new(Arc::clone(self), schema))
    }
}
