//! Ledger runtime adapter.
//!
//! Wires the validation core to a sled-backed key-value store. The core only
//! ever sees the [`StatePort`]; this layer owns the database handle, applies
//! write-sets atomically through `sled::Batch` and is the one place that
//! emits log events.

use std::sync::Arc;

use sled::Db;

use crate::actions;
use crate::error::CoreError;
use crate::payload::TransactionPayload;
use crate::state::{Snapshot, StatePort, WriteSet};

/// Sled-backed [`StatePort`]. Reads are point lookups; writes go through
/// `apply_batch`, so a write-set lands all-or-nothing.
pub struct SledLedger {
    instance: Arc<Db>,
}

impl SledLedger {
    pub fn new(instance: Arc<Db>) -> Self {
        Self { instance }
    }
}

impl StatePort for SledLedger {
    fn read(&self, addresses: &[String]) -> Result<Snapshot, CoreError> {
        let mut snapshot = Snapshot::new();
        for address in addresses {
            let value = self
                .instance
                .get(address.as_bytes())
                .map_err(|e| CoreError::Ledger(e.to_string()))?;
            if let Some(bytes) = value {
                snapshot.insert(address.clone(), bytes.to_vec());
            }
        }
        Ok(snapshot)
    }

    fn write(&self, updates: WriteSet) -> Result<(), CoreError> {
        let mut batch = sled::Batch::default();
        for (address, bytes) in updates {
            batch.insert(address.as_bytes(), bytes);
        }
        self.instance
            .apply_batch(batch)
            .map_err(|e| CoreError::Ledger(e.to_string()))
    }
}

/// Service facade: validate a transaction against current state and, on
/// success, apply its write-set.
pub struct LedgerService {
    ledger: SledLedger,
}

impl LedgerService {
    pub fn new(instance: Arc<Db>) -> Self {
        Self {
            ledger: SledLedger::new(instance),
        }
    }

    /// Open (or create) a sled database at `path` and wrap it.
    pub fn open(path: impl AsRef<std::path::Path>) -> anyhow::Result<Self> {
        let db = sled::open(path)?;
        Ok(Self::new(Arc::new(db)))
    }

    /// Validate and apply one transaction. Returns the applied write-set so
    /// callers can inspect or forward the delta.
    pub fn execute(
        &self,
        signer: &str,
        payload: &TransactionPayload,
    ) -> Result<WriteSet, CoreError> {
        let action = payload.action.name();
        match actions::apply(&self.ledger, signer, payload) {
            Ok(updates) => {
                self.ledger.write(updates.clone())?;
                tracing::debug!(action, writes = updates.len(), "transaction applied");
                Ok(updates)
            }
            Err(err) => {
                tracing::warn!(action, %err, "transaction rejected");
                Err(err)
            }
        }
    }

    /// Direct port access, for state seeding and inspection.
    pub fn port(&self) -> &SledLedger {
        &self.ledger
    }
}
