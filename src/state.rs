//! State access port and the entity marshalling boundary.
//!
//! The core never mutates the ledger itself: handlers read a declared batch
//! of addresses through [`StatePort::read`], validate, and describe their
//! whole effect as a [`WriteSet`] which the surrounding runtime applies
//! atomically.

use std::collections::{BTreeMap, HashMap};

use crate::error::CoreError;

/// One invocation's state delta: address to freshly encoded bytes. Ordered so
/// iteration (and therefore application and logging) is deterministic.
pub type WriteSet = BTreeMap<String, Vec<u8>>;

/// The result of a batched read. Addresses absent from the map, or mapped to
/// empty bytes, do not exist on the ledger.
pub type Snapshot = HashMap<String, Vec<u8>>;

/// Port to the replicated key-value ledger. The replication layer guarantees
/// a consistent snapshot per invocation and all-or-nothing application of a
/// write batch; the core is responsible for declaring every address it reads.
pub trait StatePort {
    /// Read a batch of addresses in one round trip.
    fn read(&self, addresses: &[String]) -> Result<Snapshot, CoreError>;

    /// Apply a write batch atomically.
    fn write(&self, updates: WriteSet) -> Result<(), CoreError>;
}

/// Whether the snapshot holds a live record at `address`.
pub fn exists(snapshot: &Snapshot, address: &str) -> bool {
    snapshot.get(address).is_some_and(|bytes| !bytes.is_empty())
}

/// Encode an entity for storage.
pub fn encode<T: minicbor::Encode<()>>(entity: &T) -> Result<Vec<u8>, CoreError> {
    minicbor::to_vec(entity).map_err(|e| CoreError::Ledger(format!("entity encoding failed: {e}")))
}

/// Decode the record at `address` out of a snapshot, failing closed: a
/// missing, empty or malformed record is an unknown reference, never a
/// partially populated entity. `what` names the expected kind in the
/// rejection reason.
pub fn get_decoded<T>(snapshot: &Snapshot, address: &str, what: &str) -> Result<T, CoreError>
where
    T: for<'b> minicbor::Decode<'b, ()>,
{
    let bytes = snapshot
        .get(address)
        .filter(|bytes| !bytes.is_empty())
        .ok_or_else(|| CoreError::UnknownReference(format!("no {what} at {address}")))?;

    minicbor::decode(bytes).map_err(|e| {
        CoreError::UnknownReference(format!("record at {address} is not a valid {what}: {e}"))
    })
}
