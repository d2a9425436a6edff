//! Side table attaching metadata carriers to foreign connection objects.
//!
//! Wrapping with [`TracedConnection`](crate::connection::TracedConnection) is
//! the preferred composition; the side table covers connection objects the
//! embedder cannot wrap, keyed by whatever stable identity it can produce
//! for them.
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::RwLock;

use once_cell::sync::Lazy;

use crate::carrier::ConnectionInfo;
use crate::errors::RegistryError;

/// Process-wide map from connection identity to its metadata carrier.
static CARRIERS: Lazy<RwLock<HashMap<u64, Arc<ConnectionInfo>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Attach a metadata carrier to a connection identity.
///
/// Carriers are immutable once attached: attaching a second carrier to the
/// same identity is refused.
pub fn attach(connection_id: u64, info: ConnectionInfo) -> Result<(), RegistryError> {
    let mut carriers = CARRIERS.write().expect("CARRIERS RwLock poisoned");
    if carriers.contains_key(&connection_id) {
        return Err(RegistryError::AlreadyAttached(connection_id));
    }
    carriers.insert(connection_id, Arc::new(info));
    Ok(())
}

/// Look up the metadata carrier attached to a connection identity.
pub fn lookup(connection_id: u64) -> Result<Arc<ConnectionInfo>, RegistryError> {
    CARRIERS
        .read()
        .expect("CARRIERS RwLock poisoned")
        .get(&connection_id)
        .cloned()
        .ok_or(RegistryError::CarrierMissing(connection_id))
}

/// Detach the carrier when the connection object is destroyed.
///
/// Returns the carrier if one was attached.
pub fn detach(connection_id: u64) -> Option<Arc<ConnectionInfo>> {
    CARRIERS
        .write()
        .expect("CARRIERS RwLock poisoned")
        .remove(&connection_id)
}
