//! Storage capability detection
//!
//! A store that merely exists is not necessarily usable: Safari private
//! browsing exposes `localStorage` but throws on every write. The probe does a
//! real write/delete roundtrip once and the result gates everything else.

use crate::consts::{PROBE_KEY, PROBE_VALUE};
use crate::platform::KeyValueStore;

/// Whether the persistent store accepted the probe roundtrip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageCapability {
    Available,
    Unavailable,
}

impl StorageCapability {
    pub fn is_available(self) -> bool {
        self == StorageCapability::Available
    }
}

/// Write and delete a sentinel under the reserved probe key
///
/// Never fails: any storage error means `Unavailable`. Emits no diagnostics;
/// the caller owns the one-time warning.
pub fn probe<S: KeyValueStore + ?Sized>(store: &S) -> StorageCapability {
    let roundtrip = store
        .set_item(PROBE_KEY, PROBE_VALUE)
        .and_then(|()| store.remove_item(PROBE_KEY));

    match roundtrip {
        Ok(()) => StorageCapability::Available,
        Err(e) => {
            log::debug!("Storage probe failed: {}", e);
            StorageCapability::Unavailable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MemoryStore;

    #[test]
    fn test_probe_available_leaves_no_trace() {
        let store = MemoryStore::new();
        assert_eq!(probe(&store), StorageCapability::Available);
        assert!(store.is_empty());
        assert_eq!(store.op_count(), 2);
    }

    #[test]
    fn test_probe_disabled_store() {
        let store = MemoryStore::disabled();
        assert_eq!(probe(&store), StorageCapability::Unavailable);
    }

    #[test]
    fn test_probe_full_store() {
        // Room for nothing, not even the sentinel
        let store = MemoryStore::with_quota(4);
        assert_eq!(probe(&store), StorageCapability::Unavailable);
        assert!(!probe(&store).is_available());
    }
}
