//! DeviceRegistry - attached bridges plus the "current" device selection
//!
//! The registry owns the attached bridges; the selection is only a key into
//! that map, so it can never keep a removed device alive.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use super::types::DeviceId;
use crate::bridge::DeviceStateBridge;

#[derive(Default)]
struct RegistryInner {
    devices: HashMap<DeviceId, Arc<DeviceStateBridge>>,
    selected: Option<DeviceId>,
}

/// Tracks attached devices and which one is current
#[derive(Default)]
pub struct DeviceRegistry {
    inner: RwLock<RegistryInner>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hot-add: attach a bridge (replaces any bridge with the same id)
    pub fn add(&self, bridge: Arc<DeviceStateBridge>) {
        let id = bridge.id();
        self.inner.write().devices.insert(id, bridge);
        info!("Device attached: {}", id);
    }

    /// Hot-remove: detach a bridge
    ///
    /// The selection is cleared only when it still points at `id`.
    pub fn remove(&self, id: DeviceId) -> Option<Arc<DeviceStateBridge>> {
        let mut inner = self.inner.write();
        let removed = inner.devices.remove(&id);

        if removed.is_some() {
            info!("Device removed: {}", id);
        }

        if inner.selected == Some(id) {
            inner.selected = None;
            debug!("Current device cleared ({} removed)", id);
        }

        removed
    }

    /// Mark an attached device as current
    ///
    /// Returns false (and leaves the selection alone) for unknown ids.
    pub fn make_current(&self, id: DeviceId) -> bool {
        let mut inner = self.inner.write();
        if !inner.devices.contains_key(&id) {
            debug!("Ignoring selection of unknown device {}", id);
            return false;
        }

        inner.selected = Some(id);
        debug!("Current device: {}", id);
        true
    }

    /// The device most recently marked current, if still attached
    pub fn current(&self) -> Option<Arc<DeviceStateBridge>> {
        let inner = self.inner.read();
        inner
            .selected
            .and_then(|id| inner.devices.get(&id))
            .cloned()
    }

    pub fn current_id(&self) -> Option<DeviceId> {
        self.inner.read().selected
    }

    pub fn get(&self, id: DeviceId) -> Option<Arc<DeviceStateBridge>> {
        self.inner.read().devices.get(&id).cloned()
    }

    /// Attached device ids in ascending order
    pub fn ids(&self) -> Vec<DeviceId> {
        let mut ids: Vec<DeviceId> = self.inner.read().devices.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.inner.read().devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().devices.is_empty()
    }
}
