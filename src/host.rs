//! Host collaborator interfaces
//!
//! The bridge never touches the host's internals. It sees two seams:
//!
//! - [`LayoutRegistry`]: one-time registration of the device capability layout
//!   together with a matcher that identifies bridge-managed devices.
//! - [`PhaseScheduler`]: "insert this callback at that named extension point"
//!   in the host's per-cycle phase list.
//!
//! [`CycleLoop`] and [`InMemoryLayoutRegistry`] are small reference hosts used
//! by the binary and the tests.

mod cycle;
mod layout;

use std::sync::Arc;

pub use cycle::CycleLoop;
pub use layout::{DeviceLayout, DeviceMatcher, InMemoryLayoutRegistry, BRIDGE_INTERFACE};

/// Callback run once per host cycle
pub type CycleHook = Arc<dyn Fn() + Send + Sync>;

/// Phase that processes incoming hardware input; the bridge hook runs at its end
pub const EARLY_UPDATE: &str = "EarlyUpdate";

/// Phase that consumes device state for the cycle
pub const UPDATE: &str = "Update";

/// Host device registry
pub trait LayoutRegistry: Send + Sync {
    /// Associate `layout` with devices accepted by `matcher`
    fn register_layout(&self, layout: &DeviceLayout, matcher: &DeviceMatcher);
}

/// Host per-cycle scheduler
pub trait PhaseScheduler: Send + Sync {
    /// Append `hook` to the end of the named phase
    ///
    /// Returns false when the host has no phase with that name.
    fn insert_hook(&self, phase: &str, hook: CycleHook) -> bool;
}
