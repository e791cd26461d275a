//! Device state model and the device registry
//!
//! `types` holds the value types shared by the bridge, the drivers and the
//! consumer side. `registry` tracks which bridges are attached and which one
//! the host currently considers "the" device.

mod registry;
mod types;

pub use registry::DeviceRegistry;
pub use types::{check_value, Channel, DeviceId, DeviceState, StateEvent, CHANNEL_COUNT, MAX_VALUE};
