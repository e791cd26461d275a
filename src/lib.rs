//! MIDI State Bridge
//!
//! Turns MIDI note and control traffic into device state that a host can
//! poll once per update cycle. Notes are delivered as discrete point events;
//! control changes are coalesced and delivered as at most one snapshot per
//! cycle. The [`wrangler::LifecycleWrangler`] installs the bridge into a host
//! loop and owns the driver+bridge pair across host mode changes.

pub mod bridge;
pub mod config;
pub mod drivers;
pub mod error;
pub mod host;
pub mod midi;
pub mod poller;
pub mod state;
pub mod wrangler;

pub use bridge::{DeviceStateBridge, EventQueue, StateEventSink};
pub use error::{BridgeError, Result};
pub use poller::StatePoller;
pub use state::{Channel, DeviceId, DeviceRegistry, DeviceState, StateEvent};
pub use wrangler::{HostMode, HostNotification, HostServices, LifecycleWrangler, WranglerState};
