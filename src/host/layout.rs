//! Device capability layout and matching

use parking_lot::Mutex;
use tracing::info;

use super::LayoutRegistry;
use crate::state::{Channel, CHANNEL_COUNT};

/// Interface tag carried by every bridge-managed device
pub const BRIDGE_INTERFACE: &str = "MidiStateBridge";

/// Capability layout: 128 buttons (notes) and 128 axes (controllers)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLayout {
    pub display_name: String,
    /// Button control names, indexed by discrete channel
    pub buttons: Vec<String>,
    /// Axis control names, indexed by continuous channel
    pub axes: Vec<String>,
}

impl DeviceLayout {
    /// The standard layout (`note000`..`note127`, `control000`..`control127`)
    pub fn midi_device() -> Self {
        Self {
            display_name: "MIDI Device".to_string(),
            buttons: Channel::all().map(|c| format!("note{}", c)).collect(),
            axes: Channel::all().map(|c| format!("control{}", c)).collect(),
        }
    }

    /// Button control name, if the layout covers `channel`
    pub fn button_name(&self, channel: Channel) -> Option<&str> {
        self.buttons.get(channel.index()).map(String::as_str)
    }

    /// Axis control name, if the layout covers `channel`
    pub fn axis_name(&self, channel: Channel) -> Option<&str> {
        self.axes.get(channel.index()).map(String::as_str)
    }

    /// True when both arrays cover the full channel space
    pub fn is_complete(&self) -> bool {
        self.buttons.len() == CHANNEL_COUNT && self.axes.len() == CHANNEL_COUNT
    }
}

/// Device-matching criterion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceMatcher {
    pub interface: String,
}

impl DeviceMatcher {
    pub fn with_interface(interface: &str) -> Self {
        Self {
            interface: interface.to_string(),
        }
    }

    /// Interface tags compare case-insensitively
    pub fn matches(&self, interface: &str) -> bool {
        self.interface.eq_ignore_ascii_case(interface)
    }
}

/// Layout registry that just records registrations
#[derive(Default)]
pub struct InMemoryLayoutRegistry {
    entries: Mutex<Vec<(DeviceLayout, DeviceMatcher)>>,
}

impl InMemoryLayoutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registrations received so far
    pub fn registration_count(&self) -> usize {
        self.entries.lock().len()
    }

    /// Layout registered for a device reporting `interface`
    pub fn find_for_interface(&self, interface: &str) -> Option<DeviceLayout> {
        self.entries
            .lock()
            .iter()
            .find(|(_, matcher)| matcher.matches(interface))
            .map(|(layout, _)| layout.clone())
    }
}

impl LayoutRegistry for InMemoryLayoutRegistry {
    fn register_layout(&self, layout: &DeviceLayout, matcher: &DeviceMatcher) {
        info!(
            "Registered layout '{}' for interface '{}'",
            layout.display_name, matcher.interface
        );
        self.entries.lock().push((layout.clone(), matcher.clone()));
    }
}
