//! Device state type definitions
//!
//! Channel numbers form a closed 0-127 space for both discrete (note) and
//! continuous (controller) channels. [`Channel`] is the only way into that
//! space, so an out-of-range number can never index the state arrays.

use std::fmt;

use crate::error::{BridgeError, Result};

/// Number of channels of each kind per device
pub const CHANNEL_COUNT: usize = 128;

/// Largest magnitude a channel can hold
pub const MAX_VALUE: u8 = 127;

/// Validated channel number (0-127)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Channel(u8);

impl Channel {
    /// Validate a raw channel number from the transport
    pub fn new(raw: i32) -> Result<Self> {
        if (0..CHANNEL_COUNT as i32).contains(&raw) {
            Ok(Channel(raw as u8))
        } else {
            Err(BridgeError::OutOfRangeChannel(raw))
        }
    }

    /// Channel number (0-127)
    pub fn number(self) -> u8 {
        self.0
    }

    /// Array index for this channel
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Every channel in ascending order
    pub fn all() -> impl Iterator<Item = Channel> {
        (0..CHANNEL_COUNT as u8).map(Channel)
    }
}

impl TryFrom<i32> for Channel {
    type Error = BridgeError;

    fn try_from(raw: i32) -> Result<Self> {
        Channel::new(raw)
    }
}

impl TryFrom<u8> for Channel {
    type Error = BridgeError;

    fn try_from(raw: u8) -> Result<Self> {
        Channel::new(raw as i32)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

/// Reject magnitudes above 127 instead of clamping them
pub fn check_value(value: u8) -> Result<u8> {
    if value > MAX_VALUE {
        Err(BridgeError::OutOfRangeValue(value))
    } else {
        Ok(value)
    }
}

/// Identity of an attached device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeviceId(pub u32);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "midi-device-{}", self.0)
    }
}

/// Plain snapshot of a device's channel values
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceState {
    /// Discrete channel magnitudes (0 = off)
    pub notes: [u8; CHANNEL_COUNT],
    /// Continuous channel values
    pub controls: [u8; CHANNEL_COUNT],
}

impl Default for DeviceState {
    fn default() -> Self {
        Self {
            notes: [0; CHANNEL_COUNT],
            controls: [0; CHANNEL_COUNT],
        }
    }
}

impl DeviceState {
    pub fn note(&self, channel: Channel) -> u8 {
        self.notes[channel.index()]
    }

    pub fn control(&self, channel: Channel) -> u8 {
        self.controls[channel.index()]
    }
}

/// Event delivered to the polling consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateEvent {
    /// A single discrete edge, delivered as soon as it is accepted
    Discrete {
        device: DeviceId,
        channel: Channel,
        value: u8,
    },
    /// Full continuous-channel state, delivered at most once per cycle
    ContinuousSnapshot {
        device: DeviceId,
        controls: Box<[u8; CHANNEL_COUNT]>,
    },
}

impl StateEvent {
    pub fn device(&self) -> DeviceId {
        match self {
            StateEvent::Discrete { device, .. } | StateEvent::ContinuousSnapshot { device, .. } => {
                *device
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_bounds() {
        assert_eq!(Channel::new(0).unwrap().number(), 0);
        assert_eq!(Channel::new(127).unwrap().index(), 127);
        assert_eq!(Channel::new(128), Err(BridgeError::OutOfRangeChannel(128)));
        assert_eq!(Channel::new(-1), Err(BridgeError::OutOfRangeChannel(-1)));
        assert!(Channel::try_from(200u8).is_err());
    }

    #[test]
    fn test_channel_all_covers_space() {
        let all: Vec<Channel> = Channel::all().collect();
        assert_eq!(all.len(), CHANNEL_COUNT);
        assert_eq!(all.first().map(|c| c.number()), Some(0));
        assert_eq!(all.last().map(|c| c.number()), Some(127));
    }

    #[test]
    fn test_check_value() {
        assert_eq!(check_value(0), Ok(0));
        assert_eq!(check_value(127), Ok(127));
        assert_eq!(check_value(128), Err(BridgeError::OutOfRangeValue(128)));
    }

    #[test]
    fn test_display() {
        assert_eq!(Channel::new(7).unwrap().to_string(), "007");
        assert_eq!(DeviceId(3).to_string(), "midi-device-3");
    }
}
