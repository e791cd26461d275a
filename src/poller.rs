//! StatePoller - consumer side of the bridge
//!
//! Drains the event queue once per cycle and keeps the consumer's view of the
//! device. Discrete edges received during the cycle are kept in order, so a
//! press and release inside one cycle still show up as a tap.
//!
//! The poller follows one device: the one that sent the latest event. When
//! events start arriving from another device, everything known about the
//! previous one is dropped, so a note held on a removed device does not stay
//! pressed.

use crossbeam::channel::Receiver;
use tracing::{debug, trace};

use crate::state::{Channel, DeviceId, DeviceState, StateEvent, MAX_VALUE};

/// What one `poll()` picked up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub discrete_events: usize,
    pub snapshots: usize,
}

impl PollSummary {
    pub fn is_empty(&self) -> bool {
        self.discrete_events == 0 && self.snapshots == 0
    }
}

/// Per-cycle consumer of [`StateEvent`]s
pub struct StatePoller {
    rx: Receiver<StateEvent>,
    device: Option<DeviceId>,
    state: DeviceState,
    edges: Vec<(Channel, u8)>,
}

impl StatePoller {
    pub fn new(rx: Receiver<StateEvent>) -> Self {
        Self {
            rx,
            device: None,
            state: DeviceState::default(),
            edges: Vec::new(),
        }
    }

    /// Apply everything queued since the previous poll
    pub fn poll(&mut self) -> PollSummary {
        self.edges.clear();
        let mut summary = PollSummary::default();

        let rx = self.rx.clone();
        for event in rx.try_iter() {
            self.follow(event.device());
            match event {
                StateEvent::Discrete { channel, value, .. } => {
                    self.state.notes[channel.index()] = value;
                    self.edges.push((channel, value));
                    summary.discrete_events += 1;
                }
                StateEvent::ContinuousSnapshot { controls, .. } => {
                    self.state.controls = *controls;
                    summary.snapshots += 1;
                }
            }
        }

        if !summary.is_empty() {
            trace!(
                "Polled {} edges, {} snapshots",
                summary.discrete_events,
                summary.snapshots
            );
        }
        summary
    }

    /// Switch to `device`, dropping the previous device's state
    fn follow(&mut self, device: DeviceId) {
        if self.device == Some(device) {
            return;
        }
        if let Some(previous) = self.device {
            debug!("Poller switched from {} to {}", previous, device);
        }
        self.device = Some(device);
        self.state = DeviceState::default();
        self.edges.clear();
    }

    /// Device the state belongs to, if any event has been seen
    pub fn device(&self) -> Option<DeviceId> {
        self.device
    }

    /// Discrete value as of the last poll (0 = off)
    pub fn note(&self, channel: Channel) -> u8 {
        self.state.note(channel)
    }

    pub fn is_pressed(&self, channel: Channel) -> bool {
        self.note(channel) > 0
    }

    /// Continuous value as of the last poll
    pub fn control(&self, channel: Channel) -> u8 {
        self.state.control(channel)
    }

    /// Continuous value scaled to 0.0-1.0
    pub fn control_normalized(&self, channel: Channel) -> f32 {
        self.control(channel) as f32 / MAX_VALUE as f32
    }

    /// Discrete edges from the last poll, in arrival order
    pub fn edges(&self) -> &[(Channel, u8)] {
        &self.edges
    }

    /// At least one press on `channel` arrived during the last poll
    pub fn pressed_this_cycle(&self, channel: Channel) -> bool {
        self.edges.iter().any(|&(c, v)| c == channel && v > 0)
    }

    /// At least one release on `channel` arrived during the last poll
    pub fn released_this_cycle(&self, channel: Channel) -> bool {
        self.edges.iter().any(|&(c, v)| c == channel && v == 0)
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::{DeviceStateBridge, EventQueue};
    use crate::state::DeviceId;
    use std::sync::Arc;

    fn setup() -> (DeviceStateBridge, StatePoller) {
        let (queue, rx) = EventQueue::new();
        (
            DeviceStateBridge::new(DeviceId(1), Arc::new(queue)),
            StatePoller::new(rx),
        )
    }

    fn ch(n: i32) -> Channel {
        Channel::new(n).unwrap()
    }

    #[test]
    fn test_tap_within_one_cycle_is_visible() {
        let (bridge, mut poller) = setup();

        bridge.on_discrete_on(60, 100).unwrap();
        bridge.on_discrete_off(60).unwrap();
        bridge.flush();

        let summary = poller.poll();
        assert_eq!(summary.discrete_events, 2);
        assert!(poller.pressed_this_cycle(ch(60)));
        assert!(poller.released_this_cycle(ch(60)));
        assert!(!poller.is_pressed(ch(60)));
    }

    #[test]
    fn test_edges_reset_each_poll() {
        let (bridge, mut poller) = setup();

        bridge.on_discrete_on(40, 70).unwrap();
        poller.poll();
        assert!(poller.pressed_this_cycle(ch(40)));

        let summary = poller.poll();
        assert!(summary.is_empty());
        assert!(!poller.pressed_this_cycle(ch(40)));
        // Held note keeps its value across cycles
        assert_eq!(poller.note(ch(40)), 70);
    }

    #[test]
    fn test_controls_update_only_on_flush() {
        let (bridge, mut poller) = setup();

        bridge.on_continuous_change(7, 127).unwrap();
        poller.poll();
        assert_eq!(poller.control(ch(7)), 0);

        bridge.flush();
        let summary = poller.poll();
        assert_eq!(summary.snapshots, 1);
        assert_eq!(poller.control(ch(7)), 127);
        assert!((poller.control_normalized(ch(7)) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_state_resets_when_device_changes() {
        let (queue, rx) = EventQueue::new();
        let queue = Arc::new(queue);
        let mut poller = StatePoller::new(rx);

        let first = DeviceStateBridge::new(DeviceId(1), queue.clone());
        first.on_discrete_on(60, 100).unwrap();
        first.on_continuous_change(7, 90).unwrap();
        first.flush();
        poller.poll();
        assert_eq!(poller.device(), Some(DeviceId(1)));
        assert!(poller.is_pressed(ch(60)));
        drop(first);

        let second = DeviceStateBridge::new(DeviceId(2), queue);
        second.on_continuous_change(1, 20).unwrap();
        second.flush();
        poller.poll();

        assert_eq!(poller.device(), Some(DeviceId(2)));
        assert!(!poller.is_pressed(ch(60)));
        assert_eq!(poller.control(ch(7)), 0);
        assert_eq!(poller.control(ch(1)), 20);
    }

    #[test]
    fn test_switch_mid_poll_keeps_only_new_device_edges() {
        let (queue, rx) = EventQueue::new();
        let queue = Arc::new(queue);
        let mut poller = StatePoller::new(rx);

        let first = DeviceStateBridge::new(DeviceId(1), queue.clone());
        let second = DeviceStateBridge::new(DeviceId(2), queue);
        first.on_discrete_on(40, 50).unwrap();
        second.on_discrete_on(41, 60).unwrap();
        poller.poll();

        assert_eq!(poller.edges(), &[(ch(41), 60)]);
        assert!(!poller.is_pressed(ch(40)));
        assert_eq!(poller.note(ch(41)), 60);
    }

    #[test]
    fn test_edges_keep_arrival_order() {
        let (bridge, mut poller) = setup();

        bridge.on_discrete_on(60, 100).unwrap();
        bridge.on_discrete_off(60).unwrap();
        bridge.on_discrete_on(60, 80).unwrap();
        poller.poll();

        assert_eq!(poller.edges(), &[(ch(60), 100), (ch(60), 0), (ch(60), 80)]);
        assert_eq!(poller.note(ch(60)), 80);
    }
}
