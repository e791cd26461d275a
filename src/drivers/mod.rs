//! Transport drivers
//!
//! A driver turns transport traffic into bridge calls. Its producer side
//! (a `midir` callback thread, or any thread holding a queue handle) only
//! buffers messages; [`Driver::pump`] runs in the per-cycle tick and hands the
//! buffered messages to the bridge in arrival order.

pub mod hardware;
pub mod queue;

use crossbeam::channel::Receiver;
use tracing::debug;

use crate::bridge::DeviceStateBridge;
use crate::midi::{ChannelFilter, MidiMessage};

pub use hardware::MidirDriver;
pub use queue::{QueueDriver, QueueDriverHandle};

/// Default capacity of a driver's transport buffer
pub const DEFAULT_BUFFER_CAPACITY: usize = 1024;

/// Driver trait - every transport implements this
///
/// `pump` takes `&mut self`: one driver feeds one bridge from one context.
pub trait Driver: Send {
    /// Driver name for logs (e.g. "midir", "queue")
    fn name(&self) -> &str;

    /// Move buffered transport messages into `bridge`
    ///
    /// Returns the number of messages the bridge accepted.
    fn pump(&mut self, bridge: &DeviceStateBridge) -> usize;

    /// Release transport resources
    ///
    /// Default implementation: nothing to release
    fn shutdown(&mut self) {}
}

/// Hand one decoded message to the bridge
///
/// Rejected messages are dropped here; a malformed transport byte never
/// reaches the consumer.
pub fn dispatch(bridge: &DeviceStateBridge, message: &MidiMessage) -> bool {
    let result = match *message {
        MidiMessage::NoteOn { note, velocity, .. } => bridge.on_discrete_on(note, velocity),
        MidiMessage::NoteOff { note, .. } => bridge.on_discrete_off(note),
        MidiMessage::ControlChange { cc, value, .. } => bridge.on_continuous_change(cc, value),
    };

    match result {
        Ok(()) => true,
        Err(e) => {
            debug!("Dropped {}: {}", message, e);
            false
        }
    }
}

/// Drain the messages buffered in `rx` when the call starts into `bridge`
///
/// Messages queued while draining wait for the next cycle.
pub(crate) fn drain_into(
    rx: &Receiver<MidiMessage>,
    filter: ChannelFilter,
    bridge: &DeviceStateBridge,
) -> usize {
    let mut accepted = 0;
    for message in rx.try_iter().take(rx.len()) {
        if filter.accepts(&message) && dispatch(bridge, &message) {
            accepted += 1;
        }
    }
    accepted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::EventQueue;
    use crate::state::{Channel, DeviceId};
    use std::sync::Arc;

    #[test]
    fn test_dispatch_maps_messages() {
        let (queue, _rx) = EventQueue::new();
        let bridge = DeviceStateBridge::new(DeviceId(1), Arc::new(queue));

        assert!(dispatch(
            &bridge,
            &MidiMessage::NoteOn {
                channel: 0,
                note: 60,
                velocity: 90
            }
        ));
        assert!(dispatch(
            &bridge,
            &MidiMessage::ControlChange {
                channel: 0,
                cc: 74,
                value: 33
            }
        ));

        assert_eq!(bridge.note(Channel::new(60).unwrap()), 90);
        assert_eq!(bridge.control(Channel::new(74).unwrap()), 33);

        assert!(dispatch(&bridge, &MidiMessage::NoteOff { channel: 0, note: 60 }));
        assert_eq!(bridge.note(Channel::new(60).unwrap()), 0);
    }

    /// Sink that queues another transport message for every event it sees
    struct RefillingSink {
        tx: crossbeam::channel::Sender<MidiMessage>,
    }

    impl crate::bridge::StateEventSink for RefillingSink {
        fn queue_event(&self, _event: crate::state::StateEvent) {
            let _ = self.tx.send(MidiMessage::NoteOn {
                channel: 0,
                note: 1,
                velocity: 1,
            });
        }
    }

    #[test]
    fn test_drain_stops_at_buffered_count() {
        let (tx, rx) = crossbeam::channel::unbounded();
        let bridge = DeviceStateBridge::new(DeviceId(1), Arc::new(RefillingSink { tx: tx.clone() }));

        for note in 0..3u8 {
            tx.send(MidiMessage::NoteOff { channel: 0, note }).unwrap();
        }

        // Producer keeps refilling; one pump still ends
        assert_eq!(drain_into(&rx, ChannelFilter::Omni, &bridge), 3);
        assert_eq!(rx.len(), 3);
    }

    #[test]
    fn test_drain_ignores_messages_queued_after_start() {
        let (queue, _rx) = EventQueue::new();
        let bridge = DeviceStateBridge::new(DeviceId(1), Arc::new(queue));
        let (tx, rx) = crossbeam::channel::unbounded();

        tx.send(MidiMessage::NoteOn {
            channel: 0,
            note: 60,
            velocity: 100,
        })
        .unwrap();
        tx.send(MidiMessage::NoteOn {
            channel: 1,
            note: 61,
            velocity: 100,
        })
        .unwrap();

        // Filtered-out messages are consumed but not counted
        assert_eq!(drain_into(&rx, ChannelFilter::Only(0), &bridge), 1);
        assert!(rx.is_empty());
        assert_eq!(bridge.note(Channel::new(61).unwrap()), 0);
    }

    #[test]
    fn test_dispatch_drops_unvalidated_fields() {
        let (queue, rx) = EventQueue::new();
        let bridge = DeviceStateBridge::new(DeviceId(1), Arc::new(queue));

        // Hand-built messages can carry numbers the parser would never produce
        assert!(!dispatch(
            &bridge,
            &MidiMessage::NoteOn {
                channel: 0,
                note: 200,
                velocity: 10
            }
        ));
        assert!(!dispatch(
            &bridge,
            &MidiMessage::ControlChange {
                channel: 0,
                cc: 1,
                value: 255
            }
        ));

        assert!(!bridge.is_dirty());
        assert_eq!(rx.try_iter().count(), 0);
    }
}
