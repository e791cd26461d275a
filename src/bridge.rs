//! DeviceStateBridge - per-device state buffer between the transport and the poller
//!
//! The driver callback context writes into the bridge; the per-cycle tick
//! flushes it. The two kinds of channel are delivered differently:
//!
//! - **Discrete** (notes): every accepted edge is queued to the consumer
//!   immediately, so a press and release inside one cycle are both observed.
//! - **Continuous** (controllers): the value is stored and the bridge is marked
//!   dirty. `flush()` sends one snapshot of all 128 values per cycle, and
//!   nothing at all while the bridge stays clean.
//!
//! Values live in atomics. The producer is the only writer of the arrays and
//! the only setter of the dirty flag; `flush()` is the only clearer.

use crossbeam::channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use tracing::trace;

use crate::error::Result;
use crate::state::{check_value, Channel, DeviceId, DeviceState, StateEvent, CHANNEL_COUNT};

/// Consumer-facing event queue
pub trait StateEventSink: Send + Sync {
    /// Queue an event for the consumer; must not block
    fn queue_event(&self, event: StateEvent);
}

/// Default sink: an unbounded crossbeam channel drained by the poller
#[derive(Clone)]
pub struct EventQueue {
    tx: Sender<StateEvent>,
}

impl EventQueue {
    /// Create a queue and the receiver the consumer polls
    pub fn new() -> (Self, Receiver<StateEvent>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }
}

impl StateEventSink for EventQueue {
    fn queue_event(&self, event: StateEvent) {
        if self.tx.send(event).is_err() {
            trace!("State event dropped: consumer receiver is gone");
        }
    }
}

/// Canonical state buffer for one device
pub struct DeviceStateBridge {
    id: DeviceId,
    notes: [AtomicU8; CHANNEL_COUNT],
    controls: [AtomicU8; CHANNEL_COUNT],
    controls_dirty: AtomicBool,
    sink: Arc<dyn StateEventSink>,
}

impl DeviceStateBridge {
    pub fn new(id: DeviceId, sink: Arc<dyn StateEventSink>) -> Self {
        Self {
            id,
            notes: std::array::from_fn(|_| AtomicU8::new(0)),
            controls: std::array::from_fn(|_| AtomicU8::new(0)),
            controls_dirty: AtomicBool::new(false),
            sink,
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    // =========================================================================
    // Producer side (driver callback context)
    // =========================================================================

    /// Discrete channel pressed with `magnitude` (1-127)
    ///
    /// Re-triggering a held channel overwrites the magnitude and emits again.
    /// A magnitude of 0 is a release, as on the wire.
    pub fn on_discrete_on(&self, channel: impl Into<i32>, magnitude: u8) -> Result<()> {
        let channel = Channel::new(channel.into())?;
        let magnitude = check_value(magnitude)?;
        self.set_discrete(channel, magnitude);
        Ok(())
    }

    /// Discrete channel released
    pub fn on_discrete_off(&self, channel: impl Into<i32>) -> Result<()> {
        let channel = Channel::new(channel.into())?;
        self.set_discrete(channel, 0);
        Ok(())
    }

    /// Continuous channel moved to `value` (0-127); deferred until `flush()`
    pub fn on_continuous_change(&self, channel: impl Into<i32>, value: u8) -> Result<()> {
        let channel = Channel::new(channel.into())?;
        let value = check_value(value)?;

        self.controls[channel.index()].store(value, Ordering::Relaxed);
        // Release pairs with the AcqRel swap in flush(): a flush that sees the
        // flag also sees the value.
        self.controls_dirty.store(true, Ordering::Release);
        Ok(())
    }

    fn set_discrete(&self, channel: Channel, value: u8) {
        self.notes[channel.index()].store(value, Ordering::Release);
        self.sink.queue_event(StateEvent::Discrete {
            device: self.id,
            channel,
            value,
        });
    }

    // =========================================================================
    // Tick side (once per poll cycle)
    // =========================================================================

    /// Emit one continuous snapshot if anything changed since the last flush
    ///
    /// Returns true when a snapshot was emitted. The flag is cleared before the
    /// values are read, so a write racing with the flush is either in this
    /// snapshot or re-marks the bridge dirty for the next cycle.
    pub fn flush(&self) -> bool {
        if !self.controls_dirty.swap(false, Ordering::AcqRel) {
            return false;
        }

        let controls = Box::new(self.continuous_values());
        self.sink.queue_event(StateEvent::ContinuousSnapshot {
            device: self.id,
            controls,
        });
        trace!("{}: continuous snapshot flushed", self.id);
        true
    }

    // =========================================================================
    // Live reads
    // =========================================================================

    /// Current discrete value (0 = off)
    pub fn note(&self, channel: Channel) -> u8 {
        self.notes[channel.index()].load(Ordering::Acquire)
    }

    /// Current continuous value, including changes not yet flushed
    pub fn control(&self, channel: Channel) -> u8 {
        self.controls[channel.index()].load(Ordering::Relaxed)
    }

    /// True while continuous changes are waiting for a flush
    pub fn is_dirty(&self) -> bool {
        self.controls_dirty.load(Ordering::Acquire)
    }

    /// Copy of both channel arrays
    pub fn snapshot(&self) -> DeviceState {
        DeviceState {
            notes: std::array::from_fn(|i| self.notes[i].load(Ordering::Acquire)),
            controls: self.continuous_values(),
        }
    }

    fn continuous_values(&self) -> [u8; CHANNEL_COUNT] {
        std::array::from_fn(|i| self.controls[i].load(Ordering::Relaxed))
    }
}

impl std::fmt::Debug for DeviceStateBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceStateBridge")
            .field("id", &self.id)
            .field("dirty", &self.is_dirty())
            .finish()
    }
}
