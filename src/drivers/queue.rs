//! In-memory transport driver
//!
//! [`QueueDriverHandle`] is the producer end: clone it into any thread and
//! push messages. Every [`QueueDriver`] made from a handle drains the same
//! buffer, so a host can tear the driver down and build a fresh one (mode
//! cycling) while producers keep their handle.

use crossbeam::channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{drain_into, Driver};
use crate::bridge::DeviceStateBridge;
use crate::midi::{format_hex, ChannelFilter, MidiMessage};

/// Producer end of an in-memory transport
#[derive(Clone)]
pub struct QueueDriverHandle {
    tx: Sender<MidiMessage>,
    rx: Receiver<MidiMessage>,
    dropped: Arc<AtomicU64>,
}

impl QueueDriverHandle {
    /// Create a transport buffering at most `capacity` messages
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity);
        Self {
            tx,
            rx,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Queue a decoded message; never blocks
    ///
    /// Returns false if the buffer is full and the message was dropped.
    pub fn send(&self, message: MidiMessage) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(message)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Transport buffer full, dropped {}", message);
                false
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Queue raw transport bytes; unparseable packets are ignored
    pub fn send_raw(&self, data: &[u8]) -> bool {
        match MidiMessage::parse(data) {
            Some(message) => self.send(message),
            None => {
                debug!("Ignoring MIDI: {}", format_hex(data));
                false
            }
        }
    }

    /// Messages dropped because the buffer was full
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Build an omni driver draining this transport
    pub fn driver(&self) -> QueueDriver {
        self.driver_with_filter(ChannelFilter::Omni)
    }

    pub fn driver_with_filter(&self, filter: ChannelFilter) -> QueueDriver {
        QueueDriver {
            rx: self.rx.clone(),
            filter,
        }
    }
}

/// Driver draining a [`QueueDriverHandle`] buffer
pub struct QueueDriver {
    rx: Receiver<MidiMessage>,
    filter: ChannelFilter,
}

impl Driver for QueueDriver {
    fn name(&self) -> &str {
        "queue"
    }

    fn pump(&mut self, bridge: &DeviceStateBridge) -> usize {
        drain_into(&self.rx, self.filter, bridge)
    }
}
