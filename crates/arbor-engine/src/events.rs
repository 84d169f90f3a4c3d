//! The engine → control event relay.
//!
//! Node implementations emit `(topic, payload)` pairs when their events
//! are drained at the end of each block; the relay buffers them in a
//! bounded queue the control thread polls outside the audio callback.
//!
//! Overflow policy: drop oldest. When the queue is full the emitting side
//! pops one stale event, sets a one-shot overflow flag, and retries once.
//! The flag is surfaced (and cleared) by the next [`EventReceiver::poll`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};

use arbor_core::Value;

/// One relayed event.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineEvent {
    /// Event topic (`meter`, `scope`, `error`, or user-defined).
    pub topic: String,
    /// Topic-specific payload.
    pub payload: Value,
}

/// Audio-side handle: buffers events emitted during a block.
#[derive(Debug)]
pub struct EventRelay {
    tx: Sender<EngineEvent>,
    /// Held so the emitter can drop the oldest entry on overflow.
    rx: Receiver<EngineEvent>,
    overflow: Arc<AtomicBool>,
}

impl EventRelay {
    /// Buffers one event, dropping the oldest pending event on overflow.
    pub fn emit(&self, topic: &str, payload: Value) {
        let event = EngineEvent {
            topic: topic.into(),
            payload,
        };
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                let _ = self.rx.try_recv();
                self.overflow.store(true, Ordering::Relaxed);
                let _ = self.tx.try_send(event);
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

/// Result of one control-side drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventDrain {
    /// Events delivered to the callback.
    pub count: usize,
    /// True when any event was dropped since the previous drain.
    pub overflowed: bool,
}

/// Control-side handle: drains relayed events.
#[derive(Debug)]
pub struct EventReceiver {
    rx: Receiver<EngineEvent>,
    overflow: Arc<AtomicBool>,
}

impl EventReceiver {
    /// Drains every pending event into `callback`, clearing and reporting
    /// the overflow flag.
    pub fn poll(&self, mut callback: impl FnMut(&str, &Value)) -> EventDrain {
        let mut count = 0;
        while let Ok(event) = self.rx.try_recv() {
            callback(&event.topic, &event.payload);
            count += 1;
        }
        EventDrain {
            count,
            overflowed: self.overflow.swap(false, Ordering::Relaxed),
        }
    }
}

/// Creates the event relay with room for `capacity` pending events.
pub fn event_channel(capacity: usize) -> (EventRelay, EventReceiver) {
    let (tx, rx) = bounded(capacity);
    let overflow = Arc::new(AtomicBool::new(false));
    (
        EventRelay {
            tx,
            rx: rx.clone(),
            overflow: Arc::clone(&overflow),
        },
        EventReceiver { rx, overflow },
    )
}
