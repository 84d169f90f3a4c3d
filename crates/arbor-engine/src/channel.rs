//! The instruction channel.
//!
//! A bounded single-producer/single-consumer queue of
//! [`InstructionBatch`]es. The control side enqueues one batch per commit
//! with a non-blocking `try_send`; the audio side drains zero-or-more
//! batches at the top of each process block with `try_recv`. Neither side
//! ever blocks, and the bounded ring means no allocation happens on either
//! side after construction.
//!
//! Batches are observed in commit order; instructions within a batch in
//! emission order.

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};
use thiserror::Error;

use arbor_core::InstructionBatch;

/// Failure to enqueue a batch.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChannelError {
    /// The queue is full; the engine has not drained recent commits.
    #[error("instruction channel is full")]
    Full,
    /// The engine side has been dropped.
    #[error("instruction channel is disconnected")]
    Disconnected,
}

/// Control-side handle: enqueues committed batches.
#[derive(Debug, Clone)]
pub struct BatchSender {
    tx: Sender<InstructionBatch>,
}

impl BatchSender {
    /// Enqueues a batch without blocking.
    pub fn send(&self, batch: InstructionBatch) -> Result<(), ChannelError> {
        match self.tx.try_send(batch) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(ChannelError::Full),
            Err(TrySendError::Disconnected(_)) => Err(ChannelError::Disconnected),
        }
    }
}

/// Engine-side handle: drains batches at the top of each block.
#[derive(Debug)]
pub struct BatchReceiver {
    rx: Receiver<InstructionBatch>,
}

impl BatchReceiver {
    /// Dequeues the next pending batch, if any. Never blocks.
    pub fn try_recv(&self) -> Option<InstructionBatch> {
        match self.rx.try_recv() {
            Ok(batch) => Some(batch),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }
}

/// Creates the instruction channel with room for `capacity` batches.
pub fn instruction_channel(capacity: usize) -> (BatchSender, BatchReceiver) {
    let (tx, rx) = bounded(capacity);
    (BatchSender { tx }, BatchReceiver { rx })
}
