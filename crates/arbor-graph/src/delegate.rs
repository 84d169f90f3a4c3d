//! The instruction sink consumed by the reconciler.
//!
//! The reconciler does not know how instructions travel - it calls a
//! [`RenderDelegate`] and the host decides whether that buffers into a
//! channel (the runtime does), records for inspection ([`RecordingDelegate`]),
//! or drives something else entirely.

use arbor_core::{Instruction, InstructionBatch, NodeHash, Value};

/// Receives the instruction stream emitted by a render pass.
///
/// Calls arrive in a fixed discipline: `create_node` always precedes any
/// `append_child` referencing the node, every render pass terminates with
/// exactly one `commit_updates`, and a batch must ship atomically at that
/// commit - never earlier.
pub trait RenderDelegate {
    /// A node new to the committed graph.
    fn create_node(&mut self, hash: NodeHash, kind: &str);

    /// A node the producer-side GC reclaimed.
    fn delete_node(&mut self, hash: NodeHash);

    /// An edge from `parent` to output `channel` of `child`.
    fn append_child(&mut self, parent: NodeHash, child: NodeHash, channel: u16);

    /// A new-or-changed property value.
    fn set_property(&mut self, hash: NodeHash, key: &str, value: &Value);

    /// The audible root set changed.
    fn activate_roots(&mut self, roots: &[NodeHash], fade_in_ms: f64, fade_out_ms: f64);

    /// Terminates the batch; ship everything buffered since the last call.
    fn commit_updates(&mut self);
}

/// A delegate that records committed batches for inspection.
///
/// Useful in tests and host diagnostics: render against it, then assert
/// on the emitted instruction stream.
#[derive(Debug, Default)]
pub struct RecordingDelegate {
    pending: InstructionBatch,
    committed: Vec<InstructionBatch>,
}

impl RecordingDelegate {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Batches committed so far, oldest first.
    pub fn batches(&self) -> &[InstructionBatch] {
        &self.committed
    }

    /// The most recent committed batch.
    pub fn last_batch(&self) -> Option<&InstructionBatch> {
        self.committed.last()
    }

    /// Removes and returns all committed batches.
    pub fn take_batches(&mut self) -> Vec<InstructionBatch> {
        std::mem::take(&mut self.committed)
    }
}

impl RenderDelegate for RecordingDelegate {
    fn create_node(&mut self, hash: NodeHash, kind: &str) {
        self.pending.push(Instruction::CreateNode {
            hash,
            kind: kind.into(),
        });
    }

    fn delete_node(&mut self, hash: NodeHash) {
        self.pending.push(Instruction::DeleteNode { hash });
    }

    fn append_child(&mut self, parent: NodeHash, child: NodeHash, channel: u16) {
        self.pending.push(Instruction::AppendChild {
            parent,
            child,
            channel,
        });
    }

    fn set_property(&mut self, hash: NodeHash, key: &str, value: &Value) {
        self.pending.push(Instruction::SetProperty {
            hash,
            key: key.into(),
            value: value.clone(),
        });
    }

    fn activate_roots(&mut self, roots: &[NodeHash], fade_in_ms: f64, fade_out_ms: f64) {
        self.pending.push(Instruction::ActivateRoots {
            roots: roots.to_vec(),
            fade_in_ms,
            fade_out_ms,
        });
    }

    fn commit_updates(&mut self) {
        self.pending.push(Instruction::CommitUpdates);
        self.committed.push(std::mem::take(&mut self.pending));
    }
}
