//! The node contract.
//!
//! Every primitive kind the engine can instantiate implements
//! [`AudioNode`]: a bounded-time property sink, a per-block process
//! function, and an optional event drain. Implementations are constructed
//! on the audio thread when a `CREATE_NODE` instruction is applied and are
//! owned by the graph store from then on.
//!
//! # Real-time constraints
//!
//! [`AudioNode::process`] runs inside the audio callback: it must not
//! allocate, lock, or block. [`AudioNode::set_property`] is also applied on
//! the audio thread (instruction application happens at the top of a
//! block) and must be bounded-time - typically a field store.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::resource::ResourceMap;
use crate::value::Value;

/// Maximum number of children a node value may declare.
pub const MAX_CHILDREN: usize = 8;

/// Props that address identity rather than behavior.
///
/// The reconciler forwards every prop it sees, including `key` and
/// `memoKey`; implementations accept these silently.
pub fn is_reserved_prop(key: &str) -> bool {
    matches!(key, "key" | "memoKey")
}

/// Result of a property write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyStatus {
    /// The property was accepted.
    Ok,
    /// The value had the wrong type for this property.
    InvalidType,
    /// The value had the right type but an unusable value.
    InvalidValue,
    /// The property name is not one this kind understands.
    ///
    /// Tolerated - the engine surfaces it as an `error` event and moves on.
    UnknownKey,
}

impl PropertyStatus {
    /// True for [`PropertyStatus::Ok`].
    pub const fn is_ok(self) -> bool {
        matches!(self, PropertyStatus::Ok)
    }

    /// Short human-readable description, used in `error` event payloads.
    pub const fn describe(self) -> &'static str {
        match self {
            PropertyStatus::Ok => "ok",
            PropertyStatus::InvalidType => "invalid property type",
            PropertyStatus::InvalidValue => "invalid property value",
            PropertyStatus::UnknownKey => "unknown property",
        }
    }
}

/// Per-block processing context handed to [`AudioNode::process`].
///
/// `inputs` holds one precomputed plane per inbound edge, in edge order,
/// each `frames` long. `outputs` holds this node's own planes (one per
/// [`AudioNode::num_outputs`]), preallocated to the block size; the node
/// writes the first `frames` samples of each.
pub struct BlockContext<'a> {
    /// Child output planes, one per inbound edge, each `frames` long.
    pub inputs: &'a [&'a [f32]],
    /// This node's output planes. Write `[0..frames]` of each.
    pub outputs: &'a mut [Vec<f32>],
    /// Frames to produce this block (≤ the configured block size).
    pub frames: usize,
    /// Sample rate the engine was constructed with.
    pub sample_rate: f32,
    /// Rolling sample counter at the start of this block. Monotonic.
    pub sample_time: i64,
}

/// A polymorphic processing element.
///
/// Object-safe: the engine stores `Box<dyn AudioNode>` and the registry
/// maps kind names to constructors.
pub trait AudioNode: Send {
    /// Applies a committed property write.
    ///
    /// `resources` is the engine's shared resource map, for kinds that
    /// bind named buffers (e.g. a `path` prop). Must be bounded-time.
    fn set_property(&mut self, key: &str, value: &Value, resources: &ResourceMap)
    -> PropertyStatus;

    /// Produces one block of output from precomputed inputs.
    ///
    /// Must not allocate, lock, or block. A node that cannot produce
    /// meaningful output this block fills its outputs with zeros.
    fn process(&mut self, ctx: &mut BlockContext<'_>);

    /// Drains any pending readout events.
    ///
    /// Called once per block after [`process`](Self::process); `emit`
    /// buffers `(topic, payload)` pairs into the engine's outbound relay.
    fn process_events(&mut self, emit: &mut dyn FnMut(&str, Value)) {
        let _ = emit;
    }

    /// Number of output planes this node produces. Defaults to one.
    fn num_outputs(&self) -> usize {
        1
    }

    /// Clears transient state (phase, delay memory, one-shot flags)
    /// without touching committed properties.
    fn reset(&mut self) {}
}

/// Zero-fills the first `frames` samples of every output plane.
///
/// The standard fallback for a node with nothing meaningful to produce.
pub fn fill_silence(outputs: &mut [Vec<f32>], frames: usize) {
    for plane in outputs.iter_mut() {
        for sample in &mut plane[..frames] {
            *sample = 0.0;
        }
    }
}
