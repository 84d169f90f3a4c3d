//! Arbor Core - shared types for the arbor audio graph runtime
//!
//! This crate holds the vocabulary shared by the producer (control-thread)
//! and consumer (audio-thread) halves of the runtime, with no machinery of
//! its own: values, hashes, instructions, and the node contract.
//!
//! # Core Abstractions
//!
//! ## Values and hashing
//!
//! - [`Value`] - JSON-like dynamic property value (with shared float buffers)
//! - [`NodeHash`] - 31-bit content address of a graph node
//! - [`hash_node`] / [`hash_string`] - the structural hasher
//!
//! ## The wire model
//!
//! - [`Instruction`] - one mutation step in the control → engine stream
//! - [`InstructionBatch`] - an atomically-committed group of instructions
//!
//! ## The node contract
//!
//! - [`AudioNode`] - object-safe trait every processing element implements
//! - [`BlockContext`] - per-block processing context (inputs, outputs, time)
//! - [`PropertyStatus`] - bounded-time result of a property write
//!
//! ## Realtime helpers
//!
//! - [`GainFade`] - linear per-sample gain ramp used for root cross-fades
//! - [`SharedBuffer`] / [`ResourceMap`] - refcounted named sample buffers
//!
//! # no_std Support
//!
//! This crate is `no_std` compatible (with `alloc`). Disable the default
//! `std` feature:
//!
//! ```toml
//! [dependencies]
//! arbor-core = { version = "0.1", default-features = false }
//! ```
//!
//! # Design Principles
//!
//! - **Real-time safe**: nothing here allocates, locks, or blocks once
//!   constructed; construction happens on the control thread
//! - **Deterministic**: hashing and value equality are pure functions of
//!   their inputs, suitable for content addressing

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod fade;
pub mod hash;
pub mod instruction;
pub mod kinds;
pub mod node;
pub mod resource;
pub mod value;

// Re-export main types at crate root
pub use fade::GainFade;
pub use hash::{
    NodeHash, canonical_props, hash_combine, hash_memo_inputs, hash_node, hash_string,
};
pub use instruction::{Instruction, InstructionBatch};
pub use node::{
    AudioNode, BlockContext, MAX_CHILDREN, PropertyStatus, fill_silence, is_reserved_prop,
};
pub use resource::{ResourceMap, SharedBuffer};
pub use value::{Props, Value, props};
