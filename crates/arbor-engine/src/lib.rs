//! Arbor Engine - the realtime half of the runtime
//!
//! This crate executes the dataflow graph the producer describes: it
//! drains instruction batches from the control thread, maintains the live
//! graph store, evaluates nodes in topological order block-by-block, mixes
//! active roots under cross-fades, relays node events back to the control
//! thread, and reclaims unreachable nodes with a generational sweep.
//!
//! # Architecture
//!
//! The engine uses a **two-thread split**: all graph topology lives on the
//! audio thread and the control thread's only writes are indirect, through
//! the bounded [`instruction_channel`]. The audio thread never blocks,
//! never locks, and - in steady state - never allocates.
//!
//! - [`Engine`] - per-block executor ([`Engine::process`])
//! - [`NodeRegistry`] - kind name → node constructor table
//! - [`instruction_channel`] - control → engine batch transport
//! - [`event_channel`] - engine → control event relay
//! - [`RootActivation`] - cross-faded root switching
//!
//! # Example
//!
//! ```rust
//! use arbor_engine::{Engine, EngineOptions, NodeRegistry, event_channel, instruction_channel};
//!
//! let (batch_tx, batch_rx) = instruction_channel(64);
//! let (relay, events) = event_channel(256);
//! let mut engine = Engine::new(
//!     EngineOptions::default(),
//!     NodeRegistry::new(),
//!     batch_rx,
//!     relay,
//! );
//!
//! let mut left = vec![0.0f32; 512];
//! let mut right = vec![0.0f32; 512];
//! let mut outputs: Vec<&mut [f32]> = vec![&mut left, &mut right];
//! engine.process(&[], &mut outputs, 512);
//! # let _ = (batch_tx, events);
//! ```

pub mod activation;
pub mod channel;
pub mod engine;
pub mod events;
pub mod registry;
mod store;

// Re-export main types at crate root
pub use activation::RootActivation;
pub use channel::{BatchReceiver, BatchSender, ChannelError, instruction_channel};
pub use engine::{Engine, EngineOptions};
pub use events::{EngineEvent, EventDrain, EventReceiver, EventRelay, event_channel};
pub use registry::{NodeCategory, NodeDescriptor, NodeFactory, NodeRegistry};
