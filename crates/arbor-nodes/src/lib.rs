//! Arbor Nodes - built-in node kinds
//!
//! Implementations of the primitive kinds the runtime registers at init:
//! sources (`const`, `in`, `phasor`, `train`), arithmetic (`add`, `mul`,
//! `sin`), sequencing (`seq`), playback (`sample`), filtering (`biquad`),
//! and analysis passthroughs that report over the event relay (`meter`,
//! `scope`).
//!
//! Every implementation follows the node contract: bounded-time property
//! writes, allocation-free block processing, and optional event drains.
//! [`default_registry`] wires them all into a
//! [`NodeRegistry`](arbor_engine::NodeRegistry) ready for engine
//! construction.
//!
//! # no_std Support
//!
//! The node implementations are `no_std` compatible (with `alloc`); the
//! registry wiring requires `std` (on by default).

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod biquad;
pub mod constant;
pub mod input;
pub mod math;
pub mod meter;
pub mod phasor;
pub mod sample;
pub mod scope;
pub mod seq;
pub mod train;

pub use biquad::Biquad;
pub use constant::Constant;
pub use input::Input;
pub use math::{Add, Mul, Sin};
pub use meter::Meter;
pub use phasor::Phasor;
pub use sample::Sample;
pub use scope::Scope;
pub use seq::Seq;
pub use train::Train;

#[cfg(feature = "std")]
use arbor_engine::{NodeCategory, NodeDescriptor, NodeRegistry};

/// Builds a registry populated with every built-in kind.
#[cfg(feature = "std")]
pub fn default_registry() -> NodeRegistry {
    use arbor_core::kinds;

    let mut registry = NodeRegistry::new();

    registry.register(
        NodeDescriptor {
            kind: kinds::CONST,
            description: "Constant signal from a `value` prop",
            category: NodeCategory::Source,
        },
        |_, _, _| Box::new(Constant::new()),
    );
    registry.register(
        NodeDescriptor {
            kind: kinds::INPUT,
            description: "Hardware input channel passthrough",
            category: NodeCategory::Source,
        },
        |_, _, _| Box::new(Input::new()),
    );
    registry.register(
        NodeDescriptor {
            kind: kinds::ADD,
            description: "Sum of all inputs",
            category: NodeCategory::Math,
        },
        |_, _, _| Box::new(Add::new()),
    );
    registry.register(
        NodeDescriptor {
            kind: kinds::MUL,
            description: "Product of all inputs",
            category: NodeCategory::Math,
        },
        |_, _, _| Box::new(Mul::new()),
    );
    registry.register(
        NodeDescriptor {
            kind: kinds::SIN,
            description: "Sine of the input, in radians",
            category: NodeCategory::Math,
        },
        |_, _, _| Box::new(Sin::new()),
    );
    registry.register(
        NodeDescriptor {
            kind: kinds::PHASOR,
            description: "0..1 ramp at a rate in Hz",
            category: NodeCategory::Source,
        },
        |_, sample_rate, _| Box::new(Phasor::new(sample_rate)),
    );
    registry.register(
        NodeDescriptor {
            kind: kinds::TRAIN,
            description: "Naive pulse train at a rate in Hz",
            category: NodeCategory::Source,
        },
        |_, sample_rate, _| Box::new(Train::new(sample_rate)),
    );
    registry.register(
        NodeDescriptor {
            kind: kinds::SEQ,
            description: "Steps through a `seq` array on rising edges",
            category: NodeCategory::Sequencing,
        },
        |_, _, _| Box::new(Seq::new()),
    );
    registry.register(
        NodeDescriptor {
            kind: kinds::SAMPLE,
            description: "One-shot playback of a named resource",
            category: NodeCategory::Playback,
        },
        |_, _, _| Box::new(Sample::new()),
    );
    registry.register(
        NodeDescriptor {
            kind: kinds::BIQUAD,
            description: "Second-order IIR with per-sample coefficients",
            category: NodeCategory::Filter,
        },
        |_, _, _| Box::new(Biquad::new()),
    );
    registry.register(
        NodeDescriptor {
            kind: kinds::METER,
            description: "Passthrough reporting per-block min/max",
            category: NodeCategory::Analysis,
        },
        |_, _, _| Box::new(Meter::new()),
    );
    registry.register(
        NodeDescriptor {
            kind: kinds::SCOPE,
            description: "Passthrough capturing signal frames",
            category: NodeCategory::Analysis,
        },
        |_, _, block_size| Box::new(Scope::new(block_size)),
    );

    registry
}

/// Shared helpers for node implementations.
pub(crate) mod util {
    use arbor_core::Value;

    /// Extracts an f32 from a numeric prop value.
    pub fn number(value: &Value) -> Option<f32> {
        value.as_number().map(|n| n as f32)
    }

    /// Rising-edge detector over a gate signal.
    #[derive(Debug, Clone, Default)]
    pub struct EdgeDetector {
        prev: f32,
    }

    impl EdgeDetector {
        /// Feeds one gate sample; true on a non-positive → positive edge.
        #[inline]
        pub fn feed(&mut self, gate: f32) -> bool {
            let rising = self.prev <= 0.0 && gate > 0.0;
            self.prev = gate;
            rising
        }

        /// Clears edge memory.
        pub fn reset(&mut self) {
            self.prev = 0.0;
        }
    }
}


#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use arbor_core::kinds;

    #[test]
    fn default_registry_covers_every_builtin_kind() {
        let registry = default_registry();
        for kind in kinds::BUILTIN {
            assert!(registry.contains(kind), "missing builtin kind '{kind}'");
        }
        assert_eq!(registry.len(), kinds::BUILTIN.len());
    }
}
