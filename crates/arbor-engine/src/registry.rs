//! Node-kind registry and factory.
//!
//! The engine resolves `CREATE_NODE` instructions through a
//! [`NodeRegistry`]: kind name → metadata + constructor. The runtime seeds
//! it with the built-in kinds and hosts extend it with their own before
//! engine construction.

use std::collections::HashMap;

use arbor_core::{AudioNode, NodeHash};

/// Category of node kind, for organization and host UIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeCategory {
    /// Signal sources (constants, ramps, hardware input).
    Source,
    /// Arithmetic over input signals.
    Math,
    /// Filters and other stateful signal shapers.
    Filter,
    /// Triggers and sequencing.
    Sequencing,
    /// Sample playback.
    Playback,
    /// Passthroughs that report measurements as events.
    Analysis,
}

impl NodeCategory {
    /// Returns a human-readable name for the category.
    pub const fn name(&self) -> &'static str {
        match self {
            NodeCategory::Source => "Source",
            NodeCategory::Math => "Math",
            NodeCategory::Filter => "Filter",
            NodeCategory::Sequencing => "Sequencing",
            NodeCategory::Playback => "Playback",
            NodeCategory::Analysis => "Analysis",
        }
    }
}

/// Describes a registered node kind.
#[derive(Debug, Clone)]
pub struct NodeDescriptor {
    /// Kind name as it appears in values and instructions.
    pub kind: &'static str,
    /// Brief description of the kind.
    pub description: &'static str,
    /// Category for organization.
    pub category: NodeCategory,
}

/// Factory function type for constructing node implementations.
///
/// Arguments are the node's content hash, the engine sample rate, and the
/// block size.
pub type NodeFactory = fn(NodeHash, f32, usize) -> Box<dyn AudioNode>;

struct RegistryEntry {
    descriptor: NodeDescriptor,
    factory: NodeFactory,
}

/// Registry of instantiable node kinds.
#[derive(Default)]
pub struct NodeRegistry {
    entries: HashMap<&'static str, RegistryEntry>,
}

impl NodeRegistry {
    /// Creates an empty registry.
    ///
    /// Most hosts want `arbor_nodes::default_registry()` instead, which
    /// pre-registers the built-in kinds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a kind.
    pub fn register(&mut self, descriptor: NodeDescriptor, factory: NodeFactory) {
        self.entries
            .insert(descriptor.kind, RegistryEntry { descriptor, factory });
    }

    /// Constructs the implementation registered for `kind`.
    ///
    /// Returns `None` for unknown kinds - the engine logs and suppresses
    /// the node.
    pub fn create(
        &self,
        kind: &str,
        hash: NodeHash,
        sample_rate: f32,
        block_size: usize,
    ) -> Option<Box<dyn AudioNode>> {
        self.entries
            .get(kind)
            .map(|entry| (entry.factory)(hash, sample_rate, block_size))
    }

    /// True when `kind` is registered.
    pub fn contains(&self, kind: &str) -> bool {
        self.entries.contains_key(kind)
    }

    /// Iterates registered kind names.
    pub fn kinds(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.keys().copied()
    }

    /// Looks up a kind's descriptor.
    pub fn descriptor(&self, kind: &str) -> Option<&NodeDescriptor> {
        self.entries.get(kind).map(|entry| &entry.descriptor)
    }

    /// Number of registered kinds.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no kinds are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl core::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NodeRegistry")
            .field("kinds", &self.entries.len())
            .finish()
    }
}
