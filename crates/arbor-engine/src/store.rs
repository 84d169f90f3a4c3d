//! Engine-side graph storage.
//!
//! The store is owned exclusively by the audio thread. It maps content
//! hashes to live node records - the boxed implementation, the committed
//! inbound edge list, and GC bookkeeping - and keeps each node's output
//! planes in a parallel map so the executor can temporarily move a node's
//! buffers out while reading its children's.

use std::collections::HashMap;

use arbor_core::{AudioNode, NodeHash};

/// One live node.
pub(crate) struct LiveNode {
    /// Resolved primitive kind (composites never reach the engine).
    pub kind: String,
    /// The processing implementation.
    pub node: Box<dyn AudioNode>,
    /// Ordered inbound edges: `(child, child output channel)`.
    pub inbound: Vec<(NodeHash, u16)>,
    /// Number of inbound edges elsewhere in the graph pointing here.
    pub refs: usize,
    /// Unreachable sweeps survived; 0 while reachable.
    pub generation: u32,
    /// Set by `DELETE_NODE` while the node is still referenced; a
    /// re-`CREATE_NODE` revives instead of erroring.
    pub doomed: bool,
}

/// Hash-keyed live nodes plus their output planes.
pub(crate) struct GraphStore {
    pub nodes: HashMap<NodeHash, LiveNode>,
    /// Output planes per node: `num_outputs` buffers of `block_size`.
    pub buffers: HashMap<NodeHash, Vec<Vec<f32>>>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            buffers: HashMap::new(),
        }
    }

    /// Inserts a freshly constructed node with zeroed output planes.
    pub fn insert(&mut self, hash: NodeHash, kind: String, node: Box<dyn AudioNode>, block_size: usize) {
        let planes = node.num_outputs().max(1);
        self.nodes.insert(
            hash,
            LiveNode {
                kind,
                node,
                inbound: Vec::new(),
                refs: 0,
                generation: 0,
                doomed: false,
            },
        );
        self.buffers.insert(hash, vec![vec![0.0; block_size]; planes]);
    }

    /// Removes a node and its buffers, releasing its hold on children.
    pub fn remove(&mut self, hash: NodeHash) -> bool {
        let Some(live) = self.nodes.remove(&hash) else {
            return false;
        };
        self.buffers.remove(&hash);
        for (child, _) in live.inbound {
            if let Some(c) = self.nodes.get_mut(&child) {
                c.refs = c.refs.saturating_sub(1);
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }
}
