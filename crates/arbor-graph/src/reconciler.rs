//! The graph reconciler.
//!
//! [`Reconciler::render_with_delegate`] turns a forest of root values into
//! the minimal instruction batch that carries the committed engine graph
//! from its previous shape to the new one. It works in two passes:
//!
//! 1. **Resolve** - walk each root, expanding composite thunks, replacing
//!    bare-number children with synthetic `const` nodes, hashing bottom-up,
//!    and validating kinds and child counts. This pass is pure: any error
//!    aborts the render with nothing emitted and no retained state touched.
//! 2. **Emit** - walk the resolved forest children-first, emitting
//!    `CREATE_NODE`/`APPEND_CHILD` for hashes the committed graph has not
//!    seen, diffing props against the retained snapshot and emitting
//!    `SET_PROPERTY` for changes, then `ACTIVATE_ROOTS` when the root set
//!    differs from the active one, then `COMMIT_UPDATES`.
//!
//! The reconciler owns the retained previous-graph map (props snapshots,
//! generation stamps, active roots) - the control thread's half of the
//! shared state model. The engine keeps its own mirror and never sees this
//! one.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use arbor_core::{NodeHash, Props, Value, hash_node, kinds, props};

use crate::delegate::RenderDelegate;
use crate::error::GraphError;
use crate::value::{
    ChildRef, CompositeArgs, NodeKind, NodeValue, RenderContext, ResolvedMap, ResolvedNode,
};

/// Default number of sweeps a node survives unreferenced before the
/// producer-side GC reclaims it.
pub const DEFAULT_TERMINAL_GENERATION: u32 = 4;

/// Per-pass counters returned by a render call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderStats {
    /// `CREATE_NODE` instructions emitted.
    pub nodes_added: usize,
    /// `APPEND_CHILD` instructions emitted.
    pub edges_added: usize,
    /// `SET_PROPERTY` instructions emitted.
    pub props_written: usize,
    /// Wall-clock time spent in the render call, in milliseconds.
    pub elapsed_ms: f64,
}

/// Retained snapshot of one committed node.
struct ShadowNode {
    props: Props,
    /// 0 when the last render reached this node; incremented per GC sweep
    /// while unreferenced.
    generation: u32,
}

/// Diffs successive render trees into instruction batches.
pub struct Reconciler {
    nodes: HashMap<NodeHash, ShadowNode>,
    active_roots: Vec<NodeHash>,
    known_kinds: HashSet<String>,
    terminal_generation: u32,
    context: RenderContext,
}

impl Reconciler {
    /// Creates a reconciler that recognizes the built-in kinds.
    pub fn new(context: RenderContext) -> Self {
        Self {
            nodes: HashMap::new(),
            active_roots: Vec::new(),
            known_kinds: kinds::BUILTIN.iter().map(|k| String::from(*k)).collect(),
            terminal_generation: DEFAULT_TERMINAL_GENERATION,
            context,
        }
    }

    /// Adds a host-registered kind name to the kind table.
    ///
    /// Render calls reject primitives whose kind is not in the table, so
    /// every kind registered with the engine must also be allowed here.
    pub fn allow_kind(&mut self, kind: impl Into<String>) {
        self.known_kinds.insert(kind.into());
    }

    /// The render context composites expand against.
    pub fn context(&self) -> RenderContext {
        self.context
    }

    /// Sweeps a node after this many unreferenced generations.
    pub fn terminal_generation(&self) -> u32 {
        self.terminal_generation
    }

    /// Overrides the GC grace period.
    pub fn set_terminal_generation(&mut self, generations: u32) {
        self.terminal_generation = generations;
    }

    /// Number of nodes in the retained map.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// True when `hash` is present in the retained map.
    pub fn contains(&self, hash: NodeHash) -> bool {
        self.nodes.contains_key(&hash)
    }

    /// The root set from the last committed render, in slot order.
    pub fn active_roots(&self) -> &[NodeHash] {
        &self.active_roots
    }

    /// Renders a forest of roots, emitting the diff into `delegate`.
    ///
    /// One root per output channel slot, in slot order. Fade windows apply
    /// to any root-set change this render causes.
    pub fn render_with_delegate<D: RenderDelegate>(
        &mut self,
        delegate: &mut D,
        roots: &[NodeValue],
        fade_in_ms: f64,
        fade_out_ms: f64,
    ) -> Result<RenderStats, GraphError> {
        let started = Instant::now();

        // Pass 1: resolve everything before emitting anything, so a failed
        // render commits nothing.
        let mut resolved = ResolvedMap::new();
        let mut root_hashes = Vec::with_capacity(roots.len());
        for root in roots {
            let (hash, _) = self.resolve_value(root, &mut resolved)?;
            root_hashes.push(hash);
        }

        // Pass 2: emit.
        let mut stats = RenderStats::default();
        let mut visited = HashSet::new();
        for &root in &root_hashes {
            self.emit_node(delegate, root, &resolved, &mut visited, &mut stats);
        }

        if root_hashes != self.active_roots {
            delegate.activate_roots(&root_hashes, fade_in_ms, fade_out_ms);
            self.active_roots = root_hashes;
        }
        delegate.commit_updates();

        stats.elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        Ok(stats)
    }

    /// One producer-side GC sweep.
    ///
    /// Increments every retained entry's generation and reclaims entries
    /// whose generation reaches the terminal count, emitting `DELETE_NODE`
    /// for each (followed by a commit when anything was reclaimed).
    /// Rendering resets the generation of every reachable node, so only
    /// content untouched for `terminal_generation` consecutive renders is
    /// pruned.
    pub fn step_garbage_collector<D: RenderDelegate>(&mut self, delegate: &mut D) -> usize {
        let terminal = self.terminal_generation;
        let mut removed = 0;
        self.nodes.retain(|hash, node| {
            node.generation += 1;
            if node.generation >= terminal {
                delegate.delete_node(*hash);
                removed += 1;
                false
            } else {
                true
            }
        });
        if removed > 0 {
            tracing::debug!(removed, "producer gc reclaimed nodes");
            delegate.commit_updates();
        }
        removed
    }

    /// Writes changed props of an already-mounted node, bypassing a full
    /// render. Backs [`NodeRef::set`](crate::refs::NodeRef::set).
    pub(crate) fn set_properties_direct<D: RenderDelegate>(
        &mut self,
        delegate: &mut D,
        hash: NodeHash,
        updates: &Props,
    ) -> Result<usize, GraphError> {
        let Some(shadow) = self.nodes.get_mut(&hash) else {
            return Err(GraphError::RefNotMounted);
        };
        let mut written = 0;
        for (key, value) in updates {
            if arbor_core::is_reserved_prop(key) {
                continue;
            }
            if shadow.props.get(key) != Some(value) {
                warn_non_finite(hash, key, value);
                delegate.set_property(hash, key, value);
                shadow.props.insert(key.clone(), value.clone());
                written += 1;
            }
        }
        delegate.commit_updates();
        Ok(written)
    }

    /// Resolves one value to its content hash, filling `resolved`.
    ///
    /// The second tuple element is true when the subtree contains no
    /// composite - only those hashes may be memoized on the value, since a
    /// thunk is free to expand differently between renders.
    fn resolve_value(
        &self,
        value: &NodeValue,
        resolved: &mut ResolvedMap,
    ) -> Result<(NodeHash, bool), GraphError> {
        if let Some(hash) = value.hash()
            && resolved.contains_key(&hash)
        {
            return Ok((hash, true));
        }

        match value.kind() {
            NodeKind::Composite(thunk) => {
                let args = CompositeArgs {
                    props: value.props(),
                    children: value.children(),
                    context: self.context,
                };
                let expansion = thunk(&args)?;
                let (hash, _) = self.resolve_value(&expansion, resolved)?;
                Ok((hash, false))
            }
            NodeKind::Primitive(kind) => {
                if !self.known_kinds.contains(kind) {
                    return Err(GraphError::UnknownKind(kind.clone()));
                }

                let mut children = Vec::with_capacity(value.children().len());
                let mut pure = true;
                for child in value.children() {
                    match child {
                        ChildRef::Number(n) => {
                            children.push((self.resolve_const(*n, resolved), 0));
                        }
                        ChildRef::Node {
                            value: child_value,
                            channel,
                        } => {
                            let (hash, child_pure) = self.resolve_value(child_value, resolved)?;
                            pure &= child_pure;
                            children.push((hash, *channel));
                        }
                    }
                }

                let hash = hash_node(kind, value.props(), &children);
                if pure {
                    value.memoize_hash(hash);
                }
                resolved.entry(hash).or_insert_with(|| ResolvedNode {
                    kind: kind.clone(),
                    props: value.props().clone(),
                    children,
                });
                Ok((hash, pure))
            }
        }
    }

    /// Resolves a bare-number child into a synthetic `const` node.
    fn resolve_const(&self, n: f64, resolved: &mut ResolvedMap) -> NodeHash {
        let const_props = props([("value", n)]);
        let hash = hash_node(kinds::CONST, &const_props, &[]);
        resolved.entry(hash).or_insert_with(|| ResolvedNode {
            kind: String::from(kinds::CONST),
            props: const_props,
            children: Vec::new(),
        });
        hash
    }

    /// Emits one resolved node (children first) and diffs its props.
    fn emit_node<D: RenderDelegate>(
        &mut self,
        delegate: &mut D,
        hash: NodeHash,
        resolved: &ResolvedMap,
        visited: &mut HashSet<NodeHash>,
        stats: &mut RenderStats,
    ) {
        if !visited.insert(hash) {
            return;
        }
        let Some(node) = resolved.get(&hash) else {
            return;
        };
        for &(child, _) in &node.children {
            self.emit_node(delegate, child, resolved, visited, stats);
        }

        let shadow = match self.nodes.entry(hash) {
            std::collections::hash_map::Entry::Vacant(entry) => {
                delegate.create_node(hash, &node.kind);
                stats.nodes_added += 1;
                for &(child, channel) in &node.children {
                    delegate.append_child(hash, child, channel);
                    stats.edges_added += 1;
                }
                entry.insert(ShadowNode {
                    props: Props::new(),
                    generation: 0,
                })
            }
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
        };

        for (key, value) in &node.props {
            // Identity props address the hash, not the implementation.
            if arbor_core::is_reserved_prop(key) {
                continue;
            }
            if shadow.props.get(key) != Some(value) {
                warn_non_finite(hash, key, value);
                delegate.set_property(hash, key, value);
                shadow.props.insert(key.clone(), value.clone());
                stats.props_written += 1;
            }
        }
        shadow.generation = 0;
    }
}

/// Warn on (but forward) property values the DSP side cannot use.
fn warn_non_finite(hash: NodeHash, key: &str, value: &Value) {
    if value.is_non_finite_number() {
        tracing::warn!(node = %hash, key, "forwarding non-finite property value");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delegate::RecordingDelegate;
    use crate::value::composite_thunk;
    use arbor_core::{Instruction, InstructionBatch};

    fn ctx() -> RenderContext {
        RenderContext {
            sample_rate: 48000.0,
            block_size: 512,
        }
    }

    fn tags(batch: &InstructionBatch) -> Vec<u8> {
        batch.iter().map(Instruction::tag).collect()
    }

    fn sine(freq_key: &str, freq: f64) -> NodeValue {
        let fq = NodeValue::primitive(
            "const",
            props([("key", Value::from(freq_key)), ("value", Value::from(freq))]),
            vec![],
        )
        .unwrap();
        let ph = NodeValue::primitive("phasor", Props::new(), vec![fq.into()]).unwrap();
        let tau = NodeValue::primitive("const", props([("value", 6.283185307179586)]), vec![])
            .unwrap();
        let m = NodeValue::primitive("mul", Props::new(), vec![tau.into(), ph.into()]).unwrap();
        NodeValue::primitive("sin", Props::new(), vec![m.into()]).unwrap()
    }

    #[test]
    fn first_render_creates_everything_once() {
        let mut rec = Reconciler::new(ctx());
        let mut del = RecordingDelegate::new();

        let stats = rec
            .render_with_delegate(&mut del, &[sine("fq", 440.0)], 10.0, 10.0)
            .unwrap();

        // const tau, const fq, phasor, mul, sin
        assert_eq!(stats.nodes_added, 5);
        assert_eq!(stats.edges_added, 4);

        let batch = del.last_batch().unwrap();
        assert_eq!(batch.count_tag(0), 5);
        assert_eq!(batch.count_tag(2), 4);
        assert_eq!(batch.count_tag(4), 1);
        assert_eq!(batch.count_tag(5), 1);
    }

    #[test]
    fn create_precedes_append_referencing_it() {
        let mut rec = Reconciler::new(ctx());
        let mut del = RecordingDelegate::new();
        rec.render_with_delegate(&mut del, &[sine("fq", 440.0)], 10.0, 10.0)
            .unwrap();

        let batch = del.last_batch().unwrap();
        let mut created = HashSet::new();
        for instruction in batch {
            match instruction {
                Instruction::CreateNode { hash, .. } => {
                    created.insert(*hash);
                }
                Instruction::AppendChild { parent, child, .. } => {
                    assert!(created.contains(parent), "edge before parent create");
                    assert!(created.contains(child), "edge before child create");
                }
                _ => {}
            }
        }
    }

    #[test]
    fn second_identical_render_is_quiet() {
        let mut rec = Reconciler::new(ctx());
        let mut del = RecordingDelegate::new();
        let root = sine("fq", 440.0);

        rec.render_with_delegate(&mut del, &[root.clone()], 10.0, 10.0)
            .unwrap();
        let stats = rec
            .render_with_delegate(&mut del, &[root], 10.0, 10.0)
            .unwrap();

        assert_eq!(stats.nodes_added, 0);
        assert_eq!(stats.props_written, 0);
        // Only the terminal commit: same roots, so no ACTIVATE_ROOTS either.
        assert_eq!(tags(del.last_batch().unwrap()), [5]);
    }

    #[test]
    fn leaf_value_change_emits_one_set_property() {
        let mut rec = Reconciler::new(ctx());
        let mut del = RecordingDelegate::new();

        rec.render_with_delegate(&mut del, &[sine("fq", 440.0)], 10.0, 10.0)
            .unwrap();
        let stats = rec
            .render_with_delegate(&mut del, &[sine("fq", 441.0)], 10.0, 10.0)
            .unwrap();

        assert_eq!(stats.nodes_added, 0);
        assert_eq!(stats.edges_added, 0);
        assert_eq!(stats.props_written, 1);

        let batch = del.last_batch().unwrap();
        assert_eq!(batch.count_tag(0), 0);
        assert_eq!(batch.count_tag(2), 0);
        assert_eq!(batch.count_tag(3), 1);
        // Keyed const: same hash, so the root set is unchanged too.
        assert_eq!(batch.count_tag(4), 0);
    }

    #[test]
    fn shared_subtree_created_once() {
        let mut rec = Reconciler::new(ctx());
        let mut del = RecordingDelegate::new();

        let t = NodeValue::primitive("train", Props::new(), vec![5.0.into()]).unwrap();
        let root = NodeValue::primitive(
            "seq",
            props([(
                "seq",
                Value::from(vec![Value::from(1.0), Value::from(2.0), Value::from(3.0)]),
            )]),
            vec![t.clone().into(), t.into()],
        )
        .unwrap();

        let stats = rec
            .render_with_delegate(&mut del, &[root], 10.0, 10.0)
            .unwrap();

        // const 5, train, seq - the shared child is one node, two edges.
        assert_eq!(stats.nodes_added, 3);
        assert_eq!(stats.edges_added, 3);

        let batch = del.last_batch().unwrap();
        let appends: Vec<(NodeHash, NodeHash)> = batch
            .iter()
            .filter_map(|i| match i {
                Instruction::AppendChild { parent, child, .. } => Some((*parent, *child)),
                _ => None,
            })
            .collect();
        // The seq parent appends the same train hash twice.
        assert_eq!(appends[1].1, appends[2].1);
    }

    #[test]
    fn switch_and_switch_back_reuses_nodes() {
        let mut rec = Reconciler::new(ctx());
        let mut del = RecordingDelegate::new();
        let a = sine("hi", 440.0);
        let b = sine("bye", 880.0);

        rec.render_with_delegate(&mut del, &[a.clone()], 10.0, 10.0)
            .unwrap();
        rec.render_with_delegate(&mut del, &[b], 10.0, 10.0).unwrap();
        let stats = rec.render_with_delegate(&mut del, &[a], 10.0, 10.0).unwrap();

        assert_eq!(stats.nodes_added, 0, "A's nodes were retained");
        let batch = del.last_batch().unwrap();
        assert_eq!(batch.count_tag(0), 0);
        assert_eq!(batch.count_tag(4), 1, "roots restored to A");
    }

    #[test]
    fn composite_expands_to_primitives_only() {
        let mut rec = Reconciler::new(ctx());
        let mut del = RecordingDelegate::new();

        let thunk = composite_thunk(|args| {
            let cutoff = args.props.get("cutoff").and_then(Value::as_number).unwrap_or(440.0);
            // Rough one-pole stand-in: scale the input by a cutoff-derived
            // coefficient. Expansion only uses primitives.
            let coeff = cutoff / f64::from(args.context.sample_rate);
            NodeValue::primitive("mul", Props::new(), {
                let mut v: Vec<ChildRef> = args.children.to_vec();
                v.push(coeff.into());
                v
            })
        });
        let x = NodeValue::primitive("phasor", Props::new(), vec![110.0.into()]).unwrap();
        let lp = NodeValue::composite(thunk, props([("cutoff", 880.0)]), vec![x.into()]).unwrap();

        rec.render_with_delegate(&mut del, &[lp], 10.0, 10.0).unwrap();

        let batch = del.last_batch().unwrap();
        for instruction in batch {
            if let Instruction::CreateNode { kind, .. } = instruction {
                assert!(
                    ["mul", "phasor", "const"].contains(&kind.as_str()),
                    "unexpected kind {kind}"
                );
            }
        }
    }

    #[test]
    fn unknown_kind_aborts_without_emitting() {
        let mut rec = Reconciler::new(ctx());
        let mut del = RecordingDelegate::new();

        let bogus = NodeValue::primitive("warble", Props::new(), vec![]).unwrap();
        let root = NodeValue::primitive("sin", Props::new(), vec![bogus.into()]).unwrap();

        let err = rec
            .render_with_delegate(&mut del, &[root], 10.0, 10.0)
            .unwrap_err();
        assert!(matches!(err, GraphError::UnknownKind(k) if k == "warble"));
        assert!(del.batches().is_empty(), "failed render committed nothing");
        assert_eq!(rec.node_count(), 0);
    }

    #[test]
    fn allow_kind_extends_the_table() {
        let mut rec = Reconciler::new(ctx());
        let mut del = RecordingDelegate::new();
        rec.allow_kind("warble");

        let root = NodeValue::primitive("warble", Props::new(), vec![]).unwrap();
        assert!(rec.render_with_delegate(&mut del, &[root], 10.0, 10.0).is_ok());
    }

    #[test]
    fn gc_prunes_only_stale_nodes() {
        let mut rec = Reconciler::new(ctx());
        let mut del = RecordingDelegate::new();
        let a = sine("hi", 440.0);
        let b = sine("bye", 880.0);

        rec.render_with_delegate(&mut del, &[a], 10.0, 10.0).unwrap();
        let after_a = rec.node_count();
        rec.render_with_delegate(&mut del, &[b.clone()], 10.0, 10.0)
            .unwrap();
        assert!(rec.node_count() > after_a);

        // Keep B's nodes fresh by re-rendering between sweeps.
        let mut reclaimed = 0;
        for _ in 0..rec.terminal_generation() {
            reclaimed += rec.step_garbage_collector(&mut del);
            rec.render_with_delegate(&mut del, &[b.clone()], 10.0, 10.0)
                .unwrap();
        }

        // Shared nodes (the tau const) survive; A-only nodes are gone.
        assert!(reclaimed > 0);
        assert_eq!(rec.node_count(), after_a);
    }

    #[test]
    fn gc_emits_delete_and_commit() {
        let mut rec = Reconciler::new(ctx());
        rec.set_terminal_generation(1);
        let mut del = RecordingDelegate::new();

        rec.render_with_delegate(&mut del, &[sine("x", 220.0)], 10.0, 10.0)
            .unwrap();
        // Render something else so the first tree goes stale.
        let quiet = NodeValue::primitive("const", props([("value", 0.0)]), vec![]).unwrap();
        rec.render_with_delegate(&mut del, &[quiet], 10.0, 10.0).unwrap();

        let removed = rec.step_garbage_collector(&mut del);
        assert!(removed > 0);
        let batch = del.last_batch().unwrap();
        assert_eq!(batch.count_tag(1), removed);
        assert_eq!(batch.count_tag(5), 1);
    }

    #[test]
    fn bare_numbers_become_const_nodes() {
        let mut rec = Reconciler::new(ctx());
        let mut del = RecordingDelegate::new();

        let root = NodeValue::primitive("mul", Props::new(), vec![2.0.into(), 3.0.into()])
            .unwrap();
        rec.render_with_delegate(&mut del, &[root], 10.0, 10.0).unwrap();

        let batch = del.last_batch().unwrap();
        let const_creates = batch
            .iter()
            .filter(|i| matches!(i, Instruction::CreateNode { kind, .. } if kind == "const"))
            .count();
        assert_eq!(const_creates, 2);
        // Each synthetic const got its value prop.
        assert_eq!(batch.count_tag(3), 2);
    }

    #[test]
    fn multi_channel_children_hash_distinctly() {
        let mut rec = Reconciler::new(ctx());
        let mut del = RecordingDelegate::new();

        let src = NodeValue::primitive("phasor", Props::new(), vec![1.0.into()]).unwrap();
        let left = NodeValue::primitive("sin", Props::new(), vec![src.output(0)]).unwrap();
        let right = NodeValue::primitive("sin", Props::new(), vec![src.output(1)]).unwrap();

        let stats = rec
            .render_with_delegate(&mut del, &[left, right], 10.0, 10.0)
            .unwrap();
        // const, phasor, and two distinct sins.
        assert_eq!(stats.nodes_added, 4);
    }
}
