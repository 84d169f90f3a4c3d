//! The block executor.
//!
//! [`Engine`] is the audio-thread half of the runtime. Per process block
//! it drains pending instruction batches into the graph store, refreshes
//! the cached topological schedule when the structure changed, evaluates
//! each reachable node once (children before parents), mixes active and
//! fading roots into the output planes under their gain fades, drains node
//! events into the relay, and advances the sample clock. A generational
//! sweep reclaims unreachable nodes every few hundred milliseconds.
//!
//! Steady-state processing (property-only updates) performs no allocation:
//! the schedule, node buffers, scratch sets, and fades are all retained
//! between blocks. Structural changes (node creation, schedule rebuilds,
//! GC) do allocate, on the audio thread, at mutation time - the same
//! trade the instruction model already makes by constructing nodes there.

use std::collections::HashSet;

use arbor_core::{
    BlockContext, Instruction, MAX_CHILDREN, NodeHash, Props, PropertyStatus, ResourceMap, Value,
    kinds,
};

use crate::activation::RootActivation;
use crate::channel::BatchReceiver;
use crate::events::EventRelay;
use crate::registry::NodeRegistry;
use crate::store::GraphStore;

/// Construction-time engine parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineOptions {
    /// Fixed sample rate in Hz.
    pub sample_rate: f32,
    /// Maximum frames per process call.
    pub block_size: usize,
    /// Number of output channel slots (= expected root count).
    pub channels: usize,
    /// Unreachable sweeps a node survives before reclamation.
    pub terminal_generation: u32,
    /// Blocks between generational sweeps.
    pub gc_interval_blocks: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            block_size: 512,
            channels: 2,
            terminal_generation: 4,
            gc_interval_blocks: 25,
        }
    }
}

/// The realtime graph engine.
pub struct Engine {
    options: EngineOptions,
    registry: NodeRegistry,
    store: GraphStore,
    activation: RootActivation,
    resources: ResourceMap,
    receiver: BatchReceiver,
    relay: EventRelay,

    /// Cached post-order over the reachable subgraph.
    schedule: Vec<NodeHash>,
    /// `graph_version` the schedule was built at.
    schedule_version: u64,
    /// Bumped by every structural mutation.
    graph_version: u64,

    // Retained scratch - no steady-state allocation.
    visited: HashSet<NodeHash>,
    dfs_stack: Vec<(NodeHash, usize)>,
    gc_mark: HashSet<NodeHash>,
    gc_stack: Vec<NodeHash>,
    gc_doomed: Vec<NodeHash>,
    silence: Vec<f32>,

    sample_time: i64,
    blocks_since_gc: u32,
}

impl Engine {
    /// Builds an engine around a registry and its channel endpoints.
    pub fn new(
        options: EngineOptions,
        registry: NodeRegistry,
        receiver: BatchReceiver,
        relay: EventRelay,
    ) -> Self {
        Self {
            registry,
            store: GraphStore::new(),
            activation: RootActivation::new(options.sample_rate),
            resources: ResourceMap::new(),
            receiver,
            relay,
            schedule: Vec::new(),
            schedule_version: u64::MAX,
            graph_version: 0,
            visited: HashSet::new(),
            dfs_stack: Vec::new(),
            gc_mark: HashSet::new(),
            gc_stack: Vec::new(),
            gc_doomed: Vec::new(),
            silence: vec![0.0; options.block_size],
            sample_time: 0,
            blocks_since_gc: 0,
            options,
        }
    }

    /// Processes one block of audio.
    ///
    /// `inputs` and `outputs` are deinterleaved float planes; each output
    /// plane must hold at least `frames` samples, and `frames` is clamped
    /// to the configured block size.
    pub fn process(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], frames: usize) {
        let frames = frames.min(self.options.block_size);

        self.drain_instructions();
        if self.activation.retire_settled() > 0 {
            self.graph_version += 1;
        }
        self.refresh_schedule();
        self.evaluate(inputs, frames);
        self.mix(outputs, frames);
        self.drain_events();

        self.sample_time += frames as i64;
        self.blocks_since_gc += 1;
        if self.blocks_since_gc >= self.options.gc_interval_blocks {
            self.blocks_since_gc = 0;
            self.collect_garbage();
        }
    }

    /// One generational sweep: mark from active ∪ fading roots, age the
    /// rest, drop nodes past the terminal generation, prune resources.
    ///
    /// Runs automatically every `gc_interval_blocks`; hosts driving GC on
    /// their own timer may also call it directly. Returns the number of
    /// nodes reclaimed.
    pub fn collect_garbage(&mut self) -> usize {
        // Mark.
        self.gc_mark.clear();
        self.gc_stack.clear();
        self.gc_stack.extend(self.activation.hashes());
        while let Some(hash) = self.gc_stack.pop() {
            if !self.gc_mark.insert(hash) {
                continue;
            }
            if let Some(live) = self.store.nodes.get(&hash) {
                self.gc_stack.extend(live.inbound.iter().map(|&(child, _)| child));
            }
        }

        // Sweep.
        let terminal = self.options.terminal_generation;
        self.gc_doomed.clear();
        for (hash, live) in &mut self.store.nodes {
            if self.gc_mark.contains(hash) {
                live.generation = 0;
            } else {
                live.generation += 1;
                if live.generation >= terminal {
                    self.gc_doomed.push(*hash);
                }
            }
        }

        let doomed = std::mem::take(&mut self.gc_doomed);
        for &hash in &doomed {
            self.store.remove(hash);
        }
        let removed = doomed.len();
        self.gc_doomed = doomed;

        if removed > 0 {
            self.graph_version += 1;
        }
        self.resources.prune();
        removed
    }

    /// The rolling sample-time counter. Monotonic.
    pub fn sample_time(&self) -> i64 {
        self.sample_time
    }

    /// Number of live nodes in the graph store.
    pub fn live_node_count(&self) -> usize {
        self.store.len()
    }

    /// Number of active-plus-fading roots.
    pub fn active_root_count(&self) -> usize {
        self.activation.len()
    }

    /// The engine's shared resource map.
    pub fn resources(&self) -> &ResourceMap {
        &self.resources
    }

    /// The options the engine was constructed with.
    pub fn options(&self) -> EngineOptions {
        self.options
    }

    // --- Instruction application ---

    fn drain_instructions(&mut self) {
        while let Some(batch) = self.receiver.try_recv() {
            for instruction in batch {
                self.apply(instruction);
            }
        }
    }

    fn apply(&mut self, instruction: Instruction) {
        match instruction {
            Instruction::CreateNode { hash, kind } => self.apply_create(hash, kind),
            Instruction::DeleteNode { hash } => self.apply_delete(hash),
            Instruction::AppendChild {
                parent,
                child,
                channel,
            } => self.apply_append(parent, child, channel),
            Instruction::SetProperty { hash, key, value } => {
                self.apply_set_property(hash, &key, &value);
            }
            Instruction::ActivateRoots {
                roots,
                fade_in_ms,
                fade_out_ms,
            } => {
                self.activation.activate(&roots, fade_in_ms, fade_out_ms);
                self.graph_version += 1;
            }
            Instruction::CommitUpdates => {}
            Instruction::UpdateResourceMap { path, buffer } => {
                self.resources.update(path, buffer);
            }
            Instruction::Reset => {
                for live in self.store.nodes.values_mut() {
                    live.node.reset();
                }
            }
        }
    }

    fn apply_create(&mut self, hash: NodeHash, kind: String) {
        let existing = self.store.nodes.get_mut(&hash).map(|live| {
            if live.doomed {
                live.doomed = false;
                live.generation = 0;
                false
            } else {
                true
            }
        });
        match existing {
            Some(true) => self.error_event("duplicate node hash", Some(hash)),
            Some(false) => {}
            None => match self.registry.create(&kind, hash, self.options.sample_rate, self.options.block_size) {
                Some(node) => {
                    self.store.insert(hash, kind, node, self.options.block_size);
                    self.graph_version += 1;
                }
                None => {
                    tracing::warn!(%kind, node = %hash, "unknown node kind; node suppressed");
                    self.error_event(&format!("unknown node kind '{kind}'"), Some(hash));
                }
            },
        }
    }

    fn apply_delete(&mut self, hash: NodeHash) {
        enum Outcome {
            Missing,
            Deferred,
            Removable,
        }
        let outcome = match self.store.nodes.get_mut(&hash) {
            None => Outcome::Missing,
            Some(live) if live.refs == 0 && !self.activation.contains(hash) => Outcome::Removable,
            Some(live) => {
                live.doomed = true;
                Outcome::Deferred
            }
        };
        match outcome {
            // The producer GC can trail the engine GC; a missing node is
            // already reclaimed, not an error.
            Outcome::Missing | Outcome::Deferred => {}
            Outcome::Removable => {
                self.store.remove(hash);
                self.graph_version += 1;
            }
        }
    }

    fn apply_append(&mut self, parent: NodeHash, child: NodeHash, channel: u16) {
        if !self.store.nodes.contains_key(&child) {
            self.error_event("edge references a missing child", Some(child));
            return;
        }
        enum Outcome {
            MissingParent,
            TooMany,
            Appended,
        }
        let outcome = match self.store.nodes.get_mut(&parent) {
            None => Outcome::MissingParent,
            Some(live) if live.inbound.len() >= MAX_CHILDREN => Outcome::TooMany,
            Some(live) => {
                live.inbound.push((child, channel));
                Outcome::Appended
            }
        };
        match outcome {
            Outcome::MissingParent => {
                self.error_event("edge references a missing parent", Some(parent));
            }
            Outcome::TooMany => self.error_event("too many inbound edges", Some(parent)),
            Outcome::Appended => {
                if let Some(c) = self.store.nodes.get_mut(&child) {
                    c.refs += 1;
                }
                self.graph_version += 1;
            }
        }
    }

    fn apply_set_property(&mut self, hash: NodeHash, key: &str, value: &Value) {
        let status = self
            .store
            .nodes
            .get_mut(&hash)
            .map(|live| live.node.set_property(key, value, &self.resources));
        match status {
            None => self.error_event("property write to a missing node", Some(hash)),
            Some(PropertyStatus::Ok) => {}
            Some(status) => {
                let mut payload = Props::new();
                payload.insert("message".into(), Value::from(status.describe()));
                payload.insert("key".into(), Value::from(key));
                payload.insert("node".into(), Value::from(format!("{hash}")));
                self.relay.emit("error", Value::Map(payload));
            }
        }
    }

    fn error_event(&self, message: &str, hash: Option<NodeHash>) {
        let mut payload = Props::new();
        payload.insert("message".into(), Value::from(message));
        if let Some(hash) = hash {
            payload.insert("node".into(), Value::from(format!("{hash}")));
        }
        self.relay.emit("error", Value::Map(payload));
    }

    // --- Scheduling ---

    /// Rebuilds the cached post-order when any structural instruction,
    /// activation change, or reclamation bumped the graph version.
    fn refresh_schedule(&mut self) {
        if self.schedule_version == self.graph_version {
            return;
        }
        self.schedule.clear();
        self.visited.clear();
        self.dfs_stack.clear();

        for root in self.activation.hashes() {
            if !self.visited.insert(root) {
                continue;
            }
            self.dfs_stack.push((root, 0));
            while let Some(&(hash, child_index)) = self.dfs_stack.last() {
                let next = self
                    .store
                    .nodes
                    .get(&hash)
                    .and_then(|live| live.inbound.get(child_index))
                    .map(|&(child, _)| child);
                match next {
                    Some(child) => {
                        if let Some(top) = self.dfs_stack.last_mut() {
                            top.1 += 1;
                        }
                        if self.visited.insert(child) {
                            self.dfs_stack.push((child, 0));
                        }
                    }
                    None => {
                        self.dfs_stack.pop();
                        self.schedule.push(hash);
                    }
                }
            }
        }
        self.schedule_version = self.graph_version;
    }

    // --- Evaluation ---

    fn evaluate(&mut self, ext_inputs: &[&[f32]], frames: usize) {
        let GraphStore { nodes, buffers } = &mut self.store;
        let silence = &self.silence[..frames];

        for &hash in &self.schedule {
            let Some(live) = nodes.get(&hash) else {
                continue;
            };
            let wants_external = live.inbound.is_empty() && live.kind == kinds::INPUT;
            let edge_count = live.inbound.len().min(MAX_CHILDREN);
            let mut edges = [(NodeHash::from_raw(0), 0u16); MAX_CHILDREN];
            edges[..edge_count].copy_from_slice(&live.inbound[..edge_count]);

            // Move this node's planes out so its inputs can borrow the map.
            let Some(slot) = buffers.get_mut(&hash) else {
                continue;
            };
            let mut out = std::mem::take(slot);

            let mut input_refs: [&[f32]; MAX_CHILDREN] = [silence; MAX_CHILDREN];
            let input_count = if wants_external {
                let n = ext_inputs.len().min(MAX_CHILDREN);
                for (slot_ref, plane) in input_refs.iter_mut().zip(ext_inputs.iter().take(n)) {
                    *slot_ref = if plane.len() >= frames {
                        &plane[..frames]
                    } else {
                        silence
                    };
                }
                n
            } else {
                for (i, &(child, channel)) in edges[..edge_count].iter().enumerate() {
                    input_refs[i] = buffers
                        .get(&child)
                        .and_then(|planes| planes.get(channel as usize))
                        .map_or(silence, |plane| &plane[..frames]);
                }
                edge_count
            };

            if let Some(live) = nodes.get_mut(&hash) {
                let mut ctx = BlockContext {
                    inputs: &input_refs[..input_count],
                    outputs: &mut out,
                    frames,
                    sample_rate: self.options.sample_rate,
                    sample_time: self.sample_time,
                };
                live.node.process(&mut ctx);
            }

            if let Some(slot) = buffers.get_mut(&hash) {
                *slot = out;
            }
        }
    }

    fn mix(&mut self, outputs: &mut [&mut [f32]], frames: usize) {
        for plane in outputs.iter_mut() {
            for sample in &mut plane[..frames] {
                *sample = 0.0;
            }
        }

        let buffers = &self.store.buffers;
        let channels = self.options.channels;
        for entry in self.activation.entries_mut() {
            let plane = if entry.slot < channels {
                outputs.get_mut(entry.slot)
            } else {
                None
            };
            let Some(plane) = plane else {
                entry.fade.advance_block(frames);
                continue;
            };
            match buffers.get(&entry.hash).and_then(|planes| planes.first()) {
                Some(buf) => entry.fade.mix_into(&buf[..frames], &mut plane[..frames]),
                None => entry.fade.advance_block(frames),
            }
        }
    }

    fn drain_events(&mut self) {
        let relay = &self.relay;
        for &hash in &self.schedule {
            if let Some(live) = self.store.nodes.get_mut(&hash) {
                live.node
                    .process_events(&mut |topic, payload| relay.emit(topic, payload));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::instruction_channel;
    use crate::events::{EventReceiver, event_channel};
    use crate::registry::{NodeCategory, NodeDescriptor};
    use arbor_core::{AudioNode, InstructionBatch, fill_silence};

    /// Outputs its `value` prop on every sample.
    struct TestConst {
        value: f32,
    }

    impl AudioNode for TestConst {
        fn set_property(&mut self, key: &str, value: &Value, _: &ResourceMap) -> PropertyStatus {
            match key {
                "value" => match value.as_number() {
                    Some(n) => {
                        self.value = n as f32;
                        PropertyStatus::Ok
                    }
                    None => PropertyStatus::InvalidType,
                },
                _ if arbor_core::is_reserved_prop(key) => PropertyStatus::Ok,
                _ => PropertyStatus::UnknownKey,
            }
        }

        fn process(&mut self, ctx: &mut BlockContext<'_>) {
            for sample in &mut ctx.outputs[0][..ctx.frames] {
                *sample = self.value;
            }
        }

        fn reset(&mut self) {
            self.value = 0.0;
        }
    }

    /// Sums its inputs.
    struct TestSum;

    impl AudioNode for TestSum {
        fn set_property(&mut self, _: &str, _: &Value, _: &ResourceMap) -> PropertyStatus {
            PropertyStatus::Ok
        }

        fn process(&mut self, ctx: &mut BlockContext<'_>) {
            fill_silence(ctx.outputs, ctx.frames);
            for input in ctx.inputs {
                for (out, s) in ctx.outputs[0][..ctx.frames].iter_mut().zip(*input) {
                    *out += s;
                }
            }
        }
    }

    fn registry() -> NodeRegistry {
        let mut registry = NodeRegistry::new();
        registry.register(
            NodeDescriptor {
                kind: "tconst",
                description: "test constant",
                category: NodeCategory::Source,
            },
            |_, _, _| Box::new(TestConst { value: 0.0 }),
        );
        registry.register(
            NodeDescriptor {
                kind: "tsum",
                description: "test sum",
                category: NodeCategory::Math,
            },
            |_, _, _| Box::new(TestSum),
        );
        registry
    }

    struct Harness {
        engine: Engine,
        tx: crate::channel::BatchSender,
        events: EventReceiver,
    }

    fn harness(options: EngineOptions) -> Harness {
        let (tx, rx) = instruction_channel(16);
        let (relay, events) = event_channel(64);
        Harness {
            engine: Engine::new(options, registry(), rx, relay),
            tx,
            events,
        }
    }

    fn h(n: u32) -> NodeHash {
        NodeHash::from_raw(n)
    }

    fn run_block(engine: &mut Engine, frames: usize) -> Vec<f32> {
        let mut left = vec![0.0f32; frames];
        let mut right = vec![0.0f32; frames];
        {
            let mut outputs: Vec<&mut [f32]> = vec![&mut left, &mut right];
            engine.process(&[], &mut outputs, frames);
        }
        left
    }

    fn drain_errors(events: &EventReceiver) -> Vec<String> {
        let mut messages = Vec::new();
        events.poll(|topic, payload| {
            if topic == "error" {
                let msg = payload
                    .as_map()
                    .and_then(|m| m.get("message"))
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string();
                messages.push(msg);
            }
        });
        messages
    }

    #[test]
    fn create_activate_process() {
        let mut t = harness(EngineOptions {
            block_size: 64,
            ..EngineOptions::default()
        });

        let mut batch = InstructionBatch::new();
        batch.push(Instruction::CreateNode {
            hash: h(1),
            kind: "tconst".into(),
        });
        batch.push(Instruction::SetProperty {
            hash: h(1),
            key: "value".into(),
            value: Value::from(0.25),
        });
        batch.push(Instruction::ActivateRoots {
            roots: vec![h(1)],
            fade_in_ms: 0.0,
            fade_out_ms: 0.0,
        });
        batch.push(Instruction::CommitUpdates);
        t.tx.send(batch).unwrap();

        let out = run_block(&mut t.engine, 64);
        assert_eq!(t.engine.live_node_count(), 1);
        for &s in &out {
            assert!((s - 0.25).abs() < 1e-6, "expected 0.25, got {s}");
        }
    }

    #[test]
    fn edges_feed_parent_inputs() {
        let mut t = harness(EngineOptions {
            block_size: 32,
            ..EngineOptions::default()
        });

        let mut batch = InstructionBatch::new();
        for (hash, value) in [(h(1), 0.25), (h(2), 0.5)] {
            batch.push(Instruction::CreateNode {
                hash,
                kind: "tconst".into(),
            });
            batch.push(Instruction::SetProperty {
                hash,
                key: "value".into(),
                value: Value::from(value),
            });
        }
        batch.push(Instruction::CreateNode {
            hash: h(3),
            kind: "tsum".into(),
        });
        batch.push(Instruction::AppendChild {
            parent: h(3),
            child: h(1),
            channel: 0,
        });
        batch.push(Instruction::AppendChild {
            parent: h(3),
            child: h(2),
            channel: 0,
        });
        batch.push(Instruction::ActivateRoots {
            roots: vec![h(3)],
            fade_in_ms: 0.0,
            fade_out_ms: 0.0,
        });
        batch.push(Instruction::CommitUpdates);
        t.tx.send(batch).unwrap();

        let out = run_block(&mut t.engine, 32);
        for &s in &out {
            assert!((s - 0.75).abs() < 1e-6, "expected 0.75, got {s}");
        }
    }

    #[test]
    fn unknown_kind_is_suppressed_with_error_event() {
        let mut t = harness(EngineOptions::default());

        let mut batch = InstructionBatch::new();
        batch.push(Instruction::CreateNode {
            hash: h(9),
            kind: "warble".into(),
        });
        batch.push(Instruction::ActivateRoots {
            roots: vec![h(9)],
            fade_in_ms: 0.0,
            fade_out_ms: 0.0,
        });
        batch.push(Instruction::CommitUpdates);
        t.tx.send(batch).unwrap();

        let out = run_block(&mut t.engine, 16);
        assert_eq!(t.engine.live_node_count(), 0);
        assert!(out.iter().all(|&s| s == 0.0), "missing root mixes silence");

        let errors = drain_errors(&t.events);
        assert!(errors.iter().any(|m| m.contains("unknown node kind")));
    }

    #[test]
    fn bad_property_surfaces_error_and_continues() {
        let mut t = harness(EngineOptions::default());

        let mut batch = InstructionBatch::new();
        batch.push(Instruction::CreateNode {
            hash: h(1),
            kind: "tconst".into(),
        });
        batch.push(Instruction::SetProperty {
            hash: h(1),
            key: "value".into(),
            value: Value::from("not a number"),
        });
        // The rest of the batch still applies.
        batch.push(Instruction::SetProperty {
            hash: h(1),
            key: "value".into(),
            value: Value::from(0.5),
        });
        batch.push(Instruction::ActivateRoots {
            roots: vec![h(1)],
            fade_in_ms: 0.0,
            fade_out_ms: 0.0,
        });
        batch.push(Instruction::CommitUpdates);
        t.tx.send(batch).unwrap();

        let out = run_block(&mut t.engine, 16);
        assert!((out[0] - 0.5).abs() < 1e-6);
        let errors = drain_errors(&t.events);
        assert!(errors.iter().any(|m| m.contains("invalid property type")));
    }

    #[test]
    fn duplicate_create_is_an_error() {
        let mut t = harness(EngineOptions::default());

        let mut batch = InstructionBatch::new();
        batch.push(Instruction::CreateNode {
            hash: h(1),
            kind: "tconst".into(),
        });
        batch.push(Instruction::CreateNode {
            hash: h(1),
            kind: "tconst".into(),
        });
        batch.push(Instruction::CommitUpdates);
        t.tx.send(batch).unwrap();

        run_block(&mut t.engine, 16);
        let errors = drain_errors(&t.events);
        assert!(errors.iter().any(|m| m.contains("duplicate node hash")));
    }

    #[test]
    fn cross_fade_has_no_discontinuity() {
        let sr = 48000.0;
        let block = 64;
        let mut t = harness(EngineOptions {
            sample_rate: sr,
            block_size: block,
            ..EngineOptions::default()
        });

        // Root A at 1.0.
        let mut batch = InstructionBatch::new();
        batch.push(Instruction::CreateNode {
            hash: h(1),
            kind: "tconst".into(),
        });
        batch.push(Instruction::SetProperty {
            hash: h(1),
            key: "value".into(),
            value: Value::from(1.0),
        });
        batch.push(Instruction::ActivateRoots {
            roots: vec![h(1)],
            fade_in_ms: 0.0,
            fade_out_ms: 0.0,
        });
        batch.push(Instruction::CommitUpdates);
        t.tx.send(batch).unwrap();
        run_block(&mut t.engine, block);

        // Switch to root B, also 1.0, over a 10ms cross-fade. A constant
        // signal should stay constant through the overlap.
        let mut batch = InstructionBatch::new();
        batch.push(Instruction::CreateNode {
            hash: h(2),
            kind: "tconst".into(),
        });
        batch.push(Instruction::SetProperty {
            hash: h(2),
            key: "value".into(),
            value: Value::from(1.0),
        });
        batch.push(Instruction::ActivateRoots {
            roots: vec![h(2)],
            fade_in_ms: 10.0,
            fade_out_ms: 10.0,
        });
        batch.push(Instruction::CommitUpdates);
        t.tx.send(batch).unwrap();

        let bound = 2.0 / (0.010 * sr) + 1e-5;
        let mut prev = 1.0f32;
        for _ in 0..20 {
            let out = run_block(&mut t.engine, block);
            for &s in &out {
                assert!(
                    (s - prev).abs() <= bound,
                    "jump of {} exceeds {}",
                    (s - prev).abs(),
                    bound
                );
                prev = s;
            }
        }
        // Fades settled: back to a single root at unity.
        assert_eq!(t.engine.active_root_count(), 1);
        assert!((prev - 1.0).abs() < 1e-4);
    }

    #[test]
    fn gc_reclaims_unreachable_after_grace() {
        let mut t = harness(EngineOptions {
            block_size: 16,
            terminal_generation: 2,
            gc_interval_blocks: 1000, // drive GC manually
            ..EngineOptions::default()
        });

        let mut batch = InstructionBatch::new();
        for hash in [h(1), h(2)] {
            batch.push(Instruction::CreateNode {
                hash,
                kind: "tconst".into(),
            });
        }
        batch.push(Instruction::ActivateRoots {
            roots: vec![h(1)],
            fade_in_ms: 0.0,
            fade_out_ms: 0.0,
        });
        batch.push(Instruction::CommitUpdates);
        t.tx.send(batch).unwrap();
        run_block(&mut t.engine, 16);

        assert_eq!(t.engine.live_node_count(), 2);
        assert_eq!(t.engine.collect_garbage(), 0, "first sweep only ages");
        assert_eq!(t.engine.collect_garbage(), 1, "second sweep reclaims h(2)");
        assert_eq!(t.engine.live_node_count(), 1);

        // The active root is never reclaimed.
        for _ in 0..4 {
            t.engine.collect_garbage();
        }
        assert_eq!(t.engine.live_node_count(), 1);
    }

    #[test]
    fn reset_clears_node_state() {
        let mut t = harness(EngineOptions {
            block_size: 8,
            ..EngineOptions::default()
        });

        let mut batch = InstructionBatch::new();
        batch.push(Instruction::CreateNode {
            hash: h(1),
            kind: "tconst".into(),
        });
        batch.push(Instruction::SetProperty {
            hash: h(1),
            key: "value".into(),
            value: Value::from(0.7),
        });
        batch.push(Instruction::ActivateRoots {
            roots: vec![h(1)],
            fade_in_ms: 0.0,
            fade_out_ms: 0.0,
        });
        batch.push(Instruction::CommitUpdates);
        t.tx.send(batch).unwrap();
        assert!((run_block(&mut t.engine, 8)[0] - 0.7).abs() < 1e-6);

        let mut batch = InstructionBatch::new();
        batch.push(Instruction::Reset);
        batch.push(Instruction::CommitUpdates);
        t.tx.send(batch).unwrap();
        assert_eq!(run_block(&mut t.engine, 8)[0], 0.0);
    }

    #[test]
    fn sample_time_advances_by_frames() {
        let mut t = harness(EngineOptions {
            block_size: 32,
            ..EngineOptions::default()
        });
        run_block(&mut t.engine, 32);
        run_block(&mut t.engine, 16);
        assert_eq!(t.engine.sample_time(), 48);
    }
}
