//! Arbor Runtime - the host-facing pairing of reconciler and engine
//!
//! [`Runtime::pair`] wires the two halves of the system together: a
//! [`Controller`] for the control thread (render value trees, poll events,
//! step GC, push resources) and a [`Processor`] for the audio thread (the
//! block callback). The only things that cross between them are the
//! bounded instruction channel and the event relay - the pair can be moved
//! to their threads independently.
//!
//! # Example
//!
//! ```rust
//! use arbor_core::{Props, props};
//! use arbor_graph::NodeValue;
//! use arbor_runtime::{Runtime, RuntimeConfig};
//!
//! let (mut controller, mut processor) = Runtime::pair(RuntimeConfig {
//!     block_size: 128,
//!     ..RuntimeConfig::default()
//! })
//! .unwrap();
//!
//! // Control thread: describe a 440Hz sine.
//! let fq = NodeValue::primitive("const", props([("value", 440.0)]), vec![]).unwrap();
//! let ph = NodeValue::primitive("phasor", Props::new(), vec![fq.into()]).unwrap();
//! let tau = NodeValue::primitive("const", props([("value", core::f64::consts::TAU)]), vec![])
//!     .unwrap();
//! let mul = NodeValue::primitive("mul", Props::new(), vec![tau.into(), ph.into()]).unwrap();
//! let root = NodeValue::primitive("sin", Props::new(), vec![mul.into()]).unwrap();
//! controller.render(&[root]).unwrap();
//!
//! // Audio thread: process a block.
//! let mut left = vec![0.0f32; 128];
//! let mut right = vec![0.0f32; 128];
//! let mut outputs: Vec<&mut [f32]> = vec![&mut left, &mut right];
//! processor.process(&[], &mut outputs, 128);
//! ```

pub mod config;

use thiserror::Error;

use arbor_core::{
    Instruction, InstructionBatch, NodeHash, Props, SharedBuffer, Value,
};
use arbor_engine::{
    BatchSender, ChannelError, Engine, EngineOptions, EventDrain, EventReceiver, NodeRegistry,
    event_channel, instruction_channel,
};
use arbor_graph::{
    GraphError, NodeRef, NodeValue, Reconciler, RenderContext, RenderDelegate, RenderStats,
};

pub use config::{ConfigError, RuntimeConfig};

/// Errors surfaced by control-side operations.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The render itself failed; nothing was committed.
    #[error(transparent)]
    Graph(#[from] GraphError),
    /// The render committed but the batch could not be enqueued.
    #[error("instruction channel: {0}")]
    Channel(#[from] ChannelError),
}

/// Constructor namespace for runtime pairs.
pub struct Runtime;

impl Runtime {
    /// Builds a controller/processor pair with the built-in node kinds.
    pub fn pair(config: RuntimeConfig) -> Result<(Controller, Processor), ConfigError> {
        Self::pair_with_registry(config, arbor_nodes::default_registry())
    }

    /// Builds a pair around a caller-assembled registry.
    ///
    /// Every kind in the registry is allowed through the reconciler's kind
    /// table, so host-registered kinds render without further setup.
    pub fn pair_with_registry(
        config: RuntimeConfig,
        registry: NodeRegistry,
    ) -> Result<(Controller, Processor), ConfigError> {
        config.validate()?;

        let (batch_tx, batch_rx) = instruction_channel(config.instruction_queue);
        let (relay, events) = event_channel(config.event_queue);

        let mut reconciler = Reconciler::new(RenderContext {
            sample_rate: config.sample_rate,
            block_size: config.block_size,
        });
        reconciler.set_terminal_generation(config.terminal_generation);
        for kind in registry.kinds() {
            reconciler.allow_kind(kind);
        }

        let engine = Engine::new(
            EngineOptions {
                sample_rate: config.sample_rate,
                block_size: config.block_size,
                channels: config.channels,
                terminal_generation: config.terminal_generation,
                gc_interval_blocks: config.gc_interval_blocks,
            },
            registry,
            batch_rx,
            relay,
        );

        tracing::info!(
            sample_rate = config.sample_rate,
            block_size = config.block_size,
            channels = config.channels,
            "arbor runtime constructed"
        );

        Ok((
            Controller {
                reconciler,
                delegate: ChannelDelegate {
                    sender: batch_tx,
                    pending: InstructionBatch::new(),
                    send_error: None,
                },
                events,
                fade_in_ms: config.fade_in_ms,
                fade_out_ms: config.fade_out_ms,
            },
            Processor { engine },
        ))
    }
}

/// Buffers instructions per render pass and ships each batch atomically
/// at the commit.
struct ChannelDelegate {
    sender: BatchSender,
    pending: InstructionBatch,
    send_error: Option<ChannelError>,
}

impl ChannelDelegate {
    fn take_send_error(&mut self) -> Option<ChannelError> {
        self.send_error.take()
    }
}

impl RenderDelegate for ChannelDelegate {
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
        let batch = std::mem::take(&mut self.pending);
        if let Err(error) = self.sender.send(batch) {
            tracing::warn!(%error, "dropping committed batch");
            self.send_error = Some(error);
        }
    }
}

/// Control-thread handle: renders trees and talks to the engine.
pub struct Controller {
    reconciler: Reconciler,
    delegate: ChannelDelegate,
    events: EventReceiver,
    fade_in_ms: f64,
    fade_out_ms: f64,
}

impl Controller {
    /// Renders a forest of roots with the configured default fades.
    pub fn render(&mut self, roots: &[NodeValue]) -> Result<RenderStats, RenderError> {
        self.render_with_fades(roots, self.fade_in_ms, self.fade_out_ms)
    }

    /// Renders with explicit fade windows for any root-set change.
    pub fn render_with_fades(
        &mut self,
        roots: &[NodeValue],
        fade_in_ms: f64,
        fade_out_ms: f64,
    ) -> Result<RenderStats, RenderError> {
        let stats =
            self.reconciler
                .render_with_delegate(&mut self.delegate, roots, fade_in_ms, fade_out_ms)?;
        match self.delegate.take_send_error() {
            Some(error) => Err(error.into()),
            None => Ok(stats),
        }
    }

    /// Writes changed props through a [`NodeRef`], bypassing a render.
    pub fn set_ref(&mut self, node_ref: &NodeRef, updates: &Props) -> Result<usize, RenderError> {
        let written = node_ref.set(&mut self.reconciler, &mut self.delegate, updates)?;
        match self.delegate.take_send_error() {
            Some(error) => Err(error.into()),
            None => Ok(written),
        }
    }

    /// One producer-side GC sweep; returns the number of nodes reclaimed.
    pub fn step_garbage_collector(&mut self) -> Result<usize, RenderError> {
        let removed = self.reconciler.step_garbage_collector(&mut self.delegate);
        match self.delegate.take_send_error() {
            Some(error) => Err(error.into()),
            None => Ok(removed),
        }
    }

    /// Inserts or replaces a named buffer in the engine's resource map.
    ///
    /// Push resources before rendering nodes that reference them - a
    /// `path` prop binds when its `SET_PROPERTY` applies.
    pub fn update_resource(
        &mut self,
        path: impl Into<String>,
        buffer: impl Into<SharedBuffer>,
    ) -> Result<(), RenderError> {
        let mut batch = InstructionBatch::new();
        batch.push(Instruction::UpdateResourceMap {
            path: path.into(),
            buffer: buffer.into(),
        });
        self.delegate.sender.send(batch).map_err(RenderError::from)
    }

    /// Asks every live node to clear its transient state.
    pub fn reset(&mut self) -> Result<(), RenderError> {
        let mut batch = InstructionBatch::new();
        batch.push(Instruction::Reset);
        self.delegate.sender.send(batch).map_err(RenderError::from)
    }

    /// Drains relayed engine events into `callback`.
    pub fn poll_events(&mut self, callback: impl FnMut(&str, &Value)) -> EventDrain {
        self.events.poll(callback)
    }

    /// Number of nodes in the retained (control-side) graph map.
    pub fn node_count(&self) -> usize {
        self.reconciler.node_count()
    }

    /// The root set from the last committed render.
    pub fn active_roots(&self) -> &[NodeHash] {
        self.reconciler.active_roots()
    }
}

/// Audio-thread handle: the block callback.
pub struct Processor {
    engine: Engine,
}

impl Processor {
    /// Processes one block of deinterleaved float planes.
    pub fn process(&mut self, inputs: &[&[f32]], outputs: &mut [&mut [f32]], frames: usize) {
        self.engine.process(inputs, outputs, frames);
    }

    /// The rolling sample-time counter.
    pub fn sample_time(&self) -> i64 {
        self.engine.sample_time()
    }

    /// Number of live nodes on the engine side.
    pub fn live_node_count(&self) -> usize {
        self.engine.live_node_count()
    }

    /// Number of active-plus-fading roots.
    pub fn active_root_count(&self) -> usize {
        self.engine.active_root_count()
    }

    /// Runs one engine GC sweep immediately.
    pub fn collect_garbage(&mut self) -> usize {
        self.engine.collect_garbage()
    }

    /// The underlying engine, for advanced hosts.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Mutable access to the underlying engine.
    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }
}
