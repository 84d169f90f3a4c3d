//! Arbor Graph - producer-side value trees and the reconciler
//!
//! This crate is the non-realtime half of the runtime: it builds immutable
//! signal expression trees and diffs successive render passes into minimal
//! instruction batches for the engine.
//!
//! # Core Abstractions
//!
//! - [`NodeValue`] - immutable node description (kind, props, children)
//! - [`ChildRef`] - a child position with output-channel selection and
//!   bare-number sugar
//! - [`Reconciler`] - content-hashed diffing and instruction emission
//! - [`RenderDelegate`] - the instruction sink a render pass drives
//! - [`NodeRef`] - stable handles for render-free property updates
//!
//! # Example
//!
//! ```rust
//! use arbor_core::{Props, props};
//! use arbor_graph::{NodeValue, Reconciler, RecordingDelegate, RenderContext};
//!
//! let fq = NodeValue::primitive("const", props([("value", 440.0)]), vec![]).unwrap();
//! let ph = NodeValue::primitive("phasor", Props::new(), vec![fq.into()]).unwrap();
//! let root = NodeValue::primitive("sin", Props::new(), vec![ph.into()]).unwrap();
//!
//! let mut reconciler = Reconciler::new(RenderContext {
//!     sample_rate: 48000.0,
//!     block_size: 512,
//! });
//! let mut delegate = RecordingDelegate::new();
//! let stats = reconciler
//!     .render_with_delegate(&mut delegate, &[root], 20.0, 20.0)
//!     .unwrap();
//! assert_eq!(stats.nodes_added, 3);
//! ```

pub mod delegate;
pub mod error;
pub mod reconciler;
pub mod refs;
pub mod value;

// Re-export main types at crate root
pub use delegate::{RecordingDelegate, RenderDelegate};
pub use error::GraphError;
pub use reconciler::{DEFAULT_TERMINAL_GENERATION, Reconciler, RenderStats};
pub use refs::NodeRef;
pub use value::{
    ChildRef, CompositeArgs, CompositeThunk, NodeKind, NodeValue, RenderContext, composite_thunk,
};
