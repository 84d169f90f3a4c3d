//! Producer-side node values.
//!
//! A [`NodeValue`] is an immutable description of a signal: a kind (either
//! a primitive name the engine knows, or a composite thunk that expands to
//! a subtree), a property bag, and up to eight ordered children. Values
//! are cheap to clone (`Arc`-shared) and structural sharing is the point:
//! rendering two trees that share a subtree costs one engine node.
//!
//! Children are [`ChildRef`]s - a node value with an output-channel
//! selection, or a bare number, which the reconciler substitutes with a
//! synthetic `const` node.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use arbor_core::{MAX_CHILDREN, NodeHash, Props};

use crate::error::GraphError;

/// Engine facts a composite expansion may depend on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderContext {
    /// Sample rate the engine runs at.
    pub sample_rate: f32,
    /// Maximum frames per process block.
    pub block_size: usize,
}

/// Arguments handed to a composite thunk when it expands.
pub struct CompositeArgs<'a> {
    /// The composite value's own props.
    pub props: &'a Props,
    /// The composite value's children, ready to embed in the expansion.
    pub children: &'a [ChildRef],
    /// Engine facts (sample rate, block size).
    pub context: RenderContext,
}

/// A deferred subtree builder.
///
/// Expansions are **not memoized**: every reference re-expands on every
/// render. Producers that want sharing share the expanded value itself.
pub type CompositeThunk =
    Arc<dyn Fn(&CompositeArgs<'_>) -> Result<NodeValue, GraphError> + Send + Sync>;

/// What a value resolves to: an engine primitive or a deferred expansion.
#[derive(Clone)]
pub enum NodeKind {
    /// A kind name registered with the engine.
    Primitive(String),
    /// A thunk that expands to a subtree during reconciliation.
    Composite(CompositeThunk),
}

impl core::fmt::Debug for NodeKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            NodeKind::Primitive(kind) => write!(f, "Primitive({kind})"),
            NodeKind::Composite(_) => write!(f, "Composite(..)"),
        }
    }
}

struct Inner {
    kind: NodeKind,
    props: Props,
    children: Vec<ChildRef>,
    /// Memoized content hash. Set during reconciliation, and only for
    /// subtrees with no composite anywhere below (a composite-free
    /// subtree always resolves to the same structure).
    hash: OnceLock<NodeHash>,
}

/// An immutable value describing one node of a signal expression tree.
#[derive(Clone)]
pub struct NodeValue {
    inner: Arc<Inner>,
}

impl NodeValue {
    /// Creates a primitive value.
    ///
    /// Fails with [`GraphError::TooManyChildren`] past eight children.
    /// Kind names are validated later, at render time, against the
    /// reconciler's kind table.
    pub fn primitive(
        kind: impl Into<String>,
        props: Props,
        children: Vec<ChildRef>,
    ) -> Result<NodeValue, GraphError> {
        let kind = kind.into();
        if children.len() > MAX_CHILDREN {
            return Err(GraphError::TooManyChildren {
                kind,
                count: children.len(),
            });
        }
        Ok(NodeValue {
            inner: Arc::new(Inner {
                kind: NodeKind::Primitive(kind),
                props,
                children,
                hash: OnceLock::new(),
            }),
        })
    }

    /// Creates a composite value around an expansion thunk.
    pub fn composite(
        thunk: CompositeThunk,
        props: Props,
        children: Vec<ChildRef>,
    ) -> Result<NodeValue, GraphError> {
        if children.len() > MAX_CHILDREN {
            return Err(GraphError::TooManyChildren {
                kind: String::from("composite"),
                count: children.len(),
            });
        }
        Ok(NodeValue {
            inner: Arc::new(Inner {
                kind: NodeKind::Composite(thunk),
                props,
                children,
                hash: OnceLock::new(),
            }),
        })
    }

    /// References a specific output channel of this value.
    pub fn output(&self, channel: u16) -> ChildRef {
        ChildRef::Node {
            value: self.clone(),
            channel,
        }
    }

    /// The value's kind.
    pub fn kind(&self) -> &NodeKind {
        &self.inner.kind
    }

    /// The value's props.
    pub fn props(&self) -> &Props {
        &self.inner.props
    }

    /// The value's ordered children.
    pub fn children(&self) -> &[ChildRef] {
        &self.inner.children
    }

    /// True when the kind is a composite thunk.
    pub fn is_composite(&self) -> bool {
        matches!(self.inner.kind, NodeKind::Composite(_))
    }

    /// The memoized content hash, if reconciliation has computed one.
    ///
    /// `None` until the value has been rendered, and permanently `None`
    /// for values with a composite anywhere in their subtree.
    pub fn hash(&self) -> Option<NodeHash> {
        self.inner.hash.get().copied()
    }

    pub(crate) fn memoize_hash(&self, hash: NodeHash) {
        let _ = self.inner.hash.set(hash);
    }
}

impl core::fmt::Debug for NodeValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NodeValue")
            .field("kind", &self.inner.kind)
            .field("props", &self.inner.props)
            .field("children", &self.inner.children.len())
            .finish()
    }
}

/// A child position: a node value used through one of its output
/// channels, or a bare number.
#[derive(Clone, Debug)]
pub enum ChildRef {
    /// Output `channel` of `value`.
    Node {
        /// The child value.
        value: NodeValue,
        /// Which of its output channels feeds this edge.
        channel: u16,
    },
    /// Sugar for `const { value: n }`.
    Number(f64),
}

impl From<NodeValue> for ChildRef {
    fn from(value: NodeValue) -> Self {
        ChildRef::Node { value, channel: 0 }
    }
}

impl From<&NodeValue> for ChildRef {
    fn from(value: &NodeValue) -> Self {
        ChildRef::Node {
            value: value.clone(),
            channel: 0,
        }
    }
}

impl From<f64> for ChildRef {
    fn from(n: f64) -> Self {
        ChildRef::Number(n)
    }
}

impl From<i32> for ChildRef {
    fn from(n: i32) -> Self {
        ChildRef::Number(f64::from(n))
    }
}

/// Builds a composite thunk from a closure.
///
/// ```rust
/// use arbor_core::props;
/// use arbor_graph::{NodeValue, composite_thunk};
///
/// let double = composite_thunk(|args| {
///     let x = args.children[0].clone();
///     NodeValue::primitive("mul", props([("key", "dbl")]), vec![x, 2.0.into()])
/// });
/// let node = NodeValue::composite(double, Default::default(), vec![1.0.into()]).unwrap();
/// assert!(node.is_composite());
/// ```
pub fn composite_thunk<F>(f: F) -> CompositeThunk
where
    F: Fn(&CompositeArgs<'_>) -> Result<NodeValue, GraphError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Resolver-internal cache type: hash → resolved node record.
pub(crate) type ResolvedMap = HashMap<NodeHash, ResolvedNode>;

/// A fully resolved (composite-free, number-substituted) node.
pub(crate) struct ResolvedNode {
    pub kind: String,
    pub props: Props,
    pub children: Vec<(NodeHash, u16)>,
}
