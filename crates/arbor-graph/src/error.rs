//! Construction- and render-time errors.
//!
//! These are the producer-side failures: they abort the whole render call
//! before anything reaches the instruction channel. Engine-side failures
//! never surface here - they become `error` events on the relay.

use thiserror::Error;

use arbor_core::MAX_CHILDREN;

/// Errors raised while building values or rendering them.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A node value declared more children than the graph supports.
    #[error("node '{kind}' has {count} children; the maximum is {MAX_CHILDREN}")]
    TooManyChildren {
        /// Kind of the offending node.
        kind: String,
        /// Number of children it declared.
        count: usize,
    },

    /// A primitive kind is not in the reconciler's kind table.
    #[error("unknown node kind '{0}'")]
    UnknownKind(String),

    /// A composite thunk failed to expand.
    #[error("composite expansion failed: {0}")]
    CompositeFailed(String),

    /// A ref setter ran before the ref's node was mounted by a render.
    #[error("ref has not been mounted by a render yet")]
    RefNotMounted,
}
