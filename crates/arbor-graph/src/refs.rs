//! Stable node handles for fast property updates.
//!
//! A [`NodeRef`] pairs a keyed node value with a setter that bypasses full
//! reconciliation: it emits only `SET_PROPERTY` for fields that actually
//! changed, then commits. The reserved key pins the node's hash so the
//! handle stays valid across renders no matter what the props do.

use std::sync::atomic::{AtomicU64, Ordering};

use arbor_core::{Props, Value};

use crate::delegate::RenderDelegate;
use crate::error::GraphError;
use crate::reconciler::Reconciler;
use crate::value::{ChildRef, NodeValue};

static NEXT_REF_ID: AtomicU64 = AtomicU64::new(0);

/// A stable handle to one keyed node.
///
/// Create with [`NodeRef::create`], embed the returned value in a render
/// tree, then call [`set`](NodeRef::set) between renders for cheap
/// property-only updates.
///
/// Two caveats, both inherent to the bypass:
///
/// - the subtree under a ref must be composite-free (the setter relies on
///   the hash the first render memoizes, and composite subtrees are never
///   memoized);
/// - a later full render of the *original* value re-asserts the original
///   props - re-render updated values, or keep updating through the ref.
#[derive(Debug, Clone)]
pub struct NodeRef {
    value: NodeValue,
}

impl NodeRef {
    /// Creates a keyed primitive value and its ref handle.
    ///
    /// A caller-supplied `key` prop is respected; otherwise a reserved
    /// unique key is injected so the hash survives property changes.
    pub fn create(
        kind: impl Into<String>,
        mut props: Props,
        children: Vec<ChildRef>,
    ) -> Result<(NodeValue, NodeRef), GraphError> {
        if !props.contains_key("key") {
            let id = NEXT_REF_ID.fetch_add(1, Ordering::Relaxed);
            props.insert(String::from("key"), Value::from(format!("__ref_{id}")));
        }
        let value = NodeValue::primitive(kind, props, children)?;
        Ok((value.clone(), NodeRef { value }))
    }

    /// The value this ref tracks (for embedding in render trees).
    pub fn value(&self) -> &NodeValue {
        &self.value
    }

    /// Writes changed props directly, without a render pass.
    ///
    /// Emits `SET_PROPERTY` for each update that differs from the
    /// committed snapshot, then `COMMIT_UPDATES`. Returns the number of
    /// properties written. Fails with [`GraphError::RefNotMounted`] until
    /// a render has mounted the node.
    pub fn set<D: RenderDelegate>(
        &self,
        reconciler: &mut Reconciler,
        delegate: &mut D,
        updates: &Props,
    ) -> Result<usize, GraphError> {
        let hash = self.value.hash().ok_or(GraphError::RefNotMounted)?;
        reconciler.set_properties_direct(delegate, hash, updates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delegate::RecordingDelegate;
    use crate::value::RenderContext;
    use arbor_core::{Instruction, InstructionBatch, Props, props};

    fn ctx() -> RenderContext {
        RenderContext {
            sample_rate: 48000.0,
            block_size: 512,
        }
    }

    #[test]
    fn set_before_mount_fails() {
        let mut rec = Reconciler::new(ctx());
        let mut del = RecordingDelegate::new();
        let (_value, fq) = NodeRef::create("const", props([("value", 440.0)]), vec![]).unwrap();

        let err = fq.set(&mut rec, &mut del, &props([("value", 441.0)])).unwrap_err();
        assert!(matches!(err, GraphError::RefNotMounted));
    }

    #[test]
    fn set_emits_only_changed_props() {
        let mut rec = Reconciler::new(ctx());
        let mut del = RecordingDelegate::new();

        let (value, fq) = NodeRef::create("const", props([("value", 440.0)]), vec![]).unwrap();
        let root = NodeValue::primitive("sin", Props::new(), vec![value.into()]).unwrap();
        rec.render_with_delegate(&mut del, &[root], 10.0, 10.0).unwrap();

        let written = fq
            .set(&mut rec, &mut del, &props([("value", 441.0)]))
            .unwrap();
        assert_eq!(written, 1);

        let batch = del.last_batch().unwrap();
        assert_eq!(batch.count_tag(3), 1);
        assert_eq!(batch.count_tag(5), 1);
        assert_eq!(batch.count_tag(0), 0);

        // Unchanged value: nothing but the commit.
        let written = fq
            .set(&mut rec, &mut del, &props([("value", 441.0)]))
            .unwrap();
        assert_eq!(written, 0);
        assert_eq!(batch_tags(del.last_batch().unwrap()), [5]);
    }

    #[test]
    fn refs_keep_distinct_identities() {
        let (a, _) = NodeRef::create("const", props([("value", 1.0)]), vec![]).unwrap();
        let (b, _) = NodeRef::create("const", props([("value", 1.0)]), vec![]).unwrap();
        assert_ne!(
            a.props().get("key"),
            b.props().get("key"),
            "each ref gets a unique reserved key"
        );
    }

    #[test]
    fn caller_key_is_respected() {
        let (value, _) = NodeRef::create(
            "const",
            props([("key", Value::from("fq")), ("value", Value::from(440.0))]),
            vec![],
        )
        .unwrap();
        assert_eq!(value.props().get("key"), Some(&Value::from("fq")));
    }

    fn batch_tags(batch: &InstructionBatch) -> Vec<u8> {
        batch.iter().map(Instruction::tag).collect()
    }
}
