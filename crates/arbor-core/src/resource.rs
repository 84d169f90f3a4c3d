//! Shared sample buffers and the named resource map.
//!
//! A [`SharedBuffer`] is an immutable, atomically refcounted float32 array.
//! The control thread builds one, the audio thread only ever clones or
//! drops the handle - cloning is a refcount increment, so handing a buffer
//! across the thread boundary is allocation-free on the audio side.
//!
//! The [`ResourceMap`] is the "virtual file system": path-keyed buffers
//! that nodes bind at property-set time. Replacing a path swaps the entry;
//! nodes that already hold the old handle keep it until they rebind, and
//! [`ResourceMap::prune`] reclaims entries nobody holds anymore (use count
//! back down to the map's own reference).

#[cfg(not(feature = "std"))]
use alloc::{collections::BTreeMap, string::String, sync::Arc, vec::Vec};
#[cfg(feature = "std")]
use std::{collections::BTreeMap, sync::Arc};

/// An immutable, refcounted float32 buffer.
///
/// Equality is pointer identity: two buffers are equal only when they are
/// the same allocation. This is deliberate - it is the "shallow compare"
/// the reconciler and the hasher both use.
#[derive(Clone)]
pub struct SharedBuffer(Arc<[f32]>);

impl SharedBuffer {
    /// Wraps sample data in a shared handle.
    pub fn new(data: impl Into<Arc<[f32]>>) -> Self {
        SharedBuffer(data.into())
    }

    /// Returns the samples.
    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    /// Returns the number of samples.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the buffer holds no samples.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when both handles point at the same allocation.
    pub fn ptr_eq(&self, other: &SharedBuffer) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Number of live handles to this buffer (including this one).
    pub fn use_count(&self) -> usize {
        Arc::strong_count(&self.0)
    }
}

impl core::ops::Deref for SharedBuffer {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.0
    }
}

impl core::fmt::Debug for SharedBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "SharedBuffer(len={})", self.len())
    }
}

impl PartialEq for SharedBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl From<Vec<f32>> for SharedBuffer {
    fn from(data: Vec<f32>) -> Self {
        SharedBuffer(data.into())
    }
}

impl From<&[f32]> for SharedBuffer {
    fn from(data: &[f32]) -> Self {
        SharedBuffer(data.into())
    }
}

/// Path-keyed store of shared sample buffers.
#[derive(Debug, Default)]
pub struct ResourceMap {
    entries: BTreeMap<String, SharedBuffer>,
}

impl ResourceMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the buffer at `path`.
    ///
    /// Returns `true` when an existing entry was replaced. Holders of the
    /// old buffer keep it alive until they drop or rebind.
    pub fn update(&mut self, path: impl Into<String>, buffer: SharedBuffer) -> bool {
        self.entries.insert(path.into(), buffer).is_some()
    }

    /// Looks up the buffer at `path`.
    pub fn get(&self, path: &str) -> Option<&SharedBuffer> {
        self.entries.get(path)
    }

    /// True when `path` has an entry.
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Removes entries whose only remaining handle is the map's own.
    ///
    /// Returns the number of entries removed.
    pub fn prune(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, buffer| buffer.use_count() > 1);
        before - self.entries.len()
    }

    /// Iterates entry paths in sorted order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
