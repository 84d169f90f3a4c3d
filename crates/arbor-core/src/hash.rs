//! Structural content hashing.
//!
//! Every node value is addressed by a 31-bit hash of its kind, its props
//! (or its `key` prop alone, when present), and its children's
//! `(hash, output channel)` pairs. Equal structure means equal hash, which
//! is what lets the reconciler deduplicate shared subtrees and diff
//! successive render trees without walking old state.
//!
//! # Canonical props encoding
//!
//! When no `key` prop is present, props are serialized deterministically
//! and the resulting string is hashed. The encoding is fixed as:
//!
//! - entries render as `key:value,` in sorted key order (the [`Props`]
//!   map's native order);
//! - numbers use Rust's shortest round-trip `f64` formatting (`440`, not
//!   `440.0`);
//! - strings render verbatim, bools as `true`/`false`;
//! - arrays render as `[v,v,...]`, maps recurse as `{k:v,...}`;
//! - float32 buffers render by *identity* (`float32[len]@ptr`), never by
//!   contents - within a session, the same buffer hashes the same, and a
//!   replaced buffer re-hashes. Use a `key` prop for identity that must
//!   survive the process.
//!
//! Collisions at 31 bits are assumed rare enough to ignore for interactive
//! session durations; a user who needs forced identity sets `key`.

#[cfg(not(feature = "std"))]
use alloc::string::String;

use core::fmt::Write as _;

use crate::value::{Props, Value};

/// Prop name that short-circuits props hashing with a stable identity.
pub const KEY_PROP: &str = "key";

/// Prop name used when comparing composite expansion inputs.
pub const MEMO_KEY_PROP: &str = "memoKey";

/// Content address of a graph node: a 31-bit folded-positive hash.
///
/// Hash equality implies structural equality, modulo intentional
/// collisions forced with `key`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHash(u32);

impl NodeHash {
    /// Wraps a raw hash value (as carried on the instruction stream).
    pub const fn from_raw(raw: u32) -> Self {
        NodeHash(raw)
    }

    /// Returns the raw hash value.
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl core::fmt::Display for NodeHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:08x}", self.0)
    }
}

/// Folds a signed 32-bit accumulator into the positive 31-bit range.
const fn fold_positive(h: i32) -> u32 {
    (h as u32) & 0x7fff_ffff
}

/// Hashes a string: `h = (h << 5) - h + codepoint` over its chars,
/// folded positive.
pub fn hash_string(s: &str) -> u32 {
    let mut h: i32 = 0;
    for c in s.chars() {
        h = h
            .wrapping_shl(5)
            .wrapping_sub(h)
            .wrapping_add(c as u32 as i32);
    }
    fold_positive(h)
}

/// Folds one 32-bit value into a running hash, same mixing step as
/// [`hash_string`].
pub fn hash_combine(seed: u32, value: u32) -> u32 {
    let h = (seed as i32)
        .wrapping_shl(5)
        .wrapping_sub(seed as i32)
        .wrapping_add(value as i32);
    fold_positive(h)
}

/// Hashes a node from its kind, props, and child `(hash, channel)` pairs.
///
/// When `props` carries a string [`KEY_PROP`], only that key contributes;
/// otherwise the canonical props encoding does.
pub fn hash_node(kind: &str, props: &Props, children: &[(NodeHash, u16)]) -> NodeHash {
    hash_node_with(kind, props, children, KEY_PROP)
}

/// Like [`hash_node`] but keyed on [`MEMO_KEY_PROP`]; used only to compare
/// composite expansion inputs.
pub fn hash_memo_inputs(kind: &str, props: &Props, children: &[(NodeHash, u16)]) -> NodeHash {
    hash_node_with(kind, props, children, MEMO_KEY_PROP)
}

fn hash_node_with(
    kind: &str,
    props: &Props,
    children: &[(NodeHash, u16)],
    key_prop: &str,
) -> NodeHash {
    let mut h = hash_string(kind);
    match props.get(key_prop) {
        Some(Value::String(key)) => h = hash_combine(h, hash_string(key)),
        _ => h = hash_combine(h, hash_string(&canonical_props(props))),
    }
    for &(child, channel) in children {
        h = hash_combine(h, child.raw());
        h = hash_combine(h, u32::from(channel));
    }
    NodeHash(h)
}

/// Serializes props with the canonical encoding documented at module level.
pub fn canonical_props(props: &Props) -> String {
    let mut out = String::new();
    for (k, v) in props {
        out.push_str(k);
        out.push(':');
        write_value(&mut out, v);
        out.push(',');
    }
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Bool(b) => {
            out.push_str(if *b { "true" } else { "false" });
        }
        Value::Number(n) => {
            let _ = write!(out, "{n}");
        }
        Value::String(s) => out.push_str(s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Map(entries) => {
            out.push('{');
            for (i, (k, v)) in entries.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(k);
                out.push(':');
                write_value(out, v);
            }
            out.push('}');
        }
        Value::Float32(buffer) => {
            let _ = write!(out, "float32[{}]@{:p}", buffer.len(), buffer.as_slice());
        }
    }
}
