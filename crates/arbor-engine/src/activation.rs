//! Root activation and cross-fades.
//!
//! The controller tracks which top-level nodes are audible. An
//! `ACTIVATE_ROOTS` hands it a new root set: entering roots fade in from
//! their current gain, leaving roots fade out, and roots present in both
//! sets are untouched. During a transition both old and new roots stay in
//! the evaluation set, which is what makes the cross-fade audible; a root
//! whose fade-out has settled is retired.
//!
//! Each root remembers the output slot assigned by its position in the
//! activating set, so a fading-out root keeps mixing into the slot it was
//! activated on.

use arbor_core::{GainFade, NodeHash};

/// One tracked root.
#[derive(Debug)]
pub(crate) struct RootEntry {
    pub hash: NodeHash,
    /// Output channel slot this root mixes into.
    pub slot: usize,
    pub fade: GainFade,
    /// 1.0 for active/entering roots, 0.0 for leaving ones.
    pub target: f32,
}

/// Tracks the audible and fading root sets.
#[derive(Debug)]
pub struct RootActivation {
    entries: Vec<RootEntry>,
    sample_rate: f32,
}

impl RootActivation {
    /// Creates an empty controller.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            entries: Vec::new(),
            sample_rate,
        }
    }

    /// Applies an `ACTIVATE_ROOTS`: `roots` in output-slot order.
    pub fn activate(&mut self, roots: &[NodeHash], fade_in_ms: f64, fade_out_ms: f64) {
        // Leaving roots fade out.
        for entry in &mut self.entries {
            if entry.target == 1.0 && !roots.contains(&entry.hash) {
                entry.target = 0.0;
                entry.fade.retarget(0.0, fade_out_ms, self.sample_rate);
            }
        }

        for (slot, &hash) in roots.iter().enumerate() {
            match self.entries.iter_mut().find(|e| e.hash == hash) {
                Some(entry) => {
                    entry.slot = slot;
                    // Re-entering (possibly mid-fade-out) roots ramp back
                    // up from wherever they are; roots already active and
                    // settled are left as-is.
                    if entry.target != 1.0 || !entry.fade.is_settled() {
                        entry.target = 1.0;
                        entry.fade.retarget(1.0, fade_in_ms, self.sample_rate);
                    }
                }
                None => {
                    let mut fade = GainFade::new(0.0);
                    fade.retarget(1.0, fade_in_ms, self.sample_rate);
                    self.entries.push(RootEntry {
                        hash,
                        slot,
                        fade,
                        target: 1.0,
                    });
                }
            }
        }
    }

    /// Removes roots whose fade-out has settled. Returns how many retired.
    pub fn retire_settled(&mut self) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|e| !(e.target == 0.0 && e.fade.is_settled()));
        before - self.entries.len()
    }

    /// True when `hash` is an active or fading root.
    pub fn contains(&self, hash: NodeHash) -> bool {
        self.entries.iter().any(|e| e.hash == hash)
    }

    /// Iterates the union of active and fading roots, in activation order.
    pub fn hashes(&self) -> impl Iterator<Item = NodeHash> + '_ {
        self.entries.iter().map(|e| e.hash)
    }

    /// Number of tracked roots (active plus fading).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is audible or fading.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn entries_mut(&mut self) -> &mut [RootEntry] {
        &mut self.entries
    }
}
