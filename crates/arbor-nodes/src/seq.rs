//! Triggered step sequencer.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use arbor_core::{
    AudioNode, BlockContext, PropertyStatus, ResourceMap, Value, fill_silence, is_reserved_prop,
};

use crate::util::EdgeDetector;

/// Steps through the `seq` array prop on rising edges of the first input,
/// holding the current step's value between triggers. Wraps at the end.
#[derive(Debug, Default)]
pub struct Seq {
    steps: Vec<f32>,
    index: usize,
    edge: EdgeDetector,
    /// A fresh sequence starts on its first step at the first trigger.
    primed: bool,
}

impl Seq {
    /// Creates an empty sequencer.
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioNode for Seq {
    fn set_property(&mut self, key: &str, value: &Value, _: &ResourceMap) -> PropertyStatus {
        match key {
            "seq" => match value.as_array() {
                Some(items) => {
                    let mut steps = Vec::with_capacity(items.len());
                    for item in items {
                        match item.as_number() {
                            Some(n) => steps.push(n as f32),
                            None => return PropertyStatus::InvalidValue,
                        }
                    }
                    self.steps = steps;
                    if self.index >= self.steps.len() {
                        self.index = 0;
                    }
                    PropertyStatus::Ok
                }
                None => PropertyStatus::InvalidType,
            },
            _ if is_reserved_prop(key) => PropertyStatus::Ok,
            _ => PropertyStatus::UnknownKey,
        }
    }

    fn process(&mut self, ctx: &mut BlockContext<'_>) {
        if self.steps.is_empty() {
            fill_silence(ctx.outputs, ctx.frames);
            return;
        }
        let Some(gate) = ctx.inputs.first() else {
            fill_silence(ctx.outputs, ctx.frames);
            return;
        };
        for (sample, &g) in ctx.outputs[0][..ctx.frames].iter_mut().zip(*gate) {
            if self.edge.feed(g) {
                if self.primed {
                    self.index = (self.index + 1) % self.steps.len();
                } else {
                    self.primed = true;
                }
            }
            *sample = if self.primed { self.steps[self.index] } else { 0.0 };
        }
    }

    fn reset(&mut self) {
        self.index = 0;
        self.primed = false;
        self.edge.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::run_block;

    fn seq_node(steps: &[f64]) -> Seq {
        let mut node = Seq::new();
        let map = ResourceMap::new();
        let value = Value::from(steps.iter().map(|&n| Value::from(n)).collect::<Vec<_>>());
        assert!(node.set_property("seq", &value, &map).is_ok());
        node
    }

    #[test]
    fn advances_on_rising_edges() {
        let mut node = seq_node(&[1.0, 2.0, 3.0]);
        let gate = [1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0];
        let out = run_block(&mut node, &[&gate], 8);
        assert_eq!(out, [1.0, 1.0, 2.0, 2.0, 3.0, 3.0, 1.0, 1.0]);
    }

    #[test]
    fn silent_before_first_trigger() {
        let mut node = seq_node(&[5.0]);
        let gate = [0.0, 0.0, 1.0, 1.0];
        let out = run_block(&mut node, &[&gate], 4);
        assert_eq!(out, [0.0, 0.0, 5.0, 5.0]);
    }

    #[test]
    fn rejects_non_numeric_steps() {
        let mut node = Seq::new();
        let map = ResourceMap::new();
        let value = Value::from(vec![Value::from(1.0), Value::from("x")]);
        assert_eq!(
            node.set_property("seq", &value, &map),
            PropertyStatus::InvalidValue
        );
    }

    #[test]
    fn reset_rewinds() {
        let mut node = seq_node(&[1.0, 2.0]);
        let gate = [1.0, 0.0, 1.0, 0.0];
        run_block(&mut node, &[&gate], 4);
        node.reset();
        let out = run_block(&mut node, &[&gate], 2);
        assert_eq!(out, [1.0, 1.0]);
    }
}
