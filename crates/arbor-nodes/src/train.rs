//! Naive pulse train.

use arbor_core::{
    AudioNode, BlockContext, PropertyStatus, ResourceMap, Value, is_reserved_prop,
};

use crate::util::number;

/// A square pulse train: 1 for the first half of each period, 0 for the
/// second. Commonly the trigger source for `seq` and `sample` nodes.
///
/// Rate comes from the first input when connected, else the `value` prop.
#[derive(Debug)]
pub struct Train {
    phase: f32,
    rate: f32,
    sample_rate: f32,
}

impl Train {
    /// Creates a pulse train at rest.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            rate: 0.0,
            sample_rate,
        }
    }

    #[inline]
    fn advance(&mut self, rate: f32) -> f32 {
        let out = if self.phase < 0.5 { 1.0 } else { 0.0 };
        self.phase += rate / self.sample_rate;
        self.phase -= self.phase.floor();
        out
    }
}

impl AudioNode for Train {
    fn set_property(&mut self, key: &str, value: &Value, _: &ResourceMap) -> PropertyStatus {
        match key {
            "value" => match number(value) {
                Some(n) => {
                    self.rate = n;
                    PropertyStatus::Ok
                }
                None => PropertyStatus::InvalidType,
            },
            _ if is_reserved_prop(key) => PropertyStatus::Ok,
            _ => PropertyStatus::UnknownKey,
        }
    }

    fn process(&mut self, ctx: &mut BlockContext<'_>) {
        match ctx.inputs.first() {
            Some(rates) => {
                for (sample, &rate) in ctx.outputs[0][..ctx.frames].iter_mut().zip(*rates) {
                    *sample = self.advance(rate);
                }
            }
            None => {
                let rate = self.rate;
                for sample in &mut ctx.outputs[0][..ctx.frames] {
                    *sample = self.advance(rate);
                }
            }
        }
    }

    fn reset(&mut self) {
        self.phase = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::run_block;

    #[test]
    fn half_duty_square() {
        // 12kHz at 48kHz: period of 4 samples, 2 high then 2 low.
        let mut node = Train::new(48000.0);
        let rates = [12000.0f32; 8];
        let out = run_block(&mut node, &[&rates], 8);
        assert_eq!(out, [1.0, 1.0, 0.0, 0.0, 1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn zero_rate_holds_high() {
        let mut node = Train::new(48000.0);
        let rates = [0.0f32; 4];
        let out = run_block(&mut node, &[&rates], 4);
        assert_eq!(out, [1.0; 4]);
    }
}
