//! Phase ramp oscillator.

use arbor_core::{
    AudioNode, BlockContext, PropertyStatus, ResourceMap, Value, is_reserved_prop,
};

use crate::util::number;

/// A 0..1 ramp advancing at a rate in Hz.
///
/// The rate comes from the first input when one is connected (per-sample,
/// so FM works), otherwise from the `value` prop.
#[derive(Debug)]
pub struct Phasor {
    phase: f32,
    rate: f32,
    sample_rate: f32,
}

impl Phasor {
    /// Creates a phasor at rest.
    pub fn new(sample_rate: f32) -> Self {
        Self {
            phase: 0.0,
            rate: 0.0,
            sample_rate,
        }
    }

    #[inline]
    fn advance(&mut self, rate: f32) -> f32 {
        let out = self.phase;
        self.phase += rate / self.sample_rate;
        self.phase -= self.phase.floor();
        out
    }
}

impl AudioNode for Phasor {
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
