//! Second-order IIR filter with signal-rate coefficients.

use arbor_core::{
    AudioNode, BlockContext, PropertyStatus, ResourceMap, Value, fill_silence, is_reserved_prop,
};

/// Direct Form I biquad whose coefficients arrive as inputs.
///
/// Input order: `b0, b1, b2, a1, a2, x` - five coefficient signals and the
/// signal to filter, all sample-rate. Composite helpers compute cookbook
/// coefficients upstream (as `const` nodes for fixed filters); this node
/// just runs the difference equation:
///
/// ```text
/// y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]
/// ```
#[derive(Debug, Default)]
pub struct Biquad {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

impl Biquad {
    /// Creates a biquad with cleared delay lines.
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioNode for Biquad {
    fn set_property(&mut self, key: &str, _: &Value, _: &ResourceMap) -> PropertyStatus {
        if is_reserved_prop(key) {
            PropertyStatus::Ok
        } else {
            PropertyStatus::UnknownKey
        }
    }

    fn process(&mut self, ctx: &mut BlockContext<'_>) {
        if ctx.inputs.len() < 6 {
            fill_silence(ctx.outputs, ctx.frames);
            return;
        }
        let (b0, b1, b2, a1, a2, x) = (
            ctx.inputs[0],
            ctx.inputs[1],
            ctx.inputs[2],
            ctx.inputs[3],
            ctx.inputs[4],
            ctx.inputs[5],
        );
        for (i, sample) in ctx.outputs[0][..ctx.frames].iter_mut().enumerate() {
            let input = x[i];
            let output = b0[i] * input + b1[i] * self.x1 + b2[i] * self.x2
                - a1[i] * self.y1
                - a2[i] * self.y2;

            self.x2 = self.x1;
            self.x1 = input;
            self.y2 = self.y1;
            self.y1 = output;

            *sample = output;
        }
    }

    fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}
