//! N-ary arithmetic nodes.

use libm::sinf;

use arbor_core::{
    AudioNode, BlockContext, PropertyStatus, ResourceMap, Value, fill_silence, is_reserved_prop,
};

fn accept_reserved(key: &str) -> PropertyStatus {
    if is_reserved_prop(key) {
        PropertyStatus::Ok
    } else {
        PropertyStatus::UnknownKey
    }
}

/// Sums all inputs sample-wise. No inputs produces silence.
#[derive(Debug, Default)]
pub struct Add;

impl Add {
    /// Creates a sum node.
    pub fn new() -> Self {
        Self
    }
}

impl AudioNode for Add {
    fn set_property(&mut self, key: &str, _: &Value, _: &ResourceMap) -> PropertyStatus {
        accept_reserved(key)
    }

    fn process(&mut self, ctx: &mut BlockContext<'_>) {
        fill_silence(ctx.outputs, ctx.frames);
        let out = &mut ctx.outputs[0][..ctx.frames];
        for input in ctx.inputs {
            for (sample, s) in out.iter_mut().zip(*input) {
                *sample += s;
            }
        }
    }
}

/// Multiplies all inputs sample-wise. No inputs produces silence.
#[derive(Debug, Default)]
pub struct Mul;

impl Mul {
    /// Creates a product node.
    pub fn new() -> Self {
        Self
    }
}

impl AudioNode for Mul {
    fn set_property(&mut self, key: &str, _: &Value, _: &ResourceMap) -> PropertyStatus {
        accept_reserved(key)
    }

    fn process(&mut self, ctx: &mut BlockContext<'_>) {
        let Some((first, rest)) = ctx.inputs.split_first() else {
            fill_silence(ctx.outputs, ctx.frames);
            return;
        };
        let out = &mut ctx.outputs[0][..ctx.frames];
        out.copy_from_slice(&first[..ctx.frames]);
        for input in rest {
            for (sample, s) in out.iter_mut().zip(*input) {
                *sample *= s;
            }
        }
    }
}

/// Sine of the first input, interpreted in radians.
#[derive(Debug, Default)]
pub struct Sin;

impl Sin {
    /// Creates a sine shaper.
    pub fn new() -> Self {
        Self
    }
}

impl AudioNode for Sin {
    fn set_property(&mut self, key: &str, _: &Value, _: &ResourceMap) -> PropertyStatus {
        accept_reserved(key)
    }

    fn process(&mut self, ctx: &mut BlockContext<'_>) {
        let Some(input) = ctx.inputs.first() else {
            fill_silence(ctx.outputs, ctx.frames);
            return;
        };
        for (sample, &x) in ctx.outputs[0][..ctx.frames].iter_mut().zip(*input) {
            *sample = sinf(x);
        }
    }
}
