//! Hardware input passthrough.

use arbor_core::{
    AudioNode, BlockContext, PropertyStatus, ResourceMap, Value, fill_silence, is_reserved_prop,
};

use crate::util::number;

/// Copies one hardware input channel to its output.
///
/// The executor hands `in` nodes the host's input planes in place of
/// child buffers; the `channel` prop selects which plane.
#[derive(Debug, Default)]
pub struct Input {
    channel: usize,
}

impl Input {
    /// Creates an input passthrough on channel 0.
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioNode for Input {
    fn set_property(&mut self, key: &str, value: &Value, _: &ResourceMap) -> PropertyStatus {
        match key {
            "channel" => match number(value) {
                Some(n) if n >= 0.0 => {
                    self.channel = n as usize;
                    PropertyStatus::Ok
                }
                Some(_) => PropertyStatus::InvalidValue,
                None => PropertyStatus::InvalidType,
            },
            _ if is_reserved_prop(key) => PropertyStatus::Ok,
            _ => PropertyStatus::UnknownKey,
        }
    }

    fn process(&mut self, ctx: &mut BlockContext<'_>) {
        match ctx.inputs.get(self.channel) {
            Some(plane) => ctx.outputs[0][..ctx.frames].copy_from_slice(&plane[..ctx.frames]),
            None => fill_silence(ctx.outputs, ctx.frames),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::run_block;

    #[test]
    fn copies_selected_channel() {
        let mut node = Input::new();
        let map = ResourceMap::new();
        node.set_property("channel", &Value::from(1.0), &map);

        let left = [0.1f32; 8];
        let right = [0.9f32; 8];
        let out = run_block(&mut node, &[&left, &right], 8);
        assert!(out.iter().all(|&s| s == 0.9));
    }

    #[test]
    fn missing_channel_is_silent() {
        let mut node = Input::new();
        let map = ResourceMap::new();
        node.set_property("channel", &Value::from(3.0), &map);
        let out = run_block(&mut node, &[], 8);
        assert!(out.iter().all(|&s| s == 0.0));
    }
}
