//! Signal capture passthrough.

#[cfg(not(feature = "std"))]
use alloc::{string::String, vec, vec::Vec};

use arbor_core::{
    AudioNode, BlockContext, Props, PropertyStatus, ResourceMap, SharedBuffer, Value,
    fill_silence, is_reserved_prop,
};

/// Passes its first input through unchanged while capturing the block into
/// a retained frame, reported as a `scope` event at each drain:
/// `{ source, data }` where `data` is a float32 buffer.
#[derive(Debug)]
pub struct Scope {
    source: Option<String>,
    frame: Vec<f32>,
    captured: usize,
}

impl Scope {
    /// Creates a scope with a capture frame of `block_size` samples.
    pub fn new(block_size: usize) -> Self {
        Self {
            source: None,
            frame: vec![0.0; block_size],
            captured: 0,
        }
    }
}

impl AudioNode for Scope {
    fn set_property(&mut self, key: &str, value: &Value, _: &ResourceMap) -> PropertyStatus {
        match key {
            "name" => match value.as_str() {
                Some(name) => {
                    self.source = Some(String::from(name));
                    PropertyStatus::Ok
                }
                None => PropertyStatus::InvalidType,
            },
            _ if is_reserved_prop(key) => PropertyStatus::Ok,
            _ => PropertyStatus::UnknownKey,
        }
    }

    fn process(&mut self, ctx: &mut BlockContext<'_>) {
        let Some(input) = ctx.inputs.first() else {
            fill_silence(ctx.outputs, ctx.frames);
            self.captured = 0;
            return;
        };
        let frames = ctx.frames.min(self.frame.len());
        self.frame[..frames].copy_from_slice(&input[..frames]);
        self.captured = frames;
        ctx.outputs[0][..ctx.frames].copy_from_slice(&input[..ctx.frames]);
    }

    fn process_events(&mut self, emit: &mut dyn FnMut(&str, Value)) {
        if self.captured == 0 {
            return;
        }
        let mut payload = Props::new();
        payload.insert(
            "data".into(),
            Value::from(SharedBuffer::from(&self.frame[..self.captured])),
        );
        if let Some(source) = &self.source {
            payload.insert("source".into(), Value::from(source.clone()));
        }
        emit("scope", Value::Map(payload));
        self.captured = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::run_block;

    #[test]
    fn captures_the_block_it_passed_through() {
        let mut node = Scope::new(8);
        let input = [0.1f32, 0.2, 0.3, 0.4];
        let out = run_block(&mut node, &[&input], 4);
        assert_eq!(out, input);

        let mut frames = Vec::new();
        node.process_events(&mut |topic, payload| {
            assert_eq!(topic, "scope");
            let data = payload
                .as_map()
                .and_then(|m| m.get("data"))
                .and_then(Value::as_float32)
                .unwrap()
                .clone();
            frames.push(data);
        });
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_slice(), &input[..]);
    }

    #[test]
    fn nothing_to_report_without_input() {
        let mut node = Scope::new(8);
        run_block(&mut node, &[], 4);
        let mut count = 0;
        node.process_events(&mut |_, _| count += 1);
        assert_eq!(count, 0);
    }
}
