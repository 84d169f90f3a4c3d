//! One-shot sample playback.

use arbor_core::{
    AudioNode, BlockContext, PropertyStatus, ResourceMap, SharedBuffer, Value, is_reserved_prop,
};

use crate::util::EdgeDetector;

/// Plays the resource named by the `path` prop from the start on each
/// rising edge of the first input, then silence after the last sample.
///
/// The buffer handle is bound when `path` is written and held until the
/// prop is rebound - replacing the resource map entry does not disturb
/// playback in flight.
#[derive(Debug, Default)]
pub struct Sample {
    buffer: Option<SharedBuffer>,
    position: usize,
    playing: bool,
    edge: EdgeDetector,
}

impl Sample {
    /// Creates a sample player with no buffer bound.
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioNode for Sample {
    fn set_property(
        &mut self,
        key: &str,
        value: &Value,
        resources: &ResourceMap,
    ) -> PropertyStatus {
        match key {
            "path" => match value.as_str() {
                Some(path) => match resources.get(path) {
                    Some(buffer) => {
                        self.buffer = Some(buffer.clone());
                        self.position = 0;
                        self.playing = false;
                        PropertyStatus::Ok
                    }
                    None => PropertyStatus::InvalidValue,
                },
                None => PropertyStatus::InvalidType,
            },
            _ if is_reserved_prop(key) => PropertyStatus::Ok,
            _ => PropertyStatus::UnknownKey,
        }
    }

    fn process(&mut self, ctx: &mut BlockContext<'_>) {
        let out = &mut ctx.outputs[0][..ctx.frames];
        let gate = ctx.inputs.first();
        let Some(buffer) = &self.buffer else {
            for sample in out.iter_mut() {
                *sample = 0.0;
            }
            return;
        };

        for (i, sample) in out.iter_mut().enumerate() {
            let g = gate.map_or(0.0, |plane| plane[i]);
            if self.edge.feed(g) {
                self.position = 0;
                self.playing = true;
            }
            if self.playing && self.position < buffer.len() {
                *sample = buffer.as_slice()[self.position];
                self.position += 1;
            } else {
                self.playing = false;
                *sample = 0.0;
            }
        }
    }

    fn reset(&mut self) {
        self.position = 0;
        self.playing = false;
        self.edge.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::run_block;

    fn bound_sample() -> Sample {
        let mut map = ResourceMap::new();
        map.update("hit.wav", SharedBuffer::from(vec![0.9, 0.6, 0.3]));
        let mut node = Sample::new();
        assert!(
            node.set_property("path", &Value::from("hit.wav"), &map)
                .is_ok()
        );
        node
    }

    #[test]
    fn plays_once_per_trigger() {
        let mut node = bound_sample();
        let gate = [1.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let out = run_block(&mut node, &[&gate], 6);
        assert_eq!(out, [0.9, 0.6, 0.3, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn retrigger_restarts_playback() {
        let mut node = bound_sample();
        let gate = [1.0, 0.0, 1.0, 0.0];
        let out = run_block(&mut node, &[&gate], 4);
        assert_eq!(out, [0.9, 0.6, 0.9, 0.6]);
    }

    #[test]
    fn missing_resource_is_invalid() {
        let map = ResourceMap::new();
        let mut node = Sample::new();
        assert_eq!(
            node.set_property("path", &Value::from("nope.wav"), &map),
            PropertyStatus::InvalidValue
        );
    }

    #[test]
    fn held_buffer_survives_map_replacement() {
        let mut map = ResourceMap::new();
        map.update("hit.wav", SharedBuffer::from(vec![0.9]));
        let mut node = Sample::new();
        node.set_property("path", &Value::from("hit.wav"), &map);

        map.update("hit.wav", SharedBuffer::from(vec![0.1]));
        let gate = [1.0, 0.0];
        let out = run_block(&mut node, &[&gate], 2);
        assert_eq!(out[0], 0.9, "node keeps its bound handle until rebound");
    }
}
