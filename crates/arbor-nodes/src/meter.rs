//! Level metering passthrough.

#[cfg(not(feature = "std"))]
use alloc::string::String;

use arbor_core::{
    AudioNode, BlockContext, Props, PropertyStatus, ResourceMap, Value, fill_silence,
    is_reserved_prop,
};

/// Passes its first input through unchanged while tracking the block's
/// minimum and maximum sample, reported as a `meter` event at each drain:
/// `{ min, max, source }`.
#[derive(Debug, Default)]
pub struct Meter {
    source: Option<String>,
    pending: Option<(f32, f32)>,
}

impl Meter {
    /// Creates an unnamed meter.
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioNode for Meter {
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
            self.pending = Some((0.0, 0.0));
            return;
        };
        let mut min = f32::INFINITY;
        let mut max = f32::NEG_INFINITY;
        for (sample, &x) in ctx.outputs[0][..ctx.frames].iter_mut().zip(*input) {
            min = min.min(x);
            max = max.max(x);
            *sample = x;
        }
        if ctx.frames > 0 {
            self.pending = Some((min, max));
        }
    }

    fn process_events(&mut self, emit: &mut dyn FnMut(&str, Value)) {
        if let Some((min, max)) = self.pending.take() {
            let mut payload = Props::new();
            payload.insert("min".into(), Value::from(min));
            payload.insert("max".into(), Value::from(max));
            if let Some(source) = &self.source {
                payload.insert("source".into(), Value::from(source.clone()));
            }
            emit("meter", Value::Map(payload));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::run_block;

    #[test]
    fn passthrough_with_min_max_event() {
        let mut node = Meter::new();
        let map = ResourceMap::new();
        node.set_property("name", &Value::from("master"), &map);

        let input = [-0.5f32, 0.25, 0.75, 0.0];
        let out = run_block(&mut node, &[&input], 4);
        assert_eq!(out, input);

        let mut events = Vec::new();
        node.process_events(&mut |topic, payload| events.push((topic.to_string(), payload)));
        assert_eq!(events.len(), 1);
        let (topic, payload) = &events[0];
        assert_eq!(topic, "meter");
        let map = payload.as_map().unwrap();
        assert_eq!(map.get("min"), Some(&Value::from(-0.5f32)));
        assert_eq!(map.get("max"), Some(&Value::from(0.75f32)));
        assert_eq!(map.get("source"), Some(&Value::from("master")));
    }

    #[test]
    fn one_event_per_block() {
        let mut node = Meter::new();
        let input = [0.0f32; 4];
        run_block(&mut node, &[&input], 4);

        let mut count = 0;
        node.process_events(&mut |_, _| count += 1);
        node.process_events(&mut |_, _| count += 1);
        assert_eq!(count, 1, "pending readout is consumed by the drain");
    }
}
