//! Constant signal source.

use arbor_core::{
    AudioNode, BlockContext, PropertyStatus, ResourceMap, Value, is_reserved_prop,
};

use crate::util::number;

/// Outputs its `value` prop on every sample.
///
/// This is also the node the reconciler synthesizes for bare-number
/// children, so it is by far the most common kind in real graphs.
#[derive(Debug, Default)]
pub struct Constant {
    value: f32,
}

impl Constant {
    /// Creates a constant at 0.
    pub fn new() -> Self {
        Self::default()
    }
}

impl AudioNode for Constant {
    fn set_property(&mut self, key: &str, value: &Value, _: &ResourceMap) -> PropertyStatus {
        match key {
            "value" => match number(value) {
                Some(n) => {
                    self.value = n;
                    PropertyStatus::Ok
                }
                None => PropertyStatus::InvalidType,
            },
            _ if is_reserved_prop(key) => PropertyStatus::Ok,
            _ => PropertyStatus::UnknownKey,
        }
    }

    fn process(&mut self, ctx: &mut BlockContext<'_>) {
        for sample in &mut ctx.outputs[0][..ctx.frames] {
            *sample = self.value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::run_block;

    #[test]
    fn outputs_its_value() {
        let mut node = Constant::new();
        let map = ResourceMap::new();
        assert!(
            node.set_property("value", &Value::from(0.5), &map).is_ok()
        );
        let out = run_block(&mut node, &[], 16);
        assert!(out.iter().all(|&s| s == 0.5));
    }

    #[test]
    fn rejects_non_numbers() {
        let mut node = Constant::new();
        let map = ResourceMap::new();
        assert_eq!(
            node.set_property("value", &Value::from("loud"), &map),
            PropertyStatus::InvalidType
        );
        assert_eq!(
            node.set_property("gain", &Value::from(1.0), &map),
            PropertyStatus::UnknownKey
        );
        assert!(node.set_property("key", &Value::from("fq"), &map).is_ok());
    }
}
