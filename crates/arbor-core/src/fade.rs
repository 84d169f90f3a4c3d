//! Linear gain fades for click-free root transitions.
//!
//! When the audible root set changes, the executor keeps evaluating both
//! the old and the new roots and cross-fades their contributions. Each
//! root carries a [`GainFade`]: a linear per-sample ramp from the current
//! gain to a target, sized so the whole transition spans the requested
//! millisecond window.
//!
//! The linear shape is what bounds the per-sample discontinuity: a fade
//! over `t` ms at sample rate `sr` never moves more than `1/(t·sr/1000)`
//! per sample.

/// A linearly advancing gain scalar.
#[derive(Debug, Clone)]
pub struct GainFade {
    /// Current gain.
    current: f32,
    /// Target gain we're ramping towards.
    target: f32,
    /// Per-sample increment (signed).
    increment: f32,
    /// Samples remaining until the target is reached.
    samples_remaining: u32,
}

impl GainFade {
    /// Creates a settled fade at `initial`.
    pub fn new(initial: f32) -> Self {
        Self {
            current: initial,
            target: initial,
            increment: 0.0,
            samples_remaining: 0,
        }
    }

    /// Ramps from the current gain to `target` over `time_ms`.
    ///
    /// A zero or negative window snaps immediately. Retargeting mid-ramp
    /// starts a fresh ramp from wherever the gain currently is, so an
    /// interrupted fade-in reverses without a jump.
    pub fn retarget(&mut self, target: f32, time_ms: f64, sample_rate: f32) {
        self.target = target;
        let samples = (time_ms / 1000.0 * f64::from(sample_rate)) as u32;
        if samples == 0 {
            self.current = target;
            self.increment = 0.0;
            self.samples_remaining = 0;
        } else {
            self.increment = (target - self.current) / samples as f32;
            self.samples_remaining = samples;
        }
    }

    /// Advances one sample and returns the new gain.
    #[inline]
    pub fn advance(&mut self) -> f32 {
        if self.samples_remaining > 0 {
            self.current += self.increment;
            self.samples_remaining -= 1;
            if self.samples_remaining == 0 {
                self.current = self.target; // Snap to exact target
            }
        }
        self.current
    }

    /// Advances `frames` samples without producing output.
    ///
    /// Used for roots whose node is missing (e.g. suppressed by an unknown
    /// kind) so their fade timing stays aligned with the block clock.
    pub fn advance_block(&mut self, frames: usize) {
        let skip = (frames as u32).min(self.samples_remaining);
        self.current += self.increment * skip as f32;
        self.samples_remaining -= skip;
        if self.samples_remaining == 0 {
            self.current = self.target;
        }
    }

    /// Multiply-accumulates `src` into `dst`, advancing the fade per
    /// sample.
    ///
    /// Settled fades take fast paths: unity gain adds directly, zero gain
    /// does nothing.
    pub fn mix_into(&mut self, src: &[f32], dst: &mut [f32]) {
        debug_assert_eq!(src.len(), dst.len());
        if self.samples_remaining == 0 {
            if self.current == 0.0 {
                return;
            }
            if self.current == 1.0 {
                for (d, s) in dst.iter_mut().zip(src) {
                    *d += s;
                }
                return;
            }
            let gain = self.current;
            for (d, s) in dst.iter_mut().zip(src) {
                *d += s * gain;
            }
            return;
        }
        for (d, s) in dst.iter_mut().zip(src) {
            *d += s * self.advance();
        }
    }

    /// Current gain, without advancing.
    #[inline]
    pub fn current(&self) -> f32 {
        self.current
    }

    /// Target gain.
    #[inline]
    pub fn target(&self) -> f32 {
        self.target
    }

    /// True when the ramp has reached its target.
    #[inline]
    pub fn is_settled(&self) -> bool {
        self.samples_remaining == 0
    }

    /// Jumps to the target immediately.
    pub fn snap_to_target(&mut self) {
        self.current = self.target;
        self.increment = 0.0;
        self.samples_remaining = 0;
    }
}

impl Default for GainFade {
    fn default() -> Self {
        Self::new(0.0)
    }
}
