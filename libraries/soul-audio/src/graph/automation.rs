//! Parameter automation on the engine clock
//!
//! Models `setTargetAtTime`: after `start_time` the value approaches the
//! target exponentially, `v(t) = target + (v0 - target) * e^(-(t - t0) / tau)`.

/// Past this many time constants the curve is treated as settled
const SETTLE_TIME_CONSTANTS: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutomatedParam {
    start_value: f32,
    target: f32,
    start_time: f64,
    time_constant: f64,
    min: f32,
    max: f32,
}

impl AutomatedParam {
    /// Create a parameter resting at `value`, clamped to `[min, max]`
    pub fn new(value: f32, min: f32, max: f32) -> Self {
        let value = value.clamp(min, max);
        Self {
            start_value: value,
            target: value,
            start_time: 0.0,
            time_constant: 0.0,
            min,
            max,
        }
    }

    /// Value at engine time `time`
    pub fn value_at(&self, time: f64) -> f32 {
        if time < self.start_time {
            return self.start_value;
        }
        let elapsed = time - self.start_time;
        if self.time_constant <= 0.0 || elapsed >= self.time_constant * SETTLE_TIME_CONSTANTS {
            return self.target;
        }
        let decay = (-elapsed / self.time_constant).exp() as f32;
        self.target + (self.start_value - self.target) * decay
    }

    /// Final value of the current automation
    pub fn target(&self) -> f32 {
        self.target
    }

    /// Schedule an exponential approach to `target`
    ///
    /// The new curve starts from wherever the previous one is at
    /// `start_time`, so back-to-back updates never jump.
    pub fn set_target_at_time(&mut self, target: f32, start_time: f64, time_constant: f64) {
        let from = self.value_at(start_time);
        self.start_value = from;
        self.target = target.clamp(self.min, self.max);
        self.start_time = start_time;
        self.time_constant = time_constant.max(0.0);
    }
}
