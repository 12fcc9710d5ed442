//! Gate envelope — a linear ramp that follows a binary open/closed target.
//!
//! The ramp is retriggered only when the resolved target differs from the
//! previous sample's target. Opening uses the attack time, closing uses the
//! release time, and each ramp starts from whatever value the gate holds.

/// Attack and release times in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RampTimes {
    pub attack_ms: f32,
    pub release_ms: f32,
}

/// Snapshot of the envelope between two samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GateState {
    current: f32,
    target: f32,
    remaining: u32,
    increment: f32,
}

impl GateState {
    /// Closed gate with a target no real sample can match, so the first
    /// sample always selects a ramp.
    pub const RESET: GateState = GateState {
        current: 0.0,
        target: -1.0,
        remaining: 0,
        increment: 0.0,
    };

    pub fn value(&self) -> f32 {
        self.current
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_ramping(&self) -> bool {
        self.remaining > 0
    }

    /// Advance one sample toward `target`.
    pub fn next(self, target: f32, ramp: RampTimes, sample_rate: f64) -> GateState {
        let mut next = self;

        if target != self.target {
            let ramp_ms = if target > self.target {
                ramp.attack_ms
            } else {
                ramp.release_ms
            };
            next.target = target;
            next.remaining = ramp_samples(ramp_ms, sample_rate);
            next.increment = if next.remaining > 0 {
                (target - self.current) / next.remaining as f32
            } else {
                0.0
            };
        }

        if next.remaining > 1 {
            next.remaining -= 1;
            next.current += next.increment;
        } else {
            next.remaining = 0;
            next.current = next.target;
        }
        next
    }
}

impl Default for GateState {
    fn default() -> Self {
        GateState::RESET
    }
}

/// Ramp length in whole samples. Zero means jump straight to the target.
pub fn ramp_samples(ramp_ms: f32, sample_rate: f64) -> u32 {
    let samples = (ramp_ms as f64 / 1000.0 * sample_rate).floor();
    if samples.is_finite() && samples > 0.0 {
        samples.min(u32::MAX as f64) as u32
    } else {
        0
    }
}

/// Gate envelope bound to a sample rate.
#[derive(Debug, Clone)]
pub struct GateSmoother {
    state: GateState,
    sample_rate: f64,
}

impl GateSmoother {
    pub fn new(sample_rate: f64) -> Self {
        GateSmoother {
            state: GateState::RESET,
            sample_rate,
        }
    }

    /// Return to the reset state, e.g. when the stream restarts or the rate changes.
    pub fn reset(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
        self.state = GateState::RESET;
    }

    #[inline]
    pub fn next_sample(&mut self, target: f32, ramp: RampTimes) -> f32 {
        self.state = self.state.next(target, ramp, self.sample_rate);
        self.state.value()
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}
