use crate::error::ConfigError;

// grid[0] <-> lower
// grid[i] <-> lower + i * delta forall i
// grid[steps] <-> upper
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Grid {
    pub(crate) lower: f64,
    pub(crate) upper: f64,
    pub(crate) delta: f64,
    pub(crate) steps: usize,
}

impl Grid {
    pub fn from_steps(lower: f64, upper: f64, steps: usize) -> Self {
        let delta = (upper - lower) / steps as f64;
        Self {
            lower,
            upper,
            delta,
            steps,
        }
    }

    /// Rounds the number of intervals up so that the spacing divides the
    /// interval exactly and never exceeds `delta`.
    pub fn from_delta(lower: f64, upper: f64, delta: f64) -> Self {
        let ratio = (upper - lower) / delta;
        // a degenerate spacing yields an empty grid, rejected by `validate`
        let steps = if ratio.is_finite() && ratio > 0.0 {
            ratio.ceil() as usize
        } else {
            0
        };
        Self::from_steps(lower, upper, steps)
    }

    pub fn with_delta(self, delta: f64) -> Self {
        Self::from_delta(self.lower, self.upper, delta)
    }

    pub fn with_steps(self, steps: usize) -> Self {
        Self::from_steps(self.lower, self.upper, steps)
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn delta(&self) -> f64 {
        self.delta
    }

    pub fn nodes(&self) -> usize {
        self.steps + 1
    }

    pub fn iter(self) -> impl Iterator<Item = f64> {
        (0..self.nodes()).map(move |i| self.lower + self.delta * i as f64)
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let length = self.upper - self.lower;
        if !length.is_finite() || length <= 0.0 {
            return Err(ConfigError::InvalidLength(length));
        }
        if self.nodes() < 3 || !self.delta.is_finite() {
            return Err(ConfigError::TooFewNodes(self.nodes()));
        }
        Ok(())
    }
}
