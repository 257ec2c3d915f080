//! CFL-limited adaptive time step.

use faer_core::MatRef;

use crate::{channel::Channel, error::ConfigError, state::max_wave_speed};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeStepping {
    pub cfl: f64,
    pub dt_min: f64,
    pub dt_max: f64,
    /// Fixed step replacing the CFL estimate.
    pub dt_override: Option<f64>,
    /// Consecutive steps allowed below `dt_min` before giving up.
    pub max_underflow_steps: usize,
}

impl Default for TimeStepping {
    fn default() -> Self {
        Self {
            cfl: 0.8,
            dt_min: 1e-3,
            dt_max: 600.0,
            dt_override: None,
            max_underflow_steps: 100,
        }
    }
}

impl TimeStepping {
    pub fn with_cfl(mut self, cfl: f64) -> Self {
        self.cfl = cfl;
        self
    }

    pub fn with_bounds(mut self, dt_min: f64, dt_max: f64) -> Self {
        self.dt_min = dt_min;
        self.dt_max = dt_max;
        self
    }

    pub fn with_dt_override(mut self, dt: f64) -> Self {
        self.dt_override = Some(dt);
        self
    }

    pub fn with_max_underflow_steps(mut self, steps: usize) -> Self {
        self.max_underflow_steps = steps;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let check = |name, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ConfigError::InvalidTimeStepping { name, value })
            }
        };
        check("cfl", self.cfl)?;
        check("dt_min", self.dt_min)?;
        check("dt_max", self.dt_max)?;
        if let Some(dt) = self.dt_override {
            check("dt_override", dt)?;
        }
        if self.dt_min > self.dt_max {
            return Err(ConfigError::InvertedTimeBounds {
                min: self.dt_min,
                max: self.dt_max,
            });
        }
        Ok(())
    }

    /// Largest step the CFL condition allows on the state `u`, before
    /// clamping. A reach with no wave motion at all is unbounded.
    pub fn cfl_limit(&self, channel: &Channel, dx: f64, u: MatRef<'_, f64>) -> f64 {
        let speed = max_wave_speed(channel, u);
        if speed > 0.0 {
            self.cfl * dx / speed
        } else {
            f64::INFINITY
        }
    }
}

/// What the controller decided for one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepSize {
    pub dt: f64,
    /// Unclamped CFL estimate.
    pub limit: f64,
    /// Set when the estimate fell below `dt_min`.
    pub underflow: bool,
}

#[derive(Debug, Clone)]
pub struct Controller {
    config: TimeStepping,
    dx: f64,
    underflows: usize,
    override_warned: bool,
}

impl Controller {
    pub fn new(config: TimeStepping, dx: f64) -> Self {
        Self {
            config,
            dx,
            underflows: 0,
            override_warned: false,
        }
    }

    pub fn config(&self) -> &TimeStepping {
        &self.config
    }

    /// Consecutive steps taken at `dt_min` because the CFL estimate was
    /// smaller.
    pub fn underflows(&self) -> usize {
        self.underflows
    }

    pub fn exhausted(&self) -> bool {
        self.underflows > self.config.max_underflow_steps
    }

    pub fn next(&mut self, channel: &Channel, u: MatRef<'_, f64>) -> StepSize {
        let limit = self.config.cfl_limit(channel, self.dx, u);

        if let Some(dt) = self.config.dt_override {
            if dt > limit && !self.override_warned {
                tracing::warn!(dt, limit, "fixed time step exceeds the CFL limit");
                self.override_warned = true;
            }
            return StepSize {
                dt,
                limit,
                underflow: false,
            };
        }

        let underflow = limit < self.config.dt_min;
        if underflow {
            self.underflows += 1;
        } else {
            self.underflows = 0;
        }

        StepSize {
            dt: limit.clamp(self.config.dt_min, self.config.dt_max),
            limit,
            underflow,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::State;

    fn channel() -> Channel {
        Channel::new(10.0, 1e-3, 0.03).unwrap()
    }

    #[test]
    fn step_follows_the_fastest_wave() {
        let c = channel();
        let s = State::from_arrays(3, &[1.0, 4.0, 1.0], &[0.0, 40.0, 0.0]).unwrap();
        let mut ctl = Controller::new(TimeStepping::default().with_cfl(0.5), 100.0);
        let step = ctl.next(&c, s.as_ref());
        let speed = 1.0 + (9.81f64 * 4.0).sqrt();
        assert!((step.dt - 0.5 * 100.0 / speed).abs() < 1e-12);
        assert!(!step.underflow);
    }

    #[test]
    fn still_dry_reach_takes_dt_max() {
        let s = State::uniform(3, 0.0, 0.0).unwrap();
        let mut ctl = Controller::new(TimeStepping::default(), 100.0);
        assert_eq!(ctl.next(&channel(), s.as_ref()).dt, 600.0);
    }

    #[test]
    fn underflow_counts_consecutive_clamps() {
        let s = State::uniform(3, 100.0, 0.0).unwrap();
        let config = TimeStepping::default()
            .with_bounds(1.0, 10.0)
            .with_max_underflow_steps(2);
        let mut ctl = Controller::new(config, 1.0);
        for _ in 0..2 {
            let step = ctl.next(&channel(), s.as_ref());
            assert!(step.underflow);
            assert_eq!(step.dt, 1.0);
            assert!(!ctl.exhausted());
        }
        ctl.next(&channel(), s.as_ref());
        assert!(ctl.exhausted());

        let calm = State::uniform(3, 0.01, 0.0).unwrap();
        ctl.next(&channel(), calm.as_ref());
        assert_eq!(ctl.underflows(), 0);
    }

    #[test]
    fn override_ignores_the_cfl_estimate() {
        let s = State::uniform(3, 1.0, 0.0).unwrap();
        let mut ctl = Controller::new(TimeStepping::default().with_dt_override(42.0), 1.0);
        let step = ctl.next(&channel(), s.as_ref());
        assert_eq!(step.dt, 42.0);
        assert!(step.limit < 42.0);
    }

    #[test]
    fn validation() {
        assert!(TimeStepping::default().validate().is_ok());
        assert!(TimeStepping::default().with_cfl(1.5).validate().is_ok());
        assert!(matches!(
            TimeStepping::default().with_cfl(0.0).validate(),
            Err(ConfigError::InvalidTimeStepping { name: "cfl", .. })
        ));
        assert!(matches!(
            TimeStepping::default().with_bounds(5.0, 1.0).validate(),
            Err(ConfigError::InvertedTimeBounds { .. })
        ));
    }
}
