use std::fmt;

use crate::{
    channel::Channel, error::ConfigError, mesh::Grid, method::Method, methods,
    timestep::TimeStepping,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution {
    Delta(f64),
    Steps(usize),
}

/// A reach of channel together with its discretization.
pub struct Simulation<M> {
    pub(crate) channel: Channel,
    pub(crate) grid: Grid,
    pub(crate) stepping: TimeStepping,
    pub(crate) method: M,
}

impl Simulation<methods::Rusanov> {
    pub fn new(reach_length: f64, channel: Channel) -> Self {
        Self {
            channel,
            grid: Grid::from_steps(0.0, reach_length, 100),
            stepping: TimeStepping::default(),
            method: methods::Rusanov::default(),
        }
    }
}

impl<M: Method> Simulation<M> {
    pub fn with_space_resolution(mut self, r: Resolution) -> Self {
        self.grid = match r {
            Resolution::Delta(delta) => self.grid.with_delta(delta),
            Resolution::Steps(steps) => self.grid.with_steps(steps),
        };

        self
    }

    pub fn with_time_stepping(mut self, stepping: TimeStepping) -> Self {
        self.stepping = stepping;
        self
    }

    pub fn with_method<N: Method + Default>(self) -> Simulation<N> {
        Simulation {
            channel: self.channel,
            grid: self.grid,
            stepping: self.stepping,
            method: N::default(),
        }
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn time_stepping(&self) -> &TimeStepping {
        &self.stepping
    }

    pub fn method_name(&self) -> &'static str {
        self.method.name()
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        self.grid.validate()?;
        self.stepping.validate()
    }
}

impl<M: Method> fmt::Display for Simulation<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "channel of {} m (b = {} m, S0 = {:e}, n = {}):\n\t- `{}` method\n\t- Δx = {:e} ({} nodes)\n\t- CFL = {}",
            self.grid.upper - self.grid.lower,
            self.channel.width,
            self.channel.slope,
            self.channel.manning,
            self.method.name(),
            self.grid.delta,
            self.grid.nodes(),
            self.stepping.cfl,
        )
    }
}
