use thiserror::Error;

use crate::record::SimulationResult;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("channel parameter `{name}` must be positive and finite (got {value})")]
    NonPositive { name: &'static str, value: f64 },
    #[error("bed slope must be finite and non-negative (got {0})")]
    InvalidSlope(f64),
    #[error("reach length must be positive and finite (got {0})")]
    InvalidLength(f64),
    #[error("grid needs at least 3 nodes (got {0})")]
    TooFewNodes(usize),
    #[error("time stepping parameter `{name}` is invalid (got {value})")]
    InvalidTimeStepping { name: &'static str, value: f64 },
    #[error("dt_min ({min}) exceeds dt_max ({max})")]
    InvertedTimeBounds { min: f64, max: f64 },
    #[error("initial `{field}` has {got} values, grid has {expected} nodes")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("initial depth at node {node} is {value}, depths must be finite and non-negative")]
    InvalidInitialDepth { node: usize, value: f64 },
    #[error("initial discharge at node {node} is not finite")]
    InvalidInitialDischarge { node: usize },
    #[error("initial conditions have not been set")]
    MissingInitialConditions,
    #[error("boundary conditions have not been set")]
    MissingBoundaryConditions,
    #[error("run horizon `{name}` must be positive and finite (got {value})")]
    InvalidHorizon { name: &'static str, value: f64 },
    #[error("t_end={t_end} with dt_output={dt_output} asks for more samples than a run can hold")]
    TooManySamples { t_end: f64, dt_output: f64 },
}

#[derive(Error, Debug)]
pub enum SimError {
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigError),
    #[error("numerical instability at t={time:.3} s, node {node} (h={depth:e}, Q={discharge:e})")]
    NumericalInstability {
        time: f64,
        node: usize,
        depth: f64,
        discharge: f64,
        partial: Box<SimulationResult>,
    },
    #[error("time step clamped to dt_min={dt:e} for {steps} consecutive steps at t={time:.3} s")]
    TimestepUnderflow {
        time: f64,
        dt: f64,
        steps: usize,
        partial: Box<SimulationResult>,
    },
    #[error("normal depth for Q={discharge} did not converge after {iterations} iterations")]
    Convergence { discharge: f64, iterations: usize },
    #[error("output error")]
    Io(#[from] std::io::Error),
}

impl SimError {
    /// Samples recorded before the run was aborted, if any.
    pub fn partial_result(&self) -> Option<&SimulationResult> {
        match self {
            SimError::NumericalInstability { partial, .. }
            | SimError::TimestepUnderflow { partial, .. } => Some(partial),
            _ => None,
        }
    }
}
