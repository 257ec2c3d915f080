//! One-dimensional unsteady open-channel flow (Saint-Venant equations) on a
//! rectangular reach, advanced by explicit finite differences under an
//! adaptive CFL-limited time step.

pub mod bc;
pub mod channel;
pub mod driver;
pub mod error;
pub mod faer_add;
pub mod forcing;
pub mod mesh;
pub mod method;
pub mod methods;
pub mod record;
pub mod sim;
pub mod state;
pub mod timestep;

pub use bc::{Boundaries, BoundaryEndpoint};
pub use channel::{Channel, GRAVITY};
pub use driver::{Budget, Driver, Logger, ObsCtx, Observer, Outcome, RunInfo, SnapshotWriter};
pub use error::{ConfigError, SimError};
pub use mesh::Grid;
pub use method::Method;
pub use record::{Peak, SimulationResult};
pub use sim::{Resolution, Simulation};
pub use state::State;
pub use timestep::TimeStepping;

/// What a [`Method`] needs to know about the step it is taking.
#[derive(Debug, Clone, Copy)]
pub struct Ctx<'a> {
    pub channel: &'a Channel,
    pub grid: &'a Grid,
    /// Index of the step being taken.
    pub n: usize,
    /// Time at the start of the step.
    pub t: f64,
    pub dt: f64,
}
