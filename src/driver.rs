use std::{
    io::Write,
    time::{Duration, Instant},
};

use bytemuck::{bytes_of, cast_slice};
use faer_core::MatRef;

use crate::{
    bc::{Boundaries, BoundaryEndpoint},
    channel::Channel,
    error::{ConfigError, SimError},
    faer_add::col_to_vec,
    mesh::Grid,
    method::Method,
    record::{Recorder, SimulationResult},
    sim::Simulation,
    state::{first_invalid_node, State, DEPTH, DISCHARGE},
    timestep::{Controller, TimeStepping},
    Ctx,
};

/// Fixed facts about the run an observer is attached to.
#[derive(Debug, Clone, Copy)]
pub struct RunInfo {
    pub channel: Channel,
    pub grid: Grid,
    pub stepping: TimeStepping,
    pub method: &'static str,
    pub t_end: f64,
    pub dt_output: f64,
}

#[derive(Clone, Copy)]
pub struct ObsCtx<'ctx> {
    run: &'ctx RunInfo,

    // Iteration info
    iter: usize,
    time: f64,
    dt: f64,
    solution: MatRef<'ctx, f64>,
    previous: Option<MatRef<'ctx, f64>>,
}

impl<'ctx> ObsCtx<'ctx> {
    pub fn run(&self) -> &RunInfo {
        self.run
    }

    pub fn channel(&self) -> &Channel {
        &self.run.channel
    }

    pub fn grid(&self) -> &Grid {
        &self.run.grid
    }

    pub fn iter(&self) -> usize {
        self.iter
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    /// Size of the step that produced this state, zero before the first step.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    pub fn solution(&self) -> MatRef<'ctx, f64> {
        self.solution
    }

    /// State before the step just taken; only set in `at_step`.
    pub fn previous(&self) -> Option<MatRef<'ctx, f64>> {
        self.previous
    }

    pub fn depths(&self) -> Vec<f64> {
        col_to_vec(self.solution, DEPTH)
    }

    pub fn discharges(&self) -> Vec<f64> {
        col_to_vec(self.solution, DISCHARGE)
    }
}

#[allow(unused_variables)]
pub trait Observer {
    fn at_startup(&mut self, ctx: ObsCtx<'_>) -> Result<(), SimError> {
        Ok(())
    }

    fn at_step(&mut self, ctx: ObsCtx<'_>) -> Result<(), SimError> {
        Ok(())
    }

    fn at_sample(&mut self, ctx: ObsCtx<'_>) -> Result<(), SimError> {
        Ok(())
    }

    fn at_cleanup(&mut self, ctx: ObsCtx<'_>) -> Result<(), SimError> {
        Ok(())
    }
}

impl<O: Observer + ?Sized> Observer for &mut O {
    fn at_startup(&mut self, ctx: ObsCtx<'_>) -> Result<(), SimError> {
        (**self).at_startup(ctx)
    }

    fn at_step(&mut self, ctx: ObsCtx<'_>) -> Result<(), SimError> {
        (**self).at_step(ctx)
    }

    fn at_sample(&mut self, ctx: ObsCtx<'_>) -> Result<(), SimError> {
        (**self).at_sample(ctx)
    }

    fn at_cleanup(&mut self, ctx: ObsCtx<'_>) -> Result<(), SimError> {
        (**self).at_cleanup(ctx)
    }
}

/// Limits after which a run stops early with [`Outcome::Cancelled`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Budget {
    pub max_steps: Option<usize>,
    pub wall_clock: Option<Duration>,
}

impl Budget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_max_steps(mut self, steps: usize) -> Self {
        self.max_steps = Some(steps);
        self
    }

    pub fn with_wall_clock(mut self, limit: Duration) -> Self {
        self.wall_clock = Some(limit);
        self
    }

    fn exceeded(&self, steps: usize, started: Instant) -> bool {
        self.max_steps.is_some_and(|m| steps >= m)
            || self.wall_clock.is_some_and(|d| started.elapsed() >= d)
    }
}

#[derive(Debug)]
pub enum Outcome {
    Completed(SimulationResult),
    Cancelled(SimulationResult),
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }

    pub fn result(&self) -> &SimulationResult {
        match self {
            Outcome::Completed(r) | Outcome::Cancelled(r) => r,
        }
    }

    pub fn into_result(self) -> SimulationResult {
        match self {
            Outcome::Completed(r) | Outcome::Cancelled(r) => r,
        }
    }
}

pub struct Driver<'d, M> {
    pub(crate) sim: Simulation<M>,
    pub(crate) observers: Vec<Box<dyn Observer + 'd>>,
    pub(crate) initial: Option<State>,
    pub(crate) boundaries: Option<Boundaries>,
}

impl<'d, M: Method> Driver<'d, M> {
    pub fn new(sim: Simulation<M>) -> Self {
        Self {
            sim,
            observers: Vec::new(),
            initial: None,
            boundaries: None,
        }
    }

    pub fn simulation(&self) -> &Simulation<M> {
        &self.sim
    }

    pub fn with_observer(mut self, observer: impl Observer + 'd) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    pub fn set_initial_conditions(&mut self, h: &[f64], q: &[f64]) -> Result<(), SimError> {
        self.initial = Some(State::from_arrays(self.sim.grid.nodes(), h, q)?);
        Ok(())
    }

    pub fn set_uniform_initial(&mut self, h0: f64, q0: f64) -> Result<(), SimError> {
        self.initial = Some(State::uniform(self.sim.grid.nodes(), h0, q0)?);
        Ok(())
    }

    pub fn set_boundary_conditions(
        &mut self,
        upstream: BoundaryEndpoint,
        downstream: BoundaryEndpoint,
    ) {
        self.boundaries = Some(Boundaries::new(upstream, downstream));
    }

    /// Advances the stored initial condition from `t = 0` until every sample
    /// up to `t_end` is recorded, or until `budget` runs out.
    ///
    /// The edge nodes of the initial condition are replaced by the boundary
    /// values at `t = 0`.
    pub fn run(
        &mut self,
        t_end: f64,
        dt_output: f64,
        budget: Budget,
    ) -> Result<Outcome, SimError> {
        self.sim.validate()?;
        let initial = self
            .initial
            .as_ref()
            .ok_or(ConfigError::MissingInitialConditions)?;
        let boundaries = self
            .boundaries
            .as_ref()
            .ok_or(ConfigError::MissingBoundaryConditions)?;
        let mut recorder = Recorder::new(&self.sim.grid, t_end, dt_output)?;

        let Simulation {
            channel,
            grid,
            stepping,
            method,
        } = &mut self.sim;
        let channel: &Channel = channel;
        let grid: &Grid = grid;

        let info = RunInfo {
            channel: *channel,
            grid: *grid,
            stepping: *stepping,
            method: method.name(),
            t_end,
            dt_output,
        };

        if stepping.cfl > 1.0 {
            tracing::warn!(cfl = stepping.cfl, "CFL number above one, the scheme is unstable");
        }

        let mut controller = Controller::new(*stepping, grid.delta());
        let mut u = initial.u.clone();
        let mut v = initial.u.clone();
        let started = Instant::now();
        let mut t = 0.0;
        let mut n = 0;

        // set initial condition
        {
            boundaries.apply(t, u.as_mut());
            if let Some(node) = first_invalid_node(u.as_ref()) {
                return Err(instability(&recorder, t, node, u.as_ref()));
            }

            let ctx = Ctx {
                channel,
                grid,
                n,
                t,
                dt: 0.0,
            };
            method.init(ctx);

            tracing::info!(
                "start of simulation (`{}` method, Δx={:e} ({} nodes), CFL={}, t_end={})",
                info.method,
                grid.delta(),
                grid.nodes(),
                stepping.cfl,
                t_end,
            );

            let ctx = ObsCtx {
                run: &info,
                iter: n,
                time: t,
                dt: 0.0,
                solution: u.as_ref(),
                previous: None,
            };
            for o in self.observers.iter_mut() {
                o.at_startup(ctx)?;
            }

            recorder.record(t, channel, u.as_ref());
            for o in self.observers.iter_mut() {
                o.at_sample(ctx)?;
            }
        }

        // propagate solution
        let outcome_cancelled = loop {
            if recorder.is_complete() {
                break false;
            }
            if budget.exceeded(n, started) {
                tracing::info!(steps = n, time = t, "simulation budget exhausted");
                break true;
            }

            let step = controller.next(channel, u.as_ref());
            if controller.exhausted() {
                tracing::error!(time = t, limit = step.limit, "time step underflow");
                return Err(SimError::TimestepUnderflow {
                    time: t,
                    dt: step.dt,
                    steps: controller.underflows(),
                    partial: Box::new(recorder.snapshot()),
                });
            }

            let ctx = Ctx {
                channel,
                grid,
                n: n + 1,
                t,
                dt: step.dt,
            };

            // apply numerical method to u into v
            method.apply(ctx, u.as_ref(), v.as_mut());
            // apply boundary condition to v
            boundaries.apply(t + step.dt, v.as_mut());

            if let Some(node) = first_invalid_node(v.as_ref()) {
                return Err(instability(&recorder, t + step.dt, node, v.as_ref()));
            }

            // exchange u and v
            std::mem::swap(&mut u, &mut v);
            t += step.dt;
            n += 1;

            tracing::trace!(step = n, time = t, dt = step.dt);

            let ctx = ObsCtx {
                run: &info,
                iter: n,
                time: t,
                dt: step.dt,
                solution: u.as_ref(),
                previous: Some(v.as_ref()),
            };
            for o in self.observers.iter_mut() {
                o.at_step(ctx)?;
            }

            while recorder.is_due(t) {
                recorder.record(t, channel, u.as_ref());
                let ctx = ObsCtx {
                    previous: None,
                    ..ctx
                };
                for o in self.observers.iter_mut() {
                    o.at_sample(ctx)?;
                }
            }
        };

        let ctx = ObsCtx {
            run: &info,
            iter: n,
            time: t,
            dt: 0.0,
            solution: u.as_ref(),
            previous: None,
        };
        for o in self.observers.iter_mut() {
            o.at_cleanup(ctx)?;
        }

        let result = recorder.finish();
        Ok(if outcome_cancelled {
            Outcome::Cancelled(result)
        } else {
            Outcome::Completed(result)
        })
    }
}

fn instability(recorder: &Recorder, time: f64, node: usize, u: MatRef<'_, f64>) -> SimError {
    let (depth, discharge) = (u.read(node, DEPTH), u.read(node, DISCHARGE));
    tracing::error!(time, node, depth, discharge, "step rejected");
    SimError::NumericalInstability {
        time,
        node,
        depth,
        discharge,
        partial: Box::new(recorder.snapshot()),
    }
}

pub struct Logger;

impl Observer for Logger {
    fn at_startup(&mut self, ctx: ObsCtx<'_>) -> Result<(), SimError> {
        let run = ctx.run();
        tracing::info!(
            "simulating {} m reach (b={} m, S0={:e}, n={}) with `{}` until t={} s, sampling every {} s",
            run.grid.upper() - run.grid.lower(),
            run.channel.width(),
            run.channel.slope(),
            run.channel.manning(),
            run.method,
            run.t_end,
            run.dt_output,
        );
        Ok(())
    }

    fn at_step(&mut self, ctx: ObsCtx<'_>) -> Result<(), SimError> {
        tracing::trace!("step {}: t={:.3} s, dt={:.4} s", ctx.iter(), ctx.time(), ctx.dt());
        Ok(())
    }

    fn at_sample(&mut self, ctx: ObsCtx<'_>) -> Result<(), SimError> {
        let channel = ctx.channel();
        let (h, q) = (ctx.depths(), ctx.discharges());
        let h_max = h.iter().copied().fold(0.0, f64::max);
        let fr_max = h
            .iter()
            .zip(&q)
            .map(|(&h, &q)| channel.froude_number(h, q).abs())
            .fold(0.0, f64::max);
        tracing::debug!(
            "t={:.1} s (step {}): max depth {:.3} m, max Froude {:.3}",
            ctx.time(),
            ctx.iter(),
            h_max,
            fr_max
        );
        Ok(())
    }

    fn at_cleanup(&mut self, ctx: ObsCtx<'_>) -> Result<(), SimError> {
        tracing::info!(
            "finished simulation at t={:.1} s after {} steps",
            ctx.time(),
            ctx.iter()
        );
        Ok(())
    }
}

const SVSF1_HEADER: &[u8] = b"SVSF1";
const SVSF1_MARKER: [u8; 4] = [0xFF, 0xFF, 0xFF, 0xFF];

/// Streams every recorded sample as raw `f64` values.
///
/// Layout: header, then per sample `t`, `h[nx]`, `Q[nx]`, then a trailing
/// marker.
pub struct SnapshotWriter<W> {
    output: W,
}

impl<W: Write> SnapshotWriter<W> {
    pub fn new(output: W) -> Self {
        Self { output }
    }

    pub fn into_inner(self) -> W {
        self.output
    }
}

impl<W: Write> Observer for SnapshotWriter<W> {
    fn at_startup(&mut self, ctx: ObsCtx<'_>) -> Result<(), SimError> {
        let output = &mut self.output;
        let grid = ctx.grid();
        // magic bytes
        output.write_all(SVSF1_HEADER)?;
        // write float precision
        output.write_all(bytes_of(&(std::mem::size_of::<f64>() as u8)))?;
        // write dimensions and bounds
        output.write_all(bytes_of(&(grid.nodes() as u32)))?;
        output.write_all(bytes_of(&grid.lower()))?;
        output.write_all(bytes_of(&grid.upper()))?;
        // write method name
        let name = ctx.run().method.as_bytes();
        output.write_all(bytes_of(&(name.len() as u32)))?;
        output.write_all(name)?;

        output.write_all(&SVSF1_MARKER).map_err(SimError::from)
    }

    fn at_sample(&mut self, ctx: ObsCtx<'_>) -> Result<(), SimError> {
        self.output.write_all(bytes_of(&ctx.time()))?;
        self.output.write_all(cast_slice(&ctx.depths()))?;
        self.output
            .write_all(cast_slice(&ctx.discharges()))
            .map_err(SimError::from)
    }

    fn at_cleanup(&mut self, _ctx: ObsCtx<'_>) -> Result<(), SimError> {
        self.output.write_all(&SVSF1_MARKER)?;
        self.output.flush().map_err(SimError::from)
    }
}
