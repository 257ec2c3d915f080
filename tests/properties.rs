//! Invariants every accepted run must satisfy: convergence to normal depth,
//! the CFL bound on each step, non-negative depths, volume balance and
//! uniformity under pure extrapolation.

use stvenant::{
    forcing::{self, TriangularHydrograph},
    methods::{LaxFriedrichs, Rusanov},
    BoundaryEndpoint, Budget, Channel, Driver, Method, ObsCtx, Observer, Outcome, Resolution,
    SimError, Simulation, SimulationResult, TimeStepping,
};

const HOUR: f64 = 3600.0;

fn completed(outcome: Outcome) -> SimulationResult {
    assert!(outcome.is_completed());
    outcome.into_result()
}

fn flood_driver<'d, M: Method + Default>(dx: f64, cfl: f64) -> (Channel, Driver<'d, M>) {
    let channel = Channel::new(80.0, 1e-4, 0.03).unwrap();
    let sim = Simulation::new(50_000.0, channel)
        .with_space_resolution(Resolution::Delta(dx))
        .with_time_stepping(TimeStepping::default().with_cfl(cfl))
        .with_method::<M>();
    let mut driver = Driver::new(sim);
    driver
        .set_uniform_initial(channel.normal_depth(500.0).unwrap(), 500.0)
        .unwrap();
    let inflow = TriangularHydrograph::new(500.0, 2000.0, 6.0 * HOUR, 6.0 * HOUR, 12.0 * HOUR);
    driver.set_boundary_conditions(
        inflow.into_stage_discharge(channel).unwrap(),
        BoundaryEndpoint::Extrapolated,
    );
    (channel, driver)
}

#[test]
fn converges_to_normal_depth() {
    let channel = Channel::new(20.0, 1e-3, 0.03).unwrap();
    let q0 = 50.0;
    let hn = channel.normal_depth(q0).unwrap();

    let sim = Simulation::new(10_000.0, channel)
        .with_space_resolution(Resolution::Delta(500.0))
        .with_time_stepping(TimeStepping::default().with_cfl(0.5));
    let mut driver = Driver::new(sim);
    driver.set_uniform_initial(1.2 * hn, q0).unwrap();
    driver.set_boundary_conditions(forcing::constant(hn, q0), forcing::constant(hn, q0));

    let result = completed(driver.run(48.0 * HOUR, HOUR, Budget::unlimited()).unwrap());
    let last = result.samples() - 1;
    for (h, q) in result
        .depth_profile(last)
        .into_iter()
        .zip(result.discharge_profile(last))
    {
        assert!((h - hn).abs() < 1e-3, "h = {h}, normal depth {hn}");
        assert!((q - q0).abs() < 5e-2, "Q = {q}");
    }
}

/// Checks every step against the CFL bound of the state it started from.
struct CflProbe {
    steps: usize,
    worst_ratio: f64,
}

impl Observer for CflProbe {
    fn at_step(&mut self, ctx: ObsCtx<'_>) -> Result<(), SimError> {
        let previous = ctx.previous().expect("steps carry the pre-step state");
        let channel = ctx.channel();
        let speed = (0..previous.nrows())
            .map(|i| channel.wave_speed(previous.read(i, 0), previous.read(i, 1)))
            .fold(0.0, f64::max);
        let bound = ctx.run().stepping.cfl * ctx.grid().delta() / speed;
        self.steps += 1;
        self.worst_ratio = self.worst_ratio.max(ctx.dt() / bound);
        Ok(())
    }
}

fn cfl_probe<M: Method + Default>(cfl: f64) -> CflProbe {
    let mut probe = CflProbe {
        steps: 0,
        worst_ratio: 0.0,
    };
    {
        let (_, driver) = flood_driver::<M>(1_000.0, cfl);
        let mut driver = driver.with_observer(&mut probe);
        completed(driver.run(24.0 * HOUR, HOUR, Budget::unlimited()).unwrap());
    }
    probe
}

#[test]
fn every_step_respects_the_cfl_bound() {
    for probe in [cfl_probe::<Rusanov>(0.8), cfl_probe::<LaxFriedrichs>(0.8)] {
        assert!(probe.steps > 100);
        assert!(probe.worst_ratio <= 1.0 + 1e-12, "ratio {}", probe.worst_ratio);
        // the step tracks the flow rather than a fixed lower value
        assert!(probe.worst_ratio > 0.999);
    }
}

/// Tracks the smallest depth seen after any step.
struct MinDepth(f64);

impl Observer for MinDepth {
    fn at_step(&mut self, ctx: ObsCtx<'_>) -> Result<(), SimError> {
        self.0 = ctx.depths().into_iter().fold(self.0, f64::min);
        Ok(())
    }
}

#[test]
fn depths_stay_non_negative() {
    // flood wave, under both schemes
    let mut rusanov = MinDepth(f64::INFINITY);
    {
        let (_, driver) = flood_driver::<Rusanov>(1_000.0, 0.9);
        let mut driver = driver.with_observer(&mut rusanov);
        completed(driver.run(24.0 * HOUR, HOUR, Budget::unlimited()).unwrap());
    }
    let mut lax_friedrichs = MinDepth(f64::INFINITY);
    {
        let (_, driver) = flood_driver::<LaxFriedrichs>(1_000.0, 0.9);
        let mut driver = driver.with_observer(&mut lax_friedrichs);
        completed(driver.run(24.0 * HOUR, HOUR, Budget::unlimited()).unwrap());
    }
    assert!(rusanov.0 > 0.0);
    assert!(lax_friedrichs.0 > 0.0);

    // dam break on a wet bed
    let channel = Channel::new(10.0, 0.0, 0.01).unwrap();
    let sim = Simulation::new(1_000.0, channel).with_space_resolution(Resolution::Delta(10.0));
    let mut min = MinDepth(f64::INFINITY);
    let mut driver = Driver::new(sim).with_observer(&mut min);
    let h: Vec<f64> = (0..101).map(|i| if i <= 50 { 2.0 } else { 0.5 }).collect();
    driver.set_initial_conditions(&h, &[0.0; 101]).unwrap();
    driver.set_boundary_conditions(BoundaryEndpoint::Extrapolated, BoundaryEndpoint::Extrapolated);
    let result = completed(driver.run(60.0, 5.0, Budget::unlimited()).unwrap());
    drop(driver);

    assert!(min.0 >= 0.0);
    for k in 0..result.samples() {
        assert!(result.depth_profile(k).iter().all(|&h| h >= 0.0));
    }
    // the disturbance has not reached either end, so the volume is closed
    let (v0, v1) = (
        result.storage(0, &channel),
        result.storage(result.samples() - 1, &channel),
    );
    assert!(((v1 - v0) / v0).abs() < 1e-10);
}

/// Integrates the net boundary inflow `Q(0) - Q(L)` over time.
#[derive(Default)]
struct FluxBalance {
    inflow: f64,
    net: f64,
}

impl Observer for FluxBalance {
    fn at_step(&mut self, ctx: ObsCtx<'_>) -> Result<(), SimError> {
        let before = ctx.previous().expect("steps carry the pre-step state");
        let after = ctx.solution();
        let last = after.nrows() - 1;
        let q_in = 0.5 * (before.read(0, 1) + after.read(0, 1));
        let q_out = 0.5 * (before.read(last, 1) + after.read(last, 1));
        self.inflow += ctx.dt() * q_in;
        self.net += ctx.dt() * (q_in - q_out);
        Ok(())
    }
}

/// Net-flux mismatch of a flood run, relative to the volume that came in.
fn balance_mismatch(dx: f64, t_end: f64) -> f64 {
    let mut balance = FluxBalance::default();
    let (channel, result) = {
        let (channel, driver) = flood_driver::<Rusanov>(dx, 0.8);
        let mut driver = driver.with_observer(&mut balance);
        let result = completed(driver.run(t_end, HOUR, Budget::unlimited()).unwrap());
        (channel, result)
    };

    let stored = result.storage(result.samples() - 1, &channel) - result.storage(0, &channel);
    (stored - balance.net).abs() / balance.inflow
}

#[test]
fn storage_change_matches_boundary_fluxes() {
    let mismatch = balance_mismatch(1_000.0, 48.0 * HOUR);
    assert!(mismatch < 0.02, "relative mismatch {mismatch}");
}

#[test]
fn balance_tightens_with_resolution() {
    // mid-event, before the flood has left the reach
    let coarse = balance_mismatch(1_000.0, 12.0 * HOUR);
    let fine = balance_mismatch(500.0, 12.0 * HOUR);
    assert!(fine < coarse, "dx=500: {fine}, dx=1000: {coarse}");
}

#[test]
fn still_water_stays_still() {
    let channel = Channel::new(15.0, 0.0, 0.03).unwrap();
    let sim = Simulation::new(2_000.0, channel).with_space_resolution(Resolution::Steps(40));
    let mut driver = Driver::new(sim);
    driver.set_uniform_initial(3.0, 0.0).unwrap();
    driver.set_boundary_conditions(BoundaryEndpoint::Extrapolated, BoundaryEndpoint::Extrapolated);

    let result = completed(driver.run(6.0 * HOUR, 600.0, Budget::unlimited()).unwrap());
    for k in 0..result.samples() {
        assert!(result.depth_profile(k).iter().all(|&h| (h - 3.0).abs() < 1e-12));
        assert!(result.discharge_profile(k).iter().all(|&q| q.abs() < 1e-12));
    }
}

#[test]
fn uniform_flow_stays_uniform_under_extrapolation() {
    // not at normal depth, so the flow changes in time but never in space
    let channel = Channel::new(20.0, 1e-3, 0.03).unwrap();
    let sim = Simulation::new(5_000.0, channel).with_space_resolution(Resolution::Delta(250.0));
    let mut driver = Driver::new(sim);
    driver.set_uniform_initial(2.0, 30.0).unwrap();
    driver.set_boundary_conditions(BoundaryEndpoint::Extrapolated, BoundaryEndpoint::Extrapolated);

    let result = completed(driver.run(2.0 * HOUR, 300.0, Budget::unlimited()).unwrap());
    for k in 0..result.samples() {
        for profile in [result.depth_profile(k), result.discharge_profile(k)] {
            let spread = profile.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b))
                - profile.iter().fold(f64::INFINITY, |a, &b| a.min(b));
            assert!(spread < 1e-9, "sample {k} spread {spread}");
        }
    }
    // the flow did evolve towards its normal discharge
    let last = result.samples() - 1;
    assert!((result.q().read(last, 10) - 30.0).abs() > 1e-3);
}
