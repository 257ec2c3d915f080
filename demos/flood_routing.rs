use stvenant::{
    forcing::TriangularHydrograph, BoundaryEndpoint, Budget, Channel, Driver, Logger, Resolution,
    SimError, Simulation, TimeStepping,
};

const HOUR: f64 = 3600.0;

fn main() -> Result<(), SimError> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let channel = Channel::new(80.0, 1e-4, 0.03)?;
    let sim = Simulation::new(50_000.0, channel)
        .with_space_resolution(Resolution::Delta(1_000.0))
        .with_time_stepping(TimeStepping::default().with_cfl(0.8));
    println!("{sim}");

    let flood = TriangularHydrograph::new(500.0, 2000.0, 6.0 * HOUR, 6.0 * HOUR, 12.0 * HOUR);
    let mut driver = Driver::new(sim).with_observer(Logger);
    driver.set_uniform_initial(channel.normal_depth(flood.base)?, flood.base)?;
    driver.set_boundary_conditions(
        flood.into_stage_discharge(channel)?,
        BoundaryEndpoint::Extrapolated,
    );

    let result = driver
        .run(36.0 * HOUR, 600.0, Budget::unlimited())?
        .into_result();

    for node in [0, result.nodes() / 2, result.nodes() - 1] {
        if let Some(peak) = result.peak_discharge(node) {
            println!(
                "x = {:>6.0} m: peak {:>7.1} m3/s at t = {:>5.2} h",
                result.x()[node],
                peak.discharge,
                peak.time / HOUR
            );
        }
    }

    Ok(())
}
