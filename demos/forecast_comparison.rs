use std::thread;

use stvenant::{
    forcing::TriangularHydrograph, BoundaryEndpoint, Budget, Channel, Driver, Resolution,
    SimError, Simulation, SimulationResult,
};

const HOUR: f64 = 3600.0;

fn forecast(channel: Channel, flood: TriangularHydrograph) -> Result<SimulationResult, SimError> {
    let sim = Simulation::new(50_000.0, channel).with_space_resolution(Resolution::Delta(1_000.0));
    let mut driver = Driver::new(sim);
    driver.set_uniform_initial(channel.normal_depth(flood.base)?, flood.base)?;
    driver.set_boundary_conditions(
        flood.into_stage_discharge(channel)?,
        BoundaryEndpoint::Extrapolated,
    );
    Ok(driver
        .run(48.0 * HOUR, 900.0, Budget::unlimited())?
        .into_result())
}

fn main() -> Result<(), SimError> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .init();

    let channel = Channel::new(80.0, 1e-4, 0.03)?;
    let scenarios = [
        ("moderate", TriangularHydrograph::new(500.0, 1500.0, 8.0 * HOUR, 8.0 * HOUR, 16.0 * HOUR)),
        ("severe", TriangularHydrograph::new(500.0, 3000.0, 6.0 * HOUR, 6.0 * HOUR, 18.0 * HOUR)),
    ];

    let results = thread::scope(|s| {
        let handles: Vec<_> = scenarios
            .iter()
            .map(|&(name, flood)| (name, s.spawn(move || forecast(channel, flood))))
            .collect();
        handles
            .into_iter()
            .map(|(name, h)| (name, h.join().expect("forecast thread panicked")))
            .collect::<Vec<_>>()
    });

    for (name, result) in results {
        let result = result?;
        let outlet = result.nodes() - 1;
        let max_depth = result
            .depth_series(outlet)
            .into_iter()
            .fold(0.0, f64::max);
        if let Some(peak) = result.peak_discharge(outlet) {
            println!(
                "{name:>8}: outlet peak {:.1} m3/s at {:.2} h, max depth {max_depth:.2} m",
                peak.discharge,
                peak.time / HOUR,
            );
        }
    }

    Ok(())
}
