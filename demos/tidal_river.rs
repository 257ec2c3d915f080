use std::{fs::File, io::BufWriter};

use stvenant::{
    forcing::{TidalConstituent, TidalStage},
    BoundaryEndpoint, Budget, Channel, Driver, Logger, Resolution, SimError, Simulation,
    SnapshotWriter,
};

const HOUR: f64 = 3600.0;

fn main() -> Result<(), SimError> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let channel = Channel::new(100.0, 0.0, 0.025)?;
    let sim = Simulation::new(20_000.0, channel).with_space_resolution(Resolution::Delta(500.0));

    let tide = TidalStage::new(5.0)
        .with_constituent(TidalConstituent::m2(1.0, 0.0))
        .with_constituent(TidalConstituent::s2(0.3, 0.5))
        .with_ramp(3.0 * HOUR);

    std::fs::create_dir_all("bin")?;
    let output = BufWriter::new(File::create("bin/tidal_river.svsf")?);

    let mut driver = Driver::new(sim)
        .with_observer(Logger)
        .with_observer(SnapshotWriter::new(output));
    driver.set_uniform_initial(5.0, 50.0)?;
    driver.set_boundary_conditions(BoundaryEndpoint::discharge(|_| 50.0), tide.into_stage());

    let result = driver
        .run(50.0 * HOUR, 900.0, Budget::unlimited())?
        .into_result();

    let mouth = result.discharge_series(result.nodes() - 2);
    let (ebb, flood) = mouth
        .iter()
        .fold((f64::NEG_INFINITY, f64::INFINITY), |(hi, lo), &q| {
            (hi.max(q), lo.min(q))
        });
    println!("discharge near the mouth ranges from {flood:.1} to {ebb:.1} m3/s");

    Ok(())
}
