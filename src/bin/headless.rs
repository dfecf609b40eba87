use std::{env, thread, time::Duration};

use anyhow::{bail, Context, Result};
use log::info;
use nalgebra::Vector2;
use quadtree_nbody::{
    creator::{BodyCreator, GridBodyCreator},
    csv::write_trajectories,
    Boundary, Simulation, Stepper,
};

const USAGE: &str = "usage: headless [frames] [demo|grid|orbits] [trajectory.csv]";

/// Interrupt every other frame after this long to exercise the carry.
const PAUSE_AFTER: Duration = Duration::from_millis(2);

fn main() -> Result<()> {
    env_logger::init();

    let mut args = env::args().skip(1);
    let frames: usize = match args.next() {
        Some(arg) => arg.parse().with_context(|| format!("{arg:?} is not a frame count\n{USAGE}"))?,
        None => 60,
    };
    let scenario = args.next().unwrap_or_else(|| "demo".into());
    let csv_path = args.next();

    let simulation = scenario_simulation(&scenario)?;
    info!(
        "running {frames} frames of {scenario:?} with {} bodies",
        simulation.bodies().len()
    );

    let mut stepper = Stepper::spawn(simulation)?;
    let mut snapshots = Vec::with_capacity(frames);

    for frame in 0..frames {
        stepper.start()?;
        if frame % 2 == 1 {
            thread::sleep(PAUSE_AFTER);
            stepper.stop();
        }
        let report = stepper.wait()?;

        info!(
            "frame {frame}: t = {:.3}, {} sub-steps{}, {} cells, root {:?}",
            report.snapshot.time,
            report.sub_steps,
            if report.stopped { " (stopped)" } else { "" },
            report.snapshot.cells.len(),
            report.snapshot.boundary,
        );
        snapshots.push(report.snapshot);
    }

    let simulation = stepper.shutdown()?;
    info!(
        "finished at t = {:.3}, total momentum {:?}",
        simulation.time(),
        simulation.momentum()
    );

    if let Some(path) = csv_path {
        write_trajectories(&snapshots, &path).with_context(|| format!("writing {path}"))?;
        info!("wrote {} frames to {path}", snapshots.len());
    }

    Ok(())
}

fn scenario_simulation(name: &str) -> Result<Simulation> {
    let simulation = match name {
        "demo" => Simulation::demo()?,
        "grid" => {
            let bodies = GridBodyCreator::new(10., Vector2::new(20., 20.), 16., 10).create_bodies(100);
            Simulation::new(bodies, Boundary::from_corner(0., 0., 200., 200.))?
        }
        "orbits" => orbits()?,
        _ => bail!("unknown scenario {name:?}\n{USAGE}"),
    };
    Ok(simulation)
}

#[cfg(feature = "randomization")]
fn orbits() -> Result<Simulation> {
    use quadtree_nbody::creator::CentralBodyCreator;
    use rand_distr::Uniform;

    let center = Vector2::new(100., 100.);
    let bodies = CentralBodyCreator::new(center, 1e5, Uniform::new(1., 10.), Uniform::new(20., 90.))
        .create_bodies(500);
    Ok(Simulation::new(bodies, Boundary::from_corner(0., 0., 200., 200.))?)
}

#[cfg(not(feature = "randomization"))]
fn orbits() -> Result<Simulation> {
    bail!("the orbits scenario needs the `randomization` feature")
}
