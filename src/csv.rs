use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

use crate::snapshot::Snapshot;

/// Writes one row per frame: the simulated time followed by every body's
/// position.
pub fn write_trajectories(frames: &[Snapshot], path: impl AsRef<Path>) -> Result<(), io::Error> {
    let file = BufWriter::new(File::create(path)?);
    write_frames(frames, file)
}

fn write_frames(frames: &[Snapshot], mut out: impl Write) -> Result<(), io::Error> {
    let num_bodies = frames.first().map_or(0, Snapshot::len);

    write!(out, "t")?;
    for i in 0..num_bodies {
        write!(out, ",x{i},y{i}")?;
    }
    writeln!(out)?;

    for frame in frames {
        write!(out, "{}", frame.time)?;
        for position in &frame.positions {
            write!(out, ",{},{}", position.x, position.y)?;
        }
        writeln!(out)?;
    }

    out.flush()
}

#[cfg(test)]
mod tests {
    use nalgebra::Vector2;

    use super::*;
    use crate::boundary::Boundary;

    fn frame(time: f64, positions: Vec<Vector2<f64>>) -> Snapshot {
        Snapshot {
            boundary: Boundary::from_corner(0., 0., 10., 10.),
            velocities: vec![Vector2::zeros(); positions.len()],
            positions,
            cells: Vec::new(),
            time,
        }
    }

    #[test]
    fn header_and_rows() {
        let frames = [
            frame(0., vec![Vector2::new(1., 2.), Vector2::new(3., 4.)]),
            frame(0.5, vec![Vector2::new(1.5, 2.), Vector2::new(3., 4.25)]),
        ];

        let mut out = Vec::new();
        write_frames(&frames, &mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "t,x0,y0,x1,y1\n0,1,2,3,4\n0.5,1.5,2,3,4.25\n"
        );
    }

    #[test]
    fn no_frames_writes_bare_header() {
        let mut out = Vec::new();
        write_frames(&[], &mut out).unwrap();
        assert_eq!(out, b"t\n");
    }
}
