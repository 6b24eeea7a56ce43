//! Well-posedness diagnostic for the mount-point system.
//!
//! Re-runs the solve from the eight sign-combinations of a unit offset around
//! the hole midpoint and checks that every run lands on the same rounded
//! point. Not on the hot path; exposed for verification runs and tests.

use nalgebra::Vector3;

use crate::geometry::{HoleGeometry, Point3};
use crate::records::round3;
use crate::solver::{PoseSolver, ProbeConfig, SolveError, SolverStrategy};

/// Outcome of [`check_uniqueness`]: either every perturbed initial guess
/// converged to one rounded point, or the distinct candidates are returned.
#[derive(Debug, Clone, PartialEq)]
pub enum Uniqueness {
    Unique(Point3),
    Ambiguous(Vec<Point3>),
}

/// Solves the system from `midpoint + (±1, ±1, ±1)` and compares the
/// candidates after rounding to 3 decimal places.
pub fn check_uniqueness(
    geometry: &HoleGeometry,
    probe: ProbeConfig,
    d_start: f64,
    d_end: f64,
) -> Result<Uniqueness, SolveError> {
    if geometry.is_degenerate() {
        return Err(SolveError::DegenerateGeometry {
            hole: "uniqueness check".into(),
            reason: "hole start and end coincide".into(),
        });
    }

    let solver = PoseSolver::new("uniqueness check", *geometry, probe)
        .with_strategy(SolverStrategy::ConstrainedRoot);
    let midpoint = geometry.midpoint();

    let mut candidates: Vec<Point3> = Vec::new();
    for i in [-1.0, 1.0] {
        for j in [-1.0, 1.0] {
            for k in [-1.0, 1.0] {
                let guess = midpoint + Vector3::new(i, j, k);
                let (m, _residual) = solver.run(guess, d_start, d_end);
                let rounded = Point3::new(round3(m.x), round3(m.y), round3(m.z));
                if !candidates.contains(&rounded) {
                    candidates.push(rounded);
                }
            }
        }
    }

    if candidates.len() == 1 {
        Ok(Uniqueness::Unique(candidates[0]))
    } else {
        Ok(Uniqueness::Ambiguous(candidates))
    }
}
