//! Mount-point solver: recovers the probe's 3D mount coordinate and tilt
//! angles for a hole from the rig's absolute frame.
//!
//! The mount point lies on the extension of the hole axis, at requested
//! distances from the two endpoints. The solve runs Levenberg-Marquardt over
//! one of two formulations (see [`SolverStrategy`]) from an initial guess at
//! the hole midpoint, then verifies both distance constraints against the
//! request before accepting the result.

use levenberg_marquardt::{LeastSquaresProblem, LevenbergMarquardt};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::{HoleGeometry, Point3};
use crate::solver::problem::{DistanceObjective, MountPointSystem};

pub mod problem;
pub mod validate;

/// Fixed probe reach, shared read-only by every hole in a batch run.
#[derive(Debug, Clone, Copy)]
pub struct ProbeConfig {
    pub length: f64,
}

/// Position plus optional tilt angles in degrees. Start poses carry both
/// angles; end poses are position-only (orientation is assumed unchanged
/// during straight-line traversal).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Point3,
    pub azimuth: Option<f64>,
    pub elevation: Option<f64>,
}

impl Pose {
    pub fn position_only(position: Point3) -> Self {
        Self {
            position,
            azimuth: None,
            elevation: None,
        }
    }

    pub fn oriented(position: Point3, azimuth: f64, elevation: f64) -> Self {
        Self {
            position,
            azimuth: Some(azimuth),
            elevation: Some(elevation),
        }
    }
}

#[derive(Debug, Error)]
pub enum SolveError {
    #[error("solve did not converge for {hole}: residual {residual:.6e}")]
    DidNotConverge { hole: String, residual: f64 },
    #[error("degenerate geometry for {hole}: {reason}")]
    DegenerateGeometry { hole: String, reason: String },
}

/// Which formulation the solver runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolverStrategy {
    /// Two range residuals only. Underdetermined off the hole axis; kept as a
    /// selectable fallback.
    LeastSquares,
    /// Full 5-equation system: three colinearity residuals plus the two range
    /// residuals.
    #[default]
    ConstrainedRoot,
}

#[derive(Debug, Clone, Copy)]
pub struct SolveOptions {
    /// Function-evaluation patience handed to the LM backend.
    pub max_iters: usize,
    pub ftol: f64,
    pub xtol: f64,
    pub gtol: f64,
    /// Acceptance tolerance on each of the two distance constraints.
    pub distance_tol: f64,
}

impl Default for SolveOptions {
    fn default() -> Self {
        Self {
            max_iters: 200,
            ftol: 1e-10,
            xtol: 1e-10,
            gtol: 1e-10,
            distance_tol: 1e-3,
        }
    }
}

/// Per-hole solver over a shared [`HoleGeometry`] / [`ProbeConfig`] pair.
#[derive(Debug, Clone)]
pub struct PoseSolver {
    hole: String,
    geometry: HoleGeometry,
    probe: ProbeConfig,
    strategy: SolverStrategy,
    options: SolveOptions,
}

impl PoseSolver {
    pub fn new(hole: impl Into<String>, geometry: HoleGeometry, probe: ProbeConfig) -> Self {
        Self {
            hole: hole.into(),
            geometry,
            probe,
            strategy: SolverStrategy::default(),
            options: SolveOptions::default(),
        }
    }

    pub fn with_strategy(mut self, strategy: SolverStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_options(mut self, options: SolveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn geometry(&self) -> &HoleGeometry {
        &self.geometry
    }

    pub fn probe(&self) -> &ProbeConfig {
        &self.probe
    }

    /// Solves for the mount point at distances `d_start` from the hole start
    /// and `d_end` from the hole end.
    ///
    /// Acceptance requires both distance constraints to hold within
    /// `distance_tol`; the residual norm alone cannot distinguish the
    /// physically correct colinear solution from its mirror.
    pub fn solve_position(&self, d_start: f64, d_end: f64) -> Result<Point3, SolveError> {
        if self.geometry.is_degenerate() {
            return Err(SolveError::DegenerateGeometry {
                hole: self.hole.clone(),
                reason: "hole start and end coincide".into(),
            });
        }

        let (m, residual) = self.run(self.geometry.midpoint(), d_start, d_end);

        let err_start = (Point3::from(m).distance(&self.geometry.start) - d_start).abs();
        let err_end = (Point3::from(m).distance(&self.geometry.end) - d_end).abs();
        if !m.iter().all(|c| c.is_finite())
            || err_start > self.options.distance_tol
            || err_end > self.options.distance_tol
        {
            return Err(SolveError::DidNotConverge {
                hole: self.hole.clone(),
                residual,
            });
        }
        Ok(m.into())
    }

    /// Solves the mount position, then derives the spherical tilt angles of
    /// the direction vector from the mount point to the hole start.
    ///
    /// Azimuth is the four-quadrant arctangent of (x, y): +90° for an
    /// in-plane vector along +x, −90° along −x, and 0° when x = y = 0
    /// (documented fallback). Elevation is the arcsine of z over the vector
    /// magnitude; a zero-magnitude vector is degenerate and rejected.
    pub fn solve_angles(&self, d_start: f64, d_end: f64) -> Result<Pose, SolveError> {
        let position = self.solve_position(d_start, d_end)?;
        let v = self.geometry.start.as_vector() - position.as_vector();
        let norm = v.norm();
        if norm < f64::EPSILON {
            return Err(SolveError::DegenerateGeometry {
                hole: self.hole.clone(),
                reason: "mount point coincides with the hole start".into(),
            });
        }
        let azimuth = v.x.atan2(v.y).to_degrees();
        // The ratio can land an ulp outside [-1, 1] when x = y = 0.
        let elevation = (v.z / norm).clamp(-1.0, 1.0).asin().to_degrees();
        Ok(Pose::oriented(position, azimuth, elevation))
    }

    /// Raw LM pass from an explicit initial guess, without the distance
    /// acceptance gate. Used by the uniqueness diagnostic.
    pub(crate) fn run(&self, guess: Vector3<f64>, d1: f64, d2: f64) -> (Vector3<f64>, f64) {
        let lm = LevenbergMarquardt::new()
            .with_ftol(self.options.ftol)
            .with_xtol(self.options.xtol)
            .with_gtol(self.options.gtol)
            .with_patience(self.options.max_iters.max(1));

        match self.strategy {
            SolverStrategy::ConstrainedRoot => {
                let problem = MountPointSystem::new(&self.geometry, d1, d2, guess);
                let (problem, report) = lm.minimize(problem);
                (problem.params(), report.objective_function)
            }
            SolverStrategy::LeastSquares => {
                let problem = DistanceObjective::new(&self.geometry, d1, d2, guess);
                let (problem, report) = lm.minimize(problem);
                (problem.params(), report.objective_function)
            }
        }
    }
}
