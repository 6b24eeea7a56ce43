//! Least-squares formulations of the mount-point system.
//!
//! Both problems solve for the probe mount point `m` given the hole endpoints
//! `p1` (start) and `p2` (end) and a pair of requested distances `d1`, `d2`.
//! The constrained system adds the three canonical line equations between
//! pairs of coordinate planes, pinning `m` onto the hole axis; the distance
//! objective carries the two range residuals alone.

use levenberg_marquardt::LeastSquaresProblem;
use nalgebra::storage::Owned;
use nalgebra::{Matrix2x3, Matrix5x3, U2, U3, U5, Vector2, Vector3, Vector5};

use crate::geometry::HoleGeometry;

/// Full 5-residual / 3-unknown system: three colinearity residuals plus the
/// two distance residuals.
pub struct MountPointSystem {
    p1: Vector3<f64>,
    p2: Vector3<f64>,
    d1: f64,
    d2: f64,
    m: Vector3<f64>,
}

impl MountPointSystem {
    pub fn new(geometry: &HoleGeometry, d1: f64, d2: f64, guess: Vector3<f64>) -> Self {
        Self {
            p1: geometry.start.as_vector(),
            p2: geometry.end.as_vector(),
            d1,
            d2,
            m: guess,
        }
    }
}

impl LeastSquaresProblem<f64, U5, U3> for MountPointSystem {
    type ResidualStorage = Owned<f64, U5>;
    type JacobianStorage = Owned<f64, U5, U3>;
    type ParameterStorage = Owned<f64, U3>;

    fn set_params(&mut self, x: &Vector3<f64>) {
        self.m.clone_from(x);
    }

    fn params(&self) -> Vector3<f64> {
        self.m
    }

    fn residuals(&self) -> Option<Vector5<f64>> {
        let (m, p1, p2) = (&self.m, &self.p1, &self.p2);
        let axis = p2 - p1;
        let rel = m - p1;
        Some(Vector5::new(
            rel.x * axis.y - rel.y * axis.x,
            rel.x * axis.z - rel.z * axis.x,
            rel.y * axis.z - rel.z * axis.y,
            (m - p1).norm() - self.d1,
            (m - p2).norm() - self.d2,
        ))
    }

    fn jacobian(&self) -> Option<Matrix5x3<f64>> {
        let (m, p1, p2) = (&self.m, &self.p1, &self.p2);
        let axis = p2 - p1;
        let mut j = Matrix5x3::zeros();

        j[(0, 0)] = axis.y;
        j[(0, 1)] = -axis.x;
        j[(1, 0)] = axis.z;
        j[(1, 2)] = -axis.x;
        j[(2, 1)] = axis.z;
        j[(2, 2)] = -axis.y;

        // Range rows: d/dm ‖m − p‖ = (m − p)ᵀ / ‖m − p‖, undefined at the
        // endpoint itself; a zero row keeps the iteration finite there.
        for (row, p) in [(3, p1), (4, p2)] {
            let rel = m - p;
            let norm = rel.norm();
            if norm > f64::EPSILON {
                j[(row, 0)] = rel.x / norm;
                j[(row, 1)] = rel.y / norm;
                j[(row, 2)] = rel.z / norm;
            }
        }
        Some(j)
    }
}

/// Reduced 2-residual objective: the two range constraints only.
/// Underdetermined off the axis, so the constrained system is the default
/// strategy.
pub struct DistanceObjective {
    p1: Vector3<f64>,
    p2: Vector3<f64>,
    d1: f64,
    d2: f64,
    m: Vector3<f64>,
}

impl DistanceObjective {
    pub fn new(geometry: &HoleGeometry, d1: f64, d2: f64, guess: Vector3<f64>) -> Self {
        Self {
            p1: geometry.start.as_vector(),
            p2: geometry.end.as_vector(),
            d1,
            d2,
            m: guess,
        }
    }
}

impl LeastSquaresProblem<f64, U2, U3> for DistanceObjective {
    type ResidualStorage = Owned<f64, U2>;
    type JacobianStorage = Owned<f64, U2, U3>;
    type ParameterStorage = Owned<f64, U3>;

    fn set_params(&mut self, x: &Vector3<f64>) {
        self.m.clone_from(x);
    }

    fn params(&self) -> Vector3<f64> {
        self.m
    }

    fn residuals(&self) -> Option<Vector2<f64>> {
        Some(Vector2::new(
            (self.m - self.p1).norm() - self.d1,
            (self.m - self.p2).norm() - self.d2,
        ))
    }

    fn jacobian(&self) -> Option<Matrix2x3<f64>> {
        let mut j = Matrix2x3::zeros();
        for (row, p) in [(0, &self.p1), (1, &self.p2)] {
            let rel = self.m - p;
            let norm = rel.norm();
            if norm > f64::EPSILON {
                j[(row, 0)] = rel.x / norm;
                j[(row, 1)] = rel.y / norm;
                j[(row, 2)] = rel.z / norm;
            }
        }
        Some(j)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point3;
    use approx::assert_relative_eq;

    fn axis_hole() -> HoleGeometry {
        HoleGeometry::new(Point3::new(0.0, 0.0, 0.0), Point3::new(0.0, 20.0, 0.0))
    }

    #[test]
    fn residuals_vanish_at_the_exact_solution() {
        // Mount point 300 behind the start, on the axis extension.
        let g = axis_hole();
        let problem = MountPointSystem::new(&g, 300.0, 320.0, Vector3::new(0.0, -300.0, 0.0));
        let r = problem.residuals().unwrap();
        for i in 0..5 {
            assert_relative_eq!(r[i], 0.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn jacobian_matches_finite_differences() {
        let g = HoleGeometry::new(Point3::new(1.0, -2.0, 3.0), Point3::new(4.0, 2.0, -1.0));
        let x = Vector3::new(-3.0, 5.0, 7.0);
        let mut problem = MountPointSystem::new(&g, 10.0, 14.0, x);
        let j = problem.jacobian().unwrap();

        let h = 1e-6;
        for col in 0..3 {
            let mut fwd = x;
            fwd[col] += h;
            problem.set_params(&fwd);
            let r_fwd = problem.residuals().unwrap();
            let mut bwd = x;
            bwd[col] -= h;
            problem.set_params(&bwd);
            let r_bwd = problem.residuals().unwrap();
            for row in 0..5 {
                let numeric = (r_fwd[row] - r_bwd[row]) / (2.0 * h);
                assert_relative_eq!(j[(row, col)], numeric, epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn distance_objective_residuals_are_range_errors() {
        let g = axis_hole();
        let problem = DistanceObjective::new(&g, 300.0, 320.0, Vector3::new(0.0, -290.0, 0.0));
        let r = problem.residuals().unwrap();
        assert_relative_eq!(r[0], -10.0, epsilon = 1e-9);
        assert_relative_eq!(r[1], -10.0, epsilon = 1e-9);
    }
}
