//! Hole geometry primitives shared by the solver and the batch runner.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// A 3D coordinate in the rig's absolute frame. Immutable once constructed.
///
/// Field names serialize uppercase to match the on-disk record format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3 {
    #[serde(rename = "X")]
    pub x: f64,
    #[serde(rename = "Y")]
    pub y: f64,
    #[serde(rename = "Z")]
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn as_vector(&self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    pub fn distance(&self, other: &Point3) -> f64 {
        (self.as_vector() - other.as_vector()).norm()
    }
}

impl From<Vector3<f64>> for Point3 {
    fn from(v: Vector3<f64>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<Point3> for Vector3<f64> {
    fn from(p: Point3) -> Self {
        p.as_vector()
    }
}

/// One hole's endpoints normalized into vectors and derived scalars.
///
/// `depth` is always ≥ 0; a zero depth marks a degenerate (zero-length) hole,
/// which downstream consumers must reject before dividing by it.
#[derive(Debug, Clone, Copy)]
pub struct HoleGeometry {
    pub start: Point3,
    pub end: Point3,
    pub depth: f64,
}

impl HoleGeometry {
    pub fn new(start: Point3, end: Point3) -> Self {
        let depth = start.distance(&end);
        Self { start, end, depth }
    }

    /// Midpoint of the hole axis, used as the solver's initial guess.
    pub fn midpoint(&self) -> Vector3<f64> {
        (self.start.as_vector() + self.end.as_vector()) / 2.0
    }

    pub fn is_degenerate(&self) -> bool {
        self.depth == 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn depth_is_euclidean_distance() {
        let g = HoleGeometry::new(Point3::new(0.0, 0.0, 0.0), Point3::new(3.0, 4.0, 0.0));
        assert_relative_eq!(g.depth, 5.0);
    }

    #[test]
    fn midpoint_bisects_the_axis() {
        let g = HoleGeometry::new(Point3::new(0.0, 0.0, 0.0), Point3::new(2.0, 4.0, 6.0));
        assert_relative_eq!(g.midpoint(), Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn zero_length_hole_is_degenerate() {
        let p = Point3::new(1.0, 2.0, 3.0);
        assert!(HoleGeometry::new(p, p).is_degenerate());
        assert!(!HoleGeometry::new(p, Point3::new(1.0, 2.0, 4.0)).is_degenerate());
    }

    #[test]
    fn point_serializes_with_uppercase_fields() {
        let json = serde_json::to_string(&Point3::new(1.0, 2.5, -3.0)).unwrap();
        assert_eq!(json, r#"{"X":1.0,"Y":2.5,"Z":-3.0}"#);
    }
}
