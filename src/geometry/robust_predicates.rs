// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Robust geometric predicates and tolerances shared by the boolean pipeline
//!
//! Every stage classifies points against planes with the same fixed
//! tolerance so that repeated evaluation of identical geometry makes the
//! same decisions.

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Distance under which a point is considered to lie on a plane
pub const PLANE_EPSILON: f64 = 1e-7;

/// Distance under which two vertices are merged into one topological vertex
pub const WELD_EPSILON: f64 = 1e-6;

/// Twice-area under which a triangle is treated as degenerate
pub const AREA_EPSILON: f64 = 1e-12;

/// Classify point relative to plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneClassification {
    Front,   // Point is on positive side
    Back,    // Point is on negative side
    OnPlane, // Point is coplanar (within epsilon)
}

/// Oriented plane `normal · p = w` with a unit normal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    pub normal: Vector3<f64>,
    pub w: f64,
}

impl Plane {
    /// Plane through a counter-clockwise triangle. `None` for degenerate input.
    pub fn from_points(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> Option<Plane> {
        let cross = (b - a).cross(&(c - a));
        let length = cross.norm();
        if length <= AREA_EPSILON || !length.is_finite() {
            return None;
        }
        let normal = cross / length;
        Some(Plane {
            normal,
            w: normal.dot(&a.coords),
        })
    }

    /// Signed distance, positive on the side the normal points to
    pub fn signed_distance(&self, point: &Point3<f64>) -> f64 {
        point_plane_test(point, &self.normal, self.w)
    }

    pub fn classify(&self, point: &Point3<f64>) -> PlaneClassification {
        classify_point_plane(point, &self.normal, self.w)
    }

    pub fn flipped(&self) -> Plane {
        Plane {
            normal: -self.normal,
            w: -self.w,
        }
    }

    /// Same supporting plane regardless of orientation
    pub fn is_coincident(&self, other: &Plane) -> bool {
        let dot = self.normal.dot(&other.normal);
        if dot > 1.0 - 1e-12 {
            (self.w - other.w).abs() <= PLANE_EPSILON
        } else if dot < -1.0 + 1e-12 {
            (self.w + other.w).abs() <= PLANE_EPSILON
        } else {
            false
        }
    }
}

/// Compute oriented volume of tetrahedron (a, b, c, d)
/// Returns positive value if d is on the positive side of plane (a, b, c)
/// Returns negative value if d is on the negative side
///
/// Near zero the triple product is re-evaluated with compensated summation.
pub fn oriented_volume(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    d: &Point3<f64>,
) -> f64 {
    let ab = b - a;
    let ac = c - a;
    let ad = d - a;

    let result = ab.dot(&ac.cross(&ad));
    if result.abs() > AREA_EPSILON {
        return result;
    }

    let cx = ac.y * ad.z - ac.z * ad.y;
    let cy = ac.z * ad.x - ac.x * ad.z;
    let cz = ac.x * ad.y - ac.y * ad.x;
    compensated_dot(&ab, &[cx, cy, cz])
}

/// Dot product summed largest-magnitude first with Kahan compensation
fn compensated_dot(v: &Vector3<f64>, w: &[f64; 3]) -> f64 {
    let mut terms = [v.x * w[0], v.y * w[1], v.z * w[2]];
    terms.sort_by(|a, b| b.abs().total_cmp(&a.abs()));

    let mut sum = 0.0;
    let mut c = 0.0;
    for &term in &terms {
        let y = term - c;
        let t = sum + y;
        c = (t - sum) - y;
        sum = t;
    }
    sum
}

/// Signed distance from point to the plane `normal · p = plane_w`
pub fn point_plane_test(point: &Point3<f64>, plane_normal: &Vector3<f64>, plane_w: f64) -> f64 {
    let distance = plane_normal.dot(&point.coords) - plane_w;
    if distance.abs() < PLANE_EPSILON * 4.0 {
        compensated_dot(plane_normal, &[point.x, point.y, point.z]) - plane_w
    } else {
        distance
    }
}

/// Classify a point relative to a plane
pub fn classify_point_plane(
    point: &Point3<f64>,
    plane_normal: &Vector3<f64>,
    plane_w: f64,
) -> PlaneClassification {
    let distance = point_plane_test(point, plane_normal, plane_w);

    if distance > PLANE_EPSILON {
        PlaneClassification::Front
    } else if distance < -PLANE_EPSILON {
        PlaneClassification::Back
    } else {
        PlaneClassification::OnPlane
    }
}

/// Area of triangle (a, b, c)
pub fn triangle_area(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    (b - a).cross(&(c - a)).norm() / 2.0
}

/// Inclusive point-in-triangle test for a point already known to lie on
/// the triangle's plane. `tolerance` is a distance measured from each edge.
pub fn point_in_triangle(
    point: &Point3<f64>,
    triangle: &[Point3<f64>; 3],
    normal: &Vector3<f64>,
    tolerance: f64,
) -> bool {
    for i in 0..3 {
        let a = &triangle[i];
        let b = &triangle[(i + 1) % 3];
        let edge = b - a;
        let length = edge.norm();
        if length <= AREA_EPSILON {
            continue;
        }
        // Distance of the point to the inside of this edge, in the plane
        let side = edge.cross(&(point - a)).dot(normal) / length;
        if side < -tolerance {
            return false;
        }
    }
    true
}
