// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Triangle-triangle intersection
//!
//! Interval overlap test on the line shared by the two supporting planes.
//! Vertices within [`PLANE_EPSILON`] of the other plane are treated as lying
//! on it, so touching triangles intersect and near-coplanar pairs take the
//! coplanar path.

use super::robust_predicates::{Plane, PLANE_EPSILON};
use nalgebra::{Point2, Point3, Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Line segment shared by two triangles. Degenerates to a point when the
/// triangles only touch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntersectionSegment {
    pub start: Point3<f64>,
    pub end: Point3<f64>,
}

impl IntersectionSegment {
    pub fn length(&self) -> f64 {
        (self.end - self.start).norm()
    }

    pub fn is_point(&self) -> bool {
        self.length() <= PLANE_EPSILON
    }
}

/// Outcome of a triangle pair test
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TriangleIntersection {
    /// No intersection
    None,
    /// Triangles share a plane and their areas overlap or touch
    Coplanar,
    /// Triangles cross or touch along a segment (possibly a single point)
    Segment(IntersectionSegment),
}

impl TriangleIntersection {
    pub fn intersects(&self) -> bool {
        !matches!(self, TriangleIntersection::None)
    }
}

/// Test if two triangles intersect
pub fn triangle_triangle_intersection(
    tri_a: &[Point3<f64>; 3],
    tri_b: &[Point3<f64>; 3],
) -> TriangleIntersection {
    match (
        Plane::from_points(&tri_a[0], &tri_a[1], &tri_a[2]),
        Plane::from_points(&tri_b[0], &tri_b[1], &tri_b[2]),
    ) {
        (Some(plane_a), Some(plane_b)) => intersect_triangles(tri_a, &plane_a, tri_b, &plane_b),
        _ => TriangleIntersection::None,
    }
}

/// Same as [`triangle_triangle_intersection`] with precomputed planes
pub fn intersect_triangles(
    tri_a: &[Point3<f64>; 3],
    plane_a: &Plane,
    tri_b: &[Point3<f64>; 3],
    plane_b: &Plane,
) -> TriangleIntersection {
    let db = snapped_distances(tri_b, plane_a);
    if same_strict_side(&db) {
        return TriangleIntersection::None;
    }

    let da = snapped_distances(tri_a, plane_b);
    if same_strict_side(&da) {
        return TriangleIntersection::None;
    }

    let coplanar = da.iter().all(|&d| d == 0.0) || db.iter().all(|&d| d == 0.0);
    let direction = plane_a.normal.cross(&plane_b.normal);
    if coplanar || direction.norm() < 1e-10 {
        return if coplanar_overlap(tri_a, tri_b, &plane_a.normal) {
            TriangleIntersection::Coplanar
        } else {
            TriangleIntersection::None
        };
    }

    let (Some(section_a), Some(section_b)) =
        (plane_section(tri_a, &da), plane_section(tri_b, &db))
    else {
        return TriangleIntersection::None;
    };

    let interval_a = project_interval(&section_a, &direction);
    let interval_b = project_interval(&section_b, &direction);

    let (lo, lo_point) = if interval_a.0 .0 >= interval_b.0 .0 {
        interval_a.0
    } else {
        interval_b.0
    };
    let (hi, hi_point) = if interval_a.1 .0 <= interval_b.1 .0 {
        interval_a.1
    } else {
        interval_b.1
    };

    let scale = direction.norm();
    if (lo - hi) / scale > PLANE_EPSILON {
        return TriangleIntersection::None;
    }

    let end = if hi < lo { lo_point } else { hi_point };
    TriangleIntersection::Segment(IntersectionSegment {
        start: lo_point,
        end,
    })
}

fn snapped_distances(triangle: &[Point3<f64>; 3], plane: &Plane) -> [f64; 3] {
    triangle.map(|p| {
        let d = plane.signed_distance(&p);
        if d.abs() <= PLANE_EPSILON {
            0.0
        } else {
            d
        }
    })
}

fn same_strict_side(distances: &[f64; 3]) -> bool {
    distances.iter().all(|&d| d > 0.0) || distances.iter().all(|&d| d < 0.0)
}

/// Crossing of a triangle with a plane given snapped vertex distances.
/// Returns one or two points.
fn plane_section(triangle: &[Point3<f64>; 3], distances: &[f64; 3]) -> Option<Vec<Point3<f64>>> {
    let mut points = Vec::with_capacity(2);
    for i in 0..3 {
        let j = (i + 1) % 3;
        let (di, dj) = (distances[i], distances[j]);
        if di == 0.0 {
            points.push(triangle[i]);
        }
        if (di > 0.0 && dj < 0.0) || (di < 0.0 && dj > 0.0) {
            points.push(edge_crossing(&triangle[i], di, &triangle[j], dj));
        }
    }
    (!points.is_empty()).then_some(points)
}

/// Plane crossing on edge (p, q) computed from the lexicographically smaller
/// endpoint so both triangles sharing the edge get the same point
pub(crate) fn edge_crossing(p: &Point3<f64>, dp: f64, q: &Point3<f64>, dq: f64) -> Point3<f64> {
    let (p, dp, q, dq) = if lexicographic_less(p, q) {
        (p, dp, q, dq)
    } else {
        (q, dq, p, dp)
    };
    let t = dp / (dp - dq);
    p + (q - p) * t
}

pub(crate) fn lexicographic_less(a: &Point3<f64>, b: &Point3<f64>) -> bool {
    a.x.total_cmp(&b.x)
        .then(a.y.total_cmp(&b.y))
        .then(a.z.total_cmp(&b.z))
        .is_lt()
}

type Bound = (f64, Point3<f64>);

/// Extreme points of a section along `direction`
fn project_interval(points: &[Point3<f64>], direction: &Vector3<f64>) -> (Bound, Bound) {
    let mut lo = (f64::INFINITY, points[0]);
    let mut hi = (f64::NEG_INFINITY, points[0]);
    for p in points {
        let t = direction.dot(&p.coords);
        if t < lo.0 {
            lo = (t, *p);
        }
        if t > hi.0 {
            hi = (t, *p);
        }
    }
    (lo, hi)
}

/// Separating-axis test of two coplanar triangles projected onto the
/// dominant plane. Touching triangles overlap.
pub fn coplanar_overlap(
    tri_a: &[Point3<f64>; 3],
    tri_b: &[Point3<f64>; 3],
    normal: &Vector3<f64>,
) -> bool {
    let a = project_to_2d(tri_a, normal);
    let b = project_to_2d(tri_b, normal);

    for triangle in [&a, &b] {
        for i in 0..3 {
            let edge = triangle[(i + 1) % 3] - triangle[i];
            let axis = Vector2::new(-edge.y, edge.x);
            let length = axis.norm();
            if length <= PLANE_EPSILON {
                continue;
            }
            let (min_a, max_a) = project_2d(&a, &axis);
            let (min_b, max_b) = project_2d(&b, &axis);
            let gap = (min_a - max_b).max(min_b - max_a) / length;
            if gap > PLANE_EPSILON {
                return false;
            }
        }
    }
    true
}

fn project_to_2d(triangle: &[Point3<f64>; 3], normal: &Vector3<f64>) -> [Point2<f64>; 3] {
    let n = normal.abs();
    triangle.map(|p| {
        if n.x >= n.y && n.x >= n.z {
            Point2::new(p.y, p.z)
        } else if n.y >= n.z {
            Point2::new(p.z, p.x)
        } else {
            Point2::new(p.x, p.y)
        }
    })
}

fn project_2d(triangle: &[Point2<f64>; 3], axis: &Vector2<f64>) -> (f64, f64) {
    let values = triangle.map(|p| axis.dot(&p.coords));
    (
        values.iter().copied().fold(f64::INFINITY, f64::min),
        values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64, z: f64) -> Point3<f64> {
        Point3::new(x, y, z)
    }

    #[test]
    fn test_crossing_triangles() {
        let a = [p(-1.0, -1.0, 0.0), p(1.0, -1.0, 0.0), p(0.0, 1.0, 0.0)];
        let b = [p(0.0, 0.0, -1.0), p(0.0, 0.0, 1.0), p(0.0, -2.0, 0.0)];

        match triangle_triangle_intersection(&a, &b) {
            TriangleIntersection::Segment(segment) => {
                let mut ys = [segment.start.y, segment.end.y];
                ys.sort_by(f64::total_cmp);
                assert!((ys[0] + 1.0).abs() < 1e-12);
                assert!(ys[1].abs() < 1e-12);
                assert!(segment.start.x.abs() < 1e-12 && segment.start.z.abs() < 1e-12);
            }
            other => panic!("expected segment, got {:?}", other),
        }
    }

    #[test]
    fn test_separated_triangles() {
        let a = [p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)];
        let b = [p(0.0, 0.0, 1.0), p(1.0, 0.0, 2.0), p(0.0, 1.0, 1.5)];
        assert_eq!(triangle_triangle_intersection(&a, &b), TriangleIntersection::None);
    }

    #[test]
    fn test_planes_cross_but_triangles_miss() {
        let a = [p(-1.0, -1.0, 0.0), p(1.0, -1.0, 0.0), p(0.0, 1.0, 0.0)];
        let b = [p(5.0, 0.0, -1.0), p(5.0, 0.0, 1.0), p(5.0, -2.0, 0.0)];
        assert_eq!(triangle_triangle_intersection(&a, &b), TriangleIntersection::None);
    }

    #[test]
    fn test_coplanar_overlap() {
        let a = [p(0.0, 0.0, 0.0), p(2.0, 0.0, 0.0), p(0.0, 2.0, 0.0)];
        let b = [p(0.5, 0.5, 0.0), p(3.0, 0.5, 0.0), p(0.5, 3.0, 0.0)];
        let c = [p(5.0, 5.0, 0.0), p(6.0, 5.0, 0.0), p(5.0, 6.0, 0.0)];

        assert_eq!(triangle_triangle_intersection(&a, &b), TriangleIntersection::Coplanar);
        assert_eq!(triangle_triangle_intersection(&a, &c), TriangleIntersection::None);
    }

    #[test]
    fn test_touching_at_edge_is_point_or_segment() {
        // Perpendicular triangle standing on the edge of another
        let a = [p(0.0, 0.0, 0.0), p(2.0, 0.0, 0.0), p(0.0, 2.0, 0.0)];
        let b = [p(0.5, 0.0, 0.0), p(1.5, 0.0, 0.0), p(1.0, 0.0, 1.0)];

        match triangle_triangle_intersection(&a, &b) {
            TriangleIntersection::Segment(segment) => {
                assert!((segment.length() - 1.0).abs() < 1e-12);
            }
            other => panic!("expected touching segment, got {:?}", other),
        }
    }

    #[test]
    fn test_edge_crossing_is_order_independent() {
        let p0 = p(0.1, 0.7, -3.3);
        let p1 = p(2.9, -1.3, 4.1);
        let a = edge_crossing(&p0, 0.37, &p1, -1.91);
        let b = edge_crossing(&p1, -1.91, &p0, 0.37);
        assert_eq!(a, b);
    }
}
