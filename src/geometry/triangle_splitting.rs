// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Triangle splitting for CSG operations
//!
//! A boundary triangle is cut by the supporting plane of every triangle of
//! the other solid that crosses it. Each cut splits all current pieces, so
//! pieces of one triangle always share their cut vertices. Crossing points
//! are interpolated from the lexicographically smaller edge endpoint, which
//! makes neighbouring triangles cut by the same plane produce bit-identical
//! points along their shared edge.

use super::robust_predicates::{Plane, AREA_EPSILON, PLANE_EPSILON};
use super::triangle_intersection::lexicographic_less;
use super::Vertex;
use nalgebra::{Point3, Vector3};

/// Convex polygon cut out of one source triangle, wound like the source
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub vertices: Vec<Vertex>,
}

impl Fragment {
    pub fn from_triangle(vertices: [Vertex; 3]) -> Self {
        Self {
            vertices: vertices.to_vec(),
        }
    }

    /// Vertex average; inside the polygon since it is convex
    pub fn centroid(&self) -> Point3<f64> {
        let sum = self
            .vertices
            .iter()
            .fold(Vector3::zeros(), |acc, v| acc + v.position.coords);
        Point3::from(sum / self.vertices.len() as f64)
    }

    /// Twice-area vector (normal direction times twice the area)
    pub fn area_vector(&self) -> Vector3<f64> {
        let origin = self.vertices[0].position;
        self.vertices
            .windows(2)
            .skip(1)
            .fold(Vector3::zeros(), |acc, pair| {
                acc + (pair[0].position - origin).cross(&(pair[1].position - origin))
            })
    }

    pub fn area(&self) -> f64 {
        self.area_vector().norm() / 2.0
    }

    /// Fan triangulation from the first vertex
    pub fn triangulate(&self) -> impl Iterator<Item = [&Vertex; 3]> + '_ {
        (1..self.vertices.len().saturating_sub(1)).map(move |i| {
            [&self.vertices[0], &self.vertices[i], &self.vertices[i + 1]]
        })
    }

    fn is_degenerate(&self) -> bool {
        self.vertices.len() < 3 || self.area_vector().norm() <= AREA_EPSILON
    }
}

/// Result of splitting a fragment by a plane
#[derive(Debug, Clone, Default)]
pub struct SplitResult {
    /// Piece on the side the plane normal points to
    pub front: Option<Fragment>,
    pub back: Option<Fragment>,
}

/// Split a convex fragment by a plane. Vertices within [`PLANE_EPSILON`] of
/// the plane belong to both sides; a fragment that does not strictly cross
/// the plane is returned whole on its side.
pub fn split_fragment_by_plane(fragment: &Fragment, plane: &Plane) -> SplitResult {
    let distances: Vec<f64> = fragment
        .vertices
        .iter()
        .map(|v| {
            let d = plane.signed_distance(&v.position);
            if d.abs() <= PLANE_EPSILON {
                0.0
            } else {
                d
            }
        })
        .collect();

    let any_front = distances.iter().any(|&d| d > 0.0);
    let any_back = distances.iter().any(|&d| d < 0.0);

    if !any_back {
        return SplitResult {
            front: Some(fragment.clone()),
            back: None,
        };
    }
    if !any_front {
        return SplitResult {
            front: None,
            back: Some(fragment.clone()),
        };
    }

    let count = fragment.vertices.len();
    let mut front = Vec::with_capacity(count + 1);
    let mut back = Vec::with_capacity(count + 1);

    for i in 0..count {
        let j = (i + 1) % count;
        let (vi, vj) = (&fragment.vertices[i], &fragment.vertices[j]);
        let (di, dj) = (distances[i], distances[j]);

        if di >= 0.0 {
            front.push(*vi);
        }
        if di <= 0.0 {
            back.push(*vi);
        }
        if (di > 0.0 && dj < 0.0) || (di < 0.0 && dj > 0.0) {
            let crossing = interpolate_crossing(vi, di, vj, dj);
            front.push(crossing);
            back.push(crossing);
        }
    }

    let keep = |vertices: Vec<Vertex>| {
        let piece = Fragment { vertices };
        (!piece.is_degenerate()).then_some(piece)
    };

    SplitResult {
        front: keep(front),
        back: keep(back),
    }
}

/// Attribute-interpolated vertex where edge (a, b) meets the plane
fn interpolate_crossing(a: &Vertex, da: f64, b: &Vertex, db: f64) -> Vertex {
    let (a, da, b, db) = if lexicographic_less(&a.position, &b.position) {
        (a, da, b, db)
    } else {
        (b, db, a, da)
    };
    let t = da / (da - db);
    a.interpolate(b, t)
}

/// Drop planes that coincide (in either orientation) with an earlier one
pub fn unique_planes(planes: impl IntoIterator<Item = Plane>) -> Vec<Plane> {
    let mut unique: Vec<Plane> = Vec::new();
    for plane in planes {
        if !unique.iter().any(|p| p.is_coincident(&plane)) {
            unique.push(plane);
        }
    }
    unique
}

/// Cut a triangle by every plane in order. The pieces tile the triangle.
pub fn split_triangle_by_planes(triangle: [Vertex; 3], planes: &[Plane]) -> Vec<Fragment> {
    let mut fragments = vec![Fragment::from_triangle(triangle)];

    for plane in planes {
        let mut next = Vec::with_capacity(fragments.len() + 1);
        for fragment in &fragments {
            let split = split_fragment_by_plane(fragment, plane);
            next.extend(split.front);
            next.extend(split.back);
        }
        fragments = next;
    }

    fragments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertex(x: f64, y: f64, z: f64) -> Vertex {
        Vertex::new(Point3::new(x, y, z), Vector3::new(0.0, 0.0, 1.0))
    }

    fn plane_x(w: f64) -> Plane {
        Plane {
            normal: Vector3::new(1.0, 0.0, 0.0),
            w,
        }
    }

    fn triangle() -> [Vertex; 3] {
        [vertex(-2.0, -2.0, 0.0), vertex(2.0, -2.0, 0.0), vertex(2.0, 2.0, 0.0)]
    }

    #[test]
    fn test_split_preserves_area() {
        let fragments = split_triangle_by_planes(triangle(), &[plane_x(1.0)]);
        assert_eq!(fragments.len(), 2);

        let total: f64 = fragments.iter().map(|f| f.area()).sum();
        assert!((total - 8.0).abs() < 1e-12);

        // Both pieces keep the source winding
        for fragment in &fragments {
            assert!(fragment.area_vector().z > 0.0);
        }
    }

    #[test]
    fn test_plane_through_vertex_does_not_split() {
        let fragments = split_triangle_by_planes(triangle(), &[plane_x(2.0), plane_x(-2.0)]);
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].vertices.len(), 3);
    }

    #[test]
    fn test_cut_vertices_are_shared() {
        let planes = [
            plane_x(1.0),
            Plane {
                normal: Vector3::new(0.0, 1.0, 0.0),
                w: -1.0,
            },
        ];
        let fragments = split_triangle_by_planes(triangle(), &planes);
        assert_eq!(fragments.len(), 4);

        let total: f64 = fragments.iter().map(|f| f.area()).sum();
        assert!((total - 8.0).abs() < 1e-12);

        // The corner where both cuts meet appears in all four pieces
        let corner = Point3::new(1.0, -1.0, 0.0);
        let sharing = fragments
            .iter()
            .filter(|f| f.vertices.iter().any(|v| v.position == corner))
            .count();
        assert_eq!(sharing, 4);
    }

    #[test]
    fn test_neighbours_get_identical_crossings() {
        let shared_a = vertex(0.3, -1.7, 0.0);
        let shared_b = vertex(2.9, 1.1, 0.0);
        let left = [shared_a, shared_b, vertex(-1.0, 2.0, 0.0)];
        let right = [shared_b, shared_a, vertex(3.0, -2.0, 0.0)];
        let plane = plane_x(1.234567);

        let crossings = |tri: [Vertex; 3]| -> Vec<Point3<f64>> {
            split_triangle_by_planes(tri, &[plane])
                .iter()
                .flat_map(|f| f.vertices.iter().map(|v| v.position))
                .filter(|p| (p.x - 1.234567).abs() < 1e-12)
                .collect()
        };

        let on_left = crossings(left);
        let on_right = crossings(right);
        assert!(on_left.iter().any(|p| on_right.contains(p)));
    }

    #[test]
    fn test_fan_triangulation() {
        let fragments = split_triangle_by_planes(triangle(), &[plane_x(1.0)]);
        let quad = fragments.iter().find(|f| f.vertices.len() == 4).unwrap();
        assert_eq!(quad.triangulate().count(), 2);
    }

    #[test]
    fn test_unique_planes() {
        let planes = unique_planes([plane_x(1.0), plane_x(1.0).flipped(), plane_x(2.0)]);
        assert_eq!(planes.len(), 2);
    }
}
