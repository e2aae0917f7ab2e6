// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Intersection classification for CSG operations
//!
//! Finds every crossing triangle pair between two prepared meshes and tags
//! each triangle as inside, outside or on the boundary of the other solid.
//! Points are located by casting a ray to the closest surface hit and
//! reading which side of that surface the ray arrived from.

use super::brush::PreparedMesh;
use super::bvh::Ray;
use super::robust_predicates::{point_in_triangle, PLANE_EPSILON};
use super::triangle_intersection::{intersect_triangles, IntersectionSegment, TriangleIntersection};
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Location of a triangle relative to the other solid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriangleClass {
    Inside,
    Outside,
    /// Crosses, touches or lies on the other surface; needs re-triangulation
    Boundary,
}

/// Location of a re-triangulated fragment relative to the other solid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FragmentSide {
    Inside,
    Outside,
    /// On a face of the other solid, facing the same way
    CoplanarAligned,
    /// On a face of the other solid, facing the opposite way
    CoplanarOpposite,
}

/// Triangles of the other mesh that a triangle meets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriangleContacts {
    /// Non-coplanar triangles crossing or touching this one, ascending
    pub cutting: Vec<usize>,
    /// Coplanar triangles overlapping this one, ascending
    pub coplanar: Vec<usize>,
    /// Indices into [`Classification::segments`]
    pub segments: Vec<usize>,
}

impl TriangleContacts {
    pub fn is_empty(&self) -> bool {
        self.cutting.is_empty() && self.coplanar.is_empty()
    }
}

/// Per-triangle classification of one operand
#[derive(Debug, Clone, Default)]
pub struct ClassifiedMesh {
    pub classes: Vec<TriangleClass>,
    pub contacts: Vec<TriangleContacts>,
}

impl ClassifiedMesh {
    pub fn count(&self, class: TriangleClass) -> usize {
        self.classes.iter().filter(|&&c| c == class).count()
    }
}

/// Output of [`classify`]
#[derive(Debug, Clone, Default)]
pub struct Classification {
    pub a: ClassifiedMesh,
    pub b: ClassifiedMesh,
    pub segments: Vec<IntersectionSegment>,
    /// Triangle pairs whose boxes overlapped
    pub candidate_pairs: usize,
}

/// Classify every triangle of `a` against `b` and vice versa
pub fn classify(a: &PreparedMesh, b: &PreparedMesh, parallel: bool) -> Classification {
    let pairs = if a.bounds().expanded(PLANE_EPSILON).intersects(&b.bounds()) {
        a.bvh.intersecting_pairs(&b.bvh, PLANE_EPSILON)
    } else {
        Vec::new()
    };

    let results = map_indices(pairs.len(), parallel, |k| {
        let (ta, tb) = pairs[k];
        match (a.plane(ta), b.plane(tb)) {
            (Some(pa), Some(pb)) => intersect_triangles(&a.triangle(ta), pa, &b.triangle(tb), pb),
            _ => TriangleIntersection::None,
        }
    });

    let mut contacts_a = vec![TriangleContacts::default(); a.mesh.triangle_count()];
    let mut contacts_b = vec![TriangleContacts::default(); b.mesh.triangle_count()];
    let mut segments = Vec::new();

    for (&(ta, tb), result) in pairs.iter().zip(results) {
        match result {
            TriangleIntersection::None => {}
            TriangleIntersection::Coplanar => {
                contacts_a[ta].coplanar.push(tb);
                contacts_b[tb].coplanar.push(ta);
            }
            TriangleIntersection::Segment(segment) => {
                let id = segments.len();
                segments.push(segment);
                contacts_a[ta].cutting.push(tb);
                contacts_a[ta].segments.push(id);
                contacts_b[tb].cutting.push(ta);
                contacts_b[tb].segments.push(id);
            }
        }
    }

    let classes_a = classify_triangles(a, &contacts_a, b, parallel);
    let classes_b = classify_triangles(b, &contacts_b, a, parallel);

    let classification = Classification {
        a: ClassifiedMesh {
            classes: classes_a,
            contacts: contacts_a,
        },
        b: ClassifiedMesh {
            classes: classes_b,
            contacts: contacts_b,
        },
        segments,
        candidate_pairs: pairs.len(),
    };

    tracing::debug!(
        candidate_pairs = classification.candidate_pairs,
        segments = classification.segments.len(),
        boundary_a = classification.a.count(TriangleClass::Boundary),
        boundary_b = classification.b.count(TriangleClass::Boundary),
        "classified operands"
    );

    classification
}

fn classify_triangles(
    mesh: &PreparedMesh,
    contacts: &[TriangleContacts],
    other: &PreparedMesh,
    parallel: bool,
) -> Vec<TriangleClass> {
    let other_bounds = other.bounds().expanded(PLANE_EPSILON);

    map_indices(mesh.mesh.triangle_count(), parallel, |t| {
        if !contacts[t].is_empty() {
            return TriangleClass::Boundary;
        }
        if !mesh.bvh.triangle_box(t).intersects(&other_bounds) {
            return TriangleClass::Outside;
        }
        let [p0, p1, p2] = mesh.triangle(t);
        let centroid = Point3::from((p0.coords + p1.coords + p2.coords) / 3.0);
        match point_side(&centroid, other) {
            FragmentSide::Inside => TriangleClass::Inside,
            _ => TriangleClass::Outside,
        }
    })
}

/// Skewed directions with no zero component, so rays rarely run along
/// axis-aligned faces or graze shared edges
fn ray_directions() -> [Vector3<f64>; 3] {
    [
        Vector3::new(0.3121, 0.8472, 0.4299).normalize(),
        Vector3::new(-0.6711, 0.2903, 0.6822).normalize(),
        Vector3::new(0.4519, -0.5378, -0.7116).normalize(),
    ]
}

/// Inside or outside of a closed solid.
///
/// A ray whose closest hit is too close to the origin, lands near a
/// triangle edge or grazes the surface is ambiguous and the next direction
/// is tried. If every direction is ambiguous, hit parity decides.
pub fn point_side(point: &Point3<f64>, solid: &PreparedMesh) -> FragmentSide {
    const EDGE_TOLERANCE: f64 = 1e-9;
    const GRAZING_COSINE: f64 = 1e-6;

    if solid.bvh.is_empty() || !solid.bounds().expanded(PLANE_EPSILON).contains_point(point) {
        return FragmentSide::Outside;
    }

    let directions = ray_directions();
    for direction in &directions {
        let ray = Ray::new(*point, *direction);
        let Some(hit) = solid.bvh.raycast_closest(&solid.mesh, &ray) else {
            return FragmentSide::Outside;
        };
        let Some(plane) = solid.plane(hit.triangle) else {
            continue;
        };
        let cosine = direction.dot(&plane.normal);
        if hit.distance <= PLANE_EPSILON
            || hit.is_near_edge(EDGE_TOLERANCE)
            || cosine.abs() < GRAZING_COSINE
        {
            continue;
        }
        // Leaving through a face means the point was behind it
        return if cosine > 0.0 {
            FragmentSide::Inside
        } else {
            FragmentSide::Outside
        };
    }

    let ray = Ray::new(*point, directions[0]);
    let crossings = solid
        .bvh
        .raycast_all(&solid.mesh, &ray)
        .iter()
        .filter(|h| h.distance > PLANE_EPSILON)
        .count();
    tracing::trace!(crossings, "ray classification fell back to parity");
    if crossings % 2 == 1 {
        FragmentSide::Inside
    } else {
        FragmentSide::Outside
    }
}

/// Side of a fragment with the given centroid and facing.
///
/// Coplanar candidates are checked first in ascending index order; the
/// first one containing the centroid decides between aligned and opposite.
pub fn fragment_side(
    centroid: &Point3<f64>,
    normal: &Vector3<f64>,
    coplanar: &[usize],
    solid: &PreparedMesh,
) -> FragmentSide {
    for &q in coplanar {
        let Some(plane) = solid.plane(q) else {
            continue;
        };
        if plane.signed_distance(centroid).abs() > PLANE_EPSILON * 10.0 {
            continue;
        }
        if point_in_triangle(centroid, &solid.triangle(q), &plane.normal, PLANE_EPSILON) {
            return if normal.dot(&plane.normal) > 0.0 {
                FragmentSide::CoplanarAligned
            } else {
                FragmentSide::CoplanarOpposite
            };
        }
    }

    point_side(centroid, solid)
}

/// `(0..count).map(f)` collected in order, on the rayon pool when `parallel`
pub(crate) fn map_indices<T, F>(count: usize, parallel: bool, f: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Sync + Send,
{
    if parallel {
        (0..count).into_par_iter().map(f).collect()
    } else {
        (0..count).map(f).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;
    use nalgebra::Translation3;

    fn prepared(primitive: Primitive, offset: Vector3<f64>) -> PreparedMesh {
        let mesh = primitive
            .to_mesh()
            .transformed(&Translation3::from(offset).to_homogeneous());
        PreparedMesh::new(mesh).unwrap()
    }

    #[test]
    fn test_point_side() {
        let cube = prepared(Primitive::cube(4.0), Vector3::zeros());
        assert_eq!(point_side(&Point3::new(0.3, -0.2, 1.1), &cube), FragmentSide::Inside);
        assert_eq!(point_side(&Point3::new(1.9, 1.9, 1.9), &cube), FragmentSide::Inside);
        assert_eq!(point_side(&Point3::new(2.5, 0.0, 0.0), &cube), FragmentSide::Outside);
        assert_eq!(point_side(&Point3::new(50.0, 0.0, 0.0), &cube), FragmentSide::Outside);
    }

    #[test]
    fn test_point_side_in_cylinder() {
        let cylinder = prepared(Primitive::cylinder(1.0, 5.0, 45), Vector3::zeros());
        assert_eq!(point_side(&Point3::new(0.2, 2.0, -0.3), &cylinder), FragmentSide::Inside);
        assert_eq!(point_side(&Point3::new(1.2, 0.0, 0.0), &cylinder), FragmentSide::Outside);
    }

    #[test]
    fn test_classify_overlapping_cubes() {
        let a = prepared(Primitive::cube(4.0), Vector3::zeros());
        let b = prepared(Primitive::cube(4.0), Vector3::new(3.0, 0.0, 0.0));
        let result = classify(&a, &b, false);

        assert!(result.candidate_pairs > 0);
        assert!(!result.segments.is_empty());

        // Only the -x face of A stays clear of B's surface; every other
        // face crosses or touches it
        for t in 0..a.mesh.triangle_count() {
            let normal = a.mesh.face_normal(t).unwrap();
            let expected = if normal.x < -0.5 {
                TriangleClass::Outside
            } else {
                TriangleClass::Boundary
            };
            assert_eq!(result.a.classes[t], expected);
        }
        assert_eq!(result.b.count(TriangleClass::Outside), 2);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let a = prepared(Primitive::sphere(1.0, 16, 12), Vector3::zeros());
        let b = prepared(Primitive::cube(1.3), Vector3::new(0.6, 0.3, -0.2));
        let seq = classify(&a, &b, false);
        let par = classify(&a, &b, true);

        assert_eq!(seq.a.classes, par.a.classes);
        assert_eq!(seq.b.classes, par.b.classes);
        assert_eq!(seq.a.contacts, par.a.contacts);
        assert_eq!(seq.segments, par.segments);
    }

    #[test]
    fn test_coplanar_fragment_side() {
        let a = prepared(Primitive::cube(4.0), Vector3::zeros());
        let b = prepared(Primitive::cube(4.0), Vector3::zeros());
        let result = classify(&a, &b, false);

        // Identical cubes: every triangle overlaps a coplanar one facing the same way
        for t in 0..a.mesh.triangle_count() {
            assert_eq!(result.a.classes[t], TriangleClass::Boundary);
            let [p0, p1, p2] = a.triangle(t);
            let centroid = Point3::from((p0.coords + p1.coords + p2.coords) / 3.0);
            let normal = a.plane(t).unwrap().normal;
            let side = fragment_side(&centroid, &normal, &result.a.contacts[t].coplanar, &b);
            assert_eq!(side, FragmentSide::CoplanarAligned);
            assert_eq!(
                fragment_side(&centroid, &-normal, &result.a.contacts[t].coplanar, &b),
                FragmentSide::CoplanarOpposite
            );
        }
    }
}
