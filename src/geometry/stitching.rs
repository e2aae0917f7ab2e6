// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Seam repair for assembled boolean results
//!
//! Fragments of neighbouring triangles are cut independently, so a vertex
//! created on one side of a shared edge may be missing on the other side.
//! This pass welds coincident positions and splits every open edge that
//! has a welded vertex lying strictly inside it, until no such T-junction
//! is left. Faces that land on top of each other with opposite winding
//! after welding enclose nothing and are removed in pairs.

use super::mesh_utils::Edge;
use super::{Mesh, Triangle, VertexMap};
use ahash::AHashMap;
use nalgebra::Point3;
use serde::{Deserialize, Serialize};

/// Upper bound on repair passes; each pass splits at most one edge per
/// triangle
pub const MAX_STITCH_PASSES: usize = 16;

/// Counters reported by [`stitch`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StitchReport {
    /// Vertices moved onto an earlier vertex within tolerance
    pub welded_vertices: usize,
    /// Zero-height triangles removed
    pub degenerate_removed: usize,
    /// Back-to-back triangle pairs removed
    pub cancelled_pairs: usize,
    /// Edges split at T-junctions
    pub edges_split: usize,
    pub passes: usize,
    /// False when the pass limit was reached with work left
    pub converged: bool,
}

/// Weld positions and repair T-junctions in place.
///
/// Triangle order is kept except that split triangles append their extra
/// pieces at the end. Hash maps are only used for lookups, so the output
/// does not depend on hashing.
pub fn stitch(mesh: &mut Mesh, tolerance: f64) -> StitchReport {
    let mut report = StitchReport::default();

    let mut welder = VertexMap::with_capacity(tolerance, mesh.vertices.len());
    let mut ids = Vec::with_capacity(mesh.vertices.len());
    for vertex in &mut mesh.vertices {
        let known = welder.len();
        let id = welder.insert(vertex.position);
        if id < known && vertex.position != welder.position(id) {
            report.welded_vertices += 1;
        }
        vertex.position = welder.position(id);
        ids.push(id);
    }
    let positions = welder.positions();

    for pass in 0..MAX_STITCH_PASSES {
        report.passes = pass + 1;

        let removed = remove_degenerate(mesh, &ids, positions, tolerance);
        report.degenerate_removed += removed;

        let cancelled = cancel_opposite_pairs(mesh, &ids);
        report.cancelled_pairs += cancelled;

        let split = split_t_junctions(mesh, &mut ids, positions, tolerance);
        report.edges_split += split;

        if removed == 0 && cancelled == 0 && split == 0 {
            report.converged = true;
            break;
        }
    }

    if !report.converged {
        tracing::warn!(
            passes = report.passes,
            edges_split = report.edges_split,
            "seam repair stopped before converging"
        );
    }
    tracing::debug!(
        welded = report.welded_vertices,
        degenerate = report.degenerate_removed,
        cancelled = report.cancelled_pairs,
        split = report.edges_split,
        passes = report.passes,
        "stitched result"
    );

    report
}

/// Drop triangles with repeated welded corners or height below `tolerance`
fn remove_degenerate(
    mesh: &mut Mesh,
    ids: &[usize],
    positions: &[Point3<f64>],
    tolerance: f64,
) -> usize {
    let before = mesh.triangles.len();
    mesh.triangles.retain(|triangle| {
        let [a, b, c] = triangle.indices.map(|i| ids[i]);
        if a == b || b == c || a == c {
            return false;
        }
        let (pa, pb, pc) = (positions[a], positions[b], positions[c]);
        let longest = (pb - pa)
            .norm()
            .max((pc - pb).norm())
            .max((pa - pc).norm());
        (pb - pa).cross(&(pc - pa)).norm() > tolerance * longest
    });
    before - mesh.triangles.len()
}

/// Remove pairs of triangles over the same welded corners with opposite
/// winding. Partners are matched in triangle order.
fn cancel_opposite_pairs(mesh: &mut Mesh, ids: &[usize]) -> usize {
    let mut unmatched: AHashMap<[usize; 3], Vec<usize>> = AHashMap::new();
    let mut removed = vec![false; mesh.triangles.len()];
    let mut pairs = 0;

    for (t, triangle) in mesh.triangles.iter().enumerate() {
        let [a, b, c] = triangle.indices.map(|i| ids[i]);
        let partner = unmatched
            .get_mut(&cycle_key([a, c, b]))
            .and_then(|waiting| waiting.pop());
        match partner {
            Some(partner) => {
                removed[partner] = true;
                removed[t] = true;
                pairs += 1;
            }
            None => unmatched.entry(cycle_key([a, b, c])).or_default().push(t),
        }
    }

    if pairs > 0 {
        let mut flags = removed.into_iter();
        mesh.triangles.retain(|_| !flags.next().unwrap_or(false));
    }
    pairs
}

/// Corner cycle rotated to start at its smallest id
fn cycle_key([a, b, c]: [usize; 3]) -> [usize; 3] {
    if a <= b && a <= c {
        [a, b, c]
    } else if b <= c {
        [b, c, a]
    } else {
        [c, a, b]
    }
}

fn split_t_junctions(
    mesh: &mut Mesh,
    ids: &mut Vec<usize>,
    positions: &[Point3<f64>],
    tolerance: f64,
) -> usize {
    let mut edge_counts: AHashMap<Edge, u32> = AHashMap::new();
    for triangle in &mesh.triangles {
        let t = triangle.indices.map(|i| ids[i]);
        for k in 0..3 {
            *edge_counts.entry(Edge::new(t[k], t[(k + 1) % 3])).or_insert(0) += 1;
        }
    }
    let is_open = |u: usize, v: usize| edge_counts.get(&Edge::new(u, v)) == Some(&1);

    // Endpoints of open edges, sorted by x for range lookups
    let mut candidates: Vec<usize> = Vec::new();
    for triangle in &mesh.triangles {
        let t = triangle.indices.map(|i| ids[i]);
        for k in 0..3 {
            if is_open(t[k], t[(k + 1) % 3]) {
                candidates.push(t[k]);
                candidates.push(t[(k + 1) % 3]);
            }
        }
    }
    candidates.sort_unstable();
    candidates.dedup();
    candidates.sort_by(|&a, &b| positions[a].x.total_cmp(&positions[b].x).then(a.cmp(&b)));

    let mut split_count = 0;
    let triangle_count = mesh.triangles.len();
    for t in 0..triangle_count {
        let triangle = mesh.triangles[t];
        let corners = triangle.indices;
        for k in 0..3 {
            let (ui, vi, ci) = (corners[k], corners[(k + 1) % 3], corners[(k + 2) % 3]);
            let (u, v) = (ids[ui], ids[vi]);
            if !is_open(u, v) {
                continue;
            }
            let inner = points_inside_edge(u, v, &candidates, positions, tolerance);
            if inner.is_empty() {
                continue;
            }

            let (start, end) = (mesh.vertices[ui], mesh.vertices[vi]);
            let mut previous = ui;
            let mut pieces = Vec::with_capacity(inner.len() + 1);
            for (s, w) in inner {
                let mut vertex = start.interpolate(&end, s);
                vertex.position = positions[w];
                let index = mesh.add_vertex(vertex);
                ids.push(w);
                pieces.push(Triangle::with_material([previous, index, ci], triangle.material));
                previous = index;
            }
            pieces.push(Triangle::with_material([previous, vi, ci], triangle.material));

            let mut pieces = pieces.into_iter();
            if let Some(first) = pieces.next() {
                mesh.triangles[t] = first;
            }
            mesh.triangles.extend(pieces);
            split_count += 1;
            break;
        }
    }

    split_count
}

/// Welded vertices strictly inside segment (u, v), with their parameter,
/// ordered from u to v
fn points_inside_edge(
    u: usize,
    v: usize,
    candidates: &[usize],
    positions: &[Point3<f64>],
    tolerance: f64,
) -> Vec<(f64, usize)> {
    let (pu, pv) = (positions[u], positions[v]);
    let direction = pv - pu;
    let length_sq = direction.norm_squared();
    if length_sq <= tolerance * tolerance {
        return Vec::new();
    }
    let margin = tolerance / length_sq.sqrt();

    let lo = pu.x.min(pv.x) - tolerance;
    let hi = pu.x.max(pv.x) + tolerance;
    let first = candidates.partition_point(|&w| positions[w].x < lo);

    let mut inner: Vec<(f64, usize)> = candidates[first..]
        .iter()
        .take_while(|&&w| positions[w].x <= hi)
        .filter(|&&w| w != u && w != v)
        .filter_map(|&w| {
            let offset = positions[w] - pu;
            let s = offset.dot(&direction) / length_sq;
            if s <= margin || s >= 1.0 - margin {
                return None;
            }
            let distance = (offset - direction * s).norm();
            (distance < tolerance).then_some((s, w))
        })
        .collect();

    inner.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
    inner
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::mesh_utils::validate_mesh;
    use crate::geometry::robust_predicates::WELD_EPSILON;
    use crate::geometry::Vertex;
    use nalgebra::Vector3;

    fn vertex(x: f64, y: f64, z: f64) -> Vertex {
        Vertex::new(Point3::new(x, y, z), Vector3::z())
    }

    /// Square made of one big triangle on the left half-edge side and two
    /// small ones sharing a midpoint the big triangle lacks
    fn t_junction_mesh() -> Mesh {
        let mut mesh = Mesh::new();
        let a = mesh.add_vertex(vertex(0.0, 0.0, 0.0));
        let b = mesh.add_vertex(vertex(2.0, 0.0, 0.0));
        let c = mesh.add_vertex(vertex(0.0, 2.0, 0.0));
        mesh.add_triangle(Triangle::new([a, b, c]));

        let b2 = mesh.add_vertex(vertex(2.0, 0.0, 0.0));
        let c2 = mesh.add_vertex(vertex(0.0, 2.0, 0.0));
        let m = mesh.add_vertex(vertex(1.0, 1.0, 0.0));
        let d = mesh.add_vertex(vertex(2.0, 2.0, 0.0));
        mesh.add_triangle(Triangle::new([b2, d, m]));
        mesh.add_triangle(Triangle::new([m, d, c2]));
        mesh
    }

    #[test]
    fn test_splits_t_junction() {
        let mut mesh = t_junction_mesh();
        let report = stitch(&mut mesh, WELD_EPSILON);

        assert!(report.converged);
        assert_eq!(report.edges_split, 1);
        assert_eq!(mesh.triangle_count(), 4);

        // Only the outer square boundary stays open
        let validation = validate_mesh(&mesh);
        assert_eq!(validation.boundary_edge_count, 4);
        assert!(validation.is_consistently_oriented);
    }

    #[test]
    fn test_closed_mesh_is_untouched() {
        let mut mesh = crate::geometry::Primitive::cube(2.0).to_mesh();
        let before = mesh.clone();
        let report = stitch(&mut mesh, WELD_EPSILON);

        assert!(report.converged);
        assert_eq!(report.passes, 1);
        assert_eq!(report.edges_split, 0);
        assert_eq!(mesh, before);
    }

    #[test]
    fn test_cancels_back_to_back_faces() {
        let mut mesh = t_junction_mesh();
        // Reversed copy of the big triangle, a hair off its plane
        let a = mesh.add_vertex(vertex(0.0, 0.0, 4e-7));
        let b = mesh.add_vertex(vertex(2.0, 0.0, 4e-7));
        let c = mesh.add_vertex(vertex(0.0, 2.0, 4e-7));
        mesh.add_triangle(Triangle::new([a, c, b]));

        let report = stitch(&mut mesh, WELD_EPSILON);
        assert!(report.converged);
        assert_eq!(report.cancelled_pairs, 1);
        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(validate_mesh(&mesh).non_manifold_edge_count, 0);
    }

    #[test]
    fn test_same_winding_duplicates_are_kept() {
        let mut mesh = Mesh::new();
        let a = mesh.add_vertex(vertex(0.0, 0.0, 0.0));
        let b = mesh.add_vertex(vertex(1.0, 0.0, 0.0));
        let c = mesh.add_vertex(vertex(0.0, 1.0, 0.0));
        mesh.add_triangle(Triangle::new([a, b, c]));
        mesh.add_triangle(Triangle::new([b, c, a]));

        let report = stitch(&mut mesh, WELD_EPSILON);
        assert_eq!(report.cancelled_pairs, 0);
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn test_welds_and_drops_slivers() {
        let mut mesh = Mesh::new();
        let a = mesh.add_vertex(vertex(0.0, 0.0, 0.0));
        let b = mesh.add_vertex(vertex(1.0, 0.0, 0.0));
        let c = mesh.add_vertex(vertex(0.0, 1.0, 0.0));
        let b_near = mesh.add_vertex(vertex(1.0 + 1e-8, 0.0, 0.0));
        mesh.add_triangle(Triangle::new([a, b, c]));
        mesh.add_triangle(Triangle::new([a, b_near, b]));

        let report = stitch(&mut mesh, WELD_EPSILON);
        assert_eq!(report.welded_vertices, 1);
        assert_eq!(report.degenerate_removed, 1);
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.vertices[b_near].position, mesh.vertices[b].position);
    }
}
