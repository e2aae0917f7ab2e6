// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh comparison for determinism and idempotence checks

use crate::geometry::analytics::signed_volume;
use crate::geometry::{Mesh, VertexMap};
use serde::{Deserialize, Serialize};

/// Result of mesh comparison
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshComparison {
    pub vertex_count_diff: i64,
    pub triangle_count_diff: i64,
    pub volume_diff: f64,
    pub bbox_match: bool,
    /// Every position of one mesh has a counterpart in the other
    pub vertex_sets_match: bool,
    pub tolerance: f64,
    pub passed: bool,
}

/// Compare two meshes geometrically: bounds, enclosed volume and vertex
/// position sets within `tolerance`. Counts are reported but do not decide.
pub fn compare_meshes(mesh_a: &Mesh, mesh_b: &Mesh, tolerance: f64) -> MeshComparison {
    let volume_diff = (signed_volume(mesh_a) - signed_volume(mesh_b)).abs();
    let bbox_match = (mesh_a.is_empty() && mesh_b.is_empty())
        || mesh_a
            .bounding_box()
            .approx_eq(&mesh_b.bounding_box(), tolerance);
    let vertex_sets_match = covers(mesh_a, mesh_b, tolerance) && covers(mesh_b, mesh_a, tolerance);

    MeshComparison {
        vertex_count_diff: mesh_a.vertex_count() as i64 - mesh_b.vertex_count() as i64,
        triangle_count_diff: mesh_a.triangle_count() as i64 - mesh_b.triangle_count() as i64,
        volume_diff,
        bbox_match,
        vertex_sets_match,
        tolerance,
        passed: bbox_match && vertex_sets_match && volume_diff <= tolerance,
    }
}

/// Every position of `other` is within tolerance of a position of `mesh`
fn covers(mesh: &Mesh, other: &Mesh, tolerance: f64) -> bool {
    let mut map = VertexMap::with_capacity(tolerance, mesh.vertex_count());
    for vertex in &mesh.vertices {
        map.insert(vertex.position);
    }
    other
        .vertices
        .iter()
        .all(|vertex| map.find(&vertex.position).is_some())
}
