// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry analytics and statistics

use super::mesh_utils::validate_mesh;
use super::Mesh;
use crate::utils::triangle_cross;
use serde::{Deserialize, Serialize};

/// Geometry statistics and analytics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryStats {
    /// Signed enclosed volume; positive for outward-facing closed meshes
    pub volume: f64,
    /// Total surface area in square units
    pub surface_area: f64,
    /// Bounding box [min_x, min_y, min_z, max_x, max_y, max_z]
    pub bbox: [f64; 6],
    /// Area-weighted surface centroid [x, y, z]
    pub centroid: [f64; 3],
    /// Number of vertices
    pub vertex_count: usize,
    /// Number of triangles
    pub triangle_count: usize,
    /// Number of material groups (0 when ungrouped)
    pub group_count: usize,
    /// Every welded edge shared by exactly two triangles
    pub is_watertight: bool,
    /// Shared edges run in opposite directions
    pub is_consistently_oriented: bool,
}

impl GeometryStats {
    /// Create empty stats
    pub fn empty() -> Self {
        Self {
            volume: 0.0,
            surface_area: 0.0,
            bbox: [0.0; 6],
            centroid: [0.0; 3],
            vertex_count: 0,
            triangle_count: 0,
            group_count: 0,
            is_watertight: true,
            is_consistently_oriented: true,
        }
    }

    /// Pretty print statistics
    pub fn print(&self) {
        println!("╔══════════════════════════════════════════════════════════╗");
        println!("║              GEOMETRY ANALYTICS                          ║");
        println!("╠══════════════════════════════════════════════════════════╣");
        println!("║ Volume:          {:>12.4}                            ║", self.volume);
        println!("║ Surface Area:    {:>12.4}                            ║", self.surface_area);
        println!(
            "║ Centroid:        ({:>7.2}, {:>7.2}, {:>7.2})            ║",
            self.centroid[0], self.centroid[1], self.centroid[2]
        );
        println!("║                                                          ║");
        println!("║ Bounding Box:                                            ║");
        println!(
            "║   Min: ({:>7.2}, {:>7.2}, {:>7.2})                      ║",
            self.bbox[0], self.bbox[1], self.bbox[2]
        );
        println!(
            "║   Max: ({:>7.2}, {:>7.2}, {:>7.2})                      ║",
            self.bbox[3], self.bbox[4], self.bbox[5]
        );
        println!("║                                                          ║");
        println!("║ Vertices:        {:>10}                              ║", self.vertex_count);
        println!("║ Triangles:       {:>10}                              ║", self.triangle_count);
        println!("║ Groups:          {:>10}                              ║", self.group_count);
        println!(
            "║ Watertight:      {:>10}                              ║",
            if self.is_watertight { "Yes" } else { "No" }
        );
        println!(
            "║ Oriented:        {:>10}                              ║",
            if self.is_consistently_oriented { "Yes" } else { "No" }
        );
        println!("╚══════════════════════════════════════════════════════════╝");
    }
}

/// Analyze mesh geometry and compute statistics
pub fn analyze(mesh: &Mesh) -> GeometryStats {
    if mesh.vertices.is_empty() || mesh.triangles.is_empty() {
        return GeometryStats::empty();
    }

    let bbox = mesh.bounding_box();
    let validation = validate_mesh(mesh);

    GeometryStats {
        volume: signed_volume(mesh),
        surface_area: surface_area(mesh),
        bbox: [
            bbox.min.x, bbox.min.y, bbox.min.z, bbox.max.x, bbox.max.y, bbox.max.z,
        ],
        centroid: surface_centroid(mesh),
        vertex_count: mesh.vertex_count(),
        triangle_count: mesh.triangle_count(),
        group_count: mesh.groups.len(),
        is_watertight: validation.is_closed,
        is_consistently_oriented: validation.is_consistently_oriented,
    }
}

/// Enclosed volume from the divergence theorem. Positive when the surface
/// winds counter-clockwise seen from outside.
pub fn signed_volume(mesh: &Mesh) -> f64 {
    // Relative to a point near the mesh to keep the terms small
    let reference = mesh.bounding_box().center();
    if !reference.coords.iter().all(|c| c.is_finite()) {
        return 0.0;
    }

    mesh.triangles
        .iter()
        .map(|triangle| {
            let v0 = mesh.vertices[triangle.indices[0]].position - reference;
            let v1 = mesh.vertices[triangle.indices[1]].position - reference;
            let v2 = mesh.vertices[triangle.indices[2]].position - reference;
            v0.dot(&v1.cross(&v2)) / 6.0
        })
        .sum()
}

/// Calculate total surface area
pub fn surface_area(mesh: &Mesh) -> f64 {
    (0..mesh.triangles.len())
        .map(|i| {
            let [v0, v1, v2] = mesh.triangle_positions(i);
            triangle_cross(&v0, &v1, &v2).norm() / 2.0
        })
        .sum()
}

/// Area-weighted centroid of the surface
fn surface_centroid(mesh: &Mesh) -> [f64; 3] {
    let mut weighted = nalgebra::Vector3::zeros();
    let mut total = 0.0;

    for i in 0..mesh.triangles.len() {
        let [v0, v1, v2] = mesh.triangle_positions(i);
        let area = (v1 - v0).cross(&(v2 - v0)).norm() / 2.0;
        weighted += (v0.coords + v1.coords + v2.coords) / 3.0 * area;
        total += area;
    }

    if total > 0.0 {
        let c = weighted / total;
        [c.x, c.y, c.z]
    } else {
        [0.0; 3]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;
    use approx::assert_relative_eq;
    use nalgebra::Translation3;

    #[test]
    fn test_cube_analytics() {
        let mesh = Primitive::cuboid(2.0, 3.0, 4.0).to_mesh();
        let stats = analyze(&mesh);

        assert_relative_eq!(stats.volume, 24.0, epsilon = 1e-9);
        assert_relative_eq!(stats.surface_area, 52.0, epsilon = 1e-9);
        assert_eq!(stats.bbox, [-1.0, -1.5, -2.0, 1.0, 1.5, 2.0]);
        assert_relative_eq!(stats.centroid[0], 0.0, epsilon = 1e-12);
        assert!(stats.is_watertight);
        assert!(stats.is_consistently_oriented);
    }

    #[test]
    fn test_volume_is_translation_invariant() {
        let mesh = Primitive::cube(4.0).to_mesh();
        let moved = mesh.transformed(&Translation3::new(1000.0, -250.0, 3.5).to_homogeneous());
        assert_relative_eq!(signed_volume(&moved), 64.0, epsilon = 1e-6);
    }

    #[test]
    fn test_inverted_mesh_has_negative_volume() {
        let mut mesh = Primitive::cube(2.0).to_mesh();
        mesh.flip_winding();
        assert_relative_eq!(signed_volume(&mesh), -8.0, epsilon = 1e-9);
    }

    #[test]
    fn test_empty_mesh() {
        let stats = analyze(&Mesh::empty());
        assert_eq!(stats.volume, 0.0);
        assert_eq!(stats.triangle_count, 0);
    }
}
