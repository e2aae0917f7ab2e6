// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh representation and utilities

use super::robust_predicates::{Plane, AREA_EPSILON};
use super::BoundingBox;
use crate::error::{CsgError, CsgResult};
use crate::utils::lerp;
use nalgebra::{Matrix4, Point3, Vector2, Vector3};
use serde::{Deserialize, Serialize};

/// Vertex with position, normal and optional texture coordinate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub position: Point3<f64>,
    pub normal: Vector3<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uv: Option<Vector2<f64>>,
}

impl Vertex {
    pub fn new(position: Point3<f64>, normal: Vector3<f64>) -> Self {
        Self {
            position,
            normal,
            uv: None,
        }
    }

    pub fn with_uv(position: Point3<f64>, normal: Vector3<f64>, uv: Vector2<f64>) -> Self {
        Self {
            position,
            normal,
            uv: Some(uv),
        }
    }

    /// Transform position by `matrix` and normal by `normal_matrix`
    /// (the inverse transpose of `matrix`)
    pub fn transform(&mut self, matrix: &Matrix4<f64>, normal_matrix: &Matrix4<f64>) {
        self.position = matrix.transform_point(&self.position);
        let normal = normal_matrix.transform_vector(&self.normal);
        let length = normal.norm();
        if length > 0.0 {
            self.normal = normal / length;
        }
    }

    /// Interpolate every attribute between `self` and `other`
    pub fn interpolate(&self, other: &Vertex, t: f64) -> Vertex {
        let position = self.position + (other.position - self.position) * t;
        let normal = self.normal.lerp(&other.normal, t);
        let length = normal.norm();
        let normal = if length > AREA_EPSILON {
            normal / length
        } else {
            self.normal
        };
        let uv = match (self.uv, other.uv) {
            (Some(a), Some(b)) => Some(Vector2::new(lerp(a.x, b.x, t), lerp(a.y, b.y, t))),
            _ => None,
        };
        Vertex {
            position,
            normal,
            uv,
        }
    }

    /// Same vertex facing the other way
    pub fn flipped(&self) -> Vertex {
        Vertex {
            normal: -self.normal,
            ..*self
        }
    }
}

/// Triangle defined by three vertex indices and a material index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triangle {
    pub indices: [usize; 3],
    #[serde(default)]
    pub material: usize,
}

impl Triangle {
    pub fn new(indices: [usize; 3]) -> Self {
        Self {
            indices,
            material: 0,
        }
    }

    pub fn with_material(indices: [usize; 3], material: usize) -> Self {
        Self { indices, material }
    }

    /// Same triangle with opposite winding
    pub fn reversed(&self) -> Triangle {
        Triangle {
            indices: [self.indices[0], self.indices[2], self.indices[1]],
            material: self.material,
        }
    }
}

/// Contiguous triangle range rendered with one material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialGroup {
    /// First triangle of the range
    pub start: usize,
    /// Number of triangles in the range
    pub count: usize,
    pub material_index: usize,
}

/// Triangular mesh
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub vertices: Vec<Vertex>,
    pub triangles: Vec<Triangle>,
    /// Empty when the mesh is a single ungrouped sequence
    #[serde(default)]
    pub groups: Vec<MaterialGroup>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        Self::new()
    }

    pub fn with_capacity(vertex_count: usize, triangle_count: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(vertex_count),
            triangles: Vec::with_capacity(triangle_count),
            groups: Vec::new(),
        }
    }

    /// Add a vertex and return its index
    pub fn add_vertex(&mut self, vertex: Vertex) -> usize {
        let index = self.vertices.len();
        self.vertices.push(vertex);
        index
    }

    /// Add a triangle
    pub fn add_triangle(&mut self, triangle: Triangle) {
        self.triangles.push(triangle);
    }

    /// Drop all geometry while keeping the allocations
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.triangles.clear();
        self.groups.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Get vertex count
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Get triangle count
    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Number of material slots referenced by the triangles
    pub fn material_count(&self) -> usize {
        self.triangles
            .iter()
            .map(|t| t.material + 1)
            .max()
            .unwrap_or(0)
    }

    /// Transform all vertices by a matrix
    pub fn transform(&mut self, matrix: &Matrix4<f64>) {
        let normal_matrix = matrix
            .try_inverse()
            .map(|m| m.transpose())
            .unwrap_or(*matrix);
        for vertex in &mut self.vertices {
            vertex.transform(matrix, &normal_matrix);
        }
        // A mirroring transform turns the surface inside out
        if matrix.fixed_view::<3, 3>(0, 0).into_owned().determinant() < 0.0 {
            self.flip_winding();
        }
    }

    /// Copy of the mesh transformed by `matrix`
    pub fn transformed(&self, matrix: &Matrix4<f64>) -> Mesh {
        let mut mesh = self.clone();
        mesh.transform(matrix);
        mesh
    }

    /// Reverse winding of every triangle without touching normals
    pub fn flip_winding(&mut self) {
        for triangle in &mut self.triangles {
            *triangle = triangle.reversed();
        }
    }

    /// Compute bounding box
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_vertices(&self.vertices)
    }

    /// Corner positions of triangle `index`
    pub fn triangle_positions(&self, index: usize) -> [Point3<f64>; 3] {
        let [a, b, c] = self.triangles[index].indices;
        [
            self.vertices[a].position,
            self.vertices[b].position,
            self.vertices[c].position,
        ]
    }

    /// Geometric unit normal following the winding, `None` when degenerate
    pub fn face_normal(&self, index: usize) -> Option<Vector3<f64>> {
        let [a, b, c] = self.triangle_positions(index);
        Plane::from_points(&a, &b, &c).map(|plane| plane.normal)
    }

    /// Reject non-finite coordinates and out-of-range indices
    pub fn validate(&self) -> CsgResult<()> {
        for (i, vertex) in self.vertices.iter().enumerate() {
            if !vertex.position.coords.iter().all(|c| c.is_finite()) {
                return Err(CsgError::InvalidGeometry(format!(
                    "vertex {} has non-finite position ({}, {}, {})",
                    i, vertex.position.x, vertex.position.y, vertex.position.z
                )));
            }
        }

        let vertex_count = self.vertices.len();
        for (i, triangle) in self.triangles.iter().enumerate() {
            if let Some(&index) = triangle.indices.iter().find(|&&v| v >= vertex_count) {
                return Err(CsgError::InvalidGeometry(format!(
                    "triangle {} references vertex {} but mesh has {} vertices",
                    i, index, vertex_count
                )));
            }
        }

        for group in &self.groups {
            if group.start + group.count > self.triangles.len() {
                return Err(CsgError::InvalidGeometry(format!(
                    "material group {}..{} exceeds {} triangles",
                    group.start,
                    group.start + group.count,
                    self.triangles.len()
                )));
            }
        }

        Ok(())
    }

    /// Merge with another mesh (simple concatenation without CSG)
    pub fn merge(&mut self, other: &Mesh) {
        let offset = self.vertices.len();
        self.vertices.extend_from_slice(&other.vertices);

        for triangle in &other.triangles {
            self.triangles.push(Triangle::with_material(
                [
                    triangle.indices[0] + offset,
                    triangle.indices[1] + offset,
                    triangle.indices[2] + offset,
                ],
                triangle.material,
            ));
        }
        self.groups.clear();
    }

    /// Rebuild `groups` from triangle materials. Triangles are stably sorted
    /// by material so every group is one contiguous range.
    pub fn build_groups(&mut self) {
        self.triangles.sort_by_key(|t| t.material);
        self.groups.clear();

        let mut start = 0;
        while start < self.triangles.len() {
            let material_index = self.triangles[start].material;
            let count = self.triangles[start..]
                .iter()
                .take_while(|t| t.material == material_index)
                .count();
            self.groups.push(MaterialGroup {
                start,
                count,
                material_index,
            });
            start += count;
        }
    }

    /// Remove vertices not referenced by any triangle
    /// Returns the number of vertices removed
    pub fn remove_orphaned_vertices(&mut self) -> usize {
        let original_count = self.vertices.len();
        let mut remap: Vec<Option<usize>> = vec![None; original_count];
        let mut new_vertices = Vec::with_capacity(original_count);

        for triangle in &mut self.triangles {
            for index in &mut triangle.indices {
                let new_index = match remap[*index] {
                    Some(new_index) => new_index,
                    None => {
                        let new_index = new_vertices.len();
                        new_vertices.push(self.vertices[*index]);
                        remap[*index] = Some(new_index);
                        new_index
                    }
                };
                *index = new_index;
            }
        }

        self.vertices = new_vertices;
        original_count - self.vertices.len()
    }

    /// Recompute normals from face normals (smooth shading)
    pub fn recompute_normals(&mut self) {
        for vertex in &mut self.vertices {
            vertex.normal = Vector3::zeros();
        }

        for triangle in &self.triangles {
            let [a, b, c] = triangle.indices;
            let face = (self.vertices[b].position - self.vertices[a].position)
                .cross(&(self.vertices[c].position - self.vertices[a].position));
            for &index in &triangle.indices {
                self.vertices[index].normal += face;
            }
        }

        for vertex in &mut self.vertices {
            let length = vertex.normal.norm();
            if length > AREA_EPSILON {
                vertex.normal /= length;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Translation3;

    fn single_triangle() -> Mesh {
        let mut mesh = Mesh::new();
        let n = Vector3::new(0.0, 0.0, 1.0);
        let a = mesh.add_vertex(Vertex::new(Point3::new(0.0, 0.0, 0.0), n));
        let b = mesh.add_vertex(Vertex::new(Point3::new(1.0, 0.0, 0.0), n));
        let c = mesh.add_vertex(Vertex::new(Point3::new(0.0, 1.0, 0.0), n));
        mesh.add_triangle(Triangle::new([a, b, c]));
        mesh
    }

    #[test]
    fn test_mesh_creation() {
        let mesh = single_triangle();
        assert_eq!(mesh.vertex_count(), 3);
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.material_count(), 1);
        assert_eq!(mesh.face_normal(0), Some(Vector3::new(0.0, 0.0, 1.0)));
    }

    #[test]
    fn test_validate_rejects_non_finite() {
        let mut mesh = single_triangle();
        assert!(mesh.validate().is_ok());

        mesh.vertices[1].position.y = f64::NAN;
        assert!(matches!(mesh.validate(), Err(CsgError::InvalidGeometry(_))));
    }

    #[test]
    fn test_validate_rejects_bad_index() {
        let mut mesh = single_triangle();
        mesh.add_triangle(Triangle::new([0, 1, 7]));
        assert!(matches!(mesh.validate(), Err(CsgError::InvalidGeometry(_))));
    }

    #[test]
    fn test_transform_translation() {
        let mesh = single_triangle();
        let moved = mesh.transformed(&Translation3::new(2.0, 0.0, 0.0).to_homogeneous());
        assert_eq!(moved.vertices[0].position, Point3::new(2.0, 0.0, 0.0));
        assert_eq!(moved.vertices[0].normal, Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(moved.triangles, mesh.triangles);
    }

    #[test]
    fn test_mirror_flips_winding() {
        let mesh = single_triangle();
        let mirror = Matrix4::new_nonuniform_scaling(&Vector3::new(1.0, 1.0, -1.0));
        let mirrored = mesh.transformed(&mirror);
        assert_eq!(mirrored.triangles[0].indices, [0, 2, 1]);
        assert_eq!(mirrored.vertices[0].normal, Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(mirrored.face_normal(0), Some(Vector3::new(0.0, 0.0, -1.0)));
    }

    #[test]
    fn test_build_groups_sorts_by_material() {
        let mut mesh = single_triangle();
        mesh.triangles[0].material = 2;
        mesh.add_triangle(Triangle::with_material([0, 1, 2], 0));
        mesh.add_triangle(Triangle::with_material([0, 2, 1], 2));
        mesh.build_groups();

        assert_eq!(
            mesh.groups,
            vec![
                MaterialGroup { start: 0, count: 1, material_index: 0 },
                MaterialGroup { start: 1, count: 2, material_index: 2 },
            ]
        );
    }

    #[test]
    fn test_remove_orphaned_vertices() {
        let mut mesh = single_triangle();
        mesh.add_vertex(Vertex::new(Point3::new(9.0, 9.0, 9.0), Vector3::z()));
        assert_eq!(mesh.remove_orphaned_vertices(), 1);
        assert_eq!(mesh.vertex_count(), 3);
    }

    #[test]
    fn test_interpolate_uv() {
        let a = Vertex::with_uv(Point3::origin(), Vector3::z(), Vector2::new(0.0, 0.0));
        let b = Vertex::with_uv(Point3::new(2.0, 0.0, 0.0), Vector3::z(), Vector2::new(1.0, 0.5));
        let mid = a.interpolate(&b, 0.5);
        assert_eq!(mid.position, Point3::new(1.0, 0.0, 0.0));
        assert_eq!(mid.uv, Some(Vector2::new(0.5, 0.25)));
    }
}
