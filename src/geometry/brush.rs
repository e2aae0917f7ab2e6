// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Brushes: boolean operands with a transform and a cached spatial index

use super::bvh::Bvh;
use super::robust_predicates::Plane;
use super::{BoundingBox, Mesh};
use crate::error::CsgResult;
use nalgebra::{Matrix4, Point3, Rotation3, Translation3, Vector3};
use std::borrow::Cow;

/// World-space mesh with its BVH and per-triangle planes
#[derive(Debug, Clone)]
pub struct PreparedMesh {
    pub mesh: Mesh,
    pub bvh: Bvh,
    /// `None` for zero-area triangles, which take no part in the boolean
    planes: Vec<Option<Plane>>,
}

impl PreparedMesh {
    /// Validate `mesh` and index it
    pub fn new(mesh: Mesh) -> CsgResult<Self> {
        let bvh = Bvh::build(&mesh)?;
        let planes: Vec<Option<Plane>> = (0..mesh.triangle_count())
            .map(|t| {
                let [a, b, c] = mesh.triangle_positions(t);
                Plane::from_points(&a, &b, &c)
            })
            .collect();

        let degenerate = planes.iter().filter(|p| p.is_none()).count();
        if degenerate > 0 {
            tracing::warn!(degenerate, "skipping zero-area triangles");
        }

        Ok(Self { mesh, bvh, planes })
    }

    pub fn triangle(&self, index: usize) -> [Point3<f64>; 3] {
        self.mesh.triangle_positions(index)
    }

    pub fn plane(&self, index: usize) -> Option<&Plane> {
        self.planes[index].as_ref()
    }

    pub fn bounds(&self) -> BoundingBox {
        self.bvh.bounding_box()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct CacheKey {
    geometry_version: u64,
    matrix: Matrix4<f64>,
}

/// Solid operand of a boolean operation.
///
/// Geometry is kept in local space. The world-space copy and its BVH are
/// cached until the geometry or the transform changes.
#[derive(Debug, Clone)]
pub struct Brush {
    geometry: Mesh,
    geometry_version: u64,
    pub position: Vector3<f64>,
    /// Euler angles in radians, applied X then Y then Z in local space
    pub rotation: Vector3<f64>,
    pub scale: Vector3<f64>,
    cache: Option<(CacheKey, PreparedMesh)>,
}

impl Brush {
    pub fn new(geometry: Mesh) -> Self {
        Self {
            geometry,
            geometry_version: 0,
            position: Vector3::zeros(),
            rotation: Vector3::zeros(),
            scale: Vector3::new(1.0, 1.0, 1.0),
            cache: None,
        }
    }

    pub fn with_position(mut self, position: Vector3<f64>) -> Self {
        self.position = position;
        self
    }

    pub fn geometry(&self) -> &Mesh {
        &self.geometry
    }

    /// Replace the geometry; invalidates the cache
    pub fn set_geometry(&mut self, geometry: Mesh) {
        self.geometry = geometry;
        self.bump_version();
    }

    /// Mutable geometry access; invalidates the cache
    pub fn geometry_mut(&mut self) -> &mut Mesh {
        self.bump_version();
        &mut self.geometry
    }

    fn bump_version(&mut self) {
        self.geometry_version += 1;
        self.cache = None;
    }

    pub fn geometry_version(&self) -> u64 {
        self.geometry_version
    }

    /// Number of material slots used by the geometry
    pub fn material_count(&self) -> usize {
        self.geometry.material_count()
    }

    /// Translation * rotation (XYZ order) * scale
    pub fn matrix_world(&self) -> Matrix4<f64> {
        let rotation = Rotation3::from_axis_angle(&Vector3::x_axis(), self.rotation.x)
            * Rotation3::from_axis_angle(&Vector3::y_axis(), self.rotation.y)
            * Rotation3::from_axis_angle(&Vector3::z_axis(), self.rotation.z);
        Translation3::from(self.position).to_homogeneous()
            * rotation.to_homogeneous()
            * Matrix4::new_nonuniform_scaling(&self.scale)
    }

    fn cache_key(&self) -> CacheKey {
        CacheKey {
            geometry_version: self.geometry_version,
            matrix: self.matrix_world(),
        }
    }

    /// Rebuild the world-space cache if geometry or transform changed.
    /// Returns true when a rebuild happened.
    pub fn update_matrix_world(&mut self) -> CsgResult<bool> {
        let key = self.cache_key();
        if matches!(&self.cache, Some((cached, _)) if *cached == key) {
            return Ok(false);
        }

        let prepared = PreparedMesh::new(self.geometry.transformed(&key.matrix))?;
        self.cache = Some((key, prepared));
        Ok(true)
    }

    /// Cache is present and matches the current geometry and transform
    pub fn is_prepared(&self) -> bool {
        matches!(&self.cache, Some((cached, _)) if *cached == self.cache_key())
    }

    /// World-space operand. Borrows the cache when it is current, otherwise
    /// builds a transient one without touching the brush.
    pub fn prepared(&self) -> CsgResult<Cow<'_, PreparedMesh>> {
        let key = self.cache_key();
        match &self.cache {
            Some((cached, prepared)) if *cached == key => Ok(Cow::Borrowed(prepared)),
            _ => Ok(Cow::Owned(PreparedMesh::new(
                self.geometry.transformed(&key.matrix),
            )?)),
        }
    }
}

impl From<Mesh> for Brush {
    fn from(mesh: Mesh) -> Self {
        Brush::new(mesh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_cache_follows_transform() {
        let mut brush = Brush::new(Primitive::cube(2.0).to_mesh());
        assert!(!brush.is_prepared());
        assert!(brush.update_matrix_world().unwrap());
        assert!(!brush.update_matrix_world().unwrap());
        assert!(brush.is_prepared());

        brush.position.x = 3.0;
        assert!(!brush.is_prepared());
        let transient = brush.prepared().unwrap();
        assert!(matches!(transient, Cow::Owned(_)));
        assert_eq!(transient.bounds().min.x, 2.0);

        assert!(brush.update_matrix_world().unwrap());
        assert!(matches!(brush.prepared().unwrap(), Cow::Borrowed(_)));
    }

    #[test]
    fn test_geometry_change_invalidates() {
        let mut brush = Brush::new(Primitive::cube(2.0).to_mesh());
        brush.update_matrix_world().unwrap();
        brush.set_geometry(Primitive::cube(3.0).to_mesh());
        assert!(!brush.is_prepared());
        assert_eq!(brush.geometry_version(), 1);
    }

    #[test]
    fn test_rotation_about_z() {
        let mut brush = Brush::new(Primitive::cuboid(4.0, 2.0, 2.0).to_mesh());
        brush.rotation.z = FRAC_PI_2;
        let prepared = brush.prepared().unwrap();
        let bounds = prepared.bounds();
        assert!((bounds.max.x - 1.0).abs() < 1e-12);
        assert!((bounds.max.y - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_degenerate_triangle_has_no_plane() {
        let mut mesh = Primitive::cube(1.0).to_mesh();
        let [a, _, _] = mesh.triangles[0].indices;
        mesh.triangles[0].indices = [a, a, a];
        let prepared = PreparedMesh::new(mesh).unwrap();
        assert!(prepared.plane(0).is_none());
        assert!(prepared.plane(1).is_some());
    }
}
