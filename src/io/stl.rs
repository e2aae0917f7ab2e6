// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Binary STL export and import through `stl_io`

use crate::geometry::{Mesh, Triangle, Vertex};
use anyhow::{Context, Result};
use nalgebra::{Point3, Vector3};
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor};
use std::path::Path;

/// Binary STL bytes. Facet normals come from the triangle winding;
/// zero-area triangles get a zero normal.
pub fn stl_bytes(mesh: &Mesh) -> Result<Vec<u8>> {
    let triangles: Vec<stl_io::Triangle> = (0..mesh.triangle_count())
        .map(|t| {
            let normal = mesh.face_normal(t).unwrap_or_else(Vector3::zeros);
            let corners = mesh.triangle_positions(t);
            stl_io::Triangle {
                normal: stl_io::Normal::new([normal.x as f32, normal.y as f32, normal.z as f32]),
                vertices: corners
                    .map(|p| stl_io::Vertex::new([p.x as f32, p.y as f32, p.z as f32])),
            }
        })
        .collect();

    let mut cursor = Cursor::new(Vec::new());
    stl_io::write_stl(&mut cursor, triangles.iter()).context("Failed to encode STL")?;
    Ok(cursor.into_inner())
}

/// Write a binary STL file
pub fn export_stl(mesh: &Mesh, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let bytes = stl_bytes(mesh)?;
    let file = File::create(path).with_context(|| format!("Failed to create STL file: {:?}", path))?;
    std::io::Write::write_all(&mut BufWriter::new(file), &bytes)
        .with_context(|| format!("Failed to write STL file: {:?}", path))?;
    Ok(())
}

/// Read an STL file (ASCII or binary) as a flat-shaded mesh with one
/// material
pub fn import_stl(path: impl AsRef<Path>) -> Result<Mesh> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open STL file: {:?}", path))?;
    let stl = stl_io::read_stl(&mut BufReader::new(file))
        .with_context(|| format!("Failed to read STL file: {:?}", path))?;

    let mut mesh = Mesh::with_capacity(stl.faces.len() * 3, stl.faces.len());
    for face in &stl.faces {
        let normal = Vector3::new(
            face.normal[0] as f64,
            face.normal[1] as f64,
            face.normal[2] as f64,
        );
        let indices = face.vertices.map(|i| {
            let v = &stl.vertices[i];
            mesh.add_vertex(Vertex::new(
                Point3::new(v[0] as f64, v[1] as f64, v[2] as f64),
                normal,
            ))
        });
        mesh.add_triangle(Triangle::new(indices));
    }

    tracing::debug!(triangles = mesh.triangle_count(), ?path, "imported STL");
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;

    #[test]
    fn test_stl_size() -> Result<()> {
        let mesh = Primitive::cube(2.0).to_mesh();
        let bytes = stl_bytes(&mesh)?;
        // 80-byte header, count, 50 bytes per facet
        assert_eq!(bytes.len(), 84 + 50 * 12);
        Ok(())
    }

    #[test]
    fn test_round_trip() -> Result<()> {
        let mesh = Primitive::cube(2.0).to_mesh();
        let file = tempfile::NamedTempFile::with_suffix(".stl")?;
        export_stl(&mesh, file.path())?;

        let loaded = import_stl(file.path())?;
        assert_eq!(loaded.triangle_count(), 12);
        assert!(loaded.bounding_box().approx_eq(&mesh.bounding_box(), 1e-6));
        Ok(())
    }
}
