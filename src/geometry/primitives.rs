// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometric primitives generator
//!
//! Brush geometry for the demo scenes and tests. Shapes are centred on the
//! origin with the cylinder axis along +Y, and keep hard edges as separate
//! vertices with their own normals and UVs.

use super::{Mesh, Triangle, Vertex};
use nalgebra::{Point3, Vector2, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Geometric primitives
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Primitive {
    Box {
        width: f64,
        height: f64,
        depth: f64,
    },
    Cylinder {
        radius_top: f64,
        radius_bottom: f64,
        height: f64,
        radial_segments: u32,
    },
    Sphere {
        radius: f64,
        width_segments: u32,
        height_segments: u32,
    },
}

impl Primitive {
    pub fn cuboid(width: f64, height: f64, depth: f64) -> Self {
        Self::Box {
            width,
            height,
            depth,
        }
    }

    pub fn cube(size: f64) -> Self {
        Self::cuboid(size, size, size)
    }

    pub fn cylinder(radius: f64, height: f64, radial_segments: u32) -> Self {
        Self::cone(radius, radius, height, radial_segments)
    }

    pub fn cone(radius_top: f64, radius_bottom: f64, height: f64, radial_segments: u32) -> Self {
        Self::Cylinder {
            radius_top,
            radius_bottom,
            height,
            radial_segments: radial_segments.max(3),
        }
    }

    pub fn sphere(radius: f64, width_segments: u32, height_segments: u32) -> Self {
        Self::Sphere {
            radius,
            width_segments: width_segments.max(3),
            height_segments: height_segments.max(2),
        }
    }

    pub fn to_mesh(&self) -> Mesh {
        match *self {
            Self::Box {
                width,
                height,
                depth,
            } => generate_box_mesh(Vector3::new(width, height, depth)),
            Self::Cylinder {
                radius_top,
                radius_bottom,
                height,
                radial_segments,
            } => generate_cylinder_mesh(radius_top, radius_bottom, height, radial_segments),
            Self::Sphere {
                radius,
                width_segments,
                height_segments,
            } => generate_sphere_mesh(radius, width_segments, height_segments),
        }
    }
}

fn generate_box_mesh(size: Vector3<f64>) -> Mesh {
    let mut mesh = Mesh::with_capacity(24, 12);
    let half = size / 2.0;

    // (normal, u, v) with u × v = normal so each quad winds outward
    let faces = [
        (Vector3::x(), -Vector3::z(), Vector3::y()),
        (-Vector3::x(), Vector3::z(), Vector3::y()),
        (Vector3::y(), Vector3::x(), -Vector3::z()),
        (-Vector3::y(), Vector3::x(), Vector3::z()),
        (Vector3::z(), Vector3::x(), Vector3::y()),
        (-Vector3::z(), -Vector3::x(), Vector3::y()),
    ];
    let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];

    for (normal, u, v) in faces {
        let base = mesh.vertices.len();
        for (su, sv) in corners {
            let position = (normal + u * su + v * sv).component_mul(&half);
            let uv = Vector2::new((su + 1.0) / 2.0, (sv + 1.0) / 2.0);
            mesh.add_vertex(Vertex::with_uv(Point3::from(position), normal, uv));
        }
        mesh.add_triangle(Triangle::new([base, base + 1, base + 2]));
        mesh.add_triangle(Triangle::new([base, base + 2, base + 3]));
    }

    mesh
}

fn generate_cylinder_mesh(
    radius_top: f64,
    radius_bottom: f64,
    height: f64,
    segments: u32,
) -> Mesh {
    let segments = segments as usize;
    let half_height = height / 2.0;
    let slope = (radius_bottom - radius_top) / height;
    let mut mesh = Mesh::with_capacity(4 * (segments + 1) + 2, 4 * segments);

    // Torso: a top and a bottom ring, seam vertex duplicated for UVs
    let mut rows = [Vec::with_capacity(segments + 1), Vec::with_capacity(segments + 1)];
    for (row, indices) in rows.iter_mut().enumerate() {
        let v = row as f64;
        let radius = if row == 0 { radius_top } else { radius_bottom };
        let y = half_height - v * height;
        for x in 0..=segments {
            let u = x as f64 / segments as f64;
            let theta = u * 2.0 * PI;
            let (sin, cos) = theta.sin_cos();
            let position = Point3::new(radius * sin, y, radius * cos);
            let normal = Vector3::new(sin, slope, cos).normalize();
            indices.push(mesh.add_vertex(Vertex::with_uv(position, normal, Vector2::new(u, 1.0 - v))));
        }
    }

    for x in 0..segments {
        let a = rows[0][x];
        let b = rows[1][x];
        let c = rows[1][x + 1];
        let d = rows[0][x + 1];
        if radius_top > 0.0 {
            mesh.add_triangle(Triangle::new([a, b, d]));
        }
        if radius_bottom > 0.0 {
            mesh.add_triangle(Triangle::new([b, c, d]));
        }
    }

    if radius_top > 0.0 {
        generate_cap(&mut mesh, radius_top, half_height, segments, true);
    }
    if radius_bottom > 0.0 {
        generate_cap(&mut mesh, radius_bottom, -half_height, segments, false);
    }

    mesh
}

fn generate_cap(mesh: &mut Mesh, radius: f64, y: f64, segments: usize, top: bool) {
    let sign = if top { 1.0 } else { -1.0 };
    let normal = Vector3::new(0.0, sign, 0.0);
    let center = mesh.add_vertex(Vertex::with_uv(
        Point3::new(0.0, y, 0.0),
        normal,
        Vector2::new(0.5, 0.5),
    ));

    let ring_start = mesh.vertices.len();
    for x in 0..=segments {
        let theta = x as f64 / segments as f64 * 2.0 * PI;
        let (sin, cos) = theta.sin_cos();
        mesh.add_vertex(Vertex::with_uv(
            Point3::new(radius * sin, y, radius * cos),
            normal,
            Vector2::new(cos * 0.5 + 0.5, sin * 0.5 * sign + 0.5),
        ));
    }

    for x in 0..segments {
        let i = ring_start + x;
        if top {
            mesh.add_triangle(Triangle::new([center, i, i + 1]));
        } else {
            mesh.add_triangle(Triangle::new([center, i + 1, i]));
        }
    }
}

fn generate_sphere_mesh(radius: f64, width_segments: u32, height_segments: u32) -> Mesh {
    let width_segments = width_segments as usize;
    let height_segments = height_segments as usize;
    let mut mesh = Mesh::with_capacity(
        (width_segments + 1) * (height_segments + 1),
        2 * width_segments * height_segments,
    );

    let mut grid = Vec::with_capacity(height_segments + 1);
    for iy in 0..=height_segments {
        let v = iy as f64 / height_segments as f64;
        let theta = v * PI;
        let mut row = Vec::with_capacity(width_segments + 1);
        for ix in 0..=width_segments {
            let u = ix as f64 / width_segments as f64;
            let phi = u * 2.0 * PI;
            let direction = Vector3::new(
                -phi.cos() * theta.sin(),
                theta.cos(),
                phi.sin() * theta.sin(),
            );
            row.push(mesh.add_vertex(Vertex::with_uv(
                Point3::from(direction * radius),
                direction,
                Vector2::new(u, 1.0 - v),
            )));
        }
        grid.push(row);
    }

    // Pole rows only get one triangle per quad; the other would be degenerate
    for iy in 0..height_segments {
        for ix in 0..width_segments {
            let a = grid[iy][ix + 1];
            let b = grid[iy][ix];
            let c = grid[iy + 1][ix];
            let d = grid[iy + 1][ix + 1];
            if iy != 0 {
                mesh.add_triangle(Triangle::new([a, b, d]));
            }
            if iy != height_segments - 1 {
                mesh.add_triangle(Triangle::new([b, c, d]));
            }
        }
    }

    mesh
}
