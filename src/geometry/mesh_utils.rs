// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh validation utilities
//!
//! Connectivity is measured on welded positions rather than raw vertex
//! indices, so meshes with split normals (hard edges, UV seams) still count
//! as closed when their surface is.

use super::robust_predicates::WELD_EPSILON;
use super::{Mesh, VertexMap};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// Undirected edge between two welded vertex ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    pub v0: usize,
    pub v1: usize,
}

impl Edge {
    pub fn new(v0: usize, v1: usize) -> Self {
        // Always store edges with smaller index first for consistent hashing
        if v0 < v1 {
            Self { v0, v1 }
        } else {
            Self { v0: v1, v1: v0 }
        }
    }
}

/// Edge usage of a mesh over welded vertex ids
#[derive(Debug, Clone)]
pub struct Topology {
    /// Welded id of every mesh vertex
    pub vertex_ids: Vec<usize>,
    pub welded_count: usize,
    edge_counts: AHashMap<Edge, u32>,
    directed_counts: AHashMap<(usize, usize), u32>,
    edges: Vec<Edge>,
}

impl Topology {
    pub fn build(mesh: &Mesh) -> Self {
        let mut map = VertexMap::with_capacity(WELD_EPSILON, mesh.vertices.len());
        let vertex_ids: Vec<usize> = mesh
            .vertices
            .iter()
            .map(|v| map.insert(v.position))
            .collect();

        let mut edge_counts: AHashMap<Edge, u32> = AHashMap::new();
        let mut directed_counts: AHashMap<(usize, usize), u32> = AHashMap::new();
        let mut edges = Vec::new();

        for triangle in &mesh.triangles {
            let ids = triangle.indices.map(|i| vertex_ids[i]);
            if ids[0] == ids[1] || ids[1] == ids[2] || ids[0] == ids[2] {
                continue;
            }
            for k in 0..3 {
                let (a, b) = (ids[k], ids[(k + 1) % 3]);
                let count = edge_counts.entry(Edge::new(a, b)).or_insert(0);
                if *count == 0 {
                    edges.push(Edge::new(a, b));
                }
                *count += 1;
                *directed_counts.entry((a, b)).or_insert(0) += 1;
            }
        }

        Self {
            vertex_ids,
            welded_count: map.len(),
            edge_counts,
            directed_counts,
            edges,
        }
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn uses(&self, edge: &Edge) -> u32 {
        self.edge_counts.get(edge).copied().unwrap_or(0)
    }

    /// Every edge shared by at most two triangles
    pub fn is_manifold(&self) -> bool {
        self.edges.iter().all(|e| self.uses(e) <= 2)
    }

    /// Every edge shared by exactly two triangles
    pub fn is_closed(&self) -> bool {
        self.edges.iter().all(|e| self.uses(e) == 2)
    }

    /// Each shared edge is walked once in each direction
    pub fn is_consistently_oriented(&self) -> bool {
        self.edges.iter().all(|e| {
            let forward = self.directed_counts.get(&(e.v0, e.v1)).copied().unwrap_or(0);
            let backward = self.directed_counts.get(&(e.v1, e.v0)).copied().unwrap_or(0);
            forward <= 1 && backward <= 1
        })
    }

    /// Edges used by exactly one triangle, in first-use order
    pub fn boundary_edges(&self) -> Vec<Edge> {
        self.edges
            .iter()
            .filter(|e| self.uses(e) == 1)
            .copied()
            .collect()
    }

    /// Edges used by more than two triangles
    pub fn non_manifold_edges(&self) -> Vec<Edge> {
        self.edges
            .iter()
            .filter(|e| self.uses(e) > 2)
            .copied()
            .collect()
    }
}

/// Get mesh validation report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshValidation {
    pub is_manifold: bool,
    pub is_closed: bool,
    pub is_consistently_oriented: bool,
    pub edge_count: usize,
    pub boundary_edge_count: usize,
    pub non_manifold_edge_count: usize,
}

pub fn validate_mesh(mesh: &Mesh) -> MeshValidation {
    let topology = Topology::build(mesh);
    MeshValidation {
        is_manifold: topology.is_manifold(),
        is_closed: topology.is_closed(),
        is_consistently_oriented: topology.is_consistently_oriented(),
        edge_count: topology.edge_count(),
        boundary_edge_count: topology.boundary_edges().len(),
        non_manifold_edge_count: topology.non_manifold_edges().len(),
    }
}

/// Check if mesh is manifold (each edge shared by at most 2 triangles)
pub fn is_manifold(mesh: &Mesh) -> bool {
    Topology::build(mesh).is_manifold()
}

/// Check if mesh is closed (each edge shared by exactly 2 triangles)
pub fn is_closed(mesh: &Mesh) -> bool {
    Topology::build(mesh).is_closed()
}

/// Find all boundary edges (edges shared by exactly 1 triangle)
pub fn find_boundary_edges(mesh: &Mesh) -> Vec<Edge> {
    Topology::build(mesh).boundary_edges()
}
