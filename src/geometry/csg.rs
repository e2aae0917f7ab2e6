// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Boolean evaluation of two solids
//!
//! Pipeline: world-space BVHs, pairwise classification, plane splitting of
//! boundary triangles, fragment selection by operator, assembly with vertex
//! reuse, seam repair and material grouping.

use super::boolean::{fragment_action, BooleanOp, FragmentAction};
use super::brush::{Brush, PreparedMesh};
use super::classification::{
    classify, fragment_side, map_indices, ClassifiedMesh, FragmentSide, TriangleClass,
};
use super::mesh_utils::{validate_mesh, MeshValidation};
use super::robust_predicates::WELD_EPSILON;
use super::stitching::{stitch, StitchReport};
use super::triangle_splitting::{split_triangle_by_planes, unique_planes, Fragment};
use super::{Mesh, Triangle, Vertex};
use crate::error::{CsgError, CsgResult};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Evaluator options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// Keep per-material triangle groups in the result
    pub use_groups: bool,
    /// Run classification and splitting on the rayon pool
    pub parallel: bool,
    /// Reject open or non-manifold operands and unclosed results
    pub strict: bool,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            use_groups: true,
            parallel: true,
            strict: false,
        }
    }
}

/// Stage counters of one evaluation
#[derive(Debug, Clone, Default, Serialize)]
pub struct EvaluationStats {
    pub candidate_pairs: usize,
    pub segments: usize,
    pub boundary_a: usize,
    pub boundary_b: usize,
    /// Pieces produced by splitting boundary triangles
    pub fragments: usize,
    /// Zero-area input triangles left out
    pub degenerate_skipped: usize,
    pub stitch: StitchReport,
    pub vertex_count: usize,
    pub triangle_count: usize,
    pub group_count: usize,
    pub elapsed_ms: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    config: EvaluatorConfig,
}

impl Evaluator {
    pub fn new(config: EvaluatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    pub fn set_use_groups(&mut self, use_groups: bool) {
        self.config.use_groups = use_groups;
    }

    /// `a op b` in world space. `previous` is cleared and refilled so its
    /// allocations are reused.
    pub fn evaluate(
        &self,
        a: &Brush,
        b: &Brush,
        op: BooleanOp,
        previous: Option<Mesh>,
    ) -> CsgResult<Mesh> {
        self.evaluate_with_stats(a, b, op, previous)
            .map(|(mesh, _)| mesh)
    }

    pub fn evaluate_with_stats(
        &self,
        a: &Brush,
        b: &Brush,
        op: BooleanOp,
        previous: Option<Mesh>,
    ) -> CsgResult<(Mesh, EvaluationStats)> {
        let a = a.prepared()?;
        let b = b.prepared()?;
        self.evaluate_prepared(&a, &b, op, previous)
    }

    /// Boolean of two meshes given in the same space
    pub fn evaluate_meshes(&self, a: &Mesh, b: &Mesh, op: BooleanOp) -> CsgResult<Mesh> {
        let a = PreparedMesh::new(a.clone())?;
        let b = PreparedMesh::new(b.clone())?;
        self.evaluate_prepared(&a, &b, op, None)
            .map(|(mesh, _)| mesh)
    }

    /// Left fold of `op` over `meshes`, in order
    pub fn fold_meshes(&self, meshes: &[Mesh], op: BooleanOp) -> CsgResult<Mesh> {
        let Some((first, rest)) = meshes.split_first() else {
            return Ok(Mesh::empty());
        };

        let mut result = first.clone();
        for mesh in rest {
            result = self.evaluate_meshes(&result, mesh, op)?;
        }
        Ok(result)
    }

    #[tracing::instrument(skip_all, fields(op = %op))]
    pub fn evaluate_prepared(
        &self,
        a: &PreparedMesh,
        b: &PreparedMesh,
        op: BooleanOp,
        previous: Option<Mesh>,
    ) -> CsgResult<(Mesh, EvaluationStats)> {
        let start = Instant::now();

        if self.config.strict {
            require_closed(&a.mesh, "first")?;
            require_closed(&b.mesh, "second")?;
        }

        let classification = classify(a, b, self.config.parallel);
        let outputs_a = resolve_operand(a, &classification.a, b, op, false, self.config.parallel);
        let outputs_b = resolve_operand(b, &classification.b, a, op, true, self.config.parallel);

        let mut stats = EvaluationStats {
            candidate_pairs: classification.candidate_pairs,
            segments: classification.segments.len(),
            boundary_a: classification.a.count(TriangleClass::Boundary),
            boundary_b: classification.b.count(TriangleClass::Boundary),
            ..Default::default()
        };

        let mut target = previous.unwrap_or_default();
        target.clear();
        let mut builder = MeshBuilder::new(target);

        let slot_offset = a.mesh.material_count();
        for (operand, prepared, outputs, offset) in [
            (Operand::A, a, &outputs_a, 0),
            (Operand::B, b, &outputs_b, slot_offset),
        ] {
            for (t, output) in outputs.iter().enumerate() {
                match output {
                    TriangleOutput::Degenerate => stats.degenerate_skipped += 1,
                    TriangleOutput::Whole(action) => {
                        builder.add_source_triangle(operand, &prepared.mesh, t, *action, offset)
                    }
                    TriangleOutput::Split { produced, kept } => {
                        stats.fragments += produced;
                        for (fragment, action) in kept {
                            builder.add_fragment(operand, &prepared.mesh, t, fragment, *action, offset);
                        }
                    }
                }
            }
        }

        let mut mesh = builder.finish();
        stats.stitch = stitch(&mut mesh, WELD_EPSILON);

        if self.config.use_groups {
            mesh.build_groups();
        } else {
            for triangle in &mut mesh.triangles {
                triangle.material = 0;
            }
            mesh.groups.clear();
        }
        mesh.remove_orphaned_vertices();

        if self.config.strict {
            let validation = validate_mesh(&mesh);
            if !validation.is_closed {
                return Err(unclosed_result(op, &validation));
            }
        }

        stats.vertex_count = mesh.vertex_count();
        stats.triangle_count = mesh.triangle_count();
        stats.group_count = mesh.groups.len();
        stats.elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        tracing::debug!(
            candidate_pairs = stats.candidate_pairs,
            boundary_a = stats.boundary_a,
            boundary_b = stats.boundary_b,
            fragments = stats.fragments,
            triangles = stats.triangle_count,
            "evaluated boolean"
        );

        Ok((mesh, stats))
    }
}

/// `a op b` with default settings
pub fn evaluate(a: &Mesh, b: &Mesh, op: BooleanOp) -> CsgResult<Mesh> {
    Evaluator::default().evaluate_meshes(a, b, op)
}

fn unclosed_result(op: BooleanOp, validation: &MeshValidation) -> CsgError {
    CsgError::NumericalDegeneracy(format!(
        "{} of closed operands left {} open edges and {} non-manifold edges",
        op, validation.boundary_edge_count, validation.non_manifold_edge_count
    ))
}

fn require_closed(mesh: &Mesh, name: &str) -> CsgResult<()> {
    let validation = validate_mesh(mesh);
    if validation.is_closed && validation.is_manifold {
        Ok(())
    } else {
        Err(CsgError::InvalidGeometry(format!(
            "{} operand is not a closed manifold ({} boundary edges, {} non-manifold edges)",
            name, validation.boundary_edge_count, validation.non_manifold_edge_count
        )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Operand {
    A,
    B,
}

/// Selection outcome for one input triangle
#[derive(Debug)]
enum TriangleOutput {
    Degenerate,
    Whole(FragmentAction),
    Split {
        produced: usize,
        kept: Vec<(Fragment, FragmentAction)>,
    },
}

fn resolve_operand(
    mesh: &PreparedMesh,
    classified: &ClassifiedMesh,
    other: &PreparedMesh,
    op: BooleanOp,
    from_b: bool,
    parallel: bool,
) -> Vec<TriangleOutput> {
    map_indices(mesh.mesh.triangle_count(), parallel, |t| {
        let Some(plane) = mesh.plane(t) else {
            return TriangleOutput::Degenerate;
        };

        match classified.classes[t] {
            TriangleClass::Inside => {
                TriangleOutput::Whole(fragment_action(op, FragmentSide::Inside, from_b))
            }
            TriangleClass::Outside => {
                TriangleOutput::Whole(fragment_action(op, FragmentSide::Outside, from_b))
            }
            TriangleClass::Boundary => {
                let contacts = &classified.contacts[t];
                let planes = unique_planes(
                    contacts
                        .cutting
                        .iter()
                        .filter_map(|&q| other.plane(q).copied()),
                );
                let corners = mesh.mesh.triangles[t]
                    .indices
                    .map(|i| mesh.mesh.vertices[i]);
                let fragments = split_triangle_by_planes(corners, &planes);
                let produced = fragments.len();

                let kept = fragments
                    .into_iter()
                    .filter_map(|fragment| {
                        let side = fragment_side(
                            &fragment.centroid(),
                            &plane.normal,
                            &contacts.coplanar,
                            other,
                        );
                        match fragment_action(op, side, from_b) {
                            FragmentAction::Discard => None,
                            action => Some((fragment, action)),
                        }
                    })
                    .collect();

                TriangleOutput::Split { produced, kept }
            }
        }
    })
}

/// Bit pattern of every vertex attribute, with -0.0 folded into 0.0
type VertexKey = [u64; 9];

fn vertex_key(vertex: &Vertex) -> VertexKey {
    let bits = |x: f64| (x + 0.0).to_bits();
    let (u, v, has_uv) = match vertex.uv {
        Some(uv) => (bits(uv.x), bits(uv.y), 1),
        None => (0, 0, 0),
    };
    [
        bits(vertex.position.x),
        bits(vertex.position.y),
        bits(vertex.position.z),
        bits(vertex.normal.x),
        bits(vertex.normal.y),
        bits(vertex.normal.z),
        u,
        v,
        has_uv,
    ]
}

/// Output assembly. Unsplit source vertices are emitted once per operand
/// and facing; vertices created by splitting are shared by exact value.
struct MeshBuilder {
    mesh: Mesh,
    source_map: AHashMap<(Operand, usize, bool), usize>,
    split_map: AHashMap<VertexKey, usize>,
}

impl MeshBuilder {
    fn new(mesh: Mesh) -> Self {
        Self {
            mesh,
            source_map: AHashMap::new(),
            split_map: AHashMap::new(),
        }
    }

    fn source_vertex(&mut self, operand: Operand, source: &Mesh, index: usize, inverted: bool) -> usize {
        let mesh = &mut self.mesh;
        *self
            .source_map
            .entry((operand, index, inverted))
            .or_insert_with(|| {
                let vertex = source.vertices[index];
                mesh.add_vertex(if inverted { vertex.flipped() } else { vertex })
            })
    }

    fn split_vertex(&mut self, vertex: &Vertex, inverted: bool) -> usize {
        let vertex = if inverted { vertex.flipped() } else { *vertex };
        let mesh = &mut self.mesh;
        *self
            .split_map
            .entry(vertex_key(&vertex))
            .or_insert_with(|| mesh.add_vertex(vertex))
    }

    fn push_triangle(&mut self, indices: [usize; 3], inverted: bool, material: usize) {
        let triangle = Triangle::with_material(indices, material);
        self.mesh.add_triangle(if inverted { triangle.reversed() } else { triangle });
    }

    fn add_source_triangle(
        &mut self,
        operand: Operand,
        source: &Mesh,
        t: usize,
        action: FragmentAction,
        slot_offset: usize,
    ) {
        let inverted = match action {
            FragmentAction::Discard => return,
            FragmentAction::Keep => false,
            FragmentAction::KeepInverted => true,
        };
        let triangle = source.triangles[t];
        let indices = triangle
            .indices
            .map(|i| self.source_vertex(operand, source, i, inverted));
        self.push_triangle(indices, inverted, triangle.material + slot_offset);
    }

    fn add_fragment(
        &mut self,
        operand: Operand,
        source: &Mesh,
        t: usize,
        fragment: &Fragment,
        action: FragmentAction,
        slot_offset: usize,
    ) {
        let inverted = match action {
            FragmentAction::Discard => return,
            FragmentAction::Keep => false,
            FragmentAction::KeepInverted => true,
        };
        let triangle = source.triangles[t];

        let indices: Vec<usize> = fragment
            .vertices
            .iter()
            .map(|vertex| {
                match triangle
                    .indices
                    .iter()
                    .find(|&&i| source.vertices[i].position == vertex.position)
                {
                    Some(&corner) => self.source_vertex(operand, source, corner, inverted),
                    None => self.split_vertex(vertex, inverted),
                }
            })
            .collect();

        for i in 1..indices.len().saturating_sub(1) {
            self.push_triangle(
                [indices[0], indices[i], indices[i + 1]],
                inverted,
                triangle.material + slot_offset,
            );
        }
    }

    fn finish(self) -> Mesh {
        self.mesh
    }
}
