// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Bounding Volume Hierarchy (BVH) for spatial acceleration
//!
//! Nodes live in one arena and refer to each other by index. Leaves own a
//! contiguous range of a permutation of the triangle indices, so every
//! triangle sits in exactly one leaf. Traversals use an explicit stack.

use super::robust_predicates::PLANE_EPSILON;
use super::{BoundingBox, Mesh};
use crate::error::CsgResult;
use nalgebra::{Point3, Vector3};

/// Index of a node in the arena
pub type NodeId = usize;

/// Leaves stop splitting at this many triangles
pub const MAX_LEAF_TRIANGLES: usize = 4;

/// Recursion guard; median splits of realistic meshes stay far below it
pub const MAX_DEPTH: usize = 48;

/// Payload of a BVH node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BvhContent {
    /// Range `first..first + count` of [`Bvh::triangle_order`]
    Leaf { first: usize, count: usize },
    Branch { left: NodeId, right: NodeId },
}

/// BVH node
#[derive(Debug, Clone)]
pub struct BvhNode {
    /// Union of the boxes below this node
    pub bbox: BoundingBox,
    pub content: BvhContent,
}

impl BvhNode {
    pub fn is_leaf(&self) -> bool {
        matches!(self.content, BvhContent::Leaf { .. })
    }
}

/// Ray with a precomputed reciprocal direction for slab tests
#[derive(Debug, Clone, Copy)]
pub struct Ray {
    pub origin: Point3<f64>,
    pub direction: Vector3<f64>,
    inv_direction: Vector3<f64>,
}

impl Ray {
    pub fn new(origin: Point3<f64>, direction: Vector3<f64>) -> Self {
        Self {
            origin,
            direction,
            inv_direction: direction.map(|c| 1.0 / c),
        }
    }

    pub fn at(&self, distance: f64) -> Point3<f64> {
        self.origin + self.direction * distance
    }
}

/// Ray/triangle hit with barycentric coordinates of the hit point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub triangle: usize,
    pub distance: f64,
    pub u: f64,
    pub v: f64,
}

impl RayHit {
    /// Hit lies within `tolerance` (barycentric) of a triangle edge
    pub fn is_near_edge(&self, tolerance: f64) -> bool {
        self.u < tolerance || self.v < tolerance || 1.0 - self.u - self.v < tolerance
    }
}

/// Bounding Volume Hierarchy for triangle meshes
#[derive(Debug, Clone, Default)]
pub struct Bvh {
    nodes: Vec<BvhNode>,
    order: Vec<usize>,
    triangle_boxes: Vec<BoundingBox>,
}

impl Bvh {
    /// Build a BVH over every triangle of `mesh` by median split on the
    /// longest axis of the centroid bounds. An empty mesh gives an empty BVH.
    pub fn build(mesh: &Mesh) -> CsgResult<Self> {
        mesh.validate()?;

        let triangle_boxes: Vec<BoundingBox> = (0..mesh.triangle_count())
            .map(|i| BoundingBox::from_points(&mesh.triangle_positions(i)))
            .collect();
        let centroids: Vec<Point3<f64>> = triangle_boxes.iter().map(|b| b.center()).collect();

        let count = triangle_boxes.len();
        let mut bvh = Self {
            nodes: Vec::with_capacity(2 * count / MAX_LEAF_TRIANGLES + 1),
            order: (0..count).collect(),
            triangle_boxes,
        };
        if count > 0 {
            bvh.build_node(&centroids, 0, count, 0);
        }

        tracing::trace!(triangles = count, nodes = bvh.nodes.len(), "built bvh");
        Ok(bvh)
    }

    fn build_node(&mut self, centroids: &[Point3<f64>], start: usize, end: usize, depth: usize) -> NodeId {
        let bbox = self.order[start..end]
            .iter()
            .fold(BoundingBox::empty(), |acc, &t| acc.union(&self.triangle_boxes[t]));

        let id = self.nodes.len();
        let count = end - start;
        self.nodes.push(BvhNode {
            bbox,
            content: BvhContent::Leaf { first: start, count },
        });

        if count <= MAX_LEAF_TRIANGLES || depth >= MAX_DEPTH {
            return id;
        }

        let centroid_bounds =
            BoundingBox::from_points(self.order[start..end].iter().map(|&t| &centroids[t]));
        let axis = centroid_bounds.longest_axis();
        if centroid_bounds.size()[axis] <= 0.0 {
            // All centroids coincide; no split separates them
            return id;
        }

        let half = count / 2;
        self.order[start..end].select_nth_unstable_by(half, |&a, &b| {
            centroids[a][axis]
                .total_cmp(&centroids[b][axis])
                .then(a.cmp(&b))
        });

        let left = self.build_node(centroids, start, start + half, depth + 1);
        let right = self.build_node(centroids, start + half, end, depth + 1);
        self.nodes[id].content = BvhContent::Branch { left, right };
        id
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.order.len()
    }

    /// Root node, `None` for an empty hierarchy
    pub fn root(&self) -> Option<&BvhNode> {
        self.nodes.first()
    }

    pub fn node(&self, id: NodeId) -> &BvhNode {
        &self.nodes[id]
    }

    /// Triangle indices stored in a leaf node (empty for branches)
    pub fn leaf_triangles(&self, id: NodeId) -> &[usize] {
        match self.nodes[id].content {
            BvhContent::Leaf { first, count } => &self.order[first..first + count],
            BvhContent::Branch { .. } => &[],
        }
    }

    /// Permutation of triangle indices referenced by the leaves
    pub fn triangle_order(&self) -> &[usize] {
        &self.order
    }

    pub fn triangle_box(&self, triangle: usize) -> &BoundingBox {
        &self.triangle_boxes[triangle]
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.root().map(|n| n.bbox).unwrap_or_default()
    }

    /// Number of levels from the root to the deepest leaf
    pub fn depth(&self) -> usize {
        if self.nodes.is_empty() {
            return 0;
        }
        let mut deepest = 0;
        let mut stack = vec![(0, 1)];
        while let Some((id, level)) = stack.pop() {
            deepest = deepest.max(level);
            if let BvhContent::Branch { left, right } = self.nodes[id].content {
                stack.push((left, level + 1));
                stack.push((right, level + 1));
            }
        }
        deepest
    }

    /// Triangles whose boxes overlap `query`, in ascending order
    pub fn query_box(&self, query: &BoundingBox) -> Vec<usize> {
        let mut result = Vec::new();
        if self.nodes.is_empty() {
            return result;
        }

        let mut stack = vec![0];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if !node.bbox.intersects(query) {
                continue;
            }
            match node.content {
                BvhContent::Leaf { first, count } => {
                    result.extend(
                        self.order[first..first + count]
                            .iter()
                            .filter(|&&t| self.triangle_boxes[t].intersects(query)),
                    );
                }
                BvhContent::Branch { left, right } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }

        result.sort_unstable();
        result
    }

    /// Candidate pairs `(self_triangle, other_triangle)` whose boxes overlap
    /// once grown by `margin`. Sorted, each pair reported once.
    pub fn intersecting_pairs(&self, other: &Bvh, margin: f64) -> Vec<(usize, usize)> {
        let mut pairs = Vec::new();
        if self.nodes.is_empty() || other.nodes.is_empty() {
            return pairs;
        }

        let mut stack: Vec<(NodeId, NodeId)> = vec![(0, 0)];
        while let Some((a, b)) = stack.pop() {
            let node_a = &self.nodes[a];
            let node_b = &other.nodes[b];
            if !node_a.bbox.expanded(margin).intersects(&node_b.bbox) {
                continue;
            }

            match (node_a.content, node_b.content) {
                (
                    BvhContent::Leaf { first: fa, count: ca },
                    BvhContent::Leaf { first: fb, count: cb },
                ) => {
                    for &ta in &self.order[fa..fa + ca] {
                        let box_a = self.triangle_boxes[ta].expanded(margin);
                        for &tb in &other.order[fb..fb + cb] {
                            if box_a.intersects(&other.triangle_boxes[tb]) {
                                pairs.push((ta, tb));
                            }
                        }
                    }
                }
                (BvhContent::Branch { left, right }, BvhContent::Leaf { .. }) => {
                    stack.push((left, b));
                    stack.push((right, b));
                }
                (BvhContent::Leaf { .. }, BvhContent::Branch { left, right }) => {
                    stack.push((a, left));
                    stack.push((a, right));
                }
                (
                    BvhContent::Branch { left: la, right: ra },
                    BvhContent::Branch { left: lb, right: rb },
                ) => {
                    // Descend the larger volume first to keep boxes tight
                    if node_a.bbox.volume() >= node_b.bbox.volume() {
                        stack.push((la, b));
                        stack.push((ra, b));
                    } else {
                        stack.push((a, lb));
                        stack.push((a, rb));
                    }
                }
            }
        }

        pairs.sort_unstable();
        pairs
    }

    /// Closest hit in front of the ray origin. Equal distances resolve to
    /// the lower triangle index.
    pub fn raycast_closest(&self, mesh: &Mesh, ray: &Ray) -> Option<RayHit> {
        let mut best: Option<RayHit> = None;
        if self.nodes.is_empty() {
            return best;
        }

        let mut stack = vec![0];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            let limit = best.map_or(f64::INFINITY, |h| h.distance);
            if node
                .bbox
                .expanded(PLANE_EPSILON)
                .ray_entry(&ray.origin, &ray.inv_direction, limit)
                .is_none()
            {
                continue;
            }

            match node.content {
                BvhContent::Leaf { first, count } => {
                    for &t in &self.order[first..first + count] {
                        let Some(hit) = ray_triangle(mesh, t, ray) else {
                            continue;
                        };
                        let closer = match best {
                            None => true,
                            Some(b) => {
                                hit.distance < b.distance
                                    || (hit.distance == b.distance && hit.triangle < b.triangle)
                            }
                        };
                        if closer {
                            best = Some(hit);
                        }
                    }
                }
                BvhContent::Branch { left, right } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }

        best
    }

    /// Every hit in front of the ray origin, nearest first
    pub fn raycast_all(&self, mesh: &Mesh, ray: &Ray) -> Vec<RayHit> {
        let mut hits = Vec::new();
        if self.nodes.is_empty() {
            return hits;
        }

        let mut stack = vec![0];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id];
            if node
                .bbox
                .expanded(PLANE_EPSILON)
                .ray_entry(&ray.origin, &ray.inv_direction, f64::INFINITY)
                .is_none()
            {
                continue;
            }
            match node.content {
                BvhContent::Leaf { first, count } => {
                    hits.extend(
                        self.order[first..first + count]
                            .iter()
                            .filter_map(|&t| ray_triangle(mesh, t, ray)),
                    );
                }
                BvhContent::Branch { left, right } => {
                    stack.push(right);
                    stack.push(left);
                }
            }
        }

        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then(a.triangle.cmp(&b.triangle))
        });
        hits
    }
}

/// Möller-Trumbore ray/triangle test, inclusive on the triangle edges
pub fn ray_triangle(mesh: &Mesh, triangle: usize, ray: &Ray) -> Option<RayHit> {
    const EPS: f64 = 1e-12;

    let [v0, v1, v2] = mesh.triangle_positions(triangle);
    let edge1 = v1 - v0;
    let edge2 = v2 - v0;
    let h = ray.direction.cross(&edge2);
    let a = edge1.dot(&h);

    if a.abs() < EPS {
        return None; // Ray parallel to triangle
    }

    let f = 1.0 / a;
    let s = ray.origin - v0;
    let u = f * s.dot(&h);
    if !(-EPS..=1.0 + EPS).contains(&u) {
        return None;
    }

    let q = s.cross(&edge1);
    let v = f * ray.direction.dot(&q);
    if v < -EPS || u + v > 1.0 + EPS {
        return None;
    }

    let distance = f * edge2.dot(&q);
    (distance > 0.0).then_some(RayHit {
        triangle,
        distance,
        u,
        v,
    })
}
