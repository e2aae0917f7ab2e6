// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry module - mesh representation and boolean evaluation

pub mod analytics;
mod bbox;
mod boolean;
mod brush;
pub mod bvh;
pub mod classification;
mod csg;
mod mesh;
pub mod mesh_utils;
mod primitives;
pub mod robust_predicates;
pub mod stitching;
pub mod triangle_intersection;
pub mod triangle_splitting;
mod vertex_map;

pub use bbox::BoundingBox;
pub use boolean::{fragment_action, BooleanOp, FragmentAction};
pub use brush::{Brush, PreparedMesh};
pub use bvh::{Bvh, Ray, RayHit};
pub use csg::{evaluate, EvaluationStats, Evaluator, EvaluatorConfig};
pub use mesh::{MaterialGroup, Mesh, Triangle, Vertex};
pub use primitives::Primitive;
pub use vertex_map::VertexMap;
