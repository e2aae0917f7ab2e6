// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Brush CSG kernel
//!
//! Boolean evaluation (union, subtraction, intersection) of triangulated
//! solids with BVH-accelerated intersection, plane-based re-triangulation,
//! seam repair and per-material groups. A [`Kernel`] drives the evaluator
//! frame by frame from live scene parameters.

pub mod cli;
pub mod config;
pub mod error;
pub mod geometry;
pub mod io;
pub mod kernel;
pub mod utils;

pub use config::{KernelConfig, SceneParams};
pub use error::{CsgError, CsgResult};
pub use geometry::{
    evaluate, BooleanOp, Brush, EvaluationStats, Evaluator, EvaluatorConfig, Mesh, Primitive,
};
pub use io::{export, export_gltf, export_stl};
pub use kernel::{FrameView, Kernel, ScenePreset};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_subtraction() {
        let a = Primitive::cube(4.0).to_mesh();
        let b = Primitive::cylinder(1.0, 5.0, 16).to_mesh();
        let result = evaluate(&a, &b, BooleanOp::Subtraction);
        assert!(result.is_ok());
    }
}
