// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Kernel API for frame-by-frame boolean evaluation

use crate::config::{KernelConfig, SceneParams};
use crate::error::CsgResult;
use crate::geometry::{BooleanOp, Brush, EvaluationStats, Evaluator, EvaluatorConfig, Mesh, Primitive};
use crate::utils::deg_to_rad;
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opacity of the tool brush overlay while it is shown
pub const TOOL_OPACITY: f64 = 0.35;

/// Built-in brush setups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ScenePreset {
    /// 4×4×4 box drilled by a 45-segment cylinder (r=1, h=5)
    Drill,
    /// 4×4×4 box cut by a tilted 4×15×8 slab driven by angle and offset
    Cutaway,
}

impl ScenePreset {
    pub fn name(&self) -> &'static str {
        match self {
            ScenePreset::Drill => "drill",
            ScenePreset::Cutaway => "cutaway",
        }
    }

    /// Base and tool brushes in their initial placement
    pub fn brushes(&self) -> (Brush, Brush) {
        let base = Brush::new(Primitive::cube(4.0).to_mesh());
        let tool = match self {
            ScenePreset::Drill => Brush::new(Primitive::cylinder(1.0, 5.0, 45).to_mesh()),
            ScenePreset::Cutaway => Brush::new(Primitive::cuboid(4.0, 15.0, 8.0).to_mesh())
                .with_position(Vector3::new(3.0, 0.0, 0.0)),
        };
        (base, tool)
    }
}

impl fmt::Display for ScenePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ScenePreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "drill" => Ok(ScenePreset::Drill),
            "cutaway" => Ok(ScenePreset::Cutaway),
            other => Err(format!("unknown scene preset `{}`", other)),
        }
    }
}

/// What the caller should draw for one frame
#[derive(Debug)]
pub struct FrameView<'a> {
    pub result: &'a Mesh,
    pub wireframe: bool,
    pub tool_visible: bool,
    pub tool_opacity: f64,
    pub frame: u64,
    pub stats: &'a EvaluationStats,
}

/// Render-loop state: both brushes, the operator and the last result
pub struct Kernel {
    preset: ScenePreset,
    operation: BooleanOp,
    evaluator: Evaluator,
    base: Brush,
    tool: Brush,
    result: Option<Mesh>,
    /// Buffers of the frame before `result`, refilled by the next frame
    spare: Option<Mesh>,
    stats: EvaluationStats,
    frame: u64,
}

impl Kernel {
    pub fn new(preset: ScenePreset, operation: BooleanOp) -> Self {
        Self::with_evaluator(preset, operation, EvaluatorConfig::default())
    }

    pub fn with_evaluator(preset: ScenePreset, operation: BooleanOp, config: EvaluatorConfig) -> Self {
        let (base, tool) = preset.brushes();
        Self {
            preset,
            operation,
            evaluator: Evaluator::new(config),
            base,
            tool,
            result: None,
            spare: None,
            stats: EvaluationStats::default(),
            frame: 0,
        }
    }

    pub fn from_config(config: &KernelConfig) -> anyhow::Result<Self> {
        Ok(Self::with_evaluator(
            config.preset,
            config.operation()?,
            config.evaluator,
        ))
    }

    pub fn preset(&self) -> ScenePreset {
        self.preset
    }

    pub fn operation(&self) -> BooleanOp {
        self.operation
    }

    pub fn set_operation(&mut self, operation: BooleanOp) {
        self.operation = operation;
    }

    pub fn base(&self) -> &Brush {
        &self.base
    }

    pub fn tool(&self) -> &Brush {
        &self.tool
    }

    pub fn tool_mut(&mut self) -> &mut Brush {
        &mut self.tool
    }

    /// Last evaluated mesh, if any frame ran
    pub fn result(&self) -> Option<&Mesh> {
        self.result.as_ref()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Move the tool according to `params`, re-evaluate and describe the
    /// frame. Buffers of an older result are reused. On error the last
    /// good result stays available.
    pub fn update_frame(&mut self, params: &SceneParams) -> CsgResult<FrameView<'_>> {
        let params = params.clamped();

        if self.preset == ScenePreset::Cutaway {
            self.tool.position.y = params.offset;
            self.tool.rotation.z = deg_to_rad(params.angle);
        }
        self.base.update_matrix_world()?;
        self.tool.update_matrix_world()?;

        self.evaluator.set_use_groups(params.use_groups);
        let (mesh, stats) = self.evaluator.evaluate_with_stats(
            &self.base,
            &self.tool,
            self.operation,
            self.spare.take(),
        )?;
        self.frame += 1;

        tracing::trace!(
            frame = self.frame,
            angle = params.angle,
            offset = params.offset,
            triangles = mesh.triangle_count(),
            "frame updated"
        );

        self.stats = stats;
        self.spare = self.result.take();
        let result = self.result.insert(mesh);
        Ok(FrameView {
            result,
            wireframe: params.show_wireframe,
            tool_visible: params.show_tool,
            tool_opacity: if params.show_tool { TOOL_OPACITY } else { 1.0 },
            frame: self.frame,
            stats: &self.stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::analytics::signed_volume;

    #[test]
    fn test_frame_view_flags() {
        let mut kernel = Kernel::new(ScenePreset::Cutaway, BooleanOp::Subtraction);
        let params = SceneParams {
            show_tool: true,
            show_wireframe: true,
            ..Default::default()
        };
        let view = kernel.update_frame(&params).unwrap();
        assert!(view.wireframe);
        assert!(view.tool_visible);
        assert_eq!(view.tool_opacity, TOOL_OPACITY);
        assert_eq!(view.frame, 1);

        let view = kernel.update_frame(&SceneParams::default()).unwrap();
        assert!(!view.tool_visible);
        assert_eq!(view.tool_opacity, 1.0);
        assert_eq!(view.frame, 2);
    }

    #[test]
    fn test_cutaway_params_drive_tool() {
        let mut kernel = Kernel::new(ScenePreset::Cutaway, BooleanOp::Subtraction);
        let params = SceneParams {
            angle: 30.0,
            offset: 1.5,
            ..Default::default()
        };
        kernel.update_frame(&params).unwrap();
        assert_eq!(kernel.tool().position.y, 1.5);
        assert!((kernel.tool().rotation.z - 30f64.to_radians()).abs() < 1e-12);
        assert!(kernel.tool().is_prepared());
    }

    #[test]
    fn test_drill_ignores_params() {
        let mut kernel = Kernel::new(ScenePreset::Drill, BooleanOp::Subtraction);
        let first = signed_volume(kernel.update_frame(&SceneParams::default()).unwrap().result);
        let params = SceneParams {
            angle: 10.0,
            offset: 0.5,
            ..Default::default()
        };
        let second = signed_volume(kernel.update_frame(&params).unwrap().result);
        assert_eq!(first, second);
    }

    #[test]
    fn test_failed_frame_keeps_last_result() {
        let config = EvaluatorConfig {
            strict: true,
            ..Default::default()
        };
        let mut kernel = Kernel::with_evaluator(ScenePreset::Drill, BooleanOp::Subtraction, config);
        let good = kernel.update_frame(&SceneParams::default()).unwrap().result.clone();

        // Open the tool so strict evaluation rejects it
        kernel.tool_mut().geometry_mut().triangles.truncate(10);
        let err = kernel.update_frame(&SceneParams::default()).unwrap_err();
        assert!(matches!(err, crate::error::CsgError::InvalidGeometry(_)));

        assert_eq!(kernel.result(), Some(&good));
        assert_eq!(kernel.frame_count(), 1);
    }

    #[test]
    fn test_result_buffers_alternate() {
        let mut kernel = Kernel::new(ScenePreset::Drill, BooleanOp::Subtraction);
        let params = SceneParams::default();
        let first = kernel.update_frame(&params).unwrap().result.clone();
        let second = kernel.update_frame(&params).unwrap().result.clone();
        let third = kernel.update_frame(&params).unwrap().result.clone();
        assert_eq!(first, second);
        assert_eq!(second, third);
    }

    #[test]
    fn test_preset_names() {
        assert_eq!("Drill".parse::<ScenePreset>().unwrap(), ScenePreset::Drill);
        assert_eq!(ScenePreset::Cutaway.to_string(), "cutaway");
        assert!("lathe".parse::<ScenePreset>().is_err());
    }
}
