// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Parameter sweeps over the kernel render loop

use crate::config::KernelConfig;
use crate::geometry::mesh_utils::validate_mesh;
use crate::io::compare_meshes;
use crate::kernel::{Kernel, ScenePreset};
use anyhow::Result;
use serde::Serialize;
use std::time::{Duration, Instant};

/// Timing and health of a sweep
#[derive(Debug, Clone, Serialize)]
pub struct SweepSummary {
    pub preset: ScenePreset,
    pub frames: usize,
    pub min: Duration,
    pub mean: Duration,
    pub max: Duration,
    /// Frames whose result was not closed
    pub open_results: usize,
    /// Re-running the first and last frame reproduced them
    pub deterministic: bool,
}

/// Run `frames` frames sweeping the angle across its range, starting
/// from `config.params`
pub fn run_sweep(config: &KernelConfig, frames: usize) -> Result<SweepSummary> {
    let frames = frames.max(1);
    let mut kernel = Kernel::from_config(config)?;
    let (min_angle, max_angle) = crate::config::SceneParams::ANGLE_RANGE;

    let angle_at = |frame: usize| {
        if frames == 1 {
            config.params.angle
        } else {
            min_angle + (max_angle - min_angle) * frame as f64 / (frames - 1) as f64
        }
    };

    let mut timings = Vec::with_capacity(frames);
    let mut open_results = 0;
    let mut first = None;
    let mut last = None;

    for frame in 0..frames {
        let mut params = config.params;
        params.angle = angle_at(frame);

        let start = Instant::now();
        let view = kernel.update_frame(&params)?;
        timings.push(start.elapsed());

        if !validate_mesh(view.result).is_closed {
            open_results += 1;
        }
        if frame == 0 {
            first = Some((params, view.result.clone()));
        }
        if frame + 1 == frames {
            last = Some((params, view.result.clone()));
        }
    }

    let mut deterministic = true;
    let mut replay = Kernel::from_config(config)?;
    for (params, expected) in [first, last].into_iter().flatten() {
        let view = replay.update_frame(&params)?;
        deterministic &= compare_meshes(view.result, &expected, 1e-9).passed
            && view.result.triangle_count() == expected.triangle_count();
    }

    let total: Duration = timings.iter().sum();
    let summary = SweepSummary {
        preset: config.preset,
        frames,
        min: timings.iter().min().copied().unwrap_or_default(),
        mean: total / frames as u32,
        max: timings.iter().max().copied().unwrap_or_default(),
        open_results,
        deterministic,
    };

    tracing::info!(
        frames,
        open_results,
        deterministic,
        mean_ms = summary.mean.as_secs_f64() * 1000.0,
        "sweep finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_sweep() {
        let mut config = KernelConfig::default();
        config.evaluator.parallel = false;
        let summary = run_sweep(&config, 3).unwrap();

        assert_eq!(summary.frames, 3);
        assert!(summary.deterministic);
        assert!(summary.min <= summary.max);
    }
}
