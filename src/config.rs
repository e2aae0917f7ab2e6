// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Scene and evaluator configuration

use crate::geometry::{BooleanOp, EvaluatorConfig};
use crate::kernel::ScenePreset;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming a config file for [`KernelConfig::load`]
pub const CONFIG_ENV: &str = "BRUSHCSG_CONFIG";

/// Live scene parameters applied every frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneParams {
    /// Tool rotation in degrees, 0..=90
    pub angle: f64,
    /// Tool offset along y, 0..=5
    pub offset: f64,
    pub use_groups: bool,
    pub show_wireframe: bool,
    /// Draw the tool brush as a translucent overlay
    pub show_tool: bool,
}

impl Default for SceneParams {
    fn default() -> Self {
        Self {
            angle: 45.0,
            offset: 3.0,
            use_groups: true,
            show_wireframe: false,
            show_tool: false,
        }
    }
}

impl SceneParams {
    pub const ANGLE_RANGE: (f64, f64) = (0.0, 90.0);
    pub const OFFSET_RANGE: (f64, f64) = (0.0, 5.0);

    /// Copy with angle and offset clamped to their slider ranges
    pub fn clamped(&self) -> Self {
        let clamp = |value: f64, (min, max): (f64, f64)| {
            if value.is_nan() {
                min
            } else {
                crate::utils::clamp(value, min, max)
            }
        };
        Self {
            angle: clamp(self.angle, Self::ANGLE_RANGE),
            offset: clamp(self.offset, Self::OFFSET_RANGE),
            ..*self
        }
    }
}

/// Top-level configuration for the kernel and the CLI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub preset: ScenePreset,
    /// Operator name, parsed with [`BooleanOp::from_str`](std::str::FromStr)
    pub operation: String,
    pub params: SceneParams,
    pub evaluator: EvaluatorConfig,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            preset: ScenePreset::Cutaway,
            operation: BooleanOp::Subtraction.to_string(),
            params: SceneParams::default(),
            evaluator: EvaluatorConfig::default(),
        }
    }
}

impl KernelConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: KernelConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;
        Ok(config)
    }

    /// Load `$BRUSHCSG_CONFIG` (or defaults) with environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(path) => Self::from_file(PathBuf::from(path))?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `BRUSHCSG_*` overrides read through `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(angle) = lookup("BRUSHCSG_ANGLE") {
            self.params.angle = angle
                .parse()
                .with_context(|| format!("Invalid BRUSHCSG_ANGLE: {}", angle))?;
        }

        if let Some(offset) = lookup("BRUSHCSG_OFFSET") {
            self.params.offset = offset
                .parse()
                .with_context(|| format!("Invalid BRUSHCSG_OFFSET: {}", offset))?;
        }

        if let Some(use_groups) = lookup("BRUSHCSG_USE_GROUPS") {
            self.params.use_groups = use_groups
                .parse()
                .with_context(|| format!("Invalid BRUSHCSG_USE_GROUPS: {}", use_groups))?;
        }

        if let Some(operation) = lookup("BRUSHCSG_OPERATION") {
            self.operation = operation;
        }

        self.params = self.params.clamped();
        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path.as_ref(), content)
            .with_context(|| format!("Failed to write config file: {:?}", path.as_ref()))?;
        Ok(())
    }

    pub fn operation(&self) -> Result<BooleanOp> {
        Ok(self.operation.parse()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = KernelConfig::default();
        assert_eq!(config.params.angle, 45.0);
        assert_eq!(config.params.offset, 3.0);
        assert!(config.params.use_groups);
        assert_eq!(config.operation().unwrap(), BooleanOp::Subtraction);
    }

    #[test]
    fn test_clamped() {
        let params = SceneParams {
            angle: 120.0,
            offset: -1.0,
            ..Default::default()
        }
        .clamped();
        assert_eq!(params.angle, 90.0);
        assert_eq!(params.offset, 0.0);

        let nan = SceneParams {
            angle: f64::NAN,
            ..Default::default()
        };
        assert_eq!(nan.clamped().angle, 0.0);
    }

    #[test]
    fn test_overrides() {
        let mut config = KernelConfig::default();
        config
            .apply_overrides(|key| match key {
                "BRUSHCSG_ANGLE" => Some("30".to_string()),
                "BRUSHCSG_OFFSET" => Some("9".to_string()),
                "BRUSHCSG_USE_GROUPS" => Some("false".to_string()),
                "BRUSHCSG_OPERATION" => Some("intersection".to_string()),
                _ => None,
            })
            .unwrap();

        assert_eq!(config.params.angle, 30.0);
        assert_eq!(config.params.offset, 5.0);
        assert!(!config.params.use_groups);
        assert_eq!(config.operation().unwrap(), BooleanOp::Intersection);
    }

    #[test]
    fn test_bad_override_is_an_error() {
        let mut config = KernelConfig::default();
        let result = config.apply_overrides(|key| {
            (key == "BRUSHCSG_ANGLE").then(|| "steep".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_bad_use_groups_override_is_an_error() {
        let mut config = KernelConfig::default();
        let result = config.apply_overrides(|key| {
            (key == "BRUSHCSG_USE_GROUPS").then(|| "maybe".to_string())
        });
        let message = format!("{:#}", result.unwrap_err());
        assert!(message.contains("BRUSHCSG_USE_GROUPS"));
        assert!(config.params.use_groups);
    }

    #[test]
    fn test_partial_toml() {
        let config: KernelConfig = toml::from_str(
            r#"
            preset = "drill"
            operation = "union"

            [params]
            angle = 10.0
            "#,
        )
        .unwrap();

        assert_eq!(config.preset, ScenePreset::Drill);
        assert_eq!(config.params.angle, 10.0);
        assert_eq!(config.params.offset, 3.0);
        assert!(config.evaluator.parallel);
    }
}
