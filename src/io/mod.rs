// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! I/O module - mesh export, STL import and comparison

mod compare;
mod export_gltf;
mod stl;

pub use compare::{compare_meshes, MeshComparison};
pub use export_gltf::export as export_gltf;
pub use stl::{export_stl, import_stl, stl_bytes};

use crate::geometry::Mesh;
use anyhow::{Context, Result};
use std::path::Path;

/// Write the mesh as pretty-printed JSON
pub fn export_json(mesh: &Mesh, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let content = serde_json::to_string_pretty(mesh).context("Failed to serialize mesh")?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write JSON file: {:?}", path))?;
    Ok(())
}

/// Read a mesh written by [`export_json`]
pub fn import_json(path: impl AsRef<Path>) -> Result<Mesh> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read JSON file: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse mesh JSON: {:?}", path))
}

/// Export by file extension: `stl`, `gltf`, `glb` or `json`
pub fn export(mesh: &Mesh, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "stl" => export_stl(mesh, path),
        "gltf" | "glb" => export_gltf(mesh, path),
        "json" => export_json(mesh, path),
        other => anyhow::bail!("unsupported export format `{}` for {:?}", other, path),
    }
}

/// Import by file extension: `stl` or `json`
pub fn import(path: impl AsRef<Path>) -> Result<Mesh> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "stl" => import_stl(path),
        "json" => import_json(path),
        other => anyhow::bail!("unsupported import format `{}` for {:?}", other, path),
    }
}
