// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Round-trip export/import tests

use anyhow::Result;
use brushcsg::geometry::analytics::signed_volume;
use brushcsg::io;
use brushcsg::{BooleanOp, Kernel, SceneParams, ScenePreset};
use tempfile::{tempdir, NamedTempFile};

fn drilled() -> Result<brushcsg::Mesh> {
    let mut kernel = Kernel::new(ScenePreset::Drill, BooleanOp::Subtraction);
    let view = kernel.update_frame(&SceneParams::default())?;
    Ok(view.result.clone())
}

#[test]
fn test_roundtrip_stl() -> Result<()> {
    let original = drilled()?;

    let file = NamedTempFile::with_suffix(".stl")?;
    io::export(&original, file.path())?;

    let metadata = std::fs::metadata(file.path())?;
    assert_eq!(metadata.len(), 84 + 50 * original.triangle_count() as u64);
    println!("STL file size: {} bytes", metadata.len());

    let imported = io::import(file.path())?;
    assert_eq!(imported.triangle_count(), original.triangle_count());

    let (expected, actual) = (signed_volume(&original), signed_volume(&imported));
    println!("Volume: {:.6} (original {:.6})", actual, expected);
    assert!(((actual - expected) / expected).abs() < 1e-4);

    Ok(())
}

#[test]
fn test_roundtrip_json() -> Result<()> {
    let original = drilled()?;

    let file = NamedTempFile::with_suffix(".json")?;
    io::export(&original, file.path())?;
    let imported = io::import(file.path())?;

    assert_eq!(imported.triangles, original.triangles);
    assert_eq!(imported.groups, original.groups);
    assert!(io::compare_meshes(&imported, &original, 1e-12).passed);
    Ok(())
}

#[test]
fn test_gltf_primitive_per_group() -> Result<()> {
    let mesh = drilled()?;
    assert_eq!(mesh.groups.len(), 2);

    let dir = tempdir()?;
    let path = dir.path().join("drill.gltf");
    io::export(&mesh, &path)?;

    let bin_path = dir.path().join("drill.bin");
    assert!(bin_path.exists(), "GLTF buffer not written");

    let gltf: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
    let primitives = gltf["meshes"][0]["primitives"].as_array().unwrap();
    assert_eq!(primitives.len(), 2);
    assert_eq!(primitives[0]["material"], 0);
    assert_eq!(primitives[1]["material"], 1);

    assert_eq!(gltf["buffers"][0]["uri"], "drill.bin");
    let byte_length = gltf["buffers"][0]["byteLength"].as_u64().unwrap();
    assert_eq!(byte_length, std::fs::metadata(&bin_path)?.len());

    Ok(())
}

#[test]
fn test_unknown_extension_is_rejected() -> Result<()> {
    let mesh = drilled()?;
    let file = NamedTempFile::with_suffix(".3mf")?;
    assert!(io::export(&mesh, file.path()).is_err());
    assert!(io::import(file.path()).is_err());
    Ok(())
}
