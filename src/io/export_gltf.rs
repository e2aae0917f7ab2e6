// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! GLTF/GLB exporter
//!
//! One mesh with one primitive per material group, so multi-material
//! boolean results keep their slots.

use crate::geometry::{MaterialGroup, Mesh};
use anyhow::{Context, Result};
use serde_json::json;
use std::fs::File;
use std::io::Write;
use std::path::Path;

const FLOAT: u32 = 5126;
const UNSIGNED_INT: u32 = 5125;
const ARRAY_BUFFER: u32 = 34962;
const ELEMENT_ARRAY_BUFFER: u32 = 34963;

/// Base colors for material slots, cycled
const PALETTE: [[f64; 4]; 4] = [
    [0.6, 0.8, 0.6, 1.0],
    [0.5, 0.796, 0.769, 1.0],
    [0.9, 0.7, 0.4, 1.0],
    [0.7, 0.6, 0.9, 1.0],
];

/// Export mesh to GLTF (with a sibling `.bin`) or GLB, chosen by extension
pub fn export(mesh: &Mesh, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let is_glb = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("glb"))
        .unwrap_or(false);
    if is_glb {
        export_glb(mesh, path)
    } else {
        export_gltf_separate(mesh, path)
    }
}

/// Export mesh to GLB (binary GLTF)
fn export_glb(mesh: &Mesh, path: &Path) -> Result<()> {
    let (gltf, buffer_data) = create_gltf_json(mesh, None)?;

    let json_string = serde_json::to_string(&gltf)?;
    let json_length = align_to_multiple_of_four(json_string.len());
    let buffer_length = align_to_multiple_of_four(buffer_data.len());
    let total_length = 12 + 8 + json_length + 8 + buffer_length;

    let mut file =
        File::create(path).with_context(|| format!("Failed to create GLB file: {:?}", path))?;

    // GLB header
    file.write_all(&0x46546C67u32.to_le_bytes())?; // magic: "glTF"
    file.write_all(&2u32.to_le_bytes())?;
    file.write_all(&(total_length as u32).to_le_bytes())?;

    // JSON chunk, space padded
    file.write_all(&(json_length as u32).to_le_bytes())?;
    file.write_all(&0x4E4F534Au32.to_le_bytes())?; // "JSON"
    file.write_all(json_string.as_bytes())?;
    file.write_all(&vec![b' '; json_length - json_string.len()])?;

    // BIN chunk, zero padded
    file.write_all(&(buffer_length as u32).to_le_bytes())?;
    file.write_all(&0x004E4942u32.to_le_bytes())?; // "BIN\0"
    file.write_all(&buffer_data)?;
    file.write_all(&vec![0u8; buffer_length - buffer_data.len()])?;

    Ok(())
}

/// Export mesh to GLTF with separate .bin file
fn export_gltf_separate(mesh: &Mesh, path: &Path) -> Result<()> {
    let bin_path = path.with_extension("bin");
    let bin_name = bin_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .context("GLTF path has no file name")?;

    let (gltf, buffer_data) = create_gltf_json(mesh, Some(&bin_name))?;

    let json_string = serde_json::to_string_pretty(&gltf)?;
    std::fs::write(path, json_string)
        .with_context(|| format!("Failed to write GLTF file: {:?}", path))?;
    std::fs::write(&bin_path, buffer_data)
        .with_context(|| format!("Failed to write GLTF buffer: {:?}", bin_path))?;

    Ok(())
}

/// Groups to export; an ungrouped mesh is one group of material 0
fn export_groups(mesh: &Mesh) -> Vec<MaterialGroup> {
    if mesh.groups.is_empty() {
        vec![MaterialGroup {
            start: 0,
            count: mesh.triangle_count(),
            material_index: 0,
        }]
    } else {
        mesh.groups.clone()
    }
}

fn push_f32(buffer: &mut Vec<u8>, value: f64) {
    buffer.extend_from_slice(&(value as f32).to_le_bytes());
}

fn create_gltf_json(mesh: &Mesh, uri: Option<&str>) -> Result<(serde_json::Value, Vec<u8>)> {
    let vertex_count = mesh.vertex_count();
    if vertex_count > u32::MAX as usize {
        anyhow::bail!("mesh has too many vertices for GLTF: {}", vertex_count);
    }

    let mut buffer_data = Vec::new();
    let bounds = mesh.bounding_box();

    let position_offset = buffer_data.len();
    for vertex in &mesh.vertices {
        push_f32(&mut buffer_data, vertex.position.x);
        push_f32(&mut buffer_data, vertex.position.y);
        push_f32(&mut buffer_data, vertex.position.z);
    }
    let position_length = buffer_data.len() - position_offset;

    let normal_offset = buffer_data.len();
    for vertex in &mesh.vertices {
        push_f32(&mut buffer_data, vertex.normal.x);
        push_f32(&mut buffer_data, vertex.normal.y);
        push_f32(&mut buffer_data, vertex.normal.z);
    }
    let normal_length = buffer_data.len() - normal_offset;

    let mut buffer_views = vec![
        json!({
            "buffer": 0,
            "byteOffset": position_offset,
            "byteLength": position_length,
            "target": ARRAY_BUFFER
        }),
        json!({
            "buffer": 0,
            "byteOffset": normal_offset,
            "byteLength": normal_length,
            "target": ARRAY_BUFFER
        }),
    ];
    let mut accessors = vec![
        json!({
            "bufferView": 0,
            "componentType": FLOAT,
            "count": vertex_count,
            "type": "VEC3",
            "min": [bounds.min.x as f32, bounds.min.y as f32, bounds.min.z as f32],
            "max": [bounds.max.x as f32, bounds.max.y as f32, bounds.max.z as f32]
        }),
        json!({
            "bufferView": 1,
            "componentType": FLOAT,
            "count": vertex_count,
            "type": "VEC3"
        }),
    ];

    let groups = export_groups(mesh);
    let mut primitives = Vec::with_capacity(groups.len());
    for group in &groups {
        let offset = buffer_data.len();
        for triangle in &mesh.triangles[group.start..group.start + group.count] {
            for index in triangle.indices {
                buffer_data.extend_from_slice(&(index as u32).to_le_bytes());
            }
        }

        buffer_views.push(json!({
            "buffer": 0,
            "byteOffset": offset,
            "byteLength": buffer_data.len() - offset,
            "target": ELEMENT_ARRAY_BUFFER
        }));
        accessors.push(json!({
            "bufferView": buffer_views.len() - 1,
            "componentType": UNSIGNED_INT,
            "count": group.count * 3,
            "type": "SCALAR"
        }));
        primitives.push(json!({
            "attributes": {
                "POSITION": 0,
                "NORMAL": 1
            },
            "indices": accessors.len() - 1,
            "material": group.material_index,
            "mode": 4
        }));
    }

    let material_count = groups
        .iter()
        .map(|g| g.material_index + 1)
        .max()
        .unwrap_or(1);
    let materials: Vec<serde_json::Value> = (0..material_count)
        .map(|slot| {
            json!({
                "name": format!("slot_{}", slot),
                "pbrMetallicRoughness": {
                    "baseColorFactor": PALETTE[slot % PALETTE.len()],
                    "metallicFactor": 0.0,
                    "roughnessFactor": 0.8
                }
            })
        })
        .collect();

    let mut buffer = json!({ "byteLength": buffer_data.len() });
    if let Some(uri) = uri {
        buffer["uri"] = json!(uri);
    }

    let gltf = json!({
        "asset": {
            "generator": "brushcsg",
            "version": "2.0"
        },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [{ "mesh": 0 }],
        "meshes": [{ "primitives": primitives }],
        "materials": materials,
        "accessors": accessors,
        "bufferViews": buffer_views,
        "buffers": [buffer]
    });

    Ok((gltf, buffer_data))
}

fn align_to_multiple_of_four(n: usize) -> usize {
    (n + 3) & !3
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;
    use tempfile::NamedTempFile;

    #[test]
    fn test_export_glb() -> Result<()> {
        let mesh = Primitive::cube(10.0).to_mesh();

        let file = NamedTempFile::with_suffix(".glb")?;
        export(&mesh, file.path())?;

        let content = std::fs::read(file.path())?;
        assert_eq!(&content[0..4], b"glTF");
        assert_eq!(content.len() % 4, 0);
        let declared = u32::from_le_bytes([content[8], content[9], content[10], content[11]]);
        assert_eq!(declared as usize, content.len());

        Ok(())
    }

    #[test]
    fn test_export_gltf() -> Result<()> {
        let mesh = Primitive::sphere(5.0, 16, 12).to_mesh();

        let dir = tempfile::tempdir()?;
        let path = dir.path().join("sphere.gltf");
        export(&mesh, &path)?;

        let gltf: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(gltf["buffers"][0]["uri"], "sphere.bin");
        let bin = std::fs::read(dir.path().join("sphere.bin"))?;
        assert_eq!(gltf["buffers"][0]["byteLength"], bin.len());

        Ok(())
    }

    #[test]
    fn test_one_primitive_per_group() -> Result<()> {
        let mut mesh = Primitive::cube(2.0).to_mesh();
        for (i, triangle) in mesh.triangles.iter_mut().enumerate() {
            triangle.material = i % 3;
        }
        mesh.build_groups();

        let (gltf, _) = create_gltf_json(&mesh, None)?;
        let primitives = gltf["meshes"][0]["primitives"].as_array().unwrap();
        assert_eq!(primitives.len(), 3);
        assert_eq!(primitives[2]["material"], 2);
        assert_eq!(gltf["materials"].as_array().unwrap().len(), 3);
        assert_eq!(gltf["accessors"][2]["count"], 12);

        Ok(())
    }
}
