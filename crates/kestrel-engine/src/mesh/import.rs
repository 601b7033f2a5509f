use std::path::{Path, PathBuf};

use crate::error::{EngineError, Result};

use super::mesh::MeshData;
use super::vertex::Vertex;

/// Everything the engine needs from one model file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportedModel {
    pub meshes: Vec<MeshData>,
    /// Diffuse texture per material, already resolved against the model's
    /// directory. `None` means untextured.
    pub material_textures: Vec<Option<PathBuf>>,
}

/// Parses a model file into triangle lists in the engine's clockwise winding.
pub trait MeshImporter {
    fn import(&self, path: &Path) -> Result<ImportedModel>;
}

/// Wavefront OBJ importer backed by `tobj`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjImporter;

impl MeshImporter for ObjImporter {
    fn import(&self, path: &Path) -> Result<ImportedModel> {
        let options = tobj::LoadOptions {
            single_index: true,
            triangulate: true,
            ..Default::default()
        };
        let (models, materials) = tobj::load_obj(path, &options).map_err(|e| EngineError::Import {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let materials = materials.unwrap_or_else(|e| {
            log::warn!("{}: materials unavailable ({e}), using defaults", path.display());
            Vec::new()
        });
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        let material_textures = materials
            .iter()
            .map(|m| {
                m.diffuse_texture
                    .as_deref()
                    .filter(|t| !t.is_empty())
                    .map(|t| resolve_texture_path(base, t))
            })
            .collect();

        let meshes = models
            .into_iter()
            .filter(|m| !m.mesh.indices.is_empty())
            .map(|m| convert_mesh(&m.mesh))
            .collect();

        Ok(ImportedModel {
            meshes,
            material_textures,
        })
    }
}

/// Material paths are relative to the model file, and are often written with
/// Windows separators.
pub fn resolve_texture_path(model_dir: &Path, texture: &str) -> PathBuf {
    let normalized = texture.replace('\\', "/");
    model_dir.join(normalized)
}

/// Converts counter-clockwise triangles to clockwise by swapping the last two
/// indices of each triangle.
pub fn to_clockwise(indices: &mut [u32]) {
    for tri in indices.chunks_exact_mut(3) {
        tri.swap(1, 2);
    }
}

fn convert_mesh(mesh: &tobj::Mesh) -> MeshData {
    let count = mesh.positions.len() / 3;
    let has_colours = mesh.vertex_color.len() >= count * 3;
    let has_uvs = mesh.texcoords.len() >= count * 2;

    let vertices = (0..count)
        .map(|i| Vertex {
            position: [
                mesh.positions[3 * i],
                mesh.positions[3 * i + 1],
                mesh.positions[3 * i + 2],
            ],
            colour: if has_colours {
                [
                    mesh.vertex_color[3 * i],
                    mesh.vertex_color[3 * i + 1],
                    mesh.vertex_color[3 * i + 2],
                ]
            } else {
                [1.0, 1.0, 1.0]
            },
            // OBJ puts v = 0 at the bottom of the image.
            tex_coord: if has_uvs {
                [mesh.texcoords[2 * i], 1.0 - mesh.texcoords[2 * i + 1]]
            } else {
                [0.0, 0.0]
            },
        })
        .collect();

    let mut indices = mesh.indices.clone();
    to_clockwise(&mut indices);

    MeshData {
        vertices,
        indices,
        material: mesh.material_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("kestrel-import-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    // ── winding ───────────────────────────────────────────────────────────

    #[test]
    fn winding_swaps_last_two_indices() {
        let mut idx = [0, 1, 2, 2, 3, 0];
        to_clockwise(&mut idx);
        assert_eq!(idx, [0, 2, 1, 2, 0, 3]);
    }

    #[test]
    fn texture_path_is_relative_to_model() {
        let p = resolve_texture_path(Path::new("models/crate"), "tex\\wood.png");
        assert_eq!(p, Path::new("models/crate/tex/wood.png"));
    }

    // ── obj ───────────────────────────────────────────────────────────────

    #[test]
    fn imports_triangle_with_material() {
        let dir = temp_dir("tri");
        std::fs::write(
            dir.join("tri.mtl"),
            "newmtl painted\nKd 1 1 1\nmap_Kd wood.png\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("tri.obj"),
            "mtllib tri.mtl\n\
             v 0 0 0\nv 1 0 0\nv 0 1 0\n\
             vt 0 0\nvt 1 0\nvt 0 1\n\
             usemtl painted\n\
             f 1/1 2/2 3/3\n",
        )
        .unwrap();

        let model = ObjImporter.import(&dir.join("tri.obj")).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(model.meshes.len(), 1);
        let mesh = &model.meshes[0];
        assert_eq!(mesh.vertices.len(), 3);
        assert_eq!(mesh.indices, [0, 2, 1]);
        assert_eq!(mesh.material, Some(0));
        assert_eq!(mesh.vertices[0].colour, [1.0, 1.0, 1.0]);
        assert_eq!(mesh.vertices[0].tex_coord, [0.0, 1.0]);
        assert_eq!(model.material_textures, [Some(dir.join("wood.png"))]);
    }

    #[test]
    fn quads_are_triangulated() {
        let dir = temp_dir("quad");
        std::fs::write(
            dir.join("quad.obj"),
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n",
        )
        .unwrap();

        let model = ObjImporter.import(&dir.join("quad.obj")).unwrap();
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(model.meshes[0].indices.len(), 6);
        assert_eq!(model.meshes[0].material, None);
        assert!(model.material_textures.is_empty());
    }

    #[test]
    fn missing_file_is_import_error() {
        let err = ObjImporter.import(Path::new("no/such/model.obj")).unwrap_err();
        assert!(matches!(err, EngineError::Import { .. }));
    }
}
