//! Vertex layout, GPU meshes, model import and the model registry.

mod import;
#[allow(clippy::module_inception)]
mod mesh;
mod model;
mod vertex;

pub use import::{ImportedModel, MeshImporter, ObjImporter, resolve_texture_path, to_clockwise};
pub use mesh::{Mesh, MeshData};
pub use model::{DrawItem, MeshId, ModelId, ModelRegistry};
pub use vertex::Vertex;
