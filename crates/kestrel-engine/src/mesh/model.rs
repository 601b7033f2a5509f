use glam::Mat4;

use crate::error::{EngineError, Result};

/// Handle to a GPU mesh owned by the renderer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct MeshId(pub(crate) usize);

impl MeshId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Opaque id returned by `create_mesh_model`. Its index is also the model's
/// slot in the dynamic transform buffer.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ModelId(pub(crate) usize);

impl ModelId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct MeshModel {
    meshes: Vec<MeshId>,
    transform: Mat4,
}

/// One model's worth of draw calls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawItem<'a> {
    /// Slot in the dynamic transform buffer.
    pub object: usize,
    pub transform: Mat4,
    pub meshes: &'a [MeshId],
}

/// Fixed-capacity table of mesh models.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    models: Vec<MeshModel>,
    capacity: usize,
}

impl ModelRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            models: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Adds a model with an identity transform. Rejects the model once
    /// `capacity` models exist.
    pub fn insert(&mut self, meshes: Vec<MeshId>) -> Result<ModelId> {
        if self.models.len() >= self.capacity {
            return Err(EngineError::ObjectCapacityExceeded {
                capacity: self.capacity,
            });
        }
        self.models.push(MeshModel {
            meshes,
            transform: Mat4::IDENTITY,
        });
        Ok(ModelId(self.models.len() - 1))
    }

    /// Overwrites a model's transform. Returns false, changing nothing, for an
    /// unknown id.
    pub fn update(&mut self, id: ModelId, transform: Mat4) -> bool {
        match self.models.get_mut(id.0) {
            Some(m) => {
                m.transform = transform;
                true
            }
            None => false,
        }
    }

    pub fn transform(&self, id: ModelId) -> Option<Mat4> {
        self.models.get(id.0).map(|m| m.transform)
    }

    pub fn meshes(&self, id: ModelId) -> Option<&[MeshId]> {
        self.models.get(id.0).map(|m| m.meshes.as_slice())
    }

    pub fn draw_list(&self) -> Vec<DrawItem<'_>> {
        self.models
            .iter()
            .enumerate()
            .map(|(object, m)| DrawItem {
                object,
                transform: m.transform,
                meshes: &m.meshes,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.models.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn ids_follow_insertion_order() {
        let mut reg = ModelRegistry::new(4);
        let a = reg.insert(vec![MeshId(0)]).unwrap();
        let b = reg.insert(vec![MeshId(1), MeshId(2)]).unwrap();
        assert_eq!((a.index(), b.index()), (0, 1));
        assert_eq!(reg.meshes(b), Some(&[MeshId(1), MeshId(2)][..]));
        assert_eq!(reg.transform(a), Some(Mat4::IDENTITY));
    }

    #[test]
    fn capacity_rejects_extra_models() {
        let mut reg = ModelRegistry::new(2);
        reg.insert(Vec::new()).unwrap();
        reg.insert(Vec::new()).unwrap();
        let err = reg.insert(Vec::new()).unwrap_err();
        assert!(matches!(err, EngineError::ObjectCapacityExceeded { capacity: 2 }));
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn update_unknown_id_is_a_no_op() {
        let mut reg = ModelRegistry::new(2);
        let a = reg.insert(Vec::new()).unwrap();
        assert!(!reg.update(ModelId(7), Mat4::ZERO));
        assert_eq!(reg.transform(a), Some(Mat4::IDENTITY));
    }

    #[test]
    fn draw_list_reflects_last_update() {
        let mut reg = ModelRegistry::new(3);
        let a = reg.insert(vec![MeshId(0)]).unwrap();
        let b = reg.insert(vec![MeshId(1)]).unwrap();
        let t = Mat4::from_translation(Vec3::X);

        reg.update(a, t);
        reg.update(b, t);
        reg.update(a, Mat4::IDENTITY);

        let list = reg.draw_list();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].transform, Mat4::IDENTITY);
        assert_eq!(list[1].transform, t);
        assert_eq!(list[1].object, 1);
    }
}
