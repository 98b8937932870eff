//! Mesh payload: geometry, material slots, skinning and morph state.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::geometry::Geometry;

use super::skin::SkinBinding;

/// Material slot referenced by draw groups.
///
/// Shading is handled by the renderer; the optimizer only moves materials
/// between meshes, so they are shared through `Arc`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Material {
    pub name: Option<String>,
}

impl Material {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
        }
    }
}

/// Morph target influences and the name → target index dictionary.
///
/// Both are shared by reference: meshes split from one source animate
/// together when the influences change.
#[derive(Debug, Clone, Default)]
pub struct MorphState {
    pub influences: Arc<RwLock<Vec<f32>>>,
    pub dictionary: Arc<BTreeMap<String, usize>>,
}

impl MorphState {
    /// Build zeroed influences and a dictionary from the geometry's morph targets.
    ///
    /// Target names come from the first morph attribute; unnamed targets are
    /// addressed by their index.
    pub fn from_geometry(geometry: &Geometry) -> Option<Self> {
        let (_, targets) = geometry.morph_attributes().next()?;
        let dictionary = targets
            .iter()
            .enumerate()
            .map(|(i, t)| (t.name.clone().unwrap_or_else(|| i.to_string()), i))
            .collect();
        Some(Self {
            influences: Arc::new(RwLock::new(vec![0.0; geometry.morph_target_count()])),
            dictionary: Arc::new(dictionary),
        })
    }

    /// Current influence of a named target.
    pub fn influence(&self, name: &str) -> Option<f32> {
        let index = *self.dictionary.get(name)?;
        self.influences.read().get(index).copied()
    }

    /// Set the influence of a named target. Returns `false` for unknown names.
    pub fn set_influence(&self, name: &str, value: f32) -> bool {
        let Some(&index) = self.dictionary.get(name) else {
            return false;
        };
        match self.influences.write().get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Check if two states share the same underlying storage.
    pub fn shares_storage_with(&self, other: &MorphState) -> bool {
        Arc::ptr_eq(&self.influences, &other.influences)
            && Arc::ptr_eq(&self.dictionary, &other.dictionary)
    }
}

/// A renderable mesh.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    /// Geometry exclusively owned by this mesh.
    pub geometry: Geometry,
    /// Material slots; a group's `material_index` indexes this list.
    pub materials: Vec<Arc<Material>>,
    /// Skeleton binding, if the mesh is skinned.
    pub skin: Option<SkinBinding>,
    /// Morph influences, if the mesh has morph targets.
    pub morph: Option<MorphState>,
}

impl Mesh {
    /// Create a mesh over `geometry` with the given material slots.
    pub fn new(geometry: Geometry, materials: Vec<Arc<Material>>) -> Self {
        Self {
            geometry,
            materials,
            skin: None,
            morph: None,
        }
    }

    /// Set the skin binding.
    #[must_use]
    pub fn with_skin(mut self, skin: SkinBinding) -> Self {
        self.skin = Some(skin);
        self
    }

    /// Set the morph state.
    #[must_use]
    pub fn with_morph(mut self, morph: MorphState) -> Self {
        self.morph = Some(morph);
        self
    }

    /// Get the skin binding, if any.
    pub fn skin(&self) -> Option<&SkinBinding> {
        self.skin.as_ref()
    }

    pub fn is_skinned(&self) -> bool {
        self.skin.is_some()
    }

    /// Get the material in slot `index`.
    pub fn material(&self, index: usize) -> Option<&Arc<Material>> {
        self.materials.get(index)
    }
}
