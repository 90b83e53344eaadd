//! Multi-instance skinning: many models advanced by one clock

use crate::model::SkinnedModel;
use armature_core::{ModelId, Result};
use glam::Mat4;
use std::collections::BTreeMap;

/// Owns every live model instance and drives their per-frame update
#[derive(Debug, Default)]
pub struct SkinningSystem {
    models: BTreeMap<ModelId, SkinnedModel>,
    elapsed: f64,
}

impl SkinningSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model and return its id
    pub fn add_model(&mut self, model: SkinnedModel) -> ModelId {
        let id = ModelId::new();
        log::debug!("Registered model '{}' as {}", model.name(), id);
        self.models.insert(id, model);
        id
    }

    pub fn remove_model(&mut self, id: ModelId) -> Option<SkinnedModel> {
        self.models.remove(&id)
    }

    pub fn get(&self, id: ModelId) -> Option<&SkinnedModel> {
        self.models.get(&id)
    }

    pub fn get_mut(&mut self, id: ModelId) -> Option<&mut SkinnedModel> {
        self.models.get_mut(&id)
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    pub fn ids(&self) -> impl Iterator<Item = ModelId> + '_ {
        self.models.keys().copied()
    }

    /// Seconds since the system was created or last cleared
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Advance the clock by `dt` seconds and update every model once
    pub fn update(&mut self, dt: f64) -> Result<()> {
        self.elapsed += dt;
        let time = self.elapsed as f32;
        for model in self.models.values_mut() {
            model.update(time)?;
        }
        Ok(())
    }

    pub fn joint_matrices(&self, id: ModelId, skin: usize) -> Option<&[Mat4]> {
        self.models.get(&id)?.joint_matrices(skin)
    }

    /// Drop every model and reset the clock
    pub fn clear(&mut self) {
        self.models.clear();
        self.elapsed = 0.0;
    }
}
