//! Import result types

/// Everything the skinning pipeline reads from one glTF document
#[derive(Debug, Clone, Default)]
pub struct ImportedRig {
    /// File stem, or "unnamed" for in-memory imports
    pub name: String,
    pub nodes: Vec<ImportedNode>,
    /// The default scene, or the first scene when none is marked default
    pub scene: Option<ImportedScene>,
    pub skins: Vec<ImportedSkin>,
    pub animations: Vec<ImportedAnimation>,
}

impl ImportedRig {
    /// Total joints across all skins
    pub fn joint_count(&self) -> usize {
        self.skins.iter().map(|s| s.joints.len()).sum()
    }
}

/// A node from the glTF scene graph.
///
/// Either `matrix` holds 16 column-major floats, or it is empty and the
/// TRS vectors describe the local transform.
#[derive(Debug, Clone, Default)]
pub struct ImportedNode {
    pub name: Option<String>,
    pub matrix: Vec<f32>,
    pub translation: Vec<f32>,
    pub rotation: Vec<f32>, // quaternion [x, y, z, w]
    pub scale: Vec<f32>,
    pub children: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct ImportedScene {
    pub name: Option<String>,
    pub roots: Vec<usize>,
}

/// A skin: joint node indices plus the raw inverse-bind accessor
#[derive(Debug, Clone)]
pub struct ImportedSkin {
    pub name: Option<String>,
    pub joints: Vec<usize>,
    /// Declared element count of the inverse-bind accessor, if present
    pub inverse_bind_count: Option<usize>,
    /// Flat column-major floats, 16 per matrix
    pub inverse_bind_values: Vec<f32>,
}

/// Which node property a channel animates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportedProperty {
    Translation,
    Rotation,
    Scale,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportedInterpolation {
    Step,
    Linear,
    CubicSpline,
}

/// One channel: keyframe times and flattened output values
#[derive(Debug, Clone)]
pub struct ImportedChannel {
    pub node: usize,
    pub property: ImportedProperty,
    pub interpolation: ImportedInterpolation,
    pub times: Vec<f32>,
    pub values: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct ImportedAnimation {
    pub name: String,
    pub channels: Vec<ImportedChannel>,
}
