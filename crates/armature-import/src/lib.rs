//! Armature Import - glTF rig reader
//!
//! Reads only what the skinning pipeline needs from a glTF/GLB file:
//! the node hierarchy, the scene's root list, skins and animation channels.
//! Meshes, materials and textures are left to the renderer.

mod gltf_import;
mod types;

pub use gltf_import::{import_gltf, import_gltf_slice};
pub use types::{
    ImportedAnimation, ImportedChannel, ImportedInterpolation, ImportedNode, ImportedProperty,
    ImportedRig, ImportedScene, ImportedSkin,
};
