//! Rig loading from glTF/GLB or `.rig.toml` files

use crate::clip::AnimationClip;
use crate::scene::{Node, Scene, SceneGraph};
use crate::skin::SkinDescriptor;
use armature_core::{ArmatureError, Result};
use serde::Deserialize;
use std::path::Path;

/// Everything needed to build a skinned model
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RigDescription {
    pub name: String,
    pub graph: SceneGraph,
    pub skins: Vec<SkinDescriptor>,
    pub clips: Vec<AnimationClip>,
}

impl RigDescription {
    /// Convert from imported glTF data
    pub fn from_imported(imported: &armature_import::ImportedRig) -> Self {
        Self {
            name: imported.name.clone(),
            graph: SceneGraph::from_imported(imported),
            skins: imported.skins.iter().map(SkinDescriptor::from_imported).collect(),
            clips: imported
                .animations
                .iter()
                .map(AnimationClip::from_imported)
                .collect(),
        }
    }

    pub fn joint_count(&self) -> usize {
        self.skins.iter().map(|s| s.joints.len()).sum()
    }

    pub fn find_clip(&self, name: &str) -> Option<&AnimationClip> {
        self.clips.iter().find(|c| c.name == name)
    }

    /// Check the graph and every clip channel against it
    pub fn validate(&self) -> Result<()> {
        self.graph.validate()?;
        let node_count = self.graph.node_count();
        for clip in &self.clips {
            for (i, channel) in clip.channels.iter().enumerate() {
                channel.validate(node_count).map_err(|e| {
                    ArmatureError::AnimationError(format!(
                        "Clip '{}' channel {}: {}",
                        clip.name, i, e
                    ))
                })?;
            }
        }
        Ok(())
    }
}

/// On-disk layout of a `.rig.toml` file
#[derive(Debug, Deserialize)]
struct RigFile {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    nodes: Vec<Node>,
    #[serde(default)]
    scene: Option<Scene>,
    #[serde(default)]
    skins: Vec<SkinDescriptor>,
    #[serde(default)]
    clips: Vec<AnimationClip>,
}

/// Load a rig, dispatching on the file extension.
///
/// `.gltf` and `.glb` go through the glTF importer; anything else is parsed
/// as a `.rig.toml` file:
/// ```toml
/// name = "arm"
///
/// [scene]
/// roots = [0]
///
/// [[nodes]]
/// name = "shoulder"
/// children = [1]
///
/// [[nodes]]
/// name = "elbow"
/// translation = [0.0, 1.0, 0.0]
///
/// [[skins]]
/// joints = [0, 1]
///
/// [[clips]]
/// name = "bend"
///
/// [[clips.channels]]
/// node = 1
/// property = "rotation"
/// times = [0.0, 1.0]
/// values = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.7071, 0.7071]
/// ```
pub fn load_rig_from_file(path: &Path) -> Result<RigDescription> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("gltf") | Some("glb") => {
            let imported = armature_import::import_gltf(path)?;
            Ok(RigDescription::from_imported(&imported))
        }
        _ => {
            let content = std::fs::read_to_string(path).map_err(|e| {
                ArmatureError::ImportError(format!("Failed to read {}: {}", path.display(), e))
            })?;
            load_rig_from_str(&content, path)
        }
    }
}

/// Parse a rig from `.rig.toml` content
pub fn load_rig_from_str(content: &str, path: &Path) -> Result<RigDescription> {
    let file: RigFile = toml::from_str(content).map_err(|e| {
        ArmatureError::TomlParseError(format!("Failed to parse {}: {}", path.display(), e))
    })?;

    let name = file.name.unwrap_or_else(|| rig_name_from_path(path));
    let node_count = file.nodes.len();

    // Clip channels are checked at load; structural skin problems are left
    // for binding, which degrades the model to rigid instead of failing.
    for clip in &file.clips {
        for (i, channel) in clip.channels.iter().enumerate() {
            channel.validate(node_count).map_err(|e| {
                ArmatureError::AnimationError(format!(
                    "Clip '{}' channel {} in {}: {}",
                    clip.name,
                    i,
                    path.display(),
                    e
                ))
            })?;
        }
    }

    Ok(RigDescription {
        name,
        graph: SceneGraph::new(file.nodes, file.scene),
        skins: file.skins,
        clips: file.clips,
    })
}

fn rig_name_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unnamed");
    stem.strip_suffix(".rig").unwrap_or(stem).to_string()
}
