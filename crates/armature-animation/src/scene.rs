//! Scene graph: a flat node array forming a forest under the scene's roots

use armature_core::{ArmatureError, Result};
use serde::{Deserialize, Serialize};

/// A single node of the scene graph.
///
/// When `matrix` holds exactly 16 column-major values it is authoritative
/// and the TRS fields are ignored. Otherwise the local transform is
/// `translation * rotation * scale`, with vectors of the wrong length
/// treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub matrix: Vec<f32>,
    #[serde(default)]
    pub translation: Vec<f32>,
    /// Quaternion `[x, y, z, w]`, scalar part last
    #[serde(default)]
    pub rotation: Vec<f32>,
    #[serde(default)]
    pub scale: Vec<f32>,
    #[serde(default)]
    pub children: Vec<usize>,
}

impl Node {
    /// Whether an explicit matrix overrides the TRS fields
    pub fn has_matrix(&self) -> bool {
        self.matrix.len() == 16
    }

    pub fn display_name(&self, index: usize) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("node_{}", index))
    }
}

/// The declared scene: the roots from which per-frame propagation starts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub name: Option<String>,
    pub roots: Vec<usize>,
}

/// Immutable node hierarchy of a loaded model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneGraph {
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub scene: Option<Scene>,
}

impl SceneGraph {
    pub fn new(nodes: Vec<Node>, scene: Option<Scene>) -> Self {
        Self { nodes, scene }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Root indices of the declared scene (empty when there is no scene)
    pub fn roots(&self) -> &[usize] {
        self.scene.as_ref().map(|s| s.roots.as_slice()).unwrap_or(&[])
    }

    /// Parent of every node, derived from the child lists
    pub fn parents(&self) -> Vec<Option<usize>> {
        let mut parents = vec![None; self.nodes.len()];
        for (index, node) in self.nodes.iter().enumerate() {
            for &child in &node.children {
                if let Some(slot) = parents.get_mut(child) {
                    *slot = Some(index);
                }
            }
        }
        parents
    }

    /// One-time structural validation, run before any traversal.
    ///
    /// Checks that every child and root index is in range, that no node has
    /// two parents, that no root is also a child, and that the child graph
    /// has no cycles.
    pub fn validate(&self) -> Result<()> {
        let node_count = self.nodes.len();
        let mut parents: Vec<Option<usize>> = vec![None; node_count];

        for (index, node) in self.nodes.iter().enumerate() {
            for &child in &node.children {
                if child >= node_count {
                    return Err(ArmatureError::NodeOutOfRange {
                        index: child,
                        node_count,
                    });
                }
                if child == index {
                    return Err(ArmatureError::InvalidSceneGraph(format!(
                        "node {} lists itself as a child",
                        index
                    )));
                }
                if let Some(existing) = parents[child] {
                    return Err(ArmatureError::InvalidSceneGraph(format!(
                        "node {} has two parents ({} and {})",
                        child, existing, index
                    )));
                }
                parents[child] = Some(index);
            }
        }

        // With single parents, a cycle shows up as an ancestor chain that
        // loops back on itself. Each node is marked once, so this is linear.
        const UNSEEN: u8 = 0;
        const ON_CHAIN: u8 = 1;
        const DONE: u8 = 2;
        let mut marks = vec![UNSEEN; node_count];
        let mut chain = Vec::new();
        for start in 0..node_count {
            let mut current = Some(start);
            while let Some(index) = current {
                match marks[index] {
                    DONE => break,
                    ON_CHAIN => {
                        return Err(ArmatureError::InvalidSceneGraph(format!(
                            "cycle through node {}",
                            index
                        )))
                    }
                    _ => {
                        marks[index] = ON_CHAIN;
                        chain.push(index);
                        current = parents[index];
                    }
                }
            }
            for index in chain.drain(..) {
                marks[index] = DONE;
            }
        }

        if let Some(scene) = &self.scene {
            let mut seen = vec![false; node_count];
            for &root in &scene.roots {
                if root >= node_count {
                    return Err(ArmatureError::NodeOutOfRange {
                        index: root,
                        node_count,
                    });
                }
                if let Some(parent) = parents[root] {
                    return Err(ArmatureError::InvalidSceneGraph(format!(
                        "scene root {} is a child of node {}",
                        root, parent
                    )));
                }
                if std::mem::replace(&mut seen[root], true) {
                    return Err(ArmatureError::InvalidSceneGraph(format!(
                        "scene root {} listed twice",
                        root
                    )));
                }
            }
        }

        Ok(())
    }

    /// Build from imported glTF data
    pub fn from_imported(imported: &armature_import::ImportedRig) -> Self {
        let nodes = imported
            .nodes
            .iter()
            .map(|n| Node {
                name: n.name.clone(),
                matrix: n.matrix.clone(),
                translation: n.translation.clone(),
                rotation: n.rotation.clone(),
                scale: n.scale.clone(),
                children: n.children.clone(),
            })
            .collect();

        let scene = imported.scene.as_ref().map(|s| Scene {
            name: s.name.clone(),
            roots: s.roots.clone(),
        });

        Self { nodes, scene }
    }
}
