//! Skin binding: joints, inverse-bind matrices and joint matrix computation
//!
//! The joint matrix pipeline:
//! 1. Decode one inverse-bind matrix per joint from the flat column-major buffer
//! 2. Evaluate local transforms for every node in the model
//! 3. Propagate global transforms down the hierarchy
//! 4. Final: `joint_matrices[j] = global[joints[j]] * inverse_bind_matrices[j]`
//! 5. `joint_matrices` is what the deformation stage uploads

use crate::scene::SceneGraph;
use crate::transform::{evaluate_local_transforms, propagate_global_transforms};
use armature_core::{ArmatureError, BindTraversal, Result, SkinningConfig};
use glam::Mat4;
use serde::{Deserialize, Serialize};

/// Raw inverse-bind data: 16 column-major floats per matrix
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InverseBindData {
    /// Declared element count; inferred from `values` when absent
    #[serde(default)]
    pub count: Option<usize>,
    pub values: Vec<f32>,
}

impl InverseBindData {
    pub fn declared_count(&self) -> usize {
        self.count.unwrap_or(self.values.len() / 16)
    }
}

/// A skin as described by the asset, before binding
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkinDescriptor {
    #[serde(default)]
    pub name: Option<String>,
    /// Joint node indices; this order defines the joint matrix order
    pub joints: Vec<usize>,
    /// Absent means every inverse-bind matrix is the identity
    #[serde(default)]
    pub inverse_bind_matrices: Option<InverseBindData>,
}

impl SkinDescriptor {
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| "<unnamed>".to_string())
    }

    pub fn from_imported(imported: &armature_import::ImportedSkin) -> Self {
        let inverse_bind_matrices = imported.inverse_bind_count.map(|count| InverseBindData {
            count: Some(count),
            values: imported.inverse_bind_values.clone(),
        });
        Self {
            name: imported.name.clone(),
            joints: imported.joints.clone(),
            inverse_bind_matrices,
        }
    }
}

/// Decode exactly `joints.len()` inverse-bind matrices.
///
/// A declared count that differs from the joint count is an error; the
/// data is never truncated or padded to fit.
pub fn decode_inverse_bind_matrices(skin: &SkinDescriptor) -> Result<Vec<Mat4>> {
    let joint_count = skin.joints.len();
    let Some(data) = &skin.inverse_bind_matrices else {
        return Ok(vec![Mat4::IDENTITY; joint_count]);
    };

    let declared = data.declared_count();
    if declared != joint_count {
        return Err(ArmatureError::JointCountMismatch {
            skin: skin.display_name(),
            joints: joint_count,
            inverse_bind_matrices: declared,
        });
    }

    let expected = declared * 16;
    let ragged = data.count.is_none() && data.values.len() % 16 != 0;
    if data.values.len() < expected || ragged {
        return Err(ArmatureError::InverseBindDataTruncated {
            skin: skin.display_name(),
            expected: expected.max(data.values.len().next_multiple_of(16)),
            got: data.values.len(),
        });
    }

    Ok(data.values[..expected]
        .chunks_exact(16)
        .map(Mat4::from_cols_slice)
        .collect())
}

/// A bound skin: static inverse-bind data plus the live joint matrices.
///
/// `joint_matrices` is allocated once at bind time and only ever
/// overwritten in place.
#[derive(Debug, Clone)]
pub struct SkinBinding {
    pub name: String,
    /// Node count of the graph this skin was bound against
    node_count: usize,
    pub joints: Vec<usize>,
    pub inverse_bind_matrices: Vec<Mat4>,
    /// Global transform of each joint from the last update
    pub global_joint_transforms: Vec<Mat4>,
    /// GPU-ready joint matrices (global * inverse_bind)
    pub joint_matrices: Vec<Mat4>,
}

impl SkinBinding {
    fn new(
        name: String,
        node_count: usize,
        joints: Vec<usize>,
        inverse_bind_matrices: Vec<Mat4>,
    ) -> Self {
        let count = joints.len();
        Self {
            name,
            node_count,
            joints,
            inverse_bind_matrices,
            global_joint_transforms: vec![Mat4::IDENTITY; count],
            joint_matrices: vec![Mat4::IDENTITY; count],
        }
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Recompute joint matrices from a global transform table.
    ///
    /// `globals` must have one entry per node of the bound graph; binding
    /// already checked every joint index against that count.
    pub fn update_joint_matrices(&mut self, globals: &[Mat4]) -> Result<()> {
        if globals.len() != self.node_count {
            return Err(ArmatureError::TransformTableSize {
                expected: self.node_count,
                got: globals.len(),
            });
        }
        for (j, &node) in self.joints.iter().enumerate() {
            let global = *globals.get(node).ok_or(ArmatureError::NodeOutOfRange {
                index: node,
                node_count: globals.len(),
            })?;
            self.global_joint_transforms[j] = global;
            self.joint_matrices[j] = global * self.inverse_bind_matrices[j];
        }
        Ok(())
    }

    /// Joint matrices as column arrays, ready for a uniform upload
    pub fn joint_matrix_columns(&self) -> Vec<[[f32; 4]; 4]> {
        self.joint_matrices
            .iter()
            .map(|m| m.to_cols_array_2d())
            .collect()
    }
}

/// Global transforms of the bind pose
pub fn bind_pose_globals(graph: &SceneGraph, traversal: BindTraversal) -> Result<Vec<Mat4>> {
    let locals = evaluate_local_transforms(graph);
    let mut globals = vec![Mat4::IDENTITY; graph.node_count()];

    match traversal {
        BindTraversal::SceneRoots => {
            let scene = graph.scene.as_ref().ok_or(ArmatureError::MissingScene)?;
            propagate_global_transforms(
                graph,
                &locals,
                &scene.roots,
                Mat4::IDENTITY,
                &mut globals,
            )?;
        }
        BindTraversal::EveryNode => {
            for index in 0..graph.node_count() {
                propagate_global_transforms(
                    graph,
                    &locals,
                    &[index],
                    Mat4::IDENTITY,
                    &mut globals,
                )?;
            }
        }
    }

    Ok(globals)
}

fn bind_with_globals(
    graph: &SceneGraph,
    skin: &SkinDescriptor,
    globals: &[Mat4],
    max_joints: Option<usize>,
) -> Result<SkinBinding> {
    let name = skin.display_name();
    let node_count = graph.node_count();

    if let Some(max) = max_joints {
        if skin.joints.len() > max {
            return Err(ArmatureError::TooManyJoints {
                skin: name,
                joints: skin.joints.len(),
                max,
            });
        }
    }

    if let Some((joint, &node)) = skin
        .joints
        .iter()
        .enumerate()
        .find(|&(_, &node)| node >= node_count)
    {
        return Err(ArmatureError::JointOutOfRange {
            skin: name,
            joint,
            node,
            node_count,
        });
    }

    let inverse_bind_matrices = decode_inverse_bind_matrices(skin)?;
    let mut binding =
        SkinBinding::new(name, node_count, skin.joints.clone(), inverse_bind_matrices);
    binding.update_joint_matrices(globals)?;
    Ok(binding)
}

/// Bind a single skin against the model's bind pose
pub fn bind_skin(
    graph: &SceneGraph,
    skin: &SkinDescriptor,
    traversal: BindTraversal,
) -> Result<SkinBinding> {
    let globals = bind_pose_globals(graph, traversal)?;
    bind_with_globals(graph, skin, &globals, None)
}

/// Bind every skin of a model, all or nothing.
///
/// A model without skins yields an empty list and is treated as rigid.
pub fn bind_skins(
    graph: &SceneGraph,
    skins: &[SkinDescriptor],
    config: &SkinningConfig,
) -> Result<Vec<SkinBinding>> {
    if skins.is_empty() {
        log::info!("Model has no skins; skipping skinning setup");
        return Ok(Vec::new());
    }

    let globals = bind_pose_globals(graph, config.bind_traversal)?;
    skins
        .iter()
        .map(|skin| bind_with_globals(graph, skin, &globals, config.max_joints))
        .collect()
}
