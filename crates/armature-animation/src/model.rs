//! A loaded skinned model and its per-frame joint matrix update

use crate::clip::AnimationClip;
use crate::loader::RigDescription;
use crate::scene::SceneGraph;
use crate::skin::{bind_skins, SkinBinding};
use crate::transform::{evaluate_local_transforms, propagate_global_transforms};
use armature_core::{ArmatureConfig, ArmatureError, PlaybackConfig, PoseSource, Result};
use glam::Mat4;

/// A model instance: immutable rig data plus the mutable transform state
/// the skinning update writes.
///
/// Skin binding failures don't fail construction. The model is kept as a
/// rigid model with no skins, and the error is available from
/// [`SkinnedModel::rigid_reason`].
#[derive(Debug)]
pub struct SkinnedModel {
    name: String,
    graph: SceneGraph,
    clips: Vec<AnimationClip>,
    skins: Vec<SkinBinding>,
    /// Global transform table; only allocated when there are skins
    globals: Vec<Mat4>,
    /// Rest-pose locals, used by `PoseSource::Rest`
    rest_locals: Vec<Mat4>,
    playback: PlaybackConfig,
    active_clip: Option<usize>,
    rigid_reason: Option<ArmatureError>,
}

impl SkinnedModel {
    pub fn new(rig: RigDescription, config: &ArmatureConfig) -> Result<Self> {
        let RigDescription {
            name,
            graph,
            skins,
            clips,
        } = rig;

        graph.validate()?;

        let active_clip = match config.playback.pose_source {
            PoseSource::Clip => Some(resolve_clip(&clips, config.playback.clip.as_deref())?),
            _ => None,
        };

        let (skins, rigid_reason) = match bind_skins(&graph, &skins, &config.skinning) {
            Ok(bindings) => (bindings, None),
            Err(e) if e.is_structural() => {
                log::warn!("Model '{}' skin setup failed, drawing rigid: {}", name, e);
                (Vec::new(), Some(e))
            }
            Err(e) => return Err(e),
        };

        let globals = if skins.is_empty() {
            Vec::new()
        } else {
            vec![Mat4::IDENTITY; graph.node_count()]
        };
        let rest_locals = evaluate_local_transforms(&graph);

        log::info!(
            "Loaded model '{}': {} nodes, {} skins, {} clips",
            name,
            graph.node_count(),
            skins.len(),
            clips.len()
        );

        Ok(Self {
            name,
            graph,
            clips,
            skins,
            globals,
            rest_locals,
            playback: config.playback.clone(),
            active_clip,
            rigid_reason,
        })
    }

    /// Recompute global transforms and every skin's joint matrices.
    ///
    /// Propagates from the declared scene roots with an identity parent.
    /// A model without skins does no work.
    pub fn update_skinning(&mut self, locals: &[Mat4]) -> Result<()> {
        if self.skins.is_empty() {
            return Ok(());
        }

        self.globals.fill(Mat4::IDENTITY);
        let roots = self.graph.roots();
        propagate_global_transforms(
            &self.graph,
            locals,
            roots,
            Mat4::IDENTITY,
            &mut self.globals,
        )?;

        for skin in &mut self.skins {
            skin.update_joint_matrices(&self.globals)?;
        }
        Ok(())
    }

    /// Per-frame update at `time` seconds
    pub fn update(&mut self, time: f32) -> Result<()> {
        if self.skins.is_empty() {
            return Ok(());
        }
        let locals = self.current_local_transforms(time);
        self.update_skinning(&locals)
    }

    /// Local transform table the configured pose source yields at `time`
    pub fn current_local_transforms(&self, time: f32) -> Vec<Mat4> {
        match self.playback.pose_source {
            PoseSource::Identity => vec![Mat4::IDENTITY; self.graph.node_count()],
            PoseSource::Rest => self.rest_locals.clone(),
            PoseSource::Clip => match self.active_clip.and_then(|i| self.clips.get(i)) {
                Some(clip) => {
                    clip.sample_local_transforms(&self.graph, self.clip_time(clip, time))
                }
                None => self.rest_locals.clone(),
            },
        }
    }

    fn clip_time(&self, clip: &AnimationClip, time: f32) -> f32 {
        let t = time * self.playback.speed;
        let duration = clip.duration();
        if duration <= 0.0 {
            return 0.0;
        }
        if self.playback.looping {
            t.rem_euclid(duration)
        } else {
            t.clamp(0.0, duration)
        }
    }

    /// Switch `PoseSource::Clip` playback to another clip by name
    pub fn set_active_clip(&mut self, name: &str) -> Result<()> {
        self.active_clip = Some(resolve_clip(&self.clips, Some(name))?);
        Ok(())
    }

    pub fn active_clip(&self) -> Option<&AnimationClip> {
        self.active_clip.and_then(|i| self.clips.get(i))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn clips(&self) -> &[AnimationClip] {
        &self.clips
    }

    pub fn skins(&self) -> &[SkinBinding] {
        &self.skins
    }

    pub fn skin_count(&self) -> usize {
        self.skins.len()
    }

    /// Joint matrices of skin `skin`, in the skin's joint order
    pub fn joint_matrices(&self, skin: usize) -> Option<&[Mat4]> {
        self.skins.get(skin).map(|s| s.joint_matrices.as_slice())
    }

    /// Owned copy of a skin's joint matrices as column arrays
    pub fn joint_matrix_columns(&self, skin: usize) -> Option<Vec<[[f32; 4]; 4]>> {
        self.skins.get(skin).map(SkinBinding::joint_matrix_columns)
    }

    /// Global transforms from the last update; empty for rigid models
    pub fn global_transforms(&self) -> &[Mat4] {
        &self.globals
    }

    pub fn is_rigid(&self) -> bool {
        self.skins.is_empty()
    }

    /// Why skin setup failed, when it did
    pub fn rigid_reason(&self) -> Option<&ArmatureError> {
        self.rigid_reason.as_ref()
    }
}

fn resolve_clip(clips: &[AnimationClip], name: Option<&str>) -> Result<usize> {
    match name {
        Some(name) => clips
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| ArmatureError::UnknownClip(name.to_string())),
        None if clips.is_empty() => Err(ArmatureError::UnknownClip(
            "<first clip> (model has no clips)".to_string(),
        )),
        None => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::{Channel, ChannelProperty, Interpolation};
    use crate::scene::{Node, Scene};
    use crate::skin::{
        bind_pose_globals, decode_inverse_bind_matrices, InverseBindData, SkinDescriptor,
    };
    use armature_core::BindTraversal;
    use glam::Vec3;

    fn chain_nodes() -> Vec<Node> {
        vec![
            Node {
                name: Some("hip".into()),
                translation: vec![0.0, 1.0, 0.0],
                children: vec![1],
                ..Default::default()
            },
            Node {
                name: Some("knee".into()),
                translation: vec![0.0, -0.5, 0.0],
                children: vec![2],
                ..Default::default()
            },
            Node {
                name: Some("foot".into()),
                translation: vec![0.0, -0.5, 0.0],
                ..Default::default()
            },
        ]
    }

    fn leg_graph() -> SceneGraph {
        SceneGraph::new(
            chain_nodes(),
            Some(Scene {
                name: None,
                roots: vec![0],
            }),
        )
    }

    fn leg_rig() -> RigDescription {
        let graph = leg_graph();
        let globals = bind_pose_globals(&graph, BindTraversal::SceneRoots).unwrap();
        let values = globals
            .iter()
            .flat_map(|m| m.inverse().to_cols_array())
            .collect();
        RigDescription {
            name: "leg".into(),
            graph,
            skins: vec![SkinDescriptor {
                name: Some("leg".into()),
                joints: vec![0, 1, 2],
                inverse_bind_matrices: Some(InverseBindData {
                    count: Some(3),
                    values,
                }),
            }],
            clips: vec![AnimationClip {
                name: "kick".into(),
                channels: vec![Channel {
                    node: 0,
                    property: ChannelProperty::Translation,
                    interpolation: Interpolation::Linear,
                    times: vec![0.0, 2.0],
                    values: vec![0.0, 1.0, 0.0, 2.0, 1.0, 0.0],
                }],
            }],
        }
    }

    fn config(pose_source: PoseSource) -> ArmatureConfig {
        let mut config = ArmatureConfig::default();
        config.playback.pose_source = pose_source;
        config
    }

    #[test]
    fn rigid_model_update_is_noop() {
        let rig = RigDescription {
            skins: vec![],
            ..leg_rig()
        };
        let mut model = SkinnedModel::new(rig, &ArmatureConfig::default()).unwrap();
        assert!(model.is_rigid());
        assert!(model.rigid_reason().is_none());
        model.update(1.0).unwrap();
        // Wrong-sized locals aren't even looked at
        model.update_skinning(&[]).unwrap();
        assert!(model.global_transforms().is_empty());
        assert!(model.joint_matrices(0).is_none());
    }

    #[test]
    fn identity_pose_yields_inverse_bind_matrices() {
        let rig = leg_rig();
        let expected: Vec<Mat4> = bind_pose_globals(&rig.graph, BindTraversal::SceneRoots)
            .unwrap()
            .iter()
            .map(|m| m.inverse())
            .collect();

        let mut model = SkinnedModel::new(rig, &config(PoseSource::Identity)).unwrap();
        model.update(0.5).unwrap();

        let joints = model.joint_matrices(0).unwrap();
        for (j, m) in joints.iter().enumerate() {
            assert!(m.abs_diff_eq(expected[j], 1e-5), "joint {}", j);
        }
    }

    #[test]
    fn rest_pose_yields_identity_joint_matrices() {
        let mut model = SkinnedModel::new(leg_rig(), &config(PoseSource::Rest)).unwrap();
        model.update(3.0).unwrap();
        for m in model.joint_matrices(0).unwrap() {
            assert!(m.abs_diff_eq(Mat4::IDENTITY, 1e-5));
        }
        let foot = model.global_transforms()[2].transform_point3(Vec3::ZERO);
        assert!(foot.abs_diff_eq(Vec3::ZERO, 1e-5));
    }

    #[test]
    fn clip_pose_moves_the_whole_chain() {
        let mut model = SkinnedModel::new(leg_rig(), &config(PoseSource::Clip)).unwrap();
        assert_eq!(model.active_clip().map(|c| c.name.as_str()), Some("kick"));

        model.update(1.0).unwrap();
        // Hip translated by +1 in x at t = 1; every joint follows
        for m in model.joint_matrices(0).unwrap() {
            let moved = m.transform_point3(Vec3::ZERO);
            assert!(moved.abs_diff_eq(Vec3::new(1.0, 0.0, 0.0), 1e-5));
        }
    }

    #[test]
    fn clip_time_loops_or_clamps() {
        let mut looping = config(PoseSource::Clip);
        looping.playback.looping = true;
        let model = SkinnedModel::new(leg_rig(), &looping).unwrap();
        let clip = model.active_clip().unwrap();
        assert!((model.clip_time(clip, 2.5) - 0.5).abs() < 1e-6);
        assert!((model.clip_time(clip, -0.5) - 1.5).abs() < 1e-6);

        let mut clamped = config(PoseSource::Clip);
        clamped.playback.looping = false;
        clamped.playback.speed = 2.0;
        let model = SkinnedModel::new(leg_rig(), &clamped).unwrap();
        let clip = model.active_clip().unwrap();
        assert_eq!(model.clip_time(clip, 5.0), 2.0);
        assert_eq!(model.clip_time(clip, 0.5), 1.0);
    }

    #[test]
    fn unknown_clip_fails_construction() {
        let mut cfg = config(PoseSource::Clip);
        cfg.playback.clip = Some("dance".into());
        assert!(matches!(
            SkinnedModel::new(leg_rig(), &cfg),
            Err(ArmatureError::UnknownClip(name)) if name == "dance"
        ));
    }

    #[test]
    fn set_active_clip_by_name() {
        let mut model = SkinnedModel::new(leg_rig(), &config(PoseSource::Clip)).unwrap();
        assert!(model.set_active_clip("kick").is_ok());
        assert!(model.set_active_clip("wave").is_err());
    }

    #[test]
    fn structural_skin_error_makes_model_rigid() {
        let mut rig = leg_rig();
        rig.skins[0].joints.push(9);
        let model = SkinnedModel::new(rig, &ArmatureConfig::default()).unwrap();
        assert!(model.is_rigid());
        assert!(matches!(
            model.rigid_reason(),
            Some(ArmatureError::JointOutOfRange { node: 9, .. })
        ));
    }

    #[test]
    fn default_binding_propagates_from_every_node() {
        let rig = leg_rig();
        let locals = evaluate_local_transforms(&rig.graph);
        let ibms = decode_inverse_bind_matrices(&rig.skins[0]).unwrap();

        let model = SkinnedModel::new(rig, &ArmatureConfig::default()).unwrap();
        // The last pass to reach each joint starts at that joint itself
        let joints = model.joint_matrices(0).unwrap();
        for (j, m) in joints.iter().enumerate() {
            assert!(m.abs_diff_eq(locals[j] * ibms[j], 1e-5), "joint {}", j);
        }
    }

    #[test]
    fn skins_without_scene_bind_under_default_traversal() {
        let mut rig = leg_rig();
        rig.graph.scene = None;
        let model = SkinnedModel::new(rig, &ArmatureConfig::default()).unwrap();
        assert!(!model.is_rigid());
        assert!(model.rigid_reason().is_none());
    }

    #[test]
    fn skins_without_scene_are_rigid_under_scene_roots() {
        let mut rig = leg_rig();
        rig.graph.scene = None;
        let mut cfg = ArmatureConfig::default();
        cfg.skinning.bind_traversal = BindTraversal::SceneRoots;
        let model = SkinnedModel::new(rig, &cfg).unwrap();
        assert!(matches!(model.rigid_reason(), Some(ArmatureError::MissingScene)));
    }

    #[test]
    fn invalid_graph_is_fatal() {
        let mut rig = leg_rig();
        rig.graph.nodes[2].children = vec![0];
        assert!(matches!(
            SkinnedModel::new(rig, &ArmatureConfig::default()),
            Err(ArmatureError::InvalidSceneGraph(_))
        ));
    }

    #[test]
    fn wrong_sized_locals_rejected() {
        let mut model = SkinnedModel::new(leg_rig(), &ArmatureConfig::default()).unwrap();
        assert!(matches!(
            model.update_skinning(&[Mat4::IDENTITY; 2]),
            Err(ArmatureError::TransformTableSize {
                expected: 3,
                got: 2
            })
        ));
    }

    #[test]
    fn columns_are_an_owned_snapshot() {
        let mut model = SkinnedModel::new(leg_rig(), &config(PoseSource::Rest)).unwrap();
        model.update(0.0).unwrap();
        let snapshot = model.joint_matrix_columns(0).unwrap();
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot[0], Mat4::IDENTITY.to_cols_array_2d());
        assert!(model.joint_matrix_columns(1).is_none());
    }
}
