//! Animation clips: per-node TRS channels over keyframe time arrays

use crate::sampler::sample_local_transforms;
use crate::scene::SceneGraph;
use armature_core::{ArmatureError, Result};
use glam::Mat4;
use serde::{Deserialize, Serialize};

/// Which node property a channel animates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelProperty {
    Translation,
    Rotation,
    Scale,
}

impl ChannelProperty {
    /// Floats per keyframe value (4 for quaternions)
    pub fn components(self) -> usize {
        match self {
            ChannelProperty::Rotation => 4,
            ChannelProperty::Translation | ChannelProperty::Scale => 3,
        }
    }
}

/// How to interpolate between keyframes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    Step,
    #[default]
    Linear,
    /// Values are stored as `[in_tangent, value, out_tangent]` triples
    CubicSpline,
}

/// Keyframed values for one property of one node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub node: usize,
    pub property: ChannelProperty,
    #[serde(default)]
    pub interpolation: Interpolation,
    /// Non-decreasing keyframe times in seconds
    pub times: Vec<f32>,
    /// Flattened values, `components()` floats per keyframe
    /// (three times that for cubic splines)
    pub values: Vec<f32>,
}

impl Channel {
    /// Floats stored per keyframe
    pub fn stride(&self) -> usize {
        let components = self.property.components();
        match self.interpolation {
            Interpolation::CubicSpline => components * 3,
            _ => components,
        }
    }

    pub fn keyframe_count(&self) -> usize {
        self.times.len()
    }

    /// Check time ordering, value buffer length and target node
    pub fn validate(&self, node_count: usize) -> Result<()> {
        if self.node >= node_count {
            return Err(ArmatureError::AnimationError(format!(
                "channel targets node {} but the model has {} nodes",
                self.node, node_count
            )));
        }
        if self.times.is_empty() {
            return Err(ArmatureError::AnimationError(format!(
                "channel for node {} has no keyframes",
                self.node
            )));
        }
        if self.times.windows(2).any(|w| w[1] < w[0]) {
            return Err(ArmatureError::AnimationError(format!(
                "channel for node {} has decreasing keyframe times",
                self.node
            )));
        }
        let expected = self.times.len() * self.stride();
        if self.values.len() != expected {
            return Err(ArmatureError::AnimationError(format!(
                "channel for node {} has {} values, expected {}",
                self.node,
                self.values.len(),
                expected
            )));
        }
        Ok(())
    }
}

/// A complete animation clip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationClip {
    pub name: String,
    #[serde(default)]
    pub channels: Vec<Channel>,
}

impl AnimationClip {
    /// Latest keyframe time across all channels
    pub fn duration(&self) -> f32 {
        self.channels
            .iter()
            .filter_map(|c| c.times.last().copied())
            .fold(0.0, f32::max)
    }

    /// Rest-pose local transforms with this clip's channels applied at `time`
    pub fn sample_local_transforms(&self, graph: &SceneGraph, time: f32) -> Vec<Mat4> {
        sample_local_transforms(self, graph, time)
    }

    /// Convert from imported glTF data
    pub fn from_imported(imported: &armature_import::ImportedAnimation) -> Self {
        let channels = imported
            .channels
            .iter()
            .map(|ch| {
                let property = match ch.property {
                    armature_import::ImportedProperty::Translation => ChannelProperty::Translation,
                    armature_import::ImportedProperty::Rotation => ChannelProperty::Rotation,
                    armature_import::ImportedProperty::Scale => ChannelProperty::Scale,
                };
                let interpolation = match ch.interpolation {
                    armature_import::ImportedInterpolation::Step => Interpolation::Step,
                    armature_import::ImportedInterpolation::Linear => Interpolation::Linear,
                    armature_import::ImportedInterpolation::CubicSpline => {
                        Interpolation::CubicSpline
                    }
                };
                Channel {
                    node: ch.node,
                    property,
                    interpolation,
                    times: ch.times.clone(),
                    values: ch.values.clone(),
                }
            })
            .collect();

        Self {
            name: imported.name.clone(),
            channels,
        }
    }
}
