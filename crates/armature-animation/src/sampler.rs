//! Channel sampling with quaternion slerp and cubic Hermite splines

use crate::clip::{AnimationClip, Channel, ChannelProperty, Interpolation};
use crate::keyframe::find_bracketing_keyframe;
use crate::scene::SceneGraph;
use crate::transform::{evaluate_local_transform, NodePose};
use glam::{Mat4, Quat, Vec3};
use std::collections::BTreeMap;

/// A sampled channel value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChannelValue {
    Translation(Vec3),
    Rotation(Quat),
    Scale(Vec3),
}

impl ChannelValue {
    fn from_slice(property: ChannelProperty, v: &[f32]) -> Self {
        match property {
            ChannelProperty::Translation => ChannelValue::Translation(Vec3::new(v[0], v[1], v[2])),
            ChannelProperty::Rotation => {
                ChannelValue::Rotation(Quat::from_xyzw(v[0], v[1], v[2], v[3]).normalize())
            }
            ChannelProperty::Scale => ChannelValue::Scale(Vec3::new(v[0], v[1], v[2])),
        }
    }

    /// Write this value into a pose
    pub fn apply(&self, pose: &mut NodePose) {
        match *self {
            ChannelValue::Translation(t) => pose.translation = t,
            ChannelValue::Rotation(r) => pose.rotation = r,
            ChannelValue::Scale(s) => pose.scale = s,
        }
    }
}

/// Sample a channel at `time`.
///
/// Clamps to the first/last keyframe outside the key range. Returns `None`
/// for an empty channel or a value buffer too short for its keyframes.
pub fn sample_channel(channel: &Channel, time: f32) -> Option<ChannelValue> {
    let times = &channel.times;
    let count = times.len();
    let components = channel.property.components();
    let stride = channel.stride();
    if count == 0 || channel.values.len() < count * stride {
        return None;
    }

    let cubic = channel.interpolation == Interpolation::CubicSpline;
    // Offset of the value inside a keyframe's stride
    let value_offset = if cubic { components } else { 0 };
    let value = |k: usize| {
        let base = k * stride + value_offset;
        &channel.values[base..base + components]
    };

    if count == 1 || time <= times[0] {
        return Some(ChannelValue::from_slice(channel.property, value(0)));
    }
    if time >= times[count - 1] {
        return Some(ChannelValue::from_slice(channel.property, value(count - 1)));
    }

    let i = find_bracketing_keyframe(times, time)?;
    let span = times[i + 1] - times[i];
    if span <= 0.0 {
        return Some(ChannelValue::from_slice(channel.property, value(i)));
    }
    let t = (time - times[i]) / span;

    let sampled = match channel.interpolation {
        Interpolation::Step => return Some(ChannelValue::from_slice(channel.property, value(i))),
        Interpolation::Linear => {
            let (a, b) = (value(i), value(i + 1));
            if channel.property == ChannelProperty::Rotation {
                let q = slerp_shortest(
                    Quat::from_xyzw(a[0], a[1], a[2], a[3]),
                    Quat::from_xyzw(b[0], b[1], b[2], b[3]),
                    t,
                );
                return Some(ChannelValue::Rotation(q));
            }
            (0..components).map(|c| a[c] + (b[c] - a[c]) * t).collect::<Vec<f32>>()
        }
        Interpolation::CubicSpline => {
            let out_tangent = &channel.values[i * stride + 2 * components..(i + 1) * stride];
            let in_tangent = &channel.values[(i + 1) * stride..(i + 1) * stride + components];
            cubic_hermite(value(i), out_tangent, value(i + 1), in_tangent, span, t)
        }
    };

    Some(ChannelValue::from_slice(channel.property, &sampled))
}

/// Slerp along the shorter arc, renormalized
pub fn slerp_shortest(a: Quat, b: Quat, t: f32) -> Quat {
    let b = if a.dot(b) < 0.0 { -b } else { b };
    a.slerp(b, t).normalize()
}

/// Cubic Hermite spline, glTF style.
///
/// `p0`, `m0`: start value and outgoing tangent
/// `p1`, `m1`: end value and incoming tangent
/// `dt`: interval length (tangents are per second)
/// `t`: normalized [0..1] parameter
pub fn cubic_hermite(
    p0: &[f32],
    m0: &[f32],
    p1: &[f32],
    m1: &[f32],
    dt: f32,
    t: f32,
) -> Vec<f32> {
    let t2 = t * t;
    let t3 = t2 * t;

    let h00 = 2.0 * t3 - 3.0 * t2 + 1.0;
    let h10 = t3 - 2.0 * t2 + t;
    let h01 = -2.0 * t3 + 3.0 * t2;
    let h11 = t3 - t2;

    (0..p0.len())
        .map(|i| h00 * p0[i] + h10 * dt * m0[i] + h01 * p1[i] + h11 * dt * m1[i])
        .collect()
}

/// Local transforms for every node with `clip` applied at `time`.
///
/// Nodes no channel targets keep their rest transform verbatim (including
/// explicit matrices); targeted nodes start from their decomposed rest pose.
pub fn sample_local_transforms(clip: &AnimationClip, graph: &SceneGraph, time: f32) -> Vec<Mat4> {
    let mut locals: Vec<Mat4> = graph.nodes.iter().map(evaluate_local_transform).collect();
    let mut poses: BTreeMap<usize, NodePose> = BTreeMap::new();

    for channel in &clip.channels {
        let Some(node) = graph.nodes.get(channel.node) else {
            log::debug!(
                "Clip '{}' targets missing node {}",
                clip.name,
                channel.node
            );
            continue;
        };
        let Some(value) = sample_channel(channel, time) else {
            continue;
        };
        let pose = poses
            .entry(channel.node)
            .or_insert_with(|| NodePose::rest(node));
        value.apply(pose);
    }

    for (index, pose) in poses {
        locals[index] = pose.to_mat4();
    }
    locals
}
