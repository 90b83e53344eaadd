//! glTF/GLB rig importer

use crate::types::{
    ImportedAnimation, ImportedChannel, ImportedInterpolation, ImportedNode, ImportedProperty,
    ImportedRig, ImportedScene, ImportedSkin,
};
use armature_core::{ArmatureError, Result};
use gltf::animation::util::ReadOutputs;
use std::path::Path;

/// Import the rig data from a glTF or GLB file
pub fn import_gltf<P: AsRef<Path>>(path: P) -> Result<ImportedRig> {
    let path = path.as_ref();
    let (document, buffers, _images) = gltf::import(path)
        .map_err(|e| ArmatureError::ImportError(format!("Failed to import glTF: {}", e)))?;

    let name = path
        .file_stem()
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string();

    let rig = read_document(&document, &buffers, name);
    log::info!(
        "Imported rig '{}' from {}: {} nodes, {} skins ({} joints), {} animations",
        rig.name,
        path.display(),
        rig.nodes.len(),
        rig.skins.len(),
        rig.joint_count(),
        rig.animations.len()
    );
    Ok(rig)
}

/// Import the rig data from an in-memory glTF JSON or GLB blob
pub fn import_gltf_slice(bytes: &[u8]) -> Result<ImportedRig> {
    let (document, buffers, _images) = gltf::import_slice(bytes)
        .map_err(|e| ArmatureError::ImportError(format!("Failed to import glTF: {}", e)))?;
    Ok(read_document(&document, &buffers, "unnamed".to_string()))
}

fn read_document(
    document: &gltf::Document,
    buffers: &[gltf::buffer::Data],
    name: String,
) -> ImportedRig {
    let nodes = document.nodes().map(read_node).collect();

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .map(|scene| ImportedScene {
            name: scene.name().map(String::from),
            roots: scene.nodes().map(|n| n.index()).collect(),
        });

    let skins = document
        .skins()
        .map(|skin| {
            let reader = skin.reader(|buffer| buffers.get(buffer.index()).map(|d| d.0.as_slice()));
            let inverse_bind_values: Vec<f32> = reader
                .read_inverse_bind_matrices()
                .map(|iter| iter.flat_map(|m| m.into_iter().flatten()).collect())
                .unwrap_or_default();

            ImportedSkin {
                name: skin.name().map(String::from),
                joints: skin.joints().map(|j| j.index()).collect(),
                inverse_bind_count: skin.inverse_bind_matrices().map(|a| a.count()),
                inverse_bind_values,
            }
        })
        .collect();

    let animations = document
        .animations()
        .map(|animation| {
            let anim_name = animation
                .name()
                .map(String::from)
                .unwrap_or_else(|| format!("animation_{}", animation.index()));

            let channels = animation
                .channels()
                .filter_map(|channel| read_channel(&channel, buffers, &anim_name))
                .collect();

            ImportedAnimation {
                name: anim_name,
                channels,
            }
        })
        .collect();

    ImportedRig {
        name,
        nodes,
        scene,
        skins,
        animations,
    }
}

fn read_node(node: gltf::Node) -> ImportedNode {
    let children = node.children().map(|c| c.index()).collect();
    let name = node.name().map(String::from);

    match node.transform() {
        gltf::scene::Transform::Matrix { matrix } => ImportedNode {
            name,
            matrix: matrix.into_iter().flatten().collect(),
            children,
            ..Default::default()
        },
        gltf::scene::Transform::Decomposed {
            translation,
            rotation,
            scale,
        } => ImportedNode {
            name,
            matrix: Vec::new(),
            translation: translation.to_vec(),
            rotation: rotation.to_vec(),
            scale: scale.to_vec(),
            children,
        },
    }
}

fn read_channel(
    channel: &gltf::animation::Channel,
    buffers: &[gltf::buffer::Data],
    anim_name: &str,
) -> Option<ImportedChannel> {
    let reader = channel.reader(|buffer| buffers.get(buffer.index()).map(|d| d.0.as_slice()));

    let times: Vec<f32> = reader.read_inputs()?.collect();

    let (property, values): (ImportedProperty, Vec<f32>) = match reader.read_outputs()? {
        ReadOutputs::Translations(iter) => (
            ImportedProperty::Translation,
            iter.flat_map(|v| v.into_iter()).collect(),
        ),
        ReadOutputs::Rotations(rotations) => (
            ImportedProperty::Rotation,
            rotations.into_f32().flat_map(|v| v.into_iter()).collect(),
        ),
        ReadOutputs::Scales(iter) => (
            ImportedProperty::Scale,
            iter.flat_map(|v| v.into_iter()).collect(),
        ),
        ReadOutputs::MorphTargetWeights(_) => {
            log::debug!(
                "Skipping morph-target channel in '{}' (not part of skinning)",
                anim_name
            );
            return None;
        }
    };

    let interpolation = match channel.sampler().interpolation() {
        gltf::animation::Interpolation::Step => ImportedInterpolation::Step,
        gltf::animation::Interpolation::Linear => ImportedInterpolation::Linear,
        gltf::animation::Interpolation::CubicSpline => ImportedInterpolation::CubicSpline,
    };

    Some(ImportedChannel {
        node: channel.target().node().index(),
        property,
        interpolation,
        times,
        values,
    })
}
