//! Rig inspection command

use anyhow::{Context, Result};
use armature_animation::transform::hierarchy;
use armature_animation::{load_rig_from_file, SkinnedModel};
use armature_core::{ArmatureConfig, PoseSource};
use glam::{Mat4, Vec3};
use std::path::PathBuf;

pub struct InspectArgs {
    pub path: PathBuf,
    pub time: f32,
    pub pose: Option<String>,
    pub clip: Option<String>,
    pub format: String,
}

pub fn run(args: InspectArgs, mut config: ArmatureConfig) -> Result<()> {
    if let Some(pose) = &args.pose {
        config.playback.pose_source = pose
            .parse::<PoseSource>()
            .with_context(|| format!("Invalid --pose '{}'", pose))?;
    }
    if let Some(clip) = args.clip {
        config.playback.clip = Some(clip);
    }

    let rig = load_rig_from_file(&args.path)
        .with_context(|| format!("Failed to load rig {}", args.path.display()))?;
    let mut model = SkinnedModel::new(rig, &config)?;
    model.update(args.time)?;

    if args.format == "json" {
        print_json(&model, &config, args.time)
    } else {
        print_text(&model, &config, args.time)
    }
}

fn origin(m: &Mat4) -> Vec3 {
    m.transform_point3(Vec3::ZERO)
}

fn print_text(model: &SkinnedModel, config: &ArmatureConfig, time: f32) -> Result<()> {
    let graph = model.graph();
    println!("Model: {}", model.name());
    println!("  Nodes: {}", graph.node_count());
    println!("  Pose source: {} (t = {:.3}s)", config.playback.pose_source, time);

    match &graph.scene {
        Some(scene) => {
            println!("\nHierarchy:");
            for (index, depth) in hierarchy(graph, &scene.roots)? {
                println!(
                    "  {}{} [{}]",
                    "  ".repeat(depth),
                    graph.nodes[index].display_name(index),
                    index
                );
            }
        }
        None => println!("\nNo scene declared"),
    }

    if !model.clips().is_empty() {
        println!("\nClips:");
        for clip in model.clips() {
            let marker = match model.active_clip() {
                Some(active) if active.name == clip.name => " (active)",
                _ => "",
            };
            println!(
                "  {} - {:.3}s, {} channels{}",
                clip.name,
                clip.duration(),
                clip.channels.len(),
                marker
            );
        }
    }

    if model.is_rigid() {
        match model.rigid_reason() {
            Some(reason) => println!("\nRigid model (skin setup failed): {}", reason),
            None => println!("\nRigid model (no skins)"),
        }
        return Ok(());
    }

    for skin in model.skins() {
        println!("\nSkin '{}': {} joints", skin.name, skin.joint_count());
        for (j, (&node, matrix)) in skin.joints.iter().zip(&skin.joint_matrices).enumerate() {
            let p = origin(matrix);
            println!(
                "  [{:>3}] {:<24} offset ({:>8.4}, {:>8.4}, {:>8.4})",
                j,
                graph.nodes[node].display_name(node),
                p.x,
                p.y,
                p.z
            );
        }
    }

    Ok(())
}

fn print_json(model: &SkinnedModel, config: &ArmatureConfig, time: f32) -> Result<()> {
    let graph = model.graph();

    let skins: Vec<serde_json::Value> = model
        .skins()
        .iter()
        .map(|skin| {
            serde_json::json!({
                "name": skin.name,
                "joints": skin.joints,
                "joint_matrices": skin.joint_matrix_columns(),
            })
        })
        .collect();

    let clips: Vec<serde_json::Value> = model
        .clips()
        .iter()
        .map(|clip| {
            serde_json::json!({
                "name": clip.name,
                "duration": clip.duration(),
                "channels": clip.channels.len(),
            })
        })
        .collect();

    let output = serde_json::json!({
        "name": model.name(),
        "nodes": graph.node_count(),
        "roots": graph.roots(),
        "pose_source": config.playback.pose_source.to_string(),
        "time": time,
        "rigid": model.is_rigid(),
        "rigid_reason": model.rigid_reason().map(|e| e.to_string()),
        "clips": clips,
        "skins": skins,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
