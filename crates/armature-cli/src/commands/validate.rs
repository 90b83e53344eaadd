//! Rig validation command

use anyhow::{Context, Result};
use armature_animation::{bind_skins, load_rig_from_file, RigDescription};
use armature_core::ArmatureConfig;
use std::path::Path;

struct Problem {
    subject: String,
    message: String,
    /// Structural problems leave the model drawable, just rigid
    rigid_only: bool,
}

pub fn run(path: &Path, format: &str, config: &ArmatureConfig) -> Result<()> {
    let rig = load_rig_from_file(path)
        .with_context(|| format!("Failed to load rig {}", path.display()))?;

    let problems = check(&rig, config);

    if format == "json" {
        print_json(&rig, &problems)?;
    } else {
        print_text(&rig, &problems);
    }

    if !problems.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

fn check(rig: &RigDescription, config: &ArmatureConfig) -> Vec<Problem> {
    let mut problems = Vec::new();

    if let Err(e) = rig.validate() {
        problems.push(Problem {
            subject: "scene graph".to_string(),
            message: e.to_string(),
            rigid_only: false,
        });
        // Binding walks the graph; a broken graph says nothing useful about skins
        return problems;
    }

    for skin in &rig.skins {
        if let Err(e) = bind_skins(&rig.graph, std::slice::from_ref(skin), &config.skinning) {
            problems.push(Problem {
                subject: format!("skin '{}'", skin.display_name()),
                message: e.to_string(),
                rigid_only: e.is_structural(),
            });
        }
    }

    problems
}

fn print_text(rig: &RigDescription, problems: &[Problem]) {
    println!(
        "{}: {} nodes, {} skins ({} joints), {} clips",
        rig.name,
        rig.graph.node_count(),
        rig.skins.len(),
        rig.joint_count(),
        rig.clips.len()
    );

    if problems.is_empty() {
        println!("All checks passed.");
        return;
    }

    println!();
    for problem in problems {
        let severity = if problem.rigid_only { "WARN " } else { "ERROR" };
        println!("  [{}] {}: {}", severity, problem.subject, problem.message);
    }
}

fn print_json(rig: &RigDescription, problems: &[Problem]) -> Result<()> {
    let items: Vec<serde_json::Value> = problems
        .iter()
        .map(|p| {
            serde_json::json!({
                "subject": p.subject,
                "message": p.message,
                "severity": if p.rigid_only { "warning" } else { "error" },
            })
        })
        .collect();

    let output = serde_json::json!({
        "name": rig.name,
        "valid": problems.is_empty(),
        "nodes": rig.graph.node_count(),
        "skins": rig.skins.len(),
        "joints": rig.joint_count(),
        "clips": rig.clips.len(),
        "problems": items,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
