//! Armature CLI - Inspect and validate skinned rigs

mod commands;

use anyhow::{Context, Result};
use armature_core::ArmatureConfig;
use clap::{Parser, Subcommand};
use commands::{inspect, validate};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "armature")]
#[command(about = "Skeletal skinning diagnostics for glTF and .rig.toml rigs", long_about = None)]
#[command(version)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.armature/config.toml then ./armature.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load a rig, run one skinning update and print the result
    Inspect {
        /// Path to a .gltf, .glb or .rig.toml file
        path: PathBuf,

        /// Time in seconds passed to the update
        #[arg(long, default_value = "0.0")]
        time: f32,

        /// Pose source override (identity, rest or clip)
        #[arg(long)]
        pose: Option<String>,

        /// Clip to play when the pose source is `clip`
        #[arg(long)]
        clip: Option<String>,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Check a rig's scene graph, skins and clips
    Validate {
        /// Path to a .gltf, .glb or .rig.toml file
        path: PathBuf,

        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<ArmatureConfig> {
    match path {
        Some(path) => ArmatureConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => ArmatureConfig::load().context("Failed to load config"),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Commands::Inspect {
            path,
            time,
            pose,
            clip,
            format,
        } => inspect::run(
            inspect::InspectArgs {
                path,
                time,
                pose,
                clip,
                format,
            },
            config,
        ),
        Commands::Validate { path, format } => validate::run(&path, &format, &config),
    }
}
