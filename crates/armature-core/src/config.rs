//! Layered configuration system
//!
//! Config is loaded with three layers of precedence (highest wins):
//! 1. Environment variables: `ARMATURE_POSE_SOURCE`, `ARMATURE_CLIP`,
//!    `ARMATURE_BIND_TRAVERSAL`
//! 2. Project-local: `armature.toml`
//! 3. Global: `~/.armature/config.toml`

use crate::error::{ArmatureError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// How bind-time global transforms are propagated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindTraversal {
    /// Propagate from every node index in order with an identity parent,
    /// later passes overwriting earlier ones
    #[default]
    EveryNode,
    /// Propagate from the declared scene roots only
    SceneRoots,
}

impl FromStr for BindTraversal {
    type Err = ArmatureError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "scene_roots" => Ok(BindTraversal::SceneRoots),
            "every_node" => Ok(BindTraversal::EveryNode),
            other => Err(ArmatureError::ConfigError(format!(
                "unknown bind traversal '{}' (expected scene_roots or every_node)",
                other
            ))),
        }
    }
}

/// Where `update(time)` takes its per-frame local transform table from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoseSource {
    /// All-identity table every frame. Keyframe data is never sampled, so
    /// joint matrices collapse to the inverse-bind matrices.
    #[default]
    Identity,
    /// Rest-pose local transforms taken from the node TRS / matrix fields
    Rest,
    /// Sample the configured animation clip at the update time
    Clip,
}

impl FromStr for PoseSource {
    type Err = ArmatureError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "identity" => Ok(PoseSource::Identity),
            "rest" => Ok(PoseSource::Rest),
            "clip" => Ok(PoseSource::Clip),
            other => Err(ArmatureError::ConfigError(format!(
                "unknown pose source '{}' (expected identity, rest or clip)",
                other
            ))),
        }
    }
}

impl fmt::Display for PoseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PoseSource::Identity => "identity",
            PoseSource::Rest => "rest",
            PoseSource::Clip => "clip",
        };
        f.write_str(name)
    }
}

/// Skin binding settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkinningConfig {
    #[serde(default)]
    pub bind_traversal: BindTraversal,
    /// Upper bound on joints per skin (size of the shader's uniform array)
    #[serde(default)]
    pub max_joints: Option<usize>,
}

/// Playback settings for `update(time)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default)]
    pub pose_source: PoseSource,
    /// Clip name for `PoseSource::Clip`; the first clip when unset
    #[serde(default)]
    pub clip: Option<String>,
    #[serde(default = "default_true")]
    pub looping: bool,
    #[serde(default = "default_speed")]
    pub speed: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            pose_source: PoseSource::default(),
            clip: None,
            looping: true,
            speed: default_speed(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_speed() -> f32 {
    1.0
}

/// `[skinning]` as it appears in a config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkinningConfigFile {
    #[serde(default)]
    pub bind_traversal: Option<BindTraversal>,
    #[serde(default)]
    pub max_joints: Option<usize>,
}

/// `[playback]` as it appears in a config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaybackConfigFile {
    #[serde(default)]
    pub pose_source: Option<PoseSource>,
    #[serde(default)]
    pub clip: Option<String>,
    #[serde(default)]
    pub looping: Option<bool>,
    #[serde(default)]
    pub speed: Option<f32>,
}

/// Config file structure; every field optional so partial files overlay
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArmatureConfigFile {
    #[serde(default)]
    pub skinning: Option<SkinningConfigFile>,
    #[serde(default)]
    pub playback: Option<PlaybackConfigFile>,
}

/// Resolved configuration with environment overrides applied
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArmatureConfig {
    pub skinning: SkinningConfig,
    pub playback: PlaybackConfig,
}

impl ArmatureConfig {
    /// Load config with layered precedence: global < project < env vars
    pub fn load() -> Result<Self> {
        let mut config = ArmatureConfig::default();

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                config.merge(Self::load_file(&global_path)?);
            }
        }

        let local_path = PathBuf::from("armature.toml");
        if local_path.exists() {
            config.merge(Self::load_file(&local_path)?);
        }

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load config from a specific file path only, then apply env overrides
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let mut config = ArmatureConfig::default();
        config.merge(Self::load_file(path)?);
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a config from a TOML string (no env overrides)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let file: ArmatureConfigFile = toml::from_str(content)?;
        let mut config = ArmatureConfig::default();
        config.merge(file);
        Ok(config)
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".armature").join("config.toml"))
    }

    fn load_file(path: &Path) -> Result<ArmatureConfigFile> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            ArmatureError::ConfigError(format!("Failed to parse config {}: {}", path.display(), e))
        })
    }

    /// Overlay the fields a file sets; unset fields keep the lower layer
    fn merge(&mut self, overlay: ArmatureConfigFile) {
        if let Some(skinning) = overlay.skinning {
            if let Some(bind_traversal) = skinning.bind_traversal {
                self.skinning.bind_traversal = bind_traversal;
            }
            if skinning.max_joints.is_some() {
                self.skinning.max_joints = skinning.max_joints;
            }
        }
        if let Some(playback) = overlay.playback {
            if let Some(pose_source) = playback.pose_source {
                self.playback.pose_source = pose_source;
            }
            if playback.clip.is_some() {
                self.playback.clip = playback.clip;
            }
            if let Some(looping) = playback.looping {
                self.playback.looping = looping;
            }
            if let Some(speed) = playback.speed {
                self.playback.speed = speed;
            }
        }
    }

    /// Apply overrides from an environment lookup.
    ///
    /// Takes the lookup as a closure so tests don't have to touch the
    /// process environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("ARMATURE_POSE_SOURCE") {
            self.playback.pose_source = value.parse()?;
        }
        if let Some(value) = lookup("ARMATURE_CLIP") {
            self.playback.clip = Some(value);
        }
        if let Some(value) = lookup("ARMATURE_BIND_TRAVERSAL") {
            self.skinning.bind_traversal = value.parse()?;
        }
        Ok(())
    }
}
