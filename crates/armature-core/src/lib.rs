//! Armature Core - Foundational types for the Armature skinning pipeline
//!
//! This crate provides the types that all other Armature crates depend on:
//! - `ArmatureError` and the `Result` alias
//! - `ArmatureConfig` - layered TOML configuration
//! - `ModelId` - identifiers for loaded model instances

mod config;
mod error;
mod id;

pub use config::{
    ArmatureConfig, ArmatureConfigFile, BindTraversal, PlaybackConfig, PlaybackConfigFile,
    PoseSource, SkinningConfig, SkinningConfigFile,
};
pub use error::{ArmatureError, Result};
pub use id::ModelId;
