//! Error types for Armature

use thiserror::Error;

/// The main error type for Armature operations
#[derive(Debug, Error)]
pub enum ArmatureError {
    #[error("Model declares no scene to traverse")]
    MissingScene,

    #[error("Node index {index} out of range ({node_count} nodes)")]
    NodeOutOfRange { index: usize, node_count: usize },

    #[error("Skin '{skin}': joint {joint} references node {node}, but the model has {node_count} nodes")]
    JointOutOfRange {
        skin: String,
        joint: usize,
        node: usize,
        node_count: usize,
    },

    #[error("Skin '{skin}': {joints} joints but {inverse_bind_matrices} inverse-bind matrices")]
    JointCountMismatch {
        skin: String,
        joints: usize,
        inverse_bind_matrices: usize,
    },

    #[error("Skin '{skin}': inverse-bind buffer holds {got} floats, expected {expected}")]
    InverseBindDataTruncated {
        skin: String,
        expected: usize,
        got: usize,
    },

    #[error("Skin '{skin}': {joints} joints exceeds the configured limit of {max}")]
    TooManyJoints {
        skin: String,
        joints: usize,
        max: usize,
    },

    #[error("Invalid scene graph: {0}")]
    InvalidSceneGraph(String),

    #[error("Transform table has {got} entries, expected {expected}")]
    TransformTableSize { expected: usize, got: usize },

    #[error("Unknown animation clip: {0}")]
    UnknownClip(String),

    #[error("Import error: {0}")]
    ImportError(String),

    #[error("Animation error: {0}")]
    AnimationError(String),

    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),
}

impl ArmatureError {
    /// Structural violations abort skin setup for a model; the model then
    /// renders rigid instead of failing the whole load.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ArmatureError::MissingScene
                | ArmatureError::NodeOutOfRange { .. }
                | ArmatureError::JointOutOfRange { .. }
                | ArmatureError::JointCountMismatch { .. }
                | ArmatureError::InverseBindDataTruncated { .. }
                | ArmatureError::TooManyJoints { .. }
        )
    }
}

/// Result type alias for Armature operations
pub type Result<T> = std::result::Result<T, ArmatureError>;

impl From<toml::de::Error> for ArmatureError {
    fn from(err: toml::de::Error) -> Self {
        ArmatureError::TomlParseError(err.to_string())
    }
}
