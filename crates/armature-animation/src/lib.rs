//! Skeletal skinning for Armature
//!
//! Turns a loaded scene graph plus skin data into per-joint matrices for a
//! vertex-skinning stage:
//! - **Scene graph**: flat node array with child lists and declared roots
//! - **Transforms**: local TRS/matrix evaluation and top-down propagation
//! - **Skins**: joint lists, inverse-bind matrices, joint matrix computation
//! - **Clips**: keyframe lookup and TRS channel sampling
//!
//! `SkinnedModel` ties these together for one model instance, and
//! `SkinningSystem` drives many instances from a shared clock.

pub mod clip;
pub mod keyframe;
pub mod loader;
pub mod model;
pub mod sampler;
pub mod scene;
pub mod skin;
pub mod system;
pub mod transform;

pub use clip::{AnimationClip, Channel, ChannelProperty, Interpolation};
pub use keyframe::find_bracketing_keyframe;
pub use loader::{load_rig_from_file, load_rig_from_str, RigDescription};
pub use model::SkinnedModel;
pub use sampler::{sample_channel, ChannelValue};
pub use scene::{Node, Scene, SceneGraph};
pub use skin::{
    bind_skin, bind_skins, decode_inverse_bind_matrices, InverseBindData, SkinBinding,
    SkinDescriptor,
};
pub use system::SkinningSystem;
pub use transform::{
    evaluate_global_transforms, evaluate_local_transform, evaluate_local_transforms,
    propagate_global_transforms, NodePose,
};
