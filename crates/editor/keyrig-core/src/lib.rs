//! Keyrig Core (engine-agnostic)
//!
//! Keyframe track storage and pose reconstruction for a skeletal animation editor.
//! The crate owns the animation data (per-bone keyframe tracks), the interpolator that
//! rebuilds a pose at any time, the companion auto-keying policy, and the editing session
//! that keeps the live pose, the track store and an external renderer in sync.
//! Rendering, asset decoding and UI live outside and are reached through [`PoseRenderer`].

pub mod clip;
pub mod config;
pub mod data;
pub mod debounce;
pub mod error;
pub mod exchange;
pub mod interp;
pub mod keying;
pub mod outputs;
pub mod renderer;
pub mod sampling;
pub mod session;
pub mod skeleton;
pub mod track;

// Re-exports for consumers (adapters)
pub use clip::{AnimationClip, ClipChannel, ClipFormat, ClipTrack};
pub use config::Config;
pub use data::{BoneTransform, Keyframe, LivePose, Quat, TrackStore, Vec3};
pub use debounce::Debouncer;
pub use error::{EditorError, Result};
pub use exchange::{
    generate_animation_json, keyframes_from_clip, parse_animation_json, AnimationDocument,
    DocumentTrack, ImportReport,
};
pub use interp::functions::{angle_between, euler_deg_to_quat, quat_to_euler_deg, slerp_quat};
pub use keying::{set_keyframe, KeyingOutcome, KeyingParams};
pub use outputs::SessionEvent;
pub use renderer::PoseRenderer;
pub use sampling::{sample_bone, sample_skeleton};
pub use session::{EditorSession, Phase, RotationAxis};
pub use skeleton::{BoneInfo, Skeleton};
pub use track::{find_at_time, remove_at_time, upsert};
