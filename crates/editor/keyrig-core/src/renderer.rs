//! Renderer capability consumed by the editing session.
//!
//! The session never stores renderer objects. Adapters (wasm, native viewers) implement
//! [`PoseRenderer`] over their scene graph and pass it into each session call that needs it.
//! Rest transforms are not read through here; they come from the [`crate::Skeleton`] captured
//! at model load.

use crate::clip::AnimationClip;
use crate::data::{BoneTransform, LivePose};

pub trait PoseRenderer {
    /// Push a full pose onto the skeleton.
    fn apply_pose(&mut self, pose: &LivePose);

    /// Current local transform of a bone as the renderer sees it.
    fn bone_transform(&self, bone: &str) -> Option<BoneTransform>;

    /// Start looping playback of `clip` from the beginning.
    fn play_clip(&mut self, clip: &AnimationClip);

    fn pause(&mut self);

    fn resume(&mut self);

    /// Halt playback and release the clip.
    fn stop(&mut self);
}
