//! Keyframe insertion with companion auto-keying.
//!
//! Setting a key on the selected bone also keys every other bone whose live rotation has
//! drifted from what its curve evaluates to at the key time. Without that, an un-keyed
//! manual pose would snap back to the curve on the next evaluation.
//!
//! Every decision reads the same pre-update snapshot of the store; the batch is then
//! committed in one step. Cost is one interpolation per live-pose entry.

use crate::data::{sanitize_quat, sanitize_vec3, Keyframe, LivePose, TrackStore, Vec3};
use crate::interp::functions::{angle_between, euler_deg_to_quat};
use crate::sampling::sample_bone;
use crate::skeleton::Skeleton;

/// Tolerances used by [`set_keyframe`].
#[derive(Clone, Copy, Debug)]
pub struct KeyingParams {
    pub time_tolerance: f64,
    pub rotation_epsilon: f64,
}

impl Default for KeyingParams {
    fn default() -> Self {
        Self {
            time_tolerance: crate::track::TIME_TOLERANCE,
            rotation_epsilon: 1e-3,
        }
    }
}

/// Bones that received a key, the selected bone first, companions sorted by name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct KeyingOutcome {
    pub keyed: Vec<String>,
}

impl KeyingOutcome {
    pub fn companions(&self) -> &[String] {
        self.keyed.get(1..).unwrap_or(&[])
    }
}

/// Key `bone` at `time` with the rotation given as intrinsic XYZ Euler degrees, plus any
/// drifted companions. Returns the new store; `store` is left untouched.
pub fn set_keyframe(
    bone: &str,
    time: f64,
    rotation_euler_deg: Vec3,
    store: &TrackStore,
    live: &LivePose,
    skeleton: &Skeleton,
    params: KeyingParams,
) -> (TrackStore, KeyingOutcome) {
    let rotation = euler_deg_to_quat(rotation_euler_deg);
    let position = live
        .get(bone)
        .map(|t| t.position)
        .unwrap_or_else(|| skeleton.rest(bone).position);
    let mut deltas: Vec<(String, Keyframe)> = vec![(
        bone.to_string(),
        Keyframe::new(time, Some(sanitize_vec3(position)), Some(rotation)),
    )];

    let mut companions: Vec<(String, Keyframe)> = live
        .iter()
        .filter(|(name, _)| *name != bone)
        .filter_map(|(name, pose)| {
            let curve = sample_bone(store, name, time, skeleton.rest(name));
            let drift = angle_between(curve.quaternion, pose.quaternion);
            (drift > params.rotation_epsilon).then(|| {
                (
                    name.to_string(),
                    Keyframe::new(
                        time,
                        Some(sanitize_vec3(pose.position)),
                        Some(sanitize_quat(pose.quaternion)),
                    ),
                )
            })
        })
        .collect();
    companions.sort_by(|a, b| a.0.cmp(&b.0));
    deltas.extend(companions);

    let mut next = store.clone();
    let mut outcome = KeyingOutcome::default();
    for (name, kf) in deltas {
        next.upsert(&name, kf, params.time_tolerance);
        outcome.keyed.push(name);
    }
    log::debug!(
        "keying: '{}' at {:.4}s with {} companion(s)",
        bone,
        time,
        outcome.companions().len()
    );
    (next, outcome)
}
