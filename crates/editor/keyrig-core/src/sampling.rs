//! Pose reconstruction from the track store.
//!
//! Model:
//! - Position and rotation are sampled independently; each uses only the keys that carry it.
//! - Before the first key of a channel the bone's rest value is held (no backward extrapolation).
//! - On or after the last key the last value is held.
//! - Between two keys: lerp for position, shortest-arc slerp for rotation, with
//!   t = clamp((time - t0) / (t1 - t0), 0, 1) and t = 0 when t0 == t1.
//! - Outputs are always finite; non-finite key data is read as identity/zero.
//!
//! API:
//! - sample_bone(&TrackStore, bone, time, rest)
//! - sample_skeleton(&TrackStore, &Skeleton, time)

use crate::data::{sanitize_quat, sanitize_vec3, BoneTransform, Keyframe, LivePose, TrackStore};
use crate::interp::functions::{lerp_vec3, slerp_quat};
use crate::skeleton::Skeleton;

/// Bracketing keys for `time` among the keys where `channel` is present:
/// the last one at or before `time` and the first one after it.
fn bracket<T: Copy>(
    track: &[Keyframe],
    time: f64,
    channel: impl Fn(&Keyframe) -> Option<T>,
) -> (Option<(f64, T)>, Option<(f64, T)>) {
    let mut before = None;
    let mut after = None;
    for kf in track {
        let Some(value) = channel(kf) else {
            continue;
        };
        if kf.time <= time {
            before = Some((kf.time, value));
        } else {
            after = Some((kf.time, value));
            break;
        }
    }
    (before, after)
}

#[inline]
fn segment_t(t0: f64, t1: f64, time: f64) -> f64 {
    let span = t1 - t0;
    if span == 0.0 {
        return 0.0;
    }
    ((time - t0) / span).clamp(0.0, 1.0)
}

/// Sample one channel. `blend` is only called between two distinct keys.
fn sample_channel<T: Copy>(
    track: &[Keyframe],
    time: f64,
    rest: T,
    channel: impl Fn(&Keyframe) -> Option<T>,
    blend: impl Fn(T, T, f64) -> T,
) -> T {
    match bracket(track, time, channel) {
        (None, _) => rest,
        (Some((t0, v0)), Some((t1, v1))) if t0 < time => {
            blend(v0, v1, segment_t(t0, t1, time))
        }
        (Some((_, v0)), _) => v0,
    }
}

/// Reconstruct `bone`'s local transform at `time`. Pure: never touches the store or a renderer.
pub fn sample_bone(
    store: &TrackStore,
    bone: &str,
    time: f64,
    rest: BoneTransform,
) -> BoneTransform {
    let rest = rest.sanitized();
    let Some(track) = store.track(bone) else {
        return rest;
    };
    let time = if time.is_finite() { time } else { 0.0 };

    let position = sample_channel(
        track,
        time,
        rest.position,
        |kf| kf.position.map(sanitize_vec3),
        lerp_vec3,
    );
    let quaternion = sample_channel(
        track,
        time,
        rest.quaternion,
        |kf| kf.rotation.map(sanitize_quat),
        slerp_quat,
    );

    let out = BoneTransform::new(position, quaternion);
    if out.is_finite() {
        out
    } else {
        rest
    }
}

/// Reconstruct the full skeleton at `time`. Bones without keys sit at rest.
pub fn sample_skeleton(store: &TrackStore, skeleton: &Skeleton, time: f64) -> LivePose {
    skeleton
        .bones()
        .iter()
        .map(|b| (b.name.clone(), sample_bone(store, &b.name, time, b.rest)))
        .collect()
}
