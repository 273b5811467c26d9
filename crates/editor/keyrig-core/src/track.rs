//! Track algebra: pure functions over one bone's ordered keyframes.
//!
//! Tracks are kept strictly ascending by time. Two keyframes whose times differ by less than
//! the tolerance address the same key. All functions return new tracks; callers replace the
//! store entry (and drop it when the result is empty).

use crate::data::Keyframe;

/// Default key-matching tolerance in seconds.
pub const TIME_TOLERANCE: f64 = 1e-4;

#[inline]
fn same_time(a: f64, b: f64, tolerance: f64) -> bool {
    (a - b).abs() < tolerance
}

/// First keyframe within tolerance of `time`.
pub fn find_at_time(track: &[Keyframe], time: f64, tolerance: f64) -> Option<&Keyframe> {
    track.iter().find(|kf| same_time(kf.time, time, tolerance))
}

/// Merge `kf` into the key within tolerance of its time (new channels overwrite, absent
/// channels are kept), or append it. The result is sorted ascending by time.
pub fn upsert(track: &[Keyframe], kf: Keyframe, tolerance: f64) -> Vec<Keyframe> {
    let mut out = track.to_vec();
    match out
        .iter_mut()
        .find(|existing| same_time(existing.time, kf.time, tolerance))
    {
        Some(existing) => existing.merge(&kf),
        None => out.push(kf),
    }
    out.sort_by(|a, b| a.time.total_cmp(&b.time));
    out
}

/// Drop every keyframe within tolerance of `time`.
pub fn remove_at_time(track: &[Keyframe], time: f64, tolerance: f64) -> Vec<Keyframe> {
    track
        .iter()
        .filter(|kf| !same_time(kf.time, time, tolerance))
        .cloned()
        .collect()
}
