//! Canonical editing data model: keyframes, per-bone tracks, the track store and the live pose.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::track;

/// 3D vector (x, y, z).
pub type Vec3 = [f64; 3];
/// Quaternion (x, y, z, w).
pub type Quat = [f64; 4];

pub const VEC3_ZERO: Vec3 = [0.0, 0.0, 0.0];
pub const QUAT_IDENTITY: Quat = [0.0, 0.0, 0.0, 1.0];

/// Replace non-finite components with 0.
#[inline]
pub fn sanitize_vec3(v: Vec3) -> Vec3 {
    v.map(|c| if c.is_finite() { c } else { 0.0 })
}

/// Replace non-finite components with the identity's (0 for x/y/z, 1 for w).
#[inline]
pub fn sanitize_quat(q: Quat) -> Quat {
    let mut out = q;
    for (i, c) in out.iter_mut().enumerate() {
        if !c.is_finite() {
            *c = QUAT_IDENTITY[i];
        }
    }
    out
}

/// A timestamped sample. Channels are independent: a keyframe may carry only a rotation,
/// only a position, or both.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Keyframe {
    /// Seconds, >= 0.
    pub time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vec3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Quat>,
}

impl Keyframe {
    pub fn new(time: f64, position: Option<Vec3>, rotation: Option<Quat>) -> Self {
        Self {
            time,
            position,
            rotation,
        }
    }

    pub fn rotation(time: f64, rotation: Quat) -> Self {
        Self::new(time, None, Some(rotation))
    }

    pub fn position(time: f64, position: Vec3) -> Self {
        Self::new(time, Some(position), None)
    }

    /// Overwrite the channels `other` carries; keep the rest.
    pub fn merge(&mut self, other: &Keyframe) {
        self.time = other.time;
        if let Some(p) = other.position {
            self.position = Some(p);
        }
        if let Some(r) = other.rotation {
            self.rotation = Some(r);
        }
    }
}

/// Local transform of one bone.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct BoneTransform {
    pub position: Vec3,
    pub quaternion: Quat,
}

impl Default for BoneTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl BoneTransform {
    pub const IDENTITY: BoneTransform = BoneTransform {
        position: VEC3_ZERO,
        quaternion: QUAT_IDENTITY,
    };

    pub fn new(position: Vec3, quaternion: Quat) -> Self {
        Self {
            position,
            quaternion,
        }
    }

    #[inline]
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|c| c.is_finite()) && self.quaternion.iter().all(|c| c.is_finite())
    }

    #[inline]
    pub fn sanitized(&self) -> Self {
        Self {
            position: sanitize_vec3(self.position),
            quaternion: sanitize_quat(self.quaternion),
        }
    }
}

/// Mapping bone name -> track. Every stored track is non-empty and strictly ascending by time.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(from = "HashMap<String, Vec<Keyframe>>", into = "HashMap<String, Vec<Keyframe>>")]
pub struct TrackStore {
    tracks: HashMap<String, Vec<Keyframe>>,
}

impl From<HashMap<String, Vec<Keyframe>>> for TrackStore {
    fn from(raw: HashMap<String, Vec<Keyframe>>) -> Self {
        let mut store = TrackStore::new();
        for (bone, mut keys) in raw {
            // Keys within tolerance of each other address one keyframe; fold them together.
            keys.sort_by(|a, b| a.time.total_cmp(&b.time));
            let merged = keys.into_iter().fold(Vec::new(), |track, kf| {
                track::upsert(&track, kf, track::TIME_TOLERANCE)
            });
            store.replace_track(&bone, merged);
        }
        store
    }
}

impl From<TrackStore> for HashMap<String, Vec<Keyframe>> {
    fn from(store: TrackStore) -> Self {
        store.tracks
    }
}

impl TrackStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no bone has any keyframe.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Number of animated bones.
    #[inline]
    pub fn bone_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn track(&self, bone: &str) -> Option<&[Keyframe]> {
        self.tracks.get(bone).map(Vec::as_slice)
    }

    pub fn contains_bone(&self, bone: &str) -> bool {
        self.tracks.contains_key(bone)
    }

    pub fn keyframe_count(&self, bone: &str) -> usize {
        self.tracks.get(bone).map_or(0, Vec::len)
    }

    pub fn total_keyframes(&self) -> usize {
        self.tracks.values().map(Vec::len).sum()
    }

    /// Animated bone names, sorted.
    pub fn bones(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tracks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Keyframe])> {
        self.tracks.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Insert or merge `kf` into `bone`'s track.
    pub fn upsert(&mut self, bone: &str, kf: Keyframe, tolerance: f64) {
        let current = self.track(bone).unwrap_or(&[]);
        let updated = track::upsert(current, kf, tolerance);
        self.tracks.insert(bone.to_string(), updated);
    }

    /// Remove keys of `bone` within tolerance of `time`. An emptied track drops the bone's
    /// entry. Returns whether anything was removed.
    pub fn remove_at_time(&mut self, bone: &str, time: f64, tolerance: f64) -> bool {
        let Some(current) = self.tracks.get(bone) else {
            return false;
        };
        let updated = track::remove_at_time(current, time, tolerance);
        if updated.len() == current.len() {
            return false;
        }
        if updated.is_empty() {
            self.tracks.remove(bone);
        } else {
            self.tracks.insert(bone.to_string(), updated);
        }
        true
    }

    /// Replace a bone's whole track. Keys are sorted; an empty track removes the entry.
    pub fn replace_track(&mut self, bone: &str, mut keys: Vec<Keyframe>) {
        if keys.is_empty() {
            self.tracks.remove(bone);
            return;
        }
        keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        self.tracks.insert(bone.to_string(), keys);
    }

    pub fn remove_bone(&mut self, bone: &str) -> bool {
        self.tracks.remove(bone).is_some()
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }
}

/// Mapping bone name -> currently displayed/edited transform.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct LivePose {
    bones: HashMap<String, BoneTransform>,
}

impl LivePose {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, bone: &str) -> Option<&BoneTransform> {
        self.bones.get(bone)
    }

    pub fn insert(&mut self, bone: &str, transform: BoneTransform) {
        self.bones.insert(bone.to_string(), transform);
    }

    pub fn remove(&mut self, bone: &str) -> Option<BoneTransform> {
        self.bones.remove(bone)
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BoneTransform)> {
        self.bones.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn clear(&mut self) {
        self.bones.clear();
    }
}

impl FromIterator<(String, BoneTransform)> for LivePose {
    fn from_iter<I: IntoIterator<Item = (String, BoneTransform)>>(iter: I) -> Self {
        Self {
            bones: iter.into_iter().collect(),
        }
    }
}
