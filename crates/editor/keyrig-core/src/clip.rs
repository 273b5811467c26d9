//! Native animation-clip representation shared with the playback engine and asset exporters.
//!
//! A clip is a flat list of per-channel tracks named `<bone>.<property>` with sample times and
//! flattened sample values (quaternion: x,y,z,w per sample; position/scale: x,y,z).

use serde::{Deserialize, Serialize};

use crate::data::TrackStore;
use crate::error::{EditorError, Result};
use crate::skeleton::Skeleton;

/// Animated property of a bone.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ClipChannel {
    Quaternion,
    Position,
    /// Present in decoded assets; never keyed by the editor.
    Scale,
}

impl ClipChannel {
    /// Property suffix in track names.
    pub fn property(self) -> &'static str {
        match self {
            ClipChannel::Quaternion => "quaternion",
            ClipChannel::Position => "position",
            ClipChannel::Scale => "scale",
        }
    }

    /// Track `type` tag in the interchange document.
    pub fn type_tag(self) -> &'static str {
        match self {
            ClipChannel::Quaternion => "quaternion",
            ClipChannel::Position | ClipChannel::Scale => "vector",
        }
    }

    /// Values per sample.
    pub fn width(self) -> usize {
        match self {
            ClipChannel::Quaternion => 4,
            ClipChannel::Position | ClipChannel::Scale => 3,
        }
    }

    fn from_property(p: &str) -> Option<Self> {
        match p {
            "quaternion" => Some(ClipChannel::Quaternion),
            "position" => Some(ClipChannel::Position),
            "scale" => Some(ClipChannel::Scale),
            _ => None,
        }
    }
}

/// Split `<bone>.<property>` at the last dot. The bone part must be non-empty.
pub fn parse_track_name(name: &str) -> Option<(&str, ClipChannel)> {
    let (bone, property) = name.rsplit_once('.')?;
    if bone.is_empty() {
        return None;
    }
    ClipChannel::from_property(property).map(|c| (bone, c))
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ClipTrack {
    pub name: String,
    pub times: Vec<f64>,
    pub values: Vec<f64>,
}

impl ClipTrack {
    pub fn target(&self) -> Option<(&str, ClipChannel)> {
        parse_track_name(&self.name)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    /// Seconds.
    pub duration: f64,
    pub tracks: Vec<ClipTrack>,
}

impl AnimationClip {
    /// Flatten `store` into clip tracks, bones sorted by name, quaternion before position.
    /// Channels that no keyframe carries are omitted. With a skeleton, bones it does not
    /// contain are left out.
    pub fn from_store(
        name: &str,
        duration: f64,
        store: &TrackStore,
        skeleton: Option<&Skeleton>,
    ) -> Self {
        let mut tracks = Vec::new();
        for bone in store.bones() {
            if skeleton.is_some_and(|s| !s.contains(bone)) {
                continue;
            }
            let Some(keys) = store.track(bone) else {
                continue;
            };

            let mut rot = ClipTrack {
                name: format!("{bone}.{}", ClipChannel::Quaternion.property()),
                times: Vec::new(),
                values: Vec::new(),
            };
            let mut pos = ClipTrack {
                name: format!("{bone}.{}", ClipChannel::Position.property()),
                times: Vec::new(),
                values: Vec::new(),
            };
            for kf in keys {
                if let Some(q) = kf.rotation {
                    rot.times.push(kf.time);
                    rot.values.extend_from_slice(&q);
                }
                if let Some(p) = kf.position {
                    pos.times.push(kf.time);
                    pos.values.extend_from_slice(&p);
                }
            }
            if !rot.times.is_empty() {
                tracks.push(rot);
            }
            if !pos.times.is_empty() {
                tracks.push(pos);
            }
        }
        Self {
            name: name.to_string(),
            duration,
            tracks,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

/// Asset formats accepted for clip import. Decoding happens outside the core.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ClipFormat {
    Fbx,
    Glb,
    Gltf,
}

impl ClipFormat {
    /// Pick the format from a file name's extension (case-insensitive).
    pub fn from_file_name(file_name: &str) -> Result<Self> {
        let ext = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "fbx" => Ok(ClipFormat::Fbx),
            "glb" => Ok(ClipFormat::Glb),
            "gltf" => Ok(ClipFormat::Gltf),
            _ => Err(EditorError::UnsupportedFileType {
                file_name: file_name.to_string(),
            }),
        }
    }
}

/// File name without its last extension.
pub fn file_stem(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Keyframe, QUAT_IDENTITY};
    use crate::skeleton::BoneInfo;
    use crate::track::TIME_TOLERANCE;

    #[test]
    fn track_names() {
        assert_eq!(
            parse_track_name("Arm.quaternion"),
            Some(("Arm", ClipChannel::Quaternion))
        );
        assert_eq!(
            parse_track_name("mixamorig:Hips.position"),
            Some(("mixamorig:Hips", ClipChannel::Position))
        );
        assert_eq!(
            parse_track_name("Root.Spine.scale"),
            Some(("Root.Spine", ClipChannel::Scale))
        );
        assert_eq!(parse_track_name(".position"), None);
        assert_eq!(parse_track_name("Arm.rotation"), None);
        assert_eq!(parse_track_name("Arm"), None);
    }

    #[test]
    fn formats() {
        assert_eq!(ClipFormat::from_file_name("walk.FBX"), Ok(ClipFormat::Fbx));
        assert_eq!(ClipFormat::from_file_name("a.b.glb"), Ok(ClipFormat::Glb));
        assert_eq!(ClipFormat::from_file_name("x.gltf"), Ok(ClipFormat::Gltf));
        assert!(matches!(
            ClipFormat::from_file_name("x.obj"),
            Err(EditorError::UnsupportedFileType { .. })
        ));
        assert!(ClipFormat::from_file_name("noext").is_err());
        assert_eq!(file_stem("walk.cycle.fbx"), "walk.cycle");
        assert_eq!(file_stem("walk"), "walk");
    }

    #[test]
    fn from_store_filters_by_skeleton_and_channel() {
        let mut store = TrackStore::new();
        store.upsert("Arm", Keyframe::rotation(0.0, QUAT_IDENTITY), TIME_TOLERANCE);
        store.upsert("Arm", Keyframe::rotation(1.0, QUAT_IDENTITY), TIME_TOLERANCE);
        store.upsert("Ghost", Keyframe::position(0.0, [1.0, 2.0, 3.0]), TIME_TOLERANCE);

        let all = AnimationClip::from_store("c", 2.0, &store, None);
        let names: Vec<&str> = all.tracks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Arm.quaternion", "Ghost.position"]);

        let sk = Skeleton::new(vec![BoneInfo {
            name: "Arm".into(),
            rest: Default::default(),
        }]);
        let filtered = AnimationClip::from_store("c", 2.0, &store, Some(&sk));
        assert_eq!(filtered.tracks.len(), 1);
        assert_eq!(filtered.tracks[0].values.len(), 8);
    }
}
