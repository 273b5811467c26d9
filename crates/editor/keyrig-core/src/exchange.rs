//! Interchange JSON document and clip import.
//!
//! Export layout:
//! `{ name, duration, tracks: [{ name, type, times, values }] }` where `name` is
//! `"<bone>.quaternion"` or `"<bone>.position"`.
//!
//! Import rules (JSON documents and decoded clips alike):
//! - track names must be `<bone>.<property>`; the bone must exist in the skeleton, otherwise it
//!   lands in the skipped-bone report;
//! - `values.len()` must equal `times.len() * width`, otherwise the track is skipped;
//! - samples of a bone's sub-tracks are merged by time into single keyframes; a channel no
//!   sub-track fills takes the bone's rest value;
//! - nothing usable at all is an error.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::clip::{parse_track_name, AnimationClip, ClipChannel, ClipTrack};
use crate::config::{quantize_time, Config};
use crate::data::{sanitize_quat, sanitize_vec3, Keyframe, TrackStore};
use crate::error::{EditorError, Result};
use crate::skeleton::Skeleton;

/// One channel track of the interchange document.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DocumentTrack {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub times: Vec<f64>,
    pub values: Vec<f64>,
}

/// Interchange document written by export and read by JSON import.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct AnimationDocument {
    pub name: String,
    pub duration: f64,
    pub tracks: Vec<DocumentTrack>,
}

impl AnimationDocument {
    pub fn from_store(name: &str, duration: f64, store: &TrackStore) -> Self {
        AnimationClip::from_store(name, duration, store, None).into()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl From<AnimationClip> for AnimationDocument {
    fn from(clip: AnimationClip) -> Self {
        let tracks = clip
            .tracks
            .into_iter()
            .map(|t| {
                let kind = t
                    .target()
                    .map_or("vector", |(_, channel)| channel.type_tag())
                    .to_string();
                DocumentTrack {
                    name: t.name,
                    kind,
                    times: t.times,
                    values: t.values,
                }
            })
            .collect();
        Self {
            name: clip.name,
            duration: clip.duration,
            tracks,
        }
    }
}

/// Serialize `store` as a pretty-printed interchange document.
pub fn generate_animation_json(name: &str, duration: f64, store: &TrackStore) -> Result<String> {
    AnimationDocument::from_store(name, duration, store).to_json_pretty()
}

/// Outcome of a successful import; non-fatal problems are listed rather than raised.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ImportReport {
    pub name: String,
    pub duration: f64,
    /// Bones that received keyframes, sorted.
    pub imported_bones: Vec<String>,
    /// Bones named by tracks but absent from the skeleton, first-seen order.
    pub skipped_bones: Vec<String>,
    /// Tracks dropped for a malformed name or sample layout.
    pub skipped_tracks: Vec<String>,
}

impl ImportReport {
    pub fn has_warnings(&self) -> bool {
        !self.skipped_bones.is_empty() || !self.skipped_tracks.is_empty()
    }

    /// One consolidated message for the host, if anything was skipped.
    pub fn warning(&self) -> Option<String> {
        let mut parts = Vec::new();
        if !self.skipped_bones.is_empty() {
            parts.push(format!(
                "skipped {} bone(s) not found in the current model: {}",
                self.skipped_bones.len(),
                self.skipped_bones.join(", ")
            ));
        }
        if !self.skipped_tracks.is_empty() {
            parts.push(format!(
                "skipped {} malformed track(s): {}",
                self.skipped_tracks.len(),
                self.skipped_tracks.join(", ")
            ));
        }
        (!parts.is_empty()).then(|| parts.join("; "))
    }
}

/// Merges per-channel sample tracks into per-bone keyframes.
struct TrackAssembler<'a> {
    skeleton: &'a Skeleton,
    tolerance: f64,
    decimals: u32,
    allow_scale: bool,
    bones: HashMap<String, Vec<Keyframe>>,
    skipped_bones: Vec<String>,
    skipped_tracks: Vec<String>,
}

impl<'a> TrackAssembler<'a> {
    fn new(skeleton: &'a Skeleton, cfg: &Config, allow_scale: bool) -> Self {
        Self {
            skeleton,
            tolerance: cfg.time_tolerance,
            decimals: cfg.time_decimals,
            allow_scale,
            bones: HashMap::new(),
            skipped_bones: Vec::new(),
            skipped_tracks: Vec::new(),
        }
    }

    fn skip_track(&mut self, name: &str, why: &str) {
        log::warn!("import: skipping track '{name}' ({why})");
        self.skipped_tracks.push(name.to_string());
    }

    fn add(&mut self, name: &str, times: &[f64], values: &[f64]) {
        let Some((bone, channel)) = parse_track_name(name) else {
            self.skip_track(name, "name is not <bone>.quaternion|position");
            return;
        };
        if channel == ClipChannel::Scale && !self.allow_scale {
            self.skip_track(name, "unsupported property");
            return;
        }
        if !self.skeleton.contains(bone) {
            if !self.skipped_bones.iter().any(|b| b == bone) {
                log::warn!("import: bone '{bone}' not found in the current skeleton");
                self.skipped_bones.push(bone.to_string());
            }
            return;
        }
        if channel == ClipChannel::Scale {
            return;
        }
        let width = channel.width();
        if times.is_empty() || values.len() != times.len() * width {
            self.skip_track(name, "times/values length mismatch or empty track");
            return;
        }

        let rest = self.skeleton.rest(bone);
        let keys = self.bones.entry(bone.to_string()).or_default();
        for (i, &raw_time) in times.iter().enumerate() {
            let time = quantize_time(raw_time, self.decimals).max(0.0);
            let idx = match keys
                .iter()
                .position(|k| (k.time - time).abs() < self.tolerance)
            {
                Some(idx) => idx,
                None => {
                    keys.push(Keyframe::new(time, Some(rest.position), Some(rest.quaternion)));
                    keys.len() - 1
                }
            };
            let sample = &values[i * width..(i + 1) * width];
            let kf = &mut keys[idx];
            match channel {
                ClipChannel::Quaternion => {
                    kf.rotation = Some(sanitize_quat([sample[0], sample[1], sample[2], sample[3]]));
                }
                ClipChannel::Position => {
                    kf.position = Some(sanitize_vec3([sample[0], sample[1], sample[2]]));
                }
                ClipChannel::Scale => {}
            }
        }
    }

    fn finish(self, name: String, duration: f64) -> Result<(TrackStore, ImportReport)> {
        let mut store = TrackStore::new();
        for (bone, keys) in self.bones {
            store.replace_track(&bone, keys);
        }
        if store.is_empty() {
            return Err(EditorError::NoCompatibleTracks {
                skipped_bones: self.skipped_bones,
            });
        }
        let report = ImportReport {
            name,
            duration,
            imported_bones: store.bones().into_iter().map(str::to_string).collect(),
            skipped_bones: self.skipped_bones,
            skipped_tracks: self.skipped_tracks,
        };
        Ok((store, report))
    }
}

fn numbers(v: Option<&JsonValue>) -> Option<Vec<f64>> {
    v?.as_array()?.iter().map(JsonValue::as_f64).collect()
}

/// Validate and import an interchange JSON document against `skeleton`.
pub fn parse_animation_json(
    text: &str,
    skeleton: &Skeleton,
    cfg: &Config,
) -> Result<(TrackStore, ImportReport)> {
    let doc: JsonValue = serde_json::from_str(text)?;
    let obj = doc
        .as_object()
        .ok_or_else(|| EditorError::invalid_document("not an object"))?;
    let name = obj
        .get("name")
        .and_then(JsonValue::as_str)
        .ok_or_else(|| EditorError::invalid_document("missing or invalid 'name' field"))?;
    let duration = obj
        .get("duration")
        .and_then(JsonValue::as_f64)
        .filter(|d| d.is_finite() && *d > 0.0)
        .ok_or_else(|| EditorError::invalid_document("missing or invalid 'duration' field"))?;
    let tracks = obj
        .get("tracks")
        .and_then(JsonValue::as_array)
        .ok_or_else(|| EditorError::invalid_document("missing or invalid 'tracks' array"))?;

    let mut asm = TrackAssembler::new(skeleton, cfg, false);
    for (i, track) in tracks.iter().enumerate() {
        let Some(track_name) = track.get("name").and_then(JsonValue::as_str) else {
            asm.skip_track(&format!("#{i}"), "missing track name");
            continue;
        };
        match (numbers(track.get("times")), numbers(track.get("values"))) {
            (Some(times), Some(values)) => asm.add(track_name, &times, &values),
            _ => asm.skip_track(track_name, "times/values must be numeric arrays"),
        }
    }
    asm.finish(name.to_string(), duration)
}

/// Import a decoded clip against `skeleton`. Scale tracks are accepted and ignored.
pub fn keyframes_from_clip(
    clip: &AnimationClip,
    skeleton: &Skeleton,
    cfg: &Config,
) -> Result<(TrackStore, ImportReport)> {
    let mut asm = TrackAssembler::new(skeleton, cfg, true);
    for ClipTrack {
        name,
        times,
        values,
    } in &clip.tracks
    {
        asm.add(name, times, values);
    }
    asm.finish(clip.name.clone(), clip.duration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{BoneTransform, QUAT_IDENTITY};
    use crate::skeleton::BoneInfo;
    use crate::track::TIME_TOLERANCE;

    fn skeleton() -> Skeleton {
        Skeleton::new(vec![
            BoneInfo {
                name: "Arm".into(),
                rest: BoneTransform::new([0.0, 1.0, 0.0], QUAT_IDENTITY),
            },
            BoneInfo {
                name: "Leg".into(),
                rest: BoneTransform::new([0.0, -1.0, 0.0], QUAT_IDENTITY),
            },
        ])
    }

    #[test]
    fn export_layout() {
        let mut store = TrackStore::new();
        store.upsert("Arm", Keyframe::new(0.0, Some([1.0, 2.0, 3.0]), None), TIME_TOLERANCE);
        store.upsert("Arm", Keyframe::rotation(1.0, QUAT_IDENTITY), TIME_TOLERANCE);
        let doc = AnimationDocument::from_store("Wave", 1.0, &store);
        assert_eq!(doc.tracks.len(), 2);
        assert_eq!(doc.tracks[0].name, "Arm.quaternion");
        assert_eq!(doc.tracks[0].kind, "quaternion");
        assert_eq!(doc.tracks[0].times, vec![1.0]);
        assert_eq!(doc.tracks[1].name, "Arm.position");
        assert_eq!(doc.tracks[1].kind, "vector");
        assert_eq!(doc.tracks[1].values, vec![1.0, 2.0, 3.0]);
        let json = generate_animation_json("Wave", 1.0, &store).unwrap();
        assert!(json.contains("\n  \"name\": \"Wave\""));
    }

    #[test]
    fn import_rejects_bad_top_level() {
        let sk = skeleton();
        let cfg = Config::default();
        for bad in [
            r#"[]"#,
            r#"{ "duration": 1, "tracks": [] }"#,
            r#"{ "name": "x", "duration": 0, "tracks": [] }"#,
            r#"{ "name": "x", "duration": "2", "tracks": [] }"#,
            r#"{ "name": "x", "duration": 2, "tracks": {} }"#,
        ] {
            assert!(
                matches!(
                    parse_animation_json(bad, &sk, &cfg),
                    Err(EditorError::InvalidDocument { .. })
                ),
                "{bad}"
            );
        }
        assert!(matches!(
            parse_animation_json("{", &sk, &cfg),
            Err(EditorError::Parse { .. })
        ));
    }

    #[test]
    fn import_merges_channels_and_fills_rest() {
        let json = r#"{
            "name": "Walk", "duration": 2,
            "tracks": [
                { "name": "Arm.quaternion", "type": "quaternion", "times": [0, 1], "values": [0,0,0,1, 0,1,0,0] },
                { "name": "Arm.position", "type": "vector", "times": [1, 2], "values": [1,1,1, 2,2,2] },
                { "name": "Tail.quaternion", "type": "quaternion", "times": [0], "values": [0,0,0,1] },
                { "name": "Leg.position", "type": "vector", "times": [0, 1], "values": [1,2] },
                { "name": "Leg.rotation", "type": "vector", "times": [0], "values": [1,2,3] }
            ]
        }"#;
        let (store, report) = parse_animation_json(json, &skeleton(), &Config::default()).unwrap();
        assert_eq!(report.name, "Walk");
        assert_eq!(report.duration, 2.0);
        assert_eq!(report.imported_bones, vec!["Arm".to_string()]);
        assert_eq!(report.skipped_bones, vec!["Tail".to_string()]);
        assert_eq!(
            report.skipped_tracks,
            vec!["Leg.position".to_string(), "Leg.rotation".to_string()]
        );
        assert!(report.warning().unwrap().contains("Tail"));
        assert!(!store.contains_bone("Leg"));

        let arm = store.track("Arm").unwrap();
        assert_eq!(arm.len(), 3);
        // t=0: rotation from file, position from rest
        assert_eq!(arm[0].position, Some([0.0, 1.0, 0.0]));
        assert_eq!(arm[1].rotation, Some([0.0, 1.0, 0.0, 0.0]));
        assert_eq!(arm[1].position, Some([1.0, 1.0, 1.0]));
        // t=2: position from file, rotation from rest
        assert_eq!(arm[2].rotation, Some(QUAT_IDENTITY));
    }

    #[test]
    fn import_with_no_matching_bones_fails() {
        let json = r#"{ "name": "x", "duration": 1, "tracks": [
            { "name": "Tail.quaternion", "type": "quaternion", "times": [0], "values": [0,0,0,1] }
        ] }"#;
        match parse_animation_json(json, &skeleton(), &Config::default()) {
            Err(EditorError::NoCompatibleTracks { skipped_bones }) => {
                assert_eq!(skipped_bones, vec!["Tail".to_string()])
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn clip_import_ignores_scale_and_rounds_times() {
        let clip = AnimationClip {
            name: "Take 001".into(),
            duration: 1.5,
            tracks: vec![
                ClipTrack {
                    name: "Leg.scale".into(),
                    times: vec![0.0],
                    values: vec![1.0, 1.0, 1.0],
                },
                ClipTrack {
                    name: "Leg.quaternion".into(),
                    times: vec![0.333333, 0.66666],
                    values: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, f64::NAN, 1.0],
                },
                ClipTrack {
                    name: "Wing.scale".into(),
                    times: vec![0.0],
                    values: vec![1.0, 1.0, 1.0],
                },
            ],
        };
        let (store, report) = keyframes_from_clip(&clip, &skeleton(), &Config::default()).unwrap();
        assert_eq!(report.skipped_bones, vec!["Wing".to_string()]);
        assert!(report.skipped_tracks.is_empty());
        let leg = store.track("Leg").unwrap();
        assert_eq!(leg[0].time, 0.3333);
        assert_eq!(leg[1].time, 0.6667);
        assert_eq!(leg[1].rotation, Some(QUAT_IDENTITY));
    }
}
