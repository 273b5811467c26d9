//! Editing session: the single owner of the track store, the live pose and the interaction
//! state, and the reconciler that keeps them consistent with an external renderer.
//!
//! Phases (derived from two flags; playback wins over a drag):
//! - Idle: time or store changes mark the live pose dirty; the next `tick` recomputes it for
//!   every bone from the track store and pushes it to the renderer.
//! - Dragging: gizmo updates are collapsed by a debouncer and patched straight into the live
//!   pose; no recompute, no push.
//! - Playing: the renderer advances the pose itself; the session only follows its clock. Pause
//!   reads the renderer's actual bone transforms back as the new live pose.
//!
//! Time, keying and selection edits are rejected while Playing or Dragging.

use serde::{Deserialize, Serialize};

use crate::clip::{file_stem, AnimationClip, ClipFormat};
use crate::config::{quantize_time, wrap_time, Config};
use crate::data::{sanitize_quat, sanitize_vec3, BoneTransform, LivePose, Quat, TrackStore, Vec3};
use crate::debounce::Debouncer;
use crate::error::{EditorError, Result};
use crate::exchange::{
    generate_animation_json, keyframes_from_clip, parse_animation_json, ImportReport,
};
use crate::interp::functions::{euler_deg_to_quat, quat_to_euler_deg};
use crate::keying::{set_keyframe, KeyingOutcome, KeyingParams};
use crate::outputs::{EventLog, SessionEvent};
use crate::renderer::PoseRenderer;
use crate::sampling::sample_skeleton;
use crate::skeleton::Skeleton;

#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Dragging,
    Playing,
}

/// Euler axis of the transform panel.
#[derive(Copy, Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationAxis {
    X,
    Y,
    Z,
}

impl RotationAxis {
    #[inline]
    fn index(self) -> usize {
        match self {
            RotationAxis::X => 0,
            RotationAxis::Y => 1,
            RotationAxis::Z => 2,
        }
    }
}

#[derive(Clone, Debug)]
struct DragUpdate {
    bone: String,
    rotation: Quat,
}

#[derive(Debug)]
pub struct EditorSession {
    config: Config,
    skeleton: Option<Skeleton>,
    selected_bone: Option<String>,
    /// Transform panel rotation, intrinsic XYZ Euler degrees.
    rotation_ui: Vec3,

    name: String,
    duration: f64,
    current_time: f64,
    keyframes: TrackStore,
    live_pose: LivePose,

    playing: bool,
    dragging: bool,
    /// Live pose must be recomputed from the track store.
    pose_dirty: bool,
    /// Live pose differs from what the renderer last received.
    needs_apply: bool,

    drag_updates: Debouncer<DragUpdate>,
    events: EventLog,
}

impl Default for EditorSession {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl EditorSession {
    pub fn new(config: Config) -> Self {
        Self {
            drag_updates: Debouncer::new(config.gizmo_debounce_ms),
            name: config.default_animation_name.clone(),
            duration: config.default_duration,
            config,
            skeleton: None,
            selected_bone: None,
            rotation_ui: [0.0; 3],
            current_time: 0.0,
            keyframes: TrackStore::new(),
            live_pose: LivePose::new(),
            playing: false,
            dragging: false,
            pose_dirty: false,
            needs_apply: false,
            events: EventLog::default(),
        }
    }

    // ----- read access -----

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn skeleton(&self) -> Option<&Skeleton> {
        self.skeleton.as_ref()
    }

    pub fn has_model(&self) -> bool {
        self.skeleton.is_some()
    }

    pub fn phase(&self) -> Phase {
        if self.playing {
            Phase::Playing
        } else if self.dragging {
            Phase::Dragging
        } else {
            Phase::Idle
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn selected_bone(&self) -> Option<&str> {
        self.selected_bone.as_deref()
    }

    pub fn rotation_ui(&self) -> Vec3 {
        self.rotation_ui
    }

    /// Live transform of the selected bone (rest if it has no live entry).
    pub fn selected_transform(&self) -> Option<BoneTransform> {
        let bone = self.selected_bone.as_deref()?;
        Some(self.live_or_rest(bone))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn keyframes(&self) -> &TrackStore {
        &self.keyframes
    }

    pub fn live_pose(&self) -> &LivePose {
        &self.live_pose
    }

    /// A recompute is pending for the next idle tick.
    pub fn is_pose_dirty(&self) -> bool {
        self.pose_dirty
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        self.events.drain()
    }

    // ----- guards -----

    fn require_model(&self) -> Result<&Skeleton> {
        self.skeleton.as_ref().ok_or(EditorError::NoModelLoaded)
    }

    fn ensure_editable(&self) -> Result<()> {
        match self.phase() {
            Phase::Idle => Ok(()),
            Phase::Playing => Err(EditorError::PlaybackActive),
            Phase::Dragging => Err(EditorError::GizmoDragActive),
        }
    }

    fn require_selection(&self) -> Result<String> {
        self.selected_bone.clone().ok_or(EditorError::NoBoneSelected)
    }

    fn keying_params(&self) -> KeyingParams {
        KeyingParams {
            time_tolerance: self.config.time_tolerance,
            rotation_epsilon: self.config.rotation_epsilon,
        }
    }

    fn live_or_rest(&self, bone: &str) -> BoneTransform {
        match self.live_pose.get(bone) {
            Some(t) => *t,
            None => self
                .skeleton
                .as_ref()
                .map(|s| s.rest(bone))
                .unwrap_or_default(),
        }
    }

    /// Refresh the panel rotation from the selected bone's live transform.
    fn sync_panel(&mut self) {
        self.rotation_ui = match self.selected_bone.as_deref() {
            Some(bone) => quat_to_euler_deg(self.live_or_rest(bone).quaternion),
            None => [0.0; 3],
        };
    }

    /// Run a pending idle recompute now, so reads and patches see the pose at `current_time`.
    fn settle_pose(&mut self) {
        if self.pose_dirty && !self.playing {
            self.recompute_live_pose();
        }
    }

    // ----- model lifecycle -----

    /// Reset the session for a freshly loaded model and select its first bone.
    pub fn load_skeleton(&mut self, skeleton: Skeleton) {
        self.drag_updates = Debouncer::new(self.config.gizmo_debounce_ms);
        self.name = self.config.default_animation_name.clone();
        self.duration = self.config.default_duration;
        self.current_time = 0.0;
        self.keyframes.clear();
        self.playing = false;
        self.dragging = false;
        self.pose_dirty = false;
        self.live_pose = skeleton.rest_pose();
        self.needs_apply = !self.live_pose.is_empty();
        self.selected_bone = skeleton.names().next().map(str::to_string);
        log::debug!(
            "session: model loaded with {} bone(s), selected {:?}",
            skeleton.len(),
            self.selected_bone
        );
        self.skeleton = Some(skeleton);
        self.sync_panel();
        self.events.clear();
        self.events.push(SessionEvent::SelectionChanged {
            bone: self.selected_bone.clone(),
        });
    }

    // ----- selection and transform panel -----

    pub fn select_bone(&mut self, bone: &str) -> Result<()> {
        let skeleton = self.require_model()?;
        if !skeleton.contains(bone) {
            return Err(EditorError::UnknownBone {
                name: bone.to_string(),
            });
        }
        self.ensure_editable()?;
        self.settle_pose();
        if self.selected_bone.as_deref() != Some(bone) {
            self.selected_bone = Some(bone.to_string());
            self.events.push(SessionEvent::SelectionChanged {
                bone: self.selected_bone.clone(),
            });
        }
        self.sync_panel();
        Ok(())
    }

    /// Viewport pick notification.
    pub fn on_bone_clicked(&mut self, bone: &str) -> Result<()> {
        self.select_bone(bone)
    }

    pub fn set_rotation_axis(&mut self, axis: RotationAxis, degrees: f64) -> Result<()> {
        self.settle_pose();
        let mut euler = self.rotation_ui;
        euler[axis.index()] = degrees;
        self.set_rotation_ui(euler)
    }

    /// Set the panel rotation and pose the selected bone with it.
    pub fn set_rotation_ui(&mut self, euler_deg: Vec3) -> Result<()> {
        self.require_model()?;
        if self.playing {
            return Err(EditorError::PlaybackActive);
        }
        let bone = self.require_selection()?;
        self.settle_pose();
        self.rotation_ui = sanitize_vec3(euler_deg);
        let position = self.live_or_rest(&bone).position;
        self.live_pose.insert(
            &bone,
            BoneTransform::new(sanitize_vec3(position), euler_deg_to_quat(self.rotation_ui)),
        );
        self.needs_apply = true;
        Ok(())
    }

    // ----- keying -----

    /// Key the selected bone at the current time with the panel rotation, auto-keying
    /// drifted companions.
    pub fn set_keyframe_from_ui(&mut self) -> Result<KeyingOutcome> {
        self.require_model()?;
        self.ensure_editable()?;
        let bone = self.require_selection()?;
        // Companion drift is measured against the pose at the key time.
        self.settle_pose();
        let skeleton = self.require_model()?;
        let time = quantize_time(self.current_time, self.config.time_decimals);
        let (next, outcome) = set_keyframe(
            &bone,
            time,
            self.rotation_ui,
            &self.keyframes,
            &self.live_pose,
            skeleton,
            self.keying_params(),
        );
        self.keyframes = next;
        self.pose_dirty = true;
        self.events.push(SessionEvent::KeyframesChanged {
            bones: outcome.keyed.clone(),
        });
        Ok(outcome)
    }

    /// Remove the selected bone's key at the current time. `Ok(false)` when nothing matched.
    pub fn delete_keyframe_at_current_time(&mut self) -> Result<bool> {
        self.require_model()?;
        self.ensure_editable()?;
        let bone = self.require_selection()?;
        let removed = self
            .keyframes
            .remove_at_time(&bone, self.current_time, self.config.time_tolerance);
        if removed {
            self.pose_dirty = true;
            self.events.push(SessionEvent::KeyframesChanged { bones: vec![bone] });
        } else {
            log::debug!(
                "session: no key on '{}' at {:.4}s to delete",
                bone,
                self.current_time
            );
        }
        Ok(removed)
    }

    // ----- time -----

    fn move_time(&mut self, t: f64) {
        let t = if t.is_finite() { t } else { 0.0 };
        let new_time = quantize_time(t.clamp(0.0, self.duration), self.config.time_decimals);
        if new_time != self.current_time {
            let old_time = self.current_time;
            self.current_time = new_time;
            self.pose_dirty = true;
            self.events.push(SessionEvent::TimeChanged { old_time, new_time });
        }
    }

    /// Scrub to `t`, clamped to [0, duration].
    pub fn set_current_time(&mut self, t: f64) -> Result<()> {
        self.ensure_editable()?;
        self.move_time(t);
        Ok(())
    }

    pub fn step_frame(&mut self, forward: bool, coarse: bool) -> Result<()> {
        let step = if coarse {
            self.config.coarse_step
        } else {
            self.config.frame_step
        };
        let target = if forward {
            self.current_time + step
        } else {
            self.current_time - step
        };
        self.set_current_time(target)
    }

    pub fn jump_to_start(&mut self) -> Result<()> {
        self.set_current_time(0.0)
    }

    pub fn jump_to_end(&mut self) -> Result<()> {
        self.set_current_time(self.duration)
    }

    pub fn set_duration(&mut self, duration: f64) -> Result<()> {
        if !(duration.is_finite() && duration > 0.0) {
            return Err(EditorError::InvalidDuration { duration });
        }
        self.duration = duration;
        if self.current_time > duration {
            self.move_time(duration);
        }
        Ok(())
    }

    pub fn set_animation_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    // ----- playback -----

    pub fn play(&mut self, renderer: &mut dyn PoseRenderer) -> Result<()> {
        let skeleton = self.require_model()?;
        if self.playing {
            return Ok(());
        }
        if self.keyframes.is_empty() {
            log::warn!("session: play rejected, no keyframes");
            return Err(EditorError::NoKeyframes);
        }
        let clip =
            AnimationClip::from_store(&self.name, self.duration, &self.keyframes, Some(skeleton));
        if clip.is_empty() {
            log::warn!("session: play rejected, no keyed bone exists in the model");
            return Err(EditorError::NoKeyframes);
        }

        self.flush_drag_update();
        self.settle_pose();
        if !self.live_pose.is_empty() {
            renderer.apply_pose(&self.live_pose);
            self.events.push(SessionEvent::PoseApplied);
        }
        renderer.resume();
        renderer.play_clip(&clip);
        self.playing = true;
        self.needs_apply = false;
        log::debug!("session: Idle -> Playing ({} track(s))", clip.tracks.len());
        self.events.push(SessionEvent::PlaybackStarted {
            animation: self.name.clone(),
        });
        Ok(())
    }

    /// Halt playback and adopt the renderer's current bone transforms as the live pose.
    pub fn pause(&mut self, renderer: &mut dyn PoseRenderer) -> Result<()> {
        let skeleton = self.require_model()?;
        if !self.playing {
            return Ok(());
        }
        renderer.pause();
        let snapshot: LivePose = skeleton
            .bones()
            .iter()
            .map(|b| {
                let t = renderer
                    .bone_transform(&b.name)
                    .map(|t| t.sanitized())
                    .or_else(|| self.live_pose.get(&b.name).copied())
                    .unwrap_or(b.rest);
                (b.name.clone(), t)
            })
            .collect();
        self.live_pose = snapshot;
        self.playing = false;
        self.pose_dirty = false;
        self.needs_apply = false;
        self.sync_panel();
        log::debug!("session: Playing -> Idle (paused at {:.4}s)", self.current_time);
        self.events.push(SessionEvent::PlaybackPaused {
            time: self.current_time,
        });
        Ok(())
    }

    /// Halt playback and rewind to 0; the live pose is recomputed on the next tick.
    pub fn stop(&mut self, renderer: &mut dyn PoseRenderer) -> Result<()> {
        self.require_model()?;
        renderer.stop();
        if self.playing {
            log::debug!("session: Playing -> Idle (stopped)");
        }
        self.playing = false;
        let old_time = self.current_time;
        self.current_time = 0.0;
        self.pose_dirty = true;
        self.events.push(SessionEvent::PlaybackStopped);
        if old_time != 0.0 {
            self.events.push(SessionEvent::TimeChanged {
                old_time,
                new_time: 0.0,
            });
        }
        Ok(())
    }

    pub fn toggle_playback(&mut self, renderer: &mut dyn PoseRenderer) -> Result<()> {
        if self.playing {
            self.pause(renderer)
        } else {
            self.play(renderer)
        }
    }

    /// Playback clock notification. Ignored unless playing without a concurrent drag.
    pub fn on_time_update(&mut self, t: f64) {
        if !self.playing || self.dragging {
            return;
        }
        let new_time = quantize_time(wrap_time(t, self.duration), self.config.time_decimals);
        if new_time != self.current_time {
            let old_time = self.current_time;
            self.current_time = new_time;
            self.events.push(SessionEvent::TimeChanged { old_time, new_time });
        }
    }

    // ----- gizmo -----

    pub fn on_gizmo_dragging_changed(&mut self, dragging: bool) {
        if dragging == self.dragging {
            return;
        }
        if dragging {
            // Start the gesture from the settled pose.
            self.settle_pose();
        }
        self.dragging = dragging;
        log::debug!("session: gizmo dragging = {dragging}");
    }

    /// Gizmo change notification; collapsed to the latest update within the debounce window.
    pub fn on_bone_transform_dragged(
        &mut self,
        bone: &str,
        _position: Vec3,
        rotation: Quat,
        now_ms: f64,
    ) {
        if self.playing {
            return;
        }
        if !self.skeleton.as_ref().is_some_and(|s| s.contains(bone)) {
            log::warn!("session: drag update for unknown bone '{bone}' ignored");
            return;
        }
        self.drag_updates.schedule(
            now_ms,
            DragUpdate {
                bone: bone.to_string(),
                rotation,
            },
        );
    }

    fn apply_drag_update(&mut self, update: DragUpdate) {
        let position = self.live_or_rest(&update.bone).position;
        self.live_pose.insert(
            &update.bone,
            BoneTransform::new(position, sanitize_quat(update.rotation)),
        );
        if self.selected_bone.as_deref() == Some(update.bone.as_str()) {
            self.sync_panel();
        }
        self.needs_apply = true;
    }

    fn flush_drag_update(&mut self) {
        if let Some(update) = self.drag_updates.flush() {
            self.apply_drag_update(update);
        }
    }

    // ----- reconciliation -----

    fn recompute_live_pose(&mut self) {
        let Some(skeleton) = self.skeleton.as_ref() else {
            self.pose_dirty = false;
            return;
        };
        let mut pose = sample_skeleton(&self.keyframes, skeleton, self.current_time);
        for bone in skeleton.bones() {
            let valid = pose.get(&bone.name).is_some_and(BoneTransform::is_finite);
            if !valid {
                pose.insert(&bone.name, bone.rest);
            }
        }
        self.live_pose = pose;
        self.pose_dirty = false;
        self.needs_apply = true;
        self.sync_panel();
    }

    /// Per-frame entry point: settle pending drag updates, run a pending idle recompute and
    /// push the live pose when it changed and nothing else drives the skeleton.
    pub fn tick(&mut self, now_ms: f64, renderer: &mut dyn PoseRenderer) {
        if !self.playing {
            if let Some(update) = self.drag_updates.poll(now_ms) {
                self.apply_drag_update(update);
            }
        }
        if self.phase() != Phase::Idle {
            return;
        }
        self.settle_pose();
        if self.needs_apply && self.skeleton.is_some() {
            renderer.apply_pose(&self.live_pose);
            self.needs_apply = false;
            self.events.push(SessionEvent::PoseApplied);
        }
    }

    // ----- counts -----

    pub fn has_keyframe_at_current_time(&self) -> bool {
        self.selected_bone
            .as_deref()
            .and_then(|bone| self.keyframes.track(bone))
            .is_some_and(|track| {
                crate::track::find_at_time(track, self.current_time, self.config.time_tolerance)
                    .is_some()
            })
    }

    pub fn selected_bone_keyframe_count(&self) -> usize {
        self.selected_bone
            .as_deref()
            .map_or(0, |bone| self.keyframes.keyframe_count(bone))
    }

    pub fn bone_keyframe_count(&self, bone: &str) -> usize {
        self.keyframes.keyframe_count(bone)
    }

    pub fn total_keyframe_count(&self) -> usize {
        self.keyframes.total_keyframes()
    }

    /// Bones with at least one key, sorted.
    pub fn animated_bones(&self) -> Vec<String> {
        self.keyframes
            .bones()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    // ----- export -----

    pub fn export_json(&self) -> Result<String> {
        self.require_model()?;
        if self.keyframes.is_empty() {
            return Err(EditorError::NothingToExport);
        }
        generate_animation_json(&self.name, self.duration, &self.keyframes)
    }

    /// `<name>.<ext>` with whitespace runs replaced by `_`.
    pub fn export_file_name(&self, ext: &str) -> String {
        let stem = self.name.split_whitespace().collect::<Vec<_>>().join("_");
        let stem = if stem.is_empty() {
            match ext {
                "glb" | "gltf" => "animated_model",
                _ => "animation",
            }
        } else {
            stem.as_str()
        };
        format!("{stem}.{ext}")
    }

    /// Native clip for asset export; bones absent from the model are left out.
    pub fn export_clip(&self) -> Result<AnimationClip> {
        let skeleton = self.require_model()?;
        if self.keyframes.is_empty() {
            return Err(EditorError::NothingToExport);
        }
        let clip =
            AnimationClip::from_store(&self.name, self.duration, &self.keyframes, Some(skeleton));
        if clip.is_empty() {
            return Err(EditorError::NoExportableTracks);
        }
        Ok(clip)
    }

    // ----- import -----

    /// Replace the animation with an interchange JSON document.
    pub fn import_json(&mut self, text: &str) -> Result<ImportReport> {
        let skeleton = self.require_model()?;
        self.ensure_editable()?;
        let (store, report) = parse_animation_json(text, skeleton, &self.config)?;
        Ok(self.commit_import(store, report))
    }

    /// Replace the animation with the first clip of a decoded asset.
    /// `decoded` is the host decoder's result for `file_name`.
    pub fn import_asset(
        &mut self,
        file_name: &str,
        decoded: std::result::Result<Vec<AnimationClip>, String>,
    ) -> Result<ImportReport> {
        let skeleton = self.require_model()?;
        self.ensure_editable()?;
        ClipFormat::from_file_name(file_name)?;
        let clips = decoded.map_err(|reason| EditorError::AssetDecode { reason })?;
        let clip = clips.first().ok_or(EditorError::NoAnimationsInAsset)?;
        let (store, mut report) = keyframes_from_clip(clip, skeleton, &self.config)?;
        if report.name.trim().is_empty() {
            report.name = file_stem(file_name).to_string();
        }
        if !(report.duration.is_finite() && report.duration > 0.0) {
            report.duration = self.config.default_duration;
        }
        Ok(self.commit_import(store, report))
    }

    fn commit_import(&mut self, store: TrackStore, report: ImportReport) -> ImportReport {
        let warning = report.warning();
        if let Some(w) = &warning {
            log::warn!("import '{}': {w}", report.name);
        }
        self.name = report.name.clone();
        self.duration = report.duration;
        self.keyframes = store;
        let old_time = self.current_time;
        self.current_time = 0.0;
        self.drag_updates.cancel();
        self.recompute_live_pose();

        self.events.push(SessionEvent::KeyframesChanged {
            bones: report.imported_bones.clone(),
        });
        if old_time != 0.0 {
            self.events.push(SessionEvent::TimeChanged {
                old_time,
                new_time: 0.0,
            });
        }
        self.events.push(SessionEvent::Imported {
            name: report.name.clone(),
            duration: report.duration,
            bones: report.imported_bones.len(),
            warning,
        });
        report
    }
}
