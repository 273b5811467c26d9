use std::cell::RefCell;

use js_sys::{Function, Reflect};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_wasm_bindgen as swb;
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;

use keyrig_core::{
    AnimationClip, BoneInfo, BoneTransform, Config, EditorError, EditorSession, LivePose, Phase,
    PoseRenderer, RotationAxis, Skeleton,
};

#[wasm_bindgen]
pub struct KeyrigEditor {
    core: EditorSession,
}

fn jsvalue_is_undefined_or_null(v: &JsValue) -> bool {
    v.is_undefined() || v.is_null()
}

/// Plain JS objects and arrays rather than `Map`s.
fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, swb::Error> {
    value.serialize(&swb::Serializer::json_compatible())
}

fn from_js<T: DeserializeOwned>(value: JsValue, what: &str) -> Result<T, JsError> {
    swb::from_value(value).map_err(|e| JsError::new(&format!("{what} parse error: {e}")))
}

fn editor_error(err: EditorError) -> JsError {
    JsError::new(&format!("[{}] {err}", err.category()))
}

/// Renderer capability backed by a JS object with the methods
/// `applyPose(pose)`, `boneTransform(name)`, `playClip(clip)`, `pause()`, `resume()`, `stop()`.
/// The first failing callback is kept and reported after the session call returns.
struct JsRenderer {
    this: JsValue,
    apply_pose: Function,
    bone_transform: Function,
    play_clip: Function,
    pause: Function,
    resume: Function,
    stop: Function,
    error: RefCell<Option<String>>,
}

impl JsRenderer {
    fn from_object(obj: JsValue) -> Result<Self, JsError> {
        if jsvalue_is_undefined_or_null(&obj) {
            return Err(JsError::new("renderer is null/undefined"));
        }
        let method = |name: &str| -> Result<Function, JsError> {
            Reflect::get(&obj, &JsValue::from_str(name))
                .ok()
                .and_then(|v| v.dyn_into::<Function>().ok())
                .ok_or_else(|| JsError::new(&format!("renderer is missing method '{name}'")))
        };
        Ok(JsRenderer {
            apply_pose: method("applyPose")?,
            bone_transform: method("boneTransform")?,
            play_clip: method("playClip")?,
            pause: method("pause")?,
            resume: method("resume")?,
            stop: method("stop")?,
            this: obj,
            error: RefCell::new(None),
        })
    }

    fn record(&self, what: &str, err: impl std::fmt::Debug) {
        let mut slot = self.error.borrow_mut();
        if slot.is_none() {
            *slot = Some(format!("renderer.{what} failed: {err:?}"));
        }
    }

    fn call0(&self, f: &Function, what: &str) {
        if let Err(e) = f.call0(&self.this) {
            self.record(what, e);
        }
    }

    fn call1<T: Serialize + ?Sized>(&self, f: &Function, what: &str, arg: &T) {
        match to_js(arg) {
            Ok(arg) => {
                if let Err(e) = f.call1(&self.this, &arg) {
                    self.record(what, e);
                }
            }
            Err(e) => self.record(what, e),
        }
    }

    fn finish(self) -> Result<(), JsError> {
        match self.error.into_inner() {
            Some(msg) => Err(JsError::new(&msg)),
            None => Ok(()),
        }
    }
}

impl PoseRenderer for JsRenderer {
    fn apply_pose(&mut self, pose: &LivePose) {
        self.call1(&self.apply_pose, "applyPose", pose);
    }

    fn bone_transform(&self, bone: &str) -> Option<BoneTransform> {
        match self.bone_transform.call1(&self.this, &JsValue::from_str(bone)) {
            Ok(val) if jsvalue_is_undefined_or_null(&val) => None,
            Ok(val) => swb::from_value(val).ok(),
            Err(e) => {
                self.record("boneTransform", e);
                None
            }
        }
    }

    fn play_clip(&mut self, clip: &AnimationClip) {
        self.call1(&self.play_clip, "playClip", clip);
    }

    fn pause(&mut self) {
        self.call0(&self.pause, "pause");
    }

    fn resume(&mut self) {
        self.call0(&self.resume, "resume");
    }

    fn stop(&mut self) {
        self.call0(&self.stop, "stop");
    }
}

fn parse_axis(axis: &str) -> Result<RotationAxis, JsError> {
    match axis {
        "x" | "X" => Ok(RotationAxis::X),
        "y" | "Y" => Ok(RotationAxis::Y),
        "z" | "Z" => Ok(RotationAxis::Z),
        other => Err(JsError::new(&format!("unknown rotation axis '{other}'"))),
    }
}

#[wasm_bindgen]
impl KeyrigEditor {
    /// Create an editing session. Pass a JSON config object or undefined/null for defaults.
    /// Example:
    ///   new KeyrigEditor({ gizmo_debounce_ms: 50 })
    #[wasm_bindgen(constructor)]
    pub fn new(config: JsValue) -> Result<KeyrigEditor, JsError> {
        console_error_panic_hook::set_once();

        let cfg: Config = if jsvalue_is_undefined_or_null(&config) {
            Config::default()
        } else {
            swb::from_value(config).map_err(|e| JsError::new(&format!("config error: {e}")))?
        };

        Ok(KeyrigEditor {
            core: EditorSession::new(cfg),
        })
    }

    /// Reset the session for a new model. `bones` is an array of
    /// `{ name, rest: { position: [x,y,z], quaternion: [x,y,z,w] } }`.
    #[wasm_bindgen(js_name = load_skeleton)]
    pub fn load_skeleton(&mut self, bones: JsValue) -> Result<(), JsError> {
        let bones: Vec<BoneInfo> = from_js(bones, "load_skeleton")?;
        self.core.load_skeleton(Skeleton::new(bones));
        Ok(())
    }

    #[wasm_bindgen(js_name = select_bone)]
    pub fn select_bone(&mut self, name: String) -> Result<(), JsError> {
        self.core.select_bone(&name).map_err(editor_error)
    }

    #[wasm_bindgen(js_name = set_rotation_axis)]
    pub fn set_rotation_axis(&mut self, axis: String, degrees: f64) -> Result<(), JsError> {
        let axis = parse_axis(&axis)?;
        self.core
            .set_rotation_axis(axis, degrees)
            .map_err(editor_error)
    }

    #[wasm_bindgen(js_name = set_rotation)]
    pub fn set_rotation(&mut self, x: f64, y: f64, z: f64) -> Result<(), JsError> {
        self.core.set_rotation_ui([x, y, z]).map_err(editor_error)
    }

    /// Panel rotation `[x, y, z]` in degrees.
    #[wasm_bindgen(js_name = rotation_ui)]
    pub fn rotation_ui(&self) -> Vec<f64> {
        self.core.rotation_ui().to_vec()
    }

    /// Key the selected bone; returns the keyed bone names (selected first).
    #[wasm_bindgen(js_name = set_keyframe)]
    pub fn set_keyframe(&mut self) -> Result<JsValue, JsError> {
        let outcome = self.core.set_keyframe_from_ui().map_err(editor_error)?;
        to_js(&outcome.keyed).map_err(|e| JsError::new(&format!("outputs error: {e}")))
    }

    #[wasm_bindgen(js_name = delete_keyframe)]
    pub fn delete_keyframe(&mut self) -> Result<bool, JsError> {
        self.core
            .delete_keyframe_at_current_time()
            .map_err(editor_error)
    }

    #[wasm_bindgen(js_name = set_current_time)]
    pub fn set_current_time(&mut self, t: f64) -> Result<(), JsError> {
        self.core.set_current_time(t).map_err(editor_error)
    }

    #[wasm_bindgen(js_name = step_frame)]
    pub fn step_frame(&mut self, forward: bool, coarse: bool) -> Result<(), JsError> {
        self.core.step_frame(forward, coarse).map_err(editor_error)
    }

    #[wasm_bindgen(js_name = jump_to_start)]
    pub fn jump_to_start(&mut self) -> Result<(), JsError> {
        self.core.jump_to_start().map_err(editor_error)
    }

    #[wasm_bindgen(js_name = jump_to_end)]
    pub fn jump_to_end(&mut self) -> Result<(), JsError> {
        self.core.jump_to_end().map_err(editor_error)
    }

    #[wasm_bindgen(js_name = set_duration)]
    pub fn set_duration(&mut self, duration: f64) -> Result<(), JsError> {
        self.core.set_duration(duration).map_err(editor_error)
    }

    #[wasm_bindgen(js_name = set_name)]
    pub fn set_name(&mut self, name: String) {
        self.core.set_animation_name(name);
    }

    #[wasm_bindgen(js_name = current_time)]
    pub fn current_time(&self) -> f64 {
        self.core.current_time()
    }

    #[wasm_bindgen]
    pub fn duration(&self) -> f64 {
        self.core.duration()
    }

    #[wasm_bindgen]
    pub fn name(&self) -> String {
        self.core.name().to_string()
    }

    /// "idle" | "dragging" | "playing"
    #[wasm_bindgen]
    pub fn phase(&self) -> String {
        match self.core.phase() {
            Phase::Idle => "idle",
            Phase::Dragging => "dragging",
            Phase::Playing => "playing",
        }
        .to_string()
    }

    #[wasm_bindgen(js_name = selected_bone)]
    pub fn selected_bone(&self) -> Option<String> {
        self.core.selected_bone().map(str::to_string)
    }

    // ----- playback; `renderer` is the JS renderer object -----

    #[wasm_bindgen]
    pub fn play(&mut self, renderer: JsValue) -> Result<(), JsError> {
        let mut r = JsRenderer::from_object(renderer)?;
        self.core.play(&mut r).map_err(editor_error)?;
        r.finish()
    }

    #[wasm_bindgen]
    pub fn pause(&mut self, renderer: JsValue) -> Result<(), JsError> {
        let mut r = JsRenderer::from_object(renderer)?;
        self.core.pause(&mut r).map_err(editor_error)?;
        r.finish()
    }

    #[wasm_bindgen]
    pub fn stop(&mut self, renderer: JsValue) -> Result<(), JsError> {
        let mut r = JsRenderer::from_object(renderer)?;
        self.core.stop(&mut r).map_err(editor_error)?;
        r.finish()
    }

    #[wasm_bindgen(js_name = toggle_playback)]
    pub fn toggle_playback(&mut self, renderer: JsValue) -> Result<(), JsError> {
        let mut r = JsRenderer::from_object(renderer)?;
        self.core.toggle_playback(&mut r).map_err(editor_error)?;
        r.finish()
    }

    #[wasm_bindgen]
    pub fn tick(&mut self, now_ms: f64, renderer: JsValue) -> Result<(), JsError> {
        let mut r = JsRenderer::from_object(renderer)?;
        self.core.tick(now_ms, &mut r);
        r.finish()
    }

    // ----- inbound notifications -----

    #[wasm_bindgen(js_name = on_time_update)]
    pub fn on_time_update(&mut self, t: f64) {
        self.core.on_time_update(t);
    }

    #[wasm_bindgen(js_name = on_gizmo_dragging_changed)]
    pub fn on_gizmo_dragging_changed(&mut self, dragging: bool) {
        self.core.on_gizmo_dragging_changed(dragging);
    }

    /// `position` is `[x,y,z]`, `rotation` is `[x,y,z,w]`.
    #[wasm_bindgen(js_name = on_bone_transform_dragged)]
    pub fn on_bone_transform_dragged(
        &mut self,
        name: String,
        position: JsValue,
        rotation: JsValue,
        now_ms: f64,
    ) -> Result<(), JsError> {
        let position: [f64; 3] = from_js(position, "position")?;
        let rotation: [f64; 4] = from_js(rotation, "rotation")?;
        self.core
            .on_bone_transform_dragged(&name, position, rotation, now_ms);
        Ok(())
    }

    #[wasm_bindgen(js_name = on_bone_clicked)]
    pub fn on_bone_clicked(&mut self, name: String) -> Result<(), JsError> {
        self.core.on_bone_clicked(&name).map_err(editor_error)
    }

    // ----- state snapshots -----

    /// Track store as `{ bone: [{ time, position?, rotation? }] }`.
    #[wasm_bindgen]
    pub fn keyframes(&self) -> Result<JsValue, JsError> {
        to_js(self.core.keyframes()).map_err(|e| JsError::new(&format!("outputs error: {e}")))
    }

    #[wasm_bindgen(js_name = live_pose)]
    pub fn live_pose(&self) -> Result<JsValue, JsError> {
        to_js(self.core.live_pose()).map_err(|e| JsError::new(&format!("outputs error: {e}")))
    }

    #[wasm_bindgen(js_name = has_keyframe_at_current_time)]
    pub fn has_keyframe_at_current_time(&self) -> bool {
        self.core.has_keyframe_at_current_time()
    }

    #[wasm_bindgen(js_name = selected_bone_keyframe_count)]
    pub fn selected_bone_keyframe_count(&self) -> usize {
        self.core.selected_bone_keyframe_count()
    }

    #[wasm_bindgen(js_name = bone_keyframe_count)]
    pub fn bone_keyframe_count(&self, name: String) -> usize {
        self.core.bone_keyframe_count(&name)
    }

    #[wasm_bindgen(js_name = total_keyframe_count)]
    pub fn total_keyframe_count(&self) -> usize {
        self.core.total_keyframe_count()
    }

    #[wasm_bindgen(js_name = animated_bones)]
    pub fn animated_bones(&self) -> Vec<String> {
        self.core.animated_bones()
    }

    /// Drain session events recorded since the last call.
    #[wasm_bindgen(js_name = drain_events)]
    pub fn drain_events(&mut self) -> Result<JsValue, JsError> {
        let events = self.core.drain_events();
        to_js(&events).map_err(|e| JsError::new(&format!("events error: {e}")))
    }

    // ----- export / import -----

    #[wasm_bindgen(js_name = export_json)]
    pub fn export_json(&self) -> Result<String, JsError> {
        self.core.export_json().map_err(editor_error)
    }

    #[wasm_bindgen(js_name = export_file_name)]
    pub fn export_file_name(&self, ext: String) -> String {
        self.core.export_file_name(&ext)
    }

    /// Native clip `{ name, duration, tracks: [{ name, times, values }] }` for a GLTF exporter.
    #[wasm_bindgen(js_name = export_clip)]
    pub fn export_clip(&self) -> Result<JsValue, JsError> {
        let clip = self.core.export_clip().map_err(editor_error)?;
        to_js(&clip).map_err(|e| JsError::new(&format!("outputs error: {e}")))
    }

    /// Import an interchange JSON document. Returns the import report.
    #[wasm_bindgen(js_name = import_json)]
    pub fn import_json(&mut self, text: String) -> Result<JsValue, JsError> {
        let report = self.core.import_json(&text).map_err(editor_error)?;
        to_js(&report).map_err(|e| JsError::new(&format!("outputs error: {e}")))
    }

    /// Import clips decoded by the host from `file_name`. Pass `decode_error` instead of clips
    /// when decoding failed.
    #[wasm_bindgen(js_name = import_asset)]
    pub fn import_asset(
        &mut self,
        file_name: String,
        clips: JsValue,
        decode_error: Option<String>,
    ) -> Result<JsValue, JsError> {
        let decoded = match decode_error {
            Some(reason) => Err(reason),
            None if jsvalue_is_undefined_or_null(&clips) => Ok(Vec::new()),
            None => Ok(from_js::<Vec<AnimationClip>>(clips, "import_asset")?),
        };
        let report = self
            .core
            .import_asset(&file_name, decoded)
            .map_err(editor_error)?;
        to_js(&report).map_err(|e| JsError::new(&format!("outputs error: {e}")))
    }
}

/// Numeric ABI version for compatibility checks at init.
#[wasm_bindgen]
pub fn abi_version() -> u32 {
    1
}
