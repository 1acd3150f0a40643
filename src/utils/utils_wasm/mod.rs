//! Browser bindings.  The host page hands in a mesh fetch function and an object with the
//! presentation callbacks; everything else runs in `RobotScene`.

use std::rc::Rc;
use futures::future::LocalBoxFuture;
use js_sys::{Function, Object, Promise, Reflect, Uint8Array};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{future_to_promise, JsFuture};
use crate::robot_modules::robot_joint_gizmo_module::JointStatus;
use crate::scenes::robot_scene::{RobotScene, SceneHost};
use crate::scenes::robot_scene_camera::ArcRotateCameraState;
use crate::utils::utils_config::ViewerConfig;
use crate::utils::utils_errors::UrdfSceneError;
use crate::utils::utils_robot::geometry::{MeshFetcher, MeshLoadProgress, MeshProgressCallback};
use crate::utils::utils_traits::ToAndFromJsonString;

fn js_error_string(e: &JsValue) -> String {
    e.as_string().unwrap_or_else(|| format!("{:?}", e))
}

/// Calls `fetchMesh(uri, onProgress(loaded, total))`, which must return a promise of a
/// `Uint8Array`.  A non-finite or non-positive `total` means the length is unknown.
struct JsMeshFetcher {
    fetch_mesh: Function
}
impl MeshFetcher for JsMeshFetcher {
    fn fetch(&self, uri: &str, on_progress: MeshProgressCallback) -> LocalBoxFuture<'static, Result<Vec<u8>, UrdfSceneError>> {
        let fetch_mesh = self.fetch_mesh.clone();
        let uri = uri.to_string();
        Box::pin(async move {
            let progress = Closure::wrap(Box::new(move |loaded: f64, total: f64| {
                let total = if total.is_finite() && total > 0.0 { Some(total as u64) } else { None };
                on_progress(MeshLoadProgress::new(loaded.max(0.0) as u64, total));
            }) as Box<dyn FnMut(f64, f64)>);

            let promise = fetch_mesh.call2(&JsValue::NULL, &JsValue::from_str(&uri), progress.as_ref().unchecked_ref())
                .map_err(|e| UrdfSceneError::new_mesh_fetch_error(&uri, &js_error_string(&e), file!(), line!()))?;
            let value = JsFuture::from(Promise::resolve(&promise)).await
                .map_err(|e| UrdfSceneError::new_mesh_fetch_error(&uri, &js_error_string(&e), file!(), line!()))?;
            drop(progress);

            Ok(Uint8Array::new(&value).to_vec())
        })
    }
}

/// Forwards to optional methods of a JS object: `applyCamera(camera)`, `showStatus(status)`,
/// `hideStatus()`, `reportError(notificationJson)`.  Missing methods are skipped.
struct JsSceneHost {
    callbacks: Object
}
impl JsSceneHost {
    fn call(&self, name: &str, arg: Option<JsValue>) {
        let f = match Reflect::get(&self.callbacks, &JsValue::from_str(name)).ok().and_then(|f| f.dyn_into::<Function>().ok()) {
            Some(f) => { f }
            None => { return; }
        };
        let res = match arg {
            Some(a) => { f.call1(&self.callbacks, &a) }
            None => { f.call0(&self.callbacks) }
        };
        if let Err(e) = res {
            crate::utils::utils_console::urdf_error(&format!("Host callback {} threw: {}", name, js_error_string(&e)));
        }
    }
}
impl SceneHost for JsSceneHost {
    fn apply_camera(&self, camera: &ArcRotateCameraState) {
        self.call("applyCamera", Some(JsValue::from_serde(camera).unwrap_or(JsValue::NULL)));
    }
    fn show_status(&self, status: &JointStatus) {
        self.call("showStatus", Some(JsValue::from_serde(status).unwrap_or(JsValue::NULL)));
    }
    fn hide_status(&self) {
        self.call("hideStatus", None);
    }
    fn report_error(&self, error: &UrdfSceneError) {
        self.call("reportError", Some(JsValue::from_str(&error.to_notification_json())));
    }
    fn defer(&self, ms: u32) -> LocalBoxFuture<'static, ()> {
        let promise = Promise::new(&mut |resolve, _reject| {
            let set_timeout = Reflect::get(&js_sys::global(), &JsValue::from_str("setTimeout")).ok().and_then(|f| f.dyn_into::<Function>().ok());
            let scheduled = match set_timeout {
                Some(set_timeout) => { set_timeout.call2(&JsValue::NULL, &resolve, &JsValue::from(ms)).is_ok() }
                None => { false }
            };
            if !scheduled { let _ = resolve.call0(&JsValue::NULL); }
        });
        Box::pin(async move {
            let _ = JsFuture::from(promise).await;
        })
    }
}

#[wasm_bindgen]
pub struct RobotSceneWasm {
    scene: RobotScene
}
#[wasm_bindgen]
impl RobotSceneWasm {
    /// `config_json` may be empty for the default configuration.
    #[wasm_bindgen(constructor)]
    pub fn new(fetch_mesh: Function, host: Object, config_json: &str) -> Result<RobotSceneWasm, JsValue> {
        let config = if config_json.trim().is_empty() {
            ViewerConfig::default()
        } else {
            ViewerConfig::load_from_json_string(config_json).map_err(|e| JsValue::from_str(&e.to_string()))?
        };
        let scene = RobotScene::new(config, Rc::new(JsMeshFetcher { fetch_mesh }), Rc::new(JsSceneHost { callbacks: host }));
        Ok(Self { scene })
    }
    #[wasm_bindgen(js_name = applyURDF)]
    pub fn apply_urdf(&self, urdf: String) -> Promise {
        let scene = self.scene.clone();
        future_to_promise(async move {
            match scene.apply_urdf(&urdf).await {
                Ok(()) => { Ok(JsValue::UNDEFINED) }
                Err(e) => { Err(JsValue::from_str(&e.to_notification_json())) }
            }
        })
    }
    /// `callback(loaded, total, percent)`; pass `null` to silence progress.
    #[wasm_bindgen(js_name = setLoadProgressCallback)]
    pub fn set_load_progress_callback(&self, callback: Option<Function>) {
        let callback = callback.map(|f| {
            Box::new(move |loaded: usize, total: usize, percent: f64| {
                let _ = f.call3(&JsValue::NULL, &JsValue::from(loaded as u32), &JsValue::from(total as u32), &JsValue::from(percent));
            }) as Box<dyn FnMut(usize, usize, f64)>
        });
        self.scene.set_load_progress_callback(callback);
    }
    #[wasm_bindgen(js_name = resetCamera)]
    pub fn reset_camera(&self) {
        self.scene.reset_camera();
    }
    #[wasm_bindgen(js_name = toggleAxisOnRobot)]
    pub fn toggle_axis_on_robot(&self) -> bool {
        self.scene.toggle_axis_on_robot()
    }
    #[wasm_bindgen(js_name = toggleAxisRotationOnRobot)]
    pub fn toggle_axis_rotation_on_robot(&self) -> bool {
        self.scene.toggle_axis_rotation_on_robot()
    }
    #[wasm_bindgen(js_name = selectJoint)]
    pub fn select_joint(&self, joint_name: &str) -> bool {
        self.scene.select_joint(joint_name)
    }
    #[wasm_bindgen(js_name = dragGizmo)]
    pub fn drag_gizmo(&self, delta: f64) -> Option<f64> {
        self.scene.drag_gizmo(delta)
    }
    #[wasm_bindgen(js_name = deselectJoint)]
    pub fn deselect_joint(&self) {
        self.scene.deselect_joint();
    }
    #[wasm_bindgen(js_name = toggleCollisions)]
    pub fn toggle_collisions(&self, enabled: bool) {
        self.scene.toggle_collisions(enabled);
    }
    /// JSON summary of the loaded robot, or `null` when nothing is loaded.
    #[wasm_bindgen(js_name = robotSummary)]
    pub fn robot_summary(&self) -> JsValue {
        match self.scene.with_robot(|r| r.to_summary()) {
            Some(s) => { JsValue::from_serde(&s).unwrap_or(JsValue::NULL) }
            None => { JsValue::NULL }
        }
    }
}
