#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use futures::channel::oneshot;
use futures::future::LocalBoxFuture;
use urdf_scene::robot_modules::robot_joint_gizmo_module::JointStatus;
use urdf_scene::scenes::robot_scene::SceneHost;
use urdf_scene::scenes::robot_scene_camera::ArcRotateCameraState;
use urdf_scene::utils::utils_errors::UrdfSceneError;
use urdf_scene::utils::utils_robot::geometry::{MeshFetcher, MeshLoadProgress, MeshProgressCallback};

/// A one-triangle binary STL.
pub fn triangle_stl() -> Vec<u8> {
    let mesh = vec![stl_io::Triangle {
        normal: stl_io::Normal::new([0.0, 0.0, 1.0]),
        vertices: [
            stl_io::Vertex::new([0.0, 0.0, 0.0]),
            stl_io::Vertex::new([1.0, 0.0, 0.0]),
            stl_io::Vertex::new([0.0, 1.0, 0.0])
        ]
    }];
    let mut bytes = Vec::new();
    stl_io::write_stl(&mut bytes, mesh.iter()).unwrap();
    bytes
}

/// Serves every uri immediately with the same bytes, reporting full progress first.
pub struct InstantFetcher {
    pub bytes: Vec<u8>
}
impl MeshFetcher for InstantFetcher {
    fn fetch(&self, _uri: &str, on_progress: MeshProgressCallback) -> LocalBoxFuture<'static, Result<Vec<u8>, UrdfSceneError>> {
        let bytes = self.bytes.clone();
        Box::pin(async move {
            on_progress(MeshLoadProgress::new(bytes.len() as u64, Some(bytes.len() as u64)));
            Ok(bytes)
        })
    }
}

pub struct PendingFetch {
    pub uri: String,
    pub sender: oneshot::Sender<Vec<u8>>,
    pub on_progress: MeshProgressCallback
}

/// Holds every fetch open until the test answers it.  Dropping a sender fails the fetch.
#[derive(Default)]
pub struct ScriptedFetcher {
    pub pending: RefCell<Vec<PendingFetch>>
}
impl ScriptedFetcher {
    pub fn take_pending(&self) -> Vec<PendingFetch> {
        std::mem::take(&mut *self.pending.borrow_mut())
    }
}
impl MeshFetcher for ScriptedFetcher {
    fn fetch(&self, uri: &str, on_progress: MeshProgressCallback) -> LocalBoxFuture<'static, Result<Vec<u8>, UrdfSceneError>> {
        let (sender, receiver) = oneshot::channel();
        self.pending.borrow_mut().push(PendingFetch { uri: uri.to_string(), sender, on_progress });
        let uri = uri.to_string();
        Box::pin(async move {
            receiver.await.map_err(|_| UrdfSceneError::new_mesh_fetch_error(&uri, "request dropped", file!(), line!()))
        })
    }
}

#[derive(Default)]
pub struct RecordingHost {
    pub cameras: RefCell<Vec<ArcRotateCameraState>>,
    pub statuses: RefCell<Vec<JointStatus>>,
    pub hide_calls: Cell<usize>,
    pub errors: RefCell<Vec<String>>
}
impl SceneHost for RecordingHost {
    fn apply_camera(&self, camera: &ArcRotateCameraState) {
        self.cameras.borrow_mut().push(camera.clone());
    }
    fn show_status(&self, status: &JointStatus) {
        self.statuses.borrow_mut().push(status.clone());
    }
    fn hide_status(&self) {
        self.hide_calls.set(self.hide_calls.get() + 1);
    }
    fn report_error(&self, error: &UrdfSceneError) {
        self.errors.borrow_mut().push(error.to_notification_json());
    }
    fn defer(&self, _ms: u32) -> LocalBoxFuture<'static, ()> {
        Box::pin(futures::future::ready(()))
    }
}

pub type ProgressLog = Rc<RefCell<Vec<(usize, usize, f64)>>>;

pub fn progress_recorder() -> (ProgressLog, Box<dyn FnMut(usize, usize, f64)>) {
    let log: ProgressLog = Rc::new(RefCell::new(vec![]));
    let l = log.clone();
    (log, Box::new(move |loaded: usize, total: usize, percent: f64| l.borrow_mut().push((loaded, total, percent))))
}

pub const CYAN_BASE: &str = r#"<?xml version="1.0"?>
<robot name="cyan_box">
  <material name="Cyan"><color rgba="0 1.0 1.0 1.0"/></material>
  <link name="base_link">
    <visual>
      <geometry><box size="0.6 0.1 0.2"/></geometry>
      <material name="Cyan"/>
    </visual>
  </link>
</robot>"#;

pub const FOUR_MESHES: &str = r#"<robot name="four">
  <link name="base_link">
    <visual><geometry><mesh filename="package://four/base.stl"/></geometry></visual>
    <collision><geometry><mesh filename="package://four/base_collision.stl"/></geometry></collision>
  </link>
  <link name="arm">
    <visual><geometry><mesh filename="package://four/arm.stl"/></geometry></visual>
    <visual><origin xyz="0 0 1"/><geometry><mesh filename="package://four/hand.stl" scale="0.5 0.5 0.5"/></geometry></visual>
  </link>
  <joint name="shoulder" type="revolute">
    <parent link="base_link"/><child link="arm"/>
    <axis xyz="0 0 1"/>
    <limit lower="-1.0" upper="1.0"/>
  </joint>
</robot>"#;

pub const ONE_MESH: &str = r#"<robot name="one">
  <link name="only">
    <visual><geometry><mesh filename="one.stl"/></geometry></visual>
  </link>
</robot>"#;
