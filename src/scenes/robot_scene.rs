use std::cell::RefCell;
use std::rc::Rc;
use futures::future::LocalBoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use crate::robot_modules::robot::Robot;
use crate::robot_modules::robot_joint_gizmo_module::{JointStatus, RobotJointGizmoModule};
use crate::robot_modules::robot_mesh_loading_module::{LoadProgressCallback, ProgressSubscription, RobotMeshLoadingModule};
use crate::robot_modules::robot_model_module::RobotModelModule;
use crate::scenes::robot_scene_camera::ArcRotateCameraState;
use crate::utils::utils_config::ViewerConfig;
use crate::utils::utils_console::urdf_error;
use crate::utils::utils_errors::UrdfSceneError;
use crate::utils::utils_robot::geometry::{MeshFetcher, MeshGeometry, MeshLoadProgress, MeshProgressCallback};
use crate::utils::utils_se3::scene_graph::{ManipulatorKind, ManipulatorVisual, SceneGraph, SceneNodeId, SceneNodePayload};

/// The presentation side of the viewer: camera, status text, error reporting and timers.
pub trait SceneHost {
    fn apply_camera(&self, camera: &ArcRotateCameraState);
    fn show_status(&self, status: &JointStatus);
    fn hide_status(&self);
    fn report_error(&self, error: &UrdfSceneError);
    /// Resolves after roughly `ms` milliseconds.
    fn defer(&self, ms: u32) -> LocalBoxFuture<'static, ()>;
}

/// Orchestrates loading a URDF into a scene graph, mesh loading with progress, camera framing
/// and the joint / robot gizmos.  Cheap to clone; clones share the same scene.
#[derive(Clone)]
pub struct RobotScene {
    inner: Rc<RobotSceneInner>
}

struct RobotSceneInner {
    config: ViewerConfig,
    fetcher: Rc<dyn MeshFetcher>,
    host: Rc<dyn SceneHost>,
    graph: RefCell<SceneGraph>,
    robot: RefCell<Option<Robot>>,
    loading: RefCell<RobotMeshLoadingModule>,
    progress: RefCell<ProgressSubscription>,
    joint_gizmos: RefCell<RobotJointGizmoModule>,
    robot_gizmos: RefCell<RobotGizmoToggles>,
    camera: RefCell<CameraMemory>
}

#[derive(Default)]
struct RobotGizmoToggles {
    axis: Option<SceneNodeId>,
    rotation: Option<SceneNodeId>
}

struct CameraMemory {
    current: ArcRotateCameraState,
    last_framed: Option<ArcRotateCameraState>
}

impl RobotScene {
    pub fn new(config: ViewerConfig, fetcher: Rc<dyn MeshFetcher>, host: Rc<dyn SceneHost>) -> Self {
        let camera = CameraMemory { current: config.default_camera.clone(), last_framed: None };
        Self {
            inner: Rc::new(RobotSceneInner {
                config,
                fetcher,
                host,
                graph: RefCell::new(SceneGraph::new()),
                robot: RefCell::new(None),
                loading: RefCell::new(RobotMeshLoadingModule::new()),
                progress: RefCell::new(ProgressSubscription::new()),
                joint_gizmos: RefCell::new(RobotJointGizmoModule::new()),
                robot_gizmos: RefCell::new(RobotGizmoToggles::default()),
                camera: RefCell::new(camera)
            })
        }
    }
    pub fn config(&self) -> &ViewerConfig {
        &self.inner.config
    }

    /// Replaces the current robot with the one described by `urdf`.  The previous robot is
    /// disposed first, so a document that fails to parse leaves the scene empty; the error is
    /// reported to the host and returned.  Resolves once every mesh has settled and the camera
    /// has been framed, or early when another `apply_urdf` supersedes this one.
    pub async fn apply_urdf(&self, urdf: &str) -> Result<(), UrdfSceneError> {
        let inner = &self.inner;
        let generation = self.invalidate();

        let mut robot = match RobotModelModule::build_robot_with_config(urdf, &inner.config) {
            Ok(r) => { r }
            Err(e) => {
                urdf_error(&e.to_string());
                inner.host.report_error(&e);
                return Err(e);
            }
        };

        let slots = robot.mesh_slots();
        inner.loading.borrow_mut().begin(generation, slots.len());

        robot.create(&mut inner.graph.borrow_mut());
        *inner.robot.borrow_mut() = Some(robot);
        Self::dispatch_progress(inner);

        if slots.is_empty() {
            inner.host.defer(inner.config.framing_delay_ms).await;
            let should_frame = inner.loading.borrow_mut().should_frame_without_meshes(generation);
            if should_frame { self.frame_robot(); }
            return Ok(());
        }

        let mut loads = FuturesUnordered::new();
        for (mesh_id, slot) in slots.into_iter().enumerate() {
            let weak = Rc::downgrade(inner);
            let on_progress: MeshProgressCallback = Rc::new(move |p: MeshLoadProgress| {
                if let Some(inner) = weak.upgrade() {
                    inner.loading.borrow_mut().on_mesh_progress(generation, mesh_id, p.percent());
                    Self::dispatch_progress(&inner);
                }
            });
            let fetcher = inner.fetcher.clone();
            loads.push(async move {
                let result = MeshGeometry::load(fetcher, slot.uri.clone(), slot.scale, Some(on_progress)).await;
                (mesh_id, slot, result)
            });
        }

        while let Some((mesh_id, slot, result)) = loads.next().await {
            // superseded: the robot these meshes belong to is already gone
            if inner.loading.borrow().generation() != generation { return Ok(()); }

            if let Some(robot) = inner.robot.borrow_mut().as_mut() {
                robot.attach_loaded_meshes(&mut inner.graph.borrow_mut(), &slot, result);
            }
            let should_frame = inner.loading.borrow_mut().on_mesh_complete(generation, mesh_id);
            Self::dispatch_progress(inner);
            if should_frame {
                inner.host.defer(inner.config.framing_delay_ms).await;
                if inner.loading.borrow().generation() == generation { self.frame_robot(); }
            }
        }

        Ok(())
    }
    /// Disposes the current robot and its gizmos and starts a new load generation.
    fn invalidate(&self) -> u64 {
        let inner = &self.inner;
        let generation = inner.loading.borrow_mut().invalidate();

        {
            let mut graph = inner.graph.borrow_mut();
            inner.joint_gizmos.borrow_mut().deselect(&mut graph);
            let mut toggles = inner.robot_gizmos.borrow_mut();
            for n in [toggles.axis.take(), toggles.rotation.take()].into_iter().flatten() {
                graph.dispose_node(n);
            }
            let previous = inner.robot.borrow_mut().take();
            if let Some(mut robot) = previous {
                robot.dispose(&mut graph);
            }
        }
        inner.host.hide_status();

        generation
    }
    /// Hands queued progress events to the subscriber.  Must be called with no scene borrow
    /// alive: the callback may call back into the scene.
    fn dispatch_progress(inner: &RobotSceneInner) {
        let events = inner.loading.borrow_mut().take_events();
        if events.is_empty() { return; }
        ProgressSubscription::dispatch(&inner.progress, events);
    }
    fn frame_robot(&self) {
        let inner = &self.inner;
        let bounds = {
            let graph = inner.graph.borrow();
            let robot = inner.robot.borrow();
            robot.as_ref().and_then(|r| r.root()).and_then(|root| graph.world_bounds(root))
        };
        let base = inner.config.default_camera.clone();
        let camera = match bounds {
            Some((min, max)) => { base.framed_on(&min, &max, inner.config.framing_padding, inner.config.framing_min_radius) }
            None => { base }
        };
        {
            let mut memory = inner.camera.borrow_mut();
            memory.last_framed = Some(camera.clone());
            memory.current = camera.clone();
        }
        inner.host.apply_camera(&camera);
    }

    /// `None` silences progress reporting.
    pub fn set_load_progress_callback(&self, callback: Option<LoadProgressCallback>) {
        self.inner.progress.borrow_mut().set(callback);
    }
    /// Goes back to the last auto-framed view, or the configured default view if the camera
    /// has never been framed.
    pub fn reset_camera(&self) {
        let camera = {
            let mut memory = self.inner.camera.borrow_mut();
            memory.current = memory.last_framed.clone().unwrap_or_else(|| self.inner.config.default_camera.clone());
            memory.current.clone()
        };
        self.inner.host.apply_camera(&camera);
    }
    pub fn camera(&self) -> ArcRotateCameraState {
        self.inner.camera.borrow().current.clone()
    }

    /// Shows or hides a translation gizmo on the robot root.  Returns whether it is shown.
    pub fn toggle_axis_on_robot(&self) -> bool {
        self.toggle_robot_gizmo(ManipulatorKind::Position)
    }
    /// Shows or hides a rotation gizmo on the robot root.  Returns whether it is shown.
    pub fn toggle_axis_rotation_on_robot(&self) -> bool {
        self.toggle_robot_gizmo(ManipulatorKind::Rotation)
    }
    fn toggle_robot_gizmo(&self, kind: ManipulatorKind) -> bool {
        let inner = &self.inner;
        let root = match inner.robot.borrow().as_ref().and_then(|r| r.root()) { Some(r) => { r } None => { return false; } };
        let mut graph = inner.graph.borrow_mut();
        let mut toggles = inner.robot_gizmos.borrow_mut();
        let slot = match kind {
            ManipulatorKind::Position => { &mut toggles.axis }
            _ => { &mut toggles.rotation }
        };
        match slot.take() {
            Some(n) => {
                graph.dispose_node(n);
                false
            }
            None => {
                let name = format!("robot_{:?}_gizmo", kind).to_lowercase();
                let payload = SceneNodePayload::Manipulator(ManipulatorVisual { kind, local_axis: None, color: None });
                *slot = Some(graph.create_node_with_payload(&name, Some(root), payload));
                true
            }
        }
    }
    pub fn robot_gizmo_nodes(&self) -> (Option<SceneNodeId>, Option<SceneNodeId>) {
        let toggles = self.inner.robot_gizmos.borrow();
        (toggles.axis, toggles.rotation)
    }

    /// Attaches the exercise gizmo to the named joint.  Returns true when a gizmo is attached
    /// afterwards.
    pub fn select_joint(&self, joint_name: &str) -> bool {
        let status = {
            let inner = &self.inner;
            let robot = inner.robot.borrow();
            let robot = match robot.as_ref() { Some(r) => { r } None => { return false; } };
            inner.joint_gizmos.borrow_mut().select_joint(&mut inner.graph.borrow_mut(), robot, joint_name)
        };
        self.update_status(status)
    }
    /// Selects the joint moving whatever link the renderer picked.
    pub fn select_joint_from_pick(&self, picked: SceneNodeId) -> bool {
        let status = {
            let inner = &self.inner;
            let robot = inner.robot.borrow();
            let robot = match robot.as_ref() { Some(r) => { r } None => { return false; } };
            inner.joint_gizmos.borrow_mut().select_joint_from_pick(&mut inner.graph.borrow_mut(), robot, picked)
        };
        self.update_status(status)
    }
    /// Feeds a manipulator drag into the selected joint and returns the joint's new value.
    pub fn drag_gizmo(&self, delta: f64) -> Option<f64> {
        let inner = &self.inner;
        let (status, value) = {
            let mut robot = inner.robot.borrow_mut();
            let robot = robot.as_mut()?;
            let mut gizmos = inner.joint_gizmos.borrow_mut();
            let status = gizmos.drag(&mut inner.graph.borrow_mut(), robot, delta)?;
            (status, gizmos.current_value(robot))
        };
        inner.host.show_status(&status);
        value
    }
    pub fn deselect_joint(&self) {
        let removed = self.inner.joint_gizmos.borrow_mut().deselect(&mut self.inner.graph.borrow_mut());
        if removed { self.inner.host.hide_status(); }
    }
    pub fn selected_joint(&self) -> Option<String> {
        self.inner.joint_gizmos.borrow().attached_gizmo().map(|g| g.joint_name().to_string())
    }
    fn update_status(&self, status: Option<JointStatus>) -> bool {
        match status {
            Some(s) => { self.inner.host.show_status(&s); }
            None => {
                if self.selected_joint().is_none() { self.inner.host.hide_status(); }
            }
        }
        self.selected_joint().is_some()
    }
    /// Shows or hides every collision entry of the current robot.
    pub fn toggle_collisions(&self, enabled: bool) {
        let inner = &self.inner;
        if let Some(robot) = inner.robot.borrow_mut().as_mut() {
            robot.set_collisions_enabled(&mut inner.graph.borrow_mut(), enabled);
        }
    }

    pub fn has_robot(&self) -> bool {
        self.inner.robot.borrow().is_some()
    }
    /// Runs `f` on the current robot, if there is one.
    pub fn with_robot<R>(&self, f: impl FnOnce(&Robot) -> R) -> Option<R> {
        self.inner.robot.borrow().as_ref().map(f)
    }
    pub fn with_graph<R>(&self, f: impl FnOnce(&SceneGraph) -> R) -> R {
        f(&self.inner.graph.borrow())
    }
}
