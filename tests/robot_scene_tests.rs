mod common;

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use futures::executor::{block_on, LocalPool};
use futures::future::LocalBoxFuture;
use futures::task::LocalSpawnExt;
use nalgebra::Vector3;
use urdf_scene::robot_modules::robot_joint_gizmo_module::JointStatus;
use urdf_scene::scenes::robot_scene::{RobotScene, SceneHost};
use urdf_scene::scenes::robot_scene_camera::ArcRotateCameraState;
use urdf_scene::utils::utils_config::ViewerConfig;
use urdf_scene::utils::utils_errors::UrdfSceneError;
use urdf_scene::utils::utils_robot::geometry::MeshLoadProgress;
use urdf_scene::utils::utils_se3::scene_graph::SceneNodePayload;
use common::*;

fn instant_scene() -> (RobotScene, Rc<RecordingHost>) {
    let host = Rc::new(RecordingHost::default());
    let fetcher = Rc::new(InstantFetcher { bytes: triangle_stl() });
    (RobotScene::new(ViewerConfig::default(), fetcher, host.clone()), host)
}

#[test]
fn four_meshes_report_progress_and_frame_once() {
    let (scene, host) = instant_scene();
    let (log, callback) = progress_recorder();
    scene.set_load_progress_callback(Some(callback));

    block_on(scene.apply_urdf(FOUR_MESHES)).unwrap();

    let events = log.borrow();
    assert_eq!(events.first(), Some(&(0, 4, 0.0)));
    assert_eq!(events.last(), Some(&(4, 4, 100.0)));
    assert!(events.windows(2).all(|w| w[1].0 >= w[0].0));
    let completions: Vec<usize> = events.windows(2).filter(|w| w[1].0 > w[0].0).map(|w| w[1].0).collect();
    assert_eq!(completions, vec![1, 2, 3, 4]);

    assert_eq!(host.cameras.borrow().len(), 1);
    let loaded = scene.with_robot(|r| r.link("arm").unwrap().visuals()[0].instance().as_ref().unwrap().geometry().meshes().len()).unwrap();
    assert_eq!(loaded, 1);
}

#[test]
fn primitive_robot_frames_after_deferred_tick() {
    let (scene, host) = instant_scene();
    let (log, callback) = progress_recorder();
    scene.set_load_progress_callback(Some(callback));

    block_on(scene.apply_urdf(CYAN_BASE)).unwrap();

    assert!(log.borrow().is_empty());
    let cameras = host.cameras.borrow();
    assert_eq!(cameras.len(), 1);
    let default = ArcRotateCameraState::new_default();
    assert_eq!((cameras[0].alpha, cameras[0].beta), (default.alpha, default.beta));
    assert!(cameras[0].target.norm() < 1e-9);
    assert!(cameras[0].radius > 0.0);
}

#[test]
fn reset_camera_uses_default_until_framed() {
    let (scene, host) = instant_scene();
    scene.reset_camera();
    assert_eq!(host.cameras.borrow()[0], ArcRotateCameraState::new_default());
    assert_eq!(scene.camera(), ArcRotateCameraState::new_default());

    block_on(scene.apply_urdf(CYAN_BASE)).unwrap();
    let framed = host.cameras.borrow().last().cloned().unwrap();
    scene.reset_camera();
    assert_eq!(host.cameras.borrow().last(), Some(&framed));
}

#[test]
fn failed_parse_reports_and_leaves_scene_empty() {
    let (scene, host) = instant_scene();
    block_on(scene.apply_urdf(CYAN_BASE)).unwrap();
    assert!(scene.has_robot());

    let err = block_on(scene.apply_urdf("<robot name=\"empty\"></robot>")).unwrap_err();
    assert!(err.is_malformed_urdf_error());
    assert!(!scene.has_robot());
    assert_eq!(scene.with_graph(|g| g.num_live_nodes()), 0);

    let errors = host.errors.borrow();
    assert_eq!(errors.len(), 1);
    let v: serde_json::Value = serde_json::from_str(&errors[0]).unwrap();
    assert_eq!(v["kind"], "MalformedURDFError");
}

#[test]
fn superseded_load_is_ignored() {
    let host = Rc::new(RecordingHost::default());
    let fetcher = Rc::new(ScriptedFetcher::default());
    let scene = RobotScene::new(ViewerConfig::default(), fetcher.clone(), host.clone());
    let (log, callback) = progress_recorder();
    scene.set_load_progress_callback(Some(callback));

    let mut pool = LocalPool::new();
    let spawner = pool.spawner();

    let s = scene.clone();
    spawner.spawn_local(async move { let _ = s.apply_urdf(FOUR_MESHES).await; }).unwrap();
    pool.run_until_stalled();
    let old_fetches = fetcher.take_pending();
    assert_eq!(old_fetches.len(), 4);

    let s = scene.clone();
    spawner.spawn_local(async move { let _ = s.apply_urdf(ONE_MESH).await; }).unwrap();
    pool.run_until_stalled();
    let new_fetches = fetcher.take_pending();
    assert_eq!(new_fetches.len(), 1);
    assert_eq!(log.borrow().last(), Some(&(0, 1, 0.0)));

    // the old robot's loads finish late
    let events_before = log.borrow().len();
    for f in old_fetches {
        (f.on_progress)(MeshLoadProgress::new(5, Some(10)));
        let _ = f.sender.send(triangle_stl());
    }
    pool.run_until_stalled();
    assert_eq!(log.borrow().len(), events_before);
    assert!(host.cameras.borrow().is_empty());
    assert_eq!(scene.with_robot(|r| r.name().to_string()), Some("one".to_string()));

    for f in new_fetches {
        (f.on_progress)(MeshLoadProgress::new(5, Some(10)));
        let _ = f.sender.send(triangle_stl());
    }
    pool.run_until_stalled();
    assert_eq!(log.borrow().last(), Some(&(1, 1, 100.0)));
    assert_eq!(host.cameras.borrow().len(), 1);
}

#[test]
fn failed_mesh_still_completes() {
    let host = Rc::new(RecordingHost::default());
    let fetcher = Rc::new(ScriptedFetcher::default());
    let scene = RobotScene::new(ViewerConfig::default(), fetcher.clone(), host.clone());
    let (log, callback) = progress_recorder();
    scene.set_load_progress_callback(Some(callback));

    let mut pool = LocalPool::new();
    let s = scene.clone();
    pool.spawner().spawn_local(async move { let _ = s.apply_urdf(ONE_MESH).await; }).unwrap();
    pool.run_until_stalled();

    // unknown length pins progress at zero, then a dropped request fails the fetch
    for f in fetcher.take_pending() {
        (f.on_progress)(MeshLoadProgress::new(100, None));
        drop(f.sender);
    }
    pool.run_until_stalled();

    assert_eq!(log.borrow().clone(), vec![(0, 1, 0.0), (0, 1, 0.0), (1, 1, 100.0)]);
    assert_eq!(host.cameras.borrow().len(), 1);
    let meshes = scene.with_robot(|r| r.link("only").unwrap().visuals()[0].instance().as_ref().unwrap().geometry().meshes().len()).unwrap();
    assert_eq!(meshes, 0);
}

#[test]
fn joint_gizmo_drag_shows_clamped_status() {
    let (scene, host) = instant_scene();
    block_on(scene.apply_urdf(FOUR_MESHES)).unwrap();

    assert!(scene.select_joint("shoulder"));
    assert_eq!(host.statuses.borrow().len(), 1);
    assert_eq!(scene.drag_gizmo(3.0), Some(1.0));
    let status = host.statuses.borrow().last().cloned().unwrap();
    assert!(status.text.starts_with("shoulder"));
    assert!(status.text.contains("revolute"));

    let arm_node = scene.with_robot(|r| r.link("arm").unwrap().visuals()[1].node().unwrap()).unwrap();
    scene.deselect_joint();
    assert!(scene.selected_joint().is_none());
    assert!(scene.select_joint_from_pick(arm_node));
    assert_eq!(scene.selected_joint().as_deref(), Some("shoulder"));
}

#[test]
fn gizmo_toggles_need_a_robot() {
    let (scene, _host) = instant_scene();
    assert!(!scene.toggle_axis_on_robot());
    assert!(!scene.select_joint("shoulder"));
    assert_eq!(scene.drag_gizmo(1.0), None);
    scene.toggle_collisions(true);

    block_on(scene.apply_urdf(CYAN_BASE)).unwrap();
    assert!(scene.toggle_axis_on_robot());
    assert!(scene.toggle_axis_rotation_on_robot());
    let (axis, rotation) = scene.robot_gizmo_nodes();
    let root = scene.with_robot(|r| r.root().unwrap()).unwrap();
    scene.with_graph(|g| {
        assert_eq!(g.parent_of(axis.unwrap()), Some(root));
        assert!(matches!(g.node(rotation.unwrap()).unwrap().payload(), SceneNodePayload::Manipulator(_)));
    });
    assert!(!scene.toggle_axis_on_robot());
    assert_eq!(scene.robot_gizmo_nodes().0, None);
}

#[test]
fn framing_fits_the_robot() {
    let (scene, host) = instant_scene();
    block_on(scene.apply_urdf(CYAN_BASE)).unwrap();
    let camera = host.cameras.borrow()[0].clone();
    // box 0.6 x 0.1 x 0.2 centered on the origin
    let half_diagonal = Vector3::<f64>::new(0.6, 0.1, 0.2).norm() * 0.5;
    let expected = (half_diagonal * scene.config().framing_padding).max(scene.config().framing_min_radius);
    assert!((camera.radius - expected).abs() < 1e-9);
}

/// A host that reads the scene back from inside its callbacks.
#[derive(Default)]
struct ReentrantHost {
    scene: RefCell<Option<RobotScene>>,
    live_nodes_on_hide: RefCell<Vec<usize>>,
    cameras_seen: Cell<usize>
}
impl SceneHost for ReentrantHost {
    fn apply_camera(&self, camera: &ArcRotateCameraState) {
        if let Some(s) = self.scene.borrow().as_ref() {
            assert_eq!(&s.camera(), camera);
            self.cameras_seen.set(self.cameras_seen.get() + 1);
        }
    }
    fn show_status(&self, _status: &JointStatus) {}
    fn hide_status(&self) {
        if let Some(s) = self.scene.borrow().as_ref() {
            assert!(!s.toggle_axis_on_robot());
            self.live_nodes_on_hide.borrow_mut().push(s.with_graph(|g| g.num_live_nodes()));
        }
    }
    fn report_error(&self, _error: &UrdfSceneError) {}
    fn defer(&self, _ms: u32) -> LocalBoxFuture<'static, ()> {
        Box::pin(futures::future::ready(()))
    }
}

#[test]
fn callbacks_may_call_back_into_the_scene() {
    let host = Rc::new(ReentrantHost::default());
    let fetcher = Rc::new(InstantFetcher { bytes: triangle_stl() });
    let scene = RobotScene::new(ViewerConfig::default(), fetcher, host.clone());
    *host.scene.borrow_mut() = Some(scene.clone());

    let seen: ProgressLog = Rc::new(RefCell::new(vec![]));
    let (s, log) = (scene.clone(), seen.clone());
    scene.set_load_progress_callback(Some(Box::new(move |loaded: usize, total: usize, percent: f64| {
        log.borrow_mut().push((loaded, total, percent));
        // unsubscribe once everything has arrived
        if loaded == total { s.set_load_progress_callback(None); }
    })));

    block_on(scene.apply_urdf(ONE_MESH)).unwrap();
    assert_eq!(seen.borrow().last(), Some(&(1, 1, 100.0)));
    let reported = seen.borrow().len();

    block_on(scene.apply_urdf(ONE_MESH)).unwrap();
    assert_eq!(seen.borrow().len(), reported);

    assert_eq!(*host.live_nodes_on_hide.borrow(), vec![0, 0]);
    assert_eq!(host.cameras_seen.get(), 2);
}
