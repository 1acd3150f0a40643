pub mod robot_scene;
pub mod robot_scene_camera;
