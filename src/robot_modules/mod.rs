pub mod robot;
pub mod robot_model_module;
pub mod robot_mesh_loading_module;
pub mod robot_joint_gizmo_module;
