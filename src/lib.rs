//! urdf_scene loads URDF robot descriptions into an interactive, manipulable scene graph.
//! The crate parses the XML into a strongly typed robot model, resolves material and link
//! references, assembles the parent link -> joint -> child link transform hierarchy (converting
//! ROS z-up to a y-up renderer once at the root), loads meshes asynchronously while aggregating
//! their progress, and drives single-axis joint exercise gizmos with limit enforcement.
//! The rendering engine itself stays outside; it mirrors the `SceneGraph` and is reached through
//! the `MeshFetcher` and `SceneHost` traits.  Browser bindings are available via WebAssembly.

pub mod robot_modules;
pub mod scenes;
pub mod utils;
