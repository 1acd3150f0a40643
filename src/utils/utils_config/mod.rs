use serde::{Serialize, Deserialize};
use crate::scenes::robot_scene_camera::ArcRotateCameraState;
use crate::utils::utils_robot::material::Color4;

/// Tunables of the viewer.  Every field has a default, so partial RON/JSON documents are fine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub default_camera: ArcRotateCameraState,
    pub default_material_color: Color4,
    pub collision_material_color: Color4,
    /// Bounding sphere radius multiplier used when auto-framing.
    pub framing_padding: f64,
    pub framing_min_radius: f64,
    /// Delay before bounds are measured, so freshly created transforms have settled.
    pub framing_delay_ms: u32,
    /// Prefix for relative mesh uris; `package://name/` is replaced by `<base>/name/`.
    pub mesh_base_url: Option<String>
}
impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            default_camera: ArcRotateCameraState::new_default(),
            default_material_color: Color4::mid_gray(),
            collision_material_color: Color4::translucent_red(),
            framing_padding: 1.5,
            framing_min_radius: 0.1,
            framing_delay_ms: 16,
            mesh_base_url: None
        }
    }
}
impl ViewerConfig {
    /// Maps a URDF mesh filename to the uri handed to the mesh fetcher.  Absolute urls are
    /// left alone; `package://` and relative paths are placed under `mesh_base_url` if set.
    pub fn resolve_mesh_uri(&self, filename: &str) -> String {
        let stripped = match filename.strip_prefix("package://") {
            Some(s) => { s }
            None => {
                if filename.contains("://") || filename.starts_with('/') { return filename.to_string(); }
                filename
            }
        };
        match &self.mesh_base_url {
            Some(base) => { format!("{}/{}", base.trim_end_matches('/'), stripped) }
            None => { filename.to_string() }
        }
    }
}
