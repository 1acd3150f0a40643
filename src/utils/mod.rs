pub mod utils_config;
pub mod utils_console;
pub mod utils_errors;
#[cfg(not(target_arch = "wasm32"))]
pub mod utils_files;
pub mod utils_parsing;
pub mod utils_robot;
pub mod utils_se3;
pub mod utils_shape_geometry;
pub mod utils_traits;
#[cfg(target_arch = "wasm32")]
pub mod utils_wasm;
pub mod utils_xml;
