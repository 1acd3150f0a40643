use serde::{Serialize, Deserialize};
use thiserror::Error;

/// A common error type returned by functions throughout the crate.
///
/// Only `FormatError` and `MalformedURDF` ever reach callers of the public loading API.  Mesh
/// fetch failures are swallowed by the mesh loader and degrade to an empty mesh list.
#[derive(Clone, Debug, Error, PartialEq, Serialize, Deserialize)]
pub enum UrdfSceneError {
    #[error("{0}")]
    FormatError(String),
    #[error("{0}")]
    MalformedURDF(String),
    #[error("{0}")]
    MeshFetchError(String),
    #[error("{0}")]
    GenericError(String)
}
impl UrdfSceneError {
    pub fn new_format_error(given: &str, expected: &str, file: &str, line: u32) -> Self {
        let s = format!("ERROR: Could not parse {:?} as {}. -- File: {}, Line: {}", given, expected, file, line);
        return Self::FormatError(s);
    }
    pub fn new_malformed_urdf_error(message: &str, file: &str, line: u32) -> Self {
        let s = format!("ERROR: Malformed URDF.  {} -- File: {}, Line: {}", message, file, line);
        return Self::MalformedURDF(s);
    }
    pub fn new_mesh_fetch_error(uri: &str, message: &str, file: &str, line: u32) -> Self {
        let s = format!("ERROR: Could not fetch mesh {:?}.  {} -- File: {}, Line: {}", uri, message, file, line);
        return Self::MeshFetchError(s);
    }
    pub fn new_generic_error_str(s: &str, file: &str, line: u32) -> Self {
        let s = format!("ERROR: {} -- File: {}, Line: {}", s, file, line);
        return Self::GenericError(s);
    }
    pub fn is_format_error(&self) -> bool {
        matches!(self, Self::FormatError(_))
    }
    pub fn is_malformed_urdf_error(&self) -> bool {
        matches!(self, Self::MalformedURDF(_))
    }
    /// Structured notification handed to embedding hosts when a whole document fails to load.
    pub fn to_notification_json(&self) -> String {
        let kind = match self {
            UrdfSceneError::FormatError(_) => { "FormatError" }
            UrdfSceneError::MalformedURDF(_) => { "MalformedURDFError" }
            UrdfSceneError::MeshFetchError(_) => { "MeshLoadFailure" }
            UrdfSceneError::GenericError(_) => { "GenericError" }
        };
        serde_json::json!({
            "type": "urdfLoadError",
            "kind": kind,
            "message": self.to_string()
        }).to_string()
    }
}
