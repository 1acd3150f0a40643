use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use futures::future::LocalBoxFuture;
use crate::utils::utils_errors::UrdfSceneError;
use crate::utils::utils_robot::geometry::{MeshFetcher, MeshLoadProgress, MeshProgressCallback};

/// Convenience struct that holds class functions related to file utils.
pub struct FileUtils;
impl FileUtils {
    /// Reads contents of file and outputs it to a string.
    pub fn read_file_contents_to_string(p: &Path) -> Result<String, UrdfSceneError> {
        let bytes = Self::read_file_contents_to_bytes(p)?;
        String::from_utf8(bytes).map_err(|e| UrdfSceneError::new_generic_error_str(&format!("{:?} is not utf-8: {}", p, e), file!(), line!()))
    }
    pub fn read_file_contents_to_bytes(p: &Path) -> Result<Vec<u8>, UrdfSceneError> {
        let mut file = File::open(p).map_err(|e| UrdfSceneError::new_generic_error_str(&format!("Could not open {:?}: {}", p, e), file!(), line!()))?;
        let mut contents = vec![];
        file.read_to_end(&mut contents).map_err(|e| UrdfSceneError::new_generic_error_str(&format!("Could not read {:?}: {}", p, e), file!(), line!()))?;
        Ok(contents)
    }
    /// Returns file extension of path as lowercase string.
    pub fn get_file_extension_string(p: &Path) -> Option<String> {
        p.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase())
    }
}

/// Mesh fetcher reading from the local file system.  `package://pkg/...` and relative uris are
/// looked up under `base_dir`, `file://` uris are used as absolute paths.
#[derive(Clone, Debug)]
pub struct FileMeshFetcher {
    base_dir: PathBuf
}
impl FileMeshFetcher {
    pub fn new(base_dir: &Path) -> Self {
        Self { base_dir: base_dir.to_path_buf() }
    }
    pub fn resolve_path(&self, uri: &str) -> PathBuf {
        if let Some(p) = uri.strip_prefix("file://") { return PathBuf::from(p); }
        let relative = uri.strip_prefix("package://").unwrap_or(uri);
        let p = Path::new(relative);
        if p.is_absolute() { p.to_path_buf() } else { self.base_dir.join(p) }
    }
}
impl MeshFetcher for FileMeshFetcher {
    fn fetch(&self, uri: &str, on_progress: MeshProgressCallback) -> LocalBoxFuture<'static, Result<Vec<u8>, UrdfSceneError>> {
        let path = self.resolve_path(uri);
        let uri = uri.to_string();
        Box::pin(async move {
            let bytes = FileUtils::read_file_contents_to_bytes(&path)
                .map_err(|e| UrdfSceneError::new_mesh_fetch_error(&uri, &e.to_string(), file!(), line!()))?;
            let n = bytes.len() as u64;
            on_progress(MeshLoadProgress::new(n, Some(n)));
            Ok(bytes)
        })
    }
}
