use std::rc::Rc;
use futures::future::LocalBoxFuture;
use nalgebra::Vector3;
use serde::{Serialize, Deserialize};
use crate::utils::utils_console::urdf_warn;
use crate::utils::utils_errors::UrdfSceneError;
use crate::utils::utils_se3::scene_graph::{PrimitiveShape, SceneGraph, SceneMaterialId, SceneNodeId, SceneNodePayload};
use crate::utils::utils_shape_geometry::trimesh_engine::{MeshSkeleton, TrimeshDecoder, TrimeshEngine};

/// Shape of a visual or collision entry.  The three primitives materialize synchronously,
/// `Mesh` only creates an empty holder node until its file has been fetched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    Box { width: f64, height: f64, depth: f64 },
    Sphere { radius: f64 },
    Cylinder { length: f64, radius: f64 },
    Mesh { uri: String, scale: Vector3<f64> }
}
impl Geometry {
    pub fn is_mesh(&self) -> bool {
        matches!(self, Geometry::Mesh { .. })
    }
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Box { .. } => { "box" }
            Geometry::Sphere { .. } => { "sphere" }
            Geometry::Cylinder { .. } => { "cylinder" }
            Geometry::Mesh { .. } => { "mesh" }
        }
    }
    /// Creates the geometry's nodes under `parent`.  Primitive shapes get a single renderable
    /// child; meshes get an empty holder that `attach_loaded_meshes` fills later.
    pub fn create(&self, graph: &mut SceneGraph, name: &str, parent: SceneNodeId, material: SceneMaterialId) -> GeometryInstance {
        let holder = graph.create_node(name, Some(parent));
        let mut meshes = vec![];

        let shape = match self {
            Geometry::Box { width, height, depth } => {
                Some(PrimitiveShape::Box { width: *width, height: *height, depth: *depth })
            }
            Geometry::Sphere { radius } => {
                Some(PrimitiveShape::Sphere { radius: *radius })
            }
            Geometry::Cylinder { length, radius } => {
                Some(PrimitiveShape::Cylinder { height: *length, radius: *radius })
            }
            Geometry::Mesh { .. } => { None }
        };

        if let Some(shape) = shape {
            let is_cylinder = matches!(shape, PrimitiveShape::Cylinder { .. });
            let mesh = graph.create_node_with_payload(&format!("{}_{}", name, self.type_name()), Some(holder), SceneNodePayload::Primitive(shape));
            if is_cylinder { graph.set_local_rotation(mesh, SceneGraph::cylinder_axis_correction()); }
            graph.set_material(mesh, Some(material));
            meshes.push(mesh);
        }

        GeometryInstance {
            holder,
            meshes,
            material,
            loaded: !self.is_mesh(),
            skeleton: None
        }
    }
    /// Adds the sub-meshes of a finished load under the geometry's holder node.  A failed load
    /// arrives here with no meshes and leaves the holder empty.
    pub fn attach_loaded_meshes(&self, graph: &mut SceneGraph, instance: &mut GeometryInstance, result: MeshLoadResult) {
        if !graph.is_alive(instance.holder) { return; }
        let base_name = graph.node(instance.holder).map(|n| n.name().to_string()).unwrap_or_default();
        for (i, m) in result.meshes.into_iter().enumerate() {
            let node = graph.create_node_with_payload(&format!("{}_mesh_{}", base_name, i), Some(instance.holder), SceneNodePayload::TriangleMesh(m));
            graph.set_material(node, Some(instance.material));
            instance.meshes.push(node);
        }
        instance.skeleton = result.skeleton;
        instance.loaded = true;
    }
    pub fn dispose(instance: &GeometryInstance, graph: &mut SceneGraph) {
        graph.dispose_subtree(instance.holder);
    }
}

/// The scene nodes one geometry materialized into.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeometryInstance {
    holder: SceneNodeId,
    meshes: Vec<SceneNodeId>,
    material: SceneMaterialId,
    loaded: bool,
    skeleton: Option<MeshSkeleton>
}
impl GeometryInstance {
    pub fn holder(&self) -> SceneNodeId { self.holder }
    pub fn meshes(&self) -> &Vec<SceneNodeId> { &self.meshes }
    pub fn material(&self) -> SceneMaterialId { self.material }
    pub fn loaded(&self) -> bool { self.loaded }
    pub fn skeleton(&self) -> &Option<MeshSkeleton> { &self.skeleton }
}

/// Transfer progress of one mesh file.  `bytes_total` is None when the transport cannot tell
/// the length up front.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeshLoadProgress {
    pub bytes_loaded: u64,
    pub bytes_total: Option<u64>
}
impl MeshLoadProgress {
    pub fn new(bytes_loaded: u64, bytes_total: Option<u64>) -> Self {
        Self { bytes_loaded, bytes_total }
    }
    /// Percent in [0,100]; pinned at 0 while the total is unknown.
    pub fn percent(&self) -> f64 {
        match self.bytes_total {
            Some(total) if total > 0 => {
                (self.bytes_loaded as f64 / total as f64 * 100.0).clamp(0.0, 100.0)
            }
            _ => { 0.0 }
        }
    }
}

pub type MeshProgressCallback = Rc<dyn Fn(MeshLoadProgress)>;

/// Transport used to pull mesh files (network in the browser, disk natively).
pub trait MeshFetcher {
    fn fetch(&self, uri: &str, on_progress: MeshProgressCallback) -> LocalBoxFuture<'static, Result<Vec<u8>, UrdfSceneError>>;
}

/// Decoded contents of a mesh file.  Empty `meshes` means the load failed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeshLoadResult {
    pub meshes: Vec<TrimeshEngine>,
    pub skeleton: Option<MeshSkeleton>
}
impl MeshLoadResult {
    pub fn empty() -> Self {
        Self::default()
    }
    pub fn loaded(&self) -> bool {
        !self.meshes.is_empty()
    }
}

pub struct MeshGeometry;
impl MeshGeometry {
    /// Fetches and decodes a mesh file.  Never fails: fetch and decode errors are logged and
    /// resolve to an empty result so the rest of the robot still renders.
    pub async fn load(fetcher: Rc<dyn MeshFetcher>, uri: String, scale: Vector3<f64>, on_progress: Option<MeshProgressCallback>) -> MeshLoadResult {
        let progress: MeshProgressCallback = match on_progress {
            Some(p) => { p }
            None => { Rc::new(|_: MeshLoadProgress| {}) }
        };

        let bytes = match fetcher.fetch(&uri, progress).await {
            Ok(b) => { b }
            Err(e) => {
                urdf_warn(&format!("Mesh {:?} failed to load: {}", uri, e));
                return MeshLoadResult::empty();
            }
        };

        match TrimeshDecoder::decode(&uri, &bytes) {
            Ok((mut meshes, skeleton)) => {
                for m in &mut meshes { m.scale(&scale); }
                MeshLoadResult { meshes, skeleton }
            }
            Err(e) => {
                urdf_warn(&format!("Mesh {:?} could not be decoded: {}", uri, e));
                MeshLoadResult::empty()
            }
        }
    }
}
