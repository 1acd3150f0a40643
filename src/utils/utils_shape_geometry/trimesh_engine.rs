use std::io::Cursor;
use collada::PrimitiveElement;
use collada::document::ColladaDocument;
use nalgebra::Vector3;
use serde::{Serialize, Deserialize};
use crate::utils::utils_errors::UrdfSceneError;

/// A plain indexed triangle mesh handed to the renderer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrimeshEngine {
    vertices: Vec<Vector3<f64>>,
    indices: Vec<[usize; 3]>
}
impl TrimeshEngine {
    pub fn new_from_vertices_and_indices(vertices: Vec<Vector3<f64>>, indices: Vec<[usize; 3]>) -> Self {
        Self {
            vertices,
            indices
        }
    }
    pub fn vertices(&self) -> &Vec<Vector3<f64>> {
        &self.vertices
    }
    pub fn indices(&self) -> &Vec<[usize; 3]> {
        &self.indices
    }
    /// Component-wise scale of every vertex.
    pub fn scale(&mut self, scale: &Vector3<f64>) {
        for v in &mut self.vertices {
            *v = v.component_mul(scale);
        }
    }
}

/// Joint names of the first skeleton found in a mesh file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeshSkeleton {
    joint_names: Vec<String>
}
impl MeshSkeleton {
    pub fn new(joint_names: Vec<String>) -> Self {
        Self { joint_names }
    }
    pub fn joint_names(&self) -> &Vec<String> {
        &self.joint_names
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MeshFileFormat {
    Stl,
    Dae
}
impl MeshFileFormat {
    /// Picks the decoder from the uri's extension, ignoring any query string or fragment.
    pub fn from_uri(uri: &str) -> Option<Self> {
        let path = uri.split(|c| c == '?' || c == '#').next().unwrap_or(uri);
        let extension = path.rsplit('.').next()?;
        if extension.eq_ignore_ascii_case("stl") {
            Some(Self::Stl)
        } else if extension.eq_ignore_ascii_case("dae") {
            Some(Self::Dae)
        } else {
            None
        }
    }
}

/// Convenience struct that decodes raw mesh file bytes.
pub struct TrimeshDecoder;
impl TrimeshDecoder {
    pub fn decode(uri: &str, bytes: &[u8]) -> Result<(Vec<TrimeshEngine>, Option<MeshSkeleton>), UrdfSceneError> {
        match MeshFileFormat::from_uri(uri) {
            Some(MeshFileFormat::Stl) => { Ok((vec![Self::decode_stl(uri, bytes)?], None)) }
            Some(MeshFileFormat::Dae) => { Self::decode_dae(uri, bytes) }
            None => {
                Err(UrdfSceneError::new_generic_error_str(&format!("Unsupported mesh format for {:?}.", uri), file!(), line!()))
            }
        }
    }
    pub fn decode_stl(uri: &str, bytes: &[u8]) -> Result<TrimeshEngine, UrdfSceneError> {
        let mut cursor = Cursor::new(bytes);
        let indexed_mesh = match stl_io::read_stl(&mut cursor) {
            Ok(m) => { m }
            Err(_) => {
                return Err(UrdfSceneError::new_generic_error_str(&format!("File {:?} could not be read as an stl file.", uri), file!(), line!()));
            }
        };

        let mut vertices = vec![];
        let mut indices = vec![];

        for v in &indexed_mesh.vertices {
            vertices.push(Vector3::new(v[0] as f64, v[1] as f64, v[2] as f64));
        }
        for f in &indexed_mesh.faces {
            indices.push(f.vertices.clone());
        }

        Ok(TrimeshEngine::new_from_vertices_and_indices(vertices, indices))
    }
    /// One `TrimeshEngine` per collada object.  Polylist primitives are skipped.
    pub fn decode_dae(uri: &str, bytes: &[u8]) -> Result<(Vec<TrimeshEngine>, Option<MeshSkeleton>), UrdfSceneError> {
        let string = String::from_utf8_lossy(bytes);
        let collada_dae = match ColladaDocument::from_str(&string) {
            Ok(d) => { d }
            Err(_) => {
                return Err(UrdfSceneError::new_generic_error_str(&format!("Could not parse dae file {:?}", uri), file!(), line!()));
            }
        };

        let mut out = vec![];
        if let Some(obj_set) = collada_dae.get_obj_set() {
            for obj in &obj_set.objects {
                let vertices: Vec<Vector3<f64>> = obj.vertices.iter().map(|v| Vector3::new(v.x, v.y, v.z)).collect();
                let mut indices = vec![];
                for geom in &obj.geometry {
                    for primitive_element in &geom.mesh {
                        match primitive_element {
                            PrimitiveElement::Polylist(_) => { }
                            PrimitiveElement::Triangles(triangles) => {
                                for triangle in &triangles.vertices {
                                    indices.push([triangle.0 as usize, triangle.1 as usize, triangle.2 as usize]);
                                }
                            }
                        }
                    }
                }
                out.push(TrimeshEngine::new_from_vertices_and_indices(vertices, indices));
            }
        }

        let skeleton = collada_dae.get_skeletons()
            .and_then(|skeletons| skeletons.into_iter().next())
            .map(|s| MeshSkeleton::new(s.joints.iter().map(|j| j.name.clone()).collect()));

        Ok((out, skeleton))
    }
}
