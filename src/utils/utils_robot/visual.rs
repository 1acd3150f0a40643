use nalgebra::Vector3;
use serde::{Serialize, Deserialize};
use crate::utils::utils_robot::geometry::{Geometry, GeometryInstance, MeshLoadResult};
use crate::utils::utils_robot::material::Material;
use crate::utils::utils_se3::scene_graph::{SceneGraph, SceneMaterialId, SceneNodeId};

/// A `<visual>` or `<collision>` entry of a link: geometry + material + local offset under a
/// named node that can be toggled on its own.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Visual {
    name: String,
    geometry: Geometry,
    material: Option<Material>,
    origin: Vector3<f64>,
    rpy: Vector3<f64>,
    enabled: bool,
    instance: Option<VisualInstance>
}
impl Visual {
    pub fn new(name: &str, geometry: Geometry, material: Option<Material>, origin: Vector3<f64>, rpy: Vector3<f64>) -> Self {
        Self {
            name: name.to_string(),
            geometry,
            material,
            origin,
            rpy,
            enabled: true,
            instance: None
        }
    }
    /// Collision entries start hidden.
    pub fn new_collision(name: &str, geometry: Geometry, origin: Vector3<f64>, rpy: Vector3<f64>) -> Self {
        let mut out = Self::new(name, geometry, Some(Material::new_reference(Material::COLLISION_MATERIAL_NAME)), origin, rpy);
        out.enabled = false;
        out
    }
    pub fn name(&self) -> &str { &self.name }
    pub fn geometry(&self) -> &Geometry { &self.geometry }
    /// The material as written in the URDF (possibly a bare reference).
    pub fn material(&self) -> &Option<Material> { &self.material }
    /// The material the entry renders with, once created.
    pub fn resolved_material(&self) -> Option<&Material> { self.instance.as_ref().map(|i| &i.material) }
    pub fn origin(&self) -> Vector3<f64> { self.origin }
    pub fn rpy(&self) -> Vector3<f64> { self.rpy }
    pub fn enabled(&self) -> bool { self.enabled }
    pub fn instance(&self) -> &Option<VisualInstance> { &self.instance }
    pub fn node(&self) -> Option<SceneNodeId> { self.instance.as_ref().map(|i| i.node) }
    /// Materializes the entry under `parent`.  `material` is the already-resolved render
    /// material; `owns_material` says whether disposal of this entry releases it.
    pub fn create(&mut self, graph: &mut SceneGraph, parent: SceneNodeId, resolved: Material, material: SceneMaterialId, owns_material: bool) {
        if self.instance.is_some() { return; }

        let node = graph.create_node(&self.name, Some(parent));
        graph.set_local_translation(node, self.origin);
        graph.apply_rpy_to_transform(node, &self.rpy);
        graph.set_enabled(node, self.enabled);

        let geometry = self.geometry.create(graph, &format!("{}_geometry", self.name), node, material);

        self.instance = Some(VisualInstance {
            node,
            geometry,
            material: resolved,
            owns_material
        });
    }
    pub fn set_enabled(&mut self, graph: &mut SceneGraph, enabled: bool) {
        self.enabled = enabled;
        if let Some(i) = &self.instance { graph.set_enabled(i.node, enabled); }
    }
    pub fn attach_loaded_meshes(&mut self, graph: &mut SceneGraph, result: MeshLoadResult) {
        if let Some(i) = &mut self.instance {
            self.geometry.attach_loaded_meshes(graph, &mut i.geometry, result);
        }
    }
    /// Safe to call more than once.  Shared materials are left for their owner to release.
    pub fn dispose(&mut self, graph: &mut SceneGraph) {
        if let Some(i) = self.instance.take() {
            Geometry::dispose(&i.geometry, graph);
            graph.dispose_node(i.node);
            if i.owns_material { graph.release_material(i.geometry.material()); }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisualInstance {
    node: SceneNodeId,
    geometry: GeometryInstance,
    material: Material,
    owns_material: bool
}
impl VisualInstance {
    pub fn node(&self) -> SceneNodeId { self.node }
    pub fn geometry(&self) -> &GeometryInstance { &self.geometry }
    pub fn material(&self) -> &Material { &self.material }
    pub fn owns_material(&self) -> bool { self.owns_material }
}
