use serde::{Serialize, Deserialize};
use crate::utils::utils_robot::material::{Material, MaterialResolver};
use crate::utils::utils_robot::visual::Visual;
use crate::utils::utils_se3::scene_graph::{SceneGraph, SceneNodeId};

/// A Link holds a named rigid body of a robot (specified by a robot URDF file) together with
/// the visual and collision entries that are drawn for it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Link {
    name: String,
    material: Option<Material>,
    visuals: Vec<Visual>,
    collisions: Vec<Visual>,
    node: Option<SceneNodeId>
}
impl Link {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            material: None,
            visuals: vec![],
            collisions: vec![],
            node: None
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn material(&self) -> &Option<Material> {
        &self.material
    }
    pub fn visuals(&self) -> &Vec<Visual> {
        &self.visuals
    }
    pub fn collisions(&self) -> &Vec<Visual> {
        &self.collisions
    }
    pub fn node(&self) -> Option<SceneNodeId> {
        self.node
    }
    pub fn set_material(&mut self, material: Option<Material>) {
        self.material = material;
    }
    pub fn add_visual(&mut self, visual: Visual) {
        self.visuals.push(visual);
    }
    pub fn add_collision(&mut self, collision: Visual) {
        self.collisions.push(collision);
    }
    pub fn visuals_mut(&mut self) -> &mut Vec<Visual> {
        &mut self.visuals
    }
    pub fn collisions_mut(&mut self) -> &mut Vec<Visual> {
        &mut self.collisions
    }
    /// Number of entries (visual and collision) whose geometry comes from a mesh file.
    pub fn num_mesh_geometries(&self) -> usize {
        self.visuals.iter().chain(self.collisions.iter()).filter(|v| v.geometry().is_mesh()).count()
    }
    /// Creates the link's transform node (unparented; tree assembly places it) and all of its
    /// entries.  Collisions always render with the shared "collision" material.
    pub fn create(&mut self, graph: &mut SceneGraph, resolver: &mut MaterialResolver) -> SceneNodeId {
        if let Some(n) = self.node { return n; }

        let node = graph.create_node(&self.name, None);

        for visual in &mut self.visuals {
            let owner = format!("{}/{}", self.name, visual.name());
            let resolved = resolver.resolve(visual.material().as_ref(), self.material.as_ref(), &owner);
            let (handle, owned) = MaterialResolver::materialize(graph, &resolved);
            visual.create(graph, node, resolved.0, handle, owned);
        }
        for collision in &mut self.collisions {
            let resolved = resolver.collision();
            let (handle, owned) = MaterialResolver::materialize(graph, &resolved);
            collision.create(graph, node, resolved.0, handle, owned);
        }

        self.node = Some(node);
        node
    }
    pub fn set_collisions_enabled(&mut self, graph: &mut SceneGraph, enabled: bool) {
        for c in &mut self.collisions { c.set_enabled(graph, enabled); }
    }
    /// Safe to call more than once.
    pub fn dispose(&mut self, graph: &mut SceneGraph) {
        for v in &mut self.visuals { v.dispose(graph); }
        for c in &mut self.collisions { c.dispose(graph); }
        if let Some(n) = self.node.take() { graph.dispose_node(n); }
    }
}
