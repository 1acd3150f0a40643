use indexmap::IndexMap;
use nalgebra::Vector3;
use serde::{Serialize, Deserialize};
use crate::robot_modules::robot_model_module::{BuildWarning, KinematicTree};
use crate::utils::utils_console::{urdf_print, urdf_print_new_line, urdf_warn, PrintColor, PrintMode};
use crate::utils::utils_errors::UrdfSceneError;
use crate::utils::utils_robot::geometry::{Geometry, MeshLoadResult};
use crate::utils::utils_robot::joint::Joint;
use crate::utils::utils_robot::link::Link;
use crate::utils::utils_robot::material::{Color4, Material, MaterialResolver};
use crate::utils::utils_robot::visual::Visual;
use crate::utils::utils_se3::scene_graph::{SceneGraph, SceneMaterialId, SceneNodeId};
use crate::utils::utils_traits::ToAndFromJsonString;

/// A fully resolved robot: links, joints and the material table, plus (after `create`) the
/// synthetic root transform everything hangs from.  Built by
/// `RobotModelModule::build_robot`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Robot {
    name: String,
    links: IndexMap<String, Link>,
    joints: IndexMap<String, Joint>,
    materials: IndexMap<String, Material>,
    kinematic_tree: KinematicTree,
    build_warnings: Vec<BuildWarning>,
    root: Option<SceneNodeId>,
    material_handles: IndexMap<String, SceneMaterialId>
}
impl Robot {
    /// An empty robot whose material table holds the two built-in materials.
    pub fn new(name: &str, default_color: Color4, collision_color: Color4) -> Self {
        let mut materials = IndexMap::new();
        materials.insert(Material::DEFAULT_MATERIAL_NAME.to_string(), Material::new_default(default_color));
        materials.insert(Material::COLLISION_MATERIAL_NAME.to_string(), Material::new_collision(collision_color));

        Self {
            name: name.to_string(),
            links: IndexMap::new(),
            joints: IndexMap::new(),
            materials,
            kinematic_tree: KinematicTree::default(),
            build_warnings: vec![],
            root: None,
            material_handles: IndexMap::new()
        }
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn links(&self) -> &IndexMap<String, Link> {
        &self.links
    }
    pub fn joints(&self) -> &IndexMap<String, Joint> {
        &self.joints
    }
    pub fn materials(&self) -> &IndexMap<String, Material> {
        &self.materials
    }
    pub fn link(&self, name: &str) -> Option<&Link> {
        self.links.get(name)
    }
    pub fn joint(&self, name: &str) -> Option<&Joint> {
        self.joints.get(name)
    }
    pub fn joint_mut(&mut self, name: &str) -> Option<&mut Joint> {
        self.joints.get_mut(name)
    }
    pub fn kinematic_tree(&self) -> &KinematicTree {
        &self.kinematic_tree
    }
    pub fn build_warnings(&self) -> &Vec<BuildWarning> {
        &self.build_warnings
    }
    /// None until `create` has run, and again after `dispose`.
    pub fn root(&self) -> Option<SceneNodeId> {
        self.root
    }
    /// Render handles of the shared table materials while the robot is materialized.
    pub fn material_handles(&self) -> &IndexMap<String, SceneMaterialId> {
        &self.material_handles
    }
    pub(crate) fn links_mut(&mut self) -> &mut IndexMap<String, Link> {
        &mut self.links
    }
    pub(crate) fn joints_mut(&mut self) -> &mut IndexMap<String, Joint> {
        &mut self.joints
    }
    pub(crate) fn materials_mut(&mut self) -> &mut IndexMap<String, Material> {
        &mut self.materials
    }
    pub(crate) fn set_kinematic_tree(&mut self, kinematic_tree: KinematicTree) {
        self.kinematic_tree = kinematic_tree;
    }
    pub(crate) fn add_build_warning(&mut self, warning: BuildWarning) {
        self.build_warnings.push(warning);
    }
    /// Number of visual and collision entries backed by a mesh file.
    pub fn mesh_geometry_count(&self) -> usize {
        self.links.values().map(|l| l.num_mesh_geometries()).sum()
    }

    /// Materializes the robot into `graph` and returns the root node.  The root carries the ROS
    /// (z up) to renderer (y up) rotation; every other transform is authored in ROS convention.
    /// Calling this on an already materialized robot just returns its root.
    pub fn create(&mut self, graph: &mut SceneGraph) -> SceneNodeId {
        if let Some(root) = self.root { return root; }

        let root = graph.create_node(&format!("{}_root", self.name), None);
        graph.set_local_rotation(root, SceneGraph::ros_to_renderer_rotation());

        for (name, m) in &self.materials {
            let handle = graph.create_material(name, m.effective_color(), m.texture_uri().clone());
            self.material_handles.insert(name.clone(), handle);
        }

        let mut resolver = MaterialResolver::new(&self.materials, &self.material_handles);
        for link in self.links.values_mut() {
            link.create(graph, &mut resolver);
        }
        let unresolved = resolver.take_unresolved();

        for joint in self.joints.values_mut() {
            joint.create(graph);
        }

        for orphan in self.kinematic_tree.orphan_links() {
            if let Some(n) = self.links.get(orphan).and_then(|l| l.node()) {
                graph.set_parent(n, Some(root));
            }
        }
        for edge in self.kinematic_tree.edges() {
            let joint_node = match self.joints.get(edge.joint()).and_then(|j| j.node()) {
                Some(n) => { n }
                None => { continue; }
            };
            let parent_node = edge.parent_link()
                .and_then(|p| self.links.get(p))
                .and_then(|l| l.node())
                .unwrap_or(root);
            graph.set_parent(joint_node, Some(parent_node));

            if let Some(child_node) = edge.child_link().and_then(|c| self.links.get(c)).and_then(|l| l.node()) {
                graph.set_parent(child_node, Some(joint_node));
            }
        }

        for (owner, material) in unresolved {
            let w = BuildWarning::UnresolvedMaterial { owner, material };
            if self.build_warnings.contains(&w) { continue; }
            urdf_warn(&w.message());
            self.build_warnings.push(w);
        }

        self.root = Some(root);
        root
    }
    /// Releases every link, joint and shared material, then the root.  Safe to call more than
    /// once; shared materials are released exactly once.
    pub fn dispose(&mut self, graph: &mut SceneGraph) {
        for link in self.links.values_mut() { link.dispose(graph); }
        for joint in self.joints.values_mut() { joint.dispose(graph); }
        for (_, handle) in self.material_handles.drain(..) { graph.release_material(handle); }
        if let Some(root) = self.root.take() { graph.dispose_node(root); }
    }
    pub fn set_collisions_enabled(&mut self, graph: &mut SceneGraph, enabled: bool) {
        for link in self.links.values_mut() { link.set_collisions_enabled(graph, enabled); }
    }

    /// Every mesh-backed entry, in link order, visuals before collisions.
    pub fn mesh_slots(&self) -> Vec<MeshSlot> {
        let mut out = vec![];
        for (link_name, link) in &self.links {
            let groups = [(VisualGroup::Visual, link.visuals()), (VisualGroup::Collision, link.collisions())];
            for (group, entries) in groups {
                for (index, v) in entries.iter().enumerate() {
                    if let Geometry::Mesh { uri, scale } = v.geometry() {
                        out.push(MeshSlot { link: link_name.clone(), group, index, uri: uri.clone(), scale: *scale });
                    }
                }
            }
        }
        out
    }
    pub fn attach_loaded_meshes(&mut self, graph: &mut SceneGraph, slot: &MeshSlot, result: MeshLoadResult) {
        if let Some(v) = self.visual_mut(slot) { v.attach_loaded_meshes(graph, result); }
    }
    fn visual_mut(&mut self, slot: &MeshSlot) -> Option<&mut Visual> {
        let link = self.links.get_mut(&slot.link)?;
        match slot.group {
            VisualGroup::Visual => { link.visuals_mut().get_mut(slot.index) }
            VisualGroup::Collision => { link.collisions_mut().get_mut(slot.index) }
        }
    }

    /// The joint that carries `link`, if the link is not an orphan.
    pub fn find_joint_by_child_link(&self, link: &str) -> Option<&Joint> {
        let edge = self.kinematic_tree.edge_carrying_link(link)?;
        self.joints.get(edge.joint())
    }
    /// Walks up from a picked scene node to the link that owns it.
    pub fn link_owning_node(&self, graph: &SceneGraph, node: SceneNodeId) -> Option<&Link> {
        let mut curr = Some(node);
        while let Some(n) = curr {
            if let Some(l) = self.links.values().find(|l| l.node() == Some(n)) { return Some(l); }
            if Some(n) == self.root { return None; }
            curr = graph.parent_of(n);
        }
        None
    }

    pub fn print_summary(&self) {
        urdf_print(&format!("Robot {:?} ", self.name), PrintMode::Print, PrintColor::Blue, true);
        urdf_print(&format!("({} links, {} joints, {} meshes)", self.links.len(), self.joints.len(), self.mesh_geometry_count()), PrintMode::Println, PrintColor::None, false);
        for link in self.links.values() {
            urdf_print(">> Link: ", PrintMode::Print, PrintColor::Blue, true);
            urdf_print(&format!(" {} ", link.name()), PrintMode::Print, PrintColor::None, false);
            urdf_print("  Parent joint: ", PrintMode::Print, PrintColor::Blue, true);
            match self.find_joint_by_child_link(link.name()) {
                Some(j) => { urdf_print(&format!(" {} ", j.name()), PrintMode::Print, PrintColor::None, false); }
                None => { urdf_print(" (root) ", PrintMode::Print, PrintColor::Green, false); }
            }
            urdf_print_new_line();
            for v in link.visuals() {
                urdf_print(&format!("      -- visual {}: {}", v.name(), v.geometry().type_name()), PrintMode::Println, PrintColor::Cyan, false);
            }
            for c in link.collisions() {
                urdf_print(&format!("      -- collision {}: {}", c.name(), c.geometry().type_name()), PrintMode::Println, PrintColor::Cyan, false);
            }
        }
        for joint in self.joints.values() {
            urdf_print(">> Joint: ", PrintMode::Print, PrintColor::Blue, true);
            urdf_print(&format!(" {} ({}) ", joint.name(), joint.joint_type()), PrintMode::Print, PrintColor::None, false);
            urdf_print(&format!(" {} -> {} ", joint.parent_name(), joint.child_name()), PrintMode::Print, PrintColor::None, false);
            if joint.has_usable_limits() {
                urdf_print(&format!(" limits [{}, {}]", joint.lower_limit(), joint.upper_limit()), PrintMode::Print, PrintColor::None, false);
            }
            urdf_print_new_line();
        }
        for w in &self.build_warnings {
            urdf_print(&format!("   ! {}", w.message()), PrintMode::Println, PrintColor::Yellow, false);
        }
    }
    pub fn to_summary(&self) -> RobotSummary {
        RobotSummary {
            name: self.name.clone(),
            links: self.links.values().map(|l| LinkSummary {
                name: l.name().to_string(),
                parent_joint: self.find_joint_by_child_link(l.name()).map(|j| j.name().to_string()),
                num_visuals: l.visuals().len(),
                num_collisions: l.collisions().len()
            }).collect(),
            joints: self.joints.values().map(|j| JointSummary {
                name: j.name().to_string(),
                joint_type: j.joint_type().to_string(),
                parent: j.parent_name().to_string(),
                child: j.child_name().to_string(),
                axis: [j.axis()[0], j.axis()[1], j.axis()[2]],
                lower_limit: Some(j.lower_limit()).filter(|l| l.is_finite()),
                upper_limit: Some(j.upper_limit()).filter(|u| u.is_finite())
            }).collect(),
            materials: self.materials.keys().cloned().collect(),
            num_mesh_geometries: self.mesh_geometry_count(),
            warnings: self.build_warnings.iter().map(|w| w.message()).collect()
        }
    }
    pub fn to_json_summary(&self) -> Result<String, UrdfSceneError> {
        self.to_summary().to_json_string()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisualGroup {
    Visual,
    Collision
}

/// Address of one mesh-backed visual or collision entry within a robot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeshSlot {
    pub link: String,
    pub group: VisualGroup,
    pub index: usize,
    pub uri: String,
    pub scale: Vector3<f64>
}

/// Serializable overview of a robot for hosts that embed the viewer.  Infinite or missing
/// limits are left out.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RobotSummary {
    pub name: String,
    pub links: Vec<LinkSummary>,
    pub joints: Vec<JointSummary>,
    pub materials: Vec<String>,
    pub num_mesh_geometries: usize,
    pub warnings: Vec<String>
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LinkSummary {
    pub name: String,
    pub parent_joint: Option<String>,
    pub num_visuals: usize,
    pub num_collisions: usize
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JointSummary {
    pub name: String,
    pub joint_type: String,
    pub parent: String,
    pub child: String,
    pub axis: [f64; 3],
    pub lower_limit: Option<f64>,
    pub upper_limit: Option<f64>
}
