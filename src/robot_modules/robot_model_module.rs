use indexmap::{IndexMap, IndexSet};
use nalgebra::Vector3;
use serde::{Serialize, Deserialize};
use crate::robot_modules::robot::Robot;
use crate::utils::utils_config::ViewerConfig;
use crate::utils::utils_console::urdf_warn;
use crate::utils::utils_errors::UrdfSceneError;
use crate::utils::utils_parsing::UrdfAttributeParsers;
use crate::utils::utils_robot::geometry::Geometry;
use crate::utils::utils_robot::joint::{Joint, JointType};
use crate::utils::utils_robot::link::Link;
use crate::utils::utils_robot::material::Material;
use crate::utils::utils_robot::visual::Visual;
use crate::utils::utils_xml::XmlElement;

/// A per-element degradation recorded while turning a URDF document into a `Robot`.  None of
/// these stop a load; each is also printed as a warning when it is recorded.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum BuildWarning {
    Format { owner: String, attribute: String, message: String },
    UnknownJointType { joint: String, given: String },
    UnresolvedLink { joint: String, link: String, role: String },
    UnresolvedMaterial { owner: String, material: String },
    DuplicateName { kind: String, name: String },
    MissingGeometry { owner: String },
    UnnamedElement { kind: String },
    KinematicLoop { link: String }
}
impl BuildWarning {
    pub fn message(&self) -> String {
        match self {
            BuildWarning::Format { owner, attribute, message } => {
                format!("{}: bad {} attribute, default used ({})", owner, attribute, message)
            }
            BuildWarning::UnknownJointType { joint, given } => {
                format!("joint {:?} has unknown type {:?}, treated as fixed", joint, given)
            }
            BuildWarning::UnresolvedLink { joint, link, role } => {
                format!("joint {:?} names {} link {:?}, which does not exist", joint, role, link)
            }
            BuildWarning::UnresolvedMaterial { owner, material } => {
                format!("{} references material {:?}, which does not exist", owner, material)
            }
            BuildWarning::DuplicateName { kind, name } => {
                format!("{} {:?} is defined more than once, the last definition is used", kind, name)
            }
            BuildWarning::MissingGeometry { owner } => {
                format!("{} has no usable geometry and was skipped", owner)
            }
            BuildWarning::UnnamedElement { kind } => {
                format!("a <{}> element without a name was skipped", kind)
            }
            BuildWarning::KinematicLoop { link } => {
                format!("link {:?} closes a kinematic loop and was attached to the root", link)
            }
        }
    }
}

/// One joint's place in the transform hierarchy.  `parent_link` is None when the joint's
/// parent does not exist (the joint then hangs off the root).  `child_link` is None when the
/// joint does not carry its child, either because the child does not exist or because the
/// child was attached to the root instead.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KinematicEdge {
    joint: String,
    parent_link: Option<String>,
    child_link: Option<String>
}
impl KinematicEdge {
    pub fn joint(&self) -> &str { &self.joint }
    pub fn parent_link(&self) -> Option<&str> { self.parent_link.as_deref() }
    pub fn child_link(&self) -> Option<&str> { self.child_link.as_deref() }
}

/// Parent link -> joint -> child link structure of a robot.  Every link is either an orphan
/// (direct child of the synthetic root) or the child of exactly one edge, and the structure is
/// acyclic.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct KinematicTree {
    orphan_links: Vec<String>,
    edges: Vec<KinematicEdge>
}
impl KinematicTree {
    pub fn orphan_links(&self) -> &Vec<String> { &self.orphan_links }
    pub fn edges(&self) -> &Vec<KinematicEdge> { &self.edges }
    pub fn edge_carrying_link(&self, link: &str) -> Option<&KinematicEdge> {
        self.edges.iter().find(|e| e.child_link() == Some(link))
    }
}

/// Turns URDF text into a `Robot`.  Only a document without a `<robot>` root or without any
/// `<link>` is rejected; everything else degrades per element with a `BuildWarning`.
pub struct RobotModelModule;
impl RobotModelModule {
    pub fn build_robot(xml: &str) -> Result<Robot, UrdfSceneError> {
        Self::build_robot_with_config(xml, &ViewerConfig::default())
    }
    pub fn build_robot_with_config(xml: &str, config: &ViewerConfig) -> Result<Robot, UrdfSceneError> {
        let root = XmlElement::parse_document(xml)?;
        if root.name() != "robot" {
            return Err(UrdfSceneError::new_malformed_urdf_error(&format!("Root element is <{}>, expected <robot>.", root.name()), file!(), line!()));
        }
        if root.first_child_named("link").is_none() {
            return Err(UrdfSceneError::new_malformed_urdf_error("Document has no <link> elements.", file!(), line!()));
        }

        let mut ctx = BuildContext { config, warnings: vec![] };
        let mut robot = Robot::new(root.attribute("name").unwrap_or(""), config.default_material_color, config.collision_material_color);

        // top level materials
        for m in root.children_named("material") {
            let name = match m.attribute("name") {
                Some(n) => { n }
                None => { ctx.warn(BuildWarning::UnnamedElement { kind: "material".to_string() }); continue; }
            };
            let material = ctx.parse_material(m, name);
            let builtin = name == Material::DEFAULT_MATERIAL_NAME || name == Material::COLLISION_MATERIAL_NAME;
            if let Some(_) = robot.materials_mut().insert(name.to_string(), material) {
                if !builtin { ctx.warn(BuildWarning::DuplicateName { kind: "material".to_string(), name: name.to_string() }); }
            }
        }

        for l in root.children_named("link") {
            let link = match ctx.parse_link(l) { Some(link) => { link } None => { continue; } };
            let name = link.name().to_string();
            if let Some(_) = robot.links_mut().insert(name.clone(), link) {
                ctx.warn(BuildWarning::DuplicateName { kind: "link".to_string(), name });
            }
        }
        if robot.links().is_empty() {
            return Err(UrdfSceneError::new_malformed_urdf_error("Document has no usable <link> elements.", file!(), line!()));
        }

        for j in root.children_named("joint") {
            let joint = match ctx.parse_joint(j) { Some(joint) => { joint } None => { continue; } };
            let name = joint.name().to_string();
            if let Some(_) = robot.joints_mut().insert(name.clone(), joint) {
                ctx.warn(BuildWarning::DuplicateName { kind: "joint".to_string(), name });
            }
        }

        Self::resolve_joint_references(&mut robot, &mut ctx);
        let tree = Self::assemble_kinematic_tree(&robot, &mut ctx);
        robot.set_kinematic_tree(tree);
        for w in ctx.warnings { robot.add_build_warning(w); }

        Ok(robot)
    }
    /// Wires each joint's parent/child back-references to links that exist.
    fn resolve_joint_references(robot: &mut Robot, ctx: &mut BuildContext) {
        let link_names: IndexSet<String> = robot.links().keys().cloned().collect();
        for joint in robot.joints_mut().values_mut() {
            let parent = joint.parent_name().to_string();
            let child = joint.child_name().to_string();

            if link_names.contains(&parent) {
                joint.set_parent(Some(parent));
            } else {
                joint.set_parent(None);
                ctx.warn(BuildWarning::UnresolvedLink { joint: joint.name().to_string(), link: parent, role: "parent".to_string() });
            }

            if link_names.contains(&child) {
                joint.set_child(Some(child));
            } else {
                joint.set_child(None);
                ctx.warn(BuildWarning::UnresolvedLink { joint: joint.name().to_string(), link: child, role: "child".to_string() });
            }
        }
    }
    /// A link hangs off a joint only when that joint's parent exists too; every other link is
    /// an orphan.  When several joints claim the same child the last one in document order
    /// wins.  Links that cannot be reached from the root (kinematic loops) are cut loose and
    /// attached to the root in link order.
    fn assemble_kinematic_tree(robot: &Robot, ctx: &mut BuildContext) -> KinematicTree {
        let mut incoming: IndexMap<String, String> = IndexMap::new();
        for joint in robot.joints().values() {
            if let (Some(_), Some(child)) = (joint.parent(), joint.child()) {
                incoming.insert(child.to_string(), joint.name().to_string());
            }
        }

        let mut orphans: Vec<String> = robot.links().keys()
            .filter(|l| !incoming.contains_key(l.as_str()))
            .cloned()
            .collect();

        loop {
            let reachable = Self::reachable_links(robot, &orphans, &incoming);
            let cut = robot.links().keys().find(|l| !reachable.contains(l.as_str())).cloned();
            match cut {
                Some(link) => {
                    ctx.warn(BuildWarning::KinematicLoop { link: link.clone() });
                    incoming.shift_remove(&link);
                    orphans.push(link);
                }
                None => { break; }
            }
        }

        let edges = robot.joints().values().map(|joint| {
            let carries = joint.child()
                .map(|c| incoming.get(c).map(|j| j == joint.name()).unwrap_or(false))
                .unwrap_or(false);
            KinematicEdge {
                joint: joint.name().to_string(),
                parent_link: joint.parent().map(|s| s.to_string()),
                child_link: if carries { joint.child().map(|s| s.to_string()) } else { None }
            }
        }).collect();

        KinematicTree { orphan_links: orphans, edges }
    }
    fn reachable_links(robot: &Robot, orphans: &Vec<String>, incoming: &IndexMap<String, String>) -> IndexSet<String> {
        let mut reachable: IndexSet<String> = IndexSet::new();
        let mut stack: Vec<String> = orphans.clone();
        while let Some(link) = stack.pop() {
            if !reachable.insert(link.clone()) { continue; }
            for joint in robot.joints().values() {
                if joint.parent() != Some(link.as_str()) { continue; }
                if let Some(child) = joint.child() {
                    if incoming.get(child).map(|j| j == joint.name()).unwrap_or(false) {
                        stack.push(child.to_string());
                    }
                }
            }
        }
        reachable
    }
}

struct BuildContext<'a> {
    config: &'a ViewerConfig,
    warnings: Vec<BuildWarning>
}
impl<'a> BuildContext<'a> {
    fn warn(&mut self, w: BuildWarning) {
        urdf_warn(&w.message());
        self.warnings.push(w);
    }
    fn vector_attribute(&mut self, element: &XmlElement, attribute: &str, owner: &str, default: Vector3<f64>) -> Vector3<f64> {
        let s = match element.attribute(attribute) { Some(s) => { s } None => { return default; } };
        match UrdfAttributeParsers::parse_vector3(s) {
            Ok(v) => { v }
            Err(e) => {
                self.warn(BuildWarning::Format { owner: owner.to_string(), attribute: attribute.to_string(), message: e.to_string() });
                default
            }
        }
    }
    fn scalar_attribute(&mut self, element: &XmlElement, attribute: &str, owner: &str, default: f64) -> f64 {
        let s = match element.attribute(attribute) { Some(s) => { s } None => { return default; } };
        match UrdfAttributeParsers::parse_f64(s) {
            Ok(v) => { v }
            Err(e) => {
                self.warn(BuildWarning::Format { owner: owner.to_string(), attribute: attribute.to_string(), message: e.to_string() });
                default
            }
        }
    }
    /// `<origin xyz rpy>`; both default to zero.
    fn parse_origin(&mut self, parent: &XmlElement, owner: &str) -> (Vector3<f64>, Vector3<f64>) {
        match parent.first_child_named("origin") {
            Some(o) => {
                let xyz = self.vector_attribute(o, "xyz", owner, Vector3::zeros());
                let rpy = match o.attribute("rpy") {
                    Some(s) => {
                        match UrdfAttributeParsers::parse_rpy(s) {
                            Ok(v) => { v }
                            Err(e) => {
                                self.warn(BuildWarning::Format { owner: owner.to_string(), attribute: "rpy".to_string(), message: e.to_string() });
                                Vector3::zeros()
                            }
                        }
                    }
                    None => { Vector3::zeros() }
                };
                (xyz, rpy)
            }
            None => { (Vector3::zeros(), Vector3::zeros()) }
        }
    }
    fn parse_material(&mut self, element: &XmlElement, name: &str) -> Material {
        let owner = format!("material {:?}", name);
        let color = match element.first_child_named("color").and_then(|c| c.attribute("rgba")) {
            Some(s) => {
                match UrdfAttributeParsers::parse_color4(s) {
                    Ok(c) => { Some(c) }
                    Err(e) => {
                        self.warn(BuildWarning::Format { owner, attribute: "rgba".to_string(), message: e.to_string() });
                        None
                    }
                }
            }
            None => { None }
        };
        let texture = element.first_child_named("texture")
            .and_then(|t| t.attribute("filename"))
            .map(|f| self.config.resolve_mesh_uri(f));
        Material::new(name, color, texture)
    }
    fn parse_geometry(&mut self, element: &XmlElement, owner: &str) -> Option<Geometry> {
        let geometry = element.first_child_named("geometry")?;
        for shape in geometry.children() {
            match shape.name() {
                "box" => {
                    let size = self.vector_attribute(shape, "size", owner, Vector3::zeros());
                    return Some(Geometry::Box { width: size[0], height: size[1], depth: size[2] });
                }
                "sphere" => {
                    let radius = self.scalar_attribute(shape, "radius", owner, 0.0);
                    return Some(Geometry::Sphere { radius });
                }
                "cylinder" => {
                    let length = self.scalar_attribute(shape, "length", owner, 0.0);
                    let radius = self.scalar_attribute(shape, "radius", owner, 0.0);
                    return Some(Geometry::Cylinder { length, radius });
                }
                "mesh" => {
                    let filename = shape.attribute("filename")?;
                    let scale = self.vector_attribute(shape, "scale", owner, Vector3::repeat(1.0));
                    return Some(Geometry::Mesh { uri: self.config.resolve_mesh_uri(filename), scale });
                }
                _ => {}
            }
        }
        None
    }
    fn parse_link(&mut self, element: &XmlElement) -> Option<Link> {
        let name = match element.attribute("name") {
            Some(n) => { n }
            None => { self.warn(BuildWarning::UnnamedElement { kind: "link".to_string() }); return None; }
        };
        let mut link = Link::new(name);

        if let Some(m) = element.first_child_named("material") {
            let material = self.parse_material(m, m.attribute("name").unwrap_or(""));
            link.set_material(Some(material));
        }

        for (i, v) in element.children_named("visual").enumerate() {
            let visual_name = v.attribute("name").map(|s| s.to_string()).unwrap_or(format!("{}_visual_{}", name, i));
            let owner = format!("link {:?} visual {:?}", name, visual_name);
            let geometry = match self.parse_geometry(v, &owner) {
                Some(g) => { g }
                None => { self.warn(BuildWarning::MissingGeometry { owner }); continue; }
            };
            let (origin, rpy) = self.parse_origin(v, &owner);
            let material = v.first_child_named("material").map(|m| self.parse_material(m, m.attribute("name").unwrap_or("")));
            link.add_visual(Visual::new(&visual_name, geometry, material, origin, rpy));
        }

        for (i, c) in element.children_named("collision").enumerate() {
            let collision_name = c.attribute("name").map(|s| s.to_string()).unwrap_or(format!("{}_collision_{}", name, i));
            let owner = format!("link {:?} collision {:?}", name, collision_name);
            let geometry = match self.parse_geometry(c, &owner) {
                Some(g) => { g }
                None => { self.warn(BuildWarning::MissingGeometry { owner }); continue; }
            };
            let (origin, rpy) = self.parse_origin(c, &owner);
            link.add_collision(Visual::new_collision(&collision_name, geometry, origin, rpy));
        }

        Some(link)
    }
    fn parse_joint(&mut self, element: &XmlElement) -> Option<Joint> {
        let name = match element.attribute("name") {
            Some(n) => { n }
            None => { self.warn(BuildWarning::UnnamedElement { kind: "joint".to_string() }); return None; }
        };
        let owner = format!("joint {:?}", name);

        let given_type = element.attribute("type").unwrap_or("");
        let joint_type = match JointType::from_urdf_str(given_type) {
            Some(t) => { t }
            None => {
                self.warn(BuildWarning::UnknownJointType { joint: name.to_string(), given: given_type.to_string() });
                JointType::Fixed
            }
        };

        let parent = element.first_child_named("parent").and_then(|p| p.attribute("link")).unwrap_or("");
        let child = element.first_child_named("child").and_then(|c| c.attribute("link")).unwrap_or("");
        let mut joint = Joint::new(name, joint_type, parent, child);

        let (origin, rpy) = self.parse_origin(element, &owner);
        joint.set_origin(origin, rpy);

        if let Some(a) = element.first_child_named("axis") {
            let axis = self.vector_attribute(a, "xyz", &owner, Vector3::new(1.0, 0.0, 0.0));
            joint.set_axis(axis);
        }

        if let Some(l) = element.first_child_named("limit") {
            let lower = self.scalar_attribute(l, "lower", &owner, f64::NAN);
            let upper = self.scalar_attribute(l, "upper", &owner, f64::NAN);
            joint.set_limits(lower, upper);
        }

        Some(joint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_LINK_ARM: &str = r#"<?xml version="1.0"?>
<robot name="arm">
  <material name="Cyan"><color rgba="0 1 1 1"/></material>
  <link name="base_link">
    <visual><geometry><box size="1 1 0.2"/></geometry><material name="Cyan"/></visual>
    <collision><geometry><box size="1 1 0.2"/></geometry></collision>
  </link>
  <link name="upper_arm">
    <visual><origin xyz="0 0 0.5"/><geometry><cylinder length="1" radius="0.05"/></geometry></visual>
  </link>
  <joint name="shoulder" type="revolute">
    <parent link="base_link"/>
    <child link="upper_arm"/>
    <origin xyz="0 0 0.1" rpy="0 0 0"/>
    <axis xyz="0 1 0"/>
    <limit lower="-1.5" upper="1.5" effort="10" velocity="1"/>
  </joint>
</robot>"#;

    #[test]
    fn builds_links_joints_and_materials() {
        let robot = RobotModelModule::build_robot(TWO_LINK_ARM).unwrap();
        assert_eq!(robot.name(), "arm");
        assert_eq!(robot.links().keys().collect::<Vec<_>>(), vec!["base_link", "upper_arm"]);
        assert_eq!(robot.materials().keys().collect::<Vec<_>>(), vec!["default", "collision", "Cyan"]);

        let base = robot.link("base_link").unwrap();
        assert_eq!(base.visuals().len(), 1);
        assert_eq!(base.collisions().len(), 1);
        assert!(!base.collisions()[0].enabled());

        let shoulder = robot.joint("shoulder").unwrap();
        assert_eq!(shoulder.joint_type(), JointType::Revolute);
        assert_eq!(shoulder.parent(), Some("base_link"));
        assert_eq!(shoulder.child(), Some("upper_arm"));
        assert_eq!(shoulder.axis(), Vector3::new(0.0, 1.0, 0.0));
        assert_eq!((shoulder.lower_limit(), shoulder.upper_limit()), (-1.5, 1.5));

        assert_eq!(robot.kinematic_tree().orphan_links(), &vec!["base_link".to_string()]);
        assert!(robot.build_warnings().is_empty());
    }

    #[test]
    fn missing_root_or_links_is_malformed() {
        assert!(RobotModelModule::build_robot("<model/>").unwrap_err().is_malformed_urdf_error());
        assert!(RobotModelModule::build_robot("<robot name=\"r\"/>").unwrap_err().is_malformed_urdf_error());
        assert!(RobotModelModule::build_robot("not xml <<").unwrap_err().is_malformed_urdf_error());
    }

    #[test]
    fn bad_values_degrade_with_warnings() {
        let xml = r#"<robot name="r">
  <link name="a">
    <visual><origin xyz="1 2"/><geometry><sphere radius="0.1"/></geometry></visual>
    <visual><geometry/></visual>
  </link>
  <link name="b"/>
  <joint name="j" type="spherical">
    <parent link="a"/><child link="b"/>
    <axis xyz="0 0"/>
    <limit lower="low" upper="1"/>
  </joint>
</robot>"#;
        let robot = RobotModelModule::build_robot(xml).unwrap();
        let a = robot.link("a").unwrap();
        assert_eq!(a.visuals().len(), 1);
        assert_eq!(a.visuals()[0].origin(), Vector3::zeros());

        let j = robot.joint("j").unwrap();
        assert_eq!(j.joint_type(), JointType::Fixed);
        assert_eq!(j.axis(), Vector3::new(1.0, 0.0, 0.0));
        assert!(j.lower_limit().is_nan());
        assert_eq!(j.upper_limit(), 1.0);

        let w = robot.build_warnings();
        assert!(w.iter().any(|w| matches!(w, BuildWarning::UnknownJointType { .. })));
        assert!(w.iter().any(|w| matches!(w, BuildWarning::MissingGeometry { .. })));
        assert_eq!(w.iter().filter(|w| matches!(w, BuildWarning::Format { .. })).count(), 3);
    }

    #[test]
    fn missing_parent_leaves_child_an_orphan() {
        let xml = r#"<robot name="r">
  <link name="a"/><link name="b"/>
  <joint name="j" type="fixed"><parent link="ghost"/><child link="b"/></joint>
</robot>"#;
        let robot = RobotModelModule::build_robot(xml).unwrap();
        assert_eq!(robot.kinematic_tree().orphan_links(), &vec!["a".to_string(), "b".to_string()]);
        let edge = &robot.kinematic_tree().edges()[0];
        assert_eq!(edge.parent_link(), None);
        assert_eq!(edge.child_link(), None);
        assert_eq!(robot.joint("j").unwrap().child(), Some("b"));
        assert!(robot.build_warnings().iter().any(|w| matches!(w, BuildWarning::UnresolvedLink { role, .. } if role == "parent")));
    }

    #[test]
    fn duplicates_are_last_write_wins() {
        let xml = r#"<robot name="r">
  <link name="a"><visual><geometry><sphere radius="1"/></geometry></visual></link>
  <link name="a"><visual><geometry><box size="1 1 1"/></geometry></visual></link>
</robot>"#;
        let robot = RobotModelModule::build_robot(xml).unwrap();
        assert_eq!(robot.links().len(), 1);
        assert_eq!(robot.link("a").unwrap().visuals()[0].geometry().type_name(), "box");
        assert_eq!(robot.build_warnings(), &vec![BuildWarning::DuplicateName { kind: "link".to_string(), name: "a".to_string() }]);
    }

    #[test]
    fn loops_are_cut_at_the_root() {
        let xml = r#"<robot name="r">
  <link name="a"/><link name="b"/>
  <joint name="ab" type="fixed"><parent link="a"/><child link="b"/></joint>
  <joint name="ba" type="fixed"><parent link="b"/><child link="a"/></joint>
</robot>"#;
        let robot = RobotModelModule::build_robot(xml).unwrap();
        let tree = robot.kinematic_tree();
        assert_eq!(tree.orphan_links(), &vec!["a".to_string()]);
        assert_eq!(tree.edge_carrying_link("b").map(|e| e.joint()), Some("ab"));
        assert!(tree.edge_carrying_link("a").is_none());
        assert!(robot.build_warnings().contains(&BuildWarning::KinematicLoop { link: "a".to_string() }));
    }
}
