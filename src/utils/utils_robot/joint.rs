use std::str::FromStr;
use nalgebra::{UnitQuaternion, Vector3};
use serde::{Serialize, Deserialize};
use strum_macros::{Display, EnumString};
use crate::utils::utils_se3::scene_graph::{unit_axis, SceneGraph, SceneNodeId};

/// URDF joint types, named as they appear in the `type` attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum JointType {
    Fixed,
    Revolute,
    Continuous,
    Prismatic,
    Floating,
    Planar
}
impl JointType {
    /// Returns None for strings that are not URDF joint types.
    pub fn from_urdf_str(s: &str) -> Option<Self> {
        JointType::from_str(s.trim()).ok()
    }
    pub fn is_rotational(&self) -> bool {
        matches!(self, JointType::Revolute | JointType::Continuous)
    }
}

/// A Joint connects a parent link to a child link and carries the motion between them.
/// `parent`/`child` hold the link names once the builder has found them in the link table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Joint {
    name: String,
    joint_type: JointType,
    origin: Vector3<f64>,
    rpy: Vector3<f64>,
    axis: Vector3<f64>,
    parent_name: String,
    child_name: String,
    parent: Option<String>,
    child: Option<String>,
    lower_limit: f64,
    upper_limit: f64,
    position: f64,
    node: Option<SceneNodeId>
}
impl Joint {
    pub fn new(name: &str, joint_type: JointType, parent_name: &str, child_name: &str) -> Self {
        Self {
            name: name.to_string(),
            joint_type,
            origin: Vector3::zeros(),
            rpy: Vector3::zeros(),
            axis: Vector3::new(1.0, 0.0, 0.0),
            parent_name: parent_name.to_string(),
            child_name: child_name.to_string(),
            parent: None,
            child: None,
            lower_limit: f64::NAN,
            upper_limit: f64::NAN,
            position: 0.0,
            node: None
        }
    }
    pub fn name(&self) -> &str { &self.name }
    pub fn joint_type(&self) -> JointType { self.joint_type }
    pub fn origin(&self) -> Vector3<f64> { self.origin }
    pub fn rpy(&self) -> Vector3<f64> { self.rpy }
    pub fn axis(&self) -> Vector3<f64> { self.axis }
    pub fn parent_name(&self) -> &str { &self.parent_name }
    pub fn child_name(&self) -> &str { &self.child_name }
    pub fn parent(&self) -> Option<&str> { self.parent.as_deref() }
    pub fn child(&self) -> Option<&str> { self.child.as_deref() }
    pub fn node(&self) -> Option<SceneNodeId> { self.node }
    pub fn position(&self) -> f64 { self.position }
    /// Continuous joints are unbounded no matter what the URDF says.
    pub fn lower_limit(&self) -> f64 {
        if self.joint_type == JointType::Continuous { f64::NEG_INFINITY } else { self.lower_limit }
    }
    pub fn upper_limit(&self) -> f64 {
        if self.joint_type == JointType::Continuous { f64::INFINITY } else { self.upper_limit }
    }
    /// True when both limits are finite and different, i.e. worth showing and enforcing.
    pub fn has_usable_limits(&self) -> bool {
        let (l, u) = (self.lower_limit(), self.upper_limit());
        l.is_finite() && u.is_finite() && l != u
    }
    pub fn set_origin(&mut self, origin: Vector3<f64>, rpy: Vector3<f64>) {
        self.origin = origin;
        self.rpy = rpy;
    }
    pub fn set_axis(&mut self, axis: Vector3<f64>) {
        self.axis = axis;
    }
    pub fn set_limits(&mut self, lower: f64, upper: f64) {
        self.lower_limit = lower;
        self.upper_limit = upper;
    }
    pub fn set_parent(&mut self, parent: Option<String>) {
        self.parent = parent;
    }
    pub fn set_child(&mut self, child: Option<String>) {
        self.child = child;
    }
    /// Creates the joint's transform node at its origin pose.  Parenting is left to tree
    /// assembly.
    pub fn create(&mut self, graph: &mut SceneGraph) -> SceneNodeId {
        if let Some(n) = self.node { return n; }
        let node = graph.create_node(&self.name, None);
        self.node = Some(node);
        self.update_node(graph, &Vector3::zeros());
        node
    }
    /// Moves the joint to `position` (radians for rotational joints, meters for prismatic
    /// ones) about / along `motion_axis`, expressed in the joint's local frame.  The origin
    /// pose is always re-applied first.
    pub fn set_position(&mut self, graph: &mut SceneGraph, position: f64, motion_axis: &Vector3<f64>) {
        self.position = position;
        self.update_node(graph, motion_axis);
    }
    fn update_node(&self, graph: &mut SceneGraph, motion_axis: &Vector3<f64>) {
        let node = match self.node { Some(n) => { n } None => { return; } };

        graph.set_local_translation(node, self.origin);
        graph.set_local_rotation(node, UnitQuaternion::identity());
        graph.apply_rpy_to_transform(node, &self.rpy);

        let axis = match unit_axis(motion_axis) { Some(a) => { a } None => { return; } };
        match self.joint_type {
            JointType::Revolute | JointType::Continuous => {
                graph.add_local_rotation(node, UnitQuaternion::from_axis_angle(&axis, self.position));
            }
            JointType::Prismatic => {
                let base = graph.node(node).map(|n| n.rotation()).unwrap_or_else(|_| UnitQuaternion::identity());
                graph.set_local_translation(node, self.origin + base * (axis.into_inner() * self.position));
            }
            _ => {}
        }
    }
    /// Safe to call more than once.
    pub fn dispose(&mut self, graph: &mut SceneGraph) {
        if let Some(n) = self.node.take() { graph.dispose_node(n); }
    }
}
