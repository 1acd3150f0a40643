use nalgebra::Vector3;
use serde::{Serialize, Deserialize};
use strum_macros::Display;
use crate::robot_modules::robot::Robot;
use crate::utils::utils_console::{urdf_notice, urdf_warn};
use crate::utils::utils_robot::joint::{Joint, JointType};
use crate::utils::utils_robot::material::Color4;
use crate::utils::utils_se3::scene_graph::{ManipulatorKind, ManipulatorVisual, SceneGraph, SceneNodeId, SceneNodePayload};

/// The local axis an exercise gizmo is constrained to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum DominantAxis {
    X,
    Y,
    Z
}
impl DominantAxis {
    /// Picks the axis component with the largest magnitude.  Ties go to y, then z, then x,
    /// so (0.6, 0.6, 0.6) is y.
    pub fn from_axis(axis: &Vector3<f64>) -> Self {
        let (x, y, z) = (axis[0].abs(), axis[1].abs(), axis[2].abs());
        if y >= x && y >= z { return DominantAxis::Y; }
        if z >= x && z >= y { return DominantAxis::Z; }
        DominantAxis::X
    }
    pub fn unit_vector(&self) -> Vector3<f64> {
        match self {
            DominantAxis::X => { Vector3::x() }
            DominantAxis::Y => { Vector3::y() }
            DominantAxis::Z => { Vector3::z() }
        }
    }
    /// The unit vector of this axis, flipped when `axis` points the other way along it.
    pub fn directed_unit_vector(&self, axis: &Vector3<f64>) -> Vector3<f64> {
        let component = match self {
            DominantAxis::X => { axis[0] }
            DominantAxis::Y => { axis[1] }
            DominantAxis::Z => { axis[2] }
        };
        if component < 0.0 { -self.unit_vector() } else { self.unit_vector() }
    }
    pub fn color(&self) -> Color4 {
        match self {
            DominantAxis::X => { Color4::new(1.0, 0.0, 0.0, 1.0) }
            DominantAxis::Y => { Color4::new(0.0, 1.0, 0.0, 1.0) }
            DominantAxis::Z => { Color4::new(0.0, 0.0, 1.0, 1.0) }
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GizmoMotion {
    Rotation,
    Translation
}

/// A single-axis manipulator attached to one joint.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExerciseGizmo {
    joint_name: String,
    joint_type: JointType,
    motion: GizmoMotion,
    axis: DominantAxis,
    direction: Vector3<f64>,
    enable_limits: bool,
    node: SceneNodeId
}
impl ExerciseGizmo {
    pub fn joint_name(&self) -> &str { &self.joint_name }
    pub fn joint_type(&self) -> JointType { self.joint_type }
    pub fn motion(&self) -> GizmoMotion { self.motion }
    pub fn axis(&self) -> DominantAxis { self.axis }
    /// Local direction a positive joint value moves along / about.
    pub fn direction(&self) -> Vector3<f64> { self.direction }
    pub fn enable_limits(&self) -> bool { self.enable_limits }
    pub fn node(&self) -> SceneNodeId { self.node }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GizmoSelectionState {
    Idle,
    GizmoAttached(ExerciseGizmo)
}

/// Text describing a joint's current value and the world position it belongs next to.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct JointStatus {
    pub text: String,
    pub world_position: Vector3<f64>
}

/// Keeps at most one exercise gizmo alive and turns its drags into joint motion.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RobotJointGizmoModule {
    state: GizmoSelectionState
}
impl RobotJointGizmoModule {
    pub fn new() -> Self {
        Self { state: GizmoSelectionState::Idle }
    }
    pub fn state(&self) -> &GizmoSelectionState {
        &self.state
    }
    pub fn attached_gizmo(&self) -> Option<&ExerciseGizmo> {
        match &self.state {
            GizmoSelectionState::GizmoAttached(g) => { Some(g) }
            GizmoSelectionState::Idle => { None }
        }
    }
    /// Attaches a gizmo to the named joint, replacing any previous one.  Fixed joints are
    /// ignored entirely; planar and floating joints end up with no gizmo.  Returns the joint's
    /// status when a gizmo was attached.
    pub fn select_joint(&mut self, graph: &mut SceneGraph, robot: &Robot, joint_name: &str) -> Option<JointStatus> {
        let joint = match robot.joint(joint_name) {
            Some(j) => { j }
            None => {
                urdf_warn(&format!("Joint {:?} does not exist.", joint_name));
                return None;
            }
        };

        let motion = match joint.joint_type() {
            JointType::Fixed => { return None; }
            JointType::Planar | JointType::Floating => {
                self.deselect(graph);
                urdf_notice(&format!("Joint {:?} is {}; exercising it is not supported.", joint_name, joint.joint_type()));
                return None;
            }
            JointType::Revolute | JointType::Continuous => { GizmoMotion::Rotation }
            JointType::Prismatic => { GizmoMotion::Translation }
        };
        let joint_node = joint.node()?;

        self.deselect(graph);

        let axis = DominantAxis::from_axis(&joint.axis());
        let direction = axis.directed_unit_vector(&joint.axis());
        let kind = match motion {
            GizmoMotion::Rotation => { ManipulatorKind::AxisRotation }
            GizmoMotion::Translation => { ManipulatorKind::AxisTranslation }
        };
        let node = graph.create_node_with_payload(
            &format!("{}_exercise_gizmo", joint_name),
            Some(joint_node),
            SceneNodePayload::Manipulator(ManipulatorVisual { kind, local_axis: Some(direction), color: Some(axis.color()) })
        );

        self.state = GizmoSelectionState::GizmoAttached(ExerciseGizmo {
            joint_name: joint_name.to_string(),
            joint_type: joint.joint_type(),
            motion,
            axis,
            direction,
            enable_limits: joint.joint_type() != JointType::Continuous,
            node
        });

        Some(Self::joint_status(graph, joint))
    }
    /// Selects the joint that moves the link a picked node belongs to.  Picking an orphan link
    /// selects nothing.
    pub fn select_joint_from_pick(&mut self, graph: &mut SceneGraph, robot: &Robot, picked: SceneNodeId) -> Option<JointStatus> {
        let link = robot.link_owning_node(graph, picked)?;
        let joint_name = robot.find_joint_by_child_link(link.name())?.name().to_string();
        self.select_joint(graph, robot, &joint_name)
    }
    /// Disposes the gizmo, if any.  Returns true when one was attached.
    pub fn deselect(&mut self, graph: &mut SceneGraph) -> bool {
        match std::mem::replace(&mut self.state, GizmoSelectionState::Idle) {
            GizmoSelectionState::GizmoAttached(g) => {
                graph.dispose_node(g.node);
                true
            }
            GizmoSelectionState::Idle => { false }
        }
    }
    /// Applies a manipulator drag of `delta` (radians or meters) to the selected joint.
    pub fn drag(&mut self, graph: &mut SceneGraph, robot: &mut Robot, delta: f64) -> Option<JointStatus> {
        let current = self.current_value(robot)?;
        self.set_value(graph, robot, current + delta)
    }
    /// Moves the selected joint to `value`, clamped to its limits when those are enforced.
    pub fn set_value(&mut self, graph: &mut SceneGraph, robot: &mut Robot, value: f64) -> Option<JointStatus> {
        let gizmo = self.attached_gizmo()?.clone();
        let joint = robot.joint_mut(&gizmo.joint_name)?;

        let value = if gizmo.enable_limits && joint.has_usable_limits() {
            let (l, u) = (joint.lower_limit(), joint.upper_limit());
            value.clamp(l.min(u), l.max(u))
        } else {
            value
        };

        joint.set_position(graph, value, &gizmo.direction);
        Some(Self::joint_status(graph, joint))
    }
    pub fn current_value(&self, robot: &Robot) -> Option<f64> {
        let gizmo = self.attached_gizmo()?;
        robot.joint(&gizmo.joint_name).map(|j| j.position())
    }
    pub fn joint_status(graph: &SceneGraph, joint: &Joint) -> JointStatus {
        let mut text = format!("{}\ntype: {}\n", joint.name(), joint.joint_type());
        let world_position = match joint.node() {
            Some(n) => {
                if let Ok(node) = graph.node(n) {
                    if joint.joint_type().is_rotational() {
                        let (r, p, y) = node.rotation().euler_angles();
                        text += &format!("rotation: {:.3} {:.3} {:.3}\n", r, p, y);
                    } else {
                        let t = node.translation();
                        text += &format!("position: {:.3} {:.3} {:.3}\n", t[0], t[1], t[2]);
                    }
                }
                graph.world_position(n)
            }
            None => { Vector3::zeros() }
        };
        if joint.has_usable_limits() {
            text += &format!("limits: [{:.3}, {:.3}]", joint.lower_limit(), joint.upper_limit());
        }
        JointStatus { text: text.trim_end().to_string(), world_position }
    }
}
impl Default for RobotJointGizmoModule {
    fn default() -> Self {
        Self::new()
    }
}
