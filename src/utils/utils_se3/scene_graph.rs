use std::f64::consts::FRAC_PI_2;
use nalgebra::{Isometry3, Point3, Translation3, Unit, UnitQuaternion, Vector3};
use serde::{Serialize, Deserialize};
use crate::utils::utils_errors::UrdfSceneError;
use crate::utils::utils_robot::material::Color4;
use crate::utils::utils_shape_geometry::trimesh_engine::TrimeshEngine;

/// Handle to a transform node inside a `SceneGraph`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SceneNodeId(usize);
impl SceneNodeId {
    pub fn idx(&self) -> usize { self.0 }
}

/// Handle to a material registered with a `SceneGraph`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SceneMaterialId(usize);
impl SceneMaterialId {
    pub fn idx(&self) -> usize { self.0 }
}

/// Shapes in the renderer's native convention: boxes are width (x) / height (y) / depth (z),
/// cylinders extend along local y.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum PrimitiveShape {
    Box { width: f64, height: f64, depth: f64 },
    Sphere { radius: f64 },
    Cylinder { height: f64, radius: f64 }
}
impl PrimitiveShape {
    /// Local axis aligned half extents of the shape.
    pub fn half_extents(&self) -> Vector3<f64> {
        match self {
            PrimitiveShape::Box { width, height, depth } => { Vector3::new(*width, *height, *depth) * 0.5 }
            PrimitiveShape::Sphere { radius } => { Vector3::new(*radius, *radius, *radius) }
            PrimitiveShape::Cylinder { height, radius } => { Vector3::new(*radius, height * 0.5, *radius) }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManipulatorKind {
    /// Three-axis translation handles.
    Position,
    /// Three-axis rotation rings.
    Rotation,
    AxisRotation,
    AxisTranslation
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ManipulatorVisual {
    pub kind: ManipulatorKind,
    pub local_axis: Option<Vector3<f64>>,
    pub color: Option<Color4>
}

/// What, if anything, the external renderer should draw for a node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SceneNodePayload {
    Empty,
    Primitive(PrimitiveShape),
    TriangleMesh(TrimeshEngine),
    Manipulator(ManipulatorVisual)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SceneNode {
    name: String,
    parent: Option<SceneNodeId>,
    children: Vec<SceneNodeId>,
    translation: Vector3<f64>,
    rotation: UnitQuaternion<f64>,
    enabled: bool,
    material: Option<SceneMaterialId>,
    payload: SceneNodePayload,
    disposed: bool
}
impl SceneNode {
    pub fn name(&self) -> &str { &self.name }
    pub fn parent(&self) -> Option<SceneNodeId> { self.parent }
    pub fn children(&self) -> &Vec<SceneNodeId> { &self.children }
    pub fn translation(&self) -> Vector3<f64> { self.translation }
    pub fn rotation(&self) -> UnitQuaternion<f64> { self.rotation }
    pub fn enabled(&self) -> bool { self.enabled }
    pub fn material(&self) -> Option<SceneMaterialId> { self.material }
    pub fn payload(&self) -> &SceneNodePayload { &self.payload }
    pub fn disposed(&self) -> bool { self.disposed }
    pub fn local_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.translation), self.rotation)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SceneMaterial {
    name: String,
    color: Color4,
    texture_uri: Option<String>,
    release_calls: usize,
    released: bool
}
impl SceneMaterial {
    pub fn name(&self) -> &str { &self.name }
    pub fn color(&self) -> Color4 { self.color }
    pub fn texture_uri(&self) -> &Option<String> { &self.texture_uri }
    pub fn released(&self) -> bool { self.released }
    /// How many times a release was requested; anything above one means an owner tried to
    /// dispose a material it shares.
    pub fn release_calls(&self) -> usize { self.release_calls }
}

/// In-memory transform hierarchy that the external renderer mirrors.  Nodes and materials are
/// never removed from the arena, they are flagged as disposed so stale handles stay harmless.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SceneGraph {
    nodes: Vec<SceneNode>,
    materials: Vec<SceneMaterial>
}
impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn create_node(&mut self, name: &str, parent: Option<SceneNodeId>) -> SceneNodeId {
        self.create_node_with_payload(name, parent, SceneNodePayload::Empty)
    }
    pub fn create_node_with_payload(&mut self, name: &str, parent: Option<SceneNodeId>, payload: SceneNodePayload) -> SceneNodeId {
        let id = SceneNodeId(self.nodes.len());
        self.nodes.push(SceneNode {
            name: name.to_string(),
            parent: None,
            children: vec![],
            translation: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            enabled: true,
            material: None,
            payload,
            disposed: false
        });
        if parent.is_some() { self.set_parent(id, parent); }
        id
    }
    pub fn node(&self, id: SceneNodeId) -> Result<&SceneNode, UrdfSceneError> {
        self.nodes.get(id.0).ok_or_else(|| UrdfSceneError::new_generic_error_str(&format!("Scene node {} does not exist.", id.0), file!(), line!()))
    }
    fn node_mut(&mut self, id: SceneNodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.0).filter(|n| !n.disposed)
    }
    pub fn is_alive(&self, id: SceneNodeId) -> bool {
        self.nodes.get(id.0).map(|n| !n.disposed).unwrap_or(false)
    }
    pub fn parent_of(&self, id: SceneNodeId) -> Option<SceneNodeId> {
        self.nodes.get(id.0).and_then(|n| n.parent)
    }
    /// Reparents a node, keeping its local transform.  Cycles are refused.
    pub fn set_parent(&mut self, id: SceneNodeId, parent: Option<SceneNodeId>) {
        if !self.is_alive(id) { return; }
        if let Some(p) = parent {
            if !self.is_alive(p) || self.is_ancestor_or_self(id, p) { return; }
        }
        if let Some(old) = self.nodes[id.0].parent {
            self.nodes[old.0].children.retain(|c| *c != id);
        }
        self.nodes[id.0].parent = parent;
        if let Some(p) = parent {
            self.nodes[p.0].children.push(id);
        }
    }
    fn is_ancestor_or_self(&self, ancestor: SceneNodeId, id: SceneNodeId) -> bool {
        let mut curr = Some(id);
        while let Some(c) = curr {
            if c == ancestor { return true; }
            curr = self.nodes[c.0].parent;
        }
        false
    }
    pub fn set_local_translation(&mut self, id: SceneNodeId, translation: Vector3<f64>) {
        if let Some(n) = self.node_mut(id) { n.translation = translation; }
    }
    pub fn set_local_rotation(&mut self, id: SceneNodeId, rotation: UnitQuaternion<f64>) {
        if let Some(n) = self.node_mut(id) { n.rotation = rotation; }
    }
    /// Post-multiplies a rotation onto the node's current local rotation, i.e. rotates about
    /// the node's own (already rotated) axes.
    pub fn add_local_rotation(&mut self, id: SceneNodeId, rotation: UnitQuaternion<f64>) {
        if let Some(n) = self.node_mut(id) { n.rotation = n.rotation * rotation; }
    }
    /// Applies a ROS roll-pitch-yaw triple as three successive local rotations: yaw about z,
    /// then pitch about y, then roll about x.
    pub fn apply_rpy_to_transform(&mut self, id: SceneNodeId, rpy: &Vector3<f64>) {
        self.add_local_rotation(id, UnitQuaternion::from_axis_angle(&Vector3::z_axis(), rpy[2]));
        self.add_local_rotation(id, UnitQuaternion::from_axis_angle(&Vector3::y_axis(), rpy[1]));
        self.add_local_rotation(id, UnitQuaternion::from_axis_angle(&Vector3::x_axis(), rpy[0]));
    }
    /// Rotation that turns a renderer-native (y extending) cylinder so it extends along z.
    pub fn cylinder_axis_correction() -> UnitQuaternion<f64> {
        UnitQuaternion::from_axis_angle(&Vector3::x_axis(), FRAC_PI_2)
    }
    /// Fixed conversion from ROS (z up) to the renderer (y up), applied once at a robot root.
    pub fn ros_to_renderer_rotation() -> UnitQuaternion<f64> {
        UnitQuaternion::from_axis_angle(&Vector3::x_axis(), -FRAC_PI_2)
    }
    pub fn set_enabled(&mut self, id: SceneNodeId, enabled: bool) {
        if let Some(n) = self.node_mut(id) { n.enabled = enabled; }
    }
    /// A node is visible when it and all of its ancestors are enabled.
    pub fn is_enabled_in_hierarchy(&self, id: SceneNodeId) -> bool {
        let mut curr = Some(id);
        while let Some(c) = curr {
            match self.nodes.get(c.0) {
                Some(n) if n.enabled && !n.disposed => { curr = n.parent; }
                _ => { return false; }
            }
        }
        true
    }
    pub fn set_material(&mut self, id: SceneNodeId, material: Option<SceneMaterialId>) {
        if let Some(n) = self.node_mut(id) { n.material = material; }
    }
    pub fn set_payload(&mut self, id: SceneNodeId, payload: SceneNodePayload) {
        if let Some(n) = self.node_mut(id) { n.payload = payload; }
    }
    pub fn world_transform(&self, id: SceneNodeId) -> Isometry3<f64> {
        let mut out = Isometry3::identity();
        let mut curr = Some(id);
        while let Some(c) = curr {
            match self.nodes.get(c.0) {
                Some(n) => {
                    out = n.local_isometry() * out;
                    curr = n.parent;
                }
                None => { break; }
            }
        }
        out
    }
    pub fn world_position(&self, id: SceneNodeId) -> Vector3<f64> {
        self.world_transform(id).translation.vector
    }
    /// Marks a single node as disposed and detaches it from its parent.  Children keep their
    /// own lifecycle.  Returns false when the node was already gone.
    pub fn dispose_node(&mut self, id: SceneNodeId) -> bool {
        if !self.is_alive(id) { return false; }
        self.set_parent(id, None);
        let n = &mut self.nodes[id.0];
        n.disposed = true;
        n.payload = SceneNodePayload::Empty;
        n.material = None;
        true
    }
    /// Disposes a node and every live descendant.
    pub fn dispose_subtree(&mut self, id: SceneNodeId) {
        let children = match self.nodes.get(id.0) {
            Some(n) => { n.children.clone() }
            None => { return; }
        };
        for c in children { self.dispose_subtree(c); }
        self.dispose_node(id);
    }
    pub fn create_material(&mut self, name: &str, color: Color4, texture_uri: Option<String>) -> SceneMaterialId {
        let id = SceneMaterialId(self.materials.len());
        self.materials.push(SceneMaterial {
            name: name.to_string(),
            color,
            texture_uri,
            release_calls: 0,
            released: false
        });
        id
    }
    pub fn material(&self, id: SceneMaterialId) -> Option<&SceneMaterial> {
        self.materials.get(id.0)
    }
    /// Idempotent; returns false if the material had already been released.
    pub fn release_material(&mut self, id: SceneMaterialId) -> bool {
        match self.materials.get_mut(id.0) {
            Some(m) => {
                m.release_calls += 1;
                if m.released { return false; }
                m.released = true;
                true
            }
            None => { false }
        }
    }
    pub fn num_live_nodes(&self) -> usize {
        self.nodes.iter().filter(|n| !n.disposed).count()
    }
    pub fn num_live_materials(&self) -> usize {
        self.materials.iter().filter(|m| !m.released).count()
    }
    /// Live descendants of `root` (not including it), depth first.
    pub fn descendants(&self, root: SceneNodeId) -> Vec<SceneNodeId> {
        let mut out = vec![];
        let mut stack = match self.nodes.get(root.0) {
            Some(n) => { n.children.iter().rev().cloned().collect::<Vec<_>>() }
            None => { return out; }
        };
        while let Some(c) = stack.pop() {
            if let Some(n) = self.nodes.get(c.0) {
                if n.disposed { continue; }
                out.push(c);
                for cc in n.children.iter().rev() { stack.push(*cc); }
            }
        }
        out
    }
    /// World-space axis aligned bounds of every visible renderable under `root`.  Manipulators
    /// are ignored.  Returns None if nothing renderable is visible.
    pub fn world_bounds(&self, root: SceneNodeId) -> Option<(Vector3<f64>, Vector3<f64>)> {
        let mut min = Vector3::repeat(f64::INFINITY);
        let mut max = Vector3::repeat(f64::NEG_INFINITY);
        let mut any = false;

        let mut include = |p: Vector3<f64>| {
            min = min.inf(&p);
            max = max.sup(&p);
            any = true;
        };

        for id in self.descendants(root) {
            if !self.is_enabled_in_hierarchy(id) { continue; }
            let n = &self.nodes[id.0];
            let world = self.world_transform(id);
            match &n.payload {
                SceneNodePayload::Primitive(shape) => {
                    let h = shape.half_extents();
                    for i in 0..8 {
                        let corner = Point3::new(
                            if i & 1 == 0 { -h[0] } else { h[0] },
                            if i & 2 == 0 { -h[1] } else { h[1] },
                            if i & 4 == 0 { -h[2] } else { h[2] }
                        );
                        include((world * corner).coords);
                    }
                }
                SceneNodePayload::TriangleMesh(mesh) => {
                    for v in mesh.vertices() {
                        include((world * Point3::from(*v)).coords);
                    }
                }
                SceneNodePayload::Empty | SceneNodePayload::Manipulator(_) => {}
            }
        }

        if any { Some((min, max)) } else { None }
    }
}

/// Returns the unit vector of the given local axis.
pub fn unit_axis(axis: &Vector3<f64>) -> Option<Unit<Vector3<f64>>> {
    Unit::try_new(*axis, 1e-12)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn yaw_quarter_turn_maps_x_to_y() {
        let mut g = SceneGraph::new();
        let n = g.create_node("n", None);
        g.apply_rpy_to_transform(n, &Vector3::new(0.0, 0.0, PI / 2.0));
        let v = g.node(n).unwrap().rotation() * Vector3::x();
        assert_relative_eq!(v, Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn successive_rpy_matches_fixed_axis_convention() {
        let mut g = SceneGraph::new();
        let n = g.create_node("n", None);
        let rpy = Vector3::new(0.3, -0.7, 1.1);
        g.apply_rpy_to_transform(n, &rpy);
        let expected = UnitQuaternion::from_euler_angles(rpy[0], rpy[1], rpy[2]);
        assert_relative_eq!(g.node(n).unwrap().rotation().to_rotation_matrix(), expected.to_rotation_matrix(), epsilon = 1e-12);
    }

    #[test]
    fn ros_up_becomes_renderer_up() {
        let v = SceneGraph::ros_to_renderer_rotation() * Vector3::z();
        assert_relative_eq!(v, Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
        let c = SceneGraph::cylinder_axis_correction() * Vector3::y();
        assert_relative_eq!(c, Vector3::new(0.0, 0.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn world_transform_composes_parents() {
        let mut g = SceneGraph::new();
        let a = g.create_node("a", None);
        let b = g.create_node("b", Some(a));
        g.set_local_translation(a, Vector3::new(1.0, 0.0, 0.0));
        g.set_local_rotation(a, UnitQuaternion::from_axis_angle(&Vector3::z_axis(), PI / 2.0));
        g.set_local_translation(b, Vector3::new(1.0, 0.0, 0.0));
        assert_relative_eq!(g.world_position(b), Vector3::new(1.0, 1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn reparenting_refuses_cycles() {
        let mut g = SceneGraph::new();
        let a = g.create_node("a", None);
        let b = g.create_node("b", Some(a));
        g.set_parent(a, Some(b));
        assert_eq!(g.parent_of(a), None);
        assert_eq!(g.node(a).unwrap().children(), &vec![b]);
    }

    #[test]
    fn dispose_is_idempotent() {
        let mut g = SceneGraph::new();
        let a = g.create_node("a", None);
        let m = g.create_material("m", Color4::new(1.0, 0.0, 0.0, 1.0), None);
        assert!(g.dispose_node(a));
        assert!(!g.dispose_node(a));
        assert!(g.release_material(m));
        assert!(!g.release_material(m));
        assert_eq!(g.material(m).unwrap().release_calls(), 2);
        assert_eq!(g.num_live_nodes(), 0);
        assert_eq!(g.num_live_materials(), 0);
    }

    #[test]
    fn bounds_skip_disabled_nodes() {
        let mut g = SceneGraph::new();
        let root = g.create_node("root", None);
        let a = g.create_node_with_payload("a", Some(root), SceneNodePayload::Primitive(PrimitiveShape::Box { width: 2.0, height: 2.0, depth: 2.0 }));
        let b = g.create_node_with_payload("b", Some(root), SceneNodePayload::Primitive(PrimitiveShape::Sphere { radius: 1.0 }));
        g.set_local_translation(b, Vector3::new(10.0, 0.0, 0.0));
        g.set_enabled(b, false);
        let (min, max) = g.world_bounds(root).unwrap();
        assert_relative_eq!(min, Vector3::new(-1.0, -1.0, -1.0));
        assert_relative_eq!(max, Vector3::new(1.0, 1.0, 1.0));
        g.set_enabled(b, true);
        g.set_enabled(a, false);
        let (min, _) = g.world_bounds(root).unwrap();
        assert_relative_eq!(min[0], 9.0, epsilon = 1e-12);
    }
}
