use indexmap::IndexMap;
use serde::{Serialize, Deserialize};
use crate::utils::utils_se3::scene_graph::{SceneGraph, SceneMaterialId};

/// Flat RGBA color, each channel nominally in [0,1].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Color4 {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    pub a: f64
}
impl Color4 {
    pub fn new(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self { r, g, b, a }
    }
    pub fn mid_gray() -> Self {
        Self::new(0.5, 0.5, 0.5, 1.0)
    }
    pub fn translucent_red() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.25)
    }
    pub fn white() -> Self {
        Self::new(1.0, 1.0, 1.0, 1.0)
    }
}

/// A named URDF material.  A material that carries neither a color nor a texture is a
/// reference to an entry of the robot's material table with the same name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Material {
    name: String,
    color: Option<Color4>,
    texture_uri: Option<String>
}
impl Material {
    pub const DEFAULT_MATERIAL_NAME: &'static str = "default";
    pub const COLLISION_MATERIAL_NAME: &'static str = "collision";

    pub fn new(name: &str, color: Option<Color4>, texture_uri: Option<String>) -> Self {
        Self {
            name: name.to_string(),
            color,
            texture_uri
        }
    }
    pub fn new_reference(name: &str) -> Self {
        Self::new(name, None, None)
    }
    pub fn new_default(color: Color4) -> Self {
        Self::new(Self::DEFAULT_MATERIAL_NAME, Some(color), None)
    }
    pub fn new_collision(color: Color4) -> Self {
        Self::new(Self::COLLISION_MATERIAL_NAME, Some(color), None)
    }
    pub fn is_reference(&self) -> bool {
        self.color.is_none() && self.texture_uri.is_none()
    }
    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn color(&self) -> Option<Color4> {
        self.color
    }
    pub fn texture_uri(&self) -> &Option<String> {
        &self.texture_uri
    }
    /// The color the renderer should shade with.  Textured materials without a color are
    /// tinted white so the texture shows unmodified.
    pub fn effective_color(&self) -> Color4 {
        match self.color {
            Some(c) => { c }
            None => { Color4::white() }
        }
    }
    pub fn set_color(&mut self, color: Option<Color4>) {
        self.color = color;
    }
}

/// Picks the material a visual renders with, in order: the visual's own material (a definition,
/// or a reference found in the table), the link's material, the robot's "default" material.
pub struct MaterialResolver<'a> {
    table: &'a IndexMap<String, Material>,
    handles: &'a IndexMap<String, SceneMaterialId>,
    unresolved: Vec<(String, String)>
}
impl<'a> MaterialResolver<'a> {
    pub fn new(table: &'a IndexMap<String, Material>, handles: &'a IndexMap<String, SceneMaterialId>) -> Self {
        Self {
            table,
            handles,
            unresolved: vec![]
        }
    }
    /// Returns the resolved material and, when it lives in the shared table, its handle.
    /// Definitions come back without a handle; the caller creates and owns one.
    pub fn resolve(&mut self, visual: Option<&Material>, link: Option<&Material>, owner: &str) -> (Material, Option<SceneMaterialId>) {
        for candidate in [visual, link].into_iter().flatten() {
            if !candidate.is_reference() {
                return (candidate.clone(), None);
            }
            if let Some(r) = self.shared(candidate.name()) { return r; }
            self.unresolved.push((owner.to_string(), candidate.name().to_string()));
        }
        self.shared(Material::DEFAULT_MATERIAL_NAME)
            .unwrap_or_else(|| (Material::new_default(Color4::mid_gray()), None))
    }
    pub fn collision(&self) -> (Material, Option<SceneMaterialId>) {
        self.shared(Material::COLLISION_MATERIAL_NAME)
            .unwrap_or_else(|| (Material::new_collision(Color4::translucent_red()), None))
    }
    fn shared(&self, name: &str) -> Option<(Material, Option<SceneMaterialId>)> {
        let m = self.table.get(name)?;
        let h = self.handles.get(name)?;
        Some((m.clone(), Some(*h)))
    }
    /// Hands back a render handle for the resolved material, creating an owned one when the
    /// material is not shared.  The flag is true when the caller owns the handle.
    pub fn materialize(graph: &mut SceneGraph, resolved: &(Material, Option<SceneMaterialId>)) -> (SceneMaterialId, bool) {
        match resolved.1 {
            Some(h) => { (h, false) }
            None => {
                let m = &resolved.0;
                (graph.create_material(m.name(), m.effective_color(), m.texture_uri().clone()), true)
            }
        }
    }
    /// (owner, material name) pairs that did not match any table entry.
    pub fn take_unresolved(&mut self) -> Vec<(String, String)> {
        std::mem::take(&mut self.unresolved)
    }
}
