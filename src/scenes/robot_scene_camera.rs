use nalgebra::Vector3;
use serde::{Serialize, Deserialize};

/// Orbit camera description in the renderer's (y up) frame.  `alpha` is the longitudinal and
/// `beta` the latitudinal angle, both in radians.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ArcRotateCameraState {
    pub alpha: f64,
    pub beta: f64,
    pub radius: f64,
    pub target: Vector3<f64>
}
impl ArcRotateCameraState {
    pub fn new(alpha: f64, beta: f64, radius: f64, target: Vector3<f64>) -> Self {
        Self { alpha, beta, radius, target }
    }
    /// Looking slightly down at the origin from one unit away.
    pub fn new_default() -> Self {
        Self::new((-60.0f64).to_radians(), 75.0f64.to_radians(), 1.0, Vector3::zeros())
    }
    /// Keeps the viewing angles of `self` and moves target/radius so that the given world
    /// bounds fit.  `padding` scales the bounding sphere radius.
    pub fn framed_on(&self, min: &Vector3<f64>, max: &Vector3<f64>, padding: f64, min_radius: f64) -> Self {
        let target = (min + max) * 0.5;
        let half_diagonal = (max - min).norm() * 0.5;
        let radius = (half_diagonal * padding).max(min_radius);
        Self::new(self.alpha, self.beta, radius, target)
    }
    /// Camera position on its orbit, using the same spherical convention as the renderer.
    pub fn position(&self) -> Vector3<f64> {
        let offset = Vector3::new(
            self.radius * self.alpha.cos() * self.beta.sin(),
            self.radius * self.beta.cos(),
            self.radius * self.alpha.sin() * self.beta.sin()
        );
        self.target + offset
    }
}
impl Default for ArcRotateCameraState {
    fn default() -> Self {
        Self::new_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn framing_centers_on_bounds() {
        let c = ArcRotateCameraState::new_default();
        let f = c.framed_on(&Vector3::new(-1.0, 0.0, -1.0), &Vector3::new(1.0, 2.0, 1.0), 2.0, 0.1);
        assert_relative_eq!(f.target, Vector3::new(0.0, 1.0, 0.0));
        assert_relative_eq!(f.radius, 3.0f64.sqrt() * 2.0, epsilon = 1e-12);
        assert_eq!(f.alpha, c.alpha);
        assert_eq!(f.beta, c.beta);
    }

    #[test]
    fn degenerate_bounds_keep_a_minimum_radius() {
        let c = ArcRotateCameraState::new_default();
        let p = Vector3::new(0.5, 0.5, 0.5);
        let f = c.framed_on(&p, &p, 2.0, 0.25);
        assert_eq!(f.radius, 0.25);
        assert_relative_eq!((f.position() - f.target).norm(), 0.25, epsilon = 1e-12);
    }
}
