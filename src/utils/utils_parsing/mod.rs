use nalgebra::Vector3;
use crate::utils::utils_errors::UrdfSceneError;
use crate::utils::utils_robot::material::Color4;

/// Convenience struct that holds the numeric attribute parsers used by the URDF deserializer.
/// Every function is pure and reports a `FormatError` on a wrong token count or a non-numeric
/// token; the deserializer decides how to degrade.
pub struct UrdfAttributeParsers;
impl UrdfAttributeParsers {
    /// Parses `"x y z"` (any amount of whitespace) into a vector.
    pub fn parse_vector3(s: &str) -> Result<Vector3<f64>, UrdfSceneError> {
        let v = Self::parse_n_floats(s, 3, "a 3-component vector")?;
        Ok(Vector3::new(v[0], v[1], v[2]))
    }
    /// Parses `"r g b a"`.  Values outside of [0,1] are accepted as-is.
    pub fn parse_color4(s: &str) -> Result<Color4, UrdfSceneError> {
        let v = Self::parse_n_floats(s, 4, "an rgba color")?;
        Ok(Color4::new(v[0], v[1], v[2], v[3]))
    }
    /// Parses `"roll pitch yaw"` in radians.  The triple is not reordered.
    pub fn parse_rpy(s: &str) -> Result<Vector3<f64>, UrdfSceneError> {
        let v = Self::parse_n_floats(s, 3, "a roll-pitch-yaw triple")?;
        Ok(Vector3::new(v[0], v[1], v[2]))
    }
    pub fn parse_f64(s: &str) -> Result<f64, UrdfSceneError> {
        let v = Self::parse_n_floats(s, 1, "a number")?;
        Ok(v[0])
    }
    fn parse_n_floats(s: &str, n: usize, expected: &str) -> Result<Vec<f64>, UrdfSceneError> {
        let tokens: Vec<&str> = s.split_whitespace().collect();
        if tokens.len() != n {
            return Err(UrdfSceneError::new_format_error(s, expected, file!(), line!()));
        }

        let mut out = Vec::with_capacity(n);
        for t in tokens {
            match t.parse::<f64>() {
                Ok(f) => { out.push(f) }
                Err(_) => { return Err(UrdfSceneError::new_format_error(s, expected, file!(), line!())) }
            }
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_vector_with_irregular_whitespace() {
        let v = UrdfAttributeParsers::parse_vector3("  1.5\t-2   3e-1 ").unwrap();
        assert_eq!(v, Vector3::new(1.5, -2.0, 0.3));
    }

    #[test]
    fn vector_rejects_wrong_arity_and_garbage() {
        assert!(UrdfAttributeParsers::parse_vector3("1 2").unwrap_err().is_format_error());
        assert!(UrdfAttributeParsers::parse_vector3("1 2 3 4").is_err());
        assert!(UrdfAttributeParsers::parse_vector3("").is_err());
        assert!(UrdfAttributeParsers::parse_vector3("1 two 3").is_err());
    }

    #[test]
    fn color_requires_four_components_but_not_range() {
        let c = UrdfAttributeParsers::parse_color4("0 1 1 1").unwrap();
        assert_eq!(c, Color4::new(0.0, 1.0, 1.0, 1.0));
        let c = UrdfAttributeParsers::parse_color4("2 0 0 1").unwrap();
        assert_eq!(c.r, 2.0);
        assert!(UrdfAttributeParsers::parse_color4("0 1 1").unwrap_err().is_format_error());
    }

    #[test]
    fn rpy_keeps_roll_pitch_yaw_order() {
        let rpy = UrdfAttributeParsers::parse_rpy("0.1 0.2 0.3").unwrap();
        assert_eq!(rpy, Vector3::new(0.1, 0.2, 0.3));
    }

    proptest! {
        #[test]
        fn well_formed_triples_parse_back(x in -1.0e6f64..1.0e6, y in -1.0e6f64..1.0e6, z in -1.0e6f64..1.0e6) {
            let s = format!("{} {} {}", x, y, z);
            let v = UrdfAttributeParsers::parse_vector3(&s).unwrap();
            prop_assert_eq!(v, Vector3::new(x, y, z));
        }

        #[test]
        fn other_token_counts_are_format_errors(values in proptest::collection::vec(-100.0f64..100.0, 0..7)) {
            prop_assume!(values.len() != 3);
            let s = values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ");
            prop_assert!(UrdfAttributeParsers::parse_vector3(&s).unwrap_err().is_format_error());
        }
    }
}
