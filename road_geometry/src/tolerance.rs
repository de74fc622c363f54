use serde::{Deserialize, Serialize};

use crate::error::GeometryError;

/// curvature (or curvature change) times segment length below this is treated as exactly zero
/// by the spiral solver, a near zero arc curvature below it is evaluated as a line
pub const CURVATURE_EPSILON: f64 = 1e-9;
/// cubic coefficients closer than this are the same coefficient
pub const COEFFICIENT_EPSILON: f64 = 1e-6;
/// declared vs integrated geometry length
pub const LENGTH_MATCH_THRESHOLD: f64 = 1e-3;

pub const ODE_ATOL: f64 = 1e-9;
pub const ODE_RTOL: f64 = 1e-12;

pub const QUAD_EPSABS: f64 = 1.49e-8;
pub const QUAD_EPSREL: f64 = 1.49e-8;
/// max number of subintervals for adaptive quadrature
pub const QUAD_LIMIT: usize = 50;

pub fn is_effectively_zero(value: f64, epsilon: f64) -> bool {
    value.abs() <= epsilon
}

/// All the tolerances in one place, any field left out of a config file keeps its default
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerances {
    pub curvature: f64,
    pub coefficient: f64,
    pub length_match: f64,
    pub ode_atol: f64,
    pub ode_rtol: f64,
    pub quad_epsabs: f64,
    pub quad_epsrel: f64,
    pub quad_limit: usize,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            curvature: CURVATURE_EPSILON,
            coefficient: COEFFICIENT_EPSILON,
            length_match: LENGTH_MATCH_THRESHOLD,
            ode_atol: ODE_ATOL,
            ode_rtol: ODE_RTOL,
            quad_epsabs: QUAD_EPSABS,
            quad_epsrel: QUAD_EPSREL,
            quad_limit: QUAD_LIMIT,
        }
    }
}

impl Tolerances {
    pub fn from_toml_str(text: &str) -> Result<Self, GeometryError> {
        let tolerances: Self =
            toml::from_str(text).map_err(|e| GeometryError::Config(e.to_string()))?;
        tolerances.validate()?;
        Ok(tolerances)
    }

    fn validate(&self) -> Result<(), GeometryError> {
        let positive = [
            ("curvature", self.curvature),
            ("coefficient", self.coefficient),
            ("length_match", self.length_match),
            ("ode_atol", self.ode_atol),
            ("ode_rtol", self.ode_rtol),
            ("quad_epsabs", self.quad_epsabs),
            ("quad_epsrel", self.quad_epsrel),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(GeometryError::Config(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if self.quad_limit == 0 {
            return Err(GeometryError::Config("quad_limit must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let tol = Tolerances::from_toml_str("length_match = 0.01\nquad_limit = 200\n").unwrap();
        assert_eq!(tol.length_match, 0.01);
        assert_eq!(tol.quad_limit, 200);
        assert_eq!(tol.curvature, CURVATURE_EPSILON);
        assert_eq!(tol.ode_rtol, ODE_RTOL);
    }

    #[test]
    fn empty_config_is_default() {
        assert_eq!(Tolerances::from_toml_str("").unwrap(), Tolerances::default());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            Tolerances::from_toml_str("ode_atol = -1.0"),
            Err(GeometryError::Config(_))
        ));
        assert!(Tolerances::from_toml_str("quad_limit = 0").is_err());
        assert!(Tolerances::from_toml_str("curvature = \"small\"").is_err());
    }

    #[test]
    fn zero_check() {
        assert!(is_effectively_zero(5e-10, CURVATURE_EPSILON));
        assert!(is_effectively_zero(-5e-10, CURVATURE_EPSILON));
        assert!(!is_effectively_zero(1e-8, CURVATURE_EPSILON));
    }
}
