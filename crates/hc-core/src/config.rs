use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_COMPRESSION_RATIO, DEFAULT_MAX_CELLS, GRADIENT_STEP};
use crate::error::{HypercubeError, Result};

/// What the interpolator does with coordinates outside `[lower, upper]`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutOfBoundsPolicy {
    /// Evaluate the edge cubic beyond the grid. Finite input gives finite output.
    #[default]
    Extrapolate,
    /// Clamp each coordinate into the axis range before interpolating.
    Clamp,
}

/// Per-instance settings.
///
/// `constants` replaces a process-wide table of named physical constants:
/// expression laws resolve identifiers that are not axes against it, and the
/// values are seeded into the instance metadata so they persist with it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HypercubeConfig {
    pub compression_ratio: f64,
    /// Upper bound on grid cells accepted by `build`. `None` disables the guard.
    pub max_cells: Option<usize>,
    pub out_of_bounds: OutOfBoundsPolicy,
    pub gradient_step: f64,
    pub constants: BTreeMap<String, f64>,
}

impl Default for HypercubeConfig {
    fn default() -> Self {
        Self {
            compression_ratio: DEFAULT_COMPRESSION_RATIO,
            max_cells: Some(DEFAULT_MAX_CELLS),
            out_of_bounds: OutOfBoundsPolicy::default(),
            gradient_step: GRADIENT_STEP,
            constants: BTreeMap::new(),
        }
    }
}

impl HypercubeConfig {
    pub fn with_constant(mut self, name: &str, value: f64) -> Self {
        self.constants.insert(name.to_string(), value);
        self
    }

    pub fn with_out_of_bounds(mut self, policy: OutOfBoundsPolicy) -> Self {
        self.out_of_bounds = policy;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_ratio(self.compression_ratio)?;
        if !(self.gradient_step.is_finite() && self.gradient_step > 0.0) {
            return Err(HypercubeError::InvalidParameter(format!(
                "gradient_step must be positive and finite, got {}",
                self.gradient_step
            )));
        }
        if self.max_cells == Some(0) {
            return Err(HypercubeError::InvalidParameter(
                "max_cells must be at least 1".to_string(),
            ));
        }
        for (name, value) in &self.constants {
            if !value.is_finite() {
                return Err(HypercubeError::InvalidParameter(format!(
                    "constant '{name}' is not finite"
                )));
            }
        }
        Ok(())
    }
}

/// Compression ratio must lie in (0, 1].
pub fn validate_ratio(ratio: f64) -> Result<()> {
    if ratio.is_finite() && ratio > 0.0 && ratio <= 1.0 {
        Ok(())
    } else {
        Err(HypercubeError::InvalidParameter(format!(
            "compression_ratio must be in (0, 1], got {ratio}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(HypercubeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_ratio_bounds() {
        assert!(validate_ratio(1.0).is_ok());
        assert!(validate_ratio(0.05).is_ok());
        assert!(validate_ratio(0.0).is_err());
        assert!(validate_ratio(1.5).is_err());
        assert!(validate_ratio(f64::NAN).is_err());
    }

    #[test]
    fn test_rejects_bad_step_and_constants() {
        let cfg = HypercubeConfig {
            gradient_step: 0.0,
            ..HypercubeConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = HypercubeConfig::default().with_constant("c", f64::INFINITY);
        assert!(matches!(
            cfg.validate(),
            Err(HypercubeError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_builder_helpers() {
        let cfg = HypercubeConfig::default()
            .with_constant("g", 9.81)
            .with_out_of_bounds(OutOfBoundsPolicy::Clamp);
        assert_eq!(cfg.constants.get("g"), Some(&9.81));
        assert_eq!(cfg.out_of_bounds, OutOfBoundsPolicy::Clamp);
    }
}
