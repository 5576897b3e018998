use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{HypercubeError, Result};
use crate::grid::GridSpace;
use crate::law::CompiledLaw;

/// One value per grid cell, row-major over the grid's axis order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DenseField {
    shape: Vec<usize>,
    values: Vec<f64>,
}

impl DenseField {
    pub fn new(shape: Vec<usize>, values: Vec<f64>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if shape.is_empty() || values.len() != expected {
            return Err(HypercubeError::DimensionMismatch(format!(
                "shape {shape:?} needs {expected} values, got {}",
                values.len()
            )));
        }
        Ok(Self { shape, values })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: &[usize]) -> Option<f64> {
        if index.len() != self.shape.len() || index.iter().zip(&self.shape).any(|(i, n)| i >= n) {
            return None;
        }
        let mut flat = 0;
        for (&i, &n) in index.iter().zip(&self.shape) {
            flat = flat * n + i;
        }
        Some(self.values[flat])
    }

    /// Largest absolute difference against another field of the same shape.
    pub fn max_abs_diff(&self, other: &DenseField) -> Option<f64> {
        if self.shape != other.shape {
            return None;
        }
        Some(
            self.values
                .iter()
                .zip(&other.values)
                .map(|(a, b)| (a - b).abs())
                .fold(0.0, f64::max),
        )
    }
}

/// Evaluate a compiled law at every mesh cell.
///
/// Cells are independent, so evaluation is spread over the rayon pool with a
/// per-worker coordinate buffer. Non-finite samples are kept as-is and
/// reported once at warn level.
pub fn sample(grid: &GridSpace, law: &CompiledLaw) -> DenseField {
    let ndim = grid.ndim();
    let values: Vec<f64> = (0..grid.cell_count())
        .into_par_iter()
        .map_init(
            || vec![0.0; ndim],
            |point, flat| {
                grid.point_into(flat, point);
                law.evaluate(point)
            },
        )
        .collect();

    let non_finite = values.iter().filter(|v| !v.is_finite()).count();
    if non_finite > 0 {
        tracing::warn!(non_finite, cells = values.len(), "law produced non-finite samples");
    }
    tracing::debug!(cells = values.len(), shape = ?grid.shape(), "field sampled");

    DenseField {
        shape: grid.shape(),
        values,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::grid::Axis;
    use crate::law::Law;

    fn grid() -> GridSpace {
        GridSpace::new(vec![Axis::new("x", 0.0, 3.0, 4), Axis::new("y", 0.0, 1.0, 2)]).unwrap()
    }

    #[test]
    fn test_sample_matches_mesh() {
        let g = grid();
        let law = Law::numeric(|p| 10.0 * p[0] + p[1])
            .compile(&g, &BTreeMap::new())
            .unwrap();
        let field = sample(&g, &law);
        assert_eq!(field.shape(), &[4, 2]);
        for (flat, point) in g.mesh().enumerate() {
            assert_eq!(field.values()[flat], 10.0 * point[0] + point[1]);
        }
        assert_eq!(field.get(&[2, 1]), Some(21.0));
        assert_eq!(field.get(&[4, 0]), None);
    }

    #[test]
    fn test_expression_and_closure_agree() {
        let g = grid();
        let a = sample(
            &g,
            &Law::expression("x^2 + sin(y)")
                .compile(&g, &BTreeMap::new())
                .unwrap(),
        );
        let b = sample(
            &g,
            &Law::numeric(|p| p[0].powi(2) + p[1].sin())
                .compile(&g, &BTreeMap::new())
                .unwrap(),
        );
        assert!(a.max_abs_diff(&b).unwrap() < 1e-12);
    }

    #[test]
    fn test_non_finite_samples_kept() {
        let g = grid();
        let law = Law::expression("1 / x").compile(&g, &BTreeMap::new()).unwrap();
        let field = sample(&g, &law);
        assert!(field.values()[0].is_infinite());
        assert!(field.values()[2].is_finite());
    }

    #[test]
    fn test_new_rejects_wrong_length() {
        assert!(DenseField::new(vec![2, 2], vec![0.0; 3]).is_err());
        assert!(DenseField::new(vec![2, 2], vec![0.0; 4]).is_ok());
    }
}
