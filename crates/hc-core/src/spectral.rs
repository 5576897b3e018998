//! Separable orthonormal DCT-II compression with percentile thresholding.
//!
//! The forward transform applies the DCT-II along each axis in turn, the
//! inverse applies its transpose (DCT-III). Both are orthonormal, so energy is
//! preserved and the round trip is exact up to rounding.
//!
//! Each axis pass splits the tensor into disjoint outer blocks of
//! `len(axis) * stride(axis)` values. Blocks are independent and are handed
//! to rayon workers without locking.

use std::f64::consts::PI;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::validate_ratio;
use crate::error::{HypercubeError, Result};
use crate::field::DenseField;
use crate::grid::row_major_strides;

/// Orthonormal DCT-II basis for one axis length, stored row-major as
/// `basis[k * n + j] = s_k * cos(pi * (j + 1/2) * k / n)`.
#[derive(Clone, Debug)]
struct DctPlan {
    n: usize,
    basis: Vec<f64>,
}

impl DctPlan {
    fn new(n: usize) -> Self {
        let nf = n as f64;
        let s0 = (1.0 / nf).sqrt();
        let sk = (2.0 / nf).sqrt();
        let mut basis = vec![0.0; n * n];
        for k in 0..n {
            let scale = if k == 0 { s0 } else { sk };
            for j in 0..n {
                basis[k * n + j] = scale * (PI * (j as f64 + 0.5) * k as f64 / nf).cos();
            }
        }
        Self { n, basis }
    }

    fn forward(&self, input: &[f64], output: &mut [f64]) {
        let n = self.n;
        for (k, out) in output.iter_mut().enumerate() {
            let row = &self.basis[k * n..(k + 1) * n];
            *out = row.iter().zip(input).map(|(b, x)| b * x).sum();
        }
    }

    fn inverse(&self, input: &[f64], output: &mut [f64]) {
        let n = self.n;
        for (j, out) in output.iter_mut().enumerate() {
            *out = (0..n).map(|k| self.basis[k * n + j] * input[k]).sum();
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Forward,
    Inverse,
}

fn transform_axis(data: &mut [f64], shape: &[usize], axis: usize, direction: Direction) {
    let n = shape[axis];
    let stride = row_major_strides(shape)[axis];
    let plan = DctPlan::new(n);

    data.par_chunks_mut(n * stride).for_each(|block| {
        let mut line = vec![0.0; n];
        let mut out = vec![0.0; n];
        for inner in 0..stride {
            for (j, slot) in line.iter_mut().enumerate() {
                *slot = block[inner + j * stride];
            }
            match direction {
                Direction::Forward => plan.forward(&line, &mut out),
                Direction::Inverse => plan.inverse(&line, &mut out),
            }
            for (j, v) in out.iter().enumerate() {
                block[inner + j * stride] = *v;
            }
        }
    });
}

fn transform(data: &mut [f64], shape: &[usize], direction: Direction) {
    for axis in 0..shape.len() {
        transform_axis(data, shape, axis, direction);
    }
}

/// Full (unthresholded) coefficient tensor of `field`.
pub fn forward(field: &DenseField) -> Vec<f64> {
    let mut data = field.values().to_vec();
    transform(&mut data, field.shape(), Direction::Forward);
    data
}

/// Reconstruct a field from a coefficient tensor of the given shape.
pub fn inverse(shape: &[usize], coefficients: &[f64]) -> Result<DenseField> {
    let expected: usize = shape.iter().product();
    if coefficients.len() != expected {
        return Err(HypercubeError::DimensionMismatch(format!(
            "shape {shape:?} needs {expected} coefficients, got {}",
            coefficients.len()
        )));
    }
    let mut data = coefficients.to_vec();
    transform(&mut data, shape, Direction::Inverse);
    DenseField::new(shape.to_vec(), data)
}

/// Linear-interpolated percentile of an ascending slice, `p` in [0, 100].
fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = (p / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

/// Magnitude at the `100 * (1 - ratio)` percentile of `coefficients`.
pub fn threshold_for(coefficients: &[f64], ratio: f64) -> f64 {
    let mut magnitudes: Vec<f64> = coefficients.iter().map(|c| c.abs()).collect();
    magnitudes.sort_by(f64::total_cmp);
    percentile(&magnitudes, 100.0 * (1.0 - ratio))
}

/// Transform-domain coefficients with everything below the threshold zeroed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SparseSpectrum {
    shape: Vec<usize>,
    coefficients: Vec<f64>,
    compression_ratio: f64,
    threshold: f64,
}

impl SparseSpectrum {
    /// Forward transform, then keep coefficients with `|c| >= threshold`.
    ///
    /// Ties at the threshold survive, so slightly more than `ratio` of the
    /// coefficients may be kept.
    pub fn compress(field: &DenseField, ratio: f64) -> Result<Self> {
        validate_ratio(ratio)?;
        let coefficients = forward(field);
        Ok(Self::from_coefficients(
            field.shape().to_vec(),
            coefficients,
            ratio,
        ))
    }

    /// Threshold an already-transformed coefficient tensor.
    pub fn from_coefficients(shape: Vec<usize>, mut coefficients: Vec<f64>, ratio: f64) -> Self {
        let threshold = threshold_for(&coefficients, ratio);
        for c in coefficients.iter_mut() {
            if c.abs() < threshold {
                *c = 0.0;
            }
        }

        let spectrum = Self {
            shape,
            coefficients,
            compression_ratio: ratio,
            threshold,
        };
        tracing::debug!(
            ratio,
            threshold,
            retained = spectrum.nonzero_count(),
            total = spectrum.len(),
            "spectrum thresholded"
        );
        spectrum
    }

    /// Rebuild from stored nonzero entries. Entries must be in range, strictly
    /// ascending by flat index, and finite.
    pub fn from_entries(
        shape: Vec<usize>,
        entries: &[(usize, f64)],
        compression_ratio: f64,
        threshold: f64,
    ) -> Result<Self> {
        if shape.is_empty() || shape.iter().any(|&n| n == 0) {
            return Err(HypercubeError::DimensionMismatch(format!(
                "invalid spectrum shape {shape:?}"
            )));
        }
        let len = shape
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n))
            .ok_or_else(|| {
                HypercubeError::DimensionMismatch(format!("spectrum shape {shape:?} overflows"))
            })?;

        let mut coefficients = vec![0.0; len];
        let mut previous: Option<usize> = None;
        for &(index, value) in entries {
            if index >= len {
                return Err(HypercubeError::DimensionMismatch(format!(
                    "coefficient index {index} outside {len} cells"
                )));
            }
            if previous.is_some_and(|p| p >= index) {
                return Err(HypercubeError::InvalidParameter(format!(
                    "coefficient index {index} out of order"
                )));
            }
            if !value.is_finite() {
                return Err(HypercubeError::InvalidParameter(format!(
                    "coefficient {index} is not finite"
                )));
            }
            coefficients[index] = value;
            previous = Some(index);
        }

        Ok(Self {
            shape,
            coefficients,
            compression_ratio,
            threshold,
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    pub fn compression_ratio(&self) -> f64 {
        self.compression_ratio
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    pub fn nonzero_count(&self) -> usize {
        self.coefficients.iter().filter(|&&c| c != 0.0).count()
    }

    pub fn retained_fraction(&self) -> f64 {
        if self.coefficients.is_empty() {
            0.0
        } else {
            self.nonzero_count() as f64 / self.coefficients.len() as f64
        }
    }

    /// `(flat index, value)` for every nonzero coefficient, ascending.
    pub fn nonzero_entries(&self) -> Vec<(usize, f64)> {
        self.coefficients
            .iter()
            .enumerate()
            .filter(|(_, c)| **c != 0.0)
            .map(|(i, c)| (i, *c))
            .collect()
    }

    pub fn max_magnitude(&self) -> f64 {
        self.coefficients.iter().fold(0.0, |m, c| m.max(c.abs()))
    }

    /// Inverse transform. Lossy whenever coefficients were zeroed.
    pub fn reconstruct(&self) -> Result<DenseField> {
        inverse(&self.shape, &self.coefficients)
    }
}
