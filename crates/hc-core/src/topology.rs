//! Coarse fingerprints of a sparse spectrum.
//!
//! None of these are rigorous topological invariants. The Euler value is a
//! signed count of retained coefficients and the Betti triple is a histogram
//! of eigenvalue moduli. Both are deterministic given the spectrum, which is
//! all they are used for.

use std::collections::BTreeSet;

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::constants::{BETTI_HIGH, BETTI_LOW, SINGULARITY_FRACTION};
use crate::spectral::SparseSpectrum;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologySummary {
    /// `(-1)^N * nonzero_count`.
    pub euler_characteristic: i64,
    /// Eigenvalue moduli bucketed as `< 0.01`, `[0.01, 0.1)`, `>= 0.1`.
    pub betti_numbers: [usize; 3],
    /// Multi-indices of coefficients at or above 0.7 of the peak magnitude.
    pub singularities: BTreeSet<Vec<usize>>,
}

/// Summarize a spectrum. Eigen-decomposition dominates: O(M^3) with
/// `M = ceil(sqrt(len))`.
pub fn summarize(spectrum: &SparseSpectrum) -> TopologySummary {
    let ndim = spectrum.shape().len();
    let nonzero = spectrum.nonzero_count() as i64;
    let euler_characteristic = if ndim % 2 == 0 { nonzero } else { -nonzero };

    let summary = TopologySummary {
        euler_characteristic,
        betti_numbers: betti_numbers(spectrum.coefficients()),
        singularities: singularities(spectrum),
    };
    tracing::debug!(
        euler = summary.euler_characteristic,
        betti = ?summary.betti_numbers,
        singular = summary.singularities.len(),
        "topology summarized"
    );
    summary
}

/// Multi-indices of coefficients at or above `SINGULARITY_FRACTION` of the peak.
pub fn singularities(spectrum: &SparseSpectrum) -> BTreeSet<Vec<usize>> {
    let peak = spectrum.max_magnitude();
    if peak <= 0.0 {
        return BTreeSet::new();
    }
    let cutoff = SINGULARITY_FRACTION * peak;
    let strides = crate::grid::row_major_strides(spectrum.shape());

    spectrum
        .coefficients()
        .iter()
        .enumerate()
        .filter(|(_, c)| c.abs() >= cutoff)
        .map(|(flat, _)| {
            strides
                .iter()
                .zip(spectrum.shape())
                .map(|(&stride, &n)| (flat / stride) % n)
                .collect()
        })
        .collect()
}

/// Side of the square matrix the coefficients are reshaped into.
pub fn square_side(len: usize) -> usize {
    let mut side = (len as f64).sqrt() as usize;
    while side * side < len {
        side += 1;
    }
    while side > 0 && (side - 1) * (side - 1) >= len {
        side -= 1;
    }
    side
}

/// Zero-pad the flattened coefficients to `M * M`, reshape row-major, and
/// histogram the moduli of the (generally complex) eigenvalues.
fn betti_numbers(coefficients: &[f64]) -> [usize; 3] {
    let side = square_side(coefficients.len());
    if side == 0 {
        return [0, 0, 0];
    }
    // The Schur iteration does not converge on NaN or infinite entries.
    if coefficients.iter().any(|c| !c.is_finite()) {
        tracing::warn!(len = coefficients.len(), "non-finite spectrum, betti counts skipped");
        return [0, 0, 0];
    }

    let mut padded = coefficients.to_vec();
    padded.resize(side * side, 0.0);
    let matrix = DMatrix::from_row_slice(side, side, &padded);

    let mut buckets = [0usize; 3];
    for eigenvalue in matrix.complex_eigenvalues().iter() {
        let modulus = eigenvalue.norm();
        let bucket = if modulus < BETTI_LOW {
            0
        } else if modulus < BETTI_HIGH {
            1
        } else {
            2
        };
        buckets[bucket] += 1;
    }
    buckets
}
