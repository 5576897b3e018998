//! Separable piecewise-cubic interpolation over a rectilinear grid.
//!
//! On each axis the interpolant is the Lagrange cubic through the four grid
//! nodes nearest the query (the stencil is shifted inward at the edges, and
//! axes with two or three samples fall back to linear or quadratic stencils).
//! The N-dimensional value is the tensor product of the per-axis weights.
//! Polynomials up to degree three per axis are reproduced exactly and grid
//! nodes return their sample exactly.

use crate::config::OutOfBoundsPolicy;
use crate::error::{HypercubeError, Result};
use crate::field::DenseField;
use crate::grid::GridSpace;

const STENCIL: usize = 4;

/// Per-axis stencil: first node index and one weight per node.
struct AxisWeights {
    start: usize,
    weights: [f64; STENCIL],
    len: usize,
}

#[derive(Clone, Debug)]
pub struct Interpolator {
    coords: Vec<Vec<f64>>,
    strides: Vec<usize>,
    values: Vec<f64>,
    policy: OutOfBoundsPolicy,
}

impl Interpolator {
    pub fn new(grid: &GridSpace, field: &DenseField, policy: OutOfBoundsPolicy) -> Result<Self> {
        if field.shape() != grid.shape().as_slice() {
            return Err(HypercubeError::DimensionMismatch(format!(
                "field shape {:?} does not match grid shape {:?}",
                field.shape(),
                grid.shape()
            )));
        }
        Ok(Self {
            coords: (0..grid.ndim())
                .map(|axis| grid.coordinates_at(axis).to_vec())
                .collect(),
            strides: grid.strides().to_vec(),
            values: field.values().to_vec(),
            policy,
        })
    }

    pub fn ndim(&self) -> usize {
        self.coords.len()
    }

    /// Interpolated value at a point given in axis order.
    pub fn evaluate(&self, point: &[f64]) -> Result<f64> {
        if point.len() != self.ndim() {
            return Err(HypercubeError::DimensionMismatch(format!(
                "point has {} coordinates, grid has {} axes",
                point.len(),
                self.ndim()
            )));
        }

        let stencils: Vec<AxisWeights> = self
            .coords
            .iter()
            .zip(point)
            .map(|(coords, &x)| self.axis_weights(coords, x))
            .collect();

        // Walk every stencil combination with an odometer over the axes.
        let ndim = stencils.len();
        let mut offsets = vec![0usize; ndim];
        let mut total = 0.0;
        loop {
            let mut weight = 1.0;
            let mut flat = 0;
            for axis in 0..ndim {
                let s = &stencils[axis];
                weight *= s.weights[offsets[axis]];
                flat += (s.start + offsets[axis]) * self.strides[axis];
            }
            total += weight * self.values[flat];

            let mut axis = ndim;
            loop {
                if axis == 0 {
                    return Ok(total);
                }
                axis -= 1;
                offsets[axis] += 1;
                if offsets[axis] < stencils[axis].len {
                    break;
                }
                offsets[axis] = 0;
            }
        }
    }

    /// Central finite differences with step `h` on every axis.
    ///
    /// Under `Clamp` the interpolant is flat outside the grid: the derivative
    /// there is zero, and within `h` of a bound the difference turns
    /// one-sided so the clamped side does not halve the slope.
    pub fn gradient(&self, point: &[f64], h: f64) -> Result<Vec<f64>> {
        if point.len() != self.ndim() {
            return Err(HypercubeError::DimensionMismatch(format!(
                "point has {} coordinates, grid has {} axes",
                point.len(),
                self.ndim()
            )));
        }

        let mut shifted = point.to_vec();
        let mut grad = Vec::with_capacity(point.len());
        for (axis, coords) in self.coords.iter().enumerate() {
            let x = point[axis];
            let (mut ahead, mut behind) = (x + h, x - h);
            if self.policy == OutOfBoundsPolicy::Clamp {
                let (lower, upper) = (coords[0], coords[coords.len() - 1]);
                if x < lower || x > upper {
                    grad.push(0.0);
                    continue;
                }
                ahead = ahead.min(upper);
                behind = behind.max(lower);
            }

            shifted[axis] = ahead;
            let forward = self.evaluate(&shifted)?;
            shifted[axis] = behind;
            let backward = self.evaluate(&shifted)?;
            shifted[axis] = x;
            grad.push((forward - backward) / (ahead - behind));
        }
        Ok(grad)
    }

    fn axis_weights(&self, coords: &[f64], x: f64) -> AxisWeights {
        let n = coords.len();
        let lower = coords[0];
        let upper = coords[n - 1];
        let x = match self.policy {
            OutOfBoundsPolicy::Clamp => x.clamp(lower, upper),
            OutOfBoundsPolicy::Extrapolate => x,
        };

        let len = n.min(STENCIL);
        // Cell containing x, clamped so out-of-range points use the edge cell.
        let cell = coords
            .partition_point(|&c| c <= x)
            .saturating_sub(1)
            .min(n - 2);
        let start = cell.saturating_sub(1).min(n - len);

        let mut weights = [0.0; STENCIL];
        for (j, w) in weights.iter_mut().enumerate().take(len) {
            let xj = coords[start + j];
            *w = (0..len)
                .filter(|&m| m != j)
                .map(|m| {
                    let xm = coords[start + m];
                    (x - xm) / (xj - xm)
                })
                .product();
        }

        AxisWeights {
            start,
            weights,
            len,
        }
    }
}
