use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{HypercubeError, Result};

static AXIS_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// One named, bounded, discretized parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub name: String,
    pub lower: f64,
    pub upper: f64,
    pub samples: usize,
}

impl Axis {
    pub fn new(name: &str, lower: f64, upper: f64, samples: usize) -> Self {
        Self {
            name: name.to_string(),
            lower,
            upper,
            samples,
        }
    }

    /// Names must be identifiers so expression laws can reference them.
    pub fn validate(&self) -> Result<()> {
        if !AXIS_NAME.is_match(&self.name) {
            return Err(HypercubeError::InvalidAxis(format!(
                "'{}' is not a valid identifier",
                self.name
            )));
        }
        if !(self.lower.is_finite() && self.upper.is_finite()) {
            return Err(HypercubeError::InvalidAxis(format!(
                "{}: bounds must be finite",
                self.name
            )));
        }
        if self.lower >= self.upper {
            return Err(HypercubeError::InvalidAxis(format!(
                "{}: lower {} must be below upper {}",
                self.name, self.lower, self.upper
            )));
        }
        if self.samples < 2 {
            return Err(HypercubeError::InvalidAxis(format!(
                "{}: need at least 2 samples, got {}",
                self.name, self.samples
            )));
        }
        Ok(())
    }

    /// Evenly spaced samples with the endpoints pinned to the bounds.
    fn linspace(&self) -> Vec<f64> {
        let span = self.upper - self.lower;
        let last = self.samples - 1;
        let mut coords: Vec<f64> = (0..self.samples)
            .map(|i| self.lower + span * (i as f64 / last as f64))
            .collect();
        coords[last] = self.upper;
        coords
    }
}

/// Ordered set of axes and their coordinate vectors.
///
/// Axis order fixes the tensor dimension order. Fields are stored row-major,
/// so the last axis varies fastest in the flattened layout.
#[derive(Clone, Debug, PartialEq)]
pub struct GridSpace {
    axes: Vec<Axis>,
    coords: Vec<Vec<f64>>,
    strides: Vec<usize>,
}

impl GridSpace {
    pub fn new(axes: Vec<Axis>) -> Result<Self> {
        if axes.is_empty() {
            return Err(HypercubeError::InvalidAxis(
                "grid needs at least one axis".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for axis in &axes {
            axis.validate()?;
            if !seen.insert(axis.name.clone()) {
                return Err(HypercubeError::InvalidAxis(format!(
                    "duplicate axis name: {}",
                    axis.name
                )));
            }
        }

        // Every stride is a suffix of this product, so one check covers them all.
        let cells = axes
            .iter()
            .try_fold(1usize, |acc, a| acc.checked_mul(a.samples));
        if cells.is_none() {
            return Err(HypercubeError::InvalidAxis(format!(
                "{} axes: cell count overflows",
                axes.len()
            )));
        }

        let coords: Vec<Vec<f64>> = axes.iter().map(Axis::linspace).collect();
        for (axis, c) in axes.iter().zip(&coords) {
            if c.windows(2).any(|w| w[0] >= w[1]) {
                return Err(HypercubeError::InvalidAxis(format!(
                    "{}: range too narrow for {} distinct samples",
                    axis.name, axis.samples
                )));
            }
        }

        let shape: Vec<usize> = axes.iter().map(|a| a.samples).collect();
        let strides = row_major_strides(&shape);

        Ok(Self {
            axes,
            coords,
            strides,
        })
    }

    /// Grid with a shared resolution on every axis.
    pub fn uniform(bounds: &[(&str, f64, f64)], resolution: usize) -> Result<Self> {
        Self::new(
            bounds
                .iter()
                .map(|&(name, lower, upper)| Axis::new(name, lower, upper, resolution))
                .collect(),
        )
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.axes.iter().map(|a| a.name.as_str())
    }

    pub fn ndim(&self) -> usize {
        self.axes.len()
    }

    pub fn shape(&self) -> Vec<usize> {
        self.axes.iter().map(|a| a.samples).collect()
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    /// Total cells, saturating at `usize::MAX` for absurd grids.
    pub fn cell_count(&self) -> usize {
        self.axes
            .iter()
            .fold(1usize, |acc, a| acc.saturating_mul(a.samples))
    }

    pub fn axis_index(&self, name: &str) -> Result<usize> {
        self.axes
            .iter()
            .position(|a| a.name == name)
            .ok_or_else(|| HypercubeError::UnknownAxis(name.to_string()))
    }

    pub fn coordinates(&self, name: &str) -> Result<&[f64]> {
        let idx = self.axis_index(name)?;
        Ok(&self.coords[idx])
    }

    pub fn coordinates_at(&self, axis: usize) -> &[f64] {
        &self.coords[axis]
    }

    pub fn unravel(&self, flat: usize) -> Vec<usize> {
        self.strides
            .iter()
            .zip(&self.axes)
            .map(|(&stride, axis)| (flat / stride) % axis.samples)
            .collect()
    }

    pub fn ravel(&self, index: &[usize]) -> usize {
        index
            .iter()
            .zip(&self.strides)
            .map(|(&i, &stride)| i * stride)
            .sum()
    }

    /// Mesh coordinate of a cell, written into `buf` in axis order.
    pub fn point_into(&self, flat: usize, buf: &mut [f64]) {
        for (axis, slot) in buf.iter_mut().enumerate() {
            let i = (flat / self.strides[axis]) % self.axes[axis].samples;
            *slot = self.coords[axis][i];
        }
    }

    pub fn point(&self, flat: usize) -> Vec<f64> {
        let mut buf = vec![0.0; self.ndim()];
        self.point_into(flat, &mut buf);
        buf
    }

    /// Full Cartesian mesh in flattened (row-major) cell order.
    pub fn mesh(&self) -> impl Iterator<Item = Vec<f64>> + '_ {
        (0..self.cell_count()).map(|flat| self.point(flat))
    }

    /// Same axis names, order and sample counts. Bounds may differ.
    pub fn check_compatible(&self, other: &GridSpace) -> Result<()> {
        if self.ndim() != other.ndim() {
            return Err(HypercubeError::DimensionMismatch(format!(
                "expected {} axes, found {}",
                self.ndim(),
                other.ndim()
            )));
        }
        for (pos, (a, b)) in self.axes.iter().zip(other.axes()).enumerate() {
            if a.name != b.name || a.samples != b.samples {
                return Err(HypercubeError::DimensionMismatch(format!(
                    "axis {pos}: expected {}[{}], found {}[{}]",
                    a.name, a.samples, b.name, b.samples
                )));
            }
        }
        Ok(())
    }
}

pub(crate) fn row_major_strides(shape: &[usize]) -> Vec<usize> {
    let mut strides = vec![1; shape.len()];
    for i in (0..shape.len().saturating_sub(1)).rev() {
        strides[i] = strides[i + 1] * shape[i + 1];
    }
    strides
}
