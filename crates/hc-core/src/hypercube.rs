use std::collections::BTreeMap;
use std::sync::OnceLock;

use uuid::Uuid;

use crate::config::{HypercubeConfig, validate_ratio};
use crate::error::{HypercubeError, Result};
use crate::field::{self, DenseField};
use crate::grid::GridSpace;
use crate::interpolate::Interpolator;
use crate::law::Law;
use crate::spectral::SparseSpectrum;
use crate::topology::{self, TopologySummary};

/// Metadata key under which `build` records the ratio it used.
pub const RATIO_KEY: &str = "compression_ratio";

/// Per-axis derivatives in axis order.
#[derive(Clone, Debug, PartialEq)]
pub struct Gradient {
    pub components: Vec<(String, f64)>,
}

impl Gradient {
    pub fn get(&self, axis: &str) -> Option<f64> {
        self.components
            .iter()
            .find(|(name, _)| name == axis)
            .map(|(_, v)| *v)
    }

    pub fn values(&self) -> Vec<f64> {
        self.components.iter().map(|(_, v)| *v).collect()
    }
}

/// Owner of a grid, its sampled field, the compressed spectrum, the topology
/// summary and the lazily built interpolator.
///
/// Reads (`query`, `gradient`) take `&self` and may run from many threads once
/// a build or restore has completed; the interpolator is built on first use
/// behind a `OnceLock`. Every mutation takes `&mut self` and drops the cached
/// interpolator.
///
/// Memory grows as resolution^axes. The dense grid is practical for a
/// handful of axes (6 to 8 at moderate resolution); `config.max_cells` is the
/// guard checked before sampling.
#[derive(Debug)]
pub struct ParametricHypercube {
    id: Uuid,
    grid: GridSpace,
    config: HypercubeConfig,
    field: Option<DenseField>,
    spectrum: Option<SparseSpectrum>,
    topology: Option<TopologySummary>,
    metadata: BTreeMap<String, f64>,
    interpolator: OnceLock<Interpolator>,
}

impl ParametricHypercube {
    pub fn new(grid: GridSpace, config: HypercubeConfig) -> Result<Self> {
        config.validate()?;
        let metadata = config.constants.clone();
        Ok(Self {
            id: Uuid::new_v4(),
            grid,
            config,
            field: None,
            spectrum: None,
            topology: None,
            metadata,
            interpolator: OnceLock::new(),
        })
    }

    /// Rebuild an instance from persisted parts. The field is reconstructed
    /// from the spectrum; the interpolator is built on first query.
    pub fn restore(
        id: Uuid,
        grid: GridSpace,
        config: HypercubeConfig,
        spectrum: SparseSpectrum,
        topology: TopologySummary,
        metadata: BTreeMap<String, f64>,
    ) -> Result<Self> {
        config.validate()?;
        if spectrum.shape() != grid.shape().as_slice() {
            return Err(HypercubeError::DimensionMismatch(format!(
                "spectrum shape {:?} does not match grid shape {:?}",
                spectrum.shape(),
                grid.shape()
            )));
        }
        let field = spectrum.reconstruct()?;
        tracing::debug!(%id, cells = field.len(), "hypercube restored from spectrum");
        Ok(Self {
            id,
            grid,
            config,
            field: Some(field),
            spectrum: Some(spectrum),
            topology: Some(topology),
            metadata,
            interpolator: OnceLock::new(),
        })
    }

    /// Sample `law`, compress at `compression_ratio`, summarize.
    ///
    /// The live field (what `query` interpolates) is the sampled field, not
    /// the lossy reconstruction; call `reconstruct` to switch to the latter.
    pub fn build(&mut self, law: &Law, compression_ratio: f64) -> Result<TopologySummary> {
        validate_ratio(compression_ratio)?;
        let cells = self.grid.cell_count();
        if let Some(limit) = self.config.max_cells
            && cells > limit
        {
            return Err(HypercubeError::GridTooLarge { cells, limit });
        }

        let compiled = law.compile(&self.grid, &self.config.constants)?;
        let field = field::sample(&self.grid, &compiled);
        let spectrum = SparseSpectrum::compress(&field, compression_ratio)?;
        let summary = topology::summarize(&spectrum);

        tracing::info!(
            id = %self.id,
            cells,
            ratio = compression_ratio,
            retained = spectrum.nonzero_count(),
            euler = summary.euler_characteristic,
            "hypercube built"
        );

        self.field = Some(field);
        self.spectrum = Some(spectrum);
        self.topology = Some(summary.clone());
        self.metadata
            .insert(RATIO_KEY.to_string(), compression_ratio);
        self.interpolator = OnceLock::new();
        Ok(summary)
    }

    /// `build` with the ratio from the config.
    pub fn build_default(&mut self, law: &Law) -> Result<TopologySummary> {
        self.build(law, self.config.compression_ratio)
    }

    /// Recompress the current field at a new ratio. The live field is kept.
    pub fn recompress(&mut self, compression_ratio: f64) -> Result<TopologySummary> {
        let field = self.field.as_ref().ok_or(HypercubeError::InterpolatorNotReady)?;
        let spectrum = SparseSpectrum::compress(field, compression_ratio)?;
        let summary = topology::summarize(&spectrum);
        self.spectrum = Some(spectrum);
        self.topology = Some(summary.clone());
        self.metadata
            .insert(RATIO_KEY.to_string(), compression_ratio);
        Ok(summary)
    }

    /// Replace the live field with the inverse transform of the spectrum.
    pub fn reconstruct(&mut self) -> Result<&DenseField> {
        let spectrum = self
            .spectrum
            .as_ref()
            .ok_or(HypercubeError::InterpolatorNotReady)?;
        let field = spectrum.reconstruct()?;
        self.interpolator = OnceLock::new();
        Ok(self.field.insert(field))
    }

    fn interpolator(&self) -> Result<&Interpolator> {
        if let Some(interp) = self.interpolator.get() {
            return Ok(interp);
        }
        let field = self.field.as_ref().ok_or(HypercubeError::InterpolatorNotReady)?;
        let built = Interpolator::new(&self.grid, field, self.config.out_of_bounds)?;
        Ok(self.interpolator.get_or_init(|| built))
    }

    /// Resolve `(axis, value)` pairs into a point in axis order. Every axis
    /// must appear exactly once.
    fn resolve_point<K: AsRef<str>>(&self, point: &[(K, f64)]) -> Result<Vec<f64>> {
        let mut coords: Vec<Option<f64>> = vec![None; self.grid.ndim()];
        for (name, value) in point {
            let name = name.as_ref();
            let idx = self.grid.axis_index(name)?;
            if coords[idx].replace(*value).is_some() {
                return Err(HypercubeError::DimensionMismatch(format!(
                    "axis '{name}' given twice"
                )));
            }
        }
        coords
            .into_iter()
            .zip(self.grid.names())
            .map(|(c, name)| {
                c.ok_or_else(|| {
                    HypercubeError::DimensionMismatch(format!("missing coordinate for '{name}'"))
                })
            })
            .collect()
    }

    pub fn query<K: AsRef<str>>(&self, point: &[(K, f64)]) -> Result<f64> {
        let interp = self.interpolator()?;
        let coords = self.resolve_point(point)?;
        interp.evaluate(&coords)
    }

    /// Query with coordinates already in axis order.
    pub fn query_at(&self, coords: &[f64]) -> Result<f64> {
        self.interpolator()?.evaluate(coords)
    }

    /// Central finite-difference gradient with `config.gradient_step`,
    /// one-sided at a clamped bound. Noisy across stencil seams.
    pub fn gradient<K: AsRef<str>>(&self, point: &[(K, f64)]) -> Result<Gradient> {
        let interp = self.interpolator()?;
        let coords = self.resolve_point(point)?;
        let values = interp.gradient(&coords, self.config.gradient_step)?;
        Ok(Gradient {
            components: self
                .grid
                .names()
                .map(str::to_string)
                .zip(values)
                .collect(),
        })
    }

    pub fn axis_coordinates(&self, name: &str) -> Result<&[f64]> {
        self.grid.coordinates(name)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn grid(&self) -> &GridSpace {
        &self.grid
    }

    pub fn config(&self) -> &HypercubeConfig {
        &self.config
    }

    pub fn field(&self) -> Option<&DenseField> {
        self.field.as_ref()
    }

    pub fn spectrum(&self) -> Option<&SparseSpectrum> {
        self.spectrum.as_ref()
    }

    pub fn topology(&self) -> Option<&TopologySummary> {
        self.topology.as_ref()
    }

    pub fn metadata(&self) -> &BTreeMap<String, f64> {
        &self.metadata
    }

    pub fn set_metadata(&mut self, key: &str, value: f64) {
        self.metadata.insert(key.to_string(), value);
    }

    pub fn is_ready(&self) -> bool {
        self.field.is_some()
    }
}
