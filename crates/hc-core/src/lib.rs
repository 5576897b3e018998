//! Parametric field hypercube engine.
//!
//! Samples a scalar law of several bounded parameters onto a dense
//! rectilinear grid, compresses it with a separable orthonormal DCT,
//! fingerprints the sparse spectrum, and answers off-grid queries and
//! gradients through a separable cubic interpolant.
//!
//! Zero I/O. Persistence lives in `hc-store`.

pub mod config;
pub mod constants;
pub mod error;
pub mod field;
pub mod grid;
pub mod hypercube;
pub mod interpolate;
pub mod law;
pub mod spectral;
pub mod topology;

pub use config::{HypercubeConfig, OutOfBoundsPolicy};
pub use constants::{
    BETTI_HIGH, BETTI_LOW, DEFAULT_COMPRESSION_RATIO, DEFAULT_MAX_CELLS, GRADIENT_STEP,
    SINGULARITY_FRACTION,
};
pub use error::{HypercubeError, Result};
pub use field::{DenseField, sample};
pub use grid::{Axis, GridSpace};
pub use hypercube::{Gradient, ParametricHypercube, RATIO_KEY};
pub use interpolate::Interpolator;
pub use law::{CompiledLaw, Law};
pub use spectral::SparseSpectrum;
pub use topology::{TopologySummary, summarize};
