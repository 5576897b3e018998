/// Default fraction of spectral coefficients retained by `build_default`.
pub const DEFAULT_COMPRESSION_RATIO: f64 = 0.05;

/// Coefficients at or above this fraction of the peak magnitude are singular.
pub const SINGULARITY_FRACTION: f64 = 0.7;

/// Betti bucket edges for eigenvalue moduli: `< LOW`, `[LOW, HIGH)`, `>= HIGH`.
pub const BETTI_LOW: f64 = 0.01;
pub const BETTI_HIGH: f64 = 0.1;

/// Central finite-difference step for gradients.
pub const GRADIENT_STEP: f64 = 1e-8;

/// Default ceiling on grid cells accepted by `build` (16M cells, 128MB of f64).
pub const DEFAULT_MAX_CELLS: usize = 1 << 24;
