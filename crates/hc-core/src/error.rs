use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum HypercubeError {
    /// Axis name is not part of the grid.
    UnknownAxis(String),
    /// A law references a name that is neither an axis nor a known constant.
    UnboundVariable(String),
    /// The law compiler rejected the expression at `symbol`.
    LawCompilation { symbol: String, reason: String },
    /// Query issued before any successful build or restore.
    InterpolatorNotReady,
    /// Axis count or order disagrees between two descriptions of the grid.
    DimensionMismatch(String),
    InvalidAxis(String),
    InvalidParameter(String),
    GridTooLarge { cells: usize, limit: usize },
}

impl fmt::Display for HypercubeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HypercubeError::UnknownAxis(name) => write!(f, "unknown axis: {name}"),
            HypercubeError::UnboundVariable(name) => {
                write!(f, "law references unbound variable: {name}")
            }
            HypercubeError::LawCompilation { symbol, reason } => {
                write!(f, "law compilation failed at '{symbol}': {reason}")
            }
            HypercubeError::InterpolatorNotReady => {
                write!(f, "interpolator not ready: build or load a field first")
            }
            HypercubeError::DimensionMismatch(msg) => write!(f, "dimension mismatch: {msg}"),
            HypercubeError::InvalidAxis(msg) => write!(f, "invalid axis: {msg}"),
            HypercubeError::InvalidParameter(msg) => write!(f, "invalid parameter: {msg}"),
            HypercubeError::GridTooLarge { cells, limit } => {
                write!(f, "grid has {cells} cells, limit is {limit}")
            }
        }
    }
}

impl std::error::Error for HypercubeError {}

pub type Result<T> = std::result::Result<T, HypercubeError>;
