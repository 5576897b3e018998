use std::fmt;

use hc_core::HypercubeError;

#[derive(Debug)]
pub enum StoreError {
    /// Rejected by the engine: shape checks, invalid axes, dimension mismatch.
    Core(HypercubeError),
    Io(std::io::Error),
    /// Header missing, or a format tag this build does not read.
    UnsupportedFormat(String),
    /// The body failed to decompress, parse, or validate.
    CorruptContainer(String),
    /// The instance cannot be written as asked.
    InvalidData(String),
    Config(String),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Core(e) => write!(f, "{e}"),
            StoreError::Io(e) => write!(f, "I/O error: {e}"),
            StoreError::UnsupportedFormat(msg) => write!(f, "unsupported format: {msg}"),
            StoreError::CorruptContainer(msg) => write!(f, "corrupt container: {msg}"),
            StoreError::InvalidData(msg) => write!(f, "invalid data: {msg}"),
            StoreError::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StoreError::Core(e) => Some(e),
            StoreError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<HypercubeError> for StoreError {
    fn from(e: HypercubeError) -> Self {
        StoreError::Core(e)
    }
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
