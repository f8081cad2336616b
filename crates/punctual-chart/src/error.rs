//! Chart error types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ChartError {
    #[error("Invalid viewport: {width}x{height}")]
    InvalidViewport { width: f64, height: f64 },
}

pub type ChartResult<T> = Result<T, ChartError>;
