//! Atlas construction errors

use thiserror::Error;

/// Atlas result type
pub type Result<T> = std::result::Result<T, AtlasError>;

/// Errors raised while building an atlas or a map instance.
///
/// Every variant is fatal for the core: a map is never built from partial data.
#[derive(Debug, Error)]
pub enum AtlasError {
    #[error("boundary dataset is empty")]
    EmptyBoundaries,

    #[error("temperature dataset is empty")]
    EmptyRecords,

    #[error("no entity has a numeric value at baseline year {year}")]
    NoBaseline { year: i32 },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
