//! Error types for the cache
//!
//! Cache data operations never fail; absence is reported through `Option`.
//! Errors only surface from configuration loading and from starting the
//! background sweeper.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache crate.
#[derive(Error, Debug)]
pub enum CacheError {
    /// An environment variable held a value that could not be parsed
    #[error("Invalid value {value:?} for {var}")]
    InvalidConfig { var: &'static str, value: String },

    /// The fallback runtime or its thread could not be created
    #[error("Runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

// == Result Type Alias ==
/// Convenience Result type for the cache crate.
pub type Result<T> = std::result::Result<T, CacheError>;
