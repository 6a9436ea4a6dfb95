//! Error types for the engine.

use thiserror::Error;

/// Engine-wide error type.
#[derive(Error, Debug)]
pub enum Error {
    /// A rectangle with a non-positive extent was used where a drawable area is required
    #[error("Invalid rect: pos ({x}, {y}), half size ({w}, {h})")]
    InvalidRect { x: f32, y: f32, w: f32, h: f32 },

    /// A fixed-size pool has no free slot left
    #[error("Capacity exceeded: {what} (max {max})")]
    CapacityExceeded { what: &'static str, max: usize },

    /// GPU error
    #[error("GPU error: {0}")]
    Gpu(String),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
