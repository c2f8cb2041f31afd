//! Error types for grid construction and the threaded path service.

use thiserror::Error;
use waygrid_core::Vec2;

/// Configuration errors raised while building a [`SpatialGrid`](crate::SpatialGrid).
///
/// Every variant is fatal: an unusable grid is never built.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("cell radius must be finite and positive, got {0}")]
    InvalidCellRadius(f64),

    #[error("world size must be finite and positive, got {width} x {height}")]
    InvalidWorldSize { width: f64, height: f64 },

    #[error("grid center must be finite, got {0}")]
    InvalidCenter(Vec2),

    #[error("world size {width} x {height} holds no cells of diameter {diameter}")]
    EmptyGrid {
        width: f64,
        height: f64,
        diameter: f64,
    },

    #[error("grid of {size_x} x {size_y} cells exceeds the limit of {max} cells")]
    TooManyCells { size_x: i32, size_y: i32, max: usize },

    #[error("terrain region with penalty {penalty} has an empty layer mask")]
    EmptyTerrainMask { penalty: i32 },

    #[error("terrain layer {0} is declared more than once")]
    DuplicateTerrainLayer(u32),
}

/// Errors from [`PathService`](crate::PathService).
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("failed to spawn path worker: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("path worker is no longer running")]
    Closed,
}

pub type Result<T> = std::result::Result<T, GridError>;
