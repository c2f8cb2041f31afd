//! Grid pathfinding with single-flight request scheduling.
//!
//! This crate discretises a rectangular world into a [`SpatialGrid`] of
//! cells, finds shortest walkable paths between world points with A*
//! ([`PathFinder`]), and serialises concurrent requests so that exactly one
//! search runs at a time:
//!
//! - [`RequestScheduler`] — cooperative FIFO queue driven by the host's tick
//! - [`PathService`] — one worker thread fed by a channel, for threaded hosts
//!
//! The open set is a [`PriorityHeap`], a fixed-capacity binary heap with
//! decrease-key and O(1) membership tests, ordered by `(f, h)`.
//!
//! # Oracles
//!
//! | Trait | Asked for |
//! |---|---|
//! | [`ObstacleOracle`] | whether a cell is blocked |
//! | [`TerrainOracle`] : [`ObstacleOracle`] | the terrain layer under a walkable cell |
//!
//! Both are consulted only while a grid is built; the grid never changes
//! afterwards.

mod config;
mod distance;
mod error;
mod grid;
mod heap;
mod oracle;
mod scheduler;
mod search;
mod service;
mod simplify;

pub use config::{GridConfig, LayerMask, MAX_CELLS, TerrainRegion};
pub use distance::{octile, DIAGONAL_COST, STRAIGHT_COST};
pub use error::{GridError, Result, ServiceError};
pub use grid::{Cell, CellId, SpatialGrid};
pub use heap::{HeapItem, PriorityHeap};
pub use oracle::{ObstacleOracle, TerrainOracle};
pub use scheduler::{Delivery, PathCallback, PathRequest, RequestScheduler, SchedulerHandle};
pub use search::{PathFinder, PathFinderOptions, PathResult, Route, UNREACHABLE};
pub use service::{PathRequester, PathService, SendPathCallback};
pub use simplify::{simplify_indices, simplify_path, SimplifyMode};
