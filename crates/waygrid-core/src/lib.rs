//! **waygrid-core** — geometry primitives shared by the *waygrid* crates.
//!
//! Integer grid coordinates ([`Point`], [`Range`]) address cells of a
//! discretised region; [`Vec2`] carries continuous world-space positions.

pub mod geom;

pub use geom::{Point, Range, RangeIter, Vec2};
