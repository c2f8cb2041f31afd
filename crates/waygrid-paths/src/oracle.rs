use waygrid_core::Vec2;

use crate::config::LayerMask;

/// Occupancy query used once per cell while a grid is built.
pub trait ObstacleOracle {
    /// Whether a disc of `radius` around `center` overlaps an obstacle.
    fn is_obstructed(&self, center: Vec2, radius: f64) -> bool;
}

/// Oracle that can also classify the terrain under a walkable cell.
pub trait TerrainOracle: ObstacleOracle {
    /// The dominant terrain layer under the disc, considering only layers in
    /// `mask`. `None` when no terrain on those layers is hit.
    fn dominant_terrain(&self, center: Vec2, radius: f64, mask: LayerMask) -> Option<u32> {
        let _ = (center, radius, mask);
        None
    }
}

/// Any `Fn(center, radius) -> bool` is an obstacle oracle with no terrain.
impl<F> ObstacleOracle for F
where
    F: Fn(Vec2, f64) -> bool,
{
    fn is_obstructed(&self, center: Vec2, radius: f64) -> bool {
        self(center, radius)
    }
}

impl<F> TerrainOracle for F where F: Fn(Vec2, f64) -> bool {}
