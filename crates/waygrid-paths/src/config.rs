//! Grid configuration: world extent, cell size and terrain penalties.

use std::collections::HashMap;
use std::ops::BitOr;

use waygrid_core::{Point, Vec2};

use crate::error::{GridError, Result};

// ---------------------------------------------------------------------------
// LayerMask
// ---------------------------------------------------------------------------

/// Bitmask of terrain layers. Bit `n` set means layer `n` is included.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LayerMask(pub u32);

impl LayerMask {
    /// The mask with no layers.
    pub const EMPTY: Self = Self(0);

    /// Mask holding the single layer `layer`.
    #[inline]
    pub const fn layer(layer: u32) -> Self {
        Self(1 << layer)
    }

    /// The layer id a region mask stands for: its highest set bit.
    #[inline]
    pub const fn layer_id(self) -> Option<u32> {
        if self.0 == 0 {
            None
        } else {
            Some(31 - self.0.leading_zeros())
        }
    }

    /// Whether `layer` is part of the mask.
    #[inline]
    pub const fn contains(self, layer: u32) -> bool {
        layer < 32 && self.0 & (1 << layer) != 0
    }

    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for LayerMask {
    type Output = Self;
    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

// ---------------------------------------------------------------------------
// TerrainRegion
// ---------------------------------------------------------------------------

/// A walkable terrain category and the extra cost of crossing it.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TerrainRegion {
    pub mask: LayerMask,
    pub penalty: i32,
}

impl TerrainRegion {
    pub const fn new(mask: LayerMask, penalty: i32) -> Self {
        Self { mask, penalty }
    }
}

// ---------------------------------------------------------------------------
// GridConfig
// ---------------------------------------------------------------------------

/// Largest grid [`GridConfig::grid_size`] accepts, in cells.
pub const MAX_CELLS: usize = 1 << 26;

/// Everything needed to build a [`SpatialGrid`](crate::SpatialGrid).
///
/// The grid covers a `world_size` rectangle centred on `center`, split into
/// square cells of side `2 * cell_radius`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridConfig {
    pub world_size: Vec2,
    #[cfg_attr(feature = "serde", serde(default))]
    pub center: Vec2,
    pub cell_radius: f64,
    #[cfg_attr(feature = "serde", serde(default))]
    pub default_penalty: i32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub terrain_regions: Vec<TerrainRegion>,
}

impl GridConfig {
    /// A grid centred on the origin with no terrain penalties.
    pub fn new(world_size: Vec2, cell_radius: f64) -> Self {
        Self {
            world_size,
            center: Vec2::ZERO,
            cell_radius,
            default_penalty: 0,
            terrain_regions: Vec::new(),
        }
    }

    pub fn with_center(mut self, center: Vec2) -> Self {
        self.center = center;
        self
    }

    pub fn with_default_penalty(mut self, penalty: i32) -> Self {
        self.default_penalty = penalty;
        self
    }

    pub fn with_region(mut self, mask: LayerMask, penalty: i32) -> Self {
        self.terrain_regions.push(TerrainRegion::new(mask, penalty));
        self
    }

    /// Side length of one cell.
    #[inline]
    pub fn diameter(&self) -> f64 {
        self.cell_radius * 2.0
    }

    /// Check every field without building anything.
    pub fn validate(&self) -> Result<()> {
        self.grid_size()?;
        self.penalty_table()?;
        Ok(())
    }

    /// Number of cells along each axis.
    pub fn grid_size(&self) -> Result<Point> {
        if !self.cell_radius.is_finite() || self.cell_radius <= 0.0 {
            return Err(GridError::InvalidCellRadius(self.cell_radius));
        }
        let Vec2 {
            x: width,
            y: height,
        } = self.world_size;
        if !self.world_size.is_finite() || width <= 0.0 || height <= 0.0 {
            return Err(GridError::InvalidWorldSize { width, height });
        }
        if !self.center.is_finite() {
            return Err(GridError::InvalidCenter(self.center));
        }
        let diameter = self.diameter();
        // Float-to-int casts saturate, so absurd ratios stay in range.
        let size_x = (width / diameter).round_ties_even() as i32;
        let size_y = (height / diameter).round_ties_even() as i32;
        if size_x < 1 || size_y < 1 {
            return Err(GridError::EmptyGrid {
                width,
                height,
                diameter,
            });
        }
        let cells = (size_x as usize).checked_mul(size_y as usize);
        if cells.is_none_or(|n| n > MAX_CELLS) {
            return Err(GridError::TooManyCells {
                size_x,
                size_y,
                max: MAX_CELLS,
            });
        }
        Ok(Point::new(size_x, size_y))
    }

    /// The union of every region's mask, and the penalty of each layer id.
    pub fn penalty_table(&self) -> Result<(LayerMask, HashMap<u32, i32>)> {
        let mut walkable = LayerMask::EMPTY;
        let mut table = HashMap::with_capacity(self.terrain_regions.len());
        for region in &self.terrain_regions {
            let Some(layer) = region.mask.layer_id() else {
                return Err(GridError::EmptyTerrainMask {
                    penalty: region.penalty,
                });
            };
            if table.insert(layer, region.penalty).is_some() {
                return Err(GridError::DuplicateTerrainLayer(layer));
            }
            walkable = walkable | region.mask;
        }
        Ok((walkable, table))
    }
}
