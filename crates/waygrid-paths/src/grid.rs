//! The [`SpatialGrid`]: a fixed lattice of [`Cell`]s covering a world
//! rectangle, built once from an obstacle oracle.

use waygrid_core::{Point, Range, Vec2};

use crate::config::{GridConfig, LayerMask};
use crate::error::Result;
use crate::oracle::TerrainOracle;

/// Index of a cell inside its [`SpatialGrid`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(usize);

impl CellId {
    /// Position of the cell in [`SpatialGrid::cells`].
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// One discretised unit of the walkable region.
#[derive(Clone, Debug)]
pub struct Cell {
    walkable: bool,
    position: Vec2,
    coord: Point,
    movement_penalty: i32,
    neighbours: Vec<CellId>,
}

impl Cell {
    #[inline]
    pub fn walkable(&self) -> bool {
        self.walkable
    }

    /// World-space centre.
    #[inline]
    pub fn position(&self) -> Vec2 {
        self.position
    }

    /// Integer grid coordinate.
    #[inline]
    pub fn coord(&self) -> Point {
        self.coord
    }

    /// Additive cost of entering this cell.
    #[inline]
    pub fn movement_penalty(&self) -> i32 {
        self.movement_penalty
    }

    /// The up-to-8 in-bounds cells around this one.
    #[inline]
    pub fn neighbours(&self) -> &[CellId] {
        &self.neighbours
    }
}

/// Immutable lattice of cells. Safe to share between searches and threads.
#[derive(Clone, Debug)]
pub struct SpatialGrid {
    cells: Vec<Cell>,
    range: Range,
    world_size: Vec2,
    center: Vec2,
    radius: f64,
    walkable_count: usize,
}

impl SpatialGrid {
    /// Build the grid described by `config`, asking `oracle` once per cell
    /// for occupancy and once per walkable cell for its terrain.
    pub fn build<O>(config: &GridConfig, oracle: &O) -> Result<Self>
    where
        O: TerrainOracle + ?Sized,
    {
        let size = config.grid_size()?;
        let (walkable_mask, penalties) = config.penalty_table()?;
        let range = Range::new(0, 0, size.x, size.y);
        let radius = config.cell_radius;
        let diameter = config.diameter();
        let origin = config.center - config.world_size / 2.0;

        let mut cells = Vec::with_capacity(range.len());
        let mut walkable_count = 0;
        for coord in range {
            let position = origin
                + Vec2::new(
                    f64::from(coord.x) * diameter + radius,
                    f64::from(coord.y) * diameter + radius,
                );
            let walkable = !oracle.is_obstructed(position, radius);
            let movement_penalty = if walkable {
                walkable_count += 1;
                terrain_penalty(
                    oracle,
                    position,
                    radius,
                    walkable_mask,
                    &penalties,
                    config.default_penalty,
                )
            } else {
                config.default_penalty
            };
            cells.push(Cell {
                walkable,
                position,
                coord,
                movement_penalty,
                neighbours: Vec::new(),
            });
        }

        let mut grid = Self {
            cells,
            range,
            world_size: config.world_size,
            center: config.center,
            radius,
            walkable_count,
        };
        for i in 0..grid.cells.len() {
            let coord = grid.cells[i].coord;
            let neighbours: Vec<CellId> = coord
                .neighbors_8()
                .into_iter()
                .filter_map(|p| grid.id_at(p))
                .collect();
            grid.cells[i].neighbours = neighbours;
        }

        log::debug!(
            "built {}x{} grid: {} of {} cells walkable",
            size.x,
            size.y,
            walkable_count,
            grid.cells.len()
        );
        Ok(grid)
    }

    // -----------------------------------------------------------------------
    // Lookup
    // -----------------------------------------------------------------------

    /// The cell nearest to a world position.
    ///
    /// Points outside the world rectangle are clamped onto the nearest edge
    /// cell; this never fails.
    pub fn node_at(&self, world: Vec2) -> CellId {
        let rel = world - self.center;
        let percent_x = (rel.x / self.world_size.x + 0.5).clamp(0.0, 1.0);
        let percent_y = (rel.y / self.world_size.y + 0.5).clamp(0.0, 1.0);
        let x = (f64::from(self.range.width() - 1) * percent_x).round_ties_even() as i32;
        let y = (f64::from(self.range.height() - 1) * percent_y).round_ties_even() as i32;
        let coord = self
            .range
            .clamp(Point::new(x, y))
            .unwrap_or(Point::ZERO);
        CellId(self.flat(coord))
    }

    /// The cell with grid coordinate `p`, if in bounds.
    #[inline]
    pub fn id_at(&self, p: Point) -> Option<CellId> {
        self.range.contains(p).then(|| CellId(self.flat(p)))
    }

    #[inline]
    pub fn cell_at(&self, p: Point) -> Option<&Cell> {
        self.id_at(p).map(|id| self.cell(id))
    }

    /// The cell behind `id`.
    ///
    /// # Panics
    ///
    /// If `id` came from a different, smaller grid.
    #[inline]
    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id.0]
    }

    // -----------------------------------------------------------------------
    // Inspection
    // -----------------------------------------------------------------------

    /// Every cell, row by row from the bottom-left corner.
    pub fn cells(&self) -> impl ExactSizeIterator<Item = (CellId, &Cell)> + '_ {
        self.cells.iter().enumerate().map(|(i, c)| (CellId(i), c))
    }

    /// Number of cells along each axis.
    #[inline]
    pub fn size(&self) -> Point {
        self.range.size()
    }

    /// Total number of cells; the most a single search can ever queue.
    #[inline]
    pub fn max_size(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    pub fn walkable_count(&self) -> usize {
        self.walkable_count
    }

    #[inline]
    pub fn world_size(&self) -> Vec2 {
        self.world_size
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        self.center
    }

    /// Side length of one cell.
    #[inline]
    pub fn diameter(&self) -> f64 {
        self.radius * 2.0
    }

    #[inline]
    fn flat(&self, p: Point) -> usize {
        (p.y as usize) * (self.range.width() as usize) + (p.x as usize)
    }
}

fn terrain_penalty<O>(
    oracle: &O,
    position: Vec2,
    radius: f64,
    mask: LayerMask,
    penalties: &std::collections::HashMap<u32, i32>,
    default_penalty: i32,
) -> i32
where
    O: TerrainOracle + ?Sized,
{
    if mask.is_empty() {
        return default_penalty;
    }
    match oracle.dominant_terrain(position, radius, mask) {
        None => default_penalty,
        Some(layer) => match penalties.get(&layer) {
            Some(&penalty) => penalty,
            None => {
                log::warn!("terrain layer {layer} at {position} has no penalty; using default");
                default_penalty
            }
        },
    }
}
