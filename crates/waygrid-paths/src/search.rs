//! A* search over a [`SpatialGrid`].

use std::cmp::Ordering;
use std::sync::Arc;

use waygrid_core::{Point, Vec2};

use crate::distance::octile;
use crate::grid::{CellId, SpatialGrid};
use crate::heap::{HeapItem, PriorityHeap};
use crate::simplify::{simplify_indices, SimplifyMode};

/// Sentinel cost for cells not reached in the current search.
pub const UNREACHABLE: i32 = i32::MAX;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Outcome of one path request, as handed to request callbacks.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PathResult {
    /// World-space waypoints from start to target. Empty on failure.
    pub waypoints: Vec<Vec2>,
    pub success: bool,
}

impl PathResult {
    /// The failed result: no waypoints.
    pub fn failed() -> Self {
        Self::default()
    }
}

/// The unsimplified cell sequence of a successful search.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Route {
    /// Every cell from start to target inclusive.
    pub cells: Vec<CellId>,
    /// Final g-cost of the target: steps plus entered-cell penalties.
    pub cost: i32,
}

/// Tunables for a [`PathFinder`].
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathFinderOptions {
    pub simplify: SimplifyMode,
}

// ---------------------------------------------------------------------------
// Scratch state
// ---------------------------------------------------------------------------

/// Per-cell search bookkeeping, lazily reset by generation.
#[derive(Clone, Debug)]
struct SearchNode {
    g: i32,
    h: i32,
    parent: Option<CellId>,
    generation: u32,
    closed: bool,
}

impl Default for SearchNode {
    fn default() -> Self {
        Self {
            g: UNREACHABLE,
            h: 0,
            parent: None,
            generation: 0,
            closed: false,
        }
    }
}

/// Open-set entry: a cell with the costs it was queued with.
#[derive(Copy, Clone, Debug)]
struct OpenCell {
    cell: CellId,
    f: i32,
    h: i32,
}

impl HeapItem for OpenCell {
    #[inline]
    fn key(&self) -> usize {
        self.cell.index()
    }

    /// Lower f first; lower h breaks ties.
    #[inline]
    fn priority_cmp(&self, other: &Self) -> Ordering {
        self.f.cmp(&other.f).then(self.h.cmp(&other.h))
    }
}

impl OpenCell {
    /// Entry carrying only the key, for membership tests.
    #[inline]
    fn key_only(cell: CellId) -> Self {
        Self { cell, f: 0, h: 0 }
    }
}

// ---------------------------------------------------------------------------
// PathFinder
// ---------------------------------------------------------------------------

/// A* search engine bound to one grid.
///
/// Owns the open heap and per-cell scratch so repeated searches reuse the
/// same storage; both are reset, never reallocated, between runs.
pub struct PathFinder {
    grid: Arc<SpatialGrid>,
    options: PathFinderOptions,
    open: PriorityHeap<OpenCell>,
    nodes: Vec<SearchNode>,
    generation: u32,
}

impl PathFinder {
    pub fn new(grid: Arc<SpatialGrid>) -> Self {
        Self::with_options(grid, PathFinderOptions::default())
    }

    pub fn with_options(grid: Arc<SpatialGrid>, options: PathFinderOptions) -> Self {
        let len = grid.max_size();
        Self {
            grid,
            options,
            open: PriorityHeap::with_capacity(len),
            nodes: vec![SearchNode::default(); len],
            generation: 0,
        }
    }

    #[inline]
    pub fn grid(&self) -> &Arc<SpatialGrid> {
        &self.grid
    }

    #[inline]
    pub fn options(&self) -> PathFinderOptions {
        self.options
    }

    /// Find a path between two world positions.
    ///
    /// Both endpoints snap to their nearest cell. On success the waypoints
    /// run start → target and have straight runs removed.
    pub fn find_path(&mut self, start: Vec2, end: Vec2) -> PathResult {
        let start_cell = self.grid.node_at(start);
        let target_cell = self.grid.node_at(end);
        match self.search(start_cell, target_cell) {
            Some(route) => PathResult {
                waypoints: self.waypoints(&route),
                success: true,
            },
            None => PathResult::failed(),
        }
    }

    /// Run A* between two cells, returning the full retraced route.
    ///
    /// The search is only refused up front when *both* endpoints are
    /// blocked. A blocked target alone is never entered, so the search
    /// exhausts and fails; a blocked start alone still expands outwards.
    pub fn search(&mut self, start: CellId, target: CellId) -> Option<Route> {
        let grid = Arc::clone(&self.grid);
        if !grid.cell(start).walkable() && !grid.cell(target).walkable() {
            log::trace!("search {start:?} -> {target:?}: both endpoints blocked");
            return None;
        }

        let generation = self.begin_search();
        let target_coord = grid.cell(target).coord();
        let open = &mut self.open;
        let nodes = &mut self.nodes;

        {
            let h = octile(grid.cell(start).coord(), target_coord);
            let node = touch(nodes, start, generation);
            node.g = 0;
            node.h = h;
            node.parent = None;
            open.add(OpenCell { cell: start, f: h, h });
        }

        let mut expanded = 0usize;
        let mut found = false;
        while let Some(current) = open.remove_root() {
            let ci = current.cell;
            nodes[ci.index()].closed = true;
            expanded += 1;

            if ci == target {
                found = true;
                break;
            }

            let current_g = nodes[ci.index()].g;
            let current_cell = grid.cell(ci);
            for &ni in current_cell.neighbours() {
                let neighbour = grid.cell(ni);
                if !neighbour.walkable() {
                    continue;
                }
                let node = touch(nodes, ni, generation);
                if node.closed {
                    continue;
                }

                // Saturates: penalties are caller-supplied and may be huge.
                let tentative = current_g
                    .saturating_add(octile(current_cell.coord(), neighbour.coord()))
                    .saturating_add(neighbour.movement_penalty());
                let queued = open.contains(&OpenCell::key_only(ni));
                if tentative < node.g || !queued {
                    node.g = tentative;
                    node.h = octile(neighbour.coord(), target_coord);
                    node.parent = Some(ci);
                    let entry = OpenCell {
                        cell: ni,
                        f: node.g.saturating_add(node.h),
                        h: node.h,
                    };
                    if queued {
                        open.update_item(entry);
                    } else {
                        open.add(entry);
                    }
                }
            }
        }

        if !found {
            log::trace!("search {start:?} -> {target:?}: exhausted after {expanded} expansions");
            return None;
        }

        let route = self.retrace(start, target);
        log::trace!(
            "search {start:?} -> {target:?}: {} cells, cost {}, {expanded} expansions",
            route.cells.len(),
            route.cost
        );
        Some(route)
    }

    /// Simplified world-space waypoints of a route, start → target.
    pub fn waypoints(&self, route: &Route) -> Vec<Vec2> {
        // Simplify target → start, the order the route was retraced in.
        let reversed: Vec<CellId> = route.cells.iter().rev().copied().collect();
        let coords: Vec<Point> = reversed
            .iter()
            .map(|&id| self.grid.cell(id).coord())
            .collect();
        let mut waypoints: Vec<Vec2> = simplify_indices(&coords, self.options.simplify)
            .into_iter()
            .map(|i| self.grid.cell(reversed[i]).position())
            .collect();
        waypoints.reverse();
        waypoints
    }

    // -----------------------------------------------------------------------
    // internals
    // -----------------------------------------------------------------------

    /// Invalidate all scratch state and empty the open set.
    fn begin_search(&mut self) -> u32 {
        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            // Wrapped: generation 0 marks untouched nodes, so wipe them.
            self.nodes.fill(SearchNode::default());
            self.generation = 1;
        }
        self.open.clear();
        self.generation
    }

    fn retrace(&self, start: CellId, target: CellId) -> Route {
        let mut cells = Vec::new();
        let mut current = Some(target);
        while let Some(ci) = current {
            cells.push(ci);
            if ci == start {
                break;
            }
            current = self.nodes[ci.index()].parent;
        }
        cells.reverse();
        Route {
            cells,
            cost: self.nodes[target.index()].g,
        }
    }
}

/// Scratch node for `id`, reset first if it belongs to an older search.
#[inline]
fn touch(nodes: &mut [SearchNode], id: CellId, generation: u32) -> &mut SearchNode {
    let node = &mut nodes[id.index()];
    if node.generation != generation {
        *node = SearchNode {
            generation,
            ..SearchNode::default()
        };
    }
    node
}
