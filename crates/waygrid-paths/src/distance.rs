use waygrid_core::Point;

/// Cost of one orthogonal step.
pub const STRAIGHT_COST: i32 = 10;
/// Cost of one diagonal step (≈ √2 × [`STRAIGHT_COST`]).
pub const DIAGONAL_COST: i32 = 14;

/// Octile distance between two grid coordinates, in integer cost units.
///
/// Used both as the step cost between neighbours and as the A* heuristic.
#[inline]
pub fn octile(a: Point, b: Point) -> i32 {
    let dx = (a.x - b.x).abs();
    let dy = (a.y - b.y).abs();
    let (lo, hi) = if dx < dy { (dx, dy) } else { (dy, dx) };
    DIAGONAL_COST * lo + STRAIGHT_COST * (hi - lo)
}
