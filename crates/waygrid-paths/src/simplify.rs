//! Waypoint reduction: drop cells in the middle of straight runs.

use waygrid_core::Point;

/// How the incoming direction at an interior cell is computed.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SimplifyMode {
    /// Incoming and outgoing directions are both `next - current`.
    /// Straight runs in any of the eight directions collapse.
    #[default]
    Symmetric,
    /// Legacy comparison whose incoming direction flips the Y axis
    /// (`(cur.x - prev.x, prev.y - cur.y)`). Only horizontal runs collapse;
    /// vertical and diagonal runs keep every cell.
    Literal,
}

impl SimplifyMode {
    #[inline]
    fn incoming(self, prev: Point, cur: Point) -> Point {
        match self {
            Self::Symmetric => (cur - prev).signum(),
            Self::Literal => Point::new(cur.x - prev.x, prev.y - cur.y).signum(),
        }
    }
}

/// Indices of the cells of `path` that survive simplification.
///
/// The first and last cells are always kept; an interior cell is kept only
/// when the direction changes there.
pub fn simplify_indices(path: &[Point], mode: SimplifyMode) -> Vec<usize> {
    let Some(last) = path.len().checked_sub(1) else {
        return Vec::new();
    };
    let mut keep = vec![0];
    for i in 1..last {
        let outgoing = (path[i + 1] - path[i]).signum();
        if outgoing != mode.incoming(path[i - 1], path[i]) {
            keep.push(i);
        }
    }
    if last > 0 {
        keep.push(last);
    }
    keep
}

/// The cells of `path` that survive simplification, in order.
pub fn simplify_path(path: &[Point], mode: SimplifyMode) -> Vec<Point> {
    simplify_indices(path, mode)
        .into_iter()
        .map(|i| path[i])
        .collect()
}
