//! Landing-site lookup and altitude helpers.

use tracing::debug;

use crate::point::Point;

/// Index of the left point of the first flat pair (`points[i].y == points[i + 1].y`).
///
/// Falls back to 0 when the terrain has no flat pair.
pub fn find_landing_site_left_index(points: &[Point]) -> usize {
    for (index, pair) in points.windows(2).enumerate() {
        if pair[0].y == pair[1].y {
            return index;
        }
    }
    debug!(
        points = points.len(),
        "no flat landing pair found; splitting at index 0"
    );
    0
}

/// Index of the highest point. Ties keep the earliest index.
pub fn highest_point_index(points: &[Point]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, point) in points.iter().enumerate() {
        match best {
            Some((_, altitude)) if point.y <= altitude => {}
            _ => best = Some((index, point.y)),
        }
    }
    best.map(|(index, _)| index)
}
