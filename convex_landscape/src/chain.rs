//! Directional upper convex chains.
//!
//! `Down` chains cover the terrain left of the landing site and restart at
//! every new peak with a flat anchor on the left boundary. `Up` chains cover
//! the terrain right of the site, keep only rising points and are extended
//! flat to the last input x.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::point::Point;
use crate::Params;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Down,
    Up,
}

/// Build the upper convex chain of `points` with default params.
pub fn build_convex_chain(points: &[Point], direction: Direction) -> Vec<Point> {
    build_convex_chain_with(points, direction, &Params::default())
}

/// Build the upper convex chain of `points`.
///
/// `points` must have strictly increasing x. Empty input yields an empty chain.
pub fn build_convex_chain_with(
    points: &[Point],
    direction: Direction,
    params: &Params,
) -> Vec<Point> {
    let Some((&first, rest)) = points.split_first() else {
        return Vec::new();
    };

    let mut max_altitude_point = first;
    let mut chain = Vec::with_capacity(points.len() + 1);
    chain.push(first);

    for &point in rest {
        // Update first, then compare: equality means `point` is the running peak.
        if point.y >= max_altitude_point.y {
            max_altitude_point = point;
        }
        if direction == Direction::Down && point.y == max_altitude_point.y {
            trace!(x = point.x, y = point.y, "chain reset at new peak");
            chain.clear();
            chain.push(Point::new(params.left_boundary_x, max_altitude_point.y));
            chain.push(max_altitude_point);
            continue;
        }

        prune_concave_tail(&mut chain, &point);

        let keep = match direction {
            Direction::Down => true,
            Direction::Up => chain.last().is_none_or(|tip| point.y > tip.y),
        };
        if keep {
            chain.push(point);
        }
    }

    if direction == Direction::Up {
        extend_to_boundary(&mut chain, points);
    }

    chain
}

/// Pop the chain tip while it would form a concavity with `next`.
fn prune_concave_tail(chain: &mut Vec<Point>, next: &Point) {
    while chain.len() > 1 {
        let last = chain[chain.len() - 1];
        let before_last = chain[chain.len() - 2];
        let previous_slope = before_last.slope_to(&last);
        let current_slope = last.slope_to(next);
        if current_slope <= previous_slope {
            break;
        }
        chain.pop();
    }
}

fn extend_to_boundary(chain: &mut Vec<Point>, points: &[Point]) {
    let (Some(&tip), Some(boundary)) = (chain.last(), points.last()) else {
        return;
    };
    if tip.x < boundary.x {
        chain.push(Point::new(boundary.x, tip.y));
    }
}
