//! Split a terrain at its landing site and convexify both sides.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::chain::{build_convex_chain_with, Direction};
use crate::landing::find_landing_site_left_index;
use crate::point::{Point, Terrain};
use crate::Params;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ConvexLandscape {
    /// Left chain followed by right chain.
    pub convex_landscape: Vec<Point>,
    /// Index in `convex_landscape` where the right chain begins.
    pub landing_site_left_index: usize,
}

impl ConvexLandscape {
    /// Points before the split. Empty when the split index is out of range.
    pub fn left(&self) -> &[Point] {
        self.convex_landscape
            .get(..self.landing_site_left_index)
            .unwrap_or(&[])
    }

    pub fn right(&self) -> &[Point] {
        self.convex_landscape
            .get(self.landing_site_left_index..)
            .unwrap_or(&[])
    }

    /// True when the points either side of the split share an altitude.
    ///
    /// This holds whenever the terrain has a flat pair, but not for the
    /// index-0 fallback or when a side is empty.
    pub fn flat_pair_preserved(&self) -> bool {
        let index = self.landing_site_left_index;
        match (
            index.checked_sub(1).and_then(|i| self.convex_landscape.get(i)),
            self.convex_landscape.get(index),
        ) {
            (Some(left), Some(right)) => left.y == right.y,
            _ => false,
        }
    }
}

pub fn split_and_convexify(terrain: &Terrain) -> ConvexLandscape {
    split_and_convexify_with(terrain, &Params::default())
}

pub fn split_and_convexify_with(terrain: &Terrain, params: &Params) -> ConvexLandscape {
    let points = terrain.points();
    let split_index = find_landing_site_left_index(points);

    let left = points.get(..=split_index).unwrap_or(&[]);
    let right = points.get(split_index + 1..).unwrap_or(&[]);

    let mut convex_landscape = build_convex_chain_with(left, Direction::Down, params);
    let landing_site_left_index = convex_landscape.len();
    convex_landscape.extend(build_convex_chain_with(right, Direction::Up, params));

    debug!(
        split_index,
        left = landing_site_left_index,
        right = convex_landscape.len() - landing_site_left_index,
        "convex landscape built"
    );

    ConvexLandscape {
        convex_landscape,
        landing_site_left_index,
    }
}
