use serde::{Deserialize, Serialize};

use crate::landing::{find_landing_site_left_index, highest_point_index};
use crate::landscape::ConvexLandscape;
use crate::point::{Point, Terrain};

/// Diagnostic overview of one terrain and its convex landscape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LandscapeSummary {
    pub terrain_points: usize,
    pub x_range: Option<(f64, f64)>,
    pub landing_site_index: usize,
    /// `None` when the terrain has no flat pair and the split fell back to index 0.
    pub landing_site: Option<(Point, Point)>,
    pub highest_point: Option<Point>,
    pub left_chain_points: usize,
    pub right_chain_points: usize,
    pub flat_pair_preserved: bool,
}

impl LandscapeSummary {
    pub fn from_landscape(terrain: &Terrain, landscape: &ConvexLandscape) -> Self {
        let points = terrain.points();
        let landing_site_index = find_landing_site_left_index(points);
        let landing_site = match (points.get(landing_site_index), points.get(landing_site_index + 1)) {
            (Some(left), Some(right)) if left.y == right.y => Some((*left, *right)),
            _ => None,
        };
        Self {
            terrain_points: points.len(),
            x_range: terrain.x_range(),
            landing_site_index,
            landing_site,
            highest_point: highest_point_index(points).map(|i| points[i]),
            left_chain_points: landscape.left().len(),
            right_chain_points: landscape.right().len(),
            flat_pair_preserved: landscape.flat_pair_preserved(),
        }
    }
}
