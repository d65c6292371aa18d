//! Convex approximation of a landing-site terrain profile.
//!
//! The terrain is split at its flat landing site and each side is reduced to
//! an upper convex envelope anchored at that site.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod chain;
pub mod landing;
pub mod landscape;
pub mod point;
pub mod summary;
pub mod terrain_io;

pub use chain::{build_convex_chain, build_convex_chain_with, Direction};
pub use landing::{find_landing_site_left_index, highest_point_index};
pub use landscape::{split_and_convexify, split_and_convexify_with, ConvexLandscape};
pub use point::{Point, Terrain};
pub use summary::LandscapeSummary;
pub use terrain_io::{
    format_number, format_points_crlf, parse_terrain, parse_terrain_json, sample_terrain,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LandscapeError {
    #[error("x must be strictly increasing: point {index} has x={x} after x={previous_x}")]
    NonIncreasingX { index: usize, previous_x: f64, x: f64 },
    #[error("point {index} has a non-finite coordinate")]
    NonFiniteCoordinate { index: usize },
    #[error("failed to parse terrain at line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("terrain declared {expected} points but {found} were supplied")]
    PointCountMismatch { expected: usize, found: usize },
    #[error("point index {index} out of range for terrain of {len} points")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Tunables shared by the chain builder and terrain construction.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Params {
    /// x of the synthetic anchor inserted when the left chain resets at a peak.
    pub left_boundary_x: f64,
    /// Reject terrain whose x is not strictly increasing or not finite.
    pub validate: bool,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            left_boundary_x: 0.0,
            validate: true,
        }
    }
}

impl Params {
    pub fn check(&self) -> Result<(), LandscapeError> {
        if !self.left_boundary_x.is_finite() {
            return Err(LandscapeError::InvalidParameter(format!(
                "left_boundary_x must be finite, got {}",
                self.left_boundary_x
            )));
        }
        Ok(())
    }

    /// Load params from a JSON document. Missing fields keep their defaults.
    pub fn from_json(text: &str) -> Result<Self, LandscapeError> {
        let params: Params = serde_json::from_str(text)
            .map_err(|err| LandscapeError::InvalidParameter(err.to_string()))?;
        params.check()?;
        Ok(params)
    }
}
