//! Terrain points and the validated terrain sequence.

use serde::{Deserialize, Serialize};

use crate::{LandscapeError, Params};

/// A terrain vertex: `x` is horizontal distance, `y` is altitude.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Rise over run from `self` to `right`.
    pub fn slope_to(&self, right: &Point) -> f64 {
        (right.y - self.y) / (right.x - self.x)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Ordered terrain profile with strictly increasing x.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Terrain {
    points: Vec<Point>,
}

impl Terrain {
    /// Build a terrain, rejecting non-finite coordinates and x that does not increase.
    pub fn new(points: Vec<Point>) -> Result<Self, LandscapeError> {
        validate(&points)?;
        Ok(Self { points })
    }

    /// Build a terrain without ordering checks. Callers own the precondition.
    pub fn new_unchecked(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Build a terrain, validating only when `params.validate` is set.
    pub fn with_params(points: Vec<Point>, params: &Params) -> Result<Self, LandscapeError> {
        if params.validate {
            Terrain::new(points)
        } else {
            Ok(Terrain::new_unchecked(points))
        }
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn into_points(self) -> Vec<Point> {
        self.points
    }

    /// Horizontal extent as `(first.x, last.x)`.
    pub fn x_range(&self) -> Option<(f64, f64)> {
        Some((self.points.first()?.x, self.points.last()?.x))
    }

    /// Return a new terrain with the point at `index` replaced.
    ///
    /// The source terrain is left untouched; the result is revalidated when
    /// `params.validate` is set.
    pub fn with_point_replaced(
        &self,
        index: usize,
        point: Point,
        params: &Params,
    ) -> Result<Self, LandscapeError> {
        if index >= self.points.len() {
            return Err(LandscapeError::IndexOutOfRange {
                index,
                len: self.points.len(),
            });
        }
        let mut points = self.points.clone();
        points[index] = point;
        Terrain::with_params(points, params)
    }
}

impl AsRef<[Point]> for Terrain {
    fn as_ref(&self) -> &[Point] {
        &self.points
    }
}

fn validate(points: &[Point]) -> Result<(), LandscapeError> {
    let mut previous: Option<&Point> = None;
    for (index, point) in points.iter().enumerate() {
        if !point.x.is_finite() || !point.y.is_finite() {
            return Err(LandscapeError::NonFiniteCoordinate { index });
        }
        if let Some(prev) = previous {
            if point.x <= prev.x {
                return Err(LandscapeError::NonIncreasingX {
                    index,
                    previous_x: prev.x,
                    x: point.x,
                });
            }
        }
        previous = Some(point);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slope() {
        let a = Point::new(0.0, 100.0);
        let b = Point::new(1000.0, 500.0);
        assert!((a.slope_to(&b) - 0.4).abs() < 1e-12);
        assert!((b.slope_to(&a) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_terrain_accepts_degenerate_lengths() {
        assert!(Terrain::new(vec![]).unwrap().is_empty());
        assert_eq!(Terrain::new(vec![Point::new(0.0, 1.0)]).unwrap().len(), 1);
    }

    #[test]
    fn test_terrain_rejects_repeated_x() {
        let err = Terrain::new(vec![
            Point::new(0.0, 1.0),
            Point::new(10.0, 2.0),
            Point::new(10.0, 3.0),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            LandscapeError::NonIncreasingX {
                index: 2,
                previous_x: 10.0,
                x: 10.0
            }
        );
    }

    #[test]
    fn test_terrain_rejects_nan() {
        let err = Terrain::new(vec![Point::new(0.0, 1.0), Point::new(5.0, f64::NAN)]).unwrap_err();
        assert_eq!(err, LandscapeError::NonFiniteCoordinate { index: 1 });
    }

    #[test]
    fn test_point_replacement_is_non_mutating() {
        let terrain = Terrain::new(vec![
            Point::new(0.0, 100.0),
            Point::new(500.0, 300.0),
            Point::new(1000.0, 300.0),
        ])
        .unwrap();
        let edited = terrain
            .with_point_replaced(1, Point::new(400.0, 900.0), &Params::default())
            .unwrap();
        assert_eq!(terrain.points()[1], Point::new(500.0, 300.0));
        assert_eq!(edited.points()[1], Point::new(400.0, 900.0));
    }

    #[test]
    fn test_point_replacement_revalidates() {
        let terrain = Terrain::new(vec![Point::new(0.0, 100.0), Point::new(500.0, 300.0)]).unwrap();
        assert!(matches!(
            terrain.with_point_replaced(1, Point::new(0.0, 1.0), &Params::default()),
            Err(LandscapeError::NonIncreasingX { index: 1, .. })
        ));
        assert_eq!(
            terrain.with_point_replaced(7, Point::new(0.0, 1.0), &Params::default()),
            Err(LandscapeError::IndexOutOfRange { index: 7, len: 2 })
        );
    }

    #[test]
    fn test_with_params_skips_validation() {
        let points = vec![Point::new(5.0, 1.0), Point::new(5.0, 2.0)];
        let lax = Params {
            validate: false,
            ..Params::default()
        };
        assert!(Terrain::with_params(points.clone(), &lax).is_ok());
        assert!(Terrain::with_params(points, &Params::default()).is_err());
    }

    #[test]
    fn test_point_replacement_respects_disabled_validation() {
        let lax = Params {
            validate: false,
            ..Params::default()
        };
        let terrain =
            Terrain::with_params(vec![Point::new(0.0, 1.0), Point::new(0.0, 2.0), Point::new(9.0, 2.0)], &lax)
                .unwrap();
        let edited = terrain
            .with_point_replaced(2, Point::new(8.0, 5.0), &lax)
            .unwrap();
        assert_eq!(edited.points()[2], Point::new(8.0, 5.0));
        assert!(terrain
            .with_point_replaced(2, Point::new(8.0, 5.0), &Params::default())
            .is_err());
        assert_eq!(
            terrain.with_point_replaced(3, Point::new(8.0, 5.0), &lax),
            Err(LandscapeError::IndexOutOfRange { index: 3, len: 3 })
        );
    }

    #[test]
    fn test_x_range() {
        let terrain = Terrain::new(vec![Point::new(0.0, 1.0), Point::new(6999.0, 2.0)]).unwrap();
        assert_eq!(terrain.x_range(), Some((0.0, 6999.0)));
        assert_eq!(Terrain::default().x_range(), None);
    }
}
