//! Terrain text input and convex point output.

use tracing::debug;

use crate::point::{Point, Terrain};
use crate::LandscapeError;

/// Built-in puzzle surface, x in [0, 6999].
const SAMPLE_SURFACE: [(f64, f64); 15] = [
    (0.0, 1000.0),
    (300.0, 1500.0),
    (350.0, 1400.0),
    (500.0, 2000.0),
    (1500.0, 2700.0),
    (1700.0, 2000.0),
    (3200.0, 1000.0),
    (3500.0, 200.0),
    (5000.0, 200.0),
    (5500.0, 1500.0),
    (5800.0, 1100.0),
    (6000.0, 2200.0),
    (6500.0, 2400.0),
    (6600.0, 2600.0),
    (6999.0, 2500.0),
];

pub fn sample_terrain() -> Terrain {
    Terrain::new_unchecked(SAMPLE_SURFACE.iter().copied().map(Point::from).collect())
}

/// Parse terrain points from text.
///
/// Accepts the puzzle layout (a count line followed by `x y` lines) or bare
/// `x y` / `x,y` lines. Blank lines and `#` comments are skipped. Lines after
/// the declared count are ignored.
pub fn parse_terrain(text: &str) -> Result<Vec<Point>, LandscapeError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, raw)| (i + 1, strip_comment(raw).trim()))
        .filter(|(_, line)| !line.is_empty())
        .peekable();

    let declared = match lines.peek().copied() {
        Some((line_no, line)) if !line.contains([',', ' ', '\t']) => {
            lines.next();
            Some(line.parse::<usize>().map_err(|err| LandscapeError::Parse {
                line: line_no,
                message: format!("invalid point count '{line}': {err}"),
            })?)
        }
        _ => None,
    };

    let mut points = Vec::with_capacity(declared.unwrap_or(16));
    for (line_no, line) in lines {
        if declared.is_some_and(|n| points.len() == n) {
            debug!(line = line_no, "ignoring input after declared surface points");
            break;
        }
        points.push(parse_point(line_no, line)?);
    }

    if let Some(expected) = declared {
        if points.len() != expected {
            return Err(LandscapeError::PointCountMismatch {
                expected,
                found: points.len(),
            });
        }
    }
    Ok(points)
}

/// Parse a JSON array of `{"x": .., "y": ..}` objects.
pub fn parse_terrain_json(text: &str) -> Result<Vec<Point>, LandscapeError> {
    serde_json::from_str(text).map_err(|err| LandscapeError::Parse {
        line: err.line(),
        message: err.to_string(),
    })
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn parse_point(line_no: usize, line: &str) -> Result<Point, LandscapeError> {
    let fields: Vec<&str> = line
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .collect();
    let [x, y] = fields.as_slice() else {
        return Err(LandscapeError::Parse {
            line: line_no,
            message: format!("expected 2 coordinates, found {}", fields.len()),
        });
    };
    let parse = |token: &str| {
        token.parse::<f64>().map_err(|err| LandscapeError::Parse {
            line: line_no,
            message: format!("invalid coordinate '{token}': {err}"),
        })
    };
    Ok(Point::new(parse(*x)?, parse(*y)?))
}

/// Render a coordinate without a trailing `.0` for integral values.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        // avoid "-0"
        "0".to_string()
    } else {
        value.to_string()
    }
}

/// Serialize points as `x,y` lines joined by CRLF.
pub fn format_points_crlf(points: &[Point]) -> String {
    points
        .iter()
        .map(|p| format!("{},{}", format_number(p.x), format_number(p.y)))
        .collect::<Vec<_>>()
        .join("\r\n")
}
