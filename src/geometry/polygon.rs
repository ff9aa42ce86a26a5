//! Simple polygons and intersection predicates.

use super::GeometryError;
use serde::{Deserialize, Serialize};

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Point {
    /// Create a point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A simple polygon ring.
///
/// Stored open: the closing vertex is implied, and a repeated first vertex
/// at the end of the input is dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    points: Vec<Point>,
}

impl Polygon {
    /// Create a ring from its vertices.
    pub fn new(mut points: Vec<Point>) -> Self {
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        Self { points }
    }

    /// Build a ring from `[x, y, ...]` positions, ignoring extra ordinates.
    pub fn from_positions(positions: &[Vec<f64>]) -> Result<Self, GeometryError> {
        let points = positions
            .iter()
            .map(|p| match p.as_slice() {
                [x, y, ..] => Ok(Point::new(*x, *y)),
                _ => Err(GeometryError::TooFewVertices),
            })
            .collect::<Result<Vec<_>, _>>()?;
        let polygon = Self::new(points);
        polygon.validate()?;
        Ok(polygon)
    }

    /// Vertices of the open ring.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Check the ring has at least three finite vertices.
    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return Err(GeometryError::NonFinite);
        }
        if self.points.len() < 3 {
            return Err(GeometryError::TooFewVertices);
        }
        Ok(())
    }

    /// Closed ring as `[x, y]` positions, first vertex repeated at the end.
    pub fn closed_positions(&self) -> Vec<[f64; 2]> {
        let mut out: Vec<[f64; 2]> = self.points.iter().map(|p| [p.x, p.y]).collect();
        if let Some(first) = out.first().copied() {
            out.push(first);
        }
        out
    }

    /// Envelope corners as `([xmin, ymin], [xmax, ymax])`.
    pub fn envelope(&self) -> ([f64; 2], [f64; 2]) {
        let mut min = [f64::INFINITY, f64::INFINITY];
        let mut max = [f64::NEG_INFINITY, f64::NEG_INFINITY];
        for p in &self.points {
            min[0] = min[0].min(p.x);
            min[1] = min[1].min(p.y);
            max[0] = max[0].max(p.x);
            max[1] = max[1].max(p.y);
        }
        (min, max)
    }

    /// Ring edges, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Strict interior test (even-odd rule).
    pub fn contains_point(&self, p: Point) -> bool {
        let mut inside = false;
        for (a, b) in self.edges() {
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Whether any edge of `self` touches or crosses any edge of `other`.
    pub fn edges_intersect(&self, other: &Self) -> bool {
        self.edges()
            .any(|(a, b)| other.edges().any(|(c, d)| segments_intersect(a, b, c, d)))
    }

    /// Whether the two rings share any point (boundary contact included).
    pub fn intersects(&self, other: &Self) -> bool {
        if self.points.is_empty() || other.points.is_empty() {
            return false;
        }
        self.edges_intersect(other)
            || other.contains_point(self.points[0])
            || self.contains_point(other.points[0])
    }
}

fn orientation(a: Point, b: Point, c: Point) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

fn segments_intersect(p1: Point, p2: Point, q1: Point, q2: Point) -> bool {
    let d1 = orientation(q1, q2, p1);
    let d2 = orientation(q1, q2, p2);
    let d3 = orientation(p1, p2, q1);
    let d4 = orientation(p1, p2, q2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && on_segment(q1, q2, p1))
        || (d2 == 0.0 && on_segment(q1, q2, p2))
        || (d3 == 0.0 && on_segment(p1, p2, q1))
        || (d4 == 0.0 && on_segment(p1, p2, q2))
}
