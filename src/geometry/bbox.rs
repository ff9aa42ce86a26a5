//! Axis-aligned bounding boxes.

use super::{GeometryError, Point, Polygon};
use serde::{Deserialize, Serialize};

/// Axis-aligned box in pixel coordinates (`x` = column, `y` = row).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Left edge.
    pub xmin: f64,
    /// Top edge.
    pub ymin: f64,
    /// Right edge.
    pub xmax: f64,
    /// Bottom edge.
    pub ymax: f64,
}

impl BoundingBox {
    /// Create a box from its edges.
    pub const fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    /// Box width (negative for inverted boxes).
    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    /// Box height (negative for inverted boxes).
    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    /// Area, or zero for degenerate boxes.
    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Check that the box can take part in IOU computations.
    pub fn validate(&self) -> Result<(), GeometryError> {
        let coords = [self.xmin, self.ymin, self.xmax, self.ymax];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(GeometryError::NonFinite);
        }
        if self.width() <= 0.0 || self.height() <= 0.0 {
            return Err(GeometryError::Degenerate);
        }
        Ok(())
    }

    /// Shift the box by `dx` columns and `dy` rows.
    #[must_use]
    pub fn translate(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.xmin + dx, self.ymin + dy, self.xmax + dx, self.ymax + dy)
    }

    /// Area shared with `other`.
    pub fn intersection_area(&self, other: &Self) -> f64 {
        let w = self.xmax.min(other.xmax) - self.xmin.max(other.xmin);
        let h = self.ymax.min(other.ymax) - self.ymin.max(other.ymin);
        if w <= 0.0 || h <= 0.0 {
            return 0.0;
        }
        w * h
    }

    /// Intersection over union with `other`; zero when the boxes are disjoint.
    pub fn iou(&self, other: &Self) -> f64 {
        let inter = self.intersection_area(other);
        if inter <= 0.0 {
            return 0.0;
        }
        let union = self.area() + other.area() - inter;
        if union <= 0.0 { 0.0 } else { inter / union }
    }

    /// Corners as `[min, max]` pairs for spatial indexing.
    pub const fn corners(&self) -> ([f64; 2], [f64; 2]) {
        ([self.xmin, self.ymin], [self.xmax, self.ymax])
    }

    /// Closed ring, clockwise in image space starting at the top-left corner.
    pub fn to_polygon(&self) -> Polygon {
        Polygon::new(vec![
            Point::new(self.xmin, self.ymin),
            Point::new(self.xmax, self.ymin),
            Point::new(self.xmax, self.ymax),
            Point::new(self.xmin, self.ymax),
        ])
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_area_and_intersection() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
        assert_eq!(a.area(), 100.0);
        assert_eq!(a.intersection_area(&b), 25.0);
        assert!((a.iou(&b) - 25.0 / 175.0).abs() < 1e-12);
    }

    #[test]
    fn test_iou_identical_is_exactly_one() {
        let a = BoundingBox::new(12.5, 3.25, 40.75, 19.0);
        assert_eq!(a.iou(&a), 1.0);
    }

    #[test]
    fn test_touching_boxes_do_not_intersect() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BoundingBox::new(10.0, 0.0, 20.0, 10.0);
        assert_eq!(a.intersection_area(&b), 0.0);
        assert_eq!(a.iou(&b), 0.0);
    }

    #[test]
    fn test_validate_rejects_malformed() {
        assert_eq!(
            BoundingBox::new(f64::NAN, 0.0, 1.0, 1.0).validate(),
            Err(GeometryError::NonFinite)
        );
        assert_eq!(
            BoundingBox::new(5.0, 0.0, 5.0, 1.0).validate(),
            Err(GeometryError::Degenerate)
        );
        assert_eq!(
            BoundingBox::new(0.0, 4.0, 1.0, 1.0).validate(),
            Err(GeometryError::Degenerate)
        );
        assert!(BoundingBox::new(0.0, 0.0, 1.0, 1.0).validate().is_ok());
    }

    #[test]
    fn test_translate_is_exact() {
        let b = BoundingBox::new(1.5, 2.5, 3.5, 4.5).translate(250.0, 500.0);
        assert_eq!(b, BoundingBox::new(251.5, 502.5, 253.5, 504.5));
    }
}
