// SPDX-License-Identifier: MIT
//! Region tests for frame coordinates.
//!
//! Standalone helper for region filtering; the probe does not call it.

#[allow(dead_code)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[allow(dead_code)]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// Even-odd ray casting. `polygon` lists vertices in order; the closing
/// edge back to the first vertex is implied. Fewer than three vertices
/// never contain anything.
#[allow(dead_code)]
#[must_use]
pub fn point_in_polygon(point: Point, polygon: &[Point]) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let mut inside = false;
    let edges = polygon.iter().zip(polygon.iter().cycle().skip(1));
    for (a, b) in edges {
        if (a.y > point.y) != (b.y > point.y) {
            let x_cross = (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x;
            if point.x < x_cross {
                inside = !inside;
            }
        }
    }
    inside
}

#[cfg(test)]
mod tests {
    use super::*;

    fn poly(vertices: &[(f64, f64)]) -> Vec<Point> {
        vertices.iter().copied().map(Point::from).collect()
    }

    #[test]
    fn square_contains_its_centre_only() {
        let square = poly(&[(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)]);
        assert!(point_in_polygon(Point::new(5.0, 5.0), &square));
        assert!(!point_in_polygon(Point::new(15.0, 5.0), &square));
        assert!(!point_in_polygon(Point::new(-1.0, 5.0), &square));
        assert!(!point_in_polygon(Point::new(5.0, 11.0), &square));
    }

    #[test]
    fn concave_notch_is_outside() {
        // A "U" shape open at the top between x=3 and x=7.
        let u = poly(&[
            (0.0, 0.0),
            (10.0, 0.0),
            (10.0, 10.0),
            (7.0, 10.0),
            (7.0, 3.0),
            (3.0, 3.0),
            (3.0, 10.0),
            (0.0, 10.0),
        ]);
        assert!(point_in_polygon(Point::new(1.5, 8.0), &u));
        assert!(point_in_polygon(Point::new(5.0, 1.0), &u));
        assert!(!point_in_polygon(Point::new(5.0, 8.0), &u));
    }

    #[test]
    fn vertex_order_does_not_matter() {
        let cw = poly(&[(0.0, 0.0), (0.0, 4.0), (4.0, 4.0), (4.0, 0.0)]);
        let mut ccw = cw.clone();
        ccw.reverse();
        let p = Point::new(2.0, 1.0);
        assert_eq!(point_in_polygon(p, &cw), point_in_polygon(p, &ccw));
        assert!(point_in_polygon(p, &cw));
    }

    #[test]
    fn degenerate_polygons_contain_nothing() {
        assert!(!point_in_polygon(Point::new(0.0, 0.0), &[]));
        let line = poly(&[(0.0, 0.0), (5.0, 5.0)]);
        assert!(!point_in_polygon(Point::new(1.0, 1.0), &line));
    }
}
