//! Core geometric types for integer layout space.
//!
//! Everything here is exact: coordinates are `i64`, transformations are
//! rectilinear (see [`trans::Trans`]), and interaction predicates use wide
//! intermediate arithmetic instead of floating point.

use std::sync::Arc;

use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

use self::bbox::Bbox;
use self::trans::{Trans, Transform};

pub mod bbox;
pub mod interact;
pub mod trans;

/// A point in two-dimensional layout space.
#[derive(
    Debug, Copy, Clone, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    /// Creates a new [`Point`] from (x, y) coordinates.
    #[inline]
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Returns the origin, (0, 0).
    #[inline]
    pub fn zero() -> Self {
        Self { x: 0, y: 0 }
    }
}

impl std::ops::Add for Point {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Neg for Point {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl From<(i64, i64)> for Point {
    fn from(value: (i64, i64)) -> Self {
        Self::new(value.0, value.1)
    }
}

/// An axis-aligned rectangle, specified by lower-left and upper-right corners.
///
/// Unlike [`Bbox`], a [`Rect`] is never empty.
#[derive(Debug, Default, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Rect {
    /// The lower-left corner.
    pub p0: Point,
    /// The upper-right corner.
    pub p1: Point,
}

impl Rect {
    /// Creates a new rectangle spanning the two given points.
    pub fn new(p0: Point, p1: Point) -> Self {
        Self {
            p0: Point::new(p0.x.min(p1.x), p0.y.min(p1.y)),
            p1: Point::new(p0.x.max(p1.x), p0.y.max(p1.y)),
        }
    }

    /// Creates a rectangle from raw corner coordinates.
    pub fn from_coords(x0: i64, y0: i64, x1: i64, y1: i64) -> Self {
        Self::new(Point::new(x0, y0), Point::new(x1, y1))
    }

    #[inline]
    pub fn width(&self) -> i64 {
        self.p1.x - self.p0.x
    }

    #[inline]
    pub fn height(&self) -> i64 {
        self.p1.y - self.p0.y
    }

    /// Converts the rectangle into a four-point polygon.
    pub fn to_polygon(&self) -> Polygon {
        Polygon::new(vec![
            self.p0,
            Point::new(self.p1.x, self.p0.y),
            self.p1,
            Point::new(self.p0.x, self.p1.y),
        ])
    }
}

/// A closed polygon with an arbitrary number of vertices.
///
/// Closure from the last point back to the first is implied. The bounding
/// box is computed once at construction; polygons are immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Polygon {
    points: Vec<Point>,
    bbox: Bbox,
}

impl Polygon {
    /// Creates a new polygon from its vertices.
    pub fn new(points: Vec<Point>) -> Self {
        debug_assert!(points.len() >= 3, "a polygon needs at least three points");
        let mut bbox = Bbox::empty();
        for &pt in &points {
            bbox.add_point(pt);
        }
        Self { points, bbox }
    }

    /// The vertices of the polygon.
    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// The bounding box of the polygon.
    #[inline]
    pub fn bbox(&self) -> Bbox {
        self.bbox
    }

    /// Iterates over the edges of the polygon, including the closing edge.
    pub fn edges(&self) -> impl Iterator<Item = (Point, Point)> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| (self.points[i], self.points[(i + 1) % n]))
    }

    /// Returns `true` if the polygon is an axis-aligned rectangle.
    pub fn is_box(&self) -> bool {
        if self.points.len() != 4 {
            return false;
        }
        let axis_aligned = self
            .edges()
            .all(|(a, b)| (a.x == b.x) != (a.y == b.y));
        axis_aligned && self.points.iter().all(|&p| {
            (p.x == self.bbox.p0.x || p.x == self.bbox.p1.x)
                && (p.y == self.bbox.p0.y || p.y == self.bbox.p1.y)
        })
    }

    /// Returns `true` if `pt` lies inside the polygon or on its boundary.
    pub fn contains(&self, pt: Point) -> bool {
        if !self.bbox.contains(pt) {
            return false;
        }

        let mut winding: i64 = 0;
        for (a, b) in self.edges() {
            let on_edge = side(a, b, pt) == 0
                && pt.x >= a.x.min(b.x)
                && pt.x <= a.x.max(b.x)
                && pt.y >= a.y.min(b.y)
                && pt.y <= a.y.max(b.y);
            if on_edge {
                // Boundary points are regarded as inside.
                return true;
            }
            if a.y <= pt.y && pt.y < b.y {
                // Upward edge; count if pt is strictly to its left.
                if side(a, b, pt) > 0 {
                    winding += 1;
                }
            } else if b.y <= pt.y && pt.y < a.y {
                if side(a, b, pt) < 0 {
                    winding -= 1;
                }
            }
        }
        winding != 0
    }
}

fn side(a: Point, b: Point, p: Point) -> i128 {
    let abx = (b.x - a.x) as i128;
    let aby = (b.y - a.y) as i128;
    let apx = (p.x - a.x) as i128;
    let apy = (p.y - a.y) as i128;
    abx * apy - aby * apx
}

/// The primary geometric primitive comprising raw layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[enum_dispatch(ShapeLike)]
pub enum Shape {
    Rect(Rect),
    Polygon(Polygon),
}

/// Common shape operations, dispatched from the [`Shape`] enum to its
/// variants by [mod@enum_dispatch].
#[enum_dispatch]
pub trait ShapeLike {
    /// Computes a rectangular bounding box around the shape.
    fn shape_bbox(&self) -> Bbox;
    /// Converts the shape to a [`Polygon`], the most general of shapes.
    fn into_polygon(self) -> Polygon;
}

impl ShapeLike for Rect {
    fn shape_bbox(&self) -> Bbox {
        Bbox::new(self.p0, self.p1)
    }
    fn into_polygon(self) -> Polygon {
        self.to_polygon()
    }
}

impl ShapeLike for Polygon {
    fn shape_bbox(&self) -> Bbox {
        self.bbox()
    }
    fn into_polygon(self) -> Polygon {
        self
    }
}

/// A reference to a shared polygon body combined with a per-shape transform.
///
/// Cloning a [`PolyRef`] never copies the polygon body; the body lives in
/// shared storage behind an [`Arc`].
#[derive(Debug, Clone)]
pub struct PolyRef {
    poly: Arc<Polygon>,
    trans: Trans,
}

impl PolyRef {
    /// Creates a new reference from a shared body and a transform.
    pub fn new(poly: Arc<Polygon>, trans: Trans) -> Self {
        Self { poly, trans }
    }

    /// The untransformed polygon body.
    #[inline]
    pub fn obj(&self) -> &Polygon {
        &self.poly
    }

    /// The per-shape transform.
    #[inline]
    pub fn trans(&self) -> Trans {
        self.trans
    }

    /// The bounding box of the shape in its owning frame.
    pub fn bbox(&self) -> Bbox {
        self.poly.bbox().transformed(self.trans)
    }

    /// Returns `true` if the referenced body is an axis-aligned rectangle.
    pub fn is_box(&self) -> bool {
        self.poly.is_box()
    }

    /// Resolves the reference into a standalone polygon in its owning frame.
    pub fn resolved(&self) -> Polygon {
        if self.trans.is_unity() {
            (*self.poly).clone()
        } else {
            self.poly.transformed(self.trans)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polygon_contains_triangle() {
        let triangle = Polygon::new(vec![Point::new(0, 0), Point::new(2, 0), Point::new(0, 2)]);
        assert!(triangle.contains(Point::new(0, 0)));
        assert!(triangle.contains(Point::new(1, 0)));
        assert!(triangle.contains(Point::new(1, 1)));
        assert!(!triangle.contains(Point::new(2, 2)));
    }

    #[test]
    fn polygon_contains_u_shape() {
        let u = Polygon::new(vec![
            Point::new(0, 0),
            Point::new(0, 10),
            Point::new(2, 10),
            Point::new(2, 2),
            Point::new(8, 2),
            Point::new(8, 10),
            Point::new(10, 10),
            Point::new(10, 0),
        ]);
        for &pt in u.points() {
            assert!(u.contains(pt));
        }
        assert!(u.contains(Point::new(1, 9)));
        assert!(u.contains(Point::new(9, 1)));
        // Inside the notch, i.e. outside the polygon.
        assert!(!u.contains(Point::new(5, 5)));
        assert!(!u.contains(Point::new(3, 9)));
    }

    #[test]
    fn rect_polygon_is_box() {
        let r = Rect::from_coords(0, 0, 10, 4).to_polygon();
        assert!(r.is_box());
        let tri = Polygon::new(vec![Point::new(0, 0), Point::new(4, 0), Point::new(0, 4)]);
        assert!(!tri.is_box());
    }

    #[test]
    fn polyref_bbox_follows_trans() {
        let body = Arc::new(Rect::from_coords(0, 0, 4, 2).to_polygon());
        let r = PolyRef::new(body, Trans::translate(Point::new(10, 20)));
        assert_eq!(
            r.bbox(),
            Bbox::new(Point::new(10, 20), Point::new(14, 22))
        );
        assert!(r.is_box());
    }
}
