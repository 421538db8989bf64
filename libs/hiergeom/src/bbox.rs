//! Rectangular bounding boxes.

use serde::{Deserialize, Serialize};

use super::Point;

/// An axis-aligned rectangular bounding box.
///
/// `p0` is the corner closest to negative infinity in both x and y, `p1` the
/// corner closest to positive infinity. A box may be *empty*, in which case
/// `p0` lies to the upper right of `p1` and the box contains nothing.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Bbox {
    pub p0: Point,
    pub p1: Point,
}

impl Default for Bbox {
    fn default() -> Self {
        Self::empty()
    }
}

impl Bbox {
    /// Creates a new [`Bbox`] spanning the two given points.
    #[inline]
    pub fn new(p0: Point, p1: Point) -> Self {
        Self {
            p0: Point::new(p0.x.min(p1.x), p0.y.min(p1.y)),
            p1: Point::new(p0.x.max(p1.x), p0.y.max(p1.y)),
        }
    }

    /// Creates a new [`Bbox`] from two points without normalization.
    ///
    /// Callers are responsible for ensuring `p0.x <= p1.x` and `p0.y <= p1.y`.
    #[inline]
    pub(crate) fn from_points(p0: Point, p1: Point) -> Self {
        Self { p0, p1 }
    }

    /// Creates a zero-area box containing only `pt`.
    #[inline]
    pub fn from_point(pt: Point) -> Self {
        Self { p0: pt, p1: pt }
    }

    /// Creates an empty bounding box.
    pub fn empty() -> Self {
        Self {
            p0: Point::new(i64::MAX, i64::MAX),
            p1: Point::new(i64::MIN, i64::MIN),
        }
    }

    /// A box covering effectively all of layout space.
    ///
    /// Kept comfortably away from the integer limits so that translations of
    /// intersections with it cannot overflow.
    pub fn world() -> Self {
        const LIM: i64 = i64::MAX / 4;
        Self {
            p0: Point::new(-LIM, -LIM),
            p1: Point::new(LIM, LIM),
        }
    }

    /// Returns `true` if the bounding box is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.p0.x > self.p1.x || self.p0.y > self.p1.y
    }

    /// Width in the x-direction.
    #[inline]
    pub fn width(&self) -> i64 {
        self.p1.x - self.p0.x
    }

    /// Height in the y-direction.
    #[inline]
    pub fn height(&self) -> i64 {
        self.p1.y - self.p0.y
    }

    /// Area of the box; zero for empty boxes.
    pub fn area(&self) -> i128 {
        if self.is_empty() {
            0
        } else {
            self.width() as i128 * self.height() as i128
        }
    }

    /// Center point of the box.
    pub fn center(&self) -> Point {
        Point::new((self.p0.x + self.p1.x) / 2, (self.p0.y + self.p1.y) / 2)
    }

    /// Returns `true` if `pt` lies inside or on the boundary of the box.
    pub fn contains(&self, pt: Point) -> bool {
        self.p0.x <= pt.x && self.p1.x >= pt.x && self.p0.y <= pt.y && self.p1.y >= pt.y
    }

    /// Returns `true` if the two boxes share at least one point.
    ///
    /// Touching at an edge or a corner counts. Empty boxes touch nothing.
    pub fn touches(&self, other: &Bbox) -> bool {
        !self.is_empty()
            && !other.is_empty()
            && self.p0.x <= other.p1.x
            && other.p0.x <= self.p1.x
            && self.p0.y <= other.p1.y
            && other.p0.y <= self.p1.y
    }

    /// Computes the intersection of two boxes; empty if they do not overlap.
    pub fn intersection(&self, other: &Bbox) -> Bbox {
        let pmin = Point::new(self.p0.x.max(other.p0.x), self.p0.y.max(other.p0.y));
        let pmax = Point::new(self.p1.x.min(other.p1.x), self.p1.y.min(other.p1.y));
        if pmin.x > pmax.x || pmin.y > pmax.y {
            return Bbox::empty();
        }
        Bbox::from_points(pmin, pmax)
    }

    /// Computes the union of two boxes.
    pub fn union(&self, other: &Bbox) -> Bbox {
        if other.is_empty() {
            return *self;
        }
        if self.is_empty() {
            return *other;
        }
        Bbox::from_points(
            Point::new(self.p0.x.min(other.p0.x), self.p0.y.min(other.p0.y)),
            Point::new(self.p1.x.max(other.p1.x), self.p1.y.max(other.p1.y)),
        )
    }

    /// Extends the box to cover `pt`.
    pub fn add_point(&mut self, pt: Point) {
        *self = self.union(&Bbox::from_point(pt));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_box_algebra() {
        let e = Bbox::empty();
        let b = Bbox::new(Point::new(0, 0), Point::new(10, 5));
        assert!(e.is_empty());
        assert!(!b.is_empty());
        assert_eq!(e.union(&b), b);
        assert_eq!(b.union(&e), b);
        assert!(e.intersection(&b).is_empty());
        assert!(!e.touches(&b));
        assert_eq!(e.area(), 0);
    }

    #[test]
    fn touches_is_inclusive() {
        let a = Bbox::new(Point::new(0, 0), Point::new(10, 10));
        let b = Bbox::new(Point::new(10, 10), Point::new(20, 20));
        let c = Bbox::new(Point::new(11, 11), Point::new(20, 20));
        assert!(a.touches(&b));
        assert!(b.touches(&a));
        assert!(!a.touches(&c));
        assert_eq!(a.intersection(&b), Bbox::from_point(Point::new(10, 10)));
    }

    #[test]
    fn union_and_intersection() {
        let a = Bbox::new(Point::new(0, 0), Point::new(10, 10));
        let b = Bbox::new(Point::new(5, 5), Point::new(15, 15));
        assert_eq!(a.union(&b), Bbox::new(Point::new(0, 0), Point::new(15, 15)));
        assert_eq!(
            a.intersection(&b),
            Bbox::new(Point::new(5, 5), Point::new(10, 10))
        );
    }
}
