//! Exact rectilinear transformations.
//!
//! A [`Trans`] composes a quarter-turn rotation, an optional reflection about
//! the x-axis, and an integer displacement. The group is closed under
//! composition and inversion with no rounding, which keeps accumulated
//! instance transforms exact through arbitrarily deep hierarchies.

use serde::{Deserialize, Serialize};

use super::bbox::Bbox;
use super::{Point, Polygon, Rect};

/// Counterclockwise quarter-turn rotations.
#[derive(Debug, Default, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Rot {
    #[default]
    R0,
    R90,
    R180,
    R270,
}

impl Rot {
    fn from_quarters(q: i32) -> Self {
        match q.rem_euclid(4) {
            0 => Rot::R0,
            1 => Rot::R90,
            2 => Rot::R180,
            _ => Rot::R270,
        }
    }

    fn quarters(self) -> i32 {
        match self {
            Rot::R0 => 0,
            Rot::R90 => 1,
            Rot::R180 => 2,
            Rot::R270 => 3,
        }
    }
}

/// A rectilinear affine transformation.
///
/// Application order: reflect about the x-axis (if `mirror`), rotate by
/// `rot`, then translate by `disp`.
#[derive(Debug, Default, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Trans {
    rot: Rot,
    mirror: bool,
    disp: Point,
}

impl Trans {
    /// The identity transformation.
    #[inline]
    pub fn identity() -> Self {
        Self::default()
    }

    /// A pure translation by `disp`.
    #[inline]
    pub fn translate(disp: Point) -> Self {
        Self {
            disp,
            ..Default::default()
        }
    }

    /// Creates a transformation from its parts.
    pub fn new(rot: Rot, mirror: bool, disp: Point) -> Self {
        Self { rot, mirror, disp }
    }

    /// Returns `true` if this is the identity transformation.
    pub fn is_unity(&self) -> bool {
        self.rot == Rot::R0 && !self.mirror && self.disp == Point::zero()
    }

    /// The displacement part of the transformation.
    #[inline]
    pub fn disp(&self) -> Point {
        self.disp
    }

    fn apply_linear(&self, p: Point) -> Point {
        let p = if self.mirror {
            Point::new(p.x, -p.y)
        } else {
            p
        };
        match self.rot {
            Rot::R0 => p,
            Rot::R90 => Point::new(-p.y, p.x),
            Rot::R180 => Point::new(-p.x, -p.y),
            Rot::R270 => Point::new(p.y, -p.x),
        }
    }

    /// Applies the transformation to a point.
    pub fn apply(&self, p: Point) -> Point {
        self.apply_linear(p) + self.disp
    }

    /// Returns the inverse transformation.
    pub fn inverted(&self) -> Self {
        // A reflected rectilinear transform is its own linear inverse.
        let inv = Self {
            rot: if self.mirror {
                self.rot
            } else {
                Rot::from_quarters(-self.rot.quarters())
            },
            mirror: self.mirror,
            disp: Point::zero(),
        };
        let disp = inv.apply_linear(self.disp);
        Self {
            disp: Point::new(-disp.x, -disp.y),
            ..inv
        }
    }
}

impl std::ops::Mul for Trans {
    type Output = Trans;

    /// Composes two transformations: `(a * b).apply(p) == a.apply(b.apply(p))`.
    fn mul(self, rhs: Trans) -> Trans {
        // M R^q = R^-q M, so pulling rhs's rotation past self's mirror
        // negates it.
        let q = if self.mirror {
            -rhs.rot.quarters()
        } else {
            rhs.rot.quarters()
        };
        Trans {
            rot: Rot::from_quarters(self.rot.quarters() + q),
            mirror: self.mirror ^ rhs.mirror,
            disp: self.apply(rhs.disp),
        }
    }
}

/// Types that can be mapped through a [`Trans`].
pub trait Transform {
    /// Returns a copy of `self` with `trans` applied.
    fn transformed(&self, trans: Trans) -> Self;
}

impl Transform for Point {
    fn transformed(&self, trans: Trans) -> Self {
        trans.apply(*self)
    }
}

impl Transform for Bbox {
    fn transformed(&self, trans: Trans) -> Self {
        if self.is_empty() {
            return *self;
        }
        // Rectilinear transforms map boxes to boxes.
        Bbox::new(trans.apply(self.p0), trans.apply(self.p1))
    }
}

impl Transform for Rect {
    fn transformed(&self, trans: Trans) -> Self {
        Rect::new(trans.apply(self.p0), trans.apply(self.p1))
    }
}

impl Transform for Polygon {
    fn transformed(&self, trans: Trans) -> Self {
        Polygon::new(self.points().iter().map(|&p| trans.apply(p)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_orientations() -> Vec<Trans> {
        let mut out = Vec::new();
        for rot in [Rot::R0, Rot::R90, Rot::R180, Rot::R270] {
            for mirror in [false, true] {
                out.push(Trans::new(rot, mirror, Point::new(17, -5)));
            }
        }
        out
    }

    #[test]
    fn inverse_roundtrip() {
        let pts = [Point::new(3, 8), Point::new(-11, 0), Point::new(0, -7)];
        for t in all_orientations() {
            let ti = t.inverted();
            for p in pts {
                assert_eq!(ti.apply(t.apply(p)), p, "inverse failed for {t:?}");
            }
            assert!((t * ti).is_unity());
            assert!((ti * t).is_unity());
        }
    }

    #[test]
    fn composition_matches_sequential_application() {
        let p = Point::new(5, 2);
        for a in all_orientations() {
            for b in all_orientations() {
                assert_eq!((a * b).apply(p), a.apply(b.apply(p)));
            }
        }
    }

    #[test]
    fn rotate_quarter_turn() {
        let t = Trans::new(Rot::R90, false, Point::zero());
        assert_eq!(t.apply(Point::new(1, 0)), Point::new(0, 1));
        assert_eq!(t.apply(Point::new(0, 1)), Point::new(-1, 0));
    }

    #[test]
    fn box_transform_renormalizes() {
        let b = Bbox::new(Point::new(1, 2), Point::new(4, 6));
        let t = Trans::new(Rot::R180, false, Point::new(10, 10));
        assert_eq!(
            b.transformed(t),
            Bbox::new(Point::new(6, 4), Point::new(9, 8))
        );
        assert!(Bbox::empty().transformed(t).is_empty());
    }
}
