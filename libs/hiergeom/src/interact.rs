//! Geometric interaction predicates.
//!
//! Two figures *interact* when they share at least one point; touching at an
//! edge or a single corner counts.

use super::{Point, Polygon};

fn cross(o: Point, a: Point, b: Point) -> i128 {
    let oax = (a.x - o.x) as i128;
    let oay = (a.y - o.y) as i128;
    let obx = (b.x - o.x) as i128;
    let oby = (b.y - o.y) as i128;
    oax * oby - oay * obx
}

fn on_segment(p: Point, a: Point, b: Point) -> bool {
    cross(a, b, p) == 0
        && p.x >= a.x.min(b.x)
        && p.x <= a.x.max(b.x)
        && p.y >= a.y.min(b.y)
        && p.y <= a.y.max(b.y)
}

/// Returns `true` if the closed segments `a1..a2` and `b1..b2` share a point.
pub fn segments_interact(a1: Point, a2: Point, b1: Point, b2: Point) -> bool {
    let d1 = cross(b1, b2, a1);
    let d2 = cross(b1, b2, a2);
    let d3 = cross(a1, a2, b1);
    let d4 = cross(a1, a2, b2);

    if ((d1 > 0 && d2 < 0) || (d1 < 0 && d2 > 0)) && ((d3 > 0 && d4 < 0) || (d3 < 0 && d4 > 0)) {
        return true;
    }

    (d1 == 0 && on_segment(a1, b1, b2))
        || (d2 == 0 && on_segment(a2, b1, b2))
        || (d3 == 0 && on_segment(b1, a1, a2))
        || (d4 == 0 && on_segment(b2, a1, a2))
}

/// Returns `true` if the two polygons share at least one point.
///
/// Covers overlap, edge/corner contact, and full containment of one polygon
/// within the other.
pub fn interact(a: &Polygon, b: &Polygon) -> bool {
    if !a.bbox().touches(&b.bbox()) {
        return false;
    }

    // Containment (or boundary contact) of any vertex decides most cases,
    // including one polygon fully inside the other.
    if a.points().iter().any(|&p| b.contains(p)) {
        return true;
    }
    if b.points().iter().any(|&p| a.contains(p)) {
        return true;
    }

    // Remaining case: edges crossing without any vertex inside.
    for (a1, a2) in a.edges() {
        for (b1, b2) in b.edges() {
            if segments_interact(a1, a2, b1, b2) {
                return true;
            }
        }
    }

    false
}
