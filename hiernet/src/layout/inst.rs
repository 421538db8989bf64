//! Cell instances and instance arrays.

use hiergeom::bbox::Bbox;
use hiergeom::trans::{Trans, Transform};
use hiergeom::Point;

use super::CellId;

/// Identifies an instance array within its owning cell.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstId {
    /// The cell owning the instance.
    pub cell: CellId,
    /// The index of the instance within the owning cell.
    pub index: u32,
}

impl InstId {
    pub fn new(cell: CellId, index: u32) -> Self {
        Self { cell, index }
    }
}

/// Identifies a single placement within an instance array: the instance
/// together with the chosen array index.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstElement {
    pub inst: InstId,
    pub placement: u32,
}

impl InstElement {
    pub fn new(inst: InstId, placement: usize) -> Self {
        Self {
            inst,
            placement: placement as u32,
        }
    }
}

/// A placement of a child cell within another cell.
///
/// A plain instance has a single placement; a regular array repeats the
/// placement along two integer lattice vectors. Placements are numbered
/// `0..size()`, row-major along the `a` vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstArray {
    target: CellId,
    trans: Trans,
    a: Point,
    b: Point,
    na: u32,
    nb: u32,
}

impl InstArray {
    /// Creates a single placement of `target` under `trans`.
    pub fn new(target: CellId, trans: Trans) -> Self {
        Self {
            target,
            trans,
            a: Point::zero(),
            b: Point::zero(),
            na: 1,
            nb: 1,
        }
    }

    /// Creates a regular array of placements.
    ///
    /// Member `(i, j)` is placed at `trans` displaced by `i * a + j * b`,
    /// for `i` in `0..na` and `j` in `0..nb`.
    pub fn array(target: CellId, trans: Trans, a: Point, na: u32, b: Point, nb: u32) -> Self {
        assert!(na >= 1 && nb >= 1);
        Self {
            target,
            trans,
            a,
            b,
            na,
            nb,
        }
    }

    /// The instantiated cell.
    #[inline]
    pub fn target(&self) -> CellId {
        self.target
    }

    /// The number of placements in the array.
    #[inline]
    pub fn size(&self) -> usize {
        self.na as usize * self.nb as usize
    }

    /// The transformation of the first placement.
    #[inline]
    pub fn base_trans(&self) -> Trans {
        self.trans
    }

    /// The transformation of placement `k`.
    pub fn placement_trans(&self, k: usize) -> Trans {
        debug_assert!(k < self.size());
        let i = (k % self.na as usize) as i64;
        let j = (k / self.na as usize) as i64;
        let disp = Point::new(i * self.a.x + j * self.b.x, i * self.a.y + j * self.b.y);
        Trans::translate(disp) * self.trans
    }

    /// The bounding box of the whole array, given the bounding box of the
    /// instantiated cell.
    pub fn bbox_from(&self, cell_box: Bbox) -> Bbox {
        if cell_box.is_empty() {
            return Bbox::empty();
        }
        // Array offsets are pure translations, so the union of the corner
        // members covers all members.
        let mut bx = Bbox::empty();
        for k in self.corner_placements() {
            bx = bx.union(&cell_box.transformed(self.placement_trans(k)));
        }
        bx
    }

    /// The placements whose cell box (transformed) touches `query`.
    pub fn touching_placements(
        &self,
        cell_box: Bbox,
        query: Bbox,
    ) -> impl Iterator<Item = usize> + '_ {
        (0..self.size()).filter(move |&k| {
            cell_box.transformed(self.placement_trans(k)).touches(&query)
        })
    }

    fn corner_placements(&self) -> impl Iterator<Item = usize> {
        let na = self.na as usize;
        let nb = self.nb as usize;
        [0, na - 1, (nb - 1) * na, na * nb - 1].into_iter()
    }
}
