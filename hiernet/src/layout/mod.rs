//! The layout container: an arena of cells with hierarchy indices.
//!
//! A [`Layout`] owns its cells by dense index. After construction it is
//! [finalized](Layout::finalize), which validates the hierarchy, computes
//! bottom-up evaluation order, parent indices, and per-cell bounding box
//! caches. The connectivity engine only operates on finalized layouts and
//! treats them as read-only.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use arcstr::ArcStr;
use hiergeom::bbox::Bbox;

use crate::error::{Error, Result};
use crate::LayerId;

pub mod cell;
pub mod inst;

pub use cell::{Cell, ShapeEntry, ShapeFilter, ShapeKind};
pub use inst::{InstArray, InstElement, InstId};

use cell::CellCache;

/// Identifies a cell within a [`Layout`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellId(pub u32);

impl CellId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Hierarchy indices computed by [`Layout::finalize`].
#[derive(Debug, Default)]
struct Hier {
    /// All cells, children before parents.
    bottom_up: Vec<CellId>,
    /// Per cell: the instance arrays (in other cells) instantiating it.
    parents: Vec<Vec<InstId>>,
    /// Per cell: the distinct cells instantiating it, ascending.
    parent_cells: Vec<Vec<CellId>>,
    /// Per cell: the distinct cells it instantiates, ascending.
    children: Vec<Vec<CellId>>,
}

/// A hierarchical layout: cells holding shapes and instances of other cells.
#[derive(Debug, Default)]
pub struct Layout {
    cells: Vec<Cell>,
    names: HashMap<ArcStr, CellId>,
    hier: Option<Hier>,
}

impl Layout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new, empty cell and returns its index.
    pub fn add_cell(&mut self, name: impl Into<ArcStr>) -> Result<CellId> {
        let name = name.into();
        if self.names.contains_key(&name) {
            return Err(Error::DuplicateCellName(name));
        }
        self.invalidate();
        let id = CellId(self.cells.len() as u32);
        self.cells.push(Cell::new(id, name.clone()));
        self.names.insert(name, id);
        Ok(id)
    }

    /// The number of cells in the layout.
    #[inline]
    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// Returns the cell with index `id`.
    pub fn cell(&self, id: CellId) -> &Cell {
        &self.cells[id.index()]
    }

    /// Returns a mutable reference to the cell with index `id`.
    ///
    /// Mutation invalidates the finalized state; call
    /// [`finalize`](Layout::finalize) again before running the engine.
    pub fn cell_mut(&mut self, id: CellId) -> &mut Cell {
        self.invalidate();
        &mut self.cells[id.index()]
    }

    /// Looks up a cell by name.
    pub fn cell_by_name(&self, name: &str) -> Option<CellId> {
        self.names.get(name).copied()
    }

    /// The name of cell `id`.
    pub fn cell_name(&self, id: CellId) -> &ArcStr {
        self.cell(id).name()
    }

    /// Returns the instance array identified by `id`.
    pub fn inst(&self, id: InstId) -> &InstArray {
        &self.cell(id.cell).insts()[id.index as usize]
    }

    /// Returns `true` if [`finalize`](Layout::finalize) has run since the
    /// last mutation.
    #[inline]
    pub fn is_finalized(&self) -> bool {
        self.hier.is_some()
    }

    fn invalidate(&mut self) {
        if self.hier.take().is_some() {
            for cell in &mut self.cells {
                cell.cache = None;
            }
        }
    }

    fn hier(&self) -> &Hier {
        self.hier.as_ref().expect("layout not finalized")
    }

    /// Validates the hierarchy and computes the indices and bounding box
    /// caches the engine relies on. Idempotent.
    pub fn finalize(&mut self) -> Result<()> {
        if self.hier.is_some() {
            return Ok(());
        }

        let n = self.cells.len();

        let mut children: Vec<Vec<CellId>> = Vec::with_capacity(n);
        for cell in &self.cells {
            let mut set = BTreeSet::new();
            for inst in cell.insts() {
                if inst.target().index() >= n {
                    return Err(Error::UnknownCell(inst.target().0));
                }
                set.insert(inst.target());
            }
            children.push(set.into_iter().collect());
        }

        // Bottom-up order: a cell is emitted once all of its children are.
        let mut pending: Vec<usize> = children.iter().map(Vec::len).collect();
        let mut rev: Vec<Vec<CellId>> = vec![Vec::new(); n];
        for (c, chs) in children.iter().enumerate() {
            for &ch in chs {
                rev[ch.index()].push(CellId(c as u32));
            }
        }
        let mut queue: VecDeque<CellId> = (0..n as u32)
            .map(CellId)
            .filter(|c| pending[c.index()] == 0)
            .collect();
        let mut bottom_up = Vec::with_capacity(n);
        while let Some(c) = queue.pop_front() {
            bottom_up.push(c);
            for &p in &rev[c.index()] {
                pending[p.index()] -= 1;
                if pending[p.index()] == 0 {
                    queue.push_back(p);
                }
            }
        }
        if bottom_up.len() < n {
            let stuck = (0..n).find(|&c| pending[c] > 0).unwrap();
            return Err(Error::RecursiveHierarchy(self.cells[stuck].name().clone()));
        }

        let mut parents: Vec<Vec<InstId>> = vec![Vec::new(); n];
        let mut parent_cells: Vec<BTreeSet<CellId>> = vec![BTreeSet::new(); n];
        for (c, cell) in self.cells.iter().enumerate() {
            for (i, inst) in cell.insts().iter().enumerate() {
                parents[inst.target().index()].push(InstId::new(CellId(c as u32), i as u32));
                parent_cells[inst.target().index()].insert(CellId(c as u32));
            }
        }

        for &c in &bottom_up {
            let cache = compute_cache(&self.cells, c);
            self.cells[c.index()].cache = Some(cache);
        }

        self.hier = Some(Hier {
            bottom_up,
            parents,
            parent_cells: parent_cells
                .into_iter()
                .map(|set| set.into_iter().collect())
                .collect(),
            children,
        });
        Ok(())
    }

    /// Iterates all cells, children before parents.
    pub fn bottom_up(&self) -> impl Iterator<Item = CellId> + '_ {
        self.hier().bottom_up.iter().copied()
    }

    /// The instance arrays instantiating cell `id`.
    pub fn parent_insts(&self, id: CellId) -> &[InstId] {
        &self.hier().parents[id.index()]
    }

    /// The distinct cells instantiating cell `id`, ascending.
    pub fn parent_cells(&self, id: CellId) -> &[CellId] {
        &self.hier().parent_cells[id.index()]
    }

    /// The distinct cells instantiated by cell `id`, ascending.
    pub fn child_cells(&self, id: CellId) -> &[CellId] {
        &self.hier().children[id.index()]
    }

    /// The set of cells transitively instantiated by `top`, including `top`.
    pub fn collect_called_cells(&self, top: CellId) -> BTreeSet<CellId> {
        let mut called = BTreeSet::new();
        let mut stack = vec![top];
        while let Some(c) = stack.pop() {
            if called.insert(c) {
                stack.extend(self.child_cells(c).iter().copied());
            }
        }
        called
    }

    /// The hierarchical bounding box of cell `id`.
    pub fn cell_bbox(&self, id: CellId) -> Bbox {
        self.cell(id).bbox()
    }

    /// The bounding box of one instance array, based on raw cell boxes.
    pub fn inst_bbox(&self, inst: &InstArray) -> Bbox {
        inst.bbox_from(self.cell_bbox(inst.target()))
    }

    /// The instances of `cell` whose array box touches `query`.
    pub fn touching_insts(&self, cell: CellId, query: Bbox) -> Vec<InstId> {
        self.cell(cell)
            .insts()
            .iter()
            .enumerate()
            .filter(|(_, inst)| self.inst_bbox(inst).touches(&query))
            .map(|(i, _)| InstId::new(cell, i as u32))
            .collect()
    }

    /// The placements of `inst` whose raw cell box touches `query`.
    pub fn inst_touching_placements(&self, inst: &InstArray, query: Bbox) -> Vec<usize> {
        inst.touching_placements(self.cell_bbox(inst.target()), query)
            .collect()
    }
}

/// Computes the bounding box caches for one cell. Its children must have
/// been computed already.
fn compute_cache(cells: &[Cell], id: CellId) -> CellCache {
    let cell = &cells[id.0 as usize];

    let mut layer_bboxes: BTreeMap<LayerId, Bbox> = BTreeMap::new();
    for layer in cell.shape_layers() {
        let bx = cell.local_layer_bbox(layer);
        if !bx.is_empty() {
            layer_bboxes.insert(layer, bx);
        }
    }

    for inst in cell.insts() {
        let child = &cells[inst.target().0 as usize];
        let child_cache = child.cache.as_ref().expect("children computed first");
        for (&layer, &child_box) in &child_cache.layer_bboxes {
            let bx = inst.bbox_from(child_box);
            layer_bboxes
                .entry(layer)
                .and_modify(|e| *e = e.union(&bx))
                .or_insert(bx);
        }
    }

    let mut bbox = Bbox::empty();
    for bx in layer_bboxes.values() {
        bbox = bbox.union(bx);
    }

    CellCache { bbox, layer_bboxes }
}
