//! Depth-first traversal of a net across the hierarchy.

use hiergeom::trans::Trans;
use hiergeom::PolyRef;

use super::hier::HierClusters;
use super::{ClusterId, ClusterInstance};
use crate::layout::{CellId, Layout};
use crate::LayerId;

#[derive(Debug)]
struct Frame<'a> {
    cell: CellId,
    id: ClusterId,
    trans: Trans,
    conns: &'a [ClusterInstance],
    pos: usize,
}

/// Walks a net depth-first through its cluster connections, materializing
/// each visited local cluster's shapes on one layer together with the
/// accumulated transformation into the starting cell's frame.
///
/// The cursor API ([`at_end`](Self::at_end), [`shape`](Self::shape),
/// [`trans`](Self::trans), [`advance`](Self::advance)) exposes the current
/// position; the [`Iterator`] impl yields `(shape, trans)` pairs.
pub struct RecursiveClusterShapeIterator<'a> {
    hc: &'a HierClusters,
    layout: &'a Layout,
    layer: LayerId,
    frames: Vec<Frame<'a>>,
    shapes: &'a [PolyRef],
    shape_pos: usize,
}

impl<'a> RecursiveClusterShapeIterator<'a> {
    /// Positions the iterator on the first shape of the net rooted at
    /// cluster `id` of `cell`, restricted to `layer`.
    pub fn new(
        hc: &'a HierClusters,
        layout: &'a Layout,
        layer: LayerId,
        cell: CellId,
        id: ClusterId,
    ) -> Self {
        let mut it = Self {
            hc,
            layout,
            layer,
            frames: Vec::new(),
            shapes: &[],
            shape_pos: 0,
        };
        it.down(cell, id, Trans::identity());
        while it.shape_at_end() && !it.frames.is_empty() {
            it.next_conn();
        }
        it
    }

    /// Returns `true` once the traversal is exhausted.
    #[inline]
    pub fn at_end(&self) -> bool {
        self.frames.is_empty()
    }

    /// The cell of the currently visited cluster.
    pub fn cell_index(&self) -> CellId {
        self.frames.last().expect("iterator at end").cell
    }

    /// The id of the currently visited cluster.
    pub fn cluster_id(&self) -> ClusterId {
        self.frames.last().expect("iterator at end").id
    }

    /// The accumulated transformation from the current cluster's frame into
    /// the starting cell's frame.
    pub fn trans(&self) -> Trans {
        self.frames.last().expect("iterator at end").trans
    }

    /// The current shape.
    pub fn shape(&self) -> &'a PolyRef {
        &self.shapes[self.shape_pos]
    }

    /// The chain of cluster instances leading to the current cluster; empty
    /// at the root.
    pub fn inst_path(&self) -> Vec<ClusterInstance> {
        if self.frames.is_empty() {
            return Vec::new();
        }
        self.frames[..self.frames.len() - 1]
            .iter()
            .map(|f| f.conns[f.pos])
            .collect()
    }

    /// Steps to the next shape of the net.
    pub fn advance(&mut self) {
        self.shape_pos += 1;
        while self.shape_at_end() && !self.frames.is_empty() {
            self.next_conn();
        }
    }

    fn shape_at_end(&self) -> bool {
        self.shape_pos >= self.shapes.len()
    }

    fn next_conn(&mut self) {
        let top = self.frames.last().expect("frames not empty");
        if top.pos < top.conns.len() {
            let cli = top.conns[top.pos];
            let inst = self.layout.inst(cli.inst.inst);
            let t = inst.placement_trans(cli.inst.placement as usize);
            self.down(inst.target(), cli.id, t);
        } else {
            loop {
                self.frames.pop();
                let Some(top) = self.frames.last_mut() else {
                    return;
                };
                top.pos += 1;
                if top.pos < top.conns.len() {
                    break;
                }
            }
        }
    }

    fn down(&mut self, cell: CellId, id: ClusterId, t: Trans) {
        let hc = self.hc;
        let cc = hc.clusters_per_cell(cell);
        let trans = match self.frames.last() {
            Some(f) => f.trans * t,
            None => t,
        };
        self.frames.push(Frame {
            cell,
            id,
            trans,
            conns: cc.connections_for(id),
            pos: 0,
        });
        self.shapes = cc.locals().cluster_by_id(id).shapes(self.layer);
        self.shape_pos = 0;
    }
}

impl Iterator for RecursiveClusterShapeIterator<'_> {
    type Item = (PolyRef, Trans);

    fn next(&mut self) -> Option<Self::Item> {
        if self.at_end() {
            return None;
        }
        let item = (self.shape().clone(), self.trans());
        self.advance();
        Some(item)
    }
}

/// The same depth-first walk as [`RecursiveClusterShapeIterator`], visiting
/// each `(cell, cluster)` node of the net without materializing shapes.
pub struct RecursiveClusterIterator<'a> {
    hc: &'a HierClusters,
    layout: &'a Layout,
    frames: Vec<Frame<'a>>,
}

impl<'a> RecursiveClusterIterator<'a> {
    pub fn new(hc: &'a HierClusters, layout: &'a Layout, cell: CellId, id: ClusterId) -> Self {
        let mut it = Self {
            hc,
            layout,
            frames: Vec::new(),
        };
        it.down(cell, id);
        it
    }

    #[inline]
    pub fn at_end(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn cell_index(&self) -> CellId {
        self.frames.last().expect("iterator at end").cell
    }

    pub fn cluster_id(&self) -> ClusterId {
        self.frames.last().expect("iterator at end").id
    }

    /// The chain of cluster instances leading to the current cluster.
    pub fn inst_path(&self) -> Vec<ClusterInstance> {
        if self.frames.is_empty() {
            return Vec::new();
        }
        self.frames[..self.frames.len() - 1]
            .iter()
            .map(|f| f.conns[f.pos])
            .collect()
    }

    pub fn advance(&mut self) {
        loop {
            let Some(top) = self.frames.last() else {
                return;
            };
            if top.pos < top.conns.len() {
                break;
            }
            self.frames.pop();
            if let Some(top) = self.frames.last_mut() {
                top.pos += 1;
            } else {
                return;
            }
        }
        let top = self.frames.last().expect("frames not empty");
        let cli = top.conns[top.pos];
        let inst = self.layout.inst(cli.inst.inst);
        self.down(inst.target(), cli.id);
    }

    fn down(&mut self, cell: CellId, id: ClusterId) {
        let hc = self.hc;
        let cc = hc.clusters_per_cell(cell);
        self.frames.push(Frame {
            cell,
            id,
            trans: Trans::identity(),
            conns: cc.connections_for(id),
            pos: 0,
        });
    }
}

impl Iterator for RecursiveClusterIterator<'_> {
    type Item = (CellId, ClusterId);

    fn next(&mut self) -> Option<Self::Item> {
        if self.at_end() {
            return None;
        }
        let item = (self.cell_index(), self.cluster_id());
        self.advance();
        Some(item)
    }
}
