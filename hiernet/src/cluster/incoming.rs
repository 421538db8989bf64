//! The inverse connection index: which parent clusters reach into a cell.

use std::collections::{BTreeSet, HashMap};

use super::hier::HierClusters;
use super::ClusterId;
use crate::layout::{CellId, InstElement, Layout};

static EMPTY_INCOMING: Vec<IncomingClusterInstance> = Vec::new();

/// One parent-side reference to a child cluster: the parent cell, the
/// parent cluster owning the edge, and the placement through which the
/// child cluster is reached.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IncomingClusterInstance {
    pub cell: CellId,
    pub cluster_id: ClusterId,
    pub inst: InstElement,
}

/// Lazily computes, per cell, the parent-side references into each of its
/// clusters.
///
/// On the first query for a cell, all parent cells within the build scope
/// are walked recursively and their connection maps are inverted. Results
/// are memoized per cell.
pub struct IncomingClusterConnections<'a> {
    layout: &'a Layout,
    hc: &'a HierClusters,
    called: BTreeSet<CellId>,
    incoming: HashMap<CellId, HashMap<ClusterId, Vec<IncomingClusterInstance>>>,
}

impl<'a> IncomingClusterConnections<'a> {
    /// Creates the index for the hierarchy below (and including) `top`.
    pub fn new(layout: &'a Layout, top: CellId, hc: &'a HierClusters) -> Self {
        Self {
            layout,
            hc,
            called: layout.collect_called_cells(top),
            incoming: HashMap::new(),
        }
    }

    /// Returns `true` if any parent cluster refers into cluster
    /// `cluster_id` of cell `ci`.
    pub fn has_incoming(&mut self, ci: CellId, cluster_id: ClusterId) -> bool {
        self.ensure_queried(ci);
        self.incoming
            .get(&ci)
            .is_some_and(|m| m.contains_key(&cluster_id))
    }

    /// The parent-side references into cluster `cluster_id` of cell `ci`.
    pub fn incoming(&mut self, ci: CellId, cluster_id: ClusterId) -> &[IncomingClusterInstance] {
        self.ensure_queried(ci);
        self.incoming
            .get(&ci)
            .and_then(|m| m.get(&cluster_id))
            .map(Vec::as_slice)
            .unwrap_or(&EMPTY_INCOMING)
    }

    fn ensure_queried(&mut self, ci: CellId) {
        if !self.incoming.contains_key(&ci) {
            self.ensure_computed(ci);
        }
    }

    fn ensure_computed(&mut self, ci: CellId) {
        self.incoming.entry(ci).or_default();

        let layout = self.layout;
        for &pc in layout.parent_cells(ci) {
            if self.called.contains(&pc) {
                self.ensure_computed_parent(pc);
            }
        }

        self.called.remove(&ci);
    }

    fn ensure_computed_parent(&mut self, pc: CellId) {
        self.ensure_computed(pc);

        let layout = self.layout;
        let hc = self.hc;
        let cc = hc.clusters_per_cell(pc);
        for (cluster_id, conns) in cc.connections() {
            for ci in conns {
                let child_cell = layout.inst(ci.inst.inst).target();
                self.incoming
                    .entry(child_cell)
                    .or_default()
                    .entry(ci.id)
                    .or_default()
                    .push(IncomingClusterInstance {
                        cell: pc,
                        cluster_id,
                        inst: ci.inst,
                    });
            }
        }
    }
}
