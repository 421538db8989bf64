//! Hierarchical clusters: per-cell clusters stitched bottom-up.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::OnceLock;

use hiergeom::bbox::Bbox;
use hiergeom::trans::{Trans, Transform};

use super::connected::ConnectedClusters;
use super::iter::RecursiveClusterShapeIterator;
use super::local::LocalCluster;
use super::{ClusterId, ClusterInstance};
use crate::connectivity::Connectivity;
use crate::error::{Error, Result};
use crate::layout::{CellId, InstElement, InstId, Layout, ShapeFilter};
use crate::log::{debug, trace};
use crate::scan::{BcFn, BoxScanner, BoxScanner2, ScanReceiver, ScanReceiver2};
use crate::LayerId;

/// Options governing a [`HierClusters::build_with`] run.
#[derive(Debug, Clone, Copy)]
pub struct BuildOpts {
    /// Which shape kinds participate in clustering.
    pub filter: ShapeFilter,
    /// Local clusters whose area ratio reaches this threshold are split
    /// before the local-to-instance scan to keep the spatial index tight.
    pub area_ratio: f64,
}

impl Default for BuildOpts {
    fn default() -> Self {
        Self {
            filter: ShapeFilter::all(),
            area_ratio: 10.0,
        }
    }
}

fn empty_connected() -> &'static ConnectedClusters {
    static EMPTY: OnceLock<ConnectedClusters> = OnceLock::new();
    EMPTY.get_or_init(ConnectedClusters::new)
}

/// The per-cell map of connected clusters for a whole layout, built
/// bottom-up from a top cell.
#[derive(Debug, Default)]
pub struct HierClusters {
    per_cell: HashMap<CellId, ConnectedClusters>,
}

impl HierClusters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.per_cell.clear();
    }

    /// Builds the cluster tree for everything reachable from `top` with
    /// default options.
    pub fn build(
        &mut self,
        layout: &Layout,
        top: CellId,
        filter: ShapeFilter,
        conn: &Connectivity,
    ) -> Result<()> {
        self.build_with(layout, top, BuildOpts { filter, ..Default::default() }, conn)
    }

    /// Builds the cluster tree for everything reachable from `top`.
    ///
    /// Pass 1 builds the local clusters of every called cell. Pass 2 walks
    /// the cells bottom-up and stitches each cell against its children once
    /// all of them are done.
    pub fn build_with(
        &mut self,
        layout: &Layout,
        top: CellId,
        opts: BuildOpts,
        conn: &Connectivity,
    ) -> Result<()> {
        if !layout.is_finalized() {
            return Err(Error::NotFinalized);
        }
        if top.0 as usize >= layout.num_cells() {
            return Err(Error::UnknownCell(top.0));
        }

        self.clear();

        let called = layout.collect_called_cells(top);

        debug!("computing local clusters for {} cells", called.len());
        for &c in &called {
            trace!("computing local clusters for cell {}", layout.cell_name(c));
            let cc = self.per_cell.entry(c).or_default();
            cc.build_clusters(layout.cell(c), opts.filter, conn);
        }

        debug!("computing hierarchical clusters");
        let mut boxes = CellClustersBoxes::default();
        let mut done: HashSet<CellId> = HashSet::new();
        let mut todo: Vec<CellId> = Vec::new();
        for c in layout.bottom_up() {
            if !called.contains(&c) {
                continue;
            }
            let all_available = layout.child_cells(c).iter().all(|cc| done.contains(cc));
            if all_available {
                todo.push(c);
            } else {
                assert!(!todo.is_empty());
                self.build_hier_connections_for_cells(&mut boxes, layout, &todo, opts, conn);
                done.extend(todo.iter().copied());
                todo.clear();
                todo.push(c);
            }
        }
        self.build_hier_connections_for_cells(&mut boxes, layout, &todo, opts, conn);

        Ok(())
    }

    /// The connected clusters of `cell`; an empty view for unknown cells.
    pub fn clusters_per_cell(&self, cell: CellId) -> &ConnectedClusters {
        self.per_cell.get(&cell).unwrap_or_else(|| empty_connected())
    }

    pub(crate) fn clusters_per_cell_mut(&mut self, cell: CellId) -> &mut ConnectedClusters {
        self.per_cell.entry(cell).or_default()
    }

    fn build_hier_connections_for_cells(
        &mut self,
        boxes: &mut CellClustersBoxes,
        layout: &Layout,
        cells: &[CellId],
        opts: BuildOpts,
        conn: &Connectivity,
    ) {
        for &c in cells {
            self.build_hier_connections(boxes, layout, c, opts, conn);
        }
    }

    /// Stitches one cell: analyzes instance-to-instance and local-to-
    /// instance interactions and replays the deferred joins.
    fn build_hier_connections(
        &mut self,
        boxes: &mut CellClustersBoxes,
        layout: &Layout,
        cell: CellId,
        opts: BuildOpts,
        conn: &Connectivity,
    ) {
        trace!(
            "computing hierarchical clusters for cell {}",
            layout.cell_name(cell)
        );

        boxes.ensure(layout, self, cell);
        let boxes = &*boxes;

        // The spatial index of the local clusters must not be mutated while
        // the scans run. Side 1 therefore gets split copies of the clusters
        // (same id), and local-to-local joins discovered through children
        // are deferred to `join_superclusters`.
        let mut bs2: BoxScanner2<LocalCluster, (), InstId, ()> = BoxScanner2::new();
        {
            let cc = self.per_cell.entry(cell).or_default();
            for c in cc.locals().iter() {
                let mut frags = Vec::new();
                let n = c.split(opts.area_ratio, &mut frags);
                if n == 0 {
                    bs2.insert1(c.clone(), ());
                } else {
                    for f in frags {
                        bs2.insert1(f, ());
                    }
                }
            }
        }

        let mut bs: BoxScanner<InstId, ()> = BoxScanner::new();
        for i in 0..layout.cell(cell).insts().len() {
            let id = InstId::new(cell, i as u32);
            bs.insert(id, ());
            bs2.insert2(id, ());
        }

        let inst_bc = BcFn(|i: &InstId| {
            let inst = layout.inst(*i);
            inst.bbox_from(boxes.get(inst.target()))
        });

        let mut rec = HcReceiver {
            layout,
            cell,
            tree: self,
            boxes,
            conn,
            join_sets: Vec::new(),
            join_map: HashMap::new(),
        };

        // Instance-to-instance interactions.
        bs.process(&mut rec, &inst_bc);

        // Local-to-instance interactions.
        bs2.process(&mut rec, &BcFn(|c: &LocalCluster| c.bbox()), &inst_bc);

        // Join the local clusters which got connected through children.
        rec.join_superclusters();

        self.per_cell
            .get_mut(&cell)
            .expect("local clusters built")
            .locals_mut()
            .ensure_sorted();
    }

    /// Writes one transformed shape per root cluster and mapped layer back
    /// into the layout.
    ///
    /// `layer_map` maps cluster layers to target layers. The layout loses
    /// its finalized state, as with any mutation.
    pub fn return_to_hierarchy(
        &self,
        layout: &mut Layout,
        layer_map: &BTreeMap<LayerId, LayerId>,
    ) -> Result<()> {
        if !layout.is_finalized() {
            return Err(Error::NotFinalized);
        }

        let order: Vec<CellId> = layout.bottom_up().collect();
        let mut inserts = Vec::new();
        for c in order {
            let cc = self.clusters_per_cell(c);
            for id in cc.all_ids() {
                if !cc.is_root(id) {
                    continue;
                }
                for (&from, &to) in layer_map {
                    let mut it = RecursiveClusterShapeIterator::new(self, layout, from, c, id);
                    while !it.at_end() {
                        let mut poly = it.shape().resolved();
                        let t = it.trans();
                        if !t.is_unity() {
                            poly = poly.transformed(t);
                        }
                        inserts.push((c, to, poly));
                        it.advance();
                    }
                }
            }
        }

        for (c, layer, poly) in inserts {
            layout.cell_mut(c).add_shape(layer, poly);
        }
        Ok(())
    }
}

/// Memoized per-cell total bounding boxes: the cell's local clusters plus
/// all nested instance content. Built lazily on first query per cell and
/// kept for the whole build.
#[derive(Debug, Default)]
struct CellClustersBoxes {
    cache: HashMap<CellId, Bbox>,
}

impl CellClustersBoxes {
    fn ensure(&mut self, layout: &Layout, tree: &HierClusters, cell: CellId) {
        if self.cache.contains_key(&cell) {
            return;
        }
        for inst in layout.cell(cell).insts() {
            self.ensure(layout, tree, inst.target());
        }
        let mut bx = tree.clusters_per_cell(cell).locals().bbox();
        for inst in layout.cell(cell).insts() {
            bx = bx.union(&inst.bbox_from(self.get(inst.target())));
        }
        self.cache.insert(cell, bx);
    }

    fn get(&self, cell: CellId) -> Bbox {
        self.cache.get(&cell).copied().unwrap_or_else(Bbox::empty)
    }
}

/// The central interaction tester between clusters on one hierarchical
/// level.
///
/// Employed in two box scans per cell: one investigating instance-to-
/// instance interactions and one investigating local-cluster-to-instance
/// interactions.
struct HcReceiver<'a> {
    layout: &'a Layout,
    cell: CellId,
    tree: &'a mut HierClusters,
    boxes: &'a CellClustersBoxes,
    conn: &'a Connectivity,
    join_sets: Vec<Option<BTreeSet<ClusterId>>>,
    join_map: HashMap<ClusterId, usize>,
}

impl ScanReceiver<InstId, ()> for HcReceiver<'_> {
    fn add(&mut self, i1: &InstId, _p1: &(), i2: &InstId, _p2: &()) {
        self.add_pair_insts(
            Bbox::world(),
            *i1,
            &[],
            Trans::identity(),
            *i2,
            &[],
            Trans::identity(),
        );
    }

    fn finish(&mut self, i: &InstId, _p: &()) {
        // Array members of one instance may interact among themselves.
        if self.layout.inst(*i).size() > 1 {
            self.add_single_inst(*i);
        }
    }
}

impl ScanReceiver2<LocalCluster, (), InstId, ()> for HcReceiver<'_> {
    fn add(&mut self, c1: &LocalCluster, _p1: &(), i2: &InstId, _p2: &()) {
        self.add_pair_local(c1, *i2, &[], Trans::identity());
    }
}

impl HcReceiver<'_> {
    /// Handles the cluster interactions between two instances or instance
    /// arrays.
    ///
    /// `p1`/`t1` and `p2`/`t2` are the accumulated parent paths and
    /// transformations down to (but not including) `i1` and `i2`; `common`
    /// restricts the investigation, seen from the stitched cell.
    fn add_pair_insts(
        &mut self,
        common: Bbox,
        i1: InstId,
        p1: &[InstElement],
        t1: Trans,
        i2: InstId,
        p2: &[InstElement],
        t2: Trans,
    ) {
        let layout = self.layout;
        let inst1 = layout.inst(i1);
        let inst2 = layout.inst(i2);

        let bb1 = self.boxes.get(inst1.target());
        let b1 = inst1.bbox_from(bb1).transformed(t1);
        let bb2 = self.boxes.get(inst2.target());
        let b2 = inst2.bbox_from(bb2).transformed(t2);

        let common_all = common.intersection(&b1).intersection(&b2);
        if common_all.is_empty() {
            return;
        }

        let t1i = t1.inverted();
        let t2i = t2.inverted();

        for ii1 in layout.inst_touching_placements(inst1, common_all.transformed(t1i)) {
            let tt1 = t1 * inst1.placement_trans(ii1);
            let ib1 = bb1.transformed(tt1);

            let mut pp1 = p1.to_vec();
            pp1.push(InstElement::new(i1, ii1));

            for ii2 in layout.inst_touching_placements(inst2, ib1.transformed(t2i)) {
                let tt2 = t2 * inst2.placement_trans(ii2);
                let ib2 = bb2.transformed(tt2);

                let common12 = ib1.intersection(&ib2).intersection(&common);
                if !common12.is_empty() {
                    let mut pp2 = p2.to_vec();
                    pp2.push(InstElement::new(i2, ii2));

                    self.add_single_pair_insts(
                        common12,
                        inst1.target(),
                        &pp1,
                        tt1,
                        inst2.target(),
                        &pp2,
                        tt2,
                    );

                    // Dive into the cell of ii2.
                    for jj2 in
                        layout.touching_insts(inst2.target(), common12.transformed(tt2.inverted()))
                    {
                        self.add_pair_insts(common12, i1, p1, t1, jj2, &pp2, tt2);
                    }
                }
            }

            let common1 = ib1.intersection(&b2).intersection(&common);
            if !common1.is_empty() {
                // Dive into the cell of ii1.
                for jj1 in
                    layout.touching_insts(inst1.target(), common1.transformed(tt1.inverted()))
                {
                    self.add_pair_insts(common1, jj1, &pp1, tt1, i2, p2, t2);
                }
            }
        }
    }

    /// Handles the cluster interactions between two fully resolved leaves.
    ///
    /// The last elements of `p1` and `p2` are the placements leading into
    /// `ci1` and `ci2`; `t1` and `t2` are the accumulated transformations of
    /// the full paths.
    fn add_single_pair_insts(
        &mut self,
        common: Bbox,
        ci1: CellId,
        p1: &[InstElement],
        t1: Trans,
        ci2: CellId,
        p2: &[InstElement],
        t2: Trans,
    ) {
        let layout = self.layout;
        let cell2 = layout.cell(ci2);

        let t1i = t1.inverted();
        let t2i = t2.inverted();
        let t21 = t1i * t2;

        // Collect the interacting cluster pairs first; the promotions below
        // mutate connection maps across the tree but never the cluster
        // geometry read here.
        let mut pairs: Vec<(ClusterId, ClusterId)> = Vec::new();
        {
            let cl1 = self.tree.clusters_per_cell(ci1);
            let cl2 = self.tree.clusters_per_cell(ci2);
            for i in cl1.locals().touching(common.transformed(t1i)) {
                // Skip the detailed tests if this cluster cannot interact
                // with anything in cell2 at all.
                if !i.interacts_cell(cell2, t21, self.conn) {
                    continue;
                }
                let bc1 = common.intersection(&i.bbox().transformed(t1));
                for j in cl2.locals().touching(bc1.transformed(t2i)) {
                    if i.interacts(j, t21, self.conn) {
                        pairs.push((i.id(), j.id()));
                    }
                }
            }
        }

        for (iid, jid) in pairs {
            let k1 = self.make_path(iid, p1);
            let k2 = self.make_path(jid, p2);

            let cc = self.tree.clusters_per_cell_mut(self.cell);
            let x1 = cc.find_cluster_with_connection(&k1);
            let x2 = cc.find_cluster_with_connection(&k2);

            if x1 == 0 {
                if x2 == 0 {
                    let connector = cc.insert_dummy();
                    cc.add_connection(connector, k1);
                    cc.add_connection(connector, k2);
                } else {
                    cc.add_connection(x2, k1);
                }
            } else if x2 == 0 {
                cc.add_connection(x1, k2);
            } else if x1 != x2 {
                // The edge count dominates the cost of the join; keep the
                // side with more connections as the target.
                let (x1, x2) = if cc.connections_for(x1).len() < cc.connections_for(x2).len() {
                    (x2, x1)
                } else {
                    (x1, x2)
                };
                cc.join_cluster_with(x1, x2);
                cc.remove_cluster(x2);
            }
        }
    }

    /// Discovers interactions between the members of one instance array.
    fn add_single_inst(&mut self, i: InstId) {
        let layout = self.layout;
        let inst = layout.inst(i);
        let bb = self.boxes.get(inst.target());

        for ii in 0..inst.size() {
            let tt = inst.placement_trans(ii);
            let ib = bb.transformed(tt);
            let pp = [InstElement::new(i, ii)];

            let mut any = false;

            for ii2 in layout.inst_touching_placements(inst, ib) {
                let tt2 = inst.placement_trans(ii2);
                if tt == tt2 {
                    // Skip the initial instance.
                    continue;
                }

                let ib2 = bb.transformed(tt2);
                if ib.touches(&ib2) {
                    let pp2 = [InstElement::new(i, ii2)];
                    let common = ib.intersection(&ib2);
                    self.add_single_pair_insts(
                        common,
                        inst.target(),
                        &pp,
                        tt,
                        inst.target(),
                        &pp2,
                        tt2,
                    );

                    // The descent repeats equivalent work for every member
                    // pair of a regular array.
                    for jj2 in
                        layout.touching_insts(inst.target(), common.transformed(tt2.inverted()))
                    {
                        self.add_pair_insts(common, i, &[], Trans::identity(), jj2, &pp2, tt2);
                    }

                    any = true;
                }
            }

            // Nothing is expected to happen on the remaining members either.
            if !any {
                break;
            }
        }
    }

    /// Handles one local cluster vs. the clusters reachable through a child
    /// instance or instance array.
    fn add_pair_local(&mut self, c1: &LocalCluster, i2: InstId, p2: &[InstElement], t2: Trans) {
        let layout = self.layout;
        let inst2 = layout.inst(i2);

        let b1 = c1.bbox();
        let bb2 = self.boxes.get(inst2.target());

        let t2b = t2 * inst2.base_trans();
        let cell2 = layout.cell(inst2.target());
        let b2 = cell2.bbox().transformed(t2b);

        if !b1.touches(&b2) || !c1.interacts_cell(cell2, t2b, self.conn) {
            return;
        }

        for ii2 in layout
            .inst_touching_placements(inst2, b1.intersection(&b2).transformed(t2.inverted()))
        {
            let tt2 = t2 * inst2.placement_trans(ii2);
            let ib2 = bb2.transformed(tt2);

            if b1.touches(&ib2) {
                let mut pp2 = p2.to_vec();
                pp2.push(InstElement::new(i2, ii2));

                self.add_single_pair_local(c1, inst2.target(), &pp2, tt2);

                // Dive into the cell of ii2.
                for jj2 in layout
                    .touching_insts(inst2.target(), b1.intersection(&ib2).transformed(tt2.inverted()))
                {
                    self.add_pair_local(c1, jj2, &pp2, tt2);
                }
            }
        }
    }

    /// Handles one local cluster vs. the clusters of a specific child cell.
    fn add_single_pair_local(
        &mut self,
        c1: &LocalCluster,
        ci2: CellId,
        p2: &[InstElement],
        t2: Trans,
    ) {
        let mut hits: Vec<ClusterId> = Vec::new();
        {
            let cl2 = self.tree.clusters_per_cell(ci2);
            for j in cl2.locals().touching(c1.bbox().transformed(t2.inverted())) {
                if c1.interacts(j, t2, self.conn) {
                    hits.push(j.id());
                }
            }
        }

        for jid in hits {
            let k2 = self.make_path(jid, p2);

            let cc = self.tree.clusters_per_cell_mut(self.cell);
            let other = cc.find_cluster_with_connection(&k2);
            if other > 0 {
                // A child cluster connects two clusters on this level. The
                // box trees are still being scanned, so the join is
                // buffered and applied afterwards.
                self.mark_to_join(other, c1.id());
            } else {
                cc.add_connection(c1.id(), k2);
            }
        }
    }

    /// Inserts a pair of clusters into the deferred join sets, keeping the
    /// list of sets disjoint and the id-to-set index exact.
    fn mark_to_join(&mut self, a: ClusterId, b: ClusterId) {
        let x = self.join_map.get(&a).copied();
        let y = self.join_map.get(&b).copied();

        match (x, y) {
            (None, None) => {
                let idx = self.join_sets.len();
                self.join_sets.push(Some(BTreeSet::from([a, b])));
                self.join_map.insert(a, idx);
                self.join_map.insert(b, idx);
            }
            (None, Some(y)) => {
                self.join_sets[y].as_mut().unwrap().insert(a);
                self.join_map.insert(a, y);
            }
            (Some(x), None) => {
                self.join_sets[x].as_mut().unwrap().insert(b);
                self.join_map.insert(b, x);
            }
            (Some(x), Some(y)) if x != y => {
                let yset = self.join_sets[y].take().unwrap();
                for &id in &yset {
                    self.join_map.insert(id, x);
                }
                self.join_sets[x].as_mut().unwrap().extend(yset);
            }
            _ => {}
        }
    }

    /// Replays the deferred joins collected during the scans.
    fn join_superclusters(&mut self) {
        let sets = std::mem::take(&mut self.join_sets);
        for set in sets.into_iter().flatten() {
            let mut ids = set.into_iter();
            let Some(first) = ids.next() else { continue };
            let cc = self.tree.clusters_per_cell_mut(self.cell);
            for other in ids {
                cc.join_cluster_with(first, other);
            }
        }
        self.join_map.clear();
    }

    /// Builds the [`ClusterInstance`] attaching `id` (living in the deepest
    /// cell of `path`) to the stitched cell.
    ///
    /// Cluster connections cross exactly one level of hierarchy, so the
    /// path is walked from deepest to shallowest, reusing existing parent
    /// clusters and allocating dummies where none exist. A child cluster
    /// that is still root gets promoted into every parent cell, except for
    /// the placement the caller attaches directly.
    fn make_path(&mut self, mut id: ClusterId, path: &[InstElement]) -> ClusterInstance {
        let layout = self.layout;
        assert!(!path.is_empty());
        let mut p = path.len();

        loop {
            p -= 1;
            let pe = path[p];
            let ci = ClusterInstance::new(id, pe);
            let child_cell = layout.inst(pe.inst).target();

            if p == 0 {
                if self.tree.clusters_per_cell(child_cell).is_root(id) {
                    for &pi in layout.parent_insts(child_cell) {
                        for pii in 0..layout.inst(pi).size() {
                            let ci2 = ClusterInstance::new(id, InstElement::new(pi, pii));
                            if self.cell != pi.cell || ci != ci2 {
                                let parent_cc = self.tree.clusters_per_cell_mut(pi.cell);
                                let dummy = parent_cc.insert_dummy();
                                parent_cc.add_connection(dummy, ci2);
                            }
                        }
                    }
                    self.tree.clusters_per_cell_mut(child_cell).reset_root(id);
                }

                return ci;
            }

            let pci = layout.inst(path[p - 1].inst).target();
            let parent_cluster = self
                .tree
                .clusters_per_cell(pci)
                .find_cluster_with_connection(&ci);

            if parent_cluster > 0 {
                // Taken parent.
                id = parent_cluster;
            } else {
                let mut id_new = 0;

                if self.tree.clusters_per_cell(child_cell).is_root(id) {
                    for &pi in layout.parent_insts(child_cell) {
                        for pii in 0..layout.inst(pi).size() {
                            let parent_cc = self.tree.clusters_per_cell_mut(pi.cell);
                            let dummy = parent_cc.insert_dummy();
                            let ci2 = ClusterInstance::new(id, InstElement::new(pi, pii));
                            parent_cc.add_connection(dummy, ci2);

                            if pci == pi.cell && ci == ci2 {
                                id_new = dummy;
                            }
                        }
                    }
                    self.tree.clusters_per_cell_mut(child_cell).reset_root(id);
                }

                // No taken parent: the dummy created for this placement
                // becomes the vertical connector.
                id = id_new;
                assert!(id != 0, "make_path found no parent and no dummy to adopt");
            }
        }
    }
}
