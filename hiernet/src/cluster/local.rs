//! Local clusters: nets within a single cell, ignoring hierarchy.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::OnceLock;

use hiergeom::bbox::Bbox;
use hiergeom::trans::{Trans, Transform};
use hiergeom::PolyRef;

use super::ClusterId;
use crate::connectivity::Connectivity;
use crate::layout::{Cell, ShapeFilter};
use crate::scan::{BcFn, BoxScanner, BoxScanner2, ScanReceiver, ScanReceiver2};
use crate::{AttrId, LayerId};

static EMPTY_SHAPES: Vec<PolyRef> = Vec::new();

/// One net within one cell: a multi-layer bag of shapes with a bounding box
/// and an attribute set.
///
/// Mutation marks the cluster dirty; spatial queries require
/// [`ensure_sorted`](LocalCluster::ensure_sorted) to have run since the last
/// mutation.
#[derive(Debug, Default, Clone)]
pub struct LocalCluster {
    id: ClusterId,
    shapes: BTreeMap<LayerId, Vec<PolyRef>>,
    attrs: BTreeSet<AttrId>,
    bbox: Bbox,
    size: usize,
    needs_update: bool,
}

impl LocalCluster {
    pub fn new(id: ClusterId) -> Self {
        Self {
            id,
            bbox: Bbox::empty(),
            ..Default::default()
        }
    }

    #[inline]
    pub fn id(&self) -> ClusterId {
        self.id
    }

    /// Clears the shape bag and attributes; the id is retained.
    pub fn clear(&mut self) {
        self.shapes.clear();
        self.attrs.clear();
        self.bbox = Bbox::empty();
        self.size = 0;
        self.needs_update = false;
    }

    /// Adds a shape on `layer`.
    pub fn add(&mut self, s: PolyRef, layer: LayerId) {
        self.shapes.entry(layer).or_default().push(s);
        self.size += 1;
        self.needs_update = true;
    }

    /// Records an attribute; `0` means "no attribute" and is ignored.
    pub fn add_attr(&mut self, attr: AttrId) {
        if attr > 0 {
            self.attrs.insert(attr);
        }
    }

    /// The attributes riding along with this cluster.
    #[inline]
    pub fn attrs(&self) -> &BTreeSet<AttrId> {
        &self.attrs
    }

    /// Takes over all shapes and attributes of `other`.
    pub fn join_with(&mut self, other: &LocalCluster) {
        for (&layer, bag) in &other.shapes {
            self.shapes
                .entry(layer)
                .or_default()
                .extend(bag.iter().cloned());
        }
        self.attrs.extend(other.attrs.iter().copied());
        self.size += other.size;
        self.needs_update = true;
    }

    /// The number of shapes across all layers.
    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Returns `true` if the cluster holds no shapes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// The bounding box over all shapes.
    pub fn bbox(&self) -> Bbox {
        debug_assert!(!self.needs_update, "cluster queried while dirty");
        self.bbox
    }

    /// The layers on which this cluster holds shapes, ascending.
    pub fn layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.shapes.keys().copied()
    }

    /// Flat iteration of the shapes on one layer.
    pub fn shapes(&self, layer: LayerId) -> &[PolyRef] {
        self.shapes
            .get(&layer)
            .map(Vec::as_slice)
            .unwrap_or(&EMPTY_SHAPES)
    }

    /// Sorts the shape bags for range queries and recomputes the bounding
    /// box. A no-op when the cluster is not dirty.
    pub fn ensure_sorted(&mut self) {
        if !self.needs_update {
            return;
        }
        for bag in self.shapes.values_mut() {
            bag.sort_by_cached_key(|s| {
                let bx = s.bbox();
                (bx.p0.x, bx.p0.y, bx.p1.x, bx.p1.y)
            });
        }
        let mut bbox = Bbox::empty();
        for bag in self.shapes.values() {
            for s in bag {
                bbox = bbox.union(&s.bbox());
            }
        }
        self.bbox = bbox;
        self.needs_update = false;
    }

    /// The shapes on `layer` whose boxes touch `query`. Requires a sorted
    /// cluster.
    pub fn shapes_touching(
        &self,
        layer: LayerId,
        query: Bbox,
    ) -> impl Iterator<Item = &PolyRef> + '_ {
        debug_assert!(!self.needs_update, "cluster queried while dirty");
        self.shapes(layer)
            .iter()
            .take_while(move |s| s.bbox().p0.x <= query.p1.x)
            .filter(move |s| s.bbox().touches(&query))
    }

    /// The ratio of the cluster's bounding box area to the summed bounding
    /// box areas of its shapes. A diagnostic for how spread out the cluster
    /// is; large values make the spatial index coarse.
    pub fn area_ratio(&self) -> f64 {
        let bx = self.bbox();
        if bx.is_empty() {
            return 0.0;
        }
        let mut sum: i128 = 0;
        for bag in self.shapes.values() {
            for s in bag {
                sum += s.bbox().area();
            }
        }
        if sum == 0 {
            0.0
        } else {
            bx.area() as f64 / sum as f64
        }
    }

    /// Splits the cluster along its longer bounding box axis while its area
    /// ratio is at least `max_area_ratio`, appending the fragments to `out`.
    ///
    /// All fragments keep the original cluster id. Returns the number of
    /// fragments emitted; zero means no split happened and the caller should
    /// use the original cluster.
    pub fn split(&self, max_area_ratio: f64, out: &mut Vec<LocalCluster>) -> usize {
        split_cluster(self, max_area_ratio, out)
    }

    /// Tests whether this cluster interacts with `other` under `trans` (the
    /// transformation taking `other`'s frame into this cluster's frame) for
    /// the given connectivity.
    pub fn interacts(&self, other: &LocalCluster, trans: Trans, conn: &Connectivity) -> bool {
        let common = other.bbox().transformed(trans).intersection(&self.bbox());
        if common.is_empty() {
            return false;
        }
        let common_for_other = common.transformed(trans.inverted());

        // Shortcut evaluation for disjunct layers.
        let ll1: BTreeSet<LayerId> = self
            .layers()
            .filter(|&l| self.shapes_touching(l, common).next().is_some())
            .collect();
        if ll1.is_empty() {
            return false;
        }
        let ll2: BTreeSet<LayerId> = other
            .layers()
            .filter(|&l| other.shapes_touching(l, common_for_other).next().is_some())
            .collect();
        if ll2.is_empty() {
            return false;
        }
        if !ll1
            .iter()
            .any(|&la| conn.connected_layers(la).any(|lb| ll2.contains(&lb)))
        {
            return false;
        }

        // Detailed analysis over the shapes near the common region.
        let mut scanner: BoxScanner2<PolyRef, LayerId, PolyRef, LayerId> = BoxScanner2::new();
        for l in self.layers() {
            for s in self.shapes_touching(l, common) {
                scanner.insert1(s.clone(), l);
            }
        }
        for l in other.layers() {
            for s in other.shapes_touching(l, common_for_other) {
                scanner.insert2(s.clone(), l);
            }
        }

        let mut rec = InteractionReceiver {
            conn,
            trans,
            any: false,
        };
        !scanner.process(
            &mut rec,
            &BcFn(|s: &PolyRef| s.bbox()),
            &BcFn(move |s: &PolyRef| s.bbox().transformed(trans)),
        )
    }

    /// Cheap whole-cell test: can this cluster interact with anything inside
    /// `cell` at all? Used as an early reject during hierarchical stitching.
    ///
    /// `trans` takes the cell's frame into this cluster's frame.
    pub fn interacts_cell(&self, cell: &Cell, trans: Trans, conn: &Connectivity) -> bool {
        for l in self.layers() {
            let mut bx = Bbox::empty();
            for nl in conn.connected_layers(l) {
                bx = bx.union(&cell.layer_bbox(nl));
            }
            if !bx.is_empty()
                && self
                    .shapes_touching(l, bx.transformed(trans))
                    .next()
                    .is_some()
            {
                return true;
            }
        }
        false
    }
}

struct InteractionReceiver<'a> {
    conn: &'a Connectivity,
    trans: Trans,
    any: bool,
}

impl ScanReceiver2<PolyRef, LayerId, PolyRef, LayerId> for InteractionReceiver<'_> {
    fn add(&mut self, s1: &PolyRef, l1: &LayerId, s2: &PolyRef, l2: &LayerId) {
        if self.conn.interacts(s1, *l1, s2, *l2, self.trans) {
            self.any = true;
        }
    }

    fn stop(&self) -> bool {
        self.any
    }
}

fn split_cluster(cl: &LocalCluster, max_area_ratio: f64, out: &mut Vec<LocalCluster>) -> usize {
    if cl.area_ratio() < max_area_ratio {
        return 0;
    }

    let bx = cl.bbox();
    let horiz = bx.width() > bx.height();
    let xthr = if horiz { bx.center().x } else { bx.p0.x };
    let ythr = if horiz { bx.p0.y } else { bx.center().y };

    // Split along the longer axis; members dispatch by shape box center.
    let mut a = LocalCluster::new(cl.id());
    let mut b = LocalCluster::new(cl.id());
    for layer in cl.layers() {
        for s in cl.shapes(layer) {
            let sc = s.bbox().center();
            if sc.x < xthr || sc.y < ythr {
                a.add(s.clone(), layer);
            } else {
                b.add(s.clone(), layer);
            }
        }
    }
    for &attr in cl.attrs() {
        a.add_attr(attr);
        b.add_attr(attr);
    }

    if a.size() == 0 || b.size() == 0 {
        // Give up to prevent infinite recursion.
        return 0;
    }

    a.ensure_sorted();
    b.ensure_sorted();

    let mut na = split_cluster(&a, max_area_ratio, out);
    let mut nb = split_cluster(&b, max_area_ratio, out);

    if na == 0 {
        out.push(a);
        na = 1;
    }
    if nb == 0 {
        out.push(b);
        nb = 1;
    }

    na + nb
}

/// The indexed collection of local clusters of one cell.
#[derive(Debug, Default)]
pub struct LocalClusters {
    clusters: Vec<LocalCluster>,
    bbox: Bbox,
    /// `(left edge, slot)` pairs of non-empty clusters, ascending by left
    /// edge; rebuilt by [`ensure_sorted`](LocalClusters::ensure_sorted).
    sorted_left: Vec<(i64, usize)>,
    needs_update: bool,
    next_dummy_id: usize,
}

fn empty_cluster() -> &'static LocalCluster {
    static EMPTY: OnceLock<LocalCluster> = OnceLock::new();
    EMPTY.get_or_init(|| LocalCluster::new(0))
}

impl LocalClusters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.clusters.clear();
        self.bbox = Bbox::empty();
        self.sorted_left.clear();
        self.needs_update = false;
        self.next_dummy_id = 0;
    }

    /// The size of the backing store. Dummy ids exceed this.
    #[inline]
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Returns the cluster with the given id.
    ///
    /// Ids past the backing store belong to dummy clusters; those are
    /// reported as an empty cluster rather than an error.
    pub fn cluster_by_id(&self, id: ClusterId) -> &LocalCluster {
        assert!(id > 0, "cluster id 0 is nil");
        if id > self.clusters.len() {
            empty_cluster()
        } else {
            &self.clusters[id - 1]
        }
    }

    /// Clears the cluster with the given id in place. The slot persists so
    /// that surviving ids never shift.
    pub fn remove_cluster(&mut self, id: ClusterId) {
        if id == 0 || id > self.clusters.len() {
            return;
        }
        self.clusters[id - 1].clear();
        self.needs_update = true;
    }

    /// Folds cluster `with_id` into cluster `id` and clears `with_id`.
    pub fn join_cluster_with(&mut self, id: ClusterId, with_id: ClusterId) {
        assert!(id > 0, "cluster id 0 is nil");
        if with_id == 0 || with_id > self.clusters.len() || id > self.clusters.len() {
            return;
        }

        let (lo, hi) = (id.min(with_id) - 1, id.max(with_id) - 1);
        let (left, right) = self.clusters.split_at_mut(hi);
        let (first, with) = if id < with_id {
            (&mut left[lo], &mut right[0])
        } else {
            (&mut right[0], &mut left[lo])
        };
        first.join_with(with);
        with.clear();

        self.needs_update = true;
    }

    /// Appends a blank cluster; its id is its slot index plus one.
    pub fn insert(&mut self) -> &mut LocalCluster {
        let id = self.clusters.len() + 1;
        self.clusters.push(LocalCluster::new(id));
        self.needs_update = true;
        self.clusters.last_mut().unwrap()
    }

    /// Allocates an id past the backing store for a dummy cluster.
    pub(crate) fn alloc_dummy_id(&mut self) -> ClusterId {
        self.next_dummy_id += 1;
        self.clusters.len() + self.next_dummy_id
    }

    /// The number of dummy ids allocated so far.
    pub(crate) fn dummy_count(&self) -> usize {
        self.next_dummy_id
    }

    /// Sorts all clusters and the collection index; recomputes the bounding
    /// box. A no-op when nothing changed.
    pub fn ensure_sorted(&mut self) {
        if !self.needs_update {
            return;
        }
        let mut bbox = Bbox::empty();
        let mut sorted_left = Vec::with_capacity(self.clusters.len());
        for (slot, c) in self.clusters.iter_mut().enumerate() {
            c.ensure_sorted();
            let cb = c.bbox();
            if !cb.is_empty() {
                sorted_left.push((cb.p0.x, slot));
                bbox = bbox.union(&cb);
            }
        }
        sorted_left.sort_unstable();
        self.sorted_left = sorted_left;
        self.bbox = bbox;
        self.needs_update = false;
    }

    /// The bounding box over all clusters.
    pub fn bbox(&self) -> Bbox {
        debug_assert!(!self.needs_update, "collection queried while dirty");
        self.bbox
    }

    /// The clusters whose bounding boxes touch `query`.
    pub fn touching(&self, query: Bbox) -> impl Iterator<Item = &LocalCluster> + '_ {
        debug_assert!(!self.needs_update, "collection queried while dirty");
        self.sorted_left
            .iter()
            .take_while(move |&&(left, _)| left <= query.p1.x)
            .map(|&(_, slot)| &self.clusters[slot])
            .filter(move |c| c.bbox().touches(&query))
    }

    /// Iterates all clusters, including cleared slots.
    pub fn iter(&self) -> impl Iterator<Item = &LocalCluster> + '_ {
        self.clusters.iter()
    }

    /// Builds the local clusters of `cell`: all shapes on connectivity
    /// layers are swept, and transitively interacting shapes fuse into one
    /// cluster. Untouched shapes become singletons.
    pub fn build_clusters(&mut self, cell: &Cell, filter: ShapeFilter, conn: &Connectivity) {
        let mut bs = BoxScanner::new();
        let mut slot = 0usize;
        for layer in conn.layers() {
            for (s, attr) in cell.shapes(layer, filter) {
                bs.insert(s, (layer, attr, slot));
                slot += 1;
            }
        }

        let mut rec = ClusterBuildingReceiver::new(conn);
        bs.process(&mut rec, &BcFn(|s: &PolyRef| s.bbox()));
        rec.generate_clusters(self);

        self.ensure_sorted();
    }
}

struct CandShape {
    slot: usize,
    shape: PolyRef,
    layer: LayerId,
    attr: AttrId,
}

/// The union receiver for local cluster building.
///
/// Keeps a list of cluster candidates (vectors of shapes) plus an exact
/// reverse map from shape slot to candidate. Merges move the smaller
/// candidate into the larger one.
struct ClusterBuildingReceiver<'a> {
    conn: &'a Connectivity,
    shape_to_cand: HashMap<usize, usize>,
    cands: Vec<Option<Vec<CandShape>>>,
}

impl<'a> ClusterBuildingReceiver<'a> {
    fn new(conn: &'a Connectivity) -> Self {
        Self {
            conn,
            shape_to_cand: HashMap::new(),
            cands: Vec::new(),
        }
    }

    fn new_candidate(&mut self, shapes: Vec<CandShape>) {
        let idx = self.cands.len();
        for cs in &shapes {
            self.shape_to_cand.insert(cs.slot, idx);
        }
        self.cands.push(Some(shapes));
    }

    fn push_to(&mut self, cand: usize, cs: CandShape) {
        self.shape_to_cand.insert(cs.slot, cand);
        self.cands[cand].as_mut().unwrap().push(cs);
    }

    fn generate_clusters(self, out: &mut LocalClusters) {
        for cand in self.cands.into_iter().flatten() {
            let cluster = out.insert();
            for cs in cand {
                cluster.add(cs.shape, cs.layer);
                cluster.add_attr(cs.attr);
            }
        }
    }
}

impl ScanReceiver<PolyRef, (LayerId, AttrId, usize)> for ClusterBuildingReceiver<'_> {
    fn add(
        &mut self,
        s1: &PolyRef,
        &(l1, a1, slot1): &(LayerId, AttrId, usize),
        s2: &PolyRef,
        &(l2, a2, slot2): &(LayerId, AttrId, usize),
    ) {
        if !self.conn.interacts(s1, l1, s2, l2, Trans::identity()) {
            return;
        }

        let c1 = self.shape_to_cand.get(&slot1).copied();
        let c2 = self.shape_to_cand.get(&slot2).copied();

        match (c1, c2) {
            (None, None) => self.new_candidate(vec![
                CandShape {
                    slot: slot1,
                    shape: s1.clone(),
                    layer: l1,
                    attr: a1,
                },
                CandShape {
                    slot: slot2,
                    shape: s2.clone(),
                    layer: l2,
                    attr: a2,
                },
            ]),
            (None, Some(c2)) => self.push_to(
                c2,
                CandShape {
                    slot: slot1,
                    shape: s1.clone(),
                    layer: l1,
                    attr: a1,
                },
            ),
            (Some(c1), None) => self.push_to(
                c1,
                CandShape {
                    slot: slot2,
                    shape: s2.clone(),
                    layer: l2,
                    attr: a2,
                },
            ),
            (Some(c1), Some(c2)) if c1 != c2 => {
                // Merge the smaller candidate into the larger one.
                let (target, source) = {
                    let n1 = self.cands[c1].as_ref().unwrap().len();
                    let n2 = self.cands[c2].as_ref().unwrap().len();
                    if n1 < n2 {
                        (c2, c1)
                    } else {
                        (c1, c2)
                    }
                };
                let moved = self.cands[source].take().unwrap();
                for cs in &moved {
                    self.shape_to_cand.insert(cs.slot, target);
                }
                self.cands[target].as_mut().unwrap().extend(moved);
            }
            _ => {}
        }
    }

    fn finish(&mut self, s: &PolyRef, &(layer, attr, slot): &(LayerId, AttrId, usize)) {
        if !self.shape_to_cand.contains_key(&slot) {
            self.new_candidate(vec![CandShape {
                slot,
                shape: s.clone(),
                layer,
                attr,
            }]);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use hiergeom::{Point, Polygon, Rect};

    use super::*;
    use crate::layout::Layout;

    fn shape(x0: i64, y0: i64, x1: i64, y1: i64) -> PolyRef {
        PolyRef::new(
            Arc::new(Rect::from_coords(x0, y0, x1, y1).to_polygon()),
            Trans::identity(),
        )
    }

    fn build_cell(shapes: &[(LayerId, Rect)], conn: &Connectivity) -> LocalClusters {
        let mut layout = Layout::new();
        let c = layout.add_cell("c").unwrap();
        for &(layer, r) in shapes {
            layout.cell_mut(c).add_shape(layer, r);
        }
        layout.finalize().unwrap();
        let mut clusters = LocalClusters::new();
        clusters.build_clusters(layout.cell(c), ShapeFilter::all(), conn);
        clusters
    }

    #[test]
    fn touching_shapes_fuse_into_one_cluster() {
        let mut conn = Connectivity::new();
        conn.connect(0, 1);
        let clusters = build_cell(
            &[
                (0, Rect::from_coords(0, 0, 10, 10)),
                (1, Rect::from_coords(5, 5, 15, 15)),
                (0, Rect::from_coords(100, 100, 110, 110)),
            ],
            &conn,
        );

        let sizes: Vec<usize> = clusters.iter().map(LocalCluster::size).collect();
        assert_eq!(clusters.len(), 2);
        assert!(sizes.contains(&2) && sizes.contains(&1));
    }

    #[test]
    fn unconnected_layers_stay_apart() {
        let mut conn = Connectivity::new();
        conn.connect_self(0);
        conn.connect_self(1);
        let clusters = build_cell(
            &[
                (0, Rect::from_coords(0, 0, 10, 10)),
                (1, Rect::from_coords(5, 5, 15, 15)),
            ],
            &conn,
        );
        assert_eq!(clusters.len(), 2);
    }

    #[test]
    fn attributes_ride_along() {
        let mut conn = Connectivity::new();
        conn.connect_self(0);
        let mut layout = Layout::new();
        let c = layout.add_cell("c").unwrap();
        layout
            .cell_mut(c)
            .add_shape_with_attr(0, Rect::from_coords(0, 0, 10, 10), 7);
        layout
            .cell_mut(c)
            .add_shape_with_attr(0, Rect::from_coords(10, 0, 20, 10), 9);
        layout.finalize().unwrap();
        let mut clusters = LocalClusters::new();
        clusters.build_clusters(layout.cell(c), ShapeFilter::all(), &conn);

        assert_eq!(clusters.len(), 1);
        assert_eq!(
            clusters.cluster_by_id(1).attrs().iter().copied().collect::<Vec<_>>(),
            vec![7, 9]
        );
    }

    #[test]
    fn ids_are_stable_across_remove_and_join() {
        let mut clusters = LocalClusters::new();
        for i in 0..3 {
            let c = clusters.insert();
            c.add(shape(i * 100, 0, i * 100 + 10, 10), 0);
        }
        clusters.ensure_sorted();
        assert_eq!(clusters.cluster_by_id(3).id(), 3);

        clusters.join_cluster_with(1, 2);
        clusters.ensure_sorted();
        assert_eq!(clusters.cluster_by_id(1).size(), 2);
        assert!(clusters.cluster_by_id(2).is_empty());
        assert_eq!(clusters.cluster_by_id(3).id(), 3);
        assert_eq!(clusters.len(), 3);

        clusters.remove_cluster(3);
        clusters.ensure_sorted();
        assert!(clusters.cluster_by_id(3).is_empty());
        assert_eq!(clusters.len(), 3);
    }

    #[test]
    fn out_of_range_ids_read_as_empty() {
        let clusters = LocalClusters::new();
        assert!(clusters.cluster_by_id(17).is_empty());
    }

    #[test]
    fn split_keeps_id_and_reassembles_to_original() {
        let mut cl = LocalCluster::new(5);
        // Two far-apart small shapes: a huge bbox relative to shape area.
        cl.add(shape(0, 0, 10, 10), 0);
        cl.add(shape(1000, 0, 1010, 10), 0);
        cl.add_attr(42);
        cl.ensure_sorted();
        assert!(cl.area_ratio() > 10.0);

        let mut frags = Vec::new();
        let n = cl.split(10.0, &mut frags);
        assert_eq!(n, 2);
        assert_eq!(frags.len(), 2);

        let mut rejoined = LocalCluster::new(5);
        for f in &frags {
            assert_eq!(f.id(), 5);
            rejoined.join_with(f);
        }
        rejoined.ensure_sorted();
        assert_eq!(rejoined.size(), cl.size());
        assert_eq!(rejoined.bbox(), cl.bbox());
        assert_eq!(rejoined.attrs(), cl.attrs());
    }

    #[test]
    fn split_returns_zero_for_compact_clusters() {
        let mut cl = LocalCluster::new(1);
        cl.add(shape(0, 0, 10, 10), 0);
        cl.add(shape(10, 0, 20, 10), 0);
        cl.ensure_sorted();
        let mut frags = Vec::new();
        assert_eq!(cl.split(10.0, &mut frags), 0);
        assert!(frags.is_empty());
    }

    #[test]
    fn cluster_interaction_respects_transform() {
        let mut conn = Connectivity::new();
        conn.connect_self(0);

        let mut a = LocalCluster::new(1);
        a.add(shape(0, 0, 10, 10), 0);
        a.ensure_sorted();

        let mut b = LocalCluster::new(1);
        b.add(shape(0, 0, 10, 10), 0);
        b.ensure_sorted();

        assert!(a.interacts(&b, Trans::translate(Point::new(10, 0)), &conn));
        assert!(!a.interacts(&b, Trans::translate(Point::new(11, 0)), &conn));
    }

    #[test]
    fn polygon_clusters_use_exact_interaction() {
        let mut conn = Connectivity::new();
        conn.connect_self(0);

        // Two triangles whose bounding boxes overlap but whose bodies do not.
        let t1 = PolyRef::new(
            Arc::new(Polygon::new(vec![
                Point::new(0, 0),
                Point::new(20, 0),
                Point::new(0, 20),
            ])),
            Trans::identity(),
        );
        let t2 = PolyRef::new(
            Arc::new(Polygon::new(vec![
                Point::new(19, 19),
                Point::new(20, 19),
                Point::new(20, 20),
            ])),
            Trans::identity(),
        );

        let mut a = LocalCluster::new(1);
        a.add(t1, 0);
        a.ensure_sorted();
        let mut b = LocalCluster::new(1);
        b.add(t2, 0);
        b.ensure_sorted();

        assert!(!a.interacts(&b, Trans::identity(), &conn));
    }
}
