//! Shared helpers for the connectivity integration tests.

use std::collections::BTreeSet;

use hiergeom::bbox::Bbox;
use hiergeom::trans::{Trans, Transform};
use hiergeom::Rect;
use hiernet::cluster::{HierClusters, RecursiveClusterShapeIterator};
use hiernet::connectivity::Connectivity;
use hiernet::layout::{CellId, Layout, ShapeFilter};
use hiernet::LayerId;

/// A net, keyed by the world-space bounding boxes of its member shapes.
pub type NetKey = BTreeSet<(LayerId, (i64, i64, i64, i64))>;

pub fn rect(x0: i64, y0: i64, x1: i64, y1: i64) -> Rect {
    Rect::from_coords(x0, y0, x1, y1)
}

/// Finalizes the layout and runs the engine from `top`.
pub fn build(layout: &mut Layout, top: CellId, conn: &Connectivity) -> HierClusters {
    layout.finalize().expect("layout finalizes");
    let mut hc = HierClusters::new();
    hc.build(layout, top, ShapeFilter::all(), conn)
        .expect("build succeeds");
    hc
}

fn bbox_key(b: Bbox) -> (i64, i64, i64, i64) {
    (b.p0.x, b.p0.y, b.p1.x, b.p1.y)
}

/// Enumerates every net visible from `top` as a set of world-space shapes.
///
/// Each root cluster of each cell contributes one net per instantiation
/// path of that cell, which is exactly the flat-view partition.
pub fn world_nets(
    layout: &Layout,
    hc: &HierClusters,
    top: CellId,
    layers: &[LayerId],
) -> Vec<NetKey> {
    let mut nets = Vec::new();
    collect_nets(layout, hc, top, Trans::identity(), layers, &mut nets);
    nets.sort();
    nets
}

fn collect_nets(
    layout: &Layout,
    hc: &HierClusters,
    cell: CellId,
    trans: Trans,
    layers: &[LayerId],
    nets: &mut Vec<NetKey>,
) {
    let cc = hc.clusters_per_cell(cell);
    for id in cc.all_ids() {
        if !cc.is_root(id) {
            continue;
        }
        let mut net = NetKey::new();
        for &layer in layers {
            for (s, t) in RecursiveClusterShapeIterator::new(hc, layout, layer, cell, id) {
                let world = s.resolved().transformed(trans * t);
                net.insert((layer, bbox_key(world.bbox())));
            }
        }
        if !net.is_empty() {
            nets.push(net);
        }
    }
    for inst in layout.cell(cell).insts() {
        for k in 0..inst.size() {
            collect_nets(
                layout,
                hc,
                inst.target(),
                trans * inst.placement_trans(k),
                layers,
                nets,
            );
        }
    }
}

/// Flattens everything below `top` into a single cell of a fresh layout.
pub fn flatten(layout: &Layout, top: CellId) -> (Layout, CellId) {
    let mut flat = Layout::new();
    let c = flat.add_cell("flat").expect("fresh layout");
    flatten_into(layout, top, Trans::identity(), &mut flat, c);
    (flat, c)
}

fn flatten_into(src: &Layout, cell: CellId, trans: Trans, out: &mut Layout, into: CellId) {
    let c = src.cell(cell);
    let layers: Vec<LayerId> = c.shape_layers().collect();
    for layer in layers {
        for e in c.shape_entries(layer) {
            let world = e.poly_ref().resolved().transformed(trans);
            out.cell_mut(into).add_shape_with_attr(layer, world, e.attr());
        }
    }
    for inst in c.insts() {
        for k in 0..inst.size() {
            flatten_into(
                src,
                inst.target(),
                trans * inst.placement_trans(k),
                out,
                into,
            );
        }
    }
}

/// Verifies that the hierarchical net partition matches the partition
/// obtained by flattening the layout and re-running the engine.
pub fn assert_equivalent_to_flat(
    layout: &Layout,
    hc: &HierClusters,
    top: CellId,
    conn: &Connectivity,
    layers: &[LayerId],
) {
    let hier_nets = world_nets(layout, hc, top, layers);

    let (mut flat, fc) = flatten(layout, top);
    flat.finalize().expect("flat layout finalizes");
    let mut fhc = HierClusters::new();
    fhc.build(&flat, fc, ShapeFilter::all(), conn)
        .expect("flat build succeeds");
    let flat_nets = world_nets(&flat, &fhc, fc, layers);

    assert_eq!(hier_nets, flat_nets, "hierarchical and flat nets differ");
}
