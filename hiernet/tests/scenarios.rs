//! End-to-end scenarios for the hierarchical connectivity engine.

use hiergeom::trans::{Rot, Trans};
use hiergeom::Point;
use hiernet::cluster::{ClusterId, HierClusters, RecursiveClusterIterator};
use hiernet::connectivity::Connectivity;
use hiernet::layout::{InstArray, Layout};

use common::{assert_equivalent_to_flat, build, rect, world_nets, NetKey};

mod common;

fn net(shapes: &[(u32, (i64, i64, i64, i64))]) -> NetKey {
    shapes.iter().copied().collect()
}

/// One cluster id carrying connections and rooted in the given cell.
fn root_connector(hc: &HierClusters, cell: hiernet::layout::CellId) -> ClusterId {
    let cc = hc.clusters_per_cell(cell);
    let mut roots = cc
        .all_ids()
        .filter(|&id| cc.is_root(id) && !cc.connections_for(id).is_empty());
    let id = roots.next().expect("a root connector exists");
    assert!(roots.next().is_none(), "exactly one root connector");
    id
}

#[test]
fn s1_single_cell_two_nets() {
    let mut conn = Connectivity::new();
    conn.connect(0, 1);

    let mut layout = Layout::new();
    let top = layout.add_cell("top").unwrap();
    layout.cell_mut(top).add_shape(0, rect(0, 0, 10, 10));
    layout.cell_mut(top).add_shape(1, rect(5, 5, 15, 15));
    layout.cell_mut(top).add_shape(0, rect(100, 100, 110, 110));

    let hc = build(&mut layout, top, &conn);

    assert_eq!(hc.clusters_per_cell(top).locals().len(), 2);
    let nets = world_nets(&layout, &hc, top, &[0, 1]);
    assert_eq!(
        nets,
        vec![
            net(&[(0, (0, 0, 10, 10)), (1, (5, 5, 15, 15))]),
            net(&[(0, (100, 100, 110, 110))]),
        ]
    );
}

#[test]
fn s2_two_placements_one_net() {
    let mut conn = Connectivity::new();
    conn.connect_self(0);

    let mut layout = Layout::new();
    let child = layout.add_cell("child").unwrap();
    let top = layout.add_cell("top").unwrap();
    layout.cell_mut(child).add_shape(0, rect(0, 0, 12, 2));
    layout
        .cell_mut(top)
        .add_inst(InstArray::new(child, Trans::identity()));
    layout
        .cell_mut(top)
        .add_inst(InstArray::new(child, Trans::translate(Point::new(10, 0))));

    let hc = build(&mut layout, top, &conn);

    // The net is carried by a dummy connector in the top cell; the child
    // cluster is no longer a root.
    let top_cc = hc.clusters_per_cell(top);
    assert_eq!(top_cc.locals().len(), 0);
    let d = root_connector(&hc, top);
    assert_eq!(top_cc.connections_for(d).len(), 2);
    assert!(!hc.clusters_per_cell(child).is_root(1));

    let nets = world_nets(&layout, &hc, top, &[0]);
    assert_eq!(
        nets,
        vec![net(&[(0, (0, 0, 12, 2)), (0, (10, 0, 22, 2))])]
    );
    assert_equivalent_to_flat(&layout, &hc, top, &conn, &[0]);
}

#[test]
fn s3_array_members_fuse_into_one_net() {
    let mut conn = Connectivity::new();
    conn.connect_self(0);

    let mut layout = Layout::new();
    let child = layout.add_cell("child").unwrap();
    let top = layout.add_cell("top").unwrap();
    layout.cell_mut(child).add_shape(0, rect(0, 0, 11, 2));
    layout.cell_mut(top).add_inst(InstArray::array(
        child,
        Trans::identity(),
        Point::new(10, 0),
        3,
        Point::new(0, 0),
        1,
    ));

    let hc = build(&mut layout, top, &conn);

    let d = root_connector(&hc, top);
    assert_eq!(hc.clusters_per_cell(top).connections_for(d).len(), 3);

    let nets = world_nets(&layout, &hc, top, &[0]);
    assert_eq!(
        nets,
        vec![net(&[
            (0, (0, 0, 11, 2)),
            (0, (10, 0, 21, 2)),
            (0, (20, 0, 31, 2)),
        ])]
    );
    assert_equivalent_to_flat(&layout, &hc, top, &conn, &[0]);
}

#[test]
fn s4_sibling_children_connect_through_dummy() {
    let mut conn = Connectivity::new();
    conn.connect(0, 1);

    let mut layout = Layout::new();
    let child_a = layout.add_cell("a").unwrap();
    let child_b = layout.add_cell("b").unwrap();
    let top = layout.add_cell("top").unwrap();
    layout.cell_mut(child_a).add_shape(0, rect(0, 0, 10, 10));
    layout.cell_mut(child_b).add_shape(1, rect(0, 0, 10, 10));
    layout
        .cell_mut(top)
        .add_inst(InstArray::new(child_a, Trans::identity()));
    layout
        .cell_mut(top)
        .add_inst(InstArray::new(child_b, Trans::translate(Point::new(5, 0))));

    let hc = build(&mut layout, top, &conn);

    let d = root_connector(&hc, top);
    assert_eq!(hc.clusters_per_cell(top).connections_for(d).len(), 2);
    assert!(!hc.clusters_per_cell(child_a).is_root(1));
    assert!(!hc.clusters_per_cell(child_b).is_root(1));

    let nets = world_nets(&layout, &hc, top, &[0, 1]);
    assert_eq!(
        nets,
        vec![net(&[(0, (0, 0, 10, 10)), (1, (5, 0, 15, 10))])]
    );
    assert_equivalent_to_flat(&layout, &hc, top, &conn, &[0, 1]);
}

#[test]
fn s5_three_level_promotion() {
    let mut conn = Connectivity::new();
    conn.connect_self(0);

    let mut layout = Layout::new();
    let grandchild = layout.add_cell("grandchild").unwrap();
    let c1 = layout.add_cell("c1").unwrap();
    let c2 = layout.add_cell("c2").unwrap();
    let top = layout.add_cell("top").unwrap();

    layout.cell_mut(grandchild).add_shape(0, rect(0, 0, 12, 2));
    layout
        .cell_mut(c1)
        .add_inst(InstArray::new(grandchild, Trans::identity()));
    layout
        .cell_mut(c2)
        .add_inst(InstArray::new(grandchild, Trans::identity()));
    layout
        .cell_mut(top)
        .add_inst(InstArray::new(c1, Trans::identity()));
    layout
        .cell_mut(top)
        .add_inst(InstArray::new(c2, Trans::translate(Point::new(10, 0))));

    let hc = build(&mut layout, top, &conn);

    // Root promotion walked through both intermediate cells: each carries a
    // dummy pointing at the grandchild cluster, and the net roots at top.
    assert!(!hc.clusters_per_cell(grandchild).is_root(1));
    let d1 = root_connector(&hc, top);
    assert_eq!(hc.clusters_per_cell(top).connections_for(d1).len(), 2);
    for mid in [c1, c2] {
        let cc = hc.clusters_per_cell(mid);
        let connectors: Vec<ClusterId> = cc
            .all_ids()
            .filter(|&id| !cc.connections_for(id).is_empty())
            .collect();
        assert_eq!(connectors.len(), 1);
        assert!(!cc.is_root(connectors[0]));
    }

    // The DFS visits top, both intermediate connectors, and the grandchild
    // cluster once per branch.
    let nodes: Vec<_> = RecursiveClusterIterator::new(&hc, &layout, top, d1).collect();
    assert_eq!(nodes.len(), 5);
    assert_eq!(
        nodes.iter().filter(|&&(cell, _)| cell == grandchild).count(),
        2
    );

    let nets = world_nets(&layout, &hc, top, &[0]);
    assert_eq!(
        nets,
        vec![net(&[(0, (0, 0, 12, 2)), (0, (10, 0, 22, 2))])]
    );
    assert_equivalent_to_flat(&layout, &hc, top, &conn, &[0]);
}

#[test]
fn s6_no_shapes_on_connectivity_layers() {
    let mut conn = Connectivity::new();
    conn.connect_self(0);

    let mut layout = Layout::new();
    let child = layout.add_cell("child").unwrap();
    let top = layout.add_cell("top").unwrap();
    // Shapes exist, but only on a layer outside the connectivity.
    layout.cell_mut(child).add_shape(3, rect(0, 0, 10, 10));
    layout
        .cell_mut(top)
        .add_inst(InstArray::new(child, Trans::identity()));

    let hc = build(&mut layout, top, &conn);

    for cell in [child, top] {
        let cc = hc.clusters_per_cell(cell);
        assert_eq!(cc.locals().len(), 0);
        assert_eq!(cc.all_ids().count(), 0);
    }
    assert!(world_nets(&layout, &hc, top, &[0, 3]).is_empty());
}

#[test]
fn rotated_placements_connect_exactly() {
    let mut conn = Connectivity::new();
    conn.connect_self(0);

    let mut layout = Layout::new();
    let child = layout.add_cell("child").unwrap();
    let top = layout.add_cell("top").unwrap();
    layout.cell_mut(child).add_shape(0, rect(0, 0, 10, 2));

    // One placement as-is, one rotated by 90 degrees so that its left edge
    // touches the first box's right edge.
    layout
        .cell_mut(top)
        .add_inst(InstArray::new(child, Trans::identity()));
    layout.cell_mut(top).add_inst(InstArray::new(
        child,
        Trans::new(Rot::R90, false, Point::new(12, 0)),
    ));

    let hc = build(&mut layout, top, &conn);

    // Rotated box occupies (10, 0)..(12, 10): edge contact with the first.
    let nets = world_nets(&layout, &hc, top, &[0]);
    assert_eq!(
        nets,
        vec![net(&[(0, (0, 0, 10, 2)), (0, (10, 0, 12, 10))])]
    );
    assert_equivalent_to_flat(&layout, &hc, top, &conn, &[0]);
}
