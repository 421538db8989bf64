//! The layer connectivity relation.

use std::collections::{BTreeMap, BTreeSet};

use hiergeom::interact::interact;
use hiergeom::trans::{Trans, Transform};
use hiergeom::PolyRef;

use crate::LayerId;

static EMPTY_LAYERS: BTreeSet<LayerId> = BTreeSet::new();

/// A symmetric relation over layers declaring which layer pairs are
/// electrically connected when their shapes touch or overlap.
///
/// A layer may be connected to itself, in which case intra-layer touching
/// produces nets. Layers unknown to the relation never interact.
#[derive(Debug, Default, Clone)]
pub struct Connectivity {
    connected: BTreeMap<LayerId, BTreeSet<LayerId>>,
    all_layers: BTreeSet<LayerId>,
}

impl Connectivity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares layers `la` and `lb` connected (symmetrically).
    pub fn connect(&mut self, la: LayerId, lb: LayerId) {
        self.connected.entry(la).or_default().insert(lb);
        self.connected.entry(lb).or_default().insert(la);
        self.all_layers.insert(la);
        self.all_layers.insert(lb);
    }

    /// Declares layer `l` connected to itself.
    pub fn connect_self(&mut self, l: LayerId) {
        self.connected.entry(l).or_default().insert(l);
        self.all_layers.insert(l);
    }

    /// Iterates over all participating layers, in ascending order.
    pub fn layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.all_layers.iter().copied()
    }

    /// Iterates over the layers connected to `layer`, in ascending order.
    ///
    /// Unknown layers yield an empty iteration.
    pub fn connected_layers(&self, layer: LayerId) -> impl Iterator<Item = LayerId> + '_ {
        self.connected
            .get(&layer)
            .unwrap_or(&EMPTY_LAYERS)
            .iter()
            .copied()
    }

    /// Returns `true` if layers `la` and `lb` are declared connected.
    pub fn is_connected(&self, la: LayerId, lb: LayerId) -> bool {
        self.connected
            .get(&la)
            .is_some_and(|set| set.contains(&lb))
    }

    /// Returns `true` if shape `a` on layer `la` and shape `b` on layer `lb`
    /// are electrically connected: the layers must be declared connected and
    /// the shapes must geometrically interact.
    ///
    /// `trans` takes the coordinate frame of `b` into the frame of `a`.
    pub fn interacts(
        &self,
        a: &PolyRef,
        la: LayerId,
        b: &PolyRef,
        lb: LayerId,
        trans: Trans,
    ) -> bool {
        if !self.is_connected(la, lb) {
            return false;
        }
        interaction_test(a, b, trans)
    }
}

fn interaction_test(a: &PolyRef, b: &PolyRef, trans: Trans) -> bool {
    // The unit transform is the common case for intra-cell tests; skip the
    // composition there.
    let bt = if trans.is_unity() {
        b.trans()
    } else {
        trans * b.trans()
    };
    if a.is_box() && b.is_box() {
        let ba = a.obj().bbox().transformed(a.trans());
        let bb = b.obj().bbox().transformed(bt);
        ba.touches(&bb)
    } else {
        interact(&a.resolved(), &b.obj().transformed(bt))
    }
}
