//! Connected clusters: local clusters extended with inter-level edges.

use std::collections::{BTreeMap, HashMap, HashSet};

use super::local::LocalClusters;
use super::{ClusterId, ClusterInstance};
use crate::connectivity::Connectivity;
use crate::layout::{Cell, ShapeFilter};

static EMPTY_CONNECTIONS: Vec<ClusterInstance> = Vec::new();

/// The cluster collection of one cell together with the edges that attach
/// child-cell clusters to clusters of this cell.
///
/// Edges cross exactly one level of the instance tree. `rev_connections` is
/// maintained as the exact inverse of `connections`. Clusters whose id has
/// not yet been promoted into a parent cell are *roots*.
#[derive(Debug, Default)]
pub struct ConnectedClusters {
    locals: LocalClusters,
    connections: BTreeMap<ClusterId, Vec<ClusterInstance>>,
    rev_connections: HashMap<ClusterInstance, ClusterId>,
    non_roots: HashSet<ClusterId>,
}

impl ConnectedClusters {
    pub fn new() -> Self {
        Self::default()
    }

    /// The underlying local cluster collection.
    #[inline]
    pub fn locals(&self) -> &LocalClusters {
        &self.locals
    }

    #[inline]
    pub(crate) fn locals_mut(&mut self) -> &mut LocalClusters {
        &mut self.locals
    }

    pub fn clear(&mut self) {
        self.locals.clear();
        self.connections.clear();
        self.rev_connections.clear();
        self.non_roots.clear();
    }

    /// Builds the local clusters of `cell`; see
    /// [`LocalClusters::build_clusters`].
    pub fn build_clusters(&mut self, cell: &Cell, filter: ShapeFilter, conn: &Connectivity) {
        self.locals.build_clusters(cell, filter, conn);
    }

    /// The child clusters owned by cluster `id` of this cell.
    pub fn connections_for(&self, id: ClusterId) -> &[ClusterInstance] {
        self.connections
            .get(&id)
            .map(Vec::as_slice)
            .unwrap_or(&EMPTY_CONNECTIONS)
    }

    /// Iterates over all clusters with outgoing connections.
    pub fn connections(&self) -> impl Iterator<Item = (ClusterId, &[ClusterInstance])> + '_ {
        self.connections.iter().map(|(&id, v)| (id, v.as_slice()))
    }

    /// Attaches the child cluster `ci` to cluster `id` of this cell.
    pub fn add_connection(&mut self, id: ClusterId, ci: ClusterInstance) {
        self.connections.entry(id).or_default().push(ci);
        self.rev_connections.insert(ci, id);
    }

    /// The cluster of this cell holding an edge to `ci`, or `0` if none.
    pub fn find_cluster_with_connection(&self, ci: &ClusterInstance) -> ClusterId {
        self.rev_connections.get(ci).copied().unwrap_or(0)
    }

    /// Folds cluster `with_id` into cluster `id`: shapes are joined (where
    /// both ids are backed by real slots) and every edge of `with_id` is
    /// reassigned to `id`.
    pub fn join_cluster_with(&mut self, id: ClusterId, with_id: ClusterId) {
        if id == with_id {
            return;
        }

        self.locals.join_cluster_with(id, with_id);

        if let Some(to_join) = self.connections.remove(&with_id) {
            for ci in &to_join {
                self.rev_connections.insert(*ci, id);
            }
            self.connections.entry(id).or_default().extend(to_join);
        }
    }

    /// Clears the cluster with the given id in place; see
    /// [`LocalClusters::remove_cluster`].
    pub fn remove_cluster(&mut self, id: ClusterId) {
        self.locals.remove_cluster(id);
    }

    /// Allocates a bodyless cluster purely to carry edges upward. Its id
    /// lies past the backing store.
    pub fn insert_dummy(&mut self) -> ClusterId {
        self.locals.alloc_dummy_id()
    }

    /// All ids in use: real slots first, dummy ids after.
    pub fn all_ids(&self) -> impl Iterator<Item = ClusterId> {
        1..=self.locals.len() + self.locals.dummy_count()
    }

    /// Returns `true` iff cluster `id` has not been promoted into a parent
    /// cell.
    pub fn is_root(&self, id: ClusterId) -> bool {
        !self.non_roots.contains(&id)
    }

    /// Marks cluster `id` as promoted.
    pub fn reset_root(&mut self, id: ClusterId) {
        self.non_roots.insert(id);
    }
}
