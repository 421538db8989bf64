//! Hierarchical connectivity extraction for IC layout data.
//!
//! Given a hierarchical cell tree holding shapes on numbered layers and a
//! [`Connectivity`](connectivity::Connectivity) declaring which layer pairs
//! conduct into each other, [`HierClusters`](cluster::HierClusters) groups
//! all transitively touching shapes into nets. Hierarchy is preserved: each
//! cell keeps its own local clusters, and inter-cell connections are
//! recorded as directed edges crossing exactly one level of the instance
//! tree.

pub mod cluster;
pub mod connectivity;
pub mod error;
pub mod layout;
pub mod scan;

pub(crate) mod log;

/// Identifies a shape layer. Connectivity is declared between layers.
pub type LayerId = u32;

/// Identifies a shape attribute (user property). `0` means "no attribute".
pub type AttrId = u64;
