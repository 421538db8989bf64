//! Cells: named containers of shapes and child instances.

use std::collections::BTreeMap;
use std::sync::Arc;

use arcstr::ArcStr;
use hiergeom::bbox::Bbox;
use hiergeom::trans::Trans;
use hiergeom::{PolyRef, Polygon, Shape, ShapeLike};

use super::inst::InstArray;
use super::CellId;
use crate::{AttrId, LayerId};

/// Classifies a stored shape for filtering.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ShapeKind {
    /// An axis-aligned rectangle.
    Box,
    /// A general polygon.
    Polygon,
}

/// Selects which shape kinds participate in an operation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ShapeFilter {
    pub boxes: bool,
    pub polygons: bool,
}

impl Default for ShapeFilter {
    /// All shape kinds participate.
    fn default() -> Self {
        Self {
            boxes: true,
            polygons: true,
        }
    }
}

impl ShapeFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn accepts(&self, kind: ShapeKind) -> bool {
        match kind {
            ShapeKind::Box => self.boxes,
            ShapeKind::Polygon => self.polygons,
        }
    }
}

/// A shape stored in a cell: a shared polygon body with a per-shape
/// transform and an optional attribute (property id).
#[derive(Debug, Clone)]
pub struct ShapeEntry {
    kind: ShapeKind,
    poly: Arc<Polygon>,
    trans: Trans,
    attr: AttrId,
}

impl ShapeEntry {
    #[inline]
    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    #[inline]
    pub fn attr(&self) -> AttrId {
        self.attr
    }

    /// The shape as a polygon reference.
    pub fn poly_ref(&self) -> PolyRef {
        PolyRef::new(self.poly.clone(), self.trans)
    }
}

/// Caches computed by [`Layout::finalize`](super::Layout::finalize): the
/// hierarchical bounding box of the cell and its per-layer bounding boxes,
/// both including all nested content.
#[derive(Debug, Default, Clone)]
pub(super) struct CellCache {
    pub(super) bbox: Bbox,
    pub(super) layer_bboxes: BTreeMap<LayerId, Bbox>,
}

/// A named, reusable container of shapes and child instances.
#[derive(Debug)]
pub struct Cell {
    id: CellId,
    name: ArcStr,
    shapes: BTreeMap<LayerId, Vec<ShapeEntry>>,
    insts: Vec<InstArray>,
    pub(super) cache: Option<CellCache>,
}

impl Cell {
    pub(super) fn new(id: CellId, name: ArcStr) -> Self {
        Self {
            id,
            name,
            shapes: BTreeMap::new(),
            insts: Vec::new(),
            cache: None,
        }
    }

    #[inline]
    pub fn id(&self) -> CellId {
        self.id
    }

    #[inline]
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// Adds a shape on `layer` with no attribute.
    pub fn add_shape(&mut self, layer: LayerId, shape: impl Into<Shape>) {
        self.add_shape_with_attr(layer, shape, 0);
    }

    /// Adds a shape on `layer` carrying attribute `attr`.
    pub fn add_shape_with_attr(&mut self, layer: LayerId, shape: impl Into<Shape>, attr: AttrId) {
        let poly = shape.into().into_polygon();
        let kind = if poly.is_box() {
            ShapeKind::Box
        } else {
            ShapeKind::Polygon
        };
        self.shapes.entry(layer).or_default().push(ShapeEntry {
            kind,
            poly: Arc::new(poly),
            trans: Trans::identity(),
            attr,
        });
    }

    /// Adds a shared polygon body under a per-shape transform.
    pub fn add_poly_ref(&mut self, layer: LayerId, poly: Arc<Polygon>, trans: Trans, attr: AttrId) {
        let kind = if poly.is_box() {
            ShapeKind::Box
        } else {
            ShapeKind::Polygon
        };
        self.shapes.entry(layer).or_default().push(ShapeEntry {
            kind,
            poly,
            trans,
            attr,
        });
    }

    /// Adds a child instance (or instance array); returns its index.
    pub fn add_inst(&mut self, inst: InstArray) -> u32 {
        let index = self.insts.len() as u32;
        self.insts.push(inst);
        index
    }

    /// The raw shape entries on `layer`.
    pub fn shape_entries(&self, layer: LayerId) -> &[ShapeEntry] {
        self.shapes.get(&layer).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Iterates the shapes on `layer` accepted by `filter`.
    pub fn shapes(
        &self,
        layer: LayerId,
        filter: ShapeFilter,
    ) -> impl Iterator<Item = (PolyRef, AttrId)> + '_ {
        self.shape_entries(layer)
            .iter()
            .filter(move |e| filter.accepts(e.kind))
            .map(|e| (e.poly_ref(), e.attr))
    }

    /// The layers on which this cell holds shapes directly.
    pub fn shape_layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        self.shapes.keys().copied()
    }

    /// The child instances of the cell.
    #[inline]
    pub fn insts(&self) -> &[InstArray] {
        &self.insts
    }

    /// The bounding box of the shapes stored directly in this cell on
    /// `layer`, excluding nested content.
    pub(super) fn local_layer_bbox(&self, layer: LayerId) -> Bbox {
        let mut bx = Bbox::empty();
        for e in self.shape_entries(layer) {
            bx = bx.union(&e.poly_ref().bbox());
        }
        bx
    }

    /// The hierarchical bounding box of the cell.
    ///
    /// Requires the owning layout to be finalized.
    pub fn bbox(&self) -> Bbox {
        self.cache.as_ref().expect("layout not finalized").bbox
    }

    /// The hierarchical bounding box of the cell on `layer`.
    pub fn layer_bbox(&self, layer: LayerId) -> Bbox {
        self.cache
            .as_ref()
            .expect("layout not finalized")
            .layer_bboxes
            .get(&layer)
            .copied()
            .unwrap_or_else(Bbox::empty)
    }
}
