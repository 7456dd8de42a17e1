use std::cmp::Ordering;
use std::collections::HashMap;

use kurbo::{Point, Rect};
use rstar::{RTree, RTreeObject, AABB};

use crate::document::NodeId;
use crate::error::IndexConsistencyError;
use crate::geometry::bounds::{rect_coords, rect_is_finite};

/// One indexed bounding box.
///
/// `seq` is the insertion sequence number; it survives `update` so ordering
/// ties stay stable for the lifetime of the entry.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct IndexEntry {
    pub id: NodeId,
    pub bbox: Rect,
    pub seq: u64,
}

impl RTreeObject for IndexEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        let r = self.bbox.abs();
        AABB::from_corners([r.x0, r.y0], [r.x1, r.y1])
    }
}

/// A point-query hit before z-ordering is applied.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct IndexHit {
    pub id: NodeId,
    pub seq: u64,
}

/// R*-tree over node bounding boxes.
///
/// The tree answers spatial queries; `entries` maps ids to their current
/// entry so removal can locate the exact object in the tree.
#[derive(Debug, Default)]
pub struct SpatialIndex {
    tree: RTree<IndexEntry>,
    entries: HashMap<NodeId, IndexEntry>,
    next_seq: u64,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn get(&self, id: NodeId) -> Option<&IndexEntry> {
        self.entries.get(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    pub fn clear(&mut self) {
        self.tree = RTree::new();
        self.entries.clear();
    }

    pub fn insert(&mut self, id: NodeId, bbox: Rect) -> Result<(), IndexConsistencyError> {
        debug_assert!(rect_is_finite(bbox), "non-finite bbox for {id}");
        if self.entries.contains_key(&id) {
            return Err(IndexConsistencyError::DuplicateEntry(id));
        }
        let entry = IndexEntry { id, bbox, seq: self.next_seq };
        self.next_seq += 1;
        self.tree.insert(entry);
        self.entries.insert(id, entry);
        log::trace!("index insert {id} {:?}", rect_coords(bbox));
        Ok(())
    }

    /// Replaces the bbox of an existing entry, keeping its insertion sequence.
    ///
    /// Takes `&mut self`, so no query can observe the entry between removal and reinsertion.
    pub fn update(&mut self, id: NodeId, bbox: Rect) -> Result<(), IndexConsistencyError> {
        debug_assert!(rect_is_finite(bbox), "non-finite bbox for {id}");
        let Some(old) = self.entries.get(&id).copied() else {
            return Err(IndexConsistencyError::MissingEntry(id));
        };
        if old.bbox == bbox {
            return Ok(());
        }
        if self.tree.remove(&old).is_none() {
            return Err(IndexConsistencyError::MissingEntry(id));
        }
        let entry = IndexEntry { bbox, ..old };
        self.tree.insert(entry);
        self.entries.insert(id, entry);
        log::trace!("index update {id} {:?}", rect_coords(bbox));
        Ok(())
    }

    pub fn remove(&mut self, id: NodeId) -> Result<IndexEntry, IndexConsistencyError> {
        let Some(old) = self.entries.remove(&id) else {
            return Err(IndexConsistencyError::MissingEntry(id));
        };
        if self.tree.remove(&old).is_none() {
            return Err(IndexConsistencyError::MissingEntry(id));
        }
        log::trace!("index remove {id}");
        Ok(old)
    }

    /// Every entry whose bbox intersects `region` (closed intervals), in no particular order.
    pub fn query_region(&self, region: Rect) -> Vec<NodeId> {
        let r = region.abs();
        let envelope = AABB::from_corners([r.x0, r.y0], [r.x1, r.y1]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|e| e.id)
            .collect()
    }

    /// Every entry whose bbox contains `p`, in no particular order.
    pub fn query_point(&self, p: Point) -> Vec<IndexHit> {
        let envelope = AABB::from_point([p.x, p.y]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|e| IndexHit { id: e.id, seq: e.seq })
            .collect()
    }

    /// Point query ordered topmost first.
    ///
    /// `z_of` returns the z position of a node (larger is higher). Equal z
    /// positions fall back to insertion order, earliest first. Hits with no
    /// z position are dropped.
    pub fn query_point_ordered(&self, p: Point, z_of: impl Fn(NodeId) -> Option<usize>) -> Vec<NodeId> {
        let mut hits: Vec<(usize, u64, NodeId)> = self
            .query_point(p)
            .into_iter()
            .filter_map(|h| z_of(h.id).map(|z| (z, h.seq, h.id)))
            .collect();
        hits.sort_by(|a, b| match b.0.cmp(&a.0) {
            Ordering::Equal => a.1.cmp(&b.1),
            o => o,
        });
        hits.into_iter().map(|(_, _, id)| id).collect()
    }

    /// Verifies that the index holds exactly `expected`, with identical boxes.
    pub fn verify<'a>(
        &self,
        expected: impl ExactSizeIterator<Item = (NodeId, &'a Rect)>,
    ) -> Result<(), IndexConsistencyError> {
        let live = expected.len();
        if live != self.entries.len() || self.tree.size() != self.entries.len() {
            return Err(IndexConsistencyError::CountMismatch {
                indexed: self.tree.size(),
                live,
            });
        }
        for (id, bbox) in expected {
            let Some(entry) = self.entries.get(&id) else {
                return Err(IndexConsistencyError::MissingEntry(id));
            };
            if entry.bbox != *bbox {
                return Err(IndexConsistencyError::BoundsMismatch {
                    id,
                    indexed: rect_coords(entry.bbox),
                    actual: rect_coords(*bbox),
                });
            }
        }
        Ok(())
    }
}
