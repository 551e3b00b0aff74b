//! Per-kind item arenas and the sorted-anchor spatial index.
//!
//! Each item kind owns an arena of [`ConnItem`] slots plus a parallel,
//! lazily-sorted array of [`Anchor`]s (sorted by x, then y). Range queries
//! binary-search an entry index on x and scan outward; removal tombstones
//! slots which a mandatory compaction sweep purges before every pass,
//! remapping all stored adjacency references.

use std::collections::HashMap;

use log::trace;

use crate::geometry::{BoundingBox, Point, Polygon};
use crate::item::{Artifact, ConnItem, ItemId, ItemKind, ItemRef, ItemShape, NetCode};

/// A point sample of an item: the unit of spatial indexing.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Anchor {
    pub pos: Point,
    /// Index of the owning item in its kind's arena.
    pub item: u32,
}

/// Arena plus anchor array for a single item kind.
#[derive(Debug, Default)]
pub(crate) struct KindList {
    items: Vec<ConnItem>,
    anchors: Vec<Anchor>,
    sort_dirty: bool,
    has_invalid: bool,
    /// Largest probe radius ever seen in this list; conservative bound
    /// used to size neighbor searches against it.
    max_probe_radius: i64,
}

impl KindList {
    pub(crate) fn items(&self) -> &[ConnItem] {
        &self.items
    }

    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    pub(crate) fn max_probe_radius(&self) -> i64 {
        self.max_probe_radius
    }

    fn push(&mut self, item: ConnItem) -> u32 {
        let index = self.items.len() as u32;
        self.max_probe_radius = self.max_probe_radius.max(item.probe_radius());
        for pos in item.anchor_points() {
            self.anchors.push(Anchor { pos, item: index });
        }
        self.items.push(item);
        self.sort_dirty = true;
        index
    }

    fn tombstone_by_id(&mut self, id: ItemId, nets: &mut Vec<NetCode>) -> usize {
        let mut count = 0;
        for item in &mut self.items {
            if item.valid && item.id == id {
                item.valid = false;
                nets.push(item.net);
                count += 1;
            }
        }
        if count > 0 {
            self.has_invalid = true;
        }
        count
    }

    pub(crate) fn ensure_sorted(&mut self) {
        if self.sort_dirty {
            self.anchors
                .sort_unstable_by_key(|a| (a.pos.x, a.pos.y, a.item));
            self.sort_dirty = false;
        }
    }

    /// Visits every valid anchor within `max_dist` on both axes of
    /// `point` (square neighborhood). The anchor array must be sorted.
    pub(crate) fn find_nearby(&self, point: Point, max_dist: i64, mut visit: impl FnMut(&Anchor)) {
        debug_assert!(!self.sort_dirty);
        let lo = point.x.saturating_sub(max_dist);
        let hi = point.x.saturating_add(max_dist);
        let start = self.anchors.partition_point(|a| a.pos.x < lo);
        for anchor in &self.anchors[start..] {
            if anchor.pos.x > hi {
                break;
            }
            if (anchor.pos.y - point.y).abs() > max_dist {
                continue;
            }
            if self.items[anchor.item as usize].valid {
                visit(anchor);
            }
        }
    }

    /// Containment scan over `bbox`; used for large zone-island queries.
    pub(crate) fn find_in_box(&self, bbox: BoundingBox, mut visit: impl FnMut(&Anchor)) {
        debug_assert!(!self.sort_dirty);
        let start = self.anchors.partition_point(|a| a.pos.x < bbox.min.x);
        for anchor in &self.anchors[start..] {
            if anchor.pos.x > bbox.max.x {
                break;
            }
            if anchor.pos.y < bbox.min.y || anchor.pos.y > bbox.max.y {
                continue;
            }
            if self.items[anchor.item as usize].valid {
                visit(anchor);
            }
        }
    }

    /// Purges tombstoned slots, preserving relative order. Returns the
    /// old-index → new-index map for adjacency rewriting.
    fn compact(&mut self) -> Vec<Option<u32>> {
        let mut map = vec![None; self.items.len()];
        if !self.has_invalid {
            for (i, slot) in map.iter_mut().enumerate() {
                *slot = Some(i as u32);
            }
            return map;
        }
        let mut write = 0;
        for read in 0..self.items.len() {
            if self.items[read].valid {
                map[read] = Some(write as u32);
                if write != read {
                    self.items.swap(write, read);
                }
                write += 1;
            }
        }
        self.items.truncate(write);
        self.rebuild_anchors();
        self.has_invalid = false;
        map
    }

    fn rebuild_anchors(&mut self) {
        self.anchors.clear();
        for (index, item) in self.items.iter().enumerate() {
            for pos in item.anchor_points() {
                self.anchors.push(Anchor {
                    pos,
                    item: index as u32,
                });
            }
        }
        self.sort_dirty = true;
    }
}

/// All four kind lists plus the id registry and the insertion sequence
/// counter that backs first-pad-wins ordering.
#[derive(Debug, Default)]
pub(crate) struct ItemIndex {
    lists: [KindList; ItemKind::COUNT],
    ids: HashMap<ItemId, ItemKind>,
    next_seq: u64,
}

impl ItemIndex {
    pub(crate) fn list(&self, kind: ItemKind) -> &KindList {
        &self.lists[kind.index()]
    }

    pub(crate) fn item(&self, r: ItemRef) -> &ConnItem {
        &self.lists[r.kind.index()].items[r.index as usize]
    }

    pub(crate) fn item_mut(&mut self, r: ItemRef) -> &mut ConnItem {
        &mut self.lists[r.kind.index()].items[r.index as usize]
    }

    pub(crate) fn live_item_count(&self) -> usize {
        self.lists
            .iter()
            .flat_map(|l| l.items.iter())
            .filter(|i| i.valid)
            .count()
    }

    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }

    /// Registers an artifact, deriving one item per pad/track/via and one
    /// per zone island. Returns `false` for invalid input: a duplicate
    /// live id, or a zone whose islands are all degenerate.
    pub(crate) fn add_artifact(&mut self, artifact: &Artifact) -> bool {
        if self.ids.contains_key(&artifact.id()) {
            return false;
        }
        let kind = artifact.kind();
        match artifact {
            Artifact::Pad {
                id,
                position,
                shape,
                layers,
                net,
                no_line,
            } => {
                self.push_item(
                    kind,
                    *id,
                    0,
                    *net,
                    *layers,
                    false,
                    ItemShape::Pad {
                        position: *position,
                        shape: *shape,
                        no_line: *no_line,
                    },
                );
            }
            Artifact::Track {
                id,
                start,
                end,
                width,
                layers,
                net,
            } => {
                self.push_item(
                    kind,
                    *id,
                    0,
                    *net,
                    *layers,
                    true,
                    ItemShape::Track {
                        start: *start,
                        end: *end,
                        half_width: width / 2,
                    },
                );
            }
            Artifact::Via {
                id,
                position,
                diameter,
                layers,
                net,
            } => {
                self.push_item(
                    kind,
                    *id,
                    0,
                    *net,
                    *layers,
                    true,
                    ItemShape::Via {
                        position: *position,
                        radius: diameter / 2,
                    },
                );
            }
            Artifact::Zone {
                id,
                net,
                layers,
                islands,
            } => {
                let mut registered = 0;
                for (island, outline) in islands.iter().enumerate() {
                    // Degenerate outlines are silently skipped; the island
                    // index keeps counting so callers can map back.
                    let Some(polygon) = Polygon::new(outline.clone()) else {
                        continue;
                    };
                    self.push_item(
                        kind,
                        *id,
                        island as u32,
                        *net,
                        *layers,
                        true,
                        ItemShape::ZoneIsland { outline: polygon },
                    );
                    registered += 1;
                }
                if registered == 0 {
                    return false;
                }
            }
        }
        self.ids.insert(artifact.id(), kind);
        true
    }

    fn push_item(
        &mut self,
        kind: ItemKind,
        id: ItemId,
        island: u32,
        net: NetCode,
        layers: crate::geometry::LayerSet,
        mutable: bool,
        shape: ItemShape,
    ) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.lists[kind.index()].push(ConnItem {
            id,
            island,
            net,
            layers,
            shape,
            mutable,
            valid: true,
            dirty: true,
            seq,
            connections: Vec::new(),
        });
    }

    /// Tombstones every item registered under `id`. Returns the net codes
    /// the removal touched, or `None` when the id is unknown.
    pub(crate) fn remove_id(&mut self, id: ItemId) -> Option<Vec<NetCode>> {
        let kind = self.ids.remove(&id)?;
        let mut nets = Vec::new();
        let removed = self.lists[kind.index()].tombstone_by_id(id, &mut nets);
        debug_assert!(removed > 0);
        nets.sort_unstable();
        nets.dedup();
        Some(nets)
    }

    /// Compacts all lists and rewrites adjacency through the old → new
    /// index maps, dropping references to purged items. Required before
    /// any pass that assumes liveness.
    pub(crate) fn remove_invalid_items(&mut self) {
        if !self.lists.iter().any(|l| l.has_invalid) {
            return;
        }
        let maps: Vec<Vec<Option<u32>>> = self.lists.iter_mut().map(KindList::compact).collect();
        let mut dropped = 0usize;
        for list in &mut self.lists {
            for item in &mut list.items {
                let before = item.connections.len();
                item.connections.retain_mut(|r| {
                    match maps[r.kind.index()][r.index as usize] {
                        Some(new_index) => {
                            r.index = new_index;
                            true
                        }
                        None => false,
                    }
                });
                dropped += before - item.connections.len();
            }
        }
        trace!("compaction dropped {dropped} stale adjacency entries");
    }

    pub(crate) fn ensure_sorted_all(&mut self) {
        for list in &mut self.lists {
            list.ensure_sorted();
        }
    }

    /// Records a symmetric, deduplicated adjacency between two items.
    pub(crate) fn connect(&mut self, a: ItemRef, b: ItemRef) {
        if a == b {
            return;
        }
        let item_a = self.item_mut(a);
        if !item_a.connections.contains(&b) {
            item_a.connections.push(b);
        }
        let item_b = self.item_mut(b);
        if !item_b.connections.contains(&a) {
            item_b.connections.push(a);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::LayerSet;
    use crate::item::PadShape;

    fn pad(id: u64, x: i64, y: i64) -> Artifact {
        Artifact::Pad {
            id: ItemId(id),
            position: Point::new(x, y),
            shape: PadShape::Circle { radius: 5 },
            layers: LayerSet::single(0),
            net: 1,
            no_line: false,
        }
    }

    #[test]
    fn find_nearby_square_window() {
        let mut index = ItemIndex::default();
        for (i, (x, y)) in [(0, 0), (10, 0), (0, 10), (30, 30), (11, 0)]
            .iter()
            .enumerate()
        {
            assert!(index.add_artifact(&pad(i as u64, *x, *y)));
        }
        index.ensure_sorted_all();
        let mut found = Vec::new();
        index
            .list(ItemKind::Pad)
            .find_nearby(Point::new(0, 0), 10, |a| found.push(a.pos));
        found.sort_unstable();
        assert_eq!(
            found,
            vec![Point::new(0, 0), Point::new(0, 10), Point::new(10, 0)]
        );
    }

    #[test]
    fn add_remove_compact_round_trip() {
        let mut index = ItemIndex::default();
        assert!(index.add_artifact(&pad(1, 0, 0)));
        let before = index.live_item_count();
        assert!(index.add_artifact(&pad(2, 50, 50)));
        assert!(index.remove_id(ItemId(2)).is_some());
        index.remove_invalid_items();
        assert_eq!(index.live_item_count(), before);
        assert_eq!(index.list(ItemKind::Pad).len(), before);
    }

    #[test]
    fn duplicate_live_id_rejected() {
        let mut index = ItemIndex::default();
        assert!(index.add_artifact(&pad(7, 0, 0)));
        assert!(!index.add_artifact(&pad(7, 10, 10)));
        // After removal the id can be reused.
        assert!(index.remove_id(ItemId(7)).is_some());
        assert!(index.add_artifact(&pad(7, 10, 10)));
    }

    #[test]
    fn compaction_remaps_adjacency() {
        let mut index = ItemIndex::default();
        assert!(index.add_artifact(&pad(1, 0, 0)));
        assert!(index.add_artifact(&pad(2, 100, 0)));
        assert!(index.add_artifact(&pad(3, 200, 0)));
        let a = ItemRef {
            kind: ItemKind::Pad,
            index: 0,
        };
        let b = ItemRef {
            kind: ItemKind::Pad,
            index: 2,
        };
        index.connect(a, b);
        assert!(index.remove_id(ItemId(2)).is_some());
        index.remove_invalid_items();
        // Pad 3 moved from slot 2 to slot 1; the stored refs must follow.
        let survivor = ItemRef {
            kind: ItemKind::Pad,
            index: 1,
        };
        assert_eq!(index.item(survivor).id, ItemId(3));
        assert_eq!(index.item(a).connections, vec![survivor]);
        assert_eq!(index.item(survivor).connections, vec![a]);
    }

    #[test]
    fn zone_with_only_degenerate_islands_rejected() {
        let mut index = ItemIndex::default();
        let zone = Artifact::Zone {
            id: ItemId(9),
            net: 3,
            layers: LayerSet::single(0),
            islands: vec![vec![Point::new(0, 0), Point::new(1, 1)]],
        };
        assert!(!index.add_artifact(&zone));
        assert!(index.remove_id(ItemId(9)).is_none());
    }
}
