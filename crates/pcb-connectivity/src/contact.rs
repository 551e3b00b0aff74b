//! Contact detection: turns geometry into adjacency.
//!
//! For every dirty item the detector probes the sorted anchor arrays with
//! a kind-specific radius and applies the kind-pair acceptance test,
//! restricted to items sharing at least one copper layer. Adjacency is
//! recorded symmetrically and deduplicated; the item's dirty flag is
//! cleared on completion.
//!
//! The full pair matrix is always evaluated (including zone–zone), so a
//! pass that excludes zones from *clustering* still leaves complete
//! adjacency behind for the next include-zones pass.

use log::debug;

use crate::geometry::Polygon;
use crate::item::{ConnItem, ItemKind, ItemRef, ItemShape};
use crate::index::ItemIndex;

const POINT_KINDS: [ItemKind; 3] = [ItemKind::Pad, ItemKind::Track, ItemKind::Via];

/// Re-scans every dirty item and records its adjacency.
pub(crate) fn search_connections(index: &mut ItemIndex) {
    index.ensure_sorted_all();
    let mut scanned = 0usize;
    let mut contacts = 0usize;
    let mut found: Vec<ItemRef> = Vec::new();
    for kind in ItemKind::ALL {
        for i in 0..index.list(kind).len() {
            let item_ref = ItemRef {
                kind,
                index: i as u32,
            };
            {
                let item = index.item(item_ref);
                if !item.valid || !item.dirty {
                    continue;
                }
            }
            found.clear();
            collect_contacts(index, item_ref, &mut found);
            for &target in &found {
                index.connect(item_ref, target);
            }
            scanned += 1;
            contacts += found.len();
            index.item_mut(item_ref).dirty = false;
        }
    }
    if scanned > 0 {
        debug!("contact scan: {scanned} dirty items, {contacts} contacts recorded");
    }
}

fn collect_contacts(index: &ItemIndex, item_ref: ItemRef, out: &mut Vec<ItemRef>) {
    let item = index.item(item_ref);
    match &item.shape {
        ItemShape::ZoneIsland { outline } => {
            zone_to_points(index, item_ref, item, outline, out);
            zone_to_zones(index, item_ref, item, outline, out);
        }
        _ => {
            point_to_points(index, item_ref, item, out);
            point_to_zones(index, item_ref, item, out);
        }
    }
}

/// Pad/track/via source against pad/track/via targets.
fn point_to_points(index: &ItemIndex, item_ref: ItemRef, item: &ConnItem, out: &mut Vec<ItemRef>) {
    for target_kind in POINT_KINDS {
        let list = index.list(target_kind);
        // The probe must reach any anchor whose item could still touch
        // ours, hence source radius plus the list's largest radius.
        let probe = item.probe_radius().saturating_add(list.max_probe_radius());
        for anchor_pos in item.anchor_points() {
            list.find_nearby(anchor_pos, probe, |anchor| {
                let target_ref = ItemRef {
                    kind: target_kind,
                    index: anchor.item,
                };
                if target_ref == item_ref || out.contains(&target_ref) {
                    return;
                }
                let target = index.item(target_ref);
                if !item.layers.overlaps(target.layers) {
                    return;
                }
                if items_touch(item, target) {
                    out.push(target_ref);
                }
            });
        }
    }
}

/// Point-kind acceptance, applied in both directions: any anchor of one
/// item inside the other's hit-test shape.
fn items_touch(a: &ConnItem, b: &ConnItem) -> bool {
    a.anchor_points().iter().any(|p| b.hit_test(*p))
        || b.anchor_points().iter().any(|p| a.hit_test(*p))
}

/// Pad/track/via source against zone islands: equal net plus
/// point-in-polygon membership of the probing anchor.
fn point_to_zones(index: &ItemIndex, item_ref: ItemRef, item: &ConnItem, out: &mut Vec<ItemRef>) {
    if item.net <= 0 {
        return;
    }
    let list = index.list(ItemKind::ZoneIsland);
    for (i, island) in list.items().iter().enumerate() {
        let target_ref = ItemRef {
            kind: ItemKind::ZoneIsland,
            index: i as u32,
        };
        if target_ref == item_ref || out.contains(&target_ref) {
            continue;
        }
        if !island.valid || island.net != item.net || !item.layers.overlaps(island.layers) {
            continue;
        }
        let ItemShape::ZoneIsland { outline } = &island.shape else {
            continue;
        };
        if item
            .anchor_points()
            .iter()
            .any(|p| outline.bbox().contains(*p) && outline.contains(*p))
        {
            out.push(target_ref);
        }
    }
}

/// Zone-island source against pad/track/via anchors, via a bounding-box
/// containment scan over each anchor array.
fn zone_to_points(
    index: &ItemIndex,
    item_ref: ItemRef,
    item: &ConnItem,
    outline: &Polygon,
    out: &mut Vec<ItemRef>,
) {
    if item.net <= 0 {
        return;
    }
    let bbox = outline.bbox();
    for target_kind in POINT_KINDS {
        let list = index.list(target_kind);
        list.find_in_box(bbox, |anchor| {
            let target_ref = ItemRef {
                kind: target_kind,
                index: anchor.item,
            };
            if target_ref == item_ref || out.contains(&target_ref) {
                return;
            }
            let target = index.item(target_ref);
            if target.net != item.net || !item.layers.overlaps(target.layers) {
                return;
            }
            if outline.contains(anchor.pos) {
                out.push(target_ref);
            }
        });
    }
}

/// Zone–zone adjacency: equal net, overlapping layers, and a shared
/// vertex or mutual outline membership.
fn zone_to_zones(
    index: &ItemIndex,
    item_ref: ItemRef,
    item: &ConnItem,
    outline: &Polygon,
    out: &mut Vec<ItemRef>,
) {
    if item.net <= 0 {
        return;
    }
    let list = index.list(ItemKind::ZoneIsland);
    for (i, other) in list.items().iter().enumerate() {
        let target_ref = ItemRef {
            kind: ItemKind::ZoneIsland,
            index: i as u32,
        };
        if target_ref == item_ref || out.contains(&target_ref) {
            continue;
        }
        if !other.valid || other.net != item.net || !item.layers.overlaps(other.layers) {
            continue;
        }
        let ItemShape::ZoneIsland { outline: other_outline } = &other.shape else {
            continue;
        };
        if !outline.bbox().intersects(&other_outline.bbox()) {
            continue;
        }
        if zones_touch(outline, other_outline) {
            out.push(target_ref);
        }
    }
}

fn zones_touch(a: &Polygon, b: &Polygon) -> bool {
    a.points()
        .iter()
        .any(|p| b.has_vertex(*p) || b.contains(*p))
        || b.points().iter().any(|p| a.contains(*p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{LayerSet, Point};
    use crate::item::{Artifact, ItemId, PadShape};

    fn pad(id: u64, x: i64, y: i64, net: i32) -> Artifact {
        Artifact::Pad {
            id: ItemId(id),
            position: Point::new(x, y),
            shape: PadShape::Circle { radius: 5 },
            layers: LayerSet::single(0),
            net,
            no_line: false,
        }
    }

    fn track(id: u64, sx: i64, sy: i64, ex: i64, ey: i64) -> Artifact {
        Artifact::Track {
            id: ItemId(id),
            start: Point::new(sx, sy),
            end: Point::new(ex, ey),
            width: 4,
            layers: LayerSet::single(0),
            net: 0,
        }
    }

    fn connections_of(index: &ItemIndex, kind: ItemKind, i: u32) -> usize {
        index
            .item(ItemRef { kind, index: i })
            .connections
            .len()
    }

    #[test]
    fn track_end_in_pad_connects() {
        let mut index = ItemIndex::default();
        index.add_artifact(&pad(1, 0, 0, 5));
        index.add_artifact(&track(2, 3, 0, 100, 0));
        search_connections(&mut index);
        assert_eq!(connections_of(&index, ItemKind::Pad, 0), 1);
        assert_eq!(connections_of(&index, ItemKind::Track, 0), 1);
    }

    #[test]
    fn midpoint_overlap_is_missed() {
        // The endpoint-proximity approximation: a pad over the middle of
        // a long track is not detected.
        let mut index = ItemIndex::default();
        index.add_artifact(&pad(1, 50, 0, 5));
        index.add_artifact(&track(2, 0, 0, 100, 0));
        search_connections(&mut index);
        assert_eq!(connections_of(&index, ItemKind::Pad, 0), 0);
    }

    #[test]
    fn different_layers_do_not_connect() {
        let mut index = ItemIndex::default();
        index.add_artifact(&pad(1, 0, 0, 5));
        index.add_artifact(&Artifact::Pad {
            id: ItemId(2),
            position: Point::new(2, 0),
            shape: PadShape::Circle { radius: 5 },
            layers: LayerSet::single(1),
            net: 5,
            no_line: false,
        });
        search_connections(&mut index);
        assert_eq!(connections_of(&index, ItemKind::Pad, 0), 0);
    }

    #[test]
    fn pad_in_zone_island_requires_equal_net() {
        let mut index = ItemIndex::default();
        let outline = vec![
            Point::new(-20, -20),
            Point::new(20, -20),
            Point::new(20, 20),
            Point::new(-20, 20),
        ];
        index.add_artifact(&Artifact::Zone {
            id: ItemId(1),
            net: 5,
            layers: LayerSet::single(0),
            islands: vec![outline.clone()],
        });
        index.add_artifact(&pad(2, 0, 0, 5));
        index.add_artifact(&pad(3, 15, 15, 6));
        search_connections(&mut index);
        assert_eq!(connections_of(&index, ItemKind::ZoneIsland, 0), 1);
        assert_eq!(connections_of(&index, ItemKind::Pad, 0), 1);
        assert_eq!(connections_of(&index, ItemKind::Pad, 1), 0);
    }

    #[test]
    fn rescan_does_not_duplicate_adjacency() {
        let mut index = ItemIndex::default();
        index.add_artifact(&pad(1, 0, 0, 5));
        index.add_artifact(&track(2, 3, 0, 100, 0));
        search_connections(&mut index);
        // A later item marks itself dirty and re-finds the same pair.
        index.add_artifact(&track(3, 100, 0, 200, 0));
        search_connections(&mut index);
        assert_eq!(connections_of(&index, ItemKind::Pad, 0), 1);
        assert_eq!(connections_of(&index, ItemKind::Track, 0), 2);
    }
}
