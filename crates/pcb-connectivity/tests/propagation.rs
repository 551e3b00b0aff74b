//! Net propagation scenarios over the public surface.

use pcb_connectivity::{Artifact, Connectivity, ItemId, LayerSet, PadShape, Point};

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

#[test]
fn propagation_assigns_origin_net_to_mutable_items() {
    let mut conn = Connectivity::new();
    assert!(conn.add(pad(1, 0, 0, 5)));
    assert!(conn.add(track(2, 0, 0, 100, 0)));
    assert!(conn.add(track(3, 100, 0, 200, 0)));
    assert!(conn.add(Artifact::Via {
        id: ItemId(4),
        position: Point::new(200, 0),
        diameter: 6,
        layers: LayerSet::range(0, 3),
        net: 0,
    }));

    let report = conn.propagate_nets();
    assert_eq!(report.changed, 3);
    assert!(report.conflicts.is_empty());
    assert_eq!(conn.net_of(ItemId(2)), Some(5));
    assert_eq!(conn.net_of(ItemId(3)), Some(5));
    assert_eq!(conn.net_of(ItemId(4)), Some(5));
    // The pad itself is an immutable source of truth.
    assert_eq!(conn.net_of(ItemId(1)), Some(5));
}

#[test]
fn propagation_is_idempotent() {
    let mut conn = Connectivity::new();
    conn.add(pad(1, 0, 0, 5));
    conn.add(track(2, 0, 0, 100, 0));

    let first = conn.propagate_nets();
    assert_eq!(first.changed, 1);
    let second = conn.propagate_nets();
    assert_eq!(second.changed, 0);
}

#[test]
fn conflicting_cluster_reported_without_mutation() {
    let mut conn = Connectivity::new();
    conn.add(pad(1, 0, 0, 5));
    conn.add(pad(2, 200, 0, 6));
    conn.add(track(3, 0, 0, 200, 0));

    let report = conn.propagate_nets();
    assert_eq!(report.changed, 0);
    assert_eq!(report.conflicts.len(), 1);
    assert_eq!(report.conflicts[0].nets, vec![5, 6]);
    assert_eq!(
        report.conflicts[0].items,
        vec![ItemId(1), ItemId(2), ItemId(3)]
    );
    // The track keeps whatever net it had.
    assert_eq!(conn.net_of(ItemId(3)), Some(0));
}

#[test]
fn orphaned_cluster_untouched() {
    let mut conn = Connectivity::new();
    conn.add(track(1, 0, 0, 100, 0));
    let report = conn.propagate_nets();
    assert_eq!(report.changed, 0);
    assert!(report.conflicts.is_empty());
    assert_eq!(conn.net_of(ItemId(1)), Some(0));
}

#[test]
fn add_remove_restores_item_count() {
    let mut conn = Connectivity::new();
    conn.add(pad(1, 0, 0, 5));
    conn.propagate_nets();
    let before = conn.item_count();

    assert!(conn.add(track(2, 0, 0, 50, 0)));
    assert!(conn.remove(ItemId(2)));
    // A query forces the compaction sweep.
    conn.propagate_nets();
    assert_eq!(conn.item_count(), before);
}

#[test]
fn invalid_input_is_a_silent_no_op() {
    let mut conn = Connectivity::new();
    assert!(conn.add(pad(1, 0, 0, 5)));
    // Duplicate live id.
    assert!(!conn.add(pad(1, 50, 50, 6)));
    // Unknown id.
    assert!(!conn.remove(ItemId(99)));
    // Zone with no usable outline.
    assert!(!conn.add(Artifact::Zone {
        id: ItemId(2),
        net: 5,
        layers: LayerSet::single(0),
        islands: vec![vec![Point::new(0, 0)]],
    }));
    assert_eq!(conn.item_count(), 1);
}

#[test]
fn propagation_survives_removal_of_bridge() {
    let mut conn = Connectivity::new();
    conn.add(pad(1, 0, 0, 5));
    conn.add(track(2, 0, 0, 100, 0));
    conn.add(track(3, 100, 0, 200, 0));
    conn.propagate_nets();
    assert_eq!(conn.net_of(ItemId(3)), Some(5));

    // Removing the bridge strands track 3; its stale net code remains
    // (propagation never clears), but the cluster is now orphaned and
    // receives no update.
    assert!(conn.remove(ItemId(2)));
    let report = conn.propagate_nets();
    assert_eq!(report.changed, 0);
}

#[test]
fn report_serializes_to_json() {
    let mut conn = Connectivity::new();
    conn.add(pad(1, 0, 0, 5));
    conn.add(pad(2, 200, 0, 6));
    conn.add(track(3, 0, 0, 200, 0));
    let report = conn.propagate_nets();
    let json = serde_json::to_string(&report).unwrap();
    assert!(json.contains("\"conflicts\""));
    let back: pcb_connectivity::PropagationReport = serde_json::from_str(&json).unwrap();
    assert_eq!(back.conflicts.len(), 1);
}
