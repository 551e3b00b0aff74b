//! The connectivity facade owned by an edit session.
//!
//! [`Connectivity`] ties the pieces together: the spatial index receives
//! `add`/`remove` edits, every query first compacts and re-scans only
//! dirty items, and the consumers (net propagation, island detection,
//! disjoint-net reporting, ratsnest generation) run over freshly built
//! clusters. One instance is exclusively owned by its editor; nothing
//! here is safe for concurrent access.

use std::collections::HashMap;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::cluster::{build_clusters, ClusterMode};
use crate::dirty::DirtyTracker;
use crate::geometry::Point;
use crate::index::ItemIndex;
use crate::item::{Artifact, ItemId, ItemKind, NetCode};
use crate::ratsnest::{build_rn_net, RatsnestEdge, RnNet};

/// Outcome of a propagation pass. Conflicts are reported, never resolved.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct PropagationReport {
    /// Number of items whose net code was rewritten.
    pub changed: usize,
    pub conflicts: Vec<NetConflict>,
}

/// A cluster in which pads of two different nets touch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetConflict {
    /// The distinct pad nets seen, sorted.
    pub nets: Vec<NetCode>,
    /// Ids of every item in the conflicting cluster.
    pub items: Vec<ItemId>,
}

/// One entry of the disjoint-net report: this net's terminals fall into
/// `cluster_count` physically separate groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetDisjointEntry {
    pub net: NetCode,
    pub cluster_count: usize,
}

/// Geometric connectivity state for one board.
#[derive(Debug, Default)]
pub struct Connectivity {
    index: ItemIndex,
    dirty: DirtyTracker,
    ratsnest: HashMap<NetCode, RnNet>,
}

impl Connectivity {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a board artifact. Returns `false` and changes nothing
    /// for invalid input: a duplicate live id, or a zone with no usable
    /// island outline.
    pub fn add(&mut self, artifact: Artifact) -> bool {
        let net = artifact.net();
        if !self.index.add_artifact(&artifact) {
            return false;
        }
        self.dirty.mark(net);
        true
    }

    /// Tombstones the artifact registered under `id`; the slots are
    /// purged by the compaction sweep preceding the next query. Returns
    /// `false` for an unknown id.
    pub fn remove(&mut self, id: ItemId) -> bool {
        match self.index.remove_id(id) {
            Some(nets) => {
                for net in nets {
                    self.dirty.mark(net);
                }
                true
            }
            None => false,
        }
    }

    /// Propagates pad nets onto touching tracks and vias (zones are
    /// excluded from this pass for performance).
    ///
    /// Conflicting clusters are reported and left untouched; orphaned
    /// clusters are a no-op. Idempotent: a second run without intervening
    /// edits performs zero mutations.
    pub fn propagate_nets(&mut self) -> PropagationReport {
        let clusters = build_clusters(&mut self.index, ClusterMode::PROPAGATE);
        let mut report = PropagationReport::default();
        for cluster in &clusters {
            if cluster.conflicting {
                let mut items: Vec<ItemId> =
                    cluster.items.iter().map(|&r| self.index.item(r).id).collect();
                items.sort_unstable();
                items.dedup();
                report.conflicts.push(NetConflict {
                    nets: cluster.pad_nets.clone(),
                    items,
                });
                continue;
            }
            if cluster.orphaned {
                continue;
            }
            for &r in &cluster.items {
                let origin = cluster.origin_net;
                let item = self.index.item_mut(r);
                if item.mutable && item.net != origin {
                    let old = item.net;
                    item.net = origin;
                    // Net changes can create or break zone contacts, so
                    // the item goes back through the next contact scan.
                    item.dirty = true;
                    self.dirty.mark(old);
                    self.dirty.mark(origin);
                    report.changed += 1;
                }
            }
        }
        info!(
            "net propagation: {} items rewritten, {} conflicting clusters",
            report.changed,
            report.conflicts.len()
        );
        report
    }

    /// Reports every net whose terminals are split into more than one
    /// physically-disjoint group. Counts only pad-bearing clusters, so
    /// isolated copper (the island detector's concern) is not
    /// double-reported here.
    pub fn check_connectivity(&mut self) -> Vec<NetDisjointEntry> {
        let mut entries = Vec::new();
        for net in self.known_nets(true) {
            let clusters = build_clusters(&mut self.index, ClusterMode::single_net(net));
            let cluster_count = clusters.iter().filter(|c| c.contains_pad()).count();
            if cluster_count > 1 {
                entries.push(NetDisjointEntry { net, cluster_count });
            }
        }
        debug!("connectivity check: {} disjoint nets", entries.len());
        entries
    }

    /// Re-registers `zone` and returns the indices of its islands that
    /// are connected to no net terminal at all. The caller (the fill
    /// engine) owns the decision to delete them.
    pub fn find_isolated_copper_islands(&mut self, zone: Artifact) -> Vec<usize> {
        let Artifact::Zone { id, .. } = &zone else {
            return Vec::new();
        };
        let id = *id;
        self.remove(id);
        if !self.add(zone) {
            return Vec::new();
        }
        let clusters = build_clusters(&mut self.index, ClusterMode::FULL);
        let mut isolated = Vec::new();
        for cluster in clusters.iter().filter(|c| c.orphaned) {
            for &r in &cluster.items {
                if r.kind != ItemKind::ZoneIsland {
                    continue;
                }
                let item = self.index.item(r);
                if item.id == id {
                    isolated.push(item.island as usize);
                }
            }
        }
        isolated.sort_unstable();
        debug!("island scan of {id:?}: {} isolated", isolated.len());
        isolated
    }

    /// Total number of missing connections across all nets.
    pub fn unconnected_count(&mut self) -> usize {
        let mut total = 0;
        for net in self.known_nets(false) {
            total += self.ratsnest_edges(net).len();
        }
        total
    }

    /// The missing-wire edges of `net`, recomputed only when the net is
    /// dirty. Nets with code `<= 0` have no ratsnest.
    pub fn ratsnest_edges(&mut self, net: NetCode) -> &[RatsnestEdge] {
        match self.ratsnest_net(net) {
            Some(rn) => rn.edges(),
            None => &[],
        }
    }

    /// The cached ratsnest graph of `net`, refreshed if dirty. `None` for
    /// net codes `<= 0`.
    pub fn ratsnest_net(&mut self, net: NetCode) -> Option<&RnNet> {
        if net <= 0 {
            return None;
        }
        if self.dirty.is_dirty(net) || !self.ratsnest.contains_key(&net) {
            let rn = build_rn_net(&mut self.index, net);
            self.ratsnest.insert(net, rn);
            self.dirty.clear(net);
        }
        self.ratsnest.get(&net)
    }

    /// Whether two anchor points of `net` are already physically joined
    /// (same copper group), for external highlighting and DRC use.
    pub fn points_joined(&mut self, net: NetCode, a: Point, b: Point) -> bool {
        match self.ratsnest_net(net) {
            Some(rn) => rn.points_joined(a, b),
            None => false,
        }
    }

    /// Current net code of the artifact registered under `id`.
    pub fn net_of(&self, id: ItemId) -> Option<NetCode> {
        for kind in ItemKind::ALL {
            for item in self.index.list(kind).items() {
                if item.valid && item.id == id {
                    return Some(item.net);
                }
            }
        }
        None
    }

    /// Number of live connectivity items (zone islands count singly).
    pub fn item_count(&self) -> usize {
        self.index.live_item_count()
    }

    /// Drops all items, caches, and dirty state.
    pub fn clear(&mut self) {
        self.index.clear();
        self.dirty = DirtyTracker::default();
        self.ratsnest.clear();
    }

    /// Distinct positive nets, from pads only (`pads_only`) or from all
    /// ratsnest-bearing kinds.
    fn known_nets(&self, pads_only: bool) -> Vec<NetCode> {
        let kinds: &[ItemKind] = if pads_only {
            &[ItemKind::Pad]
        } else {
            &[ItemKind::Pad, ItemKind::Track, ItemKind::Via]
        };
        let mut nets: Vec<NetCode> = kinds
            .iter()
            .flat_map(|&kind| self.index.list(kind).items())
            .filter(|item| item.valid && item.net > 0)
            .map(|item| item.net)
            .collect();
        nets.sort_unstable();
        nets.dedup();
        nets
    }
}
