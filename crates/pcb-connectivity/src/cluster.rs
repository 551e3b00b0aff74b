//! BFS clustering of touching items.
//!
//! A cluster is the maximal set of items transitively touching each other
//! under current geometry. Every pass recomputes clusters from scratch:
//! compact the arenas, re-scan dirty items, then breadth-first search over
//! the recorded adjacency with an explicit frontier queue and per-kind
//! visited bitsets. Clusters are ephemeral values owned by the calling
//! pass.

use std::collections::VecDeque;

use fixedbitset::FixedBitSet;
use log::debug;

use crate::contact;
use crate::index::ItemIndex;
use crate::item::{ItemKind, ItemRef, NetCode};

/// Which items enter the candidate pool.
///
/// Net propagation excludes zone islands for performance; island
/// detection and full connectivity checks include them. An optional
/// single-net restriction limits both seeding and traversal.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ClusterMode {
    pub include_zones: bool,
    pub net: Option<NetCode>,
}

impl ClusterMode {
    /// Pads, tracks, and vias only; all nets. Used by net propagation.
    pub(crate) const PROPAGATE: ClusterMode = ClusterMode {
        include_zones: false,
        net: None,
    };

    /// Everything, all nets. Used by island detection.
    pub(crate) const FULL: ClusterMode = ClusterMode {
        include_zones: true,
        net: None,
    };

    /// Everything on a single net. Used by connectivity checks and the
    /// ratsnest builder.
    pub(crate) fn single_net(net: NetCode) -> Self {
        Self {
            include_zones: true,
            net: Some(net),
        }
    }
}

/// A maximal set of transitively touching items.
#[derive(Debug)]
pub(crate) struct Cluster {
    /// Member items in BFS discovery order.
    pub items: Vec<ItemRef>,
    /// Net of the lowest-sequence pad with a positive net; 0 if orphaned.
    pub origin_net: NetCode,
    /// Distinct positive pad nets seen, sorted.
    pub pad_nets: Vec<NetCode>,
    /// Two different pad nets are present.
    pub conflicting: bool,
    /// No pad with a positive net is present.
    pub orphaned: bool,
}

impl Cluster {
    pub(crate) fn contains_pad(&self) -> bool {
        !self.orphaned
    }
}

/// Runs the full deterministic sequence: compaction, contact re-scan,
/// candidate pool assembly, BFS, and an `origin_net` sort.
pub(crate) fn build_clusters(index: &mut ItemIndex, mode: ClusterMode) -> Vec<Cluster> {
    index.remove_invalid_items();
    contact::search_connections(index);

    let kinds: &[ItemKind] = if mode.include_zones {
        &ItemKind::ALL
    } else {
        &[ItemKind::Pad, ItemKind::Track, ItemKind::Via]
    };

    let mut visited: [FixedBitSet; ItemKind::COUNT] = [
        FixedBitSet::with_capacity(index.list(ItemKind::Pad).len()),
        FixedBitSet::with_capacity(index.list(ItemKind::Track).len()),
        FixedBitSet::with_capacity(index.list(ItemKind::Via).len()),
        FixedBitSet::with_capacity(index.list(ItemKind::ZoneIsland).len()),
    ];

    let eligible = |index: &ItemIndex, r: ItemRef| -> bool {
        let item = index.item(r);
        if !item.valid {
            return false;
        }
        if !mode.include_zones && r.kind == ItemKind::ZoneIsland {
            return false;
        }
        match mode.net {
            Some(net) => item.net == net,
            None => true,
        }
    };

    let mut clusters = Vec::new();
    let mut frontier = VecDeque::new();
    for &kind in kinds {
        for i in 0..index.list(kind).len() {
            let seed = ItemRef {
                kind,
                index: i as u32,
            };
            if visited[kind.index()].contains(i) || !eligible(index, seed) {
                continue;
            }
            visited[kind.index()].insert(i);
            frontier.push_back(seed);
            let mut items = Vec::new();
            while let Some(current) = frontier.pop_front() {
                items.push(current);
                for &next in &index.item(current).connections {
                    if visited[next.kind.index()].contains(next.index as usize) {
                        continue;
                    }
                    if !eligible(index, next) {
                        continue;
                    }
                    visited[next.kind.index()].insert(next.index as usize);
                    frontier.push_back(next);
                }
            }
            clusters.push(resolve_cluster(index, items));
        }
    }

    clusters.sort_by_key(|c| c.origin_net);
    debug!(
        "cluster pass: {} clusters (zones={}, net={:?})",
        clusters.len(),
        mode.include_zones,
        mode.net
    );
    clusters
}

/// First-pad-wins origin resolution over a fixed total order: the winning
/// pad is the one with the smallest insertion sequence number among pads
/// carrying a positive net.
fn resolve_cluster(index: &ItemIndex, items: Vec<ItemRef>) -> Cluster {
    let mut origin_net = 0;
    let mut origin_seq = u64::MAX;
    let mut pad_nets = Vec::new();
    for &r in &items {
        if r.kind != ItemKind::Pad {
            continue;
        }
        let pad = index.item(r);
        if pad.net <= 0 {
            continue;
        }
        if pad.seq < origin_seq {
            origin_seq = pad.seq;
            origin_net = pad.net;
        }
        if !pad_nets.contains(&pad.net) {
            pad_nets.push(pad.net);
        }
    }
    pad_nets.sort_unstable();
    Cluster {
        items,
        origin_net,
        conflicting: pad_nets.len() > 1,
        orphaned: pad_nets.is_empty(),
        pad_nets,
    }
}
