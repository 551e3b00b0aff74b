//! Per-net ratsnest generation.
//!
//! # Algorithm
//!
//! 1. Cluster the net's items (zones included) so every anchor carries a
//!    physical-group label.
//! 2. Chain anchors within one group with weight-0 edges: these encode
//!    copper that already exists.
//! 3. Triangulate the distinct anchor positions to obtain a sparse
//!    candidate edge set (the complete graph is never materialized),
//!    weighted by squared Euclidean distance — weights are only compared,
//!    never summed for display, so the square root is avoided.
//! 4. Kruskal over the combined edge list with a union-find: zero-weight
//!    edges merge groups silently; every accepted positive-weight edge is
//!    a missing connection and becomes a [`RatsnestEdge`].
//!
//! Anchors flagged "no line" (pads that must not receive a dangling
//! preview wire) are substituted by the nearest anchor of the same
//! physical group before an edge is exposed.

use std::collections::HashMap;

use log::debug;
use petgraph::unionfind::UnionFind;
use serde::{Deserialize, Serialize};

use crate::cluster::{build_clusters, ClusterMode};
use crate::geometry::Point;
use crate::index::ItemIndex;
use crate::item::{ItemKind, NetCode};
use crate::triangulate::triangulate;

/// A virtual "missing wire": the net needs copper between these two
/// points. `weight` is the squared Euclidean distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatsnestEdge {
    pub source: Point,
    pub target: Point,
    pub weight: i64,
}

#[derive(Debug, Clone)]
struct RnNode {
    pos: Point,
    /// Physical cluster the owning item belongs to.
    cluster: u32,
    no_line: bool,
}

/// The cached ratsnest graph of one net.
#[derive(Debug, Default)]
pub struct RnNet {
    nodes: Vec<RnNode>,
    edges: Vec<RatsnestEdge>,
}

impl RnNet {
    /// The missing-wire edges required to fully connect the net.
    pub fn edges(&self) -> &[RatsnestEdge] {
        &self.edges
    }

    /// Whether two anchor points are already physically joined. Points
    /// are matched exactly against the net's anchors; unknown points are
    /// never joined.
    pub fn points_joined(&self, a: Point, b: Point) -> bool {
        let find = |p: Point| self.nodes.iter().find(|n| n.pos == p).map(|n| n.cluster);
        match (find(a), find(b)) {
            (Some(ca), Some(cb)) => ca == cb,
            _ => false,
        }
    }
}

/// Rebuilds the ratsnest graph for `net`. Nets with code `<= 0` yield an
/// empty graph.
pub(crate) fn build_rn_net(index: &mut ItemIndex, net: NetCode) -> RnNet {
    if net <= 0 {
        return RnNet::default();
    }
    let clusters = build_clusters(index, ClusterMode::single_net(net));

    // Nodes: anchors of pads, tracks, and vias, labelled by cluster.
    // Zone islands join clusters but contribute no ratsnest endpoints.
    let mut nodes = Vec::new();
    let mut zero_edges: Vec<(usize, usize)> = Vec::new();
    for (ci, cluster) in clusters.iter().enumerate() {
        let first = nodes.len();
        for &r in &cluster.items {
            if r.kind == ItemKind::ZoneIsland {
                continue;
            }
            let item = index.item(r);
            let no_line = item.is_pad_no_line();
            for pos in item.anchor_points() {
                nodes.push(RnNode {
                    pos,
                    cluster: ci as u32,
                    no_line,
                });
            }
        }
        // Physical connections within one cluster, as a chain.
        for i in first + 1..nodes.len() {
            zero_edges.push((i - 1, i));
        }
    }

    // Delaunay requires distinct positions; co-located anchors are
    // chained to their representative with zero-weight edges.
    let mut rep_of_pos: HashMap<Point, usize> = HashMap::new();
    let mut reps: Vec<usize> = Vec::new();
    for (i, node) in nodes.iter().enumerate() {
        match rep_of_pos.get(&node.pos) {
            Some(&rep) => zero_edges.push((rep, i)),
            None => {
                rep_of_pos.insert(node.pos, i);
                reps.push(i);
            }
        }
    }

    let mut candidates: Vec<(i64, usize, usize)> = Vec::new();
    match reps.len() {
        0 | 1 => {}
        2 => candidates.push(candidate(&nodes, reps[0], reps[1])),
        _ => {
            let positions: Vec<Point> = reps.iter().map(|&i| nodes[i].pos).collect();
            let tri_edges = triangulate(&positions);
            if tri_edges.is_empty() {
                // Collinear input: chain consecutive sorted positions.
                let mut order = reps.clone();
                order.sort_unstable_by_key(|&i| nodes[i].pos);
                for pair in order.windows(2) {
                    candidates.push(candidate(&nodes, pair[0], pair[1]));
                }
            } else {
                for (a, b) in tri_edges {
                    candidates.push(candidate(&nodes, reps[a as usize], reps[b as usize]));
                }
            }
        }
    }
    candidates.sort_unstable();

    // Kruskal. Zero-weight edges are consumed silently, merely merging
    // tags; every positive-weight edge accepted past that boundary is a
    // missing connection.
    let mut tags: UnionFind<usize> = UnionFind::new(nodes.len());
    let mut accepted = 0usize;
    for &(a, b) in &zero_edges {
        if tags.union(a, b) {
            accepted += 1;
        }
    }
    let mut edges = Vec::new();
    let needed = nodes.len().saturating_sub(1);
    for &(weight, a, b) in &candidates {
        if accepted >= needed {
            break;
        }
        if !tags.union(a, b) {
            continue;
        }
        accepted += 1;
        let (s, t) = validate_edge(&nodes, a, b);
        edges.push(RatsnestEdge {
            source: nodes[s].pos,
            target: nodes[t].pos,
            weight,
        });
    }

    debug!(
        "ratsnest net {net}: {} anchors, {} clusters, {} missing connections",
        nodes.len(),
        clusters.len(),
        edges.len()
    );
    RnNet { nodes, edges }
}

fn candidate(nodes: &[RnNode], a: usize, b: usize) -> (i64, usize, usize) {
    (nodes[a].pos.distance_sq(nodes[b].pos), a, b)
}

/// Substitutes "no line" endpoints with the nearest usable node of the
/// same physical group, iterating until stable (endpoint substitution on
/// one side can change the nearest choice on the other).
fn validate_edge(nodes: &[RnNode], mut s: usize, mut t: usize) -> (usize, usize) {
    loop {
        let mut changed = false;
        if nodes[s].no_line {
            if let Some(sub) = nearest_line_node(nodes, s, nodes[t].pos) {
                s = sub;
                changed = true;
            }
        }
        if nodes[t].no_line {
            if let Some(sub) = nearest_line_node(nodes, t, nodes[s].pos) {
                t = sub;
                changed = true;
            }
        }
        if !changed {
            return (s, t);
        }
    }
}

fn nearest_line_node(nodes: &[RnNode], from: usize, toward: Point) -> Option<usize> {
    let group = nodes[from].cluster;
    nodes
        .iter()
        .enumerate()
        .filter(|(_, n)| n.cluster == group && !n.no_line)
        .min_by_key(|(i, n)| (n.pos.distance_sq(toward), *i))
        .map(|(i, _)| i)
}
