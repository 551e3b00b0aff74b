//! Board artifacts and their arena representation.
//!
//! Callers describe copper with [`Artifact`] values; the engine stores one
//! [`ConnItem`] arena slot per pad, track, via, or filled-zone island.
//! Only pads carry an authoritative net assignment — everything else is
//! `mutable` and receives its net from propagation.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::geometry::{LayerSet, Point, Polygon};

/// Net code. Codes `<= 0` mean "no net" and are excluded from propagation
/// and ratsnest generation.
pub type NetCode = i32;

/// Caller-supplied stable identity handle for an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(pub u64);

/// The four item kinds tracked by the spatial index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemKind {
    Pad,
    Track,
    Via,
    ZoneIsland,
}

impl ItemKind {
    pub(crate) const COUNT: usize = 4;
    pub(crate) const ALL: [ItemKind; Self::COUNT] = [
        ItemKind::Pad,
        ItemKind::Track,
        ItemKind::Via,
        ItemKind::ZoneIsland,
    ];

    pub(crate) const fn index(self) -> usize {
        match self {
            ItemKind::Pad => 0,
            ItemKind::Track => 1,
            ItemKind::Via => 2,
            ItemKind::ZoneIsland => 3,
        }
    }
}

/// Hit-test shape of a pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PadShape {
    Circle { radius: i64 },
    /// Axis-aligned rectangle given by its half-extents.
    Rect { half_width: i64, half_height: i64 },
}

impl PadShape {
    pub fn bounding_radius(self) -> i64 {
        match self {
            PadShape::Circle { radius } => radius,
            PadShape::Rect {
                half_width,
                half_height,
            } => half_width.max(half_height),
        }
    }

    fn hit(self, center: Point, p: Point) -> bool {
        match self {
            PadShape::Circle { radius } => p.distance_sq(center) <= radius.saturating_mul(radius),
            PadShape::Rect {
                half_width,
                half_height,
            } => (p.x - center.x).abs() <= half_width && (p.y - center.y).abs() <= half_height,
        }
    }
}

/// A board artifact as described by the owning editor.
///
/// `Zone` carries the *output* of the fill engine: one outline per filled
/// island. Each island becomes its own connectivity item sharing the
/// zone's [`ItemId`].
#[derive(Debug, Clone)]
pub enum Artifact {
    Pad {
        id: ItemId,
        position: Point,
        shape: PadShape,
        layers: LayerSet,
        net: NetCode,
        /// Marks a pad that must not become a ratsnest edge endpoint.
        no_line: bool,
    },
    Track {
        id: ItemId,
        start: Point,
        end: Point,
        width: i64,
        layers: LayerSet,
        net: NetCode,
    },
    Via {
        id: ItemId,
        position: Point,
        diameter: i64,
        layers: LayerSet,
        net: NetCode,
    },
    Zone {
        id: ItemId,
        net: NetCode,
        layers: LayerSet,
        islands: Vec<Vec<Point>>,
    },
}

impl Artifact {
    pub fn id(&self) -> ItemId {
        match *self {
            Artifact::Pad { id, .. }
            | Artifact::Track { id, .. }
            | Artifact::Via { id, .. }
            | Artifact::Zone { id, .. } => id,
        }
    }

    pub fn net(&self) -> NetCode {
        match *self {
            Artifact::Pad { net, .. }
            | Artifact::Track { net, .. }
            | Artifact::Via { net, .. }
            | Artifact::Zone { net, .. } => net,
        }
    }

    pub(crate) fn kind(&self) -> ItemKind {
        match self {
            Artifact::Pad { .. } => ItemKind::Pad,
            Artifact::Track { .. } => ItemKind::Track,
            Artifact::Via { .. } => ItemKind::Via,
            Artifact::Zone { .. } => ItemKind::ZoneIsland,
        }
    }
}

/// Geometry of one arena item.
#[derive(Debug, Clone)]
pub(crate) enum ItemShape {
    Pad {
        position: Point,
        shape: PadShape,
        no_line: bool,
    },
    Track {
        start: Point,
        end: Point,
        half_width: i64,
    },
    Via {
        position: Point,
        radius: i64,
    },
    ZoneIsland {
        outline: Polygon,
    },
}

/// Reference to an arena slot: item kind plus index into that kind's list.
///
/// Indices are stable between compactions; `remove_invalid_items` remaps
/// every stored reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ItemRef {
    pub kind: ItemKind,
    pub index: u32,
}

/// One connectivity item: an arena slot wrapping a single pad, track, via,
/// or zone island.
#[derive(Debug, Clone)]
pub(crate) struct ConnItem {
    pub id: ItemId,
    /// Island index within the owning zone artifact; 0 for other kinds.
    pub island: u32,
    pub net: NetCode,
    pub layers: LayerSet,
    pub shape: ItemShape,
    /// Pads are immutable net sources; everything else is writable.
    pub mutable: bool,
    /// Lazy-delete tombstone. Cleared slots are purged by compaction.
    pub valid: bool,
    /// Needs a contact re-scan.
    pub dirty: bool,
    /// Monotonic insertion sequence number; the total order behind
    /// first-pad-wins origin-net resolution.
    pub seq: u64,
    /// Symmetric adjacency discovered by the contact detector.
    pub connections: Vec<ItemRef>,
}

impl ConnItem {
    /// Anchor points contributed to the spatial index: pad/via centers,
    /// track endpoints, zone-island outline vertices.
    pub(crate) fn anchor_points(&self) -> SmallVec<[Point; 2]> {
        match &self.shape {
            ItemShape::Pad { position, .. } | ItemShape::Via { position, .. } => {
                SmallVec::from_slice(&[*position])
            }
            ItemShape::Track { start, end, .. } => SmallVec::from_slice(&[*start, *end]),
            ItemShape::ZoneIsland { outline } => outline.points().iter().copied().collect(),
        }
    }

    /// Kind-specific probe radius used when searching for neighbors.
    /// Zone islands use their bounding box instead.
    pub(crate) fn probe_radius(&self) -> i64 {
        match &self.shape {
            ItemShape::Pad { shape, .. } => shape.bounding_radius(),
            ItemShape::Track { half_width, .. } => *half_width,
            ItemShape::Via { radius, .. } => *radius,
            ItemShape::ZoneIsland { .. } => 0,
        }
    }

    /// Point-vs-item acceptance test for pads, vias, and tracks.
    ///
    /// Tracks use the endpoint-proximity approximation inherited from the
    /// legacy engine: a point connects iff it lies within half-width of
    /// one of the two endpoints, not of the segment itself.
    pub(crate) fn hit_test(&self, p: Point) -> bool {
        match &self.shape {
            ItemShape::Pad { position, shape, .. } => shape.hit(*position, p),
            ItemShape::Track {
                start,
                end,
                half_width,
            } => {
                let r2 = half_width.saturating_mul(*half_width);
                p.distance_sq(*start) <= r2 || p.distance_sq(*end) <= r2
            }
            ItemShape::Via { position, radius } => {
                p.distance_sq(*position) <= radius.saturating_mul(*radius)
            }
            ItemShape::ZoneIsland { outline } => outline.contains(p),
        }
    }

    pub(crate) fn is_pad_no_line(&self) -> bool {
        matches!(self.shape, ItemShape::Pad { no_line: true, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_hit_is_endpoint_only() {
        let track = ConnItem {
            id: ItemId(1),
            island: 0,
            net: 0,
            layers: LayerSet::single(0),
            shape: ItemShape::Track {
                start: Point::new(0, 0),
                end: Point::new(100, 0),
                half_width: 5,
            },
            mutable: true,
            valid: true,
            dirty: false,
            seq: 0,
            connections: Vec::new(),
        };
        assert!(track.hit_test(Point::new(3, 0)));
        assert!(track.hit_test(Point::new(97, 3)));
        // Midpoint overlap is intentionally missed.
        assert!(!track.hit_test(Point::new(50, 0)));
    }

    #[test]
    fn rect_pad_hit() {
        let shape = PadShape::Rect {
            half_width: 10,
            half_height: 4,
        };
        assert!(shape.hit(Point::new(0, 0), Point::new(9, -4)));
        assert!(!shape.hit(Point::new(0, 0), Point::new(9, 5)));
        assert_eq!(shape.bounding_radius(), 10);
    }
}
