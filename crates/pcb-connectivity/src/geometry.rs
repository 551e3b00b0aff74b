//! Geometric primitives shared by the connectivity engine.
//!
//! Coordinates are integer board units (`i64`). Squared distances are
//! computed in `i128` and saturated back to `i64`, since the engine only
//! ever *compares* distances and never sums them for display.

use serde::{Deserialize, Serialize};

/// A point in integer board units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Squared Euclidean distance to `other`, saturated to `i64::MAX`.
    pub fn distance_sq(self, other: Point) -> i64 {
        let dx = (self.x - other.x) as i128;
        let dy = (self.y - other.y) as i128;
        let d = dx * dx + dy * dy;
        if d > i64::MAX as i128 {
            i64::MAX
        } else {
            d as i64
        }
    }
}

/// Axis-aligned bounding box, inclusive on all edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min: Point,
    pub max: Point,
}

impl BoundingBox {
    pub fn new(min: Point, max: Point) -> Self {
        Self { min, max }
    }

    /// Smallest box covering all `points`. Returns `None` for an empty set.
    pub fn from_points(points: &[Point]) -> Option<Self> {
        let first = *points.first()?;
        let mut bbox = Self::new(first, first);
        for p in &points[1..] {
            bbox.min.x = bbox.min.x.min(p.x);
            bbox.min.y = bbox.min.y.min(p.y);
            bbox.max.x = bbox.max.x.max(p.x);
            bbox.max.y = bbox.max.y.max(p.y);
        }
        Some(bbox)
    }

    pub fn around(center: Point, radius: i64) -> Self {
        Self::new(
            Point::new(center.x - radius, center.y - radius),
            Point::new(center.x + radius, center.y + radius),
        )
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    pub fn inflated(&self, margin: i64) -> Self {
        Self::new(
            Point::new(self.min.x - margin, self.min.y - margin),
            Point::new(self.max.x + margin, self.max.y + margin),
        )
    }
}

/// A set of copper layers, one bit per layer ordinal.
///
/// Two items can only be in electrical contact when their layer sets
/// overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LayerSet(pub u32);

impl LayerSet {
    /// The set containing only layer `layer` (0 = front copper).
    pub const fn single(layer: u8) -> Self {
        Self(1 << layer)
    }

    /// The contiguous range `[from, to]` of layers, e.g. a through via.
    pub const fn range(from: u8, to: u8) -> Self {
        let lo = 1u32 << from;
        let hi = 1u32 << to;
        Self((hi - lo) | hi)
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn overlaps(self, other: LayerSet) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn union(self, other: LayerSet) -> Self {
        Self(self.0 | other.0)
    }
}

/// Number of y-strips the edge partition is bucketed into.
const PARTITION_BINS: usize = 32;

/// A closed polygon outline with a cached edge partition for fast
/// point-in-polygon tests.
///
/// The partition buckets edges into horizontal strips so a containment
/// test only walks the edges whose y-range covers the query point. It is
/// owned by the item that owns the polygon and rebuilt whenever the owner
/// is re-registered.
#[derive(Debug, Clone)]
pub struct Polygon {
    points: Vec<Point>,
    bbox: BoundingBox,
    bins: Vec<Vec<(Point, Point)>>,
    bin_height: i64,
}

impl Polygon {
    /// Builds a polygon and its edge partition. Returns `None` for
    /// degenerate outlines with fewer than 3 vertices.
    pub fn new(points: Vec<Point>) -> Option<Self> {
        if points.len() < 3 {
            return None;
        }
        let bbox = BoundingBox::from_points(&points)?;
        let height = (bbox.max.y - bbox.min.y).max(1);
        let bin_height = (height + PARTITION_BINS as i64 - 1) / PARTITION_BINS as i64;
        let mut bins = vec![Vec::new(); PARTITION_BINS];
        for i in 0..points.len() {
            let a = points[i];
            let b = points[(i + 1) % points.len()];
            let lo = bin_of(a.y.min(b.y), bbox.min.y, bin_height);
            let hi = bin_of(a.y.max(b.y), bbox.min.y, bin_height);
            for bin in &mut bins[lo..=hi] {
                bin.push((a, b));
            }
        }
        Some(Self {
            points,
            bbox,
            bins,
            bin_height,
        })
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    pub fn has_vertex(&self, p: Point) -> bool {
        self.points.contains(&p)
    }

    /// Even-odd containment test against the cached partition.
    pub fn contains(&self, p: Point) -> bool {
        if !self.bbox.contains(p) {
            return false;
        }
        let bin = bin_of(p.y, self.bbox.min.y, self.bin_height);
        let mut inside = false;
        for &(a, b) in &self.bins[bin] {
            if (a.y > p.y) != (b.y > p.y) {
                // The horizontal ray from `p` crosses this edge iff the
                // crossing x lies strictly to the right of `p`; evaluated
                // without division to stay exact.
                let num = (p.y - a.y) as i128 * (b.x - a.x) as i128
                    - (p.x - a.x) as i128 * (b.y - a.y) as i128;
                let crosses = if b.y > a.y { num > 0 } else { num < 0 };
                if crosses {
                    inside = !inside;
                }
            }
        }
        inside
    }
}

fn bin_of(y: i64, min_y: i64, bin_height: i64) -> usize {
    let idx = (y - min_y) / bin_height;
    idx.clamp(0, PARTITION_BINS as i64 - 1) as usize
}
