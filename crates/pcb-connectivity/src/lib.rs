//! Geometric connectivity for PCB layouts.
//!
//! Given a board's copper artifacts — pads, track segments, vias, and the
//! filled-island output of a zone fill engine — this crate determines
//! which of them are electrically joined purely from geometry. Only pads
//! carry an authoritative net assignment; everything else receives its
//! net by propagation over touching copper.
//!
//! The central structure is [`Connectivity`], which owns the items and
//! answers the four questions downstream tools ask:
//!
//! * [`Connectivity::propagate_nets`] – push pad nets onto touching
//!   tracks and vias.
//! * [`Connectivity::find_isolated_copper_islands`] – zone islands with
//!   no net terminal, returned for deletion by the fill engine.
//! * [`Connectivity::check_connectivity`] – nets split into several
//!   physically-disjoint groups.
//! * [`Connectivity::ratsnest_edges`] – the minimal "missing wire" edge
//!   set per net (Delaunay candidates + Kruskal MST).
//!
//! The engine is incremental: edits mark items and nets dirty, and every
//! query re-scans only what changed. It is single-threaded and meant to
//! be exclusively owned by one edit session.

mod cluster;
mod connectivity;
mod contact;
mod dirty;
pub mod geometry;
mod index;
pub mod item;
pub mod ratsnest;
mod triangulate;

pub use connectivity::{Connectivity, NetConflict, NetDisjointEntry, PropagationReport};
pub use geometry::{BoundingBox, LayerSet, Point, Polygon};
pub use item::{Artifact, ItemId, NetCode, PadShape};
pub use ratsnest::{RatsnestEdge, RnNet};
