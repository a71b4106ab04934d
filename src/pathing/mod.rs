//! Hierarchical path planning over a regular 2D grid of cells.
//!
//! The map is searched at three resolutions. The fine level works on individual
//! cells. The medium and low levels work on `Block`s, square aggregations of
//! many cells, whose traversal costs are precomputed and kept current by an
//! incremental update pass. A request is arranged across the resolutions by
//! the [manager::PathManager]: nearby goals are solved directly at cell level,
//! distant goals are solved coarsely and then refined chunk by chunk into cell
//! level as the agent walks the path.
//!
//! Definitions:
//!
//! * Cell - the finest unit of space, a square of `cell_size` world units
//! * Block - a square of `BxB` cells used as the search unit of a coarse level
//! * Mobility class - a movement-capability profile that maps terrain surface
//!   types to speed modifiers (`0.0` meaning impassable)
//! * Waypoint - a world-space point of a path; paths store the goal first so
//!   that the next waypoint is always popped off the tail
//!
//! Paths are requested for a mobility class between two world positions and
//! handed out as an opaque numeric id. Id `0` always means "no path".
//!

pub mod cache;
pub mod grid;
pub mod heat;
pub mod level;
pub mod manager;
pub mod mobility;
pub mod overlay;
pub mod search;
pub mod terrain;

/// Cells per block edge at the medium resolution
pub const MED_BLOCK_SIZE: u32 = 16;
/// Cells per block edge at the low resolution
pub const LOW_BLOCK_SIZE: u32 = 32;

/// Goal-distance cap (in cells) under which the fine level is tried
pub const FINE_SEARCH_DISTANCE: f32 = 50.0;
/// Goal-distance cap (in cells) under which the medium level is tried
pub const MED_SEARCH_DISTANCE: f32 = 1000.0;

/// Goal-distance cap (in cells) under which the raw straight-line walk is
/// attempted before any best-first search
pub const RAW_SEARCH_DISTANCE: f32 = 50.0;

/// Node-expansion budget of a fine search during request arrangement
pub const FINE_NODE_BUDGET: u32 = 8192;
/// Node-expansion budget of a coarse search during request arrangement
pub const COARSE_NODE_BUDGET: u32 = 8192;
/// Node-expansion budget of a fine search that refines a coarse segment
pub const REFINE_NODE_BUDGET: u32 = 8192;

/// Look-ahead distance in cells: when the remaining fine sub-path gets shorter
/// than this the next chunk of the coarse sub-path is refined
pub const FINE_EXTENSION_DISTANCE: f32 = 16.0;

/// Upper bound of dirty blocks recomputed by one incremental update call
pub const BLOCKS_TO_UPDATE: usize = 16;
/// Simulation ticks between refreshes of the medium/low update workload ratio
pub const TICKS_PER_RATIO_REFRESH: u32 = 30;

/// The eight traversal directions of a cell or block, as `(column, row)`
/// deltas, ordered clockwise starting north
pub const DIRECTIONS: [(i32, i32); 8] = [
	(0, -1),
	(1, -1),
	(1, 0),
	(1, 1),
	(0, 1),
	(-1, 1),
	(-1, 0),
	(-1, -1),
];
