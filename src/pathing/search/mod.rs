//! Shared vocabulary of the fine and coarse search engines
//!
//! Both engines are best-first searches over a regular grid. They differ in
//! the unit of space they expand, cells versus blocks, but share their goal
//! description, their outcome taxonomy and the deterministic ordering of
//! their open list.
//!

use std::cmp::Ordering;

use bevy::prelude::*;
use ordered_float::OrderedFloat;

use crate::prelude::*;

pub mod coarse;
pub mod fine;

/// Outcome of a search, also the lifecycle state of a stored path
///
/// Variants are ordered from best to worst so that when a request is tried at
/// several resolutions the candidate with the lowest ordinal wins
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Reflect)]
pub enum PathResult {
	/// The search reached the goal
	Ok,
	/// The search ran out of node budget, the path leads toward the goal but
	/// does not reach it
	GoalOutOfRange,
	/// The reachable space was exhausted without touching the goal, the path
	/// ends at the closest approachable point
	CantGetCloser,
	/// The search could not run at all
	Error,
	/// No search has completed yet
	#[default]
	Uninitialized,
}

/// Description of what a search is asked to reach
#[derive(Clone, Copy, Debug)]
pub struct SearchGoal {
	/// World position of the goal
	goal: Vec3,
	/// Squared world-unit radius around the goal that counts as arrival
	sq_radius: f32,
	/// Largest number of nodes the search may expand
	node_budget: u32,
	/// Whether the search runs in the deterministic simulation domain and so
	/// must ignore unsynced cost layers
	synced: bool,
}

impl SearchGoal {
	/// Create a new instance of [SearchGoal]
	pub fn new(goal: Vec3, sq_radius: f32, node_budget: u32, synced: bool) -> Self {
		SearchGoal {
			goal,
			sq_radius,
			node_budget,
			synced,
		}
	}
	/// Get the goal position
	pub fn get_goal(&self) -> Vec3 {
		self.goal
	}
	/// Get the squared arrival radius
	pub fn get_sq_radius(&self) -> f32 {
		self.sq_radius
	}
	/// Get the node budget
	pub fn get_node_budget(&self) -> u32 {
		self.node_budget
	}
	/// Whether the search runs synced
	pub fn is_synced(&self) -> bool {
		self.synced
	}
	/// Whether a world position counts as having arrived at the goal
	pub fn is_reached(&self, position: Vec3) -> bool {
		sq_distance_2d(position, self.goal) <= self.sq_radius.max(f32::EPSILON)
	}
}

/// A path produced at one resolution, waypoints stored goal first so walking
/// the path pops off the tail
#[derive(Clone, Debug, Default)]
pub struct SubPath {
	/// World-space waypoints in goal-to-start order
	waypoints: Vec<Vec3>,
	/// The cells or block-offset cells the waypoints were lifted from, in the
	/// same goal-to-start order
	cells: Vec<GridCell>,
	/// The goal position the search was aimed at
	goal: Vec3,
}

impl SubPath {
	/// Create a new instance of [SubPath] from goal-first waypoint and cell
	/// lists
	pub fn new(waypoints: Vec<Vec3>, cells: Vec<GridCell>, goal: Vec3) -> Self {
		SubPath {
			waypoints,
			cells,
			goal,
		}
	}
	/// Get the waypoints in goal-to-start order
	pub fn get_waypoints(&self) -> &[Vec3] {
		&self.waypoints
	}
	/// Get the cells in goal-to-start order
	pub fn get_cells(&self) -> &[GridCell] {
		&self.cells
	}
	/// Get the goal position the search was aimed at
	pub fn get_goal(&self) -> Vec3 {
		self.goal
	}
	/// Whether no waypoints remain
	pub fn is_empty(&self) -> bool {
		self.waypoints.is_empty()
	}
	/// Number of waypoints remaining
	pub fn len(&self) -> usize {
		self.waypoints.len()
	}
	/// The next waypoint to walk toward, the tail of the list
	pub fn next_waypoint(&self) -> Option<Vec3> {
		self.waypoints.last().copied()
	}
	/// Consume the next waypoint off the tail
	pub fn pop_waypoint(&mut self) -> Option<Vec3> {
		self.cells.pop();
		self.waypoints.pop()
	}
	/// Overwrite the tail waypoint, used when stitching resolutions together
	pub fn set_tail(&mut self, position: Vec3) {
		if let Some(last) = self.waypoints.last_mut() {
			*last = position;
		}
	}
	/// Overwrite the head waypoint, the final point of the walk
	pub fn set_head(&mut self, position: Vec3) {
		if let Some(first) = self.waypoints.first_mut() {
			*first = position;
		}
	}
	/// Push an extra waypoint onto the tail, it becomes the next one walked
	pub fn push_tail(&mut self, position: Vec3, cell: GridCell) {
		self.waypoints.push(position);
		self.cells.push(cell);
	}
}

/// What a search engine hands back, the outcome paired with whatever path was
/// recovered
#[derive(Clone, Debug)]
pub struct SearchOutcome {
	/// How the search ended
	pub result: PathResult,
	/// The recovered path, empty unless the result says otherwise
	pub path: SubPath,
}

impl SearchOutcome {
	/// An outcome carrying no path at all
	pub fn failed(result: PathResult, goal: Vec3) -> Self {
		SearchOutcome {
			result,
			path: SubPath::new(Vec::new(), Vec::new(), goal),
		}
	}
}

/// Read-only view of every cost layer a search consults
pub struct SearchContext<'a> {
	/// Heights and surface types
	pub terrain: &'a TerrainGrid,
	/// Movement capability profiles
	pub mobility: &'a MobilityRegistry,
	/// Externally written extra costs
	pub overlay: &'a CostOverlay,
	/// Recently trafficked cells
	pub heat: &'a TrafficHeatMap,
	/// Dominant travel directions
	pub flow: &'a TrafficFlowMap,
}

/// An open-list entry ordered for a deterministic min-heap
///
/// [std::collections::BinaryHeap] is a max-heap so the comparison is flipped,
/// and ties in total cost break on the node index so expansion order never
/// depends on insertion order
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct HeapEntry {
	/// Estimated total cost through the node
	pub f: OrderedFloat<f32>,
	/// Linear index of the node
	pub index: u32,
}

impl Ord for HeapEntry {
	fn cmp(&self, other: &Self) -> Ordering {
		other
			.f
			.cmp(&self.f)
			.then_with(|| other.index.cmp(&self.index))
	}
}

impl PartialOrd for HeapEntry {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}
