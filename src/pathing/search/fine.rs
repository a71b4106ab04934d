//! The cell-resolution search engine
//!
//! A [CellFinder] owns reusable scratch buffers sized to the map so repeated
//! searches never reallocate. Workers of the parallel request drain each own
//! a private finder, the buffers are never shared.
//!

use std::collections::BinaryHeap;

use bevy::prelude::*;
use ordered_float::OrderedFloat;

use crate::prelude::*;

/// Best-first search over individual cells with reusable scratch space
pub struct CellFinder {
	/// Dimensions of the map
	dims: GridDimensions,
	/// Cost from the start to each touched cell
	g: Vec<f32>,
	/// Linear index of the cell each touched cell was reached from
	parent: Vec<u32>,
	/// Stamp marking which search last touched a cell, avoids clearing the
	/// buffers between searches
	open_stamp: Vec<u32>,
	/// Stamp marking which search last expanded a cell
	closed_stamp: Vec<u32>,
	/// The stamp of the search currently running
	stamp: u32,
	/// The open list
	heap: BinaryHeap<HeapEntry>,
}

impl CellFinder {
	/// Create a new instance of [CellFinder] with buffers sized to the map
	pub fn new(dims: GridDimensions) -> Self {
		let count = dims.cell_count();
		CellFinder {
			dims,
			g: vec![0.0; count],
			parent: vec![0; count],
			open_stamp: vec![0; count],
			closed_stamp: vec![0; count],
			stamp: 0,
			heap: BinaryHeap::new(),
		}
	}
	/// Search from a world position toward a goal for one mobility class
	pub fn search(
		&mut self,
		ctx: &SearchContext,
		start: Vec3,
		goal: &SearchGoal,
		class_id: MobilityClassId,
	) -> SearchOutcome {
		let Some(class) = ctx.mobility.get(class_id) else {
			return SearchOutcome::failed(PathResult::Error, goal.get_goal());
		};
		let max_speed_mod = class_max_speed_mod(class);
		if max_speed_mod <= 0.0 {
			return SearchOutcome::failed(PathResult::Error, goal.get_goal());
		}
		let Some(start_cell) = self.dims.cell_from_world(start) else {
			return SearchOutcome::failed(PathResult::Error, goal.get_goal());
		};
		let goal_cell = self.dims.clamped_cell_from_world(goal.get_goal());
		self.reset();
		let start_index = self.dims.cell_index(start_cell) as u32;
		self.open(start_index, 0.0, start_index);
		self.heap.push(HeapEntry {
			f: OrderedFloat(self.heuristic(start_cell, goal_cell, max_speed_mod)),
			index: start_index,
		});
		// closest approach so far, by heuristic then index
		let mut best = (
			OrderedFloat(self.heuristic(start_cell, goal_cell, max_speed_mod)),
			start_index,
		);
		let mut expanded: u32 = 0;
		while let Some(entry) = self.heap.pop() {
			let index = entry.index;
			if self.closed_stamp[index as usize] == self.stamp {
				continue;
			}
			self.closed_stamp[index as usize] = self.stamp;
			let cell = self.dims.cell_from_index(index as usize);
			if cell == goal_cell || goal.is_reached(ctx.terrain.world_position(cell)) {
				return SearchOutcome {
					result: PathResult::Ok,
					path: self.rebuild(ctx, index, goal.get_goal()),
				};
			}
			let h = OrderedFloat(self.heuristic(cell, goal_cell, max_speed_mod));
			if (h, index) < best {
				best = (h, index);
			}
			expanded += 1;
			if expanded >= goal.get_node_budget() {
				return self.partial(ctx, PathResult::GoalOutOfRange, best.1, start_index, goal);
			}
			for delta in DIRECTIONS.iter() {
				let Some(next) = self.step(cell, *delta) else {
					continue;
				};
				let speed_mod = class.speed_mod(ctx.terrain.surface(next));
				if speed_mod <= 0.0 {
					continue;
				}
				// a diagonal step must not cut a blocked corner
				if delta.0 != 0 && delta.1 != 0 && !self.corner_open(ctx, class_id, cell, *delta) {
					continue;
				}
				let next_index = self.dims.cell_index(next) as u32;
				if self.closed_stamp[next_index as usize] == self.stamp {
					continue;
				}
				let step_len = if delta.0 != 0 && delta.1 != 0 {
					self.dims.get_cell_size() * std::f32::consts::SQRT_2
				} else {
					self.dims.get_cell_size()
				};
				let extra = ctx.overlay.cost(next, goal.is_synced()).max(0.0)
					+ ctx.heat.cost(next)
					+ ctx.flow.cost(
						next,
						bevy::math::Vec2::new(delta.0 as f32, delta.1 as f32),
					);
				let tentative = self.g[index as usize] + step_len / speed_mod + extra;
				let fresh = self.open_stamp[next_index as usize] != self.stamp;
				if fresh || tentative < self.g[next_index as usize] {
					self.open(next_index, tentative, index);
					self.heap.push(HeapEntry {
						f: OrderedFloat(tentative + self.heuristic(next, goal_cell, max_speed_mod)),
						index: next_index,
					});
				}
			}
		}
		self.partial(ctx, PathResult::CantGetCloser, best.1, start_index, goal)
	}
	/// Walk a straight line toward the goal, succeeding only when every cell
	/// along it is passable. Much cheaper than a search and tried first for
	/// nearby goals
	pub fn raw_search(
		&self,
		ctx: &SearchContext,
		start: Vec3,
		goal: &SearchGoal,
		class_id: MobilityClassId,
	) -> Option<SubPath> {
		let class = ctx.mobility.get(class_id)?;
		let start_cell = self.dims.cell_from_world(start)?;
		let goal_cell = self.dims.clamped_cell_from_world(goal.get_goal());
		let line = line_cells(start_cell, goal_cell);
		for cell in line.iter() {
			if !class.is_passable(ctx.terrain.surface(*cell)) {
				return None;
			}
		}
		let mut waypoints = Vec::with_capacity(line.len());
		let mut cells = Vec::with_capacity(line.len());
		for cell in line.iter().rev() {
			waypoints.push(ctx.terrain.world_position(*cell));
			cells.push(*cell);
		}
		Some(SubPath::new(waypoints, cells, goal.get_goal()))
	}
	/// Advance the scratch stamp, logically clearing all buffers
	fn reset(&mut self) {
		self.stamp = self.stamp.wrapping_add(1);
		if self.stamp == 0 {
			// the stamp wrapped, stale entries could alias the new stamp
			self.open_stamp.fill(0);
			self.closed_stamp.fill(0);
			self.stamp = 1;
		}
		self.heap.clear();
	}
	/// Record a cell as touched by the current search
	fn open(&mut self, index: u32, g: f32, parent: u32) {
		self.g[index as usize] = g;
		self.parent[index as usize] = parent;
		self.open_stamp[index as usize] = self.stamp;
	}
	/// Neighbour of a cell along a direction delta, [None] off the map
	fn step(&self, cell: GridCell, delta: (i32, i32)) -> Option<GridCell> {
		let column = cell.get_column() as i32 + delta.0;
		let row = cell.get_row() as i32 + delta.1;
		if column < 0 || row < 0 {
			return None;
		}
		let next = GridCell::new(column as u32, row as u32);
		if self.dims.contains_cell(next) {
			Some(next)
		} else {
			None
		}
	}
	/// Whether both orthogonal neighbours flanking a diagonal step are
	/// passable
	fn corner_open(
		&self,
		ctx: &SearchContext,
		class_id: MobilityClassId,
		cell: GridCell,
		delta: (i32, i32),
	) -> bool {
		let class = ctx.mobility.class(class_id);
		for flank in [(delta.0, 0), (0, delta.1)] {
			match self.step(cell, flank) {
				Some(side) => {
					if !class.is_passable(ctx.terrain.surface(side)) {
						return false;
					}
				}
				None => return false,
			}
		}
		true
	}
	/// Straight-line distance at the best speed the class can ever reach,
	/// never overestimates the true cost
	fn heuristic(&self, cell: GridCell, goal: GridCell, max_speed_mod: f32) -> f32 {
		let dx = cell.get_column() as f32 - goal.get_column() as f32;
		let dz = cell.get_row() as f32 - goal.get_row() as f32;
		(dx * dx + dz * dz).sqrt() * self.dims.get_cell_size() / max_speed_mod
	}
	/// Rebuild the goal-first path by walking the parent chain from a node
	/// back to the start
	fn rebuild(&self, ctx: &SearchContext, end: u32, goal: Vec3) -> SubPath {
		let mut waypoints = Vec::new();
		let mut cells = Vec::new();
		let mut index = end;
		loop {
			let cell = self.dims.cell_from_index(index as usize);
			waypoints.push(ctx.terrain.world_position(cell));
			cells.push(cell);
			let parent = self.parent[index as usize];
			if parent == index {
				break;
			}
			index = parent;
		}
		SubPath::new(waypoints, cells, goal)
	}
	/// Outcome for a search that ended short of the goal
	fn partial(
		&self,
		ctx: &SearchContext,
		result: PathResult,
		best: u32,
		start: u32,
		goal: &SearchGoal,
	) -> SearchOutcome {
		if best == start {
			return SearchOutcome::failed(result, goal.get_goal());
		}
		SearchOutcome {
			result,
			path: self.rebuild(ctx, best, goal.get_goal()),
		}
	}
}

/// Cells along the straight segment between two cells, start first, by
/// integer line walk
pub fn line_cells(from: GridCell, to: GridCell) -> Vec<GridCell> {
	let mut cells = Vec::new();
	let mut x = from.get_column() as i64;
	let mut y = from.get_row() as i64;
	let tx = to.get_column() as i64;
	let ty = to.get_row() as i64;
	let dx = (tx - x).abs();
	let dy = (ty - y).abs();
	let sx = if x < tx { 1 } else { -1 };
	let sy = if y < ty { 1 } else { -1 };
	let mut err = dx - dy;
	loop {
		cells.push(GridCell::new(x as u32, y as u32));
		if x == tx && y == ty {
			break;
		}
		let doubled = 2 * err;
		if doubled > -dy {
			err -= dy;
			x += sx;
		}
		if doubled < dx {
			err += dx;
			y += sy;
		}
	}
	cells
}

/// Best speed modifier a class reaches on any surface
pub fn class_max_speed_mod(class: &MobilityClass) -> f32 {
	let mut max = 0.0_f32;
	for surface in 0..=u8::MAX {
		max = max.max(class.speed_mod(surface));
	}
	max
}
