//! The block-resolution search engine
//!
//! A [BlockFinder] runs the same best-first loop as the fine engine but its
//! nodes are the blocks of one [LevelState] and its edge costs are the
//! precomputed vertex costs, so a search across the whole map expands a few
//! hundred nodes instead of millions of cells. Its waypoints are the block
//! representative cells and are only ever walked after fine refinement.
//!

use std::collections::BinaryHeap;

use bevy::prelude::*;
use ordered_float::OrderedFloat;

use crate::prelude::*;

/// Best-first search over the blocks of one coarse level
pub struct BlockFinder {
	/// Number of block columns and rows of the level this finder serves
	blocks: (u32, u32),
	/// Cells per block edge of that level
	block_size: u32,
	/// Cost from the start to each touched block
	g: Vec<f32>,
	/// Linear index of the block each touched block was reached from
	parent: Vec<u32>,
	/// Stamp marking which search last touched a block
	open_stamp: Vec<u32>,
	/// Stamp marking which search last expanded a block
	closed_stamp: Vec<u32>,
	/// The stamp of the search currently running
	stamp: u32,
	/// The open list
	heap: BinaryHeap<HeapEntry>,
}

impl BlockFinder {
	/// Create a new instance of [BlockFinder] with buffers sized to the block
	/// grid of a level
	pub fn new(level: &LevelState) -> Self {
		let blocks = level.get_blocks();
		let count = blocks.0 as usize * blocks.1 as usize;
		BlockFinder {
			blocks,
			block_size: level.get_block_size(),
			g: vec![0.0; count],
			parent: vec![0; count],
			open_stamp: vec![0; count],
			closed_stamp: vec![0; count],
			stamp: 0,
			heap: BinaryHeap::new(),
		}
	}
	/// Search from a world position toward a goal across the blocks of a
	/// level. The level must be the one the finder was sized for
	pub fn search(
		&mut self,
		ctx: &SearchContext,
		level: &LevelState,
		start: Vec3,
		goal: &SearchGoal,
		class_id: MobilityClassId,
	) -> SearchOutcome {
		debug_assert_eq!(self.blocks, level.get_blocks());
		let dims = *ctx.terrain.get_dimensions();
		let Some(class) = ctx.mobility.get(class_id) else {
			return SearchOutcome::failed(PathResult::Error, goal.get_goal());
		};
		let max_speed_mod = class_max_speed_mod(class);
		if max_speed_mod <= 0.0 {
			return SearchOutcome::failed(PathResult::Error, goal.get_goal());
		}
		let Some(start_cell) = dims.cell_from_world(start) else {
			return SearchOutcome::failed(PathResult::Error, goal.get_goal());
		};
		let start_block = dims.block_from_cell(start_cell, self.block_size);
		if level.offset_cell(class_id, start_block).is_none() {
			return SearchOutcome::failed(PathResult::Error, goal.get_goal());
		}
		let goal_cell = dims.clamped_cell_from_world(goal.get_goal());
		let goal_block = dims.block_from_cell(goal_cell, self.block_size);
		self.reset();
		let start_index = level.block_index(start_block) as u32;
		self.open(start_index, 0.0, start_index);
		self.heap.push(HeapEntry {
			f: OrderedFloat(self.heuristic(&dims, start_block, goal_block, max_speed_mod)),
			index: start_index,
		});
		let mut best = (
			OrderedFloat(self.heuristic(&dims, start_block, goal_block, max_speed_mod)),
			start_index,
		);
		let mut expanded: u32 = 0;
		while let Some(entry) = self.heap.pop() {
			let index = entry.index;
			if self.closed_stamp[index as usize] == self.stamp {
				continue;
			}
			self.closed_stamp[index as usize] = self.stamp;
			let block = level.block_from_index(index as usize);
			let reached = block == goal_block
				|| level
					.offset_cell(class_id, block)
					.is_some_and(|cell| goal.is_reached(ctx.terrain.world_position(cell)));
			if reached {
				return SearchOutcome {
					result: PathResult::Ok,
					path: self.rebuild(ctx, level, class_id, index, goal.get_goal()),
				};
			}
			let h = OrderedFloat(self.heuristic(&dims, block, goal_block, max_speed_mod));
			if (h, index) < best {
				best = (h, index);
			}
			expanded += 1;
			if expanded >= goal.get_node_budget() {
				return self.partial(ctx, level, class_id, PathResult::GoalOutOfRange, best.1, start_index, goal);
			}
			for (direction, delta) in DIRECTIONS.iter().enumerate() {
				let cost = level.vertex_cost(class_id, block, direction);
				if !cost.is_finite() {
					continue;
				}
				let Some(next) = level.neighbour(block, *delta) else {
					continue;
				};
				let next_index = level.block_index(next) as u32;
				if self.closed_stamp[next_index as usize] == self.stamp {
					continue;
				}
				let tentative = self.g[index as usize] + cost;
				let fresh = self.open_stamp[next_index as usize] != self.stamp;
				if fresh || tentative < self.g[next_index as usize] {
					self.open(next_index, tentative, index);
					self.heap.push(HeapEntry {
						f: OrderedFloat(tentative + self.heuristic(&dims, next, goal_block, max_speed_mod)),
						index: next_index,
					});
				}
			}
		}
		self.partial(ctx, level, class_id, PathResult::CantGetCloser, best.1, start_index, goal)
	}
	/// Advance the scratch stamp, logically clearing all buffers
	fn reset(&mut self) {
		self.stamp = self.stamp.wrapping_add(1);
		if self.stamp == 0 {
			self.open_stamp.fill(0);
			self.closed_stamp.fill(0);
			self.stamp = 1;
		}
		self.heap.clear();
	}
	/// Record a block as touched by the current search
	fn open(&mut self, index: u32, g: f32, parent: u32) {
		self.g[index as usize] = g;
		self.parent[index as usize] = parent;
		self.open_stamp[index as usize] = self.stamp;
	}
	/// Straight-line distance between block centres at the best class speed
	fn heuristic(&self, dims: &GridDimensions, block: BlockPos, goal: BlockPos, max_speed_mod: f32) -> f32 {
		let dx = (block.get_column() as f32 - goal.get_column() as f32) * self.block_size as f32;
		let dz = (block.get_row() as f32 - goal.get_row() as f32) * self.block_size as f32;
		(dx * dx + dz * dz).sqrt() * dims.get_cell_size() / max_speed_mod
	}
	/// Rebuild the goal-first path of block representatives by walking the
	/// parent chain
	fn rebuild(
		&self,
		ctx: &SearchContext,
		level: &LevelState,
		class_id: MobilityClassId,
		end: u32,
		goal: Vec3,
	) -> SubPath {
		let mut waypoints = Vec::new();
		let mut cells = Vec::new();
		let mut index = end;
		loop {
			let block = level.block_from_index(index as usize);
			if let Some(cell) = level.offset_cell(class_id, block) {
				waypoints.push(ctx.terrain.world_position(cell));
				cells.push(cell);
			}
			let parent = self.parent[index as usize];
			if parent == index {
				break;
			}
			index = parent;
		}
		SubPath::new(waypoints, cells, goal)
	}
	/// Outcome for a search that ended short of the goal
	#[allow(clippy::too_many_arguments)]
	fn partial(
		&self,
		ctx: &SearchContext,
		level: &LevelState,
		class_id: MobilityClassId,
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
			path: self.rebuild(ctx, level, class_id, best, goal.get_goal()),
		}
	}
}

// #[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;

	/// A flat 64x64 map carved by the given wall cells, one walker class
	fn fixture(
		dims: GridDimensions,
		walls: &[(u32, u32)],
	) -> (TerrainGrid, MobilityRegistry, CostOverlay, TrafficHeatMap, TrafficFlowMap) {
		let mut terrain = TerrainGrid::flat(dims);
		for (column, row) in walls {
			terrain.set_surface(GridCell::new(*column, *row), 1);
		}
		(
			terrain,
			MobilityRegistry::new(vec![MobilityClass::new("walker", vec![1.0, 0.0])]),
			CostOverlay::new(dims),
			TrafficHeatMap::new(dims),
			TrafficFlowMap::new(dims),
		)
	}
	/// Bundle borrows of a fixture into a [SearchContext]
	macro_rules! ctx {
		($f:expr) => {
			SearchContext {
				terrain: &$f.0,
				mobility: &$f.1,
				overlay: &$f.2,
				heat: &$f.3,
				flow: &$f.4,
			}
		};
	}
	#[test]
	fn crosses_open_map() {
		let dims = GridDimensions::new(64, 64, 1.0);
		let f = fixture(dims, &[]);
		let level = LevelState::build(dims, 8, &f.0, &f.1);
		let mut finder = BlockFinder::new(&level);
		let goal = SearchGoal::new(Vec3::new(60.5, 0.0, 60.5), 0.0, 1024, true);
		let outcome = finder.search(&ctx!(f), &level, Vec3::new(0.5, 0.0, 0.5), &goal, MobilityClassId::new(0));
		assert_eq!(PathResult::Ok, outcome.result);
		assert!(outcome.path.len() > 2);
	}
	#[test]
	fn routes_around_full_height_wall() {
		// a wall across all but the southernmost block column
		let dims = GridDimensions::new(64, 64, 1.0);
		let walls: Vec<(u32, u32)> = (0..56).map(|row| (32, row)).collect();
		let f = fixture(dims, &walls);
		let level = LevelState::build(dims, 8, &f.0, &f.1);
		let mut finder = BlockFinder::new(&level);
		let goal = SearchGoal::new(Vec3::new(60.5, 0.0, 0.5), 0.0, 1024, true);
		let outcome = finder.search(&ctx!(f), &level, Vec3::new(0.5, 0.0, 0.5), &goal, MobilityClassId::new(0));
		assert_eq!(PathResult::Ok, outcome.result);
		// the detour must dip into the southern block rows
		assert!(outcome
			.path
			.get_cells()
			.iter()
			.any(|cell| cell.get_row() >= 48));
	}
	#[test]
	fn sealed_goal_cant_get_closer() {
		// east half fully sealed off
		let dims = GridDimensions::new(64, 64, 1.0);
		let walls: Vec<(u32, u32)> = (0..64).map(|row| (32, row)).collect();
		let f = fixture(dims, &walls);
		let level = LevelState::build(dims, 8, &f.0, &f.1);
		let mut finder = BlockFinder::new(&level);
		let goal = SearchGoal::new(Vec3::new(60.5, 0.0, 32.5), 0.0, 1024, true);
		let outcome = finder.search(&ctx!(f), &level, Vec3::new(0.5, 0.0, 32.5), &goal, MobilityClassId::new(0));
		assert_eq!(PathResult::CantGetCloser, outcome.result);
	}
	#[test]
	fn waypoints_goal_first() {
		let dims = GridDimensions::new(64, 64, 1.0);
		let f = fixture(dims, &[]);
		let level = LevelState::build(dims, 8, &f.0, &f.1);
		let mut finder = BlockFinder::new(&level);
		let goal_pos = Vec3::new(60.5, 0.0, 60.5);
		let goal = SearchGoal::new(goal_pos, 0.0, 1024, true);
		let outcome = finder.search(&ctx!(f), &level, Vec3::new(0.5, 0.0, 0.5), &goal, MobilityClassId::new(0));
		let first = outcome.path.get_waypoints().first().unwrap();
		let last = outcome.path.get_waypoints().last().unwrap();
		assert!(sq_distance_2d(*first, goal_pos) < sq_distance_2d(*last, goal_pos));
	}
}
