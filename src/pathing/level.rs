//! Precomputed coarse-resolution state of the map
//!
//! A [LevelState] carves the map into square blocks of cells and precomputes,
//! for every mobility class, a representative cell per block and the cost of
//! travelling between the representatives of adjacent blocks. The coarse
//! search engine then explores blocks the way the fine engine explores cells.
//!
//! Block data reflects static terrain only. Dynamic layers such as heat and
//! the overlay are consulted by the fine refinement that later turns coarse
//! segments into cell paths, so coarse data stays valid until the terrain
//! itself changes. Terrain edits queue the affected blocks and an incremental
//! update pass recomputes a bounded number of them per call.
//!

use std::collections::{BTreeSet, VecDeque};

use rayon::prelude::*;

use crate::prelude::*;

/// Linear offset marking a block with no passable cell for a class
const NO_OFFSET: u32 = u32::MAX;

/// The persistable payload of a [LevelState]
#[derive(serde::Deserialize, serde::Serialize, Clone, Debug)]
pub struct LevelData {
	/// Cells per block edge
	block_size: u32,
	/// Representative cell per class and block as a linear cell index,
	/// [NO_OFFSET] where a block has no passable cell
	offsets: Vec<u32>,
	/// Cost from a block representative to each of its eight neighbours, per
	/// class, [f32::INFINITY] where unreachable
	vertex_costs: Vec<f32>,
}

impl LevelData {
	/// Get the block size the data was computed for
	pub fn get_block_size(&self) -> u32 {
		self.block_size
	}
}

/// One coarse resolution of the map with its incremental update queue
pub struct LevelState {
	/// Cells per block edge
	block_size: u32,
	/// Dimensions of the underlying cell grid
	dims: GridDimensions,
	/// Number of block columns and rows
	blocks: (u32, u32),
	/// Number of mobility classes the level was built for
	class_count: usize,
	/// Representative cell per class and block as a linear cell index
	offsets: Vec<u32>,
	/// Cost between adjacent block representatives per class and direction
	vertex_costs: Vec<f32>,
	/// Blocks awaiting recomputation in arrival order
	dirty: VecDeque<BlockPos>,
	/// The queued blocks, kept alongside the queue to deduplicate pushes
	queued: BTreeSet<BlockPos>,
	/// Total number of blocks recomputed since setup
	updates_done: u32,
}

impl LevelState {
	/// Build a new instance of [LevelState] by computing all block data from
	/// the terrain, parallelized across blocks
	pub fn build(
		dims: GridDimensions,
		block_size: u32,
		terrain: &TerrainGrid,
		mobility: &MobilityRegistry,
	) -> Self {
		if block_size == 0 {
			panic!("Block size must be non-zero");
		}
		let blocks = dims.block_grid(block_size);
		let block_count = blocks.0 as usize * blocks.1 as usize;
		let class_count = mobility.len();
		let mut state = LevelState {
			block_size,
			dims,
			blocks,
			class_count,
			offsets: vec![NO_OFFSET; class_count * block_count],
			vertex_costs: vec![f32::INFINITY; class_count * block_count * DIRECTIONS.len()],
			dirty: VecDeque::new(),
			queued: BTreeSet::new(),
			updates_done: 0,
		};
		state.offsets = {
			let st = &state;
			(0..class_count * block_count)
				.into_par_iter()
				.map(|slot| {
					let class_id = MobilityClassId::new((slot / block_count) as u16);
					let block = st.block_from_index(slot % block_count);
					st.compute_offset(terrain, mobility, class_id, block)
				})
				.collect()
		};
		state.vertex_costs = {
			let st = &state;
			(0..class_count * block_count)
				.into_par_iter()
				.flat_map_iter(|slot| {
					let class_id = MobilityClassId::new((slot / block_count) as u16);
					let block = st.block_from_index(slot % block_count);
					(0..DIRECTIONS.len())
						.map(move |dir| st.compute_vertex_cost(terrain, mobility, class_id, block, dir))
						.collect::<Vec<f32>>()
				})
				.collect()
		};
		state
	}
	/// Rebuild a [LevelState] from persisted data, skipping the terrain scan.
	/// The data must have been exported for the same map and class registry
	pub fn from_data(
		dims: GridDimensions,
		data: LevelData,
		mobility: &MobilityRegistry,
	) -> Option<Self> {
		let blocks = dims.block_grid(data.block_size);
		let block_count = blocks.0 as usize * blocks.1 as usize;
		let class_count = mobility.len();
		if data.offsets.len() != class_count * block_count
			|| data.vertex_costs.len() != class_count * block_count * DIRECTIONS.len()
		{
			return None;
		}
		Some(LevelState {
			block_size: data.block_size,
			dims,
			blocks,
			class_count,
			offsets: data.offsets,
			vertex_costs: data.vertex_costs,
			dirty: VecDeque::new(),
			queued: BTreeSet::new(),
			updates_done: 0,
		})
	}
	/// Export the persistable payload
	pub fn to_data(&self) -> LevelData {
		LevelData {
			block_size: self.block_size,
			offsets: self.offsets.clone(),
			vertex_costs: self.vertex_costs.clone(),
		}
	}
	/// Get the cells per block edge
	pub fn get_block_size(&self) -> u32 {
		self.block_size
	}
	/// Get the number of block columns and rows
	pub fn get_blocks(&self) -> (u32, u32) {
		self.blocks
	}
	/// Linear index of a block in row-major order
	pub fn block_index(&self, block: BlockPos) -> usize {
		block.get_row() as usize * self.blocks.0 as usize + block.get_column() as usize
	}
	/// Block of a linear row-major index
	pub fn block_from_index(&self, index: usize) -> BlockPos {
		BlockPos::new(
			(index % self.blocks.0 as usize) as u32,
			(index / self.blocks.0 as usize) as u32,
		)
	}
	/// Whether a block lies within the map
	pub fn contains_block(&self, block: BlockPos) -> bool {
		block.get_column() < self.blocks.0 && block.get_row() < self.blocks.1
	}
	/// The representative cell of a block for a class, [None] when the block
	/// has no passable cell
	pub fn offset_cell(&self, class_id: MobilityClassId, block: BlockPos) -> Option<GridCell> {
		let offset = self.offsets[self.slot(class_id, block)];
		if offset == NO_OFFSET {
			None
		} else {
			Some(self.dims.cell_from_index(offset as usize))
		}
	}
	/// Cost from the representative of a block to the representative of its
	/// neighbour along a direction, [f32::INFINITY] when unreachable
	pub fn vertex_cost(&self, class_id: MobilityClassId, block: BlockPos, direction: usize) -> f32 {
		self.vertex_costs[self.slot(class_id, block) * DIRECTIONS.len() + direction]
	}
	/// Queue every block touching a cell rectangle for recomputation, plus a
	/// one block border because neighbour costs reach into adjacent blocks
	pub fn terrain_changed(&mut self, min: GridCell, max: GridCell) {
		let low = self.dims.block_from_cell(min, self.block_size);
		let high = self.dims.block_from_cell(max, self.block_size);
		let col_start = low.get_column().saturating_sub(1);
		let row_start = low.get_row().saturating_sub(1);
		let col_end = (high.get_column() + 1).min(self.blocks.0 - 1);
		let row_end = (high.get_row() + 1).min(self.blocks.1 - 1);
		for row in row_start..=row_end {
			for column in col_start..=col_end {
				let block = BlockPos::new(column, row);
				if self.queued.insert(block) {
					self.dirty.push_back(block);
				}
			}
		}
	}
	/// Recompute up to `limit` queued blocks. Returns the number actually
	/// recomputed
	pub fn update_blocks(
		&mut self,
		terrain: &TerrainGrid,
		mobility: &MobilityRegistry,
		limit: usize,
	) -> usize {
		let mut done = 0;
		while done < limit {
			let Some(block) = self.dirty.pop_front() else {
				break;
			};
			self.queued.remove(&block);
			self.recompute_block(terrain, mobility, block);
			done += 1;
		}
		self.updates_done += done as u32;
		done
	}
	/// Number of blocks currently queued for recomputation
	pub fn queued_updates(&self) -> usize {
		self.dirty.len()
	}
	/// Total number of blocks recomputed since setup
	pub fn get_updates_done(&self) -> u32 {
		self.updates_done
	}
	/// A stable content hash of the block data, for comparing the coarse
	/// state across the participants of a lockstep session
	pub fn checksum(&self) -> u32 {
		let mut hash: u32 = 0x811c9dc5;
		let mut eat = |byte: u8| {
			hash ^= byte as u32;
			hash = hash.wrapping_mul(0x01000193);
		};
		for offset in self.offsets.iter() {
			for byte in offset.to_le_bytes() {
				eat(byte);
			}
		}
		for cost in self.vertex_costs.iter() {
			for byte in cost.to_le_bytes() {
				eat(byte);
			}
		}
		hash
	}
	/// Recompute the offset and vertex costs of one block for every class,
	/// and the vertex costs of its neighbours which point back into it
	fn recompute_block(&mut self, terrain: &TerrainGrid, mobility: &MobilityRegistry, block: BlockPos) {
		for (class_id, _) in mobility.iter() {
			let offset = self.compute_offset(terrain, mobility, class_id, block);
			let slot = self.slot(class_id, block);
			self.offsets[slot] = offset;
		}
		for (class_id, _) in mobility.iter() {
			self.refresh_vertex_costs(terrain, mobility, class_id, block);
			for delta in DIRECTIONS.iter() {
				if let Some(neighbour) = self.neighbour(block, *delta) {
					self.refresh_vertex_costs(terrain, mobility, class_id, neighbour);
				}
			}
		}
	}
	/// Recompute all eight vertex costs of one block for one class
	fn refresh_vertex_costs(
		&mut self,
		terrain: &TerrainGrid,
		mobility: &MobilityRegistry,
		class_id: MobilityClassId,
		block: BlockPos,
	) {
		let base = self.slot(class_id, block) * DIRECTIONS.len();
		for direction in 0..DIRECTIONS.len() {
			let cost = self.compute_vertex_cost(terrain, mobility, class_id, block, direction);
			self.vertex_costs[base + direction] = cost;
		}
	}
	/// The best cell of a block for a class, fastest surface first, then
	/// closest to the block centre, then lowest index. Returns a linear cell
	/// index or [NO_OFFSET]
	fn compute_offset(
		&self,
		terrain: &TerrainGrid,
		mobility: &MobilityRegistry,
		class_id: MobilityClassId,
		block: BlockPos,
	) -> u32 {
		let class = mobility.class(class_id);
		let col_start = block.get_column() * self.block_size;
		let row_start = block.get_row() * self.block_size;
		let col_end = (col_start + self.block_size).min(self.dims.get_columns());
		let row_end = (row_start + self.block_size).min(self.dims.get_rows());
		let centre_col = (col_start + col_end) as f32 * 0.5;
		let centre_row = (row_start + row_end) as f32 * 0.5;
		let mut best = NO_OFFSET;
		let mut best_key = (0.0_f32, f32::INFINITY);
		for row in row_start..row_end {
			for column in col_start..col_end {
				let cell = GridCell::new(column, row);
				let speed_mod = class.speed_mod(terrain.surface(cell));
				if speed_mod <= 0.0 {
					continue;
				}
				let dc = column as f32 + 0.5 - centre_col;
				let dr = row as f32 + 0.5 - centre_row;
				let sq_centre_dist = dc * dc + dr * dr;
				if best == NO_OFFSET
					|| speed_mod > best_key.0
					|| (speed_mod == best_key.0 && sq_centre_dist < best_key.1)
				{
					best = self.dims.cell_index(cell) as u32;
					best_key = (speed_mod, sq_centre_dist);
				}
			}
		}
		best
	}
	/// Cost of the straight walk between the representatives of a block and
	/// its neighbour along a direction. Any impassable cell on the line makes
	/// the edge unreachable
	fn compute_vertex_cost(
		&self,
		terrain: &TerrainGrid,
		mobility: &MobilityRegistry,
		class_id: MobilityClassId,
		block: BlockPos,
		direction: usize,
	) -> f32 {
		let Some(neighbour) = self.neighbour(block, DIRECTIONS[direction]) else {
			return f32::INFINITY;
		};
		let Some(from) = self.stored_offset(class_id, block) else {
			return f32::INFINITY;
		};
		let Some(to) = self.stored_offset(class_id, neighbour) else {
			return f32::INFINITY;
		};
		let class = mobility.class(class_id);
		let line = line_cells(from, to);
		let mut cost = 0.0;
		let mut previous = from;
		for cell in line.iter().skip(1) {
			let speed_mod = class.speed_mod(terrain.surface(*cell));
			if speed_mod <= 0.0 {
				return f32::INFINITY;
			}
			let diagonal = cell.get_column() != previous.get_column() && cell.get_row() != previous.get_row();
			let step_len = if diagonal {
				self.dims.get_cell_size() * std::f32::consts::SQRT_2
			} else {
				self.dims.get_cell_size()
			};
			cost += step_len / speed_mod;
			previous = *cell;
		}
		cost
	}
	/// The already-stored offset cell of a block
	fn stored_offset(&self, class_id: MobilityClassId, block: BlockPos) -> Option<GridCell> {
		let offset = self.offsets[self.slot(class_id, block)];
		if offset == NO_OFFSET {
			None
		} else {
			Some(self.dims.cell_from_index(offset as usize))
		}
	}
	/// Neighbour of a block along a direction delta, [None] off the map
	pub fn neighbour(&self, block: BlockPos, delta: (i32, i32)) -> Option<BlockPos> {
		let column = block.get_column() as i32 + delta.0;
		let row = block.get_row() as i32 + delta.1;
		if column < 0 || row < 0 {
			return None;
		}
		let next = BlockPos::new(column as u32, row as u32);
		if self.contains_block(next) {
			Some(next)
		} else {
			None
		}
	}
	/// Index of a class and block pair into the per-block arrays. Class ids
	/// must be ordinals of the registry the level was built for
	fn slot(&self, class_id: MobilityClassId, block: BlockPos) -> usize {
		debug_assert!(class_id.get() < self.class_count);
		let block_count = self.blocks.0 as usize * self.blocks.1 as usize;
		class_id.get() * block_count + self.block_index(block)
	}
}

// #[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;

	/// One walker class where surface `1` is impassable
	fn registry() -> MobilityRegistry {
		MobilityRegistry::new(vec![MobilityClass::new("walker", vec![1.0, 0.0])])
	}
	#[test]
	fn flat_map_all_edges_finite() {
		let dims = GridDimensions::new(32, 32, 1.0);
		let terrain = TerrainGrid::flat(dims);
		let level = LevelState::build(dims, 8, &terrain, &registry());
		assert_eq!((4, 4), level.get_blocks());
		let class = MobilityClassId::new(0);
		assert!(level.offset_cell(class, BlockPos::new(0, 0)).is_some());
		// east edge of the north west block
		assert!(level.vertex_cost(class, BlockPos::new(0, 0), 2).is_finite());
		// off-map edges are unreachable
		assert!(level.vertex_cost(class, BlockPos::new(0, 0), 0).is_infinite());
	}
	#[test]
	fn blocked_block_has_no_offset() {
		let dims = GridDimensions::new(16, 16, 1.0);
		let mut terrain = TerrainGrid::flat(dims);
		for row in 0..8 {
			for column in 0..8 {
				terrain.set_surface(GridCell::new(column, row), 1);
			}
		}
		let level = LevelState::build(dims, 8, &terrain, &registry());
		let class = MobilityClassId::new(0);
		assert!(level.offset_cell(class, BlockPos::new(0, 0)).is_none());
		assert!(level.offset_cell(class, BlockPos::new(1, 0)).is_some());
		// the neighbour cannot reach into the blocked block either
		assert!(level.vertex_cost(class, BlockPos::new(1, 0), 6).is_infinite());
	}
	#[test]
	fn terrain_change_queues_block_and_border() {
		let dims = GridDimensions::new(32, 32, 1.0);
		let terrain = TerrainGrid::flat(dims);
		let mut level = LevelState::build(dims, 8, &terrain, &registry());
		level.terrain_changed(GridCell::new(12, 12), GridCell::new(12, 12));
		// the touched block plus the eight around it
		assert_eq!(9, level.queued_updates());
		// requeueing the same area does not duplicate entries
		level.terrain_changed(GridCell::new(12, 12), GridCell::new(12, 12));
		assert_eq!(9, level.queued_updates());
	}
	#[test]
	fn incremental_update_applies_edit() {
		let dims = GridDimensions::new(16, 16, 1.0);
		let mut terrain = TerrainGrid::flat(dims);
		let mut level = LevelState::build(dims, 8, &terrain, &registry());
		let class = MobilityClassId::new(0);
		assert!(level.vertex_cost(class, BlockPos::new(0, 0), 2).is_finite());
		// wall off the whole east half of the map
		for row in 0..16 {
			for column in 8..16 {
				terrain.set_surface(GridCell::new(column, row), 1);
			}
		}
		level.terrain_changed(GridCell::new(8, 0), GridCell::new(15, 15));
		while level.update_blocks(&terrain, &registry(), 2) > 0 {}
		assert!(level.vertex_cost(class, BlockPos::new(0, 0), 2).is_infinite());
		assert!(level.offset_cell(class, BlockPos::new(1, 0)).is_none());
		assert_eq!(0, level.queued_updates());
		assert!(level.get_updates_done() > 0);
	}
	#[test]
	fn data_roundtrip() {
		let dims = GridDimensions::new(32, 32, 1.0);
		let terrain = TerrainGrid::flat(dims);
		let level = LevelState::build(dims, 8, &terrain, &registry());
		let restored = LevelState::from_data(dims, level.to_data(), &registry()).unwrap();
		assert_eq!(level.checksum(), restored.checksum());
	}
	#[test]
	fn mismatched_data_rejected() {
		let dims = GridDimensions::new(32, 32, 1.0);
		let terrain = TerrainGrid::flat(dims);
		let level = LevelState::build(dims, 8, &terrain, &registry());
		let other = GridDimensions::new(64, 64, 1.0);
		assert!(LevelState::from_data(other, level.to_data(), &registry()).is_none());
	}
}
