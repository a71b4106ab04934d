//! Coordinates of the discretized map and the transforms between world space
//! and cell/block space
//!
//! World space puts the origin at the north-west corner of the map: `x` grows
//! eastward along columns, `z` grows southward along rows and `y` is terrain
//! height. A cell covers a `cell_size * cell_size` world-unit square.
//!

use bevy::prelude::*;

/// ID of a cell within the fine grid as `(column, row)`
#[derive(
	serde::Deserialize, serde::Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash, Reflect,
)]
pub struct GridCell((u32, u32));

impl GridCell {
	/// Create a new instance of [GridCell]
	pub fn new(column: u32, row: u32) -> Self {
		GridCell((column, row))
	}
	/// Get the cell `(column, row)` tuple
	pub fn get(&self) -> (u32, u32) {
		self.0
	}
	/// Get the cell column
	pub fn get_column(&self) -> u32 {
		self.0 .0
	}
	/// Get the cell row
	pub fn get_row(&self) -> u32 {
		self.0 .1
	}
}

/// ID of a block within a coarse grid as `(column, row)`
#[derive(
	serde::Deserialize, serde::Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug, Default, Hash, Reflect,
)]
pub struct BlockPos((u32, u32));

impl BlockPos {
	/// Create a new instance of [BlockPos]
	pub fn new(column: u32, row: u32) -> Self {
		BlockPos((column, row))
	}
	/// Get the block `(column, row)` tuple
	pub fn get(&self) -> (u32, u32) {
		self.0
	}
	/// Get the block column
	pub fn get_column(&self) -> u32 {
		self.0 .0
	}
	/// Get the block row
	pub fn get_row(&self) -> u32 {
		self.0 .1
	}
}

/// The dimensions of the discretized map
#[derive(serde::Deserialize, serde::Serialize, Clone, Copy, Debug, PartialEq, Reflect)]
pub struct GridDimensions {
	/// Number of cell columns of the map
	columns: u32,
	/// Number of cell rows of the map
	rows: u32,
	/// Length of a cell edge in world units
	cell_size: f32,
}

impl GridDimensions {
	/// Create a new instance of [GridDimensions].
	///
	/// Search nodes address cells with 16-bit column/row components, so maps
	/// larger than `65535` cells per axis cannot be represented and abort
	/// setup
	pub fn new(columns: u32, rows: u32, cell_size: f32) -> Self {
		if columns == 0 || rows == 0 {
			panic!("Grid dimensions must be non-zero, got ({columns}, {rows})");
		}
		if columns > u16::MAX as u32 || rows > u16::MAX as u32 {
			panic!(
				"Map of ({columns}, {rows}) cells exceeds the 16-bit node index encoding, limit is {} per axis",
				u16::MAX
			);
		}
		if cell_size <= 0.0 {
			panic!("Cell size must be positive, got {cell_size}");
		}
		GridDimensions {
			columns,
			rows,
			cell_size,
		}
	}
	/// Get the number of cell columns
	pub fn get_columns(&self) -> u32 {
		self.columns
	}
	/// Get the number of cell rows
	pub fn get_rows(&self) -> u32 {
		self.rows
	}
	/// Get the world-unit length of a cell edge
	pub fn get_cell_size(&self) -> f32 {
		self.cell_size
	}
	/// Get the total number of cells
	pub fn cell_count(&self) -> usize {
		self.columns as usize * self.rows as usize
	}
	/// Linear index of a cell in row-major order
	pub fn cell_index(&self, cell: GridCell) -> usize {
		cell.get_row() as usize * self.columns as usize + cell.get_column() as usize
	}
	/// Cell of a linear row-major index
	pub fn cell_from_index(&self, index: usize) -> GridCell {
		GridCell::new(
			(index % self.columns as usize) as u32,
			(index / self.columns as usize) as u32,
		)
	}
	/// Whether a cell lies within the map
	pub fn contains_cell(&self, cell: GridCell) -> bool {
		cell.get_column() < self.columns && cell.get_row() < self.rows
	}
	/// From a world position get the cell it resides in. Returns [None] when
	/// the position lies outside the map
	pub fn cell_from_world(&self, position: Vec3) -> Option<GridCell> {
		if position.x < 0.0 || position.z < 0.0 {
			return None;
		}
		let column = (position.x / self.cell_size).floor() as u32;
		let row = (position.z / self.cell_size).floor() as u32;
		if column >= self.columns || row >= self.rows {
			return None;
		}
		Some(GridCell::new(column, row))
	}
	/// From a world position get the cell it resides in, with positions
	/// outside the map clamped onto the nearest boundary cell
	pub fn clamped_cell_from_world(&self, position: Vec3) -> GridCell {
		let column = ((position.x / self.cell_size).floor().max(0.0) as u32).min(self.columns - 1);
		let row = ((position.z / self.cell_size).floor().max(0.0) as u32).min(self.rows - 1);
		GridCell::new(column, row)
	}
	/// World position of the centre of a cell, at height `0.0`
	pub fn world_from_cell(&self, cell: GridCell) -> Vec3 {
		Vec3::new(
			(cell.get_column() as f32 + 0.5) * self.cell_size,
			0.0,
			(cell.get_row() as f32 + 0.5) * self.cell_size,
		)
	}
	/// Clamp a world position into the map area
	pub fn clamp_world(&self, position: Vec3) -> Vec3 {
		Vec3::new(
			position.x.clamp(0.0, self.columns as f32 * self.cell_size),
			position.y,
			position.z.clamp(0.0, self.rows as f32 * self.cell_size),
		)
	}
	/// Number of block columns and rows for a given block size, rounding up so
	/// partial blocks along the south/east edges are included
	pub fn block_grid(&self, block_size: u32) -> (u32, u32) {
		(
			self.columns.div_ceil(block_size),
			self.rows.div_ceil(block_size),
		)
	}
	/// The block a cell belongs to for a given block size
	pub fn block_from_cell(&self, cell: GridCell, block_size: u32) -> BlockPos {
		BlockPos::new(cell.get_column() / block_size, cell.get_row() / block_size)
	}
}

/// Squared distance between two world positions measured only across the
/// ground plane
pub fn sq_distance_2d(a: Vec3, b: Vec3) -> f32 {
	let dx = a.x - b.x;
	let dz = a.z - b.z;
	dx * dx + dz * dz
}

// #[rustfmt::skip]
#[cfg(test)]
mod tests {
	use super::*;
	#[test]
	fn cell_from_world_origin_corner() {
		let dims = GridDimensions::new(100, 100, 1.0);
		let result = dims.cell_from_world(Vec3::new(0.5, 0.0, 0.5)).unwrap();
		let actual = GridCell::new(0, 0);
		assert_eq!(actual, result);
	}
	#[test]
	fn cell_from_world_interior() {
		let dims = GridDimensions::new(100, 100, 2.0);
		let result = dims.cell_from_world(Vec3::new(13.0, 0.0, 7.0)).unwrap();
		let actual = GridCell::new(6, 3);
		assert_eq!(actual, result);
	}
	#[test]
	fn cell_from_world_oob() {
		let dims = GridDimensions::new(10, 10, 1.0);
		assert!(dims.cell_from_world(Vec3::new(-0.1, 0.0, 5.0)).is_none());
		assert!(dims.cell_from_world(Vec3::new(5.0, 0.0, 10.1)).is_none());
	}
	#[test]
	fn clamped_cell_from_world() {
		let dims = GridDimensions::new(10, 10, 1.0);
		let result = dims.clamped_cell_from_world(Vec3::new(-3.0, 0.0, 25.0));
		let actual = GridCell::new(0, 9);
		assert_eq!(actual, result);
	}
	#[test]
	fn world_from_cell_roundtrip() {
		let dims = GridDimensions::new(64, 64, 4.0);
		let cell = GridCell::new(10, 3);
		let pos = dims.world_from_cell(cell);
		let result = dims.cell_from_world(pos).unwrap();
		assert_eq!(cell, result);
	}
	#[test]
	fn block_grid_rounds_up() {
		let dims = GridDimensions::new(100, 100, 1.0);
		let result = dims.block_grid(16);
		let actual = (7, 7);
		assert_eq!(actual, result);
	}
	#[test]
	fn block_from_cell() {
		let dims = GridDimensions::new(100, 100, 1.0);
		let result = dims.block_from_cell(GridCell::new(31, 16), 16);
		let actual = BlockPos::new(1, 1);
		assert_eq!(actual, result);
	}
	#[test]
	#[should_panic]
	fn oversized_map_rejected() {
		GridDimensions::new(70000, 10, 1.0);
	}
	#[test]
	fn index_roundtrip() {
		let dims = GridDimensions::new(33, 21, 1.0);
		let cell = GridCell::new(7, 13);
		let index = dims.cell_index(cell);
		assert_eq!(cell, dims.cell_from_index(index));
	}
}
