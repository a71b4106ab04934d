//! The terrain collaborator consumed by the search engines
//!
//! Terrain data itself is produced outside of this crate. The planner only
//! needs a height and a surface type per cell, so the boundary is a plain grid
//! of both that the owning simulation fills in and hands over at setup, plus
//! rectangle notifications when it edits the map afterwards.
//!

use crate::prelude::*;
use bevy::prelude::*;

/// Heights and surface types of every cell of the map
#[derive(Clone)]
pub struct TerrainGrid {
	/// Dimensions of the map
	dims: GridDimensions,
	/// Terrain height per cell in row-major order
	heights: Vec<f32>,
	/// Surface type per cell in row-major order, indexing into the speed
	/// modifiers of each [MobilityClass]
	surfaces: Vec<u8>,
}

impl TerrainGrid {
	/// Create a new instance of [TerrainGrid] from externally produced data.
	/// The data lengths must match the dimensions exactly
	pub fn new(dims: GridDimensions, heights: Vec<f32>, surfaces: Vec<u8>) -> Self {
		if heights.len() != dims.cell_count() || surfaces.len() != dims.cell_count() {
			panic!(
				"Terrain data does not match grid, expected {} cells, got {} heights and {} surfaces",
				dims.cell_count(),
				heights.len(),
				surfaces.len()
			);
		}
		TerrainGrid {
			dims,
			heights,
			surfaces,
		}
	}
	/// Create a flat map of a single surface type, useful as a baseline before
	/// carving features into it
	pub fn flat(dims: GridDimensions) -> Self {
		TerrainGrid {
			dims,
			heights: vec![0.0; dims.cell_count()],
			surfaces: vec![0; dims.cell_count()],
		}
	}
	/// Get the dimensions of the map
	pub fn get_dimensions(&self) -> &GridDimensions {
		&self.dims
	}
	/// Terrain height at a cell
	pub fn height(&self, cell: GridCell) -> f32 {
		self.heights[self.dims.cell_index(cell)]
	}
	/// Surface type of a cell
	pub fn surface(&self, cell: GridCell) -> u8 {
		self.surfaces[self.dims.cell_index(cell)]
	}
	/// Overwrite the surface type of a cell. Collaborators editing the map
	/// must follow up with a terrain-change notification so the coarse levels
	/// requeue the affected blocks
	pub fn set_surface(&mut self, cell: GridCell, surface: u8) {
		let index = self.dims.cell_index(cell);
		self.surfaces[index] = surface;
	}
	/// Overwrite the height of a cell
	pub fn set_height(&mut self, cell: GridCell, height: f32) {
		let index = self.dims.cell_index(cell);
		self.heights[index] = height;
	}
	/// World position of the centre of a cell lifted to terrain height
	pub fn world_position(&self, cell: GridCell) -> Vec3 {
		let mut pos = self.dims.world_from_cell(cell);
		pos.y = self.height(cell);
		pos
	}
	/// A stable content hash of the terrain, used to tag the persisted
	/// block-cost cache. FNV-1a over the raw data so every participant of a
	/// lockstep session computes the same value
	pub fn content_hash(&self) -> u32 {
		let mut hash: u32 = 0x811c9dc5;
		let mut eat = |byte: u8| {
			hash ^= byte as u32;
			hash = hash.wrapping_mul(0x01000193);
		};
		for value in [self.dims.get_columns(), self.dims.get_rows()] {
			for byte in value.to_le_bytes() {
				eat(byte);
			}
		}
		for byte in self.dims.get_cell_size().to_le_bytes() {
			eat(byte);
		}
		for height in self.heights.iter() {
			for byte in height.to_le_bytes() {
				eat(byte);
			}
		}
		for surface in self.surfaces.iter() {
			eat(*surface);
		}
		hash
	}
}
