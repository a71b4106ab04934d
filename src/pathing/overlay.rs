//! Externally written extra traversal costs layered on top of terrain costs
//!
//! Game mechanics such as danger zones or reclaim fields steer agents by
//! depositing extra cost per cell. The overlay is split into a synced grid,
//! written only by deterministic simulation code and read by synced searches,
//! and an unsynced grid for local-only consumers such as previews. Synced
//! searches never read the unsynced grid so divergent local state cannot leak
//! into the lockstep simulation.
//!

use crate::prelude::*;

/// Per-cell extra traversal costs, split by determinism domain
#[derive(Clone)]
pub struct CostOverlay {
	/// Dimensions of the map
	dims: GridDimensions,
	/// Extra cost per cell written by synced simulation code
	synced: Vec<f32>,
	/// Extra cost per cell written by local-only code
	unsynced: Vec<f32>,
}

impl CostOverlay {
	/// Create a new instance of [CostOverlay] with all costs zero
	pub fn new(dims: GridDimensions) -> Self {
		CostOverlay {
			dims,
			synced: vec![0.0; dims.cell_count()],
			unsynced: vec![0.0; dims.cell_count()],
		}
	}
	/// Extra cost of a cell as seen by a search of the given domain. A synced
	/// search reads only the synced grid, an unsynced search reads the sum of
	/// both
	pub fn cost(&self, cell: GridCell, synced: bool) -> f32 {
		let index = self.dims.cell_index(cell);
		if synced {
			self.synced[index]
		} else {
			self.synced[index] + self.unsynced[index]
		}
	}
	/// Set the extra cost of a single cell in one domain
	pub fn set_cost(&mut self, cell: GridCell, cost: f32, synced: bool) {
		let index = self.dims.cell_index(cell);
		if synced {
			self.synced[index] = cost;
		} else {
			self.unsynced[index] = cost;
		}
	}
	/// Read back the raw cost of a single cell in one domain
	pub fn raw_cost(&self, cell: GridCell, synced: bool) -> f32 {
		let index = self.dims.cell_index(cell);
		if synced {
			self.synced[index]
		} else {
			self.unsynced[index]
		}
	}
	/// Read back the whole raw grid of one domain
	pub fn costs(&self, synced: bool) -> &[f32] {
		if synced {
			&self.synced
		} else {
			&self.unsynced
		}
	}
	/// Replace the whole grid of one domain. The new grid must cover the map
	/// exactly
	pub fn set_costs(&mut self, costs: Vec<f32>, synced: bool) {
		if costs.len() != self.dims.cell_count() {
			panic!(
				"Overlay data does not match grid, expected {} cells, got {}",
				self.dims.cell_count(),
				costs.len()
			);
		}
		if synced {
			self.synced = costs;
		} else {
			self.unsynced = costs;
		}
	}
}
